pub mod droid;
pub mod index_checker;
pub mod keyword_searcher;
pub mod page_fetcher;
pub mod progress;
#[cfg(test)]
pub mod testing;

pub use droid::*;
pub use index_checker::*;
pub use keyword_searcher::*;
pub use page_fetcher::*;
pub use progress::*;
