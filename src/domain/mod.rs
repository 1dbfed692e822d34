pub mod check_request;
pub mod indexing_matrix;
pub mod search_result;
pub mod tcin;
