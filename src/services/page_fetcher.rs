use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The ready selector never showed up within the wait.
    #[error("Timed out after {timeout:?} waiting for results on {url}")]
    Timeout { url: String, timeout: Duration },
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },
    /// The browser session itself is unusable and must be recreated.
    #[error("Browser session failure: {0}")]
    Session(String),
}

impl FetchError {
    pub fn is_session_failure(&self) -> bool {
        matches!(self, FetchError::Session(_))
    }
}

/// When a rendered page counts as loaded.
#[derive(Debug, Clone, Copy)]
pub struct ReadyCondition<'a> {
    /// CSS selector that must match at least one element.
    pub selector: &'a str,
    pub timeout: Duration,
    /// Extra wait after the selector matched, for client-side rendering to finish.
    pub settle: Duration,
}

/// Renders a page and hands back its final markup.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, ready: ReadyCondition<'_>) -> Result<String, FetchError>;

    /// Ends the session. Called exactly once per opened fetcher.
    async fn close(&self) -> Result<(), FetchError>;
}

/// Opens fresh, isolated browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn open(&self) -> Result<Box<dyn PageFetcher>, FetchError>;
}
