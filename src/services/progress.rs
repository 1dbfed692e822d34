use std::sync::Mutex;

use serde::Serialize;

/// Observational status updates emitted while crawling.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    PageStarted {
        keyword: String,
        page: u32,
        max_pages: u32,
        attempt: u32,
    },
    PageFinished {
        keyword: String,
        page: u32,
        max_pages: u32,
        found: usize,
        fraction: f64,
    },
    RetryExhausted {
        keyword: String,
        page: u32,
        attempts: u32,
        error: String,
    },
    SessionRestarted {
        keyword: String,
        reason: String,
    },
    KeywordFinished {
        keyword: String,
        index: usize,
        total: usize,
        found: usize,
        fraction: f64,
    },
}

pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Writes progress to the log.
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::PageStarted {
                keyword,
                page,
                max_pages,
                attempt,
            } => match attempt {
                1 => log::info!("Searching '{}' - Page {}/{}", keyword, page, max_pages),
                _ => log::info!(
                    "Retrying '{}' - Page {}/{} (Attempt {})",
                    keyword,
                    page,
                    max_pages,
                    attempt
                ),
            },
            ProgressEvent::PageFinished {
                keyword,
                page,
                found,
                fraction,
                ..
            } => log::debug!(
                "'{}' page {} yielded {} tcins ({:.0}%)",
                keyword,
                page,
                found,
                fraction * 100.0
            ),
            ProgressEvent::RetryExhausted {
                keyword,
                page,
                attempts,
                error,
            } => log::warn!(
                "Failed after {} attempts on page {} for '{}': {}",
                attempts,
                page,
                keyword,
                error
            ),
            ProgressEvent::SessionRestarted { keyword, reason } => log::warn!(
                "Browser crashed while searching '{}', reinitializing... ({})",
                keyword,
                reason
            ),
            ProgressEvent::KeywordFinished {
                keyword,
                index,
                total,
                found,
                ..
            } => log::info!(
                "Found {} total products for '{}' ({}/{})",
                found,
                keyword,
                index + 1,
                total
            ),
        }
    }
}

/// Logs every event and keeps a copy in memory, in order.
#[derive(Default)]
pub struct RecordedProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordedProgress {
    pub fn events(&self) -> Vec<ProgressEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ProgressSink for RecordedProgress {
    fn report(&self, event: ProgressEvent) {
        LogProgress.report(event.clone());
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
