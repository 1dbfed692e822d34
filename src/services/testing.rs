//! Scripted in-memory browser sessions for tests.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;

use crate::{configuration::SearchSettings, domain::tcin::PAGE_SIZE};

use super::{BrowserLauncher, FetchError, PageFetcher, ReadyCondition};

pub fn instant_settings() -> SearchSettings {
    SearchSettings {
        base_url: "https://www.target.com/s".to_string(),
        settle_delay_ms: 0,
        retry_backoff_ms: 0,
        inter_page_delay_ms: 0,
        inter_keyword_delay_ms: 0,
        ..SearchSettings::default()
    }
}

/// Product-card markup for the given TCINs.
pub fn results_page(tcins: &[String]) -> String {
    let cards: String = tcins
        .iter()
        .map(|tcin| {
            format!(
                r#"<div data-test="product-card"><a href="/p/item/-/A-{}">item</a></div>"#,
                tcin
            )
        })
        .collect();
    format!("<html><body><section>{}</section></body></html>", cards)
}

/// TCINs `start`, `start + 1`, ... as strings.
pub fn tcin_run(start: u32, count: usize) -> Vec<String> {
    (0..count as u32).map(|i| (start + i).to_string()).collect()
}

pub fn full_page(start: u32) -> String {
    results_page(&tcin_run(start, PAGE_SIZE))
}

pub fn timeout() -> FetchError {
    FetchError::Timeout {
        url: "https://www.target.com/s".to_string(),
        timeout: std::time::Duration::from_secs(15),
    }
}

pub fn crash() -> FetchError {
    FetchError::Session("chrome not reachable".to_string())
}

/// Responses handed out in call order; an exhausted script yields an empty page.
#[derive(Default)]
pub struct Script {
    responses: Mutex<VecDeque<Result<String, FetchError>>>,
    fetched: Mutex<Vec<String>>,
    closes: AtomicUsize,
}

impl Script {
    pub fn new(responses: Vec<Result<String, FetchError>>) -> Arc<Self> {
        Arc::new(Script {
            responses: Mutex::new(responses.into()),
            ..Script::default()
        })
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

pub struct ScriptedFetcher {
    pub script: Arc<Script>,
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, _ready: ReadyCondition<'_>) -> Result<String, FetchError> {
        self.script.fetched.lock().unwrap().push(url.to_string());
        self.script
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }

    async fn close(&self) -> Result<(), FetchError> {
        self.script.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Opens the scripted sessions in order; `Err` entries simulate launch failures.
pub struct ScriptedLauncher {
    sessions: Mutex<VecDeque<Result<Arc<Script>, FetchError>>>,
    opened: AtomicUsize,
}

impl ScriptedLauncher {
    pub fn new(sessions: Vec<Result<Arc<Script>, FetchError>>) -> Self {
        ScriptedLauncher {
            sessions: Mutex::new(sessions.into()),
            opened: AtomicUsize::new(0),
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for ScriptedLauncher {
    async fn open(&self) -> Result<Box<dyn PageFetcher>, FetchError> {
        let next = self
            .sessions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Session("no browser available".to_string())))?;
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedFetcher { script: next }))
    }
}
