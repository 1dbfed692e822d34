use std::time::Duration;

use async_trait::async_trait;
use thirtyfour::{
    error::WebDriverError, prelude::ElementQueryable, By, ChromiumLikeCapabilities,
    DesiredCapabilities, WebDriver,
};

use crate::configuration::WebDriverSettings;

use super::{BrowserLauncher, FetchError, PageFetcher, ReadyCondition};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A single WebDriver-controlled Chrome session.
pub struct Droid {
    pub driver: WebDriver,
}

impl Droid {
    pub async fn new(settings: &WebDriverSettings) -> Result<Self, FetchError> {
        let mut caps = DesiredCapabilities::chrome();

        let mut args = vec![
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-gpu".to_string(),
            "--disable-blink-features=AutomationControlled".to_string(),
            "--disable-extensions".to_string(),
            format!("user-agent={}", settings.user_agent),
        ];
        if settings.headless {
            args.push("--headless".to_string());
        }
        for arg in args.iter() {
            caps.add_arg(arg).map_err(session_error)?;
        }
        if let Some(ref binary_path) = settings.binary_path {
            caps.set_binary(binary_path).map_err(session_error)?;
        }

        let driver = WebDriver::new(&settings.server_url, caps)
            .await
            .map_err(session_error)?;
        if let Err(e) = driver
            .set_page_load_timeout(settings.page_load_timeout())
            .await
        {
            _ = driver.quit().await;
            return Err(session_error(e));
        }

        log::info!("Opened browser session on {}", settings.server_url);

        Ok(Droid { driver })
    }
}

#[async_trait]
impl PageFetcher for Droid {
    async fn fetch(&self, url: &str, ready: ReadyCondition<'_>) -> Result<String, FetchError> {
        self.driver
            .goto(url)
            .await
            .map_err(|e| classify(url, e, FetchErrorKind::Navigation))?;

        self.driver
            .query(By::Css(ready.selector))
            .wait(ready.timeout, READY_POLL_INTERVAL)
            .first()
            .await
            .map_err(|e| classify(url, e, FetchErrorKind::Timeout(ready.timeout)))?;

        tokio::time::sleep(ready.settle).await;

        self.driver
            .source()
            .await
            .map_err(|e| classify(url, e, FetchErrorKind::Navigation))
    }

    async fn close(&self) -> Result<(), FetchError> {
        self.driver.clone().quit().await.map_err(session_error)?;
        log::info!("Browser session closed");
        Ok(())
    }
}

/// Launches a new [`Droid`] per session.
pub struct DroidLauncher {
    settings: WebDriverSettings,
}

impl DroidLauncher {
    pub fn new(settings: WebDriverSettings) -> Self {
        DroidLauncher { settings }
    }
}

#[async_trait]
impl BrowserLauncher for DroidLauncher {
    async fn open(&self) -> Result<Box<dyn PageFetcher>, FetchError> {
        let droid = Droid::new(&self.settings).await?;
        Ok(Box::new(droid))
    }
}

enum FetchErrorKind {
    Navigation,
    Timeout(Duration),
}

fn classify(url: &str, error: WebDriverError, kind: FetchErrorKind) -> FetchError {
    if is_session_gone(&error) {
        return session_error(error);
    }

    match kind {
        FetchErrorKind::Timeout(timeout) => FetchError::Timeout {
            url: url.to_string(),
            timeout,
        },
        FetchErrorKind::Navigation => FetchError::Navigation {
            url: url.to_string(),
            message: error.to_string(),
        },
    }
}

const DEAD_BROWSER_MARKERS: [&str; 3] = [
    "chrome not reachable",
    "disconnected",
    "session deleted",
];

/// True when the driver or browser behind the session is gone, as opposed to
/// a single page misbehaving.
fn is_session_gone(error: &WebDriverError) -> bool {
    match error {
        WebDriverError::InvalidSessionId(..)
        | WebDriverError::SessionNotCreated(..)
        | WebDriverError::SessionCreateError(..)
        | WebDriverError::NoSuchWindow(..)
        | WebDriverError::HttpError(..)
        | WebDriverError::RequestFailed(..)
        | WebDriverError::CommandSendError(..)
        | WebDriverError::CommandRecvError(..)
        | WebDriverError::FatalError(..) => true,
        WebDriverError::UnknownError(info) => {
            let message = info.value.message.to_lowercase();
            DEAD_BROWSER_MARKERS
                .iter()
                .any(|marker| message.contains(marker))
        }
        _ => false,
    }
}

fn session_error(error: WebDriverError) -> FetchError {
    FetchError::Session(error.to_string())
}
