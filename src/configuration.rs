use std::time::Duration;

use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub webdriver: WebDriverSettings,
    pub search: SearchSettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct WebDriverSettings {
    pub server_url: String,
    pub headless: bool,
    pub user_agent: String,
    pub binary_path: Option<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub page_load_timeout_secs: u64,
}

impl WebDriverSettings {
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }
}

/// Knobs for the paginated keyword crawl. All delays are plain timed waits.
#[derive(Deserialize, Clone, Debug)]
pub struct SearchSettings {
    pub base_url: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub default_max_pages: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_pages_limit: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_retries: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub ready_timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub settle_delay_ms: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub retry_backoff_ms: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub inter_page_delay_ms: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub inter_keyword_delay_ms: u64,
}

impl SearchSettings {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn inter_page_delay(&self) -> Duration {
        Duration::from_millis(self.inter_page_delay_ms)
    }

    pub fn inter_keyword_delay(&self) -> Duration {
        Duration::from_millis(self.inter_keyword_delay_ms)
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            base_url: "https://www.target.com/s".to_string(),
            default_max_pages: 3,
            max_pages_limit: 10,
            max_retries: 2,
            ready_timeout_secs: 15,
            settle_delay_ms: 2000,
            retry_backoff_ms: 3000,
            inter_page_delay_ms: 1500,
            inter_keyword_delay_ms: 2000,
        }
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("No current directory: {}", e)))?;
    let configuration_directory = base_path.join("configuration");

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")))
        // APP_SEARCH__MAX_RETRIES=3 overrides search.max_retries
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
