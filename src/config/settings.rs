use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Runtime settings of the tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the PagerDuty REST API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Concurrent per-incident fetches
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Default log filter when neither RUST_LOG nor -v is given
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout_secs: default_request_timeout(),
            parallelism: default_parallelism(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings from the built-in defaults, an optional file and the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let settings_path = std::env::var("PD_SETTINGS").ok();

        let mut builder = config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../../config/default.toml"),
                config::FileFormat::Toml,
            ));

        // Override with settings file if one is named
        if let Some(path) = settings_path {
            builder = builder.add_source(config::File::with_name(&path).required(false));
        }

        builder
            // Override with environment variables (prefix: PD__)
            .add_source(
                config::Environment::with_prefix("PD")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_api_url() -> String {
    crate::source::pagerduty::DEFAULT_API_URL.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_parallelism() -> usize {
    crate::enrichment::DEFAULT_PARALLELISM
}

fn default_log_level() -> String {
    "warn".to_string()
}
