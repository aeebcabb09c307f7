//! Configuration
//!
//! - [`Settings`]: runtime settings (API endpoint, timeouts, parallelism)
//! - [`PdConfig`]: the user's persisted `.pd.yml` (token, shifts, templates)

pub mod settings;
pub mod store;

pub use settings::Settings;
pub use store::{
    ConfigField, ConfigStore, PdConfig, YamlConfigStore, CONFIG_FILE_NAME, CONFIG_PATH_ENV,
};
