use crate::error::{AppError, Result};
use crate::models::ShiftDefinition;
use crate::schedule::ShiftSchedule;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use strum::{Display, EnumString};
use tracing::{debug, info};

/// File name of the user configuration inside the home directory
pub const CONFIG_FILE_NAME: &str = ".pd.yml";

/// Environment variable pointing at an alternative configuration file
pub const CONFIG_PATH_ENV: &str = "PD_CONFIG";

const SETUP_HINT: &str = "Please follow the setup instructions in the README to create the file";

/// Persisted user configuration (`~/.pd.yml`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PdConfig {
    #[serde(default)]
    pub authtoken: String,

    /// Name of the shift the user belongs to
    #[serde(default)]
    pub own_shift: String,

    /// Shift definitions in schedule order
    #[serde(default)]
    pub shift_times: Vec<ShiftDefinition>,

    /// Named shift report templates
    #[serde(default)]
    pub templates: BTreeMap<String, String>,

    /// Keys this tool does not know about, written back untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Fields that can be rewritten through [`ConfigStore::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum ConfigField {
    #[strum(serialize = "own-shift")]
    OwnShift,
    #[strum(serialize = "authtoken")]
    Authtoken,
}

impl PdConfig {
    pub fn set(&mut self, field: ConfigField, value: &str) {
        match field {
            ConfigField::OwnShift => self.own_shift = value.to_string(),
            ConfigField::Authtoken => self.authtoken = value.to_string(),
        }
    }

    /// Shift schedule described by this configuration
    pub fn schedule(&self) -> Result<ShiftSchedule> {
        ShiftSchedule::from_definitions(&self.shift_times, &self.own_shift)
    }

    /// Report template by name
    pub fn template(&self, name: &str) -> Result<&str> {
        self.templates.get(name).map(String::as_str).ok_or_else(|| {
            let known: Vec<&str> = self.templates.keys().map(String::as_str).collect();
            AppError::Configuration(format!(
                "no template named {:?} in the configuration file (available: {})",
                name,
                if known.is_empty() {
                    "none".to_string()
                } else {
                    known.join(", ")
                }
            ))
        })
    }

    pub fn require_token(&self) -> Result<&str> {
        if self.authtoken.trim().is_empty() {
            return Err(AppError::Configuration(
                "no authtoken configured, run `pd-shift set-token <TOKEN>` or set `authtoken` in the configuration file"
                    .to_string(),
            ));
        }
        Ok(self.authtoken.trim())
    }
}

/// Persisted configuration storage
pub trait ConfigStore: Send + Sync {
    fn load(&self) -> Result<PdConfig>;

    fn save(&self, config: &PdConfig) -> Result<()>;

    /// Load, change a single field and save the whole configuration
    fn update(&self, field: ConfigField, value: &str) -> Result<PdConfig> {
        let mut config = self.load()?;
        config.set(field, value);
        self.save(&config)?;
        info!(field = %field, "Configuration updated");
        Ok(config)
    }
}

/// YAML file backed configuration store
#[derive(Debug, Clone)]
pub struct YamlConfigStore {
    path: PathBuf,
}

impl YamlConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `$PD_CONFIG`, or `~/.pd.yml` when unset
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(Self::default_path()?))
    }

    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }
        dirs::home_dir()
            .map(|home| home.join(CONFIG_FILE_NAME))
            .ok_or_else(|| {
                AppError::Configuration(format!(
                    "home directory not found, cannot locate {} (set {} instead)",
                    CONFIG_FILE_NAME, CONFIG_PATH_ENV
                ))
            })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<PdConfig> {
        let data = fs::read_to_string(&self.path).map_err(|e| {
            AppError::Configuration(format!(
                "it seems like {} is not created or could not be read ({}). {}",
                self.path.display(),
                e,
                SETUP_HINT
            ))
        })?;

        // an empty file is a valid, empty configuration
        if data.trim().is_empty() {
            return Ok(PdConfig::default());
        }

        let config: PdConfig = serde_yaml::from_str(&data).map_err(|e| {
            AppError::Configuration(format!(
                "it seems like the content of {} could not be interpreted ({}). {}",
                self.path.display(),
                e,
                SETUP_HINT
            ))
        })?;

        debug!(
            path = %self.path.display(),
            shifts = config.shift_times.len(),
            templates = config.templates.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    fn save(&self, config: &PdConfig) -> Result<()> {
        let data = serde_yaml::to_string(config)?;
        fs::write(&self.path, data).map_err(|e| {
            AppError::Configuration(format!(
                "could not write {} ({})",
                self.path.display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
authtoken: abc123
own-shift: Shift APAC
shift-times:
  - name: Shift APAC
    start: "00:00"
    end: "08:00"
  - name: Shift EU
    start: "08:00"
    end: "16:00"
templates:
  daily: "Report for {{date}}"
editor: vim
"#;

    fn store_with(content: &str) -> (TempDir, YamlConfigStore) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, content).unwrap();
        (dir, YamlConfigStore::new(path))
    }

    #[test]
    fn test_load_sample() {
        let (_dir, store) = store_with(SAMPLE);
        let config = store.load().unwrap();

        assert_eq!(config.authtoken, "abc123");
        assert_eq!(config.own_shift, "Shift APAC");
        assert_eq!(config.shift_times.len(), 2);
        assert_eq!(config.template("daily").unwrap(), "Report for {{date}}");
        assert!(config.extra.contains_key("editor"));
    }

    #[test]
    fn test_update_preserves_unknown_keys() {
        let (_dir, store) = store_with(SAMPLE);
        store.update(ConfigField::OwnShift, "Shift EU").unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.own_shift, "Shift EU");
        assert_eq!(reloaded.authtoken, "abc123");
        assert_eq!(
            reloaded.extra.get("editor"),
            Some(&serde_yaml::Value::String("vim".to_string()))
        );
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let store = YamlConfigStore::new(dir.path().join("absent.yml"));
        let err = store.load().unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        assert!(err.to_string().contains("README"));
    }

    #[test]
    fn test_unparseable_file_is_configuration_error() {
        let (_dir, store) = store_with("shift-times: {not: [a list");
        assert!(matches!(store.load(), Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_empty_file_loads_defaults() {
        let (_dir, store) = store_with("");
        assert_eq!(store.load().unwrap(), PdConfig::default());
    }

    #[test]
    fn test_unknown_template_lists_available() {
        let (_dir, store) = store_with(SAMPLE);
        let err = store.load().unwrap().template("weekly").unwrap_err();
        assert!(err.to_string().contains("daily"));
    }

    #[test]
    fn test_require_token() {
        let mut config = PdConfig::default();
        assert!(config.require_token().is_err());
        config.set(ConfigField::Authtoken, " tok ");
        assert_eq!(config.require_token().unwrap(), "tok");
    }

    #[test]
    fn test_config_field_names() {
        assert_eq!(ConfigField::OwnShift.to_string(), "own-shift");
        assert_eq!(ConfigField::from_str("authtoken").unwrap(), ConfigField::Authtoken);
    }
}
