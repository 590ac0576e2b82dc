use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{BridgeError, Result};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BridgeConfig {
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProvisioningConfig {
    /// Upper bound on the device-info request, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Status code reported with a successful completion.
    #[serde(default = "default_success_status_code")]
    pub success_status_code: i32,
    #[serde(default = "default_started_message")]
    pub started_message: String,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            success_status_code: default_success_status_code(),
            started_message: default_started_message(),
        }
    }
}

impl ProvisioningConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Name of the preference group the plan id is cached under.
    #[serde(default = "default_preference_name")]
    pub preference_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            preference_name: default_preference_name(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_success_status_code() -> i32 {
    200
}

fn default_started_message() -> String {
    "Gathering device info...".to_string()
}

fn default_store_path() -> PathBuf {
    PathBuf::from("blinkup-preferences.json")
}

fn default_preference_name() -> String {
    "DefaultPreferences".to_string()
}

impl BridgeConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            builder = builder.add_source(config::File::with_name("blinkup-bridge").required(false));
        }

        // Environment variable overrides with BLINKUP_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("BLINKUP")
                .separator("__")
                .try_parsing(true),
        );

        let config: BridgeConfig = builder
            .build()
            .map_err(|e| BridgeError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| BridgeError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.provisioning.timeout_ms == 0 {
            return Err(BridgeError::Config(
                "provisioning.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.store.preference_name.trim().is_empty() {
            return Err(BridgeError::Config(
                "store.preference_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults_are_valid() {
        let config = BridgeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.provisioning.timeout(), Duration::from_secs(60));
        assert_eq!(config.provisioning.success_status_code, 200);
        assert_eq!(config.store.preference_name, "DefaultPreferences");
    }

    #[test]
    fn test_load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bridge.toml");
        fs::write(
            &path,
            "[provisioning]\ntimeout_ms = 1500\n\n[store]\npreference_name = \"Prefs\"\n",
        )
        .unwrap();

        let config = BridgeConfig::load(path.to_str()).unwrap();
        assert_eq!(config.provisioning.timeout_ms, 1500);
        assert_eq!(config.provisioning.started_message, "Gathering device info...");
        assert_eq!(config.store.preference_name, "Prefs");
    }

    #[test]
    fn test_load_rejects_zero_timeout() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bridge.toml");
        fs::write(&path, "[provisioning]\ntimeout_ms = 0\n").unwrap();

        let err = BridgeConfig::load(path.to_str()).unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }
}
