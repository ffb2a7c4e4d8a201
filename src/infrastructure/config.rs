use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const SUPPORTED_SCHEMA: u8 = 1;
const DEFAULT_TIMEZONE: &str = "America/Sao_Paulo";

/// Typed application configuration. Store locations and the remote endpoint
/// are passed into the services explicitly instead of living in process-wide
/// singletons.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub schema: u8,
    /// Realtime database base URL, e.g. `https://<project>.firebaseio.com`.
    pub database_url: String,
    /// Identity Toolkit web API key for email/password sign-in.
    pub api_key: String,
    /// IANA timezone used for wall-clock session displays.
    pub timezone: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema: SUPPORTED_SCHEMA,
            database_url: String::new(),
            api_key: String::new(),
            timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }
}

impl AppConfig {
    pub fn display_timezone(&self) -> Result<chrono_tz::Tz, InfraError> {
        self.timezone.parse::<chrono_tz::Tz>().map_err(|_| {
            InfraError::InvalidConfig(format!("unknown timezone '{}'", self.timezone))
        })
    }
}

pub fn ensure_default_config(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&AppConfig::default())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

pub fn load_config(config_dir: &Path) -> Result<AppConfig, InfraError> {
    let path = config_dir.join(APP_JSON);
    let raw = fs::read_to_string(&path)?;
    let parsed: AppConfig = serde_json::from_str(&raw)?;
    if parsed.schema != SUPPORTED_SCHEMA {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            parsed.schema,
            path.display()
        )));
    }
    parsed.display_timezone()?;
    Ok(parsed)
}
