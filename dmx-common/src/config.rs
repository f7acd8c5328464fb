//! Configuration loading and resolution
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. User config file (`~/.config/dmx/survey.toml`)
//! 4. Compiled defaults (fallback)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{Error, Result};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "DMX_CONFIG";

/// Default spreadsheet name for the durable interaction log
pub const DEFAULT_SPREADSHEET_NAME: &str = "Digital Museum Streamlit Data Sheet";

/// Default post-experience survey link
pub const DEFAULT_SURVEY_URL: &str = "https://docs.google.com/forms/d/e/1FAIpQLSfMmbXk8-9qoEygXBqcBY2gAqiGrzDms48tcf0j_ax-px56pg/viewform?usp=header";

/// Survey service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SurveyConfig {
    /// Listen address
    pub bind: String,
    /// Path to the JSON artwork catalog
    pub catalog_path: PathBuf,
    /// Number of artworks sampled per session
    pub sample_size: usize,
    /// Post-experience survey URL shown at debrief
    pub survey_url: String,
    /// Fixed RNG seed (None = seeded from entropy)
    pub seed: Option<u64>,
    /// Timeout applied to outbound HTTP calls
    pub http_timeout_secs: u64,
    /// Idle time after which a session is evicted
    pub session_ttl_secs: u64,
    pub sheets: SheetsConfig,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5730".to_string(),
            catalog_path: PathBuf::from("data/real_museum_metadata_with_ai.json"),
            sample_size: 20,
            survey_url: DEFAULT_SURVEY_URL.to_string(),
            seed: None,
            http_timeout_secs: 30,
            session_ttl_secs: 24 * 60 * 60,
            sheets: SheetsConfig::default(),
        }
    }
}

/// External spreadsheet log settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SheetsConfig {
    /// Spreadsheet looked up by name when no id is configured
    pub spreadsheet_name: String,
    /// Explicit spreadsheet id (skips name lookup)
    pub spreadsheet_id: Option<String>,
    /// Range receiving raw view events
    pub events_range: String,
    /// Range receiving exhibition summary rows
    pub summary_range: String,
    pub api_base: String,
    pub drive_base: String,
    /// JSON file holding `{"access_token": "..."}`
    pub credentials_path: Option<PathBuf>,
    /// Environment variable holding the bearer token
    pub token_env: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_name: DEFAULT_SPREADSHEET_NAME.to_string(),
            spreadsheet_id: None,
            events_range: "Sheet1".to_string(),
            summary_range: "Exhibitions".to_string(),
            api_base: "https://sheets.googleapis.com".to_string(),
            drive_base: "https://www.googleapis.com".to_string(),
            credentials_path: None,
            token_env: "DMX_SHEETS_TOKEN".to_string(),
        }
    }
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine(PathBuf),
    Environment(PathBuf),
    UserFile(PathBuf),
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CommandLine(p) => write!(f, "command line ({})", p.display()),
            ConfigSource::Environment(p) => write!(f, "{} ({})", CONFIG_ENV_VAR, p.display()),
            ConfigSource::UserFile(p) => write!(f, "user config ({})", p.display()),
            ConfigSource::Defaults => write!(f, "compiled defaults"),
        }
    }
}

impl SurveyConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SurveyConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolve the configuration following the priority order above
    ///
    /// Explicitly named files (CLI, ENV) must load; the user file is optional
    /// and falls back to defaults with a warning when unreadable.
    pub fn resolve(cli_arg: Option<&Path>) -> Result<(Self, ConfigSource)> {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            return Ok((
                Self::from_file(path)?,
                ConfigSource::CommandLine(path.to_path_buf()),
            ));
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let path = PathBuf::from(path);
            return Ok((Self::from_file(&path)?, ConfigSource::Environment(path)));
        }

        // Priority 3: User config file
        if let Some(path) = user_config_path() {
            if path.exists() {
                match Self::from_file(&path) {
                    Ok(config) => return Ok((config, ConfigSource::UserFile(path))),
                    Err(e) => warn!("Ignoring unreadable user config: {}", e),
                }
            }
        }

        // Priority 4: Compiled defaults
        info!("No config file found, using compiled defaults");
        Ok((Self::default(), ConfigSource::Defaults))
    }

    /// Reject values the survey cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.sample_size == 0 {
            return Err(Error::Config("sample_size must be at least 1".to_string()));
        }
        if self.session_ttl_secs == 0 {
            return Err(Error::Config("session_ttl_secs must be at least 1".to_string()));
        }
        if self.bind.trim().is_empty() {
            return Err(Error::Config("bind address must not be empty".to_string()));
        }
        if self.sheets.spreadsheet_name.trim().is_empty() && self.sheets.spreadsheet_id.is_none() {
            return Err(Error::Config(
                "sheets.spreadsheet_name or sheets.spreadsheet_id is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// `~/.config/dmx/survey.toml`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("dmx").join("survey.toml"))
}

/// Bearer credential for the external log service
#[derive(Clone, Deserialize)]
pub struct ServiceCredentials {
    pub access_token: String,
}

impl std::fmt::Debug for ServiceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCredentials")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl ServiceCredentials {
    /// Load credentials supplied out-of-band
    ///
    /// **Priority:** credentials file → environment variable. Absence of both
    /// is a configuration error.
    pub fn load(sheets: &SheetsConfig) -> Result<Self> {
        if let Some(path) = &sheets.credentials_path {
            let content = std::fs::read_to_string(path).map_err(|e| {
                Error::Config(format!(
                    "Failed to read credentials {}: {}",
                    path.display(),
                    e
                ))
            })?;
            let credentials: ServiceCredentials = serde_json::from_str(&content)?;
            if credentials.access_token.trim().is_empty() {
                return Err(Error::Config(format!(
                    "Credentials file {} has an empty access_token",
                    path.display()
                )));
            }
            info!("Service credentials loaded from {}", path.display());
            return Ok(credentials);
        }

        match std::env::var(&sheets.token_env) {
            Ok(token) if !token.trim().is_empty() => {
                info!("Service credentials loaded from {}", sheets.token_env);
                Ok(Self {
                    access_token: token,
                })
            }
            _ => Err(Error::Config(format!(
                "External log credentials not configured. Provide one of:\n\
                 1. TOML config: [sheets] credentials_path = \"/path/to/token.json\"\n\
                 2. Environment: {}=<access token>",
                sheets.token_env
            ))),
        }
    }
}
