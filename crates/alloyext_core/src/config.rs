//! Extension settings supplied by the hosting framework.
//!
//! # Responsibility
//! - Deserialize the account list from the host's JSON settings.
//! - Build the `configure` payload forwarded to each SDK instance.
//!
//! # Invariants
//! - Unknown account fields are preserved and forwarded verbatim.
//! - Settings are read-only after load; validation happens at bootstrap.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Payload key carrying the external property identifier.
pub const PROPERTY_ID_KEY: &str = "propertyID";
/// Payload key carrying the optional edge configuration identifier.
pub const CONFIG_ID_KEY: &str = "configId";

/// One configured SDK instance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Account {
    /// Process-unique handle name.
    #[serde(rename = "instanceName", default)]
    pub instance_name: String,
    /// Process-unique external identifier used for lookups.
    #[serde(rename = "propertyID", default)]
    pub property_id: String,
    #[serde(rename = "configId", default)]
    pub config_id: Option<String>,
    /// Pass-through instance settings (edge domain, opt-in flags, ...).
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl Account {
    pub fn new(instance_name: impl Into<String>, property_id: impl Into<String>) -> Self {
        Self {
            instance_name: instance_name.into(),
            property_id: property_id.into(),
            config_id: None,
            settings: Map::new(),
        }
    }

    /// Payload of the `configure` command: `propertyID`, `configId` when set,
    /// then every pass-through setting.
    pub fn configure_payload(&self) -> Value {
        let mut payload = self.settings.clone();
        if let Some(config_id) = &self.config_id {
            payload.insert(CONFIG_ID_KEY.to_string(), Value::String(config_id.clone()));
        }
        payload.insert(
            PROPERTY_ID_KEY.to_string(),
            Value::String(self.property_id.clone()),
        );
        Value::Object(payload)
    }
}

/// Extension-level settings object.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ExtensionSettings {
    #[serde(default)]
    pub accounts: Vec<Account>,
}

impl ExtensionSettings {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|err| ConfigError::Parse {
            path: None,
            message: err.to_string(),
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|err| ConfigError::Parse {
            path: Some(path.to_path_buf()),
            message: err.to_string(),
        })
    }
}

/// Settings loading errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        message: String,
    },
    Parse {
        path: Option<PathBuf>,
        message: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, message } => {
                write!(f, "failed to read settings `{}`: {message}", path.display())
            }
            Self::Parse {
                path: Some(path),
                message,
            } => write!(f, "invalid settings `{}`: {message}", path.display()),
            Self::Parse {
                path: None,
                message,
            } => write!(f, "invalid settings: {message}"),
        }
    }
}

impl Error for ConfigError {}
