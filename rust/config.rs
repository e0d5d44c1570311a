//! Integration Configuration
//!
//! An integration is described by a JSON spec naming its type plus the
//! type's camelCase settings:
//!
//! ```json
//! {"type": "table", "targetTemplate": "Main:Invoice", "csvDialect": "Excel w/Tabs"}
//! ```
//!
//! Host settings come from the environment (a `.env` file is honoured by the
//! binary).

use crate::error::{IntegrationError, Result};
use crate::event_log::{EventLogConfig, LedgerEventLog};
use crate::integration::Integration;
use crate::loopback::{LoopbackConfig, LoopbackIntegration};
use crate::table::{TableConfig, TableIntegration};
use crate::timer::{TimerConfig, TimerIntegration};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8089";
pub const BIND_ADDR_ENV: &str = "INTEGRATION_BIND_ADDR";
pub const CONFIG_PATH_ENV: &str = "INTEGRATION_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntegrationKind {
    Table(TableConfig),
    LedgerEventLog(EventLogConfig),
    Loopback(LoopbackConfig),
    Timer(TimerConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationSpec {
    /// Party the integration acts as
    #[serde(default)]
    pub party: Option<String>,
    #[serde(flatten)]
    pub kind: IntegrationKind,
}

impl IntegrationSpec {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| IntegrationError::Config(format!("invalid integration spec: {}", e)))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
            .map_err(|e| IntegrationError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn build(&self) -> Result<Box<dyn Integration>> {
        let integration: Box<dyn Integration> = match &self.kind {
            IntegrationKind::Table(config) => Box::new(TableIntegration::new(config)),
            IntegrationKind::LedgerEventLog(config) => Box::new(LedgerEventLog::new(config)),
            IntegrationKind::Loopback(config) => {
                let party = self.party.as_deref().ok_or_else(|| {
                    IntegrationError::Config("loopback integration requires a party".to_string())
                })?;
                Box::new(LoopbackIntegration::new(config, party))
            }
            IntegrationKind::Timer(config) => Box::new(TimerIntegration::new(config)),
        };
        Ok(integration)
    }
}

/// Process-level settings for hosting an integration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSettings {
    pub bind_addr: String,
    pub config_path: Option<PathBuf>,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            config_path: None,
        }
    }
}

impl HostSettings {
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var(BIND_ADDR_ENV).unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            config_path: std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from),
        }
    }
}
