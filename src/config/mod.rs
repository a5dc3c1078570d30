use clap::ValueEnum;
use serde::Serialize;
use std::env;
use std::fmt;

use crate::error::ProvisionError;

/// Whether mutating commands reach the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Read-only commands only; mutations are simulated
    #[default]
    DryRun,
    /// Transmit every command
    Apply,
}

impl RunMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dry-run" | "dryrun" | "dry_run" => Some(Self::DryRun),
            "apply" => Some(Self::Apply),
            _ => None,
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DryRun => write!(f, "dry-run"),
            Self::Apply => write!(f, "apply"),
        }
    }
}

/// Config holds all application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub api_user: String,
    pub api_pass: String,
    pub debug: bool,
    pub mode: RunMode,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub rollback: bool,
    pub lifetime_secs: u32,
    pub stencil_dir: Option<String>,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> Result<Self, ProvisionError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ProvisionError> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let mode = match lookup("DAS_MODE") {
            Some(raw) => RunMode::parse(&raw).ok_or_else(|| {
                ProvisionError::Config(format!(
                    "DAS_MODE must be 'dry-run' or 'apply', got '{}'",
                    raw
                ))
            })?,
            None => RunMode::default(),
        };

        Ok(Self {
            api_url: get("KEA_API_URL", "http://127.0.0.1:8000"),
            api_user: get("KEA_API_USER", "kea-api"),
            api_pass: get("KEA_API_PASS", ""),
            debug: parse_flag(&get("KEA_DEBUG", "false")),
            mode,
            timeout_secs: get("KEA_TIMEOUT_SECS", "30").parse().unwrap_or(30),
            connect_timeout_secs: get("KEA_CONNECT_TIMEOUT_SECS", "5").parse().unwrap_or(5),
            rollback: parse_flag(&get("KEA_ROLLBACK", "true")),
            lifetime_secs: get("KEA_LIFETIME_SECS", "300").parse().unwrap_or(300),
            stencil_dir: lookup("DAS_STENCIL_DIR").filter(|s| !s.is_empty()),
        })
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
