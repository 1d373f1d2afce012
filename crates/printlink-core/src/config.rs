//! Configuration for the printlink CLI.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $PRINTLINK_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/printlink/config.toml
//!   3. ~/.config/printlink/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub printer: PrinterConfig,
    pub preheat: PreheatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterConfig {
    /// Host name or IP of the printer. Empty = must be given on the command line.
    pub host: String,
    /// API token for the HTTP fallback. Opaque; empty = none.
    pub token: String,
    /// Per-operation timeout for connect and command exchanges, in seconds.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreheatConfig {
    /// Target temperature for tool 1, °C. 0 = don't preheat.
    pub tool1: u16,
    /// Target temperature for tool 2, °C. 0 = don't preheat.
    pub tool2: u16,
    /// Target bed temperature, °C. 0 = don't preheat.
    pub bed: u16,
    /// Home all axes before printing.
    pub home: bool,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            token: String::new(),
            timeout_secs: 5,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            std::env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp"))
                .join(".config")
        })
        .join("printlink")
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl LinkConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            LinkConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("PRINTLINK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Apply PRINTLINK_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("PRINTLINK_HOST") {
            self.printer.host = v;
        }
        if let Ok(v) = std::env::var("PRINTLINK_TOKEN") {
            self.printer.token = v;
        }
        if let Ok(v) = std::env::var("PRINTLINK_TIMEOUT") {
            if let Ok(secs) = v.parse() {
                self.printer.timeout_secs = secs;
            }
        }
        if let Ok(v) = std::env::var("PRINTLINK_TOOL1") {
            if let Ok(t) = v.parse() {
                self.preheat.tool1 = t;
            }
        }
        if let Ok(v) = std::env::var("PRINTLINK_TOOL2") {
            if let Ok(t) = v.parse() {
                self.preheat.tool2 = t;
            }
        }
        if let Ok(v) = std::env::var("PRINTLINK_BED") {
            if let Ok(t) = v.parse() {
                self.preheat.bed = t;
            }
        }
        if let Ok(v) = std::env::var("PRINTLINK_HOME_AXES") {
            self.preheat.home = v == "true" || v == "1";
        }
    }
}
