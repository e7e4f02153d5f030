//! Tunables for the pipeline, loadable from TOML.
//!
//! ```toml
//! [recovery]
//! min_payload_len = 50
//!
//! [analysis]
//! max_nesting_depth = 3
//! max_explored_paths = 10000
//!
//! [capture]
//! retry_delay_ms = 200
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::unwrap::DEFAULT_MIN_PAYLOAD_LEN;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlowchartConfig {
    pub recovery: RecoveryConfig,
    pub analysis: AnalysisConfig,
    pub capture: CaptureConfig,
}

impl FlowchartConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecoveryConfig {
    /// Text spans must be longer than this to be tried as buried payloads.
    pub min_payload_len: usize,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            min_payload_len: DEFAULT_MIN_PAYLOAD_LEN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Preceding decisions on a path at which `DEEP_NESTING` is reported.
    pub max_nesting_depth: usize,
    /// Upper bound on path extensions walked by the loop and nesting rules.
    pub max_explored_paths: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: 3,
            max_explored_paths: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfig {
    pub retry_delay_ms: u64,
}

impl CaptureConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self { retry_delay_ms: 200 }
    }
}
