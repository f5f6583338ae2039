//! Configuration types and loading.
//!
//! The main entry point is [`CxConfig`], which represents the contents of
//! `.cx/config.yaml`. A missing file yields the defaults; unknown keys are
//! ignored so older binaries tolerate newer config files.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read or written.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file contained invalid YAML.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The `.cx/` directory was not found.
    #[error("no .cx directory found (run 'cx init' first)")]
    CxDirNotFound,
}

/// A specialized `Result` type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

// ---------------------------------------------------------------------------
// Budget mode
// ---------------------------------------------------------------------------

/// How the context assembler prunes entries when over budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BudgetMode {
    /// Keep the most important entries first.
    #[default]
    Importance,
    /// Keep the entries closest to the target first.
    Distance,
}

impl BudgetMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Importance => "importance",
            Self::Distance => "distance",
        }
    }

    /// Parses a mode string; unknown values return `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "importance" => Some(Self::Importance),
            "distance" => Some(Self::Distance),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Config sections
// ---------------------------------------------------------------------------

/// Metric thresholds and PageRank tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub page_rank_damping: f64,
    pub page_rank_iterations: usize,
    pub keystone_threshold: f64,
    pub bottleneck_threshold: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            page_rank_damping: 0.85,
            page_rank_iterations: 100,
            keystone_threshold: 0.30,
            bottleneck_threshold: 0.20,
        }
    }
}

/// Token budget defaults for context assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub max_tokens: usize,
    pub mode: BudgetMode,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4000,
            mode: BudgetMode::Importance,
        }
    }
}

/// Default expansion sets for context assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpandConfig {
    pub default_include: Vec<String>,
    pub default_exclude: Vec<String>,
}

impl Default for ExpandConfig {
    fn default() -> Self {
        Self {
            default_include: vec!["deps".into(), "types".into()],
            default_exclude: vec!["tests".into(), "mocks".into()],
        }
    }
}

/// Dead-code analyzer heuristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadConfig {
    /// Single-line constants/variables with these names are treated as
    /// common locals, never as dead code.
    pub common_locals: Vec<String>,
}

impl Default for DeadConfig {
    fn default() -> Self {
        Self {
            common_locals: DEFAULT_COMMON_LOCALS
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
        }
    }
}

/// The default common-locals set.
pub const DEFAULT_COMMON_LOCALS: &[&str] = &[
    "err", "ctx", "ok", "i", "j", "k", "buf", "tmp", "result", "args", "opts", "cfg", "req",
    "resp", "cmd", "db", "tx", "rows", "file", "path", "name", "id", "msg", "count", "idx",
    "item", "node", "src", "dst", "new", "old", "t", "v", "x", "y", "z",
];

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Contents of `.cx/config.yaml`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CxConfig {
    pub metrics: MetricsConfig,
    pub budget: BudgetConfig,
    pub expand: ExpandConfig,
    pub dead: DeadConfig,
}

/// Loads the config from a `.cx` directory; missing file yields defaults.
pub fn load_config(cx_dir: &Path) -> Result<CxConfig> {
    let path = cx_dir.join(crate::cx_dir::CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(CxConfig::default());
    }
    let content = std::fs::read_to_string(&path)?;
    let config: CxConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}

/// Saves the config to `.cx/config.yaml`.
pub fn save_config(cx_dir: &Path, config: &CxConfig) -> Result<()> {
    let path = cx_dir.join(crate::cx_dir::CONFIG_FILE_NAME);
    let content = serde_yaml::to_string(config)?;
    std::fs::write(&path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_documented_values() {
        let config = CxConfig::default();
        assert_eq!(config.metrics.page_rank_damping, 0.85);
        assert_eq!(config.metrics.page_rank_iterations, 100);
        assert_eq!(config.metrics.keystone_threshold, 0.30);
        assert_eq!(config.metrics.bottleneck_threshold, 0.20);
        assert_eq!(config.budget.max_tokens, 4000);
        assert_eq!(config.budget.mode, BudgetMode::Importance);
        assert_eq!(config.expand.default_include, vec!["deps", "types"]);
        assert_eq!(config.expand.default_exclude, vec!["tests", "mocks"]);
        assert!(config.dead.common_locals.iter().any(|l| l == "err"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config, CxConfig::default());
    }

    #[test]
    fn save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CxConfig::default();
        config.budget.max_tokens = 8000;
        config.budget.mode = BudgetMode::Distance;
        save_config(dir.path(), &config).unwrap();

        let back = load_config(dir.path()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(crate::cx_dir::CONFIG_FILE_NAME),
            "budget:\n  max_tokens: 2000\n",
        )
        .unwrap();

        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.budget.max_tokens, 2000);
        assert_eq!(config.metrics.keystone_threshold, 0.30);
    }

    #[test]
    fn budget_mode_parsing() {
        assert_eq!(BudgetMode::parse("importance"), Some(BudgetMode::Importance));
        assert_eq!(BudgetMode::parse("Distance"), Some(BudgetMode::Distance));
        assert_eq!(BudgetMode::parse("alphabetical"), None);
    }
}
