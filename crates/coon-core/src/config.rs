use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Encoding strategy. Closed set; chosen per document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Minimal,
    Aggressive,
    PatternReference,
    Hybrid,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Self::Minimal,
        Self::Aggressive,
        Self::PatternReference,
        Self::Hybrid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Aggressive => "aggressive",
            Self::PatternReference => "pattern_reference",
            Self::Hybrid => "hybrid",
        }
    }

    pub fn elides_whitespace(&self) -> bool {
        matches!(self, Self::Aggressive | Self::Hybrid)
    }

    /// Fold identifier and expression values found in the literal table.
    pub fn folds_literals(&self) -> bool {
        matches!(self, Self::Aggressive | Self::Hybrid)
    }

    pub fn uses_patterns(&self) -> bool {
        matches!(self, Self::PatternReference | Self::Hybrid)
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyThresholds {
    /// Fraction of widget subtrees already in the registry that makes
    /// references worthwhile.
    pub pattern_hit_ratio: f64,
    pub aggressive_min_nodes: usize,
    pub deep_tree_depth: usize,
}

impl Default for StrategyThresholds {
    fn default() -> Self {
        Self {
            pattern_hit_ratio: 0.25,
            aggressive_min_nodes: 24,
            deep_tree_depth: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Builtin tables when unset.
    pub symbol_table_path: Option<PathBuf>,
    /// Empty registry when unset or when the file does not exist yet.
    pub registry_path: Option<PathBuf>,
    /// Selected per document when unset.
    pub strategy: Option<Strategy>,
    pub thresholds: StrategyThresholds,
    /// Below 1.0, near matches are referenced too. Such documents are lossy.
    pub similarity_threshold: f64,
    pub register_patterns: bool,
    pub min_pattern_tokens: usize,
    pub max_depth: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            symbol_table_path: None,
            registry_path: None,
            strategy: None,
            thresholds: StrategyThresholds::default(),
            similarity_threshold: 1.0,
            register_patterns: false,
            min_pattern_tokens: 6,
            max_depth: 256,
        }
    }
}

impl CodecConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::InvalidConfig(format!(
                "similarity_threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.thresholds.pattern_hit_ratio) {
            return Err(ConfigError::InvalidConfig(format!(
                "pattern_hit_ratio must be within [0, 1], got {}",
                self.thresholds.pattern_hit_ratio
            )));
        }
        if self.max_depth == 0 {
            return Err(ConfigError::InvalidConfig("max_depth must be positive".into()));
        }
        Ok(())
    }
}
