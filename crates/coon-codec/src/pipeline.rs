//! Codec facade: tables, registry and configuration behind one handle.

use std::sync::Arc;

use coon_core::config::{CodecConfig, Strategy};
use coon_core::error::{ConfigError, CoonError, EncodeError, ParseError};
use coon_core::ir::IrNode;
use coon_core::symbols::SymbolTables;
use coon_registry::{PatternRegistry, RegistrySnapshot};
use coon_strategy::{StrategyDecision, StrategyMetrics, StrategySelector};

use crate::decoder::Decoder;
use crate::emit::DartEmitter;
use crate::encoder::{EncodeOptions, Encoder};
use crate::validator::{ValidationResult, Validator};

/// Compression result with statistics.
#[derive(Debug, Clone)]
pub struct CompressionResult {
    pub output: String,
    pub strategy: Strategy,
    /// Length of the reference source rendering of the input.
    pub source_len: usize,
    pub compressed_len: usize,
    pub reduction_pct: f64,
    pub references: usize,
    /// Reference ids registered while compressing.
    pub minted: Vec<String>,
}

impl CompressionResult {
    pub fn ratio(&self) -> f64 {
        if self.source_len == 0 {
            return 1.0;
        }
        self.compressed_len as f64 / self.source_len as f64
    }

    /// Estimated tokens saved at four characters per token.
    pub fn token_savings(&self) -> usize {
        (self.source_len / 4).saturating_sub(self.compressed_len / 4)
    }
}

pub struct Codec {
    tables: Arc<SymbolTables>,
    registry: Arc<PatternRegistry>,
    config: CodecConfig,
}

impl Codec {
    pub fn new(tables: Arc<SymbolTables>, registry: Arc<PatternRegistry>, config: CodecConfig) -> Self {
        Self {
            tables,
            registry,
            config,
        }
    }

    /// Builtin tables, default configuration.
    pub fn with_builtin_tables(registry: Arc<PatternRegistry>) -> Self {
        Self::new(
            Arc::new(SymbolTables::builtin().clone()),
            registry,
            CodecConfig::default(),
        )
    }

    /// Load tables and registry named by `config`. Any load failure is fatal.
    pub fn from_config(config: CodecConfig) -> Result<Self, CoonError> {
        config.validate()?;
        let tables = match &config.symbol_table_path {
            Some(path) => SymbolTables::load(path)?,
            None => SymbolTables::builtin().clone(),
        };
        let registry = match &config.registry_path {
            Some(path) => PatternRegistry::load_or_default(path)?,
            None => PatternRegistry::new(),
        };
        tracing::info!(
            symbols = tables.len(),
            patterns = registry.len(),
            strategy = ?config.strategy,
            "codec ready"
        );
        Ok(Self::new(Arc::new(tables), Arc::new(registry), config))
    }

    pub fn tables(&self) -> &Arc<SymbolTables> {
        &self.tables
    }

    pub fn registry(&self) -> &Arc<PatternRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    fn options(&self) -> EncodeOptions {
        EncodeOptions::from(&self.config)
    }

    /// The configured strategy, or the selector's choice for `ir`.
    pub fn select_strategy(&self, ir: &IrNode, snapshot: &RegistrySnapshot) -> StrategyDecision {
        match self.config.strategy {
            Some(strategy) => StrategyDecision {
                strategy,
                metrics: StrategyMetrics::collect(ir, snapshot),
                reasoning: format!("configured: {strategy}"),
            },
            None => StrategySelector::new(self.config.thresholds.clone()).select(ir, snapshot),
        }
    }

    pub fn compress(&self, ir: &IrNode) -> Result<CompressionResult, CoonError> {
        let snapshot = self.registry.snapshot();
        let decision = self.select_strategy(ir, &snapshot);
        let encoded = Encoder::new(&self.tables, &snapshot, decision.strategy)
            .with_options(self.options())
            .encode(ir)?;

        let minted = if encoded.minted.is_empty() {
            Vec::new()
        } else {
            self.registry.commit(encoded.minted)?
        };

        let source_len = DartEmitter::default().emit(ir).len();
        let compressed_len = encoded.document.len();
        let reduction_pct = if source_len == 0 {
            0.0
        } else {
            (1.0 - compressed_len as f64 / source_len as f64) * 100.0
        };
        tracing::debug!(
            strategy = %decision.strategy,
            reasoning = %decision.reasoning,
            source_len,
            compressed_len,
            minted = minted.len(),
            "compressed"
        );
        Ok(CompressionResult {
            output: encoded.document.into_string(),
            strategy: decision.strategy,
            source_len,
            compressed_len,
            reduction_pct,
            references: encoded.references,
            minted,
        })
    }

    pub fn decompress(&self, doc: &str) -> Result<IrNode, ParseError> {
        let snapshot = self.registry.snapshot();
        Decoder::new(&self.tables, &snapshot)
            .with_max_depth(self.config.max_depth)
            .decode(doc)
    }

    /// Decode and render as reference Dart source.
    pub fn decompress_to_source(&self, doc: &str) -> Result<String, ParseError> {
        let ir = self.decompress(doc)?;
        Ok(DartEmitter::default().emit(&ir))
    }

    pub fn validate(&self, ir: &IrNode) -> Result<ValidationResult, EncodeError> {
        let snapshot = self.registry.snapshot();
        let mut validator = Validator::new(&self.tables, &snapshot)
            .with_selector(StrategySelector::new(self.config.thresholds.clone()))
            .with_options(self.options());
        if let Some(strategy) = self.config.strategy {
            validator = validator.with_strategy(strategy);
        }
        validator.validate(ir)
    }

    /// Persist the registry to the configured path.
    pub fn save_registry(&self) -> Result<(), ConfigError> {
        match &self.config.registry_path {
            Some(path) => self.registry.save(path),
            None => Err(ConfigError::InvalidConfig(
                "no registry_path configured".into(),
            )),
        }
    }
}
