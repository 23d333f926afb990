//! Strategy selection: structural metrics of a tree plus registry hits
//! decide how a document is encoded.

pub mod selector;
pub mod types;

pub use coon_core::config::{Strategy, StrategyThresholds};
pub use selector::StrategySelector;
pub use types::{StrategyDecision, StrategyMetrics};

use coon_core::ir::IrNode;
use coon_registry::RegistrySnapshot;

/// Choose a strategy for `ir`. Never fails; identical inputs give
/// identical decisions.
pub fn select(ir: &IrNode, snapshot: &RegistrySnapshot, thresholds: &StrategyThresholds) -> StrategyDecision {
    StrategySelector::new(thresholds.clone()).select(ir, snapshot)
}
