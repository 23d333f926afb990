//! Deterministic strategy selection from structural metrics.

use coon_core::config::{Strategy, StrategyThresholds};
use coon_core::ir::IrNode;
use coon_registry::RegistrySnapshot;

use crate::types::{StrategyDecision, StrategyMetrics};

#[derive(Debug, Clone, Default)]
pub struct StrategySelector {
    pub thresholds: StrategyThresholds,
}

impl StrategySelector {
    pub fn new(thresholds: StrategyThresholds) -> Self {
        Self { thresholds }
    }

    pub fn select(&self, ir: &IrNode, snapshot: &RegistrySnapshot) -> StrategyDecision {
        let metrics = StrategyMetrics::collect(ir, snapshot);
        let (strategy, reasoning) = self.decide(&metrics);
        tracing::debug!(
            strategy = %strategy,
            nodes = metrics.node_count,
            subtrees = metrics.subtree_count,
            hits = metrics.registry_hits,
            "strategy selected"
        );
        StrategyDecision {
            strategy,
            metrics,
            reasoning,
        }
    }

    /// Pure policy over already collected metrics.
    pub fn decide(&self, metrics: &StrategyMetrics) -> (Strategy, String) {
        let t = &self.thresholds;
        if metrics.subtree_count == 0 {
            return (Strategy::Minimal, "no widget subtrees".into());
        }

        let large_by_nodes = metrics.node_count >= t.aggressive_min_nodes;
        let large_by_depth = metrics.max_depth >= t.deep_tree_depth;
        let size = format!(
            "nodes={} depth={}",
            metrics.node_count, metrics.max_depth
        );
        let hit_ratio = metrics.hit_ratio();

        if hit_ratio >= t.pattern_hit_ratio {
            let hits = format!(
                "registry hits {}/{} ({:.2} >= {:.2})",
                metrics.registry_hits, metrics.subtree_count, hit_ratio, t.pattern_hit_ratio
            );
            return if large_by_nodes || large_by_depth {
                (Strategy::Hybrid, format!("{hits} | large tree: {size}"))
            } else {
                (Strategy::PatternReference, hits)
            };
        }

        if large_by_nodes || large_by_depth {
            let why = if large_by_nodes {
                format!("{} >= {} nodes", metrics.node_count, t.aggressive_min_nodes)
            } else {
                format!("depth {} >= {}", metrics.max_depth, t.deep_tree_depth)
            };
            return (Strategy::Aggressive, format!("large tree: {why}"));
        }

        (Strategy::Minimal, format!("small tree: {size}"))
    }
}
