use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use coon_core::config::Strategy;
use coon_core::ir::IrNode;
use coon_core::shape::fingerprint;
use coon_registry::RegistrySnapshot;

/// Structural measurements driving strategy selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyMetrics {
    pub node_count: usize,
    /// Widget subtrees, counting widgets in value position.
    pub subtree_count: usize,
    /// Deepest widget nesting.
    pub max_depth: usize,
    /// Subtrees whose fingerprint is already registered.
    pub registry_hits: usize,
    /// Distinct fingerprints occurring more than once.
    pub repeated_subtrees: usize,
    pub widget_frequency: BTreeMap<String, usize>,
}

impl StrategyMetrics {
    pub fn collect(ir: &IrNode, snapshot: &RegistrySnapshot) -> Self {
        let widgets = ir.widgets();
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut widget_frequency = BTreeMap::new();
        let mut registry_hits = 0;
        for w in &widgets {
            let fp = fingerprint(w);
            if snapshot.lookup(&fp).is_some() {
                registry_hits += 1;
            }
            *seen.entry(fp).or_insert(0) += 1;
            *widget_frequency.entry(w.type_name.clone()).or_insert(0) += 1;
        }
        Self {
            node_count: ir.node_count(),
            subtree_count: widgets.len(),
            max_depth: ir.widget_depth(),
            registry_hits,
            repeated_subtrees: seen.values().filter(|&&n| n > 1).count(),
            widget_frequency,
        }
    }

    /// Fraction of subtrees already in the registry; 0 with no subtrees.
    pub fn hit_ratio(&self) -> f64 {
        if self.subtree_count == 0 {
            0.0
        } else {
            self.registry_hits as f64 / self.subtree_count as f64
        }
    }

    /// Most frequent widget types, ties broken by name.
    pub fn most_common_widgets(&self, n: usize) -> Vec<(&str, usize)> {
        let mut counts: Vec<(&str, usize)> = self
            .widget_frequency
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        counts.truncate(n);
        counts
    }
}

/// Selection outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyDecision {
    pub strategy: Strategy,
    pub metrics: StrategyMetrics,
    pub reasoning: String,
}
