use std::collections::HashMap;

use coon_core::ir::{IrNode, WidgetNode};
use coon_core::shape::{fingerprint_tokens, shape_tokens};

use crate::snapshot::RegistrySnapshot;

/// Patterns mined during one encode session, waiting to be committed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationBuffer {
    pending: Vec<(String, WidgetNode)>,
}

impl RegistrationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a subtree. Returns false if its shape is already queued.
    pub fn push(&mut self, subtree: WidgetNode) -> bool {
        let fp = fingerprint_tokens(&shape_tokens(&subtree));
        if self.pending.iter().any(|(f, _)| *f == fp) {
            return false;
        }
        self.pending.push((fp, subtree));
        true
    }

    pub fn fingerprints(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(|(fp, _)| fp.as_str())
    }

    pub fn patterns(&self) -> impl Iterator<Item = &WidgetNode> {
        self.pending.iter().map(|(_, w)| w)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn into_patterns(self) -> Vec<WidgetNode> {
        self.pending.into_iter().map(|(_, w)| w).collect()
    }
}

/// Widget shapes that occur at least twice in `ir`, are unknown to
/// `snapshot` and span at least `min_tokens` shape tokens. First
/// occurrence of each shape, in pre-order.
pub fn mine_repeated(ir: &IrNode, snapshot: &RegistrySnapshot, min_tokens: usize) -> RegistrationBuffer {
    let widgets = ir.widgets();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<(String, &WidgetNode)> = Vec::new();
    for w in widgets {
        let tokens = shape_tokens(w);
        if tokens.len() < min_tokens {
            continue;
        }
        let fp = fingerprint_tokens(&tokens);
        let count = counts.entry(fp.clone()).or_insert(0);
        if *count == 0 {
            order.push((fp, w));
        }
        *count += 1;
    }

    let mut buffer = RegistrationBuffer::new();
    for (fp, w) in order {
        if counts[&fp] < 2 || snapshot.lookup(&fp).is_some() {
            continue;
        }
        buffer.pending.push((fp, w.clone()));
    }
    if !buffer.is_empty() {
        tracing::debug!(mined = buffer.len(), "repeated widget shapes found");
    }
    buffer
}
