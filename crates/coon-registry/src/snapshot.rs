use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;

use coon_core::ir::WidgetNode;
use coon_core::shape::{shape_tokens, similarity};

use crate::entry::PatternEntry;

/// Registry summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistryStats {
    pub total: usize,
    pub categories: BTreeMap<String, usize>,
    /// Shape tokens summed over every example.
    pub total_tokens: usize,
    pub avg_tokens: usize,
}

/// Immutable view of the registry. Cheap to clone: entries are shared.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    entries: Vec<Arc<PatternEntry>>,
    shapes: Vec<Arc<[String]>>,
    by_fingerprint: HashMap<String, usize>,
    by_id: HashMap<String, usize>,
    next_seq: u64,
}

impl Default for RegistrySnapshot {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            shapes: Vec::new(),
            by_fingerprint: HashMap::new(),
            by_id: HashMap::new(),
            next_seq: 1,
        }
    }
}

impl RegistrySnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Exact structural match.
    pub fn lookup(&self, fingerprint: &str) -> Option<&PatternEntry> {
        self.by_fingerprint
            .get(fingerprint)
            .map(|&i| self.entries[i].as_ref())
    }

    pub fn get(&self, reference_id: &str) -> Option<&PatternEntry> {
        self.by_id.get(reference_id).map(|&i| self.entries[i].as_ref())
    }

    pub fn contains_id(&self, reference_id: &str) -> bool {
        self.by_id.contains_key(reference_id)
    }

    /// Best entry whose shape similarity to `subtree` is at least
    /// `threshold`. Ties go to the earliest registration.
    pub fn find_similar(&self, subtree: &WidgetNode, threshold: f64) -> Option<(&PatternEntry, f64)> {
        let tokens = shape_tokens(subtree);
        let mut best: Option<(usize, f64)> = None;
        for (i, shape) in self.shapes.iter().enumerate() {
            let (short, long) = if shape.len() < tokens.len() {
                (shape.len(), tokens.len())
            } else {
                (tokens.len(), shape.len())
            };
            // similarity can never exceed short/long
            let bound = if long == 0 { 1.0 } else { short as f64 / long as f64 };
            if bound < threshold || best.is_some_and(|(_, s)| bound <= s) {
                continue;
            }
            let score = similarity(&shape[..], &tokens[..]);
            if score >= threshold && best.map_or(true, |(_, s)| score > s) {
                best = Some((i, score));
            }
        }
        best.map(|(i, score)| (self.entries[i].as_ref(), score))
    }

    /// Entries in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &PatternEntry> {
        self.entries.iter().map(|e| e.as_ref())
    }

    pub fn by_category<'s>(&'s self, category: &'s str) -> impl Iterator<Item = &'s PatternEntry> {
        self.entries().filter(move |e| e.meta.category == category)
    }

    /// Entries carrying at least one of `tags`.
    pub fn by_tags<'s>(&'s self, tags: &'s [&'s str]) -> impl Iterator<Item = &'s PatternEntry> {
        self.entries()
            .filter(move |e| tags.iter().any(|t| e.meta.has_tag(t)))
    }

    /// Case-insensitive substring match on the display name.
    pub fn search_name(&self, query: &str) -> Vec<&PatternEntry> {
        let query = query.to_lowercase();
        self.entries()
            .filter(|e| e.display_name().to_lowercase().contains(&query))
            .collect()
    }

    pub fn stats(&self) -> RegistryStats {
        let mut categories = BTreeMap::new();
        for entry in self.entries() {
            *categories.entry(entry.meta.category.clone()).or_insert(0) += 1;
        }
        let total_tokens: usize = self.shapes.iter().map(|s| s.len()).sum();
        let total = self.entries.len();
        RegistryStats {
            total,
            categories,
            total_tokens,
            avg_tokens: if total == 0 { 0 } else { total_tokens / total },
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Next free `w<n>` id.
    pub(crate) fn mint_id(&self) -> String {
        let mut seq = self.next_seq;
        loop {
            let id = format!("w{seq}");
            if !self.by_id.contains_key(&id) {
                return id;
            }
            seq += 1;
        }
    }

    /// Append without validation. Callers check id and fingerprint uniqueness.
    pub(crate) fn push(&mut self, entry: PatternEntry) {
        let index = self.entries.len();
        if let Some(seq) = minted_seq(&entry.reference_id) {
            self.next_seq = self.next_seq.max(seq.saturating_add(1));
        }
        self.by_fingerprint.insert(entry.fingerprint.clone(), index);
        self.by_id.insert(entry.reference_id.clone(), index);
        self.shapes.push(shape_tokens(&entry.example).into());
        self.entries.push(Arc::new(entry));
    }
}

fn minted_seq(id: &str) -> Option<u64> {
    id.strip_prefix('w')?.parse().ok()
}
