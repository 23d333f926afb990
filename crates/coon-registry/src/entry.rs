use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use coon_core::error::ConfigError;
use coon_core::ident::is_reference_id;
use coon_core::ir::WidgetNode;
use coon_core::shape::fingerprint;
use coon_core::slots::{slot_paths, SlotPath};

fn default_category() -> String {
    "general".into()
}

fn default_version() -> String {
    "1.0.0".into()
}

/// Descriptive metadata. Absent from older registry files, so every field
/// has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternMeta {
    pub name: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub version: String,
}

impl Default for PatternMeta {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            category: default_category(),
            tags: Vec::new(),
            version: default_version(),
        }
    }
}

impl PatternMeta {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// A registered widget pattern. The example supplies every value a
/// reference leaves empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternEntry {
    pub fingerprint: String,
    pub reference_id: String,
    pub parameter_slots: Vec<SlotPath>,
    pub example: WidgetNode,
    pub registered_at: DateTime<Utc>,
    #[serde(default)]
    pub meta: PatternMeta,
}

impl PatternEntry {
    pub fn new(reference_id: impl Into<String>, example: WidgetNode) -> Self {
        Self {
            fingerprint: fingerprint(&example),
            reference_id: reference_id.into(),
            parameter_slots: slot_paths(&example),
            example,
            registered_at: Utc::now(),
            meta: PatternMeta::default(),
        }
    }

    pub fn with_meta(mut self, meta: PatternMeta) -> Self {
        self.meta = meta;
        self
    }

    /// The metadata name, or the reference id when none was given.
    pub fn display_name(&self) -> &str {
        if self.meta.name.is_empty() {
            &self.reference_id
        } else {
            &self.meta.name
        }
    }

    /// Check the recorded id, slots and fingerprint against the example.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_reference_id(&self.reference_id) {
            return Err(ConfigError::InvalidReferenceId(self.reference_id.clone()));
        }
        if self.parameter_slots != slot_paths(&self.example) {
            return Err(ConfigError::SlotMismatch(self.reference_id.clone()));
        }
        let computed = fingerprint(&self.example);
        if computed != self.fingerprint {
            return Err(ConfigError::FingerprintMismatch {
                reference_id: self.reference_id.clone(),
                recorded: self.fingerprint.clone(),
                computed,
            });
        }
        Ok(())
    }

    pub fn arity(&self) -> usize {
        self.parameter_slots.len()
    }
}
