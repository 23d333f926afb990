use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use coon_core::error::ConfigError;
use coon_core::ident::is_reference_id;
use coon_core::ir::WidgetNode;
use coon_core::shape::fingerprint;

use crate::buffer::RegistrationBuffer;
use crate::entry::{PatternEntry, PatternMeta};
use crate::snapshot::RegistrySnapshot;
use crate::store::{write_atomic, RegistryFile, REGISTRY_FILE_VERSION};

/// Append-only pattern registry.
///
/// Writers are serialised by one write guard and publish a fresh snapshot.
/// Readers keep whatever snapshot they took and never observe a partial
/// registration.
pub struct PatternRegistry {
    current: RwLock<Arc<RegistrySnapshot>>,
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(RegistrySnapshot::empty())),
        }
    }

    pub(crate) fn from_snapshot(snapshot: RegistrySnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Validates every entry and rejects duplicate ids or fingerprints.
    pub fn from_entries(entries: Vec<PatternEntry>) -> Result<Self, ConfigError> {
        let mut snapshot = RegistrySnapshot::empty();
        for entry in entries {
            entry.validate()?;
            if snapshot.contains_id(&entry.reference_id) {
                return Err(ConfigError::DuplicateReferenceId(entry.reference_id));
            }
            if let Some(first) = snapshot.lookup(&entry.fingerprint) {
                return Err(ConfigError::DuplicateFingerprint {
                    fingerprint: entry.fingerprint.clone(),
                    first: first.reference_id.clone(),
                    second: entry.reference_id,
                });
            }
            snapshot.push(entry);
        }
        Ok(Self::from_snapshot(snapshot))
    }

    /// Current published snapshot.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Register a subtree under a minted `w<n>` id. A subtree whose shape is
    /// already registered returns the existing id.
    pub fn register(&self, subtree: &WidgetNode) -> Result<String, ConfigError> {
        let mut guard = self.current.write();
        let fp = fingerprint(subtree);
        if let Some(existing) = guard.lookup(&fp) {
            return Ok(existing.reference_id.clone());
        }
        let mut next = RegistrySnapshot::clone(&guard);
        let id = next.mint_id();
        next.push(PatternEntry::new(id.clone(), subtree.clone()));
        *guard = Arc::new(next);
        tracing::info!(reference_id = %id, fingerprint = %fp, "pattern registered");
        Ok(id)
    }

    /// Register a subtree under a caller-chosen id.
    pub fn register_as(&self, reference_id: &str, subtree: &WidgetNode) -> Result<(), ConfigError> {
        self.register_with_meta(reference_id, subtree, PatternMeta::default())
    }

    pub fn register_with_meta(
        &self,
        reference_id: &str,
        subtree: &WidgetNode,
        meta: PatternMeta,
    ) -> Result<(), ConfigError> {
        if !is_reference_id(reference_id) {
            return Err(ConfigError::InvalidReferenceId(reference_id.to_string()));
        }
        let mut guard = self.current.write();
        if guard.contains_id(reference_id) {
            return Err(ConfigError::DuplicateReferenceId(reference_id.to_string()));
        }
        let entry = PatternEntry::new(reference_id, subtree.clone()).with_meta(meta);
        if let Some(first) = guard.lookup(&entry.fingerprint) {
            return Err(ConfigError::DuplicateFingerprint {
                fingerprint: entry.fingerprint.clone(),
                first: first.reference_id.clone(),
                second: reference_id.to_string(),
            });
        }
        let mut next = RegistrySnapshot::clone(&guard);
        tracing::info!(reference_id, fingerprint = %entry.fingerprint, "pattern registered");
        next.push(entry);
        *guard = Arc::new(next);
        Ok(())
    }

    /// Register every buffered pattern under one write guard; publishes a
    /// single snapshot. Returns the ids in buffer order.
    pub fn commit(&self, buffer: RegistrationBuffer) -> Result<Vec<String>, ConfigError> {
        if buffer.is_empty() {
            return Ok(Vec::new());
        }
        let mut guard = self.current.write();
        let mut next = RegistrySnapshot::clone(&guard);
        let mut ids = Vec::with_capacity(buffer.len());
        for subtree in buffer.into_patterns() {
            let fp = fingerprint(&subtree);
            if let Some(existing) = next.lookup(&fp) {
                ids.push(existing.reference_id.clone());
                continue;
            }
            let id = next.mint_id();
            next.push(PatternEntry::new(id.clone(), subtree));
            ids.push(id);
        }
        *guard = Arc::new(next);
        tracing::info!(committed = ids.len(), total = guard.len(), "registration buffer committed");
        Ok(ids)
    }

    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let file: RegistryFile = serde_json::from_slice(&bytes)?;
        if file.version != REGISTRY_FILE_VERSION {
            return Err(ConfigError::UnsupportedVersion(file.version));
        }
        let registry = Self::from_entries(file.entries)?;
        tracing::info!(path = %path.display(), entries = registry.len(), "pattern registry loaded");
        Ok(registry)
    }

    /// Load `path`, or start empty when the file does not exist yet.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!(path = %path.display(), "no pattern registry on disk, starting empty");
            Ok(Self::new())
        }
    }

    /// Persist the current snapshot atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let snapshot = self.snapshot();
        let file = RegistryFile {
            version: REGISTRY_FILE_VERSION,
            saved_at: Utc::now(),
            entries: snapshot.entries().cloned().collect(),
        };
        let bytes = serde_json::to_vec_pretty(&file)?;
        write_atomic(path, &bytes)?;
        tracing::info!(path = %path.display(), entries = file.entries.len(), "pattern registry saved");
        Ok(())
    }
}

impl Default for PatternRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PatternRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternRegistry")
            .field("entries", &self.len())
            .finish()
    }
}
