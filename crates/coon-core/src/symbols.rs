//! Category-partitioned, bidirectional symbol tables.
//!
//! Each category is an injective long↔short mapping. Violations are
//! reported at load time and abort the load.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::builtin;
use crate::error::ConfigError;
use crate::ident::is_identifier;

/// Symbol category. A long form is only ever looked up in its own category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Type,
    Property,
    Keyword,
    Literal,
}

impl Category {
    pub const ALL: [Category; 4] = [Self::Type, Self::Property, Self::Keyword, Self::Literal];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Property => "property",
            Self::Keyword => "keyword",
            Self::Literal => "literal",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(category, long, short)` record of a table file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub category: Category,
    pub long: String,
    pub short: String,
}

impl SymbolEntry {
    pub fn new(category: Category, long: impl Into<String>, short: impl Into<String>) -> Self {
        Self {
            category,
            long: long.into(),
            short: short.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TableFile {
    entries: Vec<SymbolEntry>,
}

/// A single category's mapping.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    category: Category,
    to_short: HashMap<String, String>,
    to_long: HashMap<String, String>,
}

impl SymbolTable {
    fn new(category: Category) -> Self {
        Self {
            category,
            to_short: HashMap::new(),
            to_long: HashMap::new(),
        }
    }

    fn insert(&mut self, long: &str, short: &str) -> Result<(), ConfigError> {
        if !is_identifier(short) {
            return Err(ConfigError::InvalidShortForm {
                category: self.category,
                short: short.to_string(),
            });
        }
        if long.is_empty() {
            return Err(ConfigError::EmptyLongForm {
                category: self.category,
                short: short.to_string(),
            });
        }
        if let Some(existing) = self.to_long.get(short) {
            return Err(ConfigError::DuplicateShortForm {
                category: self.category,
                short: short.to_string(),
                long: long.to_string(),
                existing: existing.clone(),
            });
        }
        if self.to_short.contains_key(long) {
            return Err(ConfigError::DuplicateLongForm {
                category: self.category,
                long: long.to_string(),
            });
        }
        self.to_short.insert(long.to_string(), short.to_string());
        self.to_long.insert(short.to_string(), long.to_string());
        Ok(())
    }

    fn check_prefixes(&self) -> Result<(), ConfigError> {
        let mut shorts: Vec<&str> = self.to_long.keys().map(String::as_str).collect();
        shorts.sort_unstable();
        for pair in shorts.windows(2) {
            if pair[1].starts_with(pair[0]) {
                return Err(ConfigError::ShortFormPrefixCollision {
                    category: self.category,
                    short: pair[0].to_string(),
                    other: pair[1].to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn short_for(&self, long: &str) -> Option<&str> {
        self.to_short.get(long).map(String::as_str)
    }

    pub fn long_for(&self, short: &str) -> Option<&str> {
        self.to_long.get(short).map(String::as_str)
    }

    pub fn has_short(&self, short: &str) -> bool {
        self.to_long.contains_key(short)
    }

    pub fn len(&self) -> usize {
        self.to_short.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_short.is_empty()
    }
}

/// The four tables, loaded together and immutable afterwards.
#[derive(Debug, Clone)]
pub struct SymbolTables {
    pub types: SymbolTable,
    pub properties: SymbolTable,
    pub keywords: SymbolTable,
    pub literals: SymbolTable,
}

impl SymbolTables {
    /// Tables with no entries: every name is written verbatim.
    pub fn empty() -> Self {
        Self {
            types: SymbolTable::new(Category::Type),
            properties: SymbolTable::new(Category::Property),
            keywords: SymbolTable::new(Category::Keyword),
            literals: SymbolTable::new(Category::Literal),
        }
    }

    /// Build and validate tables. The first violation aborts the whole load.
    pub fn from_entries<I>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = SymbolEntry>,
    {
        let mut tables = Self::empty();
        for entry in entries {
            tables
                .table_mut(entry.category)
                .insert(&entry.long, &entry.short)?;
        }
        for category in Category::ALL {
            tables.table(category).check_prefixes()?;
        }
        Ok(tables)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let file: TableFile = serde_json::from_str(json)?;
        Self::from_entries(file.entries)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let tables = Self::from_json(&content)?;
        tracing::info!(path = %path.display(), entries = tables.len(), "loaded symbol tables");
        Ok(tables)
    }

    /// Builtin Flutter vocabulary.
    pub fn builtin() -> &'static SymbolTables {
        &BUILTIN_TABLES
    }

    pub fn table(&self, category: Category) -> &SymbolTable {
        match category {
            Category::Type => &self.types,
            Category::Property => &self.properties,
            Category::Keyword => &self.keywords,
            Category::Literal => &self.literals,
        }
    }

    fn table_mut(&mut self, category: Category) -> &mut SymbolTable {
        match category {
            Category::Type => &mut self.types,
            Category::Property => &mut self.properties,
            Category::Keyword => &mut self.keywords,
            Category::Literal => &mut self.literals,
        }
    }

    /// All records, ordered by category then short form.
    pub fn entries(&self) -> Vec<SymbolEntry> {
        let mut out = Vec::with_capacity(self.len());
        for category in Category::ALL {
            let mut rows: Vec<SymbolEntry> = self
                .table(category)
                .to_short
                .iter()
                .map(|(long, short)| SymbolEntry::new(category, long.clone(), short.clone()))
                .collect();
            rows.sort_by(|a, b| a.short.cmp(&b.short));
            out.extend(rows);
        }
        out
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        let file = TableFile {
            entries: self.entries(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn len(&self) -> usize {
        Category::ALL.iter().map(|c| self.table(*c).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SymbolTables {
    fn default() -> Self {
        Self::empty()
    }
}

static BUILTIN_TABLES: LazyLock<SymbolTables> = LazyLock::new(|| {
    SymbolTables::from_entries(builtin::builtin_entries())
        .expect("builtin symbol tables are collision-free")
});
