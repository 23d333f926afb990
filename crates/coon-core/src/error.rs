use std::fmt;

use thiserror::Error;

use crate::symbols::Category;

/// Load-time failures. Fatal: tables and registries are never half-loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Duplicate {category} short form '{short}' for '{long}' (already used by '{existing}')")]
    DuplicateShortForm {
        category: Category,
        short: String,
        long: String,
        existing: String,
    },
    #[error("Duplicate {category} long form '{long}'")]
    DuplicateLongForm { category: Category, long: String },
    #[error("{category} short form '{short}' is a prefix of '{other}'")]
    ShortFormPrefixCollision {
        category: Category,
        short: String,
        other: String,
    },
    #[error("Invalid {category} short form '{short}'")]
    InvalidShortForm { category: Category, short: String },
    #[error("Empty {category} long form for short form '{short}'")]
    EmptyLongForm { category: Category, short: String },
    #[error("Duplicate reference id: {0}")]
    DuplicateReferenceId(String),
    #[error("Invalid reference id: {0:?}")]
    InvalidReferenceId(String),
    #[error("Fingerprint mismatch for '{reference_id}': recorded {recorded}, computed {computed}")]
    FingerprintMismatch {
        reference_id: String,
        recorded: String,
        computed: String,
    },
    #[error("Parameter slots of '{0}' do not match its example subtree")]
    SlotMismatch(String),
    #[error("Fingerprint {fingerprint} registered twice ('{first}' and '{second}')")]
    DuplicateFingerprint {
        fingerprint: String,
        first: String,
        second: String,
    },
    #[error("Unsupported registry file version: {0}")]
    UnsupportedVersion(u32),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Kinds of compact-grammar decode failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    UnterminatedString,
    UnbalancedBracket,
    UnknownShortCode,
    UnknownReferenceId,
    UnexpectedToken,
    InvalidEscape,
    ArityMismatch,
    DepthLimitExceeded,
}

impl ParseErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnterminatedString => "unterminated string",
            Self::UnbalancedBracket => "unbalanced bracket",
            Self::UnknownShortCode => "unknown short code",
            Self::UnknownReferenceId => "unknown reference id",
            Self::UnexpectedToken => "unexpected token",
            Self::InvalidEscape => "invalid escape",
            Self::ArityMismatch => "argument count mismatch",
            Self::DepthLimitExceeded => "nesting too deep",
        }
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A malformed compact document. Carries the byte offset where decoding stopped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at byte {position}: {detail}")]
pub struct ParseError {
    pub position: usize,
    pub kind: ParseErrorKind,
    pub detail: String,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, position: usize, detail: impl Into<String>) -> Self {
        Self {
            position,
            kind,
            detail: detail.into(),
        }
    }
}

/// IR that violates the shape the encoder can express.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Invalid {context} identifier: {value:?}")]
    InvalidIdentifier { context: &'static str, value: String },
    #[error("Invalid number literal: {0:?}")]
    InvalidNumber(String),
    #[error("Invalid {kind} literal: {raw:?}")]
    InvalidLiteral { kind: &'static str, raw: String },
    #[error("Units cannot be nested")]
    NestedUnit,
    #[error("Statement has neither keywords nor a value")]
    EmptyStatement,
    #[error("Nesting exceeds depth limit {0}")]
    DepthLimitExceeded(usize),
}

#[derive(Error, Debug)]
pub enum CoonError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CoonError>;
