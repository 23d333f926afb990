//! COON codec: compact, reversible notation for widget-tree UI code.
//!
//! Pieces:
//! 1. Syntax helpers shared by both directions (sigils, escaping, numbers)
//! 2. Encoder: IR to compact grammar, with typed symbol substitution and pattern references
//! 3. Decoder: compact grammar back to IR
//! 4. Validator: round trip, idempotence and source equivalence checks
//! 5. Dart emitter: reference source rendering of IR
//! 6. Codec: tables, registry and configuration behind one handle

pub mod decoder;
pub mod document;
pub mod emit;
pub mod encoder;
pub mod pipeline;
pub mod syntax;
pub mod validator;

pub use coon_core::{CodecConfig, IrNode, ParseError, ParseErrorKind, Strategy, SymbolTables};
pub use coon_registry::{PatternRegistry, RegistrySnapshot};
pub use decoder::{decode, DecodeState, Decoder};
pub use document::CompressedDocument;
pub use emit::DartEmitter;
pub use encoder::{encode, EncodeOptions, Encoded, Encoder};
pub use pipeline::{Codec, CompressionResult};
pub use validator::{
    compare_source, BatchValidation, DiffKind, SourceComparison, StructuralDiff, ValidationResult,
    Validator,
};

#[cfg(test)]
mod tests;
