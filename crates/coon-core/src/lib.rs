pub mod builtin;
pub mod config;
pub mod error;
pub mod ident;
pub mod ir;
pub mod shape;
pub mod slots;
pub mod symbols;

pub use config::{CodecConfig, Strategy, StrategyThresholds};
pub use error::{CoonError, ConfigError, EncodeError, ParseError, ParseErrorKind, Result};
pub use ir::{
    ClassDecl, FieldDecl, IrNode, Literal, LiteralKind, MethodBody, MethodDecl, Param, Property,
    Statement, TypeRef, Value, WidgetNode,
};
pub use shape::{fingerprint, similarity};
pub use slots::{slot_paths, PathStep, SlotPath};
pub use symbols::{Category, SymbolEntry, SymbolTable, SymbolTables};
