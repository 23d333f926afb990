//! Round-trip validation: encode, decode, compare.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use coon_core::config::Strategy;
use coon_core::error::EncodeError;
use coon_core::ir::{
    ClassDecl, FieldDecl, IrNode, MethodBody, MethodDecl, TypeRef, Value, WidgetNode,
};
use coon_core::shape::{ir_tokens, similarity};
use coon_core::symbols::SymbolTables;
use coon_registry::RegistrySnapshot;
use coon_strategy::StrategySelector;

use crate::decoder::Decoder;
use crate::document::CompressedDocument;
use crate::emit::DartEmitter;
use crate::encoder::{EncodeOptions, Encoder};

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    /// Different IR node or value variants.
    VariantMismatch { expected: String, actual: String },
    TypeMismatch { expected: String, actual: String },
    NameMismatch { expected: String, actual: String },
    PropertyKeyMismatch { expected: String, actual: String },
    ValueMismatch { expected: String, actual: String },
    CountMismatch { expected: usize, actual: usize },
    /// The encoder produced a document the decoder rejected.
    Undecodable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuralDiff {
    /// Location in the original tree, e.g. `root.children[1].properties[0]`.
    pub path: String,
    pub kind: DiffKind,
}

impl fmt::Display for StructuralDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiffKind::VariantMismatch { expected, actual }
            | DiffKind::TypeMismatch { expected, actual }
            | DiffKind::NameMismatch { expected, actual }
            | DiffKind::PropertyKeyMismatch { expected, actual }
            | DiffKind::ValueMismatch { expected, actual } => {
                write!(f, "{}: expected {expected}, got {actual}", self.path)
            }
            DiffKind::CountMismatch { expected, actual } => {
                write!(f, "{}: expected {expected} items, got {actual}", self.path)
            }
            DiffKind::Undecodable(e) => write!(f, "{}: {e}", self.path),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub reversible: bool,
    pub idempotent: bool,
    pub source_equivalent: bool,
    /// Token-level similarity of original and decoded tree, in [0, 1].
    pub similarity: f64,
    pub diffs: Vec<StructuralDiff>,
    pub strategy: Strategy,
    pub document: CompressedDocument,
}

/// Outcome of validating many trees with one validator.
#[derive(Debug, Clone, Serialize)]
pub struct BatchValidation {
    /// Trees that round-tripped without structural differences.
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<ValidationResult>,
    /// Input index and encoder error for trees that could not be encoded.
    pub rejected: Vec<(usize, String)>,
}

impl BatchValidation {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SourceComparison {
    pub equivalent: bool,
    pub similarity: f64,
}

/// Compare two source texts modulo whitespace.
pub fn compare_source(a: &str, b: &str) -> SourceComparison {
    let na = WHITESPACE.replace_all(a.trim(), " ");
    let nb = WHITESPACE.replace_all(b.trim(), " ");
    if na == nb {
        return SourceComparison {
            equivalent: true,
            similarity: 1.0,
        };
    }
    let ta: Vec<&str> = na.split(' ').collect();
    let tb: Vec<&str> = nb.split(' ').collect();
    SourceComparison {
        equivalent: false,
        similarity: similarity(&ta, &tb),
    }
}

pub struct Validator<'a> {
    tables: &'a SymbolTables,
    registry: &'a RegistrySnapshot,
    /// Fixed strategy; chosen by the selector when unset.
    strategy: Option<Strategy>,
    selector: StrategySelector,
    options: EncodeOptions,
}

impl<'a> Validator<'a> {
    pub fn new(tables: &'a SymbolTables, registry: &'a RegistrySnapshot) -> Self {
        Self {
            tables,
            registry,
            strategy: None,
            selector: StrategySelector::default(),
            options: EncodeOptions::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_selector(mut self, selector: StrategySelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_options(mut self, options: EncodeOptions) -> Self {
        // Validation never mints patterns.
        self.options = EncodeOptions {
            register_patterns: false,
            ..options
        };
        self
    }

    pub fn validate(&self, original: &IrNode) -> Result<ValidationResult, EncodeError> {
        let strategy = self
            .strategy
            .unwrap_or_else(|| self.selector.select(original, self.registry).strategy);
        let encoder = Encoder::new(self.tables, self.registry, strategy)
            .with_options(self.options.clone());
        let document = encoder.encode(original)?.document;

        let decoded = match Decoder::new(self.tables, self.registry)
            .with_max_depth(self.options.max_depth)
            .decode(document.as_str())
        {
            Ok(ir) => ir,
            Err(e) => {
                tracing::warn!(strategy = %strategy, error = %e, "encoded document does not decode");
                return Ok(ValidationResult {
                    reversible: false,
                    idempotent: false,
                    source_equivalent: false,
                    similarity: 0.0,
                    diffs: vec![StructuralDiff {
                        path: "root".into(),
                        kind: DiffKind::Undecodable(e.to_string()),
                    }],
                    strategy,
                    document,
                });
            }
        };

        let diffs = diff(original, &decoded);
        let similarity = similarity(&ir_tokens(original), &ir_tokens(&decoded));
        let idempotent = encoder
            .encode(&decoded)
            .is_ok_and(|again| again.document == document);
        let emitter = DartEmitter::default();
        let source_equivalent =
            compare_source(&emitter.emit(original), &emitter.emit(&decoded)).equivalent;

        let reversible = diffs.is_empty();
        if !reversible {
            tracing::warn!(
                strategy = %strategy,
                diffs = diffs.len(),
                first = %diffs[0],
                similarity,
                "round trip is not reversible"
            );
        }
        Ok(ValidationResult {
            reversible,
            idempotent,
            source_equivalent,
            similarity,
            diffs,
            strategy,
            document,
        })
    }

    /// Validate each tree in turn. An encoder rejection counts as a failure
    /// and does not stop the batch.
    pub fn validate_batch<'t>(&self, trees: impl IntoIterator<Item = &'t IrNode>) -> BatchValidation {
        let mut batch = BatchValidation {
            passed: 0,
            failed: 0,
            results: Vec::new(),
            rejected: Vec::new(),
        };
        for (index, tree) in trees.into_iter().enumerate() {
            match self.validate(tree) {
                Ok(result) => {
                    if result.reversible {
                        batch.passed += 1;
                    } else {
                        batch.failed += 1;
                    }
                    batch.results.push(result);
                }
                Err(e) => {
                    batch.failed += 1;
                    batch.rejected.push((index, e.to_string()));
                }
            }
        }
        tracing::info!(passed = batch.passed, failed = batch.failed, "batch validated");
        batch
    }
}

/// Order-sensitive structural differences between two trees.
pub fn diff(expected: &IrNode, actual: &IrNode) -> Vec<StructuralDiff> {
    let mut d = Differ { out: Vec::new() };
    d.node("root", expected, actual);
    d.out
}

fn variant(node: &IrNode) -> &'static str {
    match node {
        IrNode::Class(_) => "class",
        IrNode::Method(_) => "method",
        IrNode::Widget(_) => "widget",
        IrNode::Literal(_) => "literal",
        IrNode::Unit(_) => "unit",
    }
}

fn value_variant(v: &Value) -> &'static str {
    match v {
        Value::Literal(_) => "literal",
        Value::Ident(_) => "ident",
        Value::Expr(_) => "expr",
        Value::Widget(_) => "widget",
        Value::List(_) => "list",
    }
}

struct Differ {
    out: Vec<StructuralDiff>,
}

impl Differ {
    fn push(&mut self, path: &str, kind: DiffKind) {
        self.out.push(StructuralDiff {
            path: path.to_string(),
            kind,
        });
    }

    fn names(&mut self, path: &str, expected: &str, actual: &str) {
        if expected != actual {
            self.push(
                path,
                DiffKind::NameMismatch {
                    expected: expected.into(),
                    actual: actual.into(),
                },
            );
        }
    }

    /// Compare lengths; `false` when they differ and the elements were not compared.
    fn counts(&mut self, path: &str, expected: usize, actual: usize) -> bool {
        if expected != actual {
            self.push(path, DiffKind::CountMismatch { expected, actual });
            return false;
        }
        true
    }

    fn node(&mut self, path: &str, a: &IrNode, b: &IrNode) {
        match (a, b) {
            (IrNode::Class(x), IrNode::Class(y)) => self.class(path, x, y),
            (IrNode::Method(x), IrNode::Method(y)) => self.method(path, x, y),
            (IrNode::Widget(x), IrNode::Widget(y)) => self.widget(path, x, y),
            (IrNode::Literal(x), IrNode::Literal(y)) => {
                self.value(path, &Value::Literal(x.clone()), &Value::Literal(y.clone()))
            }
            (IrNode::Unit(x), IrNode::Unit(y)) => {
                if self.counts(path, x.len(), y.len()) {
                    for (i, (a, b)) in x.iter().zip(y).enumerate() {
                        self.node(&format!("{path}[{i}]"), a, b);
                    }
                }
            }
            _ => self.push(
                path,
                DiffKind::VariantMismatch {
                    expected: variant(a).into(),
                    actual: variant(b).into(),
                },
            ),
        }
    }

    fn type_ref(&mut self, path: &str, a: Option<&TypeRef>, b: Option<&TypeRef>) {
        if a != b {
            let show = |t: Option<&TypeRef>| t.map_or_else(|| "none".to_string(), |t| t.name.clone());
            self.push(
                path,
                DiffKind::TypeMismatch {
                    expected: show(a),
                    actual: show(b),
                },
            );
        }
    }

    fn class(&mut self, path: &str, a: &ClassDecl, b: &ClassDecl) {
        self.names(&format!("{path}.name"), &a.name, &b.name);
        self.type_ref(
            &format!("{path}.extends"),
            a.super_type.as_ref(),
            b.super_type.as_ref(),
        );
        let fields = format!("{path}.fields");
        if self.counts(&fields, a.fields.len(), b.fields.len()) {
            for (i, (x, y)) in a.fields.iter().zip(&b.fields).enumerate() {
                self.field(&format!("{fields}[{i}]"), x, y);
            }
        }
        let methods = format!("{path}.methods");
        if self.counts(&methods, a.methods.len(), b.methods.len()) {
            for (i, (x, y)) in a.methods.iter().zip(&b.methods).enumerate() {
                self.method(&format!("{methods}[{i}]"), x, y);
            }
        }
    }

    fn modifiers(&mut self, path: &str, a: &[String], b: &[String]) {
        if a != b {
            self.push(
                path,
                DiffKind::NameMismatch {
                    expected: a.join(" "),
                    actual: b.join(" "),
                },
            );
        }
    }

    fn field(&mut self, path: &str, a: &FieldDecl, b: &FieldDecl) {
        self.modifiers(&format!("{path}.modifiers"), &a.modifiers, &b.modifiers);
        self.names(&format!("{path}.name"), &a.name, &b.name);
        self.type_ref(&format!("{path}.type"), a.type_ref.as_ref(), b.type_ref.as_ref());
        let init = format!("{path}.initializer");
        match (&a.initializer, &b.initializer) {
            (Some(x), Some(y)) => self.value(&init, x, y),
            (None, None) => {}
            (x, y) => self.push(
                &init,
                DiffKind::CountMismatch {
                    expected: usize::from(x.is_some()),
                    actual: usize::from(y.is_some()),
                },
            ),
        }
    }

    fn method(&mut self, path: &str, a: &MethodDecl, b: &MethodDecl) {
        self.modifiers(&format!("{path}.modifiers"), &a.modifiers, &b.modifiers);
        self.names(&format!("{path}.name"), &a.name, &b.name);
        let params = format!("{path}.params");
        if self.counts(&params, a.params.len(), b.params.len()) {
            for (i, (x, y)) in a.params.iter().zip(&b.params).enumerate() {
                let p = format!("{params}[{i}]");
                self.names(&p, &x.name, &y.name);
                self.type_ref(&p, x.type_ref.as_ref(), y.type_ref.as_ref());
            }
        }
        self.type_ref(
            &format!("{path}.returns"),
            a.return_type.as_ref(),
            b.return_type.as_ref(),
        );
        let body = format!("{path}.body");
        match (&a.body, &b.body) {
            (MethodBody::Widget(x), MethodBody::Widget(y)) => self.widget(&body, x, y),
            (MethodBody::Statements(x), MethodBody::Statements(y)) => {
                if self.counts(&body, x.len(), y.len()) {
                    for (i, (s, t)) in x.iter().zip(y).enumerate() {
                        let p = format!("{body}[{i}]");
                        self.modifiers(&p, &s.keywords, &t.keywords);
                        match (&s.value, &t.value) {
                            (Some(v), Some(w)) => self.value(&p, v, w),
                            (None, None) => {}
                            (v, w) => self.push(
                                &p,
                                DiffKind::CountMismatch {
                                    expected: usize::from(v.is_some()),
                                    actual: usize::from(w.is_some()),
                                },
                            ),
                        }
                    }
                }
            }
            _ => self.push(
                &body,
                DiffKind::VariantMismatch {
                    expected: "body".into(),
                    actual: "other body".into(),
                },
            ),
        }
    }

    fn widget(&mut self, path: &str, a: &WidgetNode, b: &WidgetNode) {
        if a.type_name != b.type_name {
            self.push(
                path,
                DiffKind::TypeMismatch {
                    expected: a.type_name.clone(),
                    actual: b.type_name.clone(),
                },
            );
            return;
        }
        let props = format!("{path}.properties");
        if self.counts(&props, a.properties.len(), b.properties.len()) {
            for (i, (x, y)) in a.properties.iter().zip(&b.properties).enumerate() {
                let p = format!("{props}[{i}]");
                if x.key != y.key {
                    self.push(
                        &p,
                        DiffKind::PropertyKeyMismatch {
                            expected: x.key.clone(),
                            actual: y.key.clone(),
                        },
                    );
                    continue;
                }
                self.value(&format!("{props}.{}", x.key), &x.value, &y.value);
            }
        }
        let children = format!("{path}.children");
        if self.counts(&children, a.children.len(), b.children.len()) {
            for (i, (x, y)) in a.children.iter().zip(&b.children).enumerate() {
                self.widget(&format!("{children}[{i}]"), x, y);
            }
        }
    }

    fn value(&mut self, path: &str, a: &Value, b: &Value) {
        match (a, b) {
            (Value::Widget(x), Value::Widget(y)) => self.widget(path, x, y),
            (Value::List(x), Value::List(y)) => {
                if self.counts(path, x.len(), y.len()) {
                    for (i, (v, w)) in x.iter().zip(y).enumerate() {
                        self.value(&format!("{path}[{i}]"), v, w);
                    }
                }
            }
            (Value::Literal(x), Value::Literal(y)) => {
                if x != y {
                    self.push(
                        path,
                        DiffKind::ValueMismatch {
                            expected: format!("{}:{}", x.kind.as_str(), x.raw),
                            actual: format!("{}:{}", y.kind.as_str(), y.raw),
                        },
                    );
                }
            }
            (Value::Ident(x), Value::Ident(y)) | (Value::Expr(x), Value::Expr(y)) => {
                if x != y {
                    self.push(
                        path,
                        DiffKind::ValueMismatch {
                            expected: x.clone(),
                            actual: y.clone(),
                        },
                    );
                }
            }
            _ => self.push(
                path,
                DiffKind::VariantMismatch {
                    expected: value_variant(a).into(),
                    actual: value_variant(b).into(),
                },
            ),
        }
    }
}
