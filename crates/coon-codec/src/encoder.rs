//! IR to compact grammar.
//!
//! Substitution only ever happens on typed IR fields, so a short code can
//! never be produced by accident inside a string or an expression.

use coon_core::config::{CodecConfig, Strategy};
use coon_core::error::EncodeError;
use coon_core::ident::{is_ident_path, is_identifier};
use coon_core::ir::{
    ClassDecl, FieldDecl, IrNode, Literal, LiteralKind, MethodBody, MethodDecl, Statement, TypeRef,
    Value, WidgetNode,
};
use coon_core::shape::fingerprint;
use coon_core::slots::slot_value;
use coon_core::symbols::SymbolTables;
use coon_registry::{mine_repeated, PatternEntry, RegistrationBuffer, RegistrySnapshot};

use crate::decoder::DEFAULT_MAX_DEPTH;
use crate::document::CompressedDocument;
use crate::syntax::{
    is_number, quote, CLASS_PREFIX, EXPRESSION, FALSE, KEYWORD, KEYWORD_END, LITERAL_CODE,
    METHOD_PREFIX, NULL, REFERENCE, TRUE, UNIT_PREFIX, VERBATIM,
};

#[derive(Debug, Clone, PartialEq)]
pub struct EncodeOptions {
    /// 1.0 references exact structural matches only.
    pub similarity_threshold: f64,
    pub register_patterns: bool,
    pub min_pattern_tokens: usize,
    pub max_depth: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            similarity_threshold: 1.0,
            register_patterns: false,
            min_pattern_tokens: 6,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl From<&CodecConfig> for EncodeOptions {
    fn from(config: &CodecConfig) -> Self {
        Self {
            similarity_threshold: config.similarity_threshold,
            register_patterns: config.register_patterns,
            min_pattern_tokens: config.min_pattern_tokens,
            max_depth: config.max_depth,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Encoded {
    pub document: CompressedDocument,
    pub strategy: Strategy,
    /// Number of `@id(...)` references written.
    pub references: usize,
    /// Repeated subtrees found in registration mode, not yet committed.
    pub minted: RegistrationBuffer,
}

pub struct Encoder<'a> {
    tables: &'a SymbolTables,
    registry: &'a RegistrySnapshot,
    strategy: Strategy,
    options: EncodeOptions,
}

impl<'a> Encoder<'a> {
    pub fn new(tables: &'a SymbolTables, registry: &'a RegistrySnapshot, strategy: Strategy) -> Self {
        Self {
            tables,
            registry,
            strategy,
            options: EncodeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EncodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn encode(&self, ir: &IrNode) -> Result<Encoded, EncodeError> {
        let mut writer = Writer {
            enc: self,
            out: String::new(),
            references: 0,
            depth: 0,
        };
        writer.document(ir)?;

        let minted = if self.options.register_patterns {
            mine_repeated(ir, self.registry, self.options.min_pattern_tokens)
        } else {
            RegistrationBuffer::new()
        };
        tracing::debug!(
            strategy = %self.strategy,
            len = writer.out.len(),
            references = writer.references,
            minted = minted.len(),
            "document encoded"
        );
        Ok(Encoded {
            document: CompressedDocument::new(writer.out),
            strategy: self.strategy,
            references: writer.references,
            minted,
        })
    }

    fn match_pattern(&self, w: &WidgetNode) -> Option<&'a PatternEntry> {
        let registry = self.registry;
        if let Some(entry) = registry.lookup(&fingerprint(w)) {
            return Some(entry);
        }
        if self.options.similarity_threshold < 1.0 {
            return registry
                .find_similar(w, self.options.similarity_threshold)
                .map(|(entry, _)| entry);
        }
        None
    }
}

/// Encode `ir` with an explicit strategy against one registry snapshot.
pub fn encode(
    ir: &IrNode,
    strategy: Strategy,
    tables: &SymbolTables,
    snapshot: &RegistrySnapshot,
    options: &EncodeOptions,
) -> Result<Encoded, EncodeError> {
    Encoder::new(tables, snapshot, strategy)
        .with_options(options.clone())
        .encode(ir)
}

fn identifier<'s>(context: &'static str, name: &'s str) -> Result<&'s str, EncodeError> {
    if is_identifier(name) {
        Ok(name)
    } else {
        Err(EncodeError::InvalidIdentifier {
            context,
            value: name.to_string(),
        })
    }
}

struct Writer<'e, 'a> {
    enc: &'e Encoder<'a>,
    out: String,
    references: usize,
    depth: usize,
}

impl Writer<'_, '_> {
    fn newline(&mut self) {
        if !self.enc.strategy.elides_whitespace() {
            self.out.push('\n');
        }
    }

    fn document(&mut self, ir: &IrNode) -> Result<(), EncodeError> {
        match ir {
            IrNode::Unit(items) if items.is_empty() => Ok(()),
            IrNode::Unit(items) => {
                self.out.push_str(UNIT_PREFIX);
                self.out.push(':');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.out.push('|');
                        self.newline();
                    }
                    self.item(item)?;
                }
                Ok(())
            }
            other => self.item(other),
        }
    }

    fn item(&mut self, ir: &IrNode) -> Result<(), EncodeError> {
        match ir {
            IrNode::Class(c) => self.class(c),
            IrNode::Method(m) => {
                self.out.push_str(METHOD_PREFIX);
                self.out.push(':');
                self.method(m)
            }
            IrNode::Widget(w) => self.widgetish(w),
            IrNode::Literal(l) => self.literal(l),
            IrNode::Unit(_) => Err(EncodeError::NestedUnit),
        }
    }

    // ========== Declarations ==========

    fn class(&mut self, c: &ClassDecl) -> Result<(), EncodeError> {
        let name = identifier("class", &c.name)?;
        self.out.push_str(CLASS_PREFIX);
        self.out.push(':');
        self.out.push_str(name);
        if let Some(t) = &c.super_type {
            self.out.push('<');
            self.type_ref(t)?;
            self.out.push('>');
        }
        self.out.push(';');
        self.newline();
        for (i, f) in c.fields.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
                self.newline();
            }
            self.field(f)?;
        }
        self.out.push(';');
        self.newline();
        for (i, m) in c.methods.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
                self.newline();
            }
            self.method(m)?;
        }
        Ok(())
    }

    fn field(&mut self, f: &FieldDecl) -> Result<(), EncodeError> {
        for m in &f.modifiers {
            self.keyword(m)?;
        }
        self.out.push_str(identifier("field", &f.name)?);
        if let Some(t) = &f.type_ref {
            self.out.push(':');
            self.type_ref(t)?;
        }
        if let Some(v) = &f.initializer {
            self.out.push('=');
            self.value(v)?;
        }
        Ok(())
    }

    fn method(&mut self, m: &MethodDecl) -> Result<(), EncodeError> {
        for k in &m.modifiers {
            self.keyword(k)?;
        }
        self.out.push_str(identifier("method", &m.name)?);
        self.out.push('(');
        for (i, p) in m.params.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.out.push_str(identifier("parameter", &p.name)?);
            if let Some(t) = &p.type_ref {
                self.out.push(':');
                self.type_ref(t)?;
            }
        }
        self.out.push(')');
        if let Some(t) = &m.return_type {
            self.out.push(':');
            self.type_ref(t)?;
        }
        match &m.body {
            MethodBody::Widget(w) => {
                self.out.push('=');
                self.widgetish(w)
            }
            MethodBody::Statements(stmts) => {
                self.out.push('{');
                for (i, s) in stmts.iter().enumerate() {
                    if i > 0 {
                        self.out.push(';');
                    }
                    self.statement(s)?;
                }
                self.out.push('}');
                Ok(())
            }
        }
    }

    fn statement(&mut self, s: &Statement) -> Result<(), EncodeError> {
        if s.keywords.is_empty() && s.value.is_none() {
            return Err(EncodeError::EmptyStatement);
        }
        for k in &s.keywords {
            self.keyword(k)?;
        }
        if let Some(v) = &s.value {
            self.value(v)?;
        }
        Ok(())
    }

    fn keyword(&mut self, kw: &str) -> Result<(), EncodeError> {
        let tables = self.enc.tables;
        self.out.push(KEYWORD);
        match tables.keywords.short_for(kw) {
            Some(short) => self.out.push_str(short),
            None => {
                self.out.push(VERBATIM);
                self.out.push_str(identifier("keyword", kw)?);
            }
        }
        self.out.push(KEYWORD_END);
        Ok(())
    }

    fn type_ref(&mut self, t: &TypeRef) -> Result<(), EncodeError> {
        self.type_code(&t.name)?;
        if t.args.is_empty() {
            return Ok(());
        }
        self.nested(|w| {
            w.out.push('<');
            for (i, a) in t.args.iter().enumerate() {
                if i > 0 {
                    w.out.push(',');
                }
                w.type_ref(a)?;
            }
            w.out.push('>');
            Ok(())
        })
    }

    fn type_code(&mut self, name: &str) -> Result<(), EncodeError> {
        let tables = self.enc.tables;
        match tables.types.short_for(name) {
            Some(short) => self.out.push_str(short),
            None => {
                self.out.push(VERBATIM);
                self.out.push_str(identifier("type", name)?);
            }
        }
        Ok(())
    }

    // ========== Widgets ==========

    /// One nesting level: a widget, a list or a type argument list.
    fn nested(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<(), EncodeError>,
    ) -> Result<(), EncodeError> {
        if self.depth >= self.enc.options.max_depth {
            return Err(EncodeError::DepthLimitExceeded(self.enc.options.max_depth));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn widgetish(&mut self, w: &WidgetNode) -> Result<(), EncodeError> {
        self.nested(|this| {
            if this.enc.strategy.uses_patterns() {
                if let Some(entry) = this.enc.match_pattern(w) {
                    return this.reference(entry, w);
                }
            }
            this.widget(w)
        })
    }

    fn widget(&mut self, w: &WidgetNode) -> Result<(), EncodeError> {
        self.type_code(&w.type_name)?;
        self.out.push('{');
        for (i, p) in w.properties.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.property_key(&p.key)?;
            self.out.push(':');
            self.value(&p.value)?;
        }
        self.out.push('}');
        if !w.children.is_empty() {
            self.out.push('[');
            for (i, c) in w.children.iter().enumerate() {
                if i > 0 {
                    self.out.push(',');
                }
                self.widgetish(c)?;
            }
            self.out.push(']');
        }
        Ok(())
    }

    fn property_key(&mut self, key: &str) -> Result<(), EncodeError> {
        let tables = self.enc.tables;
        let props = &tables.properties;
        match props.short_for(key) {
            Some(short) => self.out.push_str(short),
            None => {
                let key = identifier("property", key)?;
                if props.has_short(key) {
                    self.out.push(VERBATIM);
                }
                self.out.push_str(key);
            }
        }
        Ok(())
    }

    /// `@id(args)`: one positional argument per slot, empty where the
    /// subtree agrees with the stored example.
    fn reference(&mut self, entry: &PatternEntry, w: &WidgetNode) -> Result<(), EncodeError> {
        let mut args: Vec<Option<&Value>> = entry
            .parameter_slots
            .iter()
            .map(|path| match slot_value(w, path) {
                Some(v) if v.is_scalar() && slot_value(&entry.example, path) != Some(v) => Some(v),
                _ => None,
            })
            .collect();
        while matches!(args.last(), Some(None)) {
            args.pop();
        }

        self.out.push(REFERENCE);
        self.out.push_str(&entry.reference_id);
        self.out.push('(');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            if let Some(v) = arg {
                self.value(v)?;
            }
        }
        self.out.push(')');
        self.references += 1;
        Ok(())
    }

    // ========== Values ==========

    fn value(&mut self, v: &Value) -> Result<(), EncodeError> {
        let folds = self.enc.strategy.folds_literals();
        let tables = self.enc.tables;
        let literals = &tables.literals;
        match v {
            Value::Literal(l) => self.literal(l),
            Value::Ident(name) => {
                if !is_ident_path(name) {
                    return Err(EncodeError::InvalidIdentifier {
                        context: "value",
                        value: name.clone(),
                    });
                }
                match literals.short_for(name).filter(|_| folds) {
                    Some(code) => {
                        self.out.push(LITERAL_CODE);
                        self.out.push_str(code);
                    }
                    None => self.out.push_str(name),
                }
                Ok(())
            }
            Value::Expr(text) => {
                match literals.short_for(text).filter(|_| folds && !is_ident_path(text)) {
                    Some(code) => {
                        self.out.push(LITERAL_CODE);
                        self.out.push_str(code);
                    }
                    None => {
                        self.out.push(EXPRESSION);
                        self.out.push_str(&quote(text));
                    }
                }
                Ok(())
            }
            Value::Widget(w) => self.widgetish(w),
            Value::List(items) => self.nested(|w| {
                w.out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        w.out.push(',');
                    }
                    w.value(item)?;
                }
                w.out.push(']');
                Ok(())
            }),
        }
    }

    fn literal(&mut self, l: &Literal) -> Result<(), EncodeError> {
        match l.kind {
            LiteralKind::String => self.out.push_str(&quote(&l.raw)),
            LiteralKind::Number => {
                if !is_number(&l.raw) {
                    return Err(EncodeError::InvalidNumber(l.raw.clone()));
                }
                self.out.push_str(&l.raw);
            }
            LiteralKind::Bool => match l.raw.as_str() {
                "true" => self.out.push_str(TRUE),
                "false" => self.out.push_str(FALSE),
                _ => {
                    return Err(EncodeError::InvalidLiteral {
                        kind: "bool",
                        raw: l.raw.clone(),
                    })
                }
            },
            LiteralKind::Null => {
                if l.raw != "null" {
                    return Err(EncodeError::InvalidLiteral {
                        kind: "null",
                        raw: l.raw.clone(),
                    });
                }
                self.out.push_str(NULL);
            }
        }
        Ok(())
    }
}
