//! Structural IR for widget-tree declarations.
//!
//! Order of properties and children is significant everywhere. Trees are
//! single-owner, so a widget can never contain itself.

use serde::{Deserialize, Serialize};

/// Root of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrNode {
    Class(ClassDecl),
    Method(MethodDecl),
    Widget(WidgetNode),
    Literal(Literal),
    /// Several top-level items. Units do not nest.
    Unit(Vec<IrNode>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    #[serde(default)]
    pub super_type: Option<TypeRef>,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    #[serde(default)]
    pub modifiers: Vec<String>,
    pub name: String,
    #[serde(default)]
    pub type_ref: Option<TypeRef>,
    #[serde(default)]
    pub initializer: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDecl {
    #[serde(default)]
    pub modifiers: Vec<String>,
    pub name: String,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub return_type: Option<TypeRef>,
    pub body: MethodBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodBody {
    /// `build` style body returning a single widget.
    Widget(WidgetNode),
    Statements(Vec<Statement>),
}

/// A statement is a keyword prefix (`return`, `await`, ...) and an optional value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(default)]
    pub type_ref: Option<TypeRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    pub name: String,
    #[serde(default)]
    pub args: Vec<TypeRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetNode {
    pub type_name: String,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub children: Vec<WidgetNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Literal(Literal),
    /// Identifier or dotted identifier path (`emailController`, `Colors.blue`).
    Ident(String),
    /// Opaque expression text, carried verbatim.
    Expr(String),
    Widget(Box<WidgetNode>),
    List(Vec<Value>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteralKind {
    String,
    Number,
    Bool,
    Null,
}

impl LiteralKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::Null => "null",
        }
    }
}

/// `raw` is the unescaped content for strings and the source text otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Literal {
    pub kind: LiteralKind,
    pub raw: String,
}

impl Literal {
    pub fn new(kind: LiteralKind, raw: impl Into<String>) -> Self {
        Self {
            kind,
            raw: raw.into(),
        }
    }
}

// ========== Builders ==========

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: TypeRef) -> Self {
        self.args.push(arg);
        self
    }
}

impl WidgetNode {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            properties: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn prop(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.push(Property {
            key: key.into(),
            value,
        });
        self
    }

    pub fn child(mut self, child: WidgetNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|p| p.key == key)
            .map(|p| &p.value)
    }

    /// Widget nesting depth, counting widgets in value position.
    pub fn depth(&self) -> usize {
        let from_props = self
            .properties
            .iter()
            .map(|p| p.value.widget_depth())
            .max()
            .unwrap_or(0);
        let from_children = self.children.iter().map(|c| c.depth()).max().unwrap_or(0);
        1 + from_props.max(from_children)
    }

    /// Pre-order: self, widgets inside property values, then children.
    pub fn collect_widgets<'a>(&'a self, out: &mut Vec<&'a WidgetNode>) {
        out.push(self);
        for p in &self.properties {
            p.value.collect_widgets(out);
        }
        for c in &self.children {
            c.collect_widgets(out);
        }
    }

    fn count_nodes(&self) -> usize {
        1 + self
            .properties
            .iter()
            .map(|p| 1 + p.value.count_nodes())
            .sum::<usize>()
            + self.children.iter().map(|c| c.count_nodes()).sum::<usize>()
    }
}

impl Value {
    pub fn string(raw: impl Into<String>) -> Self {
        Self::Literal(Literal::new(LiteralKind::String, raw))
    }

    pub fn number(raw: impl Into<String>) -> Self {
        Self::Literal(Literal::new(LiteralKind::Number, raw))
    }

    pub fn boolean(value: bool) -> Self {
        Self::Literal(Literal::new(
            LiteralKind::Bool,
            if value { "true" } else { "false" },
        ))
    }

    pub fn null() -> Self {
        Self::Literal(Literal::new(LiteralKind::Null, "null"))
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Self::Ident(name.into())
    }

    pub fn expr(text: impl Into<String>) -> Self {
        Self::Expr(text.into())
    }

    pub fn widget(w: WidgetNode) -> Self {
        Self::Widget(Box::new(w))
    }

    /// Literal, identifier or expression: a leaf that can fill a slot.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Literal(_) | Self::Ident(_) | Self::Expr(_))
    }

    fn widget_depth(&self) -> usize {
        match self {
            Self::Widget(w) => w.depth(),
            Self::List(items) => items.iter().map(|v| v.widget_depth()).max().unwrap_or(0),
            _ => 0,
        }
    }

    fn collect_widgets<'a>(&'a self, out: &mut Vec<&'a WidgetNode>) {
        match self {
            Self::Widget(w) => w.collect_widgets(out),
            Self::List(items) => {
                for v in items {
                    v.collect_widgets(out);
                }
            }
            _ => {}
        }
    }

    fn count_nodes(&self) -> usize {
        match self {
            Self::Widget(w) => w.count_nodes(),
            Self::List(items) => 1 + items.iter().map(|v| v.count_nodes()).sum::<usize>(),
            _ => 1,
        }
    }
}

impl Statement {
    pub fn new(keywords: &[&str], value: Option<Value>) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            value,
        }
    }
}

// ========== Tree queries ==========

impl IrNode {
    /// Every widget subtree root in pre-order, including widgets in value position.
    pub fn widgets(&self) -> Vec<&WidgetNode> {
        let mut out = Vec::new();
        self.collect_widgets(&mut out);
        out
    }

    fn collect_widgets<'a>(&'a self, out: &mut Vec<&'a WidgetNode>) {
        match self {
            Self::Class(c) => {
                for f in &c.fields {
                    if let Some(v) = &f.initializer {
                        v.collect_widgets(out);
                    }
                }
                for m in &c.methods {
                    m.collect_widgets(out);
                }
            }
            Self::Method(m) => m.collect_widgets(out),
            Self::Widget(w) => w.collect_widgets(out),
            Self::Literal(_) => {}
            Self::Unit(items) => {
                for item in items {
                    item.collect_widgets(out);
                }
            }
        }
    }

    /// Structural node count: declarations, params, statements, widgets,
    /// properties and value leaves.
    pub fn node_count(&self) -> usize {
        match self {
            Self::Class(c) => {
                1 + c
                    .fields
                    .iter()
                    .map(|f| 1 + f.initializer.as_ref().map_or(0, |v| v.count_nodes()))
                    .sum::<usize>()
                    + c.methods.iter().map(|m| m.count_nodes()).sum::<usize>()
            }
            Self::Method(m) => m.count_nodes(),
            Self::Widget(w) => w.count_nodes(),
            Self::Literal(_) => 1,
            Self::Unit(items) => items.iter().map(|i| i.node_count()).sum(),
        }
    }

    /// Deepest widget nesting anywhere in the tree; 0 when there are no widgets.
    pub fn widget_depth(&self) -> usize {
        match self {
            Self::Class(c) => {
                let fields = c
                    .fields
                    .iter()
                    .filter_map(|f| f.initializer.as_ref())
                    .map(|v| v.widget_depth())
                    .max()
                    .unwrap_or(0);
                let methods = c.methods.iter().map(|m| m.widget_depth()).max().unwrap_or(0);
                fields.max(methods)
            }
            Self::Method(m) => m.widget_depth(),
            Self::Widget(w) => w.depth(),
            Self::Literal(_) => 0,
            Self::Unit(items) => items.iter().map(|i| i.widget_depth()).max().unwrap_or(0),
        }
    }
}

impl MethodDecl {
    fn collect_widgets<'a>(&'a self, out: &mut Vec<&'a WidgetNode>) {
        match &self.body {
            MethodBody::Widget(w) => w.collect_widgets(out),
            MethodBody::Statements(stmts) => {
                for s in stmts {
                    if let Some(v) = &s.value {
                        v.collect_widgets(out);
                    }
                }
            }
        }
    }

    fn count_nodes(&self) -> usize {
        let body = match &self.body {
            MethodBody::Widget(w) => w.count_nodes(),
            MethodBody::Statements(stmts) => stmts
                .iter()
                .map(|s| 1 + s.value.as_ref().map_or(0, |v| v.count_nodes()))
                .sum(),
        };
        1 + self.params.len() + body
    }

    fn widget_depth(&self) -> usize {
        match &self.body {
            MethodBody::Widget(w) => w.depth(),
            MethodBody::Statements(stmts) => stmts
                .iter()
                .filter_map(|s| s.value.as_ref())
                .map(|v| v.widget_depth())
                .max()
                .unwrap_or(0),
        }
    }
}
