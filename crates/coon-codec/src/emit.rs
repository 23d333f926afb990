//! Reference Dart source rendering of IR.
//!
//! Output is formatted for reading and for whitespace-insensitive
//! comparison, not for byte-identical reconstruction of any input.

use coon_core::ir::{
    ClassDecl, FieldDecl, IrNode, Literal, LiteralKind, MethodBody, MethodDecl, Statement,
    TypeRef, Value, WidgetNode,
};

const OVERRIDE: &str = "override";

#[derive(Debug, Clone)]
pub struct DartEmitter {
    /// Spaces per nesting level.
    pub indent: usize,
}

impl Default for DartEmitter {
    fn default() -> Self {
        Self { indent: 2 }
    }
}

/// `$0`, `$1`, ... keys hold positional constructor arguments.
pub fn is_positional(key: &str) -> bool {
    key.strip_prefix('$')
        .is_some_and(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
}

/// Double-quoted Dart string literal.
pub fn dart_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '$' => out.push_str("\\$"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl DartEmitter {
    pub fn new(indent: usize) -> Self {
        Self { indent }
    }

    pub fn emit(&self, ir: &IrNode) -> String {
        let mut out = String::new();
        self.node(ir, 0, &mut out);
        out
    }

    pub fn emit_widget(&self, w: &WidgetNode) -> String {
        let mut out = String::new();
        self.widget(w, 0, &mut out);
        out
    }

    fn pad(&self, level: usize, out: &mut String) {
        out.extend(std::iter::repeat(' ').take(self.indent * level));
    }

    fn node(&self, ir: &IrNode, level: usize, out: &mut String) {
        match ir {
            IrNode::Class(c) => self.class(c, level, out),
            IrNode::Method(m) => self.method(m, level, out),
            IrNode::Widget(w) => self.widget(w, level, out),
            IrNode::Literal(l) => out.push_str(&literal(l)),
            IrNode::Unit(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str("\n\n");
                    }
                    self.node(item, level, out);
                }
            }
        }
    }

    fn class(&self, c: &ClassDecl, level: usize, out: &mut String) {
        self.pad(level, out);
        out.push_str("class ");
        out.push_str(&c.name);
        if let Some(t) = &c.super_type {
            out.push_str(" extends ");
            out.push_str(&type_ref(t));
        }
        out.push_str(" {\n");
        for f in &c.fields {
            self.field(f, level + 1, out);
        }
        for (i, m) in c.methods.iter().enumerate() {
            if i > 0 || !c.fields.is_empty() {
                out.push('\n');
            }
            self.method(m, level + 1, out);
            out.push('\n');
        }
        self.pad(level, out);
        out.push('}');
    }

    /// `@override` on its own line, the remaining modifiers inline.
    fn modifiers(&self, modifiers: &[String], level: usize, out: &mut String) {
        if modifiers.iter().any(|m| m == OVERRIDE) {
            self.pad(level, out);
            out.push_str("@override\n");
        }
        self.pad(level, out);
        for m in modifiers.iter().filter(|m| *m != OVERRIDE) {
            out.push_str(m);
            out.push(' ');
        }
    }

    fn field(&self, f: &FieldDecl, level: usize, out: &mut String) {
        self.modifiers(&f.modifiers, level, out);
        match &f.type_ref {
            Some(t) => {
                out.push_str(&type_ref(t));
                out.push(' ');
            }
            None if f.modifiers.is_empty() => out.push_str("var "),
            None => {}
        }
        out.push_str(&f.name);
        if let Some(v) = &f.initializer {
            out.push_str(" = ");
            self.value(v, level, out);
        }
        out.push_str(";\n");
    }

    fn method(&self, m: &MethodDecl, level: usize, out: &mut String) {
        self.modifiers(&m.modifiers, level, out);
        if let Some(t) = &m.return_type {
            out.push_str(&type_ref(t));
            out.push(' ');
        }
        out.push_str(&m.name);
        out.push('(');
        let params: Vec<String> = m
            .params
            .iter()
            .map(|p| match &p.type_ref {
                Some(t) => format!("{} {}", type_ref(t), p.name),
                None => p.name.clone(),
            })
            .collect();
        out.push_str(&params.join(", "));
        out.push_str(") {\n");
        match &m.body {
            MethodBody::Widget(w) => {
                self.pad(level + 1, out);
                out.push_str("return ");
                self.widget(w, level + 1, out);
                out.push_str(";\n");
            }
            MethodBody::Statements(stmts) => {
                for s in stmts {
                    self.statement(s, level + 1, out);
                }
            }
        }
        self.pad(level, out);
        out.push('}');
    }

    fn statement(&self, s: &Statement, level: usize, out: &mut String) {
        self.pad(level, out);
        out.push_str(&s.keywords.join(" "));
        if let Some(v) = &s.value {
            if !s.keywords.is_empty() {
                out.push(' ');
            }
            self.value(v, level, out);
        }
        out.push_str(";\n");
    }

    fn widget(&self, w: &WidgetNode, level: usize, out: &mut String) {
        out.push_str(&w.type_name);
        out.push('(');

        let positional = w.properties.iter().filter(|p| is_positional(&p.key));
        let named = w.properties.iter().filter(|p| !is_positional(&p.key));
        let mut args: Vec<String> = Vec::new();
        for p in positional {
            let mut s = String::new();
            self.value(&p.value, level + 1, &mut s);
            args.push(s);
        }
        for p in named {
            let mut s = format!("{}: ", p.key);
            self.value(&p.value, level + 1, &mut s);
            args.push(s);
        }
        match w.children.as_slice() {
            [] => {}
            [only] => {
                let mut s = "child: ".to_string();
                self.widget(only, level + 1, &mut s);
                args.push(s);
            }
            many => {
                let mut s = "children: [\n".to_string();
                for c in many {
                    self.pad(level + 2, &mut s);
                    self.widget(c, level + 2, &mut s);
                    s.push_str(",\n");
                }
                self.pad(level + 1, &mut s);
                s.push(']');
                args.push(s);
            }
        }

        if args.is_empty() {
            out.push(')');
            return;
        }
        out.push('\n');
        for a in args {
            self.pad(level + 1, out);
            out.push_str(&a);
            out.push_str(",\n");
        }
        self.pad(level, out);
        out.push(')');
    }

    fn value(&self, v: &Value, level: usize, out: &mut String) {
        match v {
            Value::Literal(l) => out.push_str(&literal(l)),
            Value::Ident(s) | Value::Expr(s) => out.push_str(s),
            Value::Widget(w) => self.widget(w, level, out),
            Value::List(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.value(item, level, out);
                }
                out.push(']');
            }
        }
    }
}

fn literal(l: &Literal) -> String {
    match l.kind {
        LiteralKind::String => dart_string(&l.raw),
        LiteralKind::Number | LiteralKind::Bool | LiteralKind::Null => l.raw.clone(),
    }
}

fn type_ref(t: &TypeRef) -> String {
    if t.args.is_empty() {
        return t.name.clone();
    }
    let args: Vec<String> = t.args.iter().map(type_ref).collect();
    format!("{}<{}>", t.name, args.join(", "))
}
