//! Shape tokens, fingerprints and token-level similarity.

use sha2::{Digest, Sha256};

use crate::ir::{
    ClassDecl, FieldDecl, IrNode, Literal, MethodBody, MethodDecl, TypeRef, Value, WidgetNode,
};

/// How much of a scalar leaf ends up in the token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detail {
    /// Scalars collapse to the anonymous slot `?`.
    Shape,
    /// Scalars are spelled out.
    Full,
}

const SLOT: &str = "?";
const SEPARATOR: &str = "\x1f";

pub fn widget_tokens(w: &WidgetNode, detail: Detail) -> Vec<String> {
    let mut out = Vec::new();
    push_widget(w, detail, &mut out);
    out
}

/// Token stream of `w` with every scalar abstracted.
pub fn shape_tokens(w: &WidgetNode) -> Vec<String> {
    widget_tokens(w, Detail::Shape)
}

/// Stable 128-bit fingerprint of a subtree's shape, hex encoded.
pub fn fingerprint(w: &WidgetNode) -> String {
    fingerprint_tokens(&shape_tokens(w))
}

pub fn fingerprint_tokens(tokens: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tokens.join(SEPARATOR).as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}

/// Full-detail tokens for any IR node.
pub fn ir_tokens(node: &IrNode) -> Vec<String> {
    let mut out = Vec::new();
    push_node(node, &mut out);
    out
}

fn push_node(node: &IrNode, out: &mut Vec<String>) {
    match node {
        IrNode::Class(c) => push_class(c, out),
        IrNode::Method(m) => push_method(m, out),
        IrNode::Widget(w) => push_widget(w, Detail::Full, out),
        IrNode::Literal(l) => push_literal(l, out),
        IrNode::Unit(items) => {
            out.push("U".into());
            for item in items {
                out.push("|".into());
                push_node(item, out);
            }
        }
    }
}

fn push_class(c: &ClassDecl, out: &mut Vec<String>) {
    out.push(format!("C:{}", c.name));
    if let Some(t) = &c.super_type {
        out.push("<".into());
        push_type(t, out);
        out.push(">".into());
    }
    out.push(";".into());
    for f in &c.fields {
        push_field(f, out);
    }
    out.push(";".into());
    for m in &c.methods {
        push_method(m, out);
    }
}

fn push_field(f: &FieldDecl, out: &mut Vec<String>) {
    for m in &f.modifiers {
        out.push(format!("%{m}"));
    }
    out.push(format!("F:{}", f.name));
    if let Some(t) = &f.type_ref {
        push_type(t, out);
    }
    if let Some(v) = &f.initializer {
        out.push("=".into());
        push_value(v, Detail::Full, out);
    }
}

fn push_method(m: &MethodDecl, out: &mut Vec<String>) {
    for k in &m.modifiers {
        out.push(format!("%{k}"));
    }
    out.push(format!("M:{}", m.name));
    out.push("(".into());
    for p in &m.params {
        out.push(format!("P:{}", p.name));
        if let Some(t) = &p.type_ref {
            push_type(t, out);
        }
    }
    out.push(")".into());
    if let Some(t) = &m.return_type {
        push_type(t, out);
    }
    match &m.body {
        MethodBody::Widget(w) => {
            out.push("=".into());
            push_widget(w, Detail::Full, out);
        }
        MethodBody::Statements(stmts) => {
            out.push("{".into());
            for s in stmts {
                out.push(";".into());
                for k in &s.keywords {
                    out.push(format!("%{k}"));
                }
                if let Some(v) = &s.value {
                    push_value(v, Detail::Full, out);
                }
            }
            out.push("}".into());
        }
    }
}

fn push_type(t: &TypeRef, out: &mut Vec<String>) {
    out.push(format!("T:{}", t.name));
    if !t.args.is_empty() {
        out.push("<".into());
        for a in &t.args {
            push_type(a, out);
        }
        out.push(">".into());
    }
}

fn push_widget(w: &WidgetNode, detail: Detail, out: &mut Vec<String>) {
    out.push(format!("T:{}", w.type_name));
    out.push("{".into());
    for p in &w.properties {
        out.push(format!("K:{}", p.key));
        push_value(&p.value, detail, out);
    }
    out.push("}".into());
    out.push("[".into());
    for c in &w.children {
        push_widget(c, detail, out);
    }
    out.push("]".into());
}

fn push_value(v: &Value, detail: Detail, out: &mut Vec<String>) {
    match (v, detail) {
        (Value::Literal(_) | Value::Ident(_) | Value::Expr(_), Detail::Shape) => {
            out.push(SLOT.into())
        }
        (Value::Literal(l), Detail::Full) => push_literal(l, out),
        (Value::Ident(s), Detail::Full) => out.push(format!("I:{s}")),
        (Value::Expr(s), Detail::Full) => out.push(format!("E:{s}")),
        (Value::Widget(w), _) => push_widget(w, detail, out),
        (Value::List(items), _) => {
            out.push("(".into());
            for item in items {
                push_value(item, detail, out);
            }
            out.push(")".into());
        }
    }
}

fn push_literal(l: &Literal, out: &mut Vec<String>) {
    out.push(format!("L{}:{}", l.kind.as_str(), l.raw));
}

/// Levenshtein distance over arbitrary token sequences.
pub fn edit_distance<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, x) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, y) in b.iter().enumerate() {
            let cost = usize::from(x != y);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// `1 - distance / max(len)`, in `[0, 1]`. Two empty sequences are identical.
pub fn similarity<T: PartialEq>(a: &[T], b: &[T]) -> f64 {
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - edit_distance(a, b) as f64 / longest as f64
}
