//! Addresses of scalar leaves inside a widget subtree.

use serde::{Deserialize, Serialize};

use crate::ir::{Value, WidgetNode};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum PathStep {
    /// The `index`-th property, which must be named `key`.
    Property { index: usize, key: String },
    /// The `index`-th element of a list value.
    Item { index: usize },
    /// The `index`-th child widget.
    Child { index: usize },
}

pub type SlotPath = Vec<PathStep>;

/// Every scalar slot of `w` in canonical pre-order.
pub fn slot_paths(w: &WidgetNode) -> Vec<SlotPath> {
    let mut out = Vec::new();
    let mut prefix = Vec::new();
    walk_widget(w, &mut prefix, &mut out);
    out
}

fn walk_widget(w: &WidgetNode, prefix: &mut SlotPath, out: &mut Vec<SlotPath>) {
    for (index, p) in w.properties.iter().enumerate() {
        prefix.push(PathStep::Property {
            index,
            key: p.key.clone(),
        });
        walk_value(&p.value, prefix, out);
        prefix.pop();
    }
    for (index, c) in w.children.iter().enumerate() {
        prefix.push(PathStep::Child { index });
        walk_widget(c, prefix, out);
        prefix.pop();
    }
}

fn walk_value(v: &Value, prefix: &mut SlotPath, out: &mut Vec<SlotPath>) {
    match v {
        Value::Literal(_) | Value::Ident(_) | Value::Expr(_) => out.push(prefix.clone()),
        Value::Widget(w) => walk_widget(w, prefix, out),
        Value::List(items) => {
            for (index, item) in items.iter().enumerate() {
                prefix.push(PathStep::Item { index });
                walk_value(item, prefix, out);
                prefix.pop();
            }
        }
    }
}

/// Resolve a slot to its value. `None` for an empty path, a missing index
/// or a property whose key differs.
pub fn slot_value<'a>(w: &'a WidgetNode, path: &[PathStep]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    match first {
        PathStep::Property { index, key } => {
            let p = w.properties.get(*index).filter(|p| &p.key == key)?;
            value_at(&p.value, rest)
        }
        PathStep::Child { index } => slot_value(w.children.get(*index)?, rest),
        PathStep::Item { .. } => None,
    }
}

fn value_at<'a>(v: &'a Value, path: &[PathStep]) -> Option<&'a Value> {
    let Some((first, rest)) = path.split_first() else {
        return Some(v);
    };
    match (v, first) {
        (Value::List(items), PathStep::Item { index }) => value_at(items.get(*index)?, rest),
        (Value::Widget(w), _) => slot_value(w, path),
        _ => None,
    }
}

pub fn slot_value_mut<'a>(w: &'a mut WidgetNode, path: &[PathStep]) -> Option<&'a mut Value> {
    let (first, rest) = path.split_first()?;
    match first {
        PathStep::Property { index, key } => {
            let p = w.properties.get_mut(*index).filter(|p| &p.key == key)?;
            value_at_mut(&mut p.value, rest)
        }
        PathStep::Child { index } => slot_value_mut(w.children.get_mut(*index)?, rest),
        PathStep::Item { .. } => None,
    }
}

fn value_at_mut<'a>(v: &'a mut Value, path: &[PathStep]) -> Option<&'a mut Value> {
    let Some((first, rest)) = path.split_first() else {
        return Some(v);
    };
    match (v, first) {
        (Value::List(items), PathStep::Item { index }) => {
            value_at_mut(items.get_mut(*index)?, rest)
        }
        (Value::Widget(w), _) => slot_value_mut(w, path),
        _ => None,
    }
}
