//! Stock form and button components.

use coon_core::ir::{Value, WidgetNode};

use crate::entry::{PatternEntry, PatternMeta};
use crate::registry::PatternRegistry;
use crate::snapshot::RegistrySnapshot;

fn icon(name: &str) -> Value {
    Value::widget(WidgetNode::new("Icon").prop("$0", Value::ident(name)))
}

pub fn email_input() -> WidgetNode {
    WidgetNode::new("TextField")
        .prop("controller", Value::ident("controller"))
        .prop(
            "decoration",
            Value::widget(
                WidgetNode::new("InputDecoration")
                    .prop("labelText", Value::string("Email"))
                    .prop("hintText", Value::string("you@example.com"))
                    .prop("prefixIcon", icon("Icons.email"))
                    .prop("border", Value::widget(WidgetNode::new("OutlineInputBorder"))),
            ),
        )
        .prop("keyboardType", Value::ident("TextInputType.emailAddress"))
}

pub fn password_input() -> WidgetNode {
    WidgetNode::new("TextField")
        .prop("controller", Value::ident("controller"))
        .prop("obscureText", Value::boolean(true))
        .prop(
            "decoration",
            Value::widget(
                WidgetNode::new("InputDecoration")
                    .prop("labelText", Value::string("Password"))
                    .prop("prefixIcon", icon("Icons.lock"))
                    .prop("border", Value::widget(WidgetNode::new("OutlineInputBorder"))),
            ),
        )
}

pub fn primary_button() -> WidgetNode {
    WidgetNode::new("ElevatedButton")
        .prop("onPressed", Value::ident("onPressed"))
        .prop(
            "style",
            Value::expr(
                "ElevatedButton.styleFrom(minimumSize: Size(double.infinity, 50), \
                 shape: RoundedRectangleBorder(borderRadius: BorderRadius.circular(8)))",
            ),
        )
        .prop(
            "child",
            Value::widget(WidgetNode::new("Text").prop("$0", Value::ident("label"))),
        )
}

pub fn builtin_patterns() -> Vec<(&'static str, WidgetNode, PatternMeta)> {
    vec![
        (
            "email_input",
            email_input(),
            PatternMeta::named("Email Input")
                .description("Email text field with label, hint and icon")
                .category("forms")
                .tags(&["input", "email", "form", "validation"]),
        ),
        (
            "password_input",
            password_input(),
            PatternMeta::named("Password Input")
                .description("Obscured password text field")
                .category("forms")
                .tags(&["input", "password", "form", "security"]),
        ),
        (
            "primary_button",
            primary_button(),
            PatternMeta::named("Primary Button")
                .description("Full-width primary action button")
                .category("buttons")
                .tags(&["button", "action", "primary"]),
        ),
    ]
}

impl PatternRegistry {
    /// Registry preloaded with the stock components.
    pub fn with_builtin_patterns() -> Self {
        let mut snapshot = RegistrySnapshot::empty();
        for (id, example, meta) in builtin_patterns() {
            snapshot.push(PatternEntry::new(id, example).with_meta(meta));
        }
        Self::from_snapshot(snapshot)
    }
}
