//! Character classes shared by the symbol tables, the encoder and the decoder.

pub fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

pub fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// `[A-Za-z_$][A-Za-z0-9_$]*`
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_ident_start(c) => chars.all(is_ident_continue),
        _ => false,
    }
}

/// Dotted identifier path, e.g. `MainAxisAlignment.center`.
pub fn is_ident_path(s: &str) -> bool {
    !s.is_empty() && s.split('.').all(is_identifier)
}

pub fn is_reference_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Reference ids must fit the `@id(...)` token class: `[A-Za-z0-9_]+`.
pub fn is_reference_id(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_reference_char)
}
