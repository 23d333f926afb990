//! Lexical pieces of the compact grammar shared by encoder and decoder.

/// Prefix that escapes a reserved character inside a string body.
pub const ESCAPE: char = '\\';

/// Characters that must be escaped inside a string body.
pub const RESERVED: [char; 8] = ['\\', '"', '{', '}', '[', ']', ',', ';'];

/// Name written verbatim instead of through a table.
pub const VERBATIM: char = '!';
pub const KEYWORD: char = '%';
pub const KEYWORD_END: char = '.';
pub const LITERAL_CODE: char = '#';
pub const EXPRESSION: char = '&';
pub const REFERENCE: char = '@';
pub const CONSTANT: char = '~';

pub const TRUE: &str = "~1";
pub const FALSE: &str = "~0";
pub const NULL: &str = "~_";

pub const CLASS_PREFIX: &str = "c";
pub const METHOD_PREFIX: &str = "m";
pub const UNIT_PREFIX: &str = "u";

pub fn is_reserved(c: char) -> bool {
    RESERVED.contains(&c)
}

pub fn is_closer(c: char) -> bool {
    matches!(c, '}' | ']' | ')' | '>')
}

pub fn closer_for(open: char) -> char {
    match open {
        '{' => '}',
        '[' => ']',
        '(' => ')',
        _ => '>',
    }
}

/// Prefix every reserved character with the escape character.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    for c in raw.chars() {
        if is_reserved(c) {
            out.push(ESCAPE);
        }
        out.push(c);
    }
    out
}

/// Escaped string token including the quotes.
pub fn quote(raw: &str) -> String {
    format!("\"{}\"", escape(raw))
}

/// End offset of a number token starting at `start`, if one starts there.
///
/// `-`? digit, then `[0-9A-Za-z_.]`; a sign may follow `e`/`E` unless the
/// literal is hexadecimal.
pub fn scan_number(src: &str, start: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut pos = start;
    if bytes.get(pos) == Some(&b'-') {
        pos += 1;
    }
    if !bytes.get(pos).is_some_and(u8::is_ascii_digit) {
        return None;
    }
    let hex = bytes.get(pos) == Some(&b'0') && matches!(bytes.get(pos + 1), Some(b'x' | b'X'));
    pos += 1;
    while let Some(&b) = bytes.get(pos) {
        let prev = bytes[pos - 1];
        let accepted = b.is_ascii_alphanumeric()
            || b == b'_'
            || b == b'.'
            || (!hex && matches!(b, b'+' | b'-') && matches!(prev, b'e' | b'E'));
        if !accepted {
            break;
        }
        pos += 1;
    }
    Some(pos)
}

/// Whether `raw` is exactly one number token.
pub fn is_number(raw: &str) -> bool {
    scan_number(raw, 0) == Some(raw.len())
}
