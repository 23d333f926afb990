//! Compact grammar back to IR.
//!
//! Recursive descent with one frame per nesting level. Every opened bracket
//! is tracked so that running out of input, or a closer that does not match,
//! is reported as an unbalanced bracket at the offending byte. Nesting is
//! capped at the same depth the encoder enforces, so hostile input fails
//! with a parse error instead of exhausting the stack.

use std::fmt;

use coon_core::error::{ParseError, ParseErrorKind};
use coon_core::ident::{is_ident_continue, is_ident_path, is_ident_start, is_reference_char};
use coon_core::ir::{
    ClassDecl, FieldDecl, IrNode, MethodBody, MethodDecl, Param, Property, Statement, TypeRef,
    Value, WidgetNode,
};
use coon_core::slots::slot_value_mut;
use coon_core::symbols::{SymbolTable, SymbolTables};
use coon_registry::RegistrySnapshot;

use crate::syntax::{
    closer_for, is_closer, is_reserved, scan_number, CLASS_PREFIX, CONSTANT, ESCAPE, EXPRESSION,
    KEYWORD, KEYWORD_END, LITERAL_CODE, METHOD_PREFIX, REFERENCE, UNIT_PREFIX, VERBATIM,
};

type PResult<T> = Result<T, ParseError>;

pub const DEFAULT_MAX_DEPTH: usize = 256;

/// What the parser is looking for at the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    ExpectNode,
    ExpectPropertyKeyOrClose,
    ExpectPropertyValue,
    ExpectChildOrClose,
    ExpectStringBody,
}

impl fmt::Display for DecodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ExpectNode => "expected a node",
            Self::ExpectPropertyKeyOrClose => "expected a property key or '}'",
            Self::ExpectPropertyValue => "expected a property value",
            Self::ExpectChildOrClose => "expected a child widget or ']'",
            Self::ExpectStringBody => "inside a string",
        })
    }
}

pub struct Decoder<'a> {
    tables: &'a SymbolTables,
    registry: &'a RegistrySnapshot,
    max_depth: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(tables: &'a SymbolTables, registry: &'a RegistrySnapshot) -> Self {
        Self {
            tables,
            registry,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Widgets, lists and type argument lists each count one level.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parse a whole document. No recovery: the first error aborts.
    pub fn decode(&self, doc: &str) -> PResult<IrNode> {
        let mut parser = Parser {
            src: doc,
            pos: 0,
            open: Vec::new(),
            state: DecodeState::ExpectNode,
            depth: 0,
            max_depth: self.max_depth,
            tables: self.tables,
            registry: self.registry,
        };
        let node = parser.document()?;
        tracing::debug!(len = doc.len(), nodes = node.node_count(), "document decoded");
        Ok(node)
    }
}

pub fn decode(doc: &str, tables: &SymbolTables, snapshot: &RegistrySnapshot) -> PResult<IrNode> {
    Decoder::new(tables, snapshot).decode(doc)
}

struct Parser<'s, 'a> {
    src: &'s str,
    pos: usize,
    /// Open brackets with their byte offsets.
    open: Vec<(char, usize)>,
    state: DecodeState,
    depth: usize,
    max_depth: usize,
    tables: &'a SymbolTables,
    registry: &'a RegistrySnapshot,
}

impl Parser<'_, '_> {
    // ========== Cursor ==========

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(offset)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
    }

    /// Skip whitespace and report the next significant character.
    fn next_significant(&mut self) -> Option<char> {
        self.skip_ws();
        self.peek()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.next_significant() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    // ========== Errors ==========

    fn error(&self, kind: ParseErrorKind, detail: impl Into<String>) -> ParseError {
        ParseError::new(kind, self.pos, detail)
    }

    /// Error for whatever sits at the cursor when `expected` did not.
    fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            None => match self.open.last() {
                Some(&(open, at)) => self.error(
                    ParseErrorKind::UnbalancedBracket,
                    format!("end of input with '{open}' from byte {at} still open ({})", self.state),
                ),
                None => self.error(
                    ParseErrorKind::UnexpectedToken,
                    format!("unexpected end of input, {expected}"),
                ),
            },
            Some(c) if is_closer(c) && self.open.last().map(|&(o, _)| closer_for(o)) != Some(c) => {
                self.error(
                    ParseErrorKind::UnbalancedBracket,
                    format!("'{c}' does not close any open bracket ({})", self.state),
                )
            }
            Some(c) => self.error(
                ParseErrorKind::UnexpectedToken,
                format!("found '{c}', {expected}"),
            ),
        }
    }

    fn expect(&mut self, c: char) -> PResult<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected '{c}'")))
        }
    }

    fn open_bracket(&mut self, c: char) -> PResult<()> {
        self.skip_ws();
        let at = self.pos;
        self.expect(c)?;
        self.open.push((c, at));
        Ok(())
    }

    fn close_bracket(&mut self) -> PResult<()> {
        let Some(&(open, _)) = self.open.last() else {
            return Err(self.unexpected("expected end of input"));
        };
        let closer = closer_for(open);
        if self.eat(closer) {
            self.open.pop();
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected '{closer}'")))
        }
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= self.max_depth {
            return Err(self.error(
                ParseErrorKind::DepthLimitExceeded,
                format!("nesting deeper than {}", self.max_depth),
            ));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    // ========== Tokens ==========

    fn ident(&mut self) -> PResult<&str> {
        self.skip_ws();
        let start = self.pos;
        match self.peek() {
            Some(c) if is_ident_start(c) => self.pos += 1,
            _ => return Err(self.unexpected("expected an identifier")),
        }
        while self.peek().is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        Ok(&self.src[start..self.pos])
    }

    fn ident_path(&mut self) -> PResult<String> {
        let mut path = self.ident()?.to_string();
        while self.peek() == Some('.') && self.peek_at(1).is_some_and(is_ident_start) {
            self.pos += 1;
            path.push('.');
            path.push_str(self.ident()?);
        }
        Ok(path)
    }

    /// `!name` verbatim, or a short code resolved through `table`.
    fn code(&mut self, table: &SymbolTable) -> PResult<String> {
        self.skip_ws();
        if self.peek() == Some(VERBATIM) {
            self.pos += 1;
            if !self.peek().is_some_and(is_ident_start) {
                return Err(self.unexpected("expected a name after '!'"));
            }
            return Ok(self.ident()?.to_string());
        }
        let start = self.pos;
        let short = self.ident()?;
        match table.long_for(short) {
            Some(long) => Ok(long.to_string()),
            None => {
                let short = short.to_string();
                self.pos = start;
                Err(self.error(
                    ParseErrorKind::UnknownShortCode,
                    format!("unknown {} code '{short}'", table.category()),
                ))
            }
        }
    }

    fn string(&mut self) -> PResult<String> {
        self.expect('"')?;
        let outer = self.state;
        self.state = DecodeState::ExpectStringBody;
        let mut out = String::new();
        let mut run = self.pos;
        loop {
            match self.peek() {
                None => {
                    return Err(self.error(ParseErrorKind::UnterminatedString, "end of input inside a string"))
                }
                Some('"') => {
                    out.push_str(&self.src[run..self.pos]);
                    self.pos += 1;
                    break;
                }
                Some(ESCAPE) => {
                    out.push_str(&self.src[run..self.pos]);
                    self.pos += 1;
                    match self.peek() {
                        Some(c) if is_reserved(c) => {
                            out.push(c);
                            self.pos += 1;
                        }
                        Some(c) => {
                            return Err(self.error(
                                ParseErrorKind::InvalidEscape,
                                format!("'\\{c}' is not a valid escape"),
                            ))
                        }
                        None => {
                            return Err(self.error(
                                ParseErrorKind::UnterminatedString,
                                "end of input after escape character",
                            ))
                        }
                    }
                    run = self.pos;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        self.state = outer;
        Ok(out)
    }

    // ========== Document ==========

    fn document(&mut self) -> PResult<IrNode> {
        if self.next_significant().is_none() {
            return Ok(IrNode::Unit(Vec::new()));
        }
        let node = if self.declaration_prefix().as_deref() == Some(UNIT_PREFIX) {
            self.declaration_header()?;
            let mut items = vec![self.item()?];
            while self.eat('|') {
                items.push(self.item()?);
            }
            IrNode::Unit(items)
        } else {
            self.item()?
        };
        if self.next_significant().is_some() {
            return Err(self.unexpected("expected end of input"));
        }
        Ok(node)
    }

    /// Identifier immediately followed by ':' at the cursor, without consuming.
    fn declaration_prefix(&mut self) -> Option<String> {
        let save = self.pos;
        let prefix = match self.ident().map(str::to_string) {
            Ok(name) => (self.next_significant() == Some(':')).then_some(name),
            Err(_) => None,
        };
        self.pos = save;
        prefix
    }

    fn declaration_header(&mut self) -> PResult<()> {
        self.ident()?;
        self.expect(':')
    }

    fn item(&mut self) -> PResult<IrNode> {
        self.state = DecodeState::ExpectNode;
        match self.declaration_prefix().as_deref() {
            Some(CLASS_PREFIX) => {
                self.declaration_header()?;
                return Ok(IrNode::Class(self.class()?));
            }
            Some(METHOD_PREFIX) => {
                self.declaration_header()?;
                return Ok(IrNode::Method(self.method()?));
            }
            Some(UNIT_PREFIX) => {
                return Err(self.error(ParseErrorKind::UnexpectedToken, "units cannot be nested"));
            }
            Some(other) => {
                let other = other.to_string();
                return Err(self.error(
                    ParseErrorKind::UnexpectedToken,
                    format!("unknown declaration prefix '{other}:'"),
                ));
            }
            None => {}
        }
        match self.next_significant() {
            Some('"' | CONSTANT | '-' | '0'..='9') => match self.value()? {
                Value::Literal(l) => Ok(IrNode::Literal(l)),
                _ => Err(self.error(ParseErrorKind::UnexpectedToken, "expected a literal")),
            },
            _ => Ok(IrNode::Widget(self.widgetish()?)),
        }
    }

    // ========== Declarations ==========

    fn class(&mut self) -> PResult<ClassDecl> {
        let name = self.ident()?.to_string();
        let super_type = if self.next_significant() == Some('<') {
            self.open_bracket('<')?;
            let t = self.type_ref()?;
            self.close_bracket()?;
            Some(t)
        } else {
            None
        };
        self.expect(';')?;

        let mut fields = Vec::new();
        if self.next_significant() != Some(';') {
            loop {
                fields.push(self.field()?);
                if !self.eat(',') {
                    break;
                }
            }
        }
        self.expect(';')?;

        let mut methods = Vec::new();
        if !matches!(self.next_significant(), None | Some('|')) {
            loop {
                methods.push(self.method()?);
                if !self.eat(',') {
                    break;
                }
            }
        }
        Ok(ClassDecl {
            name,
            super_type,
            fields,
            methods,
        })
    }

    fn modifiers(&mut self) -> PResult<Vec<String>> {
        let mut out = Vec::new();
        while self.next_significant() == Some(KEYWORD) {
            self.pos += 1;
            let tables = self.tables;
            out.push(self.code(&tables.keywords)?);
            if self.peek() != Some(KEYWORD_END) {
                return Err(self.unexpected("expected '.' after keyword"));
            }
            self.pos += 1;
        }
        Ok(out)
    }

    fn field(&mut self) -> PResult<FieldDecl> {
        let modifiers = self.modifiers()?;
        let name = self.ident()?.to_string();
        let type_ref = if self.eat(':') { Some(self.type_ref()?) } else { None };
        let initializer = if self.eat('=') { Some(self.value()?) } else { None };
        Ok(FieldDecl {
            modifiers,
            name,
            type_ref,
            initializer,
        })
    }

    fn method(&mut self) -> PResult<MethodDecl> {
        let modifiers = self.modifiers()?;
        let name = self.ident()?.to_string();
        self.open_bracket('(')?;
        let mut params = Vec::new();
        if self.next_significant() != Some(')') {
            loop {
                let name = self.ident()?.to_string();
                let type_ref = if self.eat(':') { Some(self.type_ref()?) } else { None };
                params.push(Param { name, type_ref });
                if !self.eat(',') {
                    break;
                }
            }
        }
        self.close_bracket()?;
        let return_type = if self.eat(':') { Some(self.type_ref()?) } else { None };

        let body = match self.next_significant() {
            Some('=') => {
                self.pos += 1;
                MethodBody::Widget(self.widgetish()?)
            }
            Some('{') => MethodBody::Statements(self.statements()?),
            _ => return Err(self.unexpected("expected '=' or '{' to start a method body")),
        };
        Ok(MethodDecl {
            modifiers,
            name,
            params,
            return_type,
            body,
        })
    }

    fn statements(&mut self) -> PResult<Vec<Statement>> {
        self.open_bracket('{')?;
        let mut out = Vec::new();
        if self.next_significant() != Some('}') {
            loop {
                let keywords = self.modifiers()?;
                let value = match self.next_significant() {
                    Some(';' | '}') => None,
                    _ => Some(self.value()?),
                };
                if keywords.is_empty() && value.is_none() {
                    return Err(self.error(ParseErrorKind::UnexpectedToken, "empty statement"));
                }
                out.push(Statement { keywords, value });
                if !self.eat(';') {
                    break;
                }
            }
        }
        self.close_bracket()?;
        Ok(out)
    }

    fn type_ref(&mut self) -> PResult<TypeRef> {
        let tables = self.tables;
        let name = self.code(&tables.types)?;
        let mut args = Vec::new();
        if self.next_significant() == Some('<') {
            self.nested(|p| {
                p.open_bracket('<')?;
                loop {
                    args.push(p.type_ref()?);
                    if !p.eat(',') {
                        break;
                    }
                }
                p.close_bracket()
            })?;
        }
        Ok(TypeRef { name, args })
    }

    // ========== Widgets ==========

    fn widgetish(&mut self) -> PResult<WidgetNode> {
        self.state = DecodeState::ExpectNode;
        match self.next_significant() {
            Some(REFERENCE) => self.nested(|p| p.reference()),
            Some(c) if c == VERBATIM || is_ident_start(c) => self.nested(|p| {
                let tables = p.tables;
                let type_name = p.code(&tables.types)?;
                p.widget_body(type_name)
            }),
            _ => Err(self.unexpected("expected a widget")),
        }
    }

    fn widget_body(&mut self, type_name: String) -> PResult<WidgetNode> {
        let mut widget = WidgetNode::new(type_name);
        if self.next_significant() == Some('{') {
            widget.properties = self.properties()?;
        }
        if self.next_significant() == Some('[') {
            self.open_bracket('[')?;
            self.state = DecodeState::ExpectChildOrClose;
            if self.next_significant() != Some(']') {
                loop {
                    widget.children.push(self.widgetish()?);
                    self.state = DecodeState::ExpectChildOrClose;
                    if !self.eat(',') {
                        break;
                    }
                }
            }
            self.close_bracket()?;
        }
        Ok(widget)
    }

    fn properties(&mut self) -> PResult<Vec<Property>> {
        self.open_bracket('{')?;
        self.state = DecodeState::ExpectPropertyKeyOrClose;
        let mut out = Vec::new();
        if self.next_significant() == Some('}') {
            self.close_bracket()?;
            return Ok(out);
        }
        loop {
            self.state = DecodeState::ExpectPropertyKeyOrClose;
            let key = self.property_key()?;
            self.expect(':')?;
            self.state = DecodeState::ExpectPropertyValue;
            let value = self.value()?;
            out.push(Property { key, value });
            self.state = DecodeState::ExpectPropertyKeyOrClose;
            if !self.eat(',') {
                break;
            }
        }
        self.close_bracket()?;
        Ok(out)
    }

    /// Keys missing from the table are taken verbatim.
    fn property_key(&mut self) -> PResult<String> {
        match self.next_significant() {
            Some(VERBATIM) => {
                self.pos += 1;
                if !self.peek().is_some_and(is_ident_start) {
                    return Err(self.unexpected("expected a property name after '!'"));
                }
                Ok(self.ident()?.to_string())
            }
            Some(c) if is_ident_start(c) => {
                let tables = self.tables;
                let key = self.ident()?;
                Ok(tables.properties.long_for(key).unwrap_or(key).to_string())
            }
            _ => Err(self.unexpected("expected a property key or '}'")),
        }
    }

    fn reference(&mut self) -> PResult<WidgetNode> {
        let at = self.pos;
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(is_reference_char) {
            self.pos += 1;
        }
        let id = &self.src[start..self.pos];
        if id.is_empty() {
            return Err(self.unexpected("expected a reference id after '@'"));
        }
        let registry = self.registry;
        let Some(entry) = registry.get(id) else {
            let id = id.to_string();
            return Err(ParseError::new(
                ParseErrorKind::UnknownReferenceId,
                at,
                format!("no registered pattern '{id}'"),
            ));
        };

        self.open_bracket('(')?;
        let mut args: Vec<Option<Value>> = Vec::new();
        if self.next_significant() != Some(')') {
            loop {
                let arg = match self.next_significant() {
                    Some(',' | ')') => None,
                    _ => {
                        let arg_at = self.pos;
                        let v = self.value()?;
                        if !v.is_scalar() {
                            return Err(ParseError::new(
                                ParseErrorKind::UnexpectedToken,
                                arg_at,
                                "reference arguments must be scalars",
                            ));
                        }
                        Some(v)
                    }
                };
                args.push(arg);
                if args.len() > entry.arity() {
                    return Err(self.error(
                        ParseErrorKind::ArityMismatch,
                        format!(
                            "'{}' takes {} arguments, got more",
                            entry.reference_id,
                            entry.arity()
                        ),
                    ));
                }
                if !self.eat(',') {
                    break;
                }
            }
        }
        self.close_bracket()?;

        let mut widget = entry.example.clone();
        for (slot, arg) in entry.parameter_slots.iter().zip(args) {
            let Some(v) = arg else { continue };
            match slot_value_mut(&mut widget, slot) {
                Some(target) => *target = v,
                None => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnexpectedToken,
                        at,
                        format!("slot of '{}' does not resolve", entry.reference_id),
                    ))
                }
            }
        }
        Ok(widget)
    }

    // ========== Values ==========

    fn value(&mut self) -> PResult<Value> {
        match self.next_significant() {
            Some('"') => Ok(Value::string(self.string()?)),
            Some('-' | '0'..='9') => {
                let start = self.pos;
                match scan_number(self.src, start) {
                    Some(end) => {
                        self.pos = end;
                        Ok(Value::number(&self.src[start..end]))
                    }
                    None => Err(self.unexpected("expected a number")),
                }
            }
            Some(CONSTANT) => {
                let v = match self.peek_at(1) {
                    Some('1') => Value::boolean(true),
                    Some('0') => Value::boolean(false),
                    Some('_') => Value::null(),
                    _ => {
                        return Err(self.error(
                            ParseErrorKind::UnexpectedToken,
                            "expected '~1', '~0' or '~_'",
                        ))
                    }
                };
                self.pos += 2;
                Ok(v)
            }
            Some(LITERAL_CODE) => {
                self.pos += 1;
                let tables = self.tables;
                let long = self.code(&tables.literals)?;
                if is_ident_path(&long) {
                    Ok(Value::Ident(long))
                } else {
                    Ok(Value::Expr(long))
                }
            }
            Some(EXPRESSION) => {
                self.pos += 1;
                if self.peek() != Some('"') {
                    return Err(self.unexpected("expected '\"' after '&'"));
                }
                Ok(Value::Expr(self.string()?))
            }
            Some('[') => self.nested(|p| {
                p.open_bracket('[')?;
                let mut items = Vec::new();
                if p.next_significant() != Some(']') {
                    loop {
                        items.push(p.value()?);
                        if !p.eat(',') {
                            break;
                        }
                    }
                }
                p.close_bracket()?;
                Ok(Value::List(items))
            }),
            Some(REFERENCE | VERBATIM) => Ok(Value::widget(self.widgetish()?)),
            Some(c) if is_ident_start(c) => {
                let start = self.pos;
                let path = self.ident_path()?;
                if matches!(self.next_significant(), Some('{' | '[')) {
                    self.pos = start;
                    Ok(Value::widget(self.widgetish()?))
                } else {
                    Ok(Value::Ident(path))
                }
            }
            _ => Err(self.unexpected("expected a value")),
        }
    }
}

