//! Pull tokenizer turning UTF-8 JSON text into a flat [`JsonNode`] sequence.
//!
//! The tokenizer is a small push-down automaton: `ParseState` tracks where we
//! are inside the innermost container and `containers` holds one entry per
//! open object or array. Property names are reported as their own node; the
//! value that follows is reported by the next call.
//!
//! ```rust
//! use odata_verbose::{JsonNode, Tokenizer};
//!
//! let mut tokenizer = Tokenizer::new(br#"{"a":[1,null]}"#);
//! let mut nodes = Vec::new();
//! loop {
//!     let (node, _) = tokenizer.next_node().unwrap();
//!     if node == JsonNode::EndOfInput {
//!         break;
//!     }
//!     nodes.push(node.node_type());
//! }
//! assert_eq!(nodes.len(), 7);
//! ```
use alloc::{string::String, vec::Vec};

use crate::{
    error::{ReaderError, SyntaxError},
    json_value::{JsonNode, JsonPrimitive},
};

/// A 1-based line and column in the input, counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Default for Position {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Start,
    BeforeFirstPropertyName,
    BeforePropertyName,
    BeforePropertyValue,
    BeforeFirstArrayValue,
    BeforeArrayValue,
    AfterPropertyValue,
    AfterArrayValue,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Object,
    Array,
}

#[derive(Debug)]
pub struct Tokenizer<'src> {
    input: &'src [u8],
    offset: usize,
    line: usize,
    column: usize,
    parse_state: ParseState,
    containers: Vec<Container>,
}

impl<'src> Tokenizer<'src> {
    #[must_use]
    pub fn new(input: &'src [u8]) -> Self {
        Self {
            input,
            offset: 0,
            line: 1,
            column: 1,
            parse_state: ParseState::Start,
            containers: Vec::with_capacity(16),
        }
    }

    #[must_use]
    pub fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    /// Produces the next node and the position it starts at.
    ///
    /// After the single top-level value has been closed, every further call
    /// returns [`JsonNode::EndOfInput`].
    ///
    /// # Errors
    ///
    /// Returns a syntax error for malformed JSON, invalid UTF-8 or content
    /// after the top-level value.
    pub fn next_node(&mut self) -> Result<(JsonNode, Position), ReaderError> {
        loop {
            self.skip_whitespace()?;
            let position = self.position();
            let Some(c) = self.peek()? else {
                return if self.parse_state == ParseState::End {
                    Ok((JsonNode::EndOfInput, position))
                } else {
                    Err(self.syntax_error(SyntaxError::UnexpectedEndOfInput))
                };
            };

            match self.parse_state {
                ParseState::Start | ParseState::BeforePropertyValue | ParseState::BeforeArrayValue => {
                    return Ok((self.lex_value(c)?, position));
                }
                ParseState::BeforeFirstArrayValue => {
                    if c == ']' {
                        self.bump();
                        return Ok((self.close_container(), position));
                    }
                    return Ok((self.lex_value(c)?, position));
                }
                ParseState::BeforeFirstPropertyName | ParseState::BeforePropertyName => {
                    if c == '}' && self.parse_state == ParseState::BeforeFirstPropertyName {
                        self.bump();
                        return Ok((self.close_container(), position));
                    }
                    if c != '"' {
                        return Err(self.syntax_error(SyntaxError::InvalidCharacter(c)));
                    }
                    let name = self.lex_string()?;
                    self.skip_whitespace()?;
                    match self.peek()? {
                        Some(':') => self.bump(),
                        Some(c) => return Err(self.syntax_error(SyntaxError::InvalidCharacter(c))),
                        None => return Err(self.syntax_error(SyntaxError::UnexpectedEndOfInput)),
                    }
                    self.parse_state = ParseState::BeforePropertyValue;
                    return Ok((JsonNode::Property(name), position));
                }
                ParseState::AfterPropertyValue => match c {
                    ',' => {
                        self.bump();
                        self.parse_state = ParseState::BeforePropertyName;
                    }
                    '}' => {
                        self.bump();
                        return Ok((self.close_container(), position));
                    }
                    _ => return Err(self.syntax_error(SyntaxError::InvalidCharacter(c))),
                },
                ParseState::AfterArrayValue => match c {
                    ',' => {
                        self.bump();
                        self.parse_state = ParseState::BeforeArrayValue;
                    }
                    ']' => {
                        self.bump();
                        return Ok((self.close_container(), position));
                    }
                    _ => return Err(self.syntax_error(SyntaxError::InvalidCharacter(c))),
                },
                ParseState::End => {
                    return Err(self.syntax_error(SyntaxError::InvalidCharacter(c)));
                }
            }
        }
    }

    fn lex_value(&mut self, c: char) -> Result<JsonNode, ReaderError> {
        match c {
            '{' => {
                self.bump();
                self.containers.push(Container::Object);
                self.parse_state = ParseState::BeforeFirstPropertyName;
                Ok(JsonNode::StartObject)
            }
            '[' => {
                self.bump();
                self.containers.push(Container::Array);
                self.parse_state = ParseState::BeforeFirstArrayValue;
                Ok(JsonNode::StartArray)
            }
            '"' => {
                let s = self.lex_string()?;
                self.after_value();
                Ok(JsonNode::Primitive(JsonPrimitive::String(s)))
            }
            '-' | '0'..='9' => {
                let n = self.lex_number()?;
                self.after_value();
                Ok(JsonNode::Primitive(JsonPrimitive::Number(n)))
            }
            't' => {
                self.lex_literal("true")?;
                self.after_value();
                Ok(JsonNode::Primitive(JsonPrimitive::Boolean(true)))
            }
            'f' => {
                self.lex_literal("false")?;
                self.after_value();
                Ok(JsonNode::Primitive(JsonPrimitive::Boolean(false)))
            }
            'n' => {
                self.lex_literal("null")?;
                self.after_value();
                Ok(JsonNode::Primitive(JsonPrimitive::Null))
            }
            _ => Err(self.syntax_error(SyntaxError::InvalidCharacter(c))),
        }
    }

    fn close_container(&mut self) -> JsonNode {
        let closed = self.containers.pop();
        self.after_value();
        match closed {
            Some(Container::Array) => JsonNode::EndArray,
            _ => JsonNode::EndObject,
        }
    }

    fn after_value(&mut self) {
        self.parse_state = match self.containers.last() {
            Some(Container::Object) => ParseState::AfterPropertyValue,
            Some(Container::Array) => ParseState::AfterArrayValue,
            None => ParseState::End,
        };
    }

    fn lex_literal(&mut self, literal: &'static str) -> Result<(), ReaderError> {
        for expected in literal.chars() {
            match self.peek()? {
                Some(c) if c == expected => self.bump(),
                Some(c) => return Err(self.syntax_error(SyntaxError::InvalidCharacter(c))),
                None => return Err(self.syntax_error(SyntaxError::UnexpectedEndOfInput)),
            }
        }
        Ok(())
    }

    fn lex_number(&mut self) -> Result<String, ReaderError> {
        let start = self.position();
        let mut text = String::new();
        while let Some(c) = self.peek()? {
            if matches!(c, '0'..='9' | '-' | '+' | '.' | 'e' | 'E') {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if is_valid_number(&text) {
            Ok(text)
        } else {
            Err(ReaderError::new(
                SyntaxError::InvalidNumber(text).into(),
                start.line,
                start.column,
            ))
        }
    }

    fn lex_string(&mut self) -> Result<String, ReaderError> {
        // opening quote
        self.bump();
        let mut s = String::new();
        loop {
            let Some(c) = self.peek()? else {
                return Err(self.syntax_error(SyntaxError::UnexpectedEndOfInput));
            };
            match c {
                '"' => {
                    self.bump();
                    return Ok(s);
                }
                '\\' => {
                    self.bump();
                    let Some(escaped) = self.peek()? else {
                        return Err(self.syntax_error(SyntaxError::UnexpectedEndOfInput));
                    };
                    match escaped {
                        '"' | '\\' | '/' => s.push(escaped),
                        'b' => s.push('\u{8}'),
                        'f' => s.push('\u{c}'),
                        'n' => s.push('\n'),
                        'r' => s.push('\r'),
                        't' => s.push('\t'),
                        'u' => {
                            self.bump();
                            s.push(self.lex_unicode_escape()?);
                            continue;
                        }
                        _ => return Err(self.syntax_error(SyntaxError::InvalidCharacter(escaped))),
                    }
                    self.bump();
                }
                c if (c as u32) < 0x20 => {
                    return Err(self.syntax_error(SyntaxError::InvalidCharacter(c)));
                }
                c => {
                    s.push(c);
                    self.bump();
                }
            }
        }
    }

    /// Reads the four hex digits after `\u`, joining surrogate pairs.
    fn lex_unicode_escape(&mut self) -> Result<char, ReaderError> {
        let high = self.lex_hex4()?;
        if !(0xD800..=0xDBFF).contains(&high) {
            return char::from_u32(high)
                .ok_or_else(|| self.syntax_error(SyntaxError::InvalidUnicodeEscapeSequence(high)));
        }
        for expected in ['\\', 'u'] {
            match self.peek()? {
                Some(c) if c == expected => self.bump(),
                _ => return Err(self.syntax_error(SyntaxError::InvalidUnicodeEscapeSequence(high))),
            }
        }
        let low = self.lex_hex4()?;
        if !(0xDC00..=0xDFFF).contains(&low) {
            return Err(self.syntax_error(SyntaxError::InvalidUnicodeEscapeSequence(low)));
        }
        let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
        char::from_u32(code)
            .ok_or_else(|| self.syntax_error(SyntaxError::InvalidUnicodeEscapeSequence(code)))
    }

    fn lex_hex4(&mut self) -> Result<u32, ReaderError> {
        let mut code = 0u32;
        for _ in 0..4 {
            let Some(c) = self.peek()? else {
                return Err(self.syntax_error(SyntaxError::UnexpectedEndOfInput));
            };
            let Some(digit) = c.to_digit(16) else {
                return Err(self.syntax_error(SyntaxError::InvalidCharacter(c)));
            };
            code = code * 16 + digit;
            self.bump();
        }
        Ok(code)
    }

    fn skip_whitespace(&mut self) -> Result<(), ReaderError> {
        while let Some(c) = self.peek()? {
            if matches!(c, ' ' | '\t' | '\n' | '\r') {
                self.bump();
            } else {
                break;
            }
        }
        Ok(())
    }

    fn peek(&self) -> Result<Option<char>, ReaderError> {
        let (ch, len) = bstr::decode_utf8(&self.input[self.offset..]);
        match ch {
            Some(c) => Ok(Some(c)),
            None if len == 0 => Ok(None),
            None => Err(self.syntax_error(SyntaxError::InvalidUtf8)),
        }
    }

    fn bump(&mut self) {
        let (ch, len) = bstr::decode_utf8(&self.input[self.offset..]);
        self.offset += len;
        if ch == Some('\n') {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }

    fn syntax_error(&self, err: SyntaxError) -> ReaderError {
        ReaderError::new(err.into(), self.line, self.column)
    }
}

/// `-? (0 | [1-9][0-9]*) (. [0-9]+)? ([eE] [+-]? [0-9]+)?`
fn is_valid_number(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;
    let digits = |i: &mut usize| {
        let start = *i;
        while *i < bytes.len() && bytes[*i].is_ascii_digit() {
            *i += 1;
        }
        *i - start
    };

    if bytes.get(i) == Some(&b'-') {
        i += 1;
    }
    match bytes.get(i) {
        Some(b'0') => i += 1,
        Some(b'1'..=b'9') => {
            digits(&mut i);
        }
        _ => return false,
    }
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        if digits(&mut i) == 0 {
            return false;
        }
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        if digits(&mut i) == 0 {
            return false;
        }
    }
    i == bytes.len()
}
