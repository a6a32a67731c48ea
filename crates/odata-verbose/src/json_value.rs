//! JSON node and value types shared by the tokenizer and the readers.
//!
//! The tokenizer produces a flat sequence of [`JsonNode`]s. Readers that need
//! a whole subtree (spatial values, inner errors) materialize it as a
//! [`JsonValue`].
use alloc::{string::String, vec::Vec};
use core::fmt;

/// The kind of a node in the flat token sequence.
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonNodeType {
    /// No node has been read yet.
    None,
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    Property,
    PrimitiveValue,
    EndOfInput,
}

impl fmt::Display for JsonNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JsonNodeType::None => "none",
            JsonNodeType::StartObject => "start-object",
            JsonNodeType::EndObject => "end-object",
            JsonNodeType::StartArray => "start-array",
            JsonNodeType::EndArray => "end-array",
            JsonNodeType::Property => "property",
            JsonNodeType::PrimitiveValue => "primitive-value",
            JsonNodeType::EndOfInput => "end-of-input",
        };
        f.write_str(name)
    }
}

/// A JSON scalar as it appears on the wire.
///
/// Numbers keep their source text so that conversion to a declared type can
/// decide on range and precision itself.
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonPrimitive {
    Null,
    Boolean(bool),
    Number(String),
    String(String),
}

impl JsonPrimitive {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for JsonPrimitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonPrimitive::Null => f.write_str("null"),
            JsonPrimitive::Boolean(b) => f.write_str(if *b { "true" } else { "false" }),
            JsonPrimitive::Number(n) => f.write_str(n),
            JsonPrimitive::String(s) => {
                f.write_str("\"")?;
                write_escaped_string(s, f)?;
                f.write_str("\"")
            }
        }
    }
}

/// One node of the token sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonNode {
    None,
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    Property(String),
    Primitive(JsonPrimitive),
    EndOfInput,
}

impl JsonNode {
    #[must_use]
    pub fn node_type(&self) -> JsonNodeType {
        match self {
            JsonNode::None => JsonNodeType::None,
            JsonNode::StartObject => JsonNodeType::StartObject,
            JsonNode::EndObject => JsonNodeType::EndObject,
            JsonNode::StartArray => JsonNodeType::StartArray,
            JsonNode::EndArray => JsonNodeType::EndArray,
            JsonNode::Property(_) => JsonNodeType::Property,
            JsonNode::Primitive(_) => JsonNodeType::PrimitiveValue,
            JsonNode::EndOfInput => JsonNodeType::EndOfInput,
        }
    }

    #[must_use]
    pub fn property_name(&self) -> Option<&str> {
        match self {
            JsonNode::Property(name) => Some(name),
            _ => None,
        }
    }
}

/// A fully materialized JSON value.
///
/// Object members keep document order.
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub enum JsonValue {
    Null,
    Boolean(bool),
    Number(String),
    String(String),
    Array(Vec<JsonValue>),
    Object(Vec<(String, JsonValue)>),
}

impl JsonValue {
    /// Looks up the first member named `name` of an object value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        match self {
            JsonValue::Object(members) => members.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsonValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<JsonPrimitive> for JsonValue {
    fn from(value: JsonPrimitive) -> Self {
        match value {
            JsonPrimitive::Null => JsonValue::Null,
            JsonPrimitive::Boolean(b) => JsonValue::Boolean(b),
            JsonPrimitive::Number(n) => JsonValue::Number(n),
            JsonPrimitive::String(s) => JsonValue::String(s),
        }
    }
}

/// Writes `src` with the escapes a JSON string literal needs.
pub(crate) fn write_escaped_string<W: fmt::Write>(src: &str, f: &mut W) -> fmt::Result {
    for c in src.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\u{2028}' | '\u{2029}' => write!(f, "\\u{:04X}", c as u32)?,
            c if c.is_control() && c as u32 <= 0xFFFF => write!(f, "\\u{:04X}", c as u32)?,
            _ => f.write_char(c)?,
        }
    }
    Ok(())
}

impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonValue::Null => f.write_str("null"),
            JsonValue::Boolean(b) => f.write_str(if *b { "true" } else { "false" }),
            JsonValue::Number(n) => f.write_str(n),
            JsonValue::String(s) => {
                f.write_str("\"")?;
                write_escaped_string(s, f)?;
                f.write_str("\"")
            }
            JsonValue::Array(items) => {
                f.write_str("[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
            JsonValue::Object(members) => {
                f.write_str("{")?;
                for (i, (k, v)) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    f.write_str("\"")?;
                    write_escaped_string(k, f)?;
                    write!(f, "\":{v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::{string::ToString, vec};

    use super::*;

    #[test]
    fn display_keeps_member_order_and_escapes() {
        let v = JsonValue::Object(vec![
            ("type".into(), JsonValue::String("Point".into())),
            (
                "coordinates".into(),
                JsonValue::Array(vec![
                    JsonValue::Number("1.5".into()),
                    JsonValue::Number("-2".into()),
                ]),
            ),
            ("note".into(), JsonValue::String("a\"b\n".into())),
        ]);
        assert_eq!(
            v.to_string(),
            r#"{"type":"Point","coordinates":[1.5,-2],"note":"a\"b\u000A"}"#
        );
        assert_eq!(v.get("type").and_then(JsonValue::as_str), Some("Point"));
    }
}
