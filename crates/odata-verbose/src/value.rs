//! Property values produced while reading entries.
use alloc::{string::String, vec::Vec};

use crate::json_value::JsonValue;

/// A converted primitive value.
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub enum PrimitiveValue {
    Boolean(bool),
    Byte(u8),
    SByte(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Single(f32),
    Double(f64),
    /// Decimal digits as they appeared in the payload.
    Decimal(String),
    String(String),
    Guid(String),
    Binary(Vec<u8>),
    /// `\/Date(ticks)\/`: milliseconds since the Unix epoch, with the optional
    /// offset in minutes.
    DateTime {
        millis: i64,
        offset_minutes: Option<i32>,
    },
    DateTimeOffset(String),
    Time(String),
    /// A GeoJSON object for one of the spatial kinds.
    Spatial(JsonValue),
}

/// Reference to a named stream or to the media resource of an entry.
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamReferenceValue {
    pub edit_link: Option<String>,
    pub read_link: Option<String>,
    pub content_type: Option<String>,
    pub etag: Option<String>,
}

#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComplexValue {
    pub type_name: Option<String>,
    pub properties: Vec<Property>,
}

#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollectionValue {
    pub type_name: Option<String>,
    pub items: Vec<ODataValue>,
}

#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub enum ODataValue {
    Null,
    Primitive(PrimitiveValue),
    Complex(ComplexValue),
    Collection(CollectionValue),
    StreamReference(StreamReferenceValue),
}

impl ODataValue {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_primitive(&self) -> Option<&PrimitiveValue> {
        match self {
            Self::Primitive(p) => Some(p),
            _ => None,
        }
    }
}

impl From<PrimitiveValue> for ODataValue {
    fn from(value: PrimitiveValue) -> Self {
        Self::Primitive(value)
    }
}

/// A named value inside an entry or complex value.
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: ODataValue,
}
