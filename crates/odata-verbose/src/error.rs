use alloc::string::String;

use thiserror::Error;

use crate::{json_value::JsonNodeType, model::ODataVersion};

/// An error raised while reading a verbose JSON payload.
///
/// Every error is fatal: once [`VerboseJsonReader::read`] returns one, the
/// reader stays in [`ReaderState::Exception`].
///
/// [`VerboseJsonReader::read`]: crate::VerboseJsonReader::read
/// [`ReaderState::Exception`]: crate::ReaderState::Exception
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} at {line}:{column}")]
pub struct ReaderError {
    pub(crate) kind: ErrorKind,
    pub line: usize,
    pub column: usize,
}

impl ReaderError {
    pub(crate) fn new(kind: ErrorKind, line: usize, column: usize) -> Self {
        Self { kind, line, column }
    }

    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }
}

/// Coarse classification of [`ErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The input is not well-formed JSON.
    Syntax,
    /// The token stream does not match the production expected at this point.
    Shape,
    /// A name or reserved member occurs more than once.
    Duplicate,
    /// The payload disagrees with the metadata or protocol version.
    Validation,
    /// A primitive value cannot be coerced to its declared type.
    Conversion,
    /// The payload carries a service error object.
    InStream,
    /// The reader was driven incorrectly.
    Usage,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SyntaxError {
    #[error("invalid character '{0}'")]
    InvalidCharacter(char),
    #[error("invalid unicode escape sequence \\u{0:X}")]
    InvalidUnicodeEscapeSequence(u32),
    #[error("invalid UTF-8 in input")]
    InvalidUtf8,
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ErrorKind {
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("unexpected {found} node, expected {expected}")]
    UnexpectedNode {
        expected: &'static str,
        found: JsonNodeType,
    },
    #[error("cannot read feed start: unexpected {0} node")]
    CannotReadFeedStart(JsonNodeType),
    #[error("cannot read feed entries: unexpected {0} node")]
    CannotReadFeedContent(JsonNodeType),
    #[error("feed wrapper object has no 'results' property")]
    MissingResultsProperty,
    #[error("deferred navigation link '{0}' is not allowed in a request payload")]
    DeferredLinkInRequest(String),
    #[error("property '{name}' is not allowed in {context}")]
    UnexpectedProperty { name: String, context: &'static str },
    #[error("nesting depth exceeds the limit of {0}")]
    NestingTooDeep(usize),

    #[error("multiple '__metadata' properties in {0}")]
    DuplicateMetadata(&'static str),
    #[error("duplicate property '{0}'")]
    DuplicatePropertyName(String),
    #[error("duplicate association link '{0}'")]
    DuplicateAssociationLink(String),
    #[error("stream property '{0}' is only allowed as a top-level entry property")]
    StreamPropertyMisuse(String),

    #[error("unknown type '{0}'")]
    UnknownTypeName(String),
    #[error("type '{actual}' is not compatible with expected type '{expected}'")]
    IncompatibleType { expected: String, actual: String },
    #[error("entity type name is missing and no type is expected")]
    MissingTypeName,
    #[error("entity type '{0}' is abstract")]
    AbstractType(String),
    #[error("feed items of type '{first}' and '{second}' have no common base type")]
    IncompatibleFeedItemTypes { first: String, second: String },
    #[error("property '{property}' is not declared on type '{type_name}'")]
    UndeclaredProperty { property: String, type_name: String },
    #[error("null value for non-nullable property '{0}'")]
    NullValueForNonNullable(String),
    #[error("null item in collection of '{0}'")]
    NullValueInCollection(String),
    #[error("entry of type '{0}' has a media resource but the type is not a media link entry")]
    UnexpectedMediaResource(String),
    #[error("entry of type '{0}' is a media link entry but carries no media resource")]
    MissingMediaResource(String),
    #[error("{feature} requires protocol version {required}, reading {actual}")]
    VersionNotSupported {
        feature: &'static str,
        required: ODataVersion,
        actual: ODataVersion,
    },

    #[error("cannot convert value '{value}' to '{type_name}'")]
    Conversion {
        type_name: &'static str,
        value: String,
    },

    #[error("in-stream error: {0}")]
    InStreamError(ODataError),

    #[error("reader cannot continue after an earlier error")]
    ReaderFailed,
}

impl ErrorKind {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        use ErrorKind::*;
        match self {
            Syntax(_) => ErrorCategory::Syntax,
            UnexpectedNode { .. }
            | CannotReadFeedStart(_)
            | CannotReadFeedContent(_)
            | MissingResultsProperty
            | DeferredLinkInRequest(_)
            | UnexpectedProperty { .. }
            | NestingTooDeep(_) => ErrorCategory::Shape,
            DuplicateMetadata(_)
            | DuplicatePropertyName(_)
            | DuplicateAssociationLink(_) => ErrorCategory::Duplicate,
            UnknownTypeName(_)
            | IncompatibleType { .. }
            | MissingTypeName
            | AbstractType(_)
            | IncompatibleFeedItemTypes { .. }
            | UndeclaredProperty { .. }
            | StreamPropertyMisuse(_)
            | NullValueForNonNullable(_)
            | NullValueInCollection(_)
            | UnexpectedMediaResource(_)
            | MissingMediaResource(_)
            | VersionNotSupported { .. } => ErrorCategory::Validation,
            Conversion { .. } => ErrorCategory::Conversion,
            InStreamError(_) => ErrorCategory::InStream,
            ReaderFailed => ErrorCategory::Usage,
        }
    }
}

/// A service error object found inside a response payload.
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ODataError {
    pub code: String,
    pub message: String,
    pub lang: Option<String>,
}

impl core::fmt::Display for ODataError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}
