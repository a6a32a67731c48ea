//! Shape-aware reading on top of the buffering token reader.
//!
//! The deserializer knows what feeds, entries, links and values look like in
//! verbose JSON. It never decides what to report next; that is the job of
//! [`VerboseJsonReader`](crate::VerboseJsonReader), which calls into the
//! operations defined here and in the `entry_and_feed` and
//! `property_and_value` modules.
use alloc::string::String;

use crate::{
    buffering::{BufferingJsonReader, ObjectProcessing},
    error::{ErrorKind, ReaderError},
    json_value::{JsonNode, JsonNodeType, JsonPrimitive},
    model::EdmModel,
    options::ReaderSettings,
    tokenizer::Position,
};

/// Name of the single property of a response envelope.
pub(crate) const DATA_WRAPPER: &str = "d";
pub(crate) const METADATA: &str = "__metadata";
pub(crate) const DEFERRED: &str = "__deferred";
pub(crate) const RESULTS: &str = "results";

#[derive(Debug)]
pub(crate) struct VerboseJsonDeserializer<'src, 'm> {
    pub(crate) json: BufferingJsonReader<'src>,
    pub(crate) model: Option<&'m EdmModel>,
    pub(crate) settings: ReaderSettings,
    has_envelope: bool,
}

impl<'src, 'm> VerboseJsonDeserializer<'src, 'm> {
    pub(crate) fn new(input: &'src [u8], model: Option<&'m EdmModel>, settings: ReaderSettings) -> Self {
        let processing = ObjectProcessing {
            detect_in_stream_errors: settings.reading_response && settings.detect_in_stream_errors,
            deduplicate_properties: settings.server_compatibility,
        };
        Self {
            json: BufferingJsonReader::new(input, processing),
            model,
            settings,
            has_envelope: false,
        }
    }

    pub(crate) fn error(&self, kind: ErrorKind) -> ReaderError {
        self.json.error(kind)
    }

    pub(crate) fn node_type(&self) -> JsonNodeType {
        self.json.node_type()
    }

    pub(crate) fn is_null(&self) -> bool {
        matches!(self.json.node(), JsonNode::Primitive(JsonPrimitive::Null))
    }

    /// Moves onto the first node and steps into the `{"d": ...}` envelope of
    /// a response, if there is one.
    pub(crate) fn read_payload_start(&mut self) -> Result<(), ReaderError> {
        self.json.read()?;
        if self.settings.reading_response && self.is_response_envelope()? {
            self.json.read_start_object()?;
            self.json.read_property_name()?;
            self.has_envelope = true;
        }
        Ok(())
    }

    /// Leaves the envelope and requires the end of input.
    pub(crate) fn read_payload_end(&mut self) -> Result<(), ReaderError> {
        if self.has_envelope {
            self.json.read_end_object()?;
        }
        self.json.expect(JsonNodeType::EndOfInput, "end of input")
    }

    /// An envelope is an object whose only property is `d` and holds an
    /// object or array.
    fn is_response_envelope(&mut self) -> Result<bool, ReaderError> {
        if self.json.node_type() != JsonNodeType::StartObject {
            return Ok(false);
        }
        self.json.buffered(|json| {
            json.read()?;
            if json.property_name() != Some(DATA_WRAPPER) {
                return Ok(false);
            }
            json.read()?;
            if !matches!(json.node_type(), JsonNodeType::StartObject | JsonNodeType::StartArray) {
                return Ok(false);
            }
            json.skip_value()?;
            Ok(json.node_type() == JsonNodeType::EndObject)
        })
    }

    /// Whether the value at the current node is `{"__deferred": {...}}`.
    pub(crate) fn is_deferred_link(&mut self) -> Result<bool, ReaderError> {
        if self.json.node_type() != JsonNodeType::StartObject {
            return Ok(false);
        }
        self.json.buffered(|json| {
            json.read()?;
            if json.property_name() != Some(DEFERRED) {
                return Ok(false);
            }
            json.read()?;
            json.skip_value()?;
            Ok(json.node_type() == JsonNodeType::EndObject)
        })
    }

    /// Reads a deferred link value, returning its `uri`.
    pub(crate) fn read_deferred_link(&mut self) -> Result<Option<String>, ReaderError> {
        self.json.read_start_object()?;
        self.json.read_property_name()?;
        self.json.read_start_object()?;
        let mut url = None;
        while self.json.node_type() == JsonNodeType::Property {
            if self.json.read_property_name()? == "uri" {
                url = self.json.read_string_value()?;
            } else {
                self.json.skip_value()?;
            }
        }
        self.json.read_end_object()?;
        self.json.read_end_object()?;
        Ok(url)
    }

    /// Whether the value at the current node is `{"__metadata": {"uri": ...}}`
    /// with nothing else in either object.
    pub(crate) fn is_entity_reference_link(&mut self) -> Result<bool, ReaderError> {
        if self.json.node_type() != JsonNodeType::StartObject {
            return Ok(false);
        }
        self.json.buffered(|json| {
            json.read()?;
            if json.property_name() != Some(METADATA) {
                return Ok(false);
            }
            json.read()?;
            if json.node_type() != JsonNodeType::StartObject {
                return Ok(false);
            }
            json.read()?;
            let mut has_uri = false;
            while json.node_type() == JsonNodeType::Property {
                if json.read_property_name()? != "uri" {
                    return Ok(false);
                }
                has_uri = true;
                json.skip_value()?;
            }
            json.read()?;
            Ok(has_uri && json.node_type() == JsonNodeType::EndObject)
        })
    }
}

pub(crate) fn error_at(position: Position, kind: ErrorKind) -> ReaderError {
    ReaderError::new(kind, position.line, position.column)
}
