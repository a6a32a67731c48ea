//! Guessing what kind of payload a verbose JSON document holds.
use alloc::{string::String, vec, vec::Vec};

use crate::{
    buffering::{BufferingJsonReader, ObjectProcessing},
    deserializer::{DATA_WRAPPER, METADATA, RESULTS},
    error::ReaderError,
    json_value::JsonNodeType,
    options::ReaderSettings,
};

/// The kinds of payload a verbose JSON document can carry.
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PayloadKind {
    Feed,
    Entry,
    Property,
    Collection,
    EntityReferenceLink,
    EntityReferenceLinks,
    ServiceDocument,
    Error,
}

/// Returns every payload kind the document could be read as, most specific
/// first. The document is only inspected up to the first level of its top
/// object.
///
/// ```rust
/// use odata_verbose::{PayloadKind, ReaderSettings, detect_payload_kinds};
///
/// let kinds = detect_payload_kinds(br#"{"d": {"uri": "http://host/Customers(1)"}}"#, ReaderSettings::default()).unwrap();
/// assert_eq!(kinds, [PayloadKind::EntityReferenceLink]);
/// ```
///
/// # Errors
///
/// Fails on malformed JSON within the inspected part of the document.
pub fn detect_payload_kinds(input: &[u8], settings: ReaderSettings) -> Result<Vec<PayloadKind>, ReaderError> {
    let mut json = BufferingJsonReader::new(input, ObjectProcessing::default());
    json.read()?;

    let mut names = top_level_names(&mut json)?;
    let is_envelope = names.as_ref().is_some_and(|n| n.len() == 1 && n[0] == DATA_WRAPPER);
    if settings.reading_response && is_envelope {
        json.read_start_object()?;
        json.read_property_name()?;
        names = top_level_names(&mut json)?;
    }

    let Some(names) = names else {
        return Ok(match json.node_type() {
            JsonNodeType::StartArray => vec![PayloadKind::Feed, PayloadKind::Collection, PayloadKind::EntityReferenceLinks],
            _ => Vec::new(),
        });
    };
    let has = |wanted: &str| names.iter().any(|n| n == wanted);
    let only = |wanted: &[&str]| !names.is_empty() && names.iter().all(|n| wanted.contains(&n.as_str()));

    let kinds = if settings.reading_response && names.len() == 1 && has("error") {
        vec![PayloadKind::Error]
    } else if names.len() == 1 && has("EntitySets") {
        vec![PayloadKind::ServiceDocument]
    } else if names.len() == 1 && has("uri") {
        vec![PayloadKind::EntityReferenceLink]
    } else if has(RESULTS) && only(&[RESULTS, "__count", "__next", METADATA]) {
        vec![PayloadKind::Feed, PayloadKind::Collection, PayloadKind::EntityReferenceLinks]
    } else if has(METADATA) {
        vec![PayloadKind::Entry]
    } else if names.len() == 1 {
        vec![PayloadKind::Property, PayloadKind::Entry]
    } else {
        vec![PayloadKind::Entry]
    };
    Ok(kinds)
}

/// Property names of the object at the current node, or `None` when the
/// node is not an object.
fn top_level_names(json: &mut BufferingJsonReader<'_>) -> Result<Option<Vec<String>>, ReaderError> {
    if json.node_type() != JsonNodeType::StartObject {
        return Ok(None);
    }
    json.buffered(|json| {
        json.read()?;
        let mut names = Vec::new();
        while json.node_type() == JsonNodeType::Property {
            names.push(json.read_property_name()?);
            json.skip_value()?;
        }
        Ok(Some(names))
    })
}
