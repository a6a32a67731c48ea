//! A pull reader for OData verbose JSON payloads.
//!
//! [`VerboseJsonReader`] turns a feed or entry payload into a sequence of
//! [`ReaderState`]s (feed start, entry start, navigation link start, ...), each
//! with the [`ReaderItem`] it describes. Entries are typed and validated
//! against an optional [`EdmModel`].
//!
//! ```rust
//! use odata_verbose::{
//!     EdmModel, EntityType, NavigationProperty, PrimitiveKind, ReaderSettings, ReaderState,
//!     VerboseJsonReader,
//! };
//!
//! let model = EdmModel::new()
//!     .with_entity_type(
//!         EntityType::new("NS.Customer")
//!             .with_primitive("ID", PrimitiveKind::Int32)
//!             .with_navigation(NavigationProperty::collection("Orders", "NS.Order")),
//!     )
//!     .with_entity_type(EntityType::new("NS.Order"));
//!
//! let payload = br#"{"d": {
//!     "__metadata": {"uri": "http://host/Customers(1)", "type": "NS.Customer"},
//!     "ID": 1,
//!     "Orders": {"__deferred": {"uri": "http://host/Customers(1)/Orders"}}
//! }}"#;
//!
//! let reader = VerboseJsonReader::for_entry(payload, Some(&model), Some("NS.Customer"), ReaderSettings::default())
//!     .unwrap();
//! let states: Vec<_> = reader.map(|event| event.unwrap().state).collect();
//! assert_eq!(
//!     states,
//!     [
//!         ReaderState::EntryStart,
//!         ReaderState::NavigationLinkStart,
//!         ReaderState::NavigationLinkEnd,
//!         ReaderState::EntryEnd,
//!     ]
//! );
//! ```

#![no_std]
#![allow(missing_docs)]
extern crate alloc;

#[cfg(test)]
extern crate std;

mod buffering;
mod conversion;
mod dedup;
mod deserializer;
mod detection;
mod duplicate_names;
mod entry_and_feed;
mod error;
mod item;
mod json_value;
mod model;
mod options;
mod property_and_value;
mod reader;
mod scope;
mod tokenizer;
mod validation;
mod value;


pub use detection::{PayloadKind, detect_payload_kinds};
pub use error::{ErrorCategory, ErrorKind, ODataError, ReaderError, SyntaxError};
pub use item::{AssociationLink, EntityReferenceLink, Entry, Feed, NavigationLink, OperationLink, ReaderItem};
pub use json_value::{JsonNode, JsonNodeType, JsonPrimitive, JsonValue};
pub use model::{
    ComplexType, EdmModel, EntityType, NavigationProperty, ODataVersion, PrimitiveKind, PropertyType,
    StructuralProperty,
};
pub use options::ReaderSettings;
pub use reader::{ReaderEvent, ReaderListener, VerboseJsonReader};
pub use scope::ReaderState;
pub use tokenizer::{Position, Tokenizer};
pub use value::{CollectionValue, ComplexValue, ODataValue, PrimitiveValue, Property, StreamReferenceValue};
