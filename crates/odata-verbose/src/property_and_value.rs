//! Reading property values: primitives, complex values, collections, named
//! streams and spatial values, with or without declared types.
use alloc::{
    format,
    string::{String, ToString},
    vec::Vec,
};

use crate::{
    conversion,
    deserializer::{METADATA, RESULTS, VerboseJsonDeserializer, error_at},
    duplicate_names::DuplicatePropertyNamesChecker,
    entry_and_feed::read_metadata_type_name,
    error::{ErrorKind, ReaderError},
    json_value::{JsonNode, JsonNodeType, JsonValue},
    model::{ComplexType, ODataVersion, PrimitiveKind, PropertyType},
    validation,
    value::{CollectionValue, ComplexValue, ODataValue, PrimitiveValue, Property, StreamReferenceValue},
};

/// Where a value is being read. Named streams may only appear directly on an
/// entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValueContext {
    EntryProperty,
    Nested,
}

/// What an object with no declared type turns out to be.
#[derive(Debug, PartialEq, Eq)]
enum ObjectShape {
    StreamReference,
    Collection(Option<String>),
    Spatial,
    Complex,
}

impl<'m> VerboseJsonDeserializer<'_, 'm> {
    pub(crate) fn read_property_value(
        &mut self,
        name: &str,
        declared: Option<&PropertyType>,
        nullable: bool,
        context: ValueContext,
        depth: usize,
    ) -> Result<ODataValue, ReaderError> {
        if depth > self.settings.max_nesting_depth {
            return Err(self.error(ErrorKind::NestingTooDeep(self.settings.max_nesting_depth)));
        }
        if self.is_null() {
            validation::validate_null(name, nullable).map_err(|kind| self.error(kind))?;
            self.json.read()?;
            return Ok(ODataValue::Null);
        }
        match declared {
            Some(PropertyType::Primitive(kind)) => self.read_primitive_value(*kind).map(ODataValue::Primitive),
            Some(PropertyType::Complex(type_name)) => {
                self.read_complex_value(Some(type_name), depth).map(ODataValue::Complex)
            }
            Some(PropertyType::Collection(item)) => self.read_collection_value(name, Some(item), depth),
            Some(PropertyType::Stream) => self.read_stream_property(name, context),
            None => self.read_untyped_value(name, context, depth),
        }
    }

    fn read_primitive_value(&mut self, kind: PrimitiveKind) -> Result<PrimitiveValue, ReaderError> {
        if kind.is_spatial() && self.node_type() == JsonNodeType::StartObject {
            return self.read_spatial_value();
        }
        let position = self.json.position();
        let value = self.json.read_primitive()?;
        conversion::convert_primitive(&value, kind).map_err(|kind| error_at(position, kind))
    }

    fn read_spatial_value(&mut self) -> Result<PrimitiveValue, ReaderError> {
        validation::require_version(self.settings.version, ODataVersion::V3, "spatial values")
            .map_err(|kind| self.error(kind))?;
        Ok(PrimitiveValue::Spatial(self.json.read_json_value(self.settings.max_nesting_depth)?))
    }

    fn read_untyped_value(&mut self, name: &str, context: ValueContext, depth: usize) -> Result<ODataValue, ReaderError> {
        match self.node_type() {
            JsonNodeType::PrimitiveValue => {
                let position = self.json.position();
                let value = self.json.read_primitive()?;
                let primitive = conversion::infer_primitive(&value).map_err(|kind| error_at(position, kind))?;
                Ok(primitive.map_or(ODataValue::Null, ODataValue::Primitive))
            }
            JsonNodeType::StartArray => self.read_collection_value(name, None, depth),
            JsonNodeType::StartObject => match self.sniff_object_shape()? {
                ObjectShape::StreamReference => self.read_stream_property(name, context),
                ObjectShape::Collection(type_name) => {
                    let item = match type_name.as_deref().and_then(conversion::collection_item_type_name) {
                        Some(item_name) => Some(self.resolve_item_type(item_name)?),
                        None => None,
                    };
                    self.read_collection_value(name, item.as_ref(), depth)
                }
                ObjectShape::Spatial => self.read_spatial_value().map(ODataValue::Primitive),
                ObjectShape::Complex => self.read_complex_value(None, depth).map(ODataValue::Complex),
            },
            found => Err(self.error(ErrorKind::UnexpectedNode {
                expected: "a property value",
                found,
            })),
        }
    }

    /// Looks inside the object at the current node without consuming it.
    fn sniff_object_shape(&mut self) -> Result<ObjectShape, ReaderError> {
        let max_depth = self.settings.max_nesting_depth;
        self.json.buffered(|json| {
            json.read()?;
            let mut names: Vec<String> = Vec::new();
            let mut metadata_type = None;
            let mut has_geo_type = false;
            while json.node_type() == JsonNodeType::Property {
                let name = json.read_property_name()?;
                match name.as_str() {
                    METADATA => {
                        let metadata = json.read_json_value(max_depth)?;
                        metadata_type = metadata.get("type").and_then(JsonValue::as_str).map(String::from);
                    }
                    "type" => has_geo_type = json.read_json_value(max_depth)?.as_str().is_some(),
                    _ => json.skip_value()?,
                }
                names.push(name);
            }
            let has = |wanted: &str| names.iter().any(|n| n == wanted);
            let data_names = names.iter().filter(|n| *n != METADATA).count();

            Ok(if has("__mediaresource") {
                ObjectShape::StreamReference
            } else if metadata_type.as_deref().is_some_and(|t| t.starts_with("Collection(")) {
                ObjectShape::Collection(metadata_type)
            } else if has(RESULTS) && data_names == 1 {
                ObjectShape::Collection(metadata_type)
            } else if has_geo_type && (has("coordinates") || has("geometries")) {
                ObjectShape::Spatial
            } else {
                ObjectShape::Complex
            })
        })
    }

    fn resolve_item_type(&self, item_name: &str) -> Result<PropertyType, ReaderError> {
        if let Some(kind) = PrimitiveKind::from_name(item_name) {
            return Ok(PropertyType::Primitive(kind));
        }
        match self.model {
            Some(model) if model.complex_type(item_name).is_none() => {
                Err(self.error(ErrorKind::UnknownTypeName(item_name.to_string())))
            }
            _ => Ok(PropertyType::Complex(item_name.to_string())),
        }
    }

    /// Reads a complex value, checking its `__metadata` type against the
    /// declared one.
    pub(crate) fn read_complex_value(
        &mut self,
        declared: Option<&str>,
        depth: usize,
    ) -> Result<ComplexValue, ReaderError> {
        self.json.read_start_object()?;
        let payload_type = self.json.buffered(|json| {
            while json.node_type() == JsonNodeType::Property {
                if json.read_property_name()? == METADATA {
                    return read_metadata_type_name(json);
                }
                json.skip_value()?;
            }
            Ok(None)
        })?;
        let complex_type = self.resolve_complex_type(declared, payload_type.as_deref())?;

        let mut complex = ComplexValue {
            type_name: payload_type.or_else(|| declared.map(String::from)),
            properties: Vec::new(),
        };
        let mut checker = DuplicatePropertyNamesChecker::new(self.settings.allow_duplicate_property_names);
        let mut metadata_seen = false;
        while self.node_type() == JsonNodeType::Property {
            let name = self.json.read_property_name()?;
            if name == METADATA {
                if core::mem::replace(&mut metadata_seen, true) {
                    return Err(self.error(ErrorKind::DuplicateMetadata("complex value")));
                }
                self.json.skip_value()?;
                continue;
            }
            checker.check_property(&name).map_err(|kind| self.error(kind))?;
            let value = match complex_type {
                Some(complex_type) => match complex_type.find_property(&name) {
                    Some(property) => {
                        self.read_property_value(&name, Some(&property.ty), property.nullable, ValueContext::Nested, depth + 1)?
                    }
                    None if self.settings.ignore_undeclared_value_properties => {
                        self.json.skip_value()?;
                        continue;
                    }
                    None => {
                        return Err(self.error(ErrorKind::UndeclaredProperty {
                            property: name,
                            type_name: complex_type.name.clone(),
                        }));
                    }
                },
                None => self.read_property_value(&name, None, true, ValueContext::Nested, depth + 1)?,
            };
            complex.properties.push(Property { name, value });
        }
        self.json.read_end_object()?;
        Ok(complex)
    }

    fn resolve_complex_type(
        &self,
        declared: Option<&str>,
        payload_type: Option<&str>,
    ) -> Result<Option<&'m ComplexType>, ReaderError> {
        let Some(model) = self.model else {
            return Ok(None);
        };
        if let (Some(declared), Some(payload_type)) = (declared, payload_type) {
            if declared != payload_type {
                return Err(self.error(ErrorKind::IncompatibleType {
                    expected: declared.to_string(),
                    actual: payload_type.to_string(),
                }));
            }
        }
        match payload_type.or(declared) {
            Some(name) => model
                .complex_type(name)
                .map(Some)
                .ok_or_else(|| self.error(ErrorKind::UnknownTypeName(name.to_string()))),
            None => Ok(None),
        }
    }

    /// Reads `{"__metadata": ..., "results": [...]}` or a bare array.
    fn read_collection_value(
        &mut self,
        name: &str,
        item: Option<&PropertyType>,
        depth: usize,
    ) -> Result<ODataValue, ReaderError> {
        let mut collection = CollectionValue {
            type_name: item.map(|item| format!("Collection({})", item.type_name())),
            items: Vec::new(),
        };
        let wrapped = self.node_type() == JsonNodeType::StartObject;
        let mut item = item.cloned();
        if wrapped {
            self.json.read()?;
            self.read_collection_properties(&mut collection, &mut item, false)?;
        }

        self.json.read_start_array()?;
        while self.node_type() != JsonNodeType::EndArray {
            if self.is_null() {
                return Err(self.error(ErrorKind::NullValueInCollection(name.to_string())));
            }
            if let Some(PropertyType::Collection(_) | PropertyType::Stream) = item {
                return Err(self.error(ErrorKind::UnexpectedNode {
                    expected: "a primitive or complex collection item",
                    found: self.node_type(),
                }));
            }
            let value = self.read_property_value(name, item.as_ref(), false, ValueContext::Nested, depth + 1)?;
            collection.items.push(value);
        }
        self.json.read_end_array()?;

        if wrapped {
            self.read_collection_properties(&mut collection, &mut item, true)?;
            self.json.read_end_object()?;
        }
        Ok(ODataValue::Collection(collection))
    }

    /// Reads the members of a collection wrapper around `results`. Before
    /// `results` this stops on its value; after it, at the closing `}`.
    fn read_collection_properties(
        &mut self,
        collection: &mut CollectionValue,
        item: &mut Option<PropertyType>,
        after_results: bool,
    ) -> Result<(), ReaderError> {
        loop {
            match self.node_type() {
                JsonNodeType::EndObject if after_results => return Ok(()),
                JsonNodeType::EndObject => return Err(self.error(ErrorKind::MissingResultsProperty)),
                JsonNodeType::Property => {}
                found => {
                    return Err(self.error(ErrorKind::UnexpectedNode {
                        expected: "a collection property",
                        found,
                    }));
                }
            }
            let name = self.json.read_property_name()?;
            match name.as_str() {
                RESULTS if after_results => return Err(self.error(ErrorKind::DuplicatePropertyName(name))),
                RESULTS => return Ok(()),
                METADATA => {
                    let position = self.json.position();
                    let metadata = self.json.read_json_value(self.settings.max_nesting_depth)?;
                    let Some(payload_type) = metadata.get("type").and_then(JsonValue::as_str) else {
                        continue;
                    };
                    match &collection.type_name {
                        Some(declared) if declared != payload_type => {
                            return Err(error_at(
                                position,
                                ErrorKind::IncompatibleType {
                                    expected: declared.clone(),
                                    actual: payload_type.to_string(),
                                },
                            ));
                        }
                        Some(_) => {}
                        None => {
                            if let Some(item_name) = conversion::collection_item_type_name(payload_type) {
                                *item = Some(self.resolve_item_type(item_name)?);
                            }
                            collection.type_name = Some(payload_type.to_string());
                        }
                    }
                }
                _ => {
                    return Err(self.error(ErrorKind::UnexpectedProperty {
                        name,
                        context: "a collection value",
                    }));
                }
            }
        }
    }

    fn read_stream_property(&mut self, name: &str, context: ValueContext) -> Result<ODataValue, ReaderError> {
        if context != ValueContext::EntryProperty || !self.settings.reading_response {
            return Err(self.error(ErrorKind::StreamPropertyMisuse(name.to_string())));
        }
        validation::require_version(self.settings.version, ODataVersion::V3, "stream properties")
            .map_err(|kind| self.error(kind))?;
        self.read_stream_reference().map(ODataValue::StreamReference)
    }

    /// Reads `{"__mediaresource": {"edit_media": ..., "media_src": ...,
    /// "content_type": ..., "media_etag": ...}}`.
    fn read_stream_reference(&mut self) -> Result<StreamReferenceValue, ReaderError> {
        let mut stream = StreamReferenceValue::default();
        self.json.read_start_object()?;
        let name = self.json.read_property_name()?;
        if name != "__mediaresource" {
            return Err(self.error(ErrorKind::UnexpectedProperty {
                name,
                context: "a stream reference value",
            }));
        }
        self.json.read_start_object()?;
        while self.node_type() == JsonNodeType::Property {
            let slot = match self.json.read_property_name()?.as_str() {
                "edit_media" => &mut stream.edit_link,
                "media_src" => &mut stream.read_link,
                "content_type" => &mut stream.content_type,
                "media_etag" => &mut stream.etag,
                _ => {
                    self.json.skip_value()?;
                    continue;
                }
            };
            *slot = self.json.read_string_value()?;
        }
        self.json.read_end_object()?;
        if let JsonNode::Property(name) = self.json.node() {
            return Err(self.error(ErrorKind::UnexpectedProperty {
                name: name.clone(),
                context: "a stream reference value",
            }));
        }
        self.json.read_end_object()?;
        Ok(stream)
    }
}
