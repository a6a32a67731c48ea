//! Feed wrappers, entry metadata, entry content and link shapes.
use alloc::{string::String, vec::Vec};

use tracing::trace;

use crate::{
    buffering::BufferingJsonReader,
    conversion,
    deserializer::{METADATA, RESULTS, VerboseJsonDeserializer, error_at},
    duplicate_names::DuplicatePropertyNamesChecker,
    error::{ErrorKind, ReaderError},
    item::{AssociationLink, EntityReferenceLink, Entry, Feed, NavigationLink, OperationLink},
    json_value::JsonNodeType,
    model::{EntityType, NavigationProperty, ODataVersion, StructuralProperty},
    options::ReaderSettings,
    property_and_value::ValueContext,
    validation::{self, FeedItemTypeValidator},
    value::Property,
};

/// Which reserved properties of a feed wrapper object have been read.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FeedWrapper {
    results: bool,
    count: bool,
    next: bool,
    metadata: bool,
}

/// A navigation link found in entry content that has not been reported yet.
#[derive(Debug, Clone)]
pub(crate) struct PendingLink<'m> {
    pub(crate) link: NavigationLink,
    /// Declared target type of the link.
    pub(crate) target: Option<&'m EntityType>,
    /// The link was deferred and its value is already consumed.
    pub(crate) deferred: bool,
}

enum EntryProperty<'m> {
    Navigation(&'m NavigationProperty),
    Declared(&'m StructuralProperty),
    Undeclared { closed_type: Option<&'m EntityType> },
}

impl<'m> VerboseJsonDeserializer<'_, 'm> {
    /// Reads up to the first entry of a feed: either the `[` of a bare array
    /// or a wrapper object up to and including the `[` of its `results`.
    pub(crate) fn read_feed_start(&mut self, feed: &mut Feed) -> Result<Option<FeedWrapper>, ReaderError> {
        match self.node_type() {
            JsonNodeType::StartArray => {
                self.json.read()?;
                Ok(None)
            }
            JsonNodeType::StartObject => {
                self.json.read()?;
                let mut wrapper = FeedWrapper::default();
                self.read_feed_properties(feed, &mut wrapper)?;
                let found = self.node_type();
                if found != JsonNodeType::StartArray {
                    return Err(self.error(ErrorKind::CannotReadFeedStart(found)));
                }
                self.json.read()?;
                Ok(Some(wrapper))
            }
            found => Err(self.error(ErrorKind::CannotReadFeedStart(found))),
        }
    }

    /// Consumes the `]` of a feed and, for a wrapper, the properties after
    /// `results` and the closing `}`.
    pub(crate) fn read_feed_end(&mut self, feed: &mut Feed, wrapper: Option<FeedWrapper>) -> Result<(), ReaderError> {
        self.json.read_end_array()?;
        if let Some(mut wrapper) = wrapper {
            self.read_feed_properties(feed, &mut wrapper)?;
            self.json.read_end_object()?;
        }
        Ok(())
    }

    /// Reads wrapper properties until `results` (stopping on its value) or,
    /// once `results` has been read, until the end of the wrapper.
    fn read_feed_properties(&mut self, feed: &mut Feed, wrapper: &mut FeedWrapper) -> Result<(), ReaderError> {
        let before_results = !wrapper.results;
        loop {
            match self.node_type() {
                JsonNodeType::EndObject if before_results => {
                    return Err(self.error(ErrorKind::MissingResultsProperty));
                }
                JsonNodeType::EndObject => return Ok(()),
                JsonNodeType::Property => {}
                found => {
                    return Err(self.error(ErrorKind::UnexpectedNode {
                        expected: "a feed property",
                        found,
                    }));
                }
            }
            let name = self.json.property_name().map(String::from).unwrap_or_default();
            let seen = match name.as_str() {
                RESULTS => &mut wrapper.results,
                "__count" => &mut wrapper.count,
                "__next" => &mut wrapper.next,
                METADATA => &mut wrapper.metadata,
                _ => {
                    self.json.read()?;
                    self.json.skip_value()?;
                    continue;
                }
            };
            if core::mem::replace(seen, true) {
                return Err(self.error(if name == METADATA {
                    ErrorKind::DuplicateMetadata("feed")
                } else {
                    ErrorKind::DuplicatePropertyName(name)
                }));
            }
            self.json.read()?;
            match name.as_str() {
                RESULTS => return Ok(()),
                "__count" => feed.count = Some(self.read_count()?),
                "__next" => feed.next_page_link = self.json.read_string_value()?,
                _ => self.read_feed_metadata(feed)?,
            }
        }
    }

    fn read_count(&mut self) -> Result<i64, ReaderError> {
        let position = self.json.position();
        let value = self.json.read_primitive()?;
        conversion::convert_int64(&value).map_err(|kind| error_at(position, kind))
    }

    fn read_feed_metadata(&mut self, feed: &mut Feed) -> Result<(), ReaderError> {
        self.json.read_start_object()?;
        while self.node_type() == JsonNodeType::Property {
            if self.json.read_property_name()? == "uri" {
                feed.id = self.json.read_string_value()?;
            } else {
                self.json.skip_value()?;
            }
        }
        self.json.read_end_object()
    }

    /// Consumes the `{` of an entry.
    pub(crate) fn read_entry_start(&mut self) -> Result<Entry, ReaderError> {
        self.json.read_start_object()?;
        Ok(Entry::default())
    }

    /// Finds the entry's `__metadata` ahead of its other properties,
    /// resolves the entry type from it and reads the whole block, leaving
    /// the reader on the entry's first property.
    pub(crate) fn read_entry_metadata(
        &mut self,
        entry: &mut Entry,
        expected: Option<&'m EntityType>,
        feed_item_types: Option<&mut FeedItemTypeValidator<'m>>,
        checker: &mut DuplicatePropertyNamesChecker,
    ) -> Result<Option<&'m EntityType>, ReaderError> {
        let model = self.model;
        let settings = self.settings;
        self.json.buffered(|json| {
            let mut found = false;
            while json.node_type() == JsonNodeType::Property {
                if json.property_name() == Some(METADATA) {
                    if found {
                        return Err(json.error(ErrorKind::DuplicateMetadata("entry")));
                    }
                    found = true;
                    json.bookmark();
                }
                json.read()?;
                json.skip_value()?;
            }

            let payload_type = if found {
                json.move_to_bookmark();
                json.read()?;
                read_metadata_type_name(json)?
            } else {
                None
            };
            trace!(?payload_type, "entry type name");
            let entity_type = validation::resolve_entry_type(model, payload_type.as_deref(), expected)
                .map_err(|kind| json.error(kind))?;
            if let (Some(model), Some(entity_type), Some(validator)) = (model, entity_type, feed_item_types) {
                validator.validate(model, entity_type).map_err(|kind| json.error(kind))?;
            }

            if found {
                json.move_to_bookmark();
                json.read()?;
                read_metadata_block(json, entry, settings, checker)?;
            }
            if let (Some(model), Some(entity_type)) = (model, entity_type) {
                validation::validate_media_resource(model, entity_type, entry.media_resource.is_some())
                    .map_err(|kind| json.error(kind))?;
            }
            Ok(entity_type)
        })
    }

    /// Reads data properties into `entry` until the end of the entry or the
    /// next navigation link. A link's value is left unread unless the link is
    /// deferred.
    pub(crate) fn read_entry_content(
        &mut self,
        entry: &mut Entry,
        entity_type: Option<&'m EntityType>,
        checker: &mut DuplicatePropertyNamesChecker,
    ) -> Result<Option<PendingLink<'m>>, ReaderError> {
        loop {
            match self.node_type() {
                JsonNodeType::EndObject => return Ok(None),
                JsonNodeType::Property => {}
                found => {
                    return Err(self.error(ErrorKind::UnexpectedNode {
                        expected: "an entry property",
                        found,
                    }));
                }
            }
            let name = self.json.read_property_name()?;
            if name == METADATA {
                self.json.skip_value()?;
                continue;
            }

            match self.classify_entry_property(entity_type, &name) {
                EntryProperty::Navigation(navigation) => {
                    checker.check_navigation_link(&name).map_err(|kind| self.error(kind))?;
                    let target = match self.model {
                        Some(model) => Some(
                            model
                                .entity_type(&navigation.target)
                                .ok_or_else(|| self.error(ErrorKind::UnknownTypeName(navigation.target.clone())))?,
                        ),
                        None => None,
                    };
                    let mut link = NavigationLink {
                        name,
                        is_collection: Some(navigation.is_collection),
                        url: None,
                    };
                    let deferred = self.read_link_if_deferred(&mut link)?;
                    return Ok(Some(PendingLink { link, target, deferred }));
                }
                EntryProperty::Declared(property) => {
                    checker.check_property(&name).map_err(|kind| self.error(kind))?;
                    let value = self.read_property_value(
                        &name,
                        Some(&property.ty),
                        property.nullable,
                        ValueContext::EntryProperty,
                        0,
                    )?;
                    entry.properties.push(Property { name, value });
                }
                EntryProperty::Undeclared { closed_type } => {
                    if self.is_deferred_link()? {
                        if entity_type.is_some() && !self.settings.report_undeclared_link_properties {
                            return Err(self.undeclared(name, entity_type));
                        }
                        checker.check_navigation_link(&name).map_err(|kind| self.error(kind))?;
                        let mut link = NavigationLink {
                            name,
                            is_collection: None,
                            url: None,
                        };
                        let deferred = self.read_link_if_deferred(&mut link)?;
                        return Ok(Some(PendingLink {
                            link,
                            target: None,
                            deferred,
                        }));
                    }
                    if closed_type.is_some() {
                        if self.settings.ignore_undeclared_value_properties {
                            self.json.skip_value()?;
                            continue;
                        }
                        return Err(self.undeclared(name, closed_type));
                    }
                    checker.check_property(&name).map_err(|kind| self.error(kind))?;
                    let value = self.read_property_value(&name, None, true, ValueContext::EntryProperty, 0)?;
                    entry.properties.push(Property { name, value });
                }
            }
        }
    }

    fn classify_entry_property(&self, entity_type: Option<&'m EntityType>, name: &str) -> EntryProperty<'m> {
        let (Some(model), Some(entity_type)) = (self.model, entity_type) else {
            return EntryProperty::Undeclared { closed_type: None };
        };
        if let Some(navigation) = model.find_navigation_property(entity_type, name) {
            return EntryProperty::Navigation(navigation);
        }
        if let Some(property) = model.find_property(entity_type, name) {
            return EntryProperty::Declared(property);
        }
        EntryProperty::Undeclared {
            closed_type: (!model.is_open(entity_type)).then_some(entity_type),
        }
    }

    fn undeclared(&self, property: String, entity_type: Option<&EntityType>) -> ReaderError {
        self.error(ErrorKind::UndeclaredProperty {
            property,
            type_name: entity_type.map(|t| t.name.clone()).unwrap_or_default(),
        })
    }

    /// Consumes a deferred link value and records its url. Requests cannot
    /// carry deferred links.
    fn read_link_if_deferred(&mut self, link: &mut NavigationLink) -> Result<bool, ReaderError> {
        if !self.is_deferred_link()? {
            return Ok(false);
        }
        if !self.settings.reading_response {
            return Err(self.error(ErrorKind::DeferredLinkInRequest(link.name.clone())));
        }
        link.url = self.read_deferred_link()?;
        Ok(true)
    }

    /// Reads `{"__metadata": {"uri": ...}}`.
    pub(crate) fn read_entity_reference_link(&mut self) -> Result<EntityReferenceLink, ReaderError> {
        self.json.read_start_object()?;
        self.json.read_property_name()?;
        self.json.read_start_object()?;
        self.json.read_property_name()?;
        let position = self.json.position();
        let url = self.json.read_string_value()?.ok_or_else(|| {
            error_at(
                position,
                ErrorKind::UnexpectedNode {
                    expected: "a string value",
                    found: JsonNodeType::PrimitiveValue,
                },
            )
        })?;
        self.json.read_end_object()?;
        self.json.read_end_object()?;
        Ok(EntityReferenceLink { url })
    }
}

/// Returns the `type` of the `__metadata` object at the current node.
pub(crate) fn read_metadata_type_name(json: &mut BufferingJsonReader<'_>) -> Result<Option<String>, ReaderError> {
    json.read_start_object()?;
    while json.node_type() == JsonNodeType::Property {
        if json.read_property_name()? == "type" {
            return json.read_string_value();
        }
        json.skip_value()?;
    }
    Ok(None)
}

fn read_metadata_block(
    json: &mut BufferingJsonReader<'_>,
    entry: &mut Entry,
    settings: ReaderSettings,
    checker: &mut DuplicatePropertyNamesChecker,
) -> Result<(), ReaderError> {
    json.read_start_object()?;
    let mut seen: Vec<String> = Vec::new();
    while json.node_type() == JsonNodeType::Property {
        let name = json.read_property_name()?;
        if seen.contains(&name) {
            return Err(json.error(ErrorKind::DuplicatePropertyName(alloc::format!("{METADATA}.{name}"))));
        }
        match name.as_str() {
            "uri" => {
                let uri = json.read_string_value()?;
                entry.edit_link.clone_from(&uri);
                entry.read_link.clone_from(&uri);
                if entry.id.is_none() {
                    entry.id = uri;
                }
            }
            "id" => entry.id = json.read_string_value()?,
            "etag" => entry.etag = json.read_string_value()?,
            "type" => entry.type_name = json.read_string_value()?,
            "media_src" => entry.media_resource.get_or_insert_with(Default::default).read_link = json.read_string_value()?,
            "edit_media" => entry.media_resource.get_or_insert_with(Default::default).edit_link = json.read_string_value()?,
            "content_type" => {
                entry.media_resource.get_or_insert_with(Default::default).content_type = json.read_string_value()?;
            }
            "media_etag" => entry.media_resource.get_or_insert_with(Default::default).etag = json.read_string_value()?,
            "actions" | "functions" => {
                validation::require_version(settings.version, ODataVersion::V3, "actions and functions")
                    .map_err(|kind| json.error(kind))?;
                let operations = read_operations(json)?;
                if name == "actions" {
                    entry.actions = operations;
                } else {
                    entry.functions = operations;
                }
            }
            "properties" => {
                validation::require_version(settings.version, ODataVersion::V3, "association links")
                    .map_err(|kind| json.error(kind))?;
                read_association_links(json, entry, checker)?;
            }
            _ => json.skip_value()?,
        }
        seen.push(name);
    }
    json.read_end_object()
}

/// `{"<metadata>": [{"title": ..., "target": ...}, ...], ...}`
fn read_operations(json: &mut BufferingJsonReader<'_>) -> Result<Vec<OperationLink>, ReaderError> {
    let mut operations = Vec::new();
    json.read_start_object()?;
    while json.node_type() == JsonNodeType::Property {
        let metadata = json.read_property_name()?;
        json.read_start_array()?;
        while json.node_type() != JsonNodeType::EndArray {
            let mut operation = OperationLink {
                metadata: metadata.clone(),
                ..OperationLink::default()
            };
            json.read_start_object()?;
            while json.node_type() == JsonNodeType::Property {
                match json.read_property_name()?.as_str() {
                    "title" => operation.title = json.read_string_value()?,
                    "target" => operation.target = json.read_string_value()?,
                    _ => json.skip_value()?,
                }
            }
            json.read_end_object()?;
            operations.push(operation);
        }
        json.read_end_array()?;
    }
    json.read_end_object()?;
    Ok(operations)
}

/// `{"<navigation property>": {"associationuri": ...}, ...}`
fn read_association_links(
    json: &mut BufferingJsonReader<'_>,
    entry: &mut Entry,
    checker: &mut DuplicatePropertyNamesChecker,
) -> Result<(), ReaderError> {
    json.read_start_object()?;
    while json.node_type() == JsonNodeType::Property {
        let name = json.read_property_name()?;
        checker.check_association_link(&name).map_err(|kind| json.error(kind))?;
        json.read_start_object()?;
        let mut url = None;
        while json.node_type() == JsonNodeType::Property {
            if json.read_property_name()? == "associationuri" {
                url = json.read_string_value()?;
            } else {
                json.skip_value()?;
            }
        }
        json.read_end_object()?;
        if let Some(url) = url {
            entry.association_links.push(AssociationLink {
                name,
                url,
            });
        }
    }
    json.read_end_object()
}
