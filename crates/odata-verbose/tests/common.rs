#![allow(missing_docs, dead_code)]

use core::fmt::Write;

use odata_verbose::{
    ComplexType, EdmModel, EntityType, NavigationProperty, PrimitiveKind, PropertyType, ReaderError, ReaderEvent,
    ReaderItem, ReaderSettings, VerboseJsonReader,
};

/// People, customers, orders and photos.
pub fn model() -> EdmModel {
    EdmModel::new()
        .with_entity_type(
            EntityType::new("NS.Person")
                .abstract_type()
                .with_primitive("Name", PrimitiveKind::String),
        )
        .with_entity_type(
            EntityType::new("NS.Customer")
                .with_base("NS.Person")
                .with_property("ID", PropertyType::Primitive(PrimitiveKind::Int32), false)
                .with_property("Address", PropertyType::Complex("NS.Address".into()), true)
                .with_property(
                    "Emails",
                    PropertyType::Collection(Box::new(PropertyType::Primitive(PrimitiveKind::String))),
                    true,
                )
                .with_property("Thumbnail", PropertyType::Stream, true)
                .with_primitive("Since", PrimitiveKind::DateTime)
                .with_primitive("Balance", PrimitiveKind::Decimal)
                .with_primitive("Location", PrimitiveKind::GeographyPoint)
                .with_navigation(NavigationProperty::collection("Orders", "NS.Order"))
                .with_navigation(NavigationProperty::single("BestFriend", "NS.Customer")),
        )
        .with_entity_type(EntityType::new("NS.VipCustomer").with_base("NS.Customer"))
        .with_entity_type(EntityType::new("NS.Employee").with_base("NS.Person"))
        .with_entity_type(
            EntityType::new("NS.Order")
                .with_property("ID", PropertyType::Primitive(PrimitiveKind::Int32), false)
                .with_primitive("Amount", PrimitiveKind::Decimal)
                .with_navigation(NavigationProperty::single("Customer", "NS.Customer")),
        )
        .with_entity_type(EntityType::new("NS.Tag").open().with_primitive("Label", PrimitiveKind::String))
        .with_entity_type(
            EntityType::new("NS.Photo")
                .media_link_entry()
                .with_primitive("ID", PrimitiveKind::Int32),
        )
        .with_complex_type(
            ComplexType::new("NS.Address")
                .with_primitive("Street", PrimitiveKind::String)
                .with_primitive("City", PrimitiveKind::String),
        )
}

/// One line per event: the state, then whatever identifies its item.
pub fn describe(event: &ReaderEvent) -> String {
    let mut line = format!("{:?}", event.state);
    match &event.item {
        ReaderItem::None => {}
        ReaderItem::Feed(feed) => {
            if let Some(id) = &feed.id {
                write!(line, " id={id}").unwrap();
            }
            if let Some(count) = feed.count {
                write!(line, " count={count}").unwrap();
            }
            if let Some(next) = &feed.next_page_link {
                write!(line, " next={next}").unwrap();
            }
        }
        ReaderItem::Entry(None) => line.push_str(" null"),
        ReaderItem::Entry(Some(entry)) => {
            if let Some(type_name) = &entry.type_name {
                write!(line, " type={type_name}").unwrap();
            }
            if let Some(id) = &entry.id {
                write!(line, " id={id}").unwrap();
            }
            if !entry.properties.is_empty() {
                let names: Vec<&str> = entry.properties.iter().map(|p| p.name.as_str()).collect();
                write!(line, " props=[{}]", names.join(",")).unwrap();
            }
        }
        ReaderItem::NavigationLink(link) => {
            write!(line, " {}", link.name).unwrap();
            match link.is_collection {
                Some(true) => line.push_str(" collection"),
                Some(false) => line.push_str(" single"),
                None => {}
            }
            if let Some(url) = &link.url {
                write!(line, " url={url}").unwrap();
            }
        }
        ReaderItem::EntityReferenceLink(link) => write!(line, " {}", link.url).unwrap(),
    }
    line
}

/// Drains the reader, rendering every event and the error that stopped it.
pub fn render(reader: VerboseJsonReader<'_, '_>) -> String {
    let mut out = String::new();
    for event in reader {
        match event {
            Ok(event) => writeln!(out, "{}", describe(&event)).unwrap(),
            Err(error) => writeln!(out, "error: {}", error.kind()).unwrap(),
        }
    }
    out
}

pub fn render_feed(payload: &str, model: Option<&EdmModel>, expected: Option<&str>, settings: ReaderSettings) -> String {
    render(VerboseJsonReader::for_feed(payload.as_bytes(), model, expected, settings).unwrap())
}

pub fn render_entry(payload: &str, model: Option<&EdmModel>, expected: Option<&str>, settings: ReaderSettings) -> String {
    render(VerboseJsonReader::for_entry(payload.as_bytes(), model, expected, settings).unwrap())
}

/// Collects events up to the end, returning the error if the read failed.
pub fn read_all(mut reader: VerboseJsonReader<'_, '_>) -> (Vec<ReaderEvent>, Option<ReaderError>) {
    let mut events = Vec::new();
    for event in reader.by_ref() {
        match event {
            Ok(event) => events.push(event),
            Err(error) => return (events, Some(error)),
        }
    }
    (events, None)
}

/// The error a payload fails with.
pub fn entry_error(payload: &str, model: Option<&EdmModel>, expected: Option<&str>, settings: ReaderSettings) -> ReaderError {
    let reader = VerboseJsonReader::for_entry(payload.as_bytes(), model, expected, settings).unwrap();
    read_all(reader).1.expect("payload was read without error")
}

pub fn feed_error(payload: &str, model: Option<&EdmModel>, expected: Option<&str>, settings: ReaderSettings) -> ReaderError {
    let reader = VerboseJsonReader::for_feed(payload.as_bytes(), model, expected, settings).unwrap();
    read_all(reader).1.expect("payload was read without error")
}
