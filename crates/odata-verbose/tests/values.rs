#![expect(missing_docs)]

mod common;

use common::{entry_error, model, read_all};
use odata_verbose::{
    CollectionValue, ComplexValue, EdmModel, Entry, ErrorCategory, ErrorKind, JsonValue, ODataValue, ODataVersion,
    PrimitiveValue, Property, ReaderSettings, ReaderState, StreamReferenceValue, VerboseJsonReader,
};

/// Reads a single entry and returns it as reported at `EntryEnd`.
fn read_entry(payload: &str, model: Option<&EdmModel>, settings: ReaderSettings) -> Entry {
    let reader = VerboseJsonReader::for_entry(payload.as_bytes(), model, None, settings).unwrap();
    let (events, error) = read_all(reader);
    assert!(error.is_none(), "{error:?}");
    let end = events.iter().rfind(|e| e.state == ReaderState::EntryEnd).unwrap();
    end.item.as_entry().unwrap().clone()
}

fn value<'e>(entry: &'e Entry, name: &str) -> &'e ODataValue {
    &entry.property(name).unwrap().value
}

fn string(s: &str) -> ODataValue {
    ODataValue::Primitive(PrimitiveValue::String(s.into()))
}

#[test]
fn declared_values_are_converted() {
    let model = model();
    let payload = r#"{
        "__metadata": {"type": "NS.Customer"},
        "ID": "7",
        "Since": "\/Date(946684800000+60)\/",
        "Balance": "12.50",
        "Address": {"__metadata": {"type": "NS.Address"}, "Street": "Main", "City": null},
        "Emails": {"__metadata": {"type": "Collection(Edm.String)"}, "results": ["a@host", "b@host"]},
        "Location": {"type": "Point", "coordinates": [10.5, 59.9]}
    }"#;
    let entry = read_entry(payload, Some(&model), ReaderSettings::default());

    assert_eq!(value(&entry, "ID"), &ODataValue::Primitive(PrimitiveValue::Int32(7)));
    assert_eq!(
        value(&entry, "Since"),
        &ODataValue::Primitive(PrimitiveValue::DateTime {
            millis: 946_684_800_000,
            offset_minutes: Some(60),
        })
    );
    assert_eq!(value(&entry, "Balance"), &ODataValue::Primitive(PrimitiveValue::Decimal("12.50".into())));
    assert_eq!(
        value(&entry, "Address"),
        &ODataValue::Complex(ComplexValue {
            type_name: Some("NS.Address".into()),
            properties: vec![
                Property {
                    name: "Street".into(),
                    value: string("Main"),
                },
                Property {
                    name: "City".into(),
                    value: ODataValue::Null,
                },
            ],
        })
    );
    assert_eq!(
        value(&entry, "Emails"),
        &ODataValue::Collection(CollectionValue {
            type_name: Some("Collection(Edm.String)".into()),
            items: vec![string("a@host"), string("b@host")],
        })
    );
    let ODataValue::Primitive(PrimitiveValue::Spatial(point)) = value(&entry, "Location") else {
        panic!("not a spatial value: {:?}", value(&entry, "Location"));
    };
    assert_eq!(point.get("type").and_then(JsonValue::as_str), Some("Point"));
}

#[test]
fn untyped_values_are_inferred() {
    let payload = r#"{
        "Int": 42,
        "Big": 3000000000,
        "Flag": true,
        "Nothing": null,
        "List": [1, "two"],
        "Wrapped": {"results": [1]},
        "Typed": {"__metadata": {"type": "Collection(Edm.Int64)"}, "results": ["9"]},
        "Shape": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]},
        "Inner": {"A": {"B": "c"}},
        "Stream": {"__mediaresource": {"media_src": "http://host/s", "content_type": "text/plain"}}
    }"#;
    let entry = read_entry(payload, None, ReaderSettings::default());

    assert_eq!(value(&entry, "Int"), &ODataValue::Primitive(PrimitiveValue::Int32(42)));
    assert_eq!(value(&entry, "Big"), &ODataValue::Primitive(PrimitiveValue::Double(3_000_000_000.0)));
    assert_eq!(value(&entry, "Flag"), &ODataValue::Primitive(PrimitiveValue::Boolean(true)));
    assert!(value(&entry, "Nothing").is_null());
    assert_eq!(
        value(&entry, "List"),
        &ODataValue::Collection(CollectionValue {
            type_name: None,
            items: vec![ODataValue::Primitive(PrimitiveValue::Int32(1)), string("two")],
        })
    );
    assert!(matches!(value(&entry, "Wrapped"), ODataValue::Collection(c) if c.items.len() == 1));
    assert_eq!(
        value(&entry, "Typed"),
        &ODataValue::Collection(CollectionValue {
            type_name: Some("Collection(Edm.Int64)".into()),
            items: vec![ODataValue::Primitive(PrimitiveValue::Int64(9))],
        })
    );
    assert!(matches!(value(&entry, "Shape"), ODataValue::Primitive(PrimitiveValue::Spatial(_))));
    assert!(matches!(value(&entry, "Inner"), ODataValue::Complex(c) if c.type_name.is_none()));
    assert_eq!(
        value(&entry, "Stream"),
        &ODataValue::StreamReference(StreamReferenceValue {
            read_link: Some("http://host/s".into()),
            content_type: Some("text/plain".into()),
            ..StreamReferenceValue::default()
        })
    );
}

#[test]
fn named_streams() {
    let model = model();
    let payload = r#"{"__metadata": {"type": "NS.Customer"},
        "Thumbnail": {"__mediaresource": {"edit_media": "http://host/t"}}}"#;
    let entry = read_entry(payload, Some(&model), ReaderSettings::default());
    assert!(matches!(value(&entry, "Thumbnail"), ODataValue::StreamReference(s) if s.edit_link.is_some()));

    let err = entry_error(payload, Some(&model), None, ReaderSettings::request());
    assert_eq!(err.kind(), &ErrorKind::StreamPropertyMisuse("Thumbnail".into()));

    let v2 = ReaderSettings {
        version: ODataVersion::V2,
        ..ReaderSettings::default()
    };
    let err = entry_error(payload, Some(&model), None, v2);
    assert!(matches!(err.kind(), ErrorKind::VersionNotSupported { feature: "stream properties", .. }));

    // Only directly on an entry.
    let nested = r#"{"Inner": {"S": {"__mediaresource": {}}}}"#;
    let err = entry_error(nested, None, None, ReaderSettings::default());
    assert_eq!(err.kind(), &ErrorKind::StreamPropertyMisuse("S".into()));
}

#[test]
fn spatial_values_need_version_3() {
    let model = model();
    let v2 = ReaderSettings {
        version: ODataVersion::V2,
        ..ReaderSettings::default()
    };
    let payload = r#"{"__metadata": {"type": "NS.Customer"}, "Location": {"type": "Point", "coordinates": [1, 2]}}"#;
    let err = entry_error(payload, Some(&model), None, v2);
    assert!(matches!(err.kind(), ErrorKind::VersionNotSupported { feature: "spatial values", .. }));
}

#[test]
fn conversion_failures_name_the_type() {
    let model = model();
    let err = entry_error(r#"{"__metadata": {"type": "NS.Customer"}, "ID": "x"}"#, Some(&model), None, ReaderSettings::default());
    assert_eq!(err.category(), ErrorCategory::Conversion);
    assert_eq!(err.kind().to_string(), "cannot convert value 'x' to 'Edm.Int32'");

    let err = entry_error(
        r#"{"__metadata": {"type": "NS.Customer"}, "Since": "2000-01-01"}"#,
        Some(&model),
        None,
        ReaderSettings::default(),
    );
    assert!(err.to_string().contains("Edm.DateTime"), "{err}");
}

#[test]
fn nulls_are_checked_against_declarations() {
    let model = model();
    let err = entry_error(r#"{"__metadata": {"type": "NS.Customer"}, "ID": null}"#, Some(&model), None, ReaderSettings::default());
    assert_eq!(err.kind(), &ErrorKind::NullValueForNonNullable("ID".into()));

    let err = entry_error(
        r#"{"__metadata": {"type": "NS.Customer"}, "Emails": ["a", null]}"#,
        Some(&model),
        None,
        ReaderSettings::default(),
    );
    assert_eq!(err.kind(), &ErrorKind::NullValueInCollection("Emails".into()));
}

#[test]
fn complex_values_are_checked_against_their_type() {
    let model = model();
    let settings = ReaderSettings::default();

    let err = entry_error(
        r#"{"__metadata": {"type": "NS.Customer"}, "Address": {"__metadata": {"type": "NS.Other"}}}"#,
        Some(&model),
        None,
        settings,
    );
    assert_eq!(
        err.kind(),
        &ErrorKind::IncompatibleType {
            expected: "NS.Address".into(),
            actual: "NS.Other".into(),
        }
    );

    let err = entry_error(
        r#"{"__metadata": {"type": "NS.Customer"}, "Address": {"Zip": "0150"}}"#,
        Some(&model),
        None,
        settings,
    );
    assert_eq!(
        err.kind(),
        &ErrorKind::UndeclaredProperty {
            property: "Zip".into(),
            type_name: "NS.Address".into(),
        }
    );

    let err = entry_error(
        r#"{"Address": {"__metadata": {}, "Street": "a", "__metadata": {}}}"#,
        None,
        None,
        settings,
    );
    assert_eq!(err.kind(), &ErrorKind::DuplicateMetadata("complex value"));

    let err = entry_error(r#"{"Address": {"Street": "a", "Street": "b"}}"#, None, None, settings);
    assert_eq!(err.kind(), &ErrorKind::DuplicatePropertyName("Street".into()));
}

#[test]
fn collection_wrappers_are_strict() {
    let model = model();
    let err = entry_error(
        r#"{"__metadata": {"type": "NS.Customer"}, "Emails": {"results": [], "count": 0}}"#,
        Some(&model),
        None,
        ReaderSettings::default(),
    );
    assert_eq!(
        err.kind(),
        &ErrorKind::UnexpectedProperty {
            name: "count".into(),
            context: "a collection value",
        }
    );

    let err = entry_error(
        r#"{"__metadata": {"type": "NS.Customer"}, "Emails": {"__metadata": {"type": "Collection(Edm.Int32)"}, "results": []}}"#,
        Some(&model),
        None,
        ReaderSettings::default(),
    );
    assert_eq!(err.category(), ErrorCategory::Validation);
}
