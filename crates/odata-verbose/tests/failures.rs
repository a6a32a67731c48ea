#![expect(missing_docs)]

mod common;

use common::{entry_error, feed_error, read_all, render_entry};
use odata_verbose::{ErrorCategory, ErrorKind, ODataError, ReaderSettings, ReaderState, VerboseJsonReader};

#[test]
fn reader_stays_failed_after_an_error() {
    let mut reader =
        VerboseJsonReader::for_feed(br#"{"results": [1]}"#, None, None, ReaderSettings::default()).unwrap();
    assert!(reader.read().unwrap());
    assert_eq!(reader.state(), ReaderState::FeedStart);

    let err = reader.read().unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Shape);
    assert_eq!(reader.state(), ReaderState::Exception);

    for _ in 0..2 {
        let err = reader.read().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ReaderFailed);
        assert_eq!(err.category(), ErrorCategory::Usage);
    }
}

#[test]
fn iterator_ends_after_the_first_error() {
    let reader = VerboseJsonReader::for_feed(br#"{"results": [1]}"#, None, None, ReaderSettings::default()).unwrap();
    let events: Vec<_> = reader.collect();
    assert_eq!(events.len(), 2);
    assert!(events[0].is_ok());
    assert!(events[1].is_err());
}

#[test]
fn in_stream_error_in_a_response() {
    let payload = r#"{"error": {"code": "500", "message": {"lang": "en-US", "value": "boom"}}}"#;
    let err = feed_error(payload, None, None, ReaderSettings::default());
    assert_eq!(
        err.kind(),
        &ErrorKind::InStreamError(ODataError {
            code: "500".into(),
            message: "boom".into(),
            lang: Some("en-US".into()),
        })
    );
    assert_eq!((err.line, err.column), (1, 1));
    insta::assert_snapshot!(err, @"in-stream error: [500] boom at 1:1");
}

#[test]
fn in_stream_error_inside_an_entry() {
    let payload = r#"{"d": {"Name": "Ann", "Orders": {"error": {"code": "", "message": "late"}}}}"#;
    let err = entry_error(payload, None, None, ReaderSettings::default());
    assert_eq!(err.category(), ErrorCategory::InStream);

    let settings = ReaderSettings {
        detect_in_stream_errors: false,
        ..ReaderSettings::default()
    };
    insta::assert_snapshot!(render_entry(payload, None, None, settings), @r"
    EntryStart props=[Name,Orders]
    EntryEnd props=[Name,Orders]
    ");
}

#[test]
fn repeated_entry_metadata_is_an_error() {
    let payload = r#"{"__metadata": {"uri": "a"}, "Name": "x", "__metadata": {"uri": "b"}}"#;
    let err = entry_error(payload, None, None, ReaderSettings::default());
    assert_eq!(err.kind(), &ErrorKind::DuplicateMetadata("entry"));
    assert_eq!(err.category(), ErrorCategory::Duplicate);
}

#[test]
fn server_compatibility_keeps_the_last_value_in_the_first_position() {
    let settings = ReaderSettings {
        server_compatibility: true,
        ..ReaderSettings::default()
    };
    let payload = r#"{"__metadata": {"uri": "a"}, "Name": "x", "ID": 1, "Name": "y", "__metadata": {"uri": "b"}}"#;
    let reader = VerboseJsonReader::for_entry(payload.as_bytes(), None, None, settings).unwrap();
    let (events, error) = read_all(reader);
    assert!(error.is_none(), "{error:?}");

    let entry = events[1].item.as_entry().unwrap();
    assert_eq!(entry.id.as_deref(), Some("b"));
    let names: Vec<_> = entry.properties.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Name", "ID"]);
    assert_eq!(
        entry.property("Name").unwrap().value,
        odata_verbose::ODataValue::Primitive(odata_verbose::PrimitiveValue::String("y".into()))
    );
}

#[test]
fn duplicate_names_without_server_compatibility() {
    let payload = r#"{"Name": "x", "Name": "y"}"#;
    let err = entry_error(payload, None, None, ReaderSettings::default());
    assert_eq!(err.kind(), &ErrorKind::DuplicatePropertyName("Name".into()));

    let settings = ReaderSettings {
        allow_duplicate_property_names: true,
        ..ReaderSettings::default()
    };
    insta::assert_snapshot!(render_entry(payload, None, None, settings), @r"
    EntryStart props=[Name,Name]
    EntryEnd props=[Name,Name]
    ");
}

#[test]
fn syntax_errors_carry_a_position() {
    let err = feed_error("{\"results\": [\n  {\"a\": tru}\n]}", None, None, ReaderSettings::default());
    assert_eq!(err.category(), ErrorCategory::Syntax);
    assert_eq!(err.line, 2);

    let err = feed_error(r#"{"results": ["#, None, None, ReaderSettings::default());
    assert_eq!(err.category(), ErrorCategory::Syntax);
}

#[test]
fn trailing_content_is_rejected() {
    let settings = ReaderSettings {
        detect_in_stream_errors: false,
        ..ReaderSettings::default()
    };
    let err = entry_error(r#"{"A": 1} {"B": 2}"#, None, None, settings);
    assert!(matches!(err.category(), ErrorCategory::Shape | ErrorCategory::Syntax), "{err}");
}
