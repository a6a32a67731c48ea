#![no_main]
use std::cell::RefCell;

use arbitrary::Arbitrary;
use libfuzzer_sys::{fuzz_mutator, fuzz_target, fuzzer_mutate};
use odata_verbose::{
    EdmModel, EntityType, ErrorKind, NavigationProperty, ODataVersion, PrimitiveKind, ReaderSettings,
    ReaderState, VerboseJsonReader, detect_payload_kinds,
};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use serde_json::{Map, Value, json};

const HEADER: usize = 1; // settings flags

thread_local! {
    static RNG: RefCell<SmallRng> = RefCell::new(SmallRng::from_os_rng());
}

fn with_rng<F, R>(f: F) -> R
where
    F: FnOnce(&mut SmallRng) -> R,
{
    RNG.with(|cell| f(&mut cell.borrow_mut()))
}

/// Reserved names the reader reacts to, so that generated payloads reach the
/// interesting paths instead of being read as plain complex values.
const NAMES: &[&str] = &[
    "d", "results", "__count", "__next", "__metadata", "__deferred", "__mediaresource", "uri", "type",
    "error", "code", "message", "ID", "Name", "Orders", "Customer", "Other",
];

const TYPES: &[&str] = &["NS.Customer", "NS.Order", "NS.Missing", "Collection(Edm.String)", "Edm.Int32"];

fn model() -> EdmModel {
    EdmModel::new()
        .with_entity_type(
            EntityType::new("NS.Customer")
                .with_primitive("ID", PrimitiveKind::Int32)
                .with_primitive("Name", PrimitiveKind::String)
                .with_navigation(NavigationProperty::collection("Orders", "NS.Order")),
        )
        .with_entity_type(
            EntityType::new("NS.Order")
                .with_primitive("ID", PrimitiveKind::Int64)
                .with_navigation(NavigationProperty::single("Customer", "NS.Customer")),
        )
}

fn mutator(data: &mut [u8], size: usize, max_size: usize, seed: u32) -> usize {
    if size < HEADER || seed.is_multiple_of(10) {
        data[0] = with_rng(|rng| rng.next_u32() as u8);
        let value = with_rng(|rng| odata_value(rng, 4));
        let serialized = serde_json::to_vec(&value).expect("Failed to serialize generated payload");
        let len = serialized.len().min(max_size - HEADER);
        data[HEADER..HEADER + len].copy_from_slice(&serialized[..len]);
        HEADER + len
    } else {
        fuzzer_mutate(data, size, max_size)
    }
}

fuzz_mutator!(|data: &mut [u8], size: usize, max_size: usize, seed: u32| {
    mutator(data, size, max_size, seed)
});

/// Generates a payload shaped like verbose JSON, mixing in arbitrary values.
fn odata_value(rng: &mut SmallRng, depth: usize) -> Value {
    if depth == 0 {
        return scalar(rng);
    }
    match rng.random_range(0..8) {
        0 => json!({ "d": odata_value(rng, depth - 1) }),
        1 => json!({ "results": (0..rng.random_range(0..4)).map(|_| odata_value(rng, depth - 1)).collect::<Vec<_>>() }),
        2 => json!({ "__deferred": { "uri": "http://host/x" } }),
        3 => json!({ "__metadata": { "uri": "http://host/x" } }),
        4 => json!({ "error": { "code": "1", "message": { "lang": "en", "value": "x" } } }),
        5 => {
            let mut object = Map::new();
            if rng.random_bool(0.7) {
                let type_name = TYPES[rng.random_range(0..TYPES.len())];
                object.insert("__metadata".into(), json!({ "type": type_name, "uri": "http://host/e" }));
            }
            for _ in 0..rng.random_range(0..5) {
                let name = NAMES[rng.random_range(0..NAMES.len())];
                object.insert(name.into(), odata_value(rng, depth - 1));
            }
            Value::Object(object)
        }
        6 => Value::Array((0..rng.random_range(0..4)).map(|_| odata_value(rng, depth - 1)).collect()),
        _ => {
            let bytes: Vec<u8> = (0..rng.random_range(0..64)).map(|_| rng.random::<u8>()).collect();
            ArbitraryValue::arbitrary(&mut arbitrary::Unstructured::new(&bytes))
                .map(|value| value.0)
                .unwrap_or(Value::Null)
        }
    }
}

fn scalar(rng: &mut SmallRng) -> Value {
    match rng.random_range(0..5) {
        0 => Value::Null,
        1 => Value::Bool(rng.random()),
        2 => json!(rng.random_range(-5i64..5)),
        3 => json!("\\/Date(0)\\/"),
        _ => Value::String(NAMES[rng.random_range(0..NAMES.len())].into()),
    }
}

#[derive(Debug)]
struct ArbitraryValue(Value);

impl<'a> Arbitrary<'a> for ArbitraryValue {
    fn arbitrary(u: &mut arbitrary::Unstructured<'_>) -> arbitrary::Result<Self> {
        let value = match u.choose_index(4)? {
            0 => Value::Null,
            1 => Value::Bool(u.arbitrary()?),
            2 => Value::String(u.arbitrary()?),
            3 => {
                let m: Vec<(String, bool)> = u.arbitrary()?;
                Value::Object(Map::from_iter(m.into_iter().map(|(k, v)| (k, Value::Bool(v)))))
            }
            _ => Err(arbitrary::Error::IncorrectFormat)?,
        };
        Ok(ArbitraryValue(value))
    }
}

fn read(data: &[u8]) {
    let Some((&flags, payload)) = data.split_first() else {
        return;
    };

    let settings = ReaderSettings {
        reading_response: flags & 1 == 0,
        server_compatibility: flags & 2 != 0,
        detect_in_stream_errors: flags & 4 != 0,
        report_undeclared_link_properties: flags & 8 != 0,
        allow_duplicate_property_names: flags & 16 != 0,
        version: if flags & 32 != 0 { ODataVersion::V2 } else { ODataVersion::V3 },
        max_nesting_depth: 16,
        ..ReaderSettings::default()
    };
    let model = model();
    let model = (flags & 64 != 0).then_some(&model);

    let _ = detect_payload_kinds(payload, settings);

    let reader = if flags & 128 != 0 {
        VerboseJsonReader::for_feed(payload, model, None, settings)
    } else {
        VerboseJsonReader::for_entry(payload, model, None, settings)
    };
    let Ok(mut reader) = reader else {
        return;
    };
    loop {
        match reader.read() {
            Ok(true) => {}
            Ok(false) => {
                assert_eq!(reader.state(), ReaderState::Completed);
                assert!(!reader.read().unwrap());
                return;
            }
            Err(_) => {
                assert_eq!(reader.state(), ReaderState::Exception);
                let err = reader.read().unwrap_err();
                assert_eq!(err.kind(), &ErrorKind::ReaderFailed);
                return;
            }
        }
    }
}

fuzz_target!(|data: &[u8]| read(data));
