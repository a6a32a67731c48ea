//! Benchmark – `odata_verbose::VerboseJsonReader`
#![allow(missing_docs)]

use std::{fmt::Write, time::Duration};

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use odata_verbose::{
    EdmModel, EntityType, NavigationProperty, PrimitiveKind, ReaderSettings, VerboseJsonReader, detect_payload_kinds,
};

fn model() -> EdmModel {
    EdmModel::new()
        .with_entity_type(
            EntityType::new("NS.Customer")
                .with_primitive("ID", PrimitiveKind::Int32)
                .with_primitive("Name", PrimitiveKind::String)
                .with_primitive("Balance", PrimitiveKind::Decimal)
                .with_navigation(NavigationProperty::collection("Orders", "NS.Order")),
        )
        .with_entity_type(
            EntityType::new("NS.Order")
                .with_primitive("ID", PrimitiveKind::Int32)
                .with_primitive("Amount", PrimitiveKind::Decimal),
        )
}

/// A deterministic feed of `entries` customers, each with `orders` expanded
/// orders. With `repeats`, every customer repeats its `Name` property.
fn make_feed(entries: usize, orders: usize, repeats: bool) -> String {
    let mut s = String::from(r#"{"d": {"__count": ""#);
    write!(s, "{entries}").unwrap();
    s.push_str(r#"", "results": ["#);
    for i in 0..entries {
        if i > 0 {
            s.push(',');
        }
        write!(
            s,
            r#"{{"__metadata": {{"uri": "http://host/Customers({i})", "type": "NS.Customer"}}, "ID": {i}, "Name": "c{i}", "Balance": "{i}.25""#
        )
        .unwrap();
        if repeats {
            write!(s, r#", "Name": "again{i}""#).unwrap();
        }
        s.push_str(r#", "Orders": {"results": ["#);
        for j in 0..orders {
            if j > 0 {
                s.push(',');
            }
            write!(s, r#"{{"__metadata": {{"type": "NS.Order"}}, "ID": {j}, "Amount": "{j}.5"}}"#).unwrap();
        }
        s.push_str("]}}");
    }
    s.push_str("]}}");
    s
}

fn run_reader(payload: &str, model: &EdmModel, settings: ReaderSettings) -> usize {
    let reader = VerboseJsonReader::for_feed(payload.as_bytes(), Some(model), None, settings).unwrap();
    reader.map(|event| event.unwrap()).count()
}

fn bench_reader(c: &mut Criterion) {
    let model = model();
    let mut group = c.benchmark_group("verbose_reader");

    for &(entries, orders) in &[(10usize, 0usize), (100, 5), (1_000, 2)] {
        let payload = make_feed(entries, orders, false);
        let id = format!("{entries}x{orders}");

        group.bench_with_input(BenchmarkId::new("strict", &id), &payload, |b, payload| {
            b.iter(|| black_box(run_reader(black_box(payload), &model, ReaderSettings::default())));
        });

        group.bench_with_input(BenchmarkId::new("no_error_detection", &id), &payload, |b, payload| {
            let settings = ReaderSettings {
                detect_in_stream_errors: false,
                ..ReaderSettings::default()
            };
            b.iter(|| black_box(run_reader(black_box(payload), &model, settings)));
        });

        let repeated = make_feed(entries, orders, true);
        group.bench_with_input(
            BenchmarkId::new("server_compatibility", &id),
            &repeated,
            |b, payload| {
                let settings = ReaderSettings {
                    server_compatibility: true,
                    ..ReaderSettings::default()
                };
                b.iter(|| black_box(run_reader(black_box(payload), &model, settings)));
            },
        );
    }
    group.finish();
}

fn bench_detection(c: &mut Criterion) {
    let payload = make_feed(1_000, 2, false);
    c.bench_function("detect_payload_kinds", |b| {
        b.iter(|| black_box(detect_payload_kinds(black_box(payload.as_bytes()), ReaderSettings::default()).unwrap()));
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(5));
    targets = bench_reader, bench_detection
}
criterion_main!(benches);
