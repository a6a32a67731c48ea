//! Coercion of JSON primitives to EDM primitive values.
//!
//! Verbose JSON writes most non-trivial primitives as strings (`Edm.Int64`,
//! `Edm.Decimal`, `Edm.Guid`, `\/Date(...)\/`), so every kind accepts its
//! string form. Numbers and booleans are accepted where they are the natural
//! JSON representation.
use alloc::{string::ToString, vec::Vec};

use base64::Engine as _;

use crate::{error::ErrorKind, json_value::JsonPrimitive, model::PrimitiveKind, value::PrimitiveValue};

fn conversion_error(kind: PrimitiveKind, value: &JsonPrimitive) -> ErrorKind {
    let value = match value {
        JsonPrimitive::String(s) => s.clone(),
        other => other.to_string(),
    };
    ErrorKind::Conversion {
        type_name: kind.name(),
        value,
    }
}

/// Converts a non-null primitive to `kind`. Spatial kinds are not primitives
/// on the wire and always fail here.
pub(crate) fn convert_primitive(value: &JsonPrimitive, kind: PrimitiveKind) -> Result<PrimitiveValue, ErrorKind> {
    let err = || conversion_error(kind, value);
    let converted = match (kind, value) {
        (PrimitiveKind::String, JsonPrimitive::String(s)) => Some(PrimitiveValue::String(s.clone())),
        (PrimitiveKind::Boolean, JsonPrimitive::Boolean(b)) => Some(PrimitiveValue::Boolean(*b)),
        (PrimitiveKind::Boolean, JsonPrimitive::String(s)) => parse_boolean(s).map(PrimitiveValue::Boolean),
        (
            PrimitiveKind::Byte | PrimitiveKind::SByte | PrimitiveKind::Int16 | PrimitiveKind::Int32 | PrimitiveKind::Int64,
            JsonPrimitive::Number(text) | JsonPrimitive::String(text),
        ) => integral(kind, text),
        (PrimitiveKind::Double, JsonPrimitive::Number(text) | JsonPrimitive::String(text)) => {
            parse_float::<f64>(text).map(PrimitiveValue::Double)
        }
        (PrimitiveKind::Single, JsonPrimitive::Number(text) | JsonPrimitive::String(text)) => {
            parse_float::<f32>(text).map(PrimitiveValue::Single)
        }
        (PrimitiveKind::Decimal, JsonPrimitive::Number(text) | JsonPrimitive::String(text)) => {
            is_decimal(text).then(|| PrimitiveValue::Decimal(text.clone()))
        }
        (PrimitiveKind::Guid, JsonPrimitive::String(s)) => is_guid(s).then(|| PrimitiveValue::Guid(s.clone())),
        (PrimitiveKind::Binary, JsonPrimitive::String(s)) => base64::engine::general_purpose::STANDARD
            .decode(s)
            .ok()
            .map(PrimitiveValue::Binary),
        (PrimitiveKind::DateTime, JsonPrimitive::String(s)) => {
            parse_date_time(s).map(|(millis, offset_minutes)| PrimitiveValue::DateTime { millis, offset_minutes })
        }
        (PrimitiveKind::DateTimeOffset, JsonPrimitive::String(s)) => {
            is_date_time_offset(s).then(|| PrimitiveValue::DateTimeOffset(s.clone()))
        }
        (PrimitiveKind::Time, JsonPrimitive::String(s)) => is_duration(s).then(|| PrimitiveValue::Time(s.clone())),
        _ => None,
    };
    converted.ok_or_else(err)
}

/// An `Edm.Int64` written as a number or a string, such as `__count`.
pub(crate) fn convert_int64(value: &JsonPrimitive) -> Result<i64, ErrorKind> {
    match value {
        JsonPrimitive::Number(text) | JsonPrimitive::String(text) => text.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| conversion_error(PrimitiveKind::Int64, value))
}

/// Value of a primitive with no declared type: strings stay strings, integers
/// that fit are `Edm.Int32`, every other number is `Edm.Double`.
pub(crate) fn infer_primitive(value: &JsonPrimitive) -> Result<Option<PrimitiveValue>, ErrorKind> {
    Ok(match value {
        JsonPrimitive::Null => None,
        JsonPrimitive::Boolean(b) => Some(PrimitiveValue::Boolean(*b)),
        JsonPrimitive::String(s) => Some(PrimitiveValue::String(s.clone())),
        JsonPrimitive::Number(text) => match text.parse::<i32>() {
            Ok(n) => Some(PrimitiveValue::Int32(n)),
            Err(_) => Some(PrimitiveValue::Double(
                text.parse::<f64>()
                    .map_err(|_| conversion_error(PrimitiveKind::Double, value))?,
            )),
        },
    })
}

fn parse_boolean(s: &str) -> Option<bool> {
    match s {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn integral(kind: PrimitiveKind, text: &str) -> Option<PrimitiveValue> {
    let n = text.parse::<i64>().ok()?;
    Some(match kind {
        PrimitiveKind::Byte => PrimitiveValue::Byte(u8::try_from(n).ok()?),
        PrimitiveKind::SByte => PrimitiveValue::SByte(i8::try_from(n).ok()?),
        PrimitiveKind::Int16 => PrimitiveValue::Int16(i16::try_from(n).ok()?),
        PrimitiveKind::Int32 => PrimitiveValue::Int32(i32::try_from(n).ok()?),
        _ => PrimitiveValue::Int64(n),
    })
}

trait Float: core::str::FromStr + Copy {
    const INFINITY: Self;
    const NEG_INFINITY: Self;
    const NAN: Self;
}

impl Float for f64 {
    const INFINITY: Self = f64::INFINITY;
    const NEG_INFINITY: Self = f64::NEG_INFINITY;
    const NAN: Self = f64::NAN;
}

impl Float for f32 {
    const INFINITY: Self = f32::INFINITY;
    const NEG_INFINITY: Self = f32::NEG_INFINITY;
    const NAN: Self = f32::NAN;
}

fn parse_float<F: Float>(text: &str) -> Option<F> {
    match text {
        "INF" => Some(F::INFINITY),
        "-INF" => Some(F::NEG_INFINITY),
        "NaN" => Some(F::NAN),
        _ if text.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E')) => {
            text.parse().ok()
        }
        _ => None,
    }
}

fn is_decimal(text: &str) -> bool {
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    let (int, frac) = digits.split_once('.').unwrap_or((digits, ""));
    !(int.is_empty() && frac.is_empty())
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit())
}

fn is_guid(s: &str) -> bool {
    let groups: Vec<&str> = s.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(group, len)| group.len() == len && group.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Parses `/Date(<millis>[(+|-)<offset minutes>])/`.
pub(crate) fn parse_date_time(s: &str) -> Option<(i64, Option<i32>)> {
    let inner = s.strip_prefix("/Date(")?.strip_suffix(")/")?;
    // The leading sign belongs to the ticks.
    let split = inner
        .char_indices()
        .skip(1)
        .find(|&(_, c)| c == '+' || c == '-')
        .map(|(i, _)| i);
    let (millis, offset) = match split {
        Some(i) => {
            let (millis, offset) = inner.split_at(i);
            (millis, Some(offset))
        }
        None => (inner, None),
    };
    let millis = parse_signed::<i64>(millis)?;
    let offset = match offset {
        Some(offset) => Some(parse_signed::<i32>(offset)?),
        None => None,
    };
    Some((millis, offset))
}

fn parse_signed<T: core::str::FromStr>(text: &str) -> Option<T> {
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// `yyyy-mm-ddThh:mm[:ss[.fffffff]](Z|(+|-)hh:mm)`, checked for shape only.
fn is_date_time_offset(s: &str) -> bool {
    let Some((date, time)) = s.split_once('T') else {
        return false;
    };
    let date_ok = date.len() >= 10
        && date.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    let zone_start = time.find(['Z', '+', '-']);
    date_ok
        && zone_start.is_some_and(|i| {
            let (clock, zone) = time.split_at(i);
            clock.len() >= 5 && (zone == "Z" || zone.len() == 6)
        })
}

/// An xsd duration such as `PT12H30M` or `-P1DT2S`.
fn is_duration(s: &str) -> bool {
    let body = s.strip_prefix('-').unwrap_or(s);
    let Some(body) = body.strip_prefix('P') else {
        return false;
    };
    !body.is_empty()
        && body
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'Y' | b'M' | b'D' | b'T' | b'H' | b'S'))
}

/// Strips `Collection(` `)` from a collection type name.
pub(crate) fn collection_item_type_name(type_name: &str) -> Option<&str> {
    type_name.strip_prefix("Collection(")?.strip_suffix(')')
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use rstest::rstest;

    use super::*;

    fn num(text: &str) -> JsonPrimitive {
        JsonPrimitive::Number(text.into())
    }

    fn string(text: &str) -> JsonPrimitive {
        JsonPrimitive::String(text.into())
    }

    #[rstest]
    #[case(PrimitiveKind::Int32, num("42"), PrimitiveValue::Int32(42))]
    #[case(PrimitiveKind::Int32, string("-7"), PrimitiveValue::Int32(-7))]
    #[case(PrimitiveKind::Int64, string("9223372036854775807"), PrimitiveValue::Int64(i64::MAX))]
    #[case(PrimitiveKind::Byte, num("255"), PrimitiveValue::Byte(255))]
    #[case(PrimitiveKind::SByte, num("-128"), PrimitiveValue::SByte(-128))]
    #[case(PrimitiveKind::Int16, num("300"), PrimitiveValue::Int16(300))]
    #[case(PrimitiveKind::Double, num("1.5e3"), PrimitiveValue::Double(1500.0))]
    #[case(PrimitiveKind::Double, string("-INF"), PrimitiveValue::Double(f64::NEG_INFINITY))]
    #[case(PrimitiveKind::Single, num("0.25"), PrimitiveValue::Single(0.25))]
    #[case(PrimitiveKind::Decimal, string("-12.50"), PrimitiveValue::Decimal("-12.50".into()))]
    #[case(PrimitiveKind::Decimal, num("3"), PrimitiveValue::Decimal("3".into()))]
    #[case(PrimitiveKind::Boolean, JsonPrimitive::Boolean(true), PrimitiveValue::Boolean(true))]
    #[case(PrimitiveKind::Boolean, string("false"), PrimitiveValue::Boolean(false))]
    #[case(PrimitiveKind::String, string("text"), PrimitiveValue::String("text".into()))]
    #[case(
        PrimitiveKind::Guid,
        string("38cf68c2-4010-4ccc-8922-868217f03ddc"),
        PrimitiveValue::Guid("38cf68c2-4010-4ccc-8922-868217f03ddc".into())
    )]
    #[case(PrimitiveKind::Binary, string("AQID"), PrimitiveValue::Binary(vec![1, 2, 3]))]
    #[case(
        PrimitiveKind::DateTime,
        string("/Date(1286705410000)/"),
        PrimitiveValue::DateTime { millis: 1_286_705_410_000, offset_minutes: None }
    )]
    #[case(
        PrimitiveKind::DateTime,
        string("/Date(-1000-0120)/"),
        PrimitiveValue::DateTime { millis: -1000, offset_minutes: Some(-120) }
    )]
    #[case(
        PrimitiveKind::DateTimeOffset,
        string("2010-10-10T10:10:10+01:00"),
        PrimitiveValue::DateTimeOffset("2010-10-10T10:10:10+01:00".into())
    )]
    #[case(PrimitiveKind::Time, string("PT12H30M"), PrimitiveValue::Time("PT12H30M".into()))]
    fn converts(#[case] kind: PrimitiveKind, #[case] input: JsonPrimitive, #[case] expected: PrimitiveValue) {
        assert_eq!(convert_primitive(&input, kind).unwrap(), expected);
    }

    #[rstest]
    #[case(PrimitiveKind::Int32, num("1.5"))]
    #[case(PrimitiveKind::Int32, num("2147483648"))]
    #[case(PrimitiveKind::Byte, num("-1"))]
    #[case(PrimitiveKind::Int16, string("abc"))]
    #[case(PrimitiveKind::String, num("1"))]
    #[case(PrimitiveKind::Boolean, num("1"))]
    #[case(PrimitiveKind::Double, string("one"))]
    #[case(PrimitiveKind::Decimal, string("1e5"))]
    #[case(PrimitiveKind::Guid, string("38cf68c2-4010-4ccc-8922"))]
    #[case(PrimitiveKind::Binary, string("not base64!"))]
    #[case(PrimitiveKind::DateTime, string("2010-10-10"))]
    #[case(PrimitiveKind::DateTime, string("/Date()/"))]
    #[case(PrimitiveKind::DateTimeOffset, string("yesterday"))]
    #[case(PrimitiveKind::Time, string("12:30"))]
    #[case(PrimitiveKind::GeographyPoint, string("POINT(1 2)"))]
    fn rejects(#[case] kind: PrimitiveKind, #[case] input: JsonPrimitive) {
        let err = convert_primitive(&input, kind).unwrap_err();
        let ErrorKind::Conversion { type_name, .. } = &err else {
            panic!("unexpected error {err:?}");
        };
        assert_eq!(*type_name, kind.name());
        assert!(err.to_string().contains(kind.name()), "{err}");
    }

    #[rstest]
    #[case(num("12"), Some(PrimitiveValue::Int32(12)))]
    #[case(num("3000000000"), Some(PrimitiveValue::Double(3_000_000_000.0)))]
    #[case(num("0.5"), Some(PrimitiveValue::Double(0.5)))]
    #[case(string("s"), Some(PrimitiveValue::String("s".into())))]
    #[case(JsonPrimitive::Null, None)]
    fn infers_untyped(#[case] input: JsonPrimitive, #[case] expected: Option<PrimitiveValue>) {
        assert_eq!(infer_primitive(&input).unwrap(), expected);
    }

    #[test]
    fn nan_is_accepted_for_floating_kinds() {
        let PrimitiveValue::Single(v) = convert_primitive(&string("NaN"), PrimitiveKind::Single).unwrap() else {
            panic!("not a single");
        };
        assert!(v.is_nan());
    }

    #[test]
    fn collection_type_names() {
        assert_eq!(collection_item_type_name("Collection(Edm.Int32)"), Some("Edm.Int32"));
        assert_eq!(collection_item_type_name("Edm.Int32"), None);
    }
}
