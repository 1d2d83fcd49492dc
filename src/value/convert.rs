//! Conversions between [`Value`] and driver BSON types

use bson::spec::BinarySubtype;
use bson::{Bson, Decimal128};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::{Binary, Document, Regex, Timestamp, Value};

/// Exponent bias of the IEEE 754-2008 decimal128 format.
const DECIMAL128_EXPONENT_BIAS: i32 = 6176;

/// Coefficient bits available without the large-coefficient combination form.
const DECIMAL128_COEFFICIENT_BITS: u32 = 113;

/// Convert a value into BSON for the driver.
///
/// `Int` becomes `Int32` when it fits and `Int64` otherwise.
pub fn value_to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::Int(n) => match i32::try_from(*n) {
            Ok(small) => Bson::Int32(small),
            Err(_) => Bson::Int64(*n),
        },
        Value::Double(f) => Bson::Double(*f),
        Value::String(s) => Bson::String(s.clone()),
        Value::Date(dt) => Bson::DateTime(bson::DateTime::from_millis(dt.timestamp_millis())),
        Value::ObjectId(oid) => Bson::ObjectId(*oid),
        Value::Binary(bin) => Bson::Binary(bson::Binary {
            subtype: BinarySubtype::from(bin.subtype),
            bytes: bin.bytes.clone(),
        }),
        Value::Long(n) => Bson::Int64(*n),
        Value::Decimal(d) => Bson::Decimal128(decimal_to_decimal128(d)),
        Value::Timestamp(ts) => Bson::Timestamp(bson::Timestamp {
            time: ts.time,
            increment: ts.increment,
        }),
        Value::Regex(re) => {
            let mut options: Vec<char> = re.options.chars().collect();
            options.sort_unstable();
            Bson::RegularExpression(bson::Regex {
                pattern: re.pattern.clone(),
                options: options.into_iter().collect(),
            })
        }
        Value::Array(items) => Bson::Array(items.iter().map(value_to_bson).collect()),
        Value::Document(doc) => Bson::Document(document_to_bson(doc)),
    }
}

/// Convert a document into a driver document, keeping key order.
pub fn document_to_bson(doc: &Document) -> bson::Document {
    doc.iter()
        .map(|(k, v)| (k.to_string(), value_to_bson(v)))
        .collect()
}

/// Convert a driver document into a console document.
pub fn document_from_bson(doc: &bson::Document) -> Document {
    doc.iter()
        .map(|(k, v)| (k.clone(), bson_to_value(v)))
        .collect()
}

/// Convert BSON returned by the driver into a value.
///
/// Types the console has no literal for (JavaScript code, symbols, keys)
/// degrade to their closest representation.
pub fn bson_to_value(bson: &Bson) -> Value {
    match bson {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Int32(n) => Value::Int(*n as i64),
        Bson::Int64(n) => Value::Long(*n),
        Bson::Double(f) => Value::Double(*f),
        Bson::String(s) | Bson::Symbol(s) | Bson::JavaScriptCode(s) => Value::String(s.clone()),
        Bson::JavaScriptCodeWithScope(code) => Value::String(code.code.clone()),
        Bson::DateTime(dt) => match DateTime::<Utc>::from_timestamp_millis(dt.timestamp_millis()) {
            Some(date) => Value::Date(date),
            None => Value::String(dt.to_string()),
        },
        Bson::ObjectId(oid) => Value::ObjectId(*oid),
        Bson::Binary(bin) => Value::Binary(Binary {
            subtype: u8::from(bin.subtype),
            bytes: bin.bytes.clone(),
        }),
        Bson::Decimal128(d) => match decimal128_to_decimal(d) {
            Some(decimal) => Value::Decimal(decimal),
            None => Value::String(d.to_string()),
        },
        Bson::Timestamp(ts) => Value::Timestamp(Timestamp {
            time: ts.time,
            increment: ts.increment,
        }),
        Bson::RegularExpression(re) => Value::Regex(Regex {
            pattern: re.pattern.clone(),
            options: re.options.clone(),
        }),
        Bson::Array(items) => Value::Array(items.iter().map(bson_to_value).collect()),
        Bson::Document(doc) => Value::Document(document_from_bson(doc)),
        Bson::MinKey => Value::Document(Document::new().with("$minKey", 1)),
        Bson::MaxKey => Value::Document(Document::new().with("$maxKey", 1)),
        Bson::DbPointer(_) => Value::Null,
    }
}

/// Encode a decimal as BID decimal128, keeping its scale as the exponent.
fn decimal_to_decimal128(decimal: &Decimal) -> Decimal128 {
    let mantissa = decimal.mantissa();
    let sign = u128::from(mantissa < 0);
    let coefficient = mantissa.unsigned_abs();
    let exponent = (DECIMAL128_EXPONENT_BIAS - decimal.scale() as i32) as u128;

    let bits = (sign << 127) | (exponent << DECIMAL128_COEFFICIENT_BITS) | coefficient;
    Decimal128::from_bytes(bits.to_le_bytes())
}

/// Decode a BID decimal128 when it fits the decimal range.
///
/// Returns `None` for infinities, NaN and values outside 96-bit/28-scale.
fn decimal128_to_decimal(value: &Decimal128) -> Option<Decimal> {
    let bits = u128::from_le_bytes(value.bytes());

    // Combination bits 11 mark specials or the large-coefficient form.
    if (bits >> 125) & 0b11 == 0b11 {
        return None;
    }

    let negative = bits >> 127 == 1;
    let biased = ((bits >> DECIMAL128_COEFFICIENT_BITS) & 0x3FFF) as i32;
    let exponent = biased - DECIMAL128_EXPONENT_BIAS;
    let mut coefficient = bits & ((1u128 << DECIMAL128_COEFFICIENT_BITS) - 1);

    let scale = if exponent <= 0 {
        (-exponent) as u32
    } else {
        for _ in 0..exponent {
            coefficient = coefficient.checked_mul(10)?;
        }
        0
    };

    let signed = i128::try_from(coefficient).ok()?;
    let signed = if negative { -signed } else { signed };
    Decimal::try_from_i128_with_scale(signed, scale).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_int_width() {
        assert_eq!(value_to_bson(&Value::Int(5)), Bson::Int32(5));
        assert_eq!(
            value_to_bson(&Value::Int(5_000_000_000)),
            Bson::Int64(5_000_000_000)
        );
        assert_eq!(value_to_bson(&Value::Long(5)), Bson::Int64(5));
    }

    #[test]
    fn test_decimal_keeps_scale() {
        let decimal = Decimal::from_str("123.40").unwrap();
        let encoded = decimal_to_decimal128(&decimal);
        assert_eq!(encoded.to_string(), "123.40");

        let decoded = decimal128_to_decimal(&encoded).unwrap();
        assert_eq!(decoded.to_string(), "123.40");
        assert_eq!(decoded.scale(), 2);
    }

    #[test]
    fn test_negative_decimal() {
        let decimal = Decimal::from_str("-0.001").unwrap();
        let back = bson_to_value(&value_to_bson(&Value::Decimal(decimal)));
        assert_eq!(back, Value::Decimal(decimal));
    }

    #[test]
    fn test_document_order_survives() {
        let doc = Document::new()
            .with("z", 1)
            .with("a", "x")
            .with("m", Value::Array(vec![Value::Bool(true)]));
        let bson_doc = document_to_bson(&doc);
        let keys: Vec<_> = bson_doc.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(document_from_bson(&bson_doc), doc);
    }

    #[test]
    fn test_regex_options_sorted() {
        let value = Value::Regex(Regex {
            pattern: "^a".into(),
            options: "mi".into(),
        });
        match value_to_bson(&value) {
            Bson::RegularExpression(re) => assert_eq!(re.options, "im"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_date_millis() {
        let date = DateTime::<Utc>::from_timestamp_millis(1_412_180_887_123).unwrap();
        let bson = value_to_bson(&Value::Date(date));
        assert_eq!(bson, Bson::DateTime(bson::DateTime::from_millis(1_412_180_887_123)));
        assert_eq!(bson_to_value(&bson), Value::Date(date));
    }
}
