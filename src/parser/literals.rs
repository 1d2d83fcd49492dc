//! Constructor literals and extended-JSON wrappers
//!
//! Shell constructors such as `NumberLong("1")` or `new Date(2020, 0, 1)` are
//! evaluated here into canonical [`Value`]s. Numeric arguments carry their raw
//! literal text so 64-bit integers and decimals stay exact.

use base64::Engine as _;
use bson::oid::ObjectId;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::error::{Result, ValueError};
use crate::value::{Binary, Document, Regex, Timestamp, Value, format_js_date, now_millis};

/// Constructor argument: resolved value plus raw text for number literals.
#[derive(Debug, Clone)]
pub struct CtorArg {
    pub value: Value,
    pub literal: Option<String>,
}

impl CtorArg {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            literal: None,
        }
    }
}

/// Names accepted in constructor position.
pub const CONSTRUCTORS: &[&str] = &[
    "ObjectId",
    "NumberLong",
    "NumberInt",
    "NumberDecimal",
    "ISODate",
    "Date",
    "Timestamp",
    "RegExp",
    "BinData",
];

pub fn is_constructor(name: &str) -> bool {
    CONSTRUCTORS.contains(&name)
}

/// Evaluate a constructor call.
///
/// # Arguments
/// * `name` - Constructor name, must satisfy [`is_constructor`]
/// * `args` - Evaluated arguments
/// * `with_new` - Whether the call was written with `new`
///
/// # Returns
/// * `Result<Value>` - Canonical value, or `ValueError` for bad arguments
pub fn construct(name: &str, args: &[CtorArg], with_new: bool) -> Result<Value> {
    let value = match name {
        "ObjectId" => object_id(args)?,
        "NumberLong" => Value::Long(long_arg(name, args)?),
        "NumberInt" => Value::Int(int_arg(name, args)?),
        "NumberDecimal" => number_decimal(args)?,
        "ISODate" => Value::Date(date_from_args(name, args, false)?),
        "Date" if with_new => Value::Date(date_from_args(name, args, true)?),
        // Date() called as a function ignores its arguments
        "Date" => Value::String(format_js_date(&now_millis())),
        "Timestamp" => timestamp(args)?,
        "RegExp" => regexp(args)?,
        "BinData" => bin_data(args)?,
        _ => {
            return Err(ValueError::malformed(name, "is not a constructor").into());
        }
    };
    Ok(value)
}

fn object_id(args: &[CtorArg]) -> Result<Value> {
    match args {
        [] => Ok(Value::ObjectId(ObjectId::new())),
        [arg] => match &arg.value {
            Value::String(hex) => ObjectId::parse_str(hex)
                .map(Value::ObjectId)
                .map_err(|_| bad_object_id("ObjectId", hex).into()),
            Value::ObjectId(oid) => Ok(Value::ObjectId(*oid)),
            other => Err(ValueError::malformed(
                "ObjectId",
                format!("expects a hex string, got {}", other.type_name()),
            )
            .into()),
        },
        _ => Err(ValueError::malformed("ObjectId", "expects at most one argument").into()),
    }
}

/// Integer argument in `[min, max]` taken from a string or a number literal.
fn long_arg(name: &str, args: &[CtorArg]) -> Result<i64> {
    Ok(integer_arg(name, args, i64::MIN.into(), i64::MAX.into())? as i64)
}

fn int_arg(name: &str, args: &[CtorArg]) -> Result<i64> {
    Ok(integer_arg(name, args, i32::MIN.into(), i32::MAX.into())? as i64)
}

fn integer_arg(name: &str, args: &[CtorArg], min: i128, max: i128) -> Result<i128> {
    let text = match args {
        [] => return Ok(0),
        [arg] => match (&arg.literal, &arg.value) {
            (Some(raw), _) => raw.clone(),
            (None, Value::String(s)) => s.trim().to_string(),
            (None, Value::Int(n) | Value::Long(n)) => n.to_string(),
            (None, other) => {
                return Err(ValueError::malformed(
                    name,
                    format!("expects a number or string, got {}", other.type_name()),
                )
                .into());
            }
        },
        _ => return Err(ValueError::malformed(name, "expects one argument").into()),
    };

    let digits = text.strip_prefix(['-', '+']).unwrap_or(&text);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValueError::malformed(name, format!("'{text}' is not an integer")).into());
    }

    match text.parse::<i128>() {
        Ok(n) if (min..=max).contains(&n) => Ok(n),
        _ => Err(ValueError::out_of_range(name, text).into()),
    }
}

fn number_decimal(args: &[CtorArg]) -> Result<Value> {
    let text = match args {
        [] => return Ok(Value::Decimal(Decimal::ZERO)),
        [arg] => match (&arg.literal, &arg.value) {
            (Some(raw), _) => raw.clone(),
            (None, Value::String(s)) => s.trim().to_string(),
            (None, Value::Int(n) | Value::Long(n)) => n.to_string(),
            (None, Value::Decimal(d)) => return Ok(Value::Decimal(*d)),
            (None, other) => {
                return Err(ValueError::malformed(
                    "NumberDecimal",
                    format!("expects a number or string, got {}", other.type_name()),
                )
                .into());
            }
        },
        _ => return Err(ValueError::malformed("NumberDecimal", "expects one argument").into()),
    };

    parse_decimal(&text).map(Value::Decimal)
}

fn parse_decimal(text: &str) -> Result<Decimal> {
    if !is_decimal_literal(text) {
        let reason = format!("'{text}' is not a decimal");
        return Err(ValueError::malformed("NumberDecimal", reason).into());
    }

    let parsed = if text.contains(['e', 'E']) {
        Decimal::from_scientific(text)
    } else {
        Decimal::from_str_exact(text)
    };
    parsed.map_err(|_| ValueError::out_of_range("NumberDecimal", text).into())
}

/// `[+-]digits[.digits][(e|E)[+-]digits]`, with digits on at least one side
/// of the point.
fn is_decimal_literal(text: &str) -> bool {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => (mantissa, Some(exponent)),
        None => (unsigned, None),
    };

    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    let mantissa_ok =
        digits(whole) && digits(fraction) && !(whole.is_empty() && fraction.is_empty());

    let exponent_ok = exponent.is_none_or(|exp| {
        let exp = exp.strip_prefix(['+', '-']).unwrap_or(exp);
        !exp.is_empty() && digits(exp)
    });

    mantissa_ok && exponent_ok
}

fn timestamp(args: &[CtorArg]) -> Result<Value> {
    let (time, increment) = match args {
        [] => (0, 0),
        [t, i] => (u32_arg("Timestamp", t)?, u32_arg("Timestamp", i)?),
        _ => {
            let reason = "expects no arguments or (seconds, increment)";
            return Err(ValueError::malformed("Timestamp", reason).into());
        }
    };
    Ok(Value::Timestamp(Timestamp { time, increment }))
}

fn u32_arg(name: &str, arg: &CtorArg) -> Result<u32> {
    match arg.value.as_i64() {
        Some(n) => {
            u32::try_from(n).map_err(|_| ValueError::out_of_range(name, n.to_string()).into())
        }
        None => Err(ValueError::malformed(
            name,
            format!("expects an integer, got {}", arg.value.type_name()),
        )
        .into()),
    }
}

fn regexp(args: &[CtorArg]) -> Result<Value> {
    let (pattern, options) = match args {
        [pattern] => (&pattern.value, None),
        [pattern, flags] => (&pattern.value, Some(&flags.value)),
        _ => return Err(ValueError::malformed("RegExp", "expects (pattern[, flags])").into()),
    };

    let options = match options {
        None => None,
        Some(Value::String(flags)) => Some(flags.clone()),
        Some(other) => {
            return Err(ValueError::malformed(
                "RegExp",
                format!("flags must be a string, got {}", other.type_name()),
            )
            .into());
        }
    };

    match pattern {
        Value::String(pattern) => Ok(Value::Regex(Regex {
            pattern: pattern.clone(),
            options: options.unwrap_or_default(),
        })),
        Value::Regex(re) => Ok(Value::Regex(Regex {
            pattern: re.pattern.clone(),
            options: options.unwrap_or_else(|| re.options.clone()),
        })),
        other => Err(ValueError::malformed(
            "RegExp",
            format!("pattern must be a string, got {}", other.type_name()),
        )
        .into()),
    }
}

fn bin_data(args: &[CtorArg]) -> Result<Value> {
    let [subtype, payload] = args else {
        return Err(ValueError::malformed("BinData", "expects (subtype, base64)").into());
    };

    let subtype = match subtype.value.as_i64() {
        Some(n) => u8::try_from(n).map_err(|_| ValueError::out_of_range("BinData", n.to_string()))?,
        None => return Err(ValueError::malformed("BinData", "subtype must be an integer").into()),
    };
    let Value::String(encoded) = &payload.value else {
        return Err(ValueError::malformed("BinData", "payload must be a base64 string").into());
    };

    Ok(Value::Binary(Binary {
        subtype,
        bytes: decode_base64("BinData", encoded)?,
    }))
}

fn decode_base64(name: &str, encoded: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| ValueError::malformed(name, format!("invalid base64: {e}")).into())
}

/* ========================= Dates ========================= */

fn truncate_millis(dt: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(dt.timestamp_millis()).unwrap_or(dt)
}

fn date_from_millis(name: &str, millis: f64) -> Result<DateTime<Utc>> {
    if !millis.is_finite() {
        return Err(ValueError::malformed(name, "invalid date").into());
    }
    DateTime::from_timestamp_millis(millis.trunc() as i64)
        .ok_or_else(|| ValueError::out_of_range(name, millis.to_string()).into())
}

/// `ISODate(...)` and `new Date(...)` argument forms.
fn date_from_args(name: &str, args: &[CtorArg], components: bool) -> Result<DateTime<Utc>> {
    match args {
        [] => Ok(now_millis()),
        [arg] => match &arg.value {
            Value::String(s) => parse_date(s).ok_or_else(|| invalid_date(name, s).into()),
            Value::Date(dt) => Ok(*dt),
            other => match other.as_f64() {
                Some(millis) => date_from_millis(name, millis),
                None => Err(ValueError::malformed(
                    name,
                    format!("expects a date string or milliseconds, got {}", other.type_name()),
                )
                .into()),
            },
        },
        _ if components && args.len() <= 7 => date_from_components(name, args),
        _ => Err(ValueError::malformed(name, "too many arguments").into()),
    }
}

/// `new Date(year, monthIndex[, day, hours, minutes, seconds, ms])`, UTC.
fn date_from_components(name: &str, args: &[CtorArg]) -> Result<DateTime<Utc>> {
    let mut parts = [0i64, 0, 1, 0, 0, 0, 0];
    for (slot, arg) in parts.iter_mut().zip(args) {
        *slot = arg.value.as_i64().ok_or_else(|| {
            ValueError::malformed(name, format!("expects integers, got {}", arg.value.type_name()))
        })?;
    }
    let [year, month, day, hour, minute, second, millis] = parts;

    // Month index and overflowing fields roll over like JavaScript dates
    let total_months = year
        .checked_mul(12)
        .and_then(|m| m.checked_add(month))
        .ok_or_else(|| ValueError::out_of_range(name, year.to_string()))?;
    let base = i32::try_from(total_months.div_euclid(12))
        .ok()
        .and_then(|y| NaiveDate::from_ymd_opt(y, (total_months.rem_euclid(12) + 1) as u32, 1))
        .ok_or_else(|| ValueError::out_of_range(name, year.to_string()))?;

    let offset_millis = day
        .checked_sub(1)
        .and_then(|d| d.checked_mul(86_400_000))
        .and_then(|d| d.checked_add(hour.checked_mul(3_600_000)?))
        .and_then(|d| d.checked_add(minute.checked_mul(60_000)?))
        .and_then(|d| d.checked_add(second.checked_mul(1_000)?))
        .and_then(|d| d.checked_add(millis))
        .ok_or_else(|| ValueError::out_of_range(name, day.to_string()))?;

    let start = Utc.from_utc_datetime(&base.and_time(chrono::NaiveTime::MIN));
    start
        .timestamp_millis()
        .checked_add(offset_millis)
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| ValueError::out_of_range(name, offset_millis.to_string()).into())
}

/// Parse the date string forms the console accepts, as UTC.
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(truncate_millis(dt.with_timezone(&Utc)));
    }

    let naive_formats = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.fZ",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%MZ",
        "%Y-%m-%dT%H:%M",
    ];
    for format in naive_formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(truncate_millis(Utc.from_utc_datetime(&naive)));
        }
    }

    let date_formats = ["%Y-%m-%d", "%b %d, %Y", "%b %d %Y", "%B %d, %Y", "%B %d %Y"];
    for format in date_formats {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)));
        }
    }

    None
}

/* ========================= Extended JSON ========================= */

/// Resolve a `{ "$oid": ... }` style wrapper document.
///
/// Returns `Ok(None)` when the document is not a wrapper; a wrapper with a
/// bad payload is a `ValueError`.
pub fn from_extended_json(doc: &Document) -> Result<Option<Value>> {
    let mut keys: Vec<&str> = doc.keys().collect();
    keys.sort_unstable();

    let value = match keys.as_slice() {
        ["$oid"] => match doc.get("$oid") {
            Some(Value::String(hex)) => ObjectId::parse_str(hex)
                .map(Value::ObjectId)
                .map_err(|_| bad_object_id("$oid", hex))?,
            _ => return Err(ValueError::malformed("$oid", "expects a hex string").into()),
        },
        ["$date"] => Value::Date(extended_date(doc.get("$date"))?),
        ["$numberLong"] => match doc.get("$numberLong") {
            Some(Value::String(s)) => {
                let arg = CtorArg::new(Value::String(s.clone()));
                Value::Long(long_arg("$numberLong", &[arg])?)
            }
            _ => return Err(ValueError::malformed("$numberLong", "expects a string").into()),
        },
        ["$numberInt"] => match doc.get("$numberInt") {
            Some(Value::String(s)) => {
                let arg = CtorArg::new(Value::String(s.clone()));
                Value::Int(int_arg("$numberInt", &[arg])?)
            }
            _ => return Err(ValueError::malformed("$numberInt", "expects a string").into()),
        },
        ["$numberDecimal"] => match doc.get("$numberDecimal") {
            Some(Value::String(s)) => Value::Decimal(parse_decimal(s)?),
            _ => return Err(ValueError::malformed("$numberDecimal", "expects a string").into()),
        },
        ["$timestamp"] => {
            let parts = doc.get("$timestamp").and_then(Value::as_document);
            let field = |key: &str| {
                parts
                    .and_then(|p| p.get(key))
                    .and_then(Value::as_i64)
                    .and_then(|n| u32::try_from(n).ok())
            };
            match (field("t"), field("i")) {
                (Some(time), Some(increment)) => Value::Timestamp(Timestamp { time, increment }),
                _ => {
                    let reason = "expects { t: <u32>, i: <u32> }";
                    return Err(ValueError::malformed("$timestamp", reason).into());
                }
            }
        }
        ["$binary", "$type"] => {
            let (Some(Value::String(encoded)), Some(Value::String(subtype))) =
                (doc.get("$binary"), doc.get("$type"))
            else {
                let reason = "expects string $binary and $type";
                return Err(ValueError::malformed("$binary", reason).into());
            };
            let subtype = u8::from_str_radix(subtype, 16).map_err(|_| {
                ValueError::malformed("$binary", format!("invalid $type '{subtype}'"))
            })?;
            Value::Binary(Binary {
                subtype,
                bytes: decode_base64("$binary", encoded)?,
            })
        }
        ["$binary"] => {
            let parts = doc.get("$binary").and_then(Value::as_document);
            let encoded = parts.and_then(|p| p.get("base64")).and_then(Value::as_str);
            let subtype = parts.and_then(|p| p.get("subType")).and_then(Value::as_str);
            match (encoded, subtype.map(|s| u8::from_str_radix(s, 16))) {
                (Some(encoded), Some(Ok(subtype))) => Value::Binary(Binary {
                    subtype,
                    bytes: decode_base64("$binary", encoded)?,
                }),
                _ => {
                    let reason = "expects { base64, subType }";
                    return Err(ValueError::malformed("$binary", reason).into());
                }
            }
        }
        _ => return Ok(None),
    };

    Ok(Some(value))
}

fn bad_object_id(constructor: &str, hex: &str) -> ValueError {
    ValueError::malformed(constructor, format!("'{hex}' is not a 24 character hex string"))
}

fn invalid_date(constructor: &str, text: &str) -> ValueError {
    ValueError::malformed(constructor, format!("invalid date string '{text}'"))
}

fn extended_date(payload: Option<&Value>) -> Result<DateTime<Utc>> {
    match payload {
        Some(Value::String(s)) => parse_date(s).ok_or_else(|| invalid_date("$date", s).into()),
        Some(Value::Long(millis)) => date_from_millis("$date", *millis as f64),
        Some(Value::Date(dt)) => Ok(*dt),
        Some(other) => match other.as_f64() {
            Some(millis) => date_from_millis("$date", millis),
            None => {
                let reason = "expects a date string or milliseconds";
                Err(ValueError::malformed("$date", reason).into())
            }
        },
        None => Err(ValueError::malformed("$date", "missing payload").into()),
    }
}
