//! Methods callable on bound values (`mydate1.getMonth()`)

use chrono::{DateTime, Datelike, Timelike, Utc};

use super::{Value, format_date, format_js_date};
use crate::error::{DocshError, Result};

/// Names of the supported value methods.
pub const VALUE_METHODS: &[&str] = &[
    "toString",
    "valueOf",
    "toISOString",
    "toHexString",
    "getTime",
    "getFullYear",
    "getMonth",
    "getDate",
    "getDay",
    "getHours",
    "getMinutes",
    "getSeconds",
    "getMilliseconds",
    "getTimestamp",
];

/// Apply a method to a value.
///
/// Date getters follow JavaScript semantics in UTC: `getMonth` is zero
/// based and `getDay` counts from Sunday.
pub fn call_method(value: &Value, method: &str, args: &[Value]) -> Result<Value> {
    if !args.is_empty() {
        return Err(DocshError::shape(method, "no arguments"));
    }

    match (value, method) {
        (Value::Date(dt), _) => date_method(dt, method),
        (Value::ObjectId(oid), "getTimestamp") => {
            let millis = oid.timestamp().timestamp_millis();
            DateTime::from_timestamp_millis(millis)
                .map(Value::Date)
                .ok_or_else(|| DocshError::unknown(format!("ObjectId.getTimestamp() for {oid}")))
        }
        (Value::ObjectId(oid), "toHexString" | "valueOf") => Ok(Value::String(oid.to_hex())),
        (Value::String(s), "toString" | "valueOf") => Ok(Value::String(s.clone())),
        (_, "toString") => Ok(Value::String(value.to_string())),
        (_, "valueOf") => Ok(value.clone()),
        _ => Err(unsupported(value, method)),
    }
}

fn date_method(dt: &DateTime<Utc>, method: &str) -> Result<Value> {
    let value = match method {
        "toString" => Value::String(format_js_date(dt)),
        "toISOString" => Value::String(format_date(dt)),
        "valueOf" | "getTime" => Value::Int(dt.timestamp_millis()),
        "getFullYear" => Value::Int(dt.year() as i64),
        "getMonth" => Value::Int(dt.month0() as i64),
        "getDate" => Value::Int(dt.day() as i64),
        "getDay" => Value::Int(dt.weekday().num_days_from_sunday() as i64),
        "getHours" => Value::Int(dt.hour() as i64),
        "getMinutes" => Value::Int(dt.minute() as i64),
        "getSeconds" => Value::Int(dt.second() as i64),
        "getMilliseconds" => Value::Int(dt.timestamp_subsec_millis() as i64),
        _ => return Err(unsupported(&Value::Date(*dt), method)),
    };
    Ok(value)
}

fn unsupported(value: &Value, method: &str) -> DocshError {
    DocshError::unknown(format!("{method}() is not a method of {}", value.type_name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;
    use chrono::TimeZone;

    fn sample_date() -> Value {
        Value::Date(Utc.with_ymd_and_hms(1912, 6, 23, 10, 30, 5).unwrap())
    }

    #[test]
    fn test_date_getters() {
        let date = sample_date();
        assert_eq!(call_method(&date, "getMonth", &[]).unwrap(), Value::Int(5));
        assert_eq!(call_method(&date, "getFullYear", &[]).unwrap(), Value::Int(1912));
        assert_eq!(call_method(&date, "getDate", &[]).unwrap(), Value::Int(23));
        // 1912-06-23 was a Sunday
        assert_eq!(call_method(&date, "getDay", &[]).unwrap(), Value::Int(0));
        assert_eq!(call_method(&date, "getSeconds", &[]).unwrap(), Value::Int(5));
    }

    #[test]
    fn test_date_strings() {
        let date = sample_date();
        assert_eq!(
            call_method(&date, "toISOString", &[]).unwrap(),
            Value::String("1912-06-23T10:30:05.000Z".into())
        );
        assert_eq!(
            call_method(&date, "toString", &[]).unwrap(),
            Value::String("Sun Jun 23 1912 10:30:05 GMT+0000 (Coordinated Universal Time)".into())
        );
    }

    #[test]
    fn test_object_id_timestamp() {
        let oid = ObjectId::parse_str("5099803df3f4948bd2f98391").unwrap();
        let ts = call_method(&Value::ObjectId(oid), "getTimestamp", &[]).unwrap();
        assert_eq!(ts.to_string(), "ISODate(\"2012-11-06T21:25:17.000Z\")");
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            call_method(&Value::Int(1), "getMonth", &[]),
            Err(DocshError::UnknownCommand(_))
        ));
        assert!(matches!(
            call_method(&sample_date(), "getMonth", &[Value::Int(1)]),
            Err(DocshError::ArgumentShape(_))
        ));
        assert_eq!(
            call_method(&Value::Int(3), "toString", &[]).unwrap(),
            Value::String("3".into())
        );
    }
}
