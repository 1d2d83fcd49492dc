//! Document values handled by the console
//!
//! [`Value`] is the tagged variant every statement argument resolves to
//! before it reaches a backend. [`Document`] keeps key insertion order for
//! display while comparing equal regardless of order.
//!
//! The `Display` implementation produces canonical shell text: feeding it
//! back through the parser yields an equal value with the same key order.

mod convert;
mod json;
pub mod methods;

use std::fmt;

use ::bson::oid::ObjectId;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;

pub use self::convert::{bson_to_value, document_from_bson, document_to_bson, value_to_bson};
pub use self::json::value_to_json;

/// A document value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    /// Integer literal
    Int(i64),
    /// Floating point literal
    Double(f64),
    String(String),
    /// UTC instant at millisecond precision
    Date(DateTime<Utc>),
    ObjectId(ObjectId),
    Binary(Binary),
    /// Explicit 64-bit integer (`NumberLong`)
    Long(i64),
    /// Decimal with its original scale (`NumberDecimal("123.40")`)
    Decimal(Decimal),
    Timestamp(Timestamp),
    Regex(Regex),
    Array(Vec<Value>),
    Document(Document),
}

/// Binary payload with its BSON subtype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binary {
    pub subtype: u8,
    pub bytes: Vec<u8>,
}

/// Replication timestamp: seconds plus an ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub time: u32,
    pub increment: u32,
}

/// Regular expression with option letters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Regex {
    pub pattern: String,
    pub options: String,
}

/// Ordered mapping of keys to values.
#[derive(Debug, Clone, Default)]
pub struct Document {
    entries: Vec<(String, Value)>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing an existing key in place.
    ///
    /// Returns the previous value for the key, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| o == v))
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            doc.insert(k, v);
        }
        doc
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Value {
    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::ObjectId(_) => "objectId",
            Value::Binary(_) => "binData",
            Value::Long(_) => "long",
            Value::Decimal(_) => "decimal",
            Value::Timestamp(_) => "timestamp",
            Value::Regex(_) => "regex",
            Value::Array(_) => "array",
            Value::Document(_) => "document",
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view of `Int`, `Long` and integral `Double` values.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) | Value::Long(n) => Some(*n),
            Value::Double(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Some(*f as i64),
            _ => None,
        }
    }

    /// Numeric view used for ordering comparisons.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) | Value::Long(n) => Some(*n as f64),
            Value::Double(f) => Some(*f),
            Value::Decimal(d) => d.to_string().parse().ok(),
            _ => None,
        }
    }
}

/* ========================= Conversions into Value ========================= */

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Document(doc)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<ObjectId> for Value {
    fn from(oid: ObjectId) -> Self {
        Value::ObjectId(oid)
    }
}

/* ========================= Canonical text ========================= */

/// Whether a document key can be written without quotes.
pub fn is_bare_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Double-quoted string literal with escapes the lexer accepts.
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Shell text for a floating point number that reads back as a double.
pub fn format_double(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        format!("{f:?}")
    }
}

/// ISO-8601 text with millisecond precision.
pub fn format_date(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time at millisecond precision.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// JavaScript `Date.prototype.toString` rendering in UTC.
pub fn format_js_date(dt: &DateTime<Utc>) -> String {
    dt.format("%a %b %d %Y %H:%M:%S GMT+0000 (Coordinated Universal Time)")
        .to_string()
}

/// Regex pattern with unescaped `/` escaped for literal syntax.
pub fn escape_regex_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut escaped = false;
    for ch in pattern.chars() {
        if ch == '/' && !escaped {
            out.push('\\');
        }
        escaped = ch == '\\' && !escaped;
        out.push(ch);
    }
    out
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Double(d) => write!(f, "{}", format_double(*d)),
            Value::String(s) => write!(f, "{}", quote_string(s)),
            Value::Date(dt) => write!(f, "ISODate(\"{}\")", format_date(dt)),
            Value::ObjectId(oid) => write!(f, "ObjectId(\"{}\")", oid.to_hex()),
            Value::Binary(bin) => {
                use base64::Engine as _;
                let encoded = base64::engine::general_purpose::STANDARD.encode(&bin.bytes);
                write!(f, "BinData({}, \"{encoded}\")", bin.subtype)
            }
            Value::Long(n) => write!(f, "NumberLong(\"{n}\")"),
            Value::Decimal(d) => write!(f, "NumberDecimal(\"{d}\")"),
            Value::Timestamp(ts) => write!(f, "Timestamp({}, {})", ts.time, ts.increment),
            Value::Regex(re) => write!(f, "/{}/{}", escape_regex_pattern(&re.pattern), re.options),
            Value::Array(items) => {
                if items.is_empty() {
                    return write!(f, "[]");
                }
                write!(f, "[ ")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, " ]")
            }
            Value::Document(doc) => write!(f, "{doc}"),
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "{{}}");
        }
        write!(f, "{{ ")?;
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if is_bare_key(key) {
                write!(f, "{key}: {value}")?;
            } else {
                write!(f, "{}: {value}", quote_string(key))?;
            }
        }
        write!(f, " }}")
    }
}
