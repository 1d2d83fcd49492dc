//! Shell-style formatting for values
//!
//! Output follows the console conventions users know from mongosh:
//! - type wrappers (`ObjectId('...')`, `ISODate('...')`, `Long('...')`)
//! - single-quoted strings and unquoted keys where possible
//! - documents and arrays kept on one line while they fit, otherwise one
//!   entry per line with configurable indentation

use base64::Engine as _;

use super::colorizer::{Colorizer, visible_width};
use crate::value::{Document, Value, format_date, format_double, is_bare_key};

/// Width above which documents and arrays are broken over several lines.
const LINE_WIDTH: usize = 72;

/// Shell-style formatter
pub struct ShellFormatter {
    /// Colorizer for output highlighting
    colorizer: Colorizer,

    /// Spaces per nesting level
    indent: usize,
}

impl ShellFormatter {
    /// Create a new shell formatter
    ///
    /// # Arguments
    /// * `use_colors` - Enable colored output
    /// * `indent` - Spaces per nesting level
    ///
    /// # Returns
    /// * `Self` - New formatter
    pub fn new(use_colors: bool, indent: usize) -> Self {
        Self {
            colorizer: Colorizer::new(use_colors),
            indent,
        }
    }

    /// Format a top-level value. Top-level strings print without quotes.
    pub fn format(&self, value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => self.render(other, 0),
        }
    }

    fn render(&self, value: &Value, level: usize) -> String {
        let c = &self.colorizer;
        match value {
            Value::Null => c.keyword("null"),
            Value::Bool(b) => c.keyword(&b.to_string()),
            Value::Int(n) => c.number(&n.to_string()),
            Value::Double(f) => c.number(&js_number(*f)),
            Value::String(s) => c.string(&single_quote(s)),
            Value::Date(dt) => c.wrapper("ISODate", &c.date(&single_quote(&format_date(dt)))),
            Value::ObjectId(oid) => c.wrapper("ObjectId", &c.string(&single_quote(&oid.to_hex()))),
            Value::Binary(bin) => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(&bin.bytes);
                let subtype = c.number(&bin.subtype.to_string());
                c.wrapper(
                    "Binary.createFromBase64",
                    &format!("{}, {subtype}", c.string(&single_quote(&encoded))),
                )
            }
            Value::Long(n) => c.wrapper("Long", &c.number(&single_quote(&n.to_string()))),
            Value::Decimal(d) => c.wrapper("Decimal128", &c.number(&single_quote(&d.to_string()))),
            Value::Timestamp(ts) => {
                let time = c.number(&ts.time.to_string());
                let increment = c.number(&ts.increment.to_string());
                c.wrapper("Timestamp", &format!("{{ t: {time}, i: {increment} }}"))
            }
            Value::Regex(re) => c.regex(&format!("/{}/{}", re.pattern, re.options)),
            Value::Array(items) => self.render_array(items, level),
            Value::Document(doc) => self.render_document(doc, level),
        }
    }

    fn render_document(&self, doc: &Document, level: usize) -> String {
        if doc.is_empty() {
            return "{}".to_string();
        }
        let entries: Vec<String> = doc
            .iter()
            .map(|(key, value)| format!("{}: {}", render_key(key), self.render(value, level + 1)))
            .collect();
        self.wrap('{', '}', &entries, level)
    }

    fn render_array(&self, items: &[Value], level: usize) -> String {
        if items.is_empty() {
            return "[]".to_string();
        }
        let entries: Vec<String> = items.iter().map(|item| self.render(item, level + 1)).collect();
        self.wrap('[', ']', &entries, level)
    }

    /// Join entries on one line when they fit, otherwise one per line.
    fn wrap(&self, open: char, close: char, entries: &[String], level: usize) -> String {
        let inline = format!("{open} {} {close}", entries.join(", "));
        if !inline.contains('\n') && level * self.indent + visible_width(&inline) <= LINE_WIDTH {
            return inline;
        }

        let pad = " ".repeat((level + 1) * self.indent);
        let mut out = String::new();
        out.push(open);
        out.push('\n');
        for (i, entry) in entries.iter().enumerate() {
            out.push_str(&pad);
            out.push_str(entry);
            if i + 1 < entries.len() {
                out.push(',');
            }
            out.push('\n');
        }
        out.push_str(&" ".repeat(level * self.indent));
        out.push(close);
        out
    }
}

fn render_key(key: &str) -> String {
    if is_bare_key(key) {
        key.to_string()
    } else {
        single_quote(key)
    }
}

/// Double rendered the way a JavaScript number prints (`1`, not `1.0`).
fn js_number(f: f64) -> String {
    if f.is_finite() {
        format!("{f}")
    } else {
        format_double(f)
    }
}

fn single_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Binary, Timestamp};
    use bson::oid::ObjectId;
    use chrono::{TimeZone, Utc};

    fn formatter() -> ShellFormatter {
        ShellFormatter::new(false, 2)
    }

    #[test]
    fn test_type_wrappers() {
        let oid = ObjectId::parse_str("65705d84dfc3f3b5094e1f72").unwrap();
        let doc = Document::new()
            .with("_id", oid)
            .with("n", Value::Long(1))
            .with("at", Value::Date(Utc.with_ymd_and_hms(2023, 12, 6, 11, 39, 48).unwrap()));
        assert_eq!(
            formatter().format(&Value::Document(doc)),
            "{\n  _id: ObjectId('65705d84dfc3f3b5094e1f72'),\
             \n  n: Long('1'),\
             \n  at: ISODate('2023-12-06T11:39:48.000Z')\n}"
        );
    }

    #[test]
    fn test_short_document_stays_inline() {
        let doc = Document::new()
            .with("acknowledged", true)
            .with("insertedIds", Document::new().with("0", 1).with("1", 2));
        assert_eq!(
            formatter().format(&Value::Document(doc)),
            "{ acknowledged: true, insertedIds: { '0': 1, '1': 2 } }"
        );
    }

    #[test]
    fn test_scalars() {
        let f = formatter();
        assert_eq!(f.format(&Value::from("test")), "test");
        assert_eq!(f.format(&Value::Array(vec![Value::from("it's")])), "[ 'it\\'s' ]");
        assert_eq!(f.format(&Value::Double(1.0)), "1");
        assert_eq!(f.format(&Value::Double(8.5)), "8.5");
        assert_eq!(f.format(&Value::Double(f64::NAN)), "NaN");
        assert_eq!(
            f.format(&Value::Timestamp(Timestamp { time: 1412180887, increment: 1 })),
            "Timestamp({ t: 1412180887, i: 1 })"
        );
        assert_eq!(
            f.format(&Value::Binary(Binary { subtype: 0, bytes: b"hi".to_vec() })),
            "Binary.createFromBase64('aGk=', 0)"
        );
    }

    #[test]
    fn test_long_array_breaks_lines() {
        let items: Vec<Value> = (0..4)
            .map(|i| Value::Document(Document::new().with("item", "journal entry").with("qty", i)))
            .collect();
        let text = formatter().format(&Value::Array(items));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.first(), Some(&"["));
        assert_eq!(lines[1], "  { item: 'journal entry', qty: 0 },");
        assert_eq!(lines.last(), Some(&"]"));
    }

    #[test]
    fn test_colored_output_wraps_by_visible_width() {
        let colored = ShellFormatter::new(true, 2);
        let text = colored.format(&Value::Document(Document::new().with("a", 1)));
        assert!(text.contains("\x1b["));
        assert!(!text.contains('\n'));
    }
}
