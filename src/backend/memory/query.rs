//! Filter matching and ordering for the in-memory backend
//!
//! Covers equality on dotted paths (arrays match when any element does),
//! the comparison operators `$eq $ne $gt $gte $lt $lte $in $nin $exists`
//! and the logical `$and $or $nor`. Anything else is reported the way the
//! server reports it.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use crate::error::{BackendError, DocshError, Result};
use crate::value::{Document, Value};

/// Error with a server-style code and code name.
pub(crate) fn server_error(code: i32, code_name: &str, message: impl Into<String>) -> DocshError {
    DocshError::Backend(BackendError {
        message: message.into(),
        code: Some(code),
        code_name: Some(code_name.to_string()),
    })
}

static MISSING: Value = Value::Null;

fn bad_value(message: impl Into<String>) -> DocshError {
    server_error(2, "BadValue", message)
}

/// Whether `doc` satisfies every clause of `filter`.
pub fn matches(doc: &Document, filter: &Document) -> Result<bool> {
    for (key, condition) in filter.iter() {
        if !matches_clause(doc, key, condition)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn matches_clause(doc: &Document, key: &str, condition: &Value) -> Result<bool> {
    match key {
        "$and" => {
            for sub in subfilters(condition)? {
                if !matches(doc, sub)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        "$or" | "$nor" => {
            let mut any = false;
            for sub in subfilters(condition)? {
                if matches(doc, sub)? {
                    any = true;
                    break;
                }
            }
            Ok(if key == "$or" { any } else { !any })
        }
        k if k.starts_with('$') => Err(bad_value(format!("unknown top level operator: {k}"))),
        path => {
            let candidates = lookup_path(doc, path);
            match condition {
                Value::Document(ops) if is_operator_document(ops) => {
                    for (op, operand) in ops.iter() {
                        if !apply_operator(&candidates, op, operand)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                Value::Regex(_) => Err(bad_value(
                    "regular expression filters are not supported offline",
                )),
                _ => Ok(matches_equality(&candidates, condition)),
            }
        }
    }
}

fn subfilters(condition: &Value) -> Result<Vec<&Document>> {
    let items = condition
        .as_array()
        .filter(|items| !items.is_empty())
        .ok_or_else(|| bad_value("$and/$or/$nor must be a nonempty array"))?;
    items
        .iter()
        .map(|item| {
            item.as_document()
                .ok_or_else(|| bad_value("$or/$and/$nor entries need to be full objects"))
        })
        .collect()
}

fn is_operator_document(doc: &Document) -> bool {
    doc.keys().next().is_some_and(|k| k.starts_with('$'))
}

fn apply_operator(candidates: &[&Value], op: &str, operand: &Value) -> Result<bool> {
    let result = match op {
        "$eq" => matches_equality(candidates, operand),
        "$ne" => !matches_equality(candidates, operand),
        "$gt" => any_ordered(candidates, operand, |o| o == Ordering::Greater),
        "$gte" => any_ordered(candidates, operand, |o| o != Ordering::Less),
        "$lt" => any_ordered(candidates, operand, |o| o == Ordering::Less),
        "$lte" => any_ordered(candidates, operand, |o| o != Ordering::Greater),
        "$in" | "$nin" => {
            let options = operand
                .as_array()
                .ok_or_else(|| bad_value(format!("{op} needs an array")))?;
            let found = options.iter().any(|o| matches_equality(candidates, o));
            if op == "$in" { found } else { !found }
        }
        "$exists" => !candidates.is_empty() == is_truthy(operand),
        other => return Err(bad_value(format!("unknown operator: {other}"))),
    };
    Ok(result)
}

/// Values reached by a dotted path. Arrays without a numeric segment fan out
/// over their document elements.
fn lookup_path<'a>(doc: &'a Document, path: &str) -> Vec<&'a Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    if let Some((head, rest)) = segments.split_first()
        && let Some(value) = doc.get(head)
    {
        collect_path(value, rest, &mut out);
    }
    out
}

fn collect_path<'a>(value: &'a Value, segments: &[&str], out: &mut Vec<&'a Value>) {
    let Some((head, rest)) = segments.split_first() else {
        out.push(value);
        return;
    };
    match value {
        Value::Document(doc) => {
            if let Some(child) = doc.get(head) {
                collect_path(child, rest, out);
            }
        }
        Value::Array(items) => match head.parse::<usize>() {
            Ok(index) => {
                if let Some(item) = items.get(index) {
                    collect_path(item, rest, out);
                }
            }
            Err(_) => {
                for item in items.iter().filter(|i| matches!(i, Value::Document(_))) {
                    collect_path(item, segments, out);
                }
            }
        },
        _ => {}
    }
}

fn matches_equality(candidates: &[&Value], expected: &Value) -> bool {
    if candidates.is_empty() {
        return matches!(expected, Value::Null);
    }
    candidates.iter().any(|candidate| {
        values_equal(candidate, expected)
            || matches!(
                candidate,
                Value::Array(items) if items.iter().any(|i| values_equal(i, expected))
            )
    })
}

fn any_ordered(candidates: &[&Value], operand: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    candidates.iter().any(|candidate| match candidate {
        Value::Array(items) => items
            .iter()
            .chain(std::iter::once(*candidate))
            .any(|v| compare_values(v, operand).is_some_and(&accept)),
        _ => compare_values(candidate, operand).is_some_and(&accept),
    })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(n) | Value::Long(n) => *n != 0,
        Value::Double(f) => *f != 0.0,
        _ => true,
    }
}

/// Query equality: numbers compare across types, documents compare in
/// field order.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_equal(l, r))
        }
        (Value::Document(x), Value::Document(y)) => {
            x.len() == y.len()
                && x.iter()
                    .zip(y.iter())
                    .all(|((kx, vx), (ky, vy))| kx == ky && values_equal(vx, vy))
        }
        _ => compare_values(a, b) == Some(Ordering::Equal),
    }
}

/// Ordering between values of the same comparison class.
///
/// Returns None when the values are not comparable (different classes or
/// NaN), which makes range operators fail to match.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Date(x), Value::Date(y)) => Some(x.cmp(y)),
        (Value::ObjectId(x), Value::ObjectId(y)) => Some(x.bytes().cmp(&y.bytes())),
        (Value::Timestamp(x), Value::Timestamp(y)) => {
            Some((x.time, x.increment).cmp(&(y.time, y.increment)))
        }
        (Value::Binary(x), Value::Binary(y)) => Some(
            (x.bytes.len(), x.subtype, &x.bytes).cmp(&(y.bytes.len(), y.subtype, &y.bytes)),
        ),
        (Value::Regex(x), Value::Regex(y)) => {
            Some((&x.pattern, &x.options).cmp(&(&y.pattern, &y.options)))
        }
        (Value::Int(x) | Value::Long(x), Value::Int(y) | Value::Long(y)) => Some(x.cmp(y)),
        (Value::Decimal(x), other) => to_decimal(other).map(|y| x.cmp(&y)),
        (other, Value::Decimal(y)) => to_decimal(other).map(|x| x.cmp(y)),
        _ => a.as_f64().zip(b.as_f64()).and_then(|(x, y)| x.partial_cmp(&y)),
    }
}

fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Int(n) | Value::Long(n) => Some(Decimal::from(*n)),
        Value::Double(f) => Decimal::from_f64(*f),
        Value::Decimal(d) => Some(*d),
        _ => None,
    }
}

/* ========================= Sorting ========================= */

/// Canonical type order used when sorting mixed values.
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 1,
        Value::Int(_) | Value::Long(_) | Value::Double(_) | Value::Decimal(_) => 2,
        Value::String(_) => 3,
        Value::Document(_) => 4,
        Value::Array(_) => 5,
        Value::Binary(_) => 6,
        Value::ObjectId(_) => 7,
        Value::Bool(_) => 8,
        Value::Date(_) => 9,
        Value::Timestamp(_) => 10,
        Value::Regex(_) => 11,
    }
}

/// Total order over values: type rank first, then value.
pub fn compare_for_sort(a: &Value, b: &Value) -> Ordering {
    let by_rank = type_rank(a).cmp(&type_rank(b));
    if by_rank != Ordering::Equal {
        return by_rank;
    }
    match (a, b) {
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y)
            .map(|(l, r)| compare_for_sort(l, r))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Document(x), Value::Document(y)) => x
            .iter()
            .zip(y.iter())
            .map(|((kx, vx), (ky, vy))| kx.cmp(ky).then_with(|| compare_for_sort(vx, vy)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => compare_values(a, b).unwrap_or(Ordering::Equal),
    }
}

/// Sort documents in place by a `{ field: ±1 }` specification.
///
/// `$natural: -1` reverses insertion order. Missing fields sort as null.
pub fn sort_documents(docs: &mut [Document], spec: &Document) {
    if let Some(direction) = spec.get("$natural").and_then(Value::as_i64)
        && direction < 0
    {
        docs.reverse();
    }

    let keys: Vec<(&str, bool)> = spec
        .iter()
        .filter(|(field, _)| *field != "$natural")
        .map(|(field, dir)| (field, dir.as_i64().is_some_and(|d| d < 0)))
        .collect();
    if keys.is_empty() {
        return;
    }

    docs.sort_by(|a, b| {
        for (field, descending) in &keys {
            let left = lookup_path(a, field).first().copied().unwrap_or(&MISSING);
            let right = lookup_path(b, field).first().copied().unwrap_or(&MISSING);
            let ord = compare_for_sort(left, right);
            if ord != Ordering::Equal {
                return if *descending { ord.reverse() } else { ord };
            }
        }
        Ordering::Equal
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn journal() -> Document {
        Document::new()
            .with("item", "journal")
            .with("qty", 25)
            .with("status", "A")
            .with(
                "size",
                Document::new().with("h", 14).with("w", 21).with("uom", "cm"),
            )
            .with("tags", vec![Value::from("blank"), Value::from("red")])
    }

    fn filter(key: &str, value: impl Into<Value>) -> Document {
        Document::new().with(key, value)
    }

    #[test]
    fn test_equality_and_paths() {
        let doc = journal();
        assert!(matches(&doc, &Document::new()).unwrap());
        assert!(matches(&doc, &filter("status", "A")).unwrap());
        assert!(!matches(&doc, &filter("status", "D")).unwrap());
        assert!(matches(&doc, &filter("size.uom", "cm")).unwrap());
        assert!(matches(&doc, &filter("missing", Value::Null)).unwrap());
        // numbers compare across types
        assert!(matches(&doc, &filter("qty", Value::Double(25.0))).unwrap());
    }

    #[test]
    fn test_array_semantics() {
        let doc = journal();
        assert!(matches(&doc, &filter("tags", "red")).unwrap());
        let exact = vec![Value::from("blank"), Value::from("red")];
        assert!(matches(&doc, &filter("tags", exact)).unwrap());
        let reordered = vec![Value::from("red"), Value::from("blank")];
        assert!(!matches(&doc, &filter("tags", reordered)).unwrap());
        assert!(matches(&doc, &filter("tags.1", "red")).unwrap());
    }

    #[test]
    fn test_embedded_document_is_order_sensitive() {
        let doc = journal();
        let exact = Document::new().with("h", 14).with("w", 21).with("uom", "cm");
        let reordered = Document::new().with("w", 21).with("h", 14).with("uom", "cm");
        assert!(matches(&doc, &filter("size", exact)).unwrap());
        assert!(!matches(&doc, &filter("size", reordered)).unwrap());
    }

    #[test]
    fn test_comparison_operators() {
        let doc = journal();
        assert!(matches(&doc, &filter("qty", Document::new().with("$gt", 20))).unwrap());
        assert!(!matches(&doc, &filter("qty", Document::new().with("$lt", 20))).unwrap());
        let range = Document::new().with("$gte", 20).with("$lte", 25);
        assert!(matches(&doc, &filter("qty", range)).unwrap());
        assert!(matches(&doc, &filter("status", Document::new().with("$ne", "D"))).unwrap());
        let any_of = Document::new().with("$in", vec![Value::from("A"), Value::from("D")]);
        assert!(matches(&doc, &filter("status", any_of)).unwrap());
        let none_of = Document::new().with("$nin", vec![Value::from("blue")]);
        assert!(matches(&doc, &filter("tags", none_of)).unwrap());
        assert!(matches(&doc, &filter("size.h", Document::new().with("$exists", true))).unwrap());
        assert!(!matches(&doc, &filter("size.d", Document::new().with("$exists", true))).unwrap());
        // strings and numbers never compare
        assert!(!matches(&doc, &filter("status", Document::new().with("$gt", 1))).unwrap());
    }

    #[test]
    fn test_logical_operators() {
        let doc = journal();
        let or = vec![
            Value::Document(filter("status", "D")),
            Value::Document(filter("qty", 25)),
        ];
        assert!(matches(&doc, &filter("$or", or.clone())).unwrap());
        assert!(!matches(&doc, &filter("$nor", or)).unwrap());
        assert!(matches(&doc, &filter("$and", vec![Value::Document(filter("qty", 25))])).unwrap());
    }

    #[test]
    fn test_unknown_operators_are_errors() {
        let doc = journal();
        let err = matches(&doc, &filter("qty", Document::new().with("$near", 1))).unwrap_err();
        assert_eq!(err.to_string(), "BackendError[BadValue(2)]: unknown operator: $near");
        assert!(matches(&doc, &filter("$where", "true")).is_err());
        assert!(matches(&doc, &filter("$or", Vec::<Value>::new())).is_err());
    }

    #[test]
    fn test_sort_documents() {
        let mut docs: Vec<Document> = [3, 1, 2].iter().map(|n| filter("n", *n)).collect();
        sort_documents(&mut docs, &filter("n", 1));
        let order: Vec<_> = docs.iter().map(|d| d.get("n").cloned()).collect();
        assert_eq!(order, vec![Some(Value::Int(1)), Some(Value::Int(2)), Some(Value::Int(3))]);

        sort_documents(&mut docs, &filter("n", -1));
        assert_eq!(docs[0].get("n"), Some(&Value::Int(3)));

        sort_documents(&mut docs, &filter("$natural", -1));
        assert_eq!(docs[0].get("n"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_sort_mixed_types_by_rank() {
        assert_eq!(compare_for_sort(&Value::Null, &Value::Int(0)), Ordering::Less);
        assert_eq!(compare_for_sort(&Value::Int(5), &Value::from("a")), Ordering::Less);
        assert_eq!(compare_for_sort(&Value::Long(2), &Value::Double(1.5)), Ordering::Greater);
    }
}
