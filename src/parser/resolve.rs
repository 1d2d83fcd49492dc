//! Syntax tree resolution
//!
//! Binds names against the session, evaluates constructors and wrapper
//! documents, and flattens member/call chains into [`CallExpression`]s.

use super::ast::{Expr, Stmt, UnaryOperator};
use super::literals::{self, CtorArg};
use super::{CallExpression, ControlStatement, MethodCall, Statement};
use crate::error::{DocshError, Result, ValueError};
use crate::session::SessionContext;
use crate::value::methods::call_method;
use crate::value::{Document, Regex, Value};

/// Name of the database handle at the head of call paths.
const DB_HANDLE: &str = "db";

/// Resolve a parsed statement against the session.
pub fn resolve_statement(stmt: Stmt, session: &SessionContext) -> Result<Statement> {
    let statement = match stmt {
        Stmt::Use { name, .. } => Statement::Control(ControlStatement::Use(name)),
        Stmt::Show { keyword, .. } => Statement::Control(ControlStatement::Show(keyword)),
        Stmt::Exit => Statement::Control(ControlStatement::Exit),
        Stmt::Var { name, value } => {
            if name == DB_HANDLE {
                return Err(DocshError::parse("Cannot reassign 'db'", value.offset()));
            }
            let value = resolve_value(&value, session)?;
            Statement::Control(ControlStatement::Var { name, value })
        }
        Stmt::Expr(expr) => resolve_expression_statement(&expr, session)?,
    };
    Ok(statement)
}

/// One step of a flattened `a.b(c).d` chain.
enum Link<'a> {
    Member { name: &'a str, offset: usize },
    Call { args: &'a [Expr], offset: usize },
}

fn flatten(expr: &Expr) -> (&Expr, Vec<Link<'_>>) {
    match expr {
        Expr::Member(member) => {
            let (root, mut links) = flatten(&member.object);
            links.push(Link::Member {
                name: &member.property,
                offset: member.span.end,
            });
            (root, links)
        }
        Expr::Call(call) => {
            let (root, mut links) = flatten(&call.callee);
            links.push(Link::Call {
                args: &call.arguments,
                offset: call.span.end,
            });
            (root, links)
        }
        _ => (expr, Vec::new()),
    }
}

fn resolve_expression_statement(expr: &Expr, session: &SessionContext) -> Result<Statement> {
    let (root, links) = flatten(expr);

    let Expr::Ident { name, .. } = root else {
        return Ok(Statement::Value(resolve_value(expr, session)?));
    };

    if links.is_empty() && name == DB_HANDLE {
        return Ok(Statement::CurrentDatabase);
    }

    let has_call = links.iter().any(|l| matches!(l, Link::Call { .. }));
    if name == DB_HANDLE || (session.is_bound(name) && has_call) {
        return build_call(name, links, session).map(Statement::Call);
    }

    if session.is_bound(name) || literals::is_constructor(name) {
        return Ok(Statement::Value(resolve_value(expr, session)?));
    }

    Err(DocshError::name(name.as_str()))
}

/// Split links into target path segments followed by `.name(args)` pairs.
fn build_call(
    root: &str,
    links: Vec<Link<'_>>,
    session: &SessionContext,
) -> Result<CallExpression> {
    let mut target = vec![root.to_string()];
    let mut calls: Vec<MethodCall> = Vec::new();
    let mut pending: Option<(&str, usize)> = None;

    for link in links {
        match link {
            Link::Member { name, offset } => {
                if let Some((previous, previous_offset)) = pending.replace((name, offset)) {
                    if !calls.is_empty() {
                        return Err(DocshError::parse(
                            format!("Expected '(' after '{previous}'"),
                            previous_offset,
                        ));
                    }
                    target.push(previous.to_string());
                }
            }
            Link::Call { args, offset } => {
                let Some((name, _)) = pending.take() else {
                    let callee = calls
                        .last()
                        .map(|c| format!("{}(...)", c.name))
                        .unwrap_or_else(|| target.join("."));
                    return Err(DocshError::parse(format!("{callee} is not a function"), offset));
                };
                let args = args
                    .iter()
                    .map(|arg| resolve_value(arg, session))
                    .collect::<Result<Vec<_>>>()?;
                calls.push(MethodCall {
                    name: name.to_string(),
                    args,
                });
            }
        }
    }

    if let Some((name, offset)) = pending {
        return Err(DocshError::parse(format!("Expected '(' after '{name}'"), offset));
    }

    Ok(CallExpression { target, calls })
}

/// Resolve an expression in value position.
pub fn resolve_value(expr: &Expr, session: &SessionContext) -> Result<Value> {
    match expr {
        Expr::Document(doc) => {
            let mut document = Document::new();
            for (key, value) in &doc.properties {
                document.insert(key.clone(), resolve_value(value, session)?);
            }
            match literals::from_extended_json(&document)? {
                Some(value) => Ok(value),
                None => Ok(Value::Document(document)),
            }
        }
        Expr::Array(arr) => arr
            .elements
            .iter()
            .map(|e| resolve_value(e, session))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Expr::String { value, .. } => Ok(Value::String(value.clone())),
        Expr::Number { raw, span } => number_value(raw, span.start),
        Expr::Boolean { value, .. } => Ok(Value::Bool(*value)),
        Expr::Null { .. } => Ok(Value::Null),
        Expr::Regex { pattern, flags, .. } => Ok(Value::Regex(Regex {
            pattern: pattern.clone(),
            options: flags.clone(),
        })),
        Expr::Ident { name, span } => {
            if let Ok(value) = session.get_var(name) {
                return Ok(value.clone());
            }
            if name == DB_HANDLE {
                return Err(DocshError::parse("'db' cannot be used as a value", span.start));
            }
            if literals::is_constructor(name) {
                return Err(DocshError::parse(
                    format!("Constructor '{name}' must be called"),
                    span.start,
                ));
            }
            Err(DocshError::name(name.as_str()))
        }
        Expr::Member(member) => {
            let base = resolve_value(&member.object, session)?;
            Ok(member_value(&base, &member.property))
        }
        Expr::Call(call) => match &call.callee {
            Expr::Ident { name, span } => {
                if literals::is_constructor(name) {
                    let args = constructor_args(&call.arguments, session)?;
                    literals::construct(name, &args, false)
                } else if name == DB_HANDLE || session.is_bound(name) {
                    Err(DocshError::parse(format!("{name} is not a function"), span.start))
                } else {
                    Err(DocshError::parse(format!("Unknown constructor '{name}'"), span.start))
                }
            }
            Expr::Member(member) => {
                let base = resolve_value(&member.object, session)?;
                let args = call
                    .arguments
                    .iter()
                    .map(|arg| resolve_value(arg, session))
                    .collect::<Result<Vec<_>>>()?;
                call_method(&base, &member.property, &args)
            }
            other => Err(DocshError::parse("Expression is not callable", other.offset())),
        },
        Expr::New(new) => {
            if !literals::is_constructor(&new.constructor) {
                return Err(DocshError::parse(
                    format!("Unknown constructor '{}'", new.constructor),
                    new.span.start,
                ));
            }
            let args = constructor_args(&new.arguments, session)?;
            literals::construct(&new.constructor, &args, true)
        }
        Expr::Unary(unary) => {
            if let Some(text) = expr.number_text() {
                return number_value(&text, unary.span.start);
            }
            let value = resolve_value(&unary.argument, session)?;
            match unary.operator {
                UnaryOperator::Plus => numeric(value, unary.span.start),
                UnaryOperator::Minus => negate(value, unary.span.start),
            }
        }
    }
}

fn constructor_args(arguments: &[Expr], session: &SessionContext) -> Result<Vec<CtorArg>> {
    arguments
        .iter()
        .map(|arg| {
            Ok(CtorArg {
                value: resolve_value(arg, session)?,
                literal: arg.number_text(),
            })
        })
        .collect()
}

/// Integer literals that fit `i64` are `Int`; everything else is `Double`.
fn number_value(raw: &str, offset: usize) -> Result<Value> {
    let digits = raw.strip_prefix(['-', '+']).unwrap_or(raw);
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(n) = raw.parse::<i64>() {
            return Ok(Value::Int(n));
        }
    }
    raw.parse::<f64>()
        .map(Value::Double)
        .map_err(|_| DocshError::parse(format!("Invalid number '{raw}'"), offset))
}

fn numeric(value: Value, offset: usize) -> Result<Value> {
    match value {
        Value::Int(_) | Value::Double(_) | Value::Long(_) | Value::Decimal(_) => Ok(value),
        other => Err(DocshError::parse(
            format!("Unary operator requires a number, got {}", other.type_name()),
            offset,
        )),
    }
}

fn negate(value: Value, offset: usize) -> Result<Value> {
    match value {
        Value::Int(n) => Ok(n
            .checked_neg()
            .map(Value::Int)
            .unwrap_or(Value::Double(-(n as f64)))),
        Value::Double(f) => Ok(Value::Double(-f)),
        Value::Long(n) => n
            .checked_neg()
            .map(Value::Long)
            .ok_or_else(|| ValueError::out_of_range("NumberLong", format!("-({n})")).into()),
        Value::Decimal(d) => Ok(Value::Decimal(-d)),
        other => numeric(other, offset),
    }
}

/// Field access on a resolved value; missing fields read as null.
fn member_value(base: &Value, property: &str) -> Value {
    match (base, property) {
        (Value::Document(doc), _) => doc.get(property).cloned().unwrap_or(Value::Null),
        (Value::Array(items), "length") => Value::Int(items.len() as i64),
        (Value::String(s), "length") => Value::Int(s.chars().count() as i64),
        (Value::Array(items), index) => index
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i).cloned())
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}
