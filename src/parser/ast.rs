//! Syntax tree for console statements
//!
//! The grammar produces these nodes without consulting the session. Name
//! lookup, constructor evaluation and extended-JSON wrappers are applied
//! afterwards by the resolver, which turns them into [`crate::parser::Statement`].

use std::ops::Range;

/// Span information for source locations
pub type Span = Range<usize>;

/// Statement as written
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `use <name>`; the name is the source text following the keyword
    Use { name: String, span: Span },
    /// `show <keyword>`
    Show { keyword: String, span: Span },
    /// `exit` or `quit`
    Exit,
    /// `var <name> = <expr>`
    Var { name: String, value: Expr },
    /// Any other expression
    Expr(Expr),
}

/// Expression node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `{ key: value, ... }`
    Document(DocumentExpr),
    /// `[a, b, c]`
    Array(ArrayExpr),
    String { value: String, span: Span },
    /// Number literal with its raw text (`Infinity` and `NaN` included)
    Number { raw: String, span: Span },
    Boolean { value: bool, span: Span },
    /// `null` or `undefined`
    Null { span: Span },
    Regex {
        pattern: String,
        flags: String,
        span: Span,
    },
    Ident { name: String, span: Span },
    /// `object.property`
    Member(Box<MemberExpr>),
    /// `callee(args)`
    Call(Box<CallExpr>),
    /// `new Ctor(args)`
    New(Box<NewExpr>),
    /// `-x` or `+x`
    Unary(Box<UnaryExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentExpr {
    pub properties: Vec<(String, Expr)>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayExpr {
    pub elements: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpr {
    pub object: Expr,
    pub property: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub callee: Expr,
    pub arguments: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewExpr {
    pub constructor: String,
    pub arguments: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Minus,
    Plus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub operator: UnaryOperator,
    pub argument: Expr,
    pub span: Span,
}

impl Expr {
    /// Start offset of the expression, used for error reporting.
    pub fn offset(&self) -> usize {
        match self {
            Expr::Document(doc) => doc.span.start,
            Expr::Array(arr) => arr.span.start,
            Expr::String { span, .. }
            | Expr::Number { span, .. }
            | Expr::Boolean { span, .. }
            | Expr::Null { span }
            | Expr::Regex { span, .. }
            | Expr::Ident { span, .. } => span.start,
            Expr::Member(member) => member.span.start,
            Expr::Call(call) => call.span.start,
            Expr::New(new) => new.span.start,
            Expr::Unary(unary) => unary.span.start,
        }
    }

    /// Signed raw text when the expression is a number literal.
    pub fn number_text(&self) -> Option<String> {
        match self {
            Expr::Number { raw, .. } => Some(raw.clone()),
            Expr::Unary(unary) => {
                let inner = unary.argument.number_text()?;
                match unary.operator {
                    UnaryOperator::Plus => Some(inner),
                    UnaryOperator::Minus => match inner.strip_prefix('-') {
                        Some(positive) => Some(positive.to_string()),
                        None => Some(format!("-{inner}")),
                    },
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(raw: &str) -> Expr {
        Expr::Number {
            raw: raw.to_string(),
            span: 0..raw.len(),
        }
    }

    #[test]
    fn test_number_text_applies_sign() {
        let negated = Expr::Unary(Box::new(UnaryExpr {
            operator: UnaryOperator::Minus,
            argument: number("9223372036854775808"),
            span: 0..20,
        }));
        assert_eq!(negated.number_text().as_deref(), Some("-9223372036854775808"));

        let double_negated = Expr::Unary(Box::new(UnaryExpr {
            operator: UnaryOperator::Minus,
            argument: negated,
            span: 0..21,
        }));
        assert_eq!(double_negated.number_text().as_deref(), Some("9223372036854775808"));
        assert_eq!(Expr::String { value: "1".into(), span: 0..3 }.number_text(), None);
    }
}
