//! Recursive descent parser for console statements
//!
//! Grammar (one statement per token stream):
//!
//! ```text
//! Statement  ::= "use" <rest of line>
//!              | "show" Name
//!              | ("exit" | "quit") ["(" ")"]
//!              | "var" Name ["=" Expr]
//!              | Expr
//! Expr       ::= ("-" | "+") Expr | Postfix
//! Postfix    ::= Primary ("." Name | "(" Args ")")*
//! Primary    ::= String | Number | Regex | true | false | null | undefined
//!              | Ident | "new" Ident ["(" Args ")"]
//!              | "{" Props "}" | "[" Args "]" | "(" Expr ")"
//! ```
//!
//! A trailing `;` is accepted. Keywords are valid as property keys and as
//! member names after `.`.

use super::ast::*;
use super::lexer::{Keyword, Token, TokenKind};
use crate::error::{DocshError, Result};

/// Deepest expression nesting accepted, matching the server's document
/// nesting limit.
pub const MAX_NESTING_DEPTH: usize = 100;

/// Parse a token stream into a statement.
pub fn parse_stmt(tokens: Vec<Token>) -> Result<Stmt> {
    let mut parser = Grammar::new(tokens);
    let stmt = parser.parse_statement()?;
    parser.expect_end()?;
    Ok(stmt)
}

struct Grammar {
    tokens: Vec<Token>,
    pos: usize,
    /// Current expression nesting
    depth: usize,
}

impl Grammar {
    fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let end = tokens.last().map(|t| t.span.end).unwrap_or(0);
            tokens.push(Token {
                kind: TokenKind::Eof,
                text: String::new(),
                span: end..end,
            });
        }
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn parse_statement(&mut self) -> Result<Stmt> {
        let kind = self.current().kind.clone();
        match kind {
            TokenKind::Keyword(Keyword::Use) => {
                self.advance();
                Ok(self.parse_use())
            }
            TokenKind::Keyword(Keyword::Show) => {
                self.advance();
                self.parse_show()
            }
            TokenKind::Keyword(Keyword::Exit) | TokenKind::Keyword(Keyword::Quit) => {
                self.advance();
                if self.match_token(&TokenKind::LParen) {
                    self.expect_token(&TokenKind::RParen, "Expected ')' after exit(")?;
                }
                Ok(Stmt::Exit)
            }
            TokenKind::Keyword(Keyword::Var) => {
                self.advance();
                self.parse_var()
            }
            TokenKind::Eof | TokenKind::Semicolon => {
                Err(DocshError::parse("Empty statement", self.current().offset()))
            }
            _ => Ok(Stmt::Expr(self.parse_expression()?)),
        }
    }

    /// `use` takes the source text of every token up to `;` or the end.
    fn parse_use(&mut self) -> Stmt {
        let start = self.current().offset();
        let mut name = String::new();
        let mut last_end: Option<usize> = None;

        while !matches!(self.current().kind, TokenKind::Eof | TokenKind::Semicolon) {
            let token = self.current();
            if last_end.is_some_and(|end| end < token.span.start) {
                name.push(' ');
            }
            name.push_str(&token.text);
            last_end = Some(token.span.end);
            self.advance();
        }

        Stmt::Use {
            name,
            span: start..last_end.unwrap_or(start),
        }
    }

    fn parse_show(&mut self) -> Result<Stmt> {
        let token = self.current().clone();
        match token.name() {
            Some(keyword) => {
                self.advance();
                Ok(Stmt::Show {
                    keyword: keyword.to_string(),
                    span: token.span,
                })
            }
            None => Err(DocshError::parse(
                "Expected a keyword after 'show'",
                token.offset(),
            )),
        }
    }

    fn parse_var(&mut self) -> Result<Stmt> {
        let name = self.expect_identifier("Expected variable name after 'var'")?;
        if !self.match_token(&TokenKind::Equals) {
            let end = self.previous_end();
            return Ok(Stmt::Var {
                name,
                value: Expr::Null { span: end..end },
            });
        }
        let value = self.parse_expression()?;
        Ok(Stmt::Var { name, value })
    }

    fn parse_expression(&mut self) -> Result<Expr> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(DocshError::parse(
                format!("Expression nesting exceeds {MAX_NESTING_DEPTH} levels"),
                self.current().offset(),
            ));
        }

        self.depth += 1;
        let expr = self.parse_nested_expression();
        self.depth -= 1;
        expr
    }

    fn parse_nested_expression(&mut self) -> Result<Expr> {
        let start = self.current().offset();

        let operator = match self.current().kind {
            TokenKind::Minus => Some(UnaryOperator::Minus),
            TokenKind::Plus => Some(UnaryOperator::Plus),
            _ => None,
        };

        if let Some(operator) = operator {
            self.advance();
            let argument = self.parse_expression()?;
            let end = self.previous_end();
            return Ok(Expr::Unary(Box::new(UnaryExpr {
                operator,
                argument,
                span: start..end,
            })));
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let base_depth = self.depth;
        let expr = self.parse_postfix_chain();
        self.depth = base_depth;
        expr
    }

    /// Each `.name` or `(args)` step counts as one nesting level.
    fn parse_postfix_chain(&mut self) -> Result<Expr> {
        let start = self.current().offset();
        let mut expr = self.parse_primary()?;

        loop {
            if self.check(&TokenKind::Dot) || self.check(&TokenKind::LParen) {
                if self.depth >= MAX_NESTING_DEPTH {
                    return Err(DocshError::parse(
                        format!("Expression nesting exceeds {MAX_NESTING_DEPTH} levels"),
                        self.current().offset(),
                    ));
                }
                self.depth += 1;
            }

            if self.match_token(&TokenKind::Dot) {
                let property = self.expect_name("Expected property name after '.'")?;
                let end = self.previous_end();
                expr = Expr::Member(Box::new(MemberExpr {
                    object: expr,
                    property,
                    span: start..end,
                }));
            } else if self.match_token(&TokenKind::LParen) {
                let arguments = self.parse_arguments(&TokenKind::RParen)?;
                self.expect_token(&TokenKind::RParen, "Expected ')' after arguments")?;
                let end = self.previous_end();
                expr = Expr::Call(Box::new(CallExpr {
                    callee: expr,
                    arguments,
                    span: start..end,
                }));
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.current().clone();

        let expr = match token.kind {
            TokenKind::String(value) => Expr::String {
                value,
                span: token.span,
            },
            TokenKind::Number(raw) => Expr::Number {
                raw,
                span: token.span,
            },
            TokenKind::Regex { pattern, flags } => Expr::Regex {
                pattern,
                flags,
                span: token.span,
            },
            TokenKind::Keyword(Keyword::True) => Expr::Boolean {
                value: true,
                span: token.span,
            },
            TokenKind::Keyword(Keyword::False) => Expr::Boolean {
                value: false,
                span: token.span,
            },
            TokenKind::Keyword(Keyword::Null) | TokenKind::Keyword(Keyword::Undefined) => {
                Expr::Null { span: token.span }
            }
            TokenKind::Keyword(Keyword::New) => {
                self.advance();
                return self.parse_new(token.offset());
            }
            TokenKind::Ident(name) if name == "Infinity" || name == "NaN" => Expr::Number {
                raw: name,
                span: token.span,
            },
            TokenKind::Ident(name) => Expr::Ident {
                name,
                span: token.span,
            },
            TokenKind::LBrace => return self.parse_document(),
            TokenKind::LBracket => return self.parse_array(),
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_token(&TokenKind::RParen, "Expected ')' after expression")?;
                return Ok(expr);
            }
            TokenKind::Eof => {
                return Err(DocshError::parse("Unexpected end of input", token.offset()));
            }
            _ => {
                return Err(DocshError::parse(
                    format!("Unexpected token '{}'", token.text),
                    token.offset(),
                ));
            }
        };

        self.advance();
        Ok(expr)
    }

    fn parse_new(&mut self, start: usize) -> Result<Expr> {
        let constructor = self.expect_identifier("Expected constructor name after 'new'")?;

        let arguments = if self.match_token(&TokenKind::LParen) {
            let args = self.parse_arguments(&TokenKind::RParen)?;
            self.expect_token(&TokenKind::RParen, "Expected ')' after arguments")?;
            args
        } else {
            vec![]
        };

        let end = self.previous_end();
        Ok(Expr::New(Box::new(NewExpr {
            constructor,
            arguments,
            span: start..end,
        })))
    }

    fn parse_document(&mut self) -> Result<Expr> {
        let start = self.current().offset();
        self.expect_token(&TokenKind::LBrace, "Expected '{'")?;

        let mut properties = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let key = self.parse_property_key()?;
            self.expect_token(&TokenKind::Colon, "Expected ':' after property key")?;
            let value = self.parse_expression()?;
            properties.push((key, value));

            if self.match_token(&TokenKind::Comma) {
                continue;
            }
            if !self.check(&TokenKind::RBrace) {
                return Err(DocshError::parse(
                    "Expected ',' or '}' after property",
                    self.current().offset(),
                ));
            }
        }

        self.expect_token(&TokenKind::RBrace, "Expected '}'")?;
        let end = self.previous_end();
        Ok(Expr::Document(DocumentExpr {
            properties,
            span: start..end,
        }))
    }

    fn parse_property_key(&mut self) -> Result<String> {
        let token = self.current().clone();
        let key = match &token.kind {
            TokenKind::String(s) => s.clone(),
            TokenKind::Number(n) => n.clone(),
            _ => match token.name() {
                Some(name) => name.to_string(),
                None => {
                    return Err(DocshError::parse(
                        "Expected property key (identifier, string, or number)",
                        token.offset(),
                    ));
                }
            },
        };
        self.advance();
        Ok(key)
    }

    fn parse_array(&mut self) -> Result<Expr> {
        let start = self.current().offset();
        self.expect_token(&TokenKind::LBracket, "Expected '['")?;
        let elements = self.parse_arguments(&TokenKind::RBracket)?;
        self.expect_token(&TokenKind::RBracket, "Expected ']' after array elements")?;
        let end = self.previous_end();
        Ok(Expr::Array(ArrayExpr {
            elements,
            span: start..end,
        }))
    }

    /// Comma-separated expressions up to `close`, trailing comma allowed.
    fn parse_arguments(&mut self, close: &TokenKind) -> Result<Vec<Expr>> {
        let mut arguments = Vec::new();

        while !self.check(close) {
            arguments.push(self.parse_expression()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        Ok(arguments)
    }

    fn expect_end(&mut self) -> Result<()> {
        self.match_token(&TokenKind::Semicolon);
        let token = self.current();
        if token.kind == TokenKind::Eof {
            Ok(())
        } else {
            Err(DocshError::parse(
                format!("Unexpected token '{}'", token.text),
                token.offset(),
            ))
        }
    }

    // Token manipulation methods

    fn current(&self) -> &Token {
        // The stream always ends with Eof and advance never passes it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn expect_token(&mut self, kind: &TokenKind, message: &str) -> Result<()> {
        if self.match_token(kind) {
            Ok(())
        } else {
            Err(DocshError::parse(message, self.current().offset()))
        }
    }

    fn expect_identifier(&mut self, message: &str) -> Result<String> {
        match &self.current().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(DocshError::parse(message, self.current().offset())),
        }
    }

    /// Identifier or keyword used as a name.
    fn expect_name(&mut self, message: &str) -> Result<String> {
        match self.current().name() {
            Some(name) => {
                let name = name.to_string();
                self.advance();
                Ok(name)
            }
            None => Err(DocshError::parse(message, self.current().offset())),
        }
    }

    fn previous_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.span.end)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::tokenize;

    fn parse(input: &str) -> Result<Stmt> {
        parse_stmt(tokenize(input).unwrap())
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("var x = {}{}", "[".repeat(5000), "]".repeat(5000));
        let err = parse(&deep).unwrap_err();
        assert!(matches!(err, DocshError::Parse(_)));
        assert!(err.to_string().contains("nesting"));

        let documents = format!("db.c.insert({}{})", "{ a: ".repeat(5000), "}".repeat(5000));
        assert!(matches!(parse(&documents), Err(DocshError::Parse(_))));

        let chain = format!("x{}", ".a".repeat(5000));
        assert!(matches!(parse(&chain), Err(DocshError::Parse(_))));

        let ok = format!("var x = {}1{}", "[".repeat(50), "]".repeat(50));
        assert!(parse(&ok).is_ok());
        assert!(parse("db.inventory.find({}).sort({ qty: -1 }).limit(1).skip(2)").is_ok());
    }

    #[test]
    fn test_use_reconstructs_name() {
        assert!(matches!(parse("use my-db;").unwrap(), Stmt::Use { name, .. } if name == "my-db"));
        assert!(matches!(
            parse("use myNewDB").unwrap(),
            Stmt::Use { name, .. } if name == "myNewDB"
        ));
        assert!(matches!(parse("use").unwrap(), Stmt::Use { name, .. } if name.is_empty()));
    }

    #[test]
    fn test_show_accepts_keyword() {
        assert!(matches!(
            parse("show dbs").unwrap(),
            Stmt::Show { keyword, .. } if keyword == "dbs"
        ));
        assert!(parse("show").is_err());
    }

    #[test]
    fn test_exit_forms() {
        assert_eq!(parse("exit").unwrap(), Stmt::Exit);
        assert_eq!(parse("quit()").unwrap(), Stmt::Exit);
    }

    #[test]
    fn test_var_statement() {
        match parse("var a = new Timestamp();").unwrap() {
            Stmt::Var {
                name,
                value: Expr::New(new),
            } => {
                assert_eq!(name, "a");
                assert_eq!(new.constructor, "Timestamp");
                assert!(new.arguments.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_call_chain_shape() {
        let stmt = parse("db.view.find().sort({$natural: 1})").unwrap();
        let Stmt::Expr(Expr::Call(sort)) = stmt else {
            panic!("expected call");
        };
        let Expr::Member(member) = &sort.callee else {
            panic!("expected member");
        };
        assert_eq!(member.property, "sort");
        assert!(matches!(member.object, Expr::Call(_)));
    }

    #[test]
    fn test_document_keys_and_trailing_commas() {
        let stmt = parse("({ use: 1, 'a b': 2, 3: [1, 2,], })").unwrap();
        let Stmt::Expr(Expr::Document(doc)) = stmt else {
            panic!("expected document");
        };
        let keys: Vec<_> = doc.properties.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["use", "a b", "3"]);
    }

    #[test]
    fn test_parse_error_offsets() {
        let err = parse("db.foo.find({a 1})").unwrap_err();
        assert_eq!(
            err.to_string(),
            "ParseError: Expected ':' after property key (at offset 15)"
        );

        let err = parse("db.foo.find() extra").unwrap_err();
        assert!(matches!(err, DocshError::Parse(ref e) if e.offset == 14));
    }

    #[test]
    fn test_unclosed_call() {
        let err = parse("db.inventory.insertMany([{a: 1}").unwrap_err();
        assert!(matches!(err, DocshError::Parse(_)));
    }
}
