//! Statement tokenizer
//!
//! Turns one statement of shell syntax into a token stream terminated by
//! [`TokenKind::Eof`]. Unlike a completion lexer this one is strict: an
//! unknown character, an unclosed literal or a bad escape is a [`LexError`].
//!
//! Offsets and spans are char indices into the statement text.

use std::ops::Range;

use crate::error::LexError;

/// Reserved words of the console grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Use,
    Show,
    Exit,
    Quit,
    Var,
    New,
    True,
    False,
    Null,
    Undefined,
}

impl Keyword {
    fn from_ident(ident: &str) -> Option<Self> {
        let keyword = match ident {
            "use" => Keyword::Use,
            "show" => Keyword::Show,
            "exit" => Keyword::Exit,
            "quit" => Keyword::Quit,
            "var" => Keyword::Var,
            "new" => Keyword::New,
            "true" => Keyword::True,
            "false" => Keyword::False,
            "null" => Keyword::Null,
            "undefined" => Keyword::Undefined,
            _ => return None,
        };
        Some(keyword)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Use => "use",
            Keyword::Show => "show",
            Keyword::Exit => "exit",
            Keyword::Quit => "quit",
            Keyword::Var => "var",
            Keyword::New => "new",
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::Null => "null",
            Keyword::Undefined => "undefined",
        }
    }
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Keyword(Keyword),
    /// String literal with escapes decoded
    String(String),
    /// Number literal, raw text
    Number(String),
    Regex {
        pattern: String,
        flags: String,
    },
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Comma,
    Semicolon,
    Dot,
    Equals,
    Minus,
    Plus,
    Eof,
}

/// Token with its raw source text and position
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Range<usize>,
}

impl Token {
    pub fn offset(&self) -> usize {
        self.span.start
    }

    /// Identifier or keyword spelling, used where keywords act as names.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(name) => Some(name),
            TokenKind::Keyword(keyword) => Some(keyword.as_str()),
            _ => None,
        }
    }
}

/// Tokenize a statement.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(input).run()
}

/// Remove `//` line comments, leaving string and regex literals intact.
pub fn strip_comments(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            '"' | '\'' => {
                let end = skip_quoted(&chars, i);
                out.extend(&chars[i..end]);
                i = end;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' => {
                let (end, _) = skip_regex(&chars, i);
                out.extend(&chars[i..end]);
                i = end;
            }
            _ => {
                out.push(ch);
                i += 1;
            }
        }
    }

    out
}

/// Index just past a quoted literal starting at `start`, or the end of input.
pub(crate) fn skip_quoted(chars: &[char], start: usize) -> usize {
    let quote = chars[start];
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

/// Index just past a regex literal starting at `start`, and whether it closed.
///
/// Stops at a newline so that a stray `/` cannot swallow following lines.
pub(crate) fn skip_regex(chars: &[char], start: usize) -> (usize, bool) {
    let mut i = start + 1;
    let mut in_class = false;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '\n' => return (i, false),
            '[' => {
                in_class = true;
                i += 1;
            }
            ']' => {
                in_class = false;
                i += 1;
            }
            '/' if !in_class => return (i + 1, true),
            _ => i += 1,
        }
    }
    (chars.len(), false)
}

struct Lexer {
    input: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();

        let start = self.pos;
        if self.is_at_end() {
            return Ok(self.token(TokenKind::Eof, start));
        }

        let ch = self.current_char();
        let kind = match ch {
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '{' => self.single(TokenKind::LBrace),
            '}' => self.single(TokenKind::RBrace),
            '[' => self.single(TokenKind::LBracket),
            ']' => self.single(TokenKind::RBracket),
            ':' => self.single(TokenKind::Colon),
            ',' => self.single(TokenKind::Comma),
            ';' => self.single(TokenKind::Semicolon),
            '.' => self.single(TokenKind::Dot),
            '=' => self.single(TokenKind::Equals),
            '-' => self.single(TokenKind::Minus),
            '+' => self.single(TokenKind::Plus),
            '"' | '\'' => self.scan_string(ch)?,
            '/' => self.scan_regex()?,
            '0'..='9' => self.scan_number(),
            c if c.is_ascii_alphabetic() || c == '_' || c == '$' => self.scan_identifier(),
            _ => return Err(LexError::UnexpectedChar { ch, offset: start }),
        };

        Ok(self.token(kind, start))
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token {
            kind,
            text: self.input[start..self.pos].iter().collect(),
            span: start..self.pos,
        }
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn scan_string(&mut self, quote: char) -> Result<TokenKind, LexError> {
        let start = self.pos;
        self.advance();

        let mut value = String::new();
        loop {
            if self.is_at_end() {
                return Err(LexError::UnterminatedString { offset: start });
            }
            let ch = self.current_char();
            self.advance();
            if ch == quote {
                return Ok(TokenKind::String(value));
            }
            if ch == '\\' {
                self.scan_escape(&mut value, start)?;
            } else {
                value.push(ch);
            }
        }
    }

    /// Decode one escape; the backslash is already consumed.
    fn scan_escape(&mut self, value: &mut String, string_start: usize) -> Result<(), LexError> {
        let offset = self.pos - 1;
        if self.is_at_end() {
            return Err(LexError::UnterminatedString {
                offset: string_start,
            });
        }

        let ch = self.current_char();
        self.advance();
        match ch {
            'n' => value.push('\n'),
            't' => value.push('\t'),
            'r' => value.push('\r'),
            'b' => value.push('\u{8}'),
            'f' => value.push('\u{c}'),
            'v' => value.push('\u{b}'),
            '0' => value.push('\0'),
            '\\' | '\'' | '"' | '/' => value.push(ch),
            '\n' => {}
            'x' => {
                let code = self.scan_hex(2, offset)?;
                value.push(self.code_point(code, offset)?);
            }
            'u' => {
                let code = self.scan_hex(4, offset)?;
                if (0xD800..0xDC00).contains(&code) {
                    let low = self.scan_low_surrogate(offset)?;
                    let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                    value.push(self.code_point(combined, offset)?);
                } else {
                    value.push(self.code_point(code, offset)?);
                }
            }
            other => {
                return Err(LexError::InvalidEscape {
                    sequence: format!("\\{other}"),
                    offset,
                });
            }
        }
        Ok(())
    }

    fn scan_hex(&mut self, digits: usize, offset: usize) -> Result<u32, LexError> {
        let end = (self.pos + digits).min(self.input.len());
        let text: String = self.input[self.pos..end].iter().collect();
        if text.len() != digits || !text.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(LexError::InvalidEscape {
                sequence: self.input[offset..end].iter().collect(),
                offset,
            });
        }
        self.pos = end;
        u32::from_str_radix(&text, 16).map_err(|_| LexError::InvalidEscape {
            sequence: text.clone(),
            offset,
        })
    }

    fn scan_low_surrogate(&mut self, offset: usize) -> Result<u32, LexError> {
        if self.current_char() == '\\' && self.peek_char() == 'u' {
            self.advance();
            self.advance();
            let low = self.scan_hex(4, offset)?;
            if (0xDC00..0xE000).contains(&low) {
                return Ok(low);
            }
        }
        Err(LexError::InvalidEscape {
            sequence: self.input[offset..self.pos].iter().collect(),
            offset,
        })
    }

    fn code_point(&self, code: u32, offset: usize) -> Result<char, LexError> {
        char::from_u32(code).ok_or_else(|| LexError::InvalidEscape {
            sequence: self.input[offset..self.pos].iter().collect(),
            offset,
        })
    }

    fn scan_regex(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        let (end, closed) = skip_regex(&self.input, start);
        if !closed || end == start + 2 {
            return Err(LexError::UnterminatedRegex { offset: start });
        }
        let pattern: String = self.input[start + 1..end - 1].iter().collect();
        self.pos = end;

        let mut flags = String::new();
        while !self.is_at_end() && self.current_char().is_ascii_alphabetic() {
            flags.push(self.current_char());
            self.advance();
        }

        Ok(TokenKind::Regex { pattern, flags })
    }

    fn scan_number(&mut self) -> TokenKind {
        let start = self.pos;
        self.consume_digits();

        if self.current_char() == '.' && self.peek_char().is_ascii_digit() {
            self.advance();
            self.consume_digits();
        }

        if matches!(self.current_char(), 'e' | 'E') {
            let sign = matches!(self.peek_char(), '+' | '-');
            let digit_at = if sign { self.pos + 2 } else { self.pos + 1 };
            if self.input.get(digit_at).is_some_and(char::is_ascii_digit) {
                self.pos = digit_at;
                self.consume_digits();
            }
        }

        TokenKind::Number(self.input[start..self.pos].iter().collect())
    }

    fn consume_digits(&mut self) {
        while !self.is_at_end() && self.current_char().is_ascii_digit() {
            self.advance();
        }
    }

    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.pos;
        while !self.is_at_end() {
            let ch = self.current_char();
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '$' {
                self.advance();
            } else {
                break;
            }
        }

        let ident: String = self.input[start..self.pos].iter().collect();
        match Keyword::from_ident(&ident) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Ident(ident),
        }
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    fn current_char(&self) -> char {
        self.input.get(self.pos).copied().unwrap_or('\0')
    }

    fn peek_char(&self) -> char {
        self.input.get(self.pos + 1).copied().unwrap_or('\0')
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_call_expression_tokens() {
        assert_eq!(
            kinds("db.inventory.find({})"),
            vec![
                TokenKind::Ident("db".into()),
                TokenKind::Dot,
                TokenKind::Ident("inventory".into()),
                TokenKind::Dot,
                TokenKind::Ident("find".into()),
                TokenKind::LParen,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords() {
        let tokens = tokenize("var a = new Timestamp()").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Keyword(Keyword::Var));
        assert_eq!(tokens[2].kind, TokenKind::Equals);
        assert_eq!(tokens[3].kind, TokenKind::Keyword(Keyword::New));
        assert_eq!(tokens[3].name(), Some("new"));
    }

    #[test]
    fn test_numbers_keep_raw_text() {
        assert_eq!(
            kinds("9223372036854775808 123.40 2.5E-2"),
            vec![
                TokenKind::Number("9223372036854775808".into()),
                TokenKind::Number("123.40".into()),
                TokenKind::Number("2.5E-2".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        let tokens = tokenize(r#"'it\'s' "a\tbé\x41""#).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String("it's".into()));
        assert_eq!(tokens[1].kind, TokenKind::String("a\tbéA".into()));
    }

    #[test]
    fn test_surrogate_pair() {
        let tokens = tokenize(r#""\ud83d\ude00""#).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String("😀".into()));
        assert!(matches!(
            tokenize(r#""\ud83d""#),
            Err(LexError::InvalidEscape { .. })
        ));
    }

    #[test]
    fn test_invalid_escape() {
        assert_eq!(
            tokenize(r#""bad \q""#),
            Err(LexError::InvalidEscape {
                sequence: "\\q".into(),
                offset: 5
            })
        );
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(
            tokenize("db.foo.find({a: 'x})"),
            Err(LexError::UnterminatedString { offset: 16 })
        );
    }

    #[test]
    fn test_regex_literal() {
        assert_eq!(
            kinds(r"/^a\/b[/]/i"),
            vec![
                TokenKind::Regex {
                    pattern: r"^a\/b[/]".into(),
                    flags: "i".into()
                },
                TokenKind::Eof,
            ]
        );
        assert_eq!(
            tokenize("/abc"),
            Err(LexError::UnterminatedRegex { offset: 0 })
        );
    }

    #[test]
    fn test_placeholder_is_unexpected() {
        assert_eq!(
            tokenize("db.createView(<view>)"),
            Err(LexError::UnexpectedChar {
                ch: '<',
                offset: 14
            })
        );
    }

    #[test]
    fn test_strip_comments() {
        let input = "[\n  // MongoDB adds the _id field\n  { url: \"http://x\" }, /a\\/\\//\n]";
        let stripped = strip_comments(input);
        assert!(!stripped.contains("MongoDB adds"));
        assert!(stripped.contains("\"http://x\""));
        assert!(stripped.contains("/a\\/\\//"));
    }

    #[test]
    fn test_spans_are_char_offsets() {
        let tokens = tokenize("'é' x").unwrap();
        assert_eq!(tokens[0].span, 0..3);
        assert_eq!(tokens[1].span, 4..5);
        assert_eq!(tokens[1].text, "x");
    }
}
