//! Line continuation policy
//!
//! Input arrives line by line. A statement ends at a `;` or at the end of a
//! line once bracket depth is back to zero and no string is open. Brackets,
//! quotes and `;` inside strings, `//` comments and regex literals do not
//! count. The buffer never fails: text it cannot balance just keeps waiting.

use super::lexer::skip_regex;

/// Accumulates lines until they form complete statements.
#[derive(Debug, Default, Clone)]
pub struct StatementBuffer {
    pending: String,
}

impl StatementBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a line of input.
    ///
    /// # Returns
    /// * `Vec<String>` - Statements completed by this line, in order
    pub fn push_line(&mut self, line: &str) -> Vec<String> {
        self.pending.push_str(line);
        self.pending.push('\n');

        let scan = Scan::run(&self.pending);
        self.pending = self.pending[scan.rest_start..].to_string();
        if self.pending.trim().is_empty() {
            self.pending.clear();
        }
        scan.statements
    }

    /// Whether part of a statement is waiting for more lines.
    pub fn is_pending(&self) -> bool {
        !self.pending.trim().is_empty()
    }

    /// Take whatever is left at end of input.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        let rest = rest.trim();
        (!rest.is_empty()).then(|| rest.to_string())
    }
}

/// Whether `text` is balanced and has no open string.
pub fn is_complete(text: &str) -> bool {
    let scan = Scan::run(text);
    scan.depth <= 0 && !scan.in_string
}

/// Split text into statements at top-level `;` and line ends.
///
/// Unfinished trailing text is returned as the last element.
pub fn split_statements(text: &str) -> Vec<String> {
    let mut source = text.to_string();
    source.push('\n');
    let scan = Scan::run(&source);
    let mut statements = scan.statements;
    let rest = source[scan.rest_start..].trim();
    if !rest.is_empty() {
        statements.push(rest.to_string());
    }
    statements
}

/// Result of scanning text for statement boundaries.
struct Scan {
    statements: Vec<String>,
    /// Byte offset of text not yet part of a complete statement
    rest_start: usize,
    depth: i32,
    in_string: bool,
}

impl Scan {
    fn run(text: &str) -> Self {
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let plain: Vec<char> = chars.iter().map(|(_, c)| *c).collect();
        let byte_at = |i: usize| chars.get(i).map(|(b, _)| *b).unwrap_or(text.len());

        let mut scan = Scan {
            statements: Vec::new(),
            rest_start: 0,
            depth: 0,
            in_string: false,
        };
        let mut segment_start = 0;
        let mut quote: Option<char> = None;
        let mut i = 0;

        while i < plain.len() {
            let ch = plain[i];

            if let Some(q) = quote {
                match ch {
                    '\\' => i += 1,
                    c if c == q => quote = None,
                    _ => {}
                }
                i += 1;
                continue;
            }

            match ch {
                '"' | '\'' => quote = Some(ch),
                '/' if plain.get(i + 1) == Some(&'/') => {
                    while i + 1 < plain.len() && plain[i + 1] != '\n' {
                        i += 1;
                    }
                }
                '/' => {
                    let (end, _) = skip_regex(&plain, i);
                    i = end;
                    continue;
                }
                '(' | '{' | '[' => scan.depth += 1,
                ')' | '}' | ']' => scan.depth -= 1,
                ';' | '\n' if scan.depth <= 0 => {
                    let statement = text[byte_at(segment_start)..byte_at(i)].trim();
                    if !statement.is_empty() && !is_only_comment(statement) {
                        scan.statements.push(statement.to_string());
                    }
                    segment_start = i + 1;
                    scan.depth = 0;
                }
                _ => {}
            }
            i += 1;
        }

        scan.in_string = quote.is_some();
        scan.rest_start = byte_at(segment_start);
        scan
    }
}

fn is_only_comment(statement: &str) -> bool {
    statement
        .lines()
        .all(|line| line.trim().is_empty() || line.trim_start().starts_with("//"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_statements() {
        let mut buffer = StatementBuffer::new();
        assert_eq!(buffer.push_line("show dbs"), vec!["show dbs"]);
        assert_eq!(
            buffer.push_line("db.getCollectionNames(); db.printCollectionStats()"),
            vec!["db.getCollectionNames()", "db.printCollectionStats()"]
        );
        assert!(!buffer.is_pending());
    }

    #[test]
    fn test_multi_line_insert_many() {
        let mut buffer = StatementBuffer::new();
        assert!(buffer.push_line("db.inventory.insertMany([").is_empty());
        assert!(
            buffer
                .push_line("    // the server adds _id with an ObjectId when it is missing")
                .is_empty()
        );
        assert!(buffer.push_line("    { item: \"journal\", qty: 25,").is_empty());
        assert!(buffer.push_line("        tags: [ \"blank\", \"red\" ] },").is_empty());
        assert!(buffer.is_pending());

        let done = buffer.push_line("]);");
        assert_eq!(done.len(), 1);
        assert!(done[0].starts_with("db.inventory.insertMany(["));
        assert!(done[0].ends_with("])"));
        assert!(!buffer.is_pending());
    }

    #[test]
    fn test_unbalanced_never_completes() {
        let mut buffer = StatementBuffer::new();
        assert!(buffer.push_line("db.foo.insert({ a: [1, 2 }").is_empty());
        assert!(buffer.push_line("").is_empty());
        assert!(buffer.is_pending());
        assert_eq!(buffer.finish().as_deref(), Some("db.foo.insert({ a: [1, 2 }"));
        assert!(buffer.finish().is_none());
    }

    #[test]
    fn test_brackets_in_strings_and_regex() {
        let mut buffer = StatementBuffer::new();
        assert_eq!(
            buffer.push_line(r#"db.t.find({ a: "{(;", b: /[)}]/ })"#),
            vec![r#"db.t.find({ a: "{(;", b: /[)}]/ })"#]
        );
    }

    #[test]
    fn test_open_string_waits() {
        let mut buffer = StatementBuffer::new();
        assert!(buffer.push_line("var s = 'abc").is_empty());
        assert_eq!(buffer.push_line("def'"), vec!["var s = 'abc\ndef'"]);
    }

    #[test]
    fn test_comment_lines_are_skipped() {
        let mut buffer = StatementBuffer::new();
        assert!(buffer.push_line("// a comment (with paren").is_empty());
        assert!(!buffer.is_pending());
    }

    #[test]
    fn test_is_complete_and_split() {
        assert!(is_complete("db.users.find({})"));
        assert!(!is_complete("db.users.find({"));
        assert!(!is_complete(r#"db.users.find({name: "test)"#));
        assert!(is_complete(r#"db.users.find({name: "test\"quote"})"#));
        assert_eq!(
            split_statements("use a; db.x.find(\n{})\nshow dbs"),
            vec!["use a", "db.x.find(\n{})", "show dbs"]
        );
    }
}
