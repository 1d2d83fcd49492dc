//! Color output support for terminal formatting
//!
//! Applies terminal styles to the pieces of shell output (strings, numbers,
//! type wrappers, errors). When disabled every method returns the text
//! unchanged.

use nu_ansi_term::{Color, Style};

/// Color scheme for output highlighting
#[derive(Debug, Clone, Copy)]
pub struct Colorizer {
    /// Enable colors
    enabled: bool,
}

impl Colorizer {
    /// Create a new colorizer
    ///
    /// # Arguments
    /// * `enabled` - Enable color output
    ///
    /// # Returns
    /// * `Self` - New colorizer
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn paint(&self, style: Style, text: &str) -> String {
        if self.enabled {
            style.paint(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// String value (green)
    pub fn string(&self, text: &str) -> String {
        self.paint(Color::Green.normal(), text)
    }

    /// Numeric value (yellow)
    pub fn number(&self, text: &str) -> String {
        self.paint(Color::Yellow.normal(), text)
    }

    /// `true`, `false` and `null` (bold)
    pub fn keyword(&self, text: &str) -> String {
        self.paint(Style::new().bold(), text)
    }

    /// Date value (magenta)
    pub fn date(&self, text: &str) -> String {
        self.paint(Color::Magenta.normal(), text)
    }

    /// Regular expression literal (red)
    pub fn regex(&self, text: &str) -> String {
        self.paint(Color::Red.normal(), text)
    }

    /// Type wrapper such as `ObjectId('...')`; the wrapper name is cyan.
    ///
    /// # Arguments
    /// * `name` - Wrapper name
    /// * `inner` - Already rendered argument text
    pub fn wrapper(&self, name: &str, inner: &str) -> String {
        format!("{}({})", self.paint(Color::Cyan.normal(), name), inner)
    }

    /// Error message (bold red)
    pub fn error(&self, text: &str) -> String {
        self.paint(Color::Red.bold(), text)
    }
}

/// Printable width of text that may contain ANSI escape sequences.
pub fn visible_width(text: &str) -> usize {
    let mut width = 0;
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            for c in chars.by_ref() {
                if c.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            width += 1;
        }
    }
    width
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colorizer_no_colors() {
        let colorizer = Colorizer::new(false);
        assert_eq!(colorizer.error("ParseError: boom"), "ParseError: boom");
        assert_eq!(colorizer.wrapper("Long", "'5'"), "Long('5')");
    }

    #[test]
    fn test_colorizer_with_colors() {
        let colorizer = Colorizer::new(true);
        let painted = colorizer.string("'abc'");
        assert!(painted.contains("\x1b["));
        assert_eq!(visible_width(&painted), 5);
    }

    #[test]
    fn test_visible_width_plain() {
        assert_eq!(visible_width("{ a: 1 }"), 8);
    }
}
