//! Syntax diagnostics for the cell language.
//!
//! Lexer and parser collect [`SyntaxError`]s in bulk; [`render`] turns one into a caret-annotated excerpt.

use crate::ast::Span;

/// A lexing or parsing error with location information.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub hints: Vec<String>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            notes: Vec::new(),
            hints: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }
}

impl miette::Diagnostic for SyntaxError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        Some(Box::new("cellbook::syntax"))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        if self.hints.is_empty() {
            None
        } else {
            Some(Box::new(self.hints.join("\n")))
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        let len = self.span.end.saturating_sub(self.span.start);
        Some(Box::new(std::iter::once(miette::LabeledSpan::at(
            self.span.start..self.span.start + len,
            "here",
        ))))
    }
}

/// Render an error against its source as a plain-text excerpt.
///
/// ```text
/// syntax error: Expected expression, found Newline
///   --> cell[2]:1:5
///    |
///  1 | x =
///    |     ^
/// ```
pub fn render(source_name: &str, source: &str, error: &SyntaxError) -> String {
    let (line_num, col_num, line_text) = line_info(source, error.span.start);
    let width = line_num.to_string().len();

    let underline_len = if error.span.end > error.span.start {
        let remaining = line_text.len().saturating_sub(col_num - 1);
        (error.span.end - error.span.start).min(remaining).max(1)
    } else {
        1
    };

    let mut out = String::new();
    out.push_str(&format!("syntax error: {}\n", error.message));
    out.push_str(&format!("  --> {}:{}:{}\n", source_name, line_num, col_num));
    out.push_str(&format!("  {:>width$} |\n", "", width = width));
    out.push_str(&format!("  {:>width$} | {}\n", line_num, line_text, width = width));
    out.push_str(&format!(
        "  {:>width$} | {}{}\n",
        "",
        " ".repeat(col_num - 1),
        "^".repeat(underline_len),
        width = width
    ));
    for note in &error.notes {
        out.push_str(&format!("  = note: {}\n", note));
    }
    for hint in &error.hints {
        out.push_str(&format!("  = hint: {}\n", hint));
    }
    out
}

/// Get line number, column number, and line text for a byte offset
pub fn line_info(source: &str, offset: usize) -> (usize, usize, &str) {
    let offset = offset.min(source.len());
    let mut line_num = 1;
    let mut line_start = 0;

    for (i, c) in source.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line_num += 1;
            line_start = i + 1;
        }
    }

    let line_end = source[line_start..]
        .find('\n')
        .map(|i| line_start + i)
        .unwrap_or(source.len());

    let line_text = &source[line_start..line_end];
    let col_num = offset - line_start + 1;

    (line_num, col_num, line_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_info_second_line() {
        let (line, col, text) = line_info("a = 1\nb = ?\n", 10);
        assert_eq!(line, 2);
        assert_eq!(col, 5);
        assert_eq!(text, "b = ?");
    }

    #[test]
    fn test_render_points_at_column() {
        let err = SyntaxError::new("Unexpected character '?'", Span::new(10, 11)).with_hint("remove it");
        insta::assert_snapshot!(render("cell[0]", "a = 1\nb = ?\n", &err), @r"
        syntax error: Unexpected character '?'
          --> cell[0]:2:5
            |
          2 | b = ?
            |     ^
          = hint: remove it
        ");
    }

    #[test]
    fn test_render_at_end_of_source() {
        let err = SyntaxError::new("Expected expression", Span::new(3, 3));
        let out = render("frag", "x =", &err);
        assert!(out.contains("frag:1:4"));
        assert!(out.contains("   ^"));
    }
}
