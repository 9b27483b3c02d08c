//! Number scanning for the cell-language lexer
//!
//! Handles integer and floating-point literals, including `_` digit separators and a leading-dot form (`.5`).

use super::Lexer;
use super::tokens::TokenKind;
use crate::ast::Span;
use crate::diagnostics::SyntaxError;

impl<'a> Lexer<'a> {
    pub(super) fn scan_number(&mut self, start: usize, first: char) {
        let mut value = String::new();
        let mut is_float = false;

        if first == '.' {
            is_float = true;
            value.push_str("0.");
            self.scan_digits(&mut value);
        } else {
            value.push(first);
            self.scan_digits(&mut value);

            // Decimal part; `1.x` stays an attribute access
            if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                value.push('.');
                self.advance();
                self.scan_digits(&mut value);
            }
        }

        if matches!(self.peek(), Some('e') | Some('E')) {
            is_float = true;
            value.push('e');
            self.advance();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                value.push(sign);
                self.advance();
            }
            self.scan_digits(&mut value);
        }

        if is_float {
            match value.parse::<f64>() {
                Ok(f) => self.add_token(TokenKind::Float(f), start),
                Err(_) => {
                    self.errors.push(SyntaxError::new(
                        format!("Invalid float literal: {}", value),
                        Span::new(start, self.current_pos),
                    ));
                }
            }
        } else {
            match value.parse::<i64>() {
                Ok(i) => self.add_token(TokenKind::Int(i), start),
                Err(_) => {
                    self.errors.push(SyntaxError::new(
                        format!("Invalid integer literal: {}", value),
                        Span::new(start, self.current_pos),
                    ));
                }
            }
        }
    }

    fn scan_digits(&mut self, value: &mut String) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                if c != '_' {
                    value.push(c);
                }
                self.advance();
            } else {
                break;
            }
        }
    }
}
