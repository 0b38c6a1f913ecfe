//! Lexer for the formula grammar, with a charset allow-list applied before
//! any tokenization as a first line of defense against injected code.

use crate::error::FormulaError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
}

/// A token paired with its byte offset in the source, for error messages.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c.is_whitespace() || "_.+-*/(),".contains(c)
}

/// Tokenize a formula. Any character outside the allow-list rejects the
/// whole input before a single token is produced.
pub fn tokenize(src: &str) -> Result<Vec<Spanned>, FormulaError> {
    if let Some((pos, bad)) = src.char_indices().find(|(_, c)| !is_allowed(*c)) {
        return Err(FormulaError::DisallowedConstruct(format!(
            "character '{}' at position {} is not allowed",
            bad.escape_default(),
            pos
        )));
    }

    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let token = match c {
            '+' => {
                chars.next();
                Token::Plus
            }
            '-' => {
                chars.next();
                Token::Minus
            }
            '*' => {
                chars.next();
                Token::Star
            }
            '/' => {
                chars.next();
                Token::Slash
            }
            '(' => {
                chars.next();
                Token::LParen
            }
            ')' => {
                chars.next();
                Token::RParen
            }
            ',' => {
                chars.next();
                Token::Comma
            }
            '0'..='9' => {
                let mut text = String::new();
                let mut seen_dot = false;
                while let Some(&(_, d)) = chars.peek() {
                    match d {
                        '0'..='9' => {
                            text.push(d);
                            chars.next();
                        }
                        '.' if !seen_dot => {
                            seen_dot = true;
                            text.push(d);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                let value: f64 = text.parse().map_err(|_| {
                    FormulaError::syntax(pos, format!("invalid number literal '{text}'"))
                })?;
                Token::Number(value)
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut text = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        text.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                Token::Ident(text)
            }
            other => {
                // Reachable only for '.' outside a number literal.
                return Err(FormulaError::syntax(
                    pos,
                    format!("unexpected character '{other}'"),
                ));
            }
        };

        tokens.push(Spanned {
            token,
            position: pos,
        });
    }

    Ok(tokens)
}
