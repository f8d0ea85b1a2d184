//! Expression lexer.
//!
//! Converts source text into a flat token stream terminated by an `Eof`
//! token. The first error aborts tokenization; there is no recovery.

use crate::domain::error::LexError;
use crate::domain::token::{keyword_kind, Token, TokenKind};

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            tokens: Vec::new(),
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.remaining().chars().nth(1)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            text: self.input[start..self.pos].to_string(),
            offset: start,
            line: self.line,
        });
    }

    fn single(&mut self, kind: TokenKind) {
        let start = self.pos;
        self.advance();
        self.push(kind, start);
    }

    fn lex_number(&mut self) {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.advance();
        }
        let mut has_dot = false;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                self.advance();
            } else if ch == '.'
                && !has_dot
                && self.peek_second().is_some_and(|c| c.is_ascii_digit())
            {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }
        self.push(TokenKind::Number, start);
    }

    fn lex_identifier(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let word = &self.input[start..self.pos];
        match keyword_kind(word) {
            Some(kind) => {
                self.push(kind, start);
                Ok(())
            }
            None => Err(LexError {
                message: format!("unknown identifier '{}'", word),
                position: start,
            }),
        }
    }

    fn lex_comparison(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        let first = self.advance();
        match first {
            Some('>') | Some('<') => {
                if self.peek() == Some('=') {
                    self.advance();
                }
            }
            Some('=') => {
                if self.peek() == Some('=') {
                    self.advance();
                } else {
                    return Err(LexError {
                        message: "expected '==', found '='".to_string(),
                        position: start,
                    });
                }
            }
            _ => unreachable!("lex_comparison called on non-comparison character"),
        }
        self.push(TokenKind::Operator, start);
        Ok(())
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        while let Some(ch) = self.peek() {
            match ch {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '\n' => {
                    self.advance();
                    self.line += 1;
                }
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                ',' => self.single(TokenKind::Comma),
                '.' => self.single(TokenKind::Dot),
                '[' => self.single(TokenKind::LBracket),
                ']' => self.single(TokenKind::RBracket),
                '*' => self.single(TokenKind::Star),
                '/' => self.single(TokenKind::Slash),
                '+' => self.single(TokenKind::Plus),
                '-' => {
                    if self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
                        self.lex_number();
                    } else {
                        self.single(TokenKind::Minus);
                    }
                }
                '>' | '<' | '=' => self.lex_comparison()?,
                c if c.is_ascii_digit() => self.lex_number(),
                c if c.is_ascii_alphabetic() || c == '_' => self.lex_identifier()?,
                other => {
                    return Err(LexError {
                        message: format!("unexpected character '{}'", other),
                        position: self.pos,
                    });
                }
            }
        }
        let end = self.input.len();
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            text: String::new(),
            offset: end,
            line: self.line,
        });
        Ok(self.tokens)
    }
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(input).run()
}
