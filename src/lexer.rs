use std::{error::Error, fmt::Display, str::CharIndices};

use itertools::{peek_nth, PeekNth};
use nom::{bytes::complete::take_while1, IResult};

use crate::{
    token::{Token, TokenKind},
    utils::render_diagnostic,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexErrorKind {
    Memory,
    InvalidChar,
    InvalidEscape,
    UnexpectedEnd,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    kind: LexErrorKind,
    message: &'static str,
    input: String,
    position: usize,
}

impl LexError {
    pub fn new(kind: LexErrorKind, message: &'static str, input: &str, position: usize) -> Self {
        LexError {
            kind,
            message,
            input: String::from(input),
            position,
        }
    }

    pub fn kind(&self) -> LexErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        self.message
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

impl Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            render_diagnostic("lexing", self.message, &self.input, self.position)
        )
    }
}

impl Error for LexError {}

fn escape_payload(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric())(input)
}

struct Lexer<'a> {
    pattern: &'a str,
    chars: PeekNth<CharIndices<'a>>,
    tokens: Vec<Token>,
    open_parens: usize,
}

impl<'a> Lexer<'a> {
    fn new(pattern: &'a str) -> Result<Lexer<'a>, LexError> {
        // every token consumes at least one byte, plus the trailing End
        let mut tokens = Vec::new();
        if tokens.try_reserve(pattern.len() + 1).is_err() {
            return Err(LexError::new(
                LexErrorKind::Memory,
                "memory allocation failed",
                pattern,
                0,
            ));
        }
        Ok(Lexer {
            pattern,
            chars: peek_nth(pattern.char_indices()),
            tokens,
            open_parens: 0,
        })
    }

    fn error(&self, kind: LexErrorKind, message: &'static str, position: usize) -> LexError {
        LexError::new(kind, message, self.pattern, position)
    }

    fn last_kind(&self) -> Option<TokenKind> {
        self.tokens.last().map(|token| token.kind())
    }

    fn advance_by(&mut self, by: usize) {
        if by > 0 {
            self.chars.nth(by - 1);
        }
    }

    fn push(&mut self, kind: TokenKind, c: char, position: usize) {
        self.tokens.push(Token::single(kind, c, position));
    }

    fn lex_union(&mut self, position: usize) -> Result<(), LexError> {
        let missing_left = matches!(
            self.last_kind(),
            None | Some(TokenKind::Union) | Some(TokenKind::LParen)
        );
        let missing_right = matches!(self.chars.peek(), None | Some((_, ')')));
        if missing_left || missing_right {
            return Err(self.error(
                LexErrorKind::InvalidChar,
                "invalid alternation operator '|'",
                position,
            ));
        }
        self.push(TokenKind::Union, '|', position);
        Ok(())
    }

    fn lex_escape(&mut self, position: usize) -> Result<(), LexError> {
        let pattern = self.pattern;
        let rest = &pattern[position + 1..];
        if rest.is_empty() {
            return Err(self.error(
                LexErrorKind::InvalidEscape,
                "invalid escape sequence: pattern ends with '\\'",
                position,
            ));
        }
        match escape_payload(rest) {
            Ok((_, payload)) => {
                self.tokens
                    .push(Token::multi(TokenKind::Escape, payload, position));
                // the payload is ASCII, so bytes and chars agree
                self.advance_by(payload.len());
                Ok(())
            }
            Err(_) => Err(self.error(
                LexErrorKind::InvalidEscape,
                "invalid escape sequence",
                position,
            )),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        while let Some((position, c)) = self.chars.next() {
            match c {
                c if c.is_ascii_alphanumeric() => self.push(TokenKind::Literal, c, position),
                '*' => self.push(TokenKind::Star, c, position),
                '+' => self.push(TokenKind::Plus, c, position),
                '?' => self.push(TokenKind::Question, c, position),
                '(' => {
                    self.push(TokenKind::LParen, c, position);
                    self.open_parens += 1;
                }
                ')' => {
                    if self.open_parens == 0 {
                        return Err(self.error(
                            LexErrorKind::InvalidChar,
                            "unmatched closing parenthesis",
                            position,
                        ));
                    }
                    self.push(TokenKind::RParen, c, position);
                    self.open_parens -= 1;
                }
                '|' => self.lex_union(position)?,
                '\\' => self.lex_escape(position)?,
                _ => {
                    return Err(self.error(
                        LexErrorKind::InvalidChar,
                        "invalid character in pattern",
                        position,
                    ))
                }
            }
        }

        if self.open_parens > 0 {
            return Err(self.error(
                LexErrorKind::UnexpectedEnd,
                "unmatched opening parenthesis",
                self.pattern.len(),
            ));
        }

        let end = self.pattern.len();
        self.tokens.push(Token::synthetic(TokenKind::End, end));
        Ok(self.tokens)
    }
}

/// Splits `pattern` into tokens terminated by a single `End` token. The first
/// fault aborts the scan; no partial token list is ever returned.
pub fn tokenize(pattern: &str) -> Result<Vec<Token>, LexError> {
    if pattern.is_empty() {
        return Err(LexError::new(
            LexErrorKind::Unknown,
            "invalid input: empty pattern",
            pattern,
            0,
        ));
    }
    Lexer::new(pattern)?.run()
}
