use colored::Colorize;
use log::trace;
use std::{error::Error, fmt::Display};

use crate::{
    token::{Token, TokenKind},
    utils::render_diagnostic,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    UnmatchedParenthesis,
    CapacityExceeded,
    UnexpectedToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    kind: ParseErrorKind,
    message: &'static str,
    position: usize,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, message: &'static str, position: usize) -> Self {
        ParseError {
            kind,
            message,
            position,
        }
    }

    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        self.message
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn render(&self, input: &str) -> String {
        render_diagnostic("parsing", self.message, input, self.position)
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} at offset {}",
            "parsing error:".red().bold(),
            self.message,
            self.position
        )
    }
}

impl Error for ParseError {}

#[derive(Debug)]
struct Parser {
    output: Vec<Token>,
    operators: Vec<Token>,
    capacity: usize,
}

impl Parser {
    fn new(capacity: usize) -> Parser {
        Parser {
            output: Vec::with_capacity(capacity),
            operators: Vec::with_capacity(capacity),
            capacity,
        }
    }

    fn overflow(position: usize) -> ParseError {
        ParseError::new(
            ParseErrorKind::CapacityExceeded,
            "token buffer capacity exceeded",
            position,
        )
    }

    fn emit(&mut self, token: Token) -> Result<(), ParseError> {
        if self.output.len() >= self.capacity {
            return Err(Parser::overflow(token.position()));
        }
        self.output.push(token);
        Ok(())
    }

    fn stack(&mut self, token: Token) -> Result<(), ParseError> {
        if self.operators.len() >= self.capacity {
            return Err(Parser::overflow(token.position()));
        }
        self.operators.push(token);
        Ok(())
    }

    fn push_operator(&mut self, token: Token) -> Result<(), ParseError> {
        let precedence = token.kind().precedence();
        while matches!(self.operators.last(), Some(top) if top.kind().precedence() >= precedence) {
            if let Some(top) = self.operators.pop() {
                self.emit(top)?;
            }
        }
        self.stack(token)
    }

    fn close_group(&mut self, position: usize) -> Result<(), ParseError> {
        loop {
            match self.operators.pop() {
                Some(top) if top.kind() == TokenKind::LParen => return Ok(()),
                Some(top) => self.emit(top)?,
                None => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnmatchedParenthesis,
                        "unmatched closing parenthesis",
                        position,
                    ))
                }
            }
        }
    }

    fn finish(mut self) -> Result<Vec<Token>, ParseError> {
        while let Some(top) = self.operators.pop() {
            if top.kind() == TokenKind::LParen {
                return Err(ParseError::new(
                    ParseErrorKind::UnmatchedParenthesis,
                    "unmatched opening parenthesis",
                    top.position(),
                ));
            }
            self.emit(top)?;
        }
        Ok(self.output)
    }
}

/// Reorders an infix token stream into reverse polish notation, inserting the
/// implicit `Concat` operators between adjacent operands. Parsing stops at the
/// first `End` token; the result holds no parentheses.
pub fn parse(tokens: &[Token]) -> Result<Vec<Token>, ParseError> {
    // n operands need at most n - 1 implicit concatenations
    let mut parser = Parser::new(2 * tokens.len());
    let mut previous: Option<TokenKind> = None;

    for token in tokens.iter().take_while(|token| token.kind() != TokenKind::End) {
        let kind = token.kind();
        if kind.starts_operand() && previous.map_or(false, |prev| prev.ends_operand()) {
            trace!("implicit concatenation before offset {}", token.position());
            parser.push_operator(Token::synthetic(TokenKind::Concat, token.position()))?;
        }
        match kind {
            TokenKind::Literal | TokenKind::Escape => parser.emit(token.clone())?,
            TokenKind::LParen => parser.stack(token.clone())?,
            TokenKind::RParen => parser.close_group(token.position())?,
            TokenKind::Star
            | TokenKind::Plus
            | TokenKind::Question
            | TokenKind::Union
            | TokenKind::Concat => parser.push_operator(token.clone())?,
            TokenKind::Epsilon | TokenKind::End => {
                return Err(ParseError::new(
                    ParseErrorKind::UnexpectedToken,
                    "unexpected token in infix stream",
                    token.position(),
                ))
            }
        }
        previous = Some(kind);
    }

    parser.finish()
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;
    use crate::lexer::tokenize;

    fn rpn(pattern: &str) -> String {
        parse(&tokenize(pattern).unwrap()).unwrap().iter().join(" ")
    }

    #[test]
    fn test_group_scenario() {
        let output = parse(&tokenize("a(a|b)").unwrap()).unwrap();
        assert_eq!(output.iter().join(" "), "a a b | .");
        assert_eq!(
            output.iter().map(|token| token.kind()).collect::<Vec<_>>(),
            vec![
                TokenKind::Literal,
                TokenKind::Literal,
                TokenKind::Literal,
                TokenKind::Union,
                TokenKind::Concat,
            ]
        );
        // the synthesized Concat points at the group it joins
        assert_eq!(output[4].position(), 1);
    }

    #[test]
    fn test_implicit_concatenation() {
        assert_eq!(rpn("ab"), "a b .");
        assert_eq!(rpn("abc"), "a b . c .");
        assert_eq!(rpn("a*b"), "a * b .");
        assert_eq!(rpn("(a)(b)"), "a b .");
        assert_eq!(rpn("a\\d"), "a \\d .");
        assert_eq!(rpn("a?(b)"), "a ? b .");
    }

    #[test]
    fn test_precedence() {
        assert_eq!(rpn("a|b"), "a b |");
        assert_eq!(rpn("ab|c"), "a b . c |");
        assert_eq!(rpn("a|bc"), "a b c . |");
        assert_eq!(rpn("ab*"), "a b * .");
        assert_eq!(rpn("a|b|c"), "a b | c |");
        assert_eq!(rpn("a+?"), "a + ?");
        assert_eq!(rpn("(a|b)*c"), "a b | * c .");
    }

    #[test]
    fn test_redundant_groups() {
        assert_eq!(rpn("(a|b)"), "a b |");
        assert_eq!(rpn("((a|b))"), "a b |");
        assert_eq!(rpn("(((a)))"), "a");
    }

    #[test]
    fn test_no_parentheses_remain() {
        let output = parse(&tokenize("(a(b|c)*)+d").unwrap()).unwrap();
        assert!(output
            .iter()
            .all(|token| !matches!(token.kind(), TokenKind::LParen | TokenKind::RParen)));
    }

    #[test]
    fn test_unmatched_opening_parenthesis() {
        let tokens = vec![
            Token::single(TokenKind::Literal, 'a', 0),
            Token::single(TokenKind::LParen, '(', 1),
            Token::single(TokenKind::Literal, 'b', 2),
            Token::synthetic(TokenKind::End, 3),
        ];
        let err = parse(&tokens).unwrap_err();
        assert_eq!(err.kind(), ParseErrorKind::UnmatchedParenthesis);
        assert_eq!(err.position(), 1);
    }

    #[test]
    fn test_unmatched_closing_parenthesis() {
        let tokens = vec![
            Token::single(TokenKind::Literal, 'a', 0),
            Token::single(TokenKind::RParen, ')', 1),
            Token::synthetic(TokenKind::End, 2),
        ];
        let err = parse(&tokens).unwrap_err();
        assert_eq!(err.kind(), ParseErrorKind::UnmatchedParenthesis);
        assert_eq!(err.position(), 1);
    }

    #[test]
    fn test_epsilon_is_rejected() {
        let tokens = vec![Token::epsilon(), Token::synthetic(TokenKind::End, 0)];
        let err = parse(&tokens).unwrap_err();
        assert_eq!(err.kind(), ParseErrorKind::UnexpectedToken);
    }

    #[test]
    fn test_stops_at_end() {
        let tokens = vec![
            Token::single(TokenKind::Literal, 'a', 0),
            Token::synthetic(TokenKind::End, 1),
            Token::single(TokenKind::Literal, 'b', 2),
        ];
        assert_eq!(parse(&tokens).unwrap().iter().join(" "), "a");
    }

    #[test]
    fn test_render_points_at_offset() {
        colored::control::set_override(false);
        let err = ParseError::new(
            ParseErrorKind::UnmatchedParenthesis,
            "unmatched opening parenthesis",
            1,
        );
        assert_eq!(
            err.render("a(b"),
            "parsing error: unmatched opening parenthesis\n | a(b\n |  ^"
        );
    }
}
