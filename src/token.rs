use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Literal,
    Union,
    Concat,
    Star,
    Plus,
    Question,
    LParen,
    RParen,
    Escape,
    // synthetic
    Epsilon,
    End,
}

impl TokenKind {
    /// Binding strength used by the shunting-yard pass. Parentheses are
    /// structural and rank below every operator.
    pub fn precedence(&self) -> u8 {
        match self {
            TokenKind::Star | TokenKind::Plus | TokenKind::Question => 3,
            TokenKind::Concat => 2,
            TokenKind::Union => 1,
            _ => 0,
        }
    }

    pub fn is_operand(&self) -> bool {
        matches!(self, TokenKind::Literal | TokenKind::Escape)
    }

    pub fn is_postfix(&self) -> bool {
        matches!(self, TokenKind::Star | TokenKind::Plus | TokenKind::Question)
    }

    /// True when a unit of this kind can be the left operand of an implicit
    /// concatenation.
    pub fn ends_operand(&self) -> bool {
        self.is_operand() || self.is_postfix() || *self == TokenKind::RParen
    }

    /// True when a unit of this kind can be the right operand of an implicit
    /// concatenation.
    pub fn starts_operand(&self) -> bool {
        self.is_operand() || *self == TokenKind::LParen
    }
}

/// A lexical unit. `value` holds the source text that produced it: the
/// character for single-character kinds, the payload without the backslash
/// for `Escape`, and nothing for the synthetic kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    kind: TokenKind,
    value: String,
    position: usize,
}

impl Token {
    pub fn single(kind: TokenKind, c: char, position: usize) -> Token {
        Token {
            kind,
            value: c.to_string(),
            position,
        }
    }

    pub fn multi(kind: TokenKind, text: &str, position: usize) -> Token {
        Token {
            kind,
            value: String::from(text),
            position,
        }
    }

    pub fn synthetic(kind: TokenKind, position: usize) -> Token {
        Token {
            kind,
            value: String::new(),
            position,
        }
    }

    pub fn epsilon() -> Token {
        Token::synthetic(TokenKind::Epsilon, 0)
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Byte offset of the token in the pattern it was lexed from.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_epsilon(&self) -> bool {
        self.kind == TokenKind::Epsilon
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TokenKind::Escape => write!(f, "\\{}", self.value),
            TokenKind::Concat => write!(f, "."),
            TokenKind::Epsilon => write!(f, "ε"),
            TokenKind::End => write!(f, ""),
            _ => write!(f, "{}", self.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_ordering() {
        assert!(TokenKind::Star.precedence() > TokenKind::Concat.precedence());
        assert!(TokenKind::Concat.precedence() > TokenKind::Union.precedence());
        assert!(TokenKind::Union.precedence() > TokenKind::LParen.precedence());
        assert_eq!(TokenKind::Plus.precedence(), TokenKind::Question.precedence());
        assert_eq!(TokenKind::End.precedence(), 0);
    }

    #[test]
    fn test_copy_is_independent() {
        let original = Token::multi(TokenKind::Escape, "abc", 3);
        let copy = original.clone();
        drop(original);
        assert_eq!(copy.value(), "abc");
        assert_eq!(copy.position(), 3);
        assert_eq!(copy.kind(), TokenKind::Escape);
    }

    #[test]
    fn test_display() {
        assert_eq!(Token::single(TokenKind::Literal, 'x', 0).to_string(), "x");
        assert_eq!(Token::multi(TokenKind::Escape, "d", 0).to_string(), "\\d");
        assert_eq!(Token::synthetic(TokenKind::Concat, 0).to_string(), ".");
        assert_eq!(Token::epsilon().to_string(), "ε");
        assert_eq!(Token::synthetic(TokenKind::End, 4).to_string(), "");
    }

    #[test]
    fn test_synthetic_tokens_carry_no_text() {
        assert!(Token::epsilon().value().is_empty());
        assert!(Token::synthetic(TokenKind::End, 9).value().is_empty());
        assert!(Token::epsilon().is_epsilon());
    }
}
