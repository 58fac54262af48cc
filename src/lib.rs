//! Compiles a small regular-expression syntax into a Thompson NFA.
//!
//! The pipeline runs in three stages: [`lexer::tokenize`] turns the pattern
//! into tokens, [`parser::parse`] reorders them into reverse polish notation
//! with explicit concatenation, and [`fsm::build`] evaluates the RPN stream
//! into an arena-backed [`fsm::RegexNFA`].
//!
//! ```
//! let nfa = reg_thompson::compile("a(a|b)").unwrap();
//! assert_eq!(nfa.alphabet().len(), 2);
//! ```

pub mod fsm;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod utils;

use crate::fsm::{ReError, RegexNFA};
use crate::utils::CompileFlags;

pub fn compile(pattern: &str) -> Result<RegexNFA, ReError> {
    RegexNFA::compile(pattern)
}

pub fn compile_with_flags(pattern: &str, flags: CompileFlags) -> Result<RegexNFA, ReError> {
    RegexNFA::compile_with_flags(pattern, flags)
}
