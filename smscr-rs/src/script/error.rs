//! Error types for the three SmartScript failure families.
//!
//! Every failure is fatal to the current parse or execution: the lexer,
//! parser and engine return these at the point of detection and the caller
//! decides how to report them.  Nothing here is recovered internally.

use thiserror::Error;

use crate::context::ContextError;

/// A tokenizer failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("invalid escape sequence '\\{found}' at offset {offset}")]
    InvalidEscape { found: String, offset: usize },

    #[error("string literal starting at offset {offset} is never closed")]
    UnterminatedString { offset: usize },

    #[error("unexpected character '{found}' at offset {offset} in {mode} mode")]
    UnexpectedChar {
        found: char,
        offset: usize,
        mode: &'static str,
    },

    #[error("malformed number '{text}' at offset {offset}")]
    MalformedNumber { text: String, offset: usize },

    #[error("cannot read a token after end of input")]
    PastEnd,
}

/// A grammar failure reported by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("a tag must begin with a tag name, found {found}")]
    MissingTagName { found: &'static str },

    #[error("unrecognized tag '{0}'")]
    UnknownTag(String),

    #[error("FOR tag: {0}")]
    MalformedFor(String),

    #[error("expected tag close '$}}', found {found}")]
    ExpectedTagClose { found: &'static str },

    #[error("tag is never closed")]
    UnterminatedTag,

    #[error("END tag without a matching open FOR tag")]
    UnbalancedEnd,

    #[error("{open} FOR tag(s) left open at end of input")]
    UnclosedFor { open: usize },
}

/// A failure while executing a parsed document.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("the string '{0}' is not valid for arithmetic operations")]
    NotANumber(String),

    #[error("integer division by zero")]
    DivisionByZero,

    #[error("unsupported operator '{0}'")]
    UnsupportedOperator(String),

    #[error("unsupported function '@{0}'")]
    UnknownFunction(String),

    #[error("echo stack underflow while evaluating '{0}'")]
    StackUnderflow(String),

    #[error("variable '{0}' is not defined (empty variable stack)")]
    UndefinedVariable(String),

    #[error("invalid decimal format pattern '{0}'")]
    InvalidPattern(String),

    #[error("writing output failed: {0}")]
    Output(#[from] std::io::Error),

    #[error(transparent)]
    Context(#[from] ContextError),
}

/// Any error produced by parsing or executing a script.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("lexical error: {0}")]
    Lex(LexError),

    #[error("syntax error: {0}")]
    Syntax(SyntaxError),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

impl From<LexError> for ScriptError {
    fn from(e: LexError) -> Self {
        ScriptError::Lex(e)
    }
}

impl From<SyntaxError> for ScriptError {
    fn from(e: SyntaxError) -> Self {
        // Keep the lexical/syntax distinction visible to callers.
        match e {
            SyntaxError::Lex(lex) => ScriptError::Lex(lex),
            other => ScriptError::Syntax(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_error_inside_syntax_error_surfaces_as_lexical() {
        let err: ScriptError = SyntaxError::Lex(LexError::PastEnd).into();
        assert!(matches!(err, ScriptError::Lex(LexError::PastEnd)));
    }

    #[test]
    fn messages_name_the_culprit() {
        let e = RuntimeError::UnknownFunction("frobnicate".into());
        assert_eq!(e.to_string(), "unsupported function '@frobnicate'");
        let e = SyntaxError::UnknownTag("IF".into());
        assert_eq!(e.to_string(), "unrecognized tag 'IF'");
    }
}
