//! SmartScript tokenizer.
//!
//! The tokenizer is modal.  In [`LexerMode::Text`] it produces runs of plain
//! text and stops at the tag-open sequence `{$`; in [`LexerMode::Tag`] it
//! skips whitespace and produces the small vocabulary used inside tags.  The
//! parser owns the mode switches: it enters tag mode after a `{$` and returns
//! to text mode once it has consumed the matching `$}`.
//!
//! | Mode | Input                 | Token                       |
//! |------|-----------------------|-----------------------------|
//! | text | anything up to `{$`   | [`Token::Text`]             |
//! | text | `{$`                  | [`Token::TagOpen`]          |
//! | tag  | `=`                   | [`Token::Variable`] (`"="`) |
//! | tag  | `name_1`              | [`Token::Variable`]         |
//! | tag  | `12`, `-3.5`          | [`Token::Number`]           |
//! | tag  | `+ - * / ^`           | [`Token::Operator`]         |
//! | tag  | `@name`               | [`Token::Function`]         |
//! | tag  | `"text"`              | [`Token::Str`]              |
//! | tag  | `$}`                  | [`Token::TagClose`]         |

use std::fmt;

use tracing::trace;

use super::error::LexError;

pub const TAG_OPEN: &str = "{$";
pub const TAG_CLOSE: &str = "$}";
pub const ESCAPE: char = '\\';
pub const FUNCTION_SIGIL: char = '@';
pub const OPERATORS: [char; 5] = ['+', '-', '*', '/', '^'];

// ── Token ─────────────────────────────────────────────────────────────────────

/// A single lexical unit.  Tokens are immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Plain text with escapes already removed.
    Text(String),
    TagOpen,
    TagClose,
    /// Identifier, tag name, or the echo sigil `=`.
    Variable(String),
    Number(Number),
    /// Double-quoted string literal with escapes already removed.
    Str(String),
    Operator(char),
    /// Function reference without its `@` sigil.
    Function(String),
    Eof,
}

/// The payload-free kind of a [`Token`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Text,
    TagOpen,
    TagClose,
    Variable,
    Number,
    Str,
    Operator,
    Function,
    Eof,
}

impl TokenKind {
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Text => "TEXT",
            TokenKind::TagOpen => "TAG_OPEN",
            TokenKind::TagClose => "TAG_CLOSE",
            TokenKind::Variable => "VARIABLE_NAME",
            TokenKind::Number => "NUMBER",
            TokenKind::Str => "STRING",
            TokenKind::Operator => "OPERATOR",
            TokenKind::Function => "FUNCTION",
            TokenKind::Eof => "END_OF_INPUT",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Text(_) => TokenKind::Text,
            Token::TagOpen => TokenKind::TagOpen,
            Token::TagClose => TokenKind::TagClose,
            Token::Variable(_) => TokenKind::Variable,
            Token::Number(_) => TokenKind::Number,
            Token::Str(_) => TokenKind::Str,
            Token::Operator(_) => TokenKind::Operator,
            Token::Function(_) => TokenKind::Function,
            Token::Eof => TokenKind::Eof,
        }
    }
}

/// A numeric literal.  Digits without a decimal point read as an integer
/// when they fit in `i64`; anything else is a double.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Double(f64),
}

// ── Mode ──────────────────────────────────────────────────────────────────────

/// Which lexical rules apply to the next token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LexerMode {
    /// Outside tags: text runs, whitespace preserved.
    #[default]
    Text,
    /// Inside `{$ … $}`: whitespace-separated tag tokens.
    Tag,
}

impl LexerMode {
    fn name(self) -> &'static str {
        match self {
            LexerMode::Text => "text",
            LexerMode::Tag => "tag",
        }
    }
}

// ── Lexer ─────────────────────────────────────────────────────────────────────

/// Produces [`Token`]s one at a time from a complete source text.
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    mode: LexerMode,
    current: Option<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            src,
            pos: 0,
            mode: LexerMode::Text,
            current: None,
        }
    }

    pub fn set_mode(&mut self, mode: LexerMode) {
        self.mode = mode;
    }

    /// The most recently produced token, if any.
    pub fn current(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    /// Produce the next token.
    ///
    /// Once [`Token::Eof`] has been returned every further call fails with
    /// [`LexError::PastEnd`].
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        if matches!(self.current, Some(Token::Eof)) {
            return Err(LexError::PastEnd);
        }
        if self.mode == LexerMode::Tag {
            self.skip_ws();
        }
        let token = if self.pos >= self.src.len() {
            Token::Eof
        } else {
            match self.mode {
                LexerMode::Text => self.text_token()?,
                LexerMode::Tag => self.tag_token()?,
            }
        };
        trace!(?token, mode = self.mode.name(), "token");
        self.current = Some(token.clone());
        Ok(token)
    }

    // ── Character helpers ─────────────────────────────────────────────────────

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek2(&self) -> Option<char> {
        let mut it = self.rest().chars();
        it.next();
        it.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r' | '\n')) {
            self.pos += 1;
        }
    }

    fn unexpected(&self, found: char) -> LexError {
        LexError::UnexpectedChar {
            found,
            offset: self.pos,
            mode: self.mode.name(),
        }
    }

    // ── Text mode ─────────────────────────────────────────────────────────────

    fn text_token(&mut self) -> Result<Token, LexError> {
        if self.rest().starts_with(TAG_OPEN) {
            self.pos += TAG_OPEN.len();
            return Ok(Token::TagOpen);
        }

        let mut text = String::new();
        while let Some(c) = self.peek() {
            if self.rest().starts_with(TAG_OPEN) {
                break;
            }
            if c == ESCAPE {
                // Only `\\` and `\{` are meaningful outside tags.
                match self.peek2() {
                    Some(next @ (ESCAPE | '{')) => {
                        text.push(next);
                        self.pos += 1 + next.len_utf8();
                    }
                    other => {
                        return Err(LexError::InvalidEscape {
                            found: other.map(String::from).unwrap_or_default(),
                            offset: self.pos,
                        })
                    }
                }
                continue;
            }
            text.push(c);
            self.pos += c.len_utf8();
        }
        Ok(Token::Text(text))
    }

    // ── Tag mode ──────────────────────────────────────────────────────────────

    fn tag_token(&mut self) -> Result<Token, LexError> {
        let Some(c) = self.peek() else {
            return Ok(Token::Eof);
        };

        if c == '=' {
            self.pos += 1;
            return Ok(Token::Variable("=".to_owned()));
        }
        if c.is_alphabetic() {
            return Ok(Token::Variable(self.read_ident()));
        }
        if OPERATORS.contains(&c) {
            if matches!(c, '+' | '-') && self.peek2().is_some_and(|d| d.is_ascii_digit()) {
                return self.read_number();
            }
            self.pos += 1;
            return Ok(Token::Operator(c));
        }
        if c.is_ascii_digit() {
            return self.read_number();
        }
        if c == FUNCTION_SIGIL && self.peek2().is_some_and(char::is_alphabetic) {
            self.pos += 1;
            return Ok(Token::Function(self.read_ident()));
        }
        if c == '"' {
            return self.read_string();
        }
        if self.rest().starts_with(TAG_CLOSE) {
            self.pos += TAG_CLOSE.len();
            return Ok(Token::TagClose);
        }

        Err(self.unexpected(c))
    }

    fn read_ident(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        self.src[start..self.pos].to_owned()
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.pos;
        // The first character (digit or sign) is always part of the literal.
        self.bump();
        while matches!(self.peek(), Some('0'..='9' | '.')) {
            self.pos += 1;
        }
        let text = &self.src[start..self.pos];
        if text.matches('.').count() > 1 {
            return Err(LexError::MalformedNumber {
                text: text.to_owned(),
                offset: start,
            });
        }
        let integer = if text.contains('.') {
            None
        } else {
            text.parse::<i64>().ok()
        };
        match integer {
            Some(n) => Ok(Token::Number(Number::Integer(n))),
            None => text
                .parse::<f64>()
                .map(|x| Token::Number(Number::Double(x)))
                .map_err(|_| LexError::MalformedNumber {
                    text: text.to_owned(),
                    offset: start,
                }),
        }
    }

    fn read_string(&mut self) -> Result<Token, LexError> {
        let start = self.pos;
        self.pos += 1; // opening quote
        let mut s = String::new();
        loop {
            match self.bump() {
                None => return Err(LexError::UnterminatedString { offset: start }),
                Some('"') => break,
                Some(ESCAPE) => {
                    let at = self.pos - 1;
                    match self.bump() {
                        Some(ESCAPE) => s.push(ESCAPE),
                        Some('"') => s.push('"'),
                        Some('n') => s.push('\n'),
                        Some('r') => s.push('\r'),
                        Some('t') => s.push('\t'),
                        other => {
                            return Err(LexError::InvalidEscape {
                                found: other.map(String::from).unwrap_or_default(),
                                offset: at,
                            })
                        }
                    }
                }
                Some(c) => s.push(c),
            }
        }
        Ok(Token::Str(s))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
