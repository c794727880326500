//! SmartScript parser.
//!
//! The parser drives the [`Lexer`], switching it into tag mode after each
//! `{$` and back to text mode once the tag is closed.  Open FOR loops live on
//! an explicit stack whose bottom frame is the document itself.
//!
//! Grammar:
//!
//! ```text
//! document := (TEXT | echo | for)*
//! echo     := "{$" "=" element* "$}"
//! for      := "{$" FOR var operand operand [operand] "$}" document "{$" END "$}"
//! operand  := var | number | string
//! ```
//!
//! Tag names are case-insensitive.

use tracing::debug;

use super::elem::Element;
use super::error::SyntaxError;
use super::lexer::{Lexer, LexerMode, Number, Token};
use super::node::{Document, ForLoop, Node};

/// Header of a FOR tag whose body is still being collected.
struct ForHeader {
    variable: String,
    start: Element,
    end: Element,
    step: Option<Element>,
}

/// One level of the open-container stack.
struct Frame {
    header: Option<ForHeader>,
    children: Vec<Node>,
}

/// Eager single-pass parser; the whole input is parsed by [`Parser::new`].
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    stack: Vec<Frame>,
    document: Document,
}

impl<'a> Parser<'a> {
    /// Tokenize and parse `src` completely.
    pub fn new(src: &'a str) -> Result<Self, SyntaxError> {
        let mut parser = Parser {
            lexer: Lexer::new(src),
            stack: vec![Frame {
                header: None,
                children: Vec::new(),
            }],
            document: Document::default(),
        };
        parser.parse_document()?;
        debug!(nodes = parser.document.node_count(), "parsed document");
        Ok(parser)
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    // ── Document level ────────────────────────────────────────────────────────

    fn parse_document(&mut self) -> Result<(), SyntaxError> {
        loop {
            match self.lexer.next_token()? {
                Token::Eof => break,
                Token::Text(text) => self.append(Node::Text(text)),
                Token::TagOpen => self.parse_tag()?,
                other => {
                    // Text mode only ever yields the three kinds above.
                    return Err(SyntaxError::MissingTagName {
                        found: other.kind().name(),
                    });
                }
            }
        }

        // `stack[0]` is the document frame; anything above it is an open FOR.
        let open = self.stack.len() - 1;
        if open != 0 {
            return Err(SyntaxError::UnclosedFor { open });
        }
        if let Some(root) = self.stack.pop() {
            self.document.children = root.children;
        }
        Ok(())
    }

    fn append(&mut self, node: Node) {
        if let Some(top) = self.stack.last_mut() {
            top.children.push(node);
        }
    }

    fn parse_tag(&mut self) -> Result<(), SyntaxError> {
        self.lexer.set_mode(LexerMode::Tag);
        let name = match self.lexer.next_token()? {
            Token::Variable(name) => name,
            other => {
                return Err(SyntaxError::MissingTagName {
                    found: other.kind().name(),
                })
            }
        };

        if name == "=" {
            let elements = self.parse_echo()?;
            self.append(Node::Echo(elements));
        } else if name.eq_ignore_ascii_case("FOR") {
            let header = self.parse_for()?;
            self.stack.push(Frame {
                header: Some(header),
                children: Vec::new(),
            });
        } else if name.eq_ignore_ascii_case("END") {
            self.expect_tag_close()?;
            self.close_for()?;
        } else {
            return Err(SyntaxError::UnknownTag(name));
        }
        self.lexer.set_mode(LexerMode::Text);
        Ok(())
    }

    // ── Tags ──────────────────────────────────────────────────────────────────

    fn parse_echo(&mut self) -> Result<Vec<Element>, SyntaxError> {
        let mut elements = Vec::new();
        loop {
            match self.lexer.next_token()? {
                Token::TagClose => return Ok(elements),
                Token::Eof => return Err(SyntaxError::UnterminatedTag),
                token => elements.push(element_from(token)?),
            }
        }
    }

    fn parse_for(&mut self) -> Result<ForHeader, SyntaxError> {
        let variable = match self.lexer.next_token()? {
            Token::Variable(name) if name != "=" => name,
            other => {
                return Err(SyntaxError::MalformedFor(format!(
                    "expected a variable name, found {}",
                    other.kind()
                )))
            }
        };
        let start = self
            .for_operand()?
            .ok_or_else(|| SyntaxError::MalformedFor("missing start expression".into()))?;
        let end = self
            .for_operand()?
            .ok_or_else(|| SyntaxError::MalformedFor("missing end expression".into()))?;
        // A missing step means the tag close has already been consumed.
        let step = self.for_operand()?;
        if step.is_some() {
            self.expect_tag_close()?;
        }
        Ok(ForHeader {
            variable,
            start,
            end,
            step,
        })
    }

    /// Read one FOR argument; `None` if the tag closed instead.
    fn for_operand(&mut self) -> Result<Option<Element>, SyntaxError> {
        match self.lexer.next_token()? {
            Token::TagClose => Ok(None),
            Token::Eof => Err(SyntaxError::UnterminatedTag),
            Token::Function(name) => Err(SyntaxError::MalformedFor(format!(
                "function '@{name}' is not allowed here"
            ))),
            token => {
                let element = element_from(token)?;
                if element.is_for_operand() {
                    Ok(Some(element))
                } else {
                    Err(SyntaxError::MalformedFor(format!(
                        "'{element}' is not a variable, number or string"
                    )))
                }
            }
        }
    }

    fn expect_tag_close(&mut self) -> Result<(), SyntaxError> {
        match self.lexer.next_token()? {
            Token::TagClose => Ok(()),
            Token::Eof => Err(SyntaxError::UnterminatedTag),
            other => Err(SyntaxError::ExpectedTagClose {
                found: other.kind().name(),
            }),
        }
    }

    fn close_for(&mut self) -> Result<(), SyntaxError> {
        if self.stack.len() < 2 {
            return Err(SyntaxError::UnbalancedEnd);
        }
        let Some(Frame {
            header: Some(header),
            children,
        }) = self.stack.pop()
        else {
            return Err(SyntaxError::UnbalancedEnd);
        };
        self.append(Node::ForLoop(ForLoop {
            variable: header.variable,
            start: header.start,
            end: header.end,
            step: header.step,
            children,
        }));
        Ok(())
    }
}

/// Build an [`Element`] from a tag-mode token.
fn element_from(token: Token) -> Result<Element, SyntaxError> {
    Ok(match token {
        Token::Variable(name) => Element::Variable(name),
        Token::Str(s) => Element::Str(s),
        Token::Operator(c) => Element::Operator(c),
        Token::Function(name) => Element::Function(name),
        Token::Number(Number::Integer(n)) => Element::Integer(n),
        Token::Number(Number::Double(x)) => Element::Double(x),
        other => {
            return Err(SyntaxError::MalformedFor(format!(
                "an element cannot be built from {}",
                other.kind()
            )))
        }
    })
}

// ── Public helpers ────────────────────────────────────────────────────────────

/// Parse `src` into a [`Document`].
pub fn parse(src: &str) -> Result<Document, SyntaxError> {
    Parser::new(src).map(Parser::into_document)
}

/// Write `document` back out as SmartScript source.
///
/// `parse(&reconstruct(&parse(s)?))` yields a tree equal to `parse(s)`;
/// whitespace inside tags is normalised.
pub fn reconstruct(document: &Document) -> String {
    document.to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
