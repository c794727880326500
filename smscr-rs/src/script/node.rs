//! Document tree.
//!
//! A parsed script is a [`Document`] whose children are [`Node`]s.  Only
//! [`ForLoop`] nodes have children of their own.  The tree is built once by
//! the parser and only read afterwards, so a single `Document` can be shared
//! by any number of concurrent executions.
//!
//! `Display` on these types writes SmartScript source that parses back to an
//! equal tree.

use std::fmt;

use super::elem::Element;
use super::lexer::{TAG_CLOSE, TAG_OPEN};

/// Root of a parsed script.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub children: Vec<Node>,
}

/// A node below the document root.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, stored unescaped.
    Text(String),
    /// `{$= … $}`: an expression written to the output.
    Echo(Vec<Element>),
    /// `{$FOR … $} … {$END$}`
    ForLoop(ForLoop),
}

/// A `FOR var start end [step]` loop and its body.
#[derive(Debug, Clone, PartialEq)]
pub struct ForLoop {
    pub variable: String,
    pub start: Element,
    pub end: Element,
    pub step: Option<Element>,
    pub children: Vec<Node>,
}

impl Document {
    /// Total number of nodes in the tree, excluding the root.
    pub fn node_count(&self) -> usize {
        fn count(nodes: &[Node]) -> usize {
            nodes
                .iter()
                .map(|n| match n {
                    Node::ForLoop(fl) => 1 + count(&fl.children),
                    _ => 1,
                })
                .sum()
        }
        count(&self.children)
    }
}

// ── Source reconstruction ─────────────────────────────────────────────────────

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.children.iter().try_for_each(|n| write!(f, "{n}"))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Text(text) => f.write_str(&escape_text(text)),
            Node::Echo(elements) => {
                write!(f, "{TAG_OPEN}=")?;
                for e in elements {
                    write!(f, " {e}")?;
                }
                write!(f, " {TAG_CLOSE}")
            }
            Node::ForLoop(fl) => write!(f, "{fl}"),
        }
    }
}

impl fmt::Display for ForLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{TAG_OPEN}FOR {} {} {}", self.variable, self.start, self.end)?;
        if let Some(step) = &self.step {
            write!(f, " {step}")?;
        }
        write!(f, " {TAG_CLOSE}")?;
        for child in &self.children {
            write!(f, "{child}")?;
        }
        write!(f, "{TAG_OPEN}END{TAG_CLOSE}")
    }
}

/// Escape `\` everywhere and `{` where it would start a tag.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' || (c == '{' && chars.peek() == Some(&'$')) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
