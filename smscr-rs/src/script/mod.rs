//! SmartScript: a small template language for generating responses.
//!
//! Source text is plain output interleaved with tags delimited by `{$` and
//! `$}`:
//!
//! - `{$= expr... $}` evaluates a postfix expression and writes the result;
//! - `{$FOR var start end [step] $} ... {$END$}` repeats its body.
//!
//! The pipeline is [`lexer`] → [`parser`] → [`engine`], with runtime values
//! in [`value`] and the built-in `@functions` in [`builtins`].
//!
//! # Quick start
//!
//! ```rust
//! use smscr::context::BufferContext;
//! use smscr::script::{parse, Engine};
//!
//! let doc = parse("{$FOR i 1 3 $}{$= i i * $} {$END$}").unwrap();
//! let mut ctx = BufferContext::new();
//! Engine::new(&doc, &mut ctx).execute().unwrap();
//! assert_eq!(ctx.output, "1 4 9 ");
//! ```

pub mod builtins;
pub mod elem;
pub mod engine;
pub mod error;
pub mod lexer;
pub mod multistack;
pub mod node;
pub mod parser;
pub mod value;

// Re-exports for convenience.
pub use elem::Element;
pub use engine::Engine;
pub use error::{LexError, RuntimeError, ScriptError, SyntaxError};
pub use lexer::{Lexer, LexerMode, Token};
pub use node::{Document, ForLoop, Node};
pub use parser::{parse, reconstruct, Parser};
pub use value::{Value, ValueWrapper};
