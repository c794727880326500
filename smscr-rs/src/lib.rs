//! SmartScript template engine.
//!
//! ```rust
//! use smscr::context::BufferContext;
//!
//! let mut ctx = BufferContext::new().with_parameter("name", "world");
//! smscr::render(r#"Hello {$= "name" "?" @paramGet $}!"#, &mut ctx).unwrap();
//! assert_eq!(ctx.output, "Hello world!");
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod script;

use context::Context;
use script::{parse, Engine, ScriptError};

/// Parse `source` and execute it against `ctx`.
pub fn render(source: &str, ctx: &mut dyn Context) -> Result<(), ScriptError> {
    let document = parse(source)?;
    Engine::new(&document, ctx).execute()?;
    Ok(())
}
