//! Tree-walking execution engine.
//!
//! An [`Engine`] borrows a parsed [`Document`] and a [`Context`] and walks
//! the tree once, depth first.  All state lives in the engine itself (the
//! named loop-variable stacks), so one document can be executed by many
//! engines at the same time.

use std::cmp::Ordering;

use tracing::{debug, trace};

use super::builtins::call_builtin;
use super::elem::Element;
use super::error::RuntimeError;
use super::multistack::MultiStack;
use super::node::{Document, ForLoop, Node};
use super::value::{Value, ValueWrapper};
use crate::context::Context;

/// Single-shot executor for one document against one context.
pub struct Engine<'d, 'c> {
    document: &'d Document,
    ctx: &'c mut dyn Context,
    stacks: MultiStack,
}

impl<'d, 'c> Engine<'d, 'c> {
    pub fn new(document: &'d Document, ctx: &'c mut dyn Context) -> Self {
        Engine {
            document,
            ctx,
            stacks: MultiStack::new(),
        }
    }

    /// Run the whole document.  Consumes the engine.
    pub fn execute(mut self) -> Result<(), RuntimeError> {
        debug!(nodes = self.document.node_count(), "executing document");
        let document = self.document;
        self.visit_nodes(&document.children)?;
        debug!("execution finished");
        Ok(())
    }

    fn visit_nodes(&mut self, nodes: &[Node]) -> Result<(), RuntimeError> {
        for node in nodes {
            match node {
                Node::Text(text) => self.ctx.write_str(text)?,
                Node::Echo(elements) => self.visit_echo(elements)?,
                Node::ForLoop(fl) => self.visit_for(fl)?,
            }
        }
        Ok(())
    }

    // ── FOR ───────────────────────────────────────────────────────────────────

    fn visit_for(&mut self, fl: &ForLoop) -> Result<(), RuntimeError> {
        let start = self.operand(&fl.start)?;
        let end = self.operand(&fl.end)?;
        let step = match &fl.step {
            Some(e) => self.operand(e)?,
            None => Value::Int(1),
        };

        self.stacks.push(&fl.variable, ValueWrapper::new(start));
        loop {
            let current = self.stacks.peek(&fl.variable)?;
            if current.num_compare(Some(&end))? == Ordering::Greater {
                break;
            }
            trace!(variable = %fl.variable, value = ?current.value(), "for iteration");
            self.visit_nodes(&fl.children)?;
            self.stacks.peek_mut(&fl.variable)?.add(Some(&step))?;
        }
        self.stacks.pop(&fl.variable)?;
        Ok(())
    }

    /// Value of a FOR tag argument.  A variable reads its innermost binding.
    fn operand(&self, element: &Element) -> Result<Value, RuntimeError> {
        match element {
            Element::Variable(name) => self.variable(name),
            other => Ok(other.value()),
        }
    }

    fn variable(&self, name: &str) -> Result<Value, RuntimeError> {
        Ok(self.stacks.peek(name)?.value().cloned().unwrap_or_default())
    }

    // ── Echo ──────────────────────────────────────────────────────────────────

    fn visit_echo(&mut self, elements: &[Element]) -> Result<(), RuntimeError> {
        let mut stack: Vec<Value> = Vec::new();
        for element in elements {
            match element {
                Element::Integer(_) | Element::Double(_) | Element::Str(_) => {
                    stack.push(element.value());
                }
                Element::Variable(name) => stack.push(self.variable(name)?),
                Element::Operator(op) => {
                    let underflow = || RuntimeError::StackUnderflow(op.to_string());
                    let rhs = stack.pop().ok_or_else(underflow)?;
                    let lhs = stack.pop().ok_or_else(underflow)?;
                    stack.push(apply_operator(*op, lhs, &rhs)?);
                }
                Element::Function(name) => call_builtin(name, &mut stack, &mut *self.ctx)?,
            }
        }
        for value in &stack {
            self.ctx.write_str(&value.to_string())?;
        }
        Ok(())
    }
}

fn apply_operator(op: char, lhs: Value, rhs: &Value) -> Result<Value, RuntimeError> {
    let mut acc = ValueWrapper::new(lhs);
    match op {
        '+' => acc.add(Some(rhs))?,
        '-' => acc.subtract(Some(rhs))?,
        '*' => acc.multiply(Some(rhs))?,
        '/' => acc.divide(Some(rhs))?,
        other => return Err(RuntimeError::UnsupportedOperator(other.to_string())),
    }
    Ok(acc.into_value())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
