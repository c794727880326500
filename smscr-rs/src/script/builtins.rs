//! Built-in SmartScript functions.
//!
//! A function reference (`@name`) inside an echo tag operates directly on the
//! echo tag's working stack: it pops its operands and pushes its results.
//! Operands are popped in reverse of the order they were written, so
//! `{$= "name" "default" @paramGet $}` pops the default first.

use std::sync::OnceLock;

use regex::Regex;
use tracing::trace;

use super::error::RuntimeError;
use super::value::Value;
use crate::context::Context;

/// Which parameter store a `*param*` built-in targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Store {
    Request,
    Persistent,
    Temporary,
}

/// Run built-in `name` against the echo stack.
pub fn call_builtin(
    name: &str,
    stack: &mut Vec<Value>,
    ctx: &mut dyn Context,
) -> Result<(), RuntimeError> {
    trace!(function = name, depth = stack.len(), "builtin");
    match name {
        // ── Math and formatting ──────────────────────────────────────────────
        "sin" => {
            let degrees = pop(stack, name)?.to_f64()?;
            stack.push(Value::Double(degrees.to_radians().sin()));
        }
        "decfmt" => {
            let pattern = pop(stack, name)?.to_string();
            let number = pop(stack, name)?.to_f64()?;
            let format = DecimalFormat::parse(&pattern)?;
            stack.push(Value::Str(format.format(number)));
        }

        // ── Stack manipulation ───────────────────────────────────────────────
        "dup" => {
            let top = pop(stack, name)?;
            stack.push(top.clone());
            stack.push(top);
        }
        "swap" => {
            let a = pop(stack, name)?;
            let b = pop(stack, name)?;
            stack.push(a);
            stack.push(b);
        }

        // ── Context access ───────────────────────────────────────────────────
        "setMimeType" => {
            let mime = pop(stack, name)?.to_string();
            ctx.set_mime_type(&mime)?;
        }
        "paramGet" => param_get(Store::Request, name, stack, ctx)?,
        "pparamGet" => param_get(Store::Persistent, name, stack, ctx)?,
        "tparamGet" => param_get(Store::Temporary, name, stack, ctx)?,
        "pparamSet" | "tparamSet" => {
            let key = pop(stack, name)?.to_string();
            let value = pop(stack, name)?.to_string();
            if name == "pparamSet" {
                ctx.set_persistent_parameter(&key, value);
            } else {
                ctx.set_temporary_parameter(&key, value);
            }
        }
        "pparamDel" => {
            let key = pop(stack, name)?.to_string();
            ctx.remove_persistent_parameter(&key);
        }
        "tparamDel" => {
            let key = pop(stack, name)?.to_string();
            ctx.remove_temporary_parameter(&key);
        }
        "dispatch" => {
            let path = pop(stack, name)?.to_string();
            ctx.dispatch(&path)?;
        }

        _ => return Err(RuntimeError::UnknownFunction(name.to_owned())),
    }
    Ok(())
}

fn param_get(
    store: Store,
    name: &str,
    stack: &mut Vec<Value>,
    ctx: &dyn Context,
) -> Result<(), RuntimeError> {
    let default = pop(stack, name)?;
    let key = pop(stack, name)?.to_string();
    let found = match store {
        Store::Request => ctx.parameter(&key),
        Store::Persistent => ctx.persistent_parameter(&key),
        Store::Temporary => ctx.temporary_parameter(&key),
    };
    stack.push(found.map(Value::Str).unwrap_or(default));
    Ok(())
}

fn pop(stack: &mut Vec<Value>, name: &str) -> Result<Value, RuntimeError> {
    stack
        .pop()
        .ok_or_else(|| RuntimeError::StackUnderflow(format!("@{name}")))
}

// ── Decimal format ────────────────────────────────────────────────────────────

/// `prefix integer[.fraction] suffix [; negative-prefix number negative-suffix]`
///
/// Affixes may quote pattern characters with `'…'`; `''` is a literal quote.
const PATTERN_SYNTAX: &str = concat!(
    r"^((?:'[^']*'|[^#0,.;'])*)",
    r"([#0,]*)(?:\.([#0]*))?",
    r"((?:'[^']*'|[^#0,.;'])*)",
    r"(?:;((?:'[^']*'|[^#0,.;'])*)[#0,.]+((?:'[^']*'|[^#0,.;'])*))?$",
);

const PERCENT: char = '%';
const PER_MILLE: char = '\u{2030}';
const CURRENCY: char = '\u{a4}';

fn pattern_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PATTERN_SYNTAX).ok()).as_ref()
}

/// A compiled decimal pattern such as `#,##0.00`, `0.###` or `0.0%`.
///
/// `0` is a mandatory digit, `#` an optional one and `,` marks the grouping
/// size.  Text before the first or after the last pattern character is
/// copied literally; an unquoted `%` or `‰` there also scales the value by
/// 100 or 1000.  A `;` introduces the affixes used for negative values.
/// Rounding is half-to-even.  Exponent patterns and the currency sign are
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecimalFormat {
    prefix: String,
    suffix: String,
    negative: Option<(String, String)>,
    multiplier: u32,
    min_int: usize,
    min_frac: usize,
    max_frac: usize,
    grouping: Option<usize>,
}

impl DecimalFormat {
    pub fn parse(pattern: &str) -> Result<Self, RuntimeError> {
        let invalid = || RuntimeError::InvalidPattern(pattern.to_owned());
        let caps = pattern_regex()
            .and_then(|re| re.captures(pattern))
            .ok_or_else(invalid)?;
        let group = |i: usize| caps.get(i).map(|m| m.as_str());
        let int_part = group(2).unwrap_or("");
        let frac_part = group(3).unwrap_or("");

        let int_digits: String = int_part.chars().filter(|&c| c != ',').collect();
        if int_digits.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        // Optional digits lead in the integer part and trail in the fraction.
        if int_digits.trim_start_matches('#').contains('#')
            || frac_part.trim_end_matches('#').contains('#')
        {
            return Err(invalid());
        }

        let grouping = match int_part.rfind(',') {
            Some(pos) => {
                let size = int_part.len() - pos - 1;
                if size == 0 {
                    return Err(invalid());
                }
                Some(size)
            }
            None => None,
        };

        let mut multiplier = None;
        let mut affix = |i: usize| -> Result<String, RuntimeError> {
            unquote_affix(group(i).unwrap_or(""), &mut multiplier).ok_or_else(invalid)
        };
        let prefix = affix(1)?;
        let suffix = affix(4)?;
        let negative = match group(5).zip(group(6)) {
            Some(_) => Some((affix(5)?, affix(6)?)),
            None => None,
        };

        Ok(DecimalFormat {
            prefix,
            suffix,
            negative,
            multiplier: multiplier.unwrap_or(1),
            min_int: int_digits.matches('0').count(),
            min_frac: frac_part.matches('0').count(),
            max_frac: frac_part.len(),
            grouping,
        })
    }

    pub fn format(&self, number: f64) -> String {
        if number.is_nan() {
            return "NaN".to_owned();
        }
        let (prefix, suffix) = match (&self.negative, number.is_sign_negative()) {
            (_, false) => (self.prefix.clone(), self.suffix.as_str()),
            (Some((prefix, suffix)), true) => (prefix.clone(), suffix.as_str()),
            (None, true) => (format!("-{}", self.prefix), self.suffix.as_str()),
        };
        let scaled = number.abs() * f64::from(self.multiplier);
        if scaled.is_infinite() {
            return format!("{prefix}\u{221e}{suffix}");
        }
        format!("{prefix}{}{suffix}", self.digits(scaled))
    }

    /// Integer and fraction digits of a finite, non-negative `x`.
    fn digits(&self, x: f64) -> String {
        let rounded = format!("{:.*}", self.max_frac, x);
        let (int_raw, frac_raw) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));

        let mut frac = frac_raw.to_owned();
        while frac.len() > self.min_frac && frac.ends_with('0') {
            frac.pop();
        }

        let mut int = int_raw.trim_start_matches('0').to_owned();
        if int.len() < self.min_int {
            int = "0".repeat(self.min_int - int.len()) + &int;
        }
        if int.is_empty() && frac.is_empty() {
            int.push('0');
        }
        if let Some(size) = self.grouping {
            int = group_digits(&int, size);
        }

        if !frac.is_empty() {
            int.push('.');
            int.push_str(&frac);
        }
        int
    }
}

/// Strip quoting from an affix, recording the scale an unquoted `%` or `‰`
/// asks for.  `None` marks an affix the formatter cannot honour.
fn unquote_affix(raw: &str, multiplier: &mut Option<u32>) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut quoted = false;
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' if chars.peek() == Some(&'\'') => {
                chars.next();
                out.push('\'');
            }
            '\'' => quoted = !quoted,
            PERCENT | PER_MILLE if !quoted => {
                let scale = if c == PERCENT { 100 } else { 1000 };
                if multiplier.is_some_and(|m| m != scale) {
                    return None;
                }
                *multiplier = Some(scale);
                out.push(c);
            }
            CURRENCY if !quoted => return None,
            _ => out.push(c),
        }
    }
    Some(out)
}

fn group_digits(digits: &str, size: usize) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / size);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % size == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
