//! Expression elements: the operands and operators inside tags.

use std::fmt;

use super::value::Value;

/// Doubles closer than this compare equal.
pub const DOUBLE_EPSILON: f64 = 1e-5;

/// One element of a FOR or echo tag.
#[derive(Debug, Clone)]
pub enum Element {
    Integer(i64),
    Double(f64),
    /// String literal, stored unescaped.
    Str(String),
    Variable(String),
    /// Function reference, stored without the `@` sigil.
    Function(String),
    Operator(char),
}

impl Element {
    /// Source form that the lexer reads back as an equal element.
    pub fn as_text(&self) -> String {
        self.to_string()
    }

    /// The semantic payload: the literal's value, or the name/symbol of a
    /// reference.
    pub fn value(&self) -> Value {
        match self {
            Element::Integer(n) => Value::Int(*n),
            Element::Double(x) => Value::Double(*x),
            Element::Str(s) | Element::Variable(s) | Element::Function(s) => Value::Str(s.clone()),
            Element::Operator(c) => Value::Str(c.to_string()),
        }
    }

    /// Whether this element may appear as a FOR tag argument.
    pub fn is_for_operand(&self) -> bool {
        matches!(
            self,
            Element::Integer(_) | Element::Double(_) | Element::Str(_) | Element::Variable(_)
        )
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Element::Integer(a), Element::Integer(b)) => a == b,
            (Element::Double(a), Element::Double(b)) => (a - b).abs() < DOUBLE_EPSILON,
            (Element::Str(a), Element::Str(b))
            | (Element::Variable(a), Element::Variable(b))
            | (Element::Function(a), Element::Function(b)) => a == b,
            (Element::Operator(a), Element::Operator(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Integer(n) => write!(f, "{n}"),
            // `{}` on f64 never uses exponent notation, which the lexer
            // could not read back.  Whole values keep a `.0` to stay doubles.
            Element::Double(x) if x.fract() == 0.0 => write!(f, "{x:.1}"),
            Element::Double(x) => write!(f, "{x}"),
            Element::Str(s) => write!(f, "\"{}\"", escape_string(s)),
            Element::Variable(name) => f.write_str(name),
            Element::Function(name) => write!(f, "@{name}"),
            Element::Operator(c) => write!(f, "{c}"),
        }
    }
}

/// Re-escape a string literal body.
fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_text_forms() {
        assert_eq!(Element::Integer(-4).as_text(), "-4");
        assert_eq!(Element::Double(2.5).as_text(), "2.5");
        assert_eq!(Element::Double(3.0).as_text(), "3.0");
        assert_eq!(Element::Variable("i".into()).as_text(), "i");
        assert_eq!(Element::Function("sin".into()).as_text(), "@sin");
        assert_eq!(Element::Operator('*').as_text(), "*");
    }

    #[test]
    fn string_as_text_reescapes() {
        let e = Element::Str("a\"b\\c\nd\te\r".into());
        assert_eq!(e.as_text(), r#""a\"b\\c\nd\te\r""#);
    }

    #[test]
    fn small_doubles_have_no_exponent() {
        assert_eq!(Element::Double(0.000001).as_text(), "0.000001");
    }

    #[test]
    fn double_equality_uses_epsilon() {
        assert_eq!(Element::Double(1.0), Element::Double(1.000001));
        assert_ne!(Element::Double(1.0), Element::Double(1.001));
    }

    #[test]
    fn kinds_never_compare_equal() {
        assert_ne!(Element::Integer(1), Element::Double(1.0));
        assert_ne!(Element::Variable("x".into()), Element::Str("x".into()));
        assert_ne!(Element::Variable("f".into()), Element::Function("f".into()));
    }

    #[test]
    fn values() {
        assert_eq!(Element::Integer(3).value(), Value::Int(3));
        assert_eq!(Element::Str("s".into()).value(), Value::Str("s".into()));
        assert_eq!(Element::Operator('+').value(), Value::Str("+".into()));
    }

    #[test]
    fn for_operands() {
        assert!(Element::Variable("i".into()).is_for_operand());
        assert!(Element::Str("1".into()).is_for_operand());
        assert!(!Element::Function("sin".into()).is_for_operand());
        assert!(!Element::Operator('+').is_for_operand());
    }
}
