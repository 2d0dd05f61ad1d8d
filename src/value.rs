use std::{fmt, rc::Rc};

use crate::{
    callable::{LoxClass, LoxFunction, LoxInstance},
    token::LiteralValue,
};

#[derive(Clone)]
pub enum RuntimeValue {
    Nil,
    /// Held by variables declared without an initializer.
    Uninitialized,
    Bool(bool),
    Number(f64),
    String(Rc<String>),
    Function(Rc<LoxFunction>),
    Class(Rc<LoxClass>),
    Instance(Rc<LoxInstance>),
}

impl RuntimeValue {
    /// Only `false` is falsy. `nil`, `0` and `""` are all truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, RuntimeValue::Bool(false))
    }

    pub fn string(value: impl Into<String>) -> RuntimeValue {
        RuntimeValue::String(Rc::new(value.into()))
    }
}

impl From<&LiteralValue> for RuntimeValue {
    fn from(value: &LiteralValue) -> Self {
        match value {
            LiteralValue::Nil => RuntimeValue::Nil,
            LiteralValue::Bool(value) => RuntimeValue::Bool(*value),
            LiteralValue::Number(value) => RuntimeValue::Number(*value),
            LiteralValue::String(value) => RuntimeValue::string(value.as_str()),
        }
    }
}

impl PartialEq for RuntimeValue {
    fn eq(&self, other: &Self) -> bool {
        use RuntimeValue::*;
        match (self, other) {
            (Nil, Nil) | (Uninitialized, Uninitialized) => true,
            (Bool(left), Bool(right)) => left == right,
            (Number(left), Number(right)) => left == right,
            (String(left), String(right)) => left == right,
            (Function(left), Function(right)) => Rc::ptr_eq(left, right),
            (Class(left), Class(right)) => Rc::ptr_eq(left, right),
            (Instance(left), Instance(right)) => Rc::ptr_eq(left, right),
            _ => false,
        }
    }
}

impl fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use RuntimeValue::*;
        match self {
            Nil | Uninitialized => write!(f, "nil"),
            Bool(true) => write!(f, "True"),
            Bool(false) => write!(f, "False"),
            Number(value) => write!(f, "{}", format_number(*value)),
            String(value) => write!(f, "{}", value),
            Function(function) => write!(f, "{}", function),
            Class(class) => write!(f, "{}", class),
            Instance(instance) => write!(f, "{}", instance),
        }
    }
}

impl fmt::Debug for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use RuntimeValue::*;
        match self {
            String(value) => write!(f, "{:?}", value),
            Uninitialized => write!(f, "<uninitialized>"),
            _ => write!(f, "{}", self),
        }
    }
}

/// Integral values print without a decimal point; everything else uses the
/// shortest representation that round-trips.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        match value.is_sign_positive() {
            true => "Infinity".to_string(),
            false => "-Infinity".to_string(),
        }
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn truthiness() {
        assert!(!RuntimeValue::Bool(false).is_truthy());
        assert!(RuntimeValue::Bool(true).is_truthy());
        assert!(RuntimeValue::Nil.is_truthy());
        assert!(RuntimeValue::Number(0.0).is_truthy());
        assert!(RuntimeValue::string("").is_truthy());
        assert!(RuntimeValue::Uninitialized.is_truthy());
    }

    #[test]
    fn numbers_format_like_literals() {
        assert_eq!(format_number(6.0), "6");
        assert_eq!(format_number(6.052), "6.052");
        assert_eq!(format_number(-5.0), "-5");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(1.0 / 0.0), "Infinity");
        assert_eq!(format_number(-1.0 / 0.0), "-Infinity");
        assert_eq!(format_number(0.0 / 0.0), "NaN");
        assert_eq!(format_number(1e21), "1000000000000000000000");
        assert_eq!(format_number(1e-7), "0.0000001");
    }

    #[test]
    fn display() {
        assert_eq!(RuntimeValue::Bool(true).to_string(), "True");
        assert_eq!(RuntimeValue::Bool(false).to_string(), "False");
        assert_eq!(RuntimeValue::Nil.to_string(), "nil");
        assert_eq!(RuntimeValue::string("lox").to_string(), "lox");
    }

    #[test]
    fn equality_has_no_coercion() {
        assert_eq!(RuntimeValue::Number(1.0), RuntimeValue::Number(1.0));
        assert_eq!(RuntimeValue::string("a"), RuntimeValue::string("a"));
        assert_eq!(RuntimeValue::Nil, RuntimeValue::Nil);
        assert!(RuntimeValue::Number(1.0) != RuntimeValue::string("1"));
        assert!(RuntimeValue::Nil != RuntimeValue::Bool(false));
        assert_eq!(RuntimeValue::Uninitialized, RuntimeValue::Uninitialized);
        assert!(RuntimeValue::Uninitialized != RuntimeValue::Nil);
    }
}
