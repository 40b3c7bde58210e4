//! Host values.
//!
//! `HostValue` is everything the host can hand to the sandbox through the
//! reference table: the four sentinel primitives, numbers, strings, host
//! objects and sandbox-backed functions.

use std::fmt;
use std::rc::Rc;

use crate::closure::Closure;
use crate::object::{ObjectKind, ObjectRef};

/// A dynamically typed host value.
#[derive(Clone, Default)]
pub enum HostValue {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Object(ObjectRef),
    Function(Closure),
}

impl HostValue {
    /// `Object.is` semantics: NaN equals itself, `+0` and `-0` differ,
    /// objects and functions compare by identity.
    pub fn same_value(&self, other: &HostValue) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => {
                (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits()
            }
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// True for `undefined` and `null`.
    pub fn is_like_none(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    /// True for objects and functions (`typeof` of `"object"` or `"function"`,
    /// excluding `null`).
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Function(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_closure(&self) -> Option<&Closure> {
        match self {
            Self::Function(c) => Some(c),
            _ => None,
        }
    }

    /// The `typeof` string of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null | Self::Object(_) => "object",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Function(_) => "function",
        }
    }

    /// Human-readable rendering used by the `debug_string` import.
    pub fn debug_string(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::String(s) => format!("\"{}\"", s),
            Self::Function(_) => "Function".to_string(),
            Self::Object(obj) => debug_object(obj),
        }
    }
}

fn debug_object(obj: &ObjectRef) -> String {
    let data = obj.data();
    match &data.kind {
        ObjectKind::Error { name, message } => format!("{}: {}", name, message),
        ObjectKind::Plain => {
            let fields: Vec<String> = data
                .properties
                .iter()
                .filter_map(|(key, value)| json_fragment(value).map(|v| format!("\"{}\":{}", key, v)))
                .collect();
            format!("Object({{{}}})", fields.join(","))
        }
        _ => obj.class_name(),
    }
}

/// JSON rendering of a property value; functions and `undefined` are
/// skipped the way `JSON.stringify` skips them.
fn json_fragment(value: &HostValue) -> Option<String> {
    match value {
        HostValue::Undefined | HostValue::Function(_) => None,
        HostValue::Null => Some("null".to_string()),
        HostValue::Bool(b) => Some(b.to_string()),
        HostValue::Number(n) if n.is_finite() => Some(format_number(*n)),
        HostValue::Number(_) => Some("null".to_string()),
        HostValue::String(s) => Some(format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))),
        HostValue::Object(_) => Some("{}".to_string()),
    }
}

/// Format a number the way the host's `String(n)` does for the common cases.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.debug_string())
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for HostValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for HostValue {
    fn from(n: i32) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        Self::String(Rc::from(s))
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        Self::String(Rc::from(s))
    }
}

impl From<ObjectRef> for HostValue {
    fn from(obj: ObjectRef) -> Self {
        Self::Object(obj)
    }
}

impl From<Closure> for HostValue {
    fn from(closure: Closure) -> Self {
        Self::Function(closure)
    }
}

impl<T: Into<HostValue>> From<Option<T>> for HostValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Undefined)
    }
}
