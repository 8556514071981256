//! The decoded value tree.

use std::fmt;

/// Any value representable on the wire.
///
/// `List` and `Tuple` carry identical payloads but keep their distinction
/// so a value re-encodes exactly as it arrived. `Dict` preserves pair
/// order for the same reason; keys may themselves be arbitrary values.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    None,
    List(Vec<WireValue>),
    Tuple(Vec<WireValue>),
    Dict(Vec<(WireValue, WireValue)>),
    Object(WireObject),
}

impl WireValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            WireValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            WireValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&WireObject> {
        match self {
            WireValue::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

impl From<&str> for WireValue {
    fn from(s: &str) -> Self {
        WireValue::Str(s.to_owned())
    }
}

impl From<String> for WireValue {
    fn from(s: String) -> Self {
        WireValue::Str(s)
    }
}

impl From<i64> for WireValue {
    fn from(i: i64) -> Self {
        WireValue::Int(i)
    }
}

impl From<f64> for WireValue {
    fn from(f: f64) -> Self {
        WireValue::Float(f)
    }
}

impl From<bool> for WireValue {
    fn from(b: bool) -> Self {
        WireValue::Bool(b)
    }
}

/// A typed object: a class name plus named fields, in wire order.
#[derive(Debug, Clone, PartialEq)]
pub struct WireObject {
    pub class: String,
    pub fields: Vec<(String, WireValue)>,
}

impl WireObject {
    pub fn new(class: impl Into<String>) -> Self {
        WireObject {
            class: class.into(),
            fields: Vec::new(),
        }
    }

    /// Builder-style field append, used by the encoders.
    pub fn field(mut self, name: impl Into<String>, value: WireValue) -> Self {
        self.fields.push((name.into(), value));
        self
    }

    /// First field with the given name.
    pub fn get(&self, name: &str) -> Option<&WireValue> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

impl fmt::Display for WireObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({} fields)", self.class, self.fields.len())
    }
}
