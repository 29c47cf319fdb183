//! FieldTree - schema provider output
//!
//! Decoded view of a record half. Fields are addressed by their schema field
//! number, never by position, so a number keeps meaning the same field when
//! the schema is reordered.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;

/// Typed runtime value of a decoded field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Bytes(Bytes),
    /// Enum number with its symbolic name when the descriptor knows it
    Enum { number: i32, name: Option<String> },
    Nested(FieldTree),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// Short type name (used in error messages and logs)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int(_) => "int64",
            Self::UInt(_) => "uint64",
            Self::Float(_) => "double",
            Self::Bool(_) => "bool",
            Self::Bytes(_) => "bytes",
            Self::Enum { .. } => "enum",
            Self::Nested(_) => "message",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Integer view of the value
    ///
    /// Floats are truncated toward zero, booleans map to 0/1, enums to their
    /// number and strings must hold a decimal integer. Composite values have
    /// no integer view.
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Self::Int(v) => Some(i128::from(*v)),
            Self::UInt(v) => Some(i128::from(*v)),
            Self::Bool(v) => Some(i128::from(*v)),
            Self::Enum { number, .. } => Some(i128::from(*number)),
            Self::Float(v) if v.is_finite() => Some(v.trunc() as i128),
            Self::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Floating point view of the value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::UInt(v) => Some(*v as f64),
            Self::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            Self::Enum {
                name: Some(name), ..
            } => f.write_str(name),
            Self::Enum { number, name: None } => write!(f, "{number}"),
            Self::Nested(tree) => write!(f, "{tree}"),
            Self::List(values) => {
                f.write_str("[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
            Self::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Decoded message: field number -> typed value
///
/// Only top-level numbering is addressable; nested messages appear as
/// [`FieldValue::Nested`] and are reached explicitly by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTree {
    type_name: String,
    fields: BTreeMap<u32, FieldValue>,
}

impl FieldTree {
    /// Create an empty tree for the given message type
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style insert
    pub fn with_field(mut self, number: u32, value: FieldValue) -> Self {
        self.fields.insert(number, value);
        self
    }

    pub fn insert(&mut self, number: u32, value: FieldValue) {
        self.fields.insert(number, value);
    }

    /// Fully qualified message type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Look up a field by its schema number
    pub fn get(&self, number: u32) -> Option<&FieldValue> {
        self.fields.get(&number)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in ascending field-number order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &FieldValue)> {
        self.fields.iter().map(|(number, value)| (*number, value))
    }
}

impl fmt::Display for FieldTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (number, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{number}: {value}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_number() {
        let tree = FieldTree::new("sink.test.TestMessage")
            .with_field(1, FieldValue::Str("test-order".into()))
            .with_field(52, FieldValue::Int(2000));

        assert_eq!(tree.get(1), Some(&FieldValue::Str("test-order".into())));
        assert_eq!(tree.get(52), Some(&FieldValue::Int(2000)));
        assert_eq!(tree.get(2), None);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_integer_view() {
        assert_eq!(FieldValue::Float(12.9).as_integer(), Some(12));
        assert_eq!(FieldValue::Float(-12.9).as_integer(), Some(-12));
        assert_eq!(FieldValue::Str(" 42 ".into()).as_integer(), Some(42));
        assert_eq!(FieldValue::Str("abc".into()).as_integer(), None);
        assert_eq!(FieldValue::Bool(true).as_integer(), Some(1));
        assert_eq!(FieldValue::UInt(u64::MAX).as_integer(), Some(i128::from(u64::MAX)));
        assert_eq!(FieldValue::Float(f64::NAN).as_integer(), None);
        assert_eq!(FieldValue::Nested(FieldTree::default()).as_integer(), None);
    }

    #[test]
    fn test_float_view() {
        assert_eq!(FieldValue::Int(2000).as_float(), Some(2000.0));
        assert_eq!(FieldValue::Str("12.5".into()).as_float(), Some(12.5));
        assert_eq!(FieldValue::Bool(true).as_float(), None);
    }

    #[test]
    fn test_display() {
        let nested = FieldTree::new("Inner").with_field(1, FieldValue::Str("x".into()));
        let value = FieldValue::List(vec![
            FieldValue::Int(1),
            FieldValue::Enum {
                number: 2,
                name: Some("DONE".into()),
            },
            FieldValue::Nested(nested),
        ]);
        assert_eq!(value.to_string(), "[1, DONE, {1: x}]");
    }
}
