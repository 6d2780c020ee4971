//! Dynamic property values and container extraction.

use crate::error::{ModelError, ModelResult};
use crate::graph::ObjectId;
use std::fmt;

/// A dynamic property value held by a domain object.
///
/// Floats are intentionally absent so that values stay `Eq + Hash + Ord`
/// and can be used as entity identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    /// Null value (also the value of an unset property).
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Text string.
    Text(String),
    /// Byte string.
    Bytes(Vec<u8>),
    /// Reference to another object in the same graph.
    Ref(ObjectId),
    /// Ordered list.
    List(Vec<Value>),
    /// Set; element order carries no meaning.
    Set(Vec<Value>),
    /// Fixed-size array.
    Array(Vec<Value>),
    /// Map of key-value pairs.
    Map(Vec<(Value, Value)>),
    /// Optional wrapper.
    Optional(Option<Box<Value>>),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get this value as an object reference, if it is one.
    pub fn as_ref_id(&self) -> Option<ObjectId> {
        match self {
            Value::Ref(id) => Some(*id),
            _ => None,
        }
    }

    /// Get this value as a string, if it is a text string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Creates an optional value; `None` becomes an empty optional.
    pub fn optional(inner: Option<Value>) -> Self {
        Value::Optional(inner.map(Box::new))
    }

    /// Short name of the value's shape, used in error messages.
    pub fn shape(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Ref(_) => "reference",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Optional(_) => "optional",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Ref(id) => write!(f, "{id}"),
            Value::List(items) | Value::Set(items) | Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(pairs) => {
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Optional(Some(inner)) => write!(f, "{inner}"),
            Value::Optional(None) => write!(f, "empty"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::Ref(id)
    }
}

impl From<Option<ObjectId>> for Value {
    fn from(id: Option<ObjectId>) -> Self {
        id.map_or(Value::Null, Value::Ref)
    }
}

/// Kind of container a value extractor unwraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContainerKind {
    /// Elements of a list.
    List,
    /// Elements of a set.
    Set,
    /// Values of a map.
    MapValues,
    /// Keys of a map.
    MapKeys,
    /// Elements of an array.
    Array,
    /// Payload of an optional.
    Optional,
}

impl ContainerKind {
    /// Parses the keyword used inside `[...]` in a dependency path.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "list" => Some(Self::List),
            "set" => Some(Self::Set),
            "values" => Some(Self::MapValues),
            "keys" => Some(Self::MapKeys),
            "array" => Some(Self::Array),
            "optional" => Some(Self::Optional),
            _ => None,
        }
    }

    /// The keyword used inside `[...]` in a dependency path.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Set => "set",
            Self::MapValues => "values",
            Self::MapKeys => "keys",
            Self::Array => "array",
            Self::Optional => "optional",
        }
    }

    /// Yields the elements inside `value`.
    ///
    /// Never mutates the container. A null value yields nothing; a value of
    /// another shape is an error since the type model promised this shape.
    pub fn extract<'a>(self, value: &'a Value) -> ModelResult<Vec<&'a Value>> {
        match (self, value) {
            (_, Value::Null) => Ok(Vec::new()),
            (Self::List, Value::List(items))
            | (Self::Set, Value::Set(items))
            | (Self::Array, Value::Array(items)) => Ok(items.iter().collect()),
            (Self::MapValues, Value::Map(pairs)) => Ok(pairs.iter().map(|(_, v)| v).collect()),
            (Self::MapKeys, Value::Map(pairs)) => Ok(pairs.iter().map(|(k, _)| k).collect()),
            (Self::Optional, Value::Optional(inner)) => Ok(inner.iter().map(|v| &**v).collect()),
            (kind, other) => Err(ModelError::ContainerMismatch {
                expected: kind.keyword().to_string(),
                found: other.shape().to_string(),
            }),
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}
