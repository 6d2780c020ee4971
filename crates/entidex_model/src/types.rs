//! Type descriptors: names, value types, properties.

use crate::error::{ModelError, ModelResult};
use crate::value::ContainerKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Name of a domain type.
///
/// Cheap to clone; compared by content.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TypeName(Arc<str>);

impl TypeName {
    /// Creates a type name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TypeName {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<TypeName> for String {
    fn from(name: TypeName) -> Self {
        name.0.to_string()
    }
}

/// Scalar leaf kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// Boolean.
    Bool,
    /// Signed integer.
    Integer,
    /// Text string.
    Text,
    /// Byte string.
    Bytes,
}

impl ScalarKind {
    fn keyword(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::Text => "text",
            Self::Bytes => "bytes",
        }
    }
}

/// Declared type of a property value.
///
/// Written in mapping files with a compact syntax: `text`, `Order`,
/// `list<Order>`, `map<text, Tag>`, `optional<Customer>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ValueType {
    /// A scalar leaf value.
    Scalar(ScalarKind),
    /// A reference to an object of the named type (or a subtype).
    Object(TypeName),
    /// A list of elements.
    List(Box<ValueType>),
    /// A set of elements.
    Set(Box<ValueType>),
    /// An array of elements.
    Array(Box<ValueType>),
    /// An optional element.
    Optional(Box<ValueType>),
    /// A map from keys to values.
    Map {
        /// Key type.
        key: Box<ValueType>,
        /// Value type.
        value: Box<ValueType>,
    },
}

impl ValueType {
    /// Text scalar.
    pub fn text() -> Self {
        Self::Scalar(ScalarKind::Text)
    }

    /// Integer scalar.
    pub fn integer() -> Self {
        Self::Scalar(ScalarKind::Integer)
    }

    /// Reference to an object type.
    pub fn object(name: impl Into<TypeName>) -> Self {
        Self::Object(name.into())
    }

    /// List of `element`.
    pub fn list(element: ValueType) -> Self {
        Self::List(Box::new(element))
    }

    /// Set of `element`.
    pub fn set(element: ValueType) -> Self {
        Self::Set(Box::new(element))
    }

    /// Optional `element`.
    pub fn optional(element: ValueType) -> Self {
        Self::Optional(Box::new(element))
    }

    /// Map from `key` to `value`.
    pub fn map(key: ValueType, value: ValueType) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Returns true if this is a container type.
    pub fn is_container(&self) -> bool {
        !matches!(self, Self::Scalar(_) | Self::Object(_))
    }

    /// Returns the object type name if this is an object reference.
    pub fn as_object(&self) -> Option<&TypeName> {
        match self {
            Self::Object(name) => Some(name),
            _ => None,
        }
    }

    /// The extractor used when a path asks for the default one (`[]`).
    pub fn default_extractor(&self) -> Option<ContainerKind> {
        match self {
            Self::List(_) => Some(ContainerKind::List),
            Self::Set(_) => Some(ContainerKind::Set),
            Self::Array(_) => Some(ContainerKind::Array),
            Self::Optional(_) => Some(ContainerKind::Optional),
            Self::Map { .. } => Some(ContainerKind::MapValues),
            Self::Scalar(_) | Self::Object(_) => None,
        }
    }

    /// The element type produced by applying `kind` to this type, if it applies.
    pub fn extract(&self, kind: ContainerKind) -> Option<&ValueType> {
        match (kind, self) {
            (ContainerKind::List, Self::List(e))
            | (ContainerKind::Set, Self::Set(e))
            | (ContainerKind::Array, Self::Array(e))
            | (ContainerKind::Optional, Self::Optional(e)) => Some(e),
            (ContainerKind::MapValues, Self::Map { value, .. }) => Some(value),
            (ContainerKind::MapKeys, Self::Map { key, .. }) => Some(key),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(kind) => f.write_str(kind.keyword()),
            Self::Object(name) => write!(f, "{name}"),
            Self::List(e) => write!(f, "list<{e}>"),
            Self::Set(e) => write!(f, "set<{e}>"),
            Self::Array(e) => write!(f, "array<{e}>"),
            Self::Optional(e) => write!(f, "optional<{e}>"),
            Self::Map { key, value } => write!(f, "map<{key}, {value}>"),
        }
    }
}

impl FromStr for ValueType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = ValueTypeParser {
            text: s,
            rest: s.trim(),
        };
        let parsed = parser.parse()?;
        if !parser.rest.trim().is_empty() {
            return Err(ModelError::invalid_value_type(
                s,
                format!("unexpected trailing input '{}'", parser.rest.trim()),
            ));
        }
        Ok(parsed)
    }
}

impl TryFrom<String> for ValueType {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ValueType> for String {
    fn from(value: ValueType) -> Self {
        value.to_string()
    }
}

struct ValueTypeParser<'a> {
    text: &'a str,
    rest: &'a str,
}

impl<'a> ValueTypeParser<'a> {
    fn parse(&mut self) -> ModelResult<ValueType> {
        let name = self.ident()?;
        if !self.eat('<') {
            return Ok(match name {
                "bool" => ValueType::Scalar(ScalarKind::Bool),
                "integer" => ValueType::Scalar(ScalarKind::Integer),
                "text" => ValueType::Scalar(ScalarKind::Text),
                "bytes" => ValueType::Scalar(ScalarKind::Bytes),
                other => ValueType::Object(TypeName::new(other)),
            });
        }
        let first = self.parse()?;
        let parsed = if name == "map" {
            self.expect(',')?;
            let value = self.parse()?;
            ValueType::map(first, value)
        } else {
            let element = Box::new(first);
            match name {
                "list" => ValueType::List(element),
                "set" => ValueType::Set(element),
                "array" => ValueType::Array(element),
                "optional" => ValueType::Optional(element),
                other => {
                    return Err(ModelError::invalid_value_type(
                        self.text,
                        format!("'{other}' is not a container type"),
                    ))
                }
            }
        };
        self.expect('>')?;
        Ok(parsed)
    }

    fn ident(&mut self) -> ModelResult<&'a str> {
        self.rest = self.rest.trim_start();
        let end = self
            .rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(self.rest.len());
        if end == 0 {
            return Err(ModelError::invalid_value_type(self.text, "expected a type name"));
        }
        let (ident, rest) = self.rest.split_at(end);
        self.rest = rest;
        Ok(ident)
    }

    fn eat(&mut self, c: char) -> bool {
        self.rest = self.rest.trim_start();
        match self.rest.strip_prefix(c) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn expect(&mut self, c: char) -> ModelResult<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(ModelError::invalid_value_type(self.text, format!("expected '{c}'")))
        }
    }
}

/// Whether a type is change-tracked with its own identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeKind {
    /// An entity: has identity, changes are reported for it directly.
    Entity {
        /// Property holding the identifier, if any.
        #[serde(default)]
        id_property: Option<String>,
    },
    /// An embeddable: part of its owner's state, no identity of its own.
    Embeddable,
}

/// A declared property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    /// Property name.
    pub name: String,
    /// Declared value type.
    #[serde(rename = "type")]
    pub value_type: ValueType,
}

/// Description of one domain type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Type name.
    pub name: TypeName,
    /// Entity or embeddable.
    #[serde(flatten)]
    pub kind: TypeKind,
    /// Abstract types never appear as runtime types.
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    /// Direct supertypes (superclass and interfaces).
    #[serde(default)]
    pub supertypes: Vec<TypeName>,
    /// Properties declared on this type (inherited ones excluded).
    #[serde(default)]
    pub properties: Vec<PropertyDescriptor>,
}

impl TypeDescriptor {
    /// Starts an entity descriptor.
    pub fn entity(name: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Entity { id_property: None },
            is_abstract: false,
            supertypes: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Starts an embeddable descriptor.
    pub fn embeddable(name: impl Into<TypeName>) -> Self {
        Self {
            kind: TypeKind::Embeddable,
            ..Self::entity(name)
        }
    }

    /// Declares the identifier property (added as a property too).
    #[must_use]
    pub fn id(mut self, property: &str, value_type: ValueType) -> Self {
        self.kind = TypeKind::Entity {
            id_property: Some(property.to_string()),
        };
        self.property(property, value_type)
    }

    /// Marks the type abstract.
    #[must_use]
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Adds a direct supertype.
    #[must_use]
    pub fn extends(mut self, supertype: impl Into<TypeName>) -> Self {
        self.supertypes.push(supertype.into());
        self
    }

    /// Declares a property.
    #[must_use]
    pub fn property(mut self, name: &str, value_type: ValueType) -> Self {
        self.properties.push(PropertyDescriptor {
            name: name.to_string(),
            value_type,
        });
        self
    }

    /// Returns true for entity types.
    pub fn is_entity(&self) -> bool {
        matches!(self.kind, TypeKind::Entity { .. })
    }

    /// Returns the identifier property, if declared.
    pub fn id_property(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Entity { id_property } => id_property.as_deref(),
            TypeKind::Embeddable => None,
        }
    }
}
