//! Error types for the model crate.

use crate::graph::ObjectId;
use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors reported by the type model or the object graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A type name is not known to the model.
    #[error("unknown type: {name}")]
    UnknownType {
        /// The type that was looked up.
        name: String,
    },

    /// A property is not declared on a type or any of its supertypes.
    #[error("type {type_name} has no property '{property}'")]
    UnknownProperty {
        /// The owning type.
        type_name: String,
        /// The property that was looked up.
        property: String,
    },

    /// An object id does not refer to a live object.
    #[error("no object with id {0}")]
    UnknownObject(ObjectId),

    /// A type was registered twice.
    #[error("type {name} is declared more than once")]
    DuplicateType {
        /// The duplicated type.
        name: String,
    },

    /// A property was declared twice on the same type.
    #[error("property '{property}' is declared more than once on {type_name}")]
    DuplicateProperty {
        /// The owning type.
        type_name: String,
        /// The duplicated property.
        property: String,
    },

    /// The supertype graph contains a cycle.
    #[error("inheritance cycle through type {name}")]
    InheritanceCycle {
        /// A type on the cycle.
        name: String,
    },

    /// A value-type expression could not be parsed.
    #[error("invalid value type '{text}': {message}")]
    InvalidValueType {
        /// The text that failed to parse.
        text: String,
        /// Why it failed.
        message: String,
    },

    /// A container extractor was applied to a value of another shape.
    #[error("cannot extract {expected} elements from a {found} value")]
    ContainerMismatch {
        /// The extractor that was applied.
        expected: String,
        /// The shape of the value found instead.
        found: String,
    },

    /// A reference to an object was expected.
    #[error("expected an object reference, found a {found} value")]
    NotAnObject {
        /// The shape of the value found instead.
        found: String,
    },

    /// An abstract type cannot have instances.
    #[error("type {name} is abstract")]
    AbstractType {
        /// The abstract type.
        name: String,
    },

    /// An object id is already taken.
    #[error("object {0} already exists")]
    DuplicateObject(ObjectId),
}

impl ModelError {
    /// Creates an unknown type error.
    pub fn unknown_type(name: impl Into<String>) -> Self {
        Self::UnknownType { name: name.into() }
    }

    /// Creates an unknown property error.
    pub fn unknown_property(type_name: impl Into<String>, property: impl Into<String>) -> Self {
        Self::UnknownProperty {
            type_name: type_name.into(),
            property: property.into(),
        }
    }

    /// Creates an invalid value type error.
    pub fn invalid_value_type(text: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValueType {
            text: text.into(),
            message: message.into(),
        }
    }
}
