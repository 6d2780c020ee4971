//! Error types for EntiDex core.

use entidex_model::ModelError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while compiling a mapping or resolving reindexing.
///
/// Everything except [`CoreError::Model`] and [`CoreError::InvariantViolation`]
/// is raised during bootstrap; see [`CoreError::is_configuration_error`].
#[derive(Debug, Error)]
pub enum CoreError {
    /// The type model or the object graph reported an inconsistency.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// A declared path does not parse or does not resolve against the type model.
    #[error("invalid path '{path}' on {owner}: {reason}")]
    InvalidPath {
        /// Type the path is declared on.
        owner: String,
        /// The path as declared.
        path: String,
        /// Why the path was rejected.
        reason: String,
    },

    /// A declaration names a type the model does not know.
    #[error("unknown type in mapping: {name}")]
    UnknownType {
        /// The unknown type.
        name: String,
    },

    /// A type is used in a role that requires an entity.
    #[error("type {name} cannot be {role}: it is not an entity")]
    NotAnEntity {
        /// The offending type.
        name: String,
        /// The role it was declared in.
        role: String,
    },

    /// A path crosses into another entity without a declared inverse side.
    #[error("no inverse side declared for {owner}.{path}")]
    MissingInverse {
        /// Type owning the association.
        owner: String,
        /// Association path (property names only).
        path: String,
    },

    /// An inverse-association declaration cannot be used.
    #[error("invalid inverse side for {owner}.{path}: {message}")]
    InvalidInverse {
        /// Type owning the association.
        owner: String,
        /// Association path.
        path: String,
        /// Description of the problem.
        message: String,
    },

    /// The same association was declared with two different inverse sides.
    #[error("contradictory inverse sides for {owner}.{path}: {first} and {second}")]
    ContradictoryInverse {
        /// Type owning the association.
        owner: String,
        /// Association path.
        path: String,
        /// The inverse side declared first.
        first: String,
        /// The conflicting inverse side.
        second: String,
    },

    /// Embeddable types embed each other without end.
    #[error("recursive embedding of embeddable types: {chain}")]
    RecursiveEmbedding {
        /// The embedding chain, outermost first.
        chain: String,
    },

    /// Runtime state contradicts the compiled mapping.
    #[error("invariant violation: {message}")]
    InvariantViolation {
        /// Description of the violation.
        message: String,
    },
}

impl CoreError {
    /// Creates an invalid path error.
    pub fn invalid_path(
        owner: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidPath {
            owner: owner.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unknown type error.
    pub fn unknown_type(name: impl Into<String>) -> Self {
        Self::UnknownType { name: name.into() }
    }

    /// Creates a not-an-entity error.
    pub fn not_an_entity(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self::NotAnEntity {
            name: name.into(),
            role: role.into(),
        }
    }

    /// Creates an invalid inverse error.
    pub fn invalid_inverse(
        owner: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidInverse {
            owner: owner.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates an invariant violation error.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Returns true for errors raised while compiling the mapping.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, Self::Model(_) | Self::InvariantViolation { .. })
    }
}
