//! Dependency declarations: the bootstrap input of the resolver.
//!
//! Declarations are collected as raw path text and validated in one go by
//! [`MappingModel::compile`](crate::MappingModel::compile).
//!
//! # Usage
//!
//! ```
//! use entidex_core::MappingDeclarations;
//!
//! let mut declarations = MappingDeclarations::new();
//! declarations.indexed("Customer").read("name").read("orders[].total");
//! declarations.inverse("Customer", "orders", "Order", "customer");
//! assert_eq!(declarations.types().len(), 1);
//! ```

use entidex_model::TypeName;
use serde::{Deserialize, Serialize};

/// Declarations for one mapped type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDeclarations {
    /// The mapped type.
    pub name: TypeName,
    /// Whether the type (and its subtypes) has an index document.
    #[serde(default)]
    pub indexed: bool,
    /// Paths whose value the document reads.
    #[serde(default)]
    pub read: Vec<String>,
    /// Paths whose objects' document parts the document embeds.
    #[serde(default)]
    pub embed: Vec<String>,
    /// Values read from other entities that point back at this type.
    #[serde(default, rename = "other")]
    pub other_entities: Vec<OtherEntityDependency>,
}

impl TypeDeclarations {
    fn new(name: TypeName) -> Self {
        Self {
            name,
            indexed: false,
            read: Vec::new(),
            embed: Vec::new(),
            other_entities: Vec::new(),
        }
    }

    /// Declares that the document reads the value at `path`.
    pub fn read(&mut self, path: impl Into<String>) -> &mut Self {
        self.read.push(path.into());
        self
    }

    /// Declares that the document embeds the document part of the object(s) at `path`.
    pub fn embed(&mut self, path: impl Into<String>) -> &mut Self {
        self.embed.push(path.into());
        self
    }

    /// Declares that the document reads `used_paths` on `other_type` entities,
    /// which reach this type by walking `inverse_path`.
    pub fn from_other_entity<I, S>(
        &mut self,
        other_type: impl Into<TypeName>,
        inverse_path: impl Into<String>,
        used_paths: I,
    ) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.other_entities.push(OtherEntityDependency {
            other_type: other_type.into(),
            inverse_path: inverse_path.into(),
            used_paths: used_paths.into_iter().map(Into::into).collect(),
        });
        self
    }
}

/// A dependency on values held by another entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherEntityDependency {
    /// The entity type holding the values.
    #[serde(rename = "type")]
    pub other_type: TypeName,
    /// Path from the other entity back to the declaring type.
    pub inverse_path: String,
    /// Paths read on the other entity.
    #[serde(default, rename = "used")]
    pub used_paths: Vec<String>,
}

/// A bidirectional association: `owner.path` and `inverse_owner.inverse_path`
/// are each other's inverse side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InverseDeclaration {
    /// Type owning the forward side.
    pub owner: TypeName,
    /// Forward path.
    pub path: String,
    /// Type owning the inverse side.
    pub inverse_owner: TypeName,
    /// Inverse path.
    pub inverse_path: String,
}

/// All dependency declarations of a mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingDeclarations {
    #[serde(default)]
    types: Vec<TypeDeclarations>,
    #[serde(default)]
    inverses: Vec<InverseDeclaration>,
}

impl MappingDeclarations {
    /// Creates an empty set of declarations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an indexed type and returns its declarations.
    pub fn indexed(&mut self, type_name: impl Into<TypeName>) -> &mut TypeDeclarations {
        let declarations = self.entry(type_name.into());
        declarations.indexed = true;
        declarations
    }

    /// Declares a contained type and returns its declarations.
    ///
    /// Contained types have no document of their own; their declarations
    /// matter to whoever embeds them.
    pub fn contained(&mut self, type_name: impl Into<TypeName>) -> &mut TypeDeclarations {
        self.entry(type_name.into())
    }

    /// Declares a bidirectional association.
    pub fn inverse(
        &mut self,
        owner: impl Into<TypeName>,
        path: impl Into<String>,
        inverse_owner: impl Into<TypeName>,
        inverse_path: impl Into<String>,
    ) -> &mut Self {
        self.inverses.push(InverseDeclaration {
            owner: owner.into(),
            path: path.into(),
            inverse_owner: inverse_owner.into(),
            inverse_path: inverse_path.into(),
        });
        self
    }

    /// Declarations per type, in declaration order.
    pub fn types(&self) -> &[TypeDeclarations] {
        &self.types
    }

    /// Declarations of one type, if any.
    pub fn type_declarations(&self, type_name: &TypeName) -> Option<&TypeDeclarations> {
        self.types.iter().find(|t| &t.name == type_name)
    }

    /// Inverse-association declarations, in declaration order.
    pub fn inverses(&self) -> &[InverseDeclaration] {
        &self.inverses
    }

    fn entry(&mut self, name: TypeName) -> &mut TypeDeclarations {
        let index = match self.types.iter().position(|t| t.name == name) {
            Some(index) => index,
            None => {
                self.types.push(TypeDeclarations::new(name));
                self.types.len() - 1
            }
        };
        &mut self.types[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_merges_by_type() {
        let mut declarations = MappingDeclarations::new();
        declarations.contained("Order").read("total");
        declarations.indexed("Order").read("lines[].sku");

        assert_eq!(declarations.types().len(), 1);
        let order = &declarations.types()[0];
        assert!(order.indexed);
        assert_eq!(order.read, vec!["total", "lines[].sku"]);
    }

    #[test]
    fn contained_does_not_reset_indexed() {
        let mut declarations = MappingDeclarations::new();
        declarations.indexed("Customer");
        declarations.contained("Customer").embed("address");
        assert!(declarations.type_declarations(&TypeName::new("Customer")).unwrap().indexed);
    }

    #[test]
    fn other_entity_dependency() {
        let mut declarations = MappingDeclarations::new();
        declarations
            .indexed("Book")
            .from_other_entity("Review", "book", ["rating", "text"]);

        let book = &declarations.types()[0];
        assert_eq!(book.other_entities[0].other_type, TypeName::new("Review"));
        assert_eq!(book.other_entities[0].used_paths, vec!["rating", "text"]);
    }

    #[test]
    fn from_json() {
        let json = r#"{
            "types": [
                {"name": "Customer", "indexed": true, "read": ["orders[].total"]},
                {"name": "Book", "indexed": true,
                 "other": [{"type": "Review", "inverse_path": "book", "used": ["rating"]}]}
            ],
            "inverses": [
                {"owner": "Customer", "path": "orders", "inverse_owner": "Order", "inverse_path": "customer"}
            ]
        }"#;
        let declarations: MappingDeclarations = serde_json::from_str(json).unwrap();
        assert_eq!(declarations.types().len(), 2);
        assert!(declarations.types()[0].embed.is_empty());
        assert_eq!(declarations.inverses()[0].inverse_path, "customer");
        assert_eq!(declarations.types()[1].other_entities[0].used_paths, vec!["rating"]);
    }
}
