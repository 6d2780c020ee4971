//! Type model registry and the provider interface consumed by the resolver core.

use crate::error::{ModelError, ModelResult};
use crate::graph::{ObjectAccess, ObjectId, ObjectIdentity};
use crate::types::{PropertyDescriptor, TypeDescriptor, TypeName};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Type metadata and safe runtime casts.
///
/// Implementations must be deterministic for the lifetime of a mapping:
/// the resolver core compiles its trees from this information once.
pub trait TypeModelProvider: Send + Sync {
    /// Returns the descriptor of a type.
    fn descriptor(&self, name: &TypeName) -> Option<&TypeDescriptor>;

    /// Returns all properties of a type, inherited ones included.
    fn properties_of(&self, name: &TypeName) -> ModelResult<Vec<&PropertyDescriptor>>;

    /// Looks up a property on a type or its supertypes.
    fn property(&self, owner: &TypeName, property: &str) -> Option<&PropertyDescriptor>;

    /// Returns the type itself followed by all of its transitive supertypes.
    fn supertypes_of(&self, name: &TypeName) -> ModelResult<&[TypeName]>;

    /// Returns all transitive subtypes of a type, excluding the type itself.
    fn subtypes_of(&self, name: &TypeName) -> ModelResult<&[TypeName]>;

    /// Returns every known type name, in declaration order.
    fn type_names(&self) -> Vec<TypeName>;

    /// Returns true if values of `sub` can be used where `sup` is expected.
    fn is_assignable(&self, sub: &TypeName, sup: &TypeName) -> bool {
        self.supertypes_of(sub)
            .map(|supers| supers.contains(sup))
            .unwrap_or(false)
    }

    /// Returns true if the type is an entity.
    fn is_entity(&self, name: &TypeName) -> bool {
        self.descriptor(name).is_some_and(TypeDescriptor::is_entity)
    }

    /// Narrows `object` to `target`, or returns `None` if its runtime type does not fit.
    ///
    /// A mismatch is never an error; only a dangling object id is.
    fn cast_or_none(
        &self,
        access: &dyn ObjectAccess,
        object: ObjectId,
        target: &TypeName,
    ) -> ModelResult<Option<ObjectId>> {
        let runtime = access.runtime_type(object)?;
        Ok(self.is_assignable(runtime, target).then_some(object))
    }

    /// Returns the identity of an object: its declared identifier when set,
    /// its instance identity otherwise.
    ///
    /// The identifier may be declared on the runtime type or inherited from
    /// the nearest supertype that declares one.
    fn identity_of(
        &self,
        access: &dyn ObjectAccess,
        object: ObjectId,
    ) -> ModelResult<ObjectIdentity> {
        let runtime = access.runtime_type(object)?;
        let mut id_property = None;
        for name in self.supertypes_of(runtime)? {
            let descriptor = self
                .descriptor(name)
                .ok_or_else(|| ModelError::unknown_type(name.as_str()))?;
            if let Some(property) = descriptor.id_property() {
                id_property = Some(property);
                break;
            }
        }
        if let Some(id_property) = id_property {
            let value = access.read_property(object, id_property)?;
            if !value.is_null() {
                return Ok(ObjectIdentity::Id(value.clone()));
            }
        }
        Ok(ObjectIdentity::Instance(object))
    }
}

/// Serializable list of type descriptors, as found in mapping files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeModelSpec {
    /// The declared types.
    pub types: Vec<TypeDescriptor>,
}

struct TypeEntry {
    descriptor: TypeDescriptor,
    /// Self first, then its transitive supertypes.
    ancestors: Vec<TypeName>,
    /// Transitive subtypes.
    descendants: Vec<TypeName>,
    /// Own properties first, then inherited ones not overridden.
    properties: Vec<PropertyDescriptor>,
}

/// In-memory, validated type registry.
pub struct TypeModel {
    entries: HashMap<TypeName, TypeEntry>,
    order: Vec<TypeName>,
}

impl TypeModel {
    /// Validates descriptors and computes the inheritance closure.
    pub fn new(descriptors: Vec<TypeDescriptor>) -> ModelResult<Self> {
        let mut by_name: HashMap<TypeName, TypeDescriptor> = HashMap::new();
        let mut order = Vec::with_capacity(descriptors.len());

        for descriptor in descriptors {
            let mut seen = HashSet::new();
            for property in &descriptor.properties {
                if !seen.insert(property.name.as_str()) {
                    return Err(ModelError::DuplicateProperty {
                        type_name: descriptor.name.to_string(),
                        property: property.name.clone(),
                    });
                }
            }
            if by_name.contains_key(&descriptor.name) {
                return Err(ModelError::DuplicateType {
                    name: descriptor.name.to_string(),
                });
            }
            order.push(descriptor.name.clone());
            by_name.insert(descriptor.name.clone(), descriptor);
        }

        for descriptor in by_name.values() {
            for supertype in &descriptor.supertypes {
                if !by_name.contains_key(supertype) {
                    return Err(ModelError::unknown_type(supertype.as_str()));
                }
            }
        }

        let mut ancestors: HashMap<TypeName, Vec<TypeName>> = HashMap::new();
        for name in &order {
            let mut visiting = Vec::new();
            compute_ancestors(name, &by_name, &mut ancestors, &mut visiting)?;
        }

        let mut descendants: HashMap<TypeName, Vec<TypeName>> = HashMap::new();
        for name in &order {
            for ancestor in ancestors[name].iter().skip(1) {
                descendants
                    .entry(ancestor.clone())
                    .or_default()
                    .push(name.clone());
            }
        }

        let mut entries = HashMap::with_capacity(order.len());
        for name in &order {
            let chain = ancestors.remove(name).unwrap_or_default();
            let mut properties: Vec<PropertyDescriptor> = Vec::new();
            for ancestor in &chain {
                for property in &by_name[ancestor].properties {
                    if !properties.iter().any(|p| p.name == property.name) {
                        properties.push(property.clone());
                    }
                }
            }
            let descriptor = by_name[name].clone();
            entries.insert(
                name.clone(),
                TypeEntry {
                    descriptor,
                    ancestors: chain,
                    descendants: descendants.remove(name).unwrap_or_default(),
                    properties,
                },
            );
        }

        Ok(Self { entries, order })
    }

    /// Builds a model from its serializable form.
    pub fn from_spec(spec: TypeModelSpec) -> ModelResult<Self> {
        Self::new(spec.types)
    }

    /// Number of declared types.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if no type is declared.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn entry(&self, name: &TypeName) -> ModelResult<&TypeEntry> {
        self.entries
            .get(name)
            .ok_or_else(|| ModelError::unknown_type(name.as_str()))
    }
}

fn compute_ancestors(
    name: &TypeName,
    by_name: &HashMap<TypeName, TypeDescriptor>,
    done: &mut HashMap<TypeName, Vec<TypeName>>,
    visiting: &mut Vec<TypeName>,
) -> ModelResult<()> {
    if done.contains_key(name) {
        return Ok(());
    }
    if visiting.contains(name) {
        return Err(ModelError::InheritanceCycle {
            name: name.to_string(),
        });
    }
    visiting.push(name.clone());

    let mut chain = vec![name.clone()];
    for supertype in &by_name[name].supertypes {
        compute_ancestors(supertype, by_name, done, visiting)?;
        for ancestor in &done[supertype] {
            if !chain.contains(ancestor) {
                chain.push(ancestor.clone());
            }
        }
    }

    visiting.pop();
    done.insert(name.clone(), chain);
    Ok(())
}

impl std::fmt::Debug for TypeModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeModel")
            .field("types", &self.order)
            .finish_non_exhaustive()
    }
}

impl TypeModelProvider for TypeModel {
    fn descriptor(&self, name: &TypeName) -> Option<&TypeDescriptor> {
        self.entries.get(name).map(|e| &e.descriptor)
    }

    fn properties_of(&self, name: &TypeName) -> ModelResult<Vec<&PropertyDescriptor>> {
        Ok(self.entry(name)?.properties.iter().collect())
    }

    fn property(&self, owner: &TypeName, property: &str) -> Option<&PropertyDescriptor> {
        self.entries
            .get(owner)?
            .properties
            .iter()
            .find(|p| p.name == property)
    }

    fn supertypes_of(&self, name: &TypeName) -> ModelResult<&[TypeName]> {
        Ok(&self.entry(name)?.ancestors)
    }

    fn subtypes_of(&self, name: &TypeName) -> ModelResult<&[TypeName]> {
        Ok(&self.entry(name)?.descendants)
    }

    fn type_names(&self) -> Vec<TypeName> {
        self.order.clone()
    }
}
