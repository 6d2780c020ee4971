//! In-memory graph of mutable domain objects.
//!
//! Objects refer to each other through [`Value::Ref`], so bidirectional
//! associations and self-referential structures are plain data: no
//! reference counting cycles, and object identity is the [`ObjectId`].

use crate::error::{ModelError, ModelResult};
use crate::model::{TypeModel, TypeModelProvider};
use crate::types::TypeName;
use crate::value::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Instance identity of a domain object within one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Creates an object id from its raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How an object is identified for reindexing purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectIdentity {
    /// The value of the declared identifier property.
    Id(Value),
    /// The instance itself (no identifier declared, or not assigned yet).
    Instance(ObjectId),
}

impl fmt::Display for ObjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(value) => write!(f, "{value}"),
            Self::Instance(id) => write!(f, "{id}"),
        }
    }
}

/// Read-only, reflection-like access to live objects.
pub trait ObjectAccess {
    /// Returns the exact runtime type of an object.
    fn runtime_type(&self, object: ObjectId) -> ModelResult<&TypeName>;

    /// Reads a property; unset properties read as [`Value::Null`].
    ///
    /// Reading a property the runtime type does not declare is an error.
    fn read_property(&self, object: ObjectId, property: &str) -> ModelResult<&Value>;
}

static NULL: Value = Value::Null;

/// A domain object: a runtime type and its property values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainObject {
    type_name: TypeName,
    properties: BTreeMap<String, Value>,
}

impl DomainObject {
    /// The exact runtime type.
    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// Returns a property value if it was set.
    pub fn get(&self, property: &str) -> Option<&Value> {
        self.properties.get(property)
    }

    /// Iterates over set properties.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Arena of domain objects validated against a [`TypeModel`].
pub struct ObjectGraph {
    model: Arc<TypeModel>,
    objects: HashMap<ObjectId, DomainObject>,
    next_id: u64,
}

impl fmt::Debug for ObjectGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectGraph")
            .field("objects", &self.objects.len())
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

impl ObjectGraph {
    /// Creates an empty graph.
    pub fn new(model: Arc<TypeModel>) -> Self {
        Self {
            model,
            objects: HashMap::new(),
            next_id: 1,
        }
    }

    /// The type model objects are validated against.
    pub fn model(&self) -> &Arc<TypeModel> {
        &self.model
    }

    /// Creates an object of a concrete type with initial property values.
    pub fn insert<'a>(
        &mut self,
        type_name: impl Into<TypeName>,
        properties: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> ModelResult<ObjectId> {
        let id = ObjectId::new(self.next_id);
        self.insert_with_id(id, type_name, properties)?;
        Ok(id)
    }

    /// Creates an object under a caller-chosen id.
    pub fn insert_with_id<'a>(
        &mut self,
        id: ObjectId,
        type_name: impl Into<TypeName>,
        properties: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> ModelResult<()> {
        let type_name = type_name.into();
        let descriptor = self
            .model
            .descriptor(&type_name)
            .ok_or_else(|| ModelError::unknown_type(type_name.as_str()))?;
        if descriptor.is_abstract {
            return Err(ModelError::AbstractType {
                name: type_name.to_string(),
            });
        }
        if self.objects.contains_key(&id) {
            return Err(ModelError::DuplicateObject(id));
        }

        let mut object = DomainObject {
            type_name,
            properties: BTreeMap::new(),
        };
        for (name, value) in properties {
            self.check_property(&object.type_name, name)?;
            object.properties.insert(name.to_string(), value);
        }

        self.objects.insert(id, object);
        self.next_id = self.next_id.max(id.as_u64() + 1);
        Ok(())
    }

    /// Sets a property, returning the previous value.
    pub fn set(
        &mut self,
        object: ObjectId,
        property: &str,
        value: impl Into<Value>,
    ) -> ModelResult<Value> {
        let type_name = self.runtime_type(object)?.clone();
        self.check_property(&type_name, property)?;
        let target = self
            .objects
            .get_mut(&object)
            .ok_or(ModelError::UnknownObject(object))?;
        Ok(target
            .properties
            .insert(property.to_string(), value.into())
            .unwrap_or(Value::Null))
    }

    /// Appends an element to a list, set or array property.
    pub fn push(&mut self, object: ObjectId, property: &str, element: Value) -> ModelResult<()> {
        let current = self.read_property(object, property)?.clone();
        let updated = match current {
            Value::Null => Value::List(vec![element]),
            Value::List(mut items) => {
                items.push(element);
                Value::List(items)
            }
            Value::Set(mut items) => {
                if !items.contains(&element) {
                    items.push(element);
                }
                Value::Set(items)
            }
            Value::Array(mut items) => {
                items.push(element);
                Value::Array(items)
            }
            other => {
                return Err(ModelError::ContainerMismatch {
                    expected: "list".to_string(),
                    found: other.shape().to_string(),
                })
            }
        };
        self.set(object, property, updated)?;
        Ok(())
    }

    /// Returns an object.
    pub fn get(&self, object: ObjectId) -> Option<&DomainObject> {
        self.objects.get(&object)
    }

    /// Removes an object; references to it become dangling.
    pub fn remove(&mut self, object: ObjectId) -> Option<DomainObject> {
        self.objects.remove(&object)
    }

    /// Returns true if the object exists.
    pub fn contains(&self, object: ObjectId) -> bool {
        self.objects.contains_key(&object)
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns true if the graph holds no object.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterates over object ids, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects.keys().copied()
    }

    fn check_property(&self, type_name: &TypeName, property: &str) -> ModelResult<()> {
        if self.model.property(type_name, property).is_none() {
            return Err(ModelError::unknown_property(type_name.as_str(), property));
        }
        Ok(())
    }
}

impl ObjectAccess for ObjectGraph {
    fn runtime_type(&self, object: ObjectId) -> ModelResult<&TypeName> {
        self.objects
            .get(&object)
            .map(|o| &o.type_name)
            .ok_or(ModelError::UnknownObject(object))
    }

    fn read_property(&self, object: ObjectId, property: &str) -> ModelResult<&Value> {
        let target = self
            .objects
            .get(&object)
            .ok_or(ModelError::UnknownObject(object))?;
        self.check_property(&target.type_name, property)?;
        Ok(target.properties.get(property).unwrap_or(&NULL))
    }
}
