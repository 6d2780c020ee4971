//! Mapping and object graph files.
//!
//! A mapping file holds the type model and the dependency declarations:
//!
//! ```json
//! { "types": [ ...type descriptors... ], "mapping": { ...declarations... } }
//! ```
//!
//! A graph file lists domain objects by numeric id. `{"$ref": n}` refers to
//! object `n`; JSON arrays become lists.
//!
//! ```json
//! { "objects": [ { "id": 1, "type": "Customer", "fields": { "id": "C42" } } ] }
//! ```

use entidex_core::{CoreError, MappingDeclarations, ResolverConfig, ResolverRegistry};
use entidex_model::{ModelError, ObjectGraph, ObjectId, TypeDescriptor, TypeModel, Value};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading input files.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid JSON of the expected shape.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// A field value has no counterpart in the object model.
    #[error("object {object}, field '{field}': {message}")]
    InvalidValue {
        /// Object id in the graph file.
        object: u64,
        /// Field name.
        field: String,
        /// What is wrong.
        message: String,
    },

    /// The type model or the graph is invalid.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The declarations are invalid.
    #[error(transparent)]
    Core(#[from] CoreError),
}

#[derive(Debug, Deserialize)]
struct MappingFile {
    types: Vec<TypeDescriptor>,
    #[serde(default)]
    mapping: MappingDeclarations,
}

#[derive(Debug, Deserialize)]
struct GraphFile {
    objects: Vec<ObjectRecord>,
}

#[derive(Debug, Deserialize)]
struct ObjectRecord {
    id: u64,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    fields: serde_json::Map<String, serde_json::Value>,
}

/// A type model with its dependency declarations.
#[derive(Debug)]
pub struct LoadedMapping {
    /// Number of declared types.
    pub type_count: usize,
    /// The validated type model.
    pub model: Arc<TypeModel>,
    /// The dependency declarations.
    pub declarations: MappingDeclarations,
}

impl LoadedMapping {
    /// Bootstraps a resolver registry from this mapping.
    pub fn registry(&self, config: ResolverConfig) -> Result<ResolverRegistry, LoadError> {
        let provider = Arc::clone(&self.model);
        Ok(ResolverRegistry::bootstrap(
            provider,
            &self.declarations,
            config,
        )?)
    }
}

fn read(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse<T: for<'de> Deserialize<'de>>(path: &Path, text: &str) -> Result<T, LoadError> {
    serde_json::from_str(text).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads a mapping file.
pub fn load_mapping(path: &Path) -> Result<LoadedMapping, LoadError> {
    let file: MappingFile = parse(path, &read(path)?)?;
    let type_count = file.types.len();
    let model = TypeModel::new(file.types)?;
    debug!(path = %path.display(), types = type_count, "loaded mapping");
    Ok(LoadedMapping {
        type_count,
        model: Arc::new(model),
        declarations: file.mapping,
    })
}

/// Loads a graph file over `model`.
pub fn load_graph(path: &Path, model: Arc<TypeModel>) -> Result<ObjectGraph, LoadError> {
    let file: GraphFile = parse(path, &read(path)?)?;
    let mut graph = ObjectGraph::new(model);
    for record in &file.objects {
        let mut fields = Vec::with_capacity(record.fields.len());
        for (name, json) in &record.fields {
            let value = json_to_value(json).map_err(|message| LoadError::InvalidValue {
                object: record.id,
                field: name.clone(),
                message,
            })?;
            fields.push((name.as_str(), value));
        }
        graph.insert_with_id(ObjectId::new(record.id), record.type_name.as_str(), fields)?;
    }
    debug!(path = %path.display(), objects = graph.len(), "loaded graph");
    Ok(graph)
}

fn json_to_value(json: &serde_json::Value) -> Result<Value, String> {
    use serde_json::Value as Json;

    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => Value::Integer(
            n.as_i64()
                .ok_or_else(|| format!("{n} is not a 64-bit integer"))?,
        ),
        Json::String(s) => Value::Text(s.clone()),
        Json::Array(items) => Value::List(
            items
                .iter()
                .map(json_to_value)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Json::Object(map) => match (map.len(), map.get("$ref")) {
            (1, Some(target)) => {
                let id = target
                    .as_u64()
                    .ok_or_else(|| format!("$ref must be an object id, found {target}"))?;
                Value::Ref(ObjectId::new(id))
            }
            _ => return Err("only {\"$ref\": id} objects are supported".to_string()),
        },
    })
}
