//! Resolve command implementation.

use crate::files::{load_graph, load_mapping};
use entidex_core::{DirtyPaths, ResolverConfig};
use entidex_model::{ObjectAccess, ObjectId};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// What changed.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    /// Id of the changed object in the graph file.
    pub object: u64,
    /// Changed paths; empty means unknown.
    pub dirty: Vec<String>,
    /// Whether the object was deleted.
    pub delete: bool,
}

/// Resolution result.
#[derive(Debug, Serialize)]
pub struct ResolveReport {
    /// Runtime type of the changed object.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Id of the changed object.
    pub object: u64,
    /// Whether the object was deleted.
    pub delete: bool,
    /// Changed paths, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dirty: Option<Vec<String>>,
    /// Entities whose documents must be rebuilt, sorted.
    pub entities: Vec<ReportedEntity>,
}

/// One entity to reindex.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ReportedEntity {
    /// Exact runtime type.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Identifier.
    pub id: String,
}

/// Runs the resolve command.
pub fn run(
    mapping_path: &Path,
    graph_path: &Path,
    request: &ResolveRequest,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Resolving object {} of {:?}", request.object, graph_path);
    let report = resolve(mapping_path, graph_path, request)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => {
            let change = if report.delete { "deleted" } else { "updated" };
            println!("{}(#{}) {}", report.type_name, report.object, change);
            if let Some(dirty) = &report.dirty {
                println!("Dirty paths: {}", dirty.join(", "));
            }
            println!("{} entities to reindex", report.entities.len());
            for entity in &report.entities {
                println!("  {}({})", entity.type_name, entity.id);
            }
        }
    }
    Ok(())
}

/// Loads both files and resolves the entities to reindex.
pub fn resolve(
    mapping_path: &Path,
    graph_path: &Path,
    request: &ResolveRequest,
) -> Result<ResolveReport, Box<dyn std::error::Error>> {
    let mapping = load_mapping(mapping_path)?;
    let graph = load_graph(graph_path, mapping.model.clone())?;
    let registry = mapping.registry(ResolverConfig::default())?;

    let object = ObjectId::new(request.object);
    let type_name = graph.runtime_type(object)?.to_string();
    let dirty: Option<DirtyPaths> = if request.dirty.is_empty() {
        None
    } else {
        Some(request.dirty.iter().map(String::as_str).collect())
    };

    let result = if request.delete {
        registry.resolve_entities_to_reindex_on_delete(&graph, object)?
    } else {
        registry.resolve_entities_to_reindex(&graph, object, dirty.as_ref())?
    };

    Ok(ResolveReport {
        type_name,
        object: request.object,
        delete: request.delete,
        dirty: dirty.map(|d| d.iter().map(str::to_string).collect()),
        entities: result
            .sorted()
            .into_iter()
            .map(|reference| ReportedEntity {
                type_name: reference.type_name.to_string(),
                id: reference.identity.to_string(),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use entidex_testkit::{shop, TempFiles};
    use serde_json::json;
    use std::path::PathBuf;

    fn shop_files(files: &TempFiles) -> (PathBuf, PathBuf) {
        let mapping = files.write_json("mapping.json", &shop().mapping_json());
        let graph = files.write_json(
            "graph.json",
            &json!({
                "objects": [
                    { "id": 1, "type": "Customer", "fields": { "id": "C42", "orders": [{ "$ref": 2 }, { "$ref": 3 }] } },
                    { "id": 2, "type": "Order", "fields": { "id": 7, "customer": { "$ref": 1 }, "total": 10 } },
                    { "id": 3, "type": "Order", "fields": { "id": 8, "customer": { "$ref": 1 }, "total": 20 } }
                ]
            }),
        );
        (mapping, graph)
    }

    fn entity(type_name: &str, id: &str) -> ReportedEntity {
        ReportedEntity {
            type_name: type_name.to_string(),
            id: id.to_string(),
        }
    }

    #[test]
    fn resolves_update_with_dirty_paths() {
        let files = TempFiles::new();
        let (mapping, graph) = shop_files(&files);
        let request = ResolveRequest {
            object: 2,
            dirty: vec!["total".to_string()],
            delete: false,
        };

        let report = resolve(&mapping, &graph, &request).unwrap();
        assert_eq!(report.type_name, "Order");
        assert_eq!(report.entities, vec![entity("Customer", "C42")]);
    }

    #[test]
    fn unknown_dirtiness_includes_the_order_itself() {
        let files = TempFiles::new();
        let (mapping, graph) = shop_files(&files);
        let request = ResolveRequest {
            object: 2,
            dirty: Vec::new(),
            delete: false,
        };

        let report = resolve(&mapping, &graph, &request).unwrap();
        assert!(report.dirty.is_none());
        assert_eq!(
            report.entities,
            vec![entity("Customer", "C42"), entity("Order", "7")]
        );
    }

    #[test]
    fn resolves_delete() {
        let files = TempFiles::new();
        let (mapping, graph) = shop_files(&files);
        let request = ResolveRequest {
            object: 1,
            dirty: Vec::new(),
            delete: true,
        };

        let report = resolve(&mapping, &graph, &request).unwrap();
        assert_eq!(
            report.entities,
            vec![
                entity("Customer", "C42"),
                entity("Order", "7"),
                entity("Order", "8"),
            ]
        );
    }

    #[test]
    fn missing_object_is_an_error() {
        let files = TempFiles::new();
        let (mapping, graph) = shop_files(&files);
        let request = ResolveRequest {
            object: 99,
            dirty: Vec::new(),
            delete: false,
        };
        assert!(resolve(&mapping, &graph, &request).is_err());
    }
}
