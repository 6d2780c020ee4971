//! Check command implementation.

use crate::files::{load_mapping, LoadedMapping};
use entidex_core::{ResolverConfig, ResolverRegistry};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Mapping check result.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    /// Mapping file path.
    pub path: String,
    /// Number of declared types.
    pub types: usize,
    /// Indexed concrete types.
    pub indexed: Vec<String>,
    /// Number of compiled triggers.
    pub triggers: usize,
    /// Number of compiled embedding edges.
    pub edges: usize,
    /// Relevant dirty paths per concrete entity type.
    pub resolvers: Vec<ResolverSummary>,
}

/// Summary of one compiled resolver.
#[derive(Debug, Serialize)]
pub struct ResolverSummary {
    /// Concrete entity type.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Number of nodes in the compiled tree.
    pub nodes: usize,
    /// Dirty paths that can trigger reindexing.
    pub relevant_paths: Vec<String>,
}

/// Runs the check command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    info!("Checking mapping {:?}", path);
    let mapping = load_mapping(path)?;
    let report = report(path, &mapping)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_text(&report),
    }
    Ok(())
}

/// Bootstraps `mapping` with every resolver built and summarizes the result.
pub fn report(path: &Path, mapping: &LoadedMapping) -> Result<CheckReport, Box<dyn std::error::Error>> {
    let registry: ResolverRegistry = mapping.registry(ResolverConfig::new().eager_build(true))?;
    let compiled = registry.mapping();

    let mut resolvers = Vec::new();
    for type_name in compiled.concrete_types() {
        if !registry.provider().is_entity(type_name) {
            continue;
        }
        let resolver = registry.resolver_for(type_name)?;
        resolvers.push(ResolverSummary {
            type_name: type_name.to_string(),
            nodes: resolver.graph().len(),
            relevant_paths: resolver.relevant_paths().to_vec(),
        });
    }

    Ok(CheckReport {
        path: path.display().to_string(),
        types: mapping.type_count,
        indexed: compiled
            .indexed_types()
            .iter()
            .map(ToString::to_string)
            .collect(),
        triggers: compiled.triggers().len(),
        edges: compiled.edges().len(),
        resolvers,
    })
}

fn print_text(report: &CheckReport) {
    println!("Mapping OK: {}", report.path);
    println!();
    println!("Types:           {}", report.types);
    println!("Indexed types:   {}", report.indexed.join(", "));
    println!("Triggers:        {}", report.triggers);
    println!("Embedding edges: {}", report.edges);
    println!();
    println!("Resolvers:");
    for resolver in &report.resolvers {
        if resolver.relevant_paths.is_empty() {
            println!("  {} ({} nodes): no relevant paths", resolver.type_name, resolver.nodes);
        } else {
            println!(
                "  {} ({} nodes): {}",
                resolver.type_name,
                resolver.nodes,
                resolver.relevant_paths.join(", ")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entidex_testkit::{shop, TempFiles};

    #[test]
    fn report_lists_every_entity_resolver() {
        let files = TempFiles::new();
        let path = files.write_json("mapping.json", &shop().mapping_json());
        let mapping = load_mapping(&path).unwrap();

        let report = report(&path, &mapping).unwrap();
        assert_eq!(report.indexed, vec!["Customer", "Order"]);
        let types: Vec<&str> = report.resolvers.iter().map(|r| r.type_name.as_str()).collect();
        assert_eq!(types, vec!["Customer", "Supplier", "Order", "Invoice"]);

        let order = &report.resolvers[2];
        assert!(order.relevant_paths.contains(&"total".to_string()));
        assert!(!order.relevant_paths.contains(&"shippingNote".to_string()));
    }
}
