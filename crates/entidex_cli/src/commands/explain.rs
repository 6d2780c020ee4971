//! Explain command implementation.

use crate::files::{load_mapping, LoadedMapping};
use entidex_core::ResolverConfig;
use entidex_model::TypeName;
use std::path::Path;
use tracing::info;

/// Runs the explain command.
pub fn run(
    path: &Path,
    type_name: Option<&str>,
    no_filters: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Explaining resolvers of {:?}", path);
    let mapping = load_mapping(path)?;
    for text in explain(&mapping, type_name, no_filters)? {
        println!("{text}");
    }
    Ok(())
}

/// Renders the resolver of `type_name`, or of every concrete entity type.
pub fn explain(
    mapping: &LoadedMapping,
    type_name: Option<&str>,
    no_filters: bool,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let config = ResolverConfig::new().dirtiness_filtering(!no_filters);
    let registry = mapping.registry(config)?;

    let types: Vec<TypeName> = match type_name {
        Some(name) => vec![TypeName::new(name)],
        None => registry
            .mapping()
            .concrete_types()
            .iter()
            .filter(|t| registry.provider().is_entity(t))
            .cloned()
            .collect(),
    };

    let mut rendered = Vec::with_capacity(types.len());
    for type_name in &types {
        rendered.push(registry.explain(type_name)?);
    }
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use entidex_testkit::{category_tree, shop, TempFiles};

    #[test]
    fn explains_one_type() {
        let files = TempFiles::new();
        let path = files.write_json("mapping.json", &shop().mapping_json());
        let mapping = load_mapping(&path).unwrap();

        let texts = explain(&mapping, Some("Order"), false).unwrap();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].starts_with("resolver for Order"));
        assert!(texts[0].contains("if dirty:"));

        let unfiltered = explain(&mapping, Some("Order"), true).unwrap();
        assert!(!unfiltered[0].contains("if dirty:"));
    }

    #[test]
    fn explains_recursive_embedding_with_back_references() {
        let files = TempFiles::new();
        let path = files.write_json("mapping.json", &category_tree().mapping_json());
        let mapping = load_mapping(&path).unwrap();

        let texts = explain(&mapping, None, false).unwrap();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("(see"));
    }

    #[test]
    fn unknown_types_are_errors() {
        let files = TempFiles::new();
        let path = files.write_json("mapping.json", &shop().mapping_json());
        let mapping = load_mapping(&path).unwrap();
        assert!(explain(&mapping, Some("Ghost"), false).is_err());
    }
}
