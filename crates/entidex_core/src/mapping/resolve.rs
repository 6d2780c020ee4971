//! Resolution of parsed paths against the type model.

use crate::path::PropertyPath;
use entidex_model::{ContainerKind, TypeModelProvider, TypeName, ValueType};

/// A path step resolved against the type model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedStep {
    /// Static type the property is read on.
    pub owner: TypeName,
    /// Property name.
    pub property: String,
    /// Extractors applied to the property value, explicit and implicit.
    pub extractors: Vec<ContainerKind>,
    /// Narrowing cast applied after extraction.
    pub cast: Option<TypeName>,
    /// Static type of the values produced by this step.
    pub element: ValueType,
}

/// What the last step of a path must produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PathEnd {
    /// Any value; containers are left as they are.
    Any,
    /// Object references; containers are unwrapped.
    Object,
}

/// Resolves `path` starting from `owner`.
///
/// Non-final steps whose value is a container are unwrapped with default
/// extractors. Errors are plain reasons; callers attach the path.
pub(crate) fn resolve_path(
    provider: &dyn TypeModelProvider,
    owner: &TypeName,
    path: &PropertyPath,
    end: PathEnd,
) -> Result<Vec<ResolvedStep>, String> {
    let steps = path.steps();
    let mut current = owner.clone();
    let mut resolved = Vec::with_capacity(steps.len());

    for (i, step) in steps.iter().enumerate() {
        let last = i + 1 == steps.len();
        let property = provider
            .property(&current, &step.property)
            .ok_or_else(|| format!("type {current} has no property '{}'", step.property))?;

        let mut element = property.value_type.clone();
        let mut extractors = Vec::new();
        for explicit in &step.extractors {
            let kind = match explicit {
                Some(kind) => *kind,
                None => element.default_extractor().ok_or_else(|| {
                    format!("'{}' of type {element} is not a container", step.property)
                })?,
            };
            element = element
                .extract(kind)
                .cloned()
                .ok_or_else(|| format!("cannot extract {kind} elements from {element}"))?;
            extractors.push(kind);
        }
        if !last || end == PathEnd::Object || step.cast.is_some() {
            while let Some(kind) = element.default_extractor() {
                let Some(inner) = element.extract(kind).cloned() else {
                    break;
                };
                element = inner;
                extractors.push(kind);
            }
        }

        if let Some(cast) = &step.cast {
            let declared = element
                .as_object()
                .ok_or_else(|| format!("cannot cast a {element} value to {cast}"))?;
            if provider.descriptor(cast).is_none() {
                return Err(format!("unknown cast type {cast}"));
            }
            if !provider.is_assignable(cast, declared) {
                return Err(format!("{cast} is not a subtype of {declared}"));
            }
            element = ValueType::Object(cast.clone());
        }

        if let Some(target) = element.as_object() {
            if provider.descriptor(target).is_none() {
                return Err(format!("'{}' refers to unknown type {target}", step.property));
            }
        }

        let next = if last {
            if end == PathEnd::Object && element.as_object().is_none() {
                return Err(format!(
                    "'{}' must lead to objects, found {element}",
                    step.property
                ));
            }
            None
        } else {
            Some(
                element
                    .as_object()
                    .ok_or_else(|| {
                        format!("cannot navigate past '{}' of type {element}", step.property)
                    })?
                    .clone(),
            )
        };

        resolved.push(ResolvedStep {
            owner: current.clone(),
            property: step.property.clone(),
            extractors,
            cast: step.cast.clone(),
            element,
        });
        if let Some(next) = next {
            current = next;
        }
    }

    Ok(resolved)
}

/// Property names of resolved steps, joined with `.`.
pub(crate) fn step_names(steps: &[ResolvedStep]) -> String {
    steps
        .iter()
        .map(|s| s.property.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use entidex_model::{TypeDescriptor, TypeModel};

    fn model() -> TypeModel {
        TypeModel::new(vec![
            TypeDescriptor::entity("Party").abstract_type(),
            TypeDescriptor::entity("Customer")
                .extends("Party")
                .property("orders", ValueType::list(ValueType::object("Order")))
                .property("address", ValueType::object("Address"))
                .property(
                    "tags",
                    ValueType::map(ValueType::text(), ValueType::list(ValueType::object("Tag"))),
                ),
            TypeDescriptor::entity("Supplier").extends("Party"),
            TypeDescriptor::entity("Order")
                .property("customer", ValueType::object("Party"))
                .property("total", ValueType::integer()),
            TypeDescriptor::embeddable("Address").property("city", ValueType::text()),
            TypeDescriptor::embeddable("Tag").property("label", ValueType::text()),
        ])
        .unwrap()
    }

    fn resolve(owner: &str, path: &str, end: PathEnd) -> Result<Vec<ResolvedStep>, String> {
        let model = model();
        resolve_path(
            &model,
            &TypeName::new(owner),
            &PropertyPath::parse(path).unwrap(),
            end,
        )
    }

    #[test]
    fn implicit_extraction_on_intermediate_steps() {
        let steps = resolve("Customer", "orders.total", PathEnd::Any).unwrap();
        assert_eq!(steps[0].extractors, vec![ContainerKind::List]);
        assert_eq!(steps[0].element, ValueType::object("Order"));
        assert_eq!(steps[1].owner, TypeName::new("Order"));
        assert_eq!(steps[1].element, ValueType::integer());
    }

    #[test]
    fn final_container_kept_unless_objects_required() {
        let any = resolve("Customer", "orders", PathEnd::Any).unwrap();
        assert!(any[0].extractors.is_empty());
        let object = resolve("Customer", "orders", PathEnd::Object).unwrap();
        assert_eq!(object[0].element, ValueType::object("Order"));
    }

    #[test]
    fn map_default_extractor_then_nested_list() {
        let steps = resolve("Customer", "tags[].label", PathEnd::Any).unwrap();
        assert_eq!(
            steps[0].extractors,
            vec![ContainerKind::MapValues, ContainerKind::List]
        );
    }

    #[test]
    fn explicit_key_extraction() {
        let steps = resolve("Customer", "tags[keys]", PathEnd::Any).unwrap();
        assert_eq!(steps[0].element, ValueType::text());
    }

    #[test]
    fn cast_to_subtype() {
        let steps = resolve("Order", "customer<Customer>.address.city", PathEnd::Any).unwrap();
        assert_eq!(steps[0].element, ValueType::object("Customer"));
        assert_eq!(steps[1].owner, TypeName::new("Customer"));
    }

    #[test]
    fn rejects_bad_paths() {
        assert!(resolve("Order", "totl", PathEnd::Any)
            .unwrap_err()
            .contains("no property 'totl'"));
        assert!(resolve("Order", "total.digits", PathEnd::Any).is_err());
        assert!(resolve("Order", "customer<Order>", PathEnd::Any).is_err());
        assert!(resolve("Order", "customer.address", PathEnd::Any).is_err());
        assert!(resolve("Order", "total[]", PathEnd::Any).is_err());
        assert!(resolve("Order", "total", PathEnd::Object).is_err());
        assert!(resolve("Customer", "orders[set]", PathEnd::Any).is_err());
    }

    #[test]
    fn names_skip_syntax() {
        let steps = resolve("Customer", "orders[].total", PathEnd::Any).unwrap();
        assert_eq!(step_names(&steps), "orders.total");
    }
}
