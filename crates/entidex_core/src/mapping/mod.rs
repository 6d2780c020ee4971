//! Mapping bootstrap.
//!
//! [`MappingModel::compile`] validates the dependency declarations against
//! the type model and reduces them to two kinds of facts:
//!
//! - [`Trigger`]s: which (type, dirty path) changes invalidate which
//!   objects' document parts, and how to reach those objects.
//! - [`EmbeddingEdge`]s: whose documents embed an entity's document part,
//!   and how to walk back to them.
//!
//! Every configuration error is raised here; nothing is deferred to runtime.

mod resolve;
mod trigger;

pub use resolve::ResolvedStep;
pub use trigger::{EmbeddingEdge, Hop, Trigger};

pub(crate) use trigger::Op;

use crate::declaration::{MappingDeclarations, TypeDeclarations};
use crate::error::{CoreError, CoreResult};
use crate::path::PropertyPath;
use entidex_model::{TypeModelProvider, TypeName};
use resolve::{resolve_path, step_names, PathEnd};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Validated, immutable reindexing metadata of a mapping.
#[derive(Debug)]
pub struct MappingModel {
    triggers: Vec<Trigger>,
    edges: Vec<EmbeddingEdge>,
    /// Concrete types with an index document.
    indexed: HashSet<TypeName>,
    /// Concrete types whose document part matters to some index.
    document_types: HashSet<TypeName>,
    /// Concrete types assignable to each type, in model order.
    concretes: HashMap<TypeName, Vec<TypeName>>,
    /// Every concrete type, in model order.
    concrete_order: Vec<TypeName>,
}

impl MappingModel {
    /// Validates `declarations` against the type model and compiles them.
    pub fn compile(
        provider: &dyn TypeModelProvider,
        declarations: &MappingDeclarations,
    ) -> CoreResult<Self> {
        let mut compiler = Compiler {
            provider,
            declarations,
            inverses: HashMap::new(),
            triggers: Vec::new(),
            edges: Vec::new(),
        };
        compiler.validate_types()?;
        compiler.register_inverses()?;
        for declaration in declarations.types() {
            if provider.is_entity(&declaration.name) {
                let mut stack = Vec::new();
                compiler.compile_type(&declaration.name, declaration, "", &mut stack)?;
            }
        }
        let Compiler {
            mut triggers,
            mut edges,
            ..
        } = compiler;

        let mut concretes = HashMap::new();
        let mut concrete_order = Vec::new();
        for name in provider.type_names() {
            if provider.descriptor(&name).is_some_and(|d| !d.is_abstract) {
                concrete_order.push(name.clone());
            }
            let mut assignable = Vec::new();
            for candidate in std::iter::once(&name).chain(provider.subtypes_of(&name)?) {
                if provider.descriptor(candidate).is_some_and(|d| !d.is_abstract) {
                    assignable.push(candidate.clone());
                }
            }
            concretes.insert(name, assignable);
        }

        let indexed: HashSet<TypeName> = concrete_order
            .iter()
            .filter(|c| {
                declarations
                    .types()
                    .iter()
                    .any(|d| d.indexed && provider.is_assignable(c, &d.name))
            })
            .cloned()
            .collect();

        let reaches_document = |landing: &TypeName, documents: &HashSet<TypeName>| {
            concretes
                .get(landing)
                .is_some_and(|types| types.iter().any(|t| documents.contains(t)))
        };
        let mut document_types = indexed.clone();
        loop {
            let mut grew = false;
            for concrete in &concrete_order {
                if document_types.contains(concrete) {
                    continue;
                }
                let embedded = edges.iter().any(|e| {
                    provider.is_assignable(concrete, &e.target)
                        && reaches_document(&e.landing, &document_types)
                });
                if embedded {
                    document_types.insert(concrete.clone());
                    grew = true;
                }
            }
            if !grew {
                break;
            }
        }

        let (trigger_count, edge_count) = (triggers.len(), edges.len());
        triggers.retain(|t| reaches_document(&t.landing, &document_types));
        edges.retain(|e| reaches_document(&e.landing, &document_types));
        debug!(
            triggers = trigger_count - triggers.len(),
            edges = edge_count - edges.len(),
            "discarded metadata that cannot reach any index"
        );
        info!(
            triggers = triggers.len(),
            edges = edges.len(),
            indexed = indexed.len(),
            "mapping compiled"
        );

        Ok(Self {
            triggers,
            edges,
            indexed,
            document_types,
            concretes,
            concrete_order,
        })
    }

    /// All triggers, in declaration order.
    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    /// All embedding edges, in declaration order.
    pub fn edges(&self) -> &[EmbeddingEdge] {
        &self.edges
    }

    /// Returns true if instances of this exact type have an index document.
    pub fn is_indexed(&self, concrete: &TypeName) -> bool {
        self.indexed.contains(concrete)
    }

    /// Indexed concrete types, sorted by name.
    pub fn indexed_types(&self) -> Vec<TypeName> {
        let mut types: Vec<_> = self.indexed.iter().cloned().collect();
        types.sort();
        types
    }

    /// Returns true if a change to the document part of an instance of this
    /// exact type can affect some index.
    pub fn has_document_part(&self, concrete: &TypeName) -> bool {
        self.document_types.contains(concrete)
    }

    /// Concrete types assignable to `type_name`, itself included.
    pub fn concrete_types_of(&self, type_name: &TypeName) -> &[TypeName] {
        self.concretes.get(type_name).map_or(&[], Vec::as_slice)
    }

    /// Every concrete type of the model.
    pub fn concrete_types(&self) -> &[TypeName] {
        &self.concrete_order
    }
}

struct InverseSide {
    owner: TypeName,
    path: PropertyPath,
}

impl InverseSide {
    fn describe(&self) -> String {
        format!("{}.{}", self.owner, self.path)
    }
}

struct Compiler<'a> {
    provider: &'a dyn TypeModelProvider,
    declarations: &'a MappingDeclarations,
    /// (owner, forward property names) to the declared inverse side.
    inverses: HashMap<(TypeName, String), InverseSide>,
    triggers: Vec<Trigger>,
    edges: Vec<EmbeddingEdge>,
}

impl Compiler<'_> {
    fn validate_types(&self) -> CoreResult<()> {
        for declaration in self.declarations.types() {
            let name = &declaration.name;
            self.require_type(name)?;
            let entity = self.provider.is_entity(name);
            if declaration.indexed && !entity {
                return Err(CoreError::not_an_entity(name.as_str(), "indexed"));
            }
            if !declaration.other_entities.is_empty() && !entity {
                return Err(CoreError::not_an_entity(
                    name.as_str(),
                    "the target of an other-entity dependency",
                ));
            }
            for other in &declaration.other_entities {
                self.require_type(&other.other_type)?;
                if !self.provider.is_entity(&other.other_type) {
                    return Err(CoreError::not_an_entity(
                        other.other_type.as_str(),
                        "the source of an other-entity dependency",
                    ));
                }
            }
        }
        Ok(())
    }

    fn require_type(&self, name: &TypeName) -> CoreResult<()> {
        if self.provider.descriptor(name).is_none() {
            return Err(CoreError::unknown_type(name.as_str()));
        }
        Ok(())
    }

    fn register_inverses(&mut self) -> CoreResult<()> {
        for declaration in self.declarations.inverses() {
            self.register_inverse(
                &declaration.owner,
                &declaration.path,
                &declaration.inverse_owner,
                &declaration.inverse_path,
            )?;
            self.register_inverse(
                &declaration.inverse_owner,
                &declaration.inverse_path,
                &declaration.owner,
                &declaration.path,
            )?;
        }
        Ok(())
    }

    fn register_inverse(
        &mut self,
        owner: &TypeName,
        path: &str,
        inverse_owner: &TypeName,
        inverse_path: &str,
    ) -> CoreResult<()> {
        self.require_type(owner)?;
        let forward = self.parse(owner, path)?;
        resolve_path(self.provider, owner, &forward, PathEnd::Object)
            .map_err(|reason| CoreError::invalid_path(owner.as_str(), path, reason))?;

        let side = InverseSide {
            owner: inverse_owner.clone(),
            path: self.parse(inverse_owner, inverse_path)?,
        };
        let key = (owner.clone(), forward.property_names());
        if let Some(existing) = self.inverses.get(&key) {
            if existing.owner != side.owner || existing.path != side.path {
                return Err(CoreError::ContradictoryInverse {
                    owner: owner.to_string(),
                    path: key.1,
                    first: existing.describe(),
                    second: side.describe(),
                });
            }
            return Ok(());
        }
        self.inverses.insert(key, side);
        Ok(())
    }

    fn parse(&self, owner: &TypeName, text: &str) -> CoreResult<PropertyPath> {
        PropertyPath::parse(text)
            .map_err(|e| CoreError::invalid_path(owner.as_str(), text, e.to_string()))
    }

    fn resolve(
        &self,
        owner: &TypeName,
        text: &str,
        end: PathEnd,
    ) -> CoreResult<Vec<ResolvedStep>> {
        let path = self.parse(owner, text)?;
        resolve_path(self.provider, owner, &path, end)
            .map_err(|reason| CoreError::invalid_path(owner.as_str(), text, reason))
    }

    /// Compiles `declaration` into triggers rooted at `root`.
    ///
    /// `declaration` is the root's own declaration set or that of an
    /// embeddable inlined at `prefix`; `stack` holds the embeddables being
    /// inlined.
    fn compile_type(
        &mut self,
        root: &TypeName,
        declaration: &TypeDeclarations,
        prefix: &str,
        stack: &mut Vec<TypeName>,
    ) -> CoreResult<()> {
        for read in &declaration.read {
            let text = join_prefix(prefix, read);
            let steps = self.resolve(root, &text, PathEnd::Any)?;
            self.emit(root, &text, &steps, false, &[])?;
        }

        for embed in &declaration.embed {
            let text = join_prefix(prefix, embed);
            let steps = self.resolve(root, &text, PathEnd::Object)?;
            let Some(target) = steps.last().and_then(|s| s.element.as_object()).cloned() else {
                return Err(CoreError::invalid_path(root.as_str(), text, "does not lead to objects"));
            };

            if self.provider.is_entity(&target) {
                let chain = self.emit(root, &text, &steps, true, &[])?;
                let landing = landing_of(&chain, root);
                self.edges.push(EmbeddingEdge {
                    target,
                    chain,
                    landing,
                });
                continue;
            }

            self.emit(root, &text, &steps, false, &[])?;
            if stack.contains(&target) {
                let chain = std::iter::once(root)
                    .chain(stack.iter())
                    .chain(std::iter::once(&target))
                    .map(TypeName::as_str)
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Err(CoreError::RecursiveEmbedding { chain });
            }
            stack.push(target.clone());
            let declarations = self.declarations;
            for inlined in declarations.types() {
                if !self.provider.is_entity(&inlined.name)
                    && self.provider.is_assignable(&target, &inlined.name)
                {
                    self.compile_type(root, inlined, &text, stack)?;
                }
            }
            stack.pop();
        }

        for other in &declaration.other_entities {
            let path = self.parse(&other.other_type, &other.inverse_path)?;
            let hop = self
                .hop(&other.other_type, &path, root, None)
                .map_err(|reason| {
                    CoreError::invalid_path(other.other_type.as_str(), &other.inverse_path, reason)
                })?;
            let tail = vec![hop];
            self.push_trigger(other.other_type.clone(), tail[0].property_names(), tail.clone());
            for used in &other.used_paths {
                let steps = self.resolve(&other.other_type, used, PathEnd::Any)?;
                self.emit(&other.other_type, used, &steps, false, &tail)?;
            }
        }

        Ok(())
    }

    /// Emits the triggers of one resolved path rooted at `root`.
    ///
    /// The path is cut into segments at entity boundaries. Each segment
    /// yields a trigger on its owner; each boundary also yields a trigger on
    /// the inverse side of the association. `tail` is walked after the
    /// path's own hops. Returns the full chain from the path's end back to
    /// the landing type.
    fn emit(
        &mut self,
        root: &TypeName,
        text: &str,
        steps: &[ResolvedStep],
        final_crossing: bool,
        tail: &[Hop],
    ) -> CoreResult<Vec<Hop>> {
        let mut chain = tail.to_vec();
        let mut owner = root.clone();
        let mut start = 0;

        for (i, step) in steps.iter().enumerate() {
            let last = i + 1 == steps.len();
            let Some(target) = step.element.as_object() else {
                continue;
            };
            if !self.provider.is_entity(target) || (last && !final_crossing) {
                continue;
            }

            let names = step_names(&steps[start..=i]);
            self.push_trigger(owner.clone(), names.clone(), chain.clone());

            let hop = self.inverse_hop(&owner, &names, target).map_err(|e| match e {
                CoreError::MissingInverse { .. } => CoreError::invalid_path(
                    root.as_str(),
                    text,
                    format!("no inverse side declared for {owner}.{names}"),
                ),
                other => other,
            })?;
            let inverse_owner = hop.start_cast.clone().unwrap_or_else(|| target.clone());
            let mut reversed = Vec::with_capacity(chain.len() + 1);
            reversed.push(hop);
            reversed.extend(chain);
            self.push_trigger(inverse_owner, reversed[0].property_names(), reversed.clone());

            chain = reversed;
            owner = target.clone();
            start = i + 1;
        }

        if start < steps.len() {
            self.push_trigger(owner, step_names(&steps[start..]), chain.clone());
        }
        Ok(chain)
    }

    fn push_trigger(&mut self, changed_type: TypeName, dirty_path: String, chain: Vec<Hop>) {
        let landing = landing_of(&chain, &changed_type);
        let trigger = Trigger {
            changed_type,
            dirty_path,
            chain,
            landing,
        };
        if !self.triggers.contains(&trigger) {
            self.triggers.push(trigger);
        }
    }

    /// Builds the hop walking back across the association `owner.names`,
    /// whose forward side leads to `target`.
    fn inverse_hop(&self, owner: &TypeName, names: &str, target: &TypeName) -> CoreResult<Hop> {
        let side = self
            .provider
            .supertypes_of(owner)?
            .iter()
            .find_map(|t| self.inverses.get(&(t.clone(), names.to_string())))
            .ok_or_else(|| CoreError::MissingInverse {
                owner: owner.to_string(),
                path: names.to_string(),
            })?;

        let start_cast = if self.provider.is_assignable(target, &side.owner) {
            None
        } else if self.provider.is_assignable(&side.owner, target) {
            Some(side.owner.clone())
        } else {
            return Err(CoreError::invalid_inverse(
                owner.as_str(),
                names,
                format!(
                    "inverse side {} is declared on a type unrelated to {target}",
                    side.describe()
                ),
            ));
        };

        self.hop(&side.owner, &side.path, owner, start_cast)
            .map_err(|reason| CoreError::invalid_inverse(owner.as_str(), names, reason))
    }

    /// Resolves `path` on `start` as a hop landing on `required` objects.
    fn hop(
        &self,
        start: &TypeName,
        path: &PropertyPath,
        required: &TypeName,
        start_cast: Option<TypeName>,
    ) -> Result<Hop, String> {
        let steps = resolve_path(self.provider, start, path, PathEnd::Object)?;
        let Some((last, init)) = steps.split_last() else {
            return Err("empty inverse path".to_string());
        };
        for step in init {
            if let Some(t) = step.element.as_object() {
                if self.provider.is_entity(t) {
                    return Err(format!("inverse path '{path}' crosses entity {t} before its end"));
                }
            }
        }
        let Some(reached) = last.element.as_object() else {
            return Err(format!("inverse path '{path}' does not lead to objects"));
        };

        let end_cast = if self.provider.is_assignable(reached, required) {
            None
        } else if self.provider.is_assignable(required, reached) {
            Some(required.clone())
        } else {
            return Err(format!(
                "inverse path '{path}' leads to {reached}, unrelated to {required}"
            ));
        };
        let land = end_cast.clone().unwrap_or_else(|| reached.clone());
        Ok(Hop {
            start_cast,
            steps,
            end_cast,
            land,
        })
    }
}

fn join_prefix(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        path.to_string()
    } else {
        format!("{prefix}.{path}")
    }
}

fn landing_of(chain: &[Hop], fallback: &TypeName) -> TypeName {
    chain.last().map_or_else(|| fallback.clone(), |h| h.land.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use entidex_model::{TypeDescriptor, TypeModel, ValueType};

    fn shop() -> TypeModel {
        TypeModel::new(vec![
            TypeDescriptor::entity("Party")
                .abstract_type()
                .id("id", ValueType::text())
                .property("name", ValueType::text()),
            TypeDescriptor::entity("Customer")
                .extends("Party")
                .property("orders", ValueType::list(ValueType::object("Order")))
                .property("address", ValueType::object("Address")),
            TypeDescriptor::entity("Supplier").extends("Party"),
            TypeDescriptor::entity("Order")
                .id("id", ValueType::integer())
                .property("customer", ValueType::object("Party"))
                .property("total", ValueType::integer())
                .property("shippingNote", ValueType::text()),
            TypeDescriptor::embeddable("Address")
                .property("city", ValueType::text())
                .property("previous", ValueType::object("Address")),
        ])
        .unwrap()
    }

    fn compile(declarations: &MappingDeclarations) -> CoreResult<MappingModel> {
        MappingModel::compile(&shop(), declarations)
    }

    fn customer_orders() -> MappingDeclarations {
        let mut declarations = MappingDeclarations::new();
        declarations.indexed("Customer").read("orders[].total");
        declarations.inverse("Customer", "orders", "Order", "customer");
        declarations
    }

    #[test]
    fn crossing_path_produces_three_triggers() {
        let mapping = compile(&customer_orders()).unwrap();
        let rendered: Vec<String> = mapping.triggers().iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "Customer[orders] => Customer",
                "Order[customer] -> customer as Customer => Customer",
                "Order[total] -> customer as Customer => Customer",
            ]
        );
    }

    #[test]
    fn indexed_is_inherited_by_concrete_subtypes() {
        let mut declarations = MappingDeclarations::new();
        declarations.indexed("Party").read("name");
        let mapping = compile(&declarations).unwrap();
        assert!(mapping.is_indexed(&TypeName::new("Customer")));
        assert!(mapping.is_indexed(&TypeName::new("Supplier")));
        assert!(!mapping.is_indexed(&TypeName::new("Party")));
        assert_eq!(
            mapping.indexed_types(),
            vec![TypeName::new("Customer"), TypeName::new("Supplier")]
        );
    }

    #[test]
    fn missing_inverse_is_configuration_error() {
        let mut declarations = MappingDeclarations::new();
        declarations.indexed("Customer").read("orders[].total");
        let err = compile(&declarations).unwrap_err();
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("orders[].total"));
        assert!(err.to_string().contains("Customer.orders"));
    }

    #[test]
    fn unresolvable_path_names_owner_and_path() {
        let mut declarations = MappingDeclarations::new();
        declarations.indexed("Customer").read("orders[].totl");
        declarations.inverse("Customer", "orders", "Order", "customer");
        match compile(&declarations).unwrap_err() {
            CoreError::InvalidPath { owner, path, reason } => {
                assert_eq!(owner, "Customer");
                assert_eq!(path, "orders[].totl");
                assert!(reason.contains("totl"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn inverse_with_unknown_property_rejected() {
        let mut declarations = customer_orders();
        declarations.inverse("Order", "buyer", "Customer", "orders");
        assert!(matches!(
            compile(&declarations),
            Err(CoreError::InvalidPath { .. })
        ));
    }

    #[test]
    fn contradictory_inverse_rejected() {
        let mut declarations = customer_orders();
        declarations.inverse("Customer", "orders", "Order", "shippingNote");
        assert!(matches!(
            compile(&declarations),
            Err(CoreError::ContradictoryInverse { .. })
        ));
    }

    #[test]
    fn repeated_inverse_is_harmless() {
        let mut declarations = customer_orders();
        declarations.inverse("Order", "customer", "Customer", "orders");
        assert!(compile(&declarations).is_ok());
    }

    #[test]
    fn indexed_embeddable_rejected() {
        let mut declarations = MappingDeclarations::new();
        declarations.indexed("Address");
        assert!(matches!(
            compile(&declarations),
            Err(CoreError::NotAnEntity { .. })
        ));
    }

    #[test]
    fn unknown_declared_type_rejected() {
        let mut declarations = MappingDeclarations::new();
        declarations.indexed("Ghost");
        assert!(matches!(
            compile(&declarations),
            Err(CoreError::UnknownType { .. })
        ));
    }

    #[test]
    fn embeddable_declarations_are_inlined() {
        let mut declarations = MappingDeclarations::new();
        declarations.indexed("Customer").embed("address");
        declarations.contained("Address").read("city");
        let mapping = compile(&declarations).unwrap();
        let paths: Vec<&str> = mapping
            .triggers()
            .iter()
            .map(|t| t.dirty_path.as_str())
            .collect();
        assert_eq!(paths, vec!["address", "address.city"]);
    }

    #[test]
    fn recursive_embeddable_rejected() {
        let mut declarations = MappingDeclarations::new();
        declarations.indexed("Customer").embed("address");
        declarations.contained("Address").embed("previous");
        match compile(&declarations).unwrap_err() {
            CoreError::RecursiveEmbedding { chain } => {
                assert_eq!(chain, "Customer -> Address -> Address");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn embedding_an_entity_records_an_edge() {
        let mut declarations = MappingDeclarations::new();
        declarations.indexed("Order").embed("customer<Customer>");
        declarations.contained("Customer").read("name");
        declarations.inverse("Customer", "orders", "Order", "customer");
        let mapping = compile(&declarations).unwrap();

        assert_eq!(mapping.edges().len(), 1);
        let edge = &mapping.edges()[0];
        assert_eq!(edge.target, TypeName::new("Customer"));
        assert_eq!(edge.landing, TypeName::new("Order"));
        assert!(mapping.has_document_part(&TypeName::new("Customer")));
        assert!(!mapping.has_document_part(&TypeName::new("Supplier")));
    }

    #[test]
    fn inverse_declared_on_subtype_casts_at_start() {
        let mut declarations = MappingDeclarations::new();
        declarations.indexed("Order").embed("customer");
        declarations.contained("Party").read("name");
        declarations.inverse("Customer", "orders", "Order", "customer");
        let mapping = compile(&declarations).unwrap();

        let hop = &mapping.edges()[0].chain[0];
        assert_eq!(hop.start_cast, Some(TypeName::new("Customer")));
        assert_eq!(hop.land, TypeName::new("Order"));
        assert!(mapping
            .triggers()
            .iter()
            .any(|t| t.changed_type == TypeName::new("Customer") && t.dirty_path == "orders"));
    }

    #[test]
    fn metadata_that_reaches_no_index_is_dropped() {
        let mut declarations = MappingDeclarations::new();
        declarations.contained("Customer").read("orders[].total");
        declarations.inverse("Customer", "orders", "Order", "customer");
        let mapping = compile(&declarations).unwrap();
        assert!(mapping.triggers().is_empty());
        assert!(mapping.indexed_types().is_empty());
    }

    #[test]
    fn other_entity_dependency_ends_with_extra_hop() {
        let mut declarations = MappingDeclarations::new();
        declarations
            .indexed("Customer")
            .from_other_entity("Order", "customer", ["total"]);
        let mapping = compile(&declarations).unwrap();
        let rendered: Vec<String> = mapping.triggers().iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "Order[customer] -> customer as Customer => Customer",
                "Order[total] -> customer as Customer => Customer",
            ]
        );
    }

    #[test]
    fn concrete_types_exclude_abstract() {
        let mapping = compile(&MappingDeclarations::new()).unwrap();
        assert_eq!(
            mapping.concrete_types_of(&TypeName::new("Party")),
            &[TypeName::new("Customer"), TypeName::new("Supplier")]
        );
        assert!(!mapping.concrete_types().contains(&TypeName::new("Party")));
    }
}
