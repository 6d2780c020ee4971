//! Test fixtures: mappings, object graphs and temporary files.
//!
//! Four mappings cover the interesting shapes:
//! - [`shop`]: inheritance, list associations, embeddables and an
//!   other-entity dependency
//! - [`category_tree`]: a self-embedding tree
//! - [`spouses`]: a single-valued association that is its own inverse
//! - [`catalog`]: associations held in maps, sets, arrays and optionals

use entidex_core::{DirtyPaths, EntityReference, MappingDeclarations, ResolverConfig, ResolverRegistry};
use entidex_model::{
    ObjectAccess, ObjectGraph, ObjectId, ObjectIdentity, TypeDescriptor, TypeModel, Value,
    ValueType,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A type model with its dependency declarations.
pub struct Fixture {
    descriptors: Vec<TypeDescriptor>,
    model: Arc<TypeModel>,
    declarations: MappingDeclarations,
}

impl Fixture {
    /// Creates a fixture; panics if the descriptors do not form a valid model.
    pub fn new(descriptors: Vec<TypeDescriptor>, declarations: MappingDeclarations) -> Self {
        let model = TypeModel::new(descriptors.clone()).expect("fixture model must be valid");
        Self {
            descriptors,
            model: Arc::new(model),
            declarations,
        }
    }

    /// The type model.
    pub fn model(&self) -> &Arc<TypeModel> {
        &self.model
    }

    /// The dependency declarations.
    pub fn declarations(&self) -> &MappingDeclarations {
        &self.declarations
    }

    /// Bootstraps a registry with the default configuration.
    pub fn registry(&self) -> ResolverRegistry {
        self.registry_with(ResolverConfig::default())
    }

    /// Bootstraps a registry; panics on configuration errors.
    pub fn registry_with(&self, config: ResolverConfig) -> ResolverRegistry {
        ResolverRegistry::bootstrap(self.model.clone(), &self.declarations, config)
            .expect("fixture mapping must bootstrap")
    }

    /// An empty object graph over this model.
    pub fn graph(&self) -> ObjectGraph {
        ObjectGraph::new(self.model.clone())
    }

    /// The fixture as a mapping file document (`types` and `mapping`).
    pub fn mapping_json(&self) -> serde_json::Value {
        serde_json::json!({
            "types": self.descriptors,
            "mapping": self.declarations,
        })
    }
}

/// Shop mapping.
///
/// `Customer` and `Supplier` extend the abstract `Party`. An `Order`'s
/// `customer` is typed `Party` and is the inverse of `Customer.orders`.
/// `Customer` documents read order totals and line SKUs, embed the
/// `Address`, and read `amount` from the `Invoice`s whose `payer` they are.
/// `Order` documents read the tier of their customer when it is a
/// `Customer`.
pub fn shop() -> Fixture {
    let descriptors = vec![
        TypeDescriptor::entity("Party")
            .abstract_type()
            .id("id", ValueType::text())
            .property("name", ValueType::text()),
        TypeDescriptor::entity("Customer")
            .extends("Party")
            .property("tier", ValueType::text())
            .property("orders", ValueType::list(ValueType::object("Order")))
            .property("address", ValueType::object("Address")),
        TypeDescriptor::entity("Supplier")
            .extends("Party")
            .property("rating", ValueType::integer()),
        TypeDescriptor::entity("Order")
            .id("id", ValueType::integer())
            .property("customer", ValueType::object("Party"))
            .property("total", ValueType::integer())
            .property("shippingNote", ValueType::text())
            .property("lines", ValueType::list(ValueType::object("OrderLine"))),
        TypeDescriptor::embeddable("OrderLine")
            .property("sku", ValueType::text())
            .property("quantity", ValueType::integer()),
        TypeDescriptor::embeddable("Address")
            .property("street", ValueType::text())
            .property("city", ValueType::text()),
        TypeDescriptor::entity("Invoice")
            .id("id", ValueType::integer())
            .property("payer", ValueType::object("Customer"))
            .property("amount", ValueType::integer()),
    ];

    let mut declarations = MappingDeclarations::new();
    declarations
        .indexed("Customer")
        .read("name")
        .read("tier")
        .read("orders[].total")
        .read("orders[].lines[].sku")
        .embed("address")
        .from_other_entity("Invoice", "payer", ["amount"]);
    declarations.contained("Address").read("city");
    declarations.indexed("Order").read("customer<Customer>.tier");
    declarations.inverse("Customer", "orders", "Order", "customer");

    Fixture::new(descriptors, declarations)
}

/// Category tree: each category embeds its parent's document part.
pub fn category_tree() -> Fixture {
    let descriptors = vec![TypeDescriptor::entity("Category")
        .id("id", ValueType::integer())
        .property("name", ValueType::text())
        .property("parent", ValueType::object("Category"))
        .property("children", ValueType::list(ValueType::object("Category")))];

    let mut declarations = MappingDeclarations::new();
    declarations
        .indexed("Category")
        .read("name")
        .embed("parent");
    declarations.inverse("Category", "parent", "Category", "children");

    Fixture::new(descriptors, declarations)
}

/// Persons embedding their spouse; `spouse` is its own inverse.
pub fn spouses() -> Fixture {
    let descriptors = vec![TypeDescriptor::entity("Person")
        .id("id", ValueType::integer())
        .property("name", ValueType::text())
        .property("spouse", ValueType::object("Person"))];

    let mut declarations = MappingDeclarations::new();
    declarations.indexed("Person").read("name").embed("spouse");
    declarations.inverse("Person", "spouse", "Person", "spouse");

    Fixture::new(descriptors, declarations)
}

/// Catalogs of products, each association held in a different container.
///
/// | Catalog side             | Product side (inverse)         | Read    |
/// |--------------------------|--------------------------------|---------|
/// | `byCode: map<text, P>`   | `listedIn: array<Catalog>`     | `price` |
/// | `best: optional<P>`      | `featuredIn: set<Catalog>`     | `name`  |
/// | `items: list<P>`         | `byRegion: map<text, Catalog>` | `stock` |
/// | `ranks: map<P, integer>` | `home: optional<Catalog>`      | `label` |
pub fn catalog() -> Fixture {
    let descriptors = vec![
        TypeDescriptor::entity("Catalog")
            .id("code", ValueType::text())
            .property("byCode", ValueType::map(ValueType::text(), ValueType::object("Product")))
            .property("best", ValueType::optional(ValueType::object("Product")))
            .property("items", ValueType::list(ValueType::object("Product")))
            .property("ranks", ValueType::map(ValueType::object("Product"), ValueType::integer())),
        TypeDescriptor::entity("Product")
            .id("sku", ValueType::integer())
            .property("price", ValueType::integer())
            .property("name", ValueType::text())
            .property("stock", ValueType::integer())
            .property("label", ValueType::text())
            .property("listedIn", ValueType::Array(Box::new(ValueType::object("Catalog"))))
            .property("featuredIn", ValueType::set(ValueType::object("Catalog")))
            .property("byRegion", ValueType::map(ValueType::text(), ValueType::object("Catalog")))
            .property("home", ValueType::optional(ValueType::object("Catalog"))),
    ];

    let mut declarations = MappingDeclarations::new();
    declarations
        .indexed("Catalog")
        .read("byCode[values].price")
        .read("best[].name")
        .read("items[].stock")
        .read("ranks[keys].label");
    declarations.inverse("Catalog", "byCode", "Product", "listedIn");
    declarations.inverse("Catalog", "best", "Product", "featuredIn");
    declarations.inverse("Catalog", "items", "Product", "byRegion");
    declarations.inverse("Catalog", "ranks[keys]", "Product", "home");

    Fixture::new(descriptors, declarations)
}

/// Reference to an entity by declared identifier.
pub fn reference(type_name: &str, id: impl Into<Value>) -> EntityReference {
    EntityReference::new(type_name, ObjectIdentity::Id(id.into()))
}

/// Dirty paths from a list.
pub fn dirty(paths: &[&str]) -> DirtyPaths {
    paths.iter().copied().collect()
}

/// Adds a shop `Customer`.
pub fn add_customer(graph: &mut ObjectGraph, id: &str) -> ObjectId {
    graph
        .insert("Customer", [("id", Value::from(id))])
        .expect("customer must be insertable")
}

/// Adds a shop `Supplier`.
pub fn add_supplier(graph: &mut ObjectGraph, id: &str) -> ObjectId {
    graph
        .insert("Supplier", [("id", Value::from(id))])
        .expect("supplier must be insertable")
}

/// Adds a shop `Order`, keeping `Customer.orders` consistent.
pub fn add_order(graph: &mut ObjectGraph, id: i64, party: Option<ObjectId>, total: i64) -> ObjectId {
    let order = graph
        .insert(
            "Order",
            [
                ("id", Value::Integer(id)),
                ("customer", Value::from(party)),
                ("total", Value::Integer(total)),
            ],
        )
        .expect("order must be insertable");
    if let Some(party) = party {
        let is_customer = graph
            .runtime_type(party)
            .is_ok_and(|t| t.as_str() == "Customer");
        if is_customer {
            graph
                .push(party, "orders", Value::Ref(order))
                .expect("orders must be a list");
        }
    }
    order
}

/// Adds a `Category` under `parent`, keeping `children` consistent.
pub fn add_category(graph: &mut ObjectGraph, id: i64, parent: Option<ObjectId>) -> ObjectId {
    let category = graph
        .insert(
            "Category",
            [
                ("id", Value::Integer(id)),
                ("name", Value::from(format!("category {id}"))),
                ("parent", Value::from(parent)),
            ],
        )
        .expect("category must be insertable");
    if let Some(parent) = parent {
        graph
            .push(parent, "children", Value::Ref(category))
            .expect("children must be a list");
    }
    category
}

/// Adds a chain of `depth` categories, each the child of the previous one.
pub fn category_chain(graph: &mut ObjectGraph, depth: usize) -> Vec<ObjectId> {
    let mut chain: Vec<ObjectId> = Vec::with_capacity(depth);
    for i in 0..depth {
        let parent = chain.last().copied();
        chain.push(add_category(graph, i as i64, parent));
    }
    chain
}

/// Adds `size` persons, each the spouse of the next, the last one closing
/// the ring.
pub fn spouse_ring(graph: &mut ObjectGraph, size: usize) -> Vec<ObjectId> {
    let ring: Vec<ObjectId> = (0..size)
        .map(|i| {
            graph
                .insert(
                    "Person",
                    [
                        ("id", Value::Integer(i as i64)),
                        ("name", Value::from(format!("person {i}"))),
                    ],
                )
                .expect("person must be insertable")
        })
        .collect();
    for (i, person) in ring.iter().enumerate() {
        let spouse = ring[(i + 1) % size];
        graph
            .set(*person, "spouse", spouse)
            .expect("spouse must be settable");
    }
    ring
}

/// Temporary directory for file-based tests, removed on drop.
pub struct TempFiles {
    dir: TempDir,
}

impl TempFiles {
    /// Creates an empty temporary directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// The directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes a file and returns its path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).expect("Failed to write temp file");
        path
    }

    /// Writes a JSON document and returns its path.
    pub fn write_json(&self, name: &str, value: &serde_json::Value) -> PathBuf {
        let text = serde_json::to_string_pretty(value).expect("JSON values always serialize");
        self.write(name, &text)
    }
}

impl Default for TempFiles {
    fn default() -> Self {
        Self::new()
    }
}
