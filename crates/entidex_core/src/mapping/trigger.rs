//! Compiled reindexing triggers.

use entidex_model::{ContainerKind, TypeName};
use std::fmt;

use super::resolve::{step_names, ResolvedStep};

/// One reversed association hop: from an object of some entity type back
/// to the entity that holds it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hop {
    /// Cast applied to the starting object before reading, when the inverse
    /// side is declared on a subtype of the forward target.
    pub start_cast: Option<TypeName>,
    /// The inverse path.
    pub steps: Vec<ResolvedStep>,
    /// Cast applied to the reached objects, when the inverse path is typed
    /// wider than the entity being walked back to.
    pub end_cast: Option<TypeName>,
    /// Static type of the reached objects, after `end_cast`.
    pub land: TypeName,
}

impl Hop {
    /// Property names of the inverse path, joined with `.`.
    pub fn property_names(&self) -> String {
        step_names(&self.steps)
    }

    fn push_ops(&self, ops: &mut Vec<Op>) {
        if let Some(cast) = &self.start_cast {
            ops.push(Op::Cast(cast.clone()));
        }
        for step in &self.steps {
            ops.push(Op::Read(step.property.clone()));
            ops.extend(step.extractors.iter().copied().map(Op::Extract));
            if let Some(cast) = &step.cast {
                ops.push(Op::Cast(cast.clone()));
            }
        }
        if let Some(cast) = &self.end_cast {
            ops.push(Op::Cast(cast.clone()));
        }
        ops.push(Op::Land(self.land.clone()));
    }
}

impl fmt::Display for Hop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(cast) = &self.start_cast {
            write!(f, "({cast}) ")?;
        }
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&step.property)?;
            for kind in &step.extractors {
                write!(f, "[{kind}]")?;
            }
            if let Some(cast) = &step.cast {
                write!(f, "<{cast}>")?;
            }
        }
        if let Some(cast) = &self.end_cast {
            write!(f, " as {cast}")?;
        }
        Ok(())
    }
}

/// "When `changed_type` changes at `dirty_path`, walk `chain` and the
/// document part of every object reached has changed."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    /// Static type of the changed object.
    pub changed_type: TypeName,
    /// Property names, relative to the changed object, that this trigger watches.
    pub dirty_path: String,
    /// Hops to walk, in walking order.
    pub chain: Vec<Hop>,
    /// Static type of the objects reached at the end of the chain.
    pub landing: TypeName,
}

impl Trigger {
    pub(crate) fn ops(&self) -> Vec<Op> {
        chain_ops(&self.chain)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.changed_type, self.dirty_path)?;
        for hop in &self.chain {
            write!(f, " -> {hop}")?;
        }
        write!(f, " => {}", self.landing)
    }
}

/// "When the document part of a `target` object changes, walk `chain` and
/// the document part of every object reached has changed too."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingEdge {
    /// Static type of the embedded entity.
    pub target: TypeName,
    /// Hops back to the embedding entity, in walking order.
    pub chain: Vec<Hop>,
    /// Static type of the embedding objects.
    pub landing: TypeName,
}

impl EmbeddingEdge {
    pub(crate) fn ops(&self) -> Vec<Op> {
        chain_ops(&self.chain)
    }
}

impl fmt::Display for EmbeddingEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.target)?;
        for hop in &self.chain {
            write!(f, " -> {hop}")?;
        }
        write!(f, " => {}", self.landing)
    }
}

/// Flattened traversal operation, the unit of prefix merging.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Op {
    Read(String),
    Extract(ContainerKind),
    Cast(TypeName),
    /// An entity object of (at most) this static type has been reached.
    Land(TypeName),
}

fn chain_ops(chain: &[Hop]) -> Vec<Op> {
    let mut ops = Vec::new();
    for hop in chain {
        hop.push_ops(&mut ops);
    }
    ops
}
