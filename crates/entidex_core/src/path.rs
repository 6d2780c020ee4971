//! Dependency path syntax.
//!
//! ```text
//! path := step ( '.' step )*
//! step := name ( '[' kind? ']' )* ( '<' Type '>' )?
//! kind := list | set | array | optional | values | keys
//! ```
//!
//! `[]` selects the default extractor of the declared container type.

use entidex_model::{ContainerKind, TypeName};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A syntax error in a dependency path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct PathSyntaxError {
    /// Byte offset of the error.
    pub offset: usize,
    /// What was expected.
    pub message: String,
}

/// One step of a dependency path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathStep {
    /// Property name.
    pub property: String,
    /// Explicit extractors; `None` means the default one.
    pub extractors: Vec<Option<ContainerKind>>,
    /// Subtype to narrow the value to.
    pub cast: Option<TypeName>,
}

/// A parsed dependency path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    steps: Vec<PathStep>,
}

impl PropertyPath {
    /// Parses a path.
    pub fn parse(text: &str) -> Result<Self, PathSyntaxError> {
        PathParser { text, pos: 0 }.parse()
    }

    /// The steps, in reading order.
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Property names joined with `.`, as used for dirty paths.
    pub fn property_names(&self) -> String {
        join_names(&self.steps)
    }
}

/// Joins the property names of `steps` with `.`.
pub(crate) fn join_names(steps: &[PathStep]) -> String {
    steps
        .iter()
        .map(|s| s.property.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

impl FromStr for PropertyPath {
    type Err = PathSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.property)?;
        for extractor in &self.extractors {
            match extractor {
                Some(kind) => write!(f, "[{kind}]")?,
                None => f.write_str("[]")?,
            }
        }
        if let Some(cast) = &self.cast {
            write!(f, "<{cast}>")?;
        }
        Ok(())
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

struct PathParser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> PathParser<'a> {
    fn parse(mut self) -> Result<PropertyPath, PathSyntaxError> {
        let mut steps = vec![self.step()?];
        while self.eat('.') {
            steps.push(self.step()?);
        }
        if self.pos < self.text.len() {
            return Err(self.error("expected '.' or end of path"));
        }
        Ok(PropertyPath { steps })
    }

    fn step(&mut self) -> Result<PathStep, PathSyntaxError> {
        let property = self.ident("expected a property name")?.to_string();
        let mut extractors = Vec::new();
        while self.eat('[') {
            if self.eat(']') {
                extractors.push(None);
                continue;
            }
            let start = self.pos;
            let keyword = self.ident("expected a container kind")?;
            let kind = ContainerKind::from_keyword(keyword).ok_or_else(|| PathSyntaxError {
                offset: start,
                message: format!("unknown container kind '{keyword}'"),
            })?;
            extractors.push(Some(kind));
            if !self.eat(']') {
                return Err(self.error("expected ']'"));
            }
        }
        let cast = if self.eat('<') {
            let name = self.ident("expected a type name")?;
            if !self.eat('>') {
                return Err(self.error("expected '>'"));
            }
            Some(TypeName::new(name))
        } else {
            None
        };
        Ok(PathStep {
            property,
            extractors,
            cast,
        })
    }

    fn ident(&mut self, expected: &str) -> Result<&'a str, PathSyntaxError> {
        let rest = &self.text[self.pos..];
        let len = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(self.error(expected));
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    fn eat(&mut self, c: char) -> bool {
        if self.text[self.pos..].starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn error(&self, message: &str) -> PathSyntaxError {
        PathSyntaxError {
            offset: self.pos,
            message: message.to_string(),
        }
    }
}
