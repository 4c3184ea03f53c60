//! Module headers: imports, exposing listings and exports

use crate::decl::{Declaration, SourceDecl, ValidDecl};
use crate::name::ModuleName;
use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Either everything (`(..)`) or an explicit list of items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing<T> {
    pub explicit: Vec<T>,
    pub open: bool,
}

impl<T> Listing<T> {
    pub fn open() -> Self {
        Self { explicit: Vec::new(), open: true }
    }

    pub fn closed(explicit: Vec<T>) -> Self {
        Self { explicit, open: false }
    }

    pub fn empty() -> Self {
        Self::closed(Vec::new())
    }
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// An item of an exposing or export listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Exposed {
    /// Lowercase value or operator
    Value(String),
    /// Capitalized name without a constructor listing
    Alias(String),
    /// Datatype with its constructor listing: `Maybe(..)`, `Shape(Circle)`
    Union(String, Listing<String>),
}

impl fmt::Display for Exposed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exposed::Value(name) | Exposed::Alias(name) => f.write_str(name),
            Exposed::Union(name, listing) if listing.open => write!(f, "{}(..)", name),
            Exposed::Union(name, listing) => write!(f, "{}({})", name, listing.explicit.join(", ")),
        }
    }
}

/// `import Json.Decode as Decode exposing (int, string)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Import {
    pub module: ModuleName,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub exposing: Listing<Exposed>,
    #[serde(default)]
    pub span: Span,
}

impl Import {
    pub fn new(module: impl Into<ModuleName>) -> Self {
        Self {
            module: module.into(),
            alias: None,
            exposing: Listing::empty(),
            span: Span::default(),
        }
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    pub fn exposing(mut self, exposing: Listing<Exposed>) -> Self {
        self.exposing = exposing;
        self
    }

    /// Prefix under which every export of the module is reachable
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(self.module.as_str())
    }
}

/// A module in phase `K`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module<K> {
    pub name: ModuleName,
    #[serde(default)]
    pub imports: Vec<Import>,
    pub exports: Listing<Exposed>,
    pub decls: Vec<Declaration<K>>,
    /// Span of the module header, used for export diagnostics
    #[serde(default)]
    pub span: Span,
}

pub type SourceModule = Module<SourceDecl>;
pub type ValidModule = Module<ValidDecl>;
