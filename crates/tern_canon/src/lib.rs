//! Canonicalization of tern modules.
//!
//! Takes a validated module and the interfaces of everything it imports,
//! resolves every name to the module that defines it, checks that wire
//! types can cross the program boundary, resolves the export listing, and
//! drops imports nothing refers to. Failures are collected rather than
//! reported one at a time.

pub mod canonical;
pub mod env;
pub mod error;
pub mod export;
pub mod expr;
pub mod interface;
pub mod module;
pub mod resolve;
pub mod sort;
pub mod validate;
pub mod wire;

pub use canonical::{
    CanonicalDecl, CanonicalDef, CanonicalExpr, CanonicalModule, CanonicalPattern, CanonicalVar, CanonicalWire, Home,
    ModuleBody, Type,
};
pub use env::{AliasTable, Environment};
pub use error::{CanonError, Context, Diagnostic, Diagnostics, Validation};
pub use export::{defined_names, resolve_exports};
pub use interface::{AliasInfo, Interface, Interfaces, UnionInfo};
pub use module::{canonicalize_declarations, canonicalize_module, canonicalize_module_with, canonicalize_source};
pub use resolve::Canonicalizer;
pub use sort::{DefinitionSequencer, DependencySorter};
pub use validate::validate_module;
pub use wire::WireValidator;
