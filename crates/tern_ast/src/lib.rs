//! Syntax tree for tern modules ahead of canonicalization.
//!
//! Holds the pieces every later stage agrees on (spans, names, patterns,
//! the expression tree) and the two pre-canonical declaration phases:
//! *source*, as produced by the parser, and *valid*, after annotations
//! have been paired with definitions and wire fragments assembled.

mod decl;
mod expr;
mod module;
mod name;
mod pattern;
mod span;
mod types;

pub use decl::*;
pub use expr::*;
pub use module::*;
pub use name::*;
pub use pattern::*;
pub use span::*;
pub use types::*;
