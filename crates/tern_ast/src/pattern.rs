//! Patterns, shared by every phase

use crate::expr::Literal;
use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A pattern whose constructor references have type `V`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern<V> {
    pub kind: PatternKind<V>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PatternKind<V> {
    /// Constructor applied to argument patterns
    Data { ctor: V, args: Vec<Pattern<V>> },
    /// `{ x, y }`
    Record(Vec<String>),
    /// `p as name`
    Alias { name: String, pattern: Box<Pattern<V>> },
    Var(String),
    Anything,
    Literal(Literal),
}

impl<V> Pattern<V> {
    pub fn new(kind: PatternKind<V>, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn var(name: impl Into<String>, span: Span) -> Self {
        Self::new(PatternKind::Var(name.into()), span)
    }

    /// Variables this pattern introduces, left to right
    pub fn bound_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_bound(&mut names);
        names
    }

    fn collect_bound(&self, names: &mut Vec<String>) {
        match &self.kind {
            PatternKind::Data { args, .. } => {
                for arg in args {
                    arg.collect_bound(names);
                }
            }
            PatternKind::Record(fields) => names.extend(fields.iter().cloned()),
            PatternKind::Alias { name, pattern } => {
                pattern.collect_bound(names);
                names.push(name.clone());
            }
            PatternKind::Var(name) => names.push(name.clone()),
            PatternKind::Anything | PatternKind::Literal(_) => {}
        }
    }
}

impl<V: fmt::Display> fmt::Display for Pattern<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            PatternKind::Data { ctor, args } if args.is_empty() => write!(f, "{}", ctor),
            PatternKind::Data { ctor, args } => {
                write!(f, "({}", ctor)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                f.write_str(")")
            }
            PatternKind::Record(fields) => write!(f, "{{ {} }}", fields.join(", ")),
            PatternKind::Alias { name, pattern } => write!(f, "({} as {})", pattern, name),
            PatternKind::Var(name) => f.write_str(name),
            PatternKind::Anything => f.write_str("_"),
            PatternKind::Literal(literal) => write!(f, "{}", literal),
        }
    }
}
