//! Expression tree shared by every phase
//!
//! `D` is the representation of `let` definitions and `V` the representation
//! of variable references; both change as a module moves from source to
//! canonical form.

use crate::pattern::Pattern;
use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Literal values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Char(char),
    Str(String),
    Bool(bool),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(n) => write!(f, "{}", n),
            Literal::Float(n) => write!(f, "{:?}", n),
            Literal::Char(c) => write!(f, "{:?}", c),
            Literal::Str(s) => write!(f, "{:?}", s),
            Literal::Bool(true) => f.write_str("True"),
            Literal::Bool(false) => f.write_str("False"),
        }
    }
}

/// Embedded shader source, opaque to canonicalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlShader {
    pub uid: String,
    pub source: String,
}

/// Annotated expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr<D, V> {
    pub kind: ExprKind<D, V>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind<D, V> {
    Literal(Literal),
    Var(V),
    /// `[low .. high]`
    Range(Box<Expr<D, V>>, Box<Expr<D, V>>),
    List(Vec<Expr<D, V>>),
    Binop {
        op: V,
        left: Box<Expr<D, V>>,
        right: Box<Expr<D, V>>,
    },
    Lambda {
        pattern: Pattern<V>,
        body: Box<Expr<D, V>>,
    },
    App {
        func: Box<Expr<D, V>>,
        arg: Box<Expr<D, V>>,
    },
    /// Multi-way if: guarded branches and a final fallback
    If {
        branches: Vec<(Expr<D, V>, Expr<D, V>)>,
        otherwise: Box<Expr<D, V>>,
    },
    Let {
        defs: Vec<D>,
        body: Box<Expr<D, V>>,
    },
    Case {
        scrutinee: Box<Expr<D, V>>,
        branches: Vec<(Pattern<V>, Expr<D, V>)>,
    },
    /// Internal constructor application (tuples and the like)
    Data { ctor: String, args: Vec<Expr<D, V>> },
    Access {
        record: Box<Expr<D, V>>,
        field: String,
    },
    Update {
        record: Box<Expr<D, V>>,
        fields: Vec<(String, Expr<D, V>)>,
    },
    Record(Vec<(String, Expr<D, V>)>),
    GlShader(GlShader),
    /// Boundary marker: the value of the named wire
    Wire(String),
}

impl<D, V> Expr<D, V> {
    pub fn new(kind: ExprKind<D, V>, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn var(var: V, span: Span) -> Self {
        Self::new(ExprKind::Var(var), span)
    }

    pub fn literal(literal: Literal, span: Span) -> Self {
        Self::new(ExprKind::Literal(literal), span)
    }
}
