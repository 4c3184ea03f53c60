//! Top-level declarations in the source and validated phases
//!
//! The phases share the shape of datatypes, aliases and fixities; they
//! differ in how definitions and wires are represented. The canonical
//! phase lives in `tern_canon`.

use crate::expr::Expr;
use crate::name::Name;
use crate::pattern::Pattern;
use crate::span::Span;
use crate::types::RawType;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A declaration of phase `K` with its source span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration<K> {
    pub kind: K,
    pub span: Span,
}

impl<K> Declaration<K> {
    pub fn new(kind: K, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Algebraic datatype: `type Maybe a = Just a | Nothing`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datatype<T> {
    pub name: String,
    pub vars: Vec<String>,
    pub ctors: Vec<(String, Vec<T>)>,
}

/// `type alias Point = { x : Float, y : Float }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeAlias<T> {
    pub name: String,
    pub vars: Vec<String>,
    pub alias: T,
}

impl TypeAlias<RawType> {
    /// Aliases of closed records also define a constructor function
    pub fn is_record_constructor(&self) -> bool {
        matches!(self.alias, RawType::Record { extension: None, .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Assoc {
    Left,
    Non,
    Right,
}

impl Assoc {
    /// Tag used when fixities are persisted in compiled interfaces
    pub fn to_tag(self) -> u8 {
        match self {
            Assoc::Left => 0,
            Assoc::Non => 1,
            Assoc::Right => 2,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Assoc> {
        match tag {
            0 => Some(Assoc::Left),
            1 => Some(Assoc::Non),
            2 => Some(Assoc::Right),
            _ => None,
        }
    }
}

impl fmt::Display for Assoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Assoc::Left => "infixl",
            Assoc::Non => "infix",
            Assoc::Right => "infixr",
        })
    }
}

impl Serialize for Assoc {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.to_tag())
    }
}

// A bad tag means the interface artifact is corrupt: decoding stops here.
impl<'de> Deserialize<'de> for Assoc {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = u8::deserialize(deserializer)?;
        Assoc::from_tag(tag).ok_or_else(|| {
            de::Error::custom(format!("malformed associativity tag {} in compiled interface", tag))
        })
    }
}

/// `infixl 6 +`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixity {
    pub assoc: Assoc,
    pub precedence: u8,
    pub operator: String,
}

// ---------------------------------------------------------------------------
// Source phase
// ---------------------------------------------------------------------------

pub type SourceExpr = Expr<SourceDef, Name>;

/// Definitions as parsed: annotations are separate from the bindings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SourceDef {
    Definition {
        pattern: Pattern<Name>,
        body: SourceExpr,
        span: Span,
    },
    TypeAnnotation {
        name: String,
        annotation: RawType,
        span: Span,
    },
}

/// One piece of a wire declaration. Pieces sharing a name are assembled
/// into a single wire during validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireFragment {
    InputAnnotation { name: String, annotation: RawType },
    OutputAnnotation { name: String, annotation: RawType },
    Definition { name: String, body: SourceExpr },
}

impl WireFragment {
    pub fn name(&self) -> &str {
        match self {
            WireFragment::InputAnnotation { name, .. }
            | WireFragment::OutputAnnotation { name, .. }
            | WireFragment::Definition { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SourceDecl {
    Definition(SourceDef),
    Datatype(Datatype<RawType>),
    TypeAlias(TypeAlias<RawType>),
    Wire(WireFragment),
    Fixity(Fixity),
}

// ---------------------------------------------------------------------------
// Validated phase
// ---------------------------------------------------------------------------

pub type ValidExpr = Expr<ValidDef, Name>;

/// A binding paired with its optional annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidDef {
    pub pattern: Pattern<Name>,
    pub body: ValidExpr,
    pub annotation: Option<RawType>,
    pub span: Span,
}

/// An assembled wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidWire {
    /// Value supplied from outside
    Input { name: String, annotation: RawType },
    /// Value sent outside
    Output {
        name: String,
        body: ValidExpr,
        annotation: RawType,
    },
    /// Channel in both directions, optionally with a local body
    Loopback {
        name: String,
        annotation: RawType,
        body: Option<ValidExpr>,
    },
}

impl ValidWire {
    pub fn name(&self) -> &str {
        match self {
            ValidWire::Input { name, .. }
            | ValidWire::Output { name, .. }
            | ValidWire::Loopback { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidDecl {
    Definition(ValidDef),
    Datatype(Datatype<RawType>),
    TypeAlias(TypeAlias<RawType>),
    Wire(ValidWire),
    Fixity(Fixity),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assoc_tags() {
        for assoc in [Assoc::Left, Assoc::Non, Assoc::Right] {
            assert_eq!(Assoc::from_tag(assoc.to_tag()), Some(assoc));
        }
        assert_eq!(Assoc::from_tag(3), None);
    }

    #[test]
    fn test_only_closed_record_aliases_are_constructors() {
        let field = || vec![("x".to_string(), RawType::named("Float"))];
        let record = TypeAlias { name: "Point".into(), vars: vec![], alias: RawType::Record { fields: field(), extension: None } };
        let extensible = TypeAlias {
            name: "Named".into(),
            vars: vec!["r".into()],
            alias: RawType::Record { fields: field(), extension: Some(Box::new(RawType::Var("r".into()))) },
        };
        let list = TypeAlias { name: "Points".into(), vars: vec![], alias: RawType::app("List", vec![RawType::named("Point")]) };

        assert!(record.is_record_constructor());
        assert!(!extensible.is_record_constructor());
        assert!(!list.is_record_constructor());
    }

    #[test]
    fn test_malformed_assoc_tag_aborts_decoding() {
        let result: Result<Fixity, _> =
            serde_json::from_str(r#"{"assoc":7,"precedence":6,"operator":"+"}"#);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("malformed associativity tag 7"));
    }
}
