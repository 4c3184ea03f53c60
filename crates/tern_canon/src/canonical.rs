//! Canonical types - same shapes as the AST but with resolved names

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tern_ast::{
    Datatype, Expr, Exposed, Fixity, Import, ModuleName, Pattern, Span, TypeAlias,
};

use crate::interface::{AliasInfo, UnionInfo};

/// Where a canonical name was defined
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Home {
    /// Provided by the language itself
    BuiltIn,
    /// Top-level name of an imported module
    Module(ModuleName),
    /// Top-level name of the module being canonicalized
    TopLevel(ModuleName),
    /// Bound by a pattern inside an expression
    Local,
}

impl fmt::Display for Home {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Home::BuiltIn => f.write_str("builtin"),
            Home::Module(module) | Home::TopLevel(module) => write!(f, "{}", module),
            Home::Local => f.write_str("local"),
        }
    }
}

/// A fully resolved name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CanonicalVar {
    pub home: Home,
    pub name: String,
}

impl CanonicalVar {
    pub fn new(home: Home, name: impl Into<String>) -> Self {
        Self { home, name: name.into() }
    }

    pub fn builtin(name: impl Into<String>) -> Self {
        Self::new(Home::BuiltIn, name)
    }

    pub fn local(name: impl Into<String>) -> Self {
        Self::new(Home::Local, name)
    }

    pub fn module(module: &ModuleName, name: impl Into<String>) -> Self {
        Self::new(Home::Module(module.clone()), name)
    }

    pub fn top_level(module: &ModuleName, name: impl Into<String>) -> Self {
        Self::new(Home::TopLevel(module.clone()), name)
    }

    /// Imported module this name depends on, if any
    pub fn module_dependency(&self) -> Option<&ModuleName> {
        match &self.home {
            Home::Module(module) => Some(module),
            _ => None,
        }
    }

    pub fn is(&self, module: &str, name: &str) -> bool {
        match &self.home {
            Home::Module(home) | Home::TopLevel(home) => home.as_str() == module && self.name == name,
            Home::BuiltIn | Home::Local => false,
        }
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.home == Home::BuiltIn && self.name == name
    }

    /// The same name as seen by a module importing `module`
    pub fn rehome(&self, module: &ModuleName) -> CanonicalVar {
        match &self.home {
            Home::TopLevel(home) if home == module => CanonicalVar::module(module, self.name.clone()),
            _ => self.clone(),
        }
    }
}

impl fmt::Display for CanonicalVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.home {
            Home::Module(module) | Home::TopLevel(module) => write!(f, "{}.{}", module, self.name),
            Home::BuiltIn | Home::Local => f.write_str(&self.name),
        }
    }
}

/// Resolved type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Type {
    Lambda(Box<Type>, Box<Type>),
    Var(String),
    Type(CanonicalVar),
    App(Box<Type>, Vec<Type>),
    Record {
        fields: Vec<(String, Type)>,
        extension: Option<Box<Type>>,
    },
    /// Reference to an alias; expanded on demand through an `AliasTable`
    Aliased { name: CanonicalVar, args: Vec<Type> },
}

impl Type {
    pub fn lambda(from: Type, to: Type) -> Self {
        Type::Lambda(Box::new(from), Box::new(to))
    }

    pub fn builtin(name: &str) -> Self {
        Type::Type(CanonicalVar::builtin(name))
    }

    pub fn app(head: Type, args: Vec<Type>) -> Self {
        if args.is_empty() { head } else { Type::App(Box::new(head), args) }
    }

    /// Replace type variables using `substitution`, leaving unknown ones alone
    pub fn substitute(&self, substitution: &[(String, Type)]) -> Type {
        match self {
            Type::Lambda(from, to) => Type::lambda(from.substitute(substitution), to.substitute(substitution)),
            Type::Var(name) => substitution
                .iter()
                .find(|(var, _)| var == name)
                .map(|(_, ty)| ty.clone())
                .unwrap_or_else(|| self.clone()),
            Type::Type(_) => self.clone(),
            Type::App(head, args) => Type::App(
                Box::new(head.substitute(substitution)),
                args.iter().map(|arg| arg.substitute(substitution)).collect(),
            ),
            Type::Record { fields, extension } => Type::Record {
                fields: fields
                    .iter()
                    .map(|(field, ty)| (field.clone(), ty.substitute(substitution)))
                    .collect(),
                extension: extension.as_ref().map(|ext| Box::new(ext.substitute(substitution))),
            },
            Type::Aliased { name, args } => Type::Aliased {
                name: name.clone(),
                args: args.iter().map(|arg| arg.substitute(substitution)).collect(),
            },
        }
    }

    /// Rewrite references to `module`'s own top-level types as imported ones
    pub fn rehome(&self, module: &ModuleName) -> Type {
        match self {
            Type::Lambda(from, to) => Type::lambda(from.rehome(module), to.rehome(module)),
            Type::Var(_) => self.clone(),
            Type::Type(var) => Type::Type(var.rehome(module)),
            Type::App(head, args) => Type::App(
                Box::new(head.rehome(module)),
                args.iter().map(|arg| arg.rehome(module)).collect(),
            ),
            Type::Record { fields, extension } => Type::Record {
                fields: fields.iter().map(|(field, ty)| (field.clone(), ty.rehome(module))).collect(),
                extension: extension.as_ref().map(|ext| Box::new(ext.rehome(module))),
            },
            Type::Aliased { name, args } => Type::Aliased {
                name: name.rehome(module),
                args: args.iter().map(|arg| arg.rehome(module)).collect(),
            },
        }
    }

    fn is_atomic(&self) -> bool {
        match self {
            Type::Var(_) | Type::Type(_) | Type::Record { .. } => true,
            Type::Aliased { args, .. } => args.is_empty(),
            Type::Lambda(..) | Type::App(..) => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_args(f: &mut fmt::Formatter<'_>, args: &[Type]) -> fmt::Result {
            for arg in args {
                if arg.is_atomic() {
                    write!(f, " {}", arg)?;
                } else {
                    write!(f, " ({})", arg)?;
                }
            }
            Ok(())
        }

        match self {
            Type::Lambda(from, to) => match **from {
                Type::Lambda(..) => write!(f, "({}) -> {}", from, to),
                _ => write!(f, "{} -> {}", from, to),
            },
            Type::Var(name) => f.write_str(name),
            Type::Type(var) => write!(f, "{}", var),
            Type::App(head, args) => {
                write!(f, "{}", head)?;
                write_args(f, args)
            }
            Type::Record { fields, extension } => {
                f.write_str("{ ")?;
                if let Some(ext) = extension {
                    write!(f, "{} | ", ext)?;
                }
                for (i, (field, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{} : {}", field, ty)?;
                }
                f.write_str(" }")
            }
            Type::Aliased { name, args } => {
                write!(f, "{}", name)?;
                write_args(f, args)
            }
        }
    }
}

pub type CanonicalPattern = Pattern<CanonicalVar>;
pub type CanonicalExpr = Expr<CanonicalDef, CanonicalVar>;

/// Resolved definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalDef {
    pub pattern: CanonicalPattern,
    pub body: CanonicalExpr,
    pub annotation: Option<Type>,
    pub span: Span,
}

/// Resolved wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CanonicalWire {
    Input { name: String, ty: Type },
    Output { name: String, body: CanonicalExpr, ty: Type },
    /// Loopback without a local body: only an address to send to
    Address { name: String, ty: Type },
    /// Loopback with a local body
    Command {
        name: String,
        /// Filled in by type inference
        command_ty: Option<Type>,
        body: CanonicalExpr,
        result_ty: Type,
    },
}

impl CanonicalWire {
    pub fn name(&self) -> &str {
        match self {
            CanonicalWire::Input { name, .. }
            | CanonicalWire::Output { name, .. }
            | CanonicalWire::Address { name, .. }
            | CanonicalWire::Command { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CanonicalDecl {
    Definition(CanonicalDef),
    Datatype(Datatype<Type>),
    TypeAlias(TypeAlias<Type>),
    Wire(CanonicalWire),
    Fixity(Fixity),
}

/// Everything downstream stages need from a module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleBody {
    /// All definitions merged into one expression
    pub program: CanonicalExpr,
    pub datatypes: IndexMap<String, UnionInfo>,
    pub fixities: Vec<Fixity>,
    pub aliases: IndexMap<String, AliasInfo>,
    pub wires: Vec<String>,
}

/// The result of canonicalizing a module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalModule {
    pub name: ModuleName,
    /// Imports that were actually referenced
    pub imports: Vec<Import>,
    pub used_modules: BTreeSet<ModuleName>,
    pub exports: Vec<Exposed>,
    pub body: ModuleBody,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_reaches_nested_positions() {
        let list = CanonicalVar::builtin("List");
        let ty = Type::lambda(
            Type::Var("a".into()),
            Type::Record {
                fields: vec![("items".into(), Type::app(Type::Type(list.clone()), vec![Type::Var("a".into())]))],
                extension: None,
            },
        );
        let result = ty.substitute(&[("a".into(), Type::builtin("Int"))]);
        assert_eq!(result.to_string(), "Int -> { items : List Int }");
    }

    #[test]
    fn test_display_canonical_names() {
        let maybe = CanonicalVar::module(&ModuleName::from("Maybe"), "Maybe");
        let ty = Type::app(Type::Type(maybe), vec![Type::lambda(Type::builtin("Int"), Type::builtin("Int"))]);
        assert_eq!(ty.to_string(), "Maybe.Maybe (Int -> Int)");
    }
}
