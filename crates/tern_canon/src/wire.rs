//! Checks that values crossing the program boundary are serializable

use crate::canonical::{CanonicalExpr, CanonicalVar, CanonicalWire, Home, Type};
use crate::env::{tuple_arity, AliasTable};
use crate::error::{CanonError, WireDirection};

/// Runtime support every module with a wire depends on
pub const WIRE_SUPPORT_MODULES: [&str; 2] = ["Native.Wire", "Native.Json"];

/// Imported types that are serializable as they are
const SERIALIZABLE_LEAVES: [(&str, &str); 2] = [("Json.Encode", "Value"), ("Json.Decode", "Value")];

/// Imported single-parameter containers of serializable elements
const SERIALIZABLE_CONTAINERS: [(&str, &str); 2] = [("Maybe", "Maybe"), ("Array", "Array")];

const BUILTIN_LEAVES: [&str; 5] = ["Int", "Float", "Bool", "String", "Char"];

/// Nested alias expansions allowed before a type counts as unserializable
const MAX_ALIAS_DEPTH: usize = 64;

pub struct WireValidator<'a> {
    aliases: &'a AliasTable,
}

impl<'a> WireValidator<'a> {
    pub fn new(aliases: &'a AliasTable) -> Self {
        Self { aliases }
    }

    pub fn check_input(&self, name: &str, ty: &Type) -> Result<(), CanonError> {
        self.check(name, WireDirection::Input, ty)
    }

    pub fn check_output(&self, name: &str, ty: &Type) -> Result<(), CanonError> {
        self.check(name, WireDirection::Output, ty)
    }

    pub fn check_loopback(&self, name: &str, ty: &Type) -> Result<(), CanonError> {
        self.check(name, WireDirection::Loopback, ty)
    }

    /// Classify a loopback: with a body it is a command, otherwise an address
    pub fn resolve_loopback(&self, name: &str, body: Option<CanonicalExpr>, ty: Type) -> CanonicalWire {
        match body {
            None => CanonicalWire::Address { name: name.to_string(), ty },
            Some(body) => CanonicalWire::Command { name: name.to_string(), command_ty: None, body, result_ty: ty },
        }
    }

    pub fn is_serializable(&self, ty: &Type) -> bool {
        self.offending(ty, &mut Vec::new()).is_none()
    }

    fn check(&self, wire: &str, direction: WireDirection, ty: &Type) -> Result<(), CanonError> {
        match self.offending(ty, &mut Vec::new()) {
            None => Ok(()),
            Some(offending) => Err(CanonError::NotSerializableWireType {
                wire: wire.to_string(),
                direction,
                ty: ty.to_string(),
                offending: offending.to_string(),
            }),
        }
    }

    /// First part of `ty` that cannot be serialized
    ///
    /// `expanding` holds the alias applications currently being expanded.
    fn offending(&self, ty: &Type, expanding: &mut Vec<Type>) -> Option<Type> {
        match ty {
            Type::Lambda(..) | Type::Var(_) => Some(ty.clone()),
            Type::Type(var) if is_leaf(var) || is_container(var, 0) => None,
            Type::Type(_) => Some(ty.clone()),
            Type::App(head, args) => match &**head {
                Type::Type(var) if is_container(var, args.len()) => {
                    args.iter().find_map(|arg| self.offending(arg, expanding))
                }
                _ => Some(ty.clone()),
            },
            Type::Record { fields, extension: None } => {
                fields.iter().find_map(|(_, field)| self.offending(field, expanding))
            }
            Type::Record { extension: Some(_), .. } => Some(ty.clone()),
            Type::Aliased { name, args } => {
                if expanding.len() >= MAX_ALIAS_DEPTH || expanding.contains(ty) {
                    return Some(ty.clone());
                }
                let Some(expanded) = self.aliases.expand(name, args) else {
                    return Some(ty.clone());
                };
                expanding.push(ty.clone());
                let offending = self.offending(&expanded, expanding);
                expanding.pop();
                offending
            }
        }
    }
}

fn is_leaf(var: &CanonicalVar) -> bool {
    BUILTIN_LEAVES.iter().any(|leaf| var.is_builtin(leaf))
        || SERIALIZABLE_LEAVES.iter().any(|(module, name)| var.is(module, name))
}

/// Whether `var` applied to `arity` serializable arguments is serializable
fn is_container(var: &CanonicalVar, arity: usize) -> bool {
    match var.home {
        Home::BuiltIn => {
            (var.name == "List" && arity == 1) || tuple_arity(&var.name) == Some(arity)
        }
        _ => arity == 1 && SERIALIZABLE_CONTAINERS.iter().any(|(module, name)| var.is(module, name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::AliasInfo;
    use tern_ast::{ModuleName, Span};

    fn list(of: Type) -> Type {
        Type::app(Type::builtin("List"), vec![of])
    }

    fn module_type(module: &str, name: &str) -> Type {
        Type::Type(CanonicalVar::module(&ModuleName::from(module), name))
    }

    #[test]
    fn test_serializable_shapes() {
        let aliases = AliasTable::default();
        let validator = WireValidator::new(&aliases);

        let pair = Type::app(Type::builtin("_Tuple2"), vec![Type::builtin("Int"), list(Type::builtin("String"))]);
        let maybe = Type::app(module_type("Maybe", "Maybe"), vec![Type::builtin("Float")]);
        let record = Type::Record {
            fields: vec![("pos".into(), pair.clone()), ("json".into(), module_type("Json.Encode", "Value"))],
            extension: None,
        };

        for ty in [Type::builtin("Bool"), Type::builtin("_Tuple0"), pair, maybe, record] {
            assert!(validator.is_serializable(&ty), "{ty} should be serializable");
        }
    }

    #[test]
    fn test_rejects_functions_and_open_shapes() {
        let aliases = AliasTable::default();
        let validator = WireValidator::new(&aliases);

        let arrow = Type::lambda(Type::builtin("Int"), Type::builtin("Int"));
        let err = validator.check_input("clicks", &list(arrow)).unwrap_err();
        assert_eq!(
            err,
            CanonError::NotSerializableWireType {
                wire: "clicks".into(),
                direction: WireDirection::Input,
                ty: "List (Int -> Int)".into(),
                offending: "Int -> Int".into(),
            }
        );

        let open = Type::Record {
            fields: vec![("x".into(), Type::builtin("Int"))],
            extension: Some(Box::new(Type::Var("r".into()))),
        };
        assert!(validator.check_output("out", &open).is_err());
        assert!(validator.check_output("out", &Type::Var("a".into())).is_err());
        assert!(validator.check_output("out", &module_type("Dict", "Dict")).is_err());
    }

    #[test]
    fn test_expands_aliases() {
        let point = CanonicalVar::top_level(&ModuleName::from("Main"), "Point");
        let boxed = CanonicalVar::top_level(&ModuleName::from("Main"), "Boxed");
        let mut aliases = AliasTable::default();
        aliases.insert(point.clone(), AliasInfo {
            vars: vec![],
            body: Type::Record {
                fields: vec![("x".into(), Type::builtin("Float")), ("y".into(), Type::builtin("Float"))],
                extension: None,
            },
        });
        aliases.insert(boxed.clone(), AliasInfo {
            vars: vec!["a".into()],
            body: Type::Record { fields: vec![("value".into(), Type::Var("a".into()))], extension: None },
        });
        let validator = WireValidator::new(&aliases);

        assert!(validator.check_input("points", &list(Type::Aliased { name: point.clone(), args: vec![] })).is_ok());
        let boxed_point = Type::Aliased { name: boxed.clone(), args: vec![Type::Aliased { name: point, args: vec![] }] };
        assert!(validator.is_serializable(&boxed_point));

        let boxed_fn = Type::Aliased {
            name: boxed,
            args: vec![Type::lambda(Type::builtin("Int"), Type::builtin("Int"))],
        };
        assert!(!validator.is_serializable(&boxed_fn));
    }

    #[test]
    fn test_same_alias_nested_in_itself() {
        let boxed = CanonicalVar::top_level(&ModuleName::from("Main"), "Box");
        let mut aliases = AliasTable::default();
        aliases.insert(boxed.clone(), AliasInfo {
            vars: vec!["a".into()],
            body: Type::Record { fields: vec![("v".into(), Type::Var("a".into()))], extension: None },
        });
        let validator = WireValidator::new(&aliases);

        let inner = Type::Aliased { name: boxed.clone(), args: vec![Type::builtin("Int")] };
        let nested = Type::Aliased { name: boxed.clone(), args: vec![inner] };
        assert!(validator.check_input("inc", &nested).is_ok());

        let nested_fn = Type::Aliased {
            name: boxed.clone(),
            args: vec![Type::Aliased {
                name: boxed,
                args: vec![Type::lambda(Type::builtin("Int"), Type::builtin("Int"))],
            }],
        };
        assert!(!validator.is_serializable(&nested_fn));
    }

    #[test]
    fn test_self_referencing_alias_is_rejected() {
        let looped = CanonicalVar::top_level(&ModuleName::from("Main"), "Loop");
        let mut aliases = AliasTable::default();
        aliases.insert(looped.clone(), AliasInfo {
            vars: vec![],
            body: Type::Record {
                fields: vec![("next".into(), Type::Aliased { name: looped.clone(), args: vec![] })],
                extension: None,
            },
        });
        let validator = WireValidator::new(&aliases);
        assert!(!validator.is_serializable(&Type::Aliased { name: looped, args: vec![] }));
    }

    #[test]
    fn test_loopback_classification() {
        let aliases = AliasTable::default();
        let validator = WireValidator::new(&aliases);
        let ty = Type::builtin("String");

        let address = validator.resolve_loopback("log", None, ty.clone());
        assert_eq!(address, CanonicalWire::Address { name: "log".into(), ty: ty.clone() });

        let body = CanonicalExpr::var(CanonicalVar::builtin("True"), Span::default());
        match validator.resolve_loopback("send", Some(body), ty) {
            CanonicalWire::Command { name, command_ty, .. } => {
                assert_eq!(name, "send");
                assert!(command_ty.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
