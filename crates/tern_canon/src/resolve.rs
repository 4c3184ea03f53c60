//! Name resolution inside declarations
//!
//! The [`Canonicalizer`] walks one module with a stack of local scopes on
//! top of the module [`Environment`], and records which imported modules
//! the resolved names came from.

use std::collections::BTreeSet;
use tern_ast::{ModuleName, Name, Pattern, PatternKind, RawType, Span};
use tracing::trace;

use crate::canonical::{CanonicalPattern, CanonicalVar, Type};
use crate::env::{suggest, Environment, TypeKind};
use crate::error::{collect_all, fail, zip, CanonError, Validation};

pub struct Canonicalizer<'env> {
    env: &'env Environment,
    /// Innermost scope last
    scopes: Vec<Vec<String>>,
    used: BTreeSet<ModuleName>,
}

impl<'env> Canonicalizer<'env> {
    pub fn new(env: &'env Environment) -> Self {
        Self { env, scopes: Vec::new(), used: BTreeSet::new() }
    }

    pub fn environment(&self) -> &'env Environment {
        self.env
    }

    pub fn used_modules(&self) -> &BTreeSet<ModuleName> {
        &self.used
    }

    pub fn into_used_modules(self) -> BTreeSet<ModuleName> {
        self.used
    }

    pub fn record_use(&mut self, module: &ModuleName) {
        if self.used.insert(module.clone()) {
            trace!(module = %module, "module used");
        }
    }

    /// Run `f` with `names` bound as locals
    pub fn with_bindings<T>(&mut self, names: Vec<String>, f: impl FnOnce(&mut Self) -> T) -> T {
        self.scopes.push(names);
        let result = f(self);
        self.scopes.pop();
        result
    }

    fn is_local(&self, name: &str) -> bool {
        self.scopes.iter().rev().any(|scope| scope.iter().any(|bound| bound == name))
    }

    fn local_names(&self) -> impl Iterator<Item = &str> {
        self.scopes.iter().flatten().map(String::as_str)
    }

    /// Resolve a value, constructor or operator reference
    pub fn resolve_value(&mut self, name: &Name, span: Span) -> Validation<CanonicalVar> {
        if name.qualifier.is_none() && self.is_local(&name.name) {
            return Ok(CanonicalVar::local(name.name.clone()));
        }

        match self.env.lookup_value(name) {
            Ok(var) => {
                if let Some(module) = var.module_dependency() {
                    self.record_use(module);
                }
                Ok(var)
            }
            Err(CanonError::UnresolvedName { namespace, name: shown, suggestions }) if name.qualifier.is_none() => {
                let mut candidates: Vec<&str> = self.local_names().collect();
                candidates.extend(suggestions.iter().map(String::as_str));
                let suggestions = suggest(&name.name, candidates);
                fail(CanonError::UnresolvedName { namespace, name: shown, suggestions }, span)
            }
            Err(error) => fail(error, span),
        }
    }

    /// Resolve a written type; alias references stay unexpanded
    pub fn resolve_type(&mut self, ty: &RawType, span: Span) -> Validation<Type> {
        match ty {
            RawType::Lambda(from, to) => {
                zip(self.resolve_type(from, span), self.resolve_type(to, span)).map(|(from, to)| Type::lambda(from, to))
            }
            RawType::Var(name) => Ok(Type::Var(name.clone())),
            RawType::Type { name, args } => {
                let head = match self.env.lookup_type(name) {
                    Ok(entry) => {
                        if let Some(module) = entry.var.module_dependency() {
                            self.record_use(module);
                        }
                        Ok(entry)
                    }
                    Err(error) => fail(error, span),
                };
                let args = collect_all(args.iter().map(|arg| self.resolve_type(arg, span)));
                let (entry, args) = zip(head, args)?;

                if entry.arity != args.len() {
                    return fail(
                        CanonError::BadTypeArity { name: name.to_string(), expected: entry.arity, found: args.len() },
                        span,
                    );
                }
                Ok(match entry.kind {
                    TypeKind::Alias => Type::Aliased { name: entry.var, args },
                    TypeKind::Union => Type::app(Type::Type(entry.var), args),
                })
            }
            RawType::Record { fields, extension } => {
                let fields = collect_all(
                    fields.iter().map(|(field, ty)| self.resolve_type(ty, span).map(|ty| (field.clone(), ty))),
                );
                let extension = extension.as_ref().map(|ext| self.resolve_type(ext, span)).transpose();
                zip(fields, extension).map(|(fields, extension)| Type::Record {
                    fields,
                    extension: extension.map(Box::new),
                })
            }
        }
    }

    /// Resolve the constructors a pattern mentions; bound names are left to the caller
    pub fn resolve_pattern(&mut self, pattern: &Pattern<Name>) -> Validation<CanonicalPattern> {
        let kind = match &pattern.kind {
            PatternKind::Data { ctor, args } => {
                let ctor = self.resolve_value(ctor, pattern.span);
                let args = collect_all(args.iter().map(|arg| self.resolve_pattern(arg)));
                zip(ctor, args).map(|(ctor, args)| PatternKind::Data { ctor, args })?
            }
            PatternKind::Record(fields) => PatternKind::Record(fields.clone()),
            PatternKind::Alias { name, pattern: inner } => PatternKind::Alias {
                name: name.clone(),
                pattern: Box::new(self.resolve_pattern(inner)?),
            },
            PatternKind::Var(name) => PatternKind::Var(name.clone()),
            PatternKind::Anything => PatternKind::Anything,
            PatternKind::Literal(literal) => PatternKind::Literal(literal.clone()),
        };
        Ok(Pattern::new(kind, pattern.span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::{Interface, Interfaces};
    use tern_ast::{Declaration, Exposed, Import, Listing, Module, ValidModule};

    fn env_with_lists() -> Environment {
        let mut interfaces = Interfaces::new();
        interfaces.insert("List", Interface { values: vec!["map".into(), "length".into()], ..Default::default() });
        let module: ValidModule = Module {
            name: ModuleName::from("Main"),
            imports: vec![Import::new("List").exposing(Listing::closed(vec![Exposed::Value("map".into())]))],
            exports: Listing::open(),
            decls: Vec::<Declaration<_>>::new(),
            span: Span::default(),
        };
        Environment::build(&interfaces, &module).unwrap()
    }

    #[test]
    fn test_locals_shadow_imports() {
        let env = env_with_lists();
        let mut canon = Canonicalizer::new(&env);

        let var = canon.with_bindings(vec!["map".into()], |canon| {
            canon.resolve_value(&Name::unqualified("map"), Span::default()).unwrap()
        });
        assert_eq!(var, CanonicalVar::local("map"));
        assert!(canon.used_modules().is_empty());

        let var = canon.resolve_value(&Name::unqualified("map"), Span::default()).unwrap();
        assert_eq!(var, CanonicalVar::module(&ModuleName::from("List"), "map"));
        assert!(canon.used_modules().contains(&ModuleName::from("List")));
    }

    #[test]
    fn test_unresolved_suggests_locals() {
        let env = env_with_lists();
        let mut canon = Canonicalizer::new(&env);
        let errors = canon
            .with_bindings(vec!["count".into()], |canon| canon.resolve_value(&Name::unqualified("coutn"), Span::new(3, 8)))
            .unwrap_err();

        assert_eq!(errors[0].span, Span::new(3, 8));
        match &errors[0].error {
            CanonError::UnresolvedName { suggestions, .. } => assert_eq!(suggestions, &vec!["count".to_string()]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_type_arity_and_builtins() {
        let env = env_with_lists();
        let mut canon = Canonicalizer::new(&env);

        let ty = canon.resolve_type(&RawType::app("List", vec![RawType::named("Int")]), Span::default()).unwrap();
        assert_eq!(ty.to_string(), "List Int");

        let errors = canon.resolve_type(&RawType::named("List"), Span::default()).unwrap_err();
        assert_eq!(errors[0].error, CanonError::BadTypeArity { name: "List".into(), expected: 1, found: 0 });
    }

    #[test]
    fn test_pattern_constructors_resolve() {
        let env = env_with_lists();
        let mut canon = Canonicalizer::new(&env);
        let pattern = Pattern::new(
            PatternKind::Data {
                ctor: Name::unqualified("::"),
                args: vec![Pattern::var("x", Span::default()), Pattern::new(PatternKind::Anything, Span::default())],
            },
            Span::default(),
        );
        let resolved = canon.resolve_pattern(&pattern).unwrap();
        match resolved.kind {
            PatternKind::Data { ctor, args } => {
                assert_eq!(ctor, CanonicalVar::builtin("::"));
                assert_eq!(args.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
