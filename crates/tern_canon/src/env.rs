//! Module-level environment: every name visible at the top of a module
//!
//! Names come from three layers. Home-module declarations win over
//! everything imported; imported names (builtins plus unqualified
//! exposures) may have several candidates, and that ambiguity is only
//! reported when a lookup actually hits it.

use rustc_hash::FxHashMap;
use tern_ast::{Exposed, Import, ModuleName, Name, Span, ValidDecl, ValidModule};
use tracing::debug;

use crate::canonical::{CanonicalVar, Type};
use crate::error::{collect_all, CanonError, Context, Diagnostic, Namespace, Validation, ValidationExt};
use crate::interface::{AliasInfo, Interface, Interfaces};

/// Type constructors that are always in scope, with their arity
const BUILTIN_TYPES: [(&str, usize); 6] =
    [("Int", 0), ("Float", 0), ("Char", 0), ("String", 0), ("Bool", 0), ("List", 1)];

/// Data constructors and primitive operators that are always in scope
const BUILTIN_VALUES: [&str; 17] = [
    "[]", "::", "True", "False", "+", "-", "*", "/", "==", "/=", "<", ">", "<=", ">=", "++", "&&", "||",
];

const MAX_TUPLE: usize = 9;

pub fn tuple_name(arity: usize) -> String {
    format!("_Tuple{}", arity)
}

/// Arity of a builtin tuple name such as `_Tuple3`
pub fn tuple_arity(name: &str) -> Option<usize> {
    name.strip_prefix("_Tuple")?.parse().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Union,
    Alias,
}

/// A type constructor in scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeEntry {
    pub var: CanonicalVar,
    pub arity: usize,
    pub kind: TypeKind,
}

/// Canonical alias bodies, used to see through aliases
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: FxHashMap<CanonicalVar, AliasInfo>,
}

impl AliasTable {
    pub fn insert(&mut self, name: CanonicalVar, info: AliasInfo) {
        self.aliases.insert(name, info);
    }

    pub fn get(&self, name: &CanonicalVar) -> Option<&AliasInfo> {
        self.aliases.get(name)
    }

    /// Body of `name` with `args` substituted for its parameters
    pub fn expand(&self, name: &CanonicalVar, args: &[Type]) -> Option<Type> {
        let info = self.aliases.get(name)?;
        if info.vars.len() != args.len() {
            return None;
        }
        let substitution: Vec<(String, Type)> =
            info.vars.iter().cloned().zip(args.iter().cloned()).collect();
        Some(info.body.substitute(&substitution))
    }
}

fn push_unique<T: PartialEq>(candidates: &mut Vec<T>, candidate: T) {
    if !candidates.contains(&candidate) {
        candidates.push(candidate);
    }
}

/// Close spellings of `name` among `names`, best first
pub fn suggest<'a>(name: &str, names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let limit = std::cmp::max(name.len(), 3) / 3;
    let mut close: Vec<(usize, &str)> = names
        .into_iter()
        .filter(|candidate| *candidate != name)
        .map(|candidate| (strsim::levenshtein(candidate, name), candidate))
        .filter(|(distance, _)| *distance <= limit)
        .collect();
    close.sort();
    close.dedup();
    close.into_iter().take(3).map(|(_, candidate)| candidate.to_string()).collect()
}

/// Everything visible at module scope
#[derive(Debug, Clone)]
pub struct Environment {
    home: ModuleName,
    /// Qualifier to the modules imported under it
    qualifiers: FxHashMap<String, Vec<ModuleName>>,
    home_values: FxHashMap<String, CanonicalVar>,
    home_types: FxHashMap<String, TypeEntry>,
    values: FxHashMap<String, Vec<CanonicalVar>>,
    types: FxHashMap<String, Vec<TypeEntry>>,
    qualified_values: FxHashMap<(String, String), Vec<CanonicalVar>>,
    qualified_types: FxHashMap<(String, String), Vec<TypeEntry>>,
    aliases: AliasTable,
}

impl Environment {
    /// Environment with only the builtins in scope
    pub fn new(home: ModuleName) -> Self {
        let mut env = Self {
            home,
            qualifiers: FxHashMap::default(),
            home_values: FxHashMap::default(),
            home_types: FxHashMap::default(),
            values: FxHashMap::default(),
            types: FxHashMap::default(),
            qualified_values: FxHashMap::default(),
            qualified_types: FxHashMap::default(),
            aliases: AliasTable::default(),
        };
        env.define_builtins();
        env
    }

    fn define_builtins(&mut self) {
        for (name, arity) in BUILTIN_TYPES {
            self.expose_type(name, TypeEntry {
                var: CanonicalVar::builtin(name),
                arity,
                kind: TypeKind::Union,
            });
        }
        for name in BUILTIN_VALUES {
            self.expose_value(name, CanonicalVar::builtin(name));
        }
        for arity in 0..=MAX_TUPLE {
            let name = tuple_name(arity);
            self.expose_type(&name, TypeEntry {
                var: CanonicalVar::builtin(name.clone()),
                arity,
                kind: TypeKind::Union,
            });
            self.expose_value(&name, CanonicalVar::builtin(name.clone()));
        }
    }

    /// Build the environment of `module` from the interfaces of its imports
    pub fn build(interfaces: &Interfaces, module: &ValidModule) -> Validation<Environment> {
        let mut env = Environment::new(module.name.clone());

        for decl in &module.decls {
            env.define_home(&decl.kind);
        }

        let imports: Vec<Validation<()>> = module
            .imports
            .iter()
            .map(|import| {
                env.add_import(interfaces, import)
                    .with_context(Context::Import(import.module.clone()))
            })
            .collect();
        collect_all(imports)?;

        debug!(
            module = %env.home,
            home_values = env.home_values.len(),
            imported_values = env.values.len(),
            qualifiers = env.qualifiers.len(),
            "built environment"
        );
        Ok(env)
    }

    pub fn home(&self) -> &ModuleName {
        &self.home
    }

    /// Bodies of every imported alias
    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    fn define_home(&mut self, decl: &ValidDecl) {
        match decl {
            ValidDecl::Definition(def) => {
                for name in def.pattern.bound_names() {
                    self.define_home_value(&name);
                }
            }
            ValidDecl::Datatype(datatype) => {
                self.home_types.insert(datatype.name.clone(), TypeEntry {
                    var: CanonicalVar::top_level(&self.home, datatype.name.clone()),
                    arity: datatype.vars.len(),
                    kind: TypeKind::Union,
                });
                for (ctor, _) in &datatype.ctors {
                    self.define_home_value(ctor);
                }
            }
            ValidDecl::TypeAlias(alias) => {
                self.home_types.insert(alias.name.clone(), TypeEntry {
                    var: CanonicalVar::top_level(&self.home, alias.name.clone()),
                    arity: alias.vars.len(),
                    kind: TypeKind::Alias,
                });
                if alias.is_record_constructor() {
                    self.define_home_value(&alias.name);
                }
            }
            ValidDecl::Wire(wire) => self.define_home_value(wire.name()),
            ValidDecl::Fixity(_) => {}
        }
    }

    fn define_home_value(&mut self, name: &str) {
        let var = CanonicalVar::top_level(&self.home, name);
        self.home_values.insert(name.to_string(), var);
    }

    fn expose_value(&mut self, name: &str, var: CanonicalVar) {
        push_unique(self.values.entry(name.to_string()).or_default(), var);
    }

    fn expose_type(&mut self, name: &str, entry: TypeEntry) {
        push_unique(self.types.entry(name.to_string()).or_default(), entry);
    }

    fn add_import(&mut self, interfaces: &Interfaces, import: &Import) -> Validation<()> {
        let Some(interface) = interfaces.get(&import.module) else {
            return Err(vec![Diagnostic::new(
                CanonError::UnknownModule { module: import.module.clone() },
                import.span,
            )]);
        };

        let module = &import.module;
        let qualifier = import.qualifier().to_string();
        push_unique(self.qualifiers.entry(qualifier.clone()).or_default(), module.clone());

        for value in &interface.values {
            push_unique(
                self.qualified_values.entry((qualifier.clone(), value.clone())).or_default(),
                CanonicalVar::module(module, value.clone()),
            );
        }
        for (name, info) in &interface.aliases {
            let entry = alias_entry(module, name, info);
            self.aliases.insert(entry.var.clone(), info.clone());
            push_unique(self.qualified_types.entry((qualifier.clone(), name.clone())).or_default(), entry);
        }
        for (name, info) in &interface.unions {
            let entry = union_entry(module, name, info.vars.len());
            push_unique(self.qualified_types.entry((qualifier.clone(), name.clone())).or_default(), entry);
        }

        if import.exposing.open {
            self.expose_everything(module, interface);
            return Ok(());
        }

        let exposed: Vec<Validation<()>> = import
            .exposing
            .explicit
            .iter()
            .map(|item| self.expose_item(module, interface, item, import.span))
            .collect();
        collect_all(exposed).map(|_| ())
    }

    fn expose_everything(&mut self, module: &ModuleName, interface: &Interface) {
        for value in &interface.values {
            self.expose_value(value, CanonicalVar::module(module, value.clone()));
        }
        for (name, info) in &interface.aliases {
            self.expose_type(name, alias_entry(module, name, info));
        }
        for (name, info) in &interface.unions {
            self.expose_type(name, union_entry(module, name, info.vars.len()));
        }
    }

    fn expose_item(&mut self, module: &ModuleName, interface: &Interface, item: &Exposed, span: Span) -> Validation<()> {
        let unknown = |name: &str, candidates: Vec<&str>| {
            Err(vec![Diagnostic::new(
                CanonError::UnknownExposed {
                    module: module.clone(),
                    name: name.to_string(),
                    suggestions: suggest(name, candidates),
                },
                span,
            )])
        };

        match item {
            Exposed::Value(name) => {
                if !interface.exports_value(name) {
                    return unknown(name, interface.values.iter().map(String::as_str).collect());
                }
                self.expose_value(name, CanonicalVar::module(module, name.clone()));
            }
            Exposed::Alias(name) => {
                if let Some(info) = interface.aliases.get(name) {
                    self.expose_type(name, alias_entry(module, name, info));
                    if interface.exports_value(name) {
                        self.expose_value(name, CanonicalVar::module(module, name.clone()));
                    }
                } else if let Some(info) = interface.unions.get(name) {
                    self.expose_type(name, union_entry(module, name, info.vars.len()));
                } else {
                    let types = interface.aliases.keys().chain(interface.unions.keys());
                    return unknown(name, types.map(String::as_str).collect());
                }
            }
            Exposed::Union(name, listing) => {
                let Some(info) = interface.unions.get(name) else {
                    return unknown(name, interface.unions.keys().map(String::as_str).collect());
                };
                self.expose_type(name, union_entry(module, name, info.vars.len()));

                if listing.open {
                    for (ctor, _) in &info.ctors {
                        self.expose_value(ctor, CanonicalVar::module(module, ctor.clone()));
                    }
                    return Ok(());
                }

                let ctors: Vec<Validation<()>> = listing
                    .explicit
                    .iter()
                    .map(|ctor| {
                        if info.has_ctor(ctor) {
                            self.expose_value(ctor, CanonicalVar::module(module, ctor.clone()));
                            Ok(())
                        } else {
                            unknown(ctor, info.ctors.iter().map(|(c, _)| c.as_str()).collect())
                        }
                    })
                    .collect();
                collect_all(ctors)?;
            }
        }
        Ok(())
    }

    fn qualified<'a, T>(
        &self,
        table: &'a FxHashMap<(String, String), Vec<T>>,
        qualifier: &str,
        name: &str,
    ) -> Result<Option<&'a Vec<T>>, CanonError> {
        if !self.qualifiers.contains_key(qualifier) {
            return Err(CanonError::UnknownQualifier {
                qualifier: qualifier.to_string(),
                name: name.to_string(),
            });
        }
        Ok(table.get(&(qualifier.to_string(), name.to_string())))
    }

    fn pick<T: Clone>(
        namespace: Namespace,
        name: &Name,
        candidates: Option<&Vec<T>>,
        home_of: impl Fn(&T) -> String,
    ) -> Result<T, CanonError> {
        match candidates.map(Vec::as_slice) {
            Some([single]) => Ok(single.clone()),
            Some(many @ [_, _, ..]) => Err(CanonError::AmbiguousName {
                namespace,
                name: name.to_string(),
                candidates: many.iter().map(home_of).collect(),
            }),
            Some([]) | None => Err(CanonError::UnresolvedName {
                namespace,
                name: name.to_string(),
                suggestions: Vec::new(),
            }),
        }
    }

    /// Resolve a value or constructor name at module scope
    pub fn lookup_value(&self, name: &Name) -> Result<CanonicalVar, CanonError> {
        let home_of = |var: &CanonicalVar| var.home.to_string();
        match &name.qualifier {
            None => {
                if let Some(var) = self.home_values.get(&name.name) {
                    return Ok(var.clone());
                }
                Self::pick(Namespace::Value, name, self.values.get(&name.name), home_of)
                    .map_err(|error| self.with_suggestions(error, name))
            }
            Some(qualifier) if *qualifier == self.home.as_str() && !self.qualifiers.contains_key(qualifier) => {
                match self.home_values.get(&name.name) {
                    Some(var) => Ok(var.clone()),
                    None => Err(self.with_suggestions(
                        CanonError::UnresolvedName {
                            namespace: Namespace::Value,
                            name: name.to_string(),
                            suggestions: Vec::new(),
                        },
                        name,
                    )),
                }
            }
            Some(qualifier) => {
                let candidates = self.qualified(&self.qualified_values, qualifier, &name.name)?;
                Self::pick(Namespace::Value, name, candidates, home_of)
                    .map_err(|error| self.with_suggestions(error, name))
            }
        }
    }

    /// Resolve a type constructor name at module scope
    pub fn lookup_type(&self, name: &Name) -> Result<TypeEntry, CanonError> {
        let home_of = |entry: &TypeEntry| entry.var.home.to_string();
        match &name.qualifier {
            None => {
                if let Some(entry) = self.home_types.get(&name.name) {
                    return Ok(entry.clone());
                }
                Self::pick(Namespace::Type, name, self.types.get(&name.name), home_of)
                    .map_err(|error| self.with_suggestions(error, name))
            }
            Some(qualifier) if *qualifier == self.home.as_str() && !self.qualifiers.contains_key(qualifier) => {
                self.home_types.get(&name.name).cloned().ok_or_else(|| CanonError::UnresolvedName {
                    namespace: Namespace::Type,
                    name: name.to_string(),
                    suggestions: suggest(&name.name, self.home_types.keys().map(String::as_str)),
                })
            }
            Some(qualifier) => {
                let candidates = self.qualified(&self.qualified_types, qualifier, &name.name)?;
                Self::pick(Namespace::Type, name, candidates, home_of)
                    .map_err(|error| self.with_suggestions(error, name))
            }
        }
    }

    /// Unqualified names visible in `namespace`, for suggestions
    pub fn names(&self, namespace: Namespace) -> Vec<&str> {
        match namespace {
            Namespace::Value => self.home_values.keys().chain(self.values.keys()).map(String::as_str).collect(),
            Namespace::Type => self.home_types.keys().chain(self.types.keys()).map(String::as_str).collect(),
        }
    }

    fn qualified_names(&self, namespace: Namespace, qualifier: &str) -> Vec<&str> {
        let keys: Vec<&(String, String)> = match namespace {
            Namespace::Value => self.qualified_values.keys().collect(),
            Namespace::Type => self.qualified_types.keys().collect(),
        };
        keys.into_iter().filter(|(q, _)| q == qualifier).map(|(_, name)| name.as_str()).collect()
    }

    fn with_suggestions(&self, error: CanonError, name: &Name) -> CanonError {
        match error {
            CanonError::UnresolvedName { namespace, name: shown, .. } => {
                let candidates = match &name.qualifier {
                    Some(qualifier) if *qualifier == self.home.as_str() => match namespace {
                        Namespace::Value => self.home_values.keys().map(String::as_str).collect(),
                        Namespace::Type => self.home_types.keys().map(String::as_str).collect(),
                    },
                    Some(qualifier) => self.qualified_names(namespace, qualifier),
                    None => self.names(namespace),
                };
                CanonError::UnresolvedName {
                    namespace,
                    name: shown,
                    suggestions: suggest(&name.name, candidates),
                }
            }
            other => other,
        }
    }
}

fn alias_entry(module: &ModuleName, name: &str, info: &AliasInfo) -> TypeEntry {
    TypeEntry {
        var: CanonicalVar::module(module, name),
        arity: info.vars.len(),
        kind: TypeKind::Alias,
    }
}

fn union_entry(module: &ModuleName, name: &str, arity: usize) -> TypeEntry {
    TypeEntry {
        var: CanonicalVar::module(module, name),
        arity,
        kind: TypeKind::Union,
    }
}
