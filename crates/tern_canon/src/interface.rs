//! Compiled module interfaces
//!
//! An interface is what an already-compiled module exports. The pass only
//! reads them; how they are cached on disk is not its concern, beyond the
//! persisted `Assoc` tag of exported fixities.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tern_ast::{Exposed, Fixity, ModuleName};

use crate::canonical::{CanonicalModule, Type};

/// Alias parameters and body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasInfo {
    pub vars: Vec<String>,
    pub body: Type,
}

/// Datatype parameters and constructors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionInfo {
    pub vars: Vec<String>,
    pub ctors: Vec<(String, Vec<Type>)>,
}

impl UnionInfo {
    pub fn has_ctor(&self, ctor: &str) -> bool {
        self.ctors.iter().any(|(name, _)| name == ctor)
    }
}

/// Exported symbols of one compiled module
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Interface {
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub aliases: IndexMap<String, AliasInfo>,
    #[serde(default)]
    pub unions: IndexMap<String, UnionInfo>,
    #[serde(default)]
    pub fixities: Vec<Fixity>,
}

impl Interface {
    pub fn exports_value(&self, name: &str) -> bool {
        self.values.iter().any(|value| value == name)
    }

    /// Interface of a freshly canonicalized module, restricted to its exports
    ///
    /// Exported types refer to the module's own names the way its importers
    /// see them.
    pub fn from_module(module: &CanonicalModule) -> Self {
        let home = &module.name;
        let mut interface = Interface::default();
        for exposed in &module.exports {
            match exposed {
                Exposed::Value(name) => interface.values.push(name.clone()),
                Exposed::Alias(name) => {
                    if let Some(info) = module.body.aliases.get(name) {
                        let body = info.body.rehome(home);
                        interface.aliases.insert(name.clone(), AliasInfo { vars: info.vars.clone(), body });
                    }
                }
                Exposed::Union(name, listing) => {
                    if let Some(info) = module.body.datatypes.get(name) {
                        let ctors = info
                            .ctors
                            .iter()
                            .filter(|(ctor, _)| listing.explicit.contains(ctor))
                            .map(|(ctor, args)| (ctor.clone(), args.iter().map(|arg| arg.rehome(home)).collect()))
                            .collect::<Vec<(String, Vec<Type>)>>();
                        for (ctor, _) in &ctors {
                            interface.values.push(ctor.clone());
                        }
                        interface.unions.insert(name.clone(), UnionInfo { vars: info.vars.clone(), ctors });
                    }
                }
            }
        }
        interface.fixities = module
            .body
            .fixities
            .iter()
            .filter(|fixity| interface.exports_value(&fixity.operator))
            .cloned()
            .collect();
        interface
    }
}

/// Read-only table of every interface available to a module
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Interfaces {
    modules: FxHashMap<ModuleName, Interface>,
}

impl Interfaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<ModuleName>, interface: Interface) {
        self.modules.insert(name.into(), interface);
    }

    pub fn get(&self, name: &ModuleName) -> Option<&Interface> {
        self.modules.get(name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::CanonicalVar;
    use crate::module::canonicalize_source;
    use tern_ast::{Datatype, Declaration, Import, Listing, Module, RawType, SourceDecl, Span, TypeAlias, WireFragment};

    fn alias(name: &str, alias: RawType) -> Declaration<SourceDecl> {
        Declaration::new(SourceDecl::TypeAlias(TypeAlias { name: name.into(), vars: vec![], alias }), Span::default())
    }

    fn shapes_module() -> CanonicalModule {
        let point = RawType::Record { fields: vec![("x".into(), RawType::named("Int"))], extension: None };
        let shape = Datatype {
            name: "Shape".into(),
            vars: vec![],
            ctors: vec![
                ("Dot".into(), vec![RawType::named("Point")]),
                ("Blank".into(), vec![]),
            ],
        };
        let source = Module {
            name: ModuleName::from("Shapes"),
            imports: vec![],
            exports: Listing::closed(vec![
                Exposed::Alias("Point".into()),
                Exposed::Alias("Path".into()),
                Exposed::Union("Shape".into(), Listing::closed(vec!["Dot".into()])),
            ]),
            decls: vec![
                alias("Point", point),
                alias("Path", RawType::app("List", vec![RawType::named("Point")])),
                Declaration::new(SourceDecl::Datatype(shape), Span::default()),
            ],
            span: Span::default(),
        };
        canonicalize_source(&Interfaces::new(), &source).unwrap()
    }

    #[test]
    fn test_from_module_rehomes_exported_types() {
        let interface = Interface::from_module(&shapes_module());
        let shapes = ModuleName::from("Shapes");
        let point = Type::Aliased { name: CanonicalVar::module(&shapes, "Point"), args: vec![] };

        assert_eq!(interface.values, vec!["Point".to_string(), "Dot".to_string()]);
        assert_eq!(interface.aliases["Path"].body, Type::app(Type::builtin("List"), vec![point.clone()]));
        assert_eq!(interface.unions["Shape"].ctors, vec![("Dot".to_string(), vec![point])]);
    }

    #[test]
    fn test_exported_alias_chain_expands_in_importer() {
        let mut interfaces = Interfaces::new();
        interfaces.insert("Shapes", Interface::from_module(&shapes_module()));

        let wire = SourceDecl::Wire(WireFragment::InputAnnotation {
            name: "paths".into(),
            annotation: RawType::named("Shapes.Path"),
        });
        let source = Module {
            name: ModuleName::from("Main"),
            imports: vec![Import::new("Shapes")],
            exports: Listing::open(),
            decls: vec![Declaration::new(wire, Span::default())],
            span: Span::default(),
        };
        let canonical = canonicalize_source(&interfaces, &source).unwrap();
        assert_eq!(canonical.body.wires, vec!["paths"]);
    }

    #[test]
    fn test_decode_interfaces_table() {
        let json = r#"{
            "Maybe": {
                "values": ["withDefault", "Just", "Nothing"],
                "unions": {
                    "Maybe": {
                        "vars": ["a"],
                        "ctors": [["Just", [{"Var": "a"}]], ["Nothing", []]]
                    }
                }
            }
        }"#;
        let interfaces: Interfaces = serde_json::from_str(json).unwrap();
        let maybe = interfaces.get(&ModuleName::from("Maybe")).unwrap();
        assert!(maybe.exports_value("withDefault"));
        assert!(maybe.unions["Maybe"].has_ctor("Nothing"));
    }
}
