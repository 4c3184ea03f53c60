//! Resolving a module's export listing against what it defines

use tern_ast::{Declaration, Exposed, Listing, Span, ValidDecl};

use crate::error::{Context, Diagnostic, ExportCategory, CanonError, Validation};

/// Everything a module introduces, in declaration order
///
/// Datatypes carry a closed listing of all their constructors, and record
/// aliases also introduce a constructor value of the same name.
pub fn defined_names(decls: &[Declaration<ValidDecl>]) -> Vec<Exposed> {
    let mut names = Vec::new();
    for decl in decls {
        match &decl.kind {
            ValidDecl::Definition(def) => {
                names.extend(def.pattern.bound_names().into_iter().map(Exposed::Value));
            }
            ValidDecl::Datatype(datatype) => {
                let ctors = datatype.ctors.iter().map(|(ctor, _)| ctor.clone()).collect();
                names.push(Exposed::Union(datatype.name.clone(), Listing::closed(ctors)));
            }
            ValidDecl::TypeAlias(alias) => {
                names.push(Exposed::Alias(alias.name.clone()));
                if alias.is_record_constructor() {
                    names.push(Exposed::Value(alias.name.clone()));
                }
            }
            ValidDecl::Wire(wire) => names.push(Exposed::Value(wire.name().to_string())),
            ValidDecl::Fixity(_) => {}
        }
    }
    names
}

/// Check `requested` against `full` and produce the concrete export list
///
/// An open listing exports everything. Otherwise every missing name is
/// reported, batched into one diagnostic per category.
pub fn resolve_exports(full: &[Exposed], requested: &Listing<Exposed>, span: Span) -> Validation<Vec<Exposed>> {
    if requested.open {
        return Ok(full.to_vec());
    }

    let is_value = |name: &str| full.iter().any(|e| matches!(e, Exposed::Value(v) if v == name));
    let is_alias = |name: &str| full.iter().any(|e| matches!(e, Exposed::Alias(a) if a == name));
    let ctors_of = |name: &str| {
        full.iter().find_map(|e| match e {
            Exposed::Union(union, listing) if union == name => Some(&listing.explicit),
            _ => None,
        })
    };

    let mut exports = Vec::new();
    let mut missing_values = Vec::new();
    let mut missing_types = Vec::new();
    let mut missing_ctors: Vec<(String, Vec<String>)> = Vec::new();

    for item in &requested.explicit {
        match item {
            Exposed::Value(name) => {
                if is_value(name) {
                    exports.push(item.clone());
                } else {
                    missing_values.push(name.clone());
                }
            }
            Exposed::Alias(name) => {
                if is_alias(name) {
                    exports.push(item.clone());
                    if is_value(name) {
                        exports.push(Exposed::Value(name.clone()));
                    }
                } else if ctors_of(name).is_some() {
                    // a bare type name may refer to a datatype, exported without constructors
                    exports.push(Exposed::Union(name.clone(), Listing::empty()));
                } else {
                    missing_types.push(name.clone());
                }
            }
            Exposed::Union(name, listing) => match ctors_of(name) {
                None => missing_types.push(name.clone()),
                Some(ctors) if listing.open => {
                    exports.push(Exposed::Union(name.clone(), Listing::closed(ctors.clone())));
                }
                Some(ctors) => {
                    let unknown: Vec<String> =
                        listing.explicit.iter().filter(|ctor| !ctors.contains(ctor)).cloned().collect();
                    if unknown.is_empty() {
                        exports.push(Exposed::Union(name.clone(), Listing::closed(listing.explicit.clone())));
                    } else {
                        missing_ctors.push((name.clone(), unknown));
                    }
                }
            },
        }
    }

    let mut batches = vec![(ExportCategory::Value, missing_values), (ExportCategory::Type, missing_types)];
    batches.extend(
        missing_ctors
            .into_iter()
            .map(|(datatype, names)| (ExportCategory::Constructor { datatype }, names)),
    );

    let diagnostics: Vec<Diagnostic> = batches
        .into_iter()
        .filter(|(_, names)| !names.is_empty())
        .map(|(category, names)| {
            let mut diagnostic = Diagnostic::new(CanonError::NonexistentExport { category, names }, span);
            diagnostic.context.push(Context::Exports);
            diagnostic
        })
        .collect();

    if diagnostics.is_empty() { Ok(exports) } else { Err(diagnostics) }
}
