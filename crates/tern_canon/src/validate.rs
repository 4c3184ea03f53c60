//! Pairing annotations with definitions and assembling wires
//!
//! This is the step between parsing and canonicalization: the parser emits
//! annotations and wire fragments as separate declarations, and this pass
//! folds them into the validated form the canonicalizer consumes.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use tern_ast::{
    Declaration, Expr, ExprKind, Module, PatternKind, RawType, SourceDecl, SourceDef, SourceExpr, SourceModule, Span,
    ValidDecl, ValidDef, ValidExpr, ValidModule, ValidWire, WireFragment,
};

use crate::error::{collect_all, zip, CanonError, Diagnostic, Validation};

/// Validate a parsed module; diagnostics come back in source order
pub fn validate_module(module: &SourceModule) -> Validation<ValidModule> {
    let defs: Vec<&SourceDef> = module
        .decls
        .iter()
        .filter_map(|decl| match &decl.kind {
            SourceDecl::Definition(def) => Some(def),
            _ => None,
        })
        .collect();
    let fragments: Vec<(usize, Span, &WireFragment)> = module
        .decls
        .iter()
        .enumerate()
        .filter_map(|(index, decl)| match &decl.kind {
            SourceDecl::Wire(fragment) => Some((index, decl.span, fragment)),
            _ => None,
        })
        .collect();

    let (defs, wires) = zip(validate_defs(&defs), assemble_wires(&fragments)).map_err(|mut diagnostics| {
        diagnostics.sort_by_key(|diagnostic| diagnostic.span.start);
        diagnostics
    })?;

    let mut defs = defs.into_iter();
    let mut wires: FxHashMap<usize, (Span, ValidWire)> =
        wires.into_iter().map(|(index, span, wire)| (index, (span, wire))).collect();

    let mut decls = Vec::new();
    for (index, decl) in module.decls.iter().enumerate() {
        let valid = match &decl.kind {
            SourceDecl::Definition(SourceDef::Definition { .. }) => {
                defs.next().map(|def| Declaration::new(ValidDecl::Definition(def), decl.span))
            }
            SourceDecl::Definition(SourceDef::TypeAnnotation { .. }) => None,
            SourceDecl::Datatype(datatype) => Some(Declaration::new(ValidDecl::Datatype(datatype.clone()), decl.span)),
            SourceDecl::TypeAlias(alias) => Some(Declaration::new(ValidDecl::TypeAlias(alias.clone()), decl.span)),
            SourceDecl::Fixity(fixity) => Some(Declaration::new(ValidDecl::Fixity(fixity.clone()), decl.span)),
            SourceDecl::Wire(_) => wires.remove(&index).map(|(span, wire)| Declaration::new(ValidDecl::Wire(wire), span)),
        };
        decls.extend(valid);
    }

    Ok(Module {
        name: module.name.clone(),
        imports: module.imports.clone(),
        exports: module.exports.clone(),
        decls,
        span: module.span,
    })
}

/// Pair the annotations of one binding group with its definitions
fn validate_defs(defs: &[&SourceDef]) -> Validation<Vec<ValidDef>> {
    let mut errors = Vec::new();
    let mut annotations: IndexMap<&str, (&RawType, Span)> = IndexMap::new();
    for def in defs {
        if let SourceDef::TypeAnnotation { name, annotation, span } = def {
            if annotations.contains_key(name.as_str()) {
                errors.push(Diagnostic::new(CanonError::DuplicateDefinition { name: name.clone() }, *span));
            } else {
                annotations.insert(name.as_str(), (annotation, *span));
            }
        }
    }

    let mut bound: Vec<String> = Vec::new();
    let mut valid = Vec::new();
    for def in defs {
        let SourceDef::Definition { pattern, body, span } = def else { continue };

        for name in pattern.bound_names() {
            if bound.contains(&name) {
                errors.push(Diagnostic::new(CanonError::DuplicateDefinition { name }, *span));
            } else {
                bound.push(name);
            }
        }

        let annotation = match &pattern.kind {
            PatternKind::Var(name) => annotations.shift_remove(name.as_str()).map(|(ty, _)| ty.clone()),
            _ => None,
        };
        valid.push(validate_expr(body).map(|body| ValidDef {
            pattern: pattern.clone(),
            body,
            annotation,
            span: *span,
        }));
    }

    for (name, (_, span)) in annotations {
        errors.push(Diagnostic::new(CanonError::AnnotationWithoutDefinition { name: name.to_string() }, span));
    }

    let checked = if errors.is_empty() { Ok(()) } else { Err(errors) };
    zip(collect_all(valid), checked).map(|(defs, ())| defs)
}

#[derive(Default)]
struct WireParts<'a> {
    span: Span,
    input: Option<&'a RawType>,
    output: Option<&'a RawType>,
    body: Option<&'a SourceExpr>,
    repeated: bool,
}

/// Group fragments by name; each wire is placed at its first fragment
fn assemble_wires(fragments: &[(usize, Span, &WireFragment)]) -> Validation<Vec<(usize, Span, ValidWire)>> {
    let mut groups: IndexMap<&str, (usize, WireParts<'_>)> = IndexMap::new();
    for &(index, span, fragment) in fragments {
        let (_, parts) = groups
            .entry(fragment.name())
            .or_insert_with(|| (index, WireParts { span, ..WireParts::default() }));
        parts.span = parts.span.merge(span);
        let repeated = match fragment {
            WireFragment::InputAnnotation { annotation, .. } => parts.input.replace(annotation).is_some(),
            WireFragment::OutputAnnotation { annotation, .. } => parts.output.replace(annotation).is_some(),
            WireFragment::Definition { body, .. } => parts.body.replace(body).is_some(),
        };
        parts.repeated |= repeated;
    }

    collect_all(groups.into_iter().map(|(name, (index, parts))| {
        assemble_wire(name, &parts).map(|wire| (index, parts.span, wire))
    }))
}

fn assemble_wire(name: &str, parts: &WireParts<'_>) -> Validation<ValidWire> {
    let inconsistent = |reason: String| {
        Err(vec![Diagnostic::new(
            CanonError::InconsistentWireFragments { wire: name.to_string(), reason },
            parts.span,
        )])
    };

    if parts.repeated {
        return inconsistent("the same part is declared more than once".into());
    }

    match (parts.input, parts.output, parts.body) {
        (Some(annotation), None, None) => Ok(ValidWire::Input { name: name.to_string(), annotation: annotation.clone() }),
        (None, Some(annotation), Some(body)) => Ok(ValidWire::Output {
            name: name.to_string(),
            body: validate_expr(body)?,
            annotation: annotation.clone(),
        }),
        (Some(input), Some(output), body) => {
            if input != output {
                return inconsistent(format!("the input type `{}` differs from the output type `{}`", input, output));
            }
            Ok(ValidWire::Loopback {
                name: name.to_string(),
                annotation: input.clone(),
                body: body.map(validate_expr).transpose()?,
            })
        }
        (None, Some(_), None) => inconsistent("an outgoing wire needs a definition".into()),
        (Some(_), None, Some(_)) => inconsistent("an incoming wire cannot have a definition".into()),
        (None, None, _) => inconsistent("a definition needs a wire type annotation".into()),
    }
}

fn validate_exprs(exprs: &[SourceExpr]) -> Validation<Vec<ValidExpr>> {
    collect_all(exprs.iter().map(validate_expr))
}

fn validate_fields(fields: &[(String, SourceExpr)]) -> Validation<Vec<(String, ValidExpr)>> {
    collect_all(fields.iter().map(|(field, expr)| validate_expr(expr).map(|expr| (field.clone(), expr))))
}

fn validate_expr(expr: &SourceExpr) -> Validation<ValidExpr> {
    let kind = match &expr.kind {
        ExprKind::Literal(literal) => ExprKind::Literal(literal.clone()),
        ExprKind::Var(name) => ExprKind::Var(name.clone()),
        ExprKind::Range(low, high) => {
            let (low, high) = zip(validate_expr(low), validate_expr(high))?;
            ExprKind::Range(Box::new(low), Box::new(high))
        }
        ExprKind::List(items) => ExprKind::List(validate_exprs(items)?),
        ExprKind::Binop { op, left, right } => {
            let (left, right) = zip(validate_expr(left), validate_expr(right))?;
            ExprKind::Binop { op: op.clone(), left: Box::new(left), right: Box::new(right) }
        }
        ExprKind::Lambda { pattern, body } => ExprKind::Lambda {
            pattern: pattern.clone(),
            body: Box::new(validate_expr(body)?),
        },
        ExprKind::App { func, arg } => {
            let (func, arg) = zip(validate_expr(func), validate_expr(arg))?;
            ExprKind::App { func: Box::new(func), arg: Box::new(arg) }
        }
        ExprKind::If { branches, otherwise } => {
            let branches =
                collect_all(branches.iter().map(|(cond, branch)| zip(validate_expr(cond), validate_expr(branch))));
            let (branches, otherwise) = zip(branches, validate_expr(otherwise))?;
            ExprKind::If { branches, otherwise: Box::new(otherwise) }
        }
        ExprKind::Let { defs, body } => {
            let defs: Vec<&SourceDef> = defs.iter().collect();
            let (defs, body) = zip(validate_defs(&defs), validate_expr(body))?;
            ExprKind::Let { defs, body: Box::new(body) }
        }
        ExprKind::Case { scrutinee, branches } => {
            let branches = collect_all(
                branches.iter().map(|(pattern, branch)| validate_expr(branch).map(|branch| (pattern.clone(), branch))),
            );
            let (scrutinee, branches) = zip(validate_expr(scrutinee), branches)?;
            ExprKind::Case { scrutinee: Box::new(scrutinee), branches }
        }
        ExprKind::Data { ctor, args } => ExprKind::Data { ctor: ctor.clone(), args: validate_exprs(args)? },
        ExprKind::Access { record, field } => ExprKind::Access {
            record: Box::new(validate_expr(record)?),
            field: field.clone(),
        },
        ExprKind::Update { record, fields } => {
            let (record, fields) = zip(validate_expr(record), validate_fields(fields))?;
            ExprKind::Update { record: Box::new(record), fields }
        }
        ExprKind::Record(fields) => ExprKind::Record(validate_fields(fields)?),
        ExprKind::GlShader(shader) => ExprKind::GlShader(shader.clone()),
        ExprKind::Wire(name) => ExprKind::Wire(name.clone()),
    };
    Ok(Expr::new(kind, expr.span))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_ast::{Listing, ModuleName, Name, Pattern};

    fn source(decls: Vec<(SourceDecl, usize)>) -> SourceModule {
        Module {
            name: ModuleName::from("Main"),
            imports: vec![],
            exports: Listing::open(),
            decls: decls
                .into_iter()
                .map(|(kind, at)| Declaration::new(kind, Span::new(at, at + 1)))
                .collect(),
            span: Span::default(),
        }
    }

    fn definition(name: &str) -> SourceDecl {
        SourceDecl::Definition(SourceDef::Definition {
            pattern: Pattern::var(name, Span::default()),
            body: Expr::var(Name::unqualified("x"), Span::default()),
            span: Span::default(),
        })
    }

    fn annotation(name: &str, ty: &str) -> SourceDecl {
        SourceDecl::Definition(SourceDef::TypeAnnotation {
            name: name.into(),
            annotation: RawType::named(ty),
            span: Span::default(),
        })
    }

    fn wire(fragment: WireFragment) -> SourceDecl {
        SourceDecl::Wire(fragment)
    }

    #[test]
    fn test_annotations_pair_with_definitions() {
        let module = source(vec![(annotation("main", "Int"), 0), (definition("main"), 1), (definition("other"), 2)]);
        let valid = validate_module(&module).unwrap();

        assert_eq!(valid.decls.len(), 2);
        let ValidDecl::Definition(main) = &valid.decls[0].kind else { panic!("expected a definition") };
        assert_eq!(main.annotation, Some(RawType::named("Int")));
        let ValidDecl::Definition(other) = &valid.decls[1].kind else { panic!("expected a definition") };
        assert_eq!(other.annotation, None);
    }

    #[test]
    fn test_stray_annotation_and_duplicate() {
        let module = source(vec![(definition("main"), 0), (definition("main"), 1), (annotation("ghost", "Int"), 2)]);
        let errors: Vec<CanonError> = validate_module(&module).unwrap_err().into_iter().map(|d| d.error).collect();
        assert!(errors.contains(&CanonError::DuplicateDefinition { name: "main".into() }));
        assert!(errors.contains(&CanonError::AnnotationWithoutDefinition { name: "ghost".into() }));
    }

    #[test]
    fn test_wire_fragments_assemble() {
        let module = source(vec![
            (wire(WireFragment::InputAnnotation { name: "clicks".into(), annotation: RawType::named("Int") }), 0),
            (definition("main"), 1),
            (wire(WireFragment::OutputAnnotation { name: "log".into(), annotation: RawType::named("String") }), 2),
            (wire(WireFragment::InputAnnotation { name: "log".into(), annotation: RawType::named("String") }), 3),
            (wire(WireFragment::OutputAnnotation { name: "title".into(), annotation: RawType::named("String") }), 4),
            (
                wire(WireFragment::Definition {
                    name: "title".into(),
                    body: Expr::var(Name::unqualified("main"), Span::default()),
                }),
                5,
            ),
        ]);
        let valid = validate_module(&module).unwrap();

        let wires: Vec<&ValidWire> = valid
            .decls
            .iter()
            .filter_map(|decl| match &decl.kind {
                ValidDecl::Wire(wire) => Some(wire),
                _ => None,
            })
            .collect();
        assert!(matches!(wires[0], ValidWire::Input { name, .. } if name == "clicks"));
        assert!(matches!(wires[1], ValidWire::Loopback { name, body: None, .. } if name == "log"));
        assert!(matches!(wires[2], ValidWire::Output { name, .. } if name == "title"));
        assert_eq!(valid.decls[2].span, Span::new(2, 4));
    }

    #[test]
    fn test_inconsistent_wires() {
        let module = source(vec![
            (wire(WireFragment::OutputAnnotation { name: "lonely".into(), annotation: RawType::named("Int") }), 0),
            (wire(WireFragment::InputAnnotation { name: "mixed".into(), annotation: RawType::named("Int") }), 1),
            (wire(WireFragment::OutputAnnotation { name: "mixed".into(), annotation: RawType::named("Float") }), 2),
        ]);
        let errors = validate_module(&module).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|d| matches!(d.error, CanonError::InconsistentWireFragments { .. })));
        assert!(errors[0].span.start < errors[1].span.start);
    }
}
