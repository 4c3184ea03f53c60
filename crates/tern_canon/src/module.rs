//! The module pass: environment, declarations, exports, body, imports

use indexmap::IndexMap;
use tern_ast::{
    Datatype, Declaration, Expr, ExprKind, ModuleName, Pattern, RawType, SourceModule, Span, TypeAlias, ValidDecl,
    ValidDef, ValidModule, ValidWire,
};
use tracing::{debug, trace};

use crate::canonical::{
    CanonicalDecl, CanonicalDef, CanonicalModule, CanonicalVar, CanonicalWire, ModuleBody, Type,
};
use crate::env::Environment;
use crate::error::{collect_all, fail, zip, CanonError, Context, DeclKind, Validation, ValidationExt};
use crate::export::{defined_names, resolve_exports};
use crate::interface::{AliasInfo, Interfaces, UnionInfo};
use crate::resolve::Canonicalizer;
use crate::sort::{DefinitionSequencer, DependencySorter};
use crate::validate::validate_module;
use crate::wire::{WireValidator, WIRE_SUPPORT_MODULES};

/// Validate a parsed module and canonicalize it
pub fn canonicalize_source(interfaces: &Interfaces, module: &SourceModule) -> Validation<CanonicalModule> {
    canonicalize_module(interfaces, &validate_module(module)?)
}

/// Canonicalize `module`, merging its definitions by dependency order
pub fn canonicalize_module(interfaces: &Interfaces, module: &ValidModule) -> Validation<CanonicalModule> {
    canonicalize_module_with(interfaces, module, &DependencySorter)
}

pub fn canonicalize_module_with(
    interfaces: &Interfaces,
    module: &ValidModule,
    sequencer: &dyn DefinitionSequencer,
) -> Validation<CanonicalModule> {
    debug!(
        module = %module.name,
        imports = module.imports.len(),
        decls = module.decls.len(),
        "canonicalizing module"
    );

    let exports = resolve_exports(&defined_names(&module.decls), &module.exports, module.span);
    let env = match Environment::build(interfaces, module) {
        Ok(env) => env,
        Err(mut errors) => {
            if let Err(export_errors) = exports {
                errors.extend(export_errors);
            }
            return Err(errors);
        }
    };

    let mut canon = Canonicalizer::new(&env);
    let decls = canonicalize_declarations(&mut canon, &module.decls);
    let (decls, exports) = zip(decls, exports)?;
    let used_modules = canon.into_used_modules();

    let body = assemble_body(&module.name, decls, sequencer);
    let imports: Vec<_> = module
        .imports
        .iter()
        .filter(|import| used_modules.contains(&import.module))
        .cloned()
        .collect();

    debug!(
        module = %module.name,
        kept_imports = imports.len(),
        dropped_imports = module.imports.len() - imports.len(),
        exports = exports.len(),
        "canonicalized module"
    );

    Ok(CanonicalModule { name: module.name.clone(), imports, used_modules, exports, body })
}

/// Canonicalize every declaration, collecting all failures in source order
pub fn canonicalize_declarations(
    canon: &mut Canonicalizer<'_>,
    decls: &[Declaration<ValidDecl>],
) -> Validation<Vec<Declaration<CanonicalDecl>>> {
    let home = canon.environment().home().clone();

    // aliases go first so wire types can see through home aliases
    let mut resolved_aliases: Vec<Option<Validation<TypeAlias<Type>>>> = decls
        .iter()
        .map(|decl| match &decl.kind {
            ValidDecl::TypeAlias(alias) => Some(canonicalize_alias(canon, alias, decl.span)),
            _ => None,
        })
        .collect();

    let mut aliases = canon.environment().aliases().clone();
    for alias in resolved_aliases.iter().flatten().flatten() {
        aliases.insert(
            CanonicalVar::top_level(&home, alias.name.clone()),
            AliasInfo { vars: alias.vars.clone(), body: alias.alias.clone() },
        );
    }
    let validator = WireValidator::new(&aliases);

    collect_all(decls.iter().zip(resolved_aliases.iter_mut()).map(|(decl, resolved)| {
        trace!(span = %decl.span, "canonicalizing declaration");
        let kind = match &decl.kind {
            ValidDecl::Definition(def) => canonicalize_top_def(canon, def).map(CanonicalDecl::Definition),
            ValidDecl::Datatype(datatype) => {
                canonicalize_datatype(canon, datatype, decl.span).map(CanonicalDecl::Datatype)
            }
            ValidDecl::TypeAlias(alias) => resolved
                .take()
                .unwrap_or_else(|| canonicalize_alias(canon, alias, decl.span))
                .map(CanonicalDecl::TypeAlias),
            ValidDecl::Wire(wire) => canonicalize_wire(canon, &validator, wire, decl.span).map(CanonicalDecl::Wire),
            ValidDecl::Fixity(fixity) => Ok(CanonicalDecl::Fixity(fixity.clone())),
        };
        kind.map(|kind| Declaration::new(kind, decl.span))
    }))
}

fn canonicalize_top_def(canon: &mut Canonicalizer<'_>, def: &ValidDef) -> Validation<CanonicalDef> {
    let context = Context::Declaration { kind: DeclKind::Definition, name: def.pattern.to_string() };
    canon.canonicalize_def(def).with_context(context)
}

fn canonicalize_datatype(
    canon: &mut Canonicalizer<'_>,
    datatype: &Datatype<RawType>,
    span: Span,
) -> Validation<Datatype<Type>> {
    let bound = check_type_vars(
        &datatype.name,
        &datatype.vars,
        datatype.ctors.iter().flat_map(|(_, args)| args),
        span,
    );
    let ctors = collect_all(datatype.ctors.iter().map(|(ctor, args)| {
        collect_all(args.iter().map(|arg| canon.resolve_type(arg, span))).map(|args| (ctor.clone(), args))
    }));

    zip(bound, ctors)
        .map(|((), ctors)| Datatype { name: datatype.name.clone(), vars: datatype.vars.clone(), ctors })
        .with_context(Context::Declaration { kind: DeclKind::Datatype, name: datatype.name.clone() })
}

fn canonicalize_alias(
    canon: &mut Canonicalizer<'_>,
    alias: &TypeAlias<RawType>,
    span: Span,
) -> Validation<TypeAlias<Type>> {
    let bound = check_type_vars(&alias.name, &alias.vars, [&alias.alias], span);
    zip(bound, canon.resolve_type(&alias.alias, span))
        .map(|((), body)| TypeAlias { name: alias.name.clone(), vars: alias.vars.clone(), alias: body })
        .with_context(Context::Declaration { kind: DeclKind::TypeAlias, name: alias.name.clone() })
}

/// Every type variable used in `types` must be a declared parameter
fn check_type_vars<'a>(
    declaration: &str,
    declared: &[String],
    types: impl IntoIterator<Item = &'a RawType>,
    span: Span,
) -> Validation<()> {
    let mut unbound: Vec<String> = Vec::new();
    for ty in types {
        for var in ty.free_vars() {
            if !declared.contains(&var) && !unbound.contains(&var) {
                unbound.push(var);
            }
        }
    }
    if unbound.is_empty() {
        Ok(())
    } else {
        fail(CanonError::UnboundTypeVariable { declaration: declaration.to_string(), vars: unbound }, span)
    }
}

fn canonicalize_wire(
    canon: &mut Canonicalizer<'_>,
    validator: &WireValidator<'_>,
    wire: &ValidWire,
    span: Span,
) -> Validation<CanonicalWire> {
    for module in WIRE_SUPPORT_MODULES {
        canon.record_use(&ModuleName::from(module));
    }
    let context = Context::Declaration { kind: DeclKind::Wire, name: wire.name().to_string() };
    resolve_wire(canon, validator, wire, span).with_context(context)
}

fn resolve_wire(
    canon: &mut Canonicalizer<'_>,
    validator: &WireValidator<'_>,
    wire: &ValidWire,
    span: Span,
) -> Validation<CanonicalWire> {
    let check = |checked: Result<(), CanonError>| checked.or_else(|error| fail(error, span));

    match wire {
        ValidWire::Input { name, annotation } => {
            let ty = canon.resolve_type(annotation, span)?;
            check(validator.check_input(name, &ty))?;
            Ok(CanonicalWire::Input { name: name.clone(), ty })
        }
        ValidWire::Output { name, body, annotation } => {
            let ty = canon.resolve_type(annotation, span).and_then(|ty| {
                check(validator.check_output(name, &ty))?;
                Ok(ty)
            });
            let (body, ty) = zip(canon.canonicalize_expr(body), ty)?;
            Ok(CanonicalWire::Output { name: name.clone(), body, ty })
        }
        ValidWire::Loopback { name, annotation, body } => {
            let ty = canon.resolve_type(annotation, span).and_then(|ty| {
                check(validator.check_loopback(name, &ty))?;
                Ok(ty)
            });
            let body = body.as_ref().map(|body| canon.canonicalize_expr(body)).transpose();
            let (ty, body) = zip(ty, body)?;
            Ok(validator.resolve_loopback(name, body, ty))
        }
    }
}

/// Split canonical declarations into the tables of a module body
fn assemble_body(
    home: &ModuleName,
    decls: Vec<Declaration<CanonicalDecl>>,
    sequencer: &dyn DefinitionSequencer,
) -> ModuleBody {
    let mut defs = Vec::new();
    let mut datatypes = IndexMap::new();
    let mut aliases = IndexMap::new();
    let mut fixities = Vec::new();
    let mut wires = Vec::new();

    for decl in decls {
        match decl.kind {
            CanonicalDecl::Definition(def) => defs.push(def),
            CanonicalDecl::Datatype(datatype) => {
                datatypes.insert(datatype.name, UnionInfo { vars: datatype.vars, ctors: datatype.ctors });
            }
            CanonicalDecl::TypeAlias(alias) => {
                aliases.insert(alias.name, AliasInfo { vars: alias.vars, body: alias.alias });
            }
            CanonicalDecl::Wire(wire) => {
                wires.push(wire.name().to_string());
                defs.push(wire_definition(wire, decl.span));
            }
            CanonicalDecl::Fixity(fixity) => fixities.push(fixity),
        }
    }

    ModuleBody { program: sequencer.sequence(home, defs), datatypes, fixities, aliases, wires }
}

/// Bind a wire's name like any other definition
///
/// Values coming from outside have no local body, so they are bound to a
/// boundary marker instead.
fn wire_definition(wire: CanonicalWire, span: Span) -> CanonicalDef {
    let (name, body, ty) = match wire {
        CanonicalWire::Input { name, ty } | CanonicalWire::Address { name, ty } => {
            let marker = Expr::new(ExprKind::Wire(name.clone()), span);
            (name, marker, ty)
        }
        CanonicalWire::Output { name, body, ty } => (name, body, ty),
        CanonicalWire::Command { name, body, result_ty, .. } => (name, body, result_ty),
    };
    CanonicalDef { pattern: Pattern::var(name, span), body, annotation: Some(ty), span }
}
