//! Expression canonicalization

use tern_ast::{Expr, ExprKind, ValidDef, ValidExpr};

use crate::canonical::{CanonicalDef, CanonicalExpr};
use crate::error::{collect_all, zip, zip3, Context, Validation, ValidationExt};
use crate::resolve::Canonicalizer;

impl Canonicalizer<'_> {
    /// Resolve every name in `expr`, collecting all failures
    pub fn canonicalize_expr(&mut self, expr: &ValidExpr) -> Validation<CanonicalExpr> {
        let span = expr.span;
        let kind = match &expr.kind {
            ExprKind::Literal(literal) => ExprKind::Literal(literal.clone()),
            ExprKind::Var(name) => ExprKind::Var(self.resolve_value(name, span)?),
            ExprKind::Range(low, high) => {
                let (low, high) = zip(self.canonicalize_expr(low), self.canonicalize_expr(high))?;
                ExprKind::Range(Box::new(low), Box::new(high))
            }
            ExprKind::List(items) => ExprKind::List(self.canonicalize_all(items)?),
            ExprKind::Binop { op, left, right } => {
                let (op, left, right) = zip3(
                    self.resolve_value(op, span),
                    self.canonicalize_expr(left),
                    self.canonicalize_expr(right),
                )?;
                ExprKind::Binop { op, left: Box::new(left), right: Box::new(right) }
            }
            ExprKind::Lambda { pattern, body } => {
                let resolved = self.resolve_pattern(pattern);
                let body = self.with_bindings(pattern.bound_names(), |this| this.canonicalize_expr(body));
                let (pattern, body) = zip(resolved, body)?;
                ExprKind::Lambda { pattern, body: Box::new(body) }
            }
            ExprKind::App { func, arg } => {
                let (func, arg) = zip(self.canonicalize_expr(func), self.canonicalize_expr(arg))?;
                ExprKind::App { func: Box::new(func), arg: Box::new(arg) }
            }
            ExprKind::If { branches, otherwise } => {
                let branches = collect_all(
                    branches
                        .iter()
                        .map(|(cond, branch)| zip(self.canonicalize_expr(cond), self.canonicalize_expr(branch))),
                );
                let (branches, otherwise) = zip(branches, self.canonicalize_expr(otherwise))?;
                ExprKind::If { branches, otherwise: Box::new(otherwise) }
            }
            ExprKind::Let { defs, body } => {
                // every binding of the group is visible in all of its definitions
                let bound = defs.iter().flat_map(|def| def.pattern.bound_names()).collect();
                let (defs, body) = self.with_bindings(bound, |this| {
                    let defs = collect_all(defs.iter().map(|def| {
                        this.canonicalize_def(def).with_context(Context::Pattern(def.pattern.to_string()))
                    }));
                    zip(defs, this.canonicalize_expr(body))
                })?;
                ExprKind::Let { defs, body: Box::new(body) }
            }
            ExprKind::Case { scrutinee, branches } => {
                let scrutinee = self.canonicalize_expr(scrutinee);
                let branches = collect_all(branches.iter().map(|(pattern, branch)| {
                    let resolved = self.resolve_pattern(pattern);
                    let branch = self.with_bindings(pattern.bound_names(), |this| this.canonicalize_expr(branch));
                    zip(resolved, branch)
                }));
                let (scrutinee, branches) = zip(scrutinee, branches)?;
                ExprKind::Case { scrutinee: Box::new(scrutinee), branches }
            }
            ExprKind::Data { ctor, args } => ExprKind::Data { ctor: ctor.clone(), args: self.canonicalize_all(args)? },
            ExprKind::Access { record, field } => ExprKind::Access {
                record: Box::new(self.canonicalize_expr(record)?),
                field: field.clone(),
            },
            ExprKind::Update { record, fields } => {
                let (record, fields) = zip(self.canonicalize_expr(record), self.canonicalize_fields(fields))?;
                ExprKind::Update { record: Box::new(record), fields }
            }
            ExprKind::Record(fields) => ExprKind::Record(self.canonicalize_fields(fields)?),
            ExprKind::GlShader(shader) => ExprKind::GlShader(shader.clone()),
            ExprKind::Wire(name) => ExprKind::Wire(name.clone()),
        };
        Ok(Expr::new(kind, span))
    }

    /// Canonicalize one binding; the caller has already put its names in scope
    pub fn canonicalize_def(&mut self, def: &ValidDef) -> Validation<CanonicalDef> {
        let pattern = self.resolve_pattern(&def.pattern);
        let body = self.canonicalize_expr(&def.body);
        let annotation = def.annotation.as_ref().map(|ty| self.resolve_type(ty, def.span)).transpose();
        let (pattern, body, annotation) = zip3(pattern, body, annotation)?;
        Ok(CanonicalDef { pattern, body, annotation, span: def.span })
    }

    fn canonicalize_all(&mut self, exprs: &[ValidExpr]) -> Validation<Vec<CanonicalExpr>> {
        collect_all(exprs.iter().map(|expr| self.canonicalize_expr(expr)))
    }

    fn canonicalize_fields(&mut self, fields: &[(String, ValidExpr)]) -> Validation<Vec<(String, CanonicalExpr)>> {
        collect_all(fields.iter().map(|(field, expr)| self.canonicalize_expr(expr).map(|expr| (field.clone(), expr))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::{CanonicalVar, Home};
    use crate::env::Environment;
    use crate::error::CanonError;
    use tern_ast::{Literal, ModuleName, Name, Pattern, Span};

    fn var(name: &str, at: usize) -> ValidExpr {
        Expr::var(Name::parse(name), Span::new(at, at + name.len()))
    }

    fn def(name: &str, body: ValidExpr) -> ValidDef {
        ValidDef { pattern: Pattern::var(name, Span::default()), body, annotation: None, span: Span::default() }
    }

    fn resolved_var(expr: &CanonicalExpr) -> &CanonicalVar {
        match &expr.kind {
            ExprKind::Var(var) => var,
            other => panic!("expected a variable, got {other:?}"),
        }
    }

    #[test]
    fn test_let_bindings_are_mutually_visible() {
        let env = Environment::new(ModuleName::from("Main"));
        let mut canon = Canonicalizer::new(&env);
        let expr = Expr::new(
            ExprKind::Let {
                defs: vec![def("even", var("odd", 0)), def("odd", var("even", 10))],
                body: Box::new(var("even", 20)),
            },
            Span::default(),
        );

        let canonical = canon.canonicalize_expr(&expr).unwrap();
        let ExprKind::Let { defs, body } = &canonical.kind else { panic!("expected let") };
        assert_eq!(resolved_var(&defs[0].body).home, Home::Local);
        assert_eq!(resolved_var(&defs[1].body).home, Home::Local);
        assert_eq!(resolved_var(body), &CanonicalVar::local("even"));
    }

    #[test]
    fn test_lambda_scope_ends_with_body() {
        let env = Environment::new(ModuleName::from("Main"));
        let mut canon = Canonicalizer::new(&env);
        let lambda = Expr::new(
            ExprKind::Lambda { pattern: Pattern::var("x", Span::default()), body: Box::new(var("x", 5)) },
            Span::default(),
        );
        let expr = Expr::new(ExprKind::App { func: Box::new(lambda), arg: Box::new(var("x", 12)) }, Span::default());

        let errors = canon.canonicalize_expr(&expr).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].span, Span::new(12, 13));
    }

    #[test]
    fn test_collects_every_failure_with_binding_context() {
        let env = Environment::new(ModuleName::from("Main"));
        let mut canon = Canonicalizer::new(&env);
        let expr = Expr::new(
            ExprKind::Let {
                defs: vec![def("go", Expr::new(ExprKind::List(vec![var("a", 0), var("b", 3)]), Span::default()))],
                body: Box::new(Expr::literal(Literal::Int(1), Span::default())),
            },
            Span::default(),
        );

        let errors = canon.canonicalize_expr(&expr).unwrap_err();
        let names: Vec<_> = errors
            .iter()
            .map(|d| match &d.error {
                CanonError::UnresolvedName { name, .. } => name.as_str(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(errors.iter().all(|d| d.context == vec![Context::Pattern("go".into())]));
    }

    #[test]
    fn test_case_branches_bind_their_own_names() {
        let env = Environment::new(ModuleName::from("Main"));
        let mut canon = Canonicalizer::new(&env);
        let expr = Expr::new(
            ExprKind::Case {
                scrutinee: Box::new(Expr::literal(Literal::Bool(true), Span::default())),
                branches: vec![
                    (Pattern::var("n", Span::default()), var("n", 0)),
                    (Pattern::new(tern_ast::PatternKind::Anything, Span::default()), var("True", 4)),
                ],
            },
            Span::default(),
        );

        let canonical = canon.canonicalize_expr(&expr).unwrap();
        let ExprKind::Case { branches, .. } = &canonical.kind else { panic!("expected case") };
        assert_eq!(resolved_var(&branches[0].1), &CanonicalVar::local("n"));
        assert_eq!(resolved_var(&branches[1].1), &CanonicalVar::builtin("True"));
    }
}
