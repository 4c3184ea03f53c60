//! Merging top-level definitions into a single program expression

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;
use tern_ast::{Expr, ExprKind, ModuleName, Span};

use crate::canonical::{CanonicalDef, CanonicalExpr, CanonicalVar, Home};
use crate::env::tuple_name;

/// Turns a module's definitions into the expression later stages consume
pub trait DefinitionSequencer {
    fn sequence(&self, home: &ModuleName, defs: Vec<CanonicalDef>) -> CanonicalExpr;
}

/// Groups definitions into mutually recursive components and nests one
/// `let` per component, dependencies outermost. Within a component the
/// definitions keep their source order.
#[derive(Debug, Default, Clone, Copy)]
pub struct DependencySorter;

impl DefinitionSequencer for DependencySorter {
    fn sequence(&self, home: &ModuleName, defs: Vec<CanonicalDef>) -> CanonicalExpr {
        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..defs.len()).map(|i| graph.add_node(i)).collect();

        let mut owners: FxHashMap<String, NodeIndex> = FxHashMap::default();
        for (def, node) in defs.iter().zip(&nodes) {
            for name in def.pattern.bound_names() {
                owners.insert(name, *node);
            }
        }

        for (def, node) in defs.iter().zip(&nodes) {
            let mut refs = Vec::new();
            top_level_refs(&def.body, home, &mut refs);
            for name in refs {
                if let Some(dependency) = owners.get(name) {
                    graph.update_edge(*node, *dependency, ());
                }
            }
        }

        // components come out with every dependency before its users
        let mut components = tarjan_scc(&graph);
        for component in &mut components {
            component.sort_by_key(|node| graph[*node]);
        }

        let mut slots: Vec<Option<CanonicalDef>> = defs.into_iter().map(Some).collect();
        let mut program = Expr::var(CanonicalVar::builtin(tuple_name(0)), Span::default());
        for component in components.iter().rev() {
            let group: Vec<CanonicalDef> = component.iter().filter_map(|node| slots[graph[*node]].take()).collect();
            let span = group.iter().map(|def| def.span).reduce(Span::merge).unwrap_or_default();
            program = Expr::new(ExprKind::Let { defs: group, body: Box::new(program) }, span);
        }
        program
    }
}

/// Names of home top-level values referenced anywhere in `expr`
fn top_level_refs<'e>(expr: &'e CanonicalExpr, home: &ModuleName, refs: &mut Vec<&'e str>) {
    match &expr.kind {
        ExprKind::Var(var) => push_home_ref(var, home, refs),
        ExprKind::Binop { op, left, right } => {
            push_home_ref(op, home, refs);
            top_level_refs(left, home, refs);
            top_level_refs(right, home, refs);
        }
        ExprKind::Range(low, high) => {
            top_level_refs(low, home, refs);
            top_level_refs(high, home, refs);
        }
        ExprKind::List(items) | ExprKind::Data { args: items, .. } => {
            for item in items {
                top_level_refs(item, home, refs);
            }
        }
        ExprKind::Lambda { body, .. } | ExprKind::Access { record: body, .. } => top_level_refs(body, home, refs),
        ExprKind::App { func, arg } => {
            top_level_refs(func, home, refs);
            top_level_refs(arg, home, refs);
        }
        ExprKind::If { branches, otherwise } => {
            for (cond, branch) in branches {
                top_level_refs(cond, home, refs);
                top_level_refs(branch, home, refs);
            }
            top_level_refs(otherwise, home, refs);
        }
        ExprKind::Let { defs, body } => {
            for def in defs {
                top_level_refs(&def.body, home, refs);
            }
            top_level_refs(body, home, refs);
        }
        ExprKind::Case { scrutinee, branches } => {
            top_level_refs(scrutinee, home, refs);
            for (_, branch) in branches {
                top_level_refs(branch, home, refs);
            }
        }
        ExprKind::Update { record, fields } => {
            top_level_refs(record, home, refs);
            for (_, value) in fields {
                top_level_refs(value, home, refs);
            }
        }
        ExprKind::Record(fields) => {
            for (_, value) in fields {
                top_level_refs(value, home, refs);
            }
        }
        ExprKind::Literal(_) | ExprKind::GlShader(_) | ExprKind::Wire(_) => {}
    }
}

fn push_home_ref<'e>(var: &'e CanonicalVar, home: &ModuleName, refs: &mut Vec<&'e str>) {
    if matches!(&var.home, Home::TopLevel(module) if module == home) {
        refs.push(&var.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_ast::Pattern;

    fn home() -> ModuleName {
        ModuleName::from("Main")
    }

    fn def(name: &str, uses: &[&str]) -> CanonicalDef {
        let items = uses
            .iter()
            .map(|used| Expr::var(CanonicalVar::top_level(&home(), *used), Span::default()))
            .collect();
        CanonicalDef {
            pattern: Pattern::var(name, Span::default()),
            body: Expr::new(ExprKind::List(items), Span::default()),
            annotation: None,
            span: Span::default(),
        }
    }

    /// Names bound by each nested `let`, outermost first
    fn groups(program: &CanonicalExpr) -> Vec<Vec<String>> {
        let mut groups = Vec::new();
        let mut current = program;
        while let ExprKind::Let { defs, body } = &current.kind {
            groups.push(defs.iter().map(|def| def.pattern.to_string()).collect());
            current = body;
        }
        assert!(matches!(&current.kind, ExprKind::Var(var) if var.is_builtin("_Tuple0")));
        groups
    }

    #[test]
    fn test_dependencies_are_bound_first() {
        let defs = vec![def("main", &["view"]), def("view", &["model"]), def("model", &[])];
        let program = DependencySorter.sequence(&home(), defs);
        assert_eq!(groups(&program), vec![vec!["model"], vec!["view"], vec!["main"]]);
    }

    #[test]
    fn test_mutual_recursion_shares_a_group() {
        let defs = vec![def("isEven", &["isOdd"]), def("main", &["isEven"]), def("isOdd", &["isEven"])];
        let program = DependencySorter.sequence(&home(), defs);
        assert_eq!(groups(&program), vec![vec!["isEven", "isOdd"], vec!["main"]]);
    }

    #[test]
    fn test_empty_module_is_unit() {
        let program = DependencySorter.sequence(&home(), Vec::new());
        assert!(groups(&program).is_empty());
    }
}
