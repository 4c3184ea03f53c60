//! Diagnostics and the error-accumulating `Validation` result
//!
//! Independent computations are combined with [`zip`], [`zip3`] and
//! [`collect_all`], which keep going after a failure and concatenate every
//! diagnostic instead of stopping at the first one.

use std::fmt;
use tern_ast::{ModuleName, Span};
use thiserror::Error;

/// Namespace a lookup happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Value,
    Type,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Namespace::Value => "value",
            Namespace::Type => "type",
        })
    }
}

/// Which part of an export listing a missing name was requested in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportCategory {
    Value,
    Type,
    Constructor { datatype: String },
}

impl fmt::Display for ExportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportCategory::Value => f.write_str("values"),
            ExportCategory::Type => f.write_str("types"),
            ExportCategory::Constructor { datatype } => write!(f, "constructors of `{}`", datatype),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireDirection {
    Input,
    Output,
    Loopback,
}

impl fmt::Display for WireDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WireDirection::Input => "input",
            WireDirection::Output => "output",
            WireDirection::Loopback => "loopback",
        })
    }
}

/// Everything that can go wrong while canonicalizing a module
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CanonError {
    #[error("cannot find {namespace} `{name}`{}", hint(.suggestions))]
    UnresolvedName {
        namespace: Namespace,
        name: String,
        suggestions: Vec<String>,
    },

    #[error("{namespace} `{name}` is ambiguous, it is exposed by {}", .candidates.join(" and "))]
    AmbiguousName {
        namespace: Namespace,
        name: String,
        candidates: Vec<String>,
    },

    #[error("no module is imported under the qualifier `{qualifier}` (used in `{qualifier}.{name}`)")]
    UnknownQualifier { qualifier: String, name: String },

    #[error("the export listing mentions {category} that are not defined: {}", .names.join(", "))]
    NonexistentExport {
        category: ExportCategory,
        names: Vec<String>,
    },

    #[error("the {direction} wire `{wire}` has type `{ty}`, but `{offending}` cannot cross the program boundary")]
    NotSerializableWireType {
        wire: String,
        direction: WireDirection,
        ty: String,
        offending: String,
    },

    #[error("the pieces of wire `{wire}` do not fit together: {reason}")]
    InconsistentWireFragments { wire: String, reason: String },

    #[error("cannot import `{module}`, no interface for it is available")]
    UnknownModule { module: ModuleName },

    #[error("module `{module}` does not expose `{name}`{}", hint(.suggestions))]
    UnknownExposed {
        module: ModuleName,
        name: String,
        suggestions: Vec<String>,
    },

    #[error("type `{name}` expects {expected} argument(s), but it was given {found}")]
    BadTypeArity {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("type declaration `{declaration}` uses undeclared type variable(s): {}", .vars.join(", "))]
    UnboundTypeVariable { declaration: String, vars: Vec<String> },

    #[error("`{name}` is defined more than once")]
    DuplicateDefinition { name: String },

    #[error("there is a type annotation for `{name}` but no definition")]
    AnnotationWithoutDefinition { name: String },
}

fn hint(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(", maybe you meant {}", suggestions.iter().map(|s| format!("`{}`", s)).collect::<Vec<_>>().join(", "))
    }
}

/// Kind of declaration a diagnostic arose in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Definition,
    Datatype,
    TypeAlias,
    Wire,
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeclKind::Definition => "definition",
            DeclKind::Datatype => "datatype",
            DeclKind::TypeAlias => "type alias",
            DeclKind::Wire => "wire",
        })
    }
}

/// Where in the module a diagnostic was raised, innermost first
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Context {
    Declaration { kind: DeclKind, name: String },
    /// A binding inside an expression, rendered
    Pattern(String),
    Import(ModuleName),
    Exports,
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Context::Declaration { kind, name } => write!(f, "in the {} `{}`", kind, name),
            Context::Pattern(pattern) => write!(f, "in the definition of `{}`", pattern),
            Context::Import(module) => write!(f, "in the import of `{}`", module),
            Context::Exports => f.write_str("in the module's export listing"),
        }
    }
}

/// A renderable problem report
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub error: CanonError,
    pub span: Span,
    pub context: Vec<Context>,
}

impl Diagnostic {
    pub fn new(error: CanonError, span: Span) -> Self {
        Self { error, span, context: Vec::new() }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.error, self.span)?;
        for context in self.context.iter().rev() {
            write!(f, "\n  {}", context)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

pub type Diagnostics = Vec<Diagnostic>;

/// Result that carries every diagnostic of a failed computation
pub type Validation<T> = Result<T, Diagnostics>;

pub fn fail<T>(error: CanonError, span: Span) -> Validation<T> {
    Err(vec![Diagnostic::new(error, span)])
}

/// Combine two independent results, keeping the errors of both
pub fn zip<A, B>(a: Validation<A>, b: Validation<B>) -> Validation<(A, B)> {
    match (a, b) {
        (Ok(a), Ok(b)) => Ok((a, b)),
        (Err(errors), Ok(_)) | (Ok(_), Err(errors)) => Err(errors),
        (Err(mut first), Err(second)) => {
            first.extend(second);
            Err(first)
        }
    }
}

pub fn zip3<A, B, C>(a: Validation<A>, b: Validation<B>, c: Validation<C>) -> Validation<(A, B, C)> {
    zip(zip(a, b), c).map(|((a, b), c)| (a, b, c))
}

/// Collect every success, or every diagnostic in iteration order
pub fn collect_all<T>(results: impl IntoIterator<Item = Validation<T>>) -> Validation<Vec<T>> {
    let mut values = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(diagnostics) => errors.extend(diagnostics),
        }
    }
    if errors.is_empty() { Ok(values) } else { Err(errors) }
}

pub trait ValidationExt {
    /// Record the enclosing construct on every diagnostic
    fn with_context(self, context: Context) -> Self;
}

impl<T> ValidationExt for Validation<T> {
    fn with_context(self, context: Context) -> Self {
        self.map_err(|mut diagnostics| {
            for diagnostic in &mut diagnostics {
                diagnostic.context.push(context.clone());
            }
            diagnostics
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unresolved(name: &str) -> Validation<()> {
        fail(
            CanonError::UnresolvedName {
                namespace: Namespace::Value,
                name: name.to_string(),
                suggestions: vec![],
            },
            Span::default(),
        )
    }

    #[test]
    fn test_zip_keeps_both_failures() {
        let result = zip(unresolved("a"), unresolved("b"));
        let errors = result.unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].error.to_string().contains("`a`"));
        assert!(errors[1].error.to_string().contains("`b`"));
    }

    #[test]
    fn test_collect_all_preserves_order() {
        let results = vec![Ok(1), unresolved("x").map(|_| 2), Ok(3), unresolved("y").map(|_| 4)];
        let errors = collect_all(results).unwrap_err();
        let names: Vec<_> = errors
            .iter()
            .map(|d| match &d.error {
                CanonError::UnresolvedName { name, .. } => name.clone(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(names, vec!["x", "y"]);
        assert_eq!(collect_all(vec![Ok::<_, Diagnostics>(1), Ok(2)]).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_context_renders_outermost_last() {
        let diagnostic = unresolved("z")
            .with_context(Context::Pattern("go".into()))
            .with_context(Context::Declaration { kind: DeclKind::Definition, name: "main".into() })
            .unwrap_err()
            .remove(0);
        let text = diagnostic.to_string();
        let decl = text.find("in the definition `main`").unwrap();
        let pattern = text.find("in the definition of `go`").unwrap();
        assert!(decl < pattern);
    }

    #[test]
    fn test_suggestion_hint() {
        let err = CanonError::UnresolvedName {
            namespace: Namespace::Value,
            name: "lenght".into(),
            suggestions: vec!["length".into()],
        };
        assert_eq!(err.to_string(), "cannot find value `lenght`, maybe you meant `length`");
    }
}
