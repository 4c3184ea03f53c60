//! Type expressions as written in source

use crate::name::Name;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An unresolved type expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawType {
    /// `a -> b`
    Lambda(Box<RawType>, Box<RawType>),
    /// Lowercase type variable
    Var(String),
    /// Named type constructor applied to arguments; tuples use `_TupleN`
    Type { name: Name, args: Vec<RawType> },
    /// `{ r | field : t }` when `extension` is present
    Record {
        fields: Vec<(String, RawType)>,
        extension: Option<Box<RawType>>,
    },
}

impl RawType {
    pub fn named(name: &str) -> Self {
        RawType::Type { name: Name::parse(name), args: Vec::new() }
    }

    pub fn app(name: &str, args: Vec<RawType>) -> Self {
        RawType::Type { name: Name::parse(name), args }
    }

    pub fn lambda(from: RawType, to: RawType) -> Self {
        RawType::Lambda(Box::new(from), Box::new(to))
    }

    /// Type variables in order of first occurrence
    pub fn free_vars(&self) -> Vec<String> {
        let mut vars = Vec::new();
        self.collect_vars(&mut vars);
        vars
    }

    fn collect_vars(&self, vars: &mut Vec<String>) {
        match self {
            RawType::Lambda(from, to) => {
                from.collect_vars(vars);
                to.collect_vars(vars);
            }
            RawType::Var(name) => {
                if !vars.contains(name) {
                    vars.push(name.clone());
                }
            }
            RawType::Type { args, .. } => {
                for arg in args {
                    arg.collect_vars(vars);
                }
            }
            RawType::Record { fields, extension } => {
                for (_, ty) in fields {
                    ty.collect_vars(vars);
                }
                if let Some(ext) = extension {
                    ext.collect_vars(vars);
                }
            }
        }
    }
}

impl fmt::Display for RawType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawType::Lambda(from, to) => match **from {
                RawType::Lambda(..) => write!(f, "({}) -> {}", from, to),
                _ => write!(f, "{} -> {}", from, to),
            },
            RawType::Var(name) => f.write_str(name),
            RawType::Type { name, args } => {
                write!(f, "{}", name)?;
                for arg in args {
                    let atomic = match arg {
                        RawType::Lambda(..) => false,
                        RawType::Type { args, .. } => args.is_empty(),
                        RawType::Var(_) | RawType::Record { .. } => true,
                    };
                    if atomic {
                        write!(f, " {}", arg)?;
                    } else {
                        write!(f, " ({})", arg)?;
                    }
                }
                Ok(())
            }
            RawType::Record { fields, extension } => {
                f.write_str("{ ")?;
                if let Some(ext) = extension {
                    write!(f, "{} | ", ext)?;
                }
                for (i, (field, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{} : {}", field, ty)?;
                }
                f.write_str(" }")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_vars_in_order() {
        let ty = RawType::lambda(
            RawType::Var("b".into()),
            RawType::app("Dict", vec![RawType::Var("a".into()), RawType::Var("b".into())]),
        );
        assert_eq!(ty.free_vars(), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_display_parenthesizes_arguments() {
        let ty = RawType::lambda(
            RawType::lambda(RawType::named("Int"), RawType::named("Int")),
            RawType::app("List", vec![RawType::app("Maybe", vec![RawType::named("Int")])]),
        );
        assert_eq!(ty.to_string(), "(Int -> Int) -> List (Maybe Int)");
    }
}
