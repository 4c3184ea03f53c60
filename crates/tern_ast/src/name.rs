//! Raw names as written in source, before resolution

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Dotted module name such as `Json.Decode`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleName(String);

impl ModuleName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModuleName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl Borrow<str> for ModuleName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A possibly qualified reference: `map`, `List.map`, `Maybe.Just`, `Basics.+`
///
/// Serialized as its dotted spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Name {
    pub qualifier: Option<String>,
    pub name: String,
}

impl Name {
    pub fn unqualified(name: impl Into<String>) -> Self {
        Self { qualifier: None, name: name.into() }
    }

    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self { qualifier: Some(qualifier.into()), name: name.into() }
    }

    /// Split a dotted spelling. Leading capitalized segments followed by
    /// another segment form the qualifier.
    pub fn parse(text: &str) -> Self {
        let segments: Vec<&str> = text.split('.').collect();
        let mut qualifier_len = 0;
        while qualifier_len + 1 < segments.len()
            && segments[qualifier_len]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_uppercase())
        {
            qualifier_len += 1;
        }

        // "A.B." or an operator containing dots: keep the whole text
        if qualifier_len == 0 || segments[qualifier_len..].join(".").is_empty() {
            return Self::unqualified(text);
        }

        Self {
            qualifier: Some(segments[..qualifier_len].join(".")),
            name: segments[qualifier_len..].join("."),
        }
    }
}

impl From<String> for Name {
    fn from(text: String) -> Self {
        Name::parse(&text)
    }
}

impl From<Name> for String {
    fn from(name: Name) -> Self {
        name.to_string()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(f, "{}.{}", qualifier, self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_qualified_value() {
        assert_eq!(Name::parse("List.map"), Name::qualified("List", "map"));
        assert_eq!(Name::parse("Json.Decode.int"), Name::qualified("Json.Decode", "int"));
    }

    #[test]
    fn test_parse_qualified_constructor() {
        assert_eq!(Name::parse("Maybe.Just"), Name::qualified("Maybe", "Just"));
        assert_eq!(Name::parse("Just"), Name::unqualified("Just"));
    }

    #[test]
    fn test_parse_operators() {
        assert_eq!(Name::parse("Basics.+"), Name::qualified("Basics", "+"));
        assert_eq!(Name::parse("."), Name::unqualified("."));
        assert_eq!(Name::parse("::"), Name::unqualified("::"));
    }

    #[test]
    fn test_serde_uses_dotted_spelling() {
        let name: Name = serde_json::from_str("\"Dict.insert\"").unwrap();
        assert_eq!(name, Name::qualified("Dict", "insert"));
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"Dict.insert\"");
    }
}
