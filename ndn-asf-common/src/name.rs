//! NDN names.
//!
//! A name is a sequence of components. The forwarder uses names as FIB and
//! measurement keys via longest-prefix matching; the strategy additionally
//! reads configuration out of name components appended to its strategy name.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a single NDN name component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NameComponent(String);

impl NameComponent {
    /// Creates a new name component.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the component as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NameComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NameComponent {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NameComponent {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Represents an NDN name, a sequence of name components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Name {
    components: Vec<NameComponent>,
}

impl Name {
    /// Creates a new empty name (the root prefix `/`).
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a name from its URI representation with `/` as separator.
    ///
    /// Empty components are rejected except for the bare root `/`.
    pub fn from_uri(uri: &str) -> Result<Self, Error> {
        let trimmed = uri.trim();
        if trimmed.is_empty() {
            return Err(Error::Name("empty name URI".into()));
        }
        if trimmed == "/" {
            return Ok(Self::root());
        }
        let stripped = trimmed.strip_prefix('/').unwrap_or(trimmed);
        let mut components = Vec::new();
        for part in stripped.split('/') {
            if part.is_empty() {
                return Err(Error::Name(format!("empty component in {uri:?}")));
            }
            components.push(NameComponent::new(part));
        }
        Ok(Self { components })
    }

    /// Appends a component and returns the extended name.
    pub fn append(mut self, component: impl Into<NameComponent>) -> Self {
        self.components.push(component.into());
        self
    }

    /// Appends all components of `other`.
    pub fn append_name(mut self, other: &Name) -> Self {
        self.components.extend(other.components.iter().cloned());
        self
    }

    /// Returns the number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns true if the name has no components.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Returns an iterator over the components.
    pub fn components(&self) -> impl Iterator<Item = &NameComponent> {
        self.components.iter()
    }

    /// Gets the component at `index`.
    pub fn get(&self, index: usize) -> Option<&NameComponent> {
        self.components.get(index)
    }

    /// Returns the prefix of this name with the first `len` components.
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            components: self.components.iter().take(len).cloned().collect(),
        }
    }

    /// Checks whether this name is a prefix of `other`.
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.len() > other.len() {
            return false;
        }
        self.components
            .iter()
            .zip(other.components.iter())
            .all(|(a, b)| a == b)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return write!(f, "/");
        }
        for component in &self.components {
            write!(f, "/{component}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_round_trip() {
        let name = Name::from_uri("/hr/C/1").unwrap();
        assert_eq!(name.len(), 3);
        assert_eq!(name.get(0).unwrap().as_str(), "hr");
        assert_eq!(name.to_string(), "/hr/C/1");
        assert_eq!(Name::root().to_string(), "/");
    }

    #[test]
    fn rejects_malformed_uris() {
        assert!(Name::from_uri("").is_err());
        assert!(Name::from_uri("/a//b").is_err());
    }

    #[test]
    fn prefix_relations() {
        let short = Name::from_uri("/a/b").unwrap();
        let long = Name::from_uri("/a/b/c").unwrap();
        let other = Name::from_uri("/a/x/c").unwrap();

        assert!(short.is_prefix_of(&long));
        assert!(short.is_prefix_of(&short));
        assert!(!long.is_prefix_of(&short));
        assert!(!short.is_prefix_of(&other));
        assert_eq!(long.prefix(2), short);
        assert!(Name::root().is_prefix_of(&long));
    }

    #[test]
    fn append_extends_in_order() {
        let name = Name::from_uri("/a").unwrap().append("b").append("c");
        assert_eq!(name.to_string(), "/a/b/c");
    }
}
