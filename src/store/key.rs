//! Query keys: the identity of cached data.
//!
//! A `QueryKey` is an ordered tuple of primitive parts. The first part is
//! the resource name ("meetings", "briefs", ...); later parts discriminate
//! between variants of the same resource (a search term, an id, a date
//! range). Two keys address the same cache entry iff their tuples are
//! deep-equal.

use std::fmt;

/// One part of a query key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyPart {
  Text(String),
  Int(i64),
  Flag(bool),
}

impl From<&str> for KeyPart {
  fn from(s: &str) -> Self {
    KeyPart::Text(s.to_string())
  }
}

impl From<String> for KeyPart {
  fn from(s: String) -> Self {
    KeyPart::Text(s)
  }
}

impl From<i64> for KeyPart {
  fn from(n: i64) -> Self {
    KeyPart::Int(n)
  }
}

impl From<bool> for KeyPart {
  fn from(b: bool) -> Self {
    KeyPart::Flag(b)
  }
}

impl fmt::Display for KeyPart {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      KeyPart::Text(s) => write!(f, "{}", s),
      KeyPart::Int(n) => write!(f, "{}", n),
      KeyPart::Flag(b) => write!(f, "{}", b),
    }
  }
}

/// Identity of one cached resource view.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueryKey {
  parts: Vec<KeyPart>,
}

impl QueryKey {
  /// Start a key for a resource. The resource name is always part 0.
  pub fn of(resource: &str) -> Self {
    Self {
      parts: vec![KeyPart::from(resource)],
    }
  }

  /// Append a discriminator part.
  pub fn part(mut self, part: impl Into<KeyPart>) -> Self {
    self.parts.push(part.into());
    self
  }

  /// The resource name this key belongs to.
  pub fn resource(&self) -> &str {
    match self.parts.first() {
      Some(KeyPart::Text(s)) => s,
      _ => "",
    }
  }

  /// Whether this key addresses the given resource.
  pub fn is_resource(&self, resource: &str) -> bool {
    self.resource() == resource
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, part) in self.parts.iter().enumerate() {
      if i > 0 {
        write!(f, "/")?;
      }
      write!(f, "{}", part)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_equal_tuples_are_equal_keys() {
    let a = QueryKey::of("contacts").part("john");
    let b = QueryKey::of("contacts").part("john");
    assert_eq!(a, b);
  }

  #[test]
  fn test_different_discriminators_differ() {
    let a = QueryKey::of("contacts").part("john");
    let b = QueryKey::of("contacts").part("jane");
    assert_ne!(a, b);
    let bare = QueryKey::of("contacts");
    assert_ne!(a, bare);
  }

  #[test]
  fn test_resource_is_first_part() {
    let key = QueryKey::of("meetings").part("2026-08-06").part(true);
    assert_eq!(key.resource(), "meetings");
    assert!(key.is_resource("meetings"));
    assert!(!key.is_resource("briefs"));
  }

  #[test]
  fn test_display_joins_parts() {
    let key = QueryKey::of("briefs").part("abc-123");
    assert_eq!(key.to_string(), "briefs/abc-123");
  }
}
