//! Query key constructors for each backend resource.
//!
//! Detail keys share their list's resource name so one resource-level
//! invalidation reaches both (generating a brief changes a meeting list
//! row *and* that meeting's detail entry).

use chrono::Utc;

use super::types::DateRange;
use crate::store::QueryKey;

pub fn meetings() -> QueryKey {
  QueryKey::of("meetings")
}

/// Range-bounded meetings list, day-granular so the key stays stable
/// across ticks within the same day.
pub fn meetings_range(range: &DateRange) -> QueryKey {
  QueryKey::of("meetings")
    .part("range")
    .part(range.start.format("%Y-%m-%d").to_string())
    .part(range.end.format("%Y-%m-%d").to_string())
}

pub fn meeting(id: &str) -> QueryKey {
  QueryKey::of("meetings").part(id)
}

pub fn briefs() -> QueryKey {
  QueryKey::of("briefs")
}

pub fn brief(id: &str) -> QueryKey {
  QueryKey::of("briefs").part(id)
}

/// Contacts list, optionally discriminated by a normalized search term.
/// Normalizing mirrors the backend's case-insensitive match, so "John"
/// and "john" coalesce onto one entry.
pub fn contacts(search: Option<&str>) -> QueryKey {
  match normalize_search(search) {
    Some(term) => QueryKey::of("contacts").part(term),
    None => QueryKey::of("contacts"),
  }
}

pub fn contact(id: &str) -> QueryKey {
  QueryKey::of("contacts").part(id)
}

pub fn contact_history(id: &str) -> QueryKey {
  QueryKey::of("contacts").part(id).part("history")
}

pub fn integrations() -> QueryKey {
  QueryKey::of("settings").part("integrations")
}

pub fn llm() -> QueryKey {
  QueryKey::of("settings").part("llm")
}

/// Upcoming week, as the dashboard scopes its meetings panel.
pub fn upcoming_week() -> DateRange {
  let start = Utc::now();
  DateRange {
    start,
    end: start + chrono::Duration::days(7),
  }
}

fn normalize_search(search: Option<&str>) -> Option<String> {
  let term = search?.trim().to_lowercase();
  if term.is_empty() {
    None
  } else {
    Some(term)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_contacts_search_is_normalized() {
    assert_eq!(contacts(Some("John")), contacts(Some("  john ")));
    assert_eq!(contacts(Some("")), contacts(None));
    assert_ne!(contacts(Some("john")), contacts(None));
  }

  #[test]
  fn test_detail_keys_share_resource() {
    assert!(meeting("m1").is_resource("meetings"));
    assert!(brief("b1").is_resource("briefs"));
    assert!(contact_history("c1").is_resource("contacts"));
    assert_ne!(meeting("m1"), meetings());
  }

  #[test]
  fn test_settings_keys_are_distinct() {
    assert_ne!(integrations(), llm());
    assert!(integrations().is_resource("settings"));
  }
}
