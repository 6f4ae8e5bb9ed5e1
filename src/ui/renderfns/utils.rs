use chrono::{DateTime, Utc};
use ratatui::prelude::Color;

use crate::api::types::{IntegrationState, Priority, Sentiment};

/// Truncate a string to a maximum number of characters, adding "..." if
/// truncated. Safe on multi-byte input.
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    return s.to_string();
  }
  let keep = max_len.saturating_sub(3);
  let truncated: String = s.chars().take(keep).collect();
  format!("{}...", truncated)
}

/// Display color for a talking-point priority or risk severity
pub fn priority_color(priority: Priority) -> Color {
  match priority {
    Priority::High => Color::Red,
    Priority::Medium => Color::Yellow,
    Priority::Low => Color::DarkGray,
  }
}

/// Display color for a participant/interaction sentiment
pub fn sentiment_color(sentiment: Option<Sentiment>) -> Color {
  match sentiment {
    Some(Sentiment::Positive) => Color::Green,
    Some(Sentiment::Negative) => Color::Red,
    _ => Color::DarkGray,
  }
}

/// Display color for an integration's configuration state
pub fn integration_color(state: IntegrationState) -> Color {
  if state.is_configured() {
    Color::Green
  } else {
    Color::DarkGray
  }
}

/// "Aug 06 09:30" style timestamp for list rows
pub fn fmt_datetime(dt: DateTime<Utc>) -> String {
  dt.format("%b %d %H:%M").to_string()
}

/// "Aug 06" style date
pub fn fmt_date(dt: DateTime<Utc>) -> String {
  dt.format("%b %d").to_string()
}

/// "09:30-10:00" style range within one day
pub fn fmt_time_range(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
  format!("{}-{}", start.format("%H:%M"), end.format("%H:%M"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte_does_not_panic() {
    assert_eq!(truncate("tête-à-tête meeting", 7), "tête...");
  }

  #[test]
  fn test_priority_colors() {
    assert_eq!(priority_color(Priority::High), Color::Red);
    assert_eq!(priority_color(Priority::Low), Color::DarkGray);
  }

  #[test]
  fn test_time_formats() {
    let start = Utc.with_ymd_and_hms(2026, 8, 6, 9, 30, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2026, 8, 6, 10, 0, 0).unwrap();
    assert_eq!(fmt_datetime(start), "Aug 06 09:30");
    assert_eq!(fmt_time_range(start, end), "09:30-10:00");
  }
}
