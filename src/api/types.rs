//! Domain types decoded at the transport boundary.
//!
//! Loosely-shaped backend payloads become these explicit structures here;
//! nothing untyped flows past the client. Backend fields with no consumer
//! in the dashboard are simply not modeled (serde skips unknown keys).
//! Enumerated fields coming out of the brief generator (priority,
//! sentiment, risk kind) tolerate unknown values by falling back to their
//! neutral variant instead of failing the whole decode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp decoding that accepts RFC 3339 as well as the backend's
/// naive ISO-8601 (UTC implied, no offset suffix).
pub mod timestamp {
  use chrono::{DateTime, NaiveDateTime, Utc};
  use serde::{Deserialize, Deserializer};

  pub fn parse(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
      return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
      .ok()
      .map(|naive| naive.and_utc())
  }

  pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
  where
    D: Deserializer<'de>,
  {
    let s = String::deserialize(deserializer)?;
    parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", s)))
  }

  pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
  where
    D: Deserializer<'de>,
  {
    match Option::<String>::deserialize(deserializer)? {
      None => Ok(None),
      Some(s) => parse(&s)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", s))),
    }
  }
}

// ============================================================================
// Meetings
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Participant {
  pub email: String,
  pub name: Option<String>,
  pub role: Option<String>,
  #[serde(default)]
  pub is_organizer: bool,
}

impl Participant {
  /// Name when known, email otherwise.
  pub fn display(&self) -> &str {
    self.name.as_deref().unwrap_or(&self.email)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Meeting {
  pub id: String,
  pub title: String,
  pub description: Option<String>,
  #[serde(deserialize_with = "timestamp::deserialize")]
  pub start_time: DateTime<Utc>,
  #[serde(deserialize_with = "timestamp::deserialize")]
  pub end_time: DateTime<Utc>,
  pub location: Option<String>,
  pub meeting_link: Option<String>,
  #[serde(default)]
  pub participants: Vec<Participant>,
  #[serde(default)]
  pub is_recurring: bool,
  pub recurrence_rule: Option<String>,
  #[serde(default)]
  pub has_brief: bool,
  pub brief_id: Option<String>,
}

/// Request body for creating a meeting. Participants are plain emails.
#[derive(Debug, Clone, Serialize)]
pub struct MeetingDraft {
  pub title: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub start_time: DateTime<Utc>,
  pub end_time: DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
  pub participants: Vec<String>,
}

/// Inclusive start/end bounds for the meetings list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
  pub start: DateTime<Utc>,
  pub end: DateTime<Utc>,
}

// ============================================================================
// Briefs
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
  High,
  Low,
  #[default]
  #[serde(other)]
  Medium,
}

impl Priority {
  pub fn as_str(&self) -> &'static str {
    match self {
      Priority::High => "high",
      Priority::Medium => "medium",
      Priority::Low => "low",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
  Positive,
  Negative,
  #[serde(other)]
  Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskKind {
  Opportunity,
  #[serde(other)]
  Risk,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantProfile {
  pub email: String,
  pub name: Option<String>,
  pub title: Option<String>,
  pub company: Option<String>,
  #[serde(default)]
  pub key_topics: Vec<String>,
  pub sentiment: Option<Sentiment>,
}

impl ParticipantProfile {
  pub fn display(&self) -> &str {
    self.name.as_deref().unwrap_or(&self.email)
  }
}

fn default_open() -> String {
  "open".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionItem {
  pub description: String,
  pub assignee: Option<String>,
  #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
  pub due_date: Option<DateTime<Utc>>,
  #[serde(default = "default_open")]
  pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TalkingPoint {
  pub topic: String,
  #[serde(default)]
  pub context: String,
  #[serde(default)]
  pub priority: Priority,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RiskOpportunity {
  #[serde(rename = "type")]
  pub kind: RiskKind,
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub severity: Priority,
  pub recommended_action: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Brief {
  pub id: String,
  pub meeting_id: String,
  pub title: String,
  pub meeting_objective: Option<String>,
  #[serde(default)]
  pub executive_summary: String,
  #[serde(default)]
  pub participant_profiles: Vec<ParticipantProfile>,
  #[serde(default)]
  pub open_action_items: Vec<ActionItem>,
  #[serde(default)]
  pub talking_points: Vec<TalkingPoint>,
  #[serde(default)]
  pub risks_opportunities: Vec<RiskOpportunity>,
  pub email_context: Option<String>,
  pub crm_context: Option<String>,
  pub previous_meetings_summary: Option<String>,
  #[serde(deserialize_with = "timestamp::deserialize")]
  pub generated_at: DateTime<Utc>,
  #[serde(default)]
  pub generation_time_seconds: f64,
  #[serde(default)]
  pub data_sources_used: Vec<String>,
}

/// Fields a brief update may patch; everything else is generator-owned.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BriefPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub meeting_objective: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub executive_summary: Option<String>,
}

/// Knobs for the generation call.
#[derive(Debug, Clone, Copy)]
pub struct BriefOptions {
  pub include_email: bool,
  pub include_crm: bool,
  pub include_calendar: bool,
  pub lookback_days: u32,
}

impl Default for BriefOptions {
  fn default() -> Self {
    Self {
      include_email: true,
      include_crm: true,
      include_calendar: true,
      lookback_days: 30,
    }
  }
}

/// Export targets supported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
  Markdown,
  Json,
}

impl ExportFormat {
  pub fn as_str(&self) -> &'static str {
    match self {
      ExportFormat::Markdown => "markdown",
      ExportFormat::Json => "json",
    }
  }

  pub fn extension(&self) -> &'static str {
    match self {
      ExportFormat::Markdown => "md",
      ExportFormat::Json => "json",
    }
  }
}

// ============================================================================
// Contacts
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
  pub id: String,
  pub email: String,
  pub name: Option<String>,
  pub title: Option<String>,
  pub company: Option<String>,
  #[serde(default)]
  pub total_interactions: u64,
  #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
  pub last_interaction: Option<DateTime<Utc>>,
}

impl Contact {
  pub fn display_name(&self) -> &str {
    self.name.as_deref().unwrap_or(&self.email)
  }
}

/// Request body for creating a contact. Email is the only required field.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContactDraft {
  pub email: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub company: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
  #[serde(rename = "type")]
  pub kind: String,
  #[serde(deserialize_with = "timestamp::deserialize")]
  pub date: DateTime<Utc>,
  #[serde(default)]
  pub summary: String,
  pub sentiment: Option<Sentiment>,
  #[serde(default)]
  pub key_topics: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactHistory {
  pub contact_name: Option<String>,
  #[serde(default)]
  pub interactions: Vec<Interaction>,
}

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationState {
  Configured,
  #[default]
  #[serde(other)]
  NotConfigured,
}

impl IntegrationState {
  pub fn is_configured(&self) -> bool {
    matches!(self, IntegrationState::Configured)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntegrationInfo {
  pub provider: Option<String>,
  #[serde(default)]
  pub status: IntegrationState,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmStatus {
  #[serde(default)]
  pub provider: String,
  #[serde(default)]
  pub model: String,
  #[serde(default)]
  pub status: IntegrationState,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntegrationOverview {
  #[serde(default)]
  pub calendar: IntegrationInfo,
  #[serde(default)]
  pub email: IntegrationInfo,
  #[serde(default)]
  pub crm: IntegrationInfo,
  #[serde(default)]
  pub llm: LlmStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmConfig {
  #[serde(default)]
  pub provider: String,
  #[serde(default)]
  pub model: String,
  #[serde(default)]
  pub available_providers: Vec<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_timestamp_accepts_rfc3339_and_naive() {
    let with_offset = timestamp::parse("2026-08-06T09:30:00Z").unwrap();
    let naive = timestamp::parse("2026-08-06T09:30:00.123456").unwrap();
    assert_eq!(with_offset.date_naive(), naive.date_naive());
    assert!(timestamp::parse("yesterday-ish").is_none());
  }

  #[test]
  fn test_meeting_decodes_backend_payload() {
    let json = r#"{
      "id": "m1",
      "title": "Quarterly sync",
      "description": null,
      "start_time": "2026-08-06T09:00:00",
      "end_time": "2026-08-06T10:00:00",
      "location": null,
      "meeting_link": null,
      "participants": [{"email": "ada@example.com", "name": "Ada", "role": null, "is_organizer": true}],
      "calendar_id": null,
      "is_recurring": false,
      "recurrence_rule": null,
      "has_brief": true,
      "brief_id": "b1",
      "created_at": "2026-08-01T12:00:00",
      "updated_at": "2026-08-01T12:00:00"
    }"#;

    let meeting: Meeting = serde_json::from_str(json).unwrap();
    assert_eq!(meeting.id, "m1");
    assert!(meeting.has_brief);
    assert_eq!(meeting.brief_id.as_deref(), Some("b1"));
    assert_eq!(meeting.participants[0].display(), "Ada");
  }

  #[test]
  fn test_priority_tolerates_unknown_values() {
    #[derive(Deserialize)]
    struct Wrap {
      priority: Priority,
    }
    let p: Wrap = serde_json::from_str(r#"{"priority": "high"}"#).unwrap();
    assert_eq!(p.priority, Priority::High);
    let p: Wrap = serde_json::from_str(r#"{"priority": "urgent-ish"}"#).unwrap();
    assert_eq!(p.priority, Priority::Medium);
  }

  #[test]
  fn test_risk_kind_from_type_field() {
    let json = r#"{"type": "opportunity", "title": "Upsell", "description": "", "severity": "low"}"#;
    let ro: RiskOpportunity = serde_json::from_str(json).unwrap();
    assert_eq!(ro.kind, RiskKind::Opportunity);
    assert_eq!(ro.severity, Priority::Low);
  }

  #[test]
  fn test_integration_state_decodes_backend_strings() {
    let json = r#"{
      "calendar": {"enabled": true, "provider": "google", "status": "configured"},
      "email": {"enabled": false, "provider": null, "status": "not_configured"},
      "crm": {"enabled": false, "provider": null, "status": "not_configured"},
      "llm": {"provider": "anthropic", "model": "claude-sonnet", "status": "configured"}
    }"#;
    let overview: IntegrationOverview = serde_json::from_str(json).unwrap();
    assert!(overview.calendar.status.is_configured());
    assert!(!overview.email.status.is_configured());
    assert_eq!(overview.llm.provider, "anthropic");
  }

  #[test]
  fn test_contact_draft_skips_empty_optionals() {
    let draft = ContactDraft {
      email: "ada@example.com".into(),
      ..Default::default()
    };
    let body = serde_json::to_value(&draft).unwrap();
    assert_eq!(body, serde_json::json!({"email": "ada@example.com"}));
  }
}
