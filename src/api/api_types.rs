//! Serde types matching raw backend responses that don't map 1:1 onto the
//! domain types: acknowledgement envelopes, the generation receipt, export
//! payloads, and error bodies.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::types::timestamp;

/// Error envelope: `{"detail": ...}` where detail is a plain string or a
/// FastAPI-style list of field errors.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
  #[serde(default)]
  pub detail: Value,
}

impl ApiErrorBody {
  /// Flatten the detail into one display line, keeping field names when
  /// the backend reports per-field errors.
  pub fn flatten(&self) -> String {
    match &self.detail {
      Value::String(s) => s.clone(),
      Value::Array(items) => items
        .iter()
        .filter_map(|item| {
          let msg = item.get("msg")?.as_str()?;
          let field = item
            .get("loc")
            .and_then(|loc| loc.as_array())
            .and_then(|loc| loc.last())
            .and_then(|part| part.as_str());
          Some(match field {
            Some(field) => format!("{}: {}", field, msg),
            None => msg.to_string(),
          })
        })
        .collect::<Vec<_>>()
        .join("; "),
      Value::Null => String::new(),
      other => other.to_string(),
    }
  }
}

/// What the generation endpoint returns: a receipt, not the full brief.
/// The full brief is re-read through the invalidated `briefs` keys.
#[derive(Debug, Clone, Deserialize)]
pub struct BriefReceipt {
  pub brief_id: String,
  pub title: String,
  #[serde(deserialize_with = "timestamp::deserialize")]
  pub generated_at: DateTime<Utc>,
}

/// `{"deleted": true, "...": id}` envelope from delete endpoints.
#[derive(Debug, Deserialize)]
pub struct DeleteAck {
  #[serde(default)]
  pub deleted: bool,
}

/// `{"updated": true, "...": id}` envelope from update endpoints.
#[derive(Debug, Deserialize)]
pub struct UpdateAck {
  #[serde(default)]
  pub updated: bool,
}

/// Raw export payload. Markdown arrives as a string, json as an object.
#[derive(Debug, Clone, Deserialize)]
pub struct BriefExport {
  pub format: String,
  pub content: Value,
}

impl BriefExport {
  /// The exported document as writable text.
  pub fn body(&self) -> String {
    match &self.content {
      Value::String(s) => s.clone(),
      other => serde_json::to_string_pretty(other).unwrap_or_default(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_flatten_string_detail() {
    let body: ApiErrorBody =
      serde_json::from_str(r#"{"detail": "Meeting not found"}"#).unwrap();
    assert_eq!(body.flatten(), "Meeting not found");
  }

  #[test]
  fn test_flatten_field_errors() {
    let body: ApiErrorBody = serde_json::from_str(
      r#"{"detail": [
        {"loc": ["body", "email"], "msg": "field required", "type": "value_error.missing"},
        {"loc": ["body", "title"], "msg": "str type expected", "type": "type_error.str"}
      ]}"#,
    )
    .unwrap();
    assert_eq!(
      body.flatten(),
      "email: field required; title: str type expected"
    );
  }

  #[test]
  fn test_export_body_markdown_vs_json() {
    let md: BriefExport =
      serde_json::from_str(r##"{"format": "markdown", "content": "# Title"}"##).unwrap();
    assert_eq!(md.body(), "# Title");

    let json: BriefExport =
      serde_json::from_str(r#"{"format": "json", "content": {"title": "T"}}"#).unwrap();
    assert!(json.body().contains("\"title\": \"T\""));
  }
}
