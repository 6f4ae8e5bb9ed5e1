//! REST client for the meeting-brief backend.
//!
//! One method per resource operation; every call is a single outbound
//! request returning the decoded payload or a typed [`ApiError`]. The
//! client holds no cache state - caching and reconciliation live in the
//! store layer.

use color_eyre::{eyre::eyre, Result};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::api_types::{ApiErrorBody, BriefExport, BriefReceipt, DeleteAck, UpdateAck};
use super::error::ApiError;
use super::types::{
  Brief, BriefOptions, BriefPatch, Contact, ContactDraft, ContactHistory, DateRange, ExportFormat,
  IntegrationOverview, LlmConfig, Meeting, MeetingDraft,
};

/// HTTP client wrapper around the backend's `/api` surface.
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base: String,
  host: String,
}

impl ApiClient {
  /// Build a client for the given base URL (e.g. `http://localhost:8000/api`).
  pub fn new(base_url: &str) -> Result<Self> {
    let parsed =
      Url::parse(base_url).map_err(|e| eyre!("invalid API base URL {}: {}", base_url, e))?;
    let host = match (parsed.host_str(), parsed.port()) {
      (Some(host), Some(port)) => format!("{}:{}", host, port),
      (Some(host), None) => host.to_string(),
      _ => base_url.to_string(),
    };

    // Brief generation is externally computed and can run far longer than
    // a normal request; the timeout has to cover it.
    let http = reqwest::Client::builder()
      .connect_timeout(Duration::from_secs(10))
      .timeout(Duration::from_secs(120))
      .build()
      .map_err(|e| eyre!("failed to build HTTP client: {}", e))?;

    Ok(Self {
      http,
      base: base_url.trim_end_matches('/').to_string(),
      host,
    })
  }

  /// Host shown in the header bar.
  pub fn host(&self) -> &str {
    &self.host
  }

  fn url(&self, path: &str) -> String {
    format!("{}/{}", self.base, path)
  }

  async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
      return Err(Self::status_error(status, response).await);
    }
    response.json::<T>().await.map_err(|e| ApiError::Server {
      status: status.as_u16(),
      detail: format!("unexpected response shape: {}", e),
    })
  }

  async fn status_error(status: StatusCode, response: Response) -> ApiError {
    let detail = response
      .json::<ApiErrorBody>()
      .await
      .map(|body| body.flatten())
      .unwrap_or_default();
    match status {
      StatusCode::NOT_FOUND => {
        let detail = if detail.is_empty() {
          "resource not found".to_string()
        } else {
          detail
        };
        ApiError::NotFound(detail)
      }
      StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
        ApiError::Validation { detail }
      }
      _ => {
        warn!(status = status.as_u16(), %detail, "backend error");
        ApiError::Server {
          status: status.as_u16(),
          detail,
        }
      }
    }
  }

  // ==========================================================================
  // Meetings
  // ==========================================================================

  /// List meetings, optionally bounded to a start-time range.
  pub async fn list_meetings(&self, range: Option<DateRange>) -> Result<Vec<Meeting>, ApiError> {
    let mut request = self.http.get(self.url("meetings"));
    if let Some(range) = range {
      request = request.query(&[
        ("start_date", range.start.to_rfc3339()),
        ("end_date", range.end.to_rfc3339()),
      ]);
    }
    let response = request.send().await?;
    self.decode(response).await
  }

  pub async fn get_meeting(&self, id: &str) -> Result<Meeting, ApiError> {
    let response = self.http.get(self.url(&format!("meetings/{}", id))).send().await?;
    self.decode(response).await
  }

  /// Create a meeting. Rejects obviously malformed drafts before touching
  /// the network.
  pub async fn create_meeting(&self, draft: &MeetingDraft) -> Result<Meeting, ApiError> {
    if draft.title.trim().is_empty() {
      return Err(ApiError::Validation {
        detail: "title must not be empty".into(),
      });
    }
    if draft.end_time <= draft.start_time {
      return Err(ApiError::Validation {
        detail: "end time must be after start time".into(),
      });
    }
    let response = self.http.post(self.url("meetings")).json(draft).send().await?;
    self.decode(response).await
  }

  /// Kick off brief generation for a meeting. Long-running: the backend
  /// gathers context and runs the generator before answering with a
  /// receipt.
  pub async fn generate_brief(
    &self,
    meeting_id: &str,
    options: &BriefOptions,
  ) -> Result<BriefReceipt, ApiError> {
    debug!(meeting_id, lookback_days = options.lookback_days, "requesting brief generation");
    let response = self
      .http
      .post(self.url(&format!("meetings/{}/brief", meeting_id)))
      .query(&[
        ("include_email", options.include_email.to_string()),
        ("include_crm", options.include_crm.to_string()),
        ("include_calendar", options.include_calendar.to_string()),
        ("lookback_days", options.lookback_days.to_string()),
      ])
      .send()
      .await?;
    self.decode(response).await
  }

  pub async fn delete_meeting(&self, id: &str) -> Result<(), ApiError> {
    let response = self
      .http
      .delete(self.url(&format!("meetings/{}", id)))
      .send()
      .await?;
    let ack: DeleteAck = self.decode(response).await?;
    if !ack.deleted {
      warn!(id, "backend acknowledged meeting delete without deleting");
    }
    Ok(())
  }

  // ==========================================================================
  // Briefs
  // ==========================================================================

  /// List briefs, most recent first (server-ordered).
  pub async fn list_briefs(&self) -> Result<Vec<Brief>, ApiError> {
    let response = self.http.get(self.url("briefs")).send().await?;
    self.decode(response).await
  }

  pub async fn get_brief(&self, id: &str) -> Result<Brief, ApiError> {
    let response = self.http.get(self.url(&format!("briefs/{}", id))).send().await?;
    self.decode(response).await
  }

  pub async fn update_brief(&self, id: &str, patch: &BriefPatch) -> Result<(), ApiError> {
    let response = self
      .http
      .put(self.url(&format!("briefs/{}", id)))
      .json(patch)
      .send()
      .await?;
    let ack: UpdateAck = self.decode(response).await?;
    if !ack.updated {
      warn!(id, "backend acknowledged brief update without updating");
    }
    Ok(())
  }

  pub async fn delete_brief(&self, id: &str) -> Result<(), ApiError> {
    let response = self
      .http
      .delete(self.url(&format!("briefs/{}", id)))
      .send()
      .await?;
    let ack: DeleteAck = self.decode(response).await?;
    if !ack.deleted {
      warn!(id, "backend acknowledged brief delete without deleting");
    }
    Ok(())
  }

  /// Export a brief as raw content in the requested format.
  pub async fn export_brief(
    &self,
    id: &str,
    format: ExportFormat,
  ) -> Result<BriefExport, ApiError> {
    let response = self
      .http
      .get(self.url(&format!("briefs/{}/export", id)))
      .query(&[("format", format.as_str())])
      .send()
      .await?;
    self.decode(response).await
  }

  // ==========================================================================
  // Contacts
  // ==========================================================================

  /// List contacts; `search` filters case-insensitively on name, email and
  /// company (server-side).
  pub async fn list_contacts(&self, search: Option<&str>) -> Result<Vec<Contact>, ApiError> {
    let mut request = self.http.get(self.url("contacts"));
    if let Some(search) = search {
      request = request.query(&[("search", search)]);
    }
    let response = request.send().await?;
    self.decode(response).await
  }

  pub async fn create_contact(&self, draft: &ContactDraft) -> Result<Contact, ApiError> {
    if draft.email.trim().is_empty() {
      return Err(ApiError::Validation {
        detail: "email is required".into(),
      });
    }
    let response = self.http.post(self.url("contacts")).json(draft).send().await?;
    self.decode(response).await
  }

  pub async fn get_contact(&self, id: &str) -> Result<Contact, ApiError> {
    let response = self.http.get(self.url(&format!("contacts/{}", id))).send().await?;
    self.decode(response).await
  }

  pub async fn contact_history(&self, id: &str) -> Result<ContactHistory, ApiError> {
    let response = self
      .http
      .get(self.url(&format!("contacts/{}/history", id)))
      .send()
      .await?;
    self.decode(response).await
  }

  // ==========================================================================
  // Settings
  // ==========================================================================

  pub async fn integration_status(&self) -> Result<IntegrationOverview, ApiError> {
    let response = self.http.get(self.url("settings/integrations")).send().await?;
    self.decode(response).await
  }

  pub async fn llm_config(&self) -> Result<LlmConfig, ApiError> {
    let response = self.http.get(self.url("settings/llm")).send().await?;
    self.decode(response).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{TimeZone, Utc};
  use mockito::Matcher;

  fn meeting_json(id: &str, has_brief: bool) -> serde_json::Value {
    serde_json::json!({
      "id": id,
      "title": "Quarterly sync",
      "description": null,
      "start_time": "2026-08-06T09:00:00",
      "end_time": "2026-08-06T10:00:00",
      "location": null,
      "meeting_link": null,
      "participants": [],
      "calendar_id": null,
      "is_recurring": false,
      "recurrence_rule": null,
      "has_brief": has_brief,
      "brief_id": null,
      "created_at": "2026-08-01T12:00:00",
      "updated_at": "2026-08-01T12:00:00"
    })
  }

  #[tokio::test]
  async fn test_list_meetings_decodes() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/meetings")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(serde_json::json!([meeting_json("m1", true)]).to_string())
      .create_async()
      .await;

    let client = ApiClient::new(&server.url()).unwrap();
    let meetings = client.list_meetings(None).await.unwrap();

    assert_eq!(meetings.len(), 1);
    assert_eq!(meetings[0].id, "m1");
    assert!(meetings[0].has_brief);
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_list_meetings_passes_range() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/meetings")
      .match_query(Matcher::AllOf(vec![
        Matcher::Regex("start_date=2026".into()),
        Matcher::Regex("end_date=2026".into()),
      ]))
      .with_status(200)
      .with_body("[]")
      .create_async()
      .await;

    let client = ApiClient::new(&server.url()).unwrap();
    let range = DateRange {
      start: Utc.with_ymd_and_hms(2026, 8, 6, 0, 0, 0).unwrap(),
      end: Utc.with_ymd_and_hms(2026, 8, 13, 0, 0, 0).unwrap(),
    };
    let meetings = client.list_meetings(Some(range)).await.unwrap();

    assert!(meetings.is_empty());
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_get_meeting_not_found() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/meetings/missing")
      .with_status(404)
      .with_body(r#"{"detail": "Meeting not found"}"#)
      .create_async()
      .await;

    let client = ApiClient::new(&server.url()).unwrap();
    let err = client.get_meeting("missing").await.unwrap_err();

    assert_eq!(err, ApiError::NotFound("Meeting not found".into()));
  }

  #[tokio::test]
  async fn test_create_meeting_rejects_inverted_range_without_network() {
    // No mock registered: a network call would fail the test differently.
    let client = ApiClient::new("http://127.0.0.1:9").unwrap();
    let draft = MeetingDraft {
      title: "Kickoff".into(),
      description: None,
      start_time: Utc.with_ymd_and_hms(2026, 8, 6, 10, 0, 0).unwrap(),
      end_time: Utc.with_ymd_and_hms(2026, 8, 6, 9, 0, 0).unwrap(),
      location: None,
      participants: Vec::new(),
    };

    let err = client.create_meeting(&draft).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation { .. }));
  }

  #[tokio::test]
  async fn test_create_meeting_posts_draft() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("POST", "/meetings")
      .match_body(Matcher::PartialJson(serde_json::json!({
        "title": "Kickoff",
        "participants": ["ada@example.com"]
      })))
      .with_status(200)
      .with_body(meeting_json("m2", false).to_string())
      .create_async()
      .await;

    let client = ApiClient::new(&server.url()).unwrap();
    let draft = MeetingDraft {
      title: "Kickoff".into(),
      description: None,
      start_time: Utc.with_ymd_and_hms(2026, 8, 6, 9, 0, 0).unwrap(),
      end_time: Utc.with_ymd_and_hms(2026, 8, 6, 10, 0, 0).unwrap(),
      location: None,
      participants: vec!["ada@example.com".into()],
    };
    let meeting = client.create_meeting(&draft).await.unwrap();

    assert_eq!(meeting.id, "m2");
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_generate_brief_sends_options() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("POST", "/meetings/m1/brief")
      .match_query(Matcher::AllOf(vec![
        Matcher::UrlEncoded("include_email".into(), "true".into()),
        Matcher::UrlEncoded("include_crm".into(), "false".into()),
        Matcher::UrlEncoded("include_calendar".into(), "true".into()),
        Matcher::UrlEncoded("lookback_days".into(), "30".into()),
      ]))
      .with_status(200)
      .with_body(
        serde_json::json!({
          "brief_id": "b1",
          "meeting_id": "m1",
          "title": "Brief: Quarterly sync",
          "executive_summary": "Summary",
          "generated_at": "2026-08-06T11:00:00"
        })
        .to_string(),
      )
      .create_async()
      .await;

    let client = ApiClient::new(&server.url()).unwrap();
    let options = BriefOptions {
      include_crm: false,
      ..Default::default()
    };
    let receipt = client.generate_brief("m1", &options).await.unwrap();

    assert_eq!(receipt.brief_id, "b1");
    assert_eq!(receipt.title, "Brief: Quarterly sync");
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_delete_brief_not_found() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("DELETE", "/briefs/ghost")
      .with_status(404)
      .with_body(r#"{"detail": "Brief not found"}"#)
      .create_async()
      .await;

    let client = ApiClient::new(&server.url()).unwrap();
    let err = client.delete_brief("ghost").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
  }

  #[tokio::test]
  async fn test_update_brief_puts_patch() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("PUT", "/briefs/b1")
      .match_body(Matcher::PartialJson(serde_json::json!({"title": "Renamed"})))
      .with_status(200)
      .with_body(r#"{"updated": true, "brief_id": "b1"}"#)
      .create_async()
      .await;

    let client = ApiClient::new(&server.url()).unwrap();
    let patch = BriefPatch {
      title: Some("Renamed".into()),
      ..Default::default()
    };
    client.update_brief("b1", &patch).await.unwrap();
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_list_contacts_passes_search() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/contacts")
      .match_query(Matcher::UrlEncoded("search".into(), "john".into()))
      .with_status(200)
      .with_body("[]")
      .create_async()
      .await;

    let client = ApiClient::new(&server.url()).unwrap();
    client.list_contacts(Some("john")).await.unwrap();
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_create_contact_duplicate_email_is_validation_error() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("POST", "/contacts")
      .with_status(400)
      .with_body(r#"{"detail": "Contact with this email already exists"}"#)
      .create_async()
      .await;

    let client = ApiClient::new(&server.url()).unwrap();
    let draft = ContactDraft {
      email: "ada@example.com".into(),
      ..Default::default()
    };
    let err = client.create_contact(&draft).await.unwrap_err();

    assert_eq!(
      err,
      ApiError::Validation {
        detail: "Contact with this email already exists".into()
      }
    );
  }

  #[tokio::test]
  async fn test_create_contact_missing_email_is_local_validation_error() {
    let client = ApiClient::new("http://127.0.0.1:9").unwrap();
    let err = client.create_contact(&ContactDraft::default()).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation { .. }));
  }

  #[tokio::test]
  async fn test_unprocessable_entity_flattens_field_errors() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("POST", "/contacts")
      .with_status(422)
      .with_body(
        r#"{"detail": [{"loc": ["body", "email"], "msg": "field required", "type": "value_error.missing"}]}"#,
      )
      .create_async()
      .await;

    let client = ApiClient::new(&server.url()).unwrap();
    let draft = ContactDraft {
      email: "x".into(),
      ..Default::default()
    };
    let err = client.create_contact(&draft).await.unwrap_err();

    assert_eq!(
      err,
      ApiError::Validation {
        detail: "email: field required".into()
      }
    );
  }

  #[tokio::test]
  async fn test_server_error_carries_status() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/briefs")
      .with_status(500)
      .with_body(r#"{"detail": "boom"}"#)
      .create_async()
      .await;

    let client = ApiClient::new(&server.url()).unwrap();
    let err = client.list_briefs().await.unwrap_err();

    assert_eq!(
      err,
      ApiError::Server {
        status: 500,
        detail: "boom".into()
      }
    );
  }

  #[tokio::test]
  async fn test_unreachable_backend_is_network_error() {
    // Nothing listens on port 9 (discard); connection must be refused.
    let client = ApiClient::new("http://127.0.0.1:9").unwrap();
    let err = client.list_briefs().await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
  }

  #[tokio::test]
  async fn test_export_brief_requests_format() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/briefs/b1/export")
      .match_query(Matcher::UrlEncoded("format".into(), "markdown".into()))
      .with_status(200)
      .with_body(r##"{"format": "markdown", "content": "# Brief"}"##)
      .create_async()
      .await;

    let client = ApiClient::new(&server.url()).unwrap();
    let export = client.export_brief("b1", ExportFormat::Markdown).await.unwrap();

    assert_eq!(export.format, "markdown");
    assert_eq!(export.body(), "# Brief");
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_integration_status_decodes() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/settings/integrations")
      .with_status(200)
      .with_body(
        serde_json::json!({
          "calendar": {"enabled": true, "provider": "google", "status": "configured"},
          "email": {"enabled": false, "provider": null, "status": "not_configured"},
          "crm": {"enabled": false, "provider": null, "status": "not_configured"},
          "llm": {"provider": "anthropic", "model": "claude-sonnet", "status": "configured"}
        })
        .to_string(),
      )
      .create_async()
      .await;

    let client = ApiClient::new(&server.url()).unwrap();
    let overview = client.integration_status().await.unwrap();

    assert!(overview.calendar.status.is_configured());
    assert_eq!(overview.calendar.provider.as_deref(), Some("google"));
    assert_eq!(overview.llm.model, "claude-sonnet");
  }
}
