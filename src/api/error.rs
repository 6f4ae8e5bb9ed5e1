//! Typed failures for every transport call.
//!
//! The client never surfaces a raw HTTP error: each failure is classified
//! here so views and the cache can react without string matching. Errors
//! are Clone because they live inside cache entries.

use thiserror::Error;

/// Failure taxonomy for the REST backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
  /// Transport unreachable, timed out, or the body could not be read.
  #[error("network error: {0}")]
  Network(String),

  /// The request was rejected as malformed (400/422), with field-level
  /// detail when the backend provides it.
  #[error("validation failed: {detail}")]
  Validation { detail: String },

  /// The referenced id does not exist (404).
  #[error("not found: {0}")]
  NotFound(String),

  /// Unexpected backend failure.
  #[error("server error ({status}): {detail}")]
  Server { status: u16, detail: String },
}

impl ApiError {
  /// Short label for list titles and status lines.
  pub fn label(&self) -> &'static str {
    match self {
      ApiError::Network(_) => "network",
      ApiError::Validation { .. } => "validation",
      ApiError::NotFound(_) => "not found",
      ApiError::Server { .. } => "server",
    }
  }

}

impl From<reqwest::Error> for ApiError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      ApiError::Network(format!("request timed out: {}", err))
    } else {
      ApiError::Network(err.to_string())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_display_includes_detail() {
    let err = ApiError::Validation {
      detail: "email: field required".into(),
    };
    assert_eq!(err.to_string(), "validation failed: email: field required");

    let err = ApiError::Server {
      status: 502,
      detail: "bad gateway".into(),
    };
    assert_eq!(err.to_string(), "server error (502): bad gateway");
  }

  #[test]
  fn test_labels() {
    assert_eq!(ApiError::Network("x".into()).label(), "network");
    assert_eq!(ApiError::NotFound("m1".into()).label(), "not found");
  }
}
