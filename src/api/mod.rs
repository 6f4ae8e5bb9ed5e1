//! Transport layer: typed REST client for the meeting-brief backend.

pub mod api_types;
pub mod client;
pub mod error;
pub mod keys;
pub mod types;

pub use api_types::{BriefExport, BriefReceipt};
pub use client::ApiClient;
pub use error::ApiError;
