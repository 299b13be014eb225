//! Transport connectors between the gateway and the LLM server

pub mod http;

// Re-export for convenience
pub use http::HttpTransport;

use async_trait::async_trait;
use crate::request::GeneratePayload;

/// A single-shot connection to the LLM server.
///
/// Implementations raise the most specific error kind they can tell:
/// `Timeout` when the deadline passes, `Network` for connection failures
/// and 5xx statuses, `Api` for other statuses or a body without a
/// `response` field. Nothing here retries.
#[async_trait]
pub trait Transport: Send + Sync
{   /// POST a generation payload and return the `response` text
    async fn send(
      &self
    , url: &str
    , payload: &GeneratePayload
    ) -> crate::error::Result<String>;

    /// GET the server version
    async fn fetch_version(
      &self
    , url: &str
    ) -> crate::error::Result<String>;
}
