use std::time::Duration;
use async_trait::async_trait;
use log::{debug, trace, error};
use reqwest::StatusCode;
use crate::config::TimeoutConfig;
use crate::error::{Error, Result};
use crate::request::{GeneratePayload, GenerateResponse, VersionResponse};

/// reqwest backed transport with per-call deadlines
#[derive(Debug, Clone)]
pub struct HttpTransport
{   http_client: reqwest::Client
  , generate_timeout: Duration
  , version_timeout: Duration
}

impl HttpTransport
{   /// The server is local, so system proxies are bypassed
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self>
    {   debug!(
          "Creating HttpTransport ({}s generate, {}s version)",
          timeouts.generate_secs, timeouts.version_secs
        );
        let http_client = reqwest::Client::builder()
          .no_proxy()
          .build()
          .map_err(|e| {
            error!("Could not build HTTP client: {}", e);
            Error::Network(format!("could not build HTTP client: {}", e))
          })?;
        Ok(HttpTransport
        {   http_client
          , generate_timeout: Duration::from_secs(timeouts.generate_secs)
          , version_timeout: Duration::from_secs(timeouts.version_secs)
        })
    }

    pub fn generate_timeout(&self) -> Duration
    {   self.generate_timeout
    }

    pub fn version_timeout(&self) -> Duration
    {   self.version_timeout
    }
}

/// Map a reqwest failure onto the taxonomy
fn map_send_error(url: &str, deadline: Duration, e: reqwest::Error) -> Error
{   if e.is_timeout()
    {   error!("Request to {} timed out after {:?}", url, deadline);
        Error::Timeout(format!(
          "request to {} timed out after {}s", url, deadline.as_secs()
        ))
    } else
    {   error!("HTTP error for {}: {}", url, e);
        Error::Network(format!("request to {} failed: {}", url, e))
    }
}

/// Classify a non-success status for generation calls
pub fn status_error(url: &str, status: StatusCode, body: &str) -> Error
{   let msg = format!("{} returned {}: {}", url, status, body.trim());
    if status.is_server_error()
    {   Error::Network(msg)
    } else
    {   Error::Api(msg)
    }
}

/// Pull the `response` field out of a generation body
pub fn parse_generate_body(url: &str, body: &str) -> Result<String>
{   if let Ok(parsed) = serde_json::from_str::<GenerateResponse>(body)
    {   return Ok(parsed.response);
    }

    // Decode again loosely to say what was wrong
    let value: serde_json::Value = serde_json::from_str(body)
      .map_err(|e| {
        error!("Malformed JSON from {}: {}", url, e);
        Error::Api(format!("malformed JSON from {}: {}", url, e))
      })?;
    match value.get("response")
    {   Some(other) if !other.is_null() => {
          error!("Non-string response field from {}", url);
          Err(Error::Api(format!(
            "'response' field from {} is not a string: {}", url, other
          )))
        }
      , _ => {
          error!("Missing response field from {}", url);
          Err(Error::Api(format!(
            "body from {} has no 'response' field", url
          )))
        }
    }
}

#[async_trait]
impl crate::transport::Transport for HttpTransport
{   async fn send(
      &self
    , url: &str
    , payload: &GeneratePayload
    ) -> Result<String>
    {   debug!("POST {} (model {})", url, payload.model);
        trace!("Generate payload: {:?}", payload);

        let response = self.http_client
          .post(url)
          .timeout(self.generate_timeout)
          .json(payload)
          .send()
          .await
          .map_err(|e| map_send_error(url, self.generate_timeout, e))?;

        let status = response.status();
        trace!("Generate response status: {}", status);

        let body = response.text().await
          .map_err(|e| map_send_error(url, self.generate_timeout, e))?;

        if !status.is_success()
        {   error!("LLM server error from {}: {}", url, status);
            return Err(status_error(url, status, &body));
        }

        parse_generate_body(url, &body)
    }

    async fn fetch_version(
      &self
    , url: &str
    ) -> Result<String>
    {   debug!("GET {}", url);

        let response = self.http_client
          .get(url)
          .timeout(self.version_timeout)
          .send()
          .await
          .map_err(|e| map_send_error(url, self.version_timeout, e))?;

        let status = response.status();
        trace!("Version response status: {}", status);

        let body = response.text().await
          .map_err(|e| map_send_error(url, self.version_timeout, e))?;

        if !status.is_success()
        {   error!("Version request to {} failed: {}", url, status);
            return Err(Error::Network(format!(
              "{} returned {}: {}", url, status, body.trim()
            )));
        }

        match serde_json::from_str::<VersionResponse>(&body)
        {   Ok(parsed) => Ok(parsed.version)
          , Err(_) => Ok(body)
        }
    }
}
