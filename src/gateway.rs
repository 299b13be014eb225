//! Request client for a locally hosted LLM server

use std::sync::Arc;
use log::{debug, error, info};
use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::request::GeneratePayload;
use crate::transport::{HttpTransport, Transport};
use crate::Action;

/// Validated configuration plus the request pipeline to the server.
///
/// Immutable after construction, so one gateway can be shared between
/// many agents behind an `Arc`.
pub struct Gateway
{   config: GatewayConfig
  , transport: Arc<dyn Transport>
}

impl std::fmt::Debug for Gateway
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   f.debug_struct("Gateway")
          .field("config", &self.config)
          .finish_non_exhaustive()
    }
}

impl Gateway
{   /// Validate endpoint settings and build a gateway over HTTP
    pub fn new(
      host: impl Into<String>
    , port: impl Into<String>
    , model: impl Into<String>
    , temperature: f32
    ) -> Result<Self>
    {   Gateway::from_config(GatewayConfig::new(host, port, model, temperature))
    }

    pub fn from_config(config: GatewayConfig) -> Result<Self>
    {   let config = config.validate()?;
        let transport = Arc::new(HttpTransport::new(&config.timeouts)?);
        info!(
          "Gateway ready for {}:{} (model {})",
          config.host, config.port, config.model
        );
        Ok(Gateway
        {   config
          , transport
        })
    }

    /// Build a gateway over a caller supplied transport
    pub fn with_transport(
      config: GatewayConfig
    , transport: Arc<dyn Transport>
    ) -> Result<Self>
    {   let config = config.validate()?;
        debug!("Gateway using custom transport for {}", config.host);
        Ok(Gateway
        {   config
          , transport
        })
    }

    pub fn config(&self) -> &GatewayConfig
    {   &self.config
    }

    pub fn model(&self) -> &str
    {   &self.config.model
    }

    pub fn temperature(&self) -> f32
    {   self.config.temperature
    }

    /// Endpoint URL for an action
    pub fn url_for(&self, action: Action) -> Result<String>
    {   crate::url::compose_url(&self.config.host, &self.config.port, action)
    }

    /// Build a fresh payload for one call
    pub fn compose_payload(
      &self
    , prompt: &str
    , images: Vec<String>
    ) -> Result<GeneratePayload>
    {   if prompt.trim().is_empty()
        {   return Err(Error::Validation(
              "prompt must be a non-empty string".to_string()
            ));
        }
        Ok(
          GeneratePayload::new(
            self.config.model.clone(),
            prompt,
            Some(self.config.temperature)
          )
          .with_images(images)
        )
    }

    async fn submit(&self, payload: GeneratePayload) -> Result<String>
    {   let url = self.url_for(Action::Generate)?;
        self.transport
          .send(&url, &payload)
          .await
          .map_err(|e| {
            error!("Generate call to {} failed: {}", url, e);
            e.promote_unclassified().context(format!("POST {}", url))
          })
    }

    /// Send a prompt and return the generated text
    pub async fn request(&self, prompt: &str) -> Result<String>
    {   debug!("request: {} chars", prompt.len());
        let payload = self.compose_payload(prompt, Vec::new())?;
        self.submit(payload).await
    }

    /// Send a prompt together with one image file
    pub async fn request_with_images(
      &self
    , prompt: &str
    , image_path: &str
    ) -> Result<String>
    {   debug!("request_with_images: {}", image_path);
        if prompt.trim().is_empty()
        {   return Err(Error::Validation(
              "prompt must be a non-empty string".to_string()
            ));
        }
        if image_path.trim().is_empty()
        {   return Err(Error::Validation(
              "image path must be a non-empty string".to_string()
            ));
        }
        let image = crate::files::encode_base64(image_path)?;
        let payload = self.compose_payload(prompt, vec![image])?;
        self.submit(payload).await
    }

    /// Ask the server for its version
    pub async fn version(&self) -> Result<String>
    {   let url = self.url_for(Action::Version)?;
        debug!("version: {}", url);
        self.transport
          .fetch_version(&url)
          .await
          .map_err(|e| {
            error!("Version call to {} failed: {}", url, e);
            e.promote_unclassified().context(format!("GET {}", url))
          })
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn construction_validates()
    {   assert!(Gateway::new("localhost", "11434", "llama3", 0.7).is_ok());
        for (host, port, model, temp) in [
          ("", "11434", "llama3", 0.7)
        , ("localhost", "port", "llama3", 0.7)
        , ("localhost", "11434", "", 0.7)
        , ("localhost", "11434", "llama3", 2.0)
        , ("10.1.2.3", "11434", "llama3", 0.7)
        ]
        {   assert!(matches!(
              Gateway::new(host, port, model, temp),
              Err(Error::Validation(_))
            ));
        }
    }

    #[test]
    fn payload_is_fresh_and_trimmed()
    {   let gateway = Gateway::new("localhost", "11434", "llama3", 0.7).unwrap();
        let first = gateway.compose_payload("  one ", Vec::new()).unwrap();
        let second = gateway
          .compose_payload("two", vec!["aW1n".to_string()])
          .unwrap();
        assert_eq!(first.prompt, "one");
        assert!(first.images.is_none());
        assert_eq!(second.images, Some(vec!["aW1n".to_string()]));
        assert_eq!(first.options.unwrap().temperature, 0.7);
        assert!(!second.stream);
    }

    #[test]
    fn empty_prompt_rejected()
    {   let gateway = Gateway::new("localhost", "11434", "llama3", 0.0).unwrap();
        assert!(matches!(
          gateway.compose_payload("   ", Vec::new()),
          Err(Error::Validation(_))
        ));
    }

    #[test]
    fn urls_follow_config()
    {   let gateway = Gateway::new("localhost", "11434", "llama3", 0.0).unwrap();
        assert_eq!(
          gateway.url_for(Action::Generate).unwrap(),
          "http://localhost:11434/api/generate"
        );
        assert_eq!(
          gateway.url_for(Action::Version).unwrap(),
          "http://localhost:11434/api/version"
        );
    }
}
