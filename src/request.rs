//! Wire types for the LLM server's generate and version endpoints

use serde::{Deserialize, Serialize};

/// Sampling options sent with a generation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions
{   pub temperature: f32
}

/// Body of a generation call.
/// Built fresh for every request and never mutated once sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratePayload
{   /// Model identifier
    pub model: String
  , /// Trimmed prompt text
    pub prompt: String
  , /// Always false, responses are read whole
    pub stream: bool
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerateOptions>
  , /// Base64 encoded images, in order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>
}

impl GeneratePayload
{   pub fn new(
      model: impl Into<String>
    , prompt: &str
    , temperature: Option<f32>
    ) -> Self
    {   GeneratePayload
        {   model: model.into()
          , prompt: prompt.trim().to_string()
          , stream: false
          , options: temperature.map(|temperature| GenerateOptions
            {   temperature
            })
          , images: None
        }
    }

    /// Attach images, consuming the payload
    pub fn with_images(mut self, images: Vec<String>) -> Self
    {   if !images.is_empty()
        {   self.images = Some(images);
        }
        self
    }
}

/// Body returned by a generation call
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse
{   pub response: String
}

/// Body returned by a version call
#[derive(Debug, Clone, Deserialize)]
pub struct VersionResponse
{   pub version: String
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn payload_skips_absent_fields()
    {   let payload = GeneratePayload::new("llama3", "  hi  ", None);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, serde_json::json!({
          "model": "llama3",
          "prompt": "hi",
          "stream": false
        }));
    }

    #[test]
    fn payload_with_options_and_images()
    {   let payload = GeneratePayload::new("llava", "describe", Some(0.5))
          .with_images(vec!["aGVsbG8=".to_string()]);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["options"]["temperature"], serde_json::json!(0.5));
        assert_eq!(json["images"], serde_json::json!(["aGVsbG8="]));
        assert_eq!(json["stream"], serde_json::json!(false));
    }
}
