//! Configuration for the gateway and for agent rosters

use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};

/// Default history capacity for each agent log
pub const DEFAULT_MAX_HISTORY: usize = 1000;

/// Transport deadlines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutConfig
{   /// Deadline for generation calls in seconds
    pub generate_secs: u64
  , /// Deadline for version calls in seconds
    pub version_secs: u64
}

impl Default for TimeoutConfig
{   fn default() -> Self
    {   TimeoutConfig
        {   generate_secs: 180
          , version_secs: 30
        }
    }
}

/// Endpoint configuration for one gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig
{   /// LLM server host, bare or as a URL
    pub host: String
  , /// Port as a numeric string
    pub port: String
  , /// Model identifier
    pub model: String
  , /// Sampling temperature in [0, 1]
    pub temperature: f32
  , #[serde(default)]
    pub timeouts: TimeoutConfig
}

impl Default for GatewayConfig
{   fn default() -> Self
    {   GatewayConfig
        {   host: "localhost".to_string()
          , port: "11434".to_string()
          , model: "llama3".to_string()
          , temperature: 0.0
          , timeouts: TimeoutConfig::default()
        }
    }
}

impl GatewayConfig
{   pub fn new(
      host: impl Into<String>
    , port: impl Into<String>
    , model: impl Into<String>
    , temperature: f32
    ) -> Self
    {   GatewayConfig
        {   host: host.into()
          , port: port.into()
          , model: model.into()
          , temperature
          , timeouts: TimeoutConfig::default()
        }
    }

    /// Check every field, returning a trimmed copy
    pub fn validate(&self) -> Result<GatewayConfig>
    {   let host = self.host.trim();
        if host.is_empty()
        {   return Err(Error::Validation(
              "host must be a non-empty string".to_string()
            ));
        }
        crate::address::validate_host(host)?;

        let port = self.port.trim();
        crate::url::parse_port(port)?;

        let model = self.model.trim();
        if model.is_empty()
        {   return Err(Error::Validation(
              "model must be a non-empty string".to_string()
            ));
        }

        if !self.temperature.is_finite()
          || self.temperature < 0.0
          || self.temperature > 1.0
        {   return Err(Error::Validation(format!(
              "temperature must be between 0 and 1, got {}",
              self.temperature
            )));
        }

        if self.timeouts.generate_secs == 0
          || self.timeouts.version_secs == 0
        {   return Err(Error::Validation(
              "timeouts must be at least one second".to_string()
            ));
        }

        Ok(GatewayConfig
        {   host: host.to_string()
          , port: port.to_string()
          , model: model.to_string()
          , temperature: self.temperature
          , timeouts: self.timeouts.clone()
        })
    }
}

/// One agent entry in a roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig
{   pub name: String
  , #[serde(default)]
    pub role: String
  , #[serde(default)]
    pub instructions: String
  , #[serde(default = "default_max_history")]
    pub max_history: usize
}

fn default_max_history() -> usize
{   DEFAULT_MAX_HISTORY
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn default_config_is_valid()
    {   let config = GatewayConfig::default().validate().unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.timeouts.generate_secs, 180);
        assert_eq!(config.timeouts.version_secs, 30);
    }

    #[test]
    fn rejects_bad_fields()
    {   let bad = [
          GatewayConfig::new("", "11434", "llama3", 0.5)
        , GatewayConfig::new("   ", "11434", "llama3", 0.5)
        , GatewayConfig::new("localhost", "abc", "llama3", 0.5)
        , GatewayConfig::new("localhost", "0", "llama3", 0.5)
        , GatewayConfig::new("localhost", "70000", "llama3", 0.5)
        , GatewayConfig::new("localhost", "11434", " ", 0.5)
        , GatewayConfig::new("localhost", "11434", "llama3", 1.5)
        , GatewayConfig::new("localhost", "11434", "llama3", -0.1)
        , GatewayConfig::new("localhost", "11434", "llama3", f32::NAN)
        , GatewayConfig::new("10.0.0.1", "11434", "llama3", 0.5)
        ];
        for config in bad.iter()
        {   let err = config.validate().unwrap_err();
            assert!(
              matches!(err, Error::Validation(_)),
              "expected validation error for {:?}", config
            );
        }
    }

    #[test]
    fn trims_host_and_model()
    {   let config = GatewayConfig::new(" localhost ", "11434", " llama3 ", 1.0)
          .validate()
          .unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.model, "llama3");
    }

    #[test]
    fn agent_config_defaults_from_json()
    {   let config: AgentConfig = serde_json::from_str(
          r#"{"name": "Researcher", "role": "researcher"}"#
        ).unwrap();
        assert_eq!(config.instructions, "");
        assert_eq!(config.max_history, DEFAULT_MAX_HISTORY);
    }
}
