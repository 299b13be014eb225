pub mod error;
pub mod config;
pub mod address;
pub mod url;
pub mod request;
pub mod transport;
pub mod files;
pub mod gateway;
pub mod history;
pub mod agent;
pub mod manager;
pub mod logging;

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

pub use error::{Error, ErrorKind, Result};
pub use config::{AgentConfig, GatewayConfig, TimeoutConfig};
pub use gateway::Gateway;
pub use agent::{Agent, Subtask};
pub use manager::{AgentManager, StepResult, TaskSpec, WorkflowStep};
pub use transport::{HttpTransport, Transport};

/*

localmind: a client for a locally hosted LLM server (Ollama style
/api/generate and /api/version endpoints) plus a small layer of named
agents that prompt through it.

localmind/
├── Cargo.toml
├── src/
│   ├── lib.rs          # Re-exports and the endpoint Action
│   ├── error.rs        # Error taxonomy
│   ├── config.rs       # Gateway and agent configuration
│   ├── address.rs      # Host validation (SSRF deny-list)
│   ├── url.rs          # Endpoint URL composition
│   ├── request.rs      # Wire payloads
│   ├── transport/      # HTTP connector behind a trait
│   ├── files.rs        # File read/write and base64 images
│   ├── gateway.rs      # Request client
│   ├── history.rs      # Bounded agent logs
│   ├── agent.rs        # Agents and reasoning operations
│   ├── manager.rs      # Agent registry and workflows
│   └── logging.rs      # env_logger setup
└── tests/

*/

/// Endpoint exposed by the LLM server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action
{   /// Text generation
    Generate
  , /// Server version
    Version
}

impl Action
{   /// URL suffix after `/api/`
    pub fn as_str(&self) -> &'static str
    {   match self
        {   Action::Generate => "generate"
          , Action::Version => "version"
        }
    }
}

impl fmt::Display for Action
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.write_str(self.as_str())
    }
}

impl FromStr for Action
{   type Err = Error;

    fn from_str(s: &str) -> Result<Self>
    {   let action = s.trim();
        if action.is_empty()
        {   return Err(Error::Validation(
              "action must be a non-empty string".to_string()
            ));
        }
        if action.contains("..") || action.contains('/') || action.contains('\\')
        {   return Err(Error::Validation(
              format!("action '{}' contains a path sequence", action)
            ));
        }
        match action.to_ascii_lowercase().as_str()
        {   "generate" => Ok(Action::Generate)
          , "version" => Ok(Action::Version)
          , other => Err(Error::Validation(
              format!("unknown action '{}'", other)
            ))
        }
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn action_parsing()
    {   assert_eq!("generate".parse::<Action>().unwrap(), Action::Generate);
        assert_eq!(" Version ".parse::<Action>().unwrap(), Action::Version);
        assert!("".parse::<Action>().is_err());
        assert!("../version".parse::<Action>().is_err());
        assert!("generate/..".parse::<Action>().is_err());
        assert!("pull".parse::<Action>().is_err());
        assert_eq!(Action::Generate.to_string(), "generate");
    }
}
