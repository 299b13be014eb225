use std::fmt;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy kind, independent of the message carried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind
{   Validation
  , Timeout
  , Network
  , Api
  , Parse
  , NotFound
  , Io
  , Other
}

/// Custom error type for gateway and agent operations
/// Implements Clone so results can be stored and compared in tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// Malformed or missing input, caught before any I/O
    Validation(String)
  , /// Transport exceeded its deadline
    Timeout(String)
  , /// Connection failure or 5xx status
    Network(String)
  , /// 4xx status or a response body that breaks the protocol
    Api(String)
  , /// Model output parsed but had the wrong shape
    Parse(String)
  , /// No agent registered under this name
    AgentNotFound(String)
  , /// File collaborator failure
    Io(String)
  , /// Generic error
    Other(String)
}

impl Error
{   /// Taxonomy kind of this error
    pub fn kind(&self) -> ErrorKind
    {   match self
        {   Error::Validation(_) => ErrorKind::Validation
          , Error::Timeout(_) => ErrorKind::Timeout
          , Error::Network(_) => ErrorKind::Network
          , Error::Api(_) => ErrorKind::Api
          , Error::Parse(_) => ErrorKind::Parse
          , Error::AgentNotFound(_) => ErrorKind::NotFound
          , Error::Io(_) => ErrorKind::Io
          , Error::Other(_) => ErrorKind::Other
        }
    }

    /// Timeouts count as network failures
    pub fn is_network(&self) -> bool
    {   matches!(self, Error::Network(_) | Error::Timeout(_))
    }

    /// Worth retrying with backoff (nothing in this crate retries)
    pub fn is_transient(&self) -> bool
    {   self.is_network()
    }

    /// The message without the kind prefix
    pub fn message(&self) -> &str
    {   match self
        {   Error::Validation(msg)
          | Error::Timeout(msg)
          | Error::Network(msg)
          | Error::Api(msg)
          | Error::Parse(msg)
          | Error::AgentNotFound(msg)
          | Error::Io(msg)
          | Error::Other(msg) => msg
        }
    }

    /// Prefix the message with caller context, keeping the kind
    pub fn context(self, ctx: impl fmt::Display) -> Self
    {   let wrap = |msg: String| format!("{}: {}", ctx, msg);
        match self
        {   Error::Validation(msg) => Error::Validation(wrap(msg))
          , Error::Timeout(msg) => Error::Timeout(wrap(msg))
          , Error::Network(msg) => Error::Network(wrap(msg))
          , Error::Api(msg) => Error::Api(wrap(msg))
          , Error::Parse(msg) => Error::Parse(wrap(msg))
          , Error::AgentNotFound(msg) => Error::AgentNotFound(wrap(msg))
          , Error::Io(msg) => Error::Io(wrap(msg))
          , Error::Other(msg) => Error::Other(wrap(msg))
        }
    }

    /// Unclassified failures become network failures at the gateway
    pub fn promote_unclassified(self) -> Self
    {   match self
        {   Error::Other(msg) => Error::Network(msg)
          , other => other
        }
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::Validation(msg) => {
              write!(f, "Validation error: {}", msg)
            }
          , Error::Timeout(msg) => {
              write!(f, "Request timed out: {}", msg)
            }
          , Error::Network(msg) => {
              write!(f, "Network error: {}", msg)
            }
          , Error::Api(msg) => {
              write!(f, "API error: {}", msg)
            }
          , Error::Parse(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , Error::AgentNotFound(name) => {
              write!(f, "Agent not found: {}", name)
            }
          , Error::Io(msg) => {
              write!(f, "I/O error: {}", msg)
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn context_keeps_kind()
    {   let err = Error::Timeout("after 180s".to_string())
          .context("agent 'Researcher'");
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.message(), "agent 'Researcher': after 180s");
    }

    #[test]
    fn timeout_is_a_network_error()
    {   assert!(Error::Timeout("t".into()).is_network());
        assert!(Error::Network("n".into()).is_network());
        assert!(!Error::Api("a".into()).is_network());
        assert!(!Error::Validation("v".into()).is_transient());
    }

    #[test]
    fn only_unclassified_errors_are_promoted()
    {   assert_eq!(
          Error::from("boom").promote_unclassified(),
          Error::Network("boom".to_string())
        );
        assert_eq!(
          Error::Api("bad".into()).promote_unclassified(),
          Error::Api("bad".into())
        );
    }
}
