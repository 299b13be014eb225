//! Endpoint URL composition

use log::{debug, error};
use crate::error::{Error, Result};
use crate::Action;

/// Scheme used for every composed URL
pub const DEFAULT_SCHEME: &str = "http";

/// Parse a port given as a numeric string
pub fn parse_port(port: &str) -> Result<u16>
{   let port = port.trim();
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit())
    {   error!("Non-numeric port {:?}", port);
        return Err(Error::Validation(format!(
          "port must be a numeric string, got '{}'", port
        )));
    }
    match port.parse::<u32>()
    {   Ok(n) if (1..=65535).contains(&n) => Ok(n as u16)
      , _ => {
          error!("Port out of range {:?}", port);
          Err(Error::Validation(format!(
            "port must be between 1 and 65535, got '{}'", port
          )))
        }
    }
}

fn sanitize_host(host: &str) -> String
{   host.chars()
      .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':'))
      .collect()
}

fn sanitize_action(action: &str) -> String
{   action.chars()
      .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
      .collect()
}

/// Build `http://{host}:{port}/api/{action}` from validated parts.
///
/// The host may be given as a full URL; only its host component is kept,
/// so the scheme of the result is always [`DEFAULT_SCHEME`].
pub fn compose_url(
  host: &str
, port: &str
, action: Action
) -> Result<String>
{   crate::address::validate_host(host)?;
    let port = parse_port(port)?;

    let host = sanitize_host(&crate::address::extract_host(host)?);
    if host.is_empty()
    {   return Err(Error::Validation(
          "host is empty after sanitizing".to_string()
        ));
    }
    // IPv6 literals need brackets back once the port is appended
    let host = if host.contains(':')
    {   format!("[{}]", host)
    } else
    {   host
    };
    let action = sanitize_action(action.as_str());

    let url = format!(
      "{}://{}:{}/api/{}",
      DEFAULT_SCHEME, host, port, action
    );
    debug!("Composed URL {}", url);
    Ok(url)
}

/// Same as [`compose_url`] but with the action given as text
pub fn compose_url_str(
  host: &str
, port: &str
, action: &str
) -> Result<String>
{   let action: Action = action.parse()?;
    compose_url(host, port, action)
}
