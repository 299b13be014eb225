//! Host validation against request forgery
//!
//! The gateway target normally comes from operator configuration, but that
//! value can be fed from upstream sources, so every host is checked before a
//! URL is built from it. Loopback is always allowed since the LLM server is
//! expected to run locally; every other private or reserved address is
//! refused. Domain names must follow a conservative label grammar.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use log::{debug, error};
use once_cell::sync::Lazy;
use regex::Regex;
use crate::error::{Error, Result};

const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

static LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?$").unwrap()
});

static ALLOWED_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.\-:]+$").unwrap()
});

// Dotted or bare numerals, including hex and octal spellings such as
// 0x7f.1 or 2130706433, which some resolvers still map to addresses.
static IPV4_LOOKALIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i:0x[0-9a-f]*|[0-9]+)(?:\.(?i:0x[0-9a-f]*|[0-9]*))*$")
      .unwrap()
});

static IPV6_LOOKALIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9A-Fa-f.]*:[0-9A-Fa-f:.]*$").unwrap()
});

/// (network, prefix length, label)
const V4_DENY: &[([u8; 4], u32, &str)] = &[
    ([0, 0, 0, 0], 8, "this-network")
  , ([10, 0, 0, 0], 8, "private")
  , ([100, 64, 0, 0], 10, "shared address space")
  , ([169, 254, 0, 0], 16, "link-local")
  , ([172, 16, 0, 0], 12, "private")
  , ([192, 0, 0, 0], 24, "protocol assignments")
  , ([192, 0, 2, 0], 24, "documentation")
  , ([192, 168, 0, 0], 16, "private")
  , ([198, 18, 0, 0], 15, "benchmarking")
  , ([198, 51, 100, 0], 24, "documentation")
  , ([203, 0, 113, 0], 24, "documentation")
  , ([224, 0, 0, 0], 4, "multicast")
  , ([240, 0, 0, 0], 4, "reserved")
];

const V6_DENY: &[([u16; 8], u32, &str)] = &[
    ([0, 0, 0, 0, 0, 0, 0, 0], 128, "unspecified")
  , ([0, 0, 0, 0, 0, 0, 0, 0], 8, "reserved")
  , ([0x0064, 0xff9b, 0x0001, 0, 0, 0, 0, 0], 48, "local-use translation")
  , ([0x0100, 0, 0, 0, 0, 0, 0, 0], 64, "discard-only")
  , ([0x2001, 0x0db8, 0, 0, 0, 0, 0, 0], 32, "documentation")
  , ([0xfc00, 0, 0, 0, 0, 0, 0, 0], 7, "unique-local")
  , ([0xfe80, 0, 0, 0, 0, 0, 0, 0], 10, "link-local")
  , ([0xfec0, 0, 0, 0, 0, 0, 0, 0], 10, "site-local")
  , ([0xff00, 0, 0, 0, 0, 0, 0, 0], 8, "multicast")
];

/// Addresses refused outright regardless of range tables
const V4_BLOCKED: &[Ipv4Addr] = &[
    Ipv4Addr::UNSPECIFIED
  , Ipv4Addr::BROADCAST
];

/// Pull the host out of a value that may be a full URL or a bracketed
/// IPv6 literal. Returns the bare host.
pub fn extract_host(input: &str) -> Result<String>
{   let input = input.trim();
    let host = if input.contains("://")
    {   let parsed = reqwest::Url::parse(input).map_err(|e| {
          error!("Unparseable host URL {:?}: {}", input, e);
          Error::Validation(format!("invalid URL '{}': {}", input, e))
        })?;
        parsed.host_str()
          .ok_or_else(|| Error::Validation(
            format!("URL '{}' has no host", input)
          ))?
          .to_string()
    } else
    {   input.to_string()
    };

    let host = host
      .strip_prefix('[')
      .and_then(|h| h.strip_suffix(']'))
      .map(str::to_string)
      .unwrap_or(host);
    Ok(host)
}

/// Validate a host (bare name, IP literal or URL)
pub fn validate_host(input: &str) -> Result<()>
{   if input.trim().is_empty()
    {   return Err(Error::Validation(
          "host must be a non-empty string".to_string()
        ));
    }
    let host = extract_host(input)?;
    if host.is_empty()
    {   return Err(Error::Validation(
          "host must be a non-empty string".to_string()
        ));
    }
    debug!("Validating host {:?}", host);

    match host.parse::<IpAddr>()
    {   Ok(ip) => check_ip(ip)
      , Err(_) => check_domain(&host)
    }
}

/// Apply the deny-list to a literal address
pub fn check_ip(ip: IpAddr) -> Result<()>
{   if ip.is_loopback()
    {   return Ok(());
    }
    match ip
    {   IpAddr::V4(v4) => check_v4(v4)
      , IpAddr::V6(v6) => {
          // IPv4-mapped addresses are judged by the embedded address
          if let Some(v4) = mapped_v4(v6)
          {   if v4.is_loopback()
              {   return Ok(());
              }
              return check_v4(v4);
          }
          // Other forms carrying an IPv4 address must pass both tables
          if let Some(v4) = embedded_v4(v6)
          {   check_v4(v4).map_err(|e| {
                e.context(format!("{} carries {}", v6, v4))
              })?;
          }
          check_v6(v6)
        }
    }
}

fn check_v4(addr: Ipv4Addr) -> Result<()>
{   if V4_BLOCKED.contains(&addr)
    {   error!("Blocked address {}", addr);
        return Err(Error::Validation(
          format!("address {} is not allowed", addr)
        ));
    }
    let bits = u32::from(addr);
    for (net, prefix, label) in V4_DENY
    {   let mask = mask_u32(*prefix);
        if bits & mask == u32::from(Ipv4Addr::from(*net)) & mask
        {   error!("Address {} falls in {} range", addr, label);
            return Err(Error::Validation(format!(
              "address {} is in a {} range ({}/{})",
              addr, label, Ipv4Addr::from(*net), prefix
            )));
        }
    }
    Ok(())
}

fn check_v6(addr: Ipv6Addr) -> Result<()>
{   let bits = u128::from(addr);
    for (net, prefix, label) in V6_DENY
    {   let net = Ipv6Addr::new(
          net[0], net[1], net[2], net[3],
          net[4], net[5], net[6], net[7]
        );
        let mask = mask_u128(*prefix);
        if bits & mask == u128::from(net) & mask
        {   error!("Address {} falls in {} range", addr, label);
            return Err(Error::Validation(format!(
              "address {} is in a {} range ({}/{})",
              addr, label, net, prefix
            )));
        }
    }
    Ok(())
}

fn mapped_v4(addr: Ipv6Addr) -> Option<Ipv4Addr>
{   match addr.segments()
    {   [0, 0, 0, 0, 0, 0xffff, hi, lo] => {
          Some(Ipv4Addr::from(((hi as u32) << 16) | lo as u32))
        }
      , _ => None
    }
}

/// IPv4 address inside a compatible, translated, NAT64 or 6to4 address
fn embedded_v4(addr: Ipv6Addr) -> Option<Ipv4Addr>
{   let join = |hi: u16, lo: u16| {
      Ipv4Addr::from(((hi as u32) << 16) | lo as u32)
    };
    match addr.segments()
    {   [0, 0, 0, 0, 0, 0, hi, lo]
      | [0, 0, 0, 0, 0xffff, 0, hi, lo]
      | [0x0064, 0xff9b, 0, 0, 0, 0, hi, lo] => Some(join(hi, lo))
      , [0x2002, hi, lo, ..] => Some(join(hi, lo))
      , _ => None
    }
}

fn mask_u32(prefix: u32) -> u32
{   if prefix == 0 { 0 } else { u32::MAX << (32 - prefix) }
}

fn mask_u128(prefix: u32) -> u128
{   if prefix == 0 { 0 } else { u128::MAX << (128 - prefix) }
}

fn check_domain(host: &str) -> Result<()>
{   let reject = |reason: &str| {
      error!("Rejected host {:?}: {}", host, reason);
      Err(Error::Validation(format!("invalid host '{}': {}", host, reason)))
    };

    if !ALLOWED_CHARS.is_match(host)
    {   return reject("contains characters outside [A-Za-z0-9.-:]");
    }
    // Anything shaped like an address that failed strict parsing above is
    // an encoding trick, not a name.
    if IPV4_LOOKALIKE.is_match(host) || IPV6_LOOKALIKE.is_match(host)
    {   return reject("looks like a malformed IP address");
    }
    if host.contains("..")
    {   return reject("consecutive dots");
    }
    if host.len() > MAX_DOMAIN_LEN
    {   return reject("longer than 253 characters");
    }
    for label in host.split('.')
    {   if label.len() > MAX_LABEL_LEN
        {   return reject("label longer than 63 characters");
        }
        if !LABEL.is_match(label)
        {   return reject("malformed label");
        }
    }
    Ok(())
}
