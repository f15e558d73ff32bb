use crate::dns::{DnsLookup, SystemDns};
use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Debug, Display};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::ops::Deref;
use tracing::debug;

/// Strict dotted-quad-with-port shape: four period-separated groups of 1-3
/// digits, a colon, then a 1-5 digit port. Gates which inputs may take the
/// literal-IPv4 path. The engine scans in linear time, so a hostile input
/// cannot stall the check.
static IPV4_WITH_PORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[0-9]{1,3}\.){3}[0-9]{1,3}:[0-9]{1,5}$").unwrap());

/// A daemon address that passed validation: a concrete IP plus an in-range
/// port, with no tie back to the text it was parsed from.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResolvedEndpoint(SocketAddr);

impl ResolvedEndpoint {
    pub fn new(address: IpAddr, port: u16) -> Self {
        Self(SocketAddr::new(address, port))
    }
}

impl Deref for ResolvedEndpoint {
    type Target = SocketAddr;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<SocketAddr> for ResolvedEndpoint {
    fn from(value: SocketAddr) -> Self {
        Self(value)
    }
}

impl From<ResolvedEndpoint> for SocketAddr {
    fn from(value: ResolvedEndpoint) -> Self {
        value.0
    }
}

impl From<&ResolvedEndpoint> for SocketAddr {
    fn from(value: &ResolvedEndpoint) -> Self {
        value.0
    }
}

impl Debug for ResolvedEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for ResolvedEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Turns daemon address text into a [`ResolvedEndpoint`], going through the
/// [`DnsLookup`] collaborator when the host part is a name.
///
/// Accepted shapes, first match wins: `[v6]:port`, bare v6, `v4:port`,
/// `host:port`, bare v4 or host (these last two take `default_port`).
#[derive(Debug, Default, Clone)]
pub struct EndpointResolver<D = SystemDns> {
    dns: D,
}

impl EndpointResolver<SystemDns> {
    pub fn new() -> Self {
        Self { dns: SystemDns }
    }
}

impl<D: DnsLookup> EndpointResolver<D> {
    /// `dns` answers hostname lookups; hand in a stub to keep tests off the
    /// network.
    pub fn with_dns(dns: D) -> Self {
        Self { dns }
    }

    pub fn resolve(&self, input: &str, default_port: Option<u16>) -> Result<ResolvedEndpoint> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::EmptyInput {
                input: input.to_string(),
            });
        }

        // `[v6]:port`. The brackets keep the v6 colons apart from the port
        // separator; a v6 literal cannot contain `]`, so the first `]:` is
        // the split point.
        if let Some(rest) = trimmed.strip_prefix('[') {
            if let Some((addr_part, port_part)) = rest.split_once("]:") {
                let addr = addr_part
                    .parse::<Ipv6Addr>()
                    .map_err(|_| Error::InvalidAddress {
                        input: input.to_string(),
                        addr: addr_part.to_string(),
                    })?;
                let port = parse_port(input, port_part)?;
                return Ok(ResolvedEndpoint::new(addr.into(), port));
            }
        }

        // Unbracketed text with two or more colons can only be a bare v6
        // literal, which carries no port of its own.
        if trimmed.matches(':').count() >= 2 {
            let addr = trimmed
                .parse::<Ipv6Addr>()
                .map_err(|_| Error::MalformedEndpoint {
                    input: input.to_string(),
                })?;
            let port = default_port.ok_or_else(|| Error::PortRequired {
                input: input.to_string(),
            })?;
            return Ok(ResolvedEndpoint::new(addr.into(), port));
        }

        match trimmed.rsplit_once(':') {
            // `v4:port` or `host:port`. The port is checked before any
            // lookup so a bad port never costs a DNS round trip.
            Some((host_part, port_part)) => {
                let port = parse_port(input, port_part)?;
                if IPV4_WITH_PORT.is_match(trimmed) {
                    if let Ok(v4) = host_part.parse::<Ipv4Addr>() {
                        return Ok(ResolvedEndpoint::new(v4.into(), port));
                    }
                    // The shape said dotted quad but an octet is out of
                    // range (e.g. 300.1.1.1). Let the resolver have the
                    // final word instead of inventing an address.
                    debug!(
                        host = host_part,
                        "dotted-quad shape failed address validation, trying as hostname"
                    );
                }
                let addr = self.lookup_first(input, host_part)?;
                Ok(ResolvedEndpoint::new(addr, port))
            }
            // Bare v4 literal or hostname.
            None => {
                let port = default_port.ok_or_else(|| Error::PortRequired {
                    input: input.to_string(),
                })?;
                if let Ok(v4) = trimmed.parse::<Ipv4Addr>() {
                    return Ok(ResolvedEndpoint::new(v4.into(), port));
                }
                let addr = self.lookup_first(input, trimmed)?;
                Ok(ResolvedEndpoint::new(addr, port))
            }
        }
    }

    fn lookup_first(&self, input: &str, host: &str) -> Result<IpAddr> {
        let not_found = || Error::HostNotFound {
            input: input.to_string(),
            host: host.to_string(),
        };
        let candidates = self.dns.lookup(host).map_err(|_| not_found())?;
        // First answer wins, in the order the collaborator returned them.
        candidates.first().copied().ok_or_else(not_found)
    }
}

fn parse_port(input: &str, token: &str) -> Result<u16> {
    let invalid = || Error::InvalidPort {
        input: input.to_string(),
        port: token.to_string(),
    };
    // 1 to 5 plain decimal digits; no sign, no whitespace, no wider text.
    if token.is_empty() || token.len() > 5 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    token.parse::<u16>().map_err(|_| invalid())
}
