use std::io;
use std::net::{IpAddr, ToSocketAddrs};

/// Capability the endpoint resolver goes through when the host part of an
/// address is a name rather than a literal. One operation, one shot: no
/// caching, no retries. Tests swap in a fixed table.
pub trait DnsLookup {
    fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>>;
}

/// Resolves names through the operating system resolver.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDns;

impl DnsLookup for SystemDns {
    fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        let addrs = (host, 0).to_socket_addrs()?;
        Ok(addrs.map(|sa| sa.ip()).collect())
    }
}
