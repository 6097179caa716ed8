// src/core/dns.rs

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::rr::{RData, RecordType};
use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::models::{DnsRecordSet, MxRecord};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The name exists nowhere (NXDOMAIN or no address records). A definitive answer.
    #[error("no records found")]
    NotFound,
    /// Timeout, SERVFAIL, network error. Says nothing about the name.
    #[error("lookup failed: {0}")]
    Failed(String),
}

/// Name resolution used by the subdomain resolver, the DNS blocklist source and the
/// port scanner's host lookup.
#[async_trait]
pub trait DnsLookup: Send + Sync {
    async fn lookup_ip(&self, name: &str) -> Result<Vec<IpAddr>, LookupError>;

    /// Fetches A/AAAA/CNAME/MX/TXT. Each type is independent; a failed type is just empty.
    async fn records(&self, name: &str) -> DnsRecordSet;
}

/// Picks the address reported for a name: the first IPv4 one, else the first of any kind.
pub fn preferred_address(addresses: &[IpAddr]) -> Option<IpAddr> {
    addresses
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addresses.first())
        .copied()
}

/// Hickory resolver using its default upstream set (`ResolverConfig::default()`), not the
/// host's resolv.conf.
pub struct HickoryDns {
    resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl HickoryDns {
    pub fn new(timeout: Duration) -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 1;
        let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), opts);
        Self { resolver, timeout }
    }

    async fn bounded<T, F>(&self, name: &str, fut: F) -> Result<T, LookupError>
    where
        F: Future<Output = Result<T, ResolveError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(found)) => Ok(found),
            Ok(Err(e)) => Err(classify(name, &e)),
            Err(_) => {
                debug!(name, "DNS lookup timed out.");
                Err(LookupError::Failed("timed out".to_string()))
            }
        }
    }
}

fn classify(name: &str, error: &ResolveError) -> LookupError {
    match error.kind() {
        ResolveErrorKind::NoRecordsFound { .. } => LookupError::NotFound,
        _ => {
            warn!(name, error = %error, "DNS lookup failed.");
            LookupError::Failed(error.to_string())
        }
    }
}

fn trim_name(name: impl ToString) -> String {
    name.to_string().trim_end_matches('.').to_string()
}

#[async_trait]
impl DnsLookup for HickoryDns {
    async fn lookup_ip(&self, name: &str) -> Result<Vec<IpAddr>, LookupError> {
        let lookup = self.bounded(name, self.resolver.lookup_ip(name)).await?;
        let addresses: Vec<IpAddr> = lookup.iter().collect();
        if addresses.is_empty() {
            return Err(LookupError::NotFound);
        }
        debug!(name, count = addresses.len(), "Resolved name.");
        Ok(addresses)
    }

    async fn records(&self, name: &str) -> DnsRecordSet {
        let (a, aaaa, cname, mx, txt) = tokio::join!(
            self.bounded(name, self.resolver.ipv4_lookup(name)),
            self.bounded(name, self.resolver.ipv6_lookup(name)),
            self.bounded(name, self.resolver.lookup(name, RecordType::CNAME)),
            self.bounded(name, self.resolver.mx_lookup(name)),
            self.bounded(name, self.resolver.txt_lookup(name)),
        );

        let mut records = DnsRecordSet::default();
        if let Ok(found) = a {
            records.a = found.iter().map(|r| r.to_string()).collect();
        }
        if let Ok(found) = aaaa {
            records.aaaa = found.iter().map(|r| r.to_string()).collect();
        }
        if let Ok(found) = cname {
            records.cname = found
                .iter()
                .filter_map(|rdata| match rdata {
                    RData::CNAME(target) => Some(trim_name(target)),
                    _ => None,
                })
                .collect();
        }
        if let Ok(found) = mx {
            records.mx = found
                .iter()
                .map(|r| MxRecord {
                    exchange: trim_name(r.exchange()),
                    priority: r.preference(),
                })
                .collect();
        }
        if let Ok(found) = txt {
            records.txt = found.iter().map(|r| r.to_string()).collect();
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_ipv4_addresses() {
        let v6: IpAddr = "2001:db8::1".parse().unwrap();
        let v4: IpAddr = "192.0.2.7".parse().unwrap();
        assert_eq!(preferred_address(&[v6, v4]), Some(v4));
        assert_eq!(preferred_address(&[v6]), Some(v6));
        assert_eq!(preferred_address(&[]), None);
    }

    #[test]
    fn trailing_dot_is_removed_from_names() {
        assert_eq!(trim_name("mail.example.com."), "mail.example.com");
        assert_eq!(trim_name("mail.example.com"), "mail.example.com");
    }
}
