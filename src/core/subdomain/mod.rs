// src/core/subdomain/mod.rs

pub mod candidates;
pub mod resolver;

use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::core::context::ReconContext;
use crate::core::models::SubdomainReport;
use crate::core::target::Target;
use crate::error::ReconError;
use self::candidates::generate_candidates;
use self::resolver::{resolve_candidates, resolved_entries};

/// Whether the domain itself is visible in DNS: an address, or any record at all.
async fn has_dns_presence(ctx: &ReconContext, domain: &str) -> bool {
    if ctx.dns.lookup_ip(domain).await.is_ok() {
        return true;
    }
    !ctx.dns.records(domain).await.is_empty()
}

/// Discovers resolving subdomains of `domain`.
pub async fn discover_subdomains(
    ctx: &Arc<ReconContext>,
    domain: Option<&str>,
) -> Result<SubdomainReport, ReconError> {
    let raw = domain
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ReconError::validation("Domain is required"))?;
    let domain = match Target::parse(raw)? {
        Target::Domain(name) => name,
        Target::Ip(_) => return Err(ReconError::validation("A domain name is required, not an IP address")),
    };

    if !has_dns_presence(ctx, &domain).await {
        return Err(ReconError::validation("Domain does not have valid DNS records"));
    }

    info!(target = %domain, "Starting subdomain discovery.");
    let labels = generate_candidates(
        &domain,
        &ctx.passive_sources,
        ctx.settings.subdomains.passive_timeout(),
    )
    .await;

    let report = resolve_candidates(ctx, &domain, labels).await?;
    let subdomains = resolved_entries(&report);

    info!(
        target = %domain,
        found = subdomains.len(),
        checked = report.descriptors.len(),
        truncated = report.is_truncated(),
        "Subdomain discovery finished."
    );

    Ok(SubdomainReport {
        domain,
        total_found: subdomains.len(),
        total_checked: report.descriptors.len(),
        truncated: report.is_truncated(),
        requested_candidates: report.requested(),
        subdomains,
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::core::dns::{DnsLookup, LookupError};
    use crate::core::models::DnsRecordSet;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::net::IpAddr;
    use std::sync::Mutex;

    /// Zone data keyed by name. Every lookup is recorded.
    #[derive(Default)]
    pub(crate) struct ZoneDns {
        pub addresses: HashMap<String, IpAddr>,
        pub failing: Vec<String>,
        pub lookups: Mutex<Vec<String>>,
    }

    impl ZoneDns {
        pub(crate) fn with(names: &[(&str, &str)]) -> Self {
            Self {
                addresses: names
                    .iter()
                    .map(|(n, ip)| (n.to_string(), ip.parse().unwrap()))
                    .collect(),
                ..Default::default()
            }
        }

        fn lookups_of(&self, name: &str) -> usize {
            self.lookups.lock().unwrap().iter().filter(|n| *n == name).count()
        }
    }

    #[async_trait]
    impl DnsLookup for ZoneDns {
        async fn lookup_ip(&self, name: &str) -> Result<Vec<IpAddr>, LookupError> {
            self.lookups.lock().unwrap().push(name.to_string());
            if self.failing.iter().any(|n| n == name) {
                return Err(LookupError::Failed("SERVFAIL".into()));
            }
            self.addresses.get(name).map(|ip| vec![*ip]).ok_or(LookupError::NotFound)
        }

        async fn records(&self, name: &str) -> DnsRecordSet {
            match self.addresses.get(name) {
                Some(ip) => DnsRecordSet {
                    a: vec![ip.to_string()],
                    ..Default::default()
                },
                None => DnsRecordSet::default(),
            }
        }
    }

    fn context(dns: Arc<ZoneDns>) -> Arc<ReconContext> {
        Arc::new(
            ReconContext::builder(Settings::default())
                .dns(dns)
                .passive_sources(Vec::new())
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn only_www_resolves() {
        let dns = Arc::new(ZoneDns::with(&[
            ("example.com", "93.184.216.34"),
            ("www.example.com", "93.184.216.34"),
        ]));
        let ctx = context(dns);

        let report = discover_subdomains(&ctx, Some("example.com")).await.unwrap();
        assert_eq!(report.subdomains.len(), 1);
        assert_eq!(report.subdomains[0].subdomain, "www");
        assert_eq!(report.subdomains[0].records.a, vec!["93.184.216.34"]);
        assert_eq!(report.total_found, 1);
        assert_eq!(report.total_checked, crate::core::knowledge_base::COMMON_SUBDOMAINS.len());
        assert!(!report.truncated);
    }

    #[tokio::test]
    async fn failed_lookups_are_not_reported_and_not_cached() {
        let mut zone = ZoneDns::with(&[("example.com", "192.0.2.1"), ("api.example.com", "192.0.2.2")]);
        zone.failing.push("mail.example.com".to_string());
        let dns = Arc::new(zone);
        let ctx = context(Arc::clone(&dns));

        let first = discover_subdomains(&ctx, Some("example.com")).await.unwrap();
        let labels: Vec<_> = first.subdomains.iter().map(|s| s.subdomain.as_str()).collect();
        assert_eq!(labels, vec!["api"]);

        discover_subdomains(&ctx, Some("example.com")).await.unwrap();
        // Negative answers come from the cache the second time, failures are retried.
        assert_eq!(dns.lookups_of("www.example.com"), 1);
        assert_eq!(dns.lookups_of("mail.example.com"), 2);
    }

    #[tokio::test]
    async fn domain_without_dns_presence_is_rejected() {
        let ctx = context(Arc::new(ZoneDns::default()));
        let err = discover_subdomains(&ctx, Some("nothing-here.example")).await.unwrap_err();
        assert_eq!(err.to_string(), "Domain does not have valid DNS records");

        let err = discover_subdomains(&ctx, None).await.unwrap_err();
        assert_eq!(err.to_string(), "Domain is required");
    }

    #[tokio::test]
    async fn results_are_sorted_by_label() {
        let dns = Arc::new(ZoneDns::with(&[
            ("example.com", "192.0.2.1"),
            ("www.example.com", "192.0.2.10"),
            ("api.example.com", "192.0.2.11"),
            ("mail.example.com", "192.0.2.12"),
        ]));
        let report = discover_subdomains(&context(dns), Some("Example.COM")).await.unwrap();
        let labels: Vec<_> = report.subdomains.iter().map(|s| s.subdomain.as_str()).collect();
        assert_eq!(labels, vec!["api", "mail", "www"]);
        assert_eq!(report.domain, "example.com");
    }
}
