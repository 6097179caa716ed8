// src/core/subdomain/resolver.rs

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use crate::core::cache::{CacheKey, CachedValue, LookupCache, OperationKind};
use crate::core::context::ReconContext;
use crate::core::dns::{DnsLookup, LookupError, preferred_address};
use crate::core::models::{ProbeStatus, ScanResult, SubdomainEntry};
use crate::core::scheduler::{ProbeOutcome, ProbeScheduler, ScheduleReport};
use crate::error::ReconError;

#[derive(Debug, Clone)]
pub struct SubdomainProbe {
    pub label: String,
    pub fqdn: String,
}

/// Resolves `fqdn` to its preferred address through the cache.
///
/// `Ok(None)` is a definitive "does not exist" and is cached like a positive answer.
/// Lookup failures are returned as errors and never cached.
pub async fn resolve_cached(
    cache: &LookupCache,
    dns: &dyn DnsLookup,
    fqdn: &str,
    ttl: Duration,
) -> ScanResult<IpAddr> {
    let key = CacheKey::new(OperationKind::SubdomainResolution, fqdn);
    let value = cache
        .get_or_try_compute(key, ttl, || async {
            match dns.lookup_ip(fqdn).await {
                Ok(addresses) => Ok(CachedValue::Resolution(preferred_address(&addresses))),
                Err(LookupError::NotFound) => Ok(CachedValue::Resolution(None)),
                Err(LookupError::Failed(reason)) => Err(reason),
            }
        })
        .await?;
    match value {
        CachedValue::Resolution(ip) => Ok(ip),
        CachedValue::Reputation(_) => Err("unexpected cache entry kind".to_string()),
    }
}

/// Probes one candidate: resolve, and for a resolving name collect its record sets.
pub async fn probe_candidate(ctx: &ReconContext, probe: &SubdomainProbe) -> ScanResult<SubdomainEntry> {
    let ttl = ctx.settings.subdomains.cache_ttl();
    let Some(ip) = resolve_cached(&ctx.cache, ctx.dns.as_ref(), &probe.fqdn, ttl).await? else {
        return Ok(None);
    };
    let records = ctx.dns.records(&probe.fqdn).await;
    debug!(subdomain = %probe.fqdn, %ip, "Subdomain resolved.");
    Ok(Some(SubdomainEntry {
        subdomain: probe.label.clone(),
        exists: true,
        ip,
        records,
    }))
}

/// Runs every candidate label through the scheduler.
pub async fn resolve_candidates(
    ctx: &Arc<ReconContext>,
    domain: &str,
    labels: Vec<String>,
) -> Result<ScheduleReport<SubdomainProbe, Option<SubdomainEntry>>, ReconError> {
    let settings = &ctx.settings.subdomains;
    let scheduler = ProbeScheduler::new(settings.workers, settings.max_candidates)?;
    let descriptors: Vec<SubdomainProbe> = labels
        .into_iter()
        .map(|label| SubdomainProbe {
            fqdn: format!("{}.{}", label, domain),
            label,
        })
        .collect();

    let shared = Arc::clone(ctx);
    let report = scheduler
        .run(descriptors, move |probe: SubdomainProbe| {
            let ctx = Arc::clone(&shared);
            async move { probe_candidate(&ctx, &probe).await }
        })
        .await;
    Ok(report)
}

/// Only names whose address lookup succeeded, sorted by label.
pub fn resolved_entries(report: &ScheduleReport<SubdomainProbe, Option<SubdomainEntry>>) -> Vec<SubdomainEntry> {
    let mut entries: Vec<SubdomainEntry> = Vec::new();
    for (probe, outcome) in report.pairs() {
        let status = match outcome {
            ProbeOutcome::Completed(Some(entry)) => {
                entries.push(entry.clone());
                ProbeStatus::Found
            }
            ProbeOutcome::Completed(None) => ProbeStatus::NotFound,
            ProbeOutcome::Failed { reason } => {
                debug!(subdomain = %probe.fqdn, reason = %reason, "Subdomain lookup failed.");
                ProbeStatus::Error
            }
        };
        trace!(subdomain = %probe.fqdn, status = %status, "Subdomain probe finished.");
    }
    entries.sort_by(|a, b| a.subdomain.cmp(&b.subdomain));
    entries
}
