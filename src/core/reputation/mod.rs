// src/core/reputation/mod.rs

pub mod aggregator;
pub mod sources;

use futures::future::join_all;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::core::cache::{CacheKey, CachedValue, OperationKind};
use crate::core::context::ReconContext;
use crate::core::models::{AggregatedVerdict, SourceOutcome};
use crate::core::target::{is_private_or_reserved, parse_ipv4};
use crate::error::ReconError;
use self::aggregator::{aggregate, private_verdict};
use self::sources::ReputationSource;

/// Queries every source concurrently, each bounded by `timeout`.
pub async fn query_sources(
    sources: &[Arc<dyn ReputationSource>],
    ip: IpAddr,
    timeout: Duration,
) -> Vec<(String, SourceOutcome)> {
    let queries = sources.iter().map(|source| async move {
        let outcome = match tokio::time::timeout(timeout, source.query(ip)).await {
            Ok(outcome) => outcome,
            Err(_) => SourceOutcome::unavailable("timed out"),
        };
        if let SourceOutcome::Unavailable { reason } = &outcome {
            debug!(source = source.name(), reason = %reason, "Source unavailable.");
        }
        (source.name().to_string(), outcome)
    });
    join_all(queries).await
}

/// Reputation of a validated address. Private and reserved addresses return immediately
/// without touching any provider. Verdicts backed by real data are cached.
pub async fn assess_ip(ctx: &Arc<ReconContext>, ip: IpAddr) -> AggregatedVerdict {
    if is_private_or_reserved(&ip) {
        info!(%ip, "Private address, skipping provider lookups.");
        return private_verdict(ip);
    }

    let key = CacheKey::new(OperationKind::Reputation, ip.to_string());
    if let Some(CachedValue::Reputation(verdict)) = ctx.cache.get(&key).await {
        debug!(%ip, "Serving reputation from cache.");
        return *verdict;
    }

    info!(%ip, sources = ctx.sources.len(), "Starting reputation check.");
    let outcomes = query_sources(&ctx.sources, ip, ctx.settings.reputation.provider_timeout()).await;
    let verdict = aggregate(ip, &outcomes);

    if !verdict.insufficient_data {
        ctx.cache
            .put(
                key,
                CachedValue::Reputation(Box::new(verdict.clone())),
                ctx.settings.reputation.cache_ttl(),
            )
            .await;
    }

    info!(
        %ip,
        score = verdict.confidence_score,
        level = %verdict.threat_level,
        insufficient_data = verdict.insufficient_data,
        "Reputation check finished."
    );
    verdict
}

/// Entry point for callers that supply a dotted IPv4 string.
pub async fn check_reputation(
    ctx: &Arc<ReconContext>,
    input: Option<&str>,
) -> Result<AggregatedVerdict, ReconError> {
    let ip: Ipv4Addr = parse_ipv4(input.unwrap_or_default())?;
    Ok(assess_ip(ctx, IpAddr::V4(ip)).await)
}
