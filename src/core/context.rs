// src/core/context.rs

use std::sync::Arc;
use tracing::info;

use crate::config::Settings;
use crate::core::cache::LookupCache;
use crate::core::dns::{DnsLookup, HickoryDns};
use crate::core::reputation::sources::{
    AbuseIpDb, Dnsbl, IpApi, IpQualityScore, ReputationSource, VirusTotal,
};
use crate::core::scanner::port_scanner::{PortConnector, TcpConnector};
use crate::core::subdomain::candidates::{CrtShSource, PassiveSource, VirusTotalSubdomains};
use crate::error::ReconError;

/// Shared state for every operation: settings, the lookup cache, and the network
/// collaborators. Built once per process and passed around behind an `Arc`.
pub struct ReconContext {
    pub settings: Settings,
    pub cache: Arc<LookupCache>,
    pub http: reqwest::Client,
    pub dns: Arc<dyn DnsLookup>,
    pub connector: Arc<dyn PortConnector>,
    pub sources: Vec<Arc<dyn ReputationSource>>,
    pub passive_sources: Vec<Arc<dyn PassiveSource>>,
}

impl ReconContext {
    /// Context wired to the real network.
    pub fn from_settings(settings: Settings) -> Result<Self, ReconError> {
        Self::builder(settings).build()
    }

    pub fn builder(settings: Settings) -> ReconContextBuilder {
        ReconContextBuilder {
            settings,
            cache: None,
            dns: None,
            connector: None,
            sources: None,
            passive_sources: None,
        }
    }
}

/// Builds a [`ReconContext`]. Anything not supplied is created from the settings.
pub struct ReconContextBuilder {
    settings: Settings,
    cache: Option<Arc<LookupCache>>,
    dns: Option<Arc<dyn DnsLookup>>,
    connector: Option<Arc<dyn PortConnector>>,
    sources: Option<Vec<Arc<dyn ReputationSource>>>,
    passive_sources: Option<Vec<Arc<dyn PassiveSource>>>,
}

impl ReconContextBuilder {
    pub fn cache(mut self, cache: Arc<LookupCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn dns(mut self, dns: Arc<dyn DnsLookup>) -> Self {
        self.dns = Some(dns);
        self
    }

    pub fn connector(mut self, connector: Arc<dyn PortConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn sources(mut self, sources: Vec<Arc<dyn ReputationSource>>) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn passive_sources(mut self, sources: Vec<Arc<dyn PassiveSource>>) -> Self {
        self.passive_sources = Some(sources);
        self
    }

    pub fn build(self) -> Result<ReconContext, ReconError> {
        let settings = self.settings;
        let http = reqwest::Client::builder()
            .user_agent(concat!("vanguard-recon/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ReconError::Internal(format!("failed to build HTTP client: {}", e)))?;

        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(LookupCache::new(settings.cache.max_entries)));
        let dns: Arc<dyn DnsLookup> = match self.dns {
            Some(dns) => dns,
            None => Arc::new(HickoryDns::new(settings.subdomains.dns_timeout())),
        };
        let connector: Arc<dyn PortConnector> = match self.connector {
            Some(connector) => connector,
            None => Arc::new(TcpConnector::new()?),
        };
        let sources = self
            .sources
            .unwrap_or_else(|| default_sources(&settings, &http, &dns));
        let passive_sources = self
            .passive_sources
            .unwrap_or_else(|| default_passive_sources(&settings, &http));

        info!(
            sources = sources.len(),
            passive_sources = passive_sources.len(),
            "Recon context ready."
        );

        Ok(ReconContext {
            settings,
            cache,
            http,
            dns,
            connector,
            sources,
            passive_sources,
        })
    }
}

fn default_sources(
    settings: &Settings,
    http: &reqwest::Client,
    dns: &Arc<dyn DnsLookup>,
) -> Vec<Arc<dyn ReputationSource>> {
    let rep = &settings.reputation;
    let timeout = rep.provider_timeout();
    vec![
        Arc::new(VirusTotal::new(http.clone(), &rep.virustotal_url, rep.virustotal_api_key.clone(), timeout)),
        Arc::new(AbuseIpDb::new(http.clone(), &rep.abuseipdb_url, rep.abuseipdb_api_key.clone(), timeout)),
        Arc::new(IpQualityScore::new(
            http.clone(),
            &rep.ipqualityscore_url,
            rep.ipqualityscore_api_key.clone(),
            timeout,
        )),
        Arc::new(IpApi::new(http.clone(), &rep.ipapi_url, timeout)),
        Arc::new(Dnsbl::new(Arc::clone(dns), rep.dnsbl_zones.clone(), rep.dnsbl_weight)),
    ]
}

fn default_passive_sources(settings: &Settings, http: &reqwest::Client) -> Vec<Arc<dyn PassiveSource>> {
    let sub = &settings.subdomains;
    let mut sources: Vec<Arc<dyn PassiveSource>> = vec![Arc::new(CrtShSource::new(
        http.clone(),
        &sub.crtsh_url,
        sub.passive_timeout(),
    ))];
    if let Some(key) = &settings.reputation.virustotal_api_key {
        sources.push(Arc::new(VirusTotalSubdomains::new(
            http.clone(),
            &settings.reputation.virustotal_url,
            key.clone(),
            sub.passive_timeout(),
        )));
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_wiring_follows_configured_keys() {
        let mut settings = Settings::default();
        let ctx = ReconContext::from_settings(settings.clone()).unwrap();
        assert_eq!(ctx.sources.len(), 5);
        assert_eq!(ctx.passive_sources.len(), 1);

        settings.reputation.virustotal_api_key = Some("vt".to_string());
        let ctx = ReconContext::from_settings(settings).unwrap();
        let names: Vec<_> = ctx.passive_sources.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["crt.sh", "virustotal"]);
    }
}
