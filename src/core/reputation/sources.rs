// src/core/reputation/sources.rs

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::{BTreeSet, HashMap};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::dns::{DnsLookup, LookupError};
use crate::core::models::{SourceFamily, SourceOutcome, SourceVerdict};

pub const VIRUSTOTAL: &str = "virustotal";
pub const ABUSEIPDB: &str = "abuseipdb";
pub const IPQUALITYSCORE: &str = "ipqualityscore";
pub const IPAPI: &str = "ipapi";
pub const DNSBL: &str = "dnsbl";

/// One external intelligence provider.
///
/// Implementations never return an error: missing credentials, transport failures,
/// non-200 answers and unparsable bodies are all `SourceOutcome::Unavailable`.
#[async_trait]
pub trait ReputationSource: Send + Sync {
    fn name(&self) -> &'static str;
    fn family(&self) -> SourceFamily;
    async fn query(&self, ip: IpAddr) -> SourceOutcome;
}

fn tags<const N: usize>(candidates: [(&str, bool); N]) -> BTreeSet<String> {
    candidates
        .into_iter()
        .filter(|(_, on)| *on)
        .map(|(tag, _)| tag.to_string())
        .collect()
}

/// Sends `request` and decodes a 200 JSON body.
async fn fetch_json<T: DeserializeOwned>(
    source: &str,
    request: reqwest::RequestBuilder,
) -> Result<T, String> {
    let response = request.send().await.map_err(|e| {
        warn!(source, error = %e, "Provider request failed.");
        format!("request failed: {}", e)
    })?;
    let status = response.status();
    if status != reqwest::StatusCode::OK {
        debug!(source, %status, "Provider returned non-200 status.");
        return Err(format!("unexpected status {}", status));
    }
    response.json::<T>().await.map_err(|e| {
        warn!(source, error = %e, "Provider response could not be parsed.");
        format!("invalid response: {}", e)
    })
}

// --- VirusTotal ---

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VtEnvelope {
    data: VtData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VtData {
    attributes: VtAttributes,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VtAttributes {
    last_analysis_results: HashMap<String, VtEngineResult>,
    last_analysis_date: Option<i64>,
    last_modification_date: Option<i64>,
    as_owner: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VtEngineResult {
    category: String,
}

pub struct VirusTotal {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl VirusTotal {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
        }
    }
}

#[async_trait]
impl ReputationSource for VirusTotal {
    fn name(&self) -> &'static str {
        VIRUSTOTAL
    }

    fn family(&self) -> SourceFamily {
        SourceFamily::ThreatIntelligence
    }

    async fn query(&self, ip: IpAddr) -> SourceOutcome {
        let Some(key) = &self.api_key else {
            return SourceOutcome::unavailable("no API key configured");
        };
        let request = self
            .http
            .get(format!("{}/api/v3/ip_addresses/{}", self.base_url, ip))
            .header("x-apikey", key)
            .header(ACCEPT, "application/json")
            .timeout(self.timeout);
        let body: VtEnvelope = match fetch_json(VIRUSTOTAL, request).await {
            Ok(body) => body,
            Err(reason) => return SourceOutcome::unavailable(reason),
        };

        let attributes = body.data.attributes;
        let total = attributes.last_analysis_results.len();
        let malicious = attributes
            .last_analysis_results
            .values()
            .filter(|r| r.category == "malicious" || r.category == "suspicious")
            .count();

        SourceOutcome::Available(SourceVerdict {
            source: VIRUSTOTAL.to_string(),
            family: self.family(),
            score: if malicious > 0 { 100 } else { 0 },
            weight: 70,
            tags: tags([("malicious", malicious > 0)]),
            details: json!({
                "found": malicious > 0,
                "malicious": malicious,
                "total": total,
                "last_analysis_date": attributes.last_analysis_date,
                "last_modification_date": attributes.last_modification_date,
                "as_owner": attributes.as_owner,
                "country": attributes.country,
            }),
        })
    }
}

// --- AbuseIPDB ---

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AbuseEnvelope {
    data: AbuseData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AbuseData {
    abuse_confidence_score: u32,
    total_reports: u64,
    last_reported_at: Option<String>,
    isp: Option<String>,
    domain: Option<String>,
    country_code: Option<String>,
    usage_type: Option<String>,
}

pub struct AbuseIpDb {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl AbuseIpDb {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
        }
    }
}

#[async_trait]
impl ReputationSource for AbuseIpDb {
    fn name(&self) -> &'static str {
        ABUSEIPDB
    }

    fn family(&self) -> SourceFamily {
        SourceFamily::ThreatIntelligence
    }

    async fn query(&self, ip: IpAddr) -> SourceOutcome {
        let Some(key) = &self.api_key else {
            return SourceOutcome::unavailable("no API key configured");
        };
        let request = self
            .http
            .get(format!("{}/api/v2/check", self.base_url))
            .query(&[("ipAddress", ip.to_string()), ("maxAgeInDays", "90".to_string())])
            .header("Key", key)
            .header(ACCEPT, "application/json")
            .timeout(self.timeout);
        let data = match fetch_json::<AbuseEnvelope>(ABUSEIPDB, request).await {
            Ok(body) => body.data,
            Err(reason) => return SourceOutcome::unavailable(reason),
        };

        let score = data.abuse_confidence_score.min(100) as u8;
        SourceOutcome::Available(SourceVerdict {
            source: ABUSEIPDB.to_string(),
            family: self.family(),
            score,
            weight: 80,
            tags: tags([("malicious", score > 70)]),
            details: json!({
                "found": score > 0,
                "abuseConfidenceScore": score,
                "totalReports": data.total_reports,
                "lastReportedAt": data.last_reported_at,
                "isp": data.isp,
                "domain": data.domain,
                "countryCode": data.country_code,
                "usageType": data.usage_type,
            }),
        })
    }
}

// --- IPQualityScore ---

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IpqsResponse {
    success: Option<bool>,
    message: Option<String>,
    fraud_score: u32,
    vpn: bool,
    proxy: bool,
    tor: bool,
    active_vpn: bool,
    active_tor: bool,
    recent_abuse: bool,
    bot_status: bool,
    is_crawler: bool,
    connection_type: Option<String>,
    #[serde(rename = "ISP")]
    isp: Option<String>,
    organization: Option<String>,
    country_code: Option<String>,
    region: Option<String>,
    city: Option<String>,
}

/// Anonymization detector. Contributes tags only, unless the fraud score is high.
pub struct IpQualityScore {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl IpQualityScore {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
        }
    }
}

/// Fraud scores above 50 add a weighted contribution scaled onto 0..=100.
fn fraud_contribution(fraud_score: u32) -> (u8, u32) {
    if fraud_score > 50 {
        (((fraud_score.min(100) - 50) * 2) as u8, 25)
    } else {
        (0, 0)
    }
}

#[async_trait]
impl ReputationSource for IpQualityScore {
    fn name(&self) -> &'static str {
        IPQUALITYSCORE
    }

    fn family(&self) -> SourceFamily {
        SourceFamily::Anonymization
    }

    async fn query(&self, ip: IpAddr) -> SourceOutcome {
        let Some(key) = &self.api_key else {
            return SourceOutcome::unavailable("no API key configured");
        };
        let request = self
            .http
            .get(format!("{}/api/json/ip/{}/{}", self.base_url, key, ip))
            .query(&[
                ("strictness", "1"),
                ("allow_public_access_points", "true"),
                ("fast", "true"),
            ])
            .timeout(self.timeout);
        let body: IpqsResponse = match fetch_json(IPQUALITYSCORE, request).await {
            Ok(body) => body,
            Err(reason) => return SourceOutcome::unavailable(reason),
        };
        if body.success == Some(false) {
            let reason = body.message.unwrap_or_else(|| "request rejected".to_string());
            return SourceOutcome::unavailable(reason);
        }

        let (score, weight) = fraud_contribution(body.fraud_score);
        SourceOutcome::Available(SourceVerdict {
            source: IPQUALITYSCORE.to_string(),
            family: self.family(),
            score,
            weight,
            tags: tags([("vpn", body.vpn), ("proxy", body.proxy), ("tor", body.tor)]),
            details: json!({
                "fraud_score": body.fraud_score,
                "vpn": body.vpn,
                "proxy": body.proxy,
                "tor": body.tor,
                "active_vpn": body.active_vpn,
                "active_tor": body.active_tor,
                "recent_abuse": body.recent_abuse,
                "bot_status": body.bot_status,
                "is_crawler": body.is_crawler,
                "connection_type": body.connection_type,
                "isp": body.isp,
                "organization": body.organization,
                "country_code": body.country_code,
                "region": body.region,
                "city": body.city,
            }),
        })
    }
}

// --- ip-api.com ---

const IPAPI_FIELDS: &str = "status,message,country,countryCode,region,regionName,city,zip,lat,lon,timezone,isp,org,as,asname,reverse,mobile,proxy,hosting,query";

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
    region_name: Option<String>,
    city: Option<String>,
    isp: Option<String>,
    org: Option<String>,
    #[serde(rename = "as")]
    as_number: Option<String>,
    asname: Option<String>,
    mobile: bool,
    proxy: bool,
    hosting: bool,
    reverse: Option<String>,
}

/// Geolocation and network metadata. No credentials, no score.
pub struct IpApi {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl IpApi {
    pub fn new(http: reqwest::Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl ReputationSource for IpApi {
    fn name(&self) -> &'static str {
        IPAPI
    }

    fn family(&self) -> SourceFamily {
        SourceFamily::PassiveMetadata
    }

    async fn query(&self, ip: IpAddr) -> SourceOutcome {
        let request = self
            .http
            .get(format!("{}/json/{}", self.base_url, ip))
            .query(&[("fields", IPAPI_FIELDS)])
            .timeout(self.timeout);
        let body: IpApiResponse = match fetch_json(IPAPI, request).await {
            Ok(body) => body,
            Err(reason) => return SourceOutcome::unavailable(reason),
        };
        if body.status != "success" {
            let reason = body.message.unwrap_or_else(|| format!("status {}", body.status));
            return SourceOutcome::unavailable(reason);
        }

        SourceOutcome::Available(SourceVerdict {
            source: IPAPI.to_string(),
            family: self.family(),
            score: 0,
            weight: 0,
            tags: tags([("hosting", body.hosting), ("mobile", body.mobile)]),
            details: json!({
                "country": body.country,
                "countryCode": body.country_code,
                "region": body.region_name,
                "city": body.city,
                "isp": body.isp,
                "org": body.org,
                "as": body.as_number,
                "asname": body.asname,
                "mobile": body.mobile,
                "proxy": body.proxy,
                "hosting": body.hosting,
                "reverse": body.reverse,
            }),
        })
    }
}

// --- DNS blocklists ---

/// Blocklist probe: an A record under `<reversed-octets>.<zone>` means listed.
pub struct Dnsbl {
    dns: Arc<dyn DnsLookup>,
    zones: Vec<String>,
    weight: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ZoneAnswer {
    Listed,
    NotListed,
    Failed(String),
}

impl Dnsbl {
    pub fn new(dns: Arc<dyn DnsLookup>, zones: Vec<String>, weight: u32) -> Self {
        Self { dns, zones, weight }
    }

    async fn check_zone(&self, reversed: &str, zone: &str) -> ZoneAnswer {
        let name = format!("{}.{}", reversed, zone);
        match self.dns.lookup_ip(&name).await {
            // 127.255.255.x is the operator refusing the query, not a listing.
            Ok(answers) if answers.iter().any(is_refusal_code) => {
                ZoneAnswer::Failed("query refused by blocklist operator".to_string())
            }
            Ok(_) => ZoneAnswer::Listed,
            Err(LookupError::NotFound) => ZoneAnswer::NotListed,
            Err(LookupError::Failed(reason)) => ZoneAnswer::Failed(reason),
        }
    }
}

fn is_refusal_code(ip: &IpAddr) -> bool {
    matches!(ip, IpAddr::V4(v4) if v4.octets()[..3] == [127, 255, 255])
}

#[async_trait]
impl ReputationSource for Dnsbl {
    fn name(&self) -> &'static str {
        DNSBL
    }

    fn family(&self) -> SourceFamily {
        SourceFamily::ThreatIntelligence
    }

    async fn query(&self, ip: IpAddr) -> SourceOutcome {
        let IpAddr::V4(v4) = ip else {
            return SourceOutcome::unavailable("only IPv4 addresses are supported");
        };
        if self.zones.is_empty() {
            return SourceOutcome::unavailable("no blocklist zones configured");
        }
        let [a, b, c, d] = v4.octets();
        let reversed = format!("{}.{}.{}.{}", d, c, b, a);

        let answers = join_all(self.zones.iter().map(|zone| self.check_zone(&reversed, zone))).await;

        let mut listed = Vec::new();
        let mut checked = Vec::new();
        let mut failed = Vec::new();
        for (zone, answer) in self.zones.iter().zip(answers) {
            match answer {
                ZoneAnswer::Listed => {
                    listed.push(zone.clone());
                    checked.push(zone.clone());
                }
                ZoneAnswer::NotListed => checked.push(zone.clone()),
                ZoneAnswer::Failed(reason) => {
                    debug!(zone = %zone, reason = %reason, "Blocklist zone unavailable.");
                    failed.push(zone.clone());
                }
            }
        }
        if checked.is_empty() {
            return SourceOutcome::unavailable("all blocklist zones failed");
        }

        SourceOutcome::Available(SourceVerdict {
            source: DNSBL.to_string(),
            family: self.family(),
            score: if listed.is_empty() { 0 } else { 100 },
            weight: self.weight,
            tags: tags([("blacklisted", !listed.is_empty())]),
            details: json!({
                "found": !listed.is_empty(),
                "listed_on": listed,
                "checked": checked,
                "failed": failed,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::DnsRecordSet;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TIMEOUT: Duration = Duration::from_secs(2);
    const IP: &str = "198.51.100.23";

    fn ip() -> IpAddr {
        IP.parse().unwrap()
    }

    fn verdict(outcome: SourceOutcome) -> SourceVerdict {
        match outcome {
            SourceOutcome::Available(v) => v,
            SourceOutcome::Unavailable { reason } => panic!("expected verdict, got unavailable: {reason}"),
        }
    }

    #[tokio::test]
    async fn missing_keys_are_unavailable_without_a_request() {
        let server = MockServer::start().await;
        let http = reqwest::Client::new();
        let vt = VirusTotal::new(http.clone(), &server.uri(), None, TIMEOUT);
        let abuse = AbuseIpDb::new(http.clone(), &server.uri(), None, TIMEOUT);
        let ipqs = IpQualityScore::new(http, &server.uri(), None, TIMEOUT);

        assert!(matches!(vt.query(ip()).await, SourceOutcome::Unavailable { .. }));
        assert!(matches!(abuse.query(ip()).await, SourceOutcome::Unavailable { .. }));
        assert!(matches!(ipqs.query(ip()).await, SourceOutcome::Unavailable { .. }));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn virustotal_counts_malicious_and_suspicious_engines() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/api/v3/ip_addresses/{IP}")))
            .and(header("x-apikey", "vt-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "attributes": {
                    "as_owner": "Example Hosting",
                    "last_analysis_results": {
                        "EngineA": { "category": "malicious" },
                        "EngineB": { "category": "suspicious" },
                        "EngineC": { "category": "harmless" }
                    }
                }}
            })))
            .mount(&server)
            .await;

        let vt = VirusTotal::new(reqwest::Client::new(), &server.uri(), Some("vt-key".into()), TIMEOUT);
        let v = verdict(vt.query(ip()).await);
        assert_eq!(v.score, 100);
        assert_eq!(v.weight, 70);
        assert!(v.tags.contains("malicious"));
        assert_eq!(v.details["malicious"], 2);
        assert_eq!(v.details["total"], 3);
    }

    #[tokio::test]
    async fn clean_virustotal_result_still_carries_weight() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "attributes": { "last_analysis_results": {
                    "EngineA": { "category": "harmless" }
                }}}
            })))
            .mount(&server)
            .await;

        let vt = VirusTotal::new(reqwest::Client::new(), &server.uri(), Some("k".into()), TIMEOUT);
        let v = verdict(vt.query(ip()).await);
        assert_eq!((v.score, v.weight), (0, 70));
        assert!(v.tags.is_empty());
    }

    #[tokio::test]
    async fn abuseipdb_maps_confidence_to_score() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/check"))
            .and(query_param("ipAddress", IP))
            .and(query_param("maxAgeInDays", "90"))
            .and(header("Key", "abuse-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "abuseConfidenceScore": 85, "totalReports": 12, "isp": "Example ISP" }
            })))
            .mount(&server)
            .await;

        let abuse = AbuseIpDb::new(reqwest::Client::new(), &server.uri(), Some("abuse-key".into()), TIMEOUT);
        let v = verdict(abuse.query(ip()).await);
        assert_eq!(v.score, 85);
        assert_eq!(v.weight, 80);
        assert!(v.tags.contains("malicious"));
        assert_eq!(v.details["totalReports"], 12);
    }

    #[tokio::test]
    async fn non_200_and_garbage_bodies_are_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/check"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/api/v3/ip_addresses/{IP}")))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let abuse = AbuseIpDb::new(http.clone(), &server.uri(), Some("k".into()), TIMEOUT);
        let vt = VirusTotal::new(http, &server.uri(), Some("k".into()), TIMEOUT);
        assert!(matches!(abuse.query(ip()).await, SourceOutcome::Unavailable { .. }));
        assert!(matches!(vt.query(ip()).await, SourceOutcome::Unavailable { .. }));
    }

    #[tokio::test]
    async fn slow_provider_times_out_as_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "status": "success" }))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let ipapi = IpApi::new(reqwest::Client::new(), &server.uri(), Duration::from_millis(50));
        assert!(matches!(ipapi.query(ip()).await, SourceOutcome::Unavailable { .. }));
    }

    #[tokio::test]
    async fn ipqualityscore_tags_anonymizers_and_weights_fraud() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/api/json/ip/ipqs-key/{IP}")))
            .and(query_param("strictness", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true, "fraud_score": 90, "vpn": true, "proxy": true, "tor": false,
                "ISP": "Example VPN"
            })))
            .mount(&server)
            .await;

        let ipqs = IpQualityScore::new(reqwest::Client::new(), &server.uri(), Some("ipqs-key".into()), TIMEOUT);
        let v = verdict(ipqs.query(ip()).await);
        assert_eq!(v.tags, BTreeSet::from(["proxy".to_string(), "vpn".to_string()]));
        assert_eq!((v.score, v.weight), (80, 25));
        assert_eq!(v.details["isp"], "Example VPN");
    }

    #[test]
    fn low_fraud_scores_carry_no_weight() {
        assert_eq!(fraud_contribution(0), (0, 0));
        assert_eq!(fraud_contribution(50), (0, 0));
        assert_eq!(fraud_contribution(51), (2, 25));
        assert_eq!(fraud_contribution(100), (100, 25));
    }

    #[tokio::test]
    async fn ipapi_reports_hosting_as_a_tag_only() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/json/{IP}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success", "country": "Exampleland", "hosting": true, "as": "AS64500 Example"
            })))
            .mount(&server)
            .await;

        let ipapi = IpApi::new(reqwest::Client::new(), &server.uri(), TIMEOUT);
        let v = verdict(ipapi.query(ip()).await);
        assert_eq!(v.weight, 0);
        assert!(v.tags.contains("hosting"));
        assert_eq!(v.details["as"], "AS64500 Example");
    }

    #[tokio::test]
    async fn ipapi_failure_status_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "fail", "message": "reserved range"
            })))
            .mount(&server)
            .await;

        let ipapi = IpApi::new(reqwest::Client::new(), &server.uri(), TIMEOUT);
        assert_eq!(ipapi.query(ip()).await, SourceOutcome::unavailable("reserved range"));
    }

    struct BlocklistDns(HashMap<String, Result<Vec<IpAddr>, LookupError>>);

    #[async_trait]
    impl DnsLookup for BlocklistDns {
        async fn lookup_ip(&self, name: &str) -> Result<Vec<IpAddr>, LookupError> {
            self.0.get(name).cloned().unwrap_or(Err(LookupError::NotFound))
        }

        async fn records(&self, _name: &str) -> DnsRecordSet {
            DnsRecordSet::default()
        }
    }

    fn zones() -> Vec<String> {
        vec!["zen.example".to_string(), "bl.example".to_string()]
    }

    #[tokio::test]
    async fn dnsbl_listing_uses_reversed_octets() {
        let dns = BlocklistDns(HashMap::from([(
            "23.100.51.198.zen.example".to_string(),
            Ok(vec!["127.0.0.2".parse().unwrap()]),
        )]));
        let source = Dnsbl::new(Arc::new(dns), zones(), 50);
        let v = verdict(source.query(ip()).await);
        assert_eq!((v.score, v.weight), (100, 50));
        assert!(v.tags.contains("blacklisted"));
        assert_eq!(v.details["listed_on"], json!(["zen.example"]));
    }

    #[tokio::test]
    async fn dnsbl_refusal_codes_and_failures_are_not_listings() {
        let dns = BlocklistDns(HashMap::from([
            (
                "23.100.51.198.zen.example".to_string(),
                Ok(vec!["127.255.255.254".parse().unwrap()]),
            ),
            (
                "23.100.51.198.bl.example".to_string(),
                Err(LookupError::Failed("SERVFAIL".into())),
            ),
        ]));
        let source = Dnsbl::new(Arc::new(dns), zones(), 50);
        assert!(matches!(source.query(ip()).await, SourceOutcome::Unavailable { .. }));
    }

    #[tokio::test]
    async fn dnsbl_clean_answer_is_a_verdict() {
        let source = Dnsbl::new(Arc::new(BlocklistDns(HashMap::new())), zones(), 50);
        let v = verdict(source.query(ip()).await);
        assert_eq!(v.score, 0);
        assert!(v.tags.is_empty());
    }
}
