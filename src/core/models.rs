// src/core/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::IpAddr;
use strum::{Display, EnumString};

// --- Reusable Result Types ---

/// Result of a best-effort lookup: `Ok(Some)` found, `Ok(None)` definitively absent,
/// `Err` the lookup itself failed.
pub type ScanResult<T> = Result<Option<T>, String>;

// --- Probe Results ---

/// Classification of a single probe. Port probes use the first four variants, subdomain
/// probes use `Found`, `NotFound` and `Error`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ProbeStatus {
    Open,
    Closed,
    Filtered,
    Error,
    NotFound,
    Found,
}

/// Severity of a finding as shown in the terminal UI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

/// Risk tag attached to port-scan recommendations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Risk {
    Critical,
    High,
    Medium,
    Low,
}

impl Risk {
    pub fn severity(self) -> Severity {
        match self {
            Risk::Critical | Risk::High => Severity::Critical,
            Risk::Medium => Severity::Warning,
            Risk::Low => Severity::Info,
        }
    }
}

// --- Port Scanner Models ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ScanType {
    #[default]
    Common,
    Quick,
    Range,
}

/// Incoming port-scan request. Fields are optional so that missing input produces a
/// validation error instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortScanRequest {
    pub host: Option<String>,
    #[serde(default)]
    pub ports: Vec<i64>,
    pub scan_type: Option<String>,
}

/// Terminal result of one TCP port probe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortResult {
    pub port: u16,
    pub status: ProbeStatus,
    pub service: String,
    pub protocol: String,
    pub banner: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortRecommendation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub title: String,
    pub description: String,
    pub risk: Risk,
    pub remediation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortScanReport {
    pub status: String,
    pub host: String,
    pub ip: IpAddr,
    pub scan_type: ScanType,
    pub scan_duration: String,
    pub scanned_ports: usize,
    pub open_ports: usize,
    pub filtered_ports: usize,
    pub closed_ports: usize,
    pub truncated: bool,
    pub requested_ports: usize,
    pub scan_results: Vec<PortResult>,
    pub recommendations: Vec<PortRecommendation>,
    pub timestamp: DateTime<Utc>,
}

// --- Reputation Models ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
}

impl ThreatLevel {
    /// `>= 70` is high, `30..70` medium, anything below low.
    pub fn from_score(score: u8) -> Self {
        match score {
            70.. => ThreatLevel::High,
            30..=69 => ThreatLevel::Medium,
            _ => ThreatLevel::Low,
        }
    }
}

/// Which kind of intelligence a provider contributes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceFamily {
    ThreatIntelligence,
    Anonymization,
    PassiveMetadata,
}

/// One provider's normalized opinion about a target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceVerdict {
    pub source: String,
    pub family: SourceFamily,
    /// Normalized risk contribution, 0 to 100.
    pub score: u8,
    /// How much the aggregator trusts `score`. Zero means tags only.
    pub weight: u32,
    pub tags: BTreeSet<String>,
    pub details: serde_json::Value,
}

/// What a provider returned. `Unavailable` is never a clean verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    Available(SourceVerdict),
    Unavailable { reason: String },
}

impl SourceOutcome {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        SourceOutcome::Unavailable { reason: reason.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReputationRecommendation {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReputationRequest {
    pub ip: Option<String>,
}

/// The combined verdict for one address. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregatedVerdict {
    pub ip: IpAddr,
    pub is_private: bool,
    pub threat_level: ThreatLevel,
    pub confidence_score: u8,
    /// Set when no provider contributed any weight, so the score means "unknown".
    pub insufficient_data: bool,
    pub categories: Vec<String>,
    pub details: BTreeMap<String, serde_json::Value>,
    pub recommendations: Vec<ReputationRecommendation>,
    pub timestamp: DateTime<Utc>,
}

// --- Subdomain Models ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubdomainRequest {
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MxRecord {
    pub exchange: String,
    pub priority: u16,
}

/// Record sets fetched for a resolving name. Each type is independent; an empty list
/// just means that type was absent or its lookup failed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DnsRecordSet {
    #[serde(rename = "A")]
    pub a: Vec<String>,
    #[serde(rename = "AAAA")]
    pub aaaa: Vec<String>,
    #[serde(rename = "CNAME")]
    pub cname: Vec<String>,
    #[serde(rename = "MX")]
    pub mx: Vec<MxRecord>,
    #[serde(rename = "TXT")]
    pub txt: Vec<String>,
}

impl DnsRecordSet {
    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
            && self.aaaa.is_empty()
            && self.cname.is_empty()
            && self.mx.is_empty()
            && self.txt.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubdomainEntry {
    pub subdomain: String,
    pub exists: bool,
    pub ip: IpAddr,
    pub records: DnsRecordSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubdomainReport {
    pub domain: String,
    pub subdomains: Vec<SubdomainEntry>,
    pub total_found: usize,
    pub total_checked: usize,
    pub truncated: bool,
    pub requested_candidates: usize,
    pub timestamp: DateTime<Utc>,
}

// --- Combined Report ---

/// Groups findings in the terminal UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FindingCategory {
    Ports,
    Reputation,
    Subdomains,
}

impl fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FindingCategory::Ports => write!(f, "Exposed Services"),
            FindingCategory::Reputation => write!(f, "IP Reputation"),
            FindingCategory::Subdomains => write!(f, "Subdomains"),
        }
    }
}

/// A human-readable finding derived from any of the three reports.
#[derive(Debug, Clone)]
pub struct Finding {
    pub category: FindingCategory,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub remediation: String,
}

/// Everything the interactive front-end runs against one target. Each part is
/// independent: a failed reputation lookup does not hide the port scan.
#[derive(Debug, Clone, Default)]
pub struct ReconReport {
    pub target: String,
    pub ports: Option<Result<PortScanReport, String>>,
    pub reputation: Option<Result<AggregatedVerdict, String>>,
    pub subdomains: Option<Result<SubdomainReport, String>>,
}
