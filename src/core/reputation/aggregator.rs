// src/core/reputation/aggregator.rs

use chrono::Utc;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

use crate::core::models::{
    AggregatedVerdict, ReputationRecommendation, SourceOutcome, SourceVerdict, ThreatLevel,
};

/// Weighted mean of the available verdicts, rounded and clamped to 0..=100.
/// `None` when no verdict carries any weight.
pub fn confidence_score<'a, I>(verdicts: I) -> Option<u8>
where
    I: IntoIterator<Item = &'a SourceVerdict>,
{
    let (weighted, total_weight) = verdicts
        .into_iter()
        .fold((0u64, 0u64), |(sum, weight), v| {
            let w = u64::from(v.weight);
            (sum + u64::from(v.score.min(100)) * w, weight + w)
        });
    if total_weight == 0 {
        return None;
    }
    let mean = (weighted as f64 / total_weight as f64).round();
    Some(mean.clamp(0.0, 100.0) as u8)
}

/// Folds every provider's outcome for `ip` into one verdict.
///
/// Unavailable providers only show up in `details`; they neither lower nor raise the score.
pub fn aggregate(ip: IpAddr, outcomes: &[(String, SourceOutcome)]) -> AggregatedVerdict {
    let mut details = BTreeMap::new();
    let mut categories = BTreeSet::new();
    let mut available = Vec::new();

    for (name, outcome) in outcomes {
        match outcome {
            SourceOutcome::Available(verdict) => {
                categories.extend(verdict.tags.iter().cloned());
                details.insert(name.clone(), verdict.details.clone());
                available.push(verdict);
            }
            SourceOutcome::Unavailable { reason } => {
                details.insert(name.clone(), json!({ "available": false, "reason": reason }));
            }
        }
    }

    let score = confidence_score(available.iter().copied());
    let insufficient_data = score.is_none();
    let confidence_score = score.unwrap_or(0);
    let threat_level = ThreatLevel::from_score(confidence_score);
    let recommendations = recommend(&categories, threat_level, insufficient_data);

    AggregatedVerdict {
        ip,
        is_private: false,
        threat_level,
        confidence_score,
        insufficient_data,
        categories: categories.into_iter().collect(),
        details,
        recommendations,
        timestamp: Utc::now(),
    }
}

/// Fixed verdict for addresses that have no public reputation.
pub fn private_verdict(ip: IpAddr) -> AggregatedVerdict {
    let now = Utc::now();
    AggregatedVerdict {
        ip,
        is_private: true,
        threat_level: ThreatLevel::Low,
        confidence_score: 0,
        insufficient_data: false,
        categories: vec!["private".to_string()],
        details: BTreeMap::from([(
            "private".to_string(),
            json!({
                "found": true,
                "details": "This is a private IP address",
                "last_seen": now.to_rfc3339(),
            }),
        )]),
        recommendations: vec![ReputationRecommendation {
            title: "Private IP Address".to_string(),
            description: "This is a private or reserved IP address. Private IPs are not routable on the public internet.".to_string(),
        }],
        timestamp: now,
    }
}

pub fn recommend(
    tags: &BTreeSet<String>,
    threat_level: ThreatLevel,
    insufficient_data: bool,
) -> Vec<ReputationRecommendation> {
    let mut recommendations = Vec::new();

    if tags.contains("malicious") {
        recommendations.push(ReputationRecommendation {
            title: "Malicious Activity Detected".to_string(),
            description: "This IP has been flagged for malicious activity. Exercise caution and consider blocking it.".to_string(),
        });
    }

    let services: Vec<&str> = [("vpn", "VPN"), ("proxy", "proxy"), ("tor", "TOR")]
        .into_iter()
        .filter(|(tag, _)| tags.contains(*tag))
        .map(|(_, label)| label)
        .collect();
    if !services.is_empty() {
        recommendations.push(ReputationRecommendation {
            title: format!("{} Detected", services.join("/")),
            description: format!(
                "This IP is associated with {} services. This could indicate anonymous or suspicious activity.",
                services.join(" or ")
            ),
        });
    }

    if tags.contains("blacklisted") {
        recommendations.push(ReputationRecommendation {
            title: "Listed on DNS Blocklists".to_string(),
            description: "This IP appears on at least one DNS blocklist. Mail and traffic from it are likely to be rejected.".to_string(),
        });
    }

    if threat_level == ThreatLevel::High {
        recommendations.push(ReputationRecommendation {
            title: "Consider Blocking This IP".to_string(),
            description: "The combined threat score is high. Consider blocking this address at the firewall or WAF.".to_string(),
        });
    }

    if insufficient_data {
        recommendations.push(ReputationRecommendation {
            title: "Insufficient Data".to_string(),
            description: "No reputation provider returned a usable answer. A score of 0 here does not mean the address is clean.".to_string(),
        });
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::SourceFamily;

    fn verdict(source: &str, score: u8, weight: u32, tags: &[&str]) -> SourceOutcome {
        SourceOutcome::Available(SourceVerdict {
            source: source.to_string(),
            family: SourceFamily::ThreatIntelligence,
            score,
            weight,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            details: json!({ "source": source }),
        })
    }

    fn ip() -> IpAddr {
        "203.0.113.5".parse().unwrap()
    }

    #[test]
    fn score_is_the_weighted_mean_of_available_verdicts() {
        let outcomes = vec![
            ("virustotal".to_string(), verdict("virustotal", 100, 70, &["malicious"])),
            ("abuseipdb".to_string(), verdict("abuseipdb", 40, 80, &[])),
            ("ipqualityscore".to_string(), SourceOutcome::unavailable("timeout")),
        ];
        let result = aggregate(ip(), &outcomes);
        // (100*70 + 40*80) / 150 = 68
        assert_eq!(result.confidence_score, 68);
        assert_eq!(result.threat_level, ThreatLevel::Medium);
        assert!(!result.insufficient_data);
        assert_eq!(result.details["ipqualityscore"]["available"], false);
    }

    #[test]
    fn all_unavailable_is_insufficient_data_not_clean() {
        let outcomes: Vec<_> = ["virustotal", "abuseipdb", "ipqualityscore", "ipapi", "dnsbl"]
            .into_iter()
            .map(|n| (n.to_string(), SourceOutcome::unavailable("no API key configured")))
            .collect();
        let result = aggregate(ip(), &outcomes);

        assert_eq!(result.confidence_score, 0);
        assert_eq!(result.threat_level, ThreatLevel::Low);
        assert!(result.insufficient_data);
        assert!(result.categories.is_empty());
        assert!(result.recommendations.iter().any(|r| r.title == "Insufficient Data"));
    }

    #[test]
    fn zero_weight_tags_are_kept_without_moving_the_score() {
        let outcomes = vec![
            ("ipapi".to_string(), verdict("ipapi", 0, 0, &["hosting"])),
            ("ipqualityscore".to_string(), verdict("ipqualityscore", 0, 0, &["vpn", "tor"])),
        ];
        let result = aggregate(ip(), &outcomes);
        assert!(result.insufficient_data);
        assert_eq!(result.categories, vec!["hosting", "tor", "vpn"]);
        assert!(result.recommendations.iter().any(|r| r.title == "VPN/TOR Detected"));
    }

    #[test]
    fn score_stays_in_range() {
        let outcomes = vec![
            ("a".to_string(), verdict("a", 100, u32::MAX, &[])),
            ("b".to_string(), verdict("b", 100, u32::MAX, &[])),
        ];
        assert_eq!(aggregate(ip(), &outcomes).confidence_score, 100);
        assert_eq!(confidence_score(std::iter::empty()), None);
    }

    #[test]
    fn high_threat_adds_blocking_recommendation() {
        let outcomes = vec![
            ("virustotal".to_string(), verdict("virustotal", 100, 70, &["malicious"])),
            ("dnsbl".to_string(), verdict("dnsbl", 100, 50, &["blacklisted"])),
        ];
        let result = aggregate(ip(), &outcomes);
        let titles: Vec<_> = result.recommendations.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(result.threat_level, ThreatLevel::High);
        assert_eq!(
            titles,
            vec![
                "Malicious Activity Detected",
                "Listed on DNS Blocklists",
                "Consider Blocking This IP"
            ]
        );
    }

    #[test]
    fn private_verdict_is_fixed_low_risk() {
        let result = private_verdict("10.1.2.3".parse().unwrap());
        assert!(result.is_private);
        assert_eq!(result.threat_level, ThreatLevel::Low);
        assert_eq!(result.categories, vec!["private"]);
        assert_eq!(result.confidence_score, 0);
    }
}
