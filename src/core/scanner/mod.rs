// src/core/scanner/mod.rs

pub mod port_scanner;

use std::net::IpAddr;
use std::sync::Arc;
use tracing::info;

use crate::core::context::ReconContext;
use crate::core::dns::preferred_address;
use crate::core::models::{
    AggregatedVerdict, Finding, FindingCategory, PortScanReport, PortScanRequest, ReconReport,
    Severity, SubdomainReport, ThreatLevel,
};
use crate::core::reputation::assess_ip;
use crate::core::subdomain::discover_subdomains;
use crate::core::target::Target;
use crate::error::ReconError;
use self::port_scanner::run_port_scan;

async fn reputation_for(ctx: &Arc<ReconContext>, target: &Target) -> Result<AggregatedVerdict, String> {
    let ip: IpAddr = match target {
        Target::Ip(ip) => *ip,
        Target::Domain(name) => {
            let addresses = ctx.dns.lookup_ip(name).await.map_err(|e| e.to_string())?;
            preferred_address(&addresses).ok_or_else(|| format!("{} has no address", name))?
        }
    };
    Ok(assess_ip(ctx, ip).await)
}

/// Runs the port scan, the reputation check and (for names) subdomain discovery against
/// one target, concurrently. A failure in one part leaves the others intact.
pub async fn run_full_recon(ctx: &Arc<ReconContext>, input: &str) -> Result<ReconReport, ReconError> {
    let target = Target::parse(input)?;
    info!(target = %target, "Starting full reconnaissance.");

    let request = PortScanRequest {
        host: Some(target.to_string()),
        ..Default::default()
    };
    let subdomain_job = async {
        match &target {
            Target::Domain(name) => Some(discover_subdomains(ctx, Some(name)).await.map_err(|e| e.to_string())),
            Target::Ip(_) => None,
        }
    };

    let (ports, reputation, subdomains) = tokio::join!(
        run_port_scan(ctx, request),
        reputation_for(ctx, &target),
        subdomain_job
    );

    info!(target = %target, "Full reconnaissance finished.");
    Ok(ReconReport {
        target: target.to_string(),
        ports: Some(ports.map_err(|e| e.to_string())),
        reputation: Some(reputation),
        subdomains,
    })
}

fn port_findings(report: &PortScanReport) -> impl Iterator<Item = Finding> + '_ {
    report.recommendations.iter().map(|rec| Finding {
        category: FindingCategory::Ports,
        severity: rec.risk.severity(),
        title: rec.title.clone(),
        description: rec.description.clone(),
        remediation: rec.remediation.clone(),
    })
}

fn reputation_findings(verdict: &AggregatedVerdict) -> impl Iterator<Item = Finding> + '_ {
    let (severity, remediation) = match verdict.threat_level {
        ThreatLevel::High => (
            Severity::Critical,
            "Block or rate-limit this address and review logs for related activity.",
        ),
        ThreatLevel::Medium => (
            Severity::Warning,
            "Monitor traffic from this address and check the per-provider details.",
        ),
        ThreatLevel::Low => (Severity::Info, "No action required."),
    };
    verdict.recommendations.iter().map(move |rec| Finding {
        category: FindingCategory::Reputation,
        severity: severity.clone(),
        title: rec.title.clone(),
        description: rec.description.clone(),
        remediation: remediation.to_string(),
    })
}

fn subdomain_findings(report: &SubdomainReport) -> impl Iterator<Item = Finding> + '_ {
    report.subdomains.iter().map(|entry| Finding {
        category: FindingCategory::Subdomains,
        severity: Severity::Info,
        title: format!("{}.{}", entry.subdomain, report.domain),
        description: format!("Resolves to {}.", entry.ip),
        remediation: "Confirm this host is meant to be public and is kept patched.".to_string(),
    })
}

/// Flattens a combined report into UI findings, most severe first.
pub fn collect_findings(report: &ReconReport) -> Vec<Finding> {
    let mut findings: Vec<Finding> = Vec::new();
    if let Some(Ok(ports)) = &report.ports {
        findings.extend(port_findings(ports));
    }
    if let Some(Ok(verdict)) = &report.reputation {
        findings.extend(reputation_findings(verdict));
    }
    if let Some(Ok(subdomains)) = &report.subdomains {
        findings.extend(subdomain_findings(subdomains));
    }
    findings.sort_by_key(|f| (severity_rank(&f.severity), f.category));
    findings
}

fn severity_rank(severity: &Severity) -> u8 {
    match severity {
        Severity::Critical => 0,
        Severity::Warning => 1,
        Severity::Info => 2,
    }
}
