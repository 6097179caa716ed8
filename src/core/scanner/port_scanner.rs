// src/core/scanner/port_scanner.rs

use async_trait::async_trait;
use chrono::Utc;
use std::convert::Infallible;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::core::context::ReconContext;
use crate::core::dns::preferred_address;
use crate::core::knowledge_base::{
    self, ADMINISTRATIVE_PORTS, COMMON_PORTS, COMMONLY_EXPOSED_PORTS, DATABASE_PORTS,
    HTTP_BANNER_PORTS, HTTPS_BANNER_PORTS, QUICK_SCAN_LAST_PORT, SSH_BANNER_PORTS,
};
use crate::core::models::{
    PortRecommendation, PortResult, PortScanReport, PortScanRequest, ProbeStatus, Risk, ScanType,
};
use crate::core::scheduler::{ProbeOutcome, ProbeScheduler};
use crate::core::target::Target;
use crate::error::ReconError;

/// How a single connect attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected,
    TimedOut,
    Refused,
    Failed(String),
}

/// Maps a connect outcome to the reported port state. Anything ambiguous is `filtered`,
/// never `closed`.
pub fn classify(outcome: &ConnectOutcome) -> ProbeStatus {
    match outcome {
        ConnectOutcome::Connected => ProbeStatus::Open,
        ConnectOutcome::Refused => ProbeStatus::Closed,
        ConnectOutcome::TimedOut | ConnectOutcome::Failed(_) => ProbeStatus::Filtered,
    }
}

pub fn outcome_from_io(error: &io::Error) -> ConnectOutcome {
    match error.kind() {
        io::ErrorKind::ConnectionRefused => ConnectOutcome::Refused,
        io::ErrorKind::TimedOut => ConnectOutcome::TimedOut,
        _ => ConnectOutcome::Failed(error.to_string()),
    }
}

/// Socket access for the port probe.
#[async_trait]
pub trait PortConnector: Send + Sync {
    async fn connect(&self, addr: SocketAddr, timeout: Duration) -> ConnectOutcome;

    /// Best-effort service banner. `host` is the name the caller asked for, used for the
    /// HTTP `Host` header.
    async fn grab_banner(&self, host: &str, addr: SocketAddr, timeout: Duration) -> Option<String>;
}

/// Real TCP connector. HTTP banners go through reqwest, SSH banners are read raw.
pub struct TcpConnector {
    http: reqwest::Client,
}

impl TcpConnector {
    pub fn new() -> Result<Self, ReconError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("vanguard-recon/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ReconError::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    async fn http_banner(&self, scheme: &str, host: &str, port: u16) -> Option<String> {
        let authority = match IpAddr::from_str(host) {
            Ok(IpAddr::V6(v6)) => format!("[{}]", v6),
            _ => host.to_string(),
        };
        let url = format!("{}://{}:{}/", scheme, authority, port);
        let response = self.http.get(&url).send().await.ok()?;
        let server = response
            .headers()
            .get(reqwest::header::SERVER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("Unknown");
        Some(format!("{:?} {}\nServer: {}", response.version(), response.status(), server))
    }

    async fn ssh_banner(addr: SocketAddr) -> Option<String> {
        let mut stream = TcpStream::connect(addr).await.ok()?;
        let mut buf = vec![0u8; 256];
        let n = stream.read(&mut buf).await.ok()?;
        let greeting = String::from_utf8_lossy(&buf[..n]);
        greeting
            .lines()
            .next()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
    }
}

#[async_trait]
impl PortConnector for TcpConnector {
    async fn connect(&self, addr: SocketAddr, timeout: Duration) -> ConnectOutcome {
        match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_stream)) => ConnectOutcome::Connected,
            Ok(Err(e)) => outcome_from_io(&e),
            Err(_) => ConnectOutcome::TimedOut,
        }
    }

    async fn grab_banner(&self, host: &str, addr: SocketAddr, timeout: Duration) -> Option<String> {
        let port = addr.port();
        let grab = async {
            if HTTP_BANNER_PORTS.contains(&port) {
                self.http_banner("http", host, port).await
            } else if HTTPS_BANNER_PORTS.contains(&port) {
                self.http_banner("https", host, port).await
            } else if SSH_BANNER_PORTS.contains(&port) {
                Self::ssh_banner(addr).await
            } else {
                None
            }
        };
        tokio::time::timeout(timeout, grab).await.ok().flatten()
    }
}

/// One unit of work for the scheduler.
#[derive(Debug, Clone)]
pub struct PortProbe {
    pub host: String,
    pub ip: IpAddr,
    pub port: u16,
}

/// Runs one probe through its whole lifecycle: connect, classify, and for open
/// text-protocol ports a separately time-boxed banner read.
pub async fn probe_port(
    connector: &dyn PortConnector,
    probe: &PortProbe,
    connect_timeout: Duration,
    banner_timeout: Duration,
) -> PortResult {
    let addr = SocketAddr::new(probe.ip, probe.port);
    let outcome = connector.connect(addr, connect_timeout).await;
    let status = classify(&outcome);

    let banner = if status == ProbeStatus::Open && knowledge_base::has_banner_protocol(probe.port) {
        connector.grab_banner(&probe.host, addr, banner_timeout).await
    } else {
        None
    };

    debug!(port = probe.port, status = %status, outcome = ?outcome, "Port probe finished.");

    PortResult {
        port: probe.port,
        status,
        service: knowledge_base::service_name(probe.port).to_string(),
        protocol: "tcp".to_string(),
        banner,
        timestamp: Utc::now(),
    }
}

/// Resolves the list of ports for a scan type. `range` needs caller-supplied ports, each
/// within 1..=65535. Duplicates are dropped, first occurrence wins.
pub fn ports_for(scan_type: ScanType, requested: &[i64]) -> Result<Vec<u16>, ReconError> {
    let ports: Vec<u16> = match scan_type {
        ScanType::Common => COMMON_PORTS.to_vec(),
        ScanType::Quick => (1..=QUICK_SCAN_LAST_PORT).collect(),
        ScanType::Range => {
            if requested.is_empty() {
                return Err(ReconError::validation("Invalid scan type or port range"));
            }
            requested
                .iter()
                .map(|p| {
                    u16::try_from(*p)
                        .ok()
                        .filter(|p| *p != 0)
                        .ok_or_else(|| ReconError::validation(format!("Invalid port: {}", p)))
                })
                .collect::<Result<_, _>>()?
        }
    };

    let mut seen = std::collections::HashSet::new();
    Ok(ports.into_iter().filter(|p| seen.insert(*p)).collect())
}

/// Builds the post-scan recommendations from the set of open ports.
pub fn analyze_open_ports(open: &[&PortResult]) -> Vec<PortRecommendation> {
    let mut recommendations = Vec::new();

    for result in open {
        if let Some(vuln) = knowledge_base::vulnerable_port(result.port) {
            recommendations.push(PortRecommendation {
                port: Some(result.port),
                title: format!("Vulnerable Service: {} (Port {})", result.service, result.port),
                description: vuln.description.to_string(),
                risk: vuln.risk,
                remediation: format!(
                    "Consider disabling or securing port {} ({})",
                    result.port, result.service
                ),
            });
        }
    }

    if open.iter().any(|r| COMMONLY_EXPOSED_PORTS.contains(&r.port)) {
        recommendations.push(PortRecommendation {
            port: None,
            title: "Common Services Exposed".to_string(),
            description: "Common services like FTP, Telnet, HTTP, and HTTPS are exposed to the internet.".to_string(),
            risk: Risk::Medium,
            remediation: "Ensure these services are properly secured with strong authentication and encryption.".to_string(),
        });
    }

    let databases: Vec<String> = open
        .iter()
        .filter(|r| DATABASE_PORTS.contains(&r.port))
        .map(|r| r.port.to_string())
        .collect();
    if !databases.is_empty() {
        recommendations.push(PortRecommendation {
            port: None,
            title: "Database Ports Exposed".to_string(),
            description: format!("Database ports ({}) are exposed to the internet.", databases.join(", ")),
            risk: Risk::High,
            remediation: "Database servers should not be directly accessible from the internet. Use a VPN or SSH tunneling.".to_string(),
        });
    }

    let administrative: Vec<String> = open
        .iter()
        .filter(|r| ADMINISTRATIVE_PORTS.contains(&r.port))
        .map(|r| format!("{} ({})", r.port, r.service))
        .collect();
    if administrative.len() >= 2 {
        recommendations.push(PortRecommendation {
            port: None,
            title: "Multiple Administrative Services Exposed".to_string(),
            description: format!(
                "Several remote administration or database services are reachable at once: {}.",
                administrative.join(", ")
            ),
            risk: Risk::High,
            remediation: "Place administrative services behind a firewall or VPN and allow only trusted source addresses.".to_string(),
        });
    }

    recommendations
}

async fn resolve_host(ctx: &ReconContext, host: &str) -> Result<IpAddr, ReconError> {
    match Target::parse(host)? {
        Target::Ip(ip) => Ok(ip),
        Target::Domain(name) => {
            let addresses = ctx
                .dns
                .lookup_ip(&name)
                .await
                .map_err(|_| ReconError::Unresolvable(host.to_string()))?;
            preferred_address(&addresses).ok_or_else(|| ReconError::Unresolvable(host.to_string()))
        }
    }
}

/// Runs a TCP port scan.
///
/// Input problems (missing host, bad scan type, bad ports, unresolvable host) are returned
/// as errors before any probe runs. Everything that happens to individual ports ends up in
/// the report.
pub async fn run_port_scan(
    ctx: &Arc<ReconContext>,
    request: PortScanRequest,
) -> Result<PortScanReport, ReconError> {
    let host = request
        .host
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ReconError::validation("Host is required"))?
        .to_string();

    let scan_type = match request.scan_type.as_deref().map(str::trim) {
        None | Some("") => ScanType::default(),
        Some(raw) => ScanType::from_str(raw)
            .map_err(|_| ReconError::validation("Invalid scan type or port range"))?,
    };
    let ports = ports_for(scan_type, &request.ports)?;
    let ip = resolve_host(ctx, &host).await?;

    let settings = &ctx.settings.ports;
    let scheduler = ProbeScheduler::new(settings.workers, settings.max_ports)?;

    info!(target = %host, %ip, %scan_type, ports = ports.len(), "Starting port scan.");
    let started = Instant::now();

    let descriptors: Vec<PortProbe> = ports
        .into_iter()
        .map(|port| PortProbe {
            host: host.clone(),
            ip,
            port,
        })
        .collect();

    let connector = Arc::clone(&ctx.connector);
    let connect_timeout = settings.connect_timeout();
    let banner_timeout = settings.banner_timeout();
    let report = scheduler
        .run(descriptors, move |probe: PortProbe| {
            let connector = Arc::clone(&connector);
            async move {
                Ok::<_, Infallible>(
                    probe_port(connector.as_ref(), &probe, connect_timeout, banner_timeout).await,
                )
            }
        })
        .await;

    let mut results: Vec<PortResult> = report
        .pairs()
        .map(|(probe, outcome)| match outcome {
            ProbeOutcome::Completed(result) => result.clone(),
            ProbeOutcome::Failed { reason } => {
                debug!(port = probe.port, reason = %reason, "Port probe failed.");
                PortResult {
                    port: probe.port,
                    status: ProbeStatus::Error,
                    service: knowledge_base::service_name(probe.port).to_string(),
                    protocol: "tcp".to_string(),
                    banner: None,
                    timestamp: Utc::now(),
                }
            }
        })
        .collect();
    results.sort_by_key(|r| r.port);

    let count = |status: ProbeStatus| results.iter().filter(|r| r.status == status).count();
    let (open_count, filtered_count, closed_count) = (
        count(ProbeStatus::Open),
        count(ProbeStatus::Filtered),
        count(ProbeStatus::Closed),
    );
    let open: Vec<&PortResult> = results.iter().filter(|r| r.status == ProbeStatus::Open).collect();
    let recommendations = analyze_open_ports(&open);
    let scan_duration = format!("{:.2}", started.elapsed().as_secs_f64());

    info!(
        target = %host,
        open = open_count,
        filtered = filtered_count,
        closed = closed_count,
        duration = %scan_duration,
        "Port scan finished."
    );

    Ok(PortScanReport {
        status: "completed".to_string(),
        host,
        ip,
        scan_type,
        scan_duration,
        scanned_ports: results.len(),
        open_ports: open_count,
        filtered_ports: filtered_count,
        closed_ports: closed_count,
        truncated: report.is_truncated(),
        requested_ports: report.requested(),
        scan_results: results,
        recommendations,
        timestamp: Utc::now(),
    })
}
