//! Static, read-only reference data used by the scanners: which ports to probe, what
//! runs on them, which exposures deserve a warning, and which subdomain labels are worth
//! guessing. Keeping it data-driven means the tables can change without touching the
//! probing logic.

use crate::core::models::Risk;

/// Ports probed by a `common` scan.
pub const COMMON_PORTS: &[u16] = &[
    21, 22, 23, 25, 53, 80, 110, 115, 135, 139, 143, 194, 443, 445, 587, 993, 995, 1433, 1521,
    2049, 3306, 3389, 5432, 5900, 6379, 8080, 8443, 27017, 27018, 27019,
];

/// Upper bound of the port range walked by a `quick` scan.
pub const QUICK_SCAN_LAST_PORT: u16 = 1000;

/// Ports whose service speaks HTTP(S); the banner is the status line and `Server` header.
pub const HTTP_BANNER_PORTS: &[u16] = &[80, 8080];
pub const HTTPS_BANNER_PORTS: &[u16] = &[443, 8443];
/// Ports where the server talks first and the banner is its greeting line.
pub const SSH_BANNER_PORTS: &[u16] = &[22];

/// Well-known services by port.
static WELL_KNOWN_PORTS: &[(u16, &str)] = &[
    (21, "FTP"),
    (22, "SSH"),
    (23, "Telnet"),
    (25, "SMTP"),
    (53, "DNS"),
    (80, "HTTP"),
    (110, "POP3"),
    (115, "SFTP"),
    (135, "MS RPC"),
    (139, "NetBIOS"),
    (143, "IMAP"),
    (194, "IRC"),
    (443, "HTTPS"),
    (445, "SMB"),
    (587, "SMTP"),
    (993, "IMAPS"),
    (995, "POP3S"),
    (1433, "MSSQL"),
    (1521, "Oracle"),
    (2049, "NFS"),
    (3306, "MySQL"),
    (3389, "RDP"),
    (5432, "PostgreSQL"),
    (5900, "VNC"),
    (6379, "Redis"),
    (8080, "HTTP-Alt"),
    (8443, "HTTPS-Alt"),
    (27017, "MongoDB"),
    (27018, "MongoDB Shard"),
    (27019, "MongoDB Config"),
];

/// A service that is risky to expose, with the advice given when it is found open.
pub struct VulnerablePort {
    pub port: u16,
    pub risk: Risk,
    pub description: &'static str,
}

static VULNERABLE_PORTS: &[VulnerablePort] = &[
    VulnerablePort {
        port: 21,
        risk: Risk::High,
        description: "FTP is insecure. Use SFTP or FTPS instead.",
    },
    VulnerablePort {
        port: 23,
        risk: Risk::Critical,
        description: "Telnet sends credentials in plaintext. Disable and use SSH instead.",
    },
    VulnerablePort {
        port: 135,
        risk: Risk::High,
        description: "MS RPC can be exploited. Restrict access and apply security updates.",
    },
    VulnerablePort {
        port: 139,
        risk: Risk::High,
        description: "NetBIOS can be used for enumeration. Disable if not needed.",
    },
    VulnerablePort {
        port: 445,
        risk: Risk::Critical,
        description: "SMB can be exploited (e.g., EternalBlue). Update and restrict access.",
    },
    VulnerablePort {
        port: 1433,
        risk: Risk::Medium,
        description: "MSSQL should be firewalled and use strong authentication.",
    },
    VulnerablePort {
        port: 3389,
        risk: Risk::High,
        description: "RDP is often targeted by brute force attacks. Use VPN or restrict access.",
    },
    VulnerablePort {
        port: 5900,
        risk: Risk::Medium,
        description: "VNC may use weak authentication. Use SSH tunneling.",
    },
];

/// Services commonly reachable from the internet that still need hardening.
pub const COMMONLY_EXPOSED_PORTS: &[u16] = &[21, 23, 80, 443];

pub const DATABASE_PORTS: &[u16] = &[1433, 1521, 3306, 5432, 27017];

/// Remote administration and data-store ports. Several of these open at once usually
/// means the host has no perimeter filtering at all.
pub const ADMINISTRATIVE_PORTS: &[u16] = &[
    22, 23, 135, 139, 445, 1433, 1521, 3306, 3389, 5432, 5900, 6379, 27017, 27018, 27019,
];

/// Labels tried against every domain before any passive source is consulted.
pub const COMMON_SUBDOMAINS: &[&str] = &[
    "www", "mail", "webmail", "smtp", "pop", "imap", "ftp", "api", "dev", "test", "staging",
    "mobile", "m", "secure", "admin", "portal", "blog", "shop", "store", "app", "apps",
    "support", "help", "docs", "wiki", "status", "dashboard", "cpanel", "whm", "webdisk", "ns1",
    "ns2", "dns1", "dns2", "vpn", "remote", "intranet", "extranet", "internal", "external",
    "old", "new", "beta", "alpha",
];

/// Best-known service name for `port`, or `"Unknown"`.
pub fn service_name(port: u16) -> &'static str {
    WELL_KNOWN_PORTS
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, name)| *name)
        .unwrap_or("Unknown")
}

pub fn vulnerable_port(port: u16) -> Option<&'static VulnerablePort> {
    VULNERABLE_PORTS.iter().find(|v| v.port == port)
}

pub fn has_banner_protocol(port: u16) -> bool {
    HTTP_BANNER_PORTS.contains(&port)
        || HTTPS_BANNER_PORTS.contains(&port)
        || SSH_BANNER_PORTS.contains(&port)
}
