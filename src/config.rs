// src/config.rs

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::ReconError;
use crate::logging;

/// Environment variables that override provider credentials from the config file.
pub const VIRUSTOTAL_KEY_ENV: &str = "VIRUSTOTAL_API_KEY";
pub const ABUSEIPDB_KEY_ENV: &str = "ABUSEIPDB_API_KEY";
pub const IPQUALITYSCORE_KEY_ENV: &str = "IPQUALITYSCORE_API_KEY";

const CONFIG_FILE: &str = "config.toml";

/// Top-level runtime settings.
///
/// Every field has a working default, so the binary runs without any config file.
/// Values are read from TOML and API keys are then overridden from the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub ports: PortScanSettings,
    pub reputation: ReputationSettings,
    pub subdomains: SubdomainSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind: "127.0.0.1:8888".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortScanSettings {
    /// Concurrent connect attempts per scan.
    pub workers: usize,
    /// Hard ceiling on ports per request; anything beyond is truncated and reported.
    pub max_ports: usize,
    pub connect_timeout_ms: u64,
    pub banner_timeout_ms: u64,
}

impl Default for PortScanSettings {
    fn default() -> Self {
        Self {
            workers: 10,
            max_ports: 100,
            connect_timeout_ms: 3_000,
            banner_timeout_ms: 2_000,
        }
    }
}

impl PortScanSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn banner_timeout(&self) -> Duration {
        Duration::from_millis(self.banner_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReputationSettings {
    pub provider_timeout_ms: u64,
    pub cache_ttl_secs: u64,
    pub virustotal_api_key: Option<String>,
    pub abuseipdb_api_key: Option<String>,
    pub ipqualityscore_api_key: Option<String>,
    pub virustotal_url: String,
    pub abuseipdb_url: String,
    pub ipqualityscore_url: String,
    pub ipapi_url: String,
    pub dnsbl_zones: Vec<String>,
    /// Trust given to a DNS blocklist answer by the aggregator.
    pub dnsbl_weight: u32,
}

impl Default for ReputationSettings {
    fn default() -> Self {
        Self {
            provider_timeout_ms: 5_000,
            cache_ttl_secs: 3_600,
            virustotal_api_key: None,
            abuseipdb_api_key: None,
            ipqualityscore_api_key: None,
            virustotal_url: "https://www.virustotal.com".to_string(),
            abuseipdb_url: "https://api.abuseipdb.com".to_string(),
            ipqualityscore_url: "https://ipqualityscore.com".to_string(),
            ipapi_url: "http://ip-api.com".to_string(),
            dnsbl_zones: vec![
                "zen.spamhaus.org".to_string(),
                "bl.spamcop.net".to_string(),
                "dnsbl.sorbs.net".to_string(),
            ],
            dnsbl_weight: 50,
        }
    }
}

impl ReputationSettings {
    pub fn provider_timeout(&self) -> Duration {
        // Providers are never allowed more than five seconds.
        Duration::from_millis(self.provider_timeout_ms.min(5_000))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubdomainSettings {
    pub workers: usize,
    pub max_candidates: usize,
    pub dns_timeout_ms: u64,
    pub passive_timeout_ms: u64,
    pub crtsh_url: String,
    pub cache_ttl_secs: u64,
}

impl Default for SubdomainSettings {
    fn default() -> Self {
        Self {
            workers: 10,
            max_candidates: 250,
            dns_timeout_ms: 2_000,
            passive_timeout_ms: 5_000,
            crtsh_url: "https://crt.sh".to_string(),
            cache_ttl_secs: 300,
        }
    }
}

impl SubdomainSettings {
    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_timeout_ms)
    }

    pub fn passive_timeout(&self) -> Duration {
        Duration::from_millis(self.passive_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub max_entries: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { max_entries: 10_000 }
    }
}

impl Settings {
    /// Loads settings from `path`, or from the default config location when no path is given.
    ///
    /// An explicit path must exist. The default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ReconError> {
        let mut settings = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default_path = default_config_path();
                if default_path.is_file() {
                    Self::from_file(&default_path)?
                } else {
                    debug!(path = %default_path.display(), "No config file found, using defaults.");
                    Settings::default()
                }
            }
        };
        settings.apply_env(|name| std::env::var(name).ok());
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ReconError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ReconError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let settings = Self::from_toml(&raw)
            .map_err(|e| ReconError::Config(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Loaded configuration file.");
        Ok(settings)
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Overrides API keys with values from `lookup` (normally the process environment).
    /// Placeholder keys such as `YOUR_VIRUSTOTAL_API_KEY` count as missing.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let rep = &mut self.reputation;
        if let Some(key) = lookup(VIRUSTOTAL_KEY_ENV) {
            rep.virustotal_api_key = Some(key);
        }
        if let Some(key) = lookup(ABUSEIPDB_KEY_ENV) {
            rep.abuseipdb_api_key = Some(key);
        }
        if let Some(key) = lookup(IPQUALITYSCORE_KEY_ENV) {
            rep.ipqualityscore_api_key = Some(key);
        }
        rep.virustotal_api_key = usable_key(rep.virustotal_api_key.take());
        rep.abuseipdb_api_key = usable_key(rep.abuseipdb_api_key.take());
        rep.ipqualityscore_api_key = usable_key(rep.ipqualityscore_api_key.take());
    }
}

pub fn default_config_path() -> PathBuf {
    logging::get_config_dir().join(CONFIG_FILE)
}

fn usable_key(key: Option<String>) -> Option<String> {
    key.map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty() && !k.starts_with("YOUR_"))
}
