// src/core/subdomain/candidates.rs

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::knowledge_base::COMMON_SUBDOMAINS;

/// A passive source of names under a domain, such as certificate transparency logs.
#[async_trait]
pub trait PassiveSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fully qualified names the source knows about. May include names outside `domain`;
    /// the generator filters them.
    async fn names(&self, domain: &str) -> Result<Vec<String>, String>;
}

#[derive(Debug, Deserialize)]
struct CrtShEntry {
    #[serde(default)]
    name_value: String,
}

/// crt.sh certificate transparency search.
pub struct CrtShSource {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl CrtShSource {
    pub fn new(http: reqwest::Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl PassiveSource for CrtShSource {
    fn name(&self) -> &'static str {
        "crt.sh"
    }

    async fn names(&self, domain: &str) -> Result<Vec<String>, String> {
        let response = self
            .http
            .get(format!("{}/", self.base_url))
            .query(&[("q", format!("%.{}", domain)), ("output", "json".to_string())])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("unexpected status {}", response.status()));
        }
        let entries: Vec<CrtShEntry> = response.json().await.map_err(|e| e.to_string())?;
        // One certificate can list several names separated by newlines.
        Ok(entries
            .iter()
            .flat_map(|e| e.name_value.split('\n'))
            .map(str::to_string)
            .collect())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VtSubdomainList {
    data: Vec<VtSubdomain>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VtSubdomain {
    id: String,
}

/// VirusTotal's subdomain relationship. Only active when an API key is configured.
pub struct VirusTotalSubdomains {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl VirusTotalSubdomains {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: String, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
        }
    }
}

#[async_trait]
impl PassiveSource for VirusTotalSubdomains {
    fn name(&self) -> &'static str {
        "virustotal"
    }

    async fn names(&self, domain: &str) -> Result<Vec<String>, String> {
        let response = self
            .http
            .get(format!("{}/api/v3/domains/{}/subdomains", self.base_url, domain))
            .query(&[("limit", "40")])
            .header("x-apikey", &self.api_key)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("unexpected status {}", response.status()));
        }
        let list: VtSubdomainList = response.json().await.map_err(|e| e.to_string())?;
        Ok(list.data.into_iter().map(|d| d.id).collect())
    }
}

/// Label of `name` relative to `domain`, if `name` is a proper, non-wildcard subdomain.
pub fn label_for(name: &str, domain: &str) -> Option<String> {
    let name = name.trim().trim_end_matches('.').to_ascii_lowercase();
    let label = name.strip_suffix(domain)?.strip_suffix('.')?;
    let valid = !label.is_empty()
        && !label.starts_with('.')
        && !label.split('.').any(str::is_empty)
        && label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    valid.then(|| label.to_string())
}

/// Builds the candidate label list: the common wordlist first, then every passive label
/// not already present, sorted. A failing passive source contributes nothing.
pub async fn generate_candidates(
    domain: &str,
    sources: &[Arc<dyn PassiveSource>],
    timeout: Duration,
) -> Vec<String> {
    let lookups = sources.iter().map(|source| async move {
        match tokio::time::timeout(timeout, source.names(domain)).await {
            Ok(Ok(names)) => {
                debug!(source = source.name(), count = names.len(), "Passive source answered.");
                names
            }
            Ok(Err(e)) => {
                warn!(source = source.name(), error = %e, "Passive source failed.");
                Vec::new()
            }
            Err(_) => {
                warn!(source = source.name(), "Passive source timed out.");
                Vec::new()
            }
        }
    });
    let passive: BTreeSet<String> = join_all(lookups)
        .await
        .into_iter()
        .flatten()
        .filter_map(|name| label_for(&name, domain))
        .collect();

    let mut seen = HashSet::new();
    let candidates: Vec<String> = COMMON_SUBDOMAINS
        .iter()
        .map(|s| s.to_string())
        .chain(passive)
        .filter(|label| seen.insert(label.clone()))
        .collect();

    info!(domain, candidates = candidates.len(), "Subdomain candidates generated.");
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn labels_are_relative_and_wildcards_dropped() {
        assert_eq!(label_for("api.example.com", "example.com"), Some("api".into()));
        assert_eq!(label_for("A.B.Example.com.", "example.com"), Some("a.b".into()));
        assert_eq!(label_for("*.example.com", "example.com"), None);
        assert_eq!(label_for("example.com", "example.com"), None);
        assert_eq!(label_for("api.notexample.com", "example.com"), None);
        assert_eq!(label_for("badexample.com", "example.com"), None);
    }

    #[tokio::test]
    async fn crtsh_names_are_split_on_newlines() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "%.example.com"))
            .and(query_param("output", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "name_value": "vpn.example.com\n*.example.com" },
                { "name_value": "git.example.com" }
            ])))
            .mount(&server)
            .await;

        let source = CrtShSource::new(reqwest::Client::new(), &server.uri(), Duration::from_secs(2));
        let names = source.names("example.com").await.unwrap();
        assert_eq!(names, vec!["vpn.example.com", "*.example.com", "git.example.com"]);
    }

    #[tokio::test]
    async fn virustotal_subdomains_use_the_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/domains/example.com/subdomains"))
            .and(header("x-apikey", "vt-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "id": "ci.example.com" }, { "id": "www.example.com" }]
            })))
            .mount(&server)
            .await;

        let source = VirusTotalSubdomains::new(
            reqwest::Client::new(),
            &server.uri(),
            "vt-key".to_string(),
            Duration::from_secs(2),
        );
        assert_eq!(
            source.names("example.com").await.unwrap(),
            vec!["ci.example.com", "www.example.com"]
        );
    }

    struct Broken;

    #[async_trait]
    impl PassiveSource for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn names(&self, _domain: &str) -> Result<Vec<String>, String> {
            Err("connection reset".to_string())
        }
    }

    struct Listed(Vec<&'static str>);

    #[async_trait]
    impl PassiveSource for Listed {
        fn name(&self) -> &'static str {
            "listed"
        }

        async fn names(&self, _domain: &str) -> Result<Vec<String>, String> {
            Ok(self.0.iter().map(|s| s.to_string()).collect())
        }
    }

    #[tokio::test]
    async fn candidates_are_deduplicated_with_common_labels_first() {
        let sources: Vec<Arc<dyn PassiveSource>> = vec![
            Arc::new(Broken),
            Arc::new(Listed(vec!["zeta.example.com", "www.example.com", "ci.example.com", "*.example.com"])),
        ];
        let candidates = generate_candidates("example.com", &sources, Duration::from_secs(1)).await;

        assert_eq!(candidates[0], "www");
        assert_eq!(candidates.len(), COMMON_SUBDOMAINS.len() + 2);
        assert_eq!(&candidates[COMMON_SUBDOMAINS.len()..], &["ci", "zeta"]);
        assert_eq!(candidates.iter().filter(|c| *c == "www").count(), 1);
    }
}
