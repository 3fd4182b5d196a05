use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;

use devkit_backend::{ReleaseIndex, normalize_version};

pub const DEFAULT_MIRROR: &str = "https://nodejs.org/dist";

#[derive(Deserialize)]
struct RawEntry {
    version: String,
}

/// The `index.json` release listing published by nodejs.org and its mirrors.
#[derive(Debug, Clone)]
pub struct NodeDistIndex {
    client: reqwest::Client,
    index_url: String,
}

impl NodeDistIndex {
    /// `mirror` is the base dist URL; `None` means nodejs.org.
    #[must_use]
    pub fn new(client: reqwest::Client, mirror: Option<&str>) -> Self {
        let base = mirror
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MIRROR)
            .trim_end_matches('/');

        Self {
            client,
            index_url: format!("{base}/index.json"),
        }
    }

    #[must_use]
    pub fn index_url(&self) -> &str {
        &self.index_url
    }

    async fn fetch(&self) -> Result<Vec<String>, String> {
        let response = self
            .client
            .get(&self.index_url)
            .send()
            .await
            .map_err(|e| format!("Failed to fetch release index: {e}"))?
            .error_for_status()
            .map_err(|e| format!("Release index request failed: {e}"))?;

        let entries: Vec<RawEntry> = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse release index: {e}"))?;

        Ok(entries
            .into_iter()
            .map(|entry| normalize_version(&entry.version))
            .collect())
    }
}

#[async_trait]
impl ReleaseIndex for NodeDistIndex {
    fn source(&self) -> &str {
        &self.index_url
    }

    async fn fetch_available_versions(&self) -> Vec<String> {
        match self.fetch().await {
            Ok(versions) => {
                debug!("{} listed {} releases", self.index_url, versions.len());
                versions
            }
            Err(error) => {
                warn!("{error}");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn default_mirror_is_nodejs_org() {
        let index = NodeDistIndex::new(reqwest::Client::new(), None);
        assert_eq!(index.index_url(), "https://nodejs.org/dist/index.json");
    }

    #[test]
    fn mirror_trailing_slash_is_trimmed() {
        let index = NodeDistIndex::new(
            reqwest::Client::new(),
            Some("https://npmmirror.com/mirrors/node/"),
        );
        assert_eq!(
            index.index_url(),
            "https://npmmirror.com/mirrors/node/index.json"
        );
    }

    #[tokio::test]
    async fn maps_versions_in_index_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dist/index.json"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"[{"version":"v20.5.1","date":"2023-08-09","lts":false},
                    {"version":"v18.17.1","date":"2023-08-08","lts":"Hydrogen"}]"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let mirror = format!("{}/dist", server.uri());
        let index = NodeDistIndex::new(reqwest::Client::new(), Some(&mirror));

        assert_eq!(
            index.fetch_available_versions().await,
            vec!["v20.5.1".to_string(), "v18.17.1".to_string()]
        );
    }

    #[tokio::test]
    async fn http_error_yields_empty_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let index = NodeDistIndex::new(reqwest::Client::new(), Some(&server.uri()));

        assert!(index.fetch_available_versions().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_json_yields_empty_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let index = NodeDistIndex::new(reqwest::Client::new(), Some(&server.uri()));

        assert!(index.fetch_available_versions().await.is_empty());
    }
}
