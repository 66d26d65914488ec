use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use tracing::debug;

use crate::config::GerritConfig;
use crate::error::SourceError;

/// Client for a Gerrit server: project listing via the REST API, archive
/// download via the gitiles plugin.
pub struct GerritSource {
    base_url: String,
    token: String,
    client: Client,
}

impl GerritSource {
    pub fn new(config: &GerritConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to build HTTP client");

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            client,
        }
    }

    pub async fn list_projects(&self) -> Result<Vec<String>, SourceError> {
        let response = self
            .client
            .get(format!("{}/a/projects/", self.base_url))
            .header(AUTHORIZATION, format!("Basic {}", self.token))
            .send()
            .await
            .map_err(|err| SourceError::Unavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(SourceError::Unavailable(format!(
                "project listing returned {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|err| SourceError::Unavailable(err.to_string()))?;
        let projects = parse_project_listing(&body)?;
        debug!(count = projects.len(), "listed gerrit projects");
        Ok(projects)
    }

    /// Downloads the project's master branch as a tar.gz archive. An empty
    /// body means there is nothing to index.
    pub async fn fetch_archive(&self, project: &str) -> Result<Vec<u8>, SourceError> {
        let url = format!(
            "{}/a/plugins/gitiles/{project}/+archive/refs/heads/master.tar.gz",
            self.base_url
        );
        let fetch_err = |reason: String| SourceError::Fetch {
            repo: project.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Basic {}", self.token))
            .send()
            .await
            .map_err(|err| fetch_err(err.to_string()))?;

        if !response.status().is_success() {
            return Err(fetch_err(format!("archive returned {}", response.status())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| fetch_err(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Gerrit prefixes JSON responses with an XSSI guard line; strip it before
/// parsing. The listing maps project names to project info.
fn parse_project_listing(body: &str) -> Result<Vec<String>, serde_json::Error> {
    let json = body
        .strip_prefix(")]}'")
        .map(str::trim_start)
        .unwrap_or(body);
    let projects: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)?;
    Ok(projects.into_keys().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_strips_xssi_guard() {
        let body = ")]}'\n{\"tools/build\":{\"id\":\"tools%2Fbuild\"},\"docs\":{}}";
        let projects = parse_project_listing(body).unwrap();
        assert_eq!(projects, vec!["docs".to_string(), "tools/build".to_string()]);
    }

    #[test]
    fn listing_without_guard_still_parses() {
        let projects = parse_project_listing("{\"alpha\":{}}").unwrap();
        assert_eq!(projects, vec!["alpha".to_string()]);
    }

    #[test]
    fn malformed_listing_is_an_error() {
        assert!(parse_project_listing("not json").is_err());
    }
}
