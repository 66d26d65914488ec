use std::time::Duration;

use reqwest::Client;

use crate::error::SourceError;

/// Downloads public GitHub repositories as zip archives of the master branch.
pub struct GithubSource {
    client: Client,
}

impl GithubSource {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .user_agent("repolens")
            .build()
            .expect("failed to build HTTP client");

        Self { client }
    }

    /// An empty body means there is nothing to index.
    pub async fn fetch_archive(&self, repo_url: &str) -> Result<Vec<u8>, SourceError> {
        let url = archive_url(repo_url);
        let fetch_err = |reason: String| SourceError::Fetch {
            repo: repo_url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
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

impl Default for GithubSource {
    fn default() -> Self {
        Self::new()
    }
}

fn archive_url(repo_url: &str) -> String {
    format!(
        "{}/archive/refs/heads/master.zip",
        repo_url.trim_end_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_url_shape() {
        assert_eq!(
            archive_url("https://github.com/backstage/backstage"),
            "https://github.com/backstage/backstage/archive/refs/heads/master.zip"
        );
        assert_eq!(
            archive_url("https://github.com/grafana/k6/"),
            "https://github.com/grafana/k6/archive/refs/heads/master.zip"
        );
    }
}
