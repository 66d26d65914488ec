pub mod gerrit;
pub mod github;

pub use gerrit::GerritSource;
pub use github::GithubSource;

/// Where a repository archive comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoDescriptor {
    /// Gerrit project name, e.g. `tools/build`.
    Gerrit(String),
    /// Full GitHub repository URL.
    Github(String),
}

impl RepoDescriptor {
    pub fn name(&self) -> &str {
        match self {
            Self::Gerrit(project) => project,
            Self::Github(url) => url,
        }
    }
}
