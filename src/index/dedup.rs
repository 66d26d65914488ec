use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use sha2::{Digest, Sha256};

/// Deterministic identity for one file revision. Repository name, path and
/// content all participate (domain-separated), so moving a file, renaming the
/// repository or changing a single byte each yield a new identity.
pub fn file_identity(repo_name: &str, file_path: &str, content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(repo_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(file_path.as_bytes());
    hasher.update([0u8]);
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Process-local record of already-indexed file identities. Grows
/// monotonically and is never persisted: a restarted process re-embeds
/// whatever it sees again.
#[derive(Debug, Default)]
pub struct SeenSet {
    inner: Mutex<HashSet<String>>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims an identity. Returns `true` when it was not seen before. The
    /// check and the insert happen under one lock, so two concurrent tasks
    /// can never both claim the same identity.
    pub fn insert(&self, identity: &str) -> bool {
        self.lock().insert(identity.to_string())
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.lock().contains(identity)
    }

    /// Releases a claim, letting a later pass retry a file that failed after
    /// claiming its identity.
    pub fn remove(&self, identity: &str) {
        self.lock().remove(identity);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
