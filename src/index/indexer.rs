use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::config::Settings;
use crate::embedder::Embedder;
use crate::error::{EmbeddingError, IndexError, SourceError};
use crate::index::archive::{self, ArchiveFormat};
use crate::index::chunker::{file_type, Chunker};
use crate::index::dedup::{content_hash, file_identity, SeenSet};
use crate::source::{GerritSource, GithubSource, RepoDescriptor};
use crate::store::{ChunkMetadata, VectorStore};

/// Extensions considered indexable text. Everything else is skipped silently.
const TEXT_EXTENSIONS: &[&str] = &[
    "py", "rs", "go", "java", "c", "cc", "cpp", "h", "hpp", "js", "ts", "tsx", "jsx", "cs", "rb",
    "php", "sh", "css", "html", "yaml", "yml", "json", "toml", "xml", "csv", "log", "txt",
    "config", "env", "md",
];

const EMBED_BATCH: usize = 32;

/// Orchestrates one repository: fetch, extract into scoped scratch space,
/// then chunk + embed + deduplicate every file concurrently and batch-write
/// the results to the vector store.
pub struct RepositoryIndexer {
    gerrit: Option<GerritSource>,
    github: GithubSource,
    github_repos: Vec<String>,
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    seen: Arc<SeenSet>,
    repo_gate: Arc<Semaphore>,
    file_concurrency: usize,
}

/// Outcome of one full pass over every configured source.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexReport {
    pub repos_indexed: usize,
    pub repos_failed: usize,
    pub files_indexed: usize,
    pub chunks_written: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RepoStats {
    pub files_indexed: usize,
    pub chunks_written: usize,
}

/// Everything one file contributes to the store, written in a single call.
struct FileBatch {
    documents: Vec<String>,
    embeddings: Vec<Vec<f32>>,
    metadatas: Vec<ChunkMetadata>,
}

impl RepositoryIndexer {
    pub fn new(
        settings: &Settings,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        seen: Arc<SeenSet>,
    ) -> Self {
        Self {
            gerrit: settings
                .gerrit
                .enabled
                .then(|| GerritSource::new(&settings.gerrit)),
            github: GithubSource::new(),
            github_repos: settings.github.repos.clone(),
            chunker: Chunker::new(&settings.chunking),
            embedder,
            store,
            seen,
            repo_gate: Arc::new(Semaphore::new(settings.indexing.max_concurrent_repos.max(1))),
            file_concurrency: settings.indexing.max_concurrent_files.max(1),
        }
    }

    /// Indexes every configured repository from both source kinds under one
    /// shared admission gate. A repository failure never aborts the others;
    /// a pass with any failure is reported as failed once all are done.
    pub async fn index_all(&self) -> Result<IndexReport, IndexError> {
        let mut descriptors: Vec<RepoDescriptor> = Vec::new();

        if let Some(gerrit) = &self.gerrit {
            let projects = gerrit.list_projects().await?;
            descriptors.extend(projects.into_iter().map(RepoDescriptor::Gerrit));
        }
        descriptors.extend(
            self.github_repos
                .iter()
                .cloned()
                .map(RepoDescriptor::Github),
        );

        if descriptors.is_empty() {
            info!("no repositories configured, nothing to index");
            return Ok(IndexReport::default());
        }

        let total = descriptors.len();
        let tasks = descriptors.into_iter().map(|descriptor| {
            let gate = Arc::clone(&self.repo_gate);
            async move {
                let _permit = gate.acquire().await.expect("repo gate never closes");
                let result = self.index_repository(&descriptor).await;
                (descriptor, result)
            }
        });
        let outcomes = join_all(tasks).await;

        let mut report = IndexReport::default();
        for (descriptor, result) in outcomes {
            match result {
                Ok(stats) => {
                    report.repos_indexed += 1;
                    report.files_indexed += stats.files_indexed;
                    report.chunks_written += stats.chunks_written;
                }
                Err(err) => {
                    report.repos_failed += 1;
                    error!(repo = descriptor.name(), "repository indexing failed: {err}");
                }
            }
        }

        if report.repos_failed > 0 {
            return Err(IndexError::Partial {
                failed: report.repos_failed,
                total,
            });
        }
        Ok(report)
    }

    /// Fetches and indexes a single repository. Failures are logged with
    /// repository context and propagated; an empty archive payload is not an
    /// error.
    pub async fn index_repository(
        &self,
        descriptor: &RepoDescriptor,
    ) -> Result<RepoStats, IndexError> {
        let repo_name = descriptor.name();
        info!(repo = repo_name, "indexing repository");

        let result = self.fetch_and_index(descriptor, repo_name).await;
        match &result {
            Ok(stats) => info!(
                repo = repo_name,
                files = stats.files_indexed,
                chunks = stats.chunks_written,
                "repository indexed"
            ),
            Err(err) => error!(repo = repo_name, "repository indexing failed: {err}"),
        }
        result
    }

    async fn fetch_and_index(
        &self,
        descriptor: &RepoDescriptor,
        repo_name: &str,
    ) -> Result<RepoStats, IndexError> {
        let (bytes, format) = match descriptor {
            RepoDescriptor::Gerrit(project) => {
                let gerrit = self.gerrit.as_ref().ok_or_else(|| {
                    SourceError::Unavailable("gerrit source not configured".to_string())
                })?;
                (gerrit.fetch_archive(project).await?, ArchiveFormat::TarGz)
            }
            RepoDescriptor::Github(url) => {
                (self.github.fetch_archive(url).await?, ArchiveFormat::Zip)
            }
        };

        if bytes.is_empty() {
            info!(repo = repo_name, "empty archive payload, nothing to index");
            return Ok(RepoStats::default());
        }

        // Scratch space is dropped (and deleted) on every exit path.
        let scratch = tempfile::tempdir()?;
        let archive_path = scratch.path().join(match format {
            ArchiveFormat::TarGz => "repo.tar.gz",
            ArchiveFormat::Zip => "repo.zip",
        });
        tokio::fs::write(&archive_path, &bytes).await?;
        drop(bytes);

        let extract_root = scratch.path().join("extracted");
        {
            let archive_path = archive_path.clone();
            let extract_root = extract_root.clone();
            tokio::task::spawn_blocking(move || {
                archive::extract(&archive_path, format, &extract_root)
            })
            .await
            .map_err(|err| IndexError::Io(std::io::Error::other(err)))??;
        }

        self.index_directory(&extract_root, repo_name).await
    }

    /// Indexes every regular file under `root`, fanning out one bounded task
    /// per file and writing one store batch per file that produced chunks.
    pub async fn index_directory(
        &self,
        root: &Path,
        repo_name: &str,
    ) -> Result<RepoStats, IndexError> {
        let gate = Arc::new(Semaphore::new(self.file_concurrency));
        let mut tasks = Vec::new();

        for entry in WalkDir::new(root) {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            let relative = match path.strip_prefix(root) {
                Ok(stripped) => stripped.to_string_lossy().into_owned(),
                Err(_) => path.to_string_lossy().into_owned(),
            };

            let gate = Arc::clone(&gate);
            tasks.push(async move {
                let _permit = gate.acquire().await.expect("file gate never closes");
                self.process_file(&path, &relative, repo_name).await
            });
        }

        let results = join_all(tasks).await;

        let mut stats = RepoStats::default();
        for batch in results.into_iter().flatten() {
            stats.files_indexed += 1;
            stats.chunks_written += batch.documents.len();
            self.store
                .add_documents(batch.documents, batch.embeddings, batch.metadatas)
                .await?;
        }
        Ok(stats)
    }

    /// One file's pipeline. Failures here are absorbed: the file contributes
    /// no chunks and its identity claim is released so a later pass can retry.
    async fn process_file(&self, path: &Path, relative: &str, repo_name: &str) -> Option<FileBatch> {
        let extension = file_type(relative);
        if !TEXT_EXTENSIONS.contains(&extension) {
            return None;
        }

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(file = relative, "failed to read file: {err}");
                return None;
            }
        };

        let Some(content) = decode_text(&bytes) else {
            warn!(file = relative, "undecodable content, skipping");
            return None;
        };

        let identity = file_identity(repo_name, relative, &bytes);
        if !self.seen.insert(&identity) {
            debug!(file = relative, "already indexed, skipping");
            return None;
        }

        match self
            .embed_file(relative, repo_name, &content, &bytes, &identity, extension)
            .await
        {
            Ok(batch) => batch,
            Err(err) => {
                self.seen.remove(&identity);
                warn!(file = relative, repo = repo_name, "file skipped: {err}");
                None
            }
        }
    }

    async fn embed_file(
        &self,
        relative: &str,
        repo_name: &str,
        content: &str,
        bytes: &[u8],
        identity: &str,
        extension: &str,
    ) -> Result<Option<FileBatch>, EmbeddingError> {
        let chunks = self.chunker.chunk(content, relative);
        if chunks.is_empty() {
            return Ok(None);
        }

        let documents: Vec<String> = chunks.iter().map(|chunk| chunk.content.clone()).collect();
        let mut embeddings = Vec::with_capacity(documents.len());
        for batch in documents.chunks(EMBED_BATCH) {
            embeddings.extend(self.embedder.embed_batch(batch).await?);
        }

        let hash = content_hash(bytes);
        let indexed_at = Utc::now();
        let metadatas = chunks
            .iter()
            .map(|chunk| ChunkMetadata {
                file_path: chunk.file_path.clone(),
                repo_name: repo_name.to_string(),
                file_type: extension.to_string(),
                file_identity: identity.to_string(),
                content_hash: hash.clone(),
                start_offset: chunk.start_offset,
                indexed_at,
            })
            .collect();

        Ok(Some(FileBatch {
            documents,
            embeddings,
            metadatas,
        }))
    }
}

/// UTF-8 first, Latin-1 as fallback. Content with NUL bytes is treated as
/// binary and rejected.
fn decode_text(bytes: &[u8]) -> Option<String> {
    if bytes.contains(&0) {
        return None;
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => Some(text.to_string()),
        Err(_) => Some(bytes.iter().map(|&b| b as char).collect()),
    }
}
