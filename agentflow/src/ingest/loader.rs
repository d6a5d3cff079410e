//! Loads text documents from disk.

use crate::errors::IngestError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Extensions loaded when none are configured.
pub const DEFAULT_EXTENSIONS: [&str; 2] = ["txt", "md"];

/// A loaded source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Source-derived identifier, stable across runs and edits.
    pub id: String,
    /// Where the document was loaded from.
    pub source: String,
    /// Full UTF-8 text.
    pub content: String,
}

impl Document {
    /// Creates a document, deriving its id from the source.
    #[must_use]
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        let source = source.into();
        let content = content.into();
        Self {
            id: document_id(&source),
            source,
            content,
        }
    }
}

fn document_id(source: &str) -> String {
    let digest = Sha256::digest(source.as_bytes());
    hex::encode(&digest[..16])
}

/// Walks a directory and loads matching files as [`Document`]s.
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    extensions: BTreeSet<String>,
    recursive: bool,
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            recursive: false,
        }
    }
}

impl DocumentLoader {
    /// Creates a loader for `.txt` and `.md` files in the top directory only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the extension filter. Leading dots are ignored.
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    /// Enables or disables descending into subdirectories.
    #[must_use]
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Returns true if the path's extension passes the filter.
    #[must_use]
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.contains(&e.to_ascii_lowercase()))
    }

    /// Loads a single file.
    pub async fn load_file(&self, path: &Path) -> Result<Document, IngestError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| IngestError::io(path, e))?;
        Ok(Document::new(path.display().to_string(), content))
    }

    /// Loads every matching file under `dir`, sorted by path.
    ///
    /// Fails only if `dir` itself cannot be read. Files that cannot be read
    /// or are not valid UTF-8 are skipped with a warning.
    pub async fn load_dir(&self, dir: &Path) -> Result<Vec<Document>, IngestError> {
        let mut files = Vec::new();
        let mut pending = vec![dir.to_path_buf()];
        let mut is_root = true;

        while let Some(current) = pending.pop() {
            match self.scan(&current, &mut files, &mut pending).await {
                Ok(()) => {}
                Err(e) if is_root => return Err(IngestError::io(current, e)),
                Err(e) => warn!(path = %current.display(), error = %e, "Skipping unreadable directory"),
            }
            is_root = false;
        }
        files.sort();

        let mut documents = Vec::with_capacity(files.len());
        for path in files {
            match self.load_file(&path).await {
                Ok(document) => documents.push(document),
                Err(e) => warn!(error = %e, "Skipping unreadable file"),
            }
        }
        info!(dir = %dir.display(), documents = documents.len(), "Loaded documents");
        Ok(documents)
    }

    async fn scan(
        &self,
        dir: &Path,
        files: &mut Vec<PathBuf>,
        pending: &mut Vec<PathBuf>,
    ) -> std::io::Result<()> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                if self.recursive {
                    pending.push(path);
                }
            } else if self.accepts(&path) {
                files.push(path);
            } else {
                debug!(path = %path.display(), "Ignoring file with unsupported extension");
            }
        }
        Ok(())
    }
}
