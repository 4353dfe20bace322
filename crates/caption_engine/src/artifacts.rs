use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::filename::{is_partial, language_of, matches_prefix};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("artifact directory missing or not writable: {0}")]
    ArtifactDir(String),
    #[error("artifact {0:?} is not valid UTF-8")]
    NotUtf8(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactEntry {
    pub path: PathBuf,
    pub file_name: String,
}

/// Durable store of extracted captions, probed during reconciliation.
pub trait ArtifactStore: Send + Sync {
    /// Artifacts named `prefix` or `prefix.*`, best candidate first.
    fn list_matching(&self, prefix: &str) -> Result<Vec<ArtifactEntry>, StoreError>;

    fn read(&self, path: &Path) -> Result<String, StoreError>;
}

/// Ensure the artifact directory exists; create if missing.
pub fn ensure_artifact_dir(dir: &Path) -> Result<(), StoreError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| StoreError::ArtifactDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(StoreError::ArtifactDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| StoreError::ArtifactDir(e.to_string()))?;
    }
    // Writability probe: the temp file is removed when dropped.
    NamedTempFile::new_in(dir).map_err(|e| StoreError::ArtifactDir(e.to_string()))?;
    Ok(())
}

/// Artifact store rooted at a single flat directory.
///
/// Listings are ordered by the position of each file's language in the
/// preference list, then by file name; languages not in the list come last.
#[derive(Debug, Clone)]
pub struct DirArtifactStore {
    root: PathBuf,
    languages: Vec<String>,
}

impl DirArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            languages: Vec::new(),
        }
    }

    /// Lists `{id}.{language}.{ext}` files in this language order.
    pub fn with_language_preference(mut self, languages: Vec<String>) -> Self {
        self.languages = languages;
        self
    }

    fn language_rank(&self, file_name: &str, prefix: &str) -> usize {
        language_of(file_name, prefix)
            .and_then(|lang| self.languages.iter().position(|wanted| wanted == lang))
            .unwrap_or(self.languages.len())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Atomically write `content` to `{root}/{file_name}` (temp file, fsync, rename).
    pub fn write(&self, file_name: &str, content: &str) -> Result<PathBuf, StoreError> {
        ensure_artifact_dir(&self.root)?;

        let target = self.root.join(file_name);
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        tmp.persist(&target).map_err(|e| StoreError::Io(e.error))?;
        Ok(target)
    }
}

impl ArtifactStore for DirArtifactStore {
    fn list_matching(&self, prefix: &str) -> Result<Vec<ArtifactEntry>, StoreError> {
        let dir = match fs::read_dir(&self.root) {
            Ok(dir) => dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut entries = Vec::new();
        for entry in dir {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !matches_prefix(&file_name, prefix) || is_partial(&file_name) {
                continue;
            }
            let meta = entry.metadata()?;
            if !meta.is_file() {
                continue;
            }
            entries.push(ArtifactEntry {
                path: entry.path(),
                file_name,
            });
        }
        entries.sort_by_cached_key(|entry| {
            (
                self.language_rank(&entry.file_name, prefix),
                entry.file_name.clone(),
            )
        });
        Ok(entries)
    }

    fn read(&self, path: &Path) -> Result<String, StoreError> {
        let bytes = fs::read(path)?;
        String::from_utf8(bytes).map_err(|_| StoreError::NotUtf8(path.to_path_buf()))
    }
}
