use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use caption_core::JobId;
use job_logging::{job_debug, job_warn};
use tokio::process::Command;
use tokio::runtime::Runtime;

use crate::filename::output_template;
use crate::{
    ArtifactStore, DirArtifactStore, ExtractError, Extraction, Extractor, ExtractorConfig,
    FailureKind,
};

/// Extractor that shells out to `yt-dlp` and picks up the caption files it writes.
///
/// Every invocation runs on a small runtime owned by the extractor so that the
/// timeout can kill a hung child process; callers stay synchronous.
pub struct YtDlpExtractor {
    config: ExtractorConfig,
    artifacts: DirArtifactStore,
    runtime: Runtime,
}

impl YtDlpExtractor {
    pub fn new(config: ExtractorConfig, artifact_dir: impl Into<PathBuf>) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("caption-ytdlp")
            .enable_all()
            .build()?;
        let artifacts =
            DirArtifactStore::new(artifact_dir).with_language_preference(config.languages.clone());
        Ok(Self {
            config,
            artifacts,
            runtime,
        })
    }

    /// Store over the extractor's output, ordered by its language preference.
    ///
    /// Hand this to the scheduler so that reconciliation picks the same
    /// caption variant the extractor would.
    pub fn artifact_store(&self) -> &DirArtifactStore {
        &self.artifacts
    }

    fn command_args(&self, url: &str, job_id: &JobId) -> Vec<String> {
        let output = self.artifacts.root().join(output_template(job_id));
        vec![
            "--skip-download".to_string(),
            "--write-subs".to_string(),
            "--write-auto-subs".to_string(),
            "--sub-langs".to_string(),
            self.config.languages.join(","),
            "--no-progress".to_string(),
            "--quiet".to_string(),
            "-o".to_string(),
            output.display().to_string(),
            "--".to_string(),
            url.to_string(),
        ]
    }

    async fn run(&self, url: &str, job_id: &JobId) -> Result<(), ExtractError> {
        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.program_args)
            .args(self.command_args(url, job_id))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|err| {
            ExtractError::new(
                FailureKind::Process,
                format!("failed to start {}: {err}", self.config.program),
            )
        })?;

        let timeout = self.config.timeout();
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|err| ExtractError::new(FailureKind::Io, err.to_string()))?,
            Err(_) => {
                return Err(ExtractError::new(
                    FailureKind::Timeout,
                    format!("extraction timed out after {timeout:?}"),
                ))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr
                .lines()
                .rev()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(ToOwned::to_owned)
                .unwrap_or_else(|| format!("{} exited with {}", self.config.program, output.status));
            return Err(ExtractError::new(FailureKind::Process, message));
        }
        Ok(())
    }

    /// First readable, non-empty caption file; the listing is already in language order.
    fn select_artifact(&self, job_id: &JobId) -> Result<Extraction, ExtractError> {
        let entries = self
            .artifacts
            .list_matching(job_id.as_str())
            .map_err(|err| ExtractError::new(FailureKind::Io, err.to_string()))?;
        if entries.is_empty() {
            return Err(ExtractError::new(
                FailureKind::NoCaptions,
                "No subtitles generated",
            ));
        }

        for entry in entries {
            match self.artifacts.read(&entry.path) {
                Ok(content) if !content.trim().is_empty() => {
                    return Ok(Extraction {
                        content,
                        path: entry.path,
                    })
                }
                Ok(_) => job_debug!("Skipping empty caption file {}", entry.path.display()),
                Err(err) => job_warn!(
                    "Skipping unreadable caption file {}: {}",
                    entry.path.display(),
                    err
                ),
            }
        }

        Err(ExtractError::new(
            FailureKind::EmptyContent,
            "Subtitle files are empty or unreadable",
        ))
    }
}

impl Extractor for YtDlpExtractor {
    fn extract(&self, url: &str, job_id: &JobId) -> Result<Extraction, ExtractError> {
        job_debug!("Running {} for {}", self.config.program, url);
        self.runtime.block_on(self.run(url, job_id))?;
        self.select_artifact(job_id)
    }
}
