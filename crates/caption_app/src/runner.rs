use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use caption_core::{JobId, JobStatus};
use caption_engine::{DirArtifactStore, Scheduler, YtDlpExtractor};
use job_logging::{job_error, job_info};
use serde::Serialize;
use url::Url;

use crate::config::AppConfig;

/// One line of command output.
#[derive(Serialize)]
struct StatusLine<'a> {
    job_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(flatten)]
    status: &'a JobStatus,
}

pub(crate) fn build_scheduler(config: &AppConfig) -> Result<Scheduler> {
    let artifact_dir = &config.scheduler.artifact_directory;
    let extractor = YtDlpExtractor::new(config.extractor.clone(), artifact_dir.clone())
        .context("failed to start extractor runtime")?;
    let artifacts = extractor.artifact_store().clone();
    Scheduler::new(
        config.scheduler.clone(),
        Arc::new(extractor),
        Arc::new(artifacts),
    )
    .context("failed to start scheduler")
}

/// Submits every acceptable URL and prints each job's terminal status as it
/// arrives. Returns whether every URL was accepted and completed.
pub(crate) fn extract(
    scheduler: &Scheduler,
    urls: &[String],
    poll_interval: Duration,
    out: &mut impl Write,
) -> Result<bool> {
    let config = scheduler.config();
    job_info!(
        "Extracting {} URL(s) with {} workers, {} attempts each",
        urls.len(),
        config.max_concurrent_tasks,
        config.max_retries
    );

    let mut all_completed = true;
    let mut waiting: Vec<(JobId, String)> = Vec::new();
    for raw in urls {
        match validate_url(raw) {
            Ok(url) => {
                let url = String::from(url);
                waiting.push((scheduler.submit(url.clone()), url));
            }
            Err(err) => {
                job_error!("Skipping {}: {:#}", raw, err);
                all_completed = false;
            }
        }
    }

    while !waiting.is_empty() {
        let mut unfinished = Vec::with_capacity(waiting.len());
        for (job_id, url) in waiting {
            let status = scheduler.get_status(job_id.as_str());
            if status.is_terminal() {
                all_completed &= matches!(status, JobStatus::Completed { .. });
                write_line(out, job_id.as_str(), Some(&url), &status)?;
            } else {
                unfinished.push((job_id, url));
            }
        }
        waiting = unfinished;
        if !waiting.is_empty() {
            thread::sleep(poll_interval);
        }
    }

    let stats = scheduler.stats();
    job_info!(
        "Finished: {} succeeded, {} failed",
        stats.succeeded,
        stats.failed
    );
    Ok(all_completed)
}

/// Prints the status of each id. Returns whether every id was known.
pub(crate) fn status(scheduler: &Scheduler, job_ids: &[String], out: &mut impl Write) -> Result<bool> {
    let mut all_known = true;
    for job_id in job_ids {
        let status = scheduler.get_status(job_id);
        all_known &= status != JobStatus::NotFound;
        write_line(out, job_id, None, &status)?;
    }
    Ok(all_known)
}

fn validate_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("invalid URL {raw:?}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => bail!("unsupported URL scheme {other:?}"),
    }
}

fn write_line(
    out: &mut impl Write,
    job_id: &str,
    url: Option<&str>,
    status: &JobStatus,
) -> Result<()> {
    let line = serde_json::to_string(&StatusLine {
        job_id,
        url,
        status,
    })?;
    writeln!(out, "{line}").context("failed to write status line")?;
    out.flush().context("failed to flush output")
}
