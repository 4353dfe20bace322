//! Drives `YtDlpExtractor` against small shell scripts standing in for yt-dlp.
#![cfg(unix)]

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use caption_core::{JobId, JobStatus};
use caption_engine::{
    Extractor, ExtractorConfig, FailureKind, Scheduler, SchedulerConfig, YtDlpExtractor,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// Writes each argument after `-o` with the `%(ext)s` template resolved.
const WRITES_BOTH_LANGUAGES: &str = r#"
out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; shift; fi
  shift
done
base=$(printf '%s' "$out" | sed 's/\.%(ext)s$//')
printf 'WEBVTT\n\nhello\n' > "$base.en.vtt"
printf 'WEBVTT\n\nni hao\n' > "$base.zh.vtt"
"#;

fn script(body: &str) -> ExtractorConfig {
    ExtractorConfig {
        program: "sh".to_string(),
        program_args: vec!["-c".to_string(), body.to_string(), "yt-dlp".to_string()],
        ..ExtractorConfig::default()
    }
}

fn extractor(config: ExtractorConfig, dir: &Path) -> YtDlpExtractor {
    job_logging::initialize_for_tests();
    YtDlpExtractor::new(config, dir).unwrap()
}

#[test]
fn picks_first_preferred_language() {
    let temp = TempDir::new().unwrap();
    let id = JobId::generate();
    let extraction = extractor(script(WRITES_BOTH_LANGUAGES), temp.path())
        .extract("https://video.example/watch?v=1", &id)
        .unwrap();

    assert_eq!(extraction.content, "WEBVTT\n\nni hao\n");
    assert_eq!(extraction.path, temp.path().join(format!("{id}.zh.vtt")));
}

#[test]
fn language_preference_is_configurable() {
    let temp = TempDir::new().unwrap();
    let id = JobId::generate();
    let config = ExtractorConfig {
        languages: vec!["en".to_string(), "zh".to_string()],
        ..script(WRITES_BOTH_LANGUAGES)
    };
    let extraction = extractor(config, temp.path())
        .extract("https://video.example/watch?v=1", &id)
        .unwrap();

    assert_eq!(extraction.path, temp.path().join(format!("{id}.en.vtt")));
}

#[test]
fn no_output_files_means_no_captions() {
    let temp = TempDir::new().unwrap();
    let err = extractor(script("exit 0"), temp.path())
        .extract("https://video.example/silent", &JobId::generate())
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::NoCaptions);
    assert_eq!(err.message, "No subtitles generated");
}

#[test]
fn empty_output_files_are_rejected() {
    let temp = TempDir::new().unwrap();
    let body = r#"
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; shift; fi
  shift
done
: > "$(printf '%s' "$out" | sed 's/\.%(ext)s$//').en.vtt"
"#;
    let err = extractor(script(body), temp.path())
        .extract("https://video.example/blank", &JobId::generate())
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::EmptyContent);
}

#[test]
fn failing_process_reports_last_stderr_line() {
    let temp = TempDir::new().unwrap();
    let body = "echo 'WARNING: retrying' >&2; echo 'ERROR: Unsupported URL' >&2; exit 1";
    let err = extractor(script(body), temp.path())
        .extract("https://video.example/bad", &JobId::generate())
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::Process);
    assert_eq!(err.message, "ERROR: Unsupported URL");
}

#[test]
fn missing_program_is_a_process_failure() {
    let temp = TempDir::new().unwrap();
    let config = ExtractorConfig {
        program: "caption-extractor-that-does-not-exist".to_string(),
        ..ExtractorConfig::default()
    };
    let err = extractor(config, temp.path())
        .extract("https://video.example/any", &JobId::generate())
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::Process);
    assert!(err.message.starts_with("failed to start"), "{}", err.message);
}

#[test]
fn hung_process_times_out() {
    let temp = TempDir::new().unwrap();
    let config = ExtractorConfig {
        timeout_seconds: 0.2,
        ..script("sleep 5")
    };
    let started = Instant::now();
    let err = extractor(config, temp.path())
        .extract("https://video.example/hang", &JobId::generate())
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::Timeout);
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[test]
fn scheduled_job_completes_and_survives_restart() {
    let temp = TempDir::new().unwrap();
    let scheduler_config = SchedulerConfig {
        retry_delay_seconds: 0.0,
        artifact_directory: temp.path().to_path_buf(),
        ..SchedulerConfig::default()
    };

    let live_extractor = extractor(script(WRITES_BOTH_LANGUAGES), temp.path());
    let artifacts = Arc::new(live_extractor.artifact_store().clone());
    let scheduler = Scheduler::new(
        scheduler_config.clone(),
        Arc::new(live_extractor),
        artifacts,
    )
    .unwrap();
    let id = scheduler.submit("https://video.example/watch?v=2");

    let deadline = Instant::now() + Duration::from_secs(10);
    let status = loop {
        let status = scheduler.get_status(id.as_str());
        if status.is_terminal() {
            break status;
        }
        assert!(Instant::now() < deadline, "job never finished");
        thread::sleep(Duration::from_millis(10));
    };
    let expected = JobStatus::Completed {
        content: "WEBVTT\n\nni hao\n".to_string(),
        path: temp.path().join(format!("{id}.zh.vtt")).display().to_string(),
    };
    assert_eq!(status, expected);
    drop(scheduler);

    // Both caption files are on disk; recovery must pick the same variant.
    let restarted_extractor = extractor(script("exit 1"), temp.path());
    let artifacts = Arc::new(restarted_extractor.artifact_store().clone());
    let restarted =
        Scheduler::new(scheduler_config, Arc::new(restarted_extractor), artifacts).unwrap();
    assert_eq!(restarted.get_status(id.as_str()), expected);
}
