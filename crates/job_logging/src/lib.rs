#![deny(missing_docs)]
//! Shared logging utilities for the caption workspace.
//!
//! This crate provides the `job_*` logging macros used across the codebase,
//! a per-thread job context that prefixes messages logged while a job body is
//! running, and a minimal test initializer for the global logger.

use std::cell::RefCell;
use std::fmt;

pub use log::Level;

thread_local! {
    /// Identifier of the job currently executing on this thread, if any.
    static CURRENT_JOB: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Guard returned by [`enter_job`]; restores the previous context on drop.
#[must_use = "the job context is left as soon as the guard is dropped"]
pub struct JobContext {
    previous: Option<String>,
}

impl Drop for JobContext {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_JOB.with(|slot| *slot.borrow_mut() = previous);
    }
}

/// Marks the current thread as executing `job_id` until the guard is dropped.
///
/// Every `job_*` macro invoked on this thread in the meantime prefixes its
/// message with `[job <id>]`. Contexts nest: dropping an inner guard restores
/// the outer job.
pub fn enter_job(job_id: impl Into<String>) -> JobContext {
    let job_id = job_id.into();
    let previous = CURRENT_JOB.with(|slot| slot.borrow_mut().replace(job_id));
    JobContext { previous }
}

/// Returns the job identifier of the current thread's context, if any.
pub fn current_job() -> Option<String> {
    CURRENT_JOB.with(|slot| slot.borrow().clone())
}

#[doc(hidden)]
pub fn __log(level: Level, target: &str, args: fmt::Arguments<'_>) {
    CURRENT_JOB.with(|slot| match slot.borrow().as_deref() {
        Some(job_id) => log::log!(target: target, level, "[job {job_id}] {args}"),
        None => log::log!(target: target, level, "{args}"),
    });
}

/// Logs a trace-level message, prefixed with the current job if any.
#[macro_export]
macro_rules! job_trace {
    ($($arg:tt)*) => {{
        $crate::__log($crate::Level::Trace, module_path!(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message, prefixed with the current job if any.
#[macro_export]
macro_rules! job_debug {
    ($($arg:tt)*) => {{
        $crate::__log($crate::Level::Debug, module_path!(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message, prefixed with the current job if any.
#[macro_export]
macro_rules! job_info {
    ($($arg:tt)*) => {{
        $crate::__log($crate::Level::Info, module_path!(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message, prefixed with the current job if any.
#[macro_export]
macro_rules! job_warn {
    ($($arg:tt)*) => {{
        $crate::__log($crate::Level::Warn, module_path!(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message, prefixed with the current job if any.
#[macro_export]
macro_rules! job_error {
    ($($arg:tt)*) => {{
        $crate::__log($crate::Level::Error, module_path!(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::{current_job, enter_job};

    #[test]
    fn context_is_scoped_to_guard() {
        assert_eq!(current_job(), None);
        {
            let _ctx = enter_job("a");
            assert_eq!(current_job().as_deref(), Some("a"));
        }
        assert_eq!(current_job(), None);
    }

    #[test]
    fn nested_contexts_restore_outer_job() {
        let _outer = enter_job("outer");
        {
            let _inner = enter_job("inner");
            assert_eq!(current_job().as_deref(), Some("inner"));
        }
        assert_eq!(current_job().as_deref(), Some("outer"));
    }

    #[test]
    fn context_does_not_leak_across_threads() {
        let _ctx = enter_job("main");
        let seen = std::thread::spawn(current_job).join().unwrap();
        assert_eq!(seen, None);
    }
}
