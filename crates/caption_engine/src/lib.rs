//! Caption engine: extraction, artifact storage and the job scheduler.
mod artifacts;
mod config;
mod extract;
mod filename;
mod pool;
mod scheduler;
mod store;
mod types;
mod ytdlp;

pub use artifacts::{ensure_artifact_dir, ArtifactEntry, ArtifactStore, DirArtifactStore, StoreError};
pub use config::{ConfigError, ExtractorConfig, SchedulerConfig};
pub use extract::Extractor;
pub use filename::{artifact_file_name, language_of, output_template};
pub use pool::{PoolError, WorkerPool};
pub use scheduler::{Scheduler, SchedulerError, SchedulerStats};
pub use store::{Finalized, JobStore, StatusCache, UpdateError};
pub use types::{ExtractError, Extraction, FailureKind};
pub use ytdlp::YtDlpExtractor;
