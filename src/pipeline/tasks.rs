// Copyright (C) 2026  Caprica Software Limited
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Worker pool executing pipeline jobs.
//!
//! Jobs are typed: each [`Job`] variant carries its own payload and is
//! matched to a handler, there is no dispatch by name. Each run builds its
//! own fixed-size rayon pool, so the global pool is never touched.
//!
//! Workers hold no mutable state of their own and never touch the tag
//! cache. Every job produces exactly one [`JobResult`], including jobs
//! whose handler panicked.

use std::{
    any::Any,
    fs,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
};

use rayon::{ThreadPoolBuilder, prelude::*};
use tracing::{error, trace, warn};

use crate::{
    model::{ConversionJob, ExtractedTags, JobStatus},
    tags::TagExtractor,
    transcode::Transcoder,
};

use super::handlers;

#[derive(Debug)]
pub(crate) enum Job {
    ReadTags(PathBuf),
    Transcode(ConversionJob),
}

impl Job {
    fn source(&self) -> &Path {
        match self {
            Job::ReadTags(path) => path,
            Job::Transcode(job) => &job.source,
        }
    }

    fn destination(&self) -> Option<PathBuf> {
        match self {
            Job::ReadTags(_) => None,
            Job::Transcode(job) => Some(job.destination.clone()),
        }
    }

    /// Partial output to remove if the job dies half way.
    fn scratch(&self) -> Option<PathBuf> {
        match self {
            Job::ReadTags(_) => None,
            Job::Transcode(job) => Some(job.temp_destination()),
        }
    }
}

#[derive(Debug)]
pub(crate) struct JobResult {
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub status: JobStatus,
    /// Set by successful tag reads.
    pub tags: Option<ExtractedTags>,
}

impl JobResult {
    pub fn new(source: PathBuf, destination: Option<PathBuf>, status: JobStatus) -> Self {
        Self {
            source,
            destination,
            status,
            tags: None,
        }
    }
}

/// Shared, read-only resources handed to every worker.
pub(crate) struct WorkerContext<'a> {
    pub extractor: &'a dyn TagExtractor,
    pub transcoder: &'a dyn Transcoder,
    pub diagnostic_limit: usize,
}

/// Runs every job on a pool of `workers` threads and waits for all of
/// them.
///
/// Results come back in the order the jobs were given, whatever order they
/// finished in.
pub(crate) fn run_jobs(jobs: Vec<Job>, workers: usize, ctx: &WorkerContext) -> Vec<JobResult> {
    let total = jobs.len();
    if total == 0 {
        return Vec::new();
    }
    let workers = workers.clamp(1, total);

    let pool = match ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|id| format!("audiokit-worker-{}", id))
        .build()
    {
        Ok(pool) => pool,
        Err(e) => {
            warn!("Failed to start worker pool: {}. Running jobs in sequence.", e);
            return jobs.into_iter().map(|job| run_guarded(job, ctx)).collect();
        }
    };

    trace!("Dispatching {} jobs to {} workers", total, workers);
    pool.install(|| {
        jobs.into_par_iter()
            .map(|job| run_guarded(job, ctx))
            .collect()
    })
}

/// Runs one job, turning a panic in its handler into a failed result.
fn run_guarded(job: Job, ctx: &WorkerContext) -> JobResult {
    let worker = rayon::current_thread_index().unwrap_or_default();
    trace!(worker, "Starting {}", job.source().display());

    let source = job.source().to_path_buf();
    let destination = job.destination();
    let scratch = job.scratch();

    panic::catch_unwind(AssertUnwindSafe(|| handle_job(job, ctx))).unwrap_or_else(|payload| {
        let reason = panic_message(payload.as_ref());
        error!("Worker {} panicked on {}: {}", worker, source.display(), reason);
        if let Some(scratch) = scratch {
            let _ = fs::remove_file(scratch);
        }
        JobResult::new(source, destination, JobStatus::Failed(format!("panic: {}", reason)))
    })
}

fn handle_job(job: Job, ctx: &WorkerContext) -> JobResult {
    match job {
        Job::ReadTags(path) => handlers::read_tags(ctx, path),
        Job::Transcode(job) => handlers::transcode(ctx, job),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::TagError,
        model::{FormatInfo, TagRecord},
        transcode::{TranscodeOutcome, TranscodeRequest},
    };
    use anyhow::Result;

    struct PanickyExtractor;

    impl TagExtractor for PanickyExtractor {
        fn extract(&self, path: &Path) -> Result<ExtractedTags, TagError> {
            match path.to_str() {
                Some("/boom") => panic!("extractor exploded"),
                Some("/none") => Err(TagError::NoTags(path.to_path_buf())),
                _ => Ok(ExtractedTags {
                    tags: TagRecord {
                        title: Some("T".into()),
                        artist: Some("A".into()),
                        ..Default::default()
                    },
                    format: FormatInfo::default(),
                }),
            }
        }
    }

    struct NoTranscoder;

    impl Transcoder for NoTranscoder {
        fn transcode(&self, _: &TranscodeRequest) -> Result<TranscodeOutcome> {
            anyhow::bail!("not used")
        }
    }

    #[test]
    fn test_results_in_dispatch_order() {
        let ctx = WorkerContext {
            extractor: &PanickyExtractor,
            transcoder: &NoTranscoder,
            diagnostic_limit: 100,
        };
        let jobs: Vec<Job> = (0..50)
            .map(|i| Job::ReadTags(PathBuf::from(format!("/f{:02}", i))))
            .collect();

        let results = run_jobs(jobs, 4, &ctx);

        assert_eq!(results.len(), 50);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.source, PathBuf::from(format!("/f{:02}", i)));
            assert_eq!(result.status, JobStatus::Done);
            assert!(result.tags.is_some());
        }
    }

    #[test]
    fn test_panic_becomes_failed_result() {
        let ctx = WorkerContext {
            extractor: &PanickyExtractor,
            transcoder: &NoTranscoder,
            diagnostic_limit: 100,
        };
        let jobs = vec![
            Job::ReadTags(PathBuf::from("/a")),
            Job::ReadTags(PathBuf::from("/boom")),
            Job::ReadTags(PathBuf::from("/none")),
        ];

        let results = run_jobs(jobs, 2, &ctx);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].status, JobStatus::Done);
        assert_eq!(
            results[1].status,
            JobStatus::Failed("panic: extractor exploded".into())
        );
        assert!(matches!(results[2].status, JobStatus::Skipped(_)));
    }

    #[test]
    fn test_no_jobs() {
        let ctx = WorkerContext {
            extractor: &PanickyExtractor,
            transcoder: &NoTranscoder,
            diagnostic_limit: 100,
        };
        assert!(run_jobs(Vec::new(), 8, &ctx).is_empty());
    }
}
