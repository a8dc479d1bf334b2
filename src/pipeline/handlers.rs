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

use std::{fs, io, path::PathBuf, time::Instant};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::{
    error::TagError,
    model::{ConversionJob, JobStatus},
    transcode::TranscodeRequest,
    util::format::{human_duration, truncate_chars},
};

use super::tasks::{JobResult, WorkerContext};

pub(super) fn read_tags(ctx: &WorkerContext, path: PathBuf) -> JobResult {
    match ctx.extractor.extract(&path) {
        Ok(extracted) => {
            // untagged files still report their stream format
            let status = if extracted.tags.is_empty() {
                debug!("No tags: {}", path.display());
                JobStatus::Skipped("no tags".into())
            } else {
                JobStatus::Done
            };
            let mut result = JobResult::new(path, None, status);
            result.tags = Some(extracted);
            result
        }
        Err(TagError::NoTags(_)) => {
            debug!("No tags: {}", path.display());
            JobResult::new(path, None, JobStatus::Skipped("no tags".into()))
        }
        Err(e) => JobResult::new(path, None, JobStatus::Failed(e.to_string())),
    }
}

pub(super) fn transcode(ctx: &WorkerContext, mut job: ConversionJob) -> JobResult {
    let status = match convert(ctx, &job) {
        Ok(status) => status,
        Err(e) => {
            remove_scratch(&job);
            JobStatus::Failed(format!("{:#}", e))
        }
    };

    if let JobStatus::Failed(reason) = &status {
        warn!("Failed {}: {}", job.source.display(), reason);
    }

    job.status = status;
    JobResult::new(job.source, Some(job.destination), job.status)
}

fn convert(ctx: &WorkerContext, job: &ConversionJob) -> Result<JobStatus> {
    if !job.source.exists() {
        return Ok(JobStatus::Failed("source file is missing".into()));
    }

    if let Some(parent) = job.destination.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    // checked again here, another job may have produced it meanwhile
    if job.destination.exists() {
        return Ok(JobStatus::Skipped("destination exists".into()));
    }

    let scratch = job.temp_destination();
    if scratch.exists() {
        fs::remove_file(&scratch)
            .with_context(|| format!("Failed to remove stale {}", scratch.display()))?;
    }

    let started = Instant::now();
    let request = TranscodeRequest::from(job);
    let outcome = ctx.transcoder.transcode(&request)?;

    if !outcome.success {
        remove_scratch(job);
        let code = outcome
            .status
            .map_or_else(|| "killed".to_string(), |c| format!("exit {}", c));
        let diagnostics = truncate_chars(outcome.diagnostics.trim(), ctx.diagnostic_limit);
        return Ok(JobStatus::Failed(format!("{}: {}", code, diagnostics)));
    }

    fs::rename(&scratch, &job.destination).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            scratch.display(),
            job.destination.display()
        )
    })?;

    info!(
        "Converted {} in {}",
        job.destination.display(),
        human_duration(started.elapsed())
    );

    Ok(JobStatus::Done)
}

fn remove_scratch(job: &ConversionJob) {
    let scratch = job.temp_destination();
    match fs::remove_file(&scratch) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => {
            warn!("Failed to remove {}: {}", scratch.display(), e);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classify::Quality,
        model::{Encoder, ExtractedTags, FormatInfo, TagRecord},
        tags::TagExtractor,
        transcode::{TranscodeOutcome, Transcoder},
    };
    use std::path::Path;

    struct Unreadable;

    impl TagExtractor for Unreadable {
        fn extract(&self, path: &Path) -> Result<ExtractedTags, TagError> {
            Err(TagError::Unreadable {
                path: path.to_path_buf(),
                reason: "bad header".into(),
            })
        }
    }

    /// Writes the output, then exits with `code`.
    struct Scripted {
        code: i32,
    }

    impl Transcoder for Scripted {
        fn transcode(&self, request: &TranscodeRequest) -> Result<TranscodeOutcome> {
            fs::write(&request.output, b"aac")?;
            Ok(TranscodeOutcome {
                success: self.code == 0,
                status: Some(self.code),
                diagnostics: "x".repeat(500),
            })
        }
    }

    fn job(dir: &Path) -> ConversionJob {
        fs::write(dir.join("a.flac"), b"flac").unwrap();
        ConversionJob {
            source: dir.join("a.flac"),
            destination: dir.join("out/a.m4a"),
            quality: Quality::HIGHEST,
            encoder: Encoder::Aac,
            range: None,
            metadata: None,
            status: JobStatus::Pending,
        }
    }

    fn context<'a>(transcoder: &'a dyn Transcoder) -> WorkerContext<'a> {
        WorkerContext {
            extractor: &Unreadable,
            transcoder,
            diagnostic_limit: 60,
        }
    }

    #[test]
    fn test_unreadable_tags_fail() {
        let transcoder = Scripted { code: 0 };
        let result = read_tags(&context(&transcoder), PathBuf::from("/x.mp3"));
        assert!(matches!(result.status, JobStatus::Failed(ref r) if r.contains("bad header")));
    }

    struct Untagged;

    impl TagExtractor for Untagged {
        fn extract(&self, _: &Path) -> Result<ExtractedTags, TagError> {
            Ok(ExtractedTags {
                tags: TagRecord::default(),
                format: FormatInfo {
                    bitrate_kbps: Some(128),
                    ..Default::default()
                },
            })
        }
    }

    #[test]
    fn test_untagged_file_skipped_with_format() {
        let transcoder = Scripted { code: 0 };
        let ctx = WorkerContext {
            extractor: &Untagged,
            transcoder: &transcoder,
            diagnostic_limit: 60,
        };

        let result = read_tags(&ctx, PathBuf::from("/x.mp3"));

        assert_eq!(result.status, JobStatus::Skipped("no tags".into()));
        let extracted = result.tags.unwrap();
        assert_eq!(extracted.format.bitrate_kbps, Some(128));
    }

    #[test]
    fn test_success_renames_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let transcoder = Scripted { code: 0 };
        let job = job(dir.path());

        let result = transcode(&context(&transcoder), job.clone());

        assert_eq!(result.status, JobStatus::Done);
        assert_eq!(fs::read(&job.destination).unwrap(), b"aac");
        assert!(!job.temp_destination().exists());
    }

    #[test]
    fn test_failure_removes_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let transcoder = Scripted { code: 1 };
        let job = job(dir.path());

        let result = transcode(&context(&transcoder), job.clone());

        let JobStatus::Failed(reason) = result.status else {
            panic!("expected failure");
        };
        assert!(reason.starts_with("exit 1: "));
        assert_eq!(reason.chars().count(), "exit 1: ".len() + 60 + 3);
        assert!(!job.destination.exists());
        assert!(!job.temp_destination().exists());
    }

    #[test]
    fn test_existing_destination_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let transcoder = Scripted { code: 0 };
        let job = job(dir.path());
        fs::create_dir_all(job.destination.parent().unwrap()).unwrap();
        fs::write(&job.destination, b"keep").unwrap();

        let result = transcode(&context(&transcoder), job.clone());

        assert!(matches!(result.status, JobStatus::Skipped(_)));
        assert_eq!(fs::read(&job.destination).unwrap(), b"keep");
    }

    #[test]
    fn test_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let transcoder = Scripted { code: 0 };
        let job = job(dir.path());
        fs::remove_file(&job.source).unwrap();

        let result = transcode(&context(&transcoder), job);
        assert_eq!(result.status, JobStatus::Failed("source file is missing".into()));
    }
}
