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

//! Batch pipeline orchestration.
//!
//! A run walks a source tree, decides per file whether there is work to do,
//! and hands the admitted jobs to a pool of worker threads. The
//! orchestrator itself stays on the calling thread: it plans, asks for
//! confirmation, dispatches everything, waits for every job, and only then
//! aggregates the results into a [`RunReport`].
//!
//! # Sub-modules
//!
//! * [`discover`]: Recursive listing of the source tree.
//! * [`paths`]: Output naming and placement of converted files.
//! * [`organize`]: Per-language move plans and their execution.
//! * [`report`]: Run outcome aggregation.
//!
//! # Tag cache
//!
//! The cache is only ever written from here, after the workers have
//! finished, in a single batch. A failing cache never fails a run: lookups
//! that error count as misses and failed writes are logged.
//!
//! # Destination checks
//!
//! Whether a destination exists is checked while planning and again by the
//! worker right before transcoding. The two checks are not atomic with the
//! write; destinations are unique per input so this is only a problem when
//! two runs target the same output tree at once.

pub mod discover;
mod handlers;
pub mod organize;
pub mod paths;
pub mod report;
mod tasks;

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::Result;
use encoding_rs::Encoding;
use tracing::{debug, info, trace, warn};

use crate::{
    classify::{self, Language, Quality, quality::LOSSLESS_BITRATE, select_quality},
    config::AppConfig,
    cue::{self, CueError, SplitClip},
    db::{CacheEntry, TagCache},
    model::{ConversionJob, Encoder, ExtractedTags, FileEntry, JobStatus, TrackMetadata},
    tags::{LoftyExtractor, TagExtractor},
    transcode::{FfmpegTranscoder, Transcoder},
};

pub use discover::discover;
pub use organize::MovePlan;
pub use paths::OutputLayout;
pub use report::{Failure, JobKind, RunReport};

use tasks::{Job, JobResult, WorkerContext};

/// Behaviour switches for one run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub workers: usize,
    pub encoder: Encoder,
    /// Overrides the per-file quality selection.
    pub quality: Option<Quality>,
    pub bitrate_suffix: bool,
    pub layout: OutputLayout,
    pub fallback_encoding: &'static Encoding,
    pub check_cache_staleness: bool,
    pub diagnostic_limit: usize,
}

impl PipelineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        let layout = match &config.output_root {
            Some(root) => OutputLayout::Under {
                root: root.clone(),
                segments: config.segments(),
            },
            None => OutputLayout::Alongside,
        };

        Self {
            workers: config.worker_count(),
            encoder: config.encoder,
            quality: config.quality,
            bitrate_suffix: config.bitrate_suffix,
            layout,
            fallback_encoding: config.fallback_encoding(),
            check_cache_staleness: config.check_cache_staleness,
            diagnostic_limit: config.diagnostic_limit,
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// The work a run is about to do, shown to the user before anything
/// happens.
#[derive(Debug)]
pub struct Plan {
    pub kind: JobKind,
    pub conversions: Vec<ConversionJob>,
    pub moves: Option<MovePlan>,
    pub skipped: usize,
    /// Inputs that failed while planning, such as unparsable cue sheets.
    pub failures: Vec<Failure>,
    cache_updates: Vec<CacheEntry>,
}

impl Plan {
    fn new(kind: JobKind) -> Self {
        Self {
            kind,
            conversions: Vec::new(),
            moves: None,
            skipped: 0,
            failures: Vec::new(),
            cache_updates: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.conversions.len() + self.moves.as_ref().map_or(0, MovePlan::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One line per destination group, for the confirmation prompt.
    pub fn describe(&self) -> Vec<String> {
        match &self.moves {
            Some(moves) => moves
                .buckets
                .iter()
                .map(|b| {
                    format!(
                        "[{}] {} files will be moved to {}",
                        b.language.code().to_uppercase(),
                        b.moves.len(),
                        b.root.display()
                    )
                })
                .collect(),
            None => {
                let verb = match self.kind {
                    JobKind::Split => "tracks will be split",
                    _ => "files will be converted",
                };
                vec![format!("{} {}", self.conversions.len(), verb)]
            }
        }
    }
}

/// Runs batches of jobs over a source tree.
pub struct Pipeline {
    options: PipelineOptions,
    extractor: Box<dyn TagExtractor>,
    transcoder: Box<dyn Transcoder>,
    cache: Option<Box<dyn TagCache>>,
}

impl Pipeline {
    pub fn new(
        options: PipelineOptions,
        extractor: Box<dyn TagExtractor>,
        transcoder: Box<dyn Transcoder>,
    ) -> Self {
        Self {
            options,
            extractor,
            transcoder,
            cache: None,
        }
    }

    /// A pipeline reading tags with lofty and transcoding with ffmpeg.
    pub fn from_config(config: &AppConfig) -> Self {
        let transcoder = FfmpegTranscoder::new(&config.ffmpeg).with_timeout(config.job_timeout());
        Self::new(
            PipelineOptions::from_config(config),
            Box::new(LoftyExtractor),
            Box::new(transcoder),
        )
    }

    pub fn with_cache(mut self, cache: Box<dyn TagCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Plans and executes a run.
    ///
    /// `confirm` sees the plan before any file is touched; returning
    /// `false` ends the run with an aborted report. Parse runs change no
    /// files and are not confirmed.
    ///
    /// # Errors
    ///
    /// Only if the source tree cannot be listed. Per-file problems end up
    /// in the report.
    pub fn run<F>(&mut self, root: &Path, kind: JobKind, confirm: F) -> Result<RunReport>
    where
        F: FnOnce(&Plan) -> bool,
    {
        let started = Instant::now();

        if kind == JobKind::Parse {
            let (report, _) = self.parse_tags(root)?;
            return Ok(report);
        }

        let plan = self.plan(root, &kind)?;
        let mut report = RunReport::new(kind);
        report.skipped = plan.skipped;
        report.failures.extend(plan.failures.iter().cloned());

        if plan.is_empty() {
            info!("No files need to be processed");
            report.elapsed = started.elapsed();
            return Ok(report);
        }

        if !confirm(&plan) {
            info!("Aborted by user, nothing was changed");
            report.aborted = true;
            report.elapsed = started.elapsed();
            return Ok(report);
        }

        let Plan {
            conversions,
            moves,
            cache_updates,
            ..
        } = plan;

        self.store_tags(&cache_updates);

        if let Some(moves) = &moves {
            organize::execute(moves, &mut report);
        }

        if !conversions.is_empty() {
            let jobs = conversions.into_iter().map(Job::Transcode).collect();
            let results = tasks::run_jobs(jobs, self.options.workers, &self.worker_context());
            for result in results {
                let path = match (&report.kind, result.destination) {
                    (JobKind::Split, Some(destination)) => destination,
                    _ => result.source,
                };
                report.record(path, &result.status);
            }
        }

        report.elapsed = started.elapsed();
        Ok(report)
    }

    /// Works out what a run of `kind` would do, without changing any file.
    pub fn plan(&mut self, root: &Path, kind: &JobKind) -> Result<Plan> {
        let files = discover(root)?;
        let plan = match kind {
            JobKind::Parse => Plan::new(JobKind::Parse),
            JobKind::Convert => self.plan_convert(files),
            JobKind::Split => self.plan_split(files),
            JobKind::Move { languages } => self.plan_move(root, languages, files)?,
        };

        info!(
            "Planned {} {} jobs, {} skipped, {} failed",
            plan.len(),
            kind,
            plan.skipped,
            plan.failures.len()
        );
        Ok(plan)
    }

    /// Reads the tags of every audio file under `root` and stores them in
    /// the cache, ignoring what the cache already holds.
    ///
    /// Returns the report and the entries read, e.g. for a JSON dump.
    pub fn parse_tags(&mut self, root: &Path) -> Result<(RunReport, Vec<CacheEntry>)> {
        let started = Instant::now();
        let mut report = RunReport::new(JobKind::Parse);

        let (mut audio, other): (Vec<_>, Vec<_>) = discover(root)?
            .into_iter()
            .partition(|f| classify::is_audio_file(&f.path));
        report.skipped += other.len();

        let (results, entries) = self.resolve_tags(&mut audio, false);
        for result in &results {
            report.record(result.source.clone(), &result.status);
        }
        self.store_tags(&entries);

        report.elapsed = started.elapsed();
        Ok((report, entries))
    }

    fn plan_convert(&mut self, files: Vec<FileEntry>) -> Plan {
        let mut plan = Plan::new(JobKind::Convert);
        let mut candidates = Vec::new();

        // images with a cue sheet next to them are left to the split run
        let cue_images: HashSet<PathBuf> = files
            .iter()
            .filter(|f| classify::is_cue_sheet(&f.path))
            .map(|f| f.path.with_extension(""))
            .collect();

        for file in files {
            match self.convert_skip_reason(&file, &cue_images) {
                Some(reason) => {
                    trace!("Skip ({}): {}", reason, file.path.display());
                    plan.skipped += 1;
                }
                None => candidates.push(file),
            }
        }

        // lossless sources need no bitrate
        let mut lossy: Vec<FileEntry> = Vec::new();
        let mut lossless: Vec<FileEntry> = Vec::new();
        for file in candidates {
            if classify::is_lossless_audio(&file.path) {
                lossless.push(file);
            } else {
                lossy.push(file);
            }
        }
        let (_, entries) = self.resolve_tags(&mut lossy, true);
        plan.cache_updates = entries;

        let mut candidates = lossless;
        candidates.append(&mut lossy);
        candidates.sort_by(|a, b| a.path.cmp(&b.path));

        for file in candidates {
            let source_kbps = if classify::is_lossless_audio(&file.path)
                || file.format.as_ref().is_some_and(|f| f.lossless)
            {
                Some(LOSSLESS_BITRATE)
            } else {
                file.format.as_ref().and_then(|f| f.bitrate_kbps)
            };
            let quality = select_quality(self.options.quality, source_kbps);

            let suffix = self.options.bitrate_suffix.then_some(quality);
            let name = paths::target_file_name(&file.path, suffix);
            if self.options.bitrate_suffix && self.any_exists(&file.path, &name) {
                trace!("Skip (destination exists): {}", file.path.display());
                plan.skipped += 1;
                continue;
            }

            debug!("Prepared {} at {}", file.path.display(), quality);
            plan.conversions.push(ConversionJob {
                destination: self.options.layout.output_dir(&file.path).join(&name),
                source: file.path,
                quality,
                encoder: self.options.encoder,
                range: None,
                metadata: None,
                status: JobStatus::Pending,
            });
        }

        plan
    }

    /// Why a file is not converted, checked before any tag is read.
    fn convert_skip_reason(
        &self,
        file: &FileEntry,
        cue_images: &HashSet<PathBuf>,
    ) -> Option<&'static str> {
        let path = &file.path;
        if !classify::is_audio_file(path) {
            return Some("not audio");
        }
        if classify::is_target_format(path) {
            return Some("already converted");
        }
        if cue_images.contains(&path.with_extension("")) {
            return Some("covered by cue sheet");
        }
        if !self.options.bitrate_suffix
            && self.any_exists(path, &paths::target_file_name(path, None))
        {
            return Some("destination exists");
        }
        None
    }

    fn any_exists(&self, source: &Path, name: &str) -> bool {
        self.options
            .layout
            .candidates(source, name)
            .iter()
            .any(|p| p.exists())
    }

    fn plan_split(&self, files: Vec<FileEntry>) -> Plan {
        let mut plan = Plan::new(JobKind::Split);
        let mut planned = HashSet::new();

        for file in files.iter().filter(|f| classify::is_cue_sheet(&f.path)) {
            let clips = cue::read_cue_file(&file.path, self.options.fallback_encoding)
                .and_then(|sheet| cue::split_clips(&file.path, &sheet));

            let clips = match clips {
                Ok(clips) => clips,
                Err(CueError::NoTracksFound) => {
                    info!("No tracks found in {}", file.path.display());
                    plan.skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!("Cannot split {}: {}", file.path.display(), e);
                    plan.failures.push(Failure {
                        path: file.path.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            for clip in clips {
                let destination = clip.destination();
                if destination.exists() || !planned.insert(destination.clone()) {
                    trace!("Skip (destination exists): {}", destination.display());
                    plan.skipped += 1;
                    continue;
                }
                plan.conversions.push(self.split_job(clip, destination));
            }
        }

        plan
    }

    fn split_job(&self, clip: SplitClip, destination: PathBuf) -> ConversionJob {
        ConversionJob {
            source: clip.audio,
            destination,
            quality: select_quality(self.options.quality, None),
            encoder: self.options.encoder,
            metadata: Some(TrackMetadata {
                title: clip.title,
                artist: clip.artist,
                album: clip.album,
                track: clip.range.number,
            }),
            range: Some(clip.range),
            status: JobStatus::Pending,
        }
    }

    fn plan_move(&mut self, root: &Path, languages: &[Language], files: Vec<FileEntry>) -> Result<Plan> {
        let mut plan = Plan::new(JobKind::Move {
            languages: languages.to_vec(),
        });

        let (mut audio, other): (Vec<_>, Vec<_>) = files
            .into_iter()
            .partition(|f| classify::is_audio_file(&f.path));
        plan.skipped += other.len();

        let (_, entries) = self.resolve_tags(&mut audio, true);
        plan.cache_updates = entries;

        let (moves, skipped) = organize::plan_moves(root, languages, &audio)?;
        plan.skipped += skipped;
        plan.moves = Some(moves);

        Ok(plan)
    }

    /// Fills in the tags of `files`, from the cache when allowed and
    /// current, otherwise by extraction on the worker pool.
    ///
    /// Returns the extraction results and the cache entries to store.
    fn resolve_tags(&self, files: &mut [FileEntry], read_cache: bool) -> (Vec<JobResult>, Vec<CacheEntry>) {
        let mut misses = Vec::new();
        for (index, file) in files.iter_mut().enumerate() {
            match self.cached_tags(file, read_cache) {
                Some(extracted) => file.apply(extracted),
                None => misses.push(index),
            }
        }

        debug!(
            "{} tags cached, {} to read",
            files.len() - misses.len(),
            misses.len()
        );
        if misses.is_empty() {
            return (Vec::new(), Vec::new());
        }

        let jobs = misses
            .iter()
            .map(|&i| Job::ReadTags(files[i].path.clone()))
            .collect();
        let mut results = tasks::run_jobs(jobs, self.options.workers, &self.worker_context());

        let mut entries = Vec::new();
        for (&index, result) in misses.iter().zip(results.iter_mut()) {
            if let Some(extracted) = result.tags.take() {
                entries.push(CacheEntry::new(&files[index], extracted.clone()));
                files[index].apply(extracted);
            }
        }

        (results, entries)
    }

    fn cached_tags(&self, file: &FileEntry, read_cache: bool) -> Option<ExtractedTags> {
        if !read_cache {
            return None;
        }
        let cache = self.cache.as_ref()?;

        match cache.get(&file.path) {
            Ok(Some(entry)) if !self.options.check_cache_staleness || entry.is_fresh_for(file) => {
                Some(entry.extracted)
            }
            Ok(Some(_)) => {
                trace!("Stale cache entry for {}", file.path.display());
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Cache lookup failed for {}: {:#}", file.path.display(), e);
                None
            }
        }
    }

    fn store_tags(&mut self, entries: &[CacheEntry]) {
        if entries.is_empty() {
            return;
        }
        let Some(cache) = self.cache.as_mut() else {
            return;
        };

        match cache.put_all(entries) {
            Ok(count) => debug!("Cached tags of {} files", count),
            Err(e) => warn!("Failed to update tag cache: {:#}", e),
        }
    }

    fn worker_context(&self) -> WorkerContext<'_> {
        WorkerContext {
            extractor: self.extractor.as_ref(),
            transcoder: self.transcoder.as_ref(),
            diagnostic_limit: self.options.diagnostic_limit,
        }
    }
}
