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

//! Moving files into per-language directories.
//!
//! Every bucket gets a sibling of the source root named
//! `<root name>_<code>`. A file whose name is already taken in its bucket
//! goes to a shared `duplicate` sibling instead, so nothing is overwritten.
//! Moves run one at a time on the calling thread.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::{
    classify::{Language, classify_language},
    model::{FileEntry, JobStatus},
    pipeline::report::RunReport,
};

pub const DUPLICATE_DIR: &str = "duplicate";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub language: Language,
    pub root: PathBuf,
    /// Source and destination pairs.
    pub moves: Vec<(PathBuf, PathBuf)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePlan {
    pub buckets: Vec<Bucket>,
    pub duplicates: PathBuf,
}

impl MovePlan {
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|b| b.moves.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `<parent of root>/<root name>_<code>`.
pub fn bucket_root(root: &Path, language: Language) -> Result<PathBuf> {
    let name = root
        .file_name()
        .with_context(|| format!("Cannot derive bucket names from {}", root.display()))?;
    let mut bucket = name.to_os_string();
    bucket.push(format!("_{}", language.code()));
    Ok(root.with_file_name(bucket))
}

/// Assigns tagged files to the selected language buckets.
///
/// Returns the plan and the number of files left where they are: files
/// without usable tags and files whose language was not selected.
pub fn plan_moves(root: &Path, languages: &[Language], files: &[FileEntry]) -> Result<(MovePlan, usize)> {
    let mut buckets = Vec::new();
    for &language in languages {
        if buckets.iter().any(|b: &Bucket| b.language == language) {
            continue;
        }
        buckets.push(Bucket {
            language,
            root: bucket_root(root, language)?,
            moves: Vec::new(),
        });
    }

    let mut skipped = 0;
    for file in files {
        let name = file.file_name();
        let Some(tags) = file.usable_tags() else {
            debug!("No usable tags: {}", file.path.display());
            skipped += 1;
            continue;
        };

        let language = classify_language(&tags.language_text(&name));
        match buckets.iter_mut().find(|b| b.language == language) {
            Some(bucket) => {
                debug!("{}: {}", language.code().to_uppercase(), name);
                let destination = bucket.root.join(&name);
                bucket.moves.push((file.path.clone(), destination));
            }
            None => skipped += 1,
        }
    }

    let duplicates = root.with_file_name(DUPLICATE_DIR);
    Ok((MovePlan { buckets, duplicates }, skipped))
}

/// Performs the planned moves, recording each outcome in `report`.
pub fn execute(plan: &MovePlan, report: &mut RunReport) {
    for bucket in &plan.buckets {
        if bucket.moves.is_empty() {
            continue;
        }
        if let Err(e) = fs::create_dir_all(&bucket.root) {
            warn!("Failed to create {}: {}", bucket.root.display(), e);
            for (source, _) in &bucket.moves {
                report.fail(source, format!("cannot create {}: {}", bucket.root.display(), e));
            }
            continue;
        }

        for (source, destination) in &bucket.moves {
            let status = match ensure_move(source, destination, &plan.duplicates) {
                Ok(status) => status,
                Err(e) => JobStatus::Failed(format!("{:#}", e)),
            };
            report.record(source, &status);
        }

        info!(
            "{} files processed for {}",
            bucket.moves.len(),
            bucket.root.display()
        );
    }
}

fn ensure_move(source: &Path, destination: &Path, duplicates: &Path) -> Result<JobStatus> {
    if source == destination {
        return Ok(JobStatus::Skipped("already in place".into()));
    }
    if !source.exists() {
        return Ok(JobStatus::Skipped("source vanished".into()));
    }

    if destination.exists() {
        fs::create_dir_all(duplicates)
            .with_context(|| format!("Failed to create {}", duplicates.display()))?;
        let slot = duplicate_slot(duplicates, source);
        move_file(source, &slot)?;
        warn!("Duplicate moved to {}", slot.display());
    } else {
        move_file(source, destination)?;
        info!("Moved to {}", destination.display());
    }

    Ok(JobStatus::Done)
}

/// The first free name for `source` in the duplicate directory, appending
/// ` (n)` to the stem when needed.
fn duplicate_slot(duplicates: &Path, source: &Path) -> PathBuf {
    let name = source.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let first = duplicates.join(&name);
    if !first.exists() {
        return first;
    }

    let stem = source.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let ext = source.extension().map(|e| format!(".{}", e.to_string_lossy())).unwrap_or_default();
    (1..)
        .map(|n| duplicates.join(format!("{} ({}){}", stem, n, ext)))
        .find(|p| !p.exists())
        .unwrap_or(first)
}

/// Renames, falling back to copy and delete across filesystems.
fn move_file(source: &Path, destination: &Path) -> Result<()> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(e).context("source vanished"),
        Err(_) => {
            fs::copy(source, destination).with_context(|| {
                format!("Failed to copy {} to {}", source.display(), destination.display())
            })?;
            fs::remove_file(source)
                .with_context(|| format!("Failed to remove {}", source.display()))
        }
    }
}
