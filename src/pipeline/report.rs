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

//! Aggregated outcome of one pipeline run.

use std::{fmt, path::PathBuf, time::Duration};

use serde::Serialize;

use crate::{classify::Language, model::JobStatus, util::format::human_duration};

/// The work a run performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobKind {
    /// Read tags into the cache.
    Parse,
    /// Transcode whole files.
    Convert,
    /// Cut cue-described images into tracks.
    Split,
    /// Relocate files into per-language directories.
    Move { languages: Vec<Language> },
}

impl JobKind {
    /// True for kinds that create, rename or delete files.
    pub fn is_destructive(&self) -> bool {
        !matches!(self, JobKind::Parse)
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Parse => write!(f, "parse"),
            JobKind::Convert => write!(f, "convert"),
            JobKind::Split => write!(f, "split"),
            JobKind::Move { .. } => write!(f, "move"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub kind: JobKind,
    pub succeeded: usize,
    pub skipped: usize,
    pub failures: Vec<Failure>,
    /// The user declined the confirmation, nothing was touched.
    pub aborted: bool,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn new(kind: JobKind) -> Self {
        Self {
            kind,
            succeeded: 0,
            skipped: 0,
            failures: Vec::new(),
            aborted: false,
            elapsed: Duration::ZERO,
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn fail(&mut self, path: impl Into<PathBuf>, reason: impl Into<String>) {
        self.failures.push(Failure {
            path: path.into(),
            reason: reason.into(),
        });
    }

    /// Counts one finished job.
    pub fn record(&mut self, path: impl Into<PathBuf>, status: &JobStatus) {
        match status {
            JobStatus::Done => self.succeeded += 1,
            JobStatus::Skipped(_) => self.skipped += 1,
            JobStatus::Failed(reason) => self.fail(path, reason.clone()),
            // never dispatched
            JobStatus::Pending => self.skipped += 1,
        }
    }

    pub fn summary(&self) -> String {
        if self.aborted {
            return format!("{}: aborted by user", self.kind);
        }
        format!(
            "{}: {} succeeded, {} skipped, {} failed in {}",
            self.kind,
            self.succeeded,
            self.skipped,
            self.failed(),
            human_duration(self.elapsed)
        )
    }
}
