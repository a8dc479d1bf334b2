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

//! Error types shared by the library.
//!
//! Cue sheet handling and tag extraction report typed errors so that the
//! pipeline can decide per variant whether an input is skipped or failed.
//! Everything above that layer uses `anyhow`.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort processing of a single cue sheet.
#[derive(Debug, Error)]
pub enum CueError {
    /// The sheet could not be decoded or parsed, even after the UTF-8 retry.
    #[error("invalid cue format: {0}")]
    InvalidCueFormat(String),

    /// The sheet parsed but declares no FILE block or no TRACK in it.
    #[error("no tracks found")]
    NoTracksFound,

    /// A track ends before it starts.
    #[error("invalid timestamp for track {number} {title} of {}", file.display())]
    InvalidTrackTiming {
        number: u32,
        title: String,
        file: PathBuf,
    },

    #[error("not a cue sheet: {}", .0.display())]
    NotACueSheet(PathBuf),

    /// None of the candidate audio files next to the sheet exists.
    #[error("audio file not found for {}", .0.display())]
    AudioNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while reading embedded tags.
#[derive(Debug, Error)]
pub enum TagError {
    #[error("no tags found in {}", .0.display())]
    NoTags(PathBuf),

    #[error("unable to read {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },
}
