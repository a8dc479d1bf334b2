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

//! Cue sheet parsing and track splitting.
//!
//! A cue sheet describes how one audio image (usually a lossless rip of a
//! whole disc) is divided into tracks. This module turns the raw bytes of a
//! `.cue` file into a [`CueSheet`], then into per-track [`TrackRange`]s and
//! finally into [`SplitClip`]s ready to be handed to the transcoder.
//!
//! # Decoding
//!
//! The caller supplies a best-guess encoding (see [`encoding::detect`]).
//! If decoding or parsing fails with that encoding, the whole process is
//! retried once as UTF-8 before giving up with
//! [`CueError::InvalidCueFormat`].
//!
//! Nothing in this module logs anything above `debug`; errors are returned
//! to the caller who decides how loud to be.

pub mod encoding;
mod parser;
pub mod ranges;
pub mod split;
mod time;

use std::{fs, path::Path};

use encoding_rs::{Encoding, UTF_8};

pub use crate::error::CueError;
pub use ranges::{TrackRange, track_ranges};
pub use split::{SplitClip, find_audio_file, split_clips};
pub use time::{CueTime, FRAMES_PER_SECOND};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CueSheet {
    /// Album title.
    pub title: Option<String>,
    /// Album level performer, the fallback for tracks without one.
    pub performer: Option<String>,
    pub files: Vec<CueFile>,
}

/// One `FILE` block and the tracks it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueFile {
    pub name: String,
    pub kind: Option<String>,
    pub tracks: Vec<CueTrack>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueTrack {
    pub number: u32,
    pub kind: String,
    pub title: Option<String>,
    pub performer: Option<String>,
    /// Indexes in declaration order.
    pub indexes: Vec<CueIndex>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CueIndex {
    pub number: u32,
    pub time: CueTime,
}

impl CueSheet {
    /// All tracks of all FILE blocks, in order.
    pub fn tracks(&self) -> impl Iterator<Item = &CueTrack> {
        self.files.iter().flat_map(|f| f.tracks.iter())
    }
}

impl CueTrack {
    /// The first declared index, normally `INDEX 00` or `INDEX 01`.
    pub fn first_index(&self) -> Option<CueTime> {
        self.indexes.first().map(|i| i.time)
    }

    /// The index marking the audible start of the track.
    ///
    /// With a single index that index is used. With more, `INDEX 01` wins,
    /// or the second declared index if none is numbered 1.
    pub fn start_index(&self) -> Option<CueTime> {
        if self.indexes.len() < 2 {
            return self.first_index();
        }
        self.indexes
            .iter()
            .find(|i| i.number == 1)
            .or_else(|| self.indexes.get(1))
            .map(|i| i.time)
    }
}

/// Parses raw cue bytes decoded with `declared`, retrying once as UTF-8.
///
/// # Errors
///
/// * [`CueError::InvalidCueFormat`] if neither attempt yields a sheet.
/// * [`CueError::NoTracksFound`] if the sheet has no FILE block, or its
///   first FILE block has no TRACK.
pub fn parse(raw: &[u8], declared: &'static Encoding) -> Result<CueSheet, CueError> {
    let sheet = match decode_and_parse(raw, declared) {
        Ok(sheet) => sheet,
        Err(first) if declared != UTF_8 => {
            tracing::debug!("cue parse as {} failed ({}), retrying as UTF-8", declared.name(), first);
            decode_and_parse(raw, UTF_8).map_err(|second| {
                CueError::InvalidCueFormat(format!("{}: {first}; UTF-8: {second}", declared.name()))
            })?
        }
        Err(e) => return Err(CueError::InvalidCueFormat(e)),
    };

    if sheet.files.first().is_none_or(|f| f.tracks.is_empty()) {
        return Err(CueError::NoTracksFound);
    }

    Ok(sheet)
}

fn decode_and_parse(raw: &[u8], encoding: &'static Encoding) -> Result<CueSheet, String> {
    let text = encoding::decode(raw, encoding)?;
    parser::parse_text(&text)
}

/// Reads a `.cue` file from disk, detecting its encoding.
///
/// `fallback` is used when the detected encoding is not one of the allowed
/// East-Asian encodings.
pub fn read_cue_file(path: &Path, fallback: &'static Encoding) -> Result<CueSheet, CueError> {
    if !crate::classify::is_cue_sheet(path) {
        return Err(CueError::NotACueSheet(path.to_path_buf()));
    }

    let raw = fs::read(path)?;
    let encoding = encoding::detect(&raw, fallback);
    tracing::debug!("cue encoding {} for {}", encoding.name(), path.display());

    parse(&raw, encoding)
}
