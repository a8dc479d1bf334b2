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

//! Building split clips from a parsed sheet.

use std::path::{Path, PathBuf};

use crate::{
    classify::LOSSLESS_EXTENSIONS,
    cue::{CueError, CueSheet, TrackRange, track_ranges},
};

const UNKNOWN_ARTIST: &str = "Unknown";

/// One track to cut out of an audio image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitClip {
    pub audio: PathBuf,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub range: TrackRange,
}

impl SplitClip {
    pub fn number(&self) -> u32 {
        self.range.number
    }

    /// `<artist> @ <title>.m4a`
    pub fn file_name(&self) -> String {
        format!("{} @ {}.m4a", self.artist, self.title)
    }

    /// Output path, next to the audio image.
    pub fn destination(&self) -> PathBuf {
        let dir = self.audio.parent().unwrap_or_else(|| Path::new("."));
        dir.join(self.file_name())
    }
}

/// Strips `? ! " '` and cuts the value at the first path separator.
///
/// Tag data inside cue sheets sometimes carries things like
/// `Artist/Composer` or a whole Windows path; only the part before the
/// separator is kept.
pub fn clean_field(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, '?' | '!' | '"' | '\''))
        .collect();

    cleaned
        .split(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Locates the audio image for FILE block `block` of `sheet`.
///
/// The name declared in the block is tried first. For the first block only,
/// `<cue stem>.<ext>` is then tried for every lossless extension, which
/// covers sheets whose FILE line went stale after a re-encode.
pub fn find_audio_file(cue_path: &Path, sheet: &CueSheet, block: usize) -> Result<PathBuf, CueError> {
    let dir = cue_path.parent().unwrap_or_else(|| Path::new("."));

    let mut candidates = Vec::new();
    if let Some(file) = sheet.files.get(block) {
        candidates.push(dir.join(&file.name));
    }
    if block == 0 {
        if let Some(stem) = cue_path.file_stem() {
            for ext in LOSSLESS_EXTENSIONS {
                let mut name = stem.to_os_string();
                name.push(".");
                name.push(ext);
                candidates.push(dir.join(name));
            }
        }
    }

    candidates
        .into_iter()
        .find(|c| c.is_file())
        .ok_or_else(|| CueError::AudioNotFound(cue_path.to_path_buf()))
}

/// Produces the clips for every FILE block of `sheet`.
///
/// Performer resolution is track, then sheet, then `"Unknown"`. Tracks
/// without a title are named after their number.
///
/// # Errors
///
/// Fails as a whole if any block's audio cannot be found or any block has
/// inconsistent timestamps.
pub fn split_clips(cue_path: &Path, sheet: &CueSheet) -> Result<Vec<SplitClip>, CueError> {
    let album = sheet.title.as_deref().unwrap_or_default().trim().to_string();
    let sheet_performer = non_empty(sheet.performer.as_deref());

    let mut clips = Vec::new();
    for (block, file) in sheet.files.iter().enumerate() {
        if file.tracks.is_empty() {
            continue;
        }

        let audio = find_audio_file(cue_path, sheet, block)?;
        let ranges = track_ranges(&file.tracks, cue_path)?;

        for (track, range) in file.tracks.iter().zip(ranges) {
            let performer = non_empty(track.performer.as_deref())
                .or(sheet_performer)
                .unwrap_or(UNKNOWN_ARTIST);

            let mut artist = clean_field(performer);
            if artist.is_empty() {
                artist = UNKNOWN_ARTIST.to_string();
            }
            let mut title = clean_field(track.title.as_deref().unwrap_or_default());
            if title.is_empty() {
                title = format!("Track {:02}", track.number);
            }

            clips.push(SplitClip {
                audio: audio.clone(),
                title,
                artist,
                album: album.clone(),
                range,
            });
        }
    }

    tracing::debug!("{} tracks found in {}", clips.len(), cue_path.display());
    Ok(clips)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
