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

//! Domain models and core data structures.
//!
//! This module defines the central entities of the application: files found
//! on disk, the tags read from them and the conversion jobs derived from
//! both. None of these outlive a single run, except through the tag cache.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};

use serde::{Deserialize, Serialize};

use crate::{classify::Quality, cue::TrackRange};

/// Descriptive tags of an audio file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Any other text fields, keyed by tag name.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl TagRecord {
    /// True if the file carried no tag at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.artist.is_none() && self.album.is_none() && self.extra.is_empty()
    }

    /// A record is only usable for classification or renaming when it has
    /// both a title and an artist.
    pub fn is_usable(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.title) && present(&self.artist)
    }

    /// The text a file's language is judged on: file name, title, artist.
    pub fn language_text(&self, file_name: &str) -> String {
        format!(
            "{}{}{}",
            file_name,
            self.title.as_deref().unwrap_or_default(),
            self.artist.as_deref().unwrap_or_default()
        )
    }
}

/// Technical properties of an audio stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatInfo {
    /// Average bitrate in kbit/s, if known.
    pub bitrate_kbps: Option<u32>,
    pub lossless: bool,
    /// Container or codec name as reported by the extractor.
    pub container: Option<String>,
}

/// Everything a tag extractor returns for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedTags {
    pub tags: TagRecord,
    pub format: FormatInfo,
}

/// A file found while walking the source tree.
///
/// The path is the identity; size and modification time only serve to tell
/// whether a cached tag record is still current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub size: u64,
    /// Modification time in whole seconds since the unix epoch.
    pub modified: i64,
    pub tags: Option<TagRecord>,
    pub format: Option<FormatInfo>,
}

impl FileEntry {
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;
        let modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX));

        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            modified,
            tags: None,
            format: None,
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Tags, but only if they are usable.
    pub fn usable_tags(&self) -> Option<&TagRecord> {
        self.tags.as_ref().filter(|t| t.is_usable())
    }

    pub fn apply(&mut self, extracted: ExtractedTags) {
        self.tags = Some(extracted.tags);
        self.format = Some(extracted.format);
    }
}

/// AAC encoder implementation handed to the transcoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoder {
    /// The encoder built into every ffmpeg.
    #[default]
    Aac,
    /// Fraunhofer FDK AAC, better quality, needs a custom ffmpeg build.
    LibfdkAac,
}

impl Encoder {
    pub fn codec_name(&self) -> &'static str {
        match self {
            Encoder::Aac => "aac",
            Encoder::LibfdkAac => "libfdk_aac",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Done,
    Skipped(String),
    Failed(String),
}

/// Tags written into a split track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub track: u32,
}

/// One transcoder invocation: a whole file, or one track of an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub quality: Quality,
    pub encoder: Encoder,
    /// Present for split jobs.
    pub range: Option<TrackRange>,
    pub metadata: Option<TrackMetadata>,
    pub status: JobStatus,
}

impl ConversionJob {
    /// Where the transcoder writes before the final rename.
    pub fn temp_destination(&self) -> PathBuf {
        let mut name = self.destination.as_os_str().to_os_string();
        name.push(".part");
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usable_tags() {
        let mut tags = TagRecord {
            title: Some("Song".into()),
            artist: Some("Band".into()),
            ..Default::default()
        };
        assert!(tags.is_usable());

        tags.artist = Some("  ".into());
        assert!(!tags.is_usable());

        tags.artist = None;
        assert!(!tags.is_usable());
    }

    #[test]
    fn test_language_text() {
        let tags = TagRecord {
            title: Some("晴天".into()),
            artist: Some("周杰伦".into()),
            ..Default::default()
        };
        assert_eq!(tags.language_text("01.mp3"), "01.mp3晴天周杰伦");
    }

    #[test]
    fn test_temp_destination() {
        let job = ConversionJob {
            source: PathBuf::from("/music/a.flac"),
            destination: PathBuf::from("/music/a.m4a"),
            quality: Quality::HIGHEST,
            encoder: Encoder::Aac,
            range: None,
            metadata: None,
            status: JobStatus::Pending,
        };
        assert_eq!(job.temp_destination(), PathBuf::from("/music/a.m4a.part"));
    }

    #[test]
    fn test_encoder_names() {
        assert_eq!(Encoder::Aac.codec_name(), "aac");
        assert_eq!(Encoder::LibfdkAac.codec_name(), "libfdk_aac");
    }
}
