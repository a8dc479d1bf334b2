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

//! Embedded tag extraction.
//!
//! Tag reading is the slowest part of a scan on network drives, so it is
//! kept behind the [`TagExtractor`] trait: the pipeline runs it on worker
//! threads and caches the results. [`LoftyExtractor`] reads tags in-process
//! with `lofty`.

use std::path::Path;

use lofty::file::FileType;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::ItemKey;

use crate::{
    classify,
    error::TagError,
    model::{ExtractedTags, FormatInfo, TagRecord},
};

/// Reads tags and stream properties of one audio file.
///
/// Implementations are shared between worker threads.
pub trait TagExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<ExtractedTags, TagError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyExtractor;

impl TagExtractor for LoftyExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedTags, TagError> {
        let tagged_file = Probe::open(path)
            .and_then(|p| p.read())
            .map_err(|e| TagError::Unreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let file_type = tagged_file.file_type();
        let format = FormatInfo {
            bitrate_kbps: tagged_file.properties().audio_bitrate().filter(|&b| b > 0),
            lossless: classify::is_lossless_audio(path) || is_lossless_type(file_type),
            container: Some(format!("{:?}", file_type)),
        };

        // stream properties are worth keeping even without tags
        let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
            return Ok(ExtractedTags {
                tags: TagRecord::default(),
                format,
            });
        };

        let text = |value: Option<std::borrow::Cow<'_, str>>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut tags = TagRecord {
            title: text(tag.title()),
            artist: text(tag.artist()),
            album: text(tag.album()),
            ..Default::default()
        };

        if let Some(genre) = text(tag.genre()) {
            tags.extra.insert("genre".to_string(), genre);
        }
        if let Some(track) = tag.track() {
            tags.extra.insert("track".to_string(), track.to_string());
        }
        if let Some(album_artist) = tag
            .get(ItemKey::AlbumArtist)
            .and_then(|item| item.value().text())
            .filter(|s| !s.trim().is_empty())
        {
            tags.extra
                .insert("album_artist".to_string(), album_artist.trim().to_string());
        }

        Ok(ExtractedTags { tags, format })
    }
}

fn is_lossless_type(file_type: FileType) -> bool {
    matches!(
        file_type,
        FileType::Flac | FileType::Ape | FileType::Wav | FileType::Aiff | FileType::WavPack
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_unreadable_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.mp3");
        fs::write(&path, b"definitely not an mp3 stream").unwrap();

        let result = LoftyExtractor.extract(&path);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = LoftyExtractor.extract(Path::new("/no/such/file.flac"));
        assert!(matches!(result, Err(TagError::Unreadable { .. })));
    }

    /// A silent 16-bit stereo WAV file with no tag chunks.
    fn untagged_wav(path: &Path) {
        let frames: u32 = 4410;
        let data_len = frames * 4;
        let mut wav = Vec::new();
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(36 + data_len).to_le_bytes());
        wav.extend_from_slice(b"WAVEfmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes());
        wav.extend_from_slice(&2u16.to_le_bytes());
        wav.extend_from_slice(&44_100u32.to_le_bytes());
        wav.extend_from_slice(&(44_100u32 * 4).to_le_bytes());
        wav.extend_from_slice(&4u16.to_le_bytes());
        wav.extend_from_slice(&16u16.to_le_bytes());
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&data_len.to_le_bytes());
        wav.resize(wav.len() + data_len as usize, 0);
        fs::write(path, wav).unwrap();
    }

    #[test]
    fn test_untagged_file_keeps_format() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("silence.wav");
        untagged_wav(&path);

        let extracted = LoftyExtractor.extract(&path).unwrap();

        assert!(extracted.tags.is_empty());
        assert!(!extracted.tags.is_usable());
        assert!(extracted.format.lossless);
        assert!(extracted.format.bitrate_kbps.is_some_and(|b| b > 1000));
        assert_eq!(extracted.format.container.as_deref(), Some("Wav"));
    }

    #[test]
    fn test_lossless_types() {
        assert!(is_lossless_type(FileType::Flac));
        assert!(!is_lossless_type(FileType::Mpeg));
    }
}
