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

//! File classification.
//!
//! Pure predicates deciding what a path is (audio, lossless, cue sheet,
//! already in the target format) and which language bucket a piece of
//! metadata text belongs to. Quality tier selection lives in [`quality`].

pub mod quality;

use std::{fmt, path::Path, str::FromStr, sync::LazyLock};

use regex::Regex;

pub use quality::{Quality, select_quality};

/// Extensions recognised as audio, lower case.
pub const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "m4a", "aac", "ogg", "wma", "ape", "flac", "tta", "dts", "vox", "wav",
];

/// Extensions of lossless formats, lower case.
pub const LOSSLESS_EXTENSIONS: &[&str] = &["ape", "flac", "wav", "tta", "dts"];

/// Extension of the transcoder's output container.
pub const TARGET_EXTENSION: &str = "m4a";

pub const CUE_EXTENSION: &str = "cue";

/// Lower-cased extension of `path`, if any.
pub fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

fn has_extension(path: &Path, set: &[&str]) -> bool {
    extension(path).is_some_and(|ext| set.contains(&ext.as_str()))
}

pub fn is_audio_file(path: &Path) -> bool {
    has_extension(path, AUDIO_EXTENSIONS)
}

pub fn is_lossless_audio(path: &Path) -> bool {
    has_extension(path, LOSSLESS_EXTENSIONS)
}

pub fn is_cue_sheet(path: &Path) -> bool {
    has_extension(path, &[CUE_EXTENSION])
}

/// True if `path` is already in the container the transcoder produces.
pub fn is_target_format(path: &Path) -> bool {
    has_extension(path, &[TARGET_EXTENSION])
}

/// Language bucket used to organise files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Language {
    Japanese,
    Korean,
    Chinese,
    English,
    /// Mixed or unrecognised script.
    Unknown,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::Japanese,
        Language::Korean,
        Language::Chinese,
        Language::English,
        Language::Unknown,
    ];

    /// Short code used in directory names.
    pub fn code(&self) -> &'static str {
        match self {
            Language::Japanese => "ja",
            Language::Korean => "kr",
            Language::Chinese => "cn",
            Language::English => "en",
            Language::Unknown => "xx",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|l| l.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown language '{s}', expected one of ja, kr, cn, en, xx"))
    }
}

static KANA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{Hiragana}\p{Katakana}]").expect("valid regex"));
static HANGUL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{Hangul}").expect("valid regex"));
static HAN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\p{Han}").expect("valid regex"));

/// Classifies metadata text by script.
///
/// This is first-match, not best-match: kana wins over Hangul, which wins
/// over Han. Only pure ASCII counts as English.
///
/// ```
/// use audiokit::classify::{Language, classify_language};
///
/// assert_eq!(classify_language("カラオケ 노래"), Language::Japanese);
/// ```
pub fn classify_language(text: &str) -> Language {
    if KANA.is_match(text) {
        Language::Japanese
    } else if HANGUL.is_match(text) {
        Language::Korean
    } else if HAN.is_match(text) {
        Language::Chinese
    } else if text.is_ascii() {
        Language::English
    } else {
        Language::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_audio_file() {
        assert!(is_audio_file(Path::new("song.mp3")));
        assert!(is_audio_file(Path::new("/a/b/Song.WAV")));
        assert!(is_audio_file(Path::new("x.dts")));
        assert!(!is_audio_file(Path::new("cover.jpg")));
        assert!(!is_audio_file(Path::new("album.cue")));
        assert!(!is_audio_file(Path::new("noext")));
    }

    #[test]
    fn test_is_lossless_audio() {
        assert!(is_lossless_audio(Path::new("track.FLAC")));
        assert!(is_lossless_audio(Path::new("image.ape")));
        assert!(!is_lossless_audio(Path::new("track.mp3")));
        assert!(!is_lossless_audio(Path::new("track.m4a")));
    }

    #[test]
    fn test_target_and_cue() {
        assert!(is_target_format(Path::new("a.M4A")));
        assert!(!is_target_format(Path::new("a.aac")));
        assert!(is_cue_sheet(Path::new("Album.CUE")));
    }

    #[test]
    fn test_classify_priority() {
        assert_eq!(classify_language("カラオケ 노래"), Language::Japanese);
        assert_eq!(classify_language("ひらがな 漢字"), Language::Japanese);
        assert_eq!(classify_language("노래 中文"), Language::Korean);
        assert_eq!(classify_language("周杰伦 - 晴天.mp3"), Language::Chinese);
        assert_eq!(classify_language("Queen - Bohemian Rhapsody.mp3"), Language::English);
        assert_eq!(classify_language("Beyoncé - Halo.mp3"), Language::Unknown);
        assert_eq!(classify_language("Кино - Группа крови"), Language::Unknown);
    }

    #[test]
    fn test_language_codes() {
        for language in Language::ALL {
            assert_eq!(language.code().parse::<Language>(), Ok(language));
        }
        assert_eq!("JA".parse::<Language>(), Ok(Language::Japanese));
        assert!("de".parse::<Language>().is_err());
    }
}
