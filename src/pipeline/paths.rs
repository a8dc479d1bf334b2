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

//! Output naming and placement for converted files.

use std::path::{Component, Path, PathBuf};

use crate::classify::{Quality, TARGET_EXTENSION};

/// Where converted files are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputLayout {
    /// Next to the source file.
    #[default]
    Alongside,
    /// Under `root`, keeping the last `segments` directories of the source.
    Under { root: PathBuf, segments: usize },
}

impl OutputLayout {
    pub fn output_dir(&self, source: &Path) -> PathBuf {
        let parent = source.parent().unwrap_or(Path::new(""));
        match self {
            OutputLayout::Alongside => parent.to_path_buf(),
            OutputLayout::Under { root, segments } => {
                let names: Vec<_> = parent
                    .components()
                    .filter_map(|c| match c {
                        Component::Normal(name) => Some(name),
                        _ => None,
                    })
                    .collect();
                let keep = names.len().saturating_sub(*segments);
                names[keep..].iter().fold(root.clone(), |dir, name| dir.join(name))
            }
        }
    }

    /// Every place a converted copy of `source` may already exist, the
    /// configured output first.
    pub fn candidates(&self, source: &Path, name: &str) -> Vec<PathBuf> {
        let mut paths = vec![self.output_dir(source).join(name)];
        let alongside = source.with_file_name(name);
        if !paths.contains(&alongside) {
            paths.push(alongside);
        }
        paths
    }
}

/// `<stem>.m4a`, or `<stem> [320k].m4a` with a bitrate suffix.
pub fn target_file_name(source: &Path, quality: Option<Quality>) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match quality {
        Some(q) => format!("{} [{}].{}", stem, q, TARGET_EXTENSION),
        None => format!("{}.{}", stem, TARGET_EXTENSION),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_file_name() {
        let source = Path::new("/music/Album/01 Song.flac");
        assert_eq!(target_file_name(source, None), "01 Song.m4a");
        assert_eq!(
            target_file_name(source, Some(Quality::HIGHEST)),
            "01 Song [320k].m4a"
        );
    }

    #[test]
    fn test_alongside() {
        let layout = OutputLayout::Alongside;
        let source = Path::new("/music/Album/01.flac");
        assert_eq!(layout.output_dir(source), PathBuf::from("/music/Album"));
        assert_eq!(
            layout.candidates(source, "01.m4a"),
            vec![PathBuf::from("/music/Album/01.m4a")]
        );
    }

    #[test]
    fn test_under_root_keeps_segments() {
        let source = Path::new("/music/Lossless/Artist/Album/01.flac");

        let one = OutputLayout::Under {
            root: PathBuf::from("/out"),
            segments: 1,
        };
        assert_eq!(one.output_dir(source), PathBuf::from("/out/Album"));

        let three = OutputLayout::Under {
            root: PathBuf::from("/out"),
            segments: 3,
        };
        assert_eq!(
            three.output_dir(source),
            PathBuf::from("/out/Lossless/Artist/Album")
        );
        assert_eq!(
            three.candidates(source, "01.m4a"),
            vec![
                PathBuf::from("/out/Lossless/Artist/Album/01.m4a"),
                PathBuf::from("/music/Lossless/Artist/Album/01.m4a"),
            ]
        );
    }

    #[test]
    fn test_shallow_source() {
        let layout = OutputLayout::Under {
            root: PathBuf::from("/out"),
            segments: 3,
        };
        assert_eq!(layout.output_dir(Path::new("/a/01.flac")), PathBuf::from("/out/a"));
    }
}
