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

//! Source tree discovery.

use std::{io, path::Path};

use anyhow::{Result, bail};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::{model::FileEntry, util::format::file_size};

/// Recursively lists the regular files under `root`, sorted by path.
///
/// Symbolic links are not followed. Files that disappear between being
/// listed and being examined are dropped without complaint; other
/// unreadable entries are logged and dropped.
///
/// # Errors
///
/// Returns an error only if `root` is not a directory.
pub fn discover(root: &Path) -> Result<Vec<FileEntry>> {
    if !root.is_dir() {
        bail!("Source '{}' does not exist or is not a directory", root.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if is_not_found(e.io_error()) => {
                trace!("Vanished during walk: {:?}", e.path());
                continue;
            }
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        match FileEntry::from_path(entry.path()) {
            Ok(file) => files.push(file),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                trace!("Vanished during walk: {}", entry.path().display());
            }
            Err(e) => warn!("Skipping {}: {}", entry.path().display(), e),
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(
        "Found {} files ({}) under {}",
        files.len(),
        file_size(files.iter().map(|f| f.size).sum()),
        root.display()
    );

    Ok(files)
}

fn is_not_found(error: Option<&io::Error>) -> bool {
    error.is_some_and(|e| e.kind() == io::ErrorKind::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_discover_sorted_files_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b/c")).unwrap();
        fs::write(dir.path().join("b/c/2.flac"), b"x").unwrap();
        fs::write(dir.path().join("a.mp3"), b"xy").unwrap();
        fs::write(dir.path().join("b/1.cue"), b"").unwrap();

        let files = discover(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.path.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            names,
            vec![
                Path::new("a.mp3").to_path_buf(),
                Path::new("b/1.cue").to_path_buf(),
                Path::new("b/c/2.flac").to_path_buf(),
            ]
        );
        assert_eq!(files[0].size, 2);
    }

    #[test]
    fn test_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover(&dir.path().join("nope")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("x.flac"), b"x").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        assert!(discover(dir.path()).unwrap().is_empty());
    }
}
