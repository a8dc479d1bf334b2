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

use std::{path::Path, time::Duration};

/// Formats an elapsed time using its largest non-zero unit.
///
/// Used in progress and summary logs where precision does not matter.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use audiokit::util::format::human_duration;
///
/// assert_eq!(human_duration(Duration::from_secs(65)), "1 minute");
/// assert_eq!(human_duration(Duration::from_millis(450)), "450 ms");
/// ```
pub fn human_duration(elapsed: Duration) -> String {
    let plural = |n: u64, unit: &str| format!("{} {}{}", n, unit, if n > 1 { "s" } else { "" });

    let total = elapsed.as_secs();
    let units = [
        (total / 86_400, "day"),
        ((total % 86_400) / 3_600, "hour"),
        ((total % 3_600) / 60, "minute"),
        (total % 60, "second"),
    ];

    units
        .iter()
        .find(|(n, _)| *n > 0)
        .map(|&(n, unit)| plural(n, unit))
        .unwrap_or_else(|| format!("{} ms", elapsed.as_millis()))
}

/// Formats a byte count with SI prefixes, e.g. `1.50 MB`.
pub fn file_size(bytes: u64) -> String {
    const UNITS: [&str; 8] = ["kB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

    if bytes < 1000 {
        return format!("{} Bytes", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() {
        value /= 1000.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit - 1])
}

/// Shortens a long path for display by dropping leading segments.
///
/// Paths shorter than `width`, or with fewer than four segments, are
/// returned unchanged.
pub fn short_path(path: &Path, width: usize) -> String {
    let full = path.display().to_string();
    let parts: Vec<_> = path.iter().map(|p| p.to_string_lossy()).collect();
    if full.chars().count() < width || parts.len() < 4 {
        return full;
    }

    let total: usize = parts.iter().map(|p| p.chars().count()).sum();
    let mut dropped = 0;
    let mut index = 0;
    for (i, part) in parts.iter().enumerate() {
        index = i;
        if total - dropped < width {
            break;
        }
        dropped += part.chars().count();
    }

    path.iter().skip(index).collect::<std::path::PathBuf>().display().to_string()
}

/// Keeps at most `limit` characters of `text`, marking the cut with `...`.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_duration() {
        assert_eq!(human_duration(Duration::from_millis(12)), "12 ms");
        assert_eq!(human_duration(Duration::from_secs(1)), "1 second");
        assert_eq!(human_duration(Duration::from_secs(12)), "12 seconds");
        assert_eq!(human_duration(Duration::from_secs(7_300)), "2 hours");
        assert_eq!(human_duration(Duration::from_secs(200_000)), "2 days");
    }

    #[test]
    fn test_file_size() {
        assert_eq!(file_size(999), "999 Bytes");
        assert_eq!(file_size(1_500), "1.50 kB");
        assert_eq!(file_size(1_500_000), "1.50 MB");
        assert_eq!(file_size(3_210_000_000), "3.21 GB");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("exactly", 7), "exactly");
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        assert_eq!(truncate_chars("晴天晴天", 2), "晴天...");
    }

    #[test]
    fn test_short_path() {
        assert_eq!(short_path(Path::new("/a/b.mp3"), 48), "/a/b.mp3");

        let long = Path::new("/media/storage/Music/Lossless/Some Artist/Some Album/01 Song.flac");
        let short = short_path(long, 40);
        assert!(short.ends_with("01 Song.flac"));
        assert!(short.len() < long.as_os_str().len());
    }
}
