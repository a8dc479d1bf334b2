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

//! Track boundary calculation.
//!
//! Turns the ordered TRACK list of one FILE block into playback ranges. A
//! track ends where the next one starts; the last track runs to the end of
//! the file. Encoders disagree on where a pre-gap belongs, so the end of a
//! track is picked with a few rules of thumb rather than always taking the
//! next track's `INDEX 01`.

use std::path::Path;

use crate::cue::{CueError, CueTime, CueTrack};

/// Playback range of a single track inside its audio image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackRange {
    pub number: u32,
    pub start: CueTime,
    /// `None` means "until the end of the file".
    pub end: Option<CueTime>,
}

impl TrackRange {
    /// Start rendered as `HH:MM:SS.CC`.
    pub fn start_stamp(&self) -> String {
        self.start.render()
    }

    /// End rendered as `HH:MM:SS.CC`, if the track has one.
    pub fn end_stamp(&self) -> Option<String> {
        self.end.map(|t| t.render())
    }
}

/// Computes one [`TrackRange`] per track, in track order.
///
/// `source` only serves to identify the sheet in errors.
///
/// # Errors
///
/// Returns [`CueError::InvalidTrackTiming`] naming the first track that
/// starts before the track preceding it (compared in whole seconds). No
/// ranges are returned in that case, the whole sheet is rejected.
pub fn track_ranges(tracks: &[CueTrack], source: &Path) -> Result<Vec<TrackRange>, CueError> {
    let mut ranges = Vec::with_capacity(tracks.len());

    for (i, track) in tracks.iter().enumerate() {
        let start = track.start_index().ok_or_else(|| {
            CueError::InvalidCueFormat(format!("track {} has no INDEX", track.number))
        })?;

        let next = tracks.get(i + 1);
        let end = next.and_then(|next| next_boundary(next, i == 0));

        if let (Some(next), Some(end)) = (next, end) {
            // Blame the track whose index goes backwards.
            if end.total_seconds() < start.total_seconds() {
                return Err(CueError::InvalidTrackTiming {
                    number: next.number,
                    title: next.title.clone().unwrap_or_default(),
                    file: source.to_path_buf(),
                });
            }
        }

        ranges.push(TrackRange {
            number: track.number,
            start,
            end,
        });
    }

    Ok(ranges)
}

/// Where the track before `next` stops.
fn next_boundary(next: &CueTrack, is_first: bool) -> Option<CueTime> {
    let first = next.first_index()?;

    // The first track always ends at whatever the second track declares
    // first, pre-gap included.
    if is_first || next.indexes.len() == 1 {
        return Some(first);
    }

    // Some encoders write an INDEX 00 that is wrong; take the later mark.
    let start = next.start_index().unwrap_or(first);
    Some(first.max(start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cue::CueIndex;
    use std::path::PathBuf;

    fn track(number: u32, indexes: &[(u32, CueTime)]) -> CueTrack {
        CueTrack {
            number,
            kind: "AUDIO".to_string(),
            title: Some(format!("Track {number}")),
            performer: None,
            indexes: indexes
                .iter()
                .map(|&(number, time)| CueIndex { number, time })
                .collect(),
        }
    }

    fn source() -> PathBuf {
        PathBuf::from("/music/album.cue")
    }

    #[test]
    fn test_two_track_album() {
        let tracks = vec![
            track(1, &[(1, CueTime::new(0, 0, 0))]),
            track(2, &[(0, CueTime::new(3, 0, 0)), (1, CueTime::new(3, 2, 0))]),
        ];

        let ranges = track_ranges(&tracks, &source()).unwrap();

        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].start_stamp(), "00:00:00.00");
        assert_eq!(ranges[0].end_stamp().as_deref(), Some("00:03:00.00"));
        assert_eq!(ranges[1].start_stamp(), "00:03:02.00");
        assert_eq!(ranges[1].end_stamp(), None);
    }

    #[test]
    fn test_middle_track_takes_later_index() {
        let tracks = vec![
            track(1, &[(1, CueTime::new(0, 0, 0))]),
            track(2, &[(1, CueTime::new(4, 0, 0))]),
            // INDEX 00 after INDEX 01, as written by some broken encoders.
            track(3, &[(0, CueTime::new(8, 10, 0)), (1, CueTime::new(8, 5, 0))]),
            track(4, &[(0, CueTime::new(12, 0, 0)), (1, CueTime::new(12, 1, 30))]),
        ];

        let ranges = track_ranges(&tracks, &source()).unwrap();

        assert_eq!(ranges[1].end, Some(CueTime::new(8, 10, 0)));
        assert_eq!(ranges[2].end, Some(CueTime::new(12, 1, 30)));
        assert_eq!(ranges[3].start, CueTime::new(12, 1, 30));
        assert_eq!(ranges[3].end, None);
    }

    #[test]
    fn test_single_track() {
        let tracks = vec![track(1, &[(1, CueTime::new(0, 0, 33))])];
        let ranges = track_ranges(&tracks, &source()).unwrap();
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].end, None);
    }

    #[test]
    fn test_ranges_are_contiguous() {
        let tracks: Vec<_> = (1..=12)
            .map(|n| track(n, &[(1, CueTime::new(n * 4, n % 60, n))]))
            .collect();

        let ranges = track_ranges(&tracks, &source()).unwrap();

        assert_eq!(ranges.len(), tracks.len());
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].end, Some(pair[1].start));
        }
        assert_eq!(ranges.last().unwrap().end, None);
    }

    #[test]
    fn test_backwards_timestamp_fails_sheet() {
        let tracks = vec![
            track(1, &[(1, CueTime::new(2, 0, 0))]),
            track(2, &[(1, CueTime::new(5, 0, 0))]),
            track(3, &[(1, CueTime::new(4, 0, 0))]),
        ];

        match track_ranges(&tracks, &source()) {
            Err(CueError::InvalidTrackTiming { number, title, file }) => {
                assert_eq!(number, 3);
                assert_eq!(title, "Track 3");
                assert_eq!(file, source());
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_second_track_before_first() {
        let tracks = vec![
            track(1, &[(1, CueTime::new(2, 0, 0))]),
            track(2, &[(1, CueTime::new(1, 0, 0))]),
        ];

        let err = track_ranges(&tracks, &source()).unwrap_err();
        assert!(matches!(err, CueError::InvalidTrackTiming { number: 2, .. }));
    }

    #[test]
    fn test_frames_ignored_for_ordering() {
        let tracks = vec![
            track(1, &[(1, CueTime::new(0, 0, 0))]),
            track(2, &[(1, CueTime::new(3, 0, 50))]),
            track(3, &[(1, CueTime::new(3, 0, 10))]),
        ];
        assert!(track_ranges(&tracks, &source()).is_ok());
    }
}
