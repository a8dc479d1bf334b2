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

//! Cue sheet timestamps.
//!
//! A cue timestamp is `MM:SS:FF` where `FF` counts Red Book frames, 75 to
//! the second. Minutes are not bounded, a 90 minute image is `90:00:00`.

use std::fmt;

pub const FRAMES_PER_SECOND: u32 = 75;

/// A position inside an audio image, as written in an `INDEX` line.
///
/// Ordering compares minutes, then seconds, then frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CueTime {
    pub minutes: u32,
    pub seconds: u32,
    pub frames: u32,
}

impl CueTime {
    pub fn new(minutes: u32, seconds: u32, frames: u32) -> Self {
        Self {
            minutes,
            seconds,
            frames,
        }
    }

    /// Whole seconds from the start of the image, frames ignored.
    pub fn total_seconds(&self) -> u64 {
        u64::from(self.minutes) * 60 + u64::from(self.seconds)
    }

    /// Parses the `MM:SS:FF` form used inside cue sheets.
    ///
    /// Returns `None` for anything but three numeric fields, or when seconds
    /// or frames are out of range.
    pub fn parse_cue(s: &str) -> Option<Self> {
        let mut parts = s.trim().split(':');
        let minutes = parts.next()?.parse().ok()?;
        let seconds = parts.next()?.parse().ok()?;
        let frames = parts.next()?.parse().ok()?;
        if parts.next().is_some() || seconds >= 60 || frames >= FRAMES_PER_SECOND {
            return None;
        }
        Some(Self::new(minutes, seconds, frames))
    }

    /// Renders the timestamp as `HH:MM:SS.CC` for the transcoder.
    ///
    /// The fractional field is the frame count printed as two digits. This
    /// is not an exact conversion to hundredths, but it keeps rendering and
    /// [`CueTime::parse_rendered`] lossless.
    ///
    /// ```
    /// use audiokit::cue::CueTime;
    ///
    /// assert_eq!(CueTime::new(63, 2, 45).render(), "01:03:02.45");
    /// ```
    pub fn render(&self) -> String {
        format!(
            "{:02}:{:02}:{:02}.{:02}",
            self.minutes / 60,
            self.minutes % 60,
            self.seconds,
            self.frames
        )
    }

    /// Reverse of [`CueTime::render`].
    pub fn parse_rendered(s: &str) -> Option<Self> {
        let (clock, fraction) = s.trim().split_once('.')?;
        let mut parts = clock.split(':');
        let hours: u32 = parts.next()?.parse().ok()?;
        let minutes: u32 = parts.next()?.parse().ok()?;
        let seconds: u32 = parts.next()?.parse().ok()?;
        let frames: u32 = fraction.parse().ok()?;
        if parts.next().is_some() || minutes >= 60 || seconds >= 60 {
            return None;
        }
        let minutes = hours.checked_mul(60)?.checked_add(minutes)?;
        Some(Self::new(minutes, seconds, frames))
    }
}

impl fmt::Display for CueTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.minutes, self.seconds, self.frames
        )
    }
}
