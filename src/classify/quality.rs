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

//! Target bitrate selection.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Bitrates a lossy source may be stepped down to, ascending.
pub const QUALITY_LADDER: [u32; 3] = [192, 256, 320];

/// Bitrates accepted as an explicit request.
pub const ALLOWED_QUALITIES: [u32; 4] = [128, 192, 256, 320];

/// Bitrate assumed for lossless sources, above every tier.
pub const LOSSLESS_BITRATE: u32 = 1000;

/// A target bitrate in kbit/s, printed the way the encoder expects (`320k`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Quality(u32);

impl Quality {
    pub const HIGHEST: Quality = Quality(320);

    pub fn kbps(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}k", self.0)
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_ascii_lowercase();
        let digits = trimmed.strip_suffix('k').unwrap_or(&trimmed);
        digits
            .parse::<u32>()
            .ok()
            .filter(|kbps| ALLOWED_QUALITIES.contains(kbps))
            .map(Quality)
            .ok_or_else(|| format!("unsupported quality '{s}', expected one of 128k, 192k, 256k, 320k"))
    }
}

impl TryFrom<String> for Quality {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Quality> for String {
    fn from(value: Quality) -> Self {
        value.to_string()
    }
}

/// Picks the encoder bitrate for a source.
///
/// An explicit request always wins. Otherwise the highest ladder tier not
/// above the source bitrate is used; unknown bitrates and anything at or
/// above 320k get 320k, sources below the lowest tier get the lowest tier.
pub fn select_quality(requested: Option<Quality>, source_kbps: Option<u32>) -> Quality {
    if let Some(quality) = requested {
        return quality;
    }

    let Some(source) = source_kbps else {
        return Quality::HIGHEST;
    };

    QUALITY_LADDER
        .iter()
        .rev()
        .find(|&&tier| tier <= source)
        .map(|&tier| Quality(tier))
        .unwrap_or(Quality(QUALITY_LADDER[0]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quality() {
        assert_eq!("320k".parse::<Quality>(), Ok(Quality(320)));
        assert_eq!("192K".parse::<Quality>(), Ok(Quality(192)));
        assert_eq!("128".parse::<Quality>(), Ok(Quality(128)));
        assert!("160k".parse::<Quality>().is_err());
        assert!("loud".parse::<Quality>().is_err());
        assert_eq!(Quality(256).to_string(), "256k");
    }

    #[test]
    fn test_select_quality() {
        assert_eq!(select_quality(None, None), Quality(320));
        assert_eq!(select_quality(None, Some(LOSSLESS_BITRATE)), Quality(320));
        assert_eq!(select_quality(None, Some(320)), Quality(320));
        assert_eq!(select_quality(None, Some(300)), Quality(256));
        assert_eq!(select_quality(None, Some(256)), Quality(256));
        assert_eq!(select_quality(None, Some(200)), Quality(192));
        assert_eq!(select_quality(None, Some(128)), Quality(192));
        assert_eq!(select_quality(Some(Quality(128)), Some(320)), Quality(128));
    }
}
