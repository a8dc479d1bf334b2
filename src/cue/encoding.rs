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

//! Character encoding detection for cue sheets.
//!
//! Cue sheets ripped on East-Asian systems are rarely UTF-8. The detector's
//! guess is only trusted when it lands in a small allow-list, anything else
//! falls back to a configurable default.

use std::borrow::Cow;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, GB18030, GBK, UTF_8};

/// Encodings a detector guess is accepted for. GB2312 is an alias of GBK.
const ALLOWED_ENCODINGS: &[&Encoding] = &[GB18030, GBK, UTF_8];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Default used when the detector's guess is not allowed and nothing else
/// was configured.
pub fn default_fallback() -> &'static Encoding {
    GBK
}

/// Looks up an encoding by any WHATWG label, e.g. `gb2312` or `utf8`.
pub fn encoding_for_label(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}

pub fn is_allowed(encoding: &'static Encoding) -> bool {
    ALLOWED_ENCODINGS.contains(&encoding)
}

/// Guesses the encoding of raw cue bytes.
///
/// A UTF-8 byte order mark is decisive. Otherwise the detector's guess is
/// used if allowed, else `fallback`.
pub fn detect(raw: &[u8], fallback: &'static Encoding) -> &'static Encoding {
    if raw.starts_with(UTF8_BOM) {
        return UTF_8;
    }

    let mut detector = EncodingDetector::new();
    detector.feed(raw, true);
    let guess = detector.guess(None, true);

    if is_allowed(guess) {
        guess
    } else {
        tracing::trace!("encoding guess {} not allowed, using {}", guess.name(), fallback.name());
        fallback
    }
}

/// Strictly decodes `raw`, failing on any malformed sequence.
pub(crate) fn decode<'a>(raw: &'a [u8], encoding: &'static Encoding) -> Result<Cow<'a, str>, String> {
    let bytes = if encoding == UTF_8 {
        raw.strip_prefix(UTF8_BOM).unwrap_or(raw)
    } else {
        raw
    };

    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .ok_or_else(|| format!("malformed {} input", encoding.name()))
}
