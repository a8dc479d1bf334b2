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

//! Line parser for decoded cue sheet text.
//!
//! Only the commands that matter for splitting are interpreted: `FILE`,
//! `TRACK`, `INDEX`, `TITLE` and `PERFORMER`. Everything else, including
//! `REM`, is ignored. Structural mistakes are reported as a message so the
//! caller can retry with another encoding.

use crate::cue::{CueFile, CueIndex, CueSheet, CueTime, CueTrack};

pub(crate) fn parse_text(text: &str) -> Result<CueSheet, String> {
    let mut sheet = CueSheet::default();
    let mut in_track = false;

    for (i, raw_line) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw_line.trim_start_matches('\u{feff}').trim();
        if line.is_empty() {
            continue;
        }

        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command.to_ascii_uppercase().as_str() {
            "TITLE" => {
                let value = unquote(rest);
                match current_track(&mut sheet, in_track) {
                    Some(track) => track.title = Some(value),
                    None => sheet.title = Some(value),
                }
            }
            "PERFORMER" => {
                let value = unquote(rest);
                match current_track(&mut sheet, in_track) {
                    Some(track) => track.performer = Some(value),
                    None => sheet.performer = Some(value),
                }
            }
            "FILE" => {
                let (name, kind) = split_file_args(rest);
                if name.is_empty() {
                    return Err(format!("line {line_no}: FILE without a name"));
                }
                sheet.files.push(CueFile {
                    name,
                    kind,
                    tracks: Vec::new(),
                });
                in_track = false;
            }
            "TRACK" => {
                let previous = sheet.tracks().last().map(|t| t.number);
                let file = sheet
                    .files
                    .last_mut()
                    .ok_or_else(|| format!("line {line_no}: TRACK before FILE"))?;

                let mut args = rest.split_whitespace();
                let number: u32 = args
                    .next()
                    .and_then(|n| n.parse().ok())
                    .ok_or_else(|| format!("line {line_no}: bad track number"))?;
                if number == 0 || previous.is_some_and(|p| number <= p) {
                    return Err(format!("line {line_no}: track {number} out of order"));
                }

                file.tracks.push(CueTrack {
                    number,
                    kind: args.next().unwrap_or("AUDIO").to_string(),
                    title: None,
                    performer: None,
                    indexes: Vec::new(),
                });
                in_track = true;
            }
            "INDEX" => {
                let track = current_track(&mut sheet, in_track)
                    .ok_or_else(|| format!("line {line_no}: INDEX outside a TRACK"))?;

                let mut args = rest.split_whitespace();
                let number: u32 = args
                    .next()
                    .and_then(|n| n.parse().ok())
                    .ok_or_else(|| format!("line {line_no}: bad index number"))?;
                let time = args
                    .next()
                    .and_then(CueTime::parse_cue)
                    .ok_or_else(|| format!("line {line_no}: bad index timestamp"))?;

                track.indexes.push(CueIndex { number, time });
            }
            _ => {}
        }
    }

    if let Some(track) = sheet.tracks().find(|t| t.indexes.is_empty()) {
        return Err(format!("track {} has no INDEX", track.number));
    }

    Ok(sheet)
}

fn current_track(sheet: &mut CueSheet, in_track: bool) -> Option<&mut CueTrack> {
    if !in_track {
        return None;
    }
    sheet.files.last_mut().and_then(|f| f.tracks.last_mut())
}

/// Strips one pair of surrounding quotes, tolerating a missing closing one.
fn unquote(value: &str) -> String {
    let value = value.trim();
    let value = value.strip_prefix('"').unwrap_or(value);
    let value = value.strip_suffix('"').unwrap_or(value);
    value.to_string()
}

/// Splits `"name with spaces.flac" WAVE` into name and file type.
fn split_file_args(rest: &str) -> (String, Option<String>) {
    let rest = rest.trim();

    if let Some(quoted) = rest.strip_prefix('"') {
        return match quoted.rfind('"') {
            Some(end) => {
                let kind = quoted[end + 1..].trim();
                (
                    quoted[..end].to_string(),
                    (!kind.is_empty()).then(|| kind.to_string()),
                )
            }
            None => (quoted.to_string(), None),
        };
    }

    match rest.rsplit_once(char::is_whitespace) {
        Some((name, kind)) => (name.trim().to_string(), Some(kind.to_string())),
        None => (rest.to_string(), None),
    }
}
