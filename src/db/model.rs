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

//! Database row mapping for cache entries.
//!
//! This module provides the conversion logic between raw SQLite result rows
//! and [`CacheEntry`] values, ensuring type-safe extraction of model
//! attributes from database queries.

use std::{collections::BTreeMap, path::PathBuf};

use rusqlite::{Row, types::Type};

use crate::{
    db::CacheEntry,
    model::{ExtractedTags, FormatInfo, TagRecord},
};

impl CacheEntry {
    /// Maps an SQLite row to a [`CacheEntry`] instance.
    ///
    /// This is a helper function designed to be used with
    /// [`rusqlite::Statement::query_map`]. Columns are expected in the order
    /// `path, size, modified, title, artist, album, bitrate, lossless,
    /// container, extra`.
    ///
    /// # Errors
    ///
    /// Returns a [`rusqlite::Error`] if:
    /// * The row does not contain enough columns.
    /// * The data in a column cannot be converted to the required Rust type.
    /// * The `extra` column is not a JSON object of strings.
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let path: String = row.get(0)?;
        let size: i64 = row.get(1)?;
        let bitrate: Option<i64> = row.get(6)?;
        let extra: String = row.get(9)?;

        let extra: BTreeMap<String, String> = serde_json::from_str(&extra)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e)))?;

        Ok(Self {
            path: PathBuf::from(path),
            size: u64::try_from(size).unwrap_or_default(),
            modified: row.get(2)?,
            extracted: ExtractedTags {
                tags: TagRecord {
                    title: row.get(3)?,
                    artist: row.get(4)?,
                    album: row.get(5)?,
                    extra,
                },
                format: FormatInfo {
                    bitrate_kbps: bitrate.and_then(|b| u32::try_from(b).ok()),
                    lossless: row.get(7)?,
                    container: row.get(8)?,
                },
            },
        })
    }
}
