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

//! Batch persistence of extraction results.
//!
//! Large parses are written within one SQLite transaction to maximize write
//! throughput and so that an interrupted run never leaves half a batch.

use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use tracing::{debug, warn};

use crate::db::CacheEntry;

/// Inserts or replaces all `entries` in one transaction.
///
/// # Returns
///
/// The number of rows written. Entries whose path is not valid UTF-8 are
/// logged and left out, they never fail the batch.
///
/// # Errors
///
/// Returns an error if the transaction fails or if the extra fields cannot
/// be serialized.
pub(crate) fn save_entries(conn: &mut Connection, entries: &[CacheEntry]) -> Result<usize> {
    let tx = conn.transaction()?;
    let mut written = 0;

    {
        let mut stmt = tx.prepare_cached(
            "INSERT OR REPLACE INTO tags
             (path, filename, size, modified, title, artist, album, bitrate, lossless, container, extra)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )?;

        for entry in entries {
            let Some(path) = entry.path.to_str() else {
                warn!("Not caching {}: path is not valid UTF-8", entry.path.display());
                continue;
            };
            let filename = entry
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let tags = &entry.extracted.tags;
            let format = &entry.extracted.format;
            let extra = serde_json::to_string(&tags.extra)?;

            written += stmt.execute(params![
                path,
                filename,
                i64::try_from(entry.size).unwrap_or(i64::MAX),
                entry.modified,
                tags.title,
                tags.artist,
                tags.album,
                format.bitrate_kbps,
                format.lossless,
                format.container,
                extra,
            ])?;
        }
    }

    tx.commit().context("Failed to commit transaction")?;

    debug!("{} cache rows written", written);
    Ok(written)
}

/// Reads every cached entry, ordered by path.
pub(crate) fn load_entries(conn: &Connection) -> Result<Vec<CacheEntry>> {
    let mut stmt = conn.prepare_cached(
        "SELECT path, size, modified, title, artist, album, bitrate, lossless, container, extra
         FROM tags
         ORDER BY path",
    )?;

    let results = stmt
        .query_map([], CacheEntry::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(results)
}
