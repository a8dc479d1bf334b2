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

//! Tag cache persistence.
//!
//! This module keeps the results of tag extraction in an SQLite database so
//! that repeated runs over the same tree skip the expensive extraction step.
//! It uses cached statements for the per-file lookups.
//!
//! # Tables
//!
//! * `tags` - One row per file path: tags, stream format, and the size and
//!   modification time the file had when it was read.
//!
//! # Concurrency
//!
//! A [`SqliteTagCache`] is owned by the orchestrator. Workers never write
//! to it, they hand their results back and the orchestrator stores them in
//! one transaction.

mod model;
pub(crate) mod scan;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

use crate::model::{ExtractedTags, FileEntry};

/// A cached extraction result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub size: u64,
    pub modified: i64,
    #[serde(flatten)]
    pub extracted: ExtractedTags,
}

impl CacheEntry {
    pub fn new(file: &FileEntry, extracted: ExtractedTags) -> Self {
        Self {
            path: file.path.clone(),
            size: file.size,
            modified: file.modified,
            extracted,
        }
    }

    /// True if the file on disk still has the size and modification time
    /// recorded when the entry was written.
    pub fn is_fresh_for(&self, file: &FileEntry) -> bool {
        self.size == file.size && self.modified == file.modified
    }
}

/// Path-keyed store of extraction results, last write wins.
pub trait TagCache {
    fn get(&self, path: &Path) -> Result<Option<CacheEntry>>;

    /// Stores all entries, returning how many were written.
    fn put_all(&mut self, entries: &[CacheEntry]) -> Result<usize>;

    fn put(&mut self, entry: &CacheEntry) -> Result<()> {
        self.put_all(std::slice::from_ref(entry)).map(|_| ())
    }
}

/// Opens a connection to the SQLite database and configures performance settings.
///
/// This function performs the following setup:
/// * **WAL Mode**: Enables Write-Ahead Logging so a reader never blocks on
///   a batch of writes.
/// * **Performance Tuning**: Sets synchronous mode to `NORMAL`.
/// * **Schema**: Executes [`create_schema`] to ensure the table exists.
///
/// Missing parent directories of `path` are created.
///
/// # Errors
///
/// Returns an error if:
/// * The database file cannot be opened.
/// * The initial PRAGMA configurations fail.
/// * The schema initialization fails.
pub fn init_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;

    let journal_mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |r| r.get(0))?;
    if journal_mode != "wal" {
        anyhow::bail!(
            "Failed to switch to WAL mode. Current mode: {}",
            journal_mode
        );
    }

    conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
    conn.set_prepared_statement_cache_capacity(16);

    create_schema(&conn)?;

    Ok(conn)
}

/// Opens a throwaway in-memory database with the same schema.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Create the database schema.
///
/// The path is the primary key, so re-parsing a file replaces its row.
///
/// # Errors
///
/// Returns an error if the transaction fails, if there are permission issues
/// with the database file, or if the SQL syntax is invalid.
fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "BEGIN;

        CREATE TABLE IF NOT EXISTS tags (
            path TEXT PRIMARY KEY NOT NULL,
            filename TEXT NOT NULL,
            size INTEGER NOT NULL,
            modified INTEGER NOT NULL,
            title TEXT,
            artist TEXT,
            album TEXT,
            bitrate INTEGER,
            lossless INTEGER NOT NULL DEFAULT 0,
            container TEXT,
            extra TEXT NOT NULL DEFAULT '{}'
        );

        COMMIT;",
    )
    .context("Failed to create schema")
}

/// [`TagCache`] backed by an SQLite connection.
pub struct SqliteTagCache {
    conn: Connection,
}

impl SqliteTagCache {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Opens (or creates) the cache database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(init_db(path)?))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(open_in_memory()?))
    }

    /// Every cached entry, ordered by path.
    pub fn entries(&self) -> Result<Vec<CacheEntry>> {
        scan::load_entries(&self.conn)
    }

    pub fn len(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM tags", [], |r| r.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

impl TagCache for SqliteTagCache {
    fn get(&self, path: &Path) -> Result<Option<CacheEntry>> {
        // such paths are never stored
        let Some(key) = path.to_str() else {
            return Ok(None);
        };
        let mut stmt = self.conn.prepare_cached(
            "SELECT path, size, modified, title, artist, album, bitrate, lossless, container, extra
             FROM tags
             WHERE path = ?",
        )?;

        let entry = stmt
            .query_row(params![key], CacheEntry::from_row)
            .optional()
            .with_context(|| format!("Failed to read cache entry for {}", path.display()))?;

        Ok(entry)
    }

    fn put_all(&mut self, entries: &[CacheEntry]) -> Result<usize> {
        scan::save_entries(&mut self.conn, entries)
    }
}
