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

//! # Audio collection toolkit.
//!
//! Organizes and transcodes personal audio collections: reads embedded tags
//! into a cache, splits album images into tracks using their cue sheets,
//! converts audio to AAC, and sorts files into per-language directories.
//!
//! ## Architecture
//!
//! * [`cue`] parses cue sheets and derives each track's time range.
//! * [`classify`] holds the pure predicates: audio formats, quality tiers
//!   and the script-based language buckets.
//! * [`tags`] and [`transcode`] wrap the external collaborators behind
//!   traits, so the [`pipeline`] can be driven with fakes.
//! * [`pipeline`] walks a tree, plans jobs and runs them on a worker pool.
//! * [`db`] is the SQLite tag cache, written only by the orchestrator.
//!
//! Components log through `tracing`; installing a subscriber is left to
//! the binary.

pub mod classify;
pub mod config;
pub mod cue;
pub mod db;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod tags;
pub mod transcode;
pub mod util;
