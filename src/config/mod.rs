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

//! Application configuration.
//!
//! This module manages the application configuration file. Values here are
//! defaults for every run; command line flags override them for one run.

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    classify::Quality,
    cue::encoding,
    model::Encoder,
};

const CONFIG_NAME: &str = "audiokit";

const CACHE_FILE: &str = "tags.db";

/// Upper bound on worker threads, whatever the configuration says.
pub const MAX_JOBS: usize = 16;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub version: u32,
    /// Worker count; derived from the available parallelism when absent.
    pub jobs: Option<usize>,
    pub encoder: Encoder,
    /// Explicit target bitrate, e.g. `256k`. Derived per file when absent.
    pub quality: Option<Quality>,
    /// Append `[<n>k]` to converted file names.
    pub bitrate_suffix: bool,
    pub output_root: Option<PathBuf>,
    /// Trailing source path segments kept under `output_root`.
    pub output_segments: usize,
    /// Used when the detected cue sheet encoding is not an accepted one.
    pub fallback_encoding: String,
    pub cache_file: Option<PathBuf>,
    pub check_cache_staleness: bool,
    /// Seconds before a transcoder process is killed, `0` for no limit.
    pub job_timeout_secs: u64,
    /// Characters of transcoder output kept for a failed job.
    pub diagnostic_limit: usize,
    pub ffmpeg: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            jobs: None,
            encoder: Encoder::Aac,
            quality: None,
            bitrate_suffix: false,
            output_root: None,
            output_segments: 1,
            fallback_encoding: encoding::default_fallback().name().to_string(),
            cache_file: None,
            check_cache_staleness: true,
            job_timeout_secs: 1800,
            diagnostic_limit: 200,
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}

impl AppConfig {
    /// The worker count, clamped to `1..=MAX_JOBS`.
    pub fn worker_count(&self) -> usize {
        self.jobs.unwrap_or_else(default_jobs).clamp(1, MAX_JOBS)
    }

    pub fn segments(&self) -> usize {
        self.output_segments.clamp(1, 3)
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        (self.job_timeout_secs > 0).then(|| Duration::from_secs(self.job_timeout_secs))
    }

    /// Resolves the fallback encoding label, reverting to the built-in
    /// default when the label is unknown or not an accepted encoding.
    pub fn fallback_encoding(&self) -> &'static Encoding {
        match encoding::encoding_for_label(&self.fallback_encoding) {
            Some(enc) if encoding::is_allowed(enc) => enc,
            _ => {
                warn!(
                    "Ignoring unsupported fallback encoding {:?}",
                    self.fallback_encoding
                );
                encoding::default_fallback()
            }
        }
    }

    /// The cache database location, by default next to the config file.
    pub fn cache_path(&self) -> Result<PathBuf> {
        match &self.cache_file {
            Some(path) => Ok(path.clone()),
            None => default_cache_path(),
        }
    }
}

/// One fewer than the available cores, so the machine stays usable.
fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map_or(1, |n| n.get().saturating_sub(1))
        .max(1)
}

pub fn load_config() -> AppConfig {
    confy::load(CONFIG_NAME, None).unwrap_or_else(|e| {
        warn!("Failed to load configuration, using defaults: {}", e);
        AppConfig::default()
    })
}

pub fn save_config(cfg: &AppConfig) -> Result<(), confy::ConfyError> {
    confy::store(CONFIG_NAME, None, cfg)
}

pub fn config_path() -> Result<PathBuf> {
    confy::get_configuration_file_path(CONFIG_NAME, None)
        .context("Failed to resolve configuration file path")
}

pub fn default_cache_path() -> Result<PathBuf> {
    let config = config_path()?;
    let dir = config
        .parent()
        .context("Configuration file has no parent directory")?;
    Ok(dir.join(CACHE_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.encoder, Encoder::Aac);
        assert_eq!(config.fallback_encoding(), encoding_rs::GBK);
        assert_eq!(config.job_timeout(), Some(Duration::from_secs(1800)));
        assert!((1..=MAX_JOBS).contains(&config.worker_count()));
    }

    #[test]
    fn test_clamping() {
        let mut config = AppConfig {
            jobs: Some(0),
            output_segments: 9,
            job_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.worker_count(), 1);
        assert_eq!(config.segments(), 3);
        assert_eq!(config.job_timeout(), None);

        config.jobs = Some(64);
        config.output_segments = 0;
        assert_eq!(config.worker_count(), MAX_JOBS);
        assert_eq!(config.segments(), 1);
    }

    #[test]
    fn test_fallback_encoding() {
        let mut config = AppConfig {
            fallback_encoding: "gb18030".into(),
            ..Default::default()
        };
        assert_eq!(config.fallback_encoding(), encoding_rs::GB18030);

        config.fallback_encoding = "shift_jis".into();
        assert_eq!(config.fallback_encoding(), encoding_rs::GBK);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"quality":"256k","jobs":4}"#).unwrap();
        assert_eq!(config.quality, Some("256k".parse().unwrap()));
        assert_eq!(config.worker_count(), 4);
        assert_eq!(config.diagnostic_limit, 200);
    }
}
