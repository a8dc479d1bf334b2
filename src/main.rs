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

//! Command line front end.

use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use audiokit::{
    classify::{Language, Quality},
    config::{self, AppConfig},
    db::{CacheEntry, SqliteTagCache},
    model::Encoder,
    pipeline::{JobKind, Pipeline, Plan},
    util::{format::short_path, term},
};

const PATH_WIDTH: usize = 60;

#[derive(Parser, Debug)]
#[command(name = "audiokit")]
#[command(about = "Split, convert and organize audio collections")]
#[command(version)]
struct Cli {
    /// More output, repeat for trace level. RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Do not ask before changing files
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    /// Number of worker threads (1-16)
    #[arg(short, long, global = true)]
    jobs: Option<usize>,

    /// Encode with libfdk_aac instead of the built-in AAC encoder
    #[arg(long, global = true)]
    libfdk: bool,

    /// Neither read nor write the tag cache
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read the tags of all audio files into the cache
    Parse {
        source: PathBuf,

        /// Also write the tags to this JSON file
        #[arg(long, value_name = "FILE")]
        json: Option<PathBuf>,
    },

    /// Split album images into tracks using their cue sheets
    Split { source: PathBuf },

    /// Convert audio files to AAC
    Convert {
        source: PathBuf,

        /// Write below this directory instead of next to the sources
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Fixed bitrate: 128k, 192k, 256k or 320k
        #[arg(short, long)]
        quality: Option<Quality>,

        /// Append the bitrate to output names, e.g. "Song [320k].m4a"
        #[arg(long)]
        suffix: bool,
    },

    /// Move files into per-language directories next to the source
    Move {
        source: PathBuf,

        /// Languages to move: ja, kr, cn, en
        #[arg(short, long, value_delimiter = ',', required = true)]
        lng: Vec<Language>,

        /// Leave files of unrecognised language in place
        #[arg(long)]
        ignore_unknown: bool,
    },

    /// Show the effective configuration
    Config {
        /// Write it back to the configuration file
        #[arg(long)]
        save: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("audiokit={level}"))),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Returns whether the run finished without failures.
fn run(cli: Cli) -> Result<bool> {
    let mut config = config::load_config();
    if cli.jobs.is_some() {
        config.jobs = cli.jobs;
    }
    if cli.libfdk {
        config.encoder = Encoder::LibfdkAac;
    }

    let (source, kind, json) = match cli.command {
        Command::Config { save } => {
            show_config(&config, save)?;
            return Ok(true);
        }
        Command::Parse { source, json } => (source, JobKind::Parse, json),
        Command::Split { source } => (source, JobKind::Split, None),
        Command::Convert {
            source,
            output,
            quality,
            suffix,
        } => {
            if output.is_some() {
                config.output_root = output;
            }
            if quality.is_some() {
                config.quality = quality;
            }
            config.bitrate_suffix |= suffix;
            (source, JobKind::Convert, None)
        }
        Command::Move {
            source,
            mut lng,
            ignore_unknown,
        } => {
            if !ignore_unknown && !lng.contains(&Language::Unknown) {
                lng.push(Language::Unknown);
            }
            (source, JobKind::Move { languages: lng }, None)
        }
    };

    let root = fs::canonicalize(&source)
        .with_context(|| format!("Source '{}' does not exist", source.display()))?;

    let mut pipeline = Pipeline::from_config(&config);
    if !cli.no_cache {
        match open_cache(&config) {
            Ok(cache) => pipeline = pipeline.with_cache(Box::new(cache)),
            Err(e) => warn!("Tag cache unavailable, continuing without it: {:#}", e),
        }
    }

    info!(
        "{} {} with {} workers",
        kind,
        short_path(&root, PATH_WIDTH),
        pipeline.options().workers
    );

    let report = match json {
        Some(json) => {
            let (report, entries) = pipeline.parse_tags(&root)?;
            write_json(&json, &entries)?;
            info!("Wrote {} entries to {}", entries.len(), json.display());
            report
        }
        None => {
            let yes = cli.yes;
            pipeline.run(&root, kind, |plan| confirm(plan, yes))?
        }
    };

    for failure in &report.failures {
        error!(
            "Failed {}: {}",
            short_path(&failure.path, PATH_WIDTH),
            failure.reason
        );
    }
    info!("{}", report.summary());

    Ok(!report.has_failures())
}

fn confirm(plan: &Plan, yes: bool) -> bool {
    for line in plan.describe() {
        info!("{}", line);
    }
    if yes {
        return true;
    }

    term::confirm(&format!("Are you sure to {} these files?", plan.kind)).unwrap_or_else(|e| {
        warn!("Cannot read confirmation: {}", e);
        false
    })
}

fn open_cache(config: &AppConfig) -> Result<SqliteTagCache> {
    let path = config.cache_path()?;
    SqliteTagCache::open(&path)
}

fn show_config(config: &AppConfig, save: bool) -> Result<()> {
    let path = config::config_path()?;
    println!("# {}", path.display());
    println!("{}", serde_json::to_string_pretty(config)?);

    if save {
        config::save_config(config).context("Failed to save configuration")?;
        info!("Saved configuration to {}", path.display());
    }
    Ok(())
}

fn write_json(path: &Path, entries: &[CacheEntry]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), entries)
        .with_context(|| format!("Failed to write {}", path.display()))
}
