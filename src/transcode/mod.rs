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

//! External transcoder invocation.
//!
//! The transcoder is a black box: it gets an input, an optional time range,
//! an output path and a bitrate, and reports success through its exit
//! status. Its diagnostic output is kept for error reports but never
//! interpreted.

use std::{
    ffi::OsString,
    io::{self, Read},
    path::PathBuf,
    process::{Child, Command, ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};

use crate::{
    classify::Quality,
    model::{ConversionJob, Encoder},
};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Everything one transcoder run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    /// `HH:MM:SS.CC`
    pub start: Option<String>,
    /// `HH:MM:SS.CC`
    pub end: Option<String>,
    pub quality: Quality,
    pub encoder: Encoder,
    /// Tags to write into the output, in order.
    pub metadata: Vec<(String, String)>,
}

impl From<&ConversionJob> for TranscodeRequest {
    /// Builds the request for a job, writing to its temporary destination.
    fn from(job: &ConversionJob) -> Self {
        let mut metadata = Vec::new();
        if let Some(meta) = &job.metadata {
            metadata.push(("title".to_string(), meta.title.clone()));
            for key in ["artist", "author", "album_artist"] {
                metadata.push((key.to_string(), meta.artist.clone()));
            }
            if !meta.album.is_empty() {
                metadata.push(("album".to_string(), meta.album.clone()));
            }
            metadata.push(("track".to_string(), meta.track.to_string()));
        }

        Self {
            input: job.source.clone(),
            output: job.temp_destination(),
            start: job.range.as_ref().map(|r| r.start_stamp()),
            end: job.range.as_ref().and_then(|r| r.end_stamp()),
            quality: job.quality,
            encoder: job.encoder,
            metadata,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeOutcome {
    pub success: bool,
    /// Exit code, `None` if the process was killed.
    pub status: Option<i32>,
    pub diagnostics: String,
}

/// Runs one transcode to completion. Shared between worker threads.
pub trait Transcoder: Send + Sync {
    /// # Errors
    ///
    /// Only when the transcoder could not be run at all. A transcoder that
    /// ran and failed is reported through [`TranscodeOutcome::success`].
    fn transcode(&self, request: &TranscodeRequest) -> Result<TranscodeOutcome>;
}

/// [`Transcoder`] spawning `ffmpeg`.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Kill runs that take longer than `timeout`. `None` waits forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl FfmpegTranscoder {
    /// Polls `child` until it exits, killing it once the timeout passes.
    /// The flag is set when it was killed.
    fn wait(&self, child: &mut Child, request: &TranscodeRequest) -> io::Result<(ExitStatus, bool)> {
        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok((status, false));
            }
            if self.timeout.is_some_and(|limit| started.elapsed() > limit) {
                tracing::warn!("transcode of {} timed out, killing", request.input.display());
                let _ = child.kill();
                return Ok((child.wait()?, true));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

/// Command line for `ffmpeg`, without the program name.
///
/// The output is forced to MP4 because the temporary name has no
/// meaningful extension. `-n` makes ffmpeg refuse to overwrite.
pub fn ffmpeg_args(request: &TranscodeRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-hide_banner", "-n", "-loglevel", "repeat+level+info"]
        .into_iter()
        .map(OsString::from)
        .collect();

    if let Some(start) = &request.start {
        args.push("-ss".into());
        args.push(start.into());
    }
    if let Some(end) = &request.end {
        args.push("-to".into());
        args.push(end.into());
    }

    args.push("-i".into());
    args.push(request.input.clone().into_os_string());

    for (key, value) in &request.metadata {
        args.push("-metadata".into());
        args.push(format!("{key}={value}").into());
    }

    for arg in ["-map", "a:0", "-c:a", request.encoder.codec_name(), "-b:a"] {
        args.push(arg.into());
    }
    args.push(request.quality.to_string().into());
    args.push("-f".into());
    args.push("mp4".into());
    args.push(request.output.clone().into_os_string());

    args
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, request: &TranscodeRequest) -> Result<TranscodeOutcome> {
        let args = ffmpeg_args(request);
        tracing::debug!("{} {:?}", self.program.display(), args);

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start {}", self.program.display()))?;

        // Drain stderr on the side so a chatty process never blocks on a
        // full pipe while we poll for its exit.
        let mut stderr = child.stderr.take().context("stderr not captured")?;
        let reader = thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = stderr.read_to_end(&mut buffer);
            buffer
        });

        let waited = self.wait(&mut child, request);
        if waited.is_err() {
            // reap the child so the stderr reader sees the pipe close
            let _ = child.kill();
            let _ = child.wait();
        }
        let output = reader.join().unwrap_or_default();
        let (status, timed_out) = waited
            .with_context(|| format!("Failed to wait for {}", self.program.display()))?;

        let mut diagnostics = String::from_utf8_lossy(&output).into_owned();
        if timed_out {
            diagnostics.insert_str(0, "timed out\n");
        }

        Ok(TranscodeOutcome {
            success: status.success() && !timed_out,
            status: status.code(),
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> TranscodeRequest {
        TranscodeRequest {
            input: PathBuf::from("/music/image.flac"),
            output: PathBuf::from("/music/A @ B.m4a.part"),
            start: Some("00:03:02.00".to_string()),
            end: Some("00:07:10.50".to_string()),
            quality: Quality::HIGHEST,
            encoder: Encoder::LibfdkAac,
            metadata: vec![("title".to_string(), "B".to_string())],
        }
    }

    #[test]
    fn test_ffmpeg_args_with_range() {
        let args: Vec<String> = ffmpeg_args(&request())
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            args,
            vec![
                "-hide_banner", "-n", "-loglevel", "repeat+level+info",
                "-ss", "00:03:02.00", "-to", "00:07:10.50",
                "-i", "/music/image.flac",
                "-metadata", "title=B",
                "-map", "a:0", "-c:a", "libfdk_aac", "-b:a", "320k",
                "-f", "mp4", "/music/A @ B.m4a.part",
            ]
        );
    }

    #[test]
    fn test_ffmpeg_args_whole_file() {
        let mut request = request();
        request.start = None;
        request.end = None;
        request.metadata.clear();
        request.encoder = Encoder::Aac;

        let args: Vec<String> = ffmpeg_args(&request)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert!(!args.contains(&"-ss".to_string()));
        assert!(!args.contains(&"-metadata".to_string()));
        assert!(args.contains(&"aac".to_string()));
    }

    #[test]
    fn test_request_for_split_job() {
        use crate::{
            cue::{CueTime, TrackRange},
            model::{JobStatus, TrackMetadata},
        };

        let job = ConversionJob {
            source: PathBuf::from("/music/image.flac"),
            destination: PathBuf::from("/music/A @ B.m4a"),
            quality: Quality::HIGHEST,
            encoder: Encoder::Aac,
            range: Some(TrackRange {
                number: 2,
                start: CueTime::new(3, 2, 0),
                end: None,
            }),
            metadata: Some(TrackMetadata {
                title: "B".into(),
                artist: "A".into(),
                album: String::new(),
                track: 2,
            }),
            status: JobStatus::Pending,
        };

        let request = TranscodeRequest::from(&job);
        assert_eq!(request.output, PathBuf::from("/music/A @ B.m4a.part"));
        assert_eq!(request.start.as_deref(), Some("00:03:02.00"));
        assert_eq!(request.end, None);

        let keys: Vec<&str> = request.metadata.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["title", "artist", "author", "album_artist", "track"]);
    }

    #[test]
    fn test_missing_program_is_error() {
        let transcoder = FfmpegTranscoder::new("/definitely/not/ffmpeg");
        assert!(transcoder.transcode(&request()).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit() {
        let failing = FfmpegTranscoder::new("false").with_timeout(Some(Duration::from_secs(10)));
        let outcome = failing.transcode(&request()).unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.status, Some(1));
    }

    #[cfg(unix)]
    #[test]
    fn test_slow_run_is_killed() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::TempDir::new().unwrap();
        let script = temp.path().join("slow-ffmpeg");
        std::fs::write(&script, "#!/bin/sh\necho working >&2\nexec sleep 5\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let slow = FfmpegTranscoder::new(&script).with_timeout(Some(Duration::from_millis(200)));
        let started = Instant::now();
        let outcome = slow.transcode(&request()).unwrap();

        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(!outcome.success);
        assert_eq!(outcome.status, None);
        assert!(outcome.diagnostics.starts_with("timed out"));
    }
}
