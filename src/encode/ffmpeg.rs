// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::errors::ErrorKind::*;
use super::errors::*;
use super::{video_duration, OverlayEncoder, VIDEO_FPS, VIDEO_HEIGHT, VIDEO_WIDTH};
use crate::formats::srt::SrtFile;
use crate::raster::{RenderSettings, Rgb};
use crate::Cue;

use std::ffi::OsString;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Default time the encoder may run before it is killed.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Name of the subtitle file handed to ffmpeg inside the scratch directory.
pub const SCRATCH_FILE_NAME: &str = "overlay.srt";

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Burns cues into a transparent VP9/WebM video by running `ffmpeg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegEncoder {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl Default for FfmpegEncoder {
    fn default() -> FfmpegEncoder {
        FfmpegEncoder {
            program: PathBuf::from("ffmpeg"),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

impl FfmpegEncoder {
    /// An encoder that runs `ffmpeg` from `PATH` with the default timeout.
    pub fn new() -> FfmpegEncoder {
        FfmpegEncoder::default()
    }

    /// Use a different executable.
    pub fn with_program<P: Into<PathBuf>>(mut self, program: P) -> FfmpegEncoder {
        self.program = program.into();
        self
    }

    /// Limit the run time; `None` waits forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> FfmpegEncoder {
        self.timeout = timeout;
        self
    }

    /// The executable that will be run.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The run time limit.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The full argument list for one run.
    pub fn build_args(subtitles: &Path, duration: f64, settings: &RenderSettings, output: &Path) -> Vec<OsString> {
        let source = format!("color=color=black@0.0:size={}x{}:rate={}", VIDEO_WIDTH, VIDEO_HEIGHT, VIDEO_FPS);
        let filter = format!(
            "format=yuva420p,subtitles={}:force_style='FontName={},FontSize={},PrimaryColour={},BorderStyle=4'",
            escape_filter_path(subtitles),
            escape_font_name(&settings.font_family),
            settings.font_size_pt,
            ass_color(settings.color)
        );

        let mut args: Vec<OsString> = vec!["-y", "-f", "lavfi", "-i"].into_iter().map(OsString::from).collect();
        args.push(source.into());
        args.push("-t".into());
        args.push(format_duration(duration).into());
        args.push("-vf".into());
        args.push(filter.into());
        args.extend(
            ["-c:v", "libvpx-vp9", "-pix_fmt", "yuva420p", "-auto-alt-ref", "0"]
                .iter()
                .map(OsString::from),
        );
        args.push(output.as_os_str().to_os_string());
        args
    }

    fn run(&self, args: Vec<OsString>) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .chain_err(|| Launch(self.program.clone()))?;

        // drained on a thread so a chatty child never blocks on a full pipe
        let mut stderr = child.stderr.take();
        let reader = thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(stderr) = stderr.as_mut() {
                let _ = stderr.read_to_end(&mut buf);
            }
            String::from_utf8_lossy(&buf).into_owned()
        });

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }

            if let Some(limit) = self.timeout {
                if started.elapsed() >= limit {
                    warn!("{} exceeded {}s, killing it", self.program.display(), limit.as_secs_f64());
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = reader.join();
                    bail!(Timeout(limit));
                }
            }

            thread::sleep(POLL_INTERVAL);
        };

        let diagnostics = reader.join().unwrap_or_default();
        if !status.success() {
            bail!(ToolFailed(status.code(), diagnostics));
        }

        debug!("{} finished in {:.1}s", self.program.display(), started.elapsed().as_secs_f64());
        Ok(())
    }
}

impl OverlayEncoder for FfmpegEncoder {
    fn encode(&self, cues: &[Cue], settings: &RenderSettings, output: &Path) -> Result<()> {
        let scratch = tempfile::Builder::new().prefix("subframe").tempdir().chain_err(|| Scratch)?;
        let subtitles = scratch.path().join(SCRATCH_FILE_NAME);
        fs::write(&subtitles, SrtFile::create(cues).to_data()).chain_err(|| Scratch)?;

        let duration = video_duration(cues);
        info!(
            "encoding {} cues ({:.3}s) into {} with {}",
            cues.len(),
            duration,
            output.display(),
            self.program.display()
        );

        let args = FfmpegEncoder::build_args(&subtitles, duration, settings, output);
        self.run(args)?;

        info!("wrote overlay video {}", output.display());
        Ok(())
    }
}

/// `&H00BBGGRR`: the subtitle renderer's color order with zero (opaque) alpha.
fn ass_color(color: Rgb) -> String {
    let Rgb(r, g, b) = color;
    format!("&H00{:02X}{:02X}{:02X}", b, g, r)
}

fn escape_font_name(name: &str) -> String {
    name.replace(' ', "\\ ")
}

/// Escapes characters that have a meaning inside a filter graph option value.
fn escape_filter_path(path: &Path) -> String {
    let mut escaped = String::new();
    for c in path.to_string_lossy().chars() {
        if matches!(c, '\\' | ':' | '\'' | '[' | ']' | ',' | ';') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Seconds with millisecond precision, without trailing zeros.
fn format_duration(secs: f64) -> String {
    let s = format!("{:.3}", secs);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
