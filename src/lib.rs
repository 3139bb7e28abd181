// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

#![deny(
    missing_docs,
    missing_debug_implementations,
    unsafe_code,
    unstable_features,
    unused_import_braces
)]

//! This crate turns timed subtitle tracks (`.srt`, `.vtt`) into transparent overlays for compositing.
//!
//! Subtitle files are parsed leniently into an ordered list of [`Cue`]s. The cues can then be
//! rasterized into a sequence of transparent PNG frames sampled at a fixed rate of ten frames per
//! second of cue time, or handed to an [`OverlayEncoder`] that burns them into a transparent video.
//!
//! ```no_run
//! use std::path::Path;
//! use subframe::{parse_file, rasterize, RenderSettings};
//!
//! let report = parse_file("movie.srt").unwrap();
//! let frames = rasterize(&report.cues, &RenderSettings::default(), Path::new("frames")).unwrap();
//! println!("{} frames", frames.frame_count);
//! ```

#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate tracing;

mod formats;

/// Conversion between seconds and canonical `HH:MM:SS,mmm` timestamps.
pub mod timetypes;

/// Error-chain generated error types.
pub mod errors;

/// Rendering cues into transparent PNG frames.
pub mod raster;

/// Producing transparent overlay videos with an external encoder.
pub mod encode;

/// Loading defaults from a TOML configuration file.
pub mod config;

pub use encode::{FfmpegEncoder, OverlayEncoder};
pub use formats::common::{BlockDiagnostic, DropReason};
pub use formats::srt::SrtFile;
pub use formats::vtt::VttFile;
pub use formats::{
    detect_format, get_subtitle_format_by_extension, get_subtitle_format_by_extension_err, parse_bytes, parse_file, parse_str, parse_str_as,
    ParseReport, SubtitleFormat,
};
pub use raster::{rasterize, render_preview, FrameSequence, RenderSettings, Rgb};
pub use timetypes::{seconds_to_timestamp, timestamp_to_seconds, TimePoint};

/// One timed text entry of a subtitle track.
///
/// Cues are immutable once created. Besides the times in seconds they carry the canonical
/// `HH:MM:SS,mmm` display form of both times, obtained by formatting the seconds value.
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    start: f64,
    end: f64,
    start_timestamp: String,
    end_timestamp: String,
    text: String,
}

impl Cue {
    /// Create a cue from start and end time in seconds.
    ///
    /// Negative and non-finite times clamp to zero, times past `timetypes::MAX_SECS` to that
    /// limit. `end <= start` is accepted, such a cue simply covers no frames.
    pub fn new<S: Into<String>>(start: f64, end: f64, text: S) -> Cue {
        let start = timetypes::clamp_secs(start);
        let end = timetypes::clamp_secs(end);
        Cue {
            start: start,
            end: end,
            start_timestamp: seconds_to_timestamp(start),
            end_timestamp: seconds_to_timestamp(end),
            text: text.into(),
        }
    }

    /// Start time in seconds.
    pub fn start(&self) -> f64 {
        self.start
    }

    /// End time in seconds.
    pub fn end(&self) -> f64 {
        self.end
    }

    /// Duration in seconds (can be zero or negative for degenerate cues).
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Canonical start timestamp, e.g. `"00:00:01,500"`.
    pub fn start_timestamp(&self) -> &str {
        &self.start_timestamp
    }

    /// Canonical end timestamp, e.g. `"00:00:03,700"`.
    pub fn end_timestamp(&self) -> &str {
        &self.end_timestamp
    }

    /// The cue text; lines of the original block are joined with single spaces. May be empty.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The time span rounded to whole milliseconds.
    pub fn span(&self) -> (TimePoint, TimePoint) {
        (TimePoint::from_secs_f64(self.start), TimePoint::from_secs_f64(self.end))
    }
}
