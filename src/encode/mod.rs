// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/// The ffmpeg command line and process handling.
pub mod ffmpeg;

pub use self::ffmpeg::FfmpegEncoder;

use self::errors::*;
use crate::raster::RenderSettings;
use crate::Cue;

use std::path::Path;

/// Encoder-specific errors
#[allow(missing_docs)]
pub mod errors {
    use std::path::PathBuf;
    use std::time::Duration;

    // see https://docs.rs/error-chain/0.12.4/error_chain/
    error_chain! {
        foreign_links {
            Io(::std::io::Error);
        }

        errors {
            Launch(program: PathBuf) {
                description("starting the encoder failed")
                display("starting encoder '{}' failed", program.display())
            }
            ToolFailed(code: Option<i32>, diagnostics: String) {
                description("the encoder reported an error")
                display("{}", diagnostics)
            }
            Timeout(limit: Duration) {
                description("the encoder did not finish in time")
                display("the encoder did not finish within {} seconds and was killed", limit.as_secs_f64())
            }
            Scratch {
                description("preparing the scratch subtitle file failed")
            }
        }
    }
}

/// Width of the overlay video.
pub const VIDEO_WIDTH: u32 = 1920;

/// Height of the overlay video.
pub const VIDEO_HEIGHT: u32 = 1080;

/// Frame rate of the overlay video.
pub const VIDEO_FPS: u32 = 30;

/// Seconds of video added after the last cue ends.
pub const TAIL_SECS: f64 = 1.0;

/// Video length when there are no cues.
pub const EMPTY_DURATION_SECS: f64 = 5.0;

/// Something that turns cues into a transparent overlay video.
///
/// `FfmpegEncoder` is the real implementation; tests can substitute their own.
pub trait OverlayEncoder {
    /// Writes a transparent video showing `cues` styled by `settings` to `output`.
    fn encode(&self, cues: &[Cue], settings: &RenderSettings, output: &Path) -> Result<()>;
}

/// Length of the overlay video: one second past the latest cue end, or five seconds
/// without cues.
pub fn video_duration(cues: &[Cue]) -> f64 {
    cues.iter()
        .map(Cue::end)
        .fold(None, |max: Option<f64>, end| Some(max.map_or(end, |m| m.max(end))))
        .map_or(EMPTY_DURATION_SECS, |end| end + TAIL_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::PathBuf;

    #[test]
    fn duration_follows_latest_cue() {
        let cues = vec![Cue::new(0.0, 9.5, "late"), Cue::new(1.0, 2.0, "early")];
        assert_eq!(video_duration(&cues), 10.5);
        assert_eq!(video_duration(&[]), 5.0);
    }

    /// Records calls instead of running anything.
    #[derive(Default)]
    struct RecordingEncoder {
        calls: RefCell<Vec<(usize, PathBuf)>>,
        fail_with: Option<String>,
    }

    impl OverlayEncoder for RecordingEncoder {
        fn encode(&self, cues: &[Cue], _settings: &RenderSettings, output: &Path) -> Result<()> {
            self.calls.borrow_mut().push((cues.len(), output.to_path_buf()));
            match &self.fail_with {
                Some(msg) => bail!(ErrorKind::ToolFailed(Some(1), msg.clone())),
                None => Ok(()),
            }
        }
    }

    fn run(encoder: &dyn OverlayEncoder, cues: &[Cue]) -> crate::errors::Result<()> {
        encoder.encode(cues, &RenderSettings::default(), Path::new("out.webm"))?;
        Ok(())
    }

    #[test]
    fn encoders_are_swappable() {
        let encoder = RecordingEncoder::default();
        run(&encoder, &[Cue::new(0.0, 1.0, "a")]).unwrap();
        assert_eq!(encoder.calls.borrow().as_slice(), &[(1, PathBuf::from("out.webm"))]);
    }

    #[test]
    fn tool_message_passes_through_unchanged() {
        let encoder = RecordingEncoder {
            fail_with: Some("Error opening output file out.webm.".to_string()),
            ..Default::default()
        };
        let err = run(&encoder, &[]).unwrap_err();
        match err.kind() {
            crate::errors::ErrorKind::EncodeError(ErrorKind::ToolFailed(_, msg)) => {
                assert_eq!(msg, "Error opening output file out.webm.");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(err.to_string(), "Error opening output file out.webm.");
    }
}
