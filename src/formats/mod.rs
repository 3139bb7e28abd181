// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

pub mod common;
pub mod srt;
pub mod vtt;

use crate::errors::*;
use crate::Cue;
use self::common::BlockDiagnostic;

use encoding_rs::UTF_8;
use std::ffi::OsStr;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// All formats which are supported by this library.
pub enum SubtitleFormat {
    /// .srt file
    SubRip,

    /// .vtt file
    WebVtt,
}

impl SubtitleFormat {
    /// Get a descriptive string for the format like `".srt (SubRip)"`.
    pub fn get_name(&self) -> &'static str {
        match *self {
            SubtitleFormat::SubRip => ".srt (SubRip)",
            SubtitleFormat::WebVtt => ".vtt (WebVTT)",
        }
    }
}

/// Returns the subtitle format by the file extension (`Some("srt")`, `Some("vtt")`).
///
/// `Option` is used to simplify handling with `PathBuf::extension()`.
pub fn get_subtitle_format_by_extension(extension: Option<&OsStr>) -> Option<SubtitleFormat> {
    let ext = extension?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "srt" => Some(SubtitleFormat::SubRip),
        "vtt" => Some(SubtitleFormat::WebVtt),
        _ => None,
    }
}

/// Works exactly like `get_subtitle_format_by_extension`, but returns `UnknownFileFormat`
/// instead of `None`.
pub fn get_subtitle_format_by_extension_err(extension: Option<&OsStr>) -> Result<SubtitleFormat> {
    get_subtitle_format_by_extension(extension).ok_or_else(|| ErrorKind::UnknownFileFormat.into())
}

/// Detects the format from the content alone.
///
/// Content whose first non-blank line starts with `WEBVTT` is WebVTT, everything else is
/// treated as SubRip.
pub fn detect_format(content: &str) -> SubtitleFormat {
    if vtt::has_header(content) {
        SubtitleFormat::WebVtt
    } else {
        SubtitleFormat::SubRip
    }
}

/// The outcome of a lenient parse: the accepted cues plus one diagnostic per skipped block.
///
/// A report with no cues and no diagnostics means the input held no blocks at all.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseReport {
    /// The format the content was parsed as.
    pub format: SubtitleFormat,

    /// The accepted cues in file order.
    pub cues: Vec<Cue>,

    /// The skipped blocks in file order.
    pub diagnostics: Vec<BlockDiagnostic>,
}

impl ParseReport {
    /// Returns `true` if no cue was accepted.
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }
}

/// Parse subtitle text, detecting the format from the content.
///
/// Never fails: malformed blocks are dropped and listed in `ParseReport::diagnostics`.
pub fn parse_str(content: &str) -> ParseReport {
    parse_str_as(detect_format(content), content)
}

/// Parse subtitle text with the given format.
pub fn parse_str_as(format: SubtitleFormat, content: &str) -> ParseReport {
    let (cues, diagnostics) = match format {
        SubtitleFormat::SubRip => srt::SrtFile::parse(content).into_parts(),
        SubtitleFormat::WebVtt => vtt::VttFile::parse(content).into_parts(),
    };

    for diagnostic in &diagnostics {
        warn!("skipped {} block at {}", format.get_name(), diagnostic);
    }
    debug!("parsed {} cues as {}", cues.len(), format.get_name());

    ParseReport {
        format: format,
        cues: cues,
        diagnostics: diagnostics,
    }
}

/// Helper function for text subtitles for byte-to-text decoding.
///
/// A leading UTF-8 BOM is removed; invalid UTF-8 is an error rather than silently replaced.
fn decode_bytes_to_string(content: &[u8]) -> Result<String> {
    let (decoded, replaced) = UTF_8.decode_with_bom_removal(content);
    if replaced {
        Err(Error::from(ErrorKind::DecodingError))
    } else {
        Ok(decoded.into_owned())
    }
}

/// Parse raw subtitle bytes (UTF-8, optional BOM), detecting the format from the content.
///
/// Fails with `DecodingError` if the bytes are not valid UTF-8. A valid but empty file
/// gives an empty report.
pub fn parse_bytes(content: &[u8]) -> Result<ParseReport> {
    Ok(parse_str(&decode_bytes_to_string(content)?))
}

/// Read and parse a subtitle file.
///
/// Fails if the file cannot be read or decoded.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<ParseReport> {
    let path = path.as_ref();
    let data = std::fs::read(path).chain_err(|| ErrorKind::ReadInput(path.to_path_buf()))?;
    parse_bytes(&data).chain_err(|| ErrorKind::ReadInput(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_format_by_content() {
        assert_eq!(detect_format("WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nHi\n"), SubtitleFormat::WebVtt);
        assert_eq!(detect_format("1\n00:00:01,000 --> 00:00:02,000\nHi\n"), SubtitleFormat::SubRip);
        assert_eq!(detect_format(""), SubtitleFormat::SubRip);
    }

    #[test]
    fn detects_format_by_extension() {
        assert_eq!(get_subtitle_format_by_extension(Some(OsStr::new("srt"))), Some(SubtitleFormat::SubRip));
        assert_eq!(get_subtitle_format_by_extension(Some(OsStr::new("VTT"))), Some(SubtitleFormat::WebVtt));
        assert_eq!(get_subtitle_format_by_extension(Some(OsStr::new("ass"))), None);
        assert!(get_subtitle_format_by_extension_err(None).is_err());
    }

    #[test]
    fn parse_str_dispatches_on_header() {
        let report = parse_str("WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nHi\n");
        assert_eq!(report.format, SubtitleFormat::WebVtt);
        assert_eq!(report.cues, vec![Cue::new(1.0, 2.0, "Hi")]);

        let report = parse_str("1\n00:00:01,000 --> 00:00:03,500\nHello\n\n2\n00:00:04,000 --> 00:00:05,000\n\n");
        assert_eq!(report.format, SubtitleFormat::SubRip);
        assert_eq!(report.cues, vec![Cue::new(1.0, 3.5, "Hello"), Cue::new(4.0, 5.0, "")]);
    }

    #[test]
    fn parse_bytes_strips_bom() {
        let mut data = vec![0xEF, 0xBB, 0xBF];
        data.extend_from_slice(b"WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nHi\n");
        let report = parse_bytes(&data).unwrap();
        assert_eq!(report.format, SubtitleFormat::WebVtt);
        assert_eq!(report.cues.len(), 1);
    }

    #[test]
    fn invalid_utf8_is_a_hard_error() {
        let err = parse_bytes(&[b'1', b'\n', 0xFF, 0xFE, 0x00]).unwrap_err();
        match err.kind() {
            ErrorKind::DecodingError => {}
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn empty_file_is_valid_and_empty() {
        let report = parse_bytes(b"").unwrap();
        assert!(report.is_empty());
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(parse_file(dir.path().join("missing.srt")).is_err());
    }

    #[test]
    fn parse_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.srt");
        std::fs::write(&path, "1\n00:00:01,000 --> 00:00:02,000\nfrom disk\n").unwrap();
        let report = parse_file(&path).unwrap();
        assert_eq!(report.cues, vec![Cue::new(1.0, 2.0, "from disk")]);
    }
}
