// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::formats::common::*;
use crate::Cue;

use itertools::Itertools;

/// The header token every WebVTT file starts with.
pub const HEADER: &str = "WEBVTT";

/// Blocks starting with these words hold comments or styling, never cues.
const NON_CUE_BLOCKS: [&str; 3] = ["NOTE", "STYLE", "REGION"];

#[derive(Debug, Clone, Default)]
/// Represents a `.vtt` file.
pub struct VttFile {
    cues: Vec<Cue>,
    diagnostics: Vec<BlockDiagnostic>,
}

impl VttFile {
    /// Parse a `.vtt` subtitle string to `VttFile`.
    ///
    /// The first line is treated as the `WEBVTT` header and removed. Like `SrtFile::parse`
    /// this is lenient and never fails.
    pub fn parse(s: &str) -> VttFile {
        let (_, s) = split_bom(s);
        let body = strip_header(s);
        // keep line numbers relative to the original input
        let line_offset = split_lines(&s[..s.len() - body.len()]).len();

        let mut result = VttFile::default();
        for block in split_blocks(body) {
            if Self::is_non_cue_block(&block.lines) {
                continue;
            }

            match Self::parse_block(&block.lines) {
                Ok(cue) => result.cues.push(cue),
                Err(reason) => result.diagnostics.push(BlockDiagnostic {
                    line_num: block.line_num + line_offset,
                    reason: reason,
                }),
            }
        }

        result
    }

    fn is_non_cue_block(lines: &[&str]) -> bool {
        let first = lines[0];
        !first.contains(ARROW)
            && NON_CUE_BLOCKS
                .iter()
                .any(|kw| first == *kw || (first.starts_with(kw) && first[kw.len()..].starts_with(char::is_whitespace)))
    }

    /// Cue identifier lines before the timing line are skipped.
    fn parse_block(lines: &[&str]) -> Result<Cue, DropReason> {
        if lines.len() < 2 {
            return Err(DropReason::TooFewLines);
        }

        let timing_idx = lines.iter().position(|line| line.contains(ARROW)).ok_or(DropReason::MissingTimingLine)?;

        let timing_line = lines[timing_idx];
        let (start, end) = parse_timing_line(timing_line, vtt_timestamp).ok_or_else(|| DropReason::MalformedTiming(timing_line.to_string()))?;

        Ok(Cue::new(start, end, lines[timing_idx + 1..].iter().join(" ")))
    }

    /// The cues of this file, in file order.
    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    /// The blocks skipped while parsing.
    pub fn diagnostics(&self) -> &[BlockDiagnostic] {
        &self.diagnostics
    }

    /// Consumes the file, returning cues and diagnostics.
    pub fn into_parts(self) -> (Vec<Cue>, Vec<BlockDiagnostic>) {
        (self.cues, self.diagnostics)
    }
}

/// Removes the first line if it is the `WEBVTT` header line.
fn strip_header(s: &str) -> &str {
    let trimmed = s.trim_start();
    if !trimmed.starts_with(HEADER) {
        return s;
    }

    split_first_line(trimmed).1
}

/// Returns `true` if the first non-blank line starts with the `WEBVTT` header token.
pub fn has_header(s: &str) -> bool {
    let (_, s) = split_bom(s);
    split_lines(s).into_iter().map(str::trim).find(|line| !line.is_empty()).map_or(false, |line| line.starts_with(HEADER))
}
