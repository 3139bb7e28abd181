// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::formats::common::*;
use crate::Cue;

use itertools::Itertools;

#[derive(Debug, Clone, Default)]
/// Represents a `.srt` file.
pub struct SrtFile {
    v: Vec<SrtLine>,
    diagnostics: Vec<BlockDiagnostic>,
}

#[derive(Debug, Clone)]
/// A complete description of one SubRip subtitle line.
struct SrtLine {
    /// index/number of line, 1-based
    index: usize,

    cue: Cue,
}

impl SrtFile {
    /// Parse a `.srt` subtitle string to `SrtFile`.
    ///
    /// Parsing is lenient: blocks that do not form a cue are skipped and reported by
    /// `diagnostics()`, so this never fails.
    pub fn parse(s: &str) -> SrtFile {
        let (_, s) = split_bom(s);

        let mut result = SrtFile::default();
        for block in split_blocks(s) {
            match Self::parse_block(&block.lines) {
                Ok(cue) => {
                    let index = result.v.len() + 1;
                    result.v.push(SrtLine { index: index, cue: cue });
                }
                Err(reason) => result.diagnostics.push(BlockDiagnostic {
                    line_num: block.line_num,
                    reason: reason,
                }),
            }
        }

        result
    }

    /// An index line is optional, so the timing line is either the first or the second line.
    fn parse_block(lines: &[&str]) -> Result<Cue, DropReason> {
        if lines.len() < 2 {
            return Err(DropReason::TooFewLines);
        }

        let timing_idx = if lines[1].contains(ARROW) {
            1
        } else if lines[0].contains(ARROW) {
            0
        } else {
            return Err(DropReason::MissingTimingLine);
        };

        let timing_line = lines[timing_idx];
        let (start, end) = parse_timing_line(timing_line, srt_timestamp).ok_or_else(|| DropReason::MalformedTiming(timing_line.to_string()))?;

        let texts = &lines[timing_idx + 1..];
        let text = match texts.first() {
            Some(first) if !first.contains(ARROW) => texts.iter().join(" "),
            _ => String::new(),
        };

        Ok(Cue::new(start, end, text))
    }
}

impl SrtFile {
    /// Creates .srt file from scratch.
    pub fn create(cues: &[Cue]) -> SrtFile {
        let v = cues
            .iter()
            .enumerate()
            .map(|(i, cue)| SrtLine {
                index: i + 1,
                cue: cue.clone(),
            })
            .collect();

        SrtFile {
            v: v,
            diagnostics: Vec::new(),
        }
    }

    /// The cues of this file, in file order.
    pub fn cues(&self) -> Vec<Cue> {
        self.v.iter().map(|line| line.cue.clone()).collect()
    }

    /// The blocks skipped while parsing.
    pub fn diagnostics(&self) -> &[BlockDiagnostic] {
        &self.diagnostics
    }

    /// Consumes the file, returning cues and diagnostics.
    pub fn into_parts(self) -> (Vec<Cue>, Vec<BlockDiagnostic>) {
        (self.v.into_iter().map(|line| line.cue).collect(), self.diagnostics)
    }

    /// Returns the file content as `.srt` text: one `index`, timing line and text line per cue.
    ///
    /// Indices are renumbered from 1 and timestamps are written in canonical form.
    pub fn to_data(&self) -> Vec<u8> {
        let line_to_str = |line: &SrtLine| -> String {
            format!(
                "{}\n{} --> {}\n{}\n\n",
                line.index,
                line.cue.start_timestamp(),
                line.cue.end_timestamp(),
                line.cue.text()
            )
        };

        self.v.iter().map(line_to_str).collect::<String>().into_bytes()
    }
}
