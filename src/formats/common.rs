// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fmt::{Display, Formatter, Result as FmtResult};

use combine::char::{char, digit, string};
use combine::combinator::*;
use combine::combinator::parser as p;
use combine::primitives::{ParseResult, Parser, Stream};

type CustomCharParser<I> = Expected<Satisfy<I, fn(char) -> bool>>;

/// The token separating start and end timestamp on a timing line.
pub const ARROW: &str = "-->";

/// Returns the string without BOMs. Unchanged if string does not start with one.
pub fn split_bom(s: &str) -> (&str, &str) {
    if s.starts_with('\u{feff}') {
        s.split_at('\u{feff}'.len_utf8())
    } else {
        ("", s)
    }
}

/// Parses whitespaces and tabs.
#[inline]
#[allow(trivial_casts)]
pub fn ws<I>() -> CustomCharParser<I>
where
    I: Stream<Item = char>,
{
    fn f(c: char) -> bool {
        c == ' ' || c == '\t'
    }
    satisfy(f as fn(_) -> _).expected("tab or space")
}

/// Matches a run of decimal digits as a real number (`"0042"` -> `42.0`).
pub fn number_f64<I>(input: I) -> ParseResult<f64, I>
where
    I: Stream<Item = char>,
{
    many1(digit())
        .map(|digits: String| digits.chars().filter_map(|c| c.to_digit(10)).fold(0.0, |acc, d| acc * 10.0 + f64::from(d)))
        .expected("number")
        .parse_stream(input)
}

/// Matches the digits after the fraction separator as a decimal fraction (`"5"` -> `0.5`, `"050"` -> `0.05`).
///
/// Only the first nine digits are significant.
pub fn fraction_f64<I>(input: I) -> ParseResult<f64, I>
where
    I: Stream<Item = char>,
{
    many1(digit())
        .map(|digits: String| {
            let significant: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).take(9).collect();
            let numerator = significant.iter().fold(0.0, |acc, &d| acc * 10.0 + f64::from(d));
            numerator / 10f64.powi(significant.len() as i32)
        })
        .expected("fraction digits")
        .parse_stream(input)
}

#[allow(trivial_casts)]
fn fraction_separator<I>() -> CustomCharParser<I>
where
    I: Stream<Item = char>,
{
    fn f(c: char) -> bool {
        c == ',' || c == '.'
    }
    satisfy(f as fn(_) -> _).expected("',' or '.'")
}

/// Matches a SubRip timestamp like "00:24:45,670" and returns it in seconds.
pub fn srt_timestamp(input: &str) -> ParseResult<f64, &str> {
    (p(number_f64), char(':'), p(number_f64), char(':'), p(number_f64), char(','), p(fraction_f64))
        .map(|t| t.0 * 3600.0 + t.2 * 60.0 + t.4 + t.6)
        .parse_stream(input)
}

/// Matches a WebVTT timestamp like "00:24:45.670" or "24:45.670" and returns it in seconds.
pub fn vtt_timestamp(input: &str) -> ParseResult<f64, &str> {
    (p(number_f64), char(':'), p(number_f64), optional((char(':'), p(number_f64))), char('.'), p(fraction_f64))
        .map(|t| match t.3 {
            Some((_, secs)) => t.0 * 3600.0 + t.2 * 60.0 + secs + t.5,
            None => t.0 * 60.0 + t.2 + t.5,
        })
        .parse_stream(input)
}

/// Matches a full clock timestamp with either fraction separator, like "00:24:45,670" or "00:24:45.670".
pub fn clock_timestamp(input: &str) -> ParseResult<f64, &str> {
    (p(number_f64), char(':'), p(number_f64), char(':'), p(number_f64), fraction_separator(), p(fraction_f64))
        .map(|t| t.0 * 3600.0 + t.2 * 60.0 + t.4 + t.6)
        .parse_stream(input)
}

/// Matches the start of a timing line like "00:24:45,670 --> 00:24:45,680" with the given timestamp parser.
///
/// Whatever follows the end timestamp (WebVTT cue settings, stray characters) is ignored.
pub fn parse_timing_line(line: &str, timestamp: fn(&str) -> ParseResult<f64, &str>) -> Option<(f64, f64)> {
    (many(ws()), p(timestamp), many(ws()), string(ARROW), many(ws()), p(timestamp))
        .map(|t: (String, f64, String, _, String, f64)| (t.1, t.5))
        .parse(line)
        .ok()
        .map(|(span, _)| span)
}

/// A group of consecutive non-blank lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block<'a> {
    /// 1-based line number of the first line of the block.
    pub line_num: usize,

    /// The trimmed lines of the block (never empty).
    pub lines: Vec<&'a str>,
}

/// Splits the content into blocks separated by one or more blank lines.
///
/// Lines may end with `\n`, `\r\n` or a lone `\r`. Whitespace-only lines count as blank.
pub fn split_blocks(s: &str) -> Vec<Block> {
    let mut result = Vec::new();
    let mut current: Option<Block> = None;

    for (idx, line) in split_lines(s).into_iter().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            result.extend(current.take());
            continue;
        }

        current.get_or_insert_with(|| Block { line_num: idx + 1, lines: Vec::new() }).lines.push(line);
    }

    result.extend(current);
    result
}

/// Splits off the first line, ending at `\r\n`, `\n` or a lone `\r`.
///
/// Returns the line without its terminator and the rest after it.
pub fn split_first_line(s: &str) -> (&str, &str) {
    match s.find(|c: char| c == '\r' || c == '\n') {
        Some(idx) if s[idx..].starts_with("\r\n") => (&s[..idx], &s[idx + 2..]),
        Some(idx) => (&s[..idx], &s[idx + 1..]),
        None => (s, ""),
    }
}

/// Splits on `\r\n`, `\n` and lone `\r` line endings.
pub fn split_lines(s: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut rest = s;
    while !rest.is_empty() {
        let (line, tail) = split_first_line(rest);
        result.push(line);
        rest = tail;
    }
    result
}

/// Why a block of the input did not produce a cue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// A cue needs at least a timing line and one more line.
    TooFewLines,

    /// No line in the expected position contains `-->`.
    MissingTimingLine,

    /// The timing line does not consist of two valid timestamps.
    MalformedTiming(String),
}

impl Display for DropReason {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            DropReason::TooFewLines => write!(f, "block has fewer than two lines"),
            DropReason::MissingTimingLine => write!(f, "no timing line found"),
            DropReason::MalformedTiming(line) => write!(f, "malformed timing line '{}'", line),
        }
    }
}

/// A block that was skipped during lenient parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDiagnostic {
    /// 1-based line number at which the skipped block starts.
    pub line_num: usize,

    /// Why the block was skipped.
    pub reason: DropReason,
}

impl Display for BlockDiagnostic {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "line {}: {}", self.line_num, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_bom() {
        assert_eq!(split_bom("\u{feff}abc"), ("\u{feff}", "abc"));
        assert_eq!(split_bom("bla"), ("", "bla"));
        assert_eq!(split_bom(""), ("", ""));
    }

    #[test]
    fn split_lines_accepts_all_line_endings() {
        assert_eq!(split_lines("a\r\nb\nc\rd"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_lines("a\n\n"), vec!["a", ""]);
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn first_line_ends_at_any_terminator() {
        assert_eq!(split_first_line("WEBVTT\r\nrest"), ("WEBVTT", "rest"));
        assert_eq!(split_first_line("WEBVTT\r\rrest"), ("WEBVTT", "\rrest"));
        assert_eq!(split_first_line("WEBVTT\nrest"), ("WEBVTT", "rest"));
        assert_eq!(split_first_line("WEBVTT"), ("WEBVTT", ""));
    }

    #[test]
    fn blocks_are_separated_by_blank_lines() {
        let blocks = split_blocks("\n1\n  a  \n\n \t\n2\nb\n\n\n3");
        assert_eq!(
            blocks,
            vec![
                Block { line_num: 2, lines: vec!["1", "a"] },
                Block { line_num: 6, lines: vec!["2", "b"] },
                Block { line_num: 10, lines: vec!["3"] },
            ]
        );
    }

    #[test]
    fn timing_line_with_settings_and_spacing() {
        assert_eq!(parse_timing_line("00:00:01,000 --> 00:00:03,500", srt_timestamp), Some((1.0, 3.5)));
        assert_eq!(parse_timing_line(" 0:0:1,0-->0:0:2,5", srt_timestamp), Some((1.0, 2.5)));
        assert_eq!(parse_timing_line("00:01.000 --> 00:02.000 align:start", vtt_timestamp), Some((1.0, 2.0)));
        assert_eq!(parse_timing_line("01:00:01.000 --> 01:00:02.000", vtt_timestamp), Some((3601.0, 3602.0)));
    }

    #[test]
    fn timing_line_rejects_wrong_separator() {
        assert_eq!(parse_timing_line("00:00:01.000 --> 00:00:03.500", srt_timestamp), None);
        assert_eq!(parse_timing_line("00:00:01,000 --> 00:00:03,500", vtt_timestamp), None);
        assert_eq!(parse_timing_line("00:00:01,000 -> 00:00:03,500", srt_timestamp), None);
        assert_eq!(parse_timing_line("00:01,000 --> 00:03,500", srt_timestamp), None);
    }
}
