// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

mod builtin;
/// Font resolution and text layout.
pub mod font;

use self::errors::ErrorKind::*;
use self::errors::*;
use self::font::{GlyphRun, Typeface};
use crate::Cue;

use image::{ImageFormat, Rgba, RgbaImage};

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Rasterizer-specific errors
#[allow(missing_docs)]
pub mod errors {
    use std::path::PathBuf;

    // see https://docs.rs/error-chain/0.12.4/error_chain/
    error_chain! {
        foreign_links {
            Io(::std::io::Error);
            Image(::image::ImageError);
        }

        errors {
            InvalidSettings(reason: String) {
                description("invalid render settings")
                display("invalid render settings: {}", reason)
            }
            CreateDirectory(path: PathBuf) {
                description("creating output directory failed")
                display("creating output directory '{}' failed", path.display())
            }
            ClearDirectory(path: PathBuf) {
                description("clearing output directory failed")
                display("removing '{}' from the output directory failed", path.display())
            }
            EncodeFrame {
                description("encoding frame as PNG failed")
            }
            WriteFrame(path: PathBuf) {
                description("writing frame failed")
                display("writing frame '{}' failed", path.display())
            }
        }
    }
}

/// Frames generated per second of cue time.
pub const FRAMES_PER_SECOND: i64 = 10;

/// Canvas width at which `font_size_pt` is used unscaled.
pub const REFERENCE_WIDTH: u32 = 1920;

/// Gap between the bottom of the text and the bottom of the canvas, in pixels.
pub const BOTTOM_MARGIN: i64 = 50;

/// Smallest accepted canvas width.
pub const MIN_CANVAS_WIDTH: u32 = 480;

/// Largest accepted canvas width.
pub const MAX_CANVAS_WIDTH: u32 = 3840;

/// Text used for previews when there are no cues.
pub const SAMPLE_TEXT: &str = "Sample Text";

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// White, the default text color.
    pub const WHITE: Rgb = Rgb(0xFF, 0xFF, 0xFF);
}

impl Display for Rgb {
    /// Writes `#RRGGBB`.
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

impl FromStr for Rgb {
    type Err = crate::errors::Error;

    /// Parses `#RRGGBB` or `RRGGBB`.
    fn from_str(s: &str) -> crate::errors::Result<Rgb> {
        let invalid = || crate::errors::Error::from(crate::errors::ErrorKind::InvalidColor(s.to_string()));

        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let component = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Rgb(component(0)?, component(2)?, component(4)?))
    }
}

/// How frames are drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    /// Font family name (`"Arial"`) or path to a `.ttf`/`.otf` file.
    pub font_family: String,

    /// Font size in points at a 1920 pixel wide canvas.
    pub font_size_pt: u32,

    /// Text color.
    pub color: Rgb,

    /// Width of the square canvas in pixels.
    pub canvas_width: u32,

    /// Directories searched (recursively) when resolving `font_family`.
    pub font_dirs: Vec<PathBuf>,
}

impl Default for RenderSettings {
    fn default() -> RenderSettings {
        RenderSettings {
            font_family: "Arial".to_string(),
            font_size_pt: 24,
            color: Rgb::WHITE,
            canvas_width: 1080,
            font_dirs: font::default_font_dirs(),
        }
    }
}

impl RenderSettings {
    /// Checks the canvas width range and font size.
    pub fn validate(&self) -> Result<()> {
        if self.canvas_width < MIN_CANVAS_WIDTH || self.canvas_width > MAX_CANVAS_WIDTH {
            bail!(InvalidSettings(format!(
                "canvas width {} is outside {}..={}",
                self.canvas_width, MIN_CANVAS_WIDTH, MAX_CANVAS_WIDTH
            )));
        }
        if self.font_size_pt == 0 {
            bail!(InvalidSettings("font size must be at least 1".to_string()));
        }
        Ok(())
    }

    /// The canvas is square.
    pub fn canvas_height(&self) -> u32 {
        self.canvas_width
    }

    /// Font size in pixels, scaled linearly from the 1920 pixel reference width.
    pub fn font_px(&self) -> f32 {
        (self.font_size_pt as f32 * self.canvas_width as f32 / REFERENCE_WIDTH as f32).max(1.0)
    }
}

/// The frames written by `rasterize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSequence {
    /// The output directory.
    pub directory: PathBuf,

    /// Number of frames written.
    pub frame_count: usize,

    /// Paths of all frames, in frame order.
    pub frames: Vec<PathBuf>,
}

/// Number of frames a cue covers: `floor(duration * 10)`, computed on whole milliseconds.
pub fn frame_count(cue: &Cue) -> usize {
    let (start, end) = cue.span();
    let msecs = end.msecs() - start.msecs();
    if msecs <= 0 {
        0
    } else {
        (msecs / (1000 / FRAMES_PER_SECOND)) as usize
    }
}

/// File name of the frame with the given zero-based number.
pub fn frame_file_name(number: usize) -> String {
    format!("frame_{:06}.png", number)
}

/// The preview caption for a cue list: the first cue's text, or a sample text.
pub fn preview_text(cues: &[Cue]) -> String {
    format!("Preview: {}", cues.first().map_or(SAMPLE_TEXT, |cue| cue.text()))
}

/// Renders every cue into a sequence of transparent PNG frames in `output_dir`.
///
/// Each cue contributes `frame_count(cue)` consecutive frames; numbering runs across all cues.
/// Frames of cues with blank text are fully transparent.
///
/// **The output directory is owned by this call**: it is created if missing and everything
/// already inside it is deleted before the first frame is written. Never point two concurrent
/// calls at the same directory.
///
/// Any failure while writing aborts the whole operation.
pub fn rasterize(cues: &[Cue], settings: &RenderSettings, output_dir: &Path) -> Result<FrameSequence> {
    settings.validate()?;
    prepare_output_dir(output_dir)?;

    let px = settings.font_px();
    let mut typeface: Option<Typeface> = None;
    let mut frames = Vec::new();

    for cue in cues {
        let count = frame_count(cue);
        if count == 0 {
            debug!("cue {} --> {} covers no frames", cue.start_timestamp(), cue.end_timestamp());
            continue;
        }

        let text = cue.text().trim();
        let run = if text.is_empty() {
            GlyphRun::default()
        } else {
            typeface
                .get_or_insert_with(|| Typeface::resolve(&settings.font_family, &settings.font_dirs))
                .layout(text, px)
        };

        // every frame of a cue looks the same, so the PNG is encoded once
        let png = encode_png(&draw_frame(&run, settings))?;
        for _ in 0..count {
            let path = output_dir.join(frame_file_name(frames.len()));
            fs::write(&path, &png).chain_err(|| WriteFrame(path.clone()))?;
            frames.push(path);
        }
    }

    info!("wrote {} frames for {} cues to {}", frames.len(), cues.len(), output_dir.display());

    Ok(FrameSequence {
        directory: output_dir.to_path_buf(),
        frame_count: frames.len(),
        frames: frames,
    })
}

/// Renders a single frame with `text` into the PNG file at `path`, using the same drawing
/// as `rasterize`. Used for previews; independent of any cue timeline.
pub fn render_preview(text: &str, settings: &RenderSettings, path: &Path) -> Result<()> {
    settings.validate()?;

    let text = text.trim();
    let run = if text.is_empty() {
        GlyphRun::default()
    } else {
        Typeface::resolve(&settings.font_family, &settings.font_dirs).layout(text, settings.font_px())
    };

    let png = encode_png(&draw_frame(&run, settings))?;
    fs::write(path, &png).chain_err(|| WriteFrame(path.to_path_buf()))
}

/// Creates `dir` if necessary and removes everything inside it.
fn prepare_output_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).chain_err(|| CreateDirectory(dir.to_path_buf()))?;

    let mut removed = 0;
    for entry in fs::read_dir(dir).chain_err(|| ClearDirectory(dir.to_path_buf()))? {
        let entry = entry.chain_err(|| ClearDirectory(dir.to_path_buf()))?;
        let path = entry.path();
        let file_type = entry.file_type().chain_err(|| ClearDirectory(path.clone()))?;

        if file_type.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        }
        .chain_err(|| ClearDirectory(path.clone()))?;
        removed += 1;
    }

    if removed > 0 {
        info!("removed {} existing entries from {}", removed, dir.display());
    }
    Ok(())
}

/// Draws a glyph run onto a fresh transparent canvas: centered horizontally, its bottom
/// `BOTTOM_MARGIN` pixels above the bottom edge. Out-of-canvas pixels are clipped.
fn draw_frame(run: &GlyphRun, settings: &RenderSettings) -> RgbaImage {
    let (width, height) = (settings.canvas_width, settings.canvas_height());
    let mut canvas = RgbaImage::new(width, height);
    if run.is_empty() {
        return canvas;
    }

    let origin_x = (i64::from(width) - i64::from(run.width)).div_euclid(2);
    let origin_y = i64::from(height) - i64::from(run.height) - BOTTOM_MARGIN;
    let Rgb(r, g, b) = settings.color;

    for glyph in &run.glyphs {
        for row in 0..glyph.height {
            let y = origin_y + i64::from(glyph.y) + row as i64;
            if y < 0 || y >= i64::from(height) {
                continue;
            }

            for col in 0..glyph.width {
                let alpha = glyph.coverage[row * glyph.width + col];
                let x = origin_x + i64::from(glyph.x) + col as i64;
                if alpha == 0 || x < 0 || x >= i64::from(width) {
                    continue;
                }

                let pixel = canvas.get_pixel_mut(x as u32, y as u32);
                *pixel = Rgba([r, g, b, alpha.max(pixel[3])]);
            }
        }
    }

    canvas
}

fn encode_png(canvas: &RgbaImage) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    canvas.write_to(&mut Cursor::new(&mut data), ImageFormat::Png).chain_err(|| EncodeFrame)?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> RenderSettings {
        RenderSettings {
            font_family: "No Such Font".to_string(),
            font_size_pt: 24,
            color: Rgb(0x10, 0x20, 0x30),
            canvas_width: 960,
            font_dirs: Vec::new(),
        }
    }

    fn frame_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn frame_count_is_ten_per_second() {
        assert_eq!(frame_count(&Cue::new(1.0, 3.5, "hi")), 25);
        assert_eq!(frame_count(&Cue::new(1.0, 1.3, "")), 3);
        assert_eq!(frame_count(&Cue::new(1.0, 1.099, "")), 0);
        assert_eq!(frame_count(&Cue::new(2.0, 2.0, "")), 0);
        assert_eq!(frame_count(&Cue::new(3.0, 2.0, "")), 0);
    }

    #[test]
    fn frame_count_of_huge_hour_cue_does_not_overflow() {
        let report = crate::parse_str("1\n00:00:00,000 --> 300000000000000:00:00,000\nforever\n");
        assert_eq!(report.cues.len(), 1);
        assert_eq!(frame_count(&report.cues[0]), (crate::timetypes::MAX_MSECS / 100) as usize);
    }

    #[test]
    fn parses_and_prints_colors() {
        assert_eq!("#FF8000".parse::<Rgb>().unwrap(), Rgb(255, 128, 0));
        assert_eq!("00ff00".parse::<Rgb>().unwrap(), Rgb(0, 255, 0));
        assert_eq!(Rgb(1, 2, 255).to_string(), "#0102FF");
        assert!("#FFF".parse::<Rgb>().is_err());
        assert!("#GG0000".parse::<Rgb>().is_err());
    }

    #[test]
    fn font_size_scales_with_canvas_width() {
        let mut s = settings();
        s.font_size_pt = 24;
        s.canvas_width = 1920;
        assert_eq!(s.font_px(), 24.0);
        s.canvas_width = 960;
        assert_eq!(s.font_px(), 12.0);
    }

    #[test]
    fn rejects_out_of_range_canvas() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = settings();
        s.canvas_width = 100;
        assert!(rasterize(&[], &s, dir.path()).is_err());
        s.canvas_width = 4000;
        assert!(s.validate().is_err());
    }

    #[test]
    fn single_cue_yields_floor_duration_frames() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("frames");
        let seq = rasterize(&[Cue::new(1.0, 3.5, "hi")], &settings(), &out).unwrap();

        assert_eq!(seq.frame_count, 25);
        assert_eq!(seq.frames.first().unwrap(), &out.join("frame_000000.png"));
        assert_eq!(seq.frames.last().unwrap(), &out.join("frame_000024.png"));
        assert_eq!(frame_names(&out).len(), 25);
    }

    #[test]
    fn numbering_continues_across_cues() {
        let dir = tempfile::tempdir().unwrap();
        let cues = vec![Cue::new(0.0, 0.2, "a"), Cue::new(5.0, 5.05, "skipped"), Cue::new(1.0, 1.3, "b")];
        let seq = rasterize(&cues, &settings(), dir.path()).unwrap();

        assert_eq!(seq.frame_count, 5);
        assert_eq!(
            frame_names(dir.path()),
            vec!["frame_000000.png", "frame_000001.png", "frame_000002.png", "frame_000003.png", "frame_000004.png"]
        );
    }

    #[test]
    fn zero_cues_empties_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("stale.png"), b"old").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("deep.txt"), b"old").unwrap();

        let seq = rasterize(&[], &settings(), dir.path()).unwrap();
        assert_eq!(seq.frame_count, 0);
        assert!(dir.path().is_dir());
        assert!(frame_names(dir.path()).is_empty());
    }

    #[test]
    fn second_render_replaces_first() {
        let dir = tempfile::tempdir().unwrap();
        rasterize(&[Cue::new(0.0, 1.0, "first run")], &settings(), dir.path()).unwrap();
        assert_eq!(frame_names(dir.path()).len(), 10);

        let seq = rasterize(&[Cue::new(0.0, 0.3, "second run")], &settings(), dir.path()).unwrap();
        assert_eq!(seq.frame_count, 3);
        assert_eq!(frame_names(dir.path()), vec!["frame_000000.png", "frame_000001.png", "frame_000002.png"]);
    }

    #[test]
    fn blank_text_frames_are_transparent() {
        let dir = tempfile::tempdir().unwrap();
        let seq = rasterize(&[Cue::new(0.0, 0.2, "   ")], &settings(), dir.path()).unwrap();
        assert_eq!(seq.frame_count, 2);

        let frame = image::open(&seq.frames[0]).unwrap().to_rgba8();
        assert_eq!(frame.dimensions(), (960, 960));
        assert!(frame.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn text_is_centered_above_bottom_margin() {
        let dir = tempfile::tempdir().unwrap();
        let seq = rasterize(&[Cue::new(0.0, 0.1, "H")], &settings(), dir.path()).unwrap();
        let frame = image::open(&seq.frames[0]).unwrap().to_rgba8();

        let drawn: Vec<(u32, u32)> = frame.enumerate_pixels().filter(|(_, _, p)| p[3] > 0).map(|(x, y, _)| (x, y)).collect();
        let min_x = drawn.iter().map(|&(x, _)| x).min().unwrap();
        let max_x = drawn.iter().map(|&(x, _)| x).max().unwrap();
        let min_y = drawn.iter().map(|&(_, y)| y).min().unwrap();
        let max_y = drawn.iter().map(|&(_, y)| y).max().unwrap();

        // built-in font at 24pt on a 960 canvas is 12px: scale 2, glyph box 10x14
        assert_eq!((min_x, max_x), (475, 484));
        assert_eq!((min_y, max_y), (896, 909));
        assert_eq!(*frame.get_pixel(475, 900), Rgba([0x10, 0x20, 0x30, 0xFF]));
    }

    #[test]
    fn overlapping_cues_are_rendered_independently() {
        let dir = tempfile::tempdir().unwrap();
        let cues = vec![Cue::new(0.0, 0.3, "one"), Cue::new(0.1, 0.3, "two")];
        assert_eq!(rasterize(&cues, &settings(), dir.path()).unwrap().frame_count, 5);
    }

    #[test]
    fn unwritable_output_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, b"").unwrap();
        let err = rasterize(&[Cue::new(0.0, 1.0, "x")], &settings(), &file).unwrap_err();
        match err.kind() {
            ErrorKind::CreateDirectory(path) => assert_eq!(path, &file),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn preview_is_a_single_canvas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.png");
        render_preview(&preview_text(&[]), &settings(), &path).unwrap();

        let frame = image::open(&path).unwrap().to_rgba8();
        assert_eq!(frame.dimensions(), (960, 960));
        assert!(frame.pixels().any(|p| p[3] == 0xFF));
        assert_eq!(preview_text(&[]), "Preview: Sample Text");
        assert_eq!(preview_text(&[Cue::new(0.0, 1.0, "Hello")]), "Preview: Hello");
    }
}
