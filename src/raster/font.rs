// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::builtin;

use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};
use fontdue::{Font, FontSettings};
use walkdir::WalkDir;

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Coverage bitmap of one glyph, positioned relative to the top left corner of its run.
#[derive(Debug, Clone, Default)]
pub struct GlyphCoverage {
    /// Horizontal offset inside the run.
    pub x: i32,

    /// Vertical offset inside the run.
    pub y: i32,

    /// Bitmap width.
    pub width: usize,

    /// Bitmap height.
    pub height: usize,

    /// Row-major coverage values, 0 is transparent, 255 fully covered.
    pub coverage: Vec<u8>,
}

/// A laid out line of text: its bounding box size and the glyphs inside it.
#[derive(Debug, Clone, Default)]
pub struct GlyphRun {
    /// Width of the bounding box.
    pub width: u32,

    /// Height of the bounding box.
    pub height: u32,

    /// The glyph bitmaps.
    pub glyphs: Vec<GlyphCoverage>,
}

impl GlyphRun {
    /// Returns `true` if there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

/// The font frames are drawn with.
pub enum Typeface {
    /// A TrueType/OpenType font loaded from disk.
    Outline {
        /// The parsed font.
        font: Font,

        /// Where the font was loaded from.
        path: PathBuf,
    },

    /// The built-in 5x7 bitmap font.
    Builtin,
}

impl Debug for Typeface {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Typeface::Outline { path, .. } => write!(f, "Typeface::Outline({})", path.display()),
            Typeface::Builtin => write!(f, "Typeface::Builtin"),
        }
    }
}

impl Typeface {
    /// Resolves a font family name or font file path.
    ///
    /// Never fails: if nothing usable is found the built-in bitmap font is returned.
    pub fn resolve(family: &str, font_dirs: &[PathBuf]) -> Typeface {
        match find_font_file(family, font_dirs) {
            Some(path) => match load_font(&path) {
                Ok(font) => {
                    debug!("using font '{}' from {}", family, path.display());
                    Typeface::Outline { font: font, path: path }
                }
                Err(reason) => {
                    warn!("failed to load font {}: {}; falling back to built-in font", path.display(), reason);
                    Typeface::Builtin
                }
            },
            None => {
                warn!("font '{}' not found; falling back to built-in font", family);
                Typeface::Builtin
            }
        }
    }

    /// Returns `true` for the built-in fallback font.
    pub fn is_builtin(&self) -> bool {
        match self {
            Typeface::Builtin => true,
            Typeface::Outline { .. } => false,
        }
    }

    /// Lays out `text` as a single line at `px` pixels per em.
    pub fn layout(&self, text: &str, px: f32) -> GlyphRun {
        match self {
            Typeface::Outline { font, .. } => layout_outline(font, text, px),
            Typeface::Builtin => builtin::layout(text, px),
        }
    }
}

fn load_font(path: &Path) -> Result<Font, String> {
    let bytes = fs::read(path).map_err(|e| e.to_string())?;
    Font::from_bytes(bytes, FontSettings::default()).map_err(str::to_string)
}

fn layout_outline(font: &Font, text: &str, px: f32) -> GlyphRun {
    let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
    layout.reset(&LayoutSettings::default());
    layout.append(std::slice::from_ref(font), &TextStyle::new(text, px, 0));

    let positioned: Vec<_> = layout
        .glyphs()
        .iter()
        .filter(|glyph| glyph.width > 0 && glyph.height > 0)
        .map(|glyph| (glyph.x.round() as i32, glyph.y.round() as i32, glyph))
        .collect();

    let min_x = match positioned.iter().map(|&(x, _, _)| x).min() {
        Some(x) => x,
        None => return GlyphRun::default(),
    };
    let min_y = positioned.iter().map(|&(_, y, _)| y).min().unwrap_or(0);
    let max_x = positioned.iter().map(|&(x, _, g)| x + g.width as i32).max().unwrap_or(min_x);
    let max_y = positioned.iter().map(|&(_, y, g)| y + g.height as i32).max().unwrap_or(min_y);

    let glyphs = positioned
        .iter()
        .map(|&(x, y, glyph)| {
            let (_, coverage) = font.rasterize_config(glyph.key);
            GlyphCoverage {
                x: x - min_x,
                y: y - min_y,
                width: glyph.width,
                height: glyph.height,
                coverage: coverage,
            }
        })
        .collect();

    GlyphRun {
        width: (max_x - min_x) as u32,
        height: (max_y - min_y) as u32,
        glyphs: glyphs,
    }
}

/// Lowercase, with spaces, dashes and underscores removed: `"Times New Roman"` -> `"timesnewroman"`.
fn normalize(name: &str) -> String {
    name.chars().filter(|c| !matches!(c, ' ' | '-' | '_')).flat_map(char::to_lowercase).collect()
}

fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("ttf") || ext.eq_ignore_ascii_case("otf"))
}

/// Finds the file for a family: either `family` itself is a font file path, or a file in
/// `font_dirs` is named after the family (`Arial.ttf`, `DejaVuSans.ttf`, `Roboto-Regular.ttf`).
///
/// An exact name match wins over a `-Regular` match.
pub fn find_font_file(family: &str, font_dirs: &[PathBuf]) -> Option<PathBuf> {
    let direct = Path::new(family);
    if direct.is_file() && is_font_file(direct) {
        return Some(direct.to_path_buf());
    }

    let wanted = normalize(family);
    if wanted.is_empty() {
        return None;
    }
    let wanted_regular = format!("{}regular", wanted);

    let mut regular = None;
    for dir in font_dirs {
        let files = WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file() && is_font_file(entry.path()));

        for entry in files {
            let stem = match entry.path().file_stem().and_then(|s| s.to_str()) {
                Some(stem) => normalize(stem),
                None => continue,
            };

            if stem == wanted {
                return Some(entry.into_path());
            }
            if regular.is_none() && stem == wanted_regular {
                regular = Some(entry.into_path());
            }
        }
    }

    regular
}

/// The usual system font directories that exist on this machine.
pub fn default_font_dirs() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = vec![
        "/usr/share/fonts".into(),
        "/usr/local/share/fonts".into(),
        "/System/Library/Fonts".into(),
        "/Library/Fonts".into(),
    ];

    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        dirs.push(home.join(".local/share/fonts"));
        dirs.push(home.join(".fonts"));
        dirs.push(home.join("Library/Fonts"));
    }
    if let Some(windir) = std::env::var_os("WINDIR").map(PathBuf::from) {
        dirs.push(windir.join("Fonts"));
    }

    dirs.retain(|dir| dir.is_dir());
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_family_names() {
        assert_eq!(normalize("Times New Roman"), "timesnewroman");
        assert_eq!(normalize("DejaVu_Sans-Mono"), "dejavusansmono");
    }

    #[test]
    fn finds_font_files_by_family() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("truetype").join("dejavu");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("DejaVuSans.ttf"), b"not really a font").unwrap();
        fs::write(nested.join("Roboto-Regular.otf"), b"").unwrap();
        fs::write(nested.join("Roboto-Bold.otf"), b"").unwrap();
        fs::write(nested.join("Arial.txt"), b"").unwrap();

        let dirs = vec![dir.path().to_path_buf()];
        assert_eq!(find_font_file("DejaVu Sans", &dirs), Some(nested.join("DejaVuSans.ttf")));
        assert_eq!(find_font_file("roboto", &dirs), Some(nested.join("Roboto-Regular.otf")));
        assert_eq!(find_font_file("Arial", &dirs), None);
        assert_eq!(find_font_file("", &dirs), None);
    }

    #[test]
    fn font_file_path_is_used_directly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.ttf");
        fs::write(&path, b"").unwrap();
        assert_eq!(find_font_file(path.to_str().unwrap(), &[]), Some(path));
    }

    #[test]
    fn unloadable_font_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Broken.ttf"), b"garbage").unwrap();
        assert!(Typeface::resolve("Broken", &[dir.path().to_path_buf()]).is_builtin());
        assert!(Typeface::resolve("Missing Family", &[]).is_builtin());
    }

    #[test]
    fn builtin_layout_is_tight() {
        let run = Typeface::Builtin.layout("Hi", 8.0);
        assert_eq!((run.width, run.height), (11, 7));
        assert!(Typeface::Builtin.layout("", 8.0).is_empty());
    }
}
