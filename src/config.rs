// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::encode::FfmpegEncoder;
use crate::errors::*;
use crate::raster::{RenderSettings, Rgb};

use serde::Deserialize;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Contents of a configuration file. Every key is optional.
///
/// ```toml
/// [render]
/// font_family = "Arial"
/// font_size = 24
/// color = "#FFFFFF"
/// width = 1080
/// font_dirs = ["/usr/share/fonts"]
///
/// [encoder]
/// program = "ffmpeg"
/// timeout_secs = 600
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Frame rendering defaults.
    pub render: RenderConfig,

    /// Video encoder defaults.
    pub encoder: EncoderConfig,
}

/// The `[render]` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Font family name or font file path.
    pub font_family: Option<String>,

    /// Font size in points at 1920 pixels width.
    pub font_size: Option<u32>,

    /// Text color as `#RRGGBB`.
    pub color: Option<String>,

    /// Canvas width in pixels.
    pub width: Option<u32>,

    /// Font directories, searched before the system ones.
    pub font_dirs: Option<Vec<PathBuf>>,
}

/// The `[encoder]` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncoderConfig {
    /// Path or name of the ffmpeg executable.
    pub program: Option<PathBuf>,

    /// Seconds before the encoder is killed; 0 disables the limit.
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Parse a configuration from TOML text.
    pub fn parse(s: &str) -> Result<Config> {
        Ok(toml::from_str(s)?)
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).chain_err(|| ErrorKind::ReadConfig(path.to_path_buf()))?;
        let config = Config::parse(&content).chain_err(|| ErrorKind::ReadConfig(path.to_path_buf()))?;
        debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Applies the `[render]` section on top of `settings`.
    pub fn apply_render(&self, settings: &mut RenderSettings) -> Result<()> {
        let render = &self.render;
        if let Some(family) = &render.font_family {
            settings.font_family = family.clone();
        }
        if let Some(size) = render.font_size {
            settings.font_size_pt = size;
        }
        if let Some(color) = &render.color {
            settings.color = color.parse::<Rgb>()?;
        }
        if let Some(width) = render.width {
            settings.canvas_width = width;
        }
        if let Some(dirs) = &render.font_dirs {
            let mut font_dirs = dirs.clone();
            font_dirs.extend(settings.font_dirs.drain(..).filter(|dir| !dirs.contains(dir)));
            settings.font_dirs = font_dirs;
        }
        Ok(())
    }

    /// Builds the encoder described by the `[encoder]` section.
    pub fn encoder(&self) -> FfmpegEncoder {
        let mut encoder = FfmpegEncoder::new();
        if let Some(program) = &self.encoder.program {
            encoder = encoder.with_program(program.clone());
        }
        match self.encoder.timeout_secs {
            Some(0) => encoder.with_timeout(None),
            Some(secs) => encoder.with_timeout(Some(Duration::from_secs(secs))),
            None => encoder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::ffmpeg::DEFAULT_TIMEOUT;

    #[test]
    fn empty_config_changes_nothing() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());

        let mut settings = RenderSettings::default();
        config.apply_render(&mut settings).unwrap();
        assert_eq!(settings, RenderSettings::default());
        assert_eq!(config.encoder(), FfmpegEncoder::new());
    }

    #[test]
    fn applies_all_sections() {
        let config = Config::parse(
            r##"
[render]
font_family = "DejaVu Sans"
font_size = 30
color = "#00FF00"
width = 720
font_dirs = ["/opt/fonts"]

[encoder]
program = "/usr/local/bin/ffmpeg"
timeout_secs = 60
"##,
        )
        .unwrap();

        let mut settings = RenderSettings::default();
        settings.font_dirs = vec![PathBuf::from("/usr/share/fonts"), PathBuf::from("/opt/fonts")];
        config.apply_render(&mut settings).unwrap();

        assert_eq!(settings.font_family, "DejaVu Sans");
        assert_eq!(settings.font_size_pt, 30);
        assert_eq!(settings.color, Rgb(0, 255, 0));
        assert_eq!(settings.canvas_width, 720);
        assert_eq!(settings.font_dirs, vec![PathBuf::from("/opt/fonts"), PathBuf::from("/usr/share/fonts")]);

        let encoder = config.encoder();
        assert_eq!(encoder.program(), Path::new("/usr/local/bin/ffmpeg"));
        assert_eq!(encoder.timeout(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn zero_timeout_disables_limit() {
        let config = Config::parse("[encoder]\ntimeout_secs = 0\n").unwrap();
        assert_eq!(config.encoder().timeout(), None);
        assert_eq!(Config::default().encoder().timeout(), Some(DEFAULT_TIMEOUT));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Config::parse("[render]\nfont_size = \"big\"\n").is_err());
        assert!(Config::parse("[render]\nunknown = 1\n").is_err());

        let config = Config::parse("[render]\ncolor = \"red\"\n").unwrap();
        let err = config.apply_render(&mut RenderSettings::default()).unwrap_err();
        match err.kind() {
            ErrorKind::InvalidColor(value) => assert_eq!(value, "red"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn load_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        match Config::load(&path).unwrap_err().kind() {
            ErrorKind::ReadConfig(p) => assert_eq!(p, &path),
            other => panic!("unexpected error {:?}", other),
        }

        let path = dir.path().join("subframe.toml");
        fs::write(&path, "[render]\nwidth = 1920\n").unwrap();
        assert_eq!(Config::load(&path).unwrap().render.width, Some(1920));
    }
}
