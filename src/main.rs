// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subframe::config::Config;
use subframe::errors::Result;
use subframe::raster::preview_text;
use subframe::{parse_file, rasterize, render_preview, OverlayEncoder, ParseReport, RenderSettings, Rgb};

use std::path::{Path, PathBuf};
use std::process;

/// Turn SubRip/WebVTT subtitles into transparent PNG frames or overlay videos
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML file with render and encoder defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the parsed cues and any skipped blocks
    Cues {
        /// Subtitle file (.srt or .vtt)
        input: PathBuf,
    },

    /// Render one transparent PNG per tenth of a second of cue time
    Frames {
        /// Subtitle file (.srt or .vtt)
        input: PathBuf,
        /// Output directory; existing contents are deleted
        #[arg(short, long)]
        output: PathBuf,
        /// Also write preview.png into the output directory
        #[arg(long)]
        preview: bool,
        #[command(flatten)]
        render: RenderArgs,
    },

    /// Render a single preview frame showing the first cue
    Preview {
        /// Subtitle file (.srt or .vtt)
        input: PathBuf,
        /// Output PNG file
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        render: RenderArgs,
    },

    /// Encode a transparent WebM overlay video with ffmpeg
    Video {
        /// Subtitle file (.srt or .vtt)
        input: PathBuf,
        /// Output video file
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        render: RenderArgs,
    },
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Font family name or path to a .ttf/.otf file
    #[arg(long)]
    font: Option<String>,
    /// Font size in points at 1920 pixels width
    #[arg(long)]
    font_size: Option<u32>,
    /// Text color as #RRGGBB
    #[arg(long)]
    color: Option<String>,
    /// Canvas width in pixels (480-3840)
    #[arg(long)]
    width: Option<u32>,
}

impl RenderArgs {
    /// Defaults, then the configuration file, then the command line.
    fn settings(&self, config: &Config) -> Result<RenderSettings> {
        let mut settings = RenderSettings::default();
        config.apply_render(&mut settings)?;

        if let Some(font) = &self.font {
            settings.font_family = font.clone();
        }
        if let Some(size) = self.font_size {
            settings.font_size_pt = size;
        }
        if let Some(color) = &self.color {
            settings.color = color.parse::<Rgb>()?;
        }
        if let Some(width) = self.width {
            settings.canvas_width = width;
        }
        Ok(settings)
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("subframe=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("subframe=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load(input: &Path) -> Result<ParseReport> {
    let report = parse_file(input)?;
    info!(
        "{}: {} cues ({}), {} blocks skipped",
        input.display(),
        report.cues.len(),
        report.format.get_name(),
        report.diagnostics.len()
    );
    Ok(report)
}

fn print_cues(report: &ParseReport) {
    println!("{:>4}  {:<12}  {:<12}  text", "#", "start", "end");
    for (i, cue) in report.cues.iter().enumerate() {
        println!("{:>4}  {:<12}  {:<12}  {}", i + 1, cue.start_timestamp(), cue.end_timestamp(), cue.text());
    }
    for diagnostic in &report.diagnostics {
        println!("skipped: {}", diagnostic);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    debug!("configuration: {:?}", config);

    match cli.command {
        Commands::Cues { input } => print_cues(&load(&input)?),
        Commands::Frames {
            input,
            output,
            preview,
            render,
        } => {
            let settings = render.settings(&config)?;
            let report = load(&input)?;
            let frames = rasterize(&report.cues, &settings, &output)?;
            if preview {
                render_preview(&preview_text(&report.cues), &settings, &output.join("preview.png"))?;
            }
            println!("{} frames written to {}", frames.frame_count, frames.directory.display());
        }
        Commands::Preview { input, output, render } => {
            let settings = render.settings(&config)?;
            let report = load(&input)?;
            render_preview(&preview_text(&report.cues), &settings, &output)?;
            println!("preview written to {}", output.display());
        }
        Commands::Video { input, output, render } => {
            let settings = render.settings(&config)?;
            let report = load(&input)?;
            config.encoder().encode(&report.cues, &settings, &output)?;
            println!("video written to {}", output.display());
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        for cause in e.iter().skip(1) {
            eprintln!("caused by: {}", cause);
        }
        process::exit(1);
    }
}
