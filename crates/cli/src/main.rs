mod config;
mod images;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use spanvas_core::plan::density::DensityMap;
use spanvas_core::plan::{
    HeatmapInput, ImageSource, PlanConfig, StackedGraphInput, WaterfallImage, WaterfallInput,
};
use spanvas_core::{SeededRandom, emit_trace, plan_spans};
use spanvas_protocol::palette::color_for_density;
use spanvas_protocol::{Pixel, PixelGrid};

use crate::config::DrawConfig;

#[derive(Parser, Debug)]
#[command(name = "spanvas", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a drawing config into a trace JSON file.
    Draw(DrawArgs),
    /// Map a heatmap image through the density table and save it as a PNG.
    Preview(PreviewArgs),
}

#[derive(Parser, Debug)]
struct DrawArgs {
    /// Drawing config JSON; image paths resolve relative to it.
    #[arg(long)]
    config: PathBuf,

    /// Output trace JSON path.
    #[arg(long)]
    out: PathBuf,

    /// Trace begin time, in whole seconds since the epoch. Defaults to now.
    #[arg(long)]
    begin: Option<i64>,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    /// Heatmap image to preview.
    #[arg(long)]
    image: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Draw(args) => cmd_draw(args),
        Command::Preview(args) => cmd_preview(args),
    }
}

fn cmd_draw(args: DrawArgs) -> anyhow::Result<()> {
    let DrawArgs { config: config_path, out, begin } = args;
    let config = DrawConfig::from_path(&config_path)?;
    let assets_root = config_path.parent().unwrap_or_else(|| Path::new("."));

    let heatmap = HeatmapInput {
        pixels: images::load(&assets_root.join(&config.heatmap.image))?,
        blueness_to_density: config.heatmap.blueness_to_density,
        attributes_by_redness: config.heatmap.attributes_by_redness,
    };

    let stacked_graph = match config.stacked_graph {
        Some(section) => Some(StackedGraphInput {
            pixels: images::load(&assets_root.join(&section.image))?,
            stack_key: section.stack_key,
        }),
        None => None,
    };

    let mut sources = Vec::with_capacity(config.waterfall.images.len());
    for section in &config.waterfall.images {
        let pixels = images::load(&assets_root.join(&section.image))?;
        sources.push(ImageSource {
            image: WaterfallImage::from_pixels(&section.display_name(), &pixels),
            max_count: section.max_count,
        });
    }

    let lyrics = match &config.waterfall.song_lyrics {
        Some(path) => Some(
            std::fs::read_to_string(assets_root.join(path))
                .with_context(|| format!("read song lyrics '{}'", path.display()))?,
        ),
        None => None,
    };

    let plan = PlanConfig {
        heatmap,
        stacked_graph,
        waterfall: WaterfallInput { sources, lyrics },
    };

    let mut rng = SeededRandom::new(config.seed);
    let specs = plan_spans(&plan, &mut rng)?;
    let begin = match begin {
        Some(seconds) => seconds,
        None => next_whole_second()?,
    };
    let trace = emit_trace(begin, &specs);

    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let file = std::fs::File::create(&out)
        .with_context(|| format!("create trace file '{}'", out.display()))?;
    serde_json::to_writer_pretty(file, &trace)
        .with_context(|| format!("write trace '{}'", out.display()))?;

    eprintln!(
        "wrote {} ({} spans, {} events)",
        out.display(),
        trace.spans.len(),
        trace.events.len()
    );
    Ok(())
}

/// Wall-clock time rounded up to a whole second.
fn next_whole_second() -> anyhow::Result<i64> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .context("system clock predates the epoch")?;
    let mut seconds = i64::try_from(now.as_secs()).context("system clock out of range")?;
    if now.subsec_nanos() > 0 {
        seconds += 1;
    }
    Ok(seconds)
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let PreviewArgs { image, out } = args;
    let pixels = images::load(&image)?;
    let visible = pixels.visible();
    let densities = DensityMap::derive(&visible, &BTreeMap::new());

    let mut preview = PixelGrid::blank(pixels.width(), pixels.height());
    for pixel in &visible {
        if let Some(color) = color_for_density(densities.density_for(pixel)) {
            preview.overwrite(Pixel::new(pixel.location.x, pixel.location.y, color));
        }
    }

    images::save(&out, &preview)?;
    eprintln!("wrote {}", out.display());
    Ok(())
}
