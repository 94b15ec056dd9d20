pub mod density;
pub mod heatmap;
pub mod sequence;
pub mod stacked;
pub mod vertical;
pub mod waterfall;

use spanvas_protocol::{PixelGrid, TraceSpanSpec};
use thiserror::Error;

use crate::shuffle::SeededRandom;
use crate::song::SpanSong;

pub use heatmap::{AttributesByRedness, HeatmapInput};
pub use sequence::ImageSource;
pub use stacked::{StackKeyEntry, StackOrderError};
pub use waterfall::{PictureOutcome, WaterfallError, WaterfallImage, WaterfallRow};

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("stacked graph: {0}")]
    StackOrder(#[from] StackOrderError),
    #[error("waterfall: {0}")]
    Waterfall(#[from] WaterfallError),
}

/// The stacked-graph image and its caption table.
#[derive(Debug, Clone)]
pub struct StackedGraphInput {
    pub pixels: PixelGrid,
    pub stack_key: Vec<StackKeyEntry>,
}

/// The waterfall picture queue and the song that names its spans.
#[derive(Debug, Clone)]
pub struct WaterfallInput {
    pub sources: Vec<ImageSource>,
    pub lyrics: Option<String>,
}

/// Everything one drawing needs, images already decoded.
#[derive(Debug, Clone)]
pub struct PlanConfig {
    pub heatmap: HeatmapInput,
    pub stacked_graph: Option<StackedGraphInput>,
    pub waterfall: WaterfallInput,
}

/// Run the whole planning pipeline for one drawing.
///
/// The heatmap image fills the span pool, the stacked graph decorates it,
/// and the waterfall draws pictures out of it. The same seed over the same
/// config yields the same spans.
pub fn plan_spans(
    config: &PlanConfig,
    rng: &mut SeededRandom,
) -> Result<Vec<TraceSpanSpec>, PlanError> {
    let mut spans = heatmap::convert_pixels_to_spans(&config.heatmap);
    if let Some(stacked) = &config.stacked_graph {
        stacked::add_stacked_graph_attributes(&mut spans, &stacked.pixels, &stacked.stack_key)?;
    }
    let mut song = config
        .waterfall
        .lyrics
        .as_deref()
        .map_or_else(SpanSong::silence, SpanSong::from_lyrics);
    let specs = sequence::build_pictures_in_waterfall(
        &config.waterfall.sources,
        spans,
        &mut song,
        rng,
    )?;
    Ok(specs)
}
