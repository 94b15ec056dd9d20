use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;
use spanvas_core::plan::{AttributesByRedness, StackKeyEntry};

/// One drawing, as configured on disk. Image paths are relative to the
/// config file.
#[derive(Debug, Deserialize)]
pub struct DrawConfig {
    /// Seed for every shuffle in the run. Same seed, same drawing.
    pub seed: u64,
    pub heatmap: HeatmapSection,
    #[serde(default, rename = "stackedGraph")]
    pub stacked_graph: Option<StackedGraphSection>,
    pub waterfall: WaterfallSection,
}

#[derive(Debug, Deserialize)]
pub struct HeatmapSection {
    pub image: PathBuf,
    /// Blueness values to pin to a density, overriding the derived table.
    #[serde(default, rename = "bluenessToDensity")]
    pub blueness_to_density: BTreeMap<u8, u32>,
    /// Extra attributes for spans from pixels with this much red.
    #[serde(default, rename = "attributesByRedness")]
    pub attributes_by_redness: AttributesByRedness,
}

#[derive(Debug, Deserialize)]
pub struct StackedGraphSection {
    pub image: PathBuf,
    #[serde(default, rename = "stackKey")]
    pub stack_key: Vec<StackKeyEntry>,
}

#[derive(Debug, Deserialize)]
pub struct WaterfallSection {
    pub images: Vec<WaterfallImageSection>,
    /// Verses separated by 🎼, one line per span name.
    #[serde(default, rename = "songLyrics")]
    pub song_lyrics: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct WaterfallImageSection {
    pub image: PathBuf,
    #[serde(rename = "maxCount")]
    pub max_count: u32,
    /// Display name for the picture; the image's file stem when omitted.
    #[serde(default)]
    pub name: Option<String>,
}

impl DrawConfig {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("parse config '{}'", path.display()))
    }
}

impl WaterfallImageSection {
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.image.file_stem().map_or_else(
                || self.image.display().to_string(),
                |stem| stem.to_string_lossy().into_owned(),
            )
        })
    }
}
