use std::collections::BTreeMap;

use spanvas_protocol::{AttrMap, PixelGrid, SpanSpec};

use crate::plan::density::DensityMap;
use crate::plan::vertical::VerticalScale;

/// Extra attributes keyed by a pixel's red channel value.
///
/// Painting a region with a touch of red tags every span from that region,
/// so the picture lights up under a group-by on those attributes.
pub type AttributesByRedness = BTreeMap<u8, AttrMap>;

/// Everything the heatmap step needs for one image.
#[derive(Debug, Clone)]
pub struct HeatmapInput {
    pub pixels: PixelGrid,
    /// Optional blueness-to-density overrides, merged over the derived
    /// table.
    pub blueness_to_density: BTreeMap<u8, u32>,
    pub attributes_by_redness: AttributesByRedness,
}

impl HeatmapInput {
    pub fn from_pixels(pixels: PixelGrid) -> Self {
        Self {
            pixels,
            blueness_to_density: BTreeMap::new(),
            attributes_by_redness: AttributesByRedness::new(),
        }
    }
}

/// Turn each visible pixel into a stack of span specs.
///
/// A pixel's blueness decides how many spans pile up on its bucket, its
/// row decides the height attribute, and its column (as a distance from
/// the right edge) becomes `time_delta`. The pixel's own channels ride
/// along as attributes so every span can be traced back to its pixel.
#[tracing::instrument(skip(input))]
pub fn convert_pixels_to_spans(input: &HeatmapInput) -> Vec<SpanSpec> {
    let visible = input.pixels.visible();
    let Some(scale) = VerticalScale::derive(&visible, input.pixels.height()) else {
        return Vec::new();
    };
    let density = DensityMap::derive(&visible, &input.blueness_to_density);
    let canvas_width = i64::from(input.pixels.width());

    let mut specs = Vec::new();
    for pixel in &visible {
        let spans_at_once = density.density_for(pixel);
        let height = scale.height_for(pixel.location.y);
        for _ in 0..spans_at_once {
            let mut spec = SpanSpec::new(i64::from(pixel.location.x) - canvas_width);
            spec.attrs = pixel.flat_attributes();
            spec.attrs.insert("spans_at_once".into(), spans_at_once.into());
            spec.attrs.insert("height".into(), height.into());
            if let Some(extra) = input.attributes_by_redness.get(&pixel.color.red) {
                spec.attrs.extend(extra.clone());
            }
            specs.push(spec);
        }
    }
    tracing::debug!(spans = specs.len(), pixels = visible.len(), "planned heatmap spans");
    specs
}
