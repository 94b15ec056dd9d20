use spanvas_protocol::Pixel;

/// Height units per pixel row on the rendered heatmap axis. This is just
/// what it is: 0.0000001 * 2^24, matched to the renderer's bucketing.
pub const HEATMAP_STEP: f64 = 1.6777216;

const HEIGHT_EPSILON: f64 = 0.01;

const TALLEST_COMFORTABLE: i64 = 50;
const SHORTEST_COMFORTABLE: i64 = 25;

/// Maps pixel rows onto the heatmap's numeric height axis.
///
/// Heights are strictly non-integer so the backend types the field as a
/// float and buckets it the way the step constant assumes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalScale {
    canvas_height: i64,
    image_base: i64,
}

impl VerticalScale {
    /// Derive the scale from the rows the visible pixels actually occupy.
    /// `None` when there are no visible pixels.
    ///
    /// Content outside the 25-50 pixel band still renders, but squashed or
    /// clipped, so that earns a warning.
    pub fn derive(visible: &[Pixel], canvas_height: u32) -> Option<Self> {
        let top_row = visible.iter().map(|p| p.location.y).min()?;
        let bottom_row = visible.iter().map(|p| p.location.y).max()?;
        let canvas_height = i64::from(canvas_height);
        let picture_height = canvas_height - i64::from(top_row);
        let image_base = canvas_height - i64::from(bottom_row);
        let extent = picture_height - image_base + 1;
        if extent > TALLEST_COMFORTABLE {
            tracing::warn!(extent, "picture is too tall; make its content 25-50 pixels high");
        }
        if extent <= SHORTEST_COMFORTABLE {
            tracing::warn!(extent, "picture is too short; make its content 25-50 pixels high");
        }
        Some(Self {
            canvas_height,
            image_base,
        })
    }

    /// Heatmap height for a pixel row.
    pub fn height_for(&self, y: u32) -> f64 {
        let rows_above_base = (self.canvas_height - i64::from(y) - self.image_base) as f64;
        (rows_above_base + 0.5) * HEATMAP_STEP + self.image_base as f64 + HEIGHT_EPSILON
    }
}
