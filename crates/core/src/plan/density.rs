use std::collections::{BTreeMap, BTreeSet};

use spanvas_protocol::Pixel;

/// Most spans the planner will stack on a single heatmap bucket. Tied to
/// the length of the histogram color ramp.
pub const MAX_SPANS_AT_ONE_POINT: u32 = 10;

/// Blueness-to-density lookup derived from the pixels of one image.
///
/// Blueness is the inverted blue channel; darker blues earn more stacked
/// spans so they render as hotter histogram cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DensityMap {
    by_blueness: BTreeMap<u8, u32>,
}

impl DensityMap {
    /// Derive the mapping from the visible pixels, then let caller-supplied
    /// overrides win per blueness key.
    ///
    /// With few distinct bluenesses (up to [`MAX_SPANS_AT_ONE_POINT`]) each
    /// one simply gets its ascending rank. Beyond that the range is
    /// linearly rescaled onto `1..=10` and rounded, so shrunken photos with
    /// hundreds of shades still quantize sensibly. A single distinct value
    /// short-circuits to density 1. Overrides are clamped into `1..=10` so
    /// every lookup stays a positive density within the ceiling.
    pub fn derive(visible: &[Pixel], overrides: &BTreeMap<u8, u32>) -> Self {
        let bluenesses: BTreeSet<u8> = visible.iter().map(|p| p.color.blueness()).collect();

        let mut by_blueness: BTreeMap<u8, u32> = if bluenesses.len() <= 1 {
            bluenesses.iter().map(|&b| (b, 1)).collect()
        } else if bluenesses.len() <= MAX_SPANS_AT_ONE_POINT as usize {
            bluenesses
                .iter()
                .enumerate()
                .map(|(rank, &b)| (b, rank as u32 + 1))
                .collect()
        } else {
            let max = f64::from(*bluenesses.last().unwrap_or(&0));
            let min = f64::from(*bluenesses.first().unwrap_or(&0));
            let spans_per_blueness = f64::from(MAX_SPANS_AT_ONE_POINT - 1) / (max - min);
            bluenesses
                .iter()
                .map(|&b| {
                    let density = f64::from(MAX_SPANS_AT_ONE_POINT)
                        - ((max - f64::from(b)) * spans_per_blueness).round();
                    (b, density as u32)
                })
                .collect()
        };

        for (&blueness, &density) in overrides {
            by_blueness.insert(blueness, density.clamp(1, MAX_SPANS_AT_ONE_POINT));
        }

        tracing::debug!(table = ?by_blueness, "derived blueness density table");
        Self { by_blueness }
    }

    /// How many spans to stack for this pixel. Unknown bluenesses fall back
    /// to a single span.
    pub fn density_for(&self, pixel: &Pixel) -> u32 {
        self.by_blueness
            .get(&pixel.color.blueness())
            .copied()
            .unwrap_or(1)
    }

    pub fn table(&self) -> &BTreeMap<u8, u32> {
        &self.by_blueness
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spanvas_protocol::Color;

    fn pixel_with_blueness(x: u32, blueness: u8) -> Pixel {
        // keep some red so the pixel is visible even at blueness 0
        Pixel::new(x, 0, Color::opaque(100, 100, 255 - blueness))
    }

    fn no_overrides() -> BTreeMap<u8, u32> {
        BTreeMap::new()
    }

    #[test]
    fn single_blueness_maps_to_one() {
        let pixels: Vec<Pixel> = (0..5).map(|x| pixel_with_blueness(x, 77)).collect();
        let map = DensityMap::derive(&pixels, &no_overrides());
        for p in &pixels {
            assert_eq!(map.density_for(p), 1);
        }
    }

    #[test]
    fn few_bluenesses_enumerate_by_rank() {
        let pixels = vec![
            pixel_with_blueness(0, 200),
            pixel_with_blueness(1, 13),
            pixel_with_blueness(2, 90),
            pixel_with_blueness(3, 13),
        ];
        let map = DensityMap::derive(&pixels, &no_overrides());
        assert_eq!(map.density_for(&pixel_with_blueness(9, 13)), 1);
        assert_eq!(map.density_for(&pixel_with_blueness(9, 90)), 2);
        assert_eq!(map.density_for(&pixel_with_blueness(9, 200)), 3);
    }

    #[test]
    fn blueness_zero_is_part_of_the_domain() {
        let pixels = vec![pixel_with_blueness(0, 0), pixel_with_blueness(1, 40)];
        let map = DensityMap::derive(&pixels, &no_overrides());
        assert_eq!(map.density_for(&pixel_with_blueness(9, 0)), 1);
        assert_eq!(map.density_for(&pixel_with_blueness(9, 40)), 2);
    }

    #[test]
    fn many_bluenesses_rescale_smoothly() {
        // 15 distinct values 10, 20, .. 150: more than the ceiling
        let pixels: Vec<Pixel> = (1..=15)
            .map(|i| pixel_with_blueness(i, (i * 10) as u8))
            .collect();
        let map = DensityMap::derive(&pixels, &no_overrides());
        assert_eq!(map.density_for(&pixel_with_blueness(0, 10)), 1);
        assert_eq!(map.density_for(&pixel_with_blueness(0, 150)), 10);
        // midpoint rounds half up: 10 - round((150-80) * 9/140) = 5
        assert_eq!(map.density_for(&pixel_with_blueness(0, 80)), 5);
    }

    #[test]
    fn densities_stay_positive_and_within_ceiling() {
        let pixels: Vec<Pixel> = (0..=255u32)
            .step_by(3)
            .enumerate()
            .map(|(x, b)| pixel_with_blueness(x as u32, b as u8))
            .collect();
        let map = DensityMap::derive(&pixels, &no_overrides());
        for p in &pixels {
            let d = map.density_for(p);
            assert!(
                (1..=MAX_SPANS_AT_ONE_POINT).contains(&d),
                "blueness {} got density {d}",
                p.color.blueness()
            );
        }
    }

    #[test]
    fn overrides_win_and_are_clamped() {
        let pixels = vec![
            pixel_with_blueness(0, 10),
            pixel_with_blueness(1, 20),
            pixel_with_blueness(2, 30),
        ];
        let overrides: BTreeMap<u8, u32> = [(10u8, 7u32), (20, 99), (30, 0)].into();
        let map = DensityMap::derive(&pixels, &overrides);
        assert_eq!(map.density_for(&pixel_with_blueness(0, 10)), 7);
        assert_eq!(map.density_for(&pixel_with_blueness(0, 20)), 10);
        assert_eq!(map.density_for(&pixel_with_blueness(0, 30)), 1);
    }

    #[test]
    fn unknown_blueness_falls_back_to_one() {
        let pixels = vec![pixel_with_blueness(0, 50), pixel_with_blueness(1, 60)];
        let map = DensityMap::derive(&pixels, &no_overrides());
        assert_eq!(map.density_for(&pixel_with_blueness(0, 200)), 1);
    }
}
