use std::collections::BTreeMap;

use crate::color::Color;

/// The heatmap renderer's histogram ramp, densest last. Index equals the
/// number of spans stacked on a bucket; index 0 (white) means the bucket is
/// empty and is never assigned by the density mapper.
pub const HISTOGRAM_COLORS: [&str; 11] = [
    "#ffffff",
    "#8ed2b9",
    "#4fb6bd",
    "#3ba2ba",
    "#278fb8",
    "#137fb5",
    "#2769ae",
    "#3758a7",
    "#42439a",
    "#3b287d",
    "#320656",
];

/// The ramp color for a given span density, for previewing what a plan
/// will look like once rendered. `None` outside `0..=10`.
pub fn color_for_density(density: u32) -> Option<Color> {
    HISTOGRAM_COLORS
        .get(density as usize)
        .and_then(|key| Color::from_key(key))
}

/// Blueness-to-density table derived from the ramp itself: paint a source
/// image with exact ramp colors and this table pins each one to its
/// intended density, bypassing the derived quantization.
pub fn density_override_table() -> BTreeMap<u8, u32> {
    HISTOGRAM_COLORS
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(density, key)| {
            Color::from_key(key).map(|color| (color.blueness(), density as u32))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_has_a_color_per_density() {
        for density in 0..=10 {
            assert!(color_for_density(density).is_some(), "density {density}");
        }
        assert!(color_for_density(11).is_none());
    }

    #[test]
    fn ramp_starts_white() {
        assert_eq!(color_for_density(0), Some(Color::WHITE));
    }

    #[test]
    fn override_table_maps_each_ramp_blueness() {
        let table = density_override_table();
        assert_eq!(table.len(), 10);
        // densest ramp entry: #320656 has blue 0x56 = 86, blueness 169
        assert_eq!(table.get(&169), Some(&10));
        // lightest non-white entry: #8ed2b9 has blue 0xb9 = 185, blueness 70
        assert_eq!(table.get(&70), Some(&1));
    }
}
