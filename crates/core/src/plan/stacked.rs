use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use spanvas_protocol::{PixelGrid, SpanSpec};
use thiserror::Error;

/// Caption for one color in the stacked graph, as configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackKeyEntry {
    #[serde(rename = "colorKey")]
    pub color_key: String,
    #[serde(rename = "stackGroup")]
    pub stack_group: String,
}

#[derive(Debug, Error)]
pub enum StackOrderError {
    /// Every remaining color sits above some other color in at least one
    /// column, so no bottom-to-top order exists.
    #[error("no stacking order puts {} colors on the ground: {remaining:?}", remaining.len())]
    CyclicColorOrder { remaining: Vec<String> },
}

/// Merge stack-graph attributes into a pool of span specs.
///
/// Each column of the image becomes a stack of per-color heights at that
/// column's `time_delta`. Spans already pooled at the same delta each take
/// one entry off the stack, top first; spans beyond the stack pass through
/// untouched, and leftover stack entries are logged as missing groups.
#[tracing::instrument(skip_all)]
pub fn add_stacked_graph_attributes(
    specs: &mut [SpanSpec],
    pixels: &PixelGrid,
    stack_key: &[StackKeyEntry],
) -> Result<(), StackOrderError> {
    let columns = stack_heights_by_column(pixels);
    let per_column: Vec<Vec<String>> = columns
        .values()
        .map(|stack| stack.iter().map(|(color, _)| color.clone()).collect())
        .collect();
    let order = determine_ordering(&per_column)?;

    let canvas_width = i64::from(pixels.width());
    let mut pool: BTreeMap<i64, Vec<(i64, String)>> = BTreeMap::new();
    for (&x, stack) in &columns {
        let bucket = pool.entry(i64::from(x) - canvas_width).or_default();
        for (color, height) in stack {
            bucket.push((*height, stack_group_label(&order, stack_key, color)));
        }
    }

    for spec in specs.iter_mut() {
        let Some((height, group)) = pool.get_mut(&spec.time_delta).and_then(Vec::pop) else {
            continue;
        };
        spec.attrs.insert("stackHeight".into(), height.into());
        spec.attrs.insert("stackGroup".into(), group.into());
    }

    for (delta, unused) in pool.iter().filter(|(_, bucket)| !bucket.is_empty()) {
        let groups: Vec<&str> = unused.iter().map(|(_, group)| group.as_str()).collect();
        tracing::warn!(
            time_delta = delta,
            count = unused.len(),
            "not enough spans for the stacked graph; missing a {}",
            groups.join(" and a "),
        );
    }
    Ok(())
}

/// Bottom-to-top stack heights per column.
///
/// Within a column each color contributes its tallest reach above the
/// bottom edge; entries are then sorted by reach and differenced so each
/// holds only its own segment's height.
fn stack_heights_by_column(pixels: &PixelGrid) -> BTreeMap<u32, Vec<(String, i64)>> {
    let bottom = i64::from(pixels.height());
    let mut columns: BTreeMap<u32, Vec<(String, i64)>> = BTreeMap::new();
    for pixel in pixels.visible() {
        let key = pixel.color.key();
        let reach = bottom - i64::from(pixel.location.y);
        let stack = columns.entry(pixel.location.x).or_default();
        match stack.iter_mut().find(|(color, _)| *color == key) {
            Some((_, tallest)) => *tallest = (*tallest).max(reach),
            None => stack.push((key, reach)),
        }
    }
    for stack in columns.values_mut() {
        stack.sort_by_key(|entry| entry.1);
        for i in (1..stack.len()).rev() {
            stack[i].1 -= stack[i - 1].1;
        }
    }
    columns
}

/// Resolve one bottom-to-top color order consistent with every column.
///
/// Repeatedly peels off the colors that appear only at ground level in the
/// columns still under consideration. Colors grounded in the same round
/// keep their first-appearance order across columns.
pub fn determine_ordering(columns: &[Vec<String>]) -> Result<Vec<String>, StackOrderError> {
    let mut orderings: Vec<Vec<String>> = columns.to_vec();
    let mut bottom_to_top: Vec<String> = Vec::new();

    loop {
        let remaining = distinct_in_order(&orderings);
        if remaining.is_empty() {
            break;
        }
        let grounded: Vec<String> = remaining
            .iter()
            .filter(|color| only_exists_at_ground_level(&orderings, color))
            .cloned()
            .collect();
        if grounded.is_empty() {
            return Err(StackOrderError::CyclicColorOrder { remaining });
        }
        bottom_to_top.extend(grounded.iter().cloned());
        for ordering in &mut orderings {
            ordering.retain(|color| !grounded.contains(color));
        }
    }
    tracing::debug!(order = ?bottom_to_top, "resolved stacking order");
    Ok(bottom_to_top)
}

fn distinct_in_order(orderings: &[Vec<String>]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for color in orderings.iter().flatten() {
        if !seen.contains(color) {
            seen.push(color.clone());
        }
    }
    seen
}

fn only_exists_at_ground_level(orderings: &[Vec<String>], color: &str) -> bool {
    let mut appears = false;
    for ordering in orderings {
        if let Some(index) = ordering.iter().rposition(|c| c == color) {
            if index != 0 {
                return false;
            }
            appears = true;
        }
    }
    appears
}

fn stack_group_label(order: &[String], stack_key: &[StackKeyEntry], color_key: &str) -> String {
    let name = stack_key
        .iter()
        .find(|entry| entry.color_key == color_key)
        .map_or("something", |entry| entry.stack_group.as_str());
    let index = order.iter().position(|c| c == color_key).unwrap_or(0);
    format!("{} + {}", to_base36(index), name)
}

fn to_base36(mut value: usize) -> String {
    if value == 0 {
        return "0".into();
    }
    let mut digits: Vec<char> = Vec::new();
    while value > 0 {
        digits.push(char::from_digit((value % 36) as u32, 36).unwrap_or('0'));
        value /= 36;
    }
    digits.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use spanvas_protocol::{AttrValue, Color, Pixel};

    const BRICK: Color = Color::opaque(134, 45, 45);
    const LEAF: Color = Color::opaque(45, 134, 45);

    fn keys(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|k| (*k).to_string()).collect()
    }

    #[test]
    fn single_column_keeps_its_own_order() {
        let order = determine_ordering(&[keys(&["a", "b", "c"])]).unwrap();
        assert_eq!(order, keys(&["a", "b", "c"]));
    }

    #[test]
    fn ground_colors_come_out_in_first_appearance_order() {
        let columns = vec![keys(&["a", "b"]), keys(&["a", "c"]), keys(&["c"])];
        let order = determine_ordering(&columns).unwrap();
        assert_eq!(order, keys(&["a", "b", "c"]));
    }

    #[test]
    fn contradictory_columns_are_cyclic() {
        let columns = vec![keys(&["a", "b"]), keys(&["b", "a"])];
        let err = determine_ordering(&columns).unwrap_err();
        let StackOrderError::CyclicColorOrder { remaining } = err;
        assert_eq!(remaining, keys(&["a", "b"]));
    }

    #[test]
    fn base36_digits() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(10), "a");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    fn house_grid() -> PixelGrid {
        // column 1 stacks LEAF above BRICK, column 2 has only LEAF
        let mut grid = PixelGrid::blank(4, 6);
        for y in [4, 5] {
            grid.overwrite(Pixel::new(1, y, BRICK));
        }
        for y in [2, 3] {
            grid.overwrite(Pixel::new(1, y, LEAF));
        }
        grid.overwrite(Pixel::new(2, 1, LEAF));
        grid
    }

    #[test]
    fn heights_are_differences_not_reaches() {
        let mut specs = vec![
            SpanSpec::new(-3),
            SpanSpec::new(-3),
            SpanSpec::new(-2),
            SpanSpec::new(-7),
        ];
        let key = vec![StackKeyEntry {
            color_key: BRICK.key(),
            stack_group: "bricks".into(),
        }];
        add_stacked_graph_attributes(&mut specs, &house_grid(), &key).unwrap();

        // top of the column-1 stack pops first
        assert_eq!(
            specs[0].attrs.get("stackGroup"),
            Some(&AttrValue::Str("1 + something".into()))
        );
        assert_eq!(specs[0].attrs.get("stackHeight"), Some(&AttrValue::Int(2)));
        assert_eq!(
            specs[1].attrs.get("stackGroup"),
            Some(&AttrValue::Str("0 + bricks".into()))
        );
        assert_eq!(specs[1].attrs.get("stackHeight"), Some(&AttrValue::Int(2)));
        assert_eq!(specs[2].attrs.get("stackHeight"), Some(&AttrValue::Int(5)));
        assert!(specs[3].attrs.get("stackGroup").is_none());
    }

    #[test]
    fn surplus_stack_entries_leave_specs_untouched() {
        let mut specs = vec![SpanSpec::new(-3)];
        add_stacked_graph_attributes(&mut specs, &house_grid(), &[]).unwrap();
        assert!(specs[0].attrs.get("stackGroup").is_some());
        assert_eq!(specs.len(), 1);
    }

    #[test]
    fn stack_key_entries_read_from_camel_case() {
        let entry: StackKeyEntry =
            serde_json::from_str(r##"{"colorKey": "#862D2D", "stackGroup": "bricks"}"##).unwrap();
        assert_eq!(entry.color_key, "#862D2D");
        assert_eq!(entry.stack_group, "bricks");
    }
}
