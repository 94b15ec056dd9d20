use std::collections::BTreeMap;

use spanvas_protocol::{AttrMap, Pixel, PixelGrid, SpanSpec, TraceSpanSpec};
use thiserror::Error;

use crate::shuffle::SeededRandom;

/// One row of a waterfall image: a span to draw, or a sparkle on it.
///
/// `width` is zero for sparkles and for the synthesized root row.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterfallRow {
    pub start: u32,
    pub width: u32,
    pub sparkle: bool,
    pub color_key: String,
}

/// A waterfall image reduced to drawable rows.
#[derive(Debug, Clone)]
pub struct WaterfallImage {
    pub name: String,
    pub rows: Vec<WaterfallRow>,
}

impl WaterfallImage {
    /// Read the drawable rows out of a picture.
    ///
    /// Each row's span is its first contiguous run of blue; rows with no
    /// blue at all are dropped, sparkles on them included. Red pixels
    /// anywhere on a kept row become sparkle rows right after it. A root
    /// row at the far left is invented so the picture has a top span.
    pub fn from_pixels(name: &str, pixels: &PixelGrid) -> Self {
        let mut rows = vec![WaterfallRow {
            start: 0,
            width: 0,
            sparkle: false,
            color_key: "none".into(),
        }];
        for y in 0..pixels.height() {
            let Some(start) = (0..pixels.width()).find(|&x| draws_the_span(&pixels.at(x, y)))
            else {
                continue;
            };
            let width = (start..pixels.width())
                .take_while(|&x| draws_the_span(&pixels.at(x, y)))
                .count() as u32;
            rows.push(WaterfallRow {
                start,
                width,
                sparkle: false,
                color_key: pixels.at(start, y).color.key(),
            });
            for x in 0..pixels.width() {
                let pixel = pixels.at(x, y);
                if pixel.color.has_red() && pixel.color.is_visible() {
                    rows.push(WaterfallRow {
                        start: x,
                        width: 0,
                        sparkle: true,
                        color_key: pixel.color.key(),
                    });
                }
            }
        }
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Horizontal extent in pixels, sparkles included.
    pub fn width(&self) -> u32 {
        self.rows
            .iter()
            .map(|row| row.start + row.width)
            .max()
            .unwrap_or(0)
    }
}

fn draws_the_span(pixel: &Pixel) -> bool {
    pixel.color.has_blue() && pixel.color.is_visible()
}

#[derive(Debug, Error)]
pub enum WaterfallError {
    /// The projected picture would start past the pool's right edge.
    #[error("shift {shift} exceeds the {timeline_width}-bucket timeline")]
    ShiftTooLarge { shift: i64, timeline_width: i64 },
}

/// Result of trying to place one picture into the span pool.
#[derive(Debug)]
pub enum PictureOutcome {
    Placed {
        image_spans: Vec<TraceSpanSpec>,
        rest: Vec<SpanSpec>,
    },
    /// Nothing fit at any shift. `rest` is the untouched pool.
    GiveUp { rest: Vec<SpanSpec> },
}

/// Try to draw one picture out of the pooled spans.
///
/// Shifts from the pool's left edge are tried in shuffled order until the
/// whole picture allocates; each row, sparkles and the root included,
/// consumes one pooled span at its projected `time_delta`. The first shift
/// where every row finds a span wins.
#[tracing::instrument(skip(spans, image, rng))]
pub fn build_one_picture(
    spans: Vec<SpanSpec>,
    image: &WaterfallImage,
    picture_id: usize,
    rng: &mut SeededRandom,
) -> Result<PictureOutcome, WaterfallError> {
    let Some(max_shift) = max_shift_that_might_fit(&spans, image.width()) else {
        return Ok(PictureOutcome::GiveUp { rest: spans });
    };
    let mut shifts: Vec<i64> = (0..=max_shift).collect();
    rng.shuffle(&mut shifts);

    for shift in shifts {
        match find_a_spot(&spans, image, shift)? {
            ShiftOutcome::Placed { placed, rest } => {
                let mut image_spans = determine_tree_structure(placed);
                for (i, spec) in image_spans.iter_mut().enumerate() {
                    spec.attrs
                        .insert("waterfallImageName".into(), image.name.clone().into());
                    spec.attrs
                        .insert("waterfallPictureID".into(), (picture_id as i64).into());
                    spec.attrs.insert(
                        "waterfallPosition".into(),
                        format!("Line {i} in Picture {picture_id}").into(),
                    );
                }
                tracing::debug!(shift, rows = image_spans.len(), "placed picture");
                return Ok(PictureOutcome::Placed { image_spans, rest });
            }
            ShiftOutcome::NotEnoughRoom => {}
        }
    }
    tracing::debug!("no shift fits this picture");
    Ok(PictureOutcome::GiveUp { rest: spans })
}

/// The rightmost shift at which the picture could still end on the pool's
/// right edge. Negative when the picture is wider than the pool's spread;
/// `None` when the pool is empty.
fn max_shift_that_might_fit(spans: &[SpanSpec], image_width: u32) -> Option<i64> {
    let (min, max) = time_delta_bounds(spans)?;
    Some(max - i64::from(image_width) - min)
}

fn time_delta_bounds(spans: &[SpanSpec]) -> Option<(i64, i64)> {
    let min = spans.iter().map(|s| s.time_delta).min()?;
    let max = spans.iter().map(|s| s.time_delta).max()?;
    Some((min, max))
}

/// Maps image-space pixel coordinates onto the pool's `time_delta` axis.
struct Projection {
    pixel_width: i64,
    min_time_delta: i64,
    shift: i64,
}

impl Projection {
    fn derive(
        min_time_delta: i64,
        max_time_delta: i64,
        image_width: u32,
        shift: i64,
    ) -> Result<Self, WaterfallError> {
        let timeline_width = max_time_delta - min_time_delta;
        if min_time_delta + shift > max_time_delta {
            return Err(WaterfallError::ShiftTooLarge {
                shift,
                timeline_width,
            });
        }
        // scale to 60% of the timeline so the picture reads as a picture
        let pixel_width = if image_width == 0 {
            0
        } else {
            (timeline_width as f64 / f64::from(image_width) * 0.6).floor() as i64
        };
        Ok(Self {
            pixel_width,
            min_time_delta,
            shift,
        })
    }

    fn time_delta(&self, start: u32) -> i64 {
        i64::from(start) * self.pixel_width + self.min_time_delta + self.shift
    }

    fn width(&self, width: u32) -> f64 {
        (i64::from(width) * self.pixel_width) as f64
    }
}

/// A row that has claimed a pooled span, before tree structure is known.
struct PlacedRow {
    time_delta: i64,
    waterfall_width: f64,
    span_event: bool,
    attrs: AttrMap,
}

enum ShiftOutcome {
    Placed {
        placed: Vec<PlacedRow>,
        rest: Vec<SpanSpec>,
    },
    NotEnoughRoom,
}

fn find_a_spot(
    spans: &[SpanSpec],
    image: &WaterfallImage,
    shift: i64,
) -> Result<ShiftOutcome, WaterfallError> {
    let Some((min, max)) = time_delta_bounds(spans) else {
        return Ok(ShiftOutcome::NotEnoughRoom);
    };
    let projection = Projection::derive(min, max, image.width(), shift)?;

    let mut pool = group_by_time_delta(spans.to_vec());
    let mut placed = Vec::with_capacity(image.rows.len());
    for (i, row) in image.rows.iter().enumerate() {
        let time_delta = projection.time_delta(row.start);
        let Some(span) = pool.get_mut(&time_delta).and_then(Vec::pop) else {
            return Ok(ShiftOutcome::NotEnoughRoom);
        };
        let mut attrs = span.attrs;
        attrs.insert("rowColor".into(), row.color_key.clone().into());
        attrs.insert("waterfallSpec".into(), waterfall_spec_json(i, row).into());
        placed.push(PlacedRow {
            time_delta,
            waterfall_width: projection.width(row.width),
            span_event: row.sparkle,
            attrs,
        });
    }
    let rest = pool.into_values().flatten().collect();
    Ok(ShiftOutcome::Placed { placed, rest })
}

fn group_by_time_delta(spans: Vec<SpanSpec>) -> BTreeMap<i64, Vec<SpanSpec>> {
    let mut buckets: BTreeMap<i64, Vec<SpanSpec>> = BTreeMap::new();
    for span in spans {
        buckets.entry(span.time_delta).or_default().push(span);
    }
    buckets
}

fn waterfall_spec_json(row_index: usize, row: &WaterfallRow) -> String {
    serde_json::json!({
        "row": row_index,
        "imageRoot": row_index == 0,
        "start": row.start,
        "width": row.width,
        "sparkle": row.sparkle,
        "colorKey": row.color_key,
    })
    .to_string()
}

/// Derive pop and increment counts that rebuild the image's span tree.
///
/// Rows arrive top to bottom. A row becomes a child of the nearest row
/// above it that starts strictly earlier; rows it passes on the way up are
/// closed before it opens (`pop_before`) and hand it a bumped `increment`
/// so same-bucket siblings stay ordered. The root row is never popped, and
/// the last interval row closes whatever is still open (`pop_after`).
fn determine_tree_structure(rows: Vec<PlacedRow>) -> Vec<TraceSpanSpec> {
    // (time_delta, increment) of open ancestors, innermost last
    let mut ancestors: Vec<(i64, u32)> = Vec::new();
    let mut specs: Vec<TraceSpanSpec> = Vec::with_capacity(rows.len());
    for (i, row) in rows.into_iter().enumerate() {
        if row.span_event && i > 0 {
            specs.push(TraceSpanSpec {
                name: String::new(),
                time_delta: row.time_delta,
                increment: 0,
                waterfall_width: row.waterfall_width,
                pop_before: 1,
                pop_after: 0,
                span_event: true,
                attrs: row.attrs,
            });
            continue;
        }
        let mut pop_before = 0;
        let mut increment = 0;
        if i == 0 {
            pop_before = 1;
        } else {
            while let Some(&(ancestor_delta, ancestor_increment)) = ancestors.last() {
                if ancestor_delta > row.time_delta || ancestors.len() <= 1 {
                    break;
                }
                increment = ancestor_increment + 1;
                pop_before += 1;
                ancestors.pop();
            }
        }
        ancestors.push((row.time_delta, increment));
        specs.push(TraceSpanSpec {
            name: String::new(),
            time_delta: row.time_delta,
            increment,
            waterfall_width: row.waterfall_width,
            pop_before,
            pop_after: 0,
            span_event: false,
            attrs: row.attrs,
        });
    }
    if let Some(last) = specs.iter_mut().rev().find(|s| !s.span_event) {
        last.pop_after = ancestors.len() as u32;
    }
    specs
}

#[cfg(test)]
mod tests {
    use super::*;
    use spanvas_protocol::{AttrValue, Color};

    const INK: Color = Color::opaque(0, 0, 180);
    const SPARK: Color = Color::opaque(200, 0, 0);

    fn row(time_delta: i64, span_event: bool) -> PlacedRow {
        PlacedRow {
            time_delta,
            waterfall_width: 1.0,
            span_event,
            attrs: AttrMap::new(),
        }
    }

    fn pool(deltas: &[i64]) -> Vec<SpanSpec> {
        deltas.iter().map(|&d| SpanSpec::new(d)).collect()
    }

    #[test]
    fn image_rows_read_blue_runs_and_skip_blank_rows() {
        let mut pixels = PixelGrid::blank(6, 4);
        for x in 2..5 {
            pixels.overwrite(Pixel::new(x, 1, INK));
        }
        pixels.overwrite(Pixel::new(0, 3, INK));
        let image = WaterfallImage::from_pixels("stairs", &pixels);

        assert_eq!(image.rows.len(), 3);
        assert_eq!(image.rows[0].color_key, "none");
        assert_eq!((image.rows[1].start, image.rows[1].width), (2, 3));
        assert_eq!(image.rows[1].color_key, INK.key());
        assert_eq!((image.rows[2].start, image.rows[2].width), (0, 1));
    }

    #[test]
    fn sparkles_follow_their_row_and_rows_without_blue_lose_theirs() {
        let mut pixels = PixelGrid::blank(6, 3);
        pixels.overwrite(Pixel::new(1, 0, INK));
        pixels.overwrite(Pixel::new(4, 0, SPARK));
        // a sparkle on a row with no blue never makes it in
        pixels.overwrite(Pixel::new(2, 2, SPARK));
        let image = WaterfallImage::from_pixels("lonely", &pixels);

        assert_eq!(image.rows.len(), 3);
        assert!(image.rows[2].sparkle);
        assert_eq!((image.rows[2].start, image.rows[2].width), (4, 0));
        assert_eq!(image.rows[2].color_key, SPARK.key());
    }

    #[test]
    fn image_width_counts_sparkles() {
        let mut pixels = PixelGrid::blank(8, 2);
        pixels.overwrite(Pixel::new(1, 0, INK));
        pixels.overwrite(Pixel::new(6, 0, SPARK));
        let image = WaterfallImage::from_pixels("wide", &pixels);
        assert_eq!(image.width(), 6);
    }

    #[test]
    fn rows_further_left_nest_under_rows_above() {
        let specs = determine_tree_structure(vec![row(-5, false), row(-8, false), row(-6, false)]);

        assert_eq!((specs[0].pop_before, specs[0].increment), (1, 0));
        assert_eq!((specs[1].pop_before, specs[1].increment), (0, 0));
        // the middle row closes before the third opens, bumping its increment
        assert_eq!((specs[2].pop_before, specs[2].increment), (1, 1));
        assert_eq!(specs[2].pop_after, 2);
    }

    #[test]
    fn the_root_is_never_popped() {
        let specs = determine_tree_structure(vec![row(-9, false), row(-3, false), row(-2, false)]);
        // both rows sit right of the root but only pop each other
        assert_eq!(specs[1].pop_before, 0);
        assert_eq!(specs[2].pop_before, 1);
        assert_eq!(specs[2].pop_after, 2);
    }

    #[test]
    fn sparkle_rows_bypass_the_ancestor_stack() {
        let specs = determine_tree_structure(vec![
            row(-5, false),
            row(-8, false),
            row(-8, true),
            row(-6, false),
        ]);

        assert!(specs[2].span_event);
        assert_eq!((specs[2].pop_before, specs[2].pop_after), (1, 0));
        // the sparkle did not disturb the nesting of the row after it
        assert_eq!((specs[3].pop_before, specs[3].increment), (1, 1));
        assert_eq!(specs[3].pop_after, 2);
        assert_eq!(specs[2].pop_after, 0);
    }

    fn two_row_image() -> WaterfallImage {
        let mut pixels = PixelGrid::blank(3, 2);
        pixels.overwrite(Pixel::new(0, 0, INK));
        for x in 0..2 {
            pixels.overwrite(Pixel::new(x, 1, INK));
        }
        WaterfallImage::from_pixels("two rows", &pixels)
    }

    #[test]
    fn placing_conserves_spans_and_tags_rows() {
        // three spans at every shifted landing spot, so any shift fits
        let mut deltas: Vec<i64> = Vec::new();
        for delta in -10..=-2 {
            deltas.extend([delta; 3]);
        }
        deltas.push(0);
        let spans = pool(&deltas);
        let total = spans.len();

        let mut rng = SeededRandom::new(77);
        let outcome = build_one_picture(spans, &two_row_image(), 0, &mut rng).unwrap();
        let PictureOutcome::Placed { image_spans, rest } = outcome else {
            panic!("expected a placement");
        };

        assert_eq!(image_spans.len(), 3);
        assert_eq!(image_spans.len() + rest.len(), total);
        assert_eq!(
            image_spans[0].attrs.get("waterfallPosition"),
            Some(&AttrValue::Str("Line 0 in Picture 0".into()))
        );
        assert!(image_spans
            .iter()
            .all(|s| s.attrs.get("waterfallSpec").is_some()));
        assert!(image_spans
            .iter()
            .all(|s| s.attrs.get("waterfallImageName")
                == Some(&AttrValue::Str("two rows".into()))));
    }

    #[test]
    fn same_seed_places_the_same_way() {
        let deltas: Vec<i64> = (-12..=0).flat_map(|d| [d, d, d]).collect();
        let run = |seed: u64| {
            let mut rng = SeededRandom::new(seed);
            build_one_picture(pool(&deltas), &two_row_image(), 0, &mut rng).unwrap()
        };
        let (a, b) = (run(99), run(99));
        let (PictureOutcome::Placed { image_spans: sa, rest: ra },
             PictureOutcome::Placed { image_spans: sb, rest: rb }) = (a, b)
        else {
            panic!("expected placements");
        };
        assert_eq!(sa, sb);
        assert_eq!(ra, rb);
    }

    #[test]
    fn a_picture_too_wide_for_the_pool_gives_up_untouched() {
        let spans = pool(&[-1, -1, -1, -1]);
        let mut rng = SeededRandom::new(5);
        let outcome = build_one_picture(spans.clone(), &two_row_image(), 0, &mut rng).unwrap();
        let PictureOutcome::GiveUp { rest } = outcome else {
            panic!("expected a give-up");
        };
        assert_eq!(rest, spans);
    }

    #[test]
    fn an_empty_pool_gives_up() {
        let mut rng = SeededRandom::new(5);
        let outcome = build_one_picture(Vec::new(), &two_row_image(), 0, &mut rng).unwrap();
        assert!(matches!(outcome, PictureOutcome::GiveUp { rest } if rest.is_empty()));
    }
}
