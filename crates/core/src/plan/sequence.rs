use spanvas_protocol::{SpanSpec, TraceSpanSpec};

use crate::plan::waterfall::{self, PictureOutcome, WaterfallError, WaterfallImage};
use crate::shuffle::SeededRandom;
use crate::song::SpanSong;

/// What spans that fit no picture turn into: a point event greeting from
/// wherever it landed.
const LEFTOVER_NAME: &str = "hello there";

/// One waterfall image and how many times it may appear.
#[derive(Debug, Clone)]
pub struct ImageSource {
    pub image: WaterfallImage,
    pub max_count: u32,
}

/// Draw as many pictures as fit, in order, then caption them.
///
/// Pictures are placed one at a time, each drawing from the spans the
/// previous one left behind; the first picture that cannot be placed stops
/// the whole queue. Roots are then shuffled between pictures and nudged
/// apart where they collide, and the song hands out names verse by verse.
/// Spans no picture claimed come back as point events, ahead of the rest.
#[tracing::instrument(skip_all)]
pub fn build_pictures_in_waterfall(
    sources: &[ImageSource],
    spans: Vec<SpanSpec>,
    song: &mut SpanSong,
    rng: &mut SeededRandom,
) -> Result<Vec<TraceSpanSpec>, WaterfallError> {
    let queue: Vec<&WaterfallImage> = sources
        .iter()
        .flat_map(|source| (0..source.max_count).map(move |_| &source.image))
        .collect();

    let mut pictures: Vec<Vec<TraceSpanSpec>> = Vec::new();
    let mut rest = spans;
    for (picture_id, image) in queue.into_iter().enumerate() {
        match waterfall::build_one_picture(std::mem::take(&mut rest), image, picture_id, rng)? {
            PictureOutcome::Placed { image_spans, rest: remaining } => {
                pictures.push(image_spans);
                rest = remaining;
            }
            PictureOutcome::GiveUp { rest: remaining } => {
                rest = remaining;
                tracing::debug!(picture_id, "waterfall is full, skipping remaining pictures");
                break;
            }
        }
    }

    shuffle_roots(rng, &mut pictures);
    increment_roots(&mut pictures);
    let picture_count = pictures.len();
    let named = assign_names(pictures, song);

    tracing::debug!(
        pictures = picture_count,
        leftovers = rest.len(),
        "waterfall assembled"
    );
    let leftovers = rest
        .into_iter()
        .map(|spec| TraceSpanSpec::point_event(spec, LEFTOVER_NAME));
    Ok(leftovers.chain(named).collect())
}

/// Swap root rows between pictures so the pictures don't march across the
/// waterfall in placement order.
fn shuffle_roots(rng: &mut SeededRandom, pictures: &mut [Vec<TraceSpanSpec>]) {
    let mut roots: Vec<TraceSpanSpec> = pictures
        .iter()
        .filter_map(|rows| rows.first().cloned())
        .collect();
    rng.shuffle(&mut roots);
    for (rows, root) in pictures.iter_mut().zip(roots) {
        if let Some(slot) = rows.first_mut() {
            *slot = root;
        }
    }
}

/// Collision state for the right-to-left root walk: the last bucket seen
/// and the increment handed out there.
#[derive(Debug, Default)]
struct SiblingCounter {
    previous_time_delta: Option<i64>,
    counter: u32,
}

impl SiblingCounter {
    /// The increment for the next root at `time_delta`: bumps while the
    /// bucket repeats, resets when it moves on.
    fn mark_next(&mut self, time_delta: i64) -> u32 {
        if self.previous_time_delta == Some(time_delta) {
            self.counter += 1;
        } else {
            self.counter = 0;
        }
        self.previous_time_delta = Some(time_delta);
        self.counter
    }
}

/// Nudge apart roots that share a bucket. Walking right to left, each root
/// colliding with the one before it gets the next increment up.
fn increment_roots(pictures: &mut [Vec<TraceSpanSpec>]) {
    let mut order: Vec<(usize, i64)> = pictures
        .iter()
        .enumerate()
        .filter_map(|(i, rows)| rows.first().map(|root| (i, root.time_delta)))
        .collect();
    order.sort_by_key(|&(_, delta)| std::cmp::Reverse(delta));

    let mut siblings = SiblingCounter::default();
    for (index, delta) in order {
        if let Some(root) = pictures[index].first_mut() {
            root.increment = siblings.mark_next(delta);
        }
    }
}

/// Name every interval span from the song, one verse per picture, left to
/// right. Sparkles keep their silence.
fn assign_names(mut pictures: Vec<Vec<TraceSpanSpec>>, song: &mut SpanSong) -> Vec<TraceSpanSpec> {
    pictures.sort_by_key(|rows| rows.first().map_or(i64::MAX, |root| root.time_delta));
    let mut named = Vec::new();
    for rows in pictures {
        for mut spec in rows {
            if !spec.span_event {
                spec.attrs
                    .insert("app.songLocation".into(), song.where_am_i().into());
                spec.name = song.name_this_span();
            }
            named.push(spec);
        }
        song.next_verse();
    }
    named
}
