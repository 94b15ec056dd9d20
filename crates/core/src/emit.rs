use spanvas_protocol::{AttrMap, EmittedSpan, EmittedSpanEvent, EmittedTrace, TraceSpanSpec};

/// Width of one heatmap bucket. Every `time_delta` step moves a span this
/// many seconds.
pub const GRANULARITY_SECONDS: i64 = 5;

/// Name of the synthesized root span holding the whole drawing.
pub const TRACE_ROOT_NAME: &str = "🎼";

const SPARKLE_EVENT_NAME: &str = "sparkle";
const ROOT_SPAN_ID: u64 = 0;
const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Where a span spec lands on the clock: whole buckets left of `begin`,
/// plus a microsecond per increment to keep same-bucket siblings ordered.
pub fn bucket_time_ns(begin: i64, time_delta: i64, increment: u32) -> i64 {
    (begin + time_delta * GRANULARITY_SECONDS) * NANOS_PER_SECOND + i64::from(increment) * 1000
}

fn plan_end_time_ns(start_ns: i64, waterfall_width: f64) -> i64 {
    start_ns + (waterfall_width * (GRANULARITY_SECONDS * NANOS_PER_SECOND) as f64) as i64
}

/// Run the stack machine over planned specs and materialize the trace.
///
/// Specs are walked in order. Interval specs close the previously open
/// span, pop `pop_before` ancestors, open under whatever remains (the root
/// when nothing does), then pop `pop_after`. Event specs never touch the
/// stack; they attach to the currently open span, the root before any span
/// has opened. The root closes when its last child does.
#[tracing::instrument(skip_all)]
pub fn emit_trace(begin: i64, specs: &[TraceSpanSpec]) -> EmittedTrace {
    let earliest = specs.iter().map(|s| s.time_delta).min().unwrap_or(0);
    let root_start = bucket_time_ns(begin, earliest, 0);

    let mut spans = vec![EmittedSpan {
        id: ROOT_SPAN_ID,
        parent: None,
        name: TRACE_ROOT_NAME.into(),
        start_ns: root_start,
        end_ns: root_start,
        attrs: AttrMap::new(),
    }];
    let mut events: Vec<EmittedSpanEvent> = Vec::new();

    let mut parent_stack: Vec<u64> = Vec::new();
    // indexes into `spans`, with the planned close time
    let mut open: Option<(usize, i64)> = None;
    let mut next_id: u64 = 1;

    for spec in specs {
        let start_ns = bucket_time_ns(begin, spec.time_delta, spec.increment);
        let mut attrs = spec.flat_attributes();
        attrs.insert("begin".into(), begin.into());

        if spec.span_event {
            let span_id = open.map_or(ROOT_SPAN_ID, |(index, _)| spans[index].id);
            events.push(EmittedSpanEvent {
                span_id,
                name: SPARKLE_EVENT_NAME.into(),
                time_ns: start_ns,
                attrs,
            });
            continue;
        }

        if let Some((index, end_ns)) = open.take() {
            spans[index].end_ns = end_ns;
        }
        for _ in 0..spec.pop_before {
            parent_stack.pop();
        }
        let parent = parent_stack.last().copied().unwrap_or(ROOT_SPAN_ID);
        let id = next_id;
        next_id += 1;
        spans.push(EmittedSpan {
            id,
            parent: Some(parent),
            name: spec.name.clone(),
            start_ns,
            end_ns: start_ns,
            attrs,
        });
        parent_stack.push(id);
        for _ in 0..spec.pop_after {
            parent_stack.pop();
        }
        open = Some((spans.len() - 1, plan_end_time_ns(start_ns, spec.waterfall_width)));
    }
    if let Some((index, end_ns)) = open {
        spans[index].end_ns = end_ns;
    }

    let root_end = spans
        .iter()
        .skip(1)
        .map(|s| s.end_ns)
        .max()
        .map_or(root_start, |latest| latest.max(root_start));
    if let Some(root) = spans.first_mut() {
        root.end_ns = root_end;
    }

    EmittedTrace {
        begin,
        spans,
        events,
    }
}
