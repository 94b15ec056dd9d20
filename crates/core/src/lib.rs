pub mod emit;
pub mod plan;
pub mod shuffle;
pub mod song;

pub use emit::{GRANULARITY_SECONDS, TRACE_ROOT_NAME, bucket_time_ns, emit_trace};
pub use plan::{PlanConfig, PlanError, plan_spans};
pub use shuffle::SeededRandom;
pub use song::SpanSong;
