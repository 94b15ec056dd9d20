pub mod color;
pub mod palette;
pub mod pixel;
pub mod spec;
pub mod trace;

pub use color::Color;
pub use pixel::{Location, Pixel, PixelGrid};
pub use spec::{AttrMap, AttrValue, SpanSpec, TraceSpanSpec};
pub use trace::{EmittedSpan, EmittedSpanEvent, EmittedTrace};
