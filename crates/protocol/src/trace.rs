use serde::{Deserialize, Serialize};

use crate::spec::AttrMap;

/// A fully materialized trace: the output of running the emission stack
/// machine over a planned span sequence.
///
/// Parent/child links are explicit ids rather than interval containment,
/// because planned children may legitimately start before their parents
/// (the picture geometry decides the times, the stack machine decides the
/// tree). Span id 0 is always the synthesized trace root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmittedTrace {
    /// Epoch-seconds anchor the whole trace hangs off.
    pub begin: i64,
    /// All spans, root first, in emission order.
    pub spans: Vec<EmittedSpan>,
    /// Point annotations attached to spans.
    pub events: Vec<EmittedSpanEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmittedSpan {
    pub id: u64,
    /// `None` only for the trace root.
    pub parent: Option<u64>,
    pub name: String,
    pub start_ns: i64,
    pub end_ns: i64,
    pub attrs: AttrMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmittedSpanEvent {
    /// The span this annotation hangs on.
    pub span_id: u64,
    pub name: String,
    pub time_ns: i64,
    pub attrs: AttrMap,
}

impl EmittedTrace {
    pub fn root(&self) -> Option<&EmittedSpan> {
        self.spans.first()
    }

    pub fn span(&self, id: u64) -> Option<&EmittedSpan> {
        self.spans.iter().find(|s| s.id == id)
    }

    /// Direct children of the given span, in emission order.
    pub fn children(&self, parent: u64) -> Vec<&EmittedSpan> {
        self.spans
            .iter()
            .filter(|s| s.parent == Some(parent))
            .collect()
    }
}
