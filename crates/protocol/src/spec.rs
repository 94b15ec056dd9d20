use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A scalar span-attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// Attribute name to scalar value. Ordered so serialized output is stable.
pub type AttrMap = BTreeMap<String, AttrValue>;

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for AttrValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// A pooled span record, not yet placed in any picture.
///
/// `time_delta` is the horizontal position as a non-positive number of
/// buckets left of the canvas's right edge. Identity is positional: pools
/// are drained by `time_delta`, last in first out, so two specs at the same
/// delta are interchangeable as far as placement goes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanSpec {
    pub time_delta: i64,
    #[serde(flatten)]
    pub attrs: AttrMap,
}

impl SpanSpec {
    pub fn new(time_delta: i64) -> Self {
        Self {
            time_delta,
            attrs: AttrMap::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }
}

/// A placed span record, carrying everything the emission stack machine
/// needs to open and close it at the right spot in the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceSpanSpec {
    /// Display name. Empty until the sequencer assigns captions.
    pub name: String,
    pub time_delta: i64,
    /// Disambiguates spans sharing a `time_delta`: each increment shifts the
    /// start by one microsecond inside the bucket.
    pub increment: u32,
    /// Span length as a multiple of the bucket granularity.
    #[serde(rename = "waterfallWidth")]
    pub waterfall_width: f64,
    /// How many open ancestors to close before opening this span.
    #[serde(rename = "popBefore")]
    pub pop_before: u32,
    /// Trailing closes after this span opens; non-zero only on the last
    /// interval row of a picture.
    #[serde(rename = "popAfter")]
    pub pop_after: u32,
    /// True for zero-duration point markers attached to the open span.
    #[serde(rename = "spanEvent")]
    pub span_event: bool,
    #[serde(flatten)]
    pub attrs: AttrMap,
}

impl TraceSpanSpec {
    /// The shape given to spans that did not land in any picture: a point
    /// event hanging directly off the trace root.
    pub fn point_event(spec: SpanSpec, name: &str) -> Self {
        Self {
            name: name.to_string(),
            time_delta: spec.time_delta,
            increment: 1,
            waterfall_width: 1.0,
            pop_before: 1,
            pop_after: 0,
            span_event: true,
            attrs: spec.attrs,
        }
    }

    /// Every field of this spec as span attributes, the carried attributes
    /// included, keyed the way downstream trace tooling expects.
    pub fn flat_attributes(&self) -> AttrMap {
        let mut attrs = self.attrs.clone();
        attrs.insert("name".into(), AttrValue::from(self.name.clone()));
        attrs.insert("time_delta".into(), AttrValue::from(self.time_delta));
        attrs.insert("increment".into(), AttrValue::from(self.increment));
        attrs.insert("waterfallWidth".into(), AttrValue::from(self.waterfall_width));
        attrs.insert("popBefore".into(), AttrValue::from(self.pop_before));
        attrs.insert("popAfter".into(), AttrValue::from(self.pop_after));
        attrs.insert("spanEvent".into(), AttrValue::from(self.span_event));
        attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attr_values_serialize_as_bare_scalars() {
        let spec = SpanSpec::new(-12)
            .with_attr("height", 31.51)
            .with_attr("spans_at_once", 3u32)
            .with_attr("rowColor", "#0000FF")
            .with_attr("flag", true);
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "time_delta": -12,
                "height": 31.51,
                "spans_at_once": 3,
                "rowColor": "#0000FF",
                "flag": true,
            })
        );
    }

    #[test]
    fn span_spec_round_trips_through_json() {
        let spec = SpanSpec::new(-3).with_attr("x", 7u32);
        let json = serde_json::to_string(&spec).unwrap();
        let back: SpanSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }

    #[test]
    fn point_event_shape() {
        let spec = SpanSpec::new(-40).with_attr("x", 2u32);
        let placed = TraceSpanSpec::point_event(spec, "hello there");
        assert_eq!(placed.name, "hello there");
        assert_eq!(placed.time_delta, -40);
        assert_eq!(placed.increment, 1);
        assert_eq!(placed.waterfall_width, 1.0);
        assert_eq!(placed.pop_before, 1);
        assert_eq!(placed.pop_after, 0);
        assert!(placed.span_event);
        assert_eq!(placed.attrs.get("x"), Some(&AttrValue::Int(2)));
    }

    #[test]
    fn flat_attributes_merge_structure_over_carried_attrs() {
        let mut spec = TraceSpanSpec::point_event(SpanSpec::new(-5), "dot");
        spec.attrs.insert("height".into(), AttrValue::from(12.01));
        let attrs = spec.flat_attributes();
        assert_eq!(attrs.get("name"), Some(&AttrValue::Str("dot".into())));
        assert_eq!(attrs.get("time_delta"), Some(&AttrValue::Int(-5)));
        assert_eq!(attrs.get("popBefore"), Some(&AttrValue::Int(1)));
        assert_eq!(attrs.get("spanEvent"), Some(&AttrValue::Bool(true)));
        assert_eq!(attrs.get("height"), Some(&AttrValue::Float(12.01)));
    }
}
