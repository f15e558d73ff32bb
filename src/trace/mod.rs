use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;

mod id;
pub use id::{SegmentId, TraceId};

fn now_epoch_secs() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1e6
}

/// One unit of recorded work. Created open via [`Segment::begin`], closed
/// with [`Segment::end`], then handed to the emitter as a single JSON
/// document. Times are epoch seconds with sub-second precision.
#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    pub name: String,
    pub id: SegmentId,
    pub trace_id: TraceId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<SegmentId>,
    pub start_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub in_progress: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, serde_json::Value>,
}

impl Segment {
    /// Opens a root segment under a fresh trace id.
    pub fn begin(name: impl Into<String>) -> Self {
        Self::begin_in(name, TraceId::generate())
    }

    /// Opens a root segment joining an existing trace, for work continuing a
    /// trace started elsewhere.
    pub fn begin_in(name: impl Into<String>, trace_id: TraceId) -> Self {
        Self {
            name: name.into(),
            id: SegmentId::generate(),
            trace_id,
            parent_id: None,
            start_time: now_epoch_secs(),
            end_time: None,
            in_progress: true,
            annotations: BTreeMap::new(),
        }
    }

    /// Opens a child segment sharing this segment's trace id.
    pub fn subsegment(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: SegmentId::generate(),
            trace_id: self.trace_id,
            parent_id: Some(self.id),
            start_time: now_epoch_secs(),
            end_time: None,
            in_progress: true,
            annotations: BTreeMap::new(),
        }
    }

    pub fn annotate(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.annotations.insert(key.into(), value.into());
    }

    /// Closes the segment. Further calls keep the first end time.
    pub fn end(&mut self) {
        if self.in_progress {
            self.end_time = Some(now_epoch_secs());
            self.in_progress = false;
        }
    }

    /// Seconds between start and end; `None` while still open.
    pub fn duration(&self) -> Option<f64> {
        self.end_time.map(|end| end - self.start_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_and_end() {
        let mut seg = Segment::begin("handler");
        assert!(seg.in_progress);
        assert!(seg.end_time.is_none());
        assert!(seg.duration().is_none());

        seg.end();
        assert!(!seg.in_progress);
        let d = seg.duration().unwrap();
        assert!(d >= 0.0);

        let first_end = seg.end_time;
        seg.end();
        assert_eq!(seg.end_time, first_end);
    }

    #[test]
    fn test_begin_in_joins_existing_trace() {
        let trace_id = TraceId::generate();
        let seg = Segment::begin_in("downstream", trace_id);
        assert_eq!(seg.trace_id, trace_id);
        assert!(seg.parent_id.is_none());
    }

    #[test]
    fn test_subsegment_shares_trace() {
        let root = Segment::begin("root");
        let child = root.subsegment("db-query");
        assert_eq!(child.trace_id, root.trace_id);
        assert_eq!(child.parent_id, Some(root.id));
        assert_ne!(child.id, root.id);
    }

    #[test]
    fn test_wire_json_stays_minimal() {
        let seg = Segment::begin("probe");
        let val = serde_json::to_value(&seg).unwrap();
        let obj = val.as_object().unwrap();
        // Open segment: no end_time, no empty annotation map on the wire.
        assert!(obj.contains_key("in_progress"));
        assert!(!obj.contains_key("end_time"));
        assert!(!obj.contains_key("annotations"));
        assert!(!obj.contains_key("parent_id"));
    }

    #[test]
    fn test_closed_segment_json() {
        let mut seg = Segment::begin("probe");
        seg.annotate("status", 200);
        seg.annotate("route", "/health");
        seg.end();

        let val = serde_json::to_value(&seg).unwrap();
        let obj = val.as_object().unwrap();
        assert!(!obj.contains_key("in_progress"));
        assert!(obj.contains_key("end_time"));
        assert_eq!(obj["annotations"]["status"], 200);
        assert_eq!(obj["annotations"]["route"], "/health");
    }
}
