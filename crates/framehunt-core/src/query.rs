//! Query and filter data model (§3).

use crate::frame_store::FrameId;
use std::collections::BTreeSet;

/// A small, fixed upper bound on temporal query length (§9 Open Questions —
/// no literal value survives from the source; a conservative constant ≥ 2
/// is used).
pub const MAX_TEMPORAL_SIZE: usize = 4;

/// A rectangle in normalised `[0,1]^2` coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    /// Intersection-over-union against another rectangle.
    pub fn iou(&self, other: &Rect) -> f32 {
        let ix0 = self.x.max(other.x);
        let iy0 = self.y.max(other.y);
        let ix1 = (self.x + self.w).min(other.x + other.w);
        let iy1 = (self.y + self.h).min(other.y + other.h);
        let iw = (ix1 - ix0).max(0.0);
        let ih = (iy1 - iy0).max(0.0);
        let intersection = iw * ih;
        let union = self.w * self.h + other.w * other.h - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CanvasPayload {
    Text(String),
    Bitmap { w: u32, h: u32, rgb: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanvasSubquery {
    pub rect: Rect,
    pub payload: CanvasPayload,
}

/// One moment of a temporal query.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TemporalQuery {
    #[default]
    Empty,
    Textual(String),
    Canvas(Vec<CanvasSubquery>),
    Relocation(FrameId),
}

impl TemporalQuery {
    pub fn is_empty(&self) -> bool {
        matches!(self, TemporalQuery::Empty)
    }
}

/// `{weekdays: bitmask[7], hour_range, year_range, dataset_parts}`. A filter
/// is *default* iff it admits every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Filters {
    /// Bit `i` set means weekday `i` is admitted.
    pub weekdays: u8,
    pub hour_from: u8,
    pub hour_to: u8,
    pub year_from: i32,
    pub year_to: i32,
    pub dataset_parts: [bool; 2],
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            weekdays: 0x7F,
            hour_from: 0,
            hour_to: 23,
            year_from: i32::MIN,
            year_to: i32::MAX,
            dataset_parts: [true, true],
        }
    }
}

impl Filters {
    pub fn is_default(&self) -> bool {
        *self == Filters::default()
    }
}

/// A sequence of temporal moments plus session-wide feedback and metadata.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    pub temporal_queries: Vec<TemporalQuery>,
    pub relevance_feedback: BTreeSet<FrameId>,
    pub filters: Filters,
    pub screenshot_path: Option<String>,
    pub label: Option<String>,
    pub is_save: bool,
    /// Which history entry this rescore is branching from, as seen by the
    /// client. `history.len()` (the not-yet-pushed current context) is the
    /// normal case; anything beyond that is a stale/inconsistent client
    /// state and is a silent no-op (`SPEC_FULL.md` B.2).
    pub src_search_ctx_id: usize,
}

impl Query {
    /// Panics if `temporal_queries.len() > MAX_TEMPORAL_SIZE`; this is a
    /// construction-time invariant, enforced at the boundary rather than
    /// deep inside the ranker dispatch.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.temporal_queries.len() > MAX_TEMPORAL_SIZE {
            return Err(crate::error::EngineError::OutOfRange {
                what: "temporal query length",
                value: self.temporal_queries.len() as i64,
            });
        }
        Ok(())
    }
}

/// A lexical entry in the keyword lexicon.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    pub synset_id: u32,
    pub synset_strs: Vec<String>,
}
