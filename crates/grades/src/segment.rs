use serde::{Deserialize, Serialize};

use crate::grade::{Dist, Grade};
use crate::{is_percentage, sums_to_hundred, Result, SchemaError};

/// Share of students (`value`, percent) whose grade index falls in `l..=r`.
///
/// `l == r` covers exactly one grade.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSegment")]
pub struct Segment {
    l: u8,
    r: u8,
    value: f64,
}

#[derive(Deserialize)]
struct RawSegment {
    l: u8,
    r: u8,
    value: f64,
}

impl TryFrom<RawSegment> for Segment {
    type Error = SchemaError;
    fn try_from(raw: RawSegment) -> Result<Self> {
        Segment::new(raw.l, raw.r, raw.value)
    }
}

impl Segment {
    pub fn new(l: u8, r: u8, value: f64) -> Result<Self> {
        if r > Grade::MAX_INDEX {
            return Err(SchemaError::Segment(format!("r = {r} exceeds {}", Grade::MAX_INDEX)));
        }
        if l > r {
            return Err(SchemaError::Segment(format!("l = {l} > r = {r}")));
        }
        if !is_percentage(value) {
            return Err(SchemaError::Segment(format!("value {value} is not a percentage")));
        }
        Ok(Self { l, r, value })
    }

    pub fn l(&self) -> u8 {
        self.l
    }

    pub fn r(&self) -> u8 {
        self.r
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Number of grades covered.
    pub fn len(&self) -> u8 {
        self.r.saturating_sub(self.l) + 1
    }

    pub fn contains(&self, grade: Grade) -> bool {
        (self.l..=self.r).contains(&grade.index())
    }
}

/// Segments must be non-empty, contiguous and sum (nearly) to 100.
pub fn validate_segments(segments: &[Segment]) -> Result<()> {
    if segments.is_empty() {
        return Err(SchemaError::Segment("no segments".into()));
    }
    for pair in segments.windows(2) {
        if pair[0].r.checked_add(1) != Some(pair[1].l) {
            return Err(SchemaError::Segment(format!(
                "gap or overlap between [{}, {}] and [{}, {}]",
                pair[0].l, pair[0].r, pair[1].l, pair[1].r
            )));
        }
    }
    if !sums_to_hundred(segments.iter().map(|s| s.value)) {
        return Err(SchemaError::Segment("values do not sum to 100".into()));
    }
    Ok(())
}

/// Piecewise curve for a single student's view: everything below `grade`,
/// `grade` itself, everything above.
pub fn segments_from_dist(grade: Grade, dist: &Dist) -> Vec<Segment> {
    let g = grade.index();
    let mut same = dist.same();
    let mut out = Vec::with_capacity(3);

    if g > 0 {
        out.push(Segment { l: 0, r: g - 1, value: dist.lower() });
    } else {
        same += dist.lower();
    }

    let higher = if g < Grade::MAX_INDEX {
        Some(Segment { l: g + 1, r: Grade::MAX_INDEX, value: dist.higher() })
    } else {
        same += dist.higher();
        None
    };

    out.push(Segment { l: g, r: g, value: same });
    out.extend(higher);
    out
}
