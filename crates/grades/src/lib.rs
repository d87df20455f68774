//! Course grade schema
//!
//! Value types exchanged between the browser extension and the grade service:
//! courses, semesters, grade distributions, piecewise grade curves and
//! submitted pages.

pub mod course;
pub mod semester;
pub mod grade;
pub mod segment;
pub mod element;
pub mod page;
pub mod student;
pub mod query;

pub use course::{Course, Id1, Id2};
pub use semester::Semester;
pub use grade::{Dist, Grade};
pub use segment::{segments_from_dist, validate_segments, Segment};
pub use element::{element_id, CourseGrade, GradeElement, GradeInfo};
pub use page::{hash_code, parse_page, Page, ParsedPage, ParsedRow};
pub use student::StudentId;
pub use query::{Query, QueryField, QueryFilter};

use thiserror::Error;

/// Tolerance applied when checking that percentages add up to 100.
pub const SUM_TOLERANCE: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("invalid course id1: {0:?}")]
    Id1(String),

    #[error("invalid course id2: {0:?}")]
    Id2(String),

    #[error("invalid semester: {0}")]
    Semester(String),

    #[error("invalid grade: {0:?}")]
    Grade(String),

    #[error("invalid distribution: {0}")]
    Dist(String),

    #[error("invalid segment: {0}")]
    Segment(String),

    #[error("invalid student id: {0:?}")]
    StudentId(String),

    #[error("unreadable page row: {0}")]
    Row(String),

    #[error("page hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: i32, actual: i64 },
}

pub type Result<T> = std::result::Result<T, SchemaError>;

pub(crate) fn sums_to_hundred(values: impl IntoIterator<Item = f64>) -> bool {
    let total: f64 = values.into_iter().sum();
    (total - 100.0).abs() <= SUM_TOLERANCE
}

pub(crate) fn is_percentage(v: f64) -> bool {
    v.is_finite() && (0.0..=100.0).contains(&v)
}
