use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::course::{Course, Id1};
use crate::grade::{Dist, Grade};
use crate::segment::{segments_from_dist, validate_segments, Segment};
use crate::semester::Semester;
use crate::{Result, SchemaError};

/// Length of a grade element id in hex characters.
pub const ELEMENT_ID_LEN: usize = 16;

/// Deterministic id for the (course, class, semester) slot a grade element
/// occupies. Segments do not take part, so resubmissions land on the same id.
pub fn element_id(course_id1: &Id1, class_id: Option<&str>, semester: Semester) -> String {
    let class = match class_id {
        Some(c) => format!("'{c}'"),
        None => "None".to_string(),
    };
    let key = format!("('{}', {}, '{}')", course_id1, class, semester);
    let digest = Sha256::digest(key.as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(ELEMENT_ID_LEN);
    id
}

/// Grade summary extracted from one row of a submitted page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradeInfo {
    pub course_id1: Id1,
    pub semester: Semester,
    #[serde(default)]
    pub lecturer: Option<String>,
    #[serde(default)]
    pub class_id: Option<String>,
    pub grade: Grade,
    pub dist: Dist,
}

/// Stored grade curve for a (course, class, semester), served to clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGradeElement")]
pub struct GradeElement {
    pub course_id1: Id1,
    pub semester: Semester,
    pub lecturer: Option<String>,
    pub class_id: Option<String>,
    pub segments: Vec<Segment>,
    pub id: String,
}

// Incoming ids are ignored and recomputed.
#[derive(Deserialize)]
struct RawGradeElement {
    course_id1: Id1,
    semester: Semester,
    #[serde(default)]
    lecturer: Option<String>,
    #[serde(default)]
    class_id: Option<String>,
    segments: Vec<Segment>,
}

impl TryFrom<RawGradeElement> for GradeElement {
    type Error = SchemaError;
    fn try_from(raw: RawGradeElement) -> Result<Self> {
        GradeElement::new(raw.course_id1, raw.semester, raw.lecturer, raw.class_id, raw.segments)
    }
}

impl GradeElement {
    pub fn new(
        course_id1: Id1,
        semester: Semester,
        lecturer: Option<String>,
        class_id: Option<String>,
        segments: Vec<Segment>,
    ) -> Result<Self> {
        validate_segments(&segments)?;
        let id = element_id(&course_id1, class_id.as_deref(), semester);
        Ok(Self { course_id1, semester, lecturer, class_id, segments, id })
    }

    pub fn from_info(info: &GradeInfo) -> Result<Self> {
        Self::new(
            info.course_id1.clone(),
            info.semester,
            info.lecturer.clone(),
            info.class_id.clone(),
            segments_from_dist(info.grade, &info.dist),
        )
    }
}

/// Response for a course query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CourseGrade {
    pub course: Course,
    pub grade_eles: Vec<GradeElement>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id1() -> Id1 {
        Id1::parse("CSIE1212").unwrap()
    }

    fn sem() -> Semester {
        "110-2".parse().unwrap()
    }

    #[test]
    fn id_is_stable_and_sixteen_hex() {
        let a = element_id(&id1(), Some("01"), sem());
        let b = element_id(&id1(), Some("01"), sem());
        assert_eq!(a, b);
        assert_eq!(a.len(), ELEMENT_ID_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, element_id(&id1(), None, sem()));
        assert_ne!(a, element_id(&id1(), Some("02"), sem()));
    }

    #[test]
    fn id_matches_known_digest_prefix() {
        let key = "('CSIE1212', '01', '110-2')";
        let expected = &hex::encode(Sha256::digest(key.as_bytes()))[..ELEMENT_ID_LEN];
        assert_eq!(element_id(&id1(), Some("01"), sem()), expected);
    }

    #[test]
    fn decode_recomputes_id_and_validates_segments() {
        let json = r#"{
            "course_id1": "CSIE1212",
            "semester": "110-2",
            "lecturer": "Lin",
            "class_id": "01",
            "segments": [{"l": 0, "r": 8, "value": 91}, {"l": 9, "r": 9, "value": 9}],
            "id": -1
        }"#;
        let e: GradeElement = serde_json::from_str(json).unwrap();
        assert_eq!(e.id, element_id(&id1(), Some("01"), sem()));

        let bad = json.replace(r#""value": 9}"#, r#""value": 50}"#);
        assert!(serde_json::from_str::<GradeElement>(&bad).is_err());
    }

    #[test]
    fn from_info_builds_valid_curve() {
        let info = GradeInfo {
            course_id1: id1(),
            semester: sem(),
            lecturer: None,
            class_id: Some("01".into()),
            grade: Grade::AMinus,
            dist: Dist::new([70.0, 10.0, 20.0]).unwrap(),
        };
        let e = GradeElement::from_info(&info).unwrap();
        assert_eq!(e.segments.len(), 3);
        assert_eq!(e.id, element_id(&info.course_id1, Some("01"), info.semester));
    }
}
