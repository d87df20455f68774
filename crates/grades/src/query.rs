use serde::{Deserialize, Serialize};

use crate::course::Course;
use crate::element::GradeElement;
use crate::semester::Semester;

/// Course field a keyword is matched against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryField {
    #[default]
    Id1,
    Id2,
    Title,
}

/// Narrows the grade elements returned for a matched course.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilter {
    #[serde(default)]
    pub class_id: Option<String>,
    #[serde(default)]
    pub semester: Option<Semester>,
}

impl QueryFilter {
    pub fn is_set(&self) -> bool {
        self.class_id.is_some() || self.semester.is_some()
    }

    pub fn matches(&self, ele: &GradeElement) -> bool {
        if let Some(c) = &self.class_id {
            if ele.class_id.as_deref() != Some(c.as_str()) {
                return false;
            }
        }
        if let Some(s) = self.semester {
            if ele.semester != s {
                return false;
            }
        }
        true
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub field: QueryField,
    pub keyword: String,
    #[serde(flatten)]
    pub filter: QueryFilter,
}

impl Query {
    /// Case-insensitive substring match on the selected field.
    pub fn matches_course(&self, course: &Course) -> bool {
        let haystack = match self.field {
            QueryField::Id1 => course.id1.as_str(),
            QueryField::Id2 => course.id2.as_str(),
            QueryField::Title => course.title.as_str(),
        };
        haystack.to_lowercase().contains(&self.keyword.trim().to_lowercase())
    }
}
