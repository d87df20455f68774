use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use grades::{Course, CourseGrade, GradeElement, Id1, Query, QueryFilter, Semester, StudentId};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Upper bound on courses returned by a search.
pub const SEARCH_LIMIT: usize = 50;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct User {
    pub id: StudentId,
    pub last_semester: Option<Semester>,
    pub last_page_hash: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: StudentId) -> Self {
        Self { id, last_semester: None, last_page_hash: None, updated_at: Utc::now() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Submission {
    pub id: Uuid,
    pub student_id: StudentId,
    pub page_hash: i64,
    pub rows_stored: i32,
    pub rows_skipped: i32,
    pub created_at: DateTime<Utc>,
}

/// Everything one accepted page writes.
#[derive(Clone, Debug)]
pub struct SubmissionBatch {
    pub courses: Vec<Course>,
    pub elements: Vec<GradeElement>,
    pub user: User,
    pub submission: Submission,
}

impl SubmissionBatch {
    /// First element whose course is neither in the batch nor `known`.
    pub fn unknown_course(&self, known: impl Fn(&Id1) -> bool) -> Option<&Id1> {
        self.elements
            .iter()
            .map(|e| &e.course_id1)
            .find(|id1| !known(id1) && !self.courses.iter().any(|c| &c.id1 == *id1))
    }
}

#[async_trait]
pub trait GradeStore: Send + Sync {
    async fn ping(&self) -> Result<()>;

    async fn course_grade(&self, id1: &Id1) -> Result<Option<CourseGrade>>;
    async fn search(&self, query: &Query) -> Result<Vec<CourseGrade>>;

    async fn get_user(&self, id: &StudentId) -> Result<Option<User>>;
    async fn put_user(&self, user: &User) -> Result<()>;

    /// Upserts the courses, upserts the elements by `id`, stores the user and
    /// records the submission. Either all of it lands or none of it does.
    async fn apply_submission(&self, batch: &SubmissionBatch) -> Result<()>;
}

/// Newest semester first, then by class.
pub fn sort_elements(elements: &mut [GradeElement]) {
    elements.sort_by(|a, b| {
        b.semester
            .cmp(&a.semester)
            .then_with(|| a.class_id.cmp(&b.class_id))
    });
}

/// Applies `filter` to a course's elements. Returns `None` when a filter is
/// set and nothing survives it.
pub fn assemble(course: Course, elements: Vec<GradeElement>, filter: &QueryFilter) -> Option<CourseGrade> {
    let mut grade_eles: Vec<GradeElement> = elements.into_iter().filter(|e| filter.matches(e)).collect();
    if filter.is_set() && grade_eles.is_empty() {
        return None;
    }
    sort_elements(&mut grade_eles);
    Some(CourseGrade { course, grade_eles })
}

/// In-memory store (for tests and running without Postgres)
#[derive(Default)]
pub struct MemoryStore {
    courses: RwLock<BTreeMap<Id1, Course>>,
    elements: RwLock<HashMap<String, GradeElement>>,
    users: RwLock<HashMap<StudentId, User>>,
    submissions: RwLock<Vec<Submission>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn elements_of(&self, id1: &Id1) -> Vec<GradeElement> {
        self.elements
            .read()
            .await
            .values()
            .filter(|e| &e.course_id1 == id1)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl GradeStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn course_grade(&self, id1: &Id1) -> Result<Option<CourseGrade>> {
        let course = match self.courses.read().await.get(id1) {
            Some(c) => c.clone(),
            None => return Ok(None),
        };
        let elements = self.elements_of(id1).await;
        Ok(assemble(course, elements, &QueryFilter::default()))
    }

    // The limit counts courses that survive the filter, in id1 order.
    async fn search(&self, query: &Query) -> Result<Vec<CourseGrade>> {
        let matched: Vec<Course> = self
            .courses
            .read()
            .await
            .values()
            .filter(|c| query.matches_course(c))
            .cloned()
            .collect();

        let mut out = Vec::new();
        for course in matched {
            if out.len() >= SEARCH_LIMIT {
                break;
            }
            let elements = self.elements_of(&course.id1).await;
            out.extend(assemble(course, elements, &query.filter));
        }
        Ok(out)
    }

    async fn get_user(&self, id: &StudentId) -> Result<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn put_user(&self, user: &User) -> Result<()> {
        self.users.write().await.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn apply_submission(&self, batch: &SubmissionBatch) -> Result<()> {
        // lock order: courses, elements, users, submissions
        let mut courses = self.courses.write().await;
        let mut elements = self.elements.write().await;
        let mut users = self.users.write().await;
        let mut submissions = self.submissions.write().await;

        if let Some(id1) = batch.unknown_course(|id1| courses.contains_key(id1)) {
            anyhow::bail!("unknown course {id1}");
        }

        for course in &batch.courses {
            courses.insert(course.id1.clone(), course.clone());
        }
        for ele in &batch.elements {
            elements.insert(ele.id.clone(), ele.clone());
        }
        users.insert(batch.user.id.clone(), batch.user.clone());
        submissions.push(batch.submission.clone());
        Ok(())
    }
}

/// Batch of grade data attributed to a fixed seeding user.
#[cfg(test)]
pub fn seed_batch(courses: Vec<Course>, elements: Vec<GradeElement>) -> SubmissionBatch {
    let user = User::new(StudentId::parse("b00000000").unwrap());
    let submission = Submission {
        id: Uuid::new_v4(),
        student_id: user.id.clone(),
        page_hash: 0,
        rows_stored: elements.len() as i32,
        rows_skipped: 0,
        created_at: user.updated_at,
    };
    SubmissionBatch { courses, elements, user, submission }
}
