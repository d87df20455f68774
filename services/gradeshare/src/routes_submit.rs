use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use grades::{parse_page, GradeElement, Page, Semester};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::SharedState;
use crate::store::{Submission, SubmissionBatch, User};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubmitReport {
    pub submission_id: Option<Uuid>,
    /// Same page as the user's previous submission; nothing was stored.
    pub unchanged: bool,
    pub stored: usize,
    pub skipped: usize,
    pub last_semester: Option<Semester>,
}

pub async fn submit_page(
    State(state): State<SharedState>,
    AuthUser(student): AuthUser,
    page: Result<Json<Page>, JsonRejection>,
) -> Result<Json<SubmitReport>, ApiError> {
    let Json(page) = page?;
    page.verify()?;

    let mut user = state
        .store
        .get_user(&student)
        .await?
        .unwrap_or_else(|| User::new(student.clone()));

    if user.last_page_hash == Some(page.hash_code) {
        info!(student = %student, "submit: page unchanged");
        return Ok(Json(SubmitReport {
            submission_id: None,
            unchanged: true,
            stored: 0,
            skipped: 0,
            last_semester: user.last_semester,
        }));
    }

    // html parsing is CPU bound
    let content = page.content.clone();
    let parsed = tokio::task::spawn_blocking(move || parse_page(&content))
        .await
        .map_err(|e| ApiError::Internal(e.into()))?;

    if parsed.rows.is_empty() {
        return Err(ApiError::BadRequest("no grade rows found in page".to_string()));
    }

    let mut skipped = parsed.skipped;
    let mut newest = user.last_semester;
    let mut courses = Vec::with_capacity(parsed.rows.len());
    let mut elements = Vec::with_capacity(parsed.rows.len());

    for row in parsed.rows {
        let ele = match GradeElement::from_info(&row.info) {
            Ok(e) => e,
            Err(e) => {
                warn!(course = %row.course.id1, error = %e, "submit: skipping row");
                skipped += 1;
                continue;
            }
        };
        newest = newest.max(Some(ele.semester));
        courses.push(row.course);
        elements.push(ele);
    }
    let stored = elements.len();

    user.last_semester = newest;
    user.last_page_hash = Some(page.hash_code);
    user.updated_at = Utc::now();

    let submission = Submission {
        id: Uuid::new_v4(),
        student_id: student.clone(),
        page_hash: page.hash_code,
        rows_stored: stored as i32,
        rows_skipped: skipped as i32,
        created_at: user.updated_at,
    };
    let batch = SubmissionBatch { courses, elements, user, submission };
    state.store.apply_submission(&batch).await?;

    info!(student = %student, stored, skipped, submission = %batch.submission.id, "submit: page stored");

    Ok(Json(SubmitReport {
        submission_id: Some(batch.submission.id),
        unchanged: false,
        stored,
        skipped,
        last_semester: batch.user.last_semester,
    }))
}
