use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use grades::{CourseGrade, Id1};
use tracing::debug;

use crate::error::ApiError;
use crate::state::SharedState;

pub async fn get_course(
    State(state): State<SharedState>,
    Path(id1): Path<String>,
) -> Result<Json<CourseGrade>, ApiError> {
    let id1 = Id1::parse(id1)?;
    let cg = state.store.course_grade(&id1).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(cg))
}

pub async fn query_courses(
    State(state): State<SharedState>,
    query: Result<Query<grades::Query>, QueryRejection>,
) -> Result<Json<Vec<CourseGrade>>, ApiError> {
    let Query(query) = query?;
    if query.keyword.trim().is_empty() {
        return Err(ApiError::BadRequest("keyword must not be empty".to_string()));
    }
    let hits = state.store.search(&query).await?;
    debug!(field = ?query.field, keyword = %query.keyword, hits = hits.len(), "query");
    Ok(Json(hits))
}
