use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use grades::{
    Course, CourseGrade, GradeElement, Id1, Id2, Query, QueryField, QueryFilter, Segment, Semester,
    StudentId,
};
use sqlx::{PgConnection, PgPool};

use crate::store::{assemble, GradeStore, Submission, SubmissionBatch, User, SEARCH_LIMIT};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .context("Failed to connect to Postgres")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self { pool })
    }

    async fn elements_for(&self, ids: &[String]) -> Result<Vec<GradeElement>> {
        let rows: Vec<ElementRow> = sqlx::query_as(
            r#"
            SELECT id, course_id1, semester, lecturer, class_id, segments
            FROM grade_elements
            WHERE course_id1 = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ElementRow::into_element).collect()
    }
}

#[derive(sqlx::FromRow)]
struct CourseRow {
    id1: String,
    id2: String,
    title: String,
}

impl CourseRow {
    fn into_course(self) -> Result<Course> {
        Ok(Course::new(Id1::parse(self.id1)?, Id2::parse(self.id2)?, self.title))
    }
}

#[derive(sqlx::FromRow)]
struct ElementRow {
    id: String,
    course_id1: String,
    semester: String,
    lecturer: Option<String>,
    class_id: Option<String>,
    segments: serde_json::Value,
}

impl ElementRow {
    fn into_element(self) -> Result<GradeElement> {
        let segments: Vec<Segment> =
            serde_json::from_value(self.segments).with_context(|| format!("segments of {}", self.id))?;
        let ele = GradeElement::new(
            Id1::parse(self.course_id1)?,
            self.semester.parse::<Semester>()?,
            self.lecturer,
            self.class_id,
            segments,
        )?;
        if ele.id != self.id {
            anyhow::bail!("stored grade element {} does not match its key ({})", self.id, ele.id);
        }
        Ok(ele)
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    last_semester: Option<String>,
    last_page_hash: Option<i64>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<User> {
        Ok(User {
            id: StudentId::parse(&self.id)?,
            last_semester: self.last_semester.map(|s| s.parse::<Semester>()).transpose()?,
            last_page_hash: self.last_page_hash,
            updated_at: self.updated_at,
        })
    }
}

fn like_pattern(keyword: &str) -> String {
    let escaped = keyword
        .trim()
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

async fn upsert_course(conn: &mut PgConnection, course: &Course) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO courses (id1, id2, title)
        VALUES ($1, $2, $3)
        ON CONFLICT (id1) DO UPDATE SET id2 = EXCLUDED.id2, title = EXCLUDED.title
        "#,
    )
    .bind(course.id1.as_str())
    .bind(course.id2.as_str())
    .bind(&course.title)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn upsert_element(conn: &mut PgConnection, ele: &GradeElement) -> Result<()> {
    let segments = serde_json::to_value(&ele.segments)?;
    sqlx::query(
        r#"
        INSERT INTO grade_elements (id, course_id1, semester, lecturer, class_id, segments)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (id) DO UPDATE
        SET lecturer = COALESCE(EXCLUDED.lecturer, grade_elements.lecturer),
            segments = EXCLUDED.segments,
            updated_at = NOW()
        "#,
    )
    .bind(&ele.id)
    .bind(ele.course_id1.as_str())
    .bind(ele.semester.to_string())
    .bind(&ele.lecturer)
    .bind(&ele.class_id)
    .bind(segments)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn upsert_user(conn: &mut PgConnection, user: &User) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, last_semester, last_page_hash, updated_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (id) DO UPDATE
        SET last_semester = EXCLUDED.last_semester,
            last_page_hash = EXCLUDED.last_page_hash,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(user.id.as_str())
    .bind(user.last_semester.map(|s| s.to_string()))
    .bind(user.last_page_hash)
    .bind(user.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_submission(conn: &mut PgConnection, sub: &Submission) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO submissions (id, student_id, page_hash, rows_stored, rows_skipped, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(sub.id)
    .bind(sub.student_id.as_str())
    .bind(sub.page_hash)
    .bind(sub.rows_stored)
    .bind(sub.rows_skipped)
    .bind(sub.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Course search. The element filter runs in SQL so that `LIMIT` counts only
/// courses that still have a matching element.
fn search_sql(field: QueryField) -> String {
    // column names are fixed strings, never user input
    let column = match field {
        QueryField::Id1 => "id1",
        QueryField::Id2 => "id2",
        QueryField::Title => "title",
    };
    format!(
        r#"
        SELECT c.id1, c.id2, c.title
        FROM courses c
        WHERE LOWER(c.{column}) LIKE $1
          AND (
            ($2::text IS NULL AND $3::text IS NULL)
            OR EXISTS (
              SELECT 1 FROM grade_elements g
              WHERE g.course_id1 = c.id1
                AND ($2::text IS NULL OR g.class_id = $2)
                AND ($3::text IS NULL OR g.semester = $3)
            )
          )
        ORDER BY c.id1
        LIMIT $4
        "#
    )
}

#[async_trait]
impl GradeStore for PgStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Postgres ping failed")?;
        Ok(())
    }

    async fn course_grade(&self, id1: &Id1) -> Result<Option<CourseGrade>> {
        let row: Option<CourseRow> = sqlx::query_as("SELECT id1, id2, title FROM courses WHERE id1 = $1")
            .bind(id1.as_str())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let course = row.into_course()?;
        let elements = self.elements_for(&[course.id1.to_string()]).await?;
        Ok(assemble(course, elements, &QueryFilter::default()))
    }

    async fn search(&self, query: &Query) -> Result<Vec<CourseGrade>> {
        let rows: Vec<CourseRow> = sqlx::query_as(&search_sql(query.field))
            .bind(like_pattern(&query.keyword))
            .bind(&query.filter.class_id)
            .bind(query.filter.semester.map(|s| s.to_string()))
            .bind(SEARCH_LIMIT as i64)
            .fetch_all(&self.pool)
            .await?;

        let courses = rows.into_iter().map(CourseRow::into_course).collect::<Result<Vec<_>>>()?;
        let ids: Vec<String> = courses.iter().map(|c| c.id1.to_string()).collect();
        let mut elements = self.elements_for(&ids).await?;

        let mut out = Vec::with_capacity(courses.len());
        for course in courses {
            let (mine, rest): (Vec<_>, Vec<_>) =
                elements.into_iter().partition(|e| e.course_id1 == course.id1);
            elements = rest;
            out.extend(assemble(course, mine, &query.filter));
        }
        Ok(out)
    }

    async fn get_user(&self, id: &StudentId) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, last_semester, last_page_hash, updated_at FROM users WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn put_user(&self, user: &User) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        upsert_user(&mut conn, user).await
    }

    async fn apply_submission(&self, batch: &SubmissionBatch) -> Result<()> {
        // dropping `tx` before commit rolls everything back
        let mut tx = self.pool.begin().await.context("begin submission")?;

        for course in &batch.courses {
            upsert_course(&mut tx, course).await?;
        }
        for ele in &batch.elements {
            upsert_element(&mut tx, ele)
                .await
                .with_context(|| format!("grade element {} of {}", ele.id, ele.course_id1))?;
        }
        upsert_user(&mut tx, &batch.user).await?;
        insert_submission(&mut tx, &batch.submission).await?;

        tx.commit().await.context("commit submission")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" Data "), "%data%");
        assert_eq!(like_pattern("100%_x"), "%100\\%\\_x%");
    }

    #[test]
    fn search_filters_before_limit() {
        let sql = search_sql(QueryField::Title);
        assert!(sql.contains("LOWER(c.title) LIKE $1"));
        let exists = sql.find("EXISTS").unwrap();
        let limit = sql.find("LIMIT $4").unwrap();
        assert!(exists < limit);
    }
}
