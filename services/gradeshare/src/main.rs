mod auth;
mod config;
mod env_check;
mod error;
mod routes_course;
mod routes_misc;
mod routes_submit;
mod state;
mod store;
mod store_pg;

#[cfg(test)]
mod test_support;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{routing::{get, post}, Router};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::env_check::{check_env_file, EnvFileStatus};
use crate::state::{AppState, SharedState};
use crate::store::{GradeStore, MemoryStore};
use crate::store_pg::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env()?;
    info!(mode = ?cfg.mode, semester = %cfg.semester, app_url = ?cfg.app_url, secure_cookies = cfg.secure_cookies(), "config loaded");

    match check_env_file(Path::new(".")) {
        Ok(EnvFileStatus::UpToDate) => info!("Checked .env file, up-to-date."),
        Ok(EnvFileStatus::Outdated { expected, actual }) => {
            error!(%expected, %actual, "Your .env file does not match .env.sha256.");
            error!("Perhaps your environment variables are out-dated and may cause runtime error.");
        }
        Ok(EnvFileStatus::Unchecked) => {}
        Err(e) => warn!("env check failed: {e:?}"),
    }

    let store: Arc<dyn GradeStore> = match &cfg.database_url {
        Some(url) => {
            let pg = PgStore::connect(url).await?;
            pg.ping().await?;
            info!("postgres: ok");
            Arc::new(pg)
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let addr = cfg.bind_addr.clone();
    let app_state = Arc::new(AppState::new(cfg, store));
    let app = router(app_state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("gradeshare listening on http://{addr}");
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(routes_misc::root))
        .route("/course/:id1", get(routes_course::get_course))
        .route("/query", get(routes_course::query_courses))
        .route("/submit", post(routes_submit::submit_page))
        .route("/semester", get(routes_misc::get_semester))
        .route("/time-to-live", get(routes_misc::get_ttl))
        .route("/analytics/dialog", get(routes_misc::analytics_dialog))
        .route("/db", get(routes_misc::db_check))
        .route("/add-auth/:student_id", get(routes_misc::add_auth))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use grades::StudentId;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::auth::{sign_token, TOKEN_COOKIE};

    async fn send(req: Request<Body>) -> (StatusCode, Value) {
        let resp = router(test_support::test_state()).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn submit_missing_hash_is_json_422() {
        let token = sign_token("test-secret", &StudentId::parse("b10401006").unwrap());
        let req = Request::post("/submit")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::COOKIE, format!("{TOKEN_COOKIE}={token}"))
            .body(Body::from(r#"{"content":"x"}"#))
            .unwrap();

        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("hashCode"));
    }

    #[tokio::test]
    async fn submit_without_cookie_is_401() {
        let req = Request::post("/submit")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"content":"x","hashCode":120}"#))
            .unwrap();

        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"]["type"], "missing");
    }

    #[tokio::test]
    async fn bad_query_strings_are_json_422() {
        for uri in ["/query?keyword=data&semester=111-9", "/query?field=title", "/query?keyword=x&field=lecturer"] {
            let (status, body) = send(get(uri)).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
            assert!(body["detail"].is_string(), "{uri}");
        }
    }

    #[tokio::test]
    async fn course_errors_are_json() {
        let (status, body) = send(get("/course/PHYS")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].is_string());

        let (status, body) = send(get("/course/PHYS1001")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "not found");
    }

    #[tokio::test]
    async fn query_happy_path_is_json_list() {
        let (status, body) = send(get("/query?field=title&keyword=data")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::Array(vec![]));
    }
}
