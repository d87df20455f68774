use std::sync::Arc;

use grades::{Course, GradeElement, Id1, Id2, Segment};

use crate::config::{AppConfig, AppMode};
use crate::state::{AppState, SharedState};
use crate::store::{seed_batch, MemoryStore};

pub fn test_config(mode: AppMode) -> AppConfig {
    let mode = match mode {
        AppMode::Dev => "DEV",
        AppMode::Test => "TEST",
        AppMode::Prod => "PROD",
    };
    AppConfig::from_lookup(|key| match key {
        "APP_MODE" => Some(mode.to_string()),
        "APP_SECRET" => Some("test-secret".to_string()),
        _ => None,
    })
    .expect("test config")
}

pub fn test_state_with_mode(mode: AppMode) -> SharedState {
    Arc::new(AppState::new(test_config(mode), Arc::new(MemoryStore::new())))
}

pub fn test_state() -> SharedState {
    test_state_with_mode(AppMode::Test)
}

/// One course with a single 111-2 grade element.
pub async fn seeded_state() -> SharedState {
    let state = test_state();
    let id1 = Id1::parse("CSIE1212").unwrap();
    let course = Course::new(id1.clone(), Id2::parse("902 10750").unwrap(), "Data Structures");
    let ele = GradeElement::new(
        id1,
        "111-2".parse().unwrap(),
        None,
        Some("01".to_string()),
        vec![Segment::new(0, 8, 91.0).unwrap(), Segment::new(9, 9, 9.0).unwrap()],
    )
    .unwrap();
    state.store.apply_submission(&seed_batch(vec![course], vec![ele])).await.unwrap();
    state
}
