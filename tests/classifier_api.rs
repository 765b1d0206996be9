use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use donatehub::{app, AppState};
use donatehub::classifier::GenerativeModel;
use donatehub::db;

struct FailingModel;

#[async_trait]
impl GenerativeModel for FailingModel {
    async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
        Err(anyhow::anyhow!("upstream timeout"))
    }
}

struct FixedModel(&'static str);

#[async_trait]
impl GenerativeModel for FixedModel {
    async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
        Ok(self.0.to_string())
    }
}

async fn test_state(ai: Option<Arc<dyn GenerativeModel>>) -> (tempfile::TempDir, AppState) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("test.db");
    let pool = db::connect(path.to_str().expect("utf-8 path")).await.expect("connect");
    db::run_migrations(&pool).await.expect("migrations");
    (dir, AppState { db: pool, ai })
}

async fn get_category(state: AppState, uri: &str) -> String {
    let response = app(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.expect("body").to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
    json["category"].as_str().expect("category field").to_string()
}

#[tokio::test]
async fn textbook_classifies_as_books_when_ai_fails() {
    let (_dir, state) = test_state(Some(Arc::new(FailingModel))).await;
    let category = get_category(state, "/ai-category/?description=old+textbook").await;
    assert_eq!(category, "Books");
}

#[tokio::test]
async fn empty_description_falls_back_to_household_items() {
    let (_dir, state) = test_state(Some(Arc::new(FailingModel))).await;
    let category = get_category(state, "/ai-category/?description=").await;
    assert_eq!(category, "Household Items");
}

#[tokio::test]
async fn missing_description_falls_back_to_household_items() {
    let (_dir, state) = test_state(None).await;
    let category = get_category(state, "/ai-category/").await;
    assert_eq!(category, "Household Items");
}

#[tokio::test]
async fn ai_reply_overrides_keyword_fallback() {
    let (_dir, state) = test_state(Some(Arc::new(FixedModel("Educational Materials")))).await;
    let category = get_category(state, "/ai-category/?description=old+textbook").await;
    assert_eq!(category, "Educational Materials");
}

#[tokio::test]
async fn failed_ai_matches_disabled_ai() {
    for description in ["sturdy+chair", "random+item+xyz", "kids+toy+books"] {
        let uri = format!("/ai-category/?description={}", description);

        let (_dir, disabled) = test_state(None).await;
        let without_ai = get_category(disabled, &uri).await;

        let (_dir, failing) = test_state(Some(Arc::new(FailingModel))).await;
        let with_failing_ai = get_category(failing, &uri).await;

        assert_eq!(without_ai, with_failing_ai);
    }
}

#[tokio::test]
async fn classify_endpoint_is_public() {
    // No auth token anywhere in the request; must still answer.
    let (_dir, state) = test_state(None).await;
    let category = get_category(state, "/ai-category/?description=leather+shoes").await;
    assert_eq!(category, "Footwear");
}
