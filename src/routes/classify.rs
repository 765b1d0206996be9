use axum::{
    extract::{State, Query},
    response::Json as AxumJson,
};
use std::collections::HashMap;

use crate::AppState;
use crate::classifier;

/// `GET /ai-category/?description=<text>`. Always 200 with one of the eight
/// category labels; a missing or empty description lands on the keyword
/// cascade's default.
pub async fn ai_category(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> AxumJson<serde_json::Value> {
    let description = params.get("description").map(|s| s.as_str()).unwrap_or("");
    let category = classifier::classify(description, state.ai.as_deref()).await;
    AxumJson(serde_json::json!({ "category": category.label() }))
}
