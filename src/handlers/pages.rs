// src/handlers/pages.rs

use axum::{Json, response::IntoResponse};
use serde_json::json;

pub async fn about() -> impl IntoResponse {
    Json(json!({ "template": "pages/about.html" }))
}

pub async fn rules() -> impl IntoResponse {
    Json(json!({ "template": "pages/rules.html" }))
}
