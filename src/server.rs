//! Thin relay: accepts an uploaded photo, forwards it to the hosted
//! classifier, and returns the verdict as JSON. No persistence and no
//! queueing; each request stands alone.

use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::config::RemoteConfig;
use crate::remote;

/// Multipart field the photo must arrive in.
const PHOTO_FIELD: &str = "photo";

pub struct AppState {
    pub remote: RemoteConfig,
    pub client: reqwest::Client,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/v1/assess", post(assess))
        .with_state(state)
}

pub async fn serve(listen: &str, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("binding {listen}"))?;
    log::info!("assessment relay listening on {listen}");
    axum::serve(listener, router(Arc::new(state))).await?;
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn assess(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let mut photo: Option<(Vec<u8>, String)> = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    &format!("malformed multipart body: {e}"),
                )
            }
        };
        if field.name() != Some(PHOTO_FIELD) {
            continue;
        }
        let media_type = field
            .content_type()
            .unwrap_or("image/jpeg")
            .to_string();
        match field.bytes().await {
            Ok(bytes) => photo = Some((bytes.to_vec(), media_type)),
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    &format!("failed reading photo field: {e}"),
                )
            }
        }
    }

    let Some((bytes, media_type)) = photo else {
        return error_response(
            StatusCode::BAD_REQUEST,
            &format!("missing multipart field \"{PHOTO_FIELD}\""),
        );
    };
    if bytes.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "photo field is empty");
    }

    match remote::classify(&state.client, &state.remote, &bytes, &media_type).await {
        Ok(verdict) => Json(verdict).into_response(),
        Err(e) => {
            log::error!("remote classification failed: {e}");
            error_response(StatusCode::BAD_GATEWAY, &e.to_string())
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
