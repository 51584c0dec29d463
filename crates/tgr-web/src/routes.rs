use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderValue},
    response::{Html, IntoResponse, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::io::ReaderStream;

use tgr_core::chat_log::LogEntry;

use crate::{ApiError, AppState};

const INDEX_HTML: &str = include_str!("../assets/index.html");
const BLANK_HTML: &str = "<!doctype html><html><head><meta charset=\"utf-8\"></head><body></body></html>";

#[derive(Deserialize)]
pub(crate) struct SendForm {
    text: String,
}

#[derive(Deserialize)]
pub(crate) struct ToggleForm {
    password: String,
}

#[derive(Deserialize)]
pub(crate) struct MessagesQuery {
    since: Option<u64>,
}

#[derive(Serialize)]
pub(crate) struct MessagesResponse {
    messages: Vec<LogEntry>,
}

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
    client_ready: bool,
    disabled: bool,
}

pub(crate) async fn index(State(state): State<AppState>) -> Html<&'static str> {
    if state.relay.is_disabled() {
        Html(BLANK_HTML)
    } else {
        Html(INDEX_HTML)
    }
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        client_ready: state.relay.client_ready().await,
        disabled: state.relay.is_disabled(),
    })
}

pub(crate) async fn send(
    State(state): State<AppState>,
    Form(form): Form<SendForm>,
) -> Result<Json<Value>, ApiError> {
    state.relay.send(&form.text).await?;
    Ok(Json(json!({ "status": "ok" })))
}

pub(crate) async fn messages(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> Json<MessagesResponse> {
    Json(MessagesResponse {
        messages: state.relay.messages(query.since.unwrap_or(0)).await,
    })
}

pub(crate) async fn file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let path = state.relay.downloads().resolve(&filename).await?;
    let file = tokio::fs::File::open(&path)
        .await
        .map_err(tgr_core::Error::from)?;
    let body = Body::from_stream(ReaderStream::new(file));

    let disposition = format!(
        "attachment; filename*=UTF-8''{}",
        urlencoding::encode(&filename)
    );
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

pub(crate) async fn toggle(
    State(state): State<AppState>,
    Form(form): Form<ToggleForm>,
) -> Result<Json<Value>, ApiError> {
    let disabled = state.relay.toggle(&form.password)?;
    Ok(Json(json!({ "disabled": disabled })))
}
