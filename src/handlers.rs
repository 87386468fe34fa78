use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use thiserror::Error;
use tower_http::services::ServeDir;

use crate::notify::dispatch;
use crate::pages;
use crate::pipeline::{process_upload, AppContext, PipelineError};

pub type SharedContext = Arc<AppContext>;

const IMAGE_FIELD: &str = "image";

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Multipart(#[from] MultipartError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Multipart(err) => {
                log::warn!("Rejected upload: {}", err);
                err.into_response()
            }
            AppError::Pipeline(err) => {
                log::error!("Request failed: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

pub fn router(ctx: SharedContext) -> Router {
    let static_dir = ctx.config.static_dir.clone();
    let body_limit_bytes = ctx.config.body_limit_bytes;

    Router::new()
        .route("/", get(upload_form).post(upload_handler))
        .route("/health", get(health_check))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .with_state(ctx)
}

async fn upload_form() -> Html<&'static str> {
    Html(pages::upload_page())
}

async fn upload_handler(
    State(ctx): State<SharedContext>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let Some(upload) = read_image_field(multipart).await? else {
        log::info!("POST without an image, redirecting to the upload form");
        return Ok(Redirect::to("/").into_response());
    };

    let diagnosis = process_upload(&ctx, upload).await?;

    let outcome = dispatch(
        ctx.notifier.as_ref(),
        ctx.config.recipient.as_deref(),
        &diagnosis.text,
        &diagnosis.image_url,
    )
    .await;
    log::info!("Notification for {}: {:?}", diagnosis.filename, outcome);

    Ok(Html(pages::result_page(&diagnosis.text, &diagnosis.image_url)).into_response())
}

/// Returns the `image` field, or `None` when it is absent or the browser
/// submitted the form without choosing a file.
async fn read_image_field(mut multipart: Multipart) -> Result<Option<Bytes>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        if field.file_name().map_or(false, str::is_empty) {
            return Ok(None);
        }
        let data = field.bytes().await?;
        return Ok((!data.is_empty()).then_some(data));
    }
    Ok(None)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "OK" }))
}
