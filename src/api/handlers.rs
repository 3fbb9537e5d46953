use super::error::ApiError;
use super::form::SegmentForm;
use super::AppState;
use crate::error::SegmentError;
use crate::pipeline::{
    self, ImageRequest, VideoRequest, DEFAULT_ALPHA, DEFAULT_MAX_FRAMES, DEFAULT_THRESHOLD,
};
use crate::source::VideoFileSource;
use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub model_loaded: bool,
    pub model_variant: String,
    pub reason: Option<String>,
}

pub async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let service = &state.service;
    let status = if service.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadyResponse {
            model_loaded: service.is_ready(),
            model_variant: service.variant().to_string(),
            reason: service.unavailable_reason().map(str::to_string),
        }),
    )
}

/// POST /v1/segment: one image, one box, PNG mask back
pub async fn segment_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    state.ensure_ready()?;

    let mut form = SegmentForm::read(multipart, &["image"]).await?;
    let image = form.take_file("image")?;
    let request = ImageRequest {
        prompt: form.box_prompt()?,
        threshold: form.optional("threshold", DEFAULT_THRESHOLD)?,
    }
    .validated()?;

    let service = state.service.clone();
    let png = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, SegmentError> {
        // Decode before taking the predictor lock
        let image = pipeline::decode_image(&image)?;
        service.with_predictor(|predictor| pipeline::segment_image(predictor, &image, &request))
    })
    .await
    .map_err(ApiError::Worker)??;

    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

/// POST /v1/segment/video: short clip, one box, ZIP of per-frame PNG masks back
pub async fn segment_video(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    state.ensure_ready()?;

    let mut form = SegmentForm::read(multipart, &["video"]).await?;
    let video = form.take_file("video")?;
    let request = VideoRequest {
        prompt: form.box_prompt()?,
        alpha: form.optional("alpha", DEFAULT_ALPHA)?,
        threshold: form.optional("threshold", DEFAULT_THRESHOLD)?,
        max_frames: form.optional("max_frames", DEFAULT_MAX_FRAMES)?,
    }
    .validated()?;

    let service = state.service.clone();
    let archive = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, SegmentError> {
        // Open the upload before taking the predictor lock
        let source = VideoFileSource::from_bytes(&video)?;
        drop(video);

        let (width, height) = source.dimensions();
        tracing::debug!(
            "Segmenting {}x{} video, up to {} frames",
            width,
            height,
            request.max_frames
        );

        service.with_predictor(|predictor| pipeline::segment_video(predictor, source, &request))
    })
    .await
    .map_err(ApiError::Worker)??;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"masks.zip\""),
        ],
        archive,
    )
        .into_response())
}

impl AppState {
    fn ensure_ready(&self) -> Result<(), SegmentError> {
        match self.service.unavailable_reason() {
            Some(reason) => Err(SegmentError::ModelUnavailable(reason.to_string())),
            None => Ok(()),
        }
    }
}
