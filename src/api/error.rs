use crate::error::SegmentError;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use tokio::task::JoinError;

/// Everything a handler can fail with, mapped to a status in one place
#[derive(Debug)]
pub enum ApiError {
    Segment(SegmentError),
    /// Missing or unparsable form field
    Form(String),
    Multipart(MultipartError),
    Worker(JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Segment(err) => match err {
                SegmentError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                SegmentError::VideoOpen(_)
                | SegmentError::NoFrames
                | SegmentError::ImageDecode(_) => StatusCode::BAD_REQUEST,
                SegmentError::InvalidPrompt(_) | SegmentError::InvalidParameter(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                SegmentError::ShapeMismatch { .. } | SegmentError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Form(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Multipart(err) => err.status(),
            ApiError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> String {
        match self {
            ApiError::Segment(err) => err.to_string(),
            ApiError::Form(message) => message.clone(),
            ApiError::Multipart(err) => err.body_text(),
            ApiError::Worker(_) => "Segmentation worker failed".to_string(),
        }
    }
}

impl From<SegmentError> for ApiError {
    fn from(err: SegmentError) -> Self {
        ApiError::Segment(err)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Multipart(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            match &self {
                ApiError::Segment(SegmentError::Internal(err)) => {
                    tracing::error!("Request failed: {:#}", err)
                }
                ApiError::Worker(err) => tracing::error!("Worker task failed: {}", err),
                other => tracing::error!("Request failed: {}", other.detail()),
            }
        } else {
            tracing::debug!("Rejecting request with {}: {}", status, self.detail());
        }

        (status, Json(json!({ "detail": self.detail() }))).into_response()
    }
}
