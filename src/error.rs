//! Error types for segserve

use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by the segmentation pipeline
#[derive(Error, Debug)]
pub enum SegmentError {
    #[error("Model not loaded: {0}")]
    ModelUnavailable(String),

    #[error("Could not read video file: {0}")]
    VideoOpen(String),

    #[error("No frames decoded from video")]
    NoFrames,

    #[error("Could not decode image: {0}")]
    ImageDecode(#[source] image::ImageError),

    #[error("Invalid box prompt: {0}")]
    InvalidPrompt(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Probability map shape {found:?} does not match previous frame {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Failures while loading the predictor at startup
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("SAM weights not found: {}", .0.display())]
    MissingWeights(PathBuf),

    #[error("Failed to create ONNX session from {}: {message}", .path.display())]
    Session { path: PathBuf, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_weights_display() {
        let err = LoadError::MissingWeights(PathBuf::from("models/sam_vit_b_encoder.onnx"));
        assert!(err.to_string().contains("models/sam_vit_b_encoder.onnx"));
    }

    #[test]
    fn test_internal_from_anyhow() {
        let err: SegmentError = anyhow::anyhow!("inference blew up").into();
        match err {
            SegmentError::Internal(inner) => assert_eq!(inner.to_string(), "inference blew up"),
            _ => panic!("Expected Internal error"),
        }
    }
}
