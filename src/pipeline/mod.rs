//! Request-level segmentation flows

mod mask;
mod smoothing;

pub use mask::{extract_mask, BACKGROUND, FOREGROUND};
pub use smoothing::{ema_smooth, EmaSmoother};

use crate::error::SegmentError;
use crate::output::{encode_png, MaskArchive, MaskSink};
use crate::segmentation::{BoxPrompt, Mask, Predictor};
use crate::source::{BoundedFrames, FrameSource};
use image::RgbImage;
use std::time::{Duration, Instant};

pub const DEFAULT_THRESHOLD: f32 = 0.5;
pub const DEFAULT_ALPHA: f32 = 0.7;
pub const DEFAULT_MAX_FRAMES: usize = 60;
pub const MAX_FRAMES_LIMIT: usize = 300;

/// Parameters of a single-image request
#[derive(Debug, Clone, Copy)]
pub struct ImageRequest {
    pub prompt: BoxPrompt,
    pub threshold: f32,
}

impl ImageRequest {
    pub fn new(prompt: BoxPrompt) -> Self {
        Self {
            prompt,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Check ranges and normalize the box
    pub fn validated(self) -> Result<Self, SegmentError> {
        check_unit_range("threshold", self.threshold)?;
        Ok(Self {
            prompt: self.prompt.normalized()?,
            ..self
        })
    }
}

/// Parameters of a video request
#[derive(Debug, Clone, Copy)]
pub struct VideoRequest {
    pub prompt: BoxPrompt,
    pub alpha: f32,
    pub threshold: f32,
    pub max_frames: usize,
}

impl VideoRequest {
    pub fn new(prompt: BoxPrompt) -> Self {
        Self {
            prompt,
            alpha: DEFAULT_ALPHA,
            threshold: DEFAULT_THRESHOLD,
            max_frames: DEFAULT_MAX_FRAMES,
        }
    }

    /// Check ranges and normalize the box
    pub fn validated(self) -> Result<Self, SegmentError> {
        check_unit_range("alpha", self.alpha)?;
        check_unit_range("threshold", self.threshold)?;
        if !(1..=MAX_FRAMES_LIMIT).contains(&self.max_frames) {
            return Err(SegmentError::InvalidParameter(format!(
                "max_frames must be within [1, {}], got {}",
                MAX_FRAMES_LIMIT, self.max_frames
            )));
        }
        Ok(Self {
            prompt: self.prompt.normalized()?,
            ..self
        })
    }
}

fn check_unit_range(name: &str, value: f32) -> Result<(), SegmentError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SegmentError::InvalidParameter(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )))
    }
}

/// Decode an uploaded image into RGB
pub fn decode_image(image_bytes: &[u8]) -> Result<RgbImage, SegmentError> {
    let image = image::load_from_memory(image_bytes)
        .map_err(SegmentError::ImageDecode)?
        .to_rgb8();
    tracing::debug!("Decoded {}x{} image", image.width(), image.height());
    Ok(image)
}

/// Segment one decoded image and return the mask as PNG bytes
pub fn segment_image(
    predictor: &mut dyn Predictor,
    image: &RgbImage,
    request: &ImageRequest,
) -> Result<Vec<u8>, SegmentError> {
    let _span = tracing::info_span!("segment_image").entered();

    let prob = predictor.infer(image, &request.prompt)?;
    let mask = extract_mask(&prob, request.threshold);

    Ok(encode_png(&mask)?)
}

/// Run the temporal pipeline over a video source into `sink`
///
/// Frames are pulled, inferred, smoothed and thresholded one at a time in
/// decode order. Returns the number of masks written.
pub fn segment_frames<S, K>(
    predictor: &mut dyn Predictor,
    source: S,
    request: &VideoRequest,
    sink: &mut K,
) -> Result<usize, SegmentError>
where
    S: FrameSource,
    K: MaskSink,
{
    let _span = tracing::info_span!("segment_video", max_frames = request.max_frames).entered();

    let mut smoother = EmaSmoother::new(request.alpha)?;
    let mut frames = BoundedFrames::new(source, request.max_frames);
    let mut total_decode_time = Duration::ZERO;
    let mut total_infer_time = Duration::ZERO;

    loop {
        let decode_start = Instant::now();
        let Some(frame) = frames.next() else {
            break;
        };
        total_decode_time += decode_start.elapsed();

        let infer_start = Instant::now();
        let prob = predictor.infer(&frame, &request.prompt)?;
        total_infer_time += infer_start.elapsed();

        let smoothed = smoother.push(prob)?;
        let mask: Mask = extract_mask(smoothed, request.threshold);
        sink.write_mask(&mask)?;
    }

    let frame_count = frames.decoded();
    if frame_count == 0 {
        return Err(SegmentError::NoFrames);
    }

    let avg_decode_ms = total_decode_time.as_secs_f64() * 1000.0 / frame_count as f64;
    let avg_infer_ms = total_infer_time.as_secs_f64() * 1000.0 / frame_count as f64;
    tracing::info!(
        "Segmented {} frames (max {}): decode={:.1}ms, infer={:.1}ms per frame",
        frame_count,
        request.max_frames,
        avg_decode_ms,
        avg_infer_ms
    );

    Ok(frame_count)
}

/// Segment a video source and return a ZIP of per-frame PNG masks
pub fn segment_video<S: FrameSource>(
    predictor: &mut dyn Predictor,
    source: S,
    request: &VideoRequest,
) -> Result<Vec<u8>, SegmentError> {
    let mut archive = MaskArchive::new();
    segment_frames(predictor, source, request, &mut archive)?;
    Ok(archive.finish()?)
}
