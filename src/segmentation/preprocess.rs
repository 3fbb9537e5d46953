use super::types::{BoxPrompt, ProbabilityMap};
use anyhow::{Context, Result};
use image::{imageops, ImageBuffer, Luma, RgbImage};
use ndarray::{Array2, Array4};

/// Side length of the square SAM encoder input
pub const SAM_INPUT_SIZE: u32 = 1024;

const PIXEL_MEAN: [f32; 3] = [123.675, 116.28, 103.53];
const PIXEL_STD: [f32; 3] = [58.395, 57.12, 57.375];

/// Preprocessor mapping source frames into the encoder's input space
///
/// The longest side is resized to `target_size` keeping aspect ratio, and the
/// remainder of the square canvas is zero padded on the bottom and right.
pub struct Preprocessor {
    target_size: u32,
}

impl Preprocessor {
    pub fn new(target_size: u32) -> Self {
        Self { target_size }
    }

    /// Size of `(width, height)` after longest-side resize
    pub fn resized_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        let scale = self.target_size as f32 / width.max(height) as f32;
        let new_width = (width as f32 * scale + 0.5) as u32;
        let new_height = (height as f32 * scale + 0.5) as u32;
        (new_width.max(1), new_height.max(1))
    }

    /// Preprocess an RGB image into a normalized, padded NCHW tensor
    ///
    /// Returns: Array4<f32> with shape [1, 3, target_size, target_size]
    pub fn preprocess(&self, image: &RgbImage) -> Result<Array4<f32>> {
        let _span = tracing::debug_span!("preprocess").entered();

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            anyhow::bail!("cannot preprocess an empty {}x{} image", width, height);
        }

        let (new_width, new_height) = self.resized_dimensions(width, height);
        let resized = if (new_width, new_height) != (width, height) {
            imageops::resize(image, new_width, new_height, imageops::FilterType::Triangle)
        } else {
            image.clone()
        };

        let size = self.target_size as usize;
        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] =
                    (pixel[c] as f32 - PIXEL_MEAN[c]) / PIXEL_STD[c];
            }
        }

        Ok(tensor)
    }

    /// Map a box from source-image pixels into the resized frame
    pub fn transform_box(&self, prompt: &BoxPrompt, width: u32, height: u32) -> [f32; 4] {
        let (new_width, new_height) = self.resized_dimensions(width, height);
        let sx = new_width as f32 / width as f32;
        let sy = new_height as f32 / height as f32;
        [prompt.x1 * sx, prompt.y1 * sy, prompt.x2 * sx, prompt.y2 * sy]
    }

    /// Convert decoder logits to a probability map at the source frame size
    ///
    /// # Arguments
    /// * `logits` - Flattened row-major logits
    /// * `logits_width` - Width of the logit grid
    /// * `logits_height` - Height of the logit grid
    /// * `target_width` - Source frame width
    /// * `target_height` - Source frame height
    pub fn postprocess_logits(
        logits: &[f32],
        logits_width: u32,
        logits_height: u32,
        target_width: u32,
        target_height: u32,
    ) -> Result<ProbabilityMap> {
        let _span = tracing::debug_span!("postprocess").entered();

        let expected = (logits_width * logits_height) as usize;
        if logits.len() < expected {
            anyhow::bail!(
                "decoder returned {} values for a {}x{} mask",
                logits.len(),
                logits_width,
                logits_height
            );
        }

        let probs: Vec<f32> = logits[..expected].iter().map(|&l| sigmoid(l)).collect();

        if logits_width == target_width && logits_height == target_height {
            return Array2::from_shape_vec((target_height as usize, target_width as usize), probs)
                .context("Failed to shape probability map");
        }

        // Resample in probability space so values stay within [0, 1]
        let grid: ImageBuffer<Luma<f32>, Vec<f32>> =
            ImageBuffer::from_raw(logits_width, logits_height, probs)
                .context("Failed to wrap decoder mask")?;
        let resized = imageops::resize(
            &grid,
            target_width,
            target_height,
            imageops::FilterType::Triangle,
        );

        let values: Vec<f32> = resized.pixels().map(|p| p[0].clamp(0.0, 1.0)).collect();
        Array2::from_shape_vec((target_height as usize, target_width as usize), values)
            .context("Failed to shape probability map")
    }
}

fn sigmoid(logit: f32) -> f32 {
    1.0 / (1.0 + (-logit).exp())
}
