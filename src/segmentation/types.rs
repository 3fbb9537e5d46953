use crate::error::SegmentError;
use anyhow::Result;
use image::{GrayImage, RgbImage};
use ndarray::Array2;

/// Per-pixel foreground probability, shape (height, width), values 0.0-1.0
pub type ProbabilityMap = Array2<f32>;

/// Binary mask: 255 = foreground, 0 = background
pub type Mask = GrayImage;

/// Axis-aligned box prompt in source-image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxPrompt {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoxPrompt {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Return the box with corners ordered so that x1 < x2 and y1 < y2.
    ///
    /// Inverted corners are swapped. Non-finite coordinates and boxes with
    /// zero width or height are rejected.
    pub fn normalized(self) -> Result<Self, SegmentError> {
        let coords = [self.x1, self.y1, self.x2, self.y2];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(SegmentError::InvalidPrompt(format!(
                "box coordinates must be finite, got {:?}",
                coords
            )));
        }

        let (x1, x2) = (self.x1.min(self.x2), self.x1.max(self.x2));
        let (y1, y2) = (self.y1.min(self.y2), self.y1.max(self.y2));

        if x1 == x2 || y1 == y2 {
            return Err(SegmentError::InvalidPrompt(format!(
                "box ({}, {}, {}, {}) has zero area",
                self.x1, self.y1, self.x2, self.y2
            )));
        }

        Ok(Self { x1, y1, x2, y2 })
    }

    pub fn as_array(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

/// Trait for box-prompted segmentation backends
///
/// Implementations are stateful: each call binds `image` before answering
/// the prompt, so a single instance must never serve two calls at once.
pub trait Predictor {
    /// Bind `image` and return the probability map for `prompt`
    ///
    /// # Returns
    /// * Probability map with the same height and width as `image`, values
    ///   already calibrated to 0.0-1.0
    fn infer(&mut self, image: &RgbImage, prompt: &BoxPrompt) -> Result<ProbabilityMap>;

    /// Identifier of the loaded model variant
    fn variant(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_keeps_ordered_box() {
        let prompt = BoxPrompt::new(1.0, 2.0, 10.0, 20.0);
        assert_eq!(prompt.normalized().unwrap(), prompt);
    }

    #[test]
    fn normalized_swaps_inverted_corners() {
        let prompt = BoxPrompt::new(10.0, 20.0, 1.0, 2.0).normalized().unwrap();
        assert_eq!(prompt.as_array(), [1.0, 2.0, 10.0, 20.0]);
    }

    #[test]
    fn normalized_rejects_degenerate_boxes() {
        assert!(matches!(
            BoxPrompt::new(5.0, 0.0, 5.0, 10.0).normalized(),
            Err(SegmentError::InvalidPrompt(_))
        ));
        assert!(matches!(
            BoxPrompt::new(0.0, f32::NAN, 5.0, 10.0).normalized(),
            Err(SegmentError::InvalidPrompt(_))
        ));
    }
}
