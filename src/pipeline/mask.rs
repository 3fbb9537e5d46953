use crate::segmentation::{Mask, ProbabilityMap};
use image::Luma;

pub const FOREGROUND: u8 = 255;
pub const BACKGROUND: u8 = 0;

/// Threshold a probability map into a binary mask
///
/// A probability equal to `threshold` counts as foreground.
pub fn extract_mask(prob: &ProbabilityMap, threshold: f32) -> Mask {
    let (height, width) = prob.dim();
    Mask::from_fn(width as u32, height as u32, |x, y| {
        if prob[[y as usize, x as usize]] >= threshold {
            Luma([FOREGROUND])
        } else {
            Luma([BACKGROUND])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> ProbabilityMap {
        ProbabilityMap::from_shape_vec((2, 3), vec![0.0, 0.2, 0.4, 0.5, 0.8, 1.0]).unwrap()
    }

    #[test]
    fn zero_threshold_is_all_foreground() {
        let mask = extract_mask(&ramp(), 0.0);
        assert!(mask.pixels().all(|p| p[0] == FOREGROUND));
    }

    #[test]
    fn threshold_above_max_is_all_background() {
        let mask = extract_mask(&ProbabilityMap::from_elem((3, 3), 0.9), 0.95);
        assert!(mask.pixels().all(|p| p[0] == BACKGROUND));
    }

    #[test]
    fn equality_resolves_to_foreground() {
        let mask = extract_mask(&ramp(), 0.5);
        assert_eq!(mask.as_raw(), &vec![0, 0, 0, 255, 255, 255]);
    }

    #[test]
    fn mask_keeps_map_orientation() {
        let mask = extract_mask(&ramp(), 0.3);
        assert_eq!(mask.dimensions(), (3, 2));
        assert_eq!(mask.get_pixel(2, 0)[0], FOREGROUND);
        assert_eq!(mask.get_pixel(0, 1)[0], FOREGROUND);
        assert_eq!(mask.get_pixel(1, 0)[0], BACKGROUND);
    }
}
