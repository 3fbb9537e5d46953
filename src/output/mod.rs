mod archive;

pub use archive::{encode_png, entry_name, package_masks, MaskArchive};

use anyhow::Result;
use crate::segmentation::Mask;

/// Trait for destinations of an ordered mask sequence
pub trait MaskSink {
    /// Append the next mask in frame order
    fn write_mask(&mut self, mask: &Mask) -> Result<()>;

    /// Number of masks written so far
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
