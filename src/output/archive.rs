use super::MaskSink;
use crate::segmentation::Mask;
use anyhow::{Context, Result};
use image::ImageFormat;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Archive entry name for the mask at `index`
///
/// Zero padded so that a lexicographic listing matches frame order.
pub fn entry_name(index: usize) -> String {
    format!("mask_{:05}.png", index)
}

/// Encode a mask as a grayscale PNG
pub fn encode_png(mask: &Mask) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    mask.write_to(&mut buf, ImageFormat::Png)
        .context("Failed to encode mask as PNG")?;
    Ok(buf.into_inner())
}

/// In-memory ZIP of PNG masks, one Deflate-compressed entry per frame
pub struct MaskArchive {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
    count: usize,
}

impl MaskArchive {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
            count: 0,
        }
    }

    /// Finalize the central directory and return the archive bytes
    pub fn finish(self) -> Result<Vec<u8>> {
        let cursor = self.writer.finish().context("Failed to finalize mask archive")?;
        Ok(cursor.into_inner())
    }
}

impl Default for MaskArchive {
    fn default() -> Self {
        Self::new()
    }
}

impl MaskSink for MaskArchive {
    fn write_mask(&mut self, mask: &Mask) -> Result<()> {
        let png = encode_png(mask)?;
        let name = entry_name(self.count);

        self.writer
            .start_file(name.as_str(), self.options)
            .with_context(|| format!("Failed to start archive entry {}", name))?;
        self.writer
            .write_all(&png)
            .with_context(|| format!("Failed to write archive entry {}", name))?;

        self.count += 1;
        Ok(())
    }

    fn len(&self) -> usize {
        self.count
    }
}

/// Package `masks` in order into a single archive
pub fn package_masks(masks: &[Mask]) -> Result<Vec<u8>> {
    let mut archive = MaskArchive::new();
    for mask in masks {
        archive.write_mask(mask)?;
    }
    archive.finish()
}
