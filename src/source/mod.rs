mod ffmpeg_source;

pub use ffmpeg_source::VideoFileSource;

use anyhow::Result;
use image::RgbImage;

/// Trait for sequential frame sources
pub trait FrameSource {
    /// Decode the next frame
    ///
    /// `Ok(None)` signals end of stream. An error means the frame could not
    /// be decoded; callers stop reading rather than retry.
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
}

/// Iterator over at most `max_frames` frames of a source
///
/// Ends at the bound, at end of stream, or at the first decode failure.
pub struct BoundedFrames<S> {
    source: S,
    max_frames: usize,
    decoded: usize,
    finished: bool,
}

impl<S: FrameSource> BoundedFrames<S> {
    pub fn new(source: S, max_frames: usize) -> Self {
        Self {
            source,
            max_frames,
            decoded: 0,
            finished: false,
        }
    }

    /// Frames yielded so far
    pub fn decoded(&self) -> usize {
        self.decoded
    }
}

impl<S: FrameSource> Iterator for BoundedFrames<S> {
    type Item = RgbImage;

    fn next(&mut self) -> Option<RgbImage> {
        if self.finished || self.decoded >= self.max_frames {
            return None;
        }

        match self.source.next_frame() {
            Ok(Some(frame)) => {
                self.decoded += 1;
                Some(frame)
            }
            Ok(None) => {
                tracing::debug!("End of stream after {} frames", self.decoded);
                self.finished = true;
                None
            }
            Err(e) => {
                tracing::warn!(
                    "Decode failed after {} frames, keeping frames read so far: {:#}",
                    self.decoded,
                    e
                );
                self.finished = true;
                None
            }
        }
    }
}

/// Read up to `max_frames` frames from `source`, in decode order
pub fn read_frames<S: FrameSource>(source: S, max_frames: usize) -> Vec<RgbImage> {
    BoundedFrames::new(source, max_frames).collect()
}
