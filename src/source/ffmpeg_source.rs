use super::FrameSource;
use crate::error::SegmentError;
use anyhow::{Context, Result};
use image::RgbImage;
use std::io::Write;
use tempfile::NamedTempFile;

extern crate ffmpeg_next as ffmpeg;

use ffmpeg::format::context::Input;
use ffmpeg::software::scaling;
use ffmpeg::util::frame::Video;

/// Video upload decoded sequentially into RGB frames
///
/// The demuxer needs a seekable file, so the upload is first written to a
/// uniquely named temporary file. The file is removed when the source is
/// dropped, whichever way the request ends.
pub struct VideoFileSource {
    input: Input,
    stream_index: usize,
    decoder: ffmpeg::decoder::Video,
    scaler: scaling::Context,
    width: u32,
    height: u32,
    flushing: bool,
    // Declared last: the demuxer must close before the file is unlinked
    _buffer: NamedTempFile,
}

impl VideoFileSource {
    /// Buffer `bytes` to temporary storage and open the best video stream
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SegmentError> {
        let buffer = buffer_upload(bytes).context("Failed to buffer video upload")?;
        Self::open(buffer).map_err(|e| SegmentError::VideoOpen(format!("{:#}", e)))
    }

    fn open(buffer: NamedTempFile) -> Result<Self> {
        ffmpeg::init().context("Failed to initialize ffmpeg")?;

        let input = ffmpeg::format::input(&buffer.path()).context("Unrecognized container")?;

        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow::anyhow!("No video stream found"))?;
        let stream_index = stream.index();

        let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .context("Failed to read codec parameters")?;
        let decoder = context.decoder().video().context("Failed to open video decoder")?;

        let width = decoder.width();
        let height = decoder.height();
        if width == 0 || height == 0 {
            anyhow::bail!("Video stream reports empty {}x{} frames", width, height);
        }

        let scaler = scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg::format::Pixel::RGB24,
            width,
            height,
            scaling::Flags::BILINEAR,
        )
        .context("Failed to create RGB scaler")?;

        tracing::debug!(
            "Opened video stream {} ({}x{}) from {}",
            stream_index,
            width,
            height,
            buffer.path().display()
        );

        Ok(Self {
            input,
            stream_index,
            decoder,
            scaler,
            width,
            height,
            flushing: false,
            _buffer: buffer,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn next_packet(&mut self) -> Option<ffmpeg::Packet> {
        let index = self.stream_index;
        self.input
            .packets()
            .find(|(stream, _)| stream.index() == index)
            .map(|(_, packet)| packet)
    }

    fn to_rgb(&mut self, decoded: &Video) -> Result<RgbImage> {
        let mut rgb = Video::empty();
        self.scaler
            .run(decoded, &mut rgb)
            .context("Failed to convert frame to RGB")?;

        // Copy row by row, the scaler output may be padded past width * 3
        let width = self.width as usize;
        let height = self.height as usize;
        let stride = rgb.stride(0);
        let data = rgb.data(0);

        let mut pixels = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            let row_start = y * stride;
            pixels.extend_from_slice(&data[row_start..row_start + width * 3]);
        }

        RgbImage::from_raw(self.width, self.height, pixels)
            .context("Decoded frame does not match stream dimensions")
    }
}

impl FrameSource for VideoFileSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let mut decoded = Video::empty();

        loop {
            match self.decoder.receive_frame(&mut decoded) {
                Ok(()) => return self.to_rgb(&decoded).map(Some),
                Err(ffmpeg::Error::Eof) => return Ok(None),
                Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::util::error::EAGAIN => {}
                Err(e) => return Err(e).context("Failed to decode frame"),
            }

            if self.flushing {
                return Ok(None);
            }

            match self.next_packet() {
                Some(packet) => self
                    .decoder
                    .send_packet(&packet)
                    .context("Failed to send packet to decoder")?,
                None => {
                    self.decoder
                        .send_eof()
                        .context("Failed to flush decoder")?;
                    self.flushing = true;
                }
            }
        }
    }
}

fn buffer_upload(bytes: &[u8]) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("segserve-upload-")
        .tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file)
}
