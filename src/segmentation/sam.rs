use super::preprocess::{Preprocessor, SAM_INPUT_SIZE};
use super::types::{BoxPrompt, Predictor, ProbabilityMap};
use crate::config::SamConfig;
use crate::error::LoadError;
use anyhow::{Context, Result};
use image::RgbImage;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;

/// Side length of the low resolution mask prompt the decoder accepts
const MASK_INPUT_SIZE: usize = 256;

/// Point labels for the top-left and bottom-right box corners
const BOX_CORNER_LABELS: [f32; 2] = [2.0, 3.0];

/// Image embedding produced by the encoder for the currently bound frame
struct BoundImage {
    embedding: Vec<f32>,
    dims: [usize; 4],
    width: u32,
    height: u32,
}

/// Segment Anything predictor backed by ONNX Runtime
///
/// Holds the image encoder and prompt decoder sessions. Binding an image runs
/// the encoder once; each box query then only runs the light decoder against
/// the stored embedding.
pub struct SamPredictor {
    encoder: Session,
    decoder: Session,
    preprocessor: Preprocessor,
    variant: String,
    bound: Option<BoundImage>,
}

impl SamPredictor {
    /// Load encoder and decoder sessions described by `config`
    ///
    /// Missing weight files are reported as [`LoadError::MissingWeights`] so
    /// the caller can keep serving and report itself not ready.
    pub fn load(config: &SamConfig) -> Result<Self, LoadError> {
        let encoder_path = config.encoder_path();
        let decoder_path = config.decoder_path();

        for path in [&encoder_path, &decoder_path] {
            if !path.exists() {
                return Err(LoadError::MissingWeights(path.clone()));
            }
        }

        tracing::info!("Loading SAM {} encoder from {}", config.variant, encoder_path.display());
        let encoder = build_session(&encoder_path, config.intra_threads)?;

        tracing::info!("Loading SAM {} decoder from {}", config.variant, decoder_path.display());
        let decoder = build_session(&decoder_path, config.intra_threads)?;

        tracing::info!("SAM model loaded successfully");

        Ok(Self {
            encoder,
            decoder,
            preprocessor: Preprocessor::new(SAM_INPUT_SIZE),
            variant: config.variant.to_string(),
            bound: None,
        })
    }

    /// Run the encoder on `image` and keep its embedding for later queries
    pub fn set_image(&mut self, image: &RgbImage) -> Result<()> {
        let input = self.preprocessor.preprocess(image)?;
        let size = SAM_INPUT_SIZE as usize;
        // Freshly allocated arrays are in standard layout, offset is zero
        let (data, _) = input.into_raw_vec_and_offset();
        let tensor = Tensor::from_array(([1usize, 3, size, size], data)).map_err(ort_error)?;

        let _span = tracing::debug_span!("encode").entered();
        let outputs = self
            .encoder
            .run(ort::inputs![tensor])
            .map_err(ort_error)
            .context("Failed to run image encoder")?;

        let (shape, embedding) = outputs
            .get("image_embeddings")
            .context("encoder has no 'image_embeddings' output")?
            .try_extract_tensor::<f32>()
            .map_err(ort_error)?;
        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        let dims: [usize; 4] = dims
            .try_into()
            .map_err(|d| anyhow::anyhow!("unexpected embedding shape {:?}", d))?;

        let (width, height) = image.dimensions();
        self.bound = Some(BoundImage {
            embedding: embedding.to_vec(),
            dims,
            width,
            height,
        });

        Ok(())
    }

    /// Query the bound image with a box prompt
    pub fn predict_box(&mut self, prompt: &BoxPrompt) -> Result<ProbabilityMap> {
        let bound = self
            .bound
            .as_ref()
            .context("predict_box called before set_image")?;

        let corners = self.preprocessor.transform_box(prompt, bound.width, bound.height);

        let embedding =
            Tensor::from_array((bound.dims, bound.embedding.clone())).map_err(ort_error)?;
        let point_coords =
            Tensor::from_array(([1usize, 2, 2], corners.to_vec())).map_err(ort_error)?;
        let point_labels =
            Tensor::from_array(([1usize, 2], BOX_CORNER_LABELS.to_vec())).map_err(ort_error)?;
        let mask_input = Tensor::from_array((
            [1usize, 1, MASK_INPUT_SIZE, MASK_INPUT_SIZE],
            vec![0.0f32; MASK_INPUT_SIZE * MASK_INPUT_SIZE],
        ))
        .map_err(ort_error)?;
        let has_mask_input = Tensor::from_array(([1usize], vec![0.0f32])).map_err(ort_error)?;
        let orig_im_size =
            Tensor::from_array(([2usize], vec![bound.height as f32, bound.width as f32]))
                .map_err(ort_error)?;

        let (width, height) = (bound.width, bound.height);

        let _span = tracing::debug_span!("decode_prompt").entered();
        let outputs = self
            .decoder
            .run(ort::inputs![
                "image_embeddings" => embedding,
                "point_coords" => point_coords,
                "point_labels" => point_labels,
                "mask_input" => mask_input,
                "has_mask_input" => has_mask_input,
                "orig_im_size" => orig_im_size,
            ])
            .map_err(ort_error)
            .context("Failed to run prompt decoder")?;

        // masks: [1, num_masks, H, W] logits, first mask is the single-mask output
        let (shape, logits) = outputs
            .get("masks")
            .context("decoder has no 'masks' output")?
            .try_extract_tensor::<f32>()
            .map_err(ort_error)?;
        if shape.len() != 4 {
            anyhow::bail!("unexpected mask shape {:?}", shape.iter().collect::<Vec<_>>());
        }
        let mask_height = shape[2] as u32;
        let mask_width = shape[3] as u32;

        Preprocessor::postprocess_logits(logits, mask_width, mask_height, width, height)
    }
}

impl Predictor for SamPredictor {
    fn infer(&mut self, image: &RgbImage, prompt: &BoxPrompt) -> Result<ProbabilityMap> {
        let _span = tracing::debug_span!("sam_infer").entered();
        self.set_image(image)?;
        self.predict_box(prompt)
    }

    fn variant(&self) -> &str {
        &self.variant
    }
}

fn build_session(path: &Path, intra_threads: usize) -> Result<Session, LoadError> {
    Session::builder()
        .map_err(|e| session_error(path, e))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| session_error(path, e))?
        .with_intra_threads(intra_threads)
        .map_err(|e| session_error(path, e))?
        .commit_from_file(path)
        .map_err(|e| session_error(path, e))
}

fn session_error(path: &Path, err: impl std::fmt::Display) -> LoadError {
    LoadError::Session {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

fn ort_error(err: impl std::fmt::Display) -> anyhow::Error {
    anyhow::anyhow!("ONNX Runtime error: {}", err)
}
