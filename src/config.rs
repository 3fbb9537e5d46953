use clap::{Parser, ValueEnum};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

/// SAM backbone sizes with published ONNX exports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelVariant {
    /// ViT-B, smallest and fastest
    #[value(name = "vit_b")]
    VitB,
    /// ViT-L
    #[value(name = "vit_l")]
    VitL,
    /// ViT-H, largest
    #[value(name = "vit_h")]
    VitH,
}

impl ModelVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelVariant::VitB => "vit_b",
            ModelVariant::VitL => "vit_l",
            ModelVariant::VitH => "vit_h",
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Box-prompted mask segmentation service", long_about = None)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "SEGSERVE_BIND", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    /// SAM model variant
    #[arg(long, env = "SEGSERVE_MODEL_VARIANT", value_enum, default_value_t = ModelVariant::VitB)]
    pub model_variant: ModelVariant,

    /// Directory holding the ONNX exports
    #[arg(long, env = "SEGSERVE_MODEL_DIR", default_value = "models")]
    pub model_dir: PathBuf,

    /// Path to the image encoder ONNX file
    /// Defaults to <model-dir>/sam_<variant>_encoder.onnx
    #[arg(long, env = "SEGSERVE_ENCODER")]
    pub encoder: Option<PathBuf>,

    /// Path to the prompt decoder ONNX file
    /// Defaults to <model-dir>/sam_<variant>_decoder.onnx
    #[arg(long, env = "SEGSERVE_DECODER")]
    pub decoder: Option<PathBuf>,

    /// ONNX Runtime intra-op threads
    #[arg(long, env = "SEGSERVE_INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,

    /// Maximum accepted request body in megabytes
    #[arg(long, env = "SEGSERVE_MAX_UPLOAD_MB", default_value_t = 200)]
    pub max_upload_mb: usize,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Config {
    pub fn sam(&self) -> SamConfig {
        SamConfig {
            variant: self.model_variant,
            model_dir: self.model_dir.clone(),
            encoder: self.encoder.clone(),
            decoder: self.decoder.clone(),
            intra_threads: self.intra_threads,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

/// Everything needed to load the predictor once at startup
#[derive(Debug, Clone)]
pub struct SamConfig {
    pub variant: ModelVariant,
    pub model_dir: PathBuf,
    pub encoder: Option<PathBuf>,
    pub decoder: Option<PathBuf>,
    pub intra_threads: usize,
}

impl SamConfig {
    pub fn encoder_path(&self) -> PathBuf {
        self.encoder
            .clone()
            .unwrap_or_else(|| self.model_dir.join(format!("sam_{}_encoder.onnx", self.variant)))
    }

    pub fn decoder_path(&self) -> PathBuf {
        self.decoder
            .clone()
            .unwrap_or_else(|| self.model_dir.join(format!("sam_{}_decoder.onnx", self.variant)))
    }
}
