pub mod api;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod segmentation;
pub mod source;

pub use config::Config;
pub use error::{LoadError, SegmentError};
