mod preprocess;
mod sam;
mod service;
pub mod types;

pub use preprocess::{Preprocessor, SAM_INPUT_SIZE};
pub use sam::SamPredictor;
pub use service::{PredictorService, SharedPredictor};
pub use types::{BoxPrompt, Mask, Predictor, ProbabilityMap};

use crate::config::SamConfig;

/// Load the default predictor (SAM) and wrap the outcome in a service
pub fn load_service(config: &SamConfig) -> PredictorService {
    let result = SamPredictor::load(config).map(|p| Box::new(p) as SharedPredictor);
    PredictorService::from_load_result(config.variant.as_str(), result)
}
