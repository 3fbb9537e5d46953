use super::types::Predictor;
use crate::error::{LoadError, SegmentError};
use parking_lot::Mutex;

/// Shareable handle on the process-wide predictor
pub type SharedPredictor = Box<dyn Predictor + Send>;

enum ModelState {
    Ready(Mutex<SharedPredictor>),
    Unavailable(String),
}

/// Owns the predictor resource for the lifetime of the server
///
/// Built once at startup from the outcome of loading the model. All access
/// goes through [`PredictorService::with_predictor`], which holds the lock for
/// the whole bind-then-query sequence of one request.
pub struct PredictorService {
    variant: String,
    state: ModelState,
}

impl PredictorService {
    pub fn ready(predictor: SharedPredictor) -> Self {
        Self {
            variant: predictor.variant().to_string(),
            state: ModelState::Ready(Mutex::new(predictor)),
        }
    }

    pub fn unavailable(variant: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            variant: variant.into(),
            state: ModelState::Unavailable(reason.into()),
        }
    }

    pub fn from_load_result(
        variant: impl Into<String>,
        result: Result<SharedPredictor, LoadError>,
    ) -> Self {
        match result {
            Ok(predictor) => Self::ready(predictor),
            Err(e) => {
                tracing::warn!("Predictor unavailable: {}", e);
                Self::unavailable(variant, e.to_string())
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ModelState::Ready(_))
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.state {
            ModelState::Ready(_) => None,
            ModelState::Unavailable(reason) => Some(reason),
        }
    }

    /// Run `f` with exclusive access to the predictor
    ///
    /// Blocks until any other request releases the predictor. Call from a
    /// blocking worker, never directly on the async runtime.
    pub fn with_predictor<T>(
        &self,
        f: impl FnOnce(&mut dyn Predictor) -> Result<T, SegmentError>,
    ) -> Result<T, SegmentError> {
        match &self.state {
            ModelState::Ready(predictor) => {
                let mut guard = predictor.lock();
                f(&mut **guard)
            }
            ModelState::Unavailable(reason) => Err(SegmentError::ModelUnavailable(reason.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::{BoxPrompt, ProbabilityMap};
    use image::RgbImage;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    struct Uniform(f32);

    impl Predictor for Uniform {
        fn infer(
            &mut self,
            image: &RgbImage,
            _prompt: &BoxPrompt,
        ) -> anyhow::Result<ProbabilityMap> {
            let (w, h) = image.dimensions();
            Ok(ProbabilityMap::from_elem((h as usize, w as usize), self.0))
        }

        fn variant(&self) -> &str {
            "uniform"
        }
    }

    #[test]
    fn missing_weights_marks_service_unavailable() {
        let service = PredictorService::from_load_result(
            "vit_b",
            Err(LoadError::MissingWeights(PathBuf::from("models/missing.onnx"))),
        );

        assert!(!service.is_ready());
        assert!(service.unavailable_reason().unwrap().contains("missing.onnx"));
        let result = service.with_predictor(|_| Ok(()));
        assert!(matches!(result, Err(SegmentError::ModelUnavailable(_))));
    }

    #[test]
    fn ready_service_runs_closure() {
        let service = PredictorService::ready(Box::new(Uniform(0.25)));
        assert!(service.is_ready());
        assert_eq!(service.variant(), "uniform");

        let prob = service
            .with_predictor(|p| {
                let image = RgbImage::new(3, 2);
                Ok(p.infer(&image, &BoxPrompt::new(0.0, 0.0, 1.0, 1.0))?)
            })
            .unwrap();
        assert_eq!(prob.dim(), (2, 3));
    }

    #[test]
    fn concurrent_requests_never_interleave() {
        let service = Arc::new(PredictorService::ready(Box::new(Uniform(0.5))));
        let busy = Arc::new(AtomicBool::new(false));
        let overlaps = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                let busy = Arc::clone(&busy);
                let overlaps = Arc::clone(&overlaps);
                thread::spawn(move || {
                    service.with_predictor(|p| {
                        if busy.swap(true, Ordering::SeqCst) {
                            overlaps.fetch_add(1, Ordering::SeqCst);
                        }
                        // Bind then query, with a gap another request could slip into
                        let image = RgbImage::new(2, 2);
                        let prompt = BoxPrompt::new(0.0, 0.0, 1.0, 1.0);
                        p.infer(&image, &prompt)?;
                        thread::sleep(Duration::from_millis(5));
                        p.infer(&image, &prompt)?;
                        busy.store(false, Ordering::SeqCst);
                        Ok(())
                    })
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap().unwrap();
        }
        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    }
}
