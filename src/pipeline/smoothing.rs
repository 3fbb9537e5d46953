use crate::error::SegmentError;
use crate::segmentation::ProbabilityMap;
use ndarray::Zip;

/// Causal exponential moving average over a sequence of probability maps
///
/// `S_0 = P_0`, then `S_t = alpha * P_t + (1 - alpha) * S_{t-1}`. Only the
/// previous output is kept, so a fresh smoother must be used per sequence.
#[derive(Debug)]
pub struct EmaSmoother {
    alpha: f32,
    state: Option<ProbabilityMap>,
}

impl EmaSmoother {
    pub fn new(alpha: f32) -> Result<Self, SegmentError> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(SegmentError::InvalidParameter(format!(
                "alpha must be within [0, 1], got {}",
                alpha
            )));
        }
        Ok(Self { alpha, state: None })
    }

    /// Feed the next map and return the smoothed value for this step
    pub fn push(&mut self, prob: ProbabilityMap) -> Result<&ProbabilityMap, SegmentError> {
        let alpha = self.alpha;

        match self.state {
            None => Ok(&*self.state.insert(prob)),
            Some(ref mut prev) => {
                if prev.dim() != prob.dim() {
                    return Err(SegmentError::ShapeMismatch {
                        expected: prev.dim(),
                        found: prob.dim(),
                    });
                }
                Zip::from(&mut *prev)
                    .and(&prob)
                    .for_each(|s, &p| *s = alpha * p + (1.0 - alpha) * *s);
                Ok(&*prev)
            }
        }
    }
}

/// Smooth a whole sequence; the output has the same length as the input
pub fn ema_smooth(
    prob_maps: Vec<ProbabilityMap>,
    alpha: f32,
) -> Result<Vec<ProbabilityMap>, SegmentError> {
    let mut smoother = EmaSmoother::new(alpha)?;
    prob_maps
        .into_iter()
        .map(|prob| smoother.push(prob).cloned())
        .collect()
}
