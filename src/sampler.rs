//! Strategies for subsetting instances before a tree is grown, allowing
//! for stochastic gradient boosting.
use rand::rngs::StdRng;
use rand::Rng;

/// A sampler selects the instance ids a tree is trained on. Instances
/// with a negative hessian are always dropped; they carry no usable
/// curvature.
pub trait Sampler {
    fn sample(&mut self, rng: &mut StdRng, hess: &[f32]) -> Vec<u32>;
}

pub struct RandomSampler {
    subsample: f32,
}

impl RandomSampler {
    pub fn new(subsample: f32) -> Self {
        RandomSampler { subsample }
    }
}

impl Sampler for RandomSampler {
    fn sample(&mut self, rng: &mut StdRng, hess: &[f32]) -> Vec<u32> {
        let subsample = self.subsample;
        let mut chosen = Vec::new();
        if subsample >= 1.0 - 1e-6 {
            for (i, &h) in hess.iter().enumerate() {
                if h >= 0.0 {
                    chosen.push(i as u32);
                }
            }
        } else {
            for (i, &h) in hess.iter().enumerate() {
                if h < 0.0 {
                    continue;
                }
                if rng.random::<f32>() < subsample {
                    chosen.push(i as u32);
                }
            }
        }
        chosen
    }
}
