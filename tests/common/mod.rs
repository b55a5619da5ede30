//! Common test utilities and data generators.

use faer::Mat;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Seeded standard-normal sampler (Box-Muller over a ChaCha stream).
pub struct GaussianSampler {
    rng: ChaCha8Rng,
    spare: Option<f64>,
}

impl GaussianSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            spare: None,
        }
    }

    pub fn next(&mut self) -> f64 {
        if let Some(value) = self.spare.take() {
            return value;
        }
        let u1: f64 = self.rng.gen_range(f64::MIN_POSITIVE..1.0);
        let u2: f64 = self.rng.gen();
        let radius = (-2.0 * u1.ln()).sqrt();
        let angle = 2.0 * std::f64::consts::PI * u2;
        self.spare = Some(radius * angle.sin());
        radius * angle.cos()
    }

    pub fn matrix(&mut self, rows: usize, cols: usize) -> Mat<f64> {
        let mut m = Mat::zeros(rows, cols);
        for i in 0..rows {
            for j in 0..cols {
                m[(i, j)] = self.next();
            }
        }
        m
    }
}

/// Regression data with one Y-correlated latent direction, one
/// Y-orthogonal direction and additive noise.
pub fn generate_latent_data(
    n_samples: usize,
    n_features: usize,
    noise_std: f64,
    seed: u64,
) -> (Mat<f64>, Mat<f64>) {
    let mut sampler = GaussianSampler::new(seed);

    let mut x = Mat::zeros(n_samples, n_features);
    let mut y = Mat::zeros(n_samples, 1);
    for i in 0..n_samples {
        let signal = sampler.next();
        let ortho = sampler.next();
        for j in 0..n_features {
            let load_signal = ((j + 1) as f64 / n_features as f64) * 2.0;
            let load_ortho = ((n_features - j) as f64 / n_features as f64) * 1.5;
            x[(i, j)] = signal * load_signal + ortho * load_ortho + noise_std * sampler.next();
        }
        y[(i, 0)] = 2.0 * signal + 0.3;
    }
    (x, y)
}

/// Two Gaussian clusters in `n_features` dimensions with the given mean
/// separation (in units of the unit noise standard deviation), labeled 0/1.
pub fn generate_clusters(
    n_per_class: usize,
    n_features: usize,
    separation: f64,
    seed: u64,
) -> (Mat<f64>, Vec<usize>) {
    let mut sampler = GaussianSampler::new(seed);
    let n = 2 * n_per_class;

    let mut x = Mat::zeros(n, n_features);
    let mut labels = Vec::with_capacity(n);
    for i in 0..n {
        let class = i / n_per_class;
        labels.push(class);
        let center = if class == 0 { 0.0 } else { separation };
        for j in 0..n_features {
            x[(i, j)] = center + sampler.next();
        }
    }
    (x, labels)
}

/// Pure noise matrix plus independently drawn random binary labels.
pub fn generate_null_data(n_samples: usize, n_features: usize, seed: u64) -> (Mat<f64>, Vec<usize>) {
    let mut sampler = GaussianSampler::new(seed);
    let x = sampler.matrix(n_samples, n_features);

    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(0x9e3779b97f4a7c15));
    let labels: Vec<usize> = (0..n_samples).map(|_| usize::from(rng.gen::<bool>())).collect();
    (x, labels)
}
