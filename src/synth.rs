//! Synthetic spectra and maps with known weights.
//!
//! Used by the demo binary and the test suites: reference spectra are
//! unit-height Gaussians, weights are drawn uniformly from a range, and
//! observations are the exact (optionally noisy) mixture.

use ndarray::{Array1, Array2, ArrayD};

use crate::error::Result;
use crate::fit::layout::{leading_to_axis, normalize_axis};

pub fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Reference matrix `(x.len(), centers.len())`; column `n` is a unit-height
/// Gaussian at `centers[n]` with standard deviation `std_devs[n]`.
pub fn gaussian_references(x: &Array1<f64>, centers: &[f64], std_devs: &[f64]) -> Array2<f64> {
    assert_eq!(
        centers.len(),
        std_devs.len(),
        "one standard deviation per center"
    );
    Array2::from_shape_fn((x.len(), centers.len()), |(i, n)| {
        gaussian(x[i], centers[n], std_devs[n], 1.0)
    })
}

// ---------------------------------------------------------------------------
// SimpleRng – deterministic xoshiro256**
// ---------------------------------------------------------------------------

/// Minimal deterministic PRNG (xoshiro256**), so synthetic data is
/// reproducible from a seed.
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    pub fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform in `[lo, hi)`.
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Box-Muller transform for normal distribution
    pub fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

// ---------------------------------------------------------------------------
// SyntheticMap – observations with known weights
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SyntheticParams {
    /// Number of channels on the energy axis.
    pub n_points: usize,
    pub x_range: (f64, f64),
    pub n_references: usize,
    /// Gaussian centers are spread evenly over this range.
    pub center_range: (f64, f64),
    /// Standard deviations are drawn uniformly from this range.
    pub std_range: (f64, f64),
    pub weight_range: (f64, f64),
    /// Pixel dimensions; empty for a single spectrum.
    pub pixel_dims: Vec<usize>,
    /// Where the spectral axis ends up in `data` (and the reference axis
    /// in `weights`). Negative values count from the end.
    pub axis: isize,
    /// Standard deviation of additive Gaussian noise.
    pub noise: f64,
    pub seed: u64,
}

impl Default for SyntheticParams {
    fn default() -> Self {
        Self {
            n_points: 101,
            x_range: (0.0, 100.0),
            n_references: 3,
            center_range: (20.0, 80.0),
            std_range: (10.0, 20.0),
            weight_range: (0.1, 1.0),
            pixel_dims: vec![8],
            axis: 0,
            noise: 0.0,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticMap {
    /// Energy axis values.
    pub x: Array1<f64>,
    /// `(n_points, n_references)`.
    pub references: Array2<f64>,
    /// True weights, reference axis at `axis`.
    pub weights: ArrayD<f64>,
    /// Observations, spectral axis at `axis`.
    pub data: ArrayD<f64>,
}

impl SyntheticMap {
    pub fn generate(params: &SyntheticParams) -> Result<Self> {
        let ndim = params.pixel_dims.len() + 1;
        let axis = normalize_axis(params.axis, ndim)?;
        let mut rng = SimpleRng::new(params.seed);

        let x = Array1::linspace(params.x_range.0, params.x_range.1, params.n_points);
        let centers = Array1::linspace(
            params.center_range.0,
            params.center_range.1,
            params.n_references,
        )
        .to_vec();
        let std_devs: Vec<f64> = (0..params.n_references)
            .map(|_| rng.uniform(params.std_range.0, params.std_range.1))
            .collect();
        let references = gaussian_references(&x, &centers, &std_devs);

        let n_pixels: usize = params.pixel_dims.iter().product();
        let (lo, hi) = params.weight_range;
        let weights = Array2::from_shape_fn((params.n_references, n_pixels), |_| {
            rng.uniform(lo, hi)
        });
        let mut data = references.dot(&weights);
        if params.noise > 0.0 {
            data.mapv_inplace(|v| v + rng.gauss(0.0, params.noise));
        }

        Ok(SyntheticMap {
            x,
            weights: leading_to_axis(weights, &params.pixel_dims, axis),
            data: leading_to_axis(data, &params.pixel_dims, axis),
            references,
        })
    }
}
