//! Density-based expression thresholds for a single marker gene.
//!
//! The threshold is read off a Gaussian kernel density estimate of the positive (already
//! log1p-transformed) expression values: the first local maximum of the density sampled on
//! an even grid, skipping a near-zero background peak when a second peak exists. Without any
//! local maximum the threshold falls back to a high percentile of the positive values.

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use statrs::distribution::{Continuous, Normal};

use crate::metrics::utils::percentile;

/// Rule for the kernel bandwidth factor, multiplied with the sample standard deviation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bandwidth {
    /// `n^(-1/5)`
    Scott,
    /// `(3n/4)^(-1/5)`
    Silverman,
    /// Fixed factor
    Factor(f64),
}

impl Bandwidth {
    pub fn factor(&self, n: usize) -> f64 {
        let n = n as f64;
        match self {
            Bandwidth::Scott => n.powf(-0.2),
            Bandwidth::Silverman => (n * 3.0 / 4.0).powf(-0.2),
            Bandwidth::Factor(f) => *f,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ThresholdParams {
    /// Number of evenly spaced points the density is sampled on
    pub grid_points: usize,
    /// Peaks below this value are treated as background when a later peak exists
    pub background_cutoff: f64,
    /// Percentile (0-100) of the positive values used when the density has no peak
    pub fallback_percentile: f64,
    pub bandwidth: Bandwidth,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        ThresholdParams {
            grid_points: 1_000,
            background_cutoff: 0.2,
            fallback_percentile: 99.0,
            bandwidth: Bandwidth::Scott,
        }
    }
}

impl ThresholdParams {
    pub fn with_grid_points(mut self, grid_points: usize) -> Self {
        self.grid_points = grid_points;
        self
    }

    pub fn with_background_cutoff(mut self, cutoff: f64) -> Self {
        self.background_cutoff = cutoff;
        self
    }

    pub fn with_fallback_percentile(mut self, q: f64) -> Self {
        self.fallback_percentile = q;
        self
    }

    pub fn with_bandwidth(mut self, bandwidth: Bandwidth) -> Self {
        self.bandwidth = bandwidth;
        self
    }
}

/// How a threshold value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdSource {
    /// No positive values, threshold is zero
    NoSignal,
    FirstPeak,
    /// First peak was background, the second peak was used
    SecondPeak,
    /// Density had no interior peak (or no kernel could be fitted)
    Percentile,
}

#[derive(Debug, Clone)]
pub struct Threshold {
    pub value: f64,
    pub source: ThresholdSource,
    /// Grid positions of all local maxima of the density, ascending
    pub peaks: Vec<f64>,
    /// Number of strictly positive values the estimate was based on
    pub n_positive: usize,
}

impl Threshold {
    fn zero() -> Self {
        Threshold {
            value: 0.0,
            source: ThresholdSource::NoSignal,
            peaks: Vec::new(),
            n_positive: 0,
        }
    }
}

/// One-dimensional Gaussian kernel density estimate.
#[derive(Debug, Clone)]
pub struct GaussianKde {
    samples: Vec<f64>,
    bandwidth: f64,
    kernel: Normal,
}

impl GaussianKde {
    /// Fit the estimator. Returns `None` when no kernel can be fitted: fewer than two
    /// samples, zero variance, or non-finite values.
    pub fn new(samples: Vec<f64>, bandwidth: Bandwidth) -> Option<Self> {
        let n = samples.len();
        if n < 2 {
            return None;
        }

        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = samples.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        let scale = variance.sqrt() * bandwidth.factor(n);
        if !scale.is_finite() || scale <= 0.0 {
            return None;
        }

        let kernel = Normal::new(0.0, scale).ok()?;
        Some(GaussianKde {
            samples,
            bandwidth: scale,
            kernel,
        })
    }

    /// Kernel standard deviation.
    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        let total: f64 = self.samples.iter().map(|&s| self.kernel.pdf(x - s)).sum();
        total / self.samples.len() as f64
    }

    pub fn evaluate_grid(&self, grid: &[f64]) -> Vec<f64> {
        grid.par_iter().map(|&x| self.evaluate(x)).collect()
    }
}

/// `n` evenly spaced values from `start` to `end`, both inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut grid: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            grid[n - 1] = end;
            grid
        }
    }
}

/// Indices of strict interior local maxima: `y[i] > y[i - 1]` and `y[i] > y[i + 1]`.
pub fn local_maxima(values: &[f64]) -> Vec<usize> {
    if values.len() < 3 {
        return Vec::new();
    }
    (1..values.len() - 1)
        .filter(|&i| values[i] > values[i - 1] && values[i] > values[i + 1])
        .collect()
}

/// Estimate the expression threshold of one gene within one group of cells.
///
/// # Arguments
///
/// * `values` - log1p-transformed expression values, one per cell
/// * `params` - Grid size, background cutoff, fallback percentile and bandwidth rule
///
/// # Returns
///
/// The threshold together with how it was chosen. All-zero (or empty) input yields zero.
pub fn estimate_threshold(values: &[f64], params: &ThresholdParams) -> Threshold {
    let positive: Vec<f64> = values.iter().copied().filter(|&x| x > 0.0).collect();
    if positive.is_empty() {
        return Threshold::zero();
    }

    let n_positive = positive.len();
    let (lo, hi) = positive
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
            (lo.min(x), hi.max(x))
        });

    let peaks: Vec<f64> = match GaussianKde::new(positive.clone(), params.bandwidth) {
        Some(kde) => {
            let grid = linspace(lo, hi, params.grid_points);
            let density = kde.evaluate_grid(&grid);
            local_maxima(&density).into_iter().map(|i| grid[i]).collect()
        }
        None => Vec::new(),
    };

    let (value, source) = match peaks.as_slice() {
        [] => (
            percentile(&positive, params.fallback_percentile).unwrap_or(0.0),
            ThresholdSource::Percentile,
        ),
        [first, second, ..] if *first < params.background_cutoff => {
            (*second, ThresholdSource::SecondPeak)
        }
        [first, ..] => (*first, ThresholdSource::FirstPeak),
    };

    Threshold {
        value,
        source,
        peaks,
        n_positive,
    }
}
