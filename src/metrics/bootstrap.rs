//! Bootstrap confidence intervals for the mean of a sample.
//!
//! Each replicate resamples the data with replacement and records the resample mean. The
//! interval bounds are percentiles of those means. Replicates are evaluated in parallel; each
//! one owns a Xoshiro256++ stream whose seed is drawn sequentially from a master stream, so a
//! fixed [`BootstrapConfig::seed`] gives identical results regardless of the thread count.

use anyhow::anyhow;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use single_utilities::traits::FloatOpsTS;
use tracing::debug;

use crate::metrics::utils::{cast, mean, percentile};

#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Number of resamples drawn
    pub num_bootstrap: usize,
    /// Confidence level in percent, e.g. `95.0`
    pub ci: f64,
    /// Seed of the master stream; drawn from the thread-local RNG when `None`
    pub seed: Option<u64>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        BootstrapConfig {
            num_bootstrap: 10_000,
            ci: 95.0,
            seed: None,
        }
    }
}

impl BootstrapConfig {
    pub fn with_num_bootstrap(mut self, num_bootstrap: usize) -> Self {
        self.num_bootstrap = num_bootstrap;
        self
    }

    pub fn with_ci(mut self, ci: f64) -> Self {
        self.ci = ci;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Percentiles of the bootstrap distribution bounding the two-tailed interval.
    pub fn percentile_bounds(&self) -> (f64, f64) {
        let tail = (100.0 - self.ci) / 2.0;
        (tail, 100.0 - tail)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.num_bootstrap == 0 {
            return Err(anyhow!("Number of bootstrap samples must be positive"));
        }
        if !(self.ci > 0.0 && self.ci <= 100.0) {
            return Err(anyhow!(
                "Confidence level must be in (0, 100], got {}",
                self.ci
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct BootstrapResult<T> {
    /// Mean of the original sample
    pub mean: T,
    /// Lower bound of the confidence interval
    pub lower: T,
    /// Upper bound of the confidence interval
    pub upper: T,
    /// Mean of every bootstrap resample, in replicate order
    pub bootstrap_means: Vec<T>,
}

impl<T> BootstrapResult<T>
where
    T: FloatOpsTS,
{
    pub fn width(&self) -> T {
        self.upper - self.lower
    }

    pub fn contains(&self, value: T) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// Estimate a percentile bootstrap confidence interval for the population mean.
///
/// # Arguments
///
/// * `data` - The observed sample
/// * `config` - Number of replicates, confidence level and optional seed
///
/// # Returns
///
/// The sample mean, the interval bounds and all bootstrap means. Fails on an empty sample or
/// an invalid configuration.
pub fn bootstrap_confidence_interval<T>(
    data: &[T],
    config: &BootstrapConfig,
) -> anyhow::Result<BootstrapResult<T>>
where
    T: FloatOpsTS,
{
    config.validate()?;
    let sample_mean = mean(data).ok_or_else(|| anyhow!("Empty sample"))?;

    let n = data.len();
    let n_t = cast::<T>(n as f64);

    let master_seed = config.seed.unwrap_or_else(|| rand::rng().random());
    let mut master = Xoshiro256PlusPlus::seed_from_u64(master_seed);
    let replicate_seeds: Vec<u64> = (0..config.num_bootstrap)
        .map(|_| master.random())
        .collect();

    let bootstrap_means: Vec<T> = replicate_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
            let mut sum = T::zero();
            for _ in 0..n {
                sum += data[rng.random_range(0..n)];
            }
            sum / n_t
        })
        .collect();

    let (lower_q, upper_q) = config.percentile_bounds();
    let lower = percentile(&bootstrap_means, lower_q).ok_or_else(|| anyhow!("Empty sample"))?;
    let upper = percentile(&bootstrap_means, upper_q).ok_or_else(|| anyhow!("Empty sample"))?;

    debug!(
        n,
        num_bootstrap = config.num_bootstrap,
        ci = config.ci,
        "bootstrap interval computed"
    );

    Ok(BootstrapResult {
        mean: sample_mean,
        lower,
        upper,
        bootstrap_means,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_empty_sample_fails() {
        let result = bootstrap_confidence_interval::<f64>(&[], &BootstrapConfig::default());
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().to_string(), "Empty sample");
    }

    #[test]
    fn test_invalid_config_fails() {
        let data = vec![1.0, 2.0, 3.0];
        let zero_reps = BootstrapConfig::default().with_num_bootstrap(0);
        assert!(bootstrap_confidence_interval(&data, &zero_reps).is_err());

        let bad_ci = BootstrapConfig::default().with_ci(120.0);
        assert!(bootstrap_confidence_interval(&data, &bad_ci).is_err());

        let zero_ci = BootstrapConfig::default().with_ci(0.0);
        assert!(bootstrap_confidence_interval(&data, &zero_ci).is_err());
    }

    #[test]
    fn test_constant_sample_collapses_interval() {
        let data = vec![2.5; 40];
        for ci in [50.0, 90.0, 95.0, 99.0] {
            let config = BootstrapConfig::default()
                .with_num_bootstrap(200)
                .with_ci(ci)
                .with_seed(3);
            let result = bootstrap_confidence_interval(&data, &config).unwrap();
            assert_eq!(result.mean, 2.5);
            assert_eq!(result.lower, 2.5);
            assert_eq!(result.upper, 2.5);
            assert_eq!(result.width(), 0.0);
        }
    }

    #[test]
    fn test_seed_is_reproducible() {
        let data: Vec<f64> = (0..50).map(|i| (i as f64 * 0.37).sin()).collect();
        let config = BootstrapConfig::default()
            .with_num_bootstrap(500)
            .with_seed(42);

        let a = bootstrap_confidence_interval(&data, &config).unwrap();
        let b = bootstrap_confidence_interval(&data, &config).unwrap();
        assert_eq!(a.bootstrap_means, b.bootstrap_means);
        assert_eq!(a.lower, b.lower);
        assert_eq!(a.upper, b.upper);
    }

    #[test]
    fn test_interval_brackets_mean() {
        let data: Vec<f64> = (1..=100).map(|i| i as f64).collect();
        let config = BootstrapConfig::default()
            .with_num_bootstrap(2000)
            .with_seed(7);
        let result = bootstrap_confidence_interval(&data, &config).unwrap();

        assert_abs_diff_eq!(result.mean, 50.5);
        assert_eq!(result.bootstrap_means.len(), 2000);
        assert!(result.lower < result.mean && result.mean < result.upper);
        assert!(result.contains(50.5));

        // Standard error of the mean is ~2.9, so the 95% interval is roughly +-5.7
        assert!(result.width() > 8.0 && result.width() < 15.0);
    }

    #[test]
    fn test_percentile_bounds() {
        let config = BootstrapConfig::default();
        assert_eq!(config.percentile_bounds(), (2.5, 97.5));
        assert_eq!(config.with_ci(100.0).percentile_bounds(), (0.0, 100.0));
    }
}
