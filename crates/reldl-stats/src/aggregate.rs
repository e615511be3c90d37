//! Batch-mean estimator with a normal-approximation confidence interval
//! (spec.md §4.7).

/// A single weighted observation fed into the aggregator. Under regular
/// Monte-Carlo, `weight` is always `1.0`; under importance sampling it is
/// the per-iteration likelihood ratio.
#[derive(Clone, Copy, Debug)]
pub struct Sample {
    pub value: f64,
    pub weight: f64,
}

/// Summary statistics over a batch of weighted samples.
#[derive(Clone, Copy, Debug)]
pub struct AggregateResult {
    pub mean: f64,
    pub variance: f64,
    /// Half-width of the 95% confidence interval under a normal
    /// approximation.
    pub half_width: f64,
    /// `100 * half_width / mean`; `f64::INFINITY` when `mean == 0`.
    pub relative_error_pct: f64,
    pub num_samples: usize,
    pub num_zeroes: usize,
}

/// The Z-score for a two-sided 95% confidence interval under a normal
/// approximation.
const Z_95: f64 = 1.959_963_984_540_054;

/// Accumulates weighted samples and produces the batch-mean estimator.
#[derive(Debug, Default)]
pub struct SampleAggregator {
    samples: Vec<Sample>,
}

impl SampleAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self { samples: Vec::new() }
    }

    pub fn record(&mut self, value: f64, weight: f64) {
        self.samples.push(Sample { value, weight });
    }

    pub fn extend(&mut self, samples: impl IntoIterator<Item = Sample>) {
        self.samples.extend(samples);
    }

    #[must_use]
    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    /// Summarize the batch: `value * weight` is the per-iteration
    /// contribution to the estimator (spec.md §4.6's `(1 if loss else 0)
    /// * L`), and `num_zeroes` counts samples whose contribution is
    /// exactly zero — useful for diagnosing under-biasing in importance
    /// sampling.
    #[must_use]
    pub fn summarize(&self) -> AggregateResult {
        let n = self.samples.len();
        if n == 0 {
            return AggregateResult {
                mean: 0.0,
                variance: 0.0,
                half_width: 0.0,
                relative_error_pct: f64::INFINITY,
                num_samples: 0,
                num_zeroes: 0,
            };
        }

        let contributions: Vec<f64> = self.samples.iter().map(|s| s.value * s.weight).collect();
        let num_zeroes = contributions.iter().filter(|&&c| c == 0.0).count();

        let mean = contributions.iter().sum::<f64>() / n as f64;
        let variance = if n > 1 {
            contributions.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };

        let std_error = (variance / n as f64).sqrt();
        let half_width = Z_95 * std_error;
        let relative_error_pct = if mean == 0.0 {
            f64::INFINITY
        } else {
            100.0 * half_width / mean
        };

        AggregateResult {
            mean,
            variance,
            half_width,
            relative_error_pct,
            num_samples: n,
            num_zeroes,
        }
    }
}
