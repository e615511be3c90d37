//! 3-parameter Weibull distribution: pdf, cdf, hazard rate, sampling, and
//! the draws the semi-Markov simulators need (spec.md §4.1).

use crate::numeric;
use rand::Rng;
use reldl_types::WeibullParams;

/// A Weibull(shape, scale, location) distribution. When `shape == 1` this
/// is Exponential with constant hazard `1 / scale`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Weibull {
    pub shape: f64,
    pub scale: f64,
    pub location: f64,
}

impl From<WeibullParams> for Weibull {
    fn from(p: WeibullParams) -> Self {
        Self::new(p.shape, p.scale, p.location)
    }
}

impl Weibull {
    #[must_use]
    pub const fn new(shape: f64, scale: f64, location: f64) -> Self {
        Self { shape, scale, location }
    }

    /// Is this distribution degenerate to Exponential?
    #[must_use]
    pub fn is_exponential(&self) -> bool {
        (self.shape - 1.0).abs() < f64::EPSILON
    }

    /// Probability density at `x`. Zero for `x < location`.
    #[must_use]
    pub fn pdf(&self, x: f64) -> f64 {
        if x < self.location {
            return 0.0;
        }
        let a = self.shape / self.scale;
        let b = ((x - self.location) / self.scale).powf(self.shape - 1.0);
        let c = (-((x - self.location) / self.scale).powf(self.shape)).exp();
        a * b * c
    }

    /// P(X <= x). Zero for `x < location`.
    #[must_use]
    pub fn cdf(&self, x: f64) -> f64 {
        if x < self.location {
            return 0.0;
        }
        1.0 - (-((x - self.location) / self.scale).powf(self.shape)).exp()
    }

    /// Instantaneous failure rate at `x`. Constant `1/scale` when
    /// `shape == 1`; otherwise `pdf(x) / (1 - cdf(x))`, evaluated through
    /// [`numeric::hazard_ratio`] so the `1 - cdf` denominator doesn't
    /// underflow to zero for large `x`.
    #[must_use]
    pub fn hazard(&self, x: f64) -> f64 {
        if x < self.location {
            return 0.0;
        }
        if self.is_exponential() {
            return 1.0 / self.scale;
        }
        numeric::hazard_ratio(self.pdf(x), self.cdf(x))
    }

    /// Maximum hazard rate over `[0, mission_time]`, evaluated at 10
    /// equally spaced points (spec.md §4.1). `shape == 1` short-circuits
    /// to the constant `1/scale`.
    #[must_use]
    pub fn max_hazard_rate(&self, mission_time: f64) -> f64 {
        if self.is_exponential() {
            return 1.0 / self.scale;
        }
        let mut max = 0.0_f64;
        for i in 0..=10 {
            let t = mission_time * f64::from(i) / 10.0;
            let h = self.hazard(t);
            if h.is_finite() && h > max {
                max = h;
            }
        }
        max
    }

    /// Direct sample: `scale * (-ln U)^(1/shape) + location`, `U ~
    /// Uniform(0,1)`.
    pub fn draw(&self, rng: &mut impl Rng) -> f64 {
        let u: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
        self.scale * (-u.ln()).powf(1.0 / self.shape) + self.location
    }

    /// Reject draws at or below `lower`.
    pub fn draw_truncated(&self, lower: f64, rng: &mut impl Rng) -> f64 {
        loop {
            let v = self.draw(rng);
            if v > lower {
                return v;
            }
        }
    }

    /// Conditional waiting-time draw given the component has already aged
    /// `curr_time`: `((-scale^shape * ln U) + curr_time^shape)^(1/shape) -
    /// curr_time`.
    pub fn draw_inverse_transform(&self, curr_time: f64, rng: &mut impl Rng) -> f64 {
        let u: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
        let inner = -self.scale.powf(self.shape) * u.ln() + curr_time.powf(self.shape);
        (inner.powf(1.0 / self.shape) - curr_time).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn exponential_hazard_is_constant() {
        let w = Weibull::new(1.0, 87_600.0, 0.0);
        assert!((w.hazard(0.0) - 1.0 / 87_600.0).abs() < 1e-12);
        assert!((w.hazard(50_000.0) - 1.0 / 87_600.0).abs() < 1e-12);
    }

    #[test]
    fn exponential_mean_within_two_percent() {
        let w = Weibull::new(1.0, 1000.0, 0.0);
        let mut rng = SmallRng::seed_from_u64(42);
        let n = 100_000;
        let sum: f64 = (0..n).map(|_| w.draw(&mut rng)).sum();
        let mean = sum / f64::from(n);
        assert!(
            (mean - 1000.0).abs() / 1000.0 < 0.02,
            "empirical mean {mean} not within 2% of scale 1000.0"
        );
    }

    #[test]
    fn pdf_cdf_zero_below_location() {
        let w = Weibull::new(1.5, 10.0, 5.0);
        assert_eq!(w.pdf(4.9), 0.0);
        assert_eq!(w.cdf(4.9), 0.0);
    }

    #[test]
    fn max_hazard_rate_matches_exponential_shortcut() {
        let w = Weibull::new(1.0, 500.0, 0.0);
        assert!((w.max_hazard_rate(10_000.0) - 1.0 / 500.0).abs() < 1e-12);
    }

    #[test]
    fn max_hazard_rate_increasing_shape_grows_with_time() {
        // shape > 1: increasing hazard rate, so the max over [0, T] should
        // sit near the right end of the interval.
        let w = Weibull::new(2.0, 1000.0, 0.0);
        let max = w.max_hazard_rate(2000.0);
        assert!(max >= w.hazard(1000.0));
    }

    #[test]
    fn draw_truncated_never_returns_at_or_below_lower() {
        let w = Weibull::new(1.2, 100.0, 0.0);
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..1000 {
            let v = w.draw_truncated(50.0, &mut rng);
            assert!(v > 50.0);
        }
    }

    #[test]
    fn inverse_transform_consistent_with_draw_at_zero() {
        // KS-style sanity check: compare empirical means rather than a
        // full KS test, which would need an external statistics crate.
        let w = Weibull::new(1.3, 200.0, 0.0);
        let mut rng = SmallRng::seed_from_u64(99);
        let n = 20_000;
        let direct_mean: f64 =
            (0..n).map(|_| w.draw(&mut rng)).sum::<f64>() / f64::from(n);
        let inv_mean: f64 = (0..n)
            .map(|_| w.draw_inverse_transform(0.0, &mut rng))
            .sum::<f64>()
            / f64::from(n);
        assert!(
            (direct_mean - inv_mean).abs() / direct_mean < 0.05,
            "direct mean {direct_mean} vs inverse-transform mean {inv_mean} diverge by more than 5%"
        );
    }
}
