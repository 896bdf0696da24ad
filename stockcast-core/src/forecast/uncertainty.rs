//! Simulation helpers for uncertainty intervals.
//!
//! Future trend uncertainty assumes changepoints keep arriving at the rate and
//! with the average magnitude seen in history. Each sample draws its own set
//! of future changepoints; bounds are empirical quantiles across samples.

use rand::Rng;
use rand_distr::{Distribution, Exp1, Poisson};

/// Future changepoints drawn for one simulation sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendPath {
    changepoints: Vec<f64>,
    deltas: Vec<f64>,
}

impl TrendPath {
    /// Draw future changepoints on `(1, t_max)`.
    ///
    /// The count is Poisson with mean `n_hist * (t_max - 1)`; magnitudes are
    /// Laplace with scale `mean_abs_delta`. No history changepoints, or no
    /// future, means a path identical to the fitted trend.
    pub fn sample<R: Rng>(
        rng: &mut R,
        n_hist: usize,
        mean_abs_delta: f64,
        t_max: f64,
    ) -> Self {
        let rate = n_hist as f64 * (t_max - 1.0);
        if n_hist == 0 || t_max <= 1.0 || !rate.is_finite() {
            return Self::default();
        }
        let count = match Poisson::new(rate) {
            Ok(poisson) => poisson.sample(rng) as usize,
            Err(_) => 0,
        };

        let mut changepoints: Vec<f64> = (0..count).map(|_| rng.gen_range(1.0..t_max)).collect();
        changepoints.sort_by(f64::total_cmp);
        let deltas = (0..count).map(|_| laplace(rng, mean_abs_delta)).collect();

        Self {
            changepoints,
            deltas,
        }
    }

    pub fn len(&self) -> usize {
        self.changepoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changepoints.is_empty()
    }

    /// Deviation from the fitted trend at scaled time `t`.
    pub fn offset(&self, t: f64) -> f64 {
        self.changepoints
            .iter()
            .zip(&self.deltas)
            .take_while(|(s, _)| **s < t)
            .map(|(&s, &d)| d * (t - s))
            .sum()
    }
}

fn laplace<R: Rng>(rng: &mut R, scale: f64) -> f64 {
    let magnitude: f64 = Exp1.sample(rng);
    if rng.gen::<bool>() {
        magnitude * scale
    } else {
        -magnitude * scale
    }
}

/// Linear-interpolation quantile of an ascending slice.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// Central interval of the given width over simulated values (sorted in place).
pub fn interval(values: &mut [f64], width: f64) -> (f64, f64) {
    values.sort_by(f64::total_cmp);
    let tail = (1.0 - width) / 2.0;
    (quantile(values, tail), quantile(values, 1.0 - tail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SeedHierarchy;

    #[test]
    fn quantile_interpolates() {
        let v = [0.0, 10.0, 20.0, 30.0, 40.0];
        assert_eq!(quantile(&v, 0.0), 0.0);
        assert_eq!(quantile(&v, 0.5), 20.0);
        assert_eq!(quantile(&v, 1.0), 40.0);
        assert!((quantile(&v, 0.1) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn interval_brackets_median() {
        let mut v: Vec<f64> = (0..1000).rev().map(f64::from).collect();
        let (lo, hi) = interval(&mut v, 0.8);
        assert!((lo - 99.9).abs() < 1e-9);
        assert!((hi - 899.1).abs() < 1e-9);
    }

    #[test]
    fn no_future_means_no_changepoints() {
        let mut rng = SeedHierarchy::new(0).rng_for("trend", 0);
        assert!(TrendPath::sample(&mut rng, 25, 0.1, 1.0).is_empty());
        assert!(TrendPath::sample(&mut rng, 0, 0.1, 2.0).is_empty());
    }

    #[test]
    fn path_only_affects_future() {
        let seeds = SeedHierarchy::new(0);
        for i in 0..20 {
            let path = TrendPath::sample(&mut seeds.rng_for("trend", i), 25, 0.5, 3.0);
            assert_eq!(path.offset(0.5), 0.0);
            assert_eq!(path.offset(1.0), 0.0);
        }
    }

    #[test]
    fn sampling_is_deterministic() {
        let seeds = SeedHierarchy::new(7);
        let a = TrendPath::sample(&mut seeds.rng_for("trend", 3), 25, 0.2, 1.5);
        let b = TrendPath::sample(&mut seeds.rng_for("trend", 3), 25, 0.2, 1.5);
        assert_eq!(a, b);
    }
}
