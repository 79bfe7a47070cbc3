//! Cue-group-size frequency models.
//!
//! The default model is a zero-truncated negative binomial (ZTNB): support
//! starts at 1, the zero count is excluded and the remaining mass renormalized.
//! With `beta = 0.6, r = 3` most mass sits on small groups, which is what
//! makes singular/plural marking learnable early.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::prng::Prng;

/// Largest `k` whose factorial fits in a `u64`.
pub const MAX_SUPPORT_POINT: u32 = 20;

/// Shape parameters of the ZTNB law.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZtnbParams {
    /// Dispersion.
    pub beta: f64,
    /// Size.
    pub r: f64,
}

impl Default for ZtnbParams {
    fn default() -> Self {
        Self { beta: 0.6, r: 3.0 }
    }
}

impl ZtnbParams {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.beta.is_finite() && self.beta > 0.0) {
            return Err(SimError::domain(format!(
                "beta must be finite and > 0 (got {})",
                self.beta
            )));
        }
        if !(self.r.is_finite() && self.r > 0.0) {
            return Err(SimError::domain(format!(
                "r must be finite and > 0 (got {})",
                self.r
            )));
        }
        Ok(())
    }
}

/// How trial frequencies per group size are chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyModel {
    /// Zero-truncated negative binomial with the run's `beta`/`r`.
    #[default]
    Ztnb,
    /// Normalized uniform draws; one fresh distribution per run.
    Random,
    /// Gamma-weighted random draws; one fresh distribution per run.
    Dirichlet,
}

impl FrequencyModel {
    /// One probability per group size `1..=max_numerosity`.
    ///
    /// `Ztnb` is not renormalized over the finite range; the synthesizer fills
    /// the missing tail mass with uniformly sized top-up trials.
    pub fn probabilities(
        &self,
        max_numerosity: u32,
        params: ZtnbParams,
        rng: &mut Prng,
    ) -> SimResult<Vec<f64>> {
        match self {
            FrequencyModel::Ztnb => ztnb_probabilities(max_numerosity, params),
            FrequencyModel::Random => Ok(random_probabilities(max_numerosity, rng)),
            FrequencyModel::Dirichlet => dirichlet_probabilities(max_numerosity, rng),
        }
    }
}

/// Exact `k!` for `k <= 20`.
fn factorial(k: u32) -> Option<u64> {
    (2..=u64::from(k)).try_fold(1u64, |acc, i| acc.checked_mul(i))
}

/// Probability mass of the ZTNB law at support point `k`.
///
/// ```text
/// r (r+1) ... (r+k-1)
/// ------------------------------  * (beta / (1+beta))^k
/// k! * ((1+beta)^r - 1)
/// ```
pub fn truncated_mass(k: u32, beta: f64, r: f64) -> SimResult<f64> {
    ZtnbParams { beta, r }.validate()?;
    if k < 1 {
        return Err(SimError::domain("support point k must be >= 1"));
    }
    let fact = factorial(k).ok_or_else(|| {
        SimError::domain(format!(
            "support point k={k} exceeds {MAX_SUPPORT_POINT} (factorial overflow)"
        ))
    })?;

    let mut top = r;
    for i in 1..k {
        top *= r + f64::from(i);
    }
    top /= fact as f64 * ((1.0 + beta).powf(r) - 1.0);
    top *= (beta / (1.0 + beta)).powi(k as i32);
    Ok(top)
}

/// ZTNB masses for `1..=max_numerosity`.
pub fn ztnb_probabilities(max_numerosity: u32, params: ZtnbParams) -> SimResult<Vec<f64>> {
    let probs = (1..=max_numerosity)
        .map(|k| truncated_mass(k, params.beta, params.r))
        .collect::<SimResult<Vec<f64>>>()?;
    debug!(
        beta = params.beta,
        r = params.r,
        covered = probs.iter().sum::<f64>(),
        "ztnb frequencies computed"
    );
    Ok(probs)
}

/// Uniform draws normalized to sum to one.
pub fn random_probabilities(max_numerosity: u32, rng: &mut Prng) -> Vec<f64> {
    let mut probs: Vec<f64> = (0..max_numerosity).map(|_| rng.next_f64_01()).collect();
    let total: f64 = probs.iter().sum();
    if total > 0.0 {
        for p in &mut probs {
            *p /= total;
        }
    } else if !probs.is_empty() {
        // All draws hit exactly zero; fall back to a flat distribution.
        let flat = 1.0 / probs.len() as f64;
        probs.iter_mut().for_each(|p| *p = flat);
    }
    probs
}

/// Density of the gamma law with shape `k` and scale `theta` at `x`.
fn gamma_pdf(k: u32, theta: f64, x: f64) -> SimResult<f64> {
    let g = k
        .checked_sub(1)
        .and_then(factorial)
        .ok_or_else(|| SimError::domain(format!("gamma shape {k} outside 1..=21")))?;
    Ok(x.powi(k as i32 - 1) * (-x / theta).exp() / (g as f64 * theta.powi(k as i32)))
}

/// For every group size, draw `x` uniformly from `1..=max+1` (rounded) and
/// weight it by the gamma(`max`, 1) density; then normalize.
pub fn dirichlet_probabilities(max_numerosity: u32, rng: &mut Prng) -> SimResult<Vec<f64>> {
    let max = f64::from(max_numerosity);
    let mut probs = (0..max_numerosity)
        .map(|_| {
            let x = (rng.next_f64_01() * max).round() + 1.0;
            gamma_pdf(max_numerosity, 1.0, x)
        })
        .collect::<SimResult<Vec<f64>>>()?;
    let total: f64 = probs.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(SimError::domain(format!(
            "dirichlet weights sum to {total}"
        )));
    }
    for p in &mut probs {
        *p /= total;
    }
    Ok(probs)
}

/// Euclidean distance between two distributions over the same group sizes.
pub fn distance(a: &[f64], b: &[f64]) -> SimResult<f64> {
    if a.len() != b.len() {
        return Err(SimError::invariant(format!(
            "distributions cover {} and {} group sizes",
            a.len(),
            b.len()
        )));
    }
    Ok(a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mass_at_one_matches_closed_form() {
        let expected = 3.0 / (1.6f64.powi(3) - 1.0) * (0.6 / 1.6);
        let got = truncated_mass(1, 0.6, 3.0).unwrap();
        assert!((got - expected).abs() < 1e-9, "got {got}, want {expected}");
        assert!((got - 0.363_372_093_023_255_8).abs() < 1e-9);
    }

    #[test]
    fn mass_at_two_uses_rising_factorial() {
        // r(r+1) / 2! / ((1+beta)^r - 1) * (beta/(1+beta))^2
        let expected = 3.0 * 4.0 / 2.0 / (1.6f64.powi(3) - 1.0) * (0.375f64).powi(2);
        let got = truncated_mass(2, 0.6, 3.0).unwrap();
        assert!((got - expected).abs() < 1e-12);
    }

    #[test]
    fn partial_sums_increase_and_approach_one() {
        for &(beta, r) in &[(0.6, 3.0), (0.3, 2.0), (1.0, 1.0)] {
            let mut prev = 0.0;
            let mut sum = 0.0;
            for k in 1..=12 {
                sum += truncated_mass(k, beta, r).unwrap();
                assert!(sum > prev, "beta={beta} r={r} k={k}: not increasing");
                assert!(sum < 1.0, "beta={beta} r={r} k={k}: sum {sum} >= 1");
                prev = sum;
            }
            assert!(1.0 - sum < 1e-3, "beta={beta} r={r}: tail {} too big", 1.0 - sum);
        }
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(matches!(truncated_mass(1, 0.0, 3.0), Err(SimError::Domain(_))));
        assert!(matches!(truncated_mass(1, -0.1, 3.0), Err(SimError::Domain(_))));
        assert!(matches!(truncated_mass(1, 0.6, 0.0), Err(SimError::Domain(_))));
        assert!(matches!(truncated_mass(1, f64::NAN, 3.0), Err(SimError::Domain(_))));
        assert!(matches!(truncated_mass(0, 0.6, 3.0), Err(SimError::Domain(_))));
        assert!(matches!(truncated_mass(21, 0.6, 3.0), Err(SimError::Domain(_))));
    }

    #[test]
    fn factorial_is_exact() {
        assert_eq!(factorial(1), Some(1));
        assert_eq!(factorial(7), Some(5040));
        assert_eq!(factorial(20), Some(2_432_902_008_176_640_000));
        assert_eq!(factorial(21), None);
    }

    #[test]
    fn random_model_is_normalized() {
        let mut rng = Prng::new(5);
        let probs = FrequencyModel::Random
            .probabilities(7, ZtnbParams::default(), &mut rng)
            .unwrap();
        assert_eq!(probs.len(), 7);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(probs.iter().all(|&p| p >= 0.0));
    }

    #[test]
    fn dirichlet_model_is_normalized() {
        let mut rng = Prng::new(9);
        for max in [1, 7, 20] {
            let probs = FrequencyModel::Dirichlet
                .probabilities(max, ZtnbParams::default(), &mut rng)
                .unwrap();
            assert_eq!(probs.len(), max as usize);
            assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12, "max={max}");
            assert!(probs.iter().all(|&p| p > 0.0));
        }
    }

    #[test]
    fn gamma_density_matches_closed_form() {
        // shape 7, scale 1 at x = 6: 6^6 e^-6 / 6!
        let expected = 6f64.powi(6) * (-6f64).exp() / 720.0;
        assert!((gamma_pdf(7, 1.0, 6.0).unwrap() - expected).abs() < 1e-15);
        assert!(matches!(gamma_pdf(0, 1.0, 1.0), Err(SimError::Domain(_))));
    }

    #[test]
    fn distance_is_euclidean() {
        assert_eq!(distance(&[0.0, 0.0], &[3.0, 4.0]).unwrap(), 5.0);
        assert_eq!(distance(&[0.2, 0.8], &[0.2, 0.8]).unwrap(), 0.0);
        assert!(matches!(
            distance(&[1.0], &[0.5, 0.5]),
            Err(SimError::InvariantViolation(_))
        ));
    }

    #[test]
    fn ztnb_model_ignores_rng() {
        let mut a = Prng::new(1);
        let mut b = Prng::new(2);
        let pa = FrequencyModel::Ztnb
            .probabilities(7, ZtnbParams::default(), &mut a)
            .unwrap();
        let pb = FrequencyModel::Ztnb
            .probabilities(7, ZtnbParams::default(), &mut b)
            .unwrap();
        assert_eq!(pa, pb);
        assert!(pa.windows(2).all(|w| w[0] > w[1]), "mass decreases with k");
    }

    #[test]
    fn model_names_round_trip_through_json() {
        let m: FrequencyModel = serde_json::from_str("\"random\"").unwrap();
        assert_eq!(m, FrequencyModel::Random);
        let m: FrequencyModel = serde_json::from_str("\"dirichlet\"").unwrap();
        assert_eq!(m, FrequencyModel::Dirichlet);
        assert_eq!(serde_json::to_string(&FrequencyModel::Ztnb).unwrap(), "\"ztnb\"");
    }
}
