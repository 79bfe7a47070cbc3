//! Trial synthesis.
//!
//! Turns a per-group-size frequency distribution into a concrete, shuffled
//! trial sequence of exactly the requested length. Every generated trial is a
//! "ramp": a group of size `n` always shows cues `1..=n`.

use tracing::{debug, warn};

use crate::distribution::{ztnb_probabilities, ZtnbParams};
use crate::error::{SimError, SimResult};
use crate::language::MarkerId;
use crate::prng::Prng;

/// Dense index into the cue universe. Cue id `i` carries label `i + 1` in
/// generated runs.
pub type CueId = u32;

/// One learning event: co-present cues plus the marker that was observed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Trial {
    pub cues: Vec<CueId>,
    pub marker: MarkerId,
}

impl Trial {
    pub fn new(cues: Vec<CueId>, marker: MarkerId) -> Self {
        Self { cues, marker }
    }

    /// Cues `0..size` (labels `1..=size`).
    pub fn ramp(size: u32, marker: MarkerId) -> Self {
        Self {
            cues: (0..size).collect(),
            marker,
        }
    }

    pub fn size(&self) -> usize {
        self.cues.len()
    }
}

/// Generate `target_count` shuffled ramp trials whose sizes follow the ZTNB law.
///
/// `marker_for_n` must give a marker for every numerosity in
/// `1..=max_numerosity`.
pub fn generate_trials<F>(
    marker_for_n: F,
    target_count: usize,
    max_numerosity: u32,
    beta: f64,
    r: f64,
    rng: &mut Prng,
) -> SimResult<Vec<Trial>>
where
    F: Fn(u32) -> Option<MarkerId>,
{
    if max_numerosity < 1 {
        return Err(SimError::config("max_numerosity must be >= 1"));
    }
    let probabilities = ztnb_probabilities(max_numerosity, ZtnbParams { beta, r })?;
    generate_trials_from(&probabilities, marker_for_n, target_count, rng)
}

/// Same as [`generate_trials`] for an arbitrary distribution; `probabilities[i]`
/// is the share of trials with group size `i + 1`.
///
/// Counts are rounded half-to-even. If rounding overshoots the target, the
/// sequence is cut from the tail, which removes trials of the largest sizes
/// first. If it undershoots, the gap is filled with trials of uniformly random
/// size.
pub fn generate_trials_from<F>(
    probabilities: &[f64],
    marker_for_n: F,
    target_count: usize,
    rng: &mut Prng,
) -> SimResult<Vec<Trial>>
where
    F: Fn(u32) -> Option<MarkerId>,
{
    let max_numerosity = u32::try_from(probabilities.len())
        .map_err(|_| SimError::config("too many group sizes"))?;
    if max_numerosity < 1 {
        return Err(SimError::config("max_numerosity must be >= 1"));
    }

    let markers = (1..=max_numerosity)
        .map(|n| {
            marker_for_n(n)
                .ok_or_else(|| SimError::config(format!("no marker for numerosity {n}")))
        })
        .collect::<SimResult<Vec<MarkerId>>>()?;
    let marker_of = |size: u32| markers[(size - 1) as usize];

    let mut trials: Vec<Trial> = Vec::with_capacity(target_count);
    for (idx, &p) in probabilities.iter().enumerate() {
        if !(p.is_finite() && p >= 0.0) {
            return Err(SimError::domain(format!(
                "probability for group size {} is {p}",
                idx + 1
            )));
        }
        let size = idx as u32 + 1;
        let expected = (p * target_count as f64).round_ties_even() as usize;
        trials.extend((0..expected).map(|_| Trial::ramp(size, marker_of(size))));
    }

    let emitted = trials.len();
    if emitted > target_count {
        warn!(
            emitted,
            target_count, "rounded frequencies overshoot the target; dropping tail trials"
        );
        trials.truncate(target_count);
    } else if emitted < target_count {
        let remainder = target_count - emitted;
        for _ in 0..remainder {
            let size = rng.gen_range_inclusive_u32(1, max_numerosity);
            trials.push(Trial::ramp(size, marker_of(size)));
        }
        debug!(emitted, remainder, "topped up trials with random group sizes");
    }

    if trials.len() != target_count {
        return Err(SimError::invariant(format!(
            "synthesized {} trials, expected {target_count}",
            trials.len()
        )));
    }

    rng.shuffle(&mut trials);
    Ok(trials)
}

/// Number of trials per group size, index 0 being size 1.
pub fn size_histogram(trials: &[Trial], max_numerosity: u32) -> Vec<usize> {
    let mut counts = vec![0usize; max_numerosity as usize];
    for t in trials {
        if let Some(slot) = t.size().checked_sub(1).and_then(|i| counts.get_mut(i)) {
            *slot += 1;
        }
    }
    counts
}
