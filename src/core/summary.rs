//! Acquisition summaries.
//!
//! Instead of the full history, a summary answers one question per
//! numerosity: after how many trials did the learner start reliably picking
//! the right marker for a group of that size?

use serde::Serialize;

use crate::assoc::AssociationState;
use crate::error::{SimError, SimResult};
use crate::language::MarkerId;
use crate::trials::{CueId, Trial};

/// Outcome of one summarized run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Trials applied before the run ended (early stop or sequence exhausted).
    pub trials_run: usize,
    /// Per numerosity (index 0 = numerosity 1): 1-based trial at which the
    /// correct-streak first reached the threshold.
    pub learned_at: Vec<Option<usize>>,
}

impl RunSummary {
    pub fn all_learned(&self) -> bool {
        self.learned_at.iter().all(Option::is_some)
    }

    /// `learned_at` with `-1` for never learned.
    pub fn as_columns(&self) -> Vec<i64> {
        self.learned_at
            .iter()
            .map(|l| l.map_or(-1, |t| t as i64))
            .collect()
    }
}

/// Tracks per-numerosity correct streaks after every trial.
#[derive(Debug, Clone)]
pub struct AcquisitionTracker {
    targets: Vec<MarkerId>,
    ramp: Vec<CueId>,
    threshold: usize,
    streaks: Vec<usize>,
    learned_at: Vec<Option<usize>>,
    observed: usize,
}

impl AcquisitionTracker {
    /// `targets[n - 1]` is the correct marker for numerosity `n`.
    pub fn new(targets: Vec<MarkerId>, threshold: usize) -> Self {
        let n = targets.len();
        Self {
            ramp: (0..n as CueId).collect(),
            targets,
            threshold: threshold.max(1),
            streaks: vec![0; n],
            learned_at: vec![None; n],
            observed: 0,
        }
    }

    /// Score every numerosity against the current state.
    pub fn observe(&mut self, state: &AssociationState) {
        self.observed += 1;
        for (i, &target) in self.targets.iter().enumerate() {
            let correct = state.predict(&self.ramp[..=i]) == Some(target);
            self.streaks[i] = if correct { self.streaks[i] + 1 } else { 0 };
            if self.learned_at[i].is_none() && self.streaks[i] >= self.threshold {
                self.learned_at[i] = Some(self.observed);
            }
        }
    }

    pub fn all_learned(&self) -> bool {
        self.learned_at.iter().all(Option::is_some)
    }

    pub fn finish(self) -> RunSummary {
        RunSummary {
            trials_run: self.observed,
            learned_at: self.learned_at,
        }
    }
}

/// Apply `trials` in order, scoring after each one, and stop as soon as every
/// numerosity is learned.
pub fn summarize(
    state: &mut AssociationState,
    trials: &[Trial],
    targets: Vec<MarkerId>,
    threshold: usize,
) -> SimResult<RunSummary> {
    if targets.len() > state.cue_count() {
        return Err(SimError::invariant(format!(
            "{} numerosities to score but only {} cues",
            targets.len(),
            state.cue_count()
        )));
    }
    let mut tracker = AcquisitionTracker::new(targets, threshold);
    for trial in trials {
        state.apply_trial(trial)?;
        tracker.observe(state);
        if tracker.all_learned() {
            break;
        }
    }
    Ok(tracker.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assoc::{Universe, DEFAULT_LEARNING_RATE};

    fn english(cues: u32) -> AssociationState {
        AssociationState::new(
            Universe::numerosities(cues, vec!["s".to_string(), "pl".to_string()]),
            DEFAULT_LEARNING_RATE,
        )
    }

    #[test]
    fn learns_singular_and_plural() {
        let mut st = english(3);
        let trials: Vec<Trial> = (0..600)
            .map(|i| match i % 3 {
                0 => Trial::ramp(1, 0),
                1 => Trial::ramp(2, 1),
                _ => Trial::ramp(3, 1),
            })
            .collect();
        let summary = summarize(&mut st, &trials, vec![0, 1, 1], 20).unwrap();
        assert!(summary.all_learned(), "{summary:?}");
        assert!(summary.trials_run < trials.len(), "should stop early");
        assert_eq!(st.trials_applied(), summary.trials_run);
        let last = summary.learned_at.iter().flatten().max().copied();
        assert_eq!(last, Some(summary.trials_run));
    }

    #[test]
    fn never_learned_reports_minus_one() {
        let mut st = english(2);
        // Only singular trials: numerosity 2 never sees "pl".
        let trials = vec![Trial::ramp(1, 0); 100];
        let summary = summarize(&mut st, &trials, vec![0, 1], 10).unwrap();
        assert_eq!(summary.trials_run, 100);
        assert_eq!(summary.learned_at[0], Some(10));
        assert_eq!(summary.learned_at[1], None);
        assert_eq!(summary.as_columns(), vec![10, -1]);
    }

    #[test]
    fn wrong_answers_reset_the_streak() {
        let mut st = english(1);
        let mut tracker = AcquisitionTracker::new(vec![0], 3);
        st.apply_trial(&Trial::ramp(1, 0)).unwrap();
        tracker.observe(&st);
        tracker.observe(&st);
        // Flip the prediction to "pl".
        for _ in 0..5 {
            st.apply_trial(&Trial::ramp(1, 1)).unwrap();
        }
        tracker.observe(&st);
        assert!(!tracker.all_learned());
        let summary = tracker.finish();
        assert_eq!(summary.learned_at, vec![None]);
        assert_eq!(summary.trials_run, 3);
    }

    #[test]
    fn too_many_targets_is_rejected() {
        let mut st = english(2);
        let err = summarize(&mut st, &[], vec![0, 1, 1], 5).unwrap_err();
        assert!(matches!(err, SimError::InvariantViolation(_)));
    }
}
