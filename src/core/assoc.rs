//! Association strengths and the error-correction update.
//!
//! The table is dense: one `f64` per (cue, marker) pair, laid out cue-major so
//! a cue's strengths for every marker sit next to each other.

use crate::error::{SimError, SimResult};
use crate::language::MarkerId;
use crate::trials::{CueId, Trial};

/// Learning rate used by the reference configuration.
pub const DEFAULT_LEARNING_RATE: f64 = 0.01;

/// Cue and marker labels, fixed for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Universe {
    cues: Vec<String>,
    markers: Vec<String>,
}

impl Universe {
    /// Cues labelled `"1"..="max_numerosity"`.
    pub fn numerosities(max_numerosity: u32, markers: Vec<String>) -> Self {
        Self {
            cues: (1..=max_numerosity).map(|n| n.to_string()).collect(),
            markers,
        }
    }

    pub fn cues(&self) -> &[String] {
        &self.cues
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    pub fn cue_label(&self, cue: CueId) -> Option<&str> {
        self.cues.get(cue as usize).map(String::as_str)
    }

    pub fn marker_label(&self, marker: MarkerId) -> Option<&str> {
        self.markers.get(marker as usize).map(String::as_str)
    }

    pub fn cue_id(&self, label: &str) -> Option<CueId> {
        self.cues.iter().position(|c| c == label).map(|i| i as CueId)
    }

    pub fn marker_id(&self, label: &str) -> Option<MarkerId> {
        self.markers
            .iter()
            .position(|m| m == label)
            .map(|i| i as MarkerId)
    }

    /// Build a trial from labels; `None` if any label is unknown.
    pub fn trial(&self, cues: &[&str], marker: &str) -> Option<Trial> {
        let cues = cues
            .iter()
            .map(|c| self.cue_id(c))
            .collect::<Option<Vec<CueId>>>()?;
        Some(Trial::new(cues, self.marker_id(marker)?))
    }
}

/// Mutable learner state for one run.
#[derive(Debug, Clone)]
pub struct AssociationState {
    universe: Universe,
    learning_rate: f64,
    strengths: Vec<f64>,
    trials_applied: usize,
}

impl AssociationState {
    /// All strengths start at zero.
    pub fn new(universe: Universe, learning_rate: f64) -> Self {
        let len = universe.cues.len() * universe.markers.len();
        Self {
            universe,
            learning_rate,
            strengths: vec![0.0; len],
            trials_applied: 0,
        }
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn trials_applied(&self) -> usize {
        self.trials_applied
    }

    pub fn cue_count(&self) -> usize {
        self.universe.cues.len()
    }

    pub fn marker_count(&self) -> usize {
        self.universe.markers.len()
    }

    #[inline]
    fn index(&self, cue: CueId, marker: MarkerId) -> usize {
        cue as usize * self.marker_count() + marker as usize
    }

    /// Strength of `(cue, marker)`; `None` outside the universe.
    pub fn strength(&self, cue: CueId, marker: MarkerId) -> Option<f64> {
        if cue as usize >= self.cue_count() || marker as usize >= self.marker_count() {
            return None;
        }
        Some(self.strengths[self.index(cue, marker)])
    }

    /// Summed strength of `cues` for `marker`. Ids must be in range.
    fn activation(&self, cues: &[CueId], marker: MarkerId) -> f64 {
        cues.iter().map(|&c| self.strengths[self.index(c, marker)]).sum()
    }

    /// Marker with the strictly highest summed strength over `cues`. `None` on a
    /// tie for first place or an unknown cue.
    pub fn predict(&self, cues: &[CueId]) -> Option<MarkerId> {
        if cues.iter().any(|&c| c as usize >= self.cue_count()) {
            return None;
        }
        let mut best: Option<(MarkerId, f64)> = None;
        let mut tied = false;
        for m in 0..self.marker_count() as MarkerId {
            let v = self.activation(cues, m);
            match best {
                Some((_, b)) if v == b => tied = true,
                Some((_, b)) if v < b => {}
                _ => {
                    best = Some((m, v));
                    tied = false;
                }
            }
        }
        if tied {
            return None;
        }
        best.map(|(m, _)| m)
    }

    fn check_trial(&self, trial: &Trial) -> SimResult<()> {
        if trial.cues.is_empty() {
            return Err(SimError::invariant("trial has no cues"));
        }
        if let Some(&bad) = trial.cues.iter().find(|&&c| c as usize >= self.cue_count()) {
            return Err(SimError::invariant(format!(
                "trial references unknown cue id {bad} (universe has {})",
                self.cue_count()
            )));
        }
        if trial.marker as usize >= self.marker_count() {
            return Err(SimError::invariant(format!(
                "trial references unknown marker id {} (universe has {})",
                trial.marker,
                self.marker_count()
            )));
        }
        Ok(())
    }

    /// Apply one trial.
    ///
    /// For every marker `m`, the teaching signal is 1 if `m` is the trial's
    /// marker and 0 otherwise. Every present cue moves by
    /// `K * (signal - sum of present cues' strengths for m)`, with the sum
    /// taken before any strength changes. Absent cues are untouched.
    pub fn apply_trial(&mut self, trial: &Trial) -> SimResult<()> {
        self.check_trial(trial)?;

        let deltas: Vec<f64> = (0..self.marker_count() as MarkerId)
            .map(|m| {
                let signal = if m == trial.marker { 1.0 } else { 0.0 };
                self.learning_rate * (signal - self.activation(&trial.cues, m))
            })
            .collect();

        for &cue in &trial.cues {
            for (m, delta) in deltas.iter().enumerate() {
                let idx = self.index(cue, m as MarkerId);
                self.strengths[idx] += delta;
            }
        }
        self.trials_applied += 1;
        Ok(())
    }
}
