//! Trial runner and snapshot recorder.
//!
//! Snapshots are read-only views of the association table: for every cue
//! prefix `1..=i` and marker `m`, the summed strength of cues `1..=i` for `m`.
//! A snapshot is taken before each trial and once more after the last one, so
//! row `t` shows what the learner knew when trial `t` arrived.

use tracing::{debug, info};

use crate::assoc::{AssociationState, Universe};
use crate::error::SimResult;
use crate::trials::Trial;

pub const CUES_COLUMN: &str = "cues";
pub const MARKER_COLUMN: &str = "marker";

/// One point in the learning history.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRow {
    /// Concatenated cue labels of the pending trial; empty for the final row.
    pub cues: String,
    /// Marker label of the pending trial; empty for the final row.
    pub marker: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotTable {
    pub header: Vec<String>,
    pub rows: Vec<SnapshotRow>,
}

impl SnapshotTable {
    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    /// Final learned state (the terminal row).
    pub fn last(&self) -> Option<&SnapshotRow> {
        self.rows.last()
    }
}

/// `cues`, `marker`, then `1--s, 1--pl, 1:2--s, ...`.
pub fn header(universe: &Universe) -> Vec<String> {
    let mut out = vec![CUES_COLUMN.to_string(), MARKER_COLUMN.to_string()];
    let mut prefix = String::new();
    for (i, cue) in universe.cues().iter().enumerate() {
        if i > 0 {
            prefix.push(':');
        }
        prefix.push_str(cue);
        for m in universe.markers() {
            out.push(format!("{prefix}--{m}"));
        }
    }
    out
}

/// Cumulative prefix sums, cue-major, one running total per marker.
pub fn snapshot_values(state: &AssociationState) -> Vec<f64> {
    let markers = state.marker_count();
    let mut running = vec![0.0f64; markers];
    let mut out = Vec::with_capacity(state.cue_count() * markers);
    for cue in 0..state.cue_count() as u32 {
        for (m, total) in running.iter_mut().enumerate() {
            *total += state.strength(cue, m as u32).unwrap_or(0.0);
            out.push(*total);
        }
    }
    out
}

fn trial_labels(universe: &Universe, trial: &Trial) -> (String, String) {
    let cues: String = trial
        .cues
        .iter()
        .filter_map(|&c| universe.cue_label(c))
        .collect();
    let marker = universe
        .marker_label(trial.marker)
        .unwrap_or_default()
        .to_string();
    (cues, marker)
}

/// Snapshot, apply, repeat; then one terminal snapshot.
///
/// Fails on the first trial the state rejects; nothing recorded so far is
/// returned in that case.
pub fn run(state: &mut AssociationState, trials: &[Trial]) -> SimResult<SnapshotTable> {
    let header = header(state.universe());
    let mut rows = Vec::with_capacity(trials.len() + 1);

    for (t, trial) in trials.iter().enumerate() {
        let (cues, marker) = trial_labels(state.universe(), trial);
        rows.push(SnapshotRow {
            cues,
            marker,
            values: snapshot_values(state),
        });
        state.apply_trial(trial)?;
        if (t + 1) % 250 == 0 {
            debug!(trial = t + 1, of = trials.len(), "trials applied");
        }
    }
    rows.push(SnapshotRow {
        cues: String::new(),
        marker: String::new(),
        values: snapshot_values(state),
    });

    info!(
        trials = trials.len(),
        columns = header.len(),
        "recorded association history"
    );
    Ok(SnapshotTable { header, rows })
}
