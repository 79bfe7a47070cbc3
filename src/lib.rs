//! # numbersim
//!
//! Simulates how a learner acquires grammatical number marking (singular,
//! dual, plural, ...) from exposure alone.
//!
//! A run synthesizes trials whose group sizes follow a zero-truncated negative
//! binomial (ZTNB) frequency model, pairs each size with the marker its
//! language uses, and feeds them to an error-correcting associative learner.
//! The full association history is recorded and exported as CSV.
//!
//! ## Quick Start
//!
//! ```
//! use numbersim::prelude::*;
//!
//! let cfg = RunConfig {
//!     trial_count: 200,
//!     ..RunConfig::default()
//! }
//! .with_seed(42);
//!
//! let sim = Simulation::new(cfg).unwrap();
//! let table = sim.run().unwrap();
//! assert_eq!(table.rows.len(), 201);
//! assert_eq!(table.header[2], "1--s");
//! ```
//!
//! ## Feature Flags
//!
//! - `parallel`: Run sweep and compare repetitions on a rayon thread pool
//!
//! ## Modules
//!
//! - [`distribution`]: Frequency models over numerosities
//! - [`language`]: Numerosity to marker mappings
//! - [`trials`]: Trial synthesis
//! - [`assoc`]: Association strengths and the update rule
//! - [`recorder`]: Snapshot history of a run
//! - [`storage`]: CSV export
//! - [`summary`] / [`sweep`]: Acquisition statistics

#[path = "core/error.rs"]
pub mod error;

#[path = "core/prng.rs"]
pub mod prng;

#[path = "core/distribution.rs"]
pub mod distribution;

#[path = "core/language.rs"]
pub mod language;

#[path = "core/trials.rs"]
pub mod trials;

#[path = "core/assoc.rs"]
pub mod assoc;

#[path = "core/recorder.rs"]
pub mod recorder;

#[path = "core/storage.rs"]
pub mod storage;

#[path = "core/config.rs"]
pub mod config;

#[path = "core/summary.rs"]
pub mod summary;

#[path = "core/simulation.rs"]
pub mod simulation;

#[path = "core/sweep.rs"]
pub mod sweep;

/// Prelude module for convenient imports.
///
/// ```
/// use numbersim::prelude::*;
/// ```
pub mod prelude {
    pub use crate::assoc::{AssociationState, Universe};
    pub use crate::config::RunConfig;
    pub use crate::distribution::{FrequencyModel, ZtnbParams};
    pub use crate::error::{SimError, SimResult};
    pub use crate::language::{Language, LanguageTable, MarkerId, MarkerSource};
    pub use crate::prng::Prng;
    pub use crate::recorder::{SnapshotRow, SnapshotTable};
    pub use crate::simulation::Simulation;
    pub use crate::summary::RunSummary;
    pub use crate::sweep::{compare, sweep, ComparePoint, SweepReport};
    pub use crate::trials::{generate_trials, CueId, Trial};
}
