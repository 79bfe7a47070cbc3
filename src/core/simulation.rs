//! One configured simulation: language, frequency model and learner wired
//! together.

use tracing::{debug, info};

use crate::assoc::{AssociationState, Universe};
use crate::config::RunConfig;
use crate::distribution::ZtnbParams;
use crate::error::SimResult;
use crate::language::{resolve_markers, Language, MarkerId, MarkerSource};
use crate::prng::Prng;
use crate::recorder::{self, SnapshotTable};
use crate::storage;
use crate::summary::{self, RunSummary};
use crate::trials::{generate_trials_from, size_histogram, Trial};

#[derive(Debug, Clone)]
pub struct Simulation {
    cfg: RunConfig,
    language: Language,
    targets: Vec<MarkerId>,
    params: ZtnbParams,
    seed: u64,
}

impl Simulation {
    /// Validate `cfg` and resolve everything a run needs. All configuration
    /// and domain errors surface here, before any trial exists.
    pub fn new(cfg: RunConfig) -> SimResult<Self> {
        cfg.validate()?;
        let language = cfg.resolve_language()?;
        let targets = resolve_markers(&language, cfg.max_numerosity)?;
        let params = cfg.ztnb_params();
        params.validate()?;

        let seed = match cfg.seed {
            Some(seed) => seed,
            None => {
                let seed = Prng::clock_seed();
                info!(seed, "no seed configured; using clock seed");
                seed
            }
        };

        debug!(
            language = language.name(),
            markers = ?language.markers(),
            beta = params.beta,
            r = params.r,
            seed,
            "simulation configured"
        );

        Ok(Self {
            cfg,
            language,
            targets,
            params,
            seed,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.cfg
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn params(&self) -> ZtnbParams {
        self.params
    }

    /// Correct marker per numerosity, index 0 being numerosity 1.
    pub fn targets(&self) -> &[MarkerId] {
        &self.targets
    }

    pub fn universe(&self) -> Universe {
        Universe::numerosities(self.cfg.max_numerosity, self.language.markers().to_vec())
    }

    pub fn fresh_state(&self) -> AssociationState {
        AssociationState::new(self.universe(), self.cfg.learning_rate)
    }

    /// This run's group-size distribution under the configured model.
    pub fn probabilities(&self, rng: &mut Prng) -> SimResult<Vec<f64>> {
        self.cfg
            .distribution
            .probabilities(self.cfg.max_numerosity, self.params, rng)
    }

    /// Synthesize this run's trial sequence.
    pub fn generate_trials(&self, rng: &mut Prng) -> SimResult<Vec<Trial>> {
        let probabilities = self.probabilities(rng)?;
        self.trials_from(&probabilities, rng)
    }

    /// Trial sequence for an explicit distribution over `1..=max_numerosity`.
    pub fn trials_from(&self, probabilities: &[f64], rng: &mut Prng) -> SimResult<Vec<Trial>> {
        let targets = &self.targets;
        let trials = generate_trials_from(
            probabilities,
            |n| targets.get(n.checked_sub(1)? as usize).copied(),
            self.cfg.trial_count,
            rng,
        )?;
        debug!(
            sizes = ?size_histogram(&trials, self.cfg.max_numerosity),
            "trial sequence ready"
        );
        Ok(trials)
    }

    /// Full history for the configured seed.
    pub fn run(&self) -> SimResult<SnapshotTable> {
        let mut rng = Prng::new(self.seed);
        let trials = self.generate_trials(&mut rng)?;
        let mut state = self.fresh_state();
        recorder::run(&mut state, &trials)
    }

    /// [`Simulation::run`] and write the CSV to `output_path`. The path is
    /// checked before any work is done; the file appears only if every step
    /// succeeded.
    pub fn run_to_file(&self) -> SimResult<SnapshotTable> {
        let path = self.cfg.require_output_path()?.to_path_buf();
        let table = self.run()?;
        storage::write_csv_atomic(&path, &table)?;
        Ok(table)
    }

    /// Acquisition summary for the configured seed.
    pub fn summarize(&self) -> SimResult<RunSummary> {
        self.summarize_with_seed(self.seed)
    }

    pub fn summarize_with_seed(&self, seed: u64) -> SimResult<RunSummary> {
        let mut rng = Prng::new(seed);
        let probabilities = self.probabilities(&mut rng)?;
        self.summarize_distribution(&probabilities, &mut rng)
    }

    /// Acquisition summary for trials drawn from `probabilities`.
    pub fn summarize_distribution(
        &self,
        probabilities: &[f64],
        rng: &mut Prng,
    ) -> SimResult<RunSummary> {
        let trials = self.trials_from(probabilities, rng)?;
        let mut state = self.fresh_state();
        summary::summarize(
            &mut state,
            &trials,
            self.targets.clone(),
            self.cfg.quit_after_n_correct,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::FrequencyModel;
    use crate::error::SimError;

    fn cfg() -> RunConfig {
        RunConfig {
            trial_count: 300,
            ..RunConfig::default()
        }
        .with_seed(17)
    }

    #[test]
    fn run_records_full_history() {
        let sim = Simulation::new(cfg()).unwrap();
        let table = sim.run().unwrap();
        assert_eq!(table.rows.len(), 301);
        assert_eq!(table.header.len(), 2 + 7 * 2);
        assert!(table.rows[..300].iter().all(|r| !r.cues.is_empty()));
        for row in &table.rows[..300] {
            let size = row.cues.len();
            let expected = if size == 1 { "s" } else { "pl" };
            assert_eq!(row.marker, expected, "{row:?}");
            let ramp: String = (1..=size).map(|n| n.to_string()).collect();
            assert_eq!(row.cues, ramp);
        }
    }

    #[test]
    fn same_seed_reproduces_the_run() {
        let a = Simulation::new(cfg()).unwrap().run().unwrap();
        let b = Simulation::new(cfg()).unwrap().run().unwrap();
        assert_eq!(a, b);
        let c = Simulation::new(cfg().with_seed(18)).unwrap().run().unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn random_distribution_runs() {
        let sim = Simulation::new(RunConfig {
            distribution: FrequencyModel::Random,
            ..cfg()
        })
        .unwrap();
        assert_eq!(sim.run().unwrap().rows.len(), 301);

        let sim = Simulation::new(RunConfig {
            distribution: FrequencyModel::Dirichlet,
            ..cfg()
        })
        .unwrap();
        assert_eq!(sim.run().unwrap().rows.len(), 301);
    }

    #[test]
    fn explicit_distribution_controls_group_sizes() {
        let sim = Simulation::new(cfg()).unwrap();
        let mut probs = vec![0.0; 7];
        probs[2] = 1.0;
        let trials = sim.trials_from(&probs, &mut Prng::new(1)).unwrap();
        assert_eq!(trials.len(), 300);
        assert!(trials.iter().all(|t| t.size() == 3 && t.marker == 1));
    }

    #[test]
    fn learner_prefers_singular_for_one_and_plural_for_many() {
        let sim = Simulation::new(RunConfig {
            trial_count: 1000,
            ..cfg()
        })
        .unwrap();
        let table = sim.run().unwrap();
        let last = &table.last().unwrap().values;
        // prefix 1: s beats pl; prefix 1..3: pl beats s
        assert!(last[0] > last[1], "{last:?}");
        assert!(last[5] > last[4], "{last:?}");
    }

    #[test]
    fn config_errors_surface_before_running() {
        let err = Simulation::new(RunConfig {
            language: "klingon".to_string(),
            ..cfg()
        })
        .unwrap_err();
        assert!(matches!(err, SimError::Config(_)));

        let err = Simulation::new(RunConfig {
            beta: Some(0.0),
            ..cfg()
        })
        .unwrap_err();
        assert!(matches!(err, SimError::Domain(_)));

        let sim = Simulation::new(cfg()).unwrap();
        assert!(matches!(sim.run_to_file(), Err(SimError::Config(_))));
    }

    #[test]
    fn run_to_file_writes_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("english.csv");
        let sim = Simulation::new(cfg().with_output_path(&path)).unwrap();
        let table = sim.run_to_file().unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), table.rows.len() + 1);
        assert!(text.starts_with("cues,marker,1--s,1--pl,1:2--s"));
    }

    #[test]
    fn summary_learns_english() {
        let sim = Simulation::new(RunConfig {
            trial_count: 3000,
            quit_after_n_correct: 50,
            ..cfg()
        })
        .unwrap();
        let summary = sim.summarize().unwrap();
        assert_eq!(summary.learned_at.len(), 7);
        assert!(summary.learned_at[0].is_some(), "{summary:?}");
        assert!(summary.learned_at[1].is_some(), "{summary:?}");
    }

    #[test]
    fn unseeded_runs_pick_a_seed() {
        let sim = Simulation::new(RunConfig {
            seed: None,
            ..cfg()
        })
        .unwrap();
        let replay = Simulation::new(cfg().with_seed(sim.seed())).unwrap();
        assert_eq!(sim.run().unwrap(), replay.run().unwrap());
    }
}
