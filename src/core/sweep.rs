//! Many summarized runs of one configuration, aggregated per numerosity.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::distribution::{distance, random_probabilities, ztnb_probabilities};
use crate::error::SimResult;
use crate::prng::Prng;
use crate::simulation::Simulation;
use crate::summary::RunSummary;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub runs: usize,
    /// Fraction of runs that learned each numerosity (index 0 = numerosity 1).
    pub success_rate: Vec<f64>,
    /// Mean `learned_at` over the runs that learned it.
    pub mean_learned_at: Vec<Option<f64>>,
    /// Runs in which every numerosity was learned.
    pub all_learned: usize,
}

impl SweepReport {
    fn aggregate(summaries: &[RunSummary], numerosities: usize) -> Self {
        let runs = summaries.len();
        let mut learned = vec![0usize; numerosities];
        let mut totals = vec![0usize; numerosities];
        for s in summaries {
            for (i, at) in s.learned_at.iter().enumerate() {
                if let Some(at) = at {
                    learned[i] += 1;
                    totals[i] += at;
                }
            }
        }
        let denom = runs.max(1) as f64;
        Self {
            runs,
            success_rate: learned.iter().map(|&n| n as f64 / denom).collect(),
            mean_learned_at: learned
                .iter()
                .zip(&totals)
                .map(|(&n, &t)| (n > 0).then(|| t as f64 / n as f64))
                .collect(),
            all_learned: summaries.iter().filter(|s| s.all_learned()).count(),
        }
    }
}

/// Per-run seeds, drawn from the simulation's seed before any run starts.
pub fn run_seeds(master: u64, runs: usize) -> Vec<u64> {
    let mut rng = Prng::new(master);
    (0..runs).map(|_| rng.next_u64()).collect()
}

/// Summarize `config().runs` independent runs.
///
/// Each run gets its own generator, so the report depends only on the
/// simulation's seed and not on how runs are scheduled.
pub fn sweep(sim: &Simulation) -> SimResult<SweepReport> {
    let seeds = run_seeds(sim.seed(), sim.config().runs);

    #[cfg(feature = "parallel")]
    let summaries = seeds
        .par_iter()
        .map(|&seed| sim.summarize_with_seed(seed))
        .collect::<SimResult<Vec<_>>>()?;

    #[cfg(not(feature = "parallel"))]
    let summaries = seeds
        .iter()
        .map(|&seed| sim.summarize_with_seed(seed))
        .collect::<SimResult<Vec<_>>>()?;

    let report = SweepReport::aggregate(&summaries, sim.targets().len());
    info!(
        runs = report.runs,
        all_learned = report.all_learned,
        "sweep finished"
    );
    Ok(report)
}

/// One random distribution and how well it taught the language.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComparePoint {
    /// Euclidean distance from the ZTNB distribution.
    pub distance: f64,
    /// Mean `learned_at` over numerosities, never-learned counting as 0.
    pub success: f64,
}

fn success_score(summary: &RunSummary) -> f64 {
    let total: usize = summary.learned_at.iter().flatten().sum();
    total as f64 / summary.learned_at.len().max(1) as f64
}

fn compare_run(sim: &Simulation, baseline: &[f64], seed: u64) -> SimResult<ComparePoint> {
    let mut rng = Prng::new(seed);
    let probabilities = random_probabilities(sim.config().max_numerosity, &mut rng);
    let summary = sim.summarize_distribution(&probabilities, &mut rng)?;
    Ok(ComparePoint {
        distance: distance(baseline, &probabilities)?,
        success: success_score(&summary),
    })
}

/// Summarize `config().runs` runs, each on a fresh random distribution, and
/// pair each distribution's distance from the configured ZTNB law with the
/// run's outcome. The configured frequency model is ignored.
pub fn compare(sim: &Simulation) -> SimResult<Vec<ComparePoint>> {
    let baseline = ztnb_probabilities(sim.config().max_numerosity, sim.params())?;
    let seeds = run_seeds(sim.seed(), sim.config().runs);

    #[cfg(feature = "parallel")]
    let points = seeds
        .par_iter()
        .map(|&seed| compare_run(sim, &baseline, seed))
        .collect::<SimResult<Vec<_>>>()?;

    #[cfg(not(feature = "parallel"))]
    let points = seeds
        .iter()
        .map(|&seed| compare_run(sim, &baseline, seed))
        .collect::<SimResult<Vec<_>>>()?;

    info!(runs = points.len(), "comparison finished");
    Ok(points)
}
