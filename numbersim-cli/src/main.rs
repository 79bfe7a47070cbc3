//! numbersim - grammatical number acquisition simulator
//!
//! Subcommands:
//! - `run`: full association history to CSV
//! - `summary`: trial at which each numerosity was learned
//! - `sweep`: success rates over many seeded runs
//! - `compare`: random distributions against the ZTNB law
//! - `languages`: print the language table
//! - `config`: print the effective configuration as JSON

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use numbersim::prelude::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "numbersim", about = "Grammatical number acquisition simulator")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON run configuration; command-line options override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one simulation and write its history as CSV
    Run(RunArgs),
    /// Summarize when each numerosity is learned
    Summary(SummaryArgs),
    /// Repeat summarized runs and report per-numerosity success rates
    Sweep(SweepArgs),
    /// Score random distributions by their distance from the ZTNB law
    Compare(SweepArgs),
    /// Print the language table
    Languages(SimArgs),
    /// Print the effective configuration
    Config(SimArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum Distribution {
    Ztnb,
    Random,
    Dirichlet,
}

impl From<Distribution> for FrequencyModel {
    fn from(d: Distribution) -> Self {
        match d {
            Distribution::Ztnb => FrequencyModel::Ztnb,
            Distribution::Random => FrequencyModel::Random,
            Distribution::Dirichlet => FrequencyModel::Dirichlet,
        }
    }
}

/// Overrides shared by every subcommand.
#[derive(Args)]
struct SimArgs {
    /// Language name
    #[arg(short, long)]
    language: Option<String>,
    /// Language description file replacing the built-in table
    #[arg(long)]
    languages_file: Option<PathBuf>,
    /// Number of trials per run
    #[arg(short = 'n', long)]
    trials: Option<usize>,
    /// Largest numerosity
    #[arg(short = 'm', long)]
    max_numerosity: Option<u32>,
    /// ZTNB dispersion parameter
    #[arg(long)]
    beta: Option<f64>,
    /// ZTNB size parameter
    #[arg(long)]
    r: Option<f64>,
    /// Learning rate
    #[arg(short = 'k', long)]
    learning_rate: Option<f64>,
    /// PRNG seed (clock-derived when unset)
    #[arg(short, long)]
    seed: Option<u64>,
    /// Frequency model
    #[arg(short, long, value_enum)]
    distribution: Option<Distribution>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    sim: SimArgs,
    /// Destination CSV
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct SummaryArgs {
    #[command(flatten)]
    sim: SimArgs,
    /// Consecutive correct answers that count as learned
    #[arg(short, long)]
    quit_after: Option<usize>,
    /// Print JSON instead of columns
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SweepArgs {
    #[command(flatten)]
    summary: SummaryArgs,
    /// Number of runs
    #[arg(long)]
    runs: Option<usize>,
}

impl SimArgs {
    fn apply(&self, cfg: &mut RunConfig) {
        if let Some(language) = &self.language {
            cfg.language = language.clone();
        }
        if let Some(path) = &self.languages_file {
            cfg.languages_file = Some(path.clone());
        }
        if let Some(n) = self.trials {
            cfg.trial_count = n;
        }
        if let Some(max) = self.max_numerosity {
            cfg.max_numerosity = max;
        }
        if self.beta.is_some() {
            cfg.beta = self.beta;
        }
        if self.r.is_some() {
            cfg.r = self.r;
        }
        if let Some(k) = self.learning_rate {
            cfg.learning_rate = k;
        }
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }
        if let Some(d) = self.distribution {
            cfg.distribution = d.into();
        }
    }
}

impl SummaryArgs {
    fn apply(&self, cfg: &mut RunConfig) {
        self.sim.apply(cfg);
        if let Some(n) = self.quit_after {
            cfg.quit_after_n_correct = n;
        }
    }
}

fn base_config(path: Option<&PathBuf>) -> SimResult<RunConfig> {
    match path {
        Some(path) => {
            info!("Loading config from {}", path.display());
            RunConfig::load(path)
        }
        None => Ok(RunConfig::default()),
    }
}

fn run_cmd(args: RunArgs, mut cfg: RunConfig) -> CliResult {
    args.sim.apply(&mut cfg);
    if let Some(path) = args.output {
        cfg.output_path = Some(path);
    }
    let sim = Simulation::new(cfg)?;
    let table = sim.run_to_file()?;
    info!(
        rows = table.rows.len(),
        seed = sim.seed(),
        "wrote {}",
        sim.config().require_output_path()?.display()
    );
    Ok(())
}

fn summary_cmd(args: SummaryArgs, mut cfg: RunConfig) -> CliResult {
    args.apply(&mut cfg);
    let sim = Simulation::new(cfg)?;
    let summary = sim.summarize()?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    let columns: Vec<String> = summary
        .as_columns()
        .iter()
        .map(|c| c.to_string())
        .collect();
    println!("{}", columns.join(" "));
    Ok(())
}

impl SweepArgs {
    fn apply(&self, cfg: &mut RunConfig) {
        self.summary.apply(cfg);
        if let Some(runs) = self.runs {
            cfg.runs = runs;
        }
    }
}

fn sweep_cmd(args: SweepArgs, mut cfg: RunConfig) -> CliResult {
    args.apply(&mut cfg);
    let sim = Simulation::new(cfg)?;
    let report = sweep(&sim)?;
    if args.summary.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("{} runs, {} fully learned", report.runs, report.all_learned);
    let markers = sim.language().markers();
    let rows = report
        .success_rate
        .iter()
        .zip(&report.mean_learned_at)
        .zip(sim.targets());
    for (i, ((rate, mean), &target)) in rows.enumerate() {
        let marker = markers.get(target as usize).map_or("?", String::as_str);
        let mean = mean.map_or_else(|| "-".to_string(), |m| format!("{m:.1}"));
        println!("{:>3} {:<6} {:>6.1}% {:>8}", i + 1, marker, rate * 100.0, mean);
    }
    Ok(())
}

fn compare_cmd(args: SweepArgs, mut cfg: RunConfig) -> CliResult {
    args.apply(&mut cfg);
    let sim = Simulation::new(cfg)?;
    let points = compare(&sim)?;
    if args.summary.json {
        println!("{}", serde_json::to_string_pretty(&points)?);
        return Ok(());
    }
    println!("distance,success");
    for p in &points {
        println!("{},{}", p.distance, p.success);
    }
    Ok(())
}

fn languages_cmd(args: SimArgs, mut cfg: RunConfig) -> CliResult {
    args.apply(&mut cfg);
    let table = cfg.language_table()?;
    for lang in table.iter() {
        println!(
            "{}: {} markers ({}), default {}",
            lang.name(),
            lang.markers().len(),
            lang.markers().join(" "),
            lang.default_marker()
        );
        let mapping: Vec<String> = (1..=cfg.max_numerosity)
            .map(|n| format!("{n}={}", lang.marker_for(n).unwrap_or("?")))
            .collect();
        println!("  {}", mapping.join(" "));
    }
    Ok(())
}

fn config_cmd(args: SimArgs, mut cfg: RunConfig) -> CliResult {
    args.apply(&mut cfg);
    println!("{}", cfg.to_json_pretty()?);
    Ok(())
}

fn execute(cli: Cli) -> CliResult {
    let cfg = base_config(cli.config.as_ref())?;
    match cli.command {
        Commands::Run(args) => run_cmd(args, cfg),
        Commands::Summary(args) => summary_cmd(args, cfg),
        Commands::Sweep(args) => sweep_cmd(args, cfg),
        Commands::Compare(args) => compare_cmd(args, cfg),
        Commands::Languages(args) => languages_cmd(args, cfg),
        Commands::Config(args) => config_cmd(args, cfg),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn overrides_take_precedence_over_file_values() {
        let cli = Cli::try_parse_from([
            "numbersim", "summary", "--seed", "4", "-n", "50", "--beta", "0.9", "-d", "random",
            "--quit-after", "7",
        ])
        .unwrap();
        let Commands::Summary(args) = cli.command else {
            panic!("expected summary");
        };
        let mut cfg = RunConfig {
            trial_count: 999,
            language: "slovenian".to_string(),
            ..RunConfig::default()
        };
        args.apply(&mut cfg);
        assert_eq!(cfg.seed, Some(4));
        assert_eq!(cfg.trial_count, 50);
        assert_eq!(cfg.beta, Some(0.9));
        assert_eq!(cfg.distribution, FrequencyModel::Random);
        assert_eq!(cfg.quit_after_n_correct, 7);
        assert_eq!(cfg.language, "slovenian");
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli =
            Cli::try_parse_from(["numbersim", "run", "-o", "out.csv", "--config", "c.json", "-v"])
                .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("c.json")));
    }

    #[test]
    fn compare_takes_sweep_options() {
        let cli = Cli::try_parse_from([
            "numbersim", "compare", "--runs", "20", "-d", "dirichlet", "--json",
        ])
        .unwrap();
        let Commands::Compare(args) = cli.command else {
            panic!("expected compare");
        };
        assert!(args.summary.json);
        let mut cfg = RunConfig::default();
        args.apply(&mut cfg);
        assert_eq!(cfg.runs, 20);
        assert_eq!(cfg.distribution, FrequencyModel::Dirichlet);
    }

    #[test]
    fn bad_numbers_are_usage_errors() {
        assert!(Cli::try_parse_from(["numbersim", "run", "-n", "-5"]).is_err());
        assert!(Cli::try_parse_from(["numbersim", "sweep", "--runs", "many"]).is_err());
    }
}
