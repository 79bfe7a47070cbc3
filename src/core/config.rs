//! Run configuration.
//!
//! Every field has a default matching the reference setup (English, 1000
//! trials, numerosities 1..=7, ZTNB with beta 0.6 / r 3, K = 0.01), so a
//! config file only needs the fields it changes.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::assoc::DEFAULT_LEARNING_RATE;
use crate::distribution::{FrequencyModel, ZtnbParams, MAX_SUPPORT_POINT};
use crate::error::{SimError, SimResult};
use crate::language::{Language, LanguageTable, MarkerSource};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Selects the numerosity → marker mapping.
    pub language: String,
    /// Language table to use instead of the built-in languages.
    pub languages_file: Option<PathBuf>,
    /// Destination CSV for `run`.
    pub output_path: Option<PathBuf>,
    pub trial_count: usize,
    pub max_numerosity: u32,
    /// ZTNB dispersion; 0.6 when unset.
    pub beta: Option<f64>,
    /// ZTNB size; 3 when unset.
    pub r: Option<f64>,
    pub learning_rate: f64,
    /// Unset means a clock-derived seed (logged at startup).
    pub seed: Option<u64>,
    pub distribution: FrequencyModel,

    // Summary / sweep
    pub runs: usize,
    pub quit_after_n_correct: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            language: "english".to_string(),
            languages_file: None,
            output_path: None,
            trial_count: 1000,
            max_numerosity: 7,
            beta: None,
            r: None,
            learning_rate: DEFAULT_LEARNING_RATE,
            seed: None,
            distribution: FrequencyModel::Ztnb,
            runs: 500,
            quit_after_n_correct: 200,
        }
    }
}

impl RunConfig {
    pub fn from_json_str(text: &str) -> SimResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> SimResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text).map_err(|e| match e {
            SimError::Config(msg) => SimError::config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    pub fn to_json_pretty(&self) -> SimResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SimError::config(format!("cannot serialize config: {e}")))
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Validate the configuration.
    ///
    /// Explicit `beta`/`r` outside their domain are reported as domain errors;
    /// everything else is a configuration error.
    pub fn validate(&self) -> SimResult<()> {
        if self.language.trim().is_empty() {
            return Err(SimError::config("language must not be empty"));
        }
        if self.trial_count == 0 {
            return Err(SimError::config("trial_count must be > 0"));
        }
        if self.max_numerosity < 1 {
            return Err(SimError::config("max_numerosity must be >= 1"));
        }
        if self.max_numerosity > MAX_SUPPORT_POINT {
            return Err(SimError::config(format!(
                "max_numerosity must be <= {MAX_SUPPORT_POINT}"
            )));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(SimError::config("learning_rate must be finite and > 0"));
        }
        if self.runs == 0 {
            return Err(SimError::config("runs must be > 0"));
        }
        if self.quit_after_n_correct == 0 {
            return Err(SimError::config("quit_after_n_correct must be > 0"));
        }
        if let Some(beta) = self.beta {
            ZtnbParams { beta, r: 1.0 }.validate()?;
        }
        if let Some(r) = self.r {
            ZtnbParams { beta: 1.0, r }.validate()?;
        }
        Ok(())
    }

    pub fn require_output_path(&self) -> SimResult<&Path> {
        self.output_path
            .as_deref()
            .ok_or_else(|| SimError::config("output_path is required"))
    }

    /// The language table this config refers to.
    pub fn language_table(&self) -> SimResult<LanguageTable> {
        match &self.languages_file {
            Some(path) => LanguageTable::load(path),
            None => LanguageTable::builtin(),
        }
    }

    /// Look up the configured language.
    pub fn resolve_language(&self) -> SimResult<Language> {
        let table = self.language_table()?;
        table.get(&self.language).cloned().ok_or_else(|| {
            let known: Vec<&str> = table.iter().map(|l| l.name()).collect();
            SimError::config(format!(
                "unknown language '{}' (known: {})",
                self.language,
                known.join(", ")
            ))
        })
    }

    /// Explicit `beta`/`r`, falling back to the reference parameters.
    pub fn ztnb_params(&self) -> ZtnbParams {
        let defaults = ZtnbParams::default();
        ZtnbParams {
            beta: self.beta.unwrap_or(defaults.beta),
            r: self.r.unwrap_or(defaults.r),
        }
    }
}
