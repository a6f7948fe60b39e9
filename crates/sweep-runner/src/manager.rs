//! Execution manager
//!
//! Drains an enumeration pass into an [`Experiment`], one combination at a
//! time on the calling thread.
//!
//! A combination is skipped when the enumerator yields a skip or when the
//! experiment itself answers with [`ConstructError::Skip`]. Any other
//! experiment error, like any enumeration error, aborts the run. The
//! enumerator is cleaned up on every exit path.

use crate::config::RunnerConfig;
use std::time::{Duration, Instant};
use sweep_core::{ConstructError, ObjectRecipe, Value};
use sweep_tree::{ConfigurationTree, EnumerationError, ObjectEnumerator, Produced};

/// Consumer of realized combinations
pub trait Experiment {
    /// Run one combination
    ///
    /// # Errors
    /// [`ConstructError::Skip`] marks the combination as skipped; any other
    /// error aborts the run.
    fn run(&mut self, value: &Value, recipe: Option<&ObjectRecipe>) -> Result<(), ConstructError>;
}

impl<F> Experiment for F
where
    F: FnMut(&Value, Option<&ObjectRecipe>) -> Result<(), ConstructError>,
{
    fn run(&mut self, value: &Value, recipe: Option<&ObjectRecipe>) -> Result<(), ConstructError> {
        self(value, recipe)
    }
}

/// Run failure
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Enumeration could not start or was terminated
    #[error("enumeration failed: {0}")]
    Enumeration(#[from] EnumerationError),

    /// Experiment failed on a combination
    #[error("experiment failed on {combination}: {source}")]
    Experiment {
        /// Recipe or value of the failing combination
        combination: String,
        /// Experiment error
        #[source]
        source: ConstructError,
    },
}

/// Outcome of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Combinations handed out, skips included
    pub produced: u64,
    /// Combinations skipped by the enumerator or the experiment
    pub skipped: u64,
    /// Combinations one full pass has
    pub total: u64,
    /// Run ended before the pass was exhausted
    pub stopped_early: bool,
    /// Wall-clock duration
    pub elapsed: Duration,
}

impl RunSummary {
    /// Combinations the experiment completed
    #[inline]
    #[must_use]
    pub fn completed(&self) -> u64 {
        self.produced - self.skipped
    }
}

/// Sequential experiment driver
#[derive(Debug, Clone, Default)]
pub struct ExecutionManager {
    config: RunnerConfig,
}

impl ExecutionManager {
    /// Create a new manager
    #[inline]
    #[must_use]
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Enumerate `tree` and run `experiment` on every combination
    ///
    /// # Errors
    /// Returns [`RunError`] if the tree is not ready, a constructor fails or
    /// the experiment fails.
    pub fn run<E>(&self, tree: &ConfigurationTree, experiment: &mut E) -> Result<RunSummary, RunError>
    where
        E: Experiment + ?Sized,
    {
        let mut enumerator = tree.enumerate()?;
        tracing::info!(
            "running {} combinations of {}",
            enumerator.total_combinations(),
            tree.root_type()
        );
        let result = self.drain(&mut enumerator, experiment);
        enumerator.cleanup();
        match &result {
            Ok(summary) => tracing::info!(
                "run finished: {} produced, {} skipped, {} completed in {:?}",
                summary.produced,
                summary.skipped,
                summary.completed(),
                summary.elapsed
            ),
            Err(e) => tracing::error!("run aborted: {}", e),
        }
        result
    }

    fn drain<E>(&self, enumerator: &mut ObjectEnumerator, experiment: &mut E) -> Result<RunSummary, RunError>
    where
        E: Experiment + ?Sized,
    {
        let started = Instant::now();
        let mut summary = RunSummary {
            total: enumerator.total_combinations(),
            ..RunSummary::default()
        };

        loop {
            if self
                .config
                .max_combinations
                .is_some_and(|max| summary.produced >= max)
            {
                summary.stopped_early = summary.produced < summary.total;
                break;
            }
            let Some(produced) = enumerator.next() else {
                break;
            };
            summary.produced += 1;
            let skipped = match produced? {
                Produced::Skipped(signal) => {
                    tracing::debug!("combination {} {}", summary.produced, signal);
                    true
                }
                Produced::Object { value, recipe } => match experiment.run(&value, recipe.as_ref()) {
                    Ok(()) => false,
                    Err(ConstructError::Skip(signal)) => {
                        tracing::debug!("experiment {}", signal);
                        true
                    }
                    Err(source) => {
                        let combination = recipe.map_or_else(|| value.to_string(), |r| r.to_string());
                        return Err(RunError::Experiment { combination, source });
                    }
                },
            };
            if skipped {
                summary.skipped += 1;
                if self.config.stop_on_skip {
                    summary.stopped_early = summary.produced < summary.total;
                    break;
                }
            }
        }
        summary.elapsed = started.elapsed();
        Ok(summary)
    }
}
