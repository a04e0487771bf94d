//! Sequential, continue-on-failure execution of a whole task.

use crate::task::command::CommandRunner;
use crate::task::operation::{OperationExecutor, OperationKind, OperationResult};
use crate::task::result_error::result::{convert_error_vec, Result};
use crate::task::settings::Settings;
use crate::task::task_config::{load_config, TaskConfig};

use derive_more::Display;
use getset::Getters;
use itertools::Itertools;

#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq)]
pub enum BatchState {
    #[default]
    NotStarted,
    Running,
    Completed,
}

/// Every operation issued by one batch, in issue order.
#[derive(Clone, Debug, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct BatchReport {
    task: String,
    results: Vec<OperationResult>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded_count(&self) -> usize {
        self.results.iter().filter(|r| r.succeeded()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.total() - self.succeeded_count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &OperationResult> {
        self.results.iter().filter(|r| !r.succeeded())
    }

    /// `Ok` when every operation succeeded, otherwise all failures as one error.
    pub fn into_result(self) -> Result<()> {
        convert_error_vec(
            self.results
                .iter()
                .filter_map(OperationResult::to_error)
                .collect_vec(),
        )
    }
}

pub struct BatchRunner<R: CommandRunner> {
    executor: OperationExecutor<R>,
    state: BatchState,
}

impl<R: CommandRunner> BatchRunner<R> {
    pub fn new(executor: OperationExecutor<R>) -> Self {
        Self {
            executor,
            state: BatchState::NotStarted,
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn executor(&self) -> &OperationExecutor<R> {
        &self.executor
    }

    /// Applies `kind` to each target in order. Failures are recorded in the
    /// report and never stop the remaining targets.
    pub fn run(&mut self, task: &str, targets: &[String], kind: &OperationKind) -> BatchReport {
        self.state = BatchState::Running;
        tracing::debug!("Running {} ({}) over {} targets", task, kind, targets.len());

        let results = targets
            .iter()
            .flat_map(|target| self.executor.execute(target, kind))
            .collect_vec();

        self.state = BatchState::Completed;
        BatchReport {
            task: task.to_string(),
            results,
        }
    }

    pub fn run_task<C: TaskConfig>(&mut self, config: &C) -> BatchReport {
        self.run(C::TASK_NAME, &config.targets(), &config.operation())
    }
}

/// Loads the task document named by `settings` and runs it to completion.
///
/// Only configuration failures are returned as errors; per-operation
/// failures live in the report.
pub fn run_configured_task<C: TaskConfig, R: CommandRunner>(
    settings: &Settings,
    executor: OperationExecutor<R>,
) -> Result<BatchReport> {
    tracing::info!("Loading settings...");
    let config: C = load_config(Some(settings.config_path()))?;
    tracing::info!("Done loading settings!");

    let report = BatchRunner::new(executor).run_task(&config);
    let log_summary = format!(
        "{} finished: {} of {} operations succeeded",
        report.task(),
        report.succeeded_count(),
        report.total()
    );
    if report.failed_count() == 0 {
        tracing::info!("{}", log_summary);
    } else {
        tracing::warn!(
            "{}, failed: {}",
            log_summary,
            report.failures().map(|r| r.target().display()).join(", ")
        );
    }
    Ok(report)
}
