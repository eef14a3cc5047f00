use crossbeam::channel;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use validator::Validate;

use crate::analysis::cancel::CancellationToken;
use crate::analysis::config::AnalysisConfig;
use crate::error::{ProcessingError, Result};
use crate::interpolation::DenseDiffusionInterpolator;
use crate::models::{DiurnalPeriod, Grid, InterpolatedField, Metric, Reading};
use crate::processors::{DiurnalFilter, GridBuilder, SiteAggregator, TimeAggregator, TimeBucket};

/// One unit of work: a (bucket, metric, period) triple.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisTask<'a> {
    pub index: usize,
    pub bucket: &'a TimeBucket<'a>,
    pub metric: Metric,
    pub period: &'a DiurnalPeriod,
}

impl AnalysisTask<'_> {
    pub fn id(&self) -> TaskId {
        TaskId {
            index: self.index,
            bucket_label: self.bucket.label.clone(),
            metric: self.metric,
            period_key: self.period.key.clone(),
        }
    }
}

/// Owned identity of a task, kept in reports after the borrowed data is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskId {
    pub index: usize,
    pub bucket_label: String,
    pub metric: Metric,
    pub period_key: String,
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "#{} {} / {} / {}",
            self.index,
            self.bucket_label,
            self.metric.key(),
            self.period_key
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoReadingsInPeriod,
    NoStationValues,
}

#[derive(Debug)]
pub enum TaskOutcome {
    Completed(Box<InterpolatedField>),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedTask {
    pub task: TaskId,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedTask {
    pub task: TaskId,
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

#[derive(Debug)]
pub struct AnalysisReport {
    pub total_tasks: usize,
    /// Completed fields in task order
    pub fields: Vec<InterpolatedField>,
    pub skipped: Vec<SkippedTask>,
    pub failed: Vec<FailedTask>,
    pub unavailable_metrics: Vec<Metric>,
    pub elapsed: Duration,
}

impl AnalysisReport {
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Analysis Summary:\n\
            - Tasks: {}\n\
            - Fields produced: {}\n\
            - Skipped (no data): {}\n\
            - Failed: {}\n\
            - Elapsed: {:.2}s\n",
            self.total_tasks,
            self.fields.len(),
            self.skipped.len(),
            self.failed.len(),
            self.elapsed.as_secs_f64()
        );

        if !self.unavailable_metrics.is_empty() {
            let keys: Vec<&str> = self.unavailable_metrics.iter().map(|m| m.key()).collect();
            summary.push_str(&format!("- Unavailable metrics: {}\n", keys.join(", ")));
        }

        for failure in self.failed.iter().take(5) {
            summary.push_str(&format!("  ! {}: {}\n", failure.task, failure.error));
        }

        summary
    }
}

/// Runs every (bucket, metric, period) task over a prepared reading set.
pub struct AnalysisOrchestrator {
    config: AnalysisConfig,
    interpolator: DenseDiffusionInterpolator,
    cancel: CancellationToken,
}

impl AnalysisOrchestrator {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let interpolator = DenseDiffusionInterpolator::new(config.diffusion)?;

        Ok(Self {
            config,
            interpolator,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Split requested metrics into those whose source fields appear somewhere in
    /// the dataset and those that do not.
    pub fn available_metrics(&self, readings: &[Reading]) -> (Vec<Metric>, Vec<Metric>) {
        self.config.metrics.iter().copied().partition(|metric| {
            metric
                .required_fields()
                .iter()
                .all(|&field| readings.iter().any(|r| r.value(field).is_some()))
        })
    }

    /// Bucket outer, metric middle, period inner.
    pub fn enumerate_tasks<'a>(
        &'a self,
        buckets: &'a [TimeBucket<'a>],
        metrics: &[Metric],
    ) -> Vec<AnalysisTask<'a>> {
        let mut tasks =
            Vec::with_capacity(buckets.len() * metrics.len() * self.config.periods.len());
        for bucket in buckets {
            for &metric in metrics {
                for period in &self.config.periods {
                    tasks.push(AnalysisTask {
                        index: tasks.len(),
                        bucket,
                        metric,
                        period,
                    });
                }
            }
        }
        tasks
    }

    /// Execute all tasks. `on_progress` is called on the calling thread after each
    /// finished task with a strictly increasing completion count.
    pub fn run<F>(&self, readings: &[Reading], mut on_progress: F) -> Result<AnalysisReport>
    where
        F: FnMut(Progress),
    {
        let started = Instant::now();
        let deadline = self.config.deadline.map(|d| started + d);

        if readings.is_empty() {
            return Err(ProcessingError::MissingData(
                "No readings available for analysis".to_string(),
            ));
        }

        let (metrics, unavailable_metrics) = self.available_metrics(readings);
        for metric in &unavailable_metrics {
            warn!(
                "Metric '{}' skipped: required source fields are missing from the dataset",
                metric.key()
            );
        }
        if metrics.is_empty() {
            return Err(ProcessingError::MissingData(
                "None of the requested metrics has data in the dataset".to_string(),
            ));
        }

        let grid = Arc::new(GridBuilder::new(self.config.grid_resolution).build(readings)?);
        let buckets = TimeAggregator::new(self.config.granularity).aggregate(readings);
        let tasks = self.enumerate_tasks(&buckets, &metrics);
        let total = tasks.len();

        info!(
            "Analysing {} readings: {} {} buckets x {} metrics x {} periods = {} tasks",
            readings.len(),
            buckets.len(),
            self.config.granularity,
            metrics.len(),
            self.config.periods.len(),
            total
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        let (tx, rx) = channel::unbounded::<usize>();
        let (tasks_ref, grid_ref, pool_ref) = (&tasks, &grid, &pool);

        let results: Vec<Result<TaskOutcome>> = std::thread::scope(|scope| {
            let worker = scope.spawn(move || {
                pool_ref.install(|| {
                    tasks_ref
                        .par_iter()
                        .map_with(tx, |tx, task| {
                            self.check_interrupt(deadline)?;
                            let outcome = self.run_task(task, grid_ref);
                            // The receiver only disappears if the caller's thread unwound
                            let _ = tx.send(task.index);
                            outcome
                        })
                        .collect()
                })
            });

            // Senders are dropped once every task has finished
            let mut completed = 0;
            for _ in rx.iter() {
                completed += 1;
                on_progress(Progress { completed, total });
            }

            worker
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
        });

        let mut fields = Vec::new();
        let mut skipped = Vec::new();
        let mut failed = Vec::new();

        for (task, result) in tasks.iter().zip(results) {
            match result {
                Ok(TaskOutcome::Completed(field)) => fields.push(*field),
                Ok(TaskOutcome::Skipped(reason)) => {
                    debug!("Skipped task {}: {:?}", task.id(), reason);
                    skipped.push(SkippedTask {
                        task: task.id(),
                        reason,
                    });
                }
                Err(e @ (ProcessingError::Cancelled | ProcessingError::DeadlineExceeded)) => {
                    warn!("Analysis interrupted: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("Task {} failed: {}", task.id(), e);
                    failed.push(FailedTask {
                        task: task.id(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let report = AnalysisReport {
            total_tasks: total,
            fields,
            skipped,
            failed,
            unavailable_metrics,
            elapsed: started.elapsed(),
        };
        info!(
            "Analysis finished: {} fields, {} skipped, {} failed in {:.2}s",
            report.fields.len(),
            report.skipped.len(),
            report.failed.len(),
            report.elapsed.as_secs_f64()
        );

        Ok(report)
    }

    fn check_interrupt(&self, deadline: Option<Instant>) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ProcessingError::Cancelled);
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(ProcessingError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Filter, aggregate and interpolate one task. Empty intermediates are skips.
    pub fn run_task(&self, task: &AnalysisTask<'_>, grid: &Arc<Grid>) -> Result<TaskOutcome> {
        let subset = DiurnalFilter::apply(&task.bucket.readings, task.period);
        if subset.is_empty() {
            return Ok(TaskOutcome::Skipped(SkipReason::NoReadingsInPeriod));
        }

        let sites = SiteAggregator::aggregate(&subset, task.metric);
        if sites.is_empty() {
            return Ok(TaskOutcome::Skipped(SkipReason::NoStationValues));
        }

        let values = self
            .interpolator
            .interpolate(&sites, grid, task.metric.uses_wind());

        let field = InterpolatedField::new(
            task.metric,
            task.bucket.key,
            task.bucket.label.clone(),
            task.period,
            values,
            Arc::clone(grid),
            sites,
        )?;

        debug!(
            "Task {} interpolated from {} stations ({} defined cells)",
            task.id(),
            field.station_count,
            field.defined_cells()
        );

        Ok(TaskOutcome::Completed(Box::new(field)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MetricValues, TimeGranularity};
    use chrono::{NaiveDate, NaiveDateTime};
    use pretty_assertions::assert_eq;

    fn at(month: u32, day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, month, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn reading(ts: NaiveDateTime, station: &str, lat: f64, lon: f64, pm25: f64) -> Reading {
        let mut values = MetricValues::default();
        values.pm25 = Some(pm25);
        values.temperature = Some(25.0);
        Reading::new(ts, station, lat, lon, values)
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig::new(TimeGranularity::Monthly)
            .with_grid_resolution(8)
            .with_max_workers(2)
    }

    /// Three months, supplied out of order; only morning hours in March.
    fn readings() -> Vec<Reading> {
        vec![
            reading(at(3, 1, 7), "A", 22.60, 120.30, 30.0),
            reading(at(1, 10, 7), "A", 22.60, 120.30, 10.0),
            reading(at(1, 10, 15), "B", 22.65, 120.35, 20.0),
            reading(at(2, 5, 12), "B", 22.65, 120.35, 40.0),
            reading(at(2, 5, 12), "A", 22.60, 120.30, 35.0),
        ]
    }

    #[test]
    fn test_tasks_follow_bucket_metric_period_order() {
        let config = config()
            .with_metrics(vec![Metric::Pm25, Metric::Temperature])
            .with_periods(vec![
                DiurnalPeriod::all(),
                DiurnalPeriod::builtin("noon").unwrap(),
            ]);
        let orchestrator = AnalysisOrchestrator::new(config).unwrap();
        let data = readings();
        let buckets = TimeAggregator::new(TimeGranularity::Monthly).aggregate(&data);
        let tasks = orchestrator.enumerate_tasks(&buckets, &[Metric::Pm25, Metric::Temperature]);

        let order: Vec<String> = tasks
            .iter()
            .map(|t| format!("{}/{}/{}", t.bucket.label, t.metric.key(), t.period.key))
            .collect();
        assert_eq!(
            order,
            vec![
                "2020-01/pm25/all",
                "2020-01/pm25/noon",
                "2020-01/temperature/all",
                "2020-01/temperature/noon",
                "2020-02/pm25/all",
                "2020-02/pm25/noon",
                "2020-02/temperature/all",
                "2020-02/temperature/noon",
                "2020-03/pm25/all",
                "2020-03/pm25/noon",
                "2020-03/temperature/all",
                "2020-03/temperature/noon",
            ]
        );
        assert!(tasks.iter().enumerate().all(|(i, t)| t.index == i));
    }

    #[test]
    fn test_run_emits_fields_in_ascending_bucket_order() {
        let orchestrator = AnalysisOrchestrator::new(config()).unwrap();
        let report = orchestrator.run(&readings(), |_| {}).unwrap();

        let labels: Vec<&str> = report.fields.iter().map(|f| f.bucket_label.as_str()).collect();
        assert_eq!(labels, vec!["2020-01", "2020-02", "2020-03"]);
        assert_eq!(report.total_tasks, 3);
        assert!(report.failed.is_empty());
        assert_eq!(report.fields[1].station_count, 2);
        assert_eq!(report.fields[1].mean_value, 37.5);
    }

    #[test]
    fn test_empty_period_is_skipped_not_failed() {
        let config = config().with_periods(vec![DiurnalPeriod::builtin("noon").unwrap()]);
        let orchestrator = AnalysisOrchestrator::new(config).unwrap();
        let report = orchestrator.run(&readings(), |_| {}).unwrap();

        // January has readings at 07:00 and 15:00, March only at 07:00
        assert_eq!(report.fields.len(), 1);
        assert_eq!(report.fields[0].bucket_label, "2020-02");
        assert_eq!(report.skipped.len(), 2);
        assert!(report
            .skipped
            .iter()
            .all(|s| s.reason == SkipReason::NoReadingsInPeriod));
    }

    #[test]
    fn test_missing_metric_values_skip_task() {
        let mut data = readings();
        data[0].values.humidity = Some(70.0);
        let config = config().with_metrics(vec![Metric::Humidity]);
        let orchestrator = AnalysisOrchestrator::new(config).unwrap();
        let report = orchestrator.run(&data, |_| {}).unwrap();

        assert_eq!(report.fields.len(), 1);
        assert_eq!(report.fields[0].bucket_label, "2020-03");
        assert_eq!(report.skipped.len(), 2);
        assert!(report
            .skipped
            .iter()
            .all(|s| s.reason == SkipReason::NoStationValues));
    }

    #[test]
    fn test_unavailable_metrics_dropped_once() {
        let config = config().with_metrics(vec![Metric::WindField, Metric::Pm25]);
        let orchestrator = AnalysisOrchestrator::new(config).unwrap();
        let report = orchestrator.run(&readings(), |_| {}).unwrap();

        assert_eq!(report.unavailable_metrics, vec![Metric::WindField]);
        assert_eq!(report.total_tasks, 3);
        assert!(report.fields.iter().all(|f| f.metric == Metric::Pm25));

        let only_wind = AnalysisOrchestrator::new(config_with_wind_only()).unwrap();
        assert!(matches!(
            only_wind.run(&readings(), |_| {}),
            Err(ProcessingError::MissingData(_))
        ));
    }

    fn config_with_wind_only() -> AnalysisConfig {
        config().with_metrics(vec![Metric::WindField])
    }

    #[test]
    fn test_progress_is_monotonic_and_complete() {
        let config = config().with_periods(vec![
            DiurnalPeriod::all(),
            DiurnalPeriod::builtin("dawn").unwrap(),
            DiurnalPeriod::builtin("noon").unwrap(),
        ]);
        let orchestrator = AnalysisOrchestrator::new(config).unwrap();
        let mut seen = Vec::new();
        let report = orchestrator
            .run(&readings(), |p| seen.push(p))
            .unwrap();

        assert_eq!(seen.len(), report.total_tasks);
        assert!(seen.windows(2).all(|w| w[1].completed > w[0].completed));
        let last = seen.last().unwrap();
        assert_eq!(last.completed, last.total);
        assert_eq!(last.fraction(), 1.0);
    }

    #[test]
    fn test_cancelled_run_returns_error() {
        let token = CancellationToken::new();
        token.cancel();
        let orchestrator = AnalysisOrchestrator::new(config())
            .unwrap()
            .with_cancellation(token);
        let mut progress_calls = 0;

        let result = orchestrator.run(&readings(), |_| progress_calls += 1);
        assert!(matches!(result, Err(ProcessingError::Cancelled)));
        assert_eq!(progress_calls, 0);
    }

    #[test]
    fn test_elapsed_deadline_aborts_run() {
        let orchestrator =
            AnalysisOrchestrator::new(config().with_deadline(Duration::ZERO)).unwrap();
        assert!(matches!(
            orchestrator.run(&readings(), |_| {}),
            Err(ProcessingError::DeadlineExceeded)
        ));
    }

    #[test]
    fn test_invalid_config_rejected_before_run() {
        let config = config().with_periods(Vec::new());
        assert!(matches!(
            AnalysisOrchestrator::new(config),
            Err(ProcessingError::Validation(_))
        ));
    }

    #[test]
    fn test_empty_readings_is_upstream_error() {
        let orchestrator = AnalysisOrchestrator::new(config()).unwrap();
        assert!(matches!(
            orchestrator.run(&[], |_| {}),
            Err(ProcessingError::MissingData(_))
        ));
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let orchestrator = AnalysisOrchestrator::new(config()).unwrap();
        let first = orchestrator.run(&readings(), |_| {}).unwrap();
        let second = orchestrator.run(&readings(), |_| {}).unwrap();

        for (a, b) in first.fields.iter().zip(&second.fields) {
            for (x, y) in a.values.iter().zip(b.values.iter()) {
                assert!((x.is_nan() && y.is_nan()) || (x - y).abs() < 1e-12);
            }
        }
    }
}
