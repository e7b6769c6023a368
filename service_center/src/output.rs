//! Export of batch results
//!
//! One CSV row per run plus a JSON summary across runs, for loading into
//! pandas or a spreadsheet.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::batch::RunOutcome;
use crate::config::ModelConfig;
use crate::error::OutputError;
use crate::simulation::SimulationReport;

/// Flat per-run record; empty cells mean the statistic had no samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRow {
    pub run_id: usize,
    pub seed: u64,
    pub minutes_run: usize,
    pub arrivals: usize,
    pub admitted: usize,
    pub finished: usize,
    pub lost: usize,
    pub queue_size: usize,
    pub in_service: usize,
    pub loss_rate: Option<f64>,
    pub mean_waiting_time: Option<f64>,
    pub mean_service_time: Option<f64>,
    pub mean_sojourn_time: Option<f64>,
    pub max_waiting_time: Option<usize>,
    pub mean_utilisation: Option<f64>,
}

impl RunRow {
    pub fn from_report(run_id: usize, seed: u64, report: &SimulationReport) -> Self {
        let utilisations: Vec<f64> = report
            .workers
            .iter()
            .filter_map(|w| w.utilisation)
            .collect();
        let mean_utilisation = if utilisations.is_empty() {
            None
        } else {
            Some(utilisations.iter().sum::<f64>() / utilisations.len() as f64)
        };

        RunRow {
            run_id,
            seed,
            minutes_run: report.minutes_run,
            arrivals: report.arrivals,
            admitted: report.admitted,
            finished: report.finished,
            lost: report.lost,
            queue_size: report.queue_size,
            in_service: report.in_service,
            loss_rate: report.loss_rate(),
            mean_waiting_time: report.mean_waiting_time,
            mean_service_time: report.mean_service_time,
            mean_sojourn_time: report.mean_sojourn_time,
            max_waiting_time: report.max_waiting_time,
            mean_utilisation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanStd {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl MeanStd {
    /// Population statistics; `None` for an empty slice
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        Some(MeanStd {
            mean,
            std: variance.sqrt(),
            min: samples.iter().copied().fold(f64::INFINITY, f64::min),
            max: samples.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

/// Cross-run summary. Runs without finished customers are counted in
/// `runs_without_samples` and left out of the time statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub num_runs: usize,
    pub successful_runs: usize,
    pub runs_without_samples: usize,
    pub finished: Option<MeanStd>,
    pub lost: Option<MeanStd>,
    pub loss_rate: Option<MeanStd>,
    pub final_queue_size: Option<MeanStd>,
    pub mean_waiting_time: Option<MeanStd>,
    pub mean_service_time: Option<MeanStd>,
    pub mean_sojourn_time: Option<MeanStd>,
}

impl AggregateMetrics {
    pub fn from_outcomes(outcomes: &[RunOutcome]) -> Self {
        let reports: Vec<&SimulationReport> = outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .collect();

        let summarise = |f: &dyn Fn(&SimulationReport) -> Option<f64>| -> Option<MeanStd> {
            let samples: Vec<f64> = reports.iter().copied().filter_map(|r| f(r)).collect();
            MeanStd::from_samples(&samples)
        };

        AggregateMetrics {
            num_runs: outcomes.len(),
            successful_runs: reports.len(),
            runs_without_samples: reports.iter().filter(|r| !r.has_samples()).count(),
            finished: summarise(&|r| Some(r.finished as f64)),
            lost: summarise(&|r| Some(r.lost as f64)),
            loss_rate: summarise(&|r| r.loss_rate()),
            final_queue_size: summarise(&|r| Some(r.queue_size as f64)),
            mean_waiting_time: summarise(&|r| r.mean_waiting_time),
            mean_service_time: summarise(&|r| r.mean_service_time),
            mean_sojourn_time: summarise(&|r| r.mean_sojourn_time),
        }
    }
}

/// What was run and when, written next to the results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchMetadata {
    pub config: ModelConfig,
    pub num_runs: usize,
    pub base_seed: u64,
    pub timestamp: String,
}

impl BatchMetadata {
    pub fn new(config: &ModelConfig, num_runs: usize, base_seed: u64) -> Self {
        BatchMetadata {
            config: config.clone(),
            num_runs,
            base_seed,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Rows for every successful run, in run order
pub fn run_rows(outcomes: &[RunOutcome]) -> Vec<RunRow> {
    outcomes
        .iter()
        .filter_map(|o| {
            o.result
                .as_ref()
                .ok()
                .map(|report| RunRow::from_report(o.run_id, o.seed, report))
        })
        .collect()
}

pub fn write_runs_csv(path: &Path, rows: &[RunRow]) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_aggregate_json(path: &Path, metrics: &AggregateMetrics) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(metrics)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn write_metadata_json(path: &Path, metadata: &BatchMetadata) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(metadata)?)?;
    Ok(())
}

/// Write `runs.csv` and `aggregate_summary.json` into `dir`
pub fn save_batch(dir: &Path, outcomes: &[RunOutcome]) -> Result<AggregateMetrics, OutputError> {
    fs::create_dir_all(dir)?;
    write_runs_csv(&dir.join("runs.csv"), &run_rows(outcomes))?;
    let aggregate = AggregateMetrics::from_outcomes(outcomes);
    write_aggregate_json(&dir.join("aggregate_summary.json"), &aggregate)?;
    Ok(aggregate)
}
