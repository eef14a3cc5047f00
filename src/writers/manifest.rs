use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::analysis::{AnalysisConfig, AnalysisReport, FailedTask, SkippedTask};
use crate::error::Result;
use crate::interpolation::DiffusionParams;
use crate::models::{InterpolatedField, Metric, SiteValue};
use crate::utils::filename::manifest_path;

/// Machine-readable description of one analysis run and every file it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub generated_at: String,
    pub granularity: String,
    pub periods: Vec<String>,
    pub grid_resolution: usize,
    pub diffusion: DiffusionParams,
    pub total_tasks: usize,
    pub fields: Vec<FieldEntry>,
    pub skipped: Vec<SkippedTask>,
    pub failed: Vec<FailedTask>,
    pub unavailable_metrics: Vec<Metric>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldEntry {
    pub file: String,
    pub metric: Metric,
    pub title: String,
    pub units: String,
    pub bucket_label: String,
    pub period_key: String,
    pub period_name: String,
    pub station_count: usize,
    pub mean_value: Option<f64>,
    pub mean_wind_speed: Option<f64>,
    pub defined_cells: usize,
    pub value_range: Option<(f64, f64)>,
    pub sites: Vec<SiteEntry>,
}

/// Station marker data for the renderer, with wind arrow components when known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteEntry {
    pub station_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub value: f64,
    pub observation_count: usize,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub u: Option<f64>,
    pub v: Option<f64>,
}

impl From<&SiteValue> for SiteEntry {
    fn from(site: &SiteValue) -> Self {
        let components = site.wind_components();
        Self {
            station_id: site.station_id.clone(),
            latitude: site.latitude,
            longitude: site.longitude,
            value: site.value,
            observation_count: site.observation_count,
            wind_speed: site.wind_speed,
            wind_direction: site.wind_direction,
            u: components.map(|(u, _)| u),
            v: components.map(|(_, v)| v),
        }
    }
}

impl FieldEntry {
    pub fn new(field: &InterpolatedField, file: &Path) -> Self {
        Self {
            file: file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            metric: field.metric,
            title: field.metric.display_name().to_string(),
            units: field.metric.units().to_string(),
            bucket_label: field.bucket_label.clone(),
            period_key: field.period_key.clone(),
            period_name: field.period_name.clone(),
            station_count: field.station_count,
            mean_value: Some(field.mean_value).filter(|v| v.is_finite()),
            mean_wind_speed: field.mean_wind_speed,
            defined_cells: field.defined_cells(),
            value_range: field.value_range(),
            sites: field.sites.iter().map(SiteEntry::from).collect(),
        }
    }
}

impl RunManifest {
    /// `files` must be parallel to `report.fields`.
    pub fn new(config: &AnalysisConfig, report: &AnalysisReport, files: &[PathBuf]) -> Self {
        Self {
            generated_at: Local::now().to_rfc3339(),
            granularity: config.granularity.key().to_string(),
            periods: config.periods.iter().map(|p| p.key.clone()).collect(),
            grid_resolution: config.grid_resolution,
            diffusion: config.diffusion,
            total_tasks: report.total_tasks,
            fields: report
                .fields
                .iter()
                .zip(files)
                .map(|(field, file)| FieldEntry::new(field, file))
                .collect(),
            skipped: report.skipped.clone(),
            failed: report.failed.clone(),
            unavailable_metrics: report.unavailable_metrics.clone(),
        }
    }

    pub fn write(&self, output_dir: &Path) -> Result<PathBuf> {
        let path = manifest_path(output_dir);
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(path)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}
