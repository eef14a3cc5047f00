use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::analysis::{AnalysisOrchestrator, AnalysisReport, CancellationToken, Settings};
use crate::analyzers::DatasetAnalyzer;
use crate::cli::args::{Cli, Commands};
use crate::error::{ProcessingError, Result};
use crate::processors::{PreparedDataset, ReadingPreparer};
use crate::readers::{ReadingReader, StationReader};
use crate::utils::filename::generate_default_run_dir;
use crate::utils::progress::ProgressReporter;
use crate::writers::{ParquetFieldWriter, RunManifest};

/// Files produced by one `analyze` run.
#[derive(Debug)]
pub struct AnalysisOutput {
    pub output_dir: PathBuf,
    pub files: Vec<PathBuf>,
    pub manifest: PathBuf,
    pub report: AnalysisReport,
}

pub async fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.verbose, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Analyze {
            data,
            analysis,
            output_dir,
            output_prefix,
            compression,
            quiet,
        } => {
            let mut settings = Settings::load(cli.config.as_deref())?;
            data.apply(&mut settings)?;
            analysis.apply(&mut settings);
            if output_dir.is_some() {
                settings.output_dir = output_dir;
            }
            if let Some(prefix) = output_prefix {
                settings.output_prefix = prefix;
            }
            if let Some(compression) = compression {
                settings.compression = compression;
            }

            let output = analyze(settings, quiet).await?;

            println!("\n{}", output.report.summary());
            println!(
                "Wrote {} field files and {} to {}",
                output.files.len(),
                output
                    .manifest
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                output.output_dir.display()
            );
        }

        Commands::Validate { data, analysis } => {
            let mut settings = Settings::load(cli.config.as_deref())?;
            data.apply(&mut settings)?;
            analysis.apply(&mut settings);
            validate(settings).await?;
        }

        Commands::Info { file, sample } => {
            info_command(&file, sample)?;
        }
    }

    Ok(())
}

/// Install the global fmt subscriber. A second call keeps the first subscriber.
pub fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false);

    let installed = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            tracing::subscriber::set_global_default(
                builder
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .finish(),
            )
        }
        None => tracing::subscriber::set_global_default(
            builder.with_writer(std::io::stderr).finish(),
        ),
    };

    if installed.is_err() {
        debug!("Tracing subscriber already installed");
    }
    Ok(())
}

/// Read and prepare readings on a blocking thread.
pub async fn load_dataset(settings: &Settings) -> Result<PreparedDataset> {
    let settings = settings.clone();
    tokio::task::spawn_blocking(move || {
        let stations = StationReader::new().read_stations_map(&settings.station_file)?;
        info!(
            "Loaded {} stations from {}",
            stations.len(),
            settings.station_file.display()
        );

        let set = ReadingReader::new()
            .with_file_pattern(&settings.file_pattern)
            .read_all(&settings.data_dir)?;

        ReadingPreparer::with_window(settings.window.clone())?.prepare(set.readings, &stations)
    })
    .await?
}

pub async fn analyze(settings: Settings, quiet: bool) -> Result<AnalysisOutput> {
    // Configuration errors abort before any data is touched
    let config = settings.to_analysis_config()?;
    let writer = ParquetFieldWriter::new().with_compression(&settings.compression)?;
    let output_dir = settings
        .output_dir
        .clone()
        .unwrap_or_else(|| generate_default_run_dir(&settings.output_prefix));

    let loading = ProgressReporter::new_spinner("Loading readings...", quiet);
    let prepared = load_dataset(&settings).await?;
    loading.finish_with_message(&format!("Prepared {} readings", prepared.readings.len()));
    info!("{}", prepared.report.summary());

    let cancel = CancellationToken::new();
    let orchestrator =
        AnalysisOrchestrator::new(config.clone())?.with_cancellation(cancel.clone());

    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after running tasks");
            cancel.cancel();
        }
    });

    let progress = Arc::new(ProgressReporter::new(0, "Interpolating fields...", quiet));
    let reporter = Arc::clone(&progress);
    let readings = prepared.readings;
    let result = tokio::task::spawn_blocking(move || {
        orchestrator.run(&readings, |p| reporter.report(p))
    })
    .await;
    ctrl_c.abort();

    let report = match result? {
        Ok(report) => report,
        Err(e) => {
            progress.abandon_with_message(&format!("Analysis aborted: {}", e));
            return Err(e);
        }
    };
    progress.finish_with_message(&format!(
        "Interpolated {} of {} tasks",
        report.fields.len(),
        report.total_tasks
    ));

    if report.fields.is_empty() {
        return Err(ProcessingError::NoOutput);
    }

    let files = writer.write_fields(&report.fields, &output_dir, &settings.output_prefix)?;
    let manifest = RunManifest::new(&config, &report, &files).write(&output_dir)?;
    info!(
        "Wrote {} field files to {}",
        files.len(),
        output_dir.display()
    );

    Ok(AnalysisOutput {
        output_dir,
        files,
        manifest,
        report,
    })
}

pub async fn validate(settings: Settings) -> Result<()> {
    let config = settings.to_analysis_config()?;

    let progress = ProgressReporter::new_spinner("Validating readings...", false);
    let prepared = load_dataset(&settings).await?;
    progress.finish_with_message("Validation complete");

    let stats =
        DatasetAnalyzer::new().analyze(&prepared.readings, config.granularity, &config.metrics)?;

    println!("\n{}", prepared.report.summary());
    println!("\n{}", stats.summary());

    if stats.metric_availability.iter().all(|(_, available)| *available) {
        println!("✅ All requested metrics have source data");
    } else {
        println!("⚠️  Some requested metrics have no source data and will be skipped");
    }

    Ok(())
}

pub fn info_command(file: &Path, sample: usize) -> Result<()> {
    println!("Field file: {}", file.display());

    let writer = ParquetFieldWriter::new();
    let file_info = writer.get_file_info(file)?;

    let mut metadata: Vec<(String, String)> =
        writer.read_field_metadata(file)?.into_iter().collect();
    metadata.retain(|(key, _)| !key.starts_with("ARROW:"));
    metadata.sort();

    println!("\nProvenance:");
    for (key, value) in &metadata {
        println!("  {}: {}", key, value);
    }

    println!("\nFile Details:");
    println!("{}", file_info.summary());

    if sample > 0 {
        println!("\nSample Cells (showing up to {}):", sample);
        match writer.read_sample_cells(file, sample) {
            Ok(cells) => {
                for cell in cells {
                    let value = cell
                        .value
                        .map(|v| format!("{:.3}", v))
                        .unwrap_or_else(|| "undefined".to_string());
                    println!(
                        "  [{}, {}] ({:.5}°E, {:.5}°N) = {}",
                        cell.row, cell.col, cell.longitude, cell.latitude, value
                    );
                }
            }
            Err(e) => println!("Error reading sample data: {}", e),
        }
    }

    Ok(())
}
