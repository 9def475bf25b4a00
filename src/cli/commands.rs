use crate::acquisition::Downloader;
use crate::analyzers::SeriesAnalyzer;
use crate::cli::args::{Cli, Commands};
use crate::error::{ProcessingError, Result};
use crate::models::{BufferGeometry, OutputFormat, OutputSettings, RasterMeta, Settings};
use crate::processors::{GeometryBuilder, ParallelProcessor, PipelineOutput};
use crate::readers::{AcquisitionCatalog, PointsReader};
use crate::utils::constants::REFERENCE_BAND;
use crate::utils::filename::generate_default_output_filename;
use crate::utils::progress::ProgressReporter;
use crate::writers::{self, ParquetWriter};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use validator::Validate;

pub async fn run(cli: Cli) -> Result<()> {
    let quiet = cli.quiet;

    match cli.command {
        Commands::Process {
            input,
            pipeline,
            output_file,
            format,
            compression,
        } => {
            let mut settings = Settings::load(cli.config.as_deref())?;
            input.apply(&mut settings);
            pipeline.apply(&mut settings);
            if output_file.is_some() {
                settings.output.output_file = output_file;
            }
            if let Some(compression) = compression {
                settings.output.compression = compression;
            }
            settings.validate()?;

            let (output_path, format) = resolve_output(&settings.output, format);

            if !quiet {
                println!("Computing NDVI time series...");
                println!("Data directory: {}", settings.input.data_dir.display());
                println!("Output file: {}", output_path.display());
                println!(
                    "Buffer: {} m, workers: {}",
                    settings.pipeline.buffer_distance_m, settings.pipeline.max_workers
                );
            }

            let output = run_pipeline(&settings, quiet)?;

            writers::write_table(
                &output.table,
                &output_path,
                format,
                &settings.output.compression,
            )?;

            if !quiet {
                println!("\n{}", output.coverage.generate_summary());
                println!("{}", SeriesAnalyzer::new().analyze(&output.table).summary());

                if format == OutputFormat::Parquet {
                    let file_info = ParquetWriter::new().get_file_info(&output_path)?;
                    println!("{}", file_info.summary());
                }
                println!("Processing complete!");
            }
        }

        Commands::Validate { input, pipeline } => {
            let mut settings = Settings::load(cli.config.as_deref())?;
            input.apply(&mut settings);
            pipeline.apply(&mut settings);
            settings.validate()?;

            if !quiet {
                println!("Validating inputs in {}...", settings.input.data_dir.display());
            }

            let progress = ProgressReporter::new_spinner("Reading raster headers...", quiet);
            let check = validate_inputs(&settings)?;
            progress.finish_with_message("Validation complete");

            if !quiet {
                println!("\n{}", check.summary());
                println!("All inputs passed validation checks");
            }
        }

        Commands::Download {
            input,
            base_url,
            max_concurrent,
        } => {
            let mut settings = Settings::load(cli.config.as_deref())?;
            input.apply(&mut settings);
            if let Some(url) = base_url {
                settings.acquisition.base_url = url;
            }
            if let Some(n) = max_concurrent {
                settings.acquisition.max_concurrent = n;
            }
            settings.validate()?;

            if settings.input.rasters.is_empty() {
                return Err(ProcessingError::Configuration(
                    "No raster file names configured for download".to_string(),
                ));
            }

            let progress = ProgressReporter::new_spinner(
                &format!(
                    "Fetching {} raster(s) into {}...",
                    settings.input.rasters.len(),
                    settings.input.data_dir.display()
                ),
                quiet,
            );

            let downloader = Downloader::from_settings(&settings.acquisition)?;
            let report = downloader
                .fetch_missing(&settings.input.rasters, &settings.input.data_dir)
                .await?;

            progress.finish_with_message(&report.summary());
        }

        Commands::Info { file, json } => {
            let summary = SeriesAnalyzer::new().analyze_file(&file)?;

            if json {
                let text = serde_json::to_string_pretty(&summary)
                    .map_err(|e| ProcessingError::Data(e.to_string()))?;
                println!("{}", text);
            } else {
                println!("Result table: {}", file.display());
                println!("\n{}", summary.summary());

                if OutputFormat::from_path(&file) == Some(OutputFormat::Parquet) {
                    let file_info = ParquetWriter::new().get_file_info(&file)?;
                    println!("File Details:");
                    println!("{}", file_info.summary());
                }
            }
        }
    }

    Ok(())
}

/// The explicit `--format` wins, then the output file extension, then the settings.
fn resolve_output(output: &OutputSettings, format: Option<OutputFormat>) -> (PathBuf, OutputFormat) {
    let format = format
        .or_else(|| output.output_file.as_deref().and_then(OutputFormat::from_path))
        .unwrap_or(output.format);

    let path = output
        .output_file
        .clone()
        .unwrap_or_else(|| generate_default_output_filename(format));

    (path, format)
}

fn build_buffers(settings: &Settings) -> Result<Vec<BufferGeometry>> {
    let input = &settings.input;
    let points = PointsReader::new()
        .with_columns(&input.x_column, &input.y_column)
        .with_id_column(input.id_column.as_deref())
        .read_points(&settings.points_path())?;

    GeometryBuilder::from_config(&settings.pipeline).build_all(&points)
}

/// Read points, build buffers, resolve acquisitions and run the pipeline.
pub fn run_pipeline(settings: &Settings, quiet: bool) -> Result<PipelineOutput> {
    let buffers = build_buffers(settings)?;
    let acquisitions = AcquisitionCatalog::from_settings(&settings.input).resolve()?;
    info!(
        locations = buffers.len(),
        acquisitions = acquisitions.len(),
        "inputs resolved"
    );

    let progress = ProgressReporter::new(buffers.len() as u64, "Processing locations...", quiet);
    ParallelProcessor::new(settings.pipeline.clone()).run(&buffers, &acquisitions, Some(&progress))
}

/// Header-level facts gathered by [`validate_inputs`].
#[derive(Debug, Clone)]
pub struct InputCheck {
    pub locations: usize,
    pub rasters: Vec<(NaiveDate, PathBuf, RasterMeta)>,
}

impl InputCheck {
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Locations: {}\nAcquisitions: {}\n",
            self.locations,
            self.rasters.len()
        );
        for (date, path, meta) in &self.rasters {
            let crs = meta
                .epsg
                .map(|e| format!("EPSG:{}", e))
                .unwrap_or_else(|| "no CRS".to_string());
            summary.push_str(&format!(
                "- {} {}: {}x{} px, {} bands, {}, {}\n",
                date,
                file_name(path),
                meta.width,
                meta.height,
                meta.band_count,
                meta.pixel_type,
                crs
            ));
        }
        summary
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Check points, buffers and raster headers without decoding pixel data.
pub fn validate_inputs(settings: &Settings) -> Result<InputCheck> {
    let buffers = build_buffers(settings)?;
    let acquisitions = AcquisitionCatalog::from_settings(&settings.input).resolve()?;
    let pipeline = &settings.pipeline;

    let bands = [
        (REFERENCE_BAND, "reference"),
        (pipeline.red_band, "red"),
        (pipeline.nir_band, "nir"),
        (pipeline.cloud_prob_band, "cloud probability"),
    ];

    let mut rasters = Vec::with_capacity(acquisitions.len());
    let mut expected_bands: Option<usize> = None;

    for acquisition in &acquisitions {
        let path = acquisition.source.path();
        let name = file_name(path);
        let context = |e: ProcessingError| e.in_raster_context(acquisition.date, &name);

        let meta = acquisition.source.read_meta().map_err(context)?;
        debug!(file = %name, bands = meta.band_count, "read raster header");

        if let Some((index, role)) = bands.iter().find(|(i, _)| *i >= meta.band_count) {
            return Err(context(ProcessingError::BandIndex {
                role: *role,
                index: *index,
                band_count: meta.band_count,
            }));
        }

        match expected_bands {
            Some(expected) if expected != meta.band_count => {
                return Err(context(ProcessingError::Data(format!(
                    "band count {} differs from {} in earlier acquisitions",
                    meta.band_count, expected
                ))));
            }
            _ => expected_bands = Some(meta.band_count),
        }

        rasters.push((acquisition.date, path.to_path_buf(), meta));
    }

    Ok(InputCheck {
        locations: buffers.len(),
        rasters,
    })
}
