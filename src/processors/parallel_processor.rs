use crate::error::{ProcessingError, Result};
use crate::models::{Acquisition, BufferGeometry, NdviRaster, PipelineConfig, ResultTable};
use crate::processors::{
    spatial_mean, Aggregator, BufferSeries, CloudFilter, CoverageCounts, CoverageReport,
    DateObservation, NdviCalculator, RasterClipper, TemporalFilter,
};
use crate::readers::RasterSource;
use crate::utils::progress::ProgressReporter;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Everything a pipeline run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub table: ResultTable,
    pub series: Vec<BufferSeries>,
    pub coverage: CoverageReport,
}

/// NDVI of one (buffer, date) before the temporal filter.
#[derive(Debug, Clone)]
pub struct ImageResult {
    pub ndvi: NdviRaster,
    pub inside_buffer: usize,
    pub band_count: usize,
}

/// Runs the per-image and per-series stages, buffers in parallel.
pub struct ParallelProcessor {
    config: PipelineConfig,
}

impl ParallelProcessor {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Process every buffer against every acquisition.
    ///
    /// Any configuration or data error aborts the whole run.
    pub fn run<S>(
        &self,
        buffers: &[BufferGeometry],
        acquisitions: &[Acquisition<S>],
        progress: Option<&ProgressReporter>,
    ) -> Result<PipelineOutput>
    where
        S: RasterSource + Sync,
    {
        let total_buffers = buffers.len();
        let processed_count = Arc::new(AtomicUsize::new(0));

        info!(
            buffers = total_buffers,
            acquisitions = acquisitions.len(),
            workers = self.config.max_workers,
            "starting NDVI pipeline"
        );
        if let Some(p) = progress {
            p.set_message(&format!(
                "Processing {} locations x {} acquisitions...",
                total_buffers,
                acquisitions.len()
            ));
        }

        // Configure Rayon thread pool
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.max_workers)
            .build()
            .map_err(|e| ProcessingError::Configuration(e.to_string()))?;

        let series: Result<Vec<BufferSeries>> = pool.install(|| {
            buffers
                .par_iter()
                .map(|buffer| {
                    let result = self.process_buffer(buffer, acquisitions);

                    let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(p) = progress {
                        p.update(count as u64);
                    }

                    result
                })
                .collect()
        });
        let series = series?;

        let columns = buffers.iter().map(|b| b.id().to_string()).collect();
        let table = Aggregator::assemble(columns, &series)?;
        let coverage = CoverageReport::from_series(&series);

        if let Some(p) = progress {
            p.finish_with_message(&format!("Processed {} locations", total_buffers));
        }
        info!(
            rows = table.num_rows(),
            columns = table.num_columns(),
            "NDVI pipeline complete"
        );

        Ok(PipelineOutput {
            table,
            series,
            coverage,
        })
    }

    /// Per-series stage: all dates of one buffer, then the temporal filter and means.
    pub fn process_buffer<S: RasterSource>(
        &self,
        buffer: &BufferGeometry,
        acquisitions: &[Acquisition<S>],
    ) -> Result<BufferSeries> {
        debug!(location = %buffer.id(), "processing buffer");

        let mut images = Vec::with_capacity(acquisitions.len());
        for acquisition in acquisitions {
            let image = self
                .process_image(buffer, acquisition)
                .and_then(|image| {
                    self.check_consistent(images.first(), &image)?;
                    Ok(image)
                })
                .map_err(|e| {
                    e.in_context(buffer.id(), acquisition.date, &acquisition.source.name())
                })?;
            images.push(image);
        }

        let ndvis: Vec<NdviRaster> = images.iter().map(|i| i.ndvi.clone()).collect();
        let filter = TemporalFilter::new(
            self.config.ndvi_std_threshold,
            self.config.ndvi_min_threshold,
        );
        let filtered = filter.apply(&ndvis).map_err(|e| {
            ProcessingError::Data(format!("location {}: {}", buffer.id(), e))
        })?;

        let observations = acquisitions
            .iter()
            .zip(&images)
            .zip(&filtered)
            .map(|((acquisition, image), masked)| DateObservation {
                date: acquisition.date,
                mean: spatial_mean(masked),
                coverage: CoverageCounts {
                    inside_buffer: image.inside_buffer,
                    cloud_free: image.ndvi.valid_count(),
                    vegetation: masked.valid_count(),
                },
            })
            .collect();

        info!(location = %buffer.id(), dates = acquisitions.len(), "buffer complete");

        Ok(BufferSeries {
            index: buffer.index(),
            id: buffer.id().to_string(),
            observations,
        })
    }

    /// Per-image stage: clip, cloud mask, NDVI.
    pub fn process_image<S: RasterSource>(
        &self,
        buffer: &BufferGeometry,
        acquisition: &Acquisition<S>,
    ) -> Result<ImageResult> {
        let clipper = RasterClipper::new(self.config.nodata);
        let cloud_filter = CloudFilter::new(
            self.config.cloud_prob_threshold,
            self.config.cloud_prob_band,
            self.config.nodata,
        );
        let calculator =
            NdviCalculator::new(self.config.red_band, self.config.nir_band, self.config.nodata);

        let clipped = clipper.clip(&acquisition.source, &buffer.polygon)?;
        let inside_buffer = clipped.inside_count(self.config.nodata);
        let band_count = clipped.image.band_count();

        let cloudless = cloud_filter.apply(&clipped.image)?;
        let ndvi = calculator.compute(&cloudless)?;

        debug!(
            location = %buffer.id(),
            date = %acquisition.date,
            inside = inside_buffer,
            cloud_free = ndvi.valid_count(),
            "image processed"
        );

        Ok(ImageResult {
            ndvi,
            inside_buffer,
            band_count,
        })
    }

    fn check_consistent(&self, first: Option<&ImageResult>, image: &ImageResult) -> Result<()> {
        let Some(first) = first else {
            return Ok(());
        };
        if image.band_count != first.band_count {
            return Err(ProcessingError::Data(format!(
                "Raster has {} bands, earlier acquisitions have {}",
                image.band_count, first.band_count
            )));
        }
        if image.ndvi.shape() != first.ndvi.shape() {
            return Err(ProcessingError::ShapeMismatch {
                expected: first.ndvi.shape(),
                actual: image.ndvi.shape(),
            });
        }
        Ok(())
    }
}
