use crate::processors::BufferSeries;
use chrono::NaiveDate;
use serde::Serialize;

/// Pixel counts for one (buffer, date) at each masking stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CoverageCounts {
    /// Reference band valid after clipping
    pub inside_buffer: usize,
    /// Valid NDVI after cloud masking
    pub cloud_free: usize,
    /// Valid after the temporal vegetation filter
    pub vegetation: usize,
}

impl CoverageCounts {
    pub fn cloud_free_fraction(&self) -> Option<f64> {
        (self.inside_buffer > 0).then(|| self.cloud_free as f64 / self.inside_buffer as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageEntry {
    pub location: String,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub counts: CoverageCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoverageReport {
    pub entries: Vec<CoverageEntry>,
}

impl CoverageReport {
    /// Entries ordered by location order, then date.
    pub fn from_series(series: &[BufferSeries]) -> Self {
        let mut entries: Vec<(usize, CoverageEntry)> = series
            .iter()
            .flat_map(|buffer| {
                buffer.observations.iter().map(move |o| {
                    (
                        buffer.index,
                        CoverageEntry {
                            location: buffer.id.clone(),
                            date: o.date,
                            counts: o.coverage,
                        },
                    )
                })
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.date.cmp(&b.1.date)));

        Self {
            entries: entries.into_iter().map(|(_, e)| e).collect(),
        }
    }

    /// (buffer, date) pairs with no vegetation pixels left.
    pub fn empty_entries(&self) -> impl Iterator<Item = &CoverageEntry> {
        self.entries.iter().filter(|e| e.counts.vegetation == 0)
    }

    /// Generate a summary report
    pub fn generate_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== Coverage Report ===\n");
        summary.push_str(&format!(
            "{:<16} {:<12} {:>8} {:>11} {:>11}\n",
            "Location", "Date", "Inside", "Cloud-free", "Vegetation"
        ));
        for entry in &self.entries {
            let flag = if entry.counts.vegetation == 0 { "  (empty)" } else { "" };
            summary.push_str(&format!(
                "{:<16} {:<12} {:>8} {:>11} {:>11}{}\n",
                entry.location,
                entry.date.to_string(),
                entry.counts.inside_buffer,
                entry.counts.cloud_free,
                entry.counts.vegetation,
                flag
            ));
        }

        let empty = self.empty_entries().count();
        summary.push_str(&format!(
            "\nEntries without vegetation pixels: {} of {}\n",
            empty,
            self.entries.len()
        ));

        summary
    }
}
