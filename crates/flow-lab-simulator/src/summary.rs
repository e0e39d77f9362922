use crate::sink::CsvRow;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusStats {
    pub count: usize,
    pub mean_throughput: f64,
    pub mean_delay: f64,
}

/// Class balance of one or more record files.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DatasetSummary {
    pub files: usize,
    pub records: usize,
    pub by_status: BTreeMap<String, StatusStats>,
    pub by_variant: BTreeMap<String, usize>,
}

impl DatasetSummary {
    fn add(&mut self, row: &CsvRow) {
        self.records += 1;
        let stats = self.by_status.entry(row.status.to_string()).or_default();
        stats.count += 1;
        // running means
        let n = stats.count as f64;
        stats.mean_throughput += (row.throughput - stats.mean_throughput) / n;
        stats.mean_delay += (row.delay - stats.mean_delay) / n;
        *self.by_variant.entry(row.variant.to_string()).or_default() += 1;
    }

    /// Reads one record CSV (header included) into the summary.
    pub fn add_reader<R: Read>(&mut self, reader: R) -> Result<()> {
        let mut reader = csv::Reader::from_reader(reader);
        for (line, row) in reader.deserialize::<CsvRow>().enumerate() {
            let row = row.with_context(|| format!("Malformed record on data line {}", line + 1))?;
            self.add(&row);
        }
        self.files += 1;
        Ok(())
    }
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} records from {} file(s)", self.records, self.files)?;
        for (status, stats) in &self.by_status {
            writeln!(
                f,
                "  {status:<8} {:>7}  mean throughput {:.4} Mbps  mean delay {:.6} s",
                stats.count, stats.mean_throughput, stats.mean_delay
            )?;
        }
        for (variant, count) in &self.by_variant {
            writeln!(f, "  {variant:<12} {count:>7}")?;
        }
        Ok(())
    }
}

pub fn summarize<P: AsRef<Path>>(paths: &[P]) -> Result<DatasetSummary> {
    let mut summary = DatasetSummary::default();
    for path in paths {
        let path = path.as_ref();
        info!("Reading {}", path.display());
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open record file {}", path.display()))?;
        summary
            .add_reader(file)
            .with_context(|| format!("Failed to read record file {}", path.display()))?;
    }
    Ok(summary)
}
