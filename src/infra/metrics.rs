// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training losses to a CSV file after each epoch.
//
// Output file: <dir>/metrics.csv
//
//   epoch,train_loss,val_loss
//   1,3.124500,3.089200
//   2,2.890100,2.854300
//
// The header is written once; later runs append to the same
// file. A NaN val_loss means the validation split was too short
// for a single window.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::domain::metrics::EpochMetrics;
use crate::domain::traits::EpochObserver;

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create the directory and the CSV header if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,train_loss,val_loss")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(f, "{},{:.6},{:.6}", m.epoch, m.train_loss, m.val_loss)?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

impl EpochObserver for MetricsLogger {
    fn on_epoch_end(&mut self, epoch: usize, train_loss: f64, val_loss: f64) {
        if let Err(e) = self.log(&EpochMetrics::new(epoch, train_loss, val_loss)) {
            tracing::warn!("Could not record epoch {}: {:#}", epoch, e);
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_are_appended_after_the_header() {
        let tmp = tempfile::tempdir().unwrap();
        let mut logger = MetricsLogger::new(tmp.path()).unwrap();
        logger.on_epoch_end(1, 2.5, 2.25);
        logger.on_epoch_end(2, 2.0, f64::NAN);

        let csv = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines, vec![
            "epoch,train_loss,val_loss",
            "1,2.500000,2.250000",
            "2,2.000000,NaN",
        ]);
    }

    #[test]
    fn test_header_is_written_once_across_runs() {
        let tmp = tempfile::tempdir().unwrap();
        MetricsLogger::new(tmp.path()).unwrap().log(&EpochMetrics::new(1, 1.0, 1.0)).unwrap();
        let logger = MetricsLogger::new(tmp.path()).unwrap();
        logger.log(&EpochMetrics::new(1, 0.5, 0.5)).unwrap();

        let csv = fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(csv.matches("epoch,").count(), 1);
        assert_eq!(csv.lines().count(), 3);
    }
}
