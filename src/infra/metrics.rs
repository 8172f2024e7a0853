// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Accumulates loss/accuracy statistics over batches and records
// them as CSV rows.
//
// Two kinds of rows land in the same file:
//   - step rows      — running training state at a logging step
//   - "full" rows    — a complete validation pass
//
// Metrics recorded per row:
//   - epoch:    the epoch number (1, 2, 3, ...)
//   - step:     batch index within the epoch, or "full"
//   - loss:     average cross-entropy loss per batch
//   - accuracy: token-level accuracy over non-PAD positions
//
// Example CSV output:
//   epoch,step,loss,accuracy
//   1,0,3.124500,0.031000
//   1,full,2.890100,0.084000
//   ...
//
// How to read the metrics:
//   - Loss should decrease each epoch (model is learning)
//   - If "full" loss rises while step loss falls → overfitting

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

/// Statistics of a single processed batch.
#[derive(Debug, Clone, Copy)]
pub struct BatchInfo {
    pub loss:           f64,
    pub correct_tokens: usize,
    pub total_tokens:   usize,
}

/// Running totals over many batches.
#[derive(Debug, Clone, Copy, Default)]
pub struct LearningInfo {
    loss_sum:       f64,
    batches:        usize,
    correct_tokens: usize,
    total_tokens:   usize,
}

impl LearningInfo {
    pub fn accumulate(&mut self, batch: &BatchInfo) {
        self.loss_sum += batch.loss;
        self.batches += 1;
        self.correct_tokens += batch.correct_tokens;
        self.total_tokens += batch.total_tokens;
    }

    /// Collapse the running totals into reportable numbers.
    pub fn state(&self) -> MetricsState {
        MetricsState {
            loss: if self.batches > 0 {
                self.loss_sum / self.batches as f64
            } else {
                f64::NAN
            },
            accuracy: if self.total_tokens > 0 {
                self.correct_tokens as f64 / self.total_tokens as f64
            } else {
                0.0
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MetricsState {
    pub loss:     f64,
    pub accuracy: f64,
}

/// Which position in the run a row describes.
#[derive(Debug, Clone, Copy)]
pub enum LogStep {
    Batch(usize),
    FullDataset,
}

impl std::fmt::Display for LogStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogStep::Batch(step) => write!(f, "{step}"),
            LogStep::FullDataset => write!(f, "full"),
        }
    }
}

/// Appends metric rows to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a logger, writing the CSV header if the file does
    /// not exist yet so runs can append to the same log.
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("cannot create logging dir '{}'", dir.display()))?;
        let csv_path = dir.join("metrics.csv");

        if !csv_path.exists() {
            let mut file = fs::File::create(&csv_path)?;
            writeln!(file, "epoch,step,loss,accuracy")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }
        Ok(Self { csv_path })
    }

    /// Append one row.
    pub fn log(&mut self, epoch: usize, step: LogStep, state: &MetricsState) -> Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(file, "{epoch},{step},{:.6},{:.6}", state.loss, state.accuracy)?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_learning_info_averages() {
        let mut info = LearningInfo::default();
        info.accumulate(&BatchInfo { loss: 2.0, correct_tokens: 3, total_tokens: 10 });
        info.accumulate(&BatchInfo { loss: 4.0, correct_tokens: 7, total_tokens: 10 });

        let state = info.state();
        assert!((state.loss - 3.0).abs() < 1e-12);
        assert!((state.accuracy - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_info_has_no_loss() {
        let state = LearningInfo::default().state();
        assert!(state.loss.is_nan());
        assert_eq!(state.accuracy, 0.0);
    }

    #[test]
    fn test_csv_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = MetricsLogger::new(dir.path()).unwrap();
        logger
            .log(1, LogStep::Batch(5), &MetricsState { loss: 2.5, accuracy: 0.25 })
            .unwrap();
        logger
            .log(1, LogStep::FullDataset, &MetricsState { loss: 2.0, accuracy: 0.3 })
            .unwrap();

        let contents = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "epoch,step,loss,accuracy");
        assert_eq!(lines[1], "1,5,2.500000,0.250000");
        assert_eq!(lines[2], "1,full,2.000000,0.300000");
    }
}
