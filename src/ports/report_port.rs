//! Report generation port trait.

use std::path::{Path, PathBuf};

use crate::domain::error::CoinsimError;
use crate::domain::metrics::Comparison;

/// Port for writing backtest reports.
pub trait ReportPort {
    /// Write the report under `output_dir`, returning the files created.
    fn write(
        &self,
        comparison: &Comparison,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, CoinsimError>;
}
