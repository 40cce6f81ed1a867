use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use thiserror::Error;

use super::loader::load_file;
use super::model::EnergySeries;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("the list of filenames is empty, provide at least one energy file")]
    NoFiles,

    #[error("{path} does not track the same quantities as {reference}")]
    InconsistentQuantities { path: PathBuf, reference: PathBuf },
}

// ---------------------------------------------------------------------------
// Reader – the ordered collection of loaded energy files
// ---------------------------------------------------------------------------

/// All loaded energy files, in the order given by the user.
///
/// Every series tracks the same quantity names. Series are shared behind
/// `Arc` and never mutated: re-reading the newest file swaps in a fresh one.
#[derive(Debug, Clone)]
pub struct Reader {
    filenames: Vec<PathBuf>,
    series: Vec<Arc<EnergySeries>>,
}

impl Reader {
    /// Read every file and check they describe the same quantities.
    pub fn new(filenames: Vec<PathBuf>) -> Result<Self> {
        if filenames.is_empty() {
            return Err(ReaderError::NoFiles.into());
        }

        let series = filenames
            .iter()
            .map(|path| read_one(path).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;

        if let Some((first, rest)) = series.split_first() {
            for other in rest {
                check_consistent(first, other)?;
            }
        }

        for s in series.iter().filter(|s| s.is_empty()) {
            log::warn!("{} contains no samples", s.source.display());
        }
        log::info!(
            "Loaded {} energy file(s), {} samples in total",
            series.len(),
            series.iter().map(|s| s.len()).sum::<usize>()
        );
        Ok(Reader { filenames, series })
    }

    /// Re-read the last file and replace its series.
    ///
    /// On failure the previous series is kept.
    pub fn read_last(&mut self) -> Result<()> {
        let Some(path) = self.filenames.last() else {
            return Err(ReaderError::NoFiles.into());
        };
        let fresh = read_one(path)?;
        check_consistent(&self.series[0], &fresh)?;

        log::debug!("Re-read {} ({} samples)", path.display(), fresh.len());
        if let Some(last) = self.series.last_mut() {
            *last = Arc::new(fresh);
        }
        Ok(())
    }

    pub fn series(&self) -> &[Arc<EnergySeries>] {
        &self.series
    }

    pub fn filenames(&self) -> &[PathBuf] {
        &self.filenames
    }

    /// Quantities the user can choose from: everything except the time column.
    pub fn quantities(&self) -> &[String] {
        self.series[0].quantities.get(1..).unwrap_or_default()
    }

    /// Unit of `quantity` as reported by the first file.
    pub fn unit(&self, quantity: &str) -> &str {
        self.series[0].unit(quantity).unwrap_or_default()
    }

    /// Name of the time column.
    pub fn time_name(&self) -> &str {
        self.series[0].time_name()
    }

    /// Total number of samples over every file.
    pub fn total_samples(&self) -> usize {
        self.series.iter().map(|s| s.len()).sum()
    }
}

fn read_one(path: &Path) -> Result<EnergySeries> {
    load_file(path).with_context(|| format!("reading energy file {}", path.display()))
}

fn quantity_set(series: &EnergySeries) -> BTreeSet<&str> {
    series.quantities.iter().map(String::as_str).collect()
}

fn check_consistent(reference: &EnergySeries, other: &EnergySeries) -> Result<(), ReaderError> {
    if quantity_set(reference) == quantity_set(other) {
        Ok(())
    } else {
        Err(ReaderError::InconsistentQuantities {
            path: other.source.clone(),
            reference: reference.source.clone(),
        })
    }
}
