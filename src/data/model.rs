use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

use crate::statistics::SeriesProvider;

// ---------------------------------------------------------------------------
// Column – one named quantity as read from a source file
// ---------------------------------------------------------------------------

/// A single named column before it is assembled into an [`EnergySeries`].
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    /// Display unit, empty when the source carries none.
    pub unit: String,
    pub values: Vec<f64>,
}

impl Column {
    pub fn new(name: impl Into<String>, unit: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            values,
        }
    }
}

// ---------------------------------------------------------------------------
// EnergySeries – one loaded energy file
// ---------------------------------------------------------------------------

/// One loaded energy record: a simulation-time axis plus every tracked
/// quantity, index-aligned with that axis.
///
/// The first column of the source is the time axis. It is also kept as an
/// ordinary quantity so it can be selected and plotted like any other.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergySeries {
    /// Simulation time (or step index) per row.
    pub time: Vec<f64>,
    /// Quantity names in source order; `quantities[0]` is the time column.
    pub quantities: Vec<String>,
    /// quantity name → samples, every entry has `time.len()` values.
    pub values: BTreeMap<String, Vec<f64>>,
    /// quantity name → display unit.
    pub units: BTreeMap<String, String>,
    /// File the series was read from.
    pub source: PathBuf,
}

impl EnergySeries {
    /// Assemble a series from its columns. The first column becomes the time
    /// axis; every column must have the same length and a unique name.
    pub fn from_columns(source: &Path, columns: Vec<Column>) -> Result<Self> {
        let Some(first) = columns.first() else {
            bail!("{}: no columns found", source.display());
        };
        let time = first.values.clone();

        let mut quantities = Vec::with_capacity(columns.len());
        let mut values = BTreeMap::new();
        let mut units = BTreeMap::new();

        for column in columns {
            if column.values.len() != time.len() {
                bail!(
                    "{}: column '{}' has {} values but the time axis has {}",
                    source.display(),
                    column.name,
                    column.values.len(),
                    time.len()
                );
            }
            if values.contains_key(&column.name) {
                bail!("{}: duplicate column '{}'", source.display(), column.name);
            }
            quantities.push(column.name.clone());
            units.insert(column.name.clone(), column.unit);
            values.insert(column.name, column.values);
        }

        Ok(EnergySeries {
            time,
            quantities,
            values,
            units,
            source: source.to_path_buf(),
        })
    }

    /// Number of rows (time steps).
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Whether the series holds no rows.
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Name of the time column.
    pub fn time_name(&self) -> &str {
        self.quantities.first().map(String::as_str).unwrap_or_default()
    }

    pub fn unit(&self, quantity: &str) -> Option<&str> {
        self.units.get(quantity).map(String::as_str)
    }

    /// File name without directories, used as legend label.
    pub fn label(&self) -> String {
        self.source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.display().to_string())
    }
}

impl SeriesProvider for EnergySeries {
    fn time(&self) -> &[f64] {
        &self.time
    }

    fn values(&self, quantity: &str) -> Option<&[f64]> {
        self.values.get(quantity).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("SIMULATION-TIME", "fs", vec![1.0, 2.0, 3.0]),
            Column::new("TEMPERATURE", "K", vec![300.0, 301.0, 299.5]),
        ]
    }

    #[test]
    fn first_column_is_time_axis() {
        let series = EnergySeries::from_columns(Path::new("md-01.en"), columns()).unwrap();
        assert_eq!(series.time, vec![1.0, 2.0, 3.0]);
        assert_eq!(series.time_name(), "SIMULATION-TIME");
        assert_eq!(series.values("SIMULATION-TIME"), Some(&[1.0, 2.0, 3.0][..]));
        assert_eq!(series.unit("TEMPERATURE"), Some("K"));
        assert_eq!(series.label(), "md-01.en");
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn ragged_columns_are_rejected() {
        let mut cols = columns();
        cols[1].values.pop();
        let err = EnergySeries::from_columns(Path::new("bad.en"), cols).unwrap_err();
        assert!(err.to_string().contains("TEMPERATURE"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut cols = columns();
        cols[1].name = "SIMULATION-TIME".to_string();
        assert!(EnergySeries::from_columns(Path::new("dup.en"), cols).is_err());
    }

    #[test]
    fn no_columns_is_an_error() {
        assert!(EnergySeries::from_columns(Path::new("none.en"), Vec::new()).is_err());
    }
}
