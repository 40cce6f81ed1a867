use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, Float32Array, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;

use super::model::{Column, EnergySeries};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load one energy file.  Dispatch by extension.
///
/// Supported formats:
/// * `.en`      – whitespace separated columns, names/units in the sibling `.info` file
/// * `.csv`     – header row `NAME` or `NAME [unit]`, one column per quantity
/// * `.json`    – `{ "columns": [{ "name": .., "unit": .., "values": [..] }, ..] }`
/// * `.parquet` – one numeric column per quantity, unit in the field metadata
///
/// In every format the first column is the simulation time axis.
pub fn load_file(path: &Path) -> Result<EnergySeries> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        "en" => load_energy(path),
        // Energy logs do not always use `.en` (`run.out`, `md-01.ene`);
        // anything with an info file next to it is treated as one.
        _ if info_path(path).is_file() => load_energy(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// Energy (.en) + info (.info) loader
// ---------------------------------------------------------------------------

/// The `.info` file that describes the columns of `path`.
pub fn info_path(path: &Path) -> PathBuf {
    path.with_extension("info")
}

/// Info file layout, a grid of `|`-delimited cells:
///
/// ```text
/// |  SIMULATION-TIME      5.00 fs       |  TEMPERATURE        300.12 K     |
/// |  PRESSURE             1.01 bar      |  E(QM)             -12.50 kcal/mol |
/// ```
///
/// Each cell is `NAME value [unit]`; its position in reading order is the
/// column index in the energy file. Cells whose second token is not a number
/// (titles, separators) are ignored.
pub fn parse_info(text: &str) -> Vec<(String, String)> {
    text.lines()
        .flat_map(|line| line.split('|'))
        .filter_map(|cell| {
            let mut tokens = cell.split_whitespace();
            let name = tokens.next()?;
            let value = tokens.next()?;
            value.parse::<f64>().ok()?;
            let unit = tokens.collect::<Vec<_>>().join(" ");
            Some((name.to_string(), unit))
        })
        .collect()
}

fn load_energy(path: &Path) -> Result<EnergySeries> {
    let info_file = info_path(path);
    let info_text = std::fs::read_to_string(&info_file)
        .with_context(|| format!("reading info file {}", info_file.display()))?;
    let info = parse_info(&info_text);
    if info.is_empty() {
        bail!("{}: no quantities found", info_file.display());
    }

    let text = std::fs::read_to_string(path).context("reading energy file")?;
    let mut data: Vec<Vec<f64>> = vec![Vec::new(); info.len()];

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row: Vec<f64> = line
            .split_whitespace()
            .enumerate()
            .map(|(j, tok)| {
                tok.parse::<f64>().with_context(|| {
                    format!("Line {}, column {j}: '{tok}' is not a number", line_no + 1)
                })
            })
            .collect::<Result<_>>()?;

        if row.len() != info.len() {
            bail!(
                "Line {}: {} columns but the info file lists {}",
                line_no + 1,
                row.len(),
                info.len()
            );
        }
        for (column, value) in data.iter_mut().zip(row) {
            column.push(value);
        }
    }

    if data[0].is_empty() {
        bail!("{}: energy file contains no data", path.display());
    }

    let columns = info
        .into_iter()
        .zip(data)
        .map(|((name, unit), values)| Column::new(name, unit, values))
        .collect();
    EnergySeries::from_columns(path, columns)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Split a `NAME [unit]` header into its parts.
fn split_header(header: &str) -> (String, String) {
    let header = header.trim();
    if let Some(open) = header.rfind('[') {
        if let Some(unit) = header[open + 1..].strip_suffix(']') {
            return (header[..open].trim().to_string(), unit.trim().to_string());
        }
    }
    (header.to_string(), String::new())
}

fn load_csv(path: &Path) -> Result<EnergySeries> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<(String, String)> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(split_header)
        .collect();
    if headers.is_empty() {
        bail!("CSV has no columns");
    }

    let mut data: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        for (col_idx, field) in record.iter().enumerate() {
            let value = field.trim().parse::<f64>().with_context(|| {
                format!("CSV row {row_no}, column '{}': '{field}' is not a number", headers[col_idx].0)
            })?;
            data[col_idx].push(value);
        }
    }

    let columns = headers
        .into_iter()
        .zip(data)
        .map(|((name, unit), values)| Column::new(name, unit, values))
        .collect();
    EnergySeries::from_columns(path, columns)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct JsonEnergy {
    columns: Vec<JsonColumn>,
}

#[derive(Debug, Deserialize)]
struct JsonColumn {
    name: String,
    #[serde(default)]
    unit: String,
    values: Vec<f64>,
}

/// Expected JSON schema:
///
/// ```json
/// {
///   "columns": [
///     { "name": "SIMULATION-TIME", "unit": "fs", "values": [1.0, 2.0] },
///     { "name": "TEMPERATURE", "unit": "K", "values": [300.1, 299.8] }
///   ]
/// }
/// ```
fn load_json(path: &Path) -> Result<EnergySeries> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonEnergy = serde_json::from_str(&text).context("parsing JSON")?;

    let columns = root
        .columns
        .into_iter()
        .map(|c| Column::new(c.name, c.unit, c.values))
        .collect();
    EnergySeries::from_columns(path, columns)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one numeric column per quantity.
///
/// Columns may be Float64, Float32, Int32 or Int64; nulls become `NaN`.
/// A `unit` entry in a field's metadata is used as that quantity's unit.
fn load_parquet(path: &Path) -> Result<EnergySeries> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let schema = builder.schema().clone();
    let reader = builder.build().context("building parquet reader")?;

    let mut columns: Vec<Column> = schema
        .fields()
        .iter()
        .map(|field| {
            let unit = field.metadata().get("unit").cloned().unwrap_or_default();
            Column::new(field.name().clone(), unit, Vec::new())
        })
        .collect();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for (idx, column) in columns.iter_mut().enumerate() {
            let values = extract_f64(batch.column(idx))
                .with_context(|| format!("column '{}'", column.name))?;
            column.values.extend(values);
        }
    }

    EnergySeries::from_columns(path, columns)
}

// -- Parquet / Arrow helpers --

/// Read a numeric Arrow column as `f64`.
fn extract_f64(col: &Arc<dyn Array>) -> Result<Vec<f64>> {
    let values = match col.data_type() {
        DataType::Float64 => downcast::<Float64Array>(col)?.iter().map(|v| v.unwrap_or(f64::NAN)).collect(),
        DataType::Float32 => downcast::<Float32Array>(col)?
            .iter()
            .map(|v| v.map_or(f64::NAN, f64::from))
            .collect(),
        DataType::Int32 => downcast::<Int32Array>(col)?
            .iter()
            .map(|v| v.map_or(f64::NAN, f64::from))
            .collect(),
        DataType::Int64 => downcast::<Int64Array>(col)?
            .iter()
            .map(|v| v.map_or(f64::NAN, |i| i as f64))
            .collect(),
        other => bail!("Expected a numeric column, got {other:?}"),
    };
    Ok(values)
}

fn downcast<T: 'static>(col: &Arc<dyn Array>) -> Result<&T> {
    col.as_any()
        .downcast_ref::<T>()
        .with_context(|| format!("unexpected array type {:?}", col.data_type()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::SeriesProvider;

    use std::collections::HashMap;

    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    const INFO: &str = "\
        -----------------------------------------------------------------
        |                       PQ info file                            |
        -----------------------------------------------------------------
        |  SIMULATION-TIME   5.00 fs        |  TEMPERATURE   300.0 K     |
        |  E(QM)           -12.5 kcal/mol   |  STEP-TIME       0.1       |
        -----------------------------------------------------------------
    ";

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("energy-viewer-loader-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn info_cells_in_reading_order() {
        let info = parse_info(INFO);
        assert_eq!(
            info,
            vec![
                ("SIMULATION-TIME".to_string(), "fs".to_string()),
                ("TEMPERATURE".to_string(), "K".to_string()),
                ("E(QM)".to_string(), "kcal/mol".to_string()),
                ("STEP-TIME".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn energy_file_with_info() {
        let path = scratch("md-01.en");
        std::fs::write(info_path(&path), INFO).unwrap();
        std::fs::write(
            &path,
            "# step temperature energy step-time\n\
             1 300.0 -12.5 0.1\n\
             2 301.5 -12.7 0.1\n\
             \n\
             3 299.0 -12.6 0.2\n",
        )
        .unwrap();

        let series = load_file(&path).unwrap();
        assert_eq!(series.time, vec![1.0, 2.0, 3.0]);
        assert_eq!(series.quantities.len(), 4);
        assert_eq!(series.values("TEMPERATURE"), Some(&[300.0, 301.5, 299.0][..]));
        assert_eq!(series.unit("E(QM)"), Some("kcal/mol"));
    }

    #[test]
    fn energy_file_column_mismatch() {
        let path = scratch("short.en");
        std::fs::write(info_path(&path), INFO).unwrap();
        std::fs::write(&path, "1 300.0 -12.5\n").unwrap();
        let err = load_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("3 columns"));
    }

    #[test]
    fn empty_energy_file_is_an_error() {
        let path = scratch("empty.en");
        std::fs::write(info_path(&path), INFO).unwrap();
        std::fs::write(&path, "").unwrap();
        assert!(load_file(&path).is_err());
    }

    #[test]
    fn missing_info_file_is_an_error() {
        let path = scratch("lonely.en");
        std::fs::write(&path, "1 2 3 4\n").unwrap();
        let _ = std::fs::remove_file(info_path(&path));
        let err = load_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("info file"));
    }

    #[test]
    fn unknown_extension_without_info() {
        let path = scratch("notes.txt");
        std::fs::write(&path, "hello").unwrap();
        assert!(load_file(&path).is_err());
    }

    #[test]
    fn csv_headers_with_units() {
        let path = scratch("run.csv");
        std::fs::write(&path, "SIMULATION-TIME [fs],TEMPERATURE [K],VOLUME\n1,300,10\n2,302,11\n").unwrap();
        let series = load_file(&path).unwrap();
        assert_eq!(series.quantities, vec!["SIMULATION-TIME", "TEMPERATURE", "VOLUME"]);
        assert_eq!(series.unit("SIMULATION-TIME"), Some("fs"));
        assert_eq!(series.unit("VOLUME"), Some(""));
        assert_eq!(series.values("TEMPERATURE"), Some(&[300.0, 302.0][..]));
    }

    #[test]
    fn json_columns() {
        let path = scratch("run.json");
        std::fs::write(
            &path,
            r#"{"columns": [
                {"name": "SIMULATION-TIME", "unit": "fs", "values": [1, 2]},
                {"name": "PRESSURE", "values": [1.01, 0.99]}
            ]}"#,
        )
        .unwrap();
        let series = load_file(&path).unwrap();
        assert_eq!(series.time, vec![1.0, 2.0]);
        assert_eq!(series.unit("PRESSURE"), Some(""));
    }

    #[test]
    fn parquet_columns() {
        let path = scratch("run.parquet");
        let schema = Arc::new(Schema::new(vec![
            Field::new("SIMULATION-TIME", DataType::Int64, false)
                .with_metadata(HashMap::from([("unit".to_string(), "fs".to_string())])),
            Field::new("TEMPERATURE", DataType::Float32, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![1, 2, 3])),
                Arc::new(Float32Array::from(vec![Some(300.0), None, Some(299.5)])),
            ],
        )
        .unwrap();
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let series = load_file(&path).unwrap();
        assert_eq!(series.time, vec![1.0, 2.0, 3.0]);
        assert_eq!(series.unit("SIMULATION-TIME"), Some("fs"));
        let temperature = series.values("TEMPERATURE").unwrap();
        assert_eq!(temperature[0], 300.0);
        assert!(temperature[1].is_nan());
    }
}
