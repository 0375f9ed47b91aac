use chrono::NaiveDate;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use log::info;
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::ExportSnapshot;

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// `cartesian-data-YYYY-MM-DD.json` for the given day.
pub fn export_file_name(date: NaiveDate) -> String {
    format!("cartesian-data-{}.json", date.format("%Y-%m-%d"))
}

/// Export file name for today's local date.
pub fn default_export_name() -> String {
    export_file_name(chrono::Local::now().date_naive())
}

/// Writes a snapshot as pretty JSON, gzip-compressed when the name ends in `.gz`.
///
/// # Arguments
/// * `snapshot` - The document returned by `GET /export`, written as received
/// * `path` - Target file; created or truncated
///
/// # Returns
/// * `Result<()>` - `Error::Io` or `Error::Json` on failure
pub fn save_snapshot(snapshot: &ExportSnapshot, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    if is_gzip(path) {
        let encoder = GzEncoder::new(file, Compression::default());
        let mut writer = BufWriter::new(encoder);
        serde_json::to_writer_pretty(&mut writer, snapshot)?;
        writer
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))?
            .finish()?;
    } else {
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, snapshot)?;
        writer.flush()?;
    }
    info!("snapshot written to {}", path.display());
    Ok(())
}

// Section names of a snapshot's `data`: the backend's, then the older spelling.
const SECTION_NAMES: [(&str, &str); 2] = [("columns", "rows"), ("dimensions", "dataPoints")];

/// Finds the column and row lists of a snapshot's `data` object.
///
/// # Arguments
/// * `data` - The `data` member of an export document
///
/// # Returns
/// The two arrays, or an `ImportFormat` error naming the first missing or
/// malformed field.
pub fn table_sections(data: &Value) -> Result<(&[Value], &[Value])> {
    let (columns, rows) = SECTION_NAMES
        .iter()
        .find(|(columns, _)| data.get(columns).is_some())
        .copied()
        .unwrap_or(SECTION_NAMES[0]);
    let section = |field: &str| match data.get(field) {
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(Error::ImportFormat(format!("'data.{field}' must be a list"))),
        None => Err(Error::ImportFormat(format!("missing 'data.{field}' field"))),
    };
    Ok((section(columns)?, section(rows)?))
}

/// Validates an import document and returns its `data`, untouched.
///
/// # Arguments
/// * `contents` - The file contents, already decompressed
///
/// # Returns
/// The `data` object to send with `POST /import`. Not-JSON is an
/// `ImportParse` error; a document without `data.columns` and `data.rows`
/// arrays (or `data.dimensions` and `data.dataPoints`) is an `ImportFormat`
/// error. Extra fields such as `timestamp` and `version` are optional.
///
/// # Examples
/// ```
/// use cartesian_plot::saving::parse_import;
///
/// let data = parse_import(r#"{"data": {"columns": [], "rows": []}}"#).unwrap();
/// assert!(data["rows"].is_array());
/// assert!(parse_import(r#"{"data": {}}"#).is_err());
/// ```
pub fn parse_import(contents: &str) -> Result<Value> {
    let mut document: Value =
        serde_json::from_str(contents).map_err(|e| Error::ImportParse(e.to_string()))?;
    let data = document
        .get_mut("data")
        .map(Value::take)
        .ok_or_else(|| Error::ImportFormat("missing 'data' field".to_string()))?;
    table_sections(&data)?;
    Ok(data)
}

/// Reads and validates an import file. `.gz` files are decompressed first.
pub fn load_import(path: &Path) -> Result<Value> {
    let file = File::open(path)?;
    let mut contents = String::new();
    if is_gzip(path) {
        BufReader::new(GzDecoder::new(file))
            .read_to_string(&mut contents)
            .map_err(|e| Error::ImportParse(e.to_string()))?;
    } else {
        BufReader::new(file)
            .read_to_string(&mut contents)
            .map_err(|e| Error::ImportParse(e.to_string()))?;
    }
    parse_import(&contents)
}
