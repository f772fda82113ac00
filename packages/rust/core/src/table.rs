//! CSV reading and writing of the canonical municipality table.
//!
//! Empty cells are absent values. Columns other than `code`, `name`, `uf`,
//! `dbpedia` and `dbpedia_pt` are kept as-is and written back in their
//! original position.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use muniuri_shared::{MuniUriError, MunicipalityRecord, MunicipalityTable, Result, UriType};

use crate::package::csv_open_error;

/// Columns the table must have.
const KEY_COLUMNS: [&str; 3] = ["code", "name", "uf"];

/// Read the municipality table from a CSV file.
pub fn read_municipalities(path: &Path) -> Result<MunicipalityTable> {
    let reader = csv::Reader::from_path(path).map_err(|e| csv_open_error(path, e))?;
    read_from(reader).map_err(|e| match e {
        MuniUriError::Parse { message } => {
            MuniUriError::parse(format!("{}: {message}", path.display()))
        }
        MuniUriError::Validation { message } => {
            MuniUriError::validation(format!("{}: {message}", path.display()))
        }
        other => other,
    })
}

/// Parse the municipality table from CSV text.
pub fn parse_municipalities(content: &str) -> Result<MunicipalityTable> {
    read_from(csv::Reader::from_reader(content.as_bytes()))
}

fn read_from<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<MunicipalityTable> {
    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| MuniUriError::parse(format!("invalid header: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut seen_columns = HashSet::new();
    for column in &columns {
        if !seen_columns.insert(column.as_str()) {
            return Err(MuniUriError::validation(format!(
                "column `{column}` appears more than once"
            )));
        }
    }

    for key in KEY_COLUMNS {
        if !columns.iter().any(|c| c == key) {
            return Err(MuniUriError::validation(format!("missing `{key}` column")));
        }
    }

    let mut records = Vec::new();
    let mut seen_codes = HashSet::new();

    for (i, row) in reader.records().enumerate() {
        let row = row.map_err(|e| MuniUriError::parse(format!("row {}: {e}", i + 1)))?;

        let mut code = None;
        let mut record = MunicipalityRecord::new(0, "", "");
        let mut extra = BTreeMap::new();

        for (column, value) in columns.iter().zip(row.iter()) {
            match column.as_str() {
                "code" => {
                    code = Some(value.trim().parse::<u64>().map_err(|_| {
                        MuniUriError::validation(format!(
                            "row {}: invalid municipality code '{value}'",
                            i + 1
                        ))
                    })?);
                }
                "name" => record.name = value.to_string(),
                "uf" => record.uf = value.to_string(),
                "dbpedia" => record.dbpedia = non_empty(value),
                "dbpedia_pt" => record.dbpedia_pt = non_empty(value),
                _ => {
                    extra.insert(column.clone(), value.to_string());
                }
            }
        }

        record.code = code
            .ok_or_else(|| MuniUriError::validation(format!("row {}: missing code", i + 1)))?;
        if !seen_codes.insert(record.code) {
            return Err(MuniUriError::validation(format!(
                "duplicate municipality code {}",
                record.code
            )));
        }
        record.extra = extra;
        records.push(record);
    }

    Ok(MunicipalityTable { columns, records })
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Serialize the table to CSV text, header first, no index column.
pub fn to_csv_string(table: &MunicipalityTable) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(&table.columns)
        .map_err(|e| MuniUriError::parse(format!("failed to write header: {e}")))?;

    for record in &table.records {
        let code = record.code.to_string();
        let row = table.columns.iter().map(|column| match column.as_str() {
            "code" => code.as_str(),
            "name" => record.name.as_str(),
            "uf" => record.uf.as_str(),
            "dbpedia" => record.identifier(UriType::Dbpedia).unwrap_or_default(),
            "dbpedia_pt" => record.identifier(UriType::DbpediaPt).unwrap_or_default(),
            other => record.extra.get(other).map(String::as_str).unwrap_or_default(),
        });
        writer.write_record(row).map_err(|e| {
            MuniUriError::parse(format!("failed to write row {}: {e}", record.code))
        })?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| MuniUriError::parse(format!("failed to flush CSV: {e}")))?;
    String::from_utf8(bytes).map_err(|e| MuniUriError::parse(e.to_string()))
}

/// Write the table to `path`, replacing any existing file.
///
/// Writes `.<name>.tmp` next to `path`, then renames it over the target: the
/// target always holds either the old or the new table in full.
pub fn write_municipalities(table: &MunicipalityTable, path: &Path) -> Result<()> {
    let content = to_csv_string(table)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| MuniUriError::validation(format!("{}: not a file path", path.display())))?;
    let temp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    std::fs::write(&temp, content).map_err(|e| MuniUriError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp);
        MuniUriError::io(path, e)
    })
}
