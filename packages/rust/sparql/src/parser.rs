//! CSV result parser for SPARQL `text/csv` responses.
//!
//! Endpoints answer with a header row naming the projected variables followed
//! by one row per solution. Only `name`, `city` and `state` are used.

use muniuri_shared::{FetchedRow, MuniUriError, Result};

/// Columns every response must project.
const REQUIRED_COLUMNS: [&str; 3] = ["name", "city", "state"];

/// Parse a CSV response body into fetched rows.
pub fn parse_csv_body(body: &str) -> Result<Vec<FetchedRow>> {
    let mut reader = csv::Reader::from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| MuniUriError::parse(format!("invalid CSV header: {e}")))?
        .clone();

    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(MuniUriError::validation(format!(
                "response is missing the `{column}` column (got: {})",
                headers.iter().collect::<Vec<_>>().join(", ")
            )));
        }
    }

    reader
        .deserialize::<FetchedRow>()
        .enumerate()
        .map(|(i, row)| {
            row.map_err(|e| MuniUriError::parse(format!("CSV row {}: {e}", i + 1)))
        })
        .collect()
}
