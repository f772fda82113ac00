//! Core domain types: municipalities, state lookups, and fetched identifiers.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Names of the identifier columns, in output order.
pub const IDENTIFIER_COLUMNS: [&str; 2] = ["dbpedia", "dbpedia_pt"];

// ---------------------------------------------------------------------------
// UriType
// ---------------------------------------------------------------------------

/// Which knowledge base a URI belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UriType {
    /// Main (English) DBpedia.
    Dbpedia,
    /// Portuguese DBpedia chapter.
    DbpediaPt,
}

impl UriType {
    /// Every known type, in identifier column order.
    pub const ALL: [UriType; 2] = [UriType::Dbpedia, UriType::DbpediaPt];

    /// URI prefix that identifies resources of this knowledge base.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Dbpedia => "http://dbpedia.org/",
            Self::DbpediaPt => "http://pt.dbpedia.org/",
        }
    }

    /// Column that holds identifiers of this type in the municipality table.
    pub fn column(self) -> &'static str {
        match self {
            Self::Dbpedia => IDENTIFIER_COLUMNS[0],
            Self::DbpediaPt => IDENTIFIER_COLUMNS[1],
        }
    }

    /// Classify a URI by its prefix. Unknown hosts yield `None`.
    pub fn classify(uri: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| uri.starts_with(t.prefix()))
    }
}

impl std::fmt::Display for UriType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

// ---------------------------------------------------------------------------
// Reference data
// ---------------------------------------------------------------------------

/// One row of the state lookup: full state name to its two-letter abbreviation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLookup {
    pub state_name: String,
    pub abbr: String,
}

/// One municipality of the canonical table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MunicipalityRecord {
    /// Stable numeric code; the table's unique key.
    pub code: u64,
    pub name: String,
    /// Two-letter state abbreviation.
    pub uf: String,
    pub dbpedia: Option<String>,
    pub dbpedia_pt: Option<String>,
    /// Any other columns of the source CSV, carried through unchanged.
    pub extra: BTreeMap<String, String>,
}

impl MunicipalityRecord {
    /// Create a record with no identifiers and no extra columns.
    pub fn new(code: u64, name: impl Into<String>, uf: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
            uf: uf.into(),
            dbpedia: None,
            dbpedia_pt: None,
            extra: BTreeMap::new(),
        }
    }

    /// Identifier of the given type, if known.
    pub fn identifier(&self, uri_type: UriType) -> Option<&str> {
        match uri_type {
            UriType::Dbpedia => self.dbpedia.as_deref(),
            UriType::DbpediaPt => self.dbpedia_pt.as_deref(),
        }
    }

    /// Mutable access to the identifier slot of the given type.
    pub fn identifier_mut(&mut self, uri_type: UriType) -> &mut Option<String> {
        match uri_type {
            UriType::Dbpedia => &mut self.dbpedia,
            UriType::DbpediaPt => &mut self.dbpedia_pt,
        }
    }
}

/// The canonical municipality table: column order as found on disk plus its rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MunicipalityTable {
    /// Column names in file order.
    pub columns: Vec<String>,
    pub records: Vec<MunicipalityRecord>,
}

impl MunicipalityTable {
    /// Build a table with the standard five columns.
    pub fn new(records: Vec<MunicipalityRecord>) -> Self {
        let mut columns: Vec<String> = ["code", "name", "uf"].map(String::from).to_vec();
        columns.extend(IDENTIFIER_COLUMNS.map(String::from));
        Self { columns, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Sort rows by municipality code.
    pub fn sort_by_code(&mut self) {
        self.records.sort_by_key(|r| r.code);
    }
}

// ---------------------------------------------------------------------------
// Fetched data
// ---------------------------------------------------------------------------

/// A raw row of an endpoint's CSV response. Extra columns are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FetchedRow {
    /// Display name, possibly with a disambiguation suffix.
    pub name: String,
    /// Resource URI of the municipality.
    pub city: String,
    /// Full state name.
    pub state: String,
}

/// A fetched URI resolved to a municipality key and classified by knowledge base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedIdentifier {
    pub name: String,
    pub uf: String,
    pub uri: String,
    pub uri_type: Option<UriType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_known_prefixes() {
        assert_eq!(
            UriType::classify("http://dbpedia.org/resource/Recife"),
            Some(UriType::Dbpedia)
        );
        assert_eq!(
            UriType::classify("http://pt.dbpedia.org/resource/Recife"),
            Some(UriType::DbpediaPt)
        );
    }

    #[test]
    fn classify_unknown_prefix() {
        assert_eq!(UriType::classify("https://dbpedia.org/resource/Recife"), None);
        assert_eq!(UriType::classify("http://www.wikidata.org/entity/Q36712"), None);
        assert_eq!(UriType::classify(""), None);
    }

    #[test]
    fn identifier_slots_follow_type() {
        let mut record = MunicipalityRecord::new(2611606, "Recife", "PE");
        *record.identifier_mut(UriType::DbpediaPt) =
            Some("http://pt.dbpedia.org/resource/Recife".into());

        assert_eq!(record.identifier(UriType::Dbpedia), None);
        assert_eq!(
            record.dbpedia_pt.as_deref(),
            Some("http://pt.dbpedia.org/resource/Recife")
        );
    }

    #[test]
    fn new_table_has_standard_columns() {
        let table = MunicipalityTable::new(vec![]);
        assert_eq!(table.columns, ["code", "name", "uf", "dbpedia", "dbpedia_pt"]);
        assert!(table.has_column("dbpedia_pt"));
        assert!(table.is_empty());
    }

    #[test]
    fn uri_type_display_matches_column() {
        assert_eq!(UriType::DbpediaPt.to_string(), "dbpedia_pt");
    }
}
