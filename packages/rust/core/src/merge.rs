//! Identifier upsert: fetched URIs into the canonical municipality table.
//!
//! 1. Resolve fetched rows to `(name, uf)` keys via the state lookup.
//! 2. Sort by `(uf, name, uri)`, keep the first URI per `(name, uf, uri_type)`.
//! 3. Pivot to one row per `(name, uf)` with a slot per identifier column.
//! 4. Right-join the canonical table onto the pivot; every canonical row survives.
//! 5. Check the row count, then coalesce: a present new value replaces the
//!    old one, an absent new value keeps it.

use std::collections::{HashMap, HashSet};

use muniuri_shared::{
    FetchedIdentifier, FetchedRow, MuniUriError, MunicipalityTable, Result, StateLookup, UriType,
};
use tracing::{debug, warn};

use crate::normalize::normalize_name;

/// Counters from resolving fetched rows against the state lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveStats {
    /// Rows whose name normalized to nothing.
    pub dropped_names: usize,
    /// Rows whose state name is not in the lookup.
    pub unmatched_states: usize,
    /// Resolved rows whose URI matches no known prefix.
    pub unclassified: usize,
}

/// Counters from applying identifiers to the canonical table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Identifiers left after deduplication.
    pub identifiers: usize,
    /// Canonical rows that matched at least one fetched key.
    pub matched: usize,
    /// Values replaced or filled, per identifier column.
    pub updated: HashMap<UriType, usize>,
    /// Existing values kept because nothing new was fetched, per column.
    pub preserved: HashMap<UriType, usize>,
}

/// One `(name, uf)` key with at most one URI per identifier column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PivotRow {
    pub name: String,
    pub uf: String,
    pub dbpedia: Option<String>,
    pub dbpedia_pt: Option<String>,
}

impl PivotRow {
    fn slot_mut(&mut self, uri_type: UriType) -> &mut Option<String> {
        match uri_type {
            UriType::Dbpedia => &mut self.dbpedia,
            UriType::DbpediaPt => &mut self.dbpedia_pt,
        }
    }
}

/// A canonical row after the right join: its code and the fetched values.
#[derive(Debug, Clone, PartialEq, Eq)]
struct JoinedRow {
    code: u64,
    matched: bool,
    dbpedia: Option<String>,
    dbpedia_pt: Option<String>,
}

impl JoinedRow {
    fn slot(&self, uri_type: UriType) -> Option<&String> {
        match uri_type {
            UriType::Dbpedia => self.dbpedia.as_ref(),
            UriType::DbpediaPt => self.dbpedia_pt.as_ref(),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolve
// ---------------------------------------------------------------------------

/// Normalize names, attach state abbreviations, and classify URIs.
///
/// This is an inner join on the full state name: rows with an unknown state
/// are dropped, and a state listed twice yields one identifier per entry.
pub fn resolve_identifiers(
    rows: Vec<FetchedRow>,
    states: &[StateLookup],
) -> (Vec<FetchedIdentifier>, ResolveStats) {
    let mut abbrs: HashMap<&str, Vec<&str>> = HashMap::new();
    for state in states {
        abbrs
            .entry(state.state_name.as_str())
            .or_default()
            .push(state.abbr.as_str());
    }

    let mut stats = ResolveStats::default();
    let mut identifiers = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(name) = normalize_name(&row.name) else {
            debug!(name = %row.name, uri = %row.city, "name has no leading text, dropping");
            stats.dropped_names += 1;
            continue;
        };

        let Some(matches) = abbrs.get(row.state.as_str()) else {
            debug!(state = %row.state, uri = %row.city, "unknown state, dropping");
            stats.unmatched_states += 1;
            continue;
        };

        let uri_type = UriType::classify(&row.city);
        if uri_type.is_none() {
            warn!(uri = %row.city, "URI matches no known knowledge base");
            stats.unclassified += 1;
        }

        for abbr in matches {
            identifiers.push(FetchedIdentifier {
                name: name.clone(),
                uf: (*abbr).to_string(),
                uri: row.city.clone(),
                uri_type,
            });
        }
    }

    (identifiers, stats)
}

// ---------------------------------------------------------------------------
// Dedup & pivot
// ---------------------------------------------------------------------------

/// Sort by `(uf, name, uri)` and keep the first identifier per
/// `(name, uf, uri_type)`. Unclassified URIs dedup as one type.
pub fn dedup_identifiers(mut identifiers: Vec<FetchedIdentifier>) -> Vec<FetchedIdentifier> {
    identifiers.sort_by(|a, b| (&a.uf, &a.name, &a.uri).cmp(&(&b.uf, &b.name, &b.uri)));

    let mut seen = HashSet::new();
    identifiers.retain(|id| seen.insert((id.name.clone(), id.uf.clone(), id.uri_type)));
    identifiers
}

/// One row per `(name, uf)`, in first-appearance order. Unclassified URIs
/// contribute the key but no value.
pub fn pivot_identifiers(identifiers: &[FetchedIdentifier]) -> Vec<PivotRow> {
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();
    let mut rows: Vec<PivotRow> = Vec::new();

    for id in identifiers {
        let pos = *index
            .entry((id.name.as_str(), id.uf.as_str()))
            .or_insert_with(|| {
                rows.push(PivotRow {
                    name: id.name.clone(),
                    uf: id.uf.clone(),
                    ..PivotRow::default()
                });
                rows.len() - 1
            });

        if let Some(uri_type) = id.uri_type {
            let slot = rows[pos].slot_mut(uri_type);
            if slot.is_none() {
                *slot = Some(id.uri.clone());
            }
        }
    }

    rows
}

// ---------------------------------------------------------------------------
// Join & coalesce
// ---------------------------------------------------------------------------

/// Right join: every canonical row appears once per matching pivot row, or
/// once with no values when nothing matches.
fn right_join(table: &MunicipalityTable, pivot: &[PivotRow]) -> Vec<JoinedRow> {
    let mut by_key: HashMap<(&str, &str), Vec<&PivotRow>> = HashMap::new();
    for row in pivot {
        by_key
            .entry((row.name.as_str(), row.uf.as_str()))
            .or_default()
            .push(row);
    }

    let mut joined = Vec::with_capacity(table.len());
    for record in &table.records {
        match by_key.get(&(record.name.as_str(), record.uf.as_str())) {
            Some(matches) => joined.extend(matches.iter().map(|m| JoinedRow {
                code: record.code,
                matched: true,
                dbpedia: m.dbpedia.clone(),
                dbpedia_pt: m.dbpedia_pt.clone(),
            })),
            None => joined.push(JoinedRow {
                code: record.code,
                matched: false,
                dbpedia: None,
                dbpedia_pt: None,
            }),
        }
    }
    joined
}

/// Apply pivoted identifiers to the table.
///
/// Fails with [`MuniUriError::RowCountMismatch`] before touching the table if
/// the join does not produce exactly one row per municipality. On success the
/// table is sorted by code and any missing identifier column is appended.
pub fn apply_pivot(table: &mut MunicipalityTable, pivot: &[PivotRow]) -> Result<MergeReport> {
    let mut joined = right_join(table, pivot);

    if joined.len() != table.len() {
        return Err(MuniUriError::RowCountMismatch {
            expected: table.len(),
            actual: joined.len(),
        });
    }

    joined.sort_by_key(|row| row.code);
    table.sort_by_code();

    let mut report = MergeReport {
        matched: joined.iter().filter(|row| row.matched).count(),
        ..MergeReport::default()
    };

    for uri_type in UriType::ALL {
        let column = uri_type.column();
        let has_column = table.has_column(column);

        for (record, new) in table.records.iter_mut().zip(&joined) {
            debug_assert_eq!(record.code, new.code);
            let new_value = new.slot(uri_type);
            let slot = record.identifier_mut(uri_type);

            match (has_column, new_value) {
                (true, None) => {
                    if slot.is_some() {
                        *report.preserved.entry(uri_type).or_default() += 1;
                    }
                }
                (_, Some(value)) => {
                    if slot.as_ref() != Some(value) {
                        *report.updated.entry(uri_type).or_default() += 1;
                    }
                    *slot = Some(value.clone());
                }
                (false, None) => *slot = None,
            }
        }

        if !has_column {
            debug!(column, "adding identifier column");
            table.columns.push(column.to_string());
        }
    }

    Ok(report)
}

/// Dedup, pivot, and apply resolved identifiers to the table.
pub fn merge_identifiers(
    table: &mut MunicipalityTable,
    identifiers: Vec<FetchedIdentifier>,
) -> Result<MergeReport> {
    let deduped = dedup_identifiers(identifiers);
    let pivot = pivot_identifiers(&deduped);

    let mut report = apply_pivot(table, &pivot)?;
    report.identifiers = deduped.len();
    Ok(report)
}
