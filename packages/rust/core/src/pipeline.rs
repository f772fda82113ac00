//! End-to-end enrichment job: queries → fetch → normalize → join → upsert → CSV.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, instrument};

use muniuri_shared::{AppConfig, FetchedRow, MunicipalityTable, Result, StateLookup, UriType};
use muniuri_sparql::SparqlClient;

use crate::merge::{self, MergeReport, ResolveStats};
use crate::package::{self, DataPackage};
use crate::table;

/// Configuration for the `run_enrichment` job.
#[derive(Debug, Clone)]
pub struct EnrichConfig {
    /// Loaded application config.
    pub app: AppConfig,
    /// Output override; falls back to `app.package.output`, then the
    /// municipality resource itself.
    pub output: Option<PathBuf>,
    /// Compute the merge but do not write anything.
    pub dry_run: bool,
}

/// What a run did, for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentSummary {
    /// Rows returned by all endpoints together.
    pub fetched_rows: usize,
    /// Rows dropped because the name normalized to nothing.
    pub dropped_names: usize,
    /// Rows dropped because the state is not in the lookup.
    pub unmatched_states: usize,
    /// Rows with a URI of unknown origin.
    pub unclassified: usize,
    /// Identifiers kept after deduplication.
    pub identifiers: usize,
    /// Municipalities in the canonical table.
    pub municipalities: usize,
    /// Municipalities matched by at least one fetched row.
    pub matched: usize,
    /// Values replaced or filled, per identifier column.
    pub updated: HashMap<UriType, usize>,
    /// Existing values kept because nothing new was fetched, per column.
    pub preserved: HashMap<UriType, usize>,
}

impl EnrichmentSummary {
    fn from_parts(
        fetched_rows: usize,
        municipalities: usize,
        resolve: ResolveStats,
        merge: MergeReport,
    ) -> Self {
        Self {
            fetched_rows,
            dropped_names: resolve.dropped_names,
            unmatched_states: resolve.unmatched_states,
            unclassified: resolve.unclassified,
            identifiers: merge.identifiers,
            municipalities,
            matched: merge.matched,
            updated: merge.updated,
            preserved: merge.preserved,
        }
    }
}

/// Result of the `run_enrichment` job.
#[derive(Debug)]
pub struct EnrichResult {
    /// Where the table was (or would have been) written.
    pub output_path: PathBuf,
    /// Whether the file was written.
    pub written: bool,
    pub summary: EnrichmentSummary,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting job status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each endpoint answers.
    fn source_fetched(&self, source: &str, rows: usize, current: usize, total: usize);
    /// Called when the job completes.
    fn done(&self, result: &EnrichResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn source_fetched(&self, _source: &str, _rows: usize, _current: usize, _total: usize) {}
    fn done(&self, _result: &EnrichResult) {}
}

/// Merge fetched rows into the canonical table.
///
/// Pure over its inputs: no filesystem or network access. On error the table
/// is left unchanged.
pub fn enrich_tables(
    table: &mut MunicipalityTable,
    states: &[StateLookup],
    fetched: Vec<FetchedRow>,
) -> Result<EnrichmentSummary> {
    let fetched_rows = fetched.len();
    let (identifiers, resolve) = merge::resolve_identifiers(fetched, states);
    let report = merge::merge_identifiers(table, identifiers)?;

    Ok(EnrichmentSummary::from_parts(
        fetched_rows,
        table.len(),
        resolve,
        report,
    ))
}

/// Run the full enrichment job.
///
/// 1. Load the state lookup and municipality table from the data package
/// 2. Query every configured source, in order
/// 3. Normalize, join, dedup, pivot, and upsert
/// 4. Write the table back (unless `dry_run`)
#[instrument(skip_all, fields(package = %config.app.package.path.display()))]
pub async fn run_enrichment(
    config: &EnrichConfig,
    progress: &dyn ProgressReporter,
) -> Result<EnrichResult> {
    let start = Instant::now();
    let app = &config.app;
    app.validate()?;

    // --- Phase 1: Reference tables ---
    progress.phase("Loading reference tables");
    let data_package = DataPackage::open(&app.package.path)?;
    let states = package::load_states(&data_package.resource_path(&app.package.states_resource)?)?;
    let municipality_path = data_package.resource_path(&app.package.municipalities_resource)?;
    let mut municipalities = table::read_municipalities(&municipality_path)?;

    info!(
        states = states.len(),
        municipalities = municipalities.len(),
        "reference tables loaded"
    );

    // --- Phase 2: Fetch ---
    let client = SparqlClient::new(&app.http)?;
    let mut fetched = Vec::new();
    let total = app.sources.len();

    for (i, source) in app.sources.iter().enumerate() {
        progress.phase(&format!("Querying {}", source.name));
        let rows = client.fetch_source(source).await?;
        progress.source_fetched(&source.name, rows.len(), i + 1, total);
        fetched.extend(rows);
    }

    // --- Phase 3: Merge ---
    progress.phase("Merging identifiers");
    let summary = enrich_tables(&mut municipalities, &states, fetched)?;

    info!(
        fetched = summary.fetched_rows,
        identifiers = summary.identifiers,
        matched = summary.matched,
        unmatched_states = summary.unmatched_states,
        "identifiers merged"
    );

    // --- Phase 4: Write ---
    let output_path = config
        .output
        .clone()
        .or_else(|| app.package.output.clone())
        .unwrap_or(municipality_path);

    if !config.dry_run {
        progress.phase("Writing municipality table");
        table::write_municipalities(&municipalities, &output_path)?;
        info!(path = %output_path.display(), rows = municipalities.len(), "table written");
    }

    let result = EnrichResult {
        output_path,
        written: !config.dry_run,
        summary,
        elapsed: start.elapsed(),
    };
    progress.done(&result);

    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use muniuri_shared::{MuniUriError, SourceConfig};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FIXTURES: &str = "../../../fixtures";

    const EXPECTED_OUTPUT: &str = "code,name,uf,dbpedia,dbpedia_pt\n\
        1001,Springfield,XX,http://dbpedia.org/resource/Springfield_(Old),http://pt.dbpedia.org/resource/Springfield\n\
        1002,Shelbyville,XX,,http://pt.dbpedia.org/resource/Shelbyville\n\
        2001,Capital City,YY,http://dbpedia.org/resource/Capital_City_(new),\n";

    /// Copy the fixture package into a temp dir so the job can rewrite it.
    fn scratch_package() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for file in ["datapackage.json", "uf.csv", "municipality.csv"] {
            std::fs::copy(
                Path::new(FIXTURES).join("package").join(file),
                dir.path().join(file),
            )
            .unwrap();
        }
        for file in ["dbpedia-pt.sparql", "dbpedia.sparql"] {
            std::fs::copy(
                Path::new(FIXTURES).join("sparql").join(file),
                dir.path().join(file),
            )
            .unwrap();
        }
        dir
    }

    async fn mock_endpoints() -> MockServer {
        let server = MockServer::start().await;
        for (route, body) in [("/pt/sparql", "dbpedia-pt.csv"), ("/sparql", "dbpedia.csv")] {
            let body = std::fs::read_to_string(Path::new(FIXTURES).join("sparql").join(body))
                .unwrap();
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(200).set_body_string(body))
                .mount(&server)
                .await;
        }
        server
    }

    fn config_for(dir: &Path, server: &MockServer) -> EnrichConfig {
        let mut app = AppConfig::default();
        app.package.path = dir.join("datapackage.json");
        app.sources = vec![
            SourceConfig {
                name: "dbpedia-pt".into(),
                query_file: dir.join("dbpedia-pt.sparql"),
                endpoint: format!("{}/pt/sparql", server.uri()),
                query_param: "query".into(),
                params: vec![("query".into(), String::new())],
            },
            SourceConfig {
                name: "dbpedia".into(),
                query_file: dir.join("dbpedia.sparql"),
                endpoint: format!("{}/sparql", server.uri()),
                query_param: "query".into(),
                params: vec![("query".into(), String::new())],
            },
        ];
        EnrichConfig {
            app,
            output: None,
            dry_run: false,
        }
    }

    #[test]
    fn enrich_tables_springfield() {
        let mut table = table::parse_municipalities(
            "code,name,uf,dbpedia,dbpedia_pt\n1001,Springfield,XX,,\n",
        )
        .unwrap();
        let states = vec![StateLookup {
            state_name: "Example State".into(),
            abbr: "XX".into(),
        }];
        let fetched = vec![FetchedRow {
            name: "Springfield (Old)".into(),
            city: "http://dbpedia.org/resource/Springfield".into(),
            state: "Example State".into(),
        }];

        let summary = enrich_tables(&mut table, &states, fetched).unwrap();

        assert_eq!(
            table::to_csv_string(&table).unwrap(),
            "code,name,uf,dbpedia,dbpedia_pt\n\
             1001,Springfield,XX,http://dbpedia.org/resource/Springfield,\n"
        );
        assert_eq!(summary.fetched_rows, 1);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.municipalities, 1);
    }

    #[tokio::test]
    async fn run_rewrites_table_in_place() {
        let dir = scratch_package();
        let server = mock_endpoints().await;
        let config = config_for(dir.path(), &server);

        let result = run_enrichment(&config, &SilentProgress).await.unwrap();

        assert!(result.written);
        assert_eq!(result.output_path, dir.path().join("municipality.csv"));
        assert_eq!(
            std::fs::read_to_string(&result.output_path).unwrap(),
            EXPECTED_OUTPUT
        );

        let summary = &result.summary;
        assert_eq!(summary.fetched_rows, 7);
        assert_eq!(summary.unmatched_states, 1);
        assert_eq!(summary.unclassified, 1);
        assert_eq!(summary.matched, 3);
        assert_eq!(summary.preserved.get(&UriType::Dbpedia), None);
    }

    #[tokio::test]
    async fn second_run_is_byte_identical() {
        let dir = scratch_package();
        let server = mock_endpoints().await;
        let config = config_for(dir.path(), &server);

        run_enrichment(&config, &SilentProgress).await.unwrap();
        let first = std::fs::read(dir.path().join("municipality.csv")).unwrap();

        let result = run_enrichment(&config, &SilentProgress).await.unwrap();
        let second = std::fs::read(dir.path().join("municipality.csv")).unwrap();

        assert_eq!(first, second);
        assert!(result.summary.updated.is_empty());
    }

    #[tokio::test]
    async fn dry_run_leaves_file_untouched() {
        let dir = scratch_package();
        let server = mock_endpoints().await;
        let mut config = config_for(dir.path(), &server);
        config.dry_run = true;

        let before = std::fs::read(dir.path().join("municipality.csv")).unwrap();
        let result = run_enrichment(&config, &SilentProgress).await.unwrap();

        assert!(!result.written);
        assert_eq!(result.summary.matched, 3);
        assert_eq!(
            std::fs::read(dir.path().join("municipality.csv")).unwrap(),
            before
        );
    }

    #[tokio::test]
    async fn output_override_writes_elsewhere() {
        let dir = scratch_package();
        let server = mock_endpoints().await;
        let mut config = config_for(dir.path(), &server);
        let out = dir.path().join("enriched.csv");
        config.output = Some(out.clone());

        let result = run_enrichment(&config, &SilentProgress).await.unwrap();

        assert_eq!(result.output_path, out);
        assert_eq!(std::fs::read_to_string(&out).unwrap(), EXPECTED_OUTPUT);
    }

    #[tokio::test]
    async fn endpoint_failure_aborts_before_write() {
        let dir = scratch_package();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let config = config_for(dir.path(), &server);

        let before = std::fs::read(dir.path().join("municipality.csv")).unwrap();
        let err = run_enrichment(&config, &SilentProgress).await.unwrap_err();

        assert!(matches!(err, MuniUriError::Network(_)));
        assert_eq!(
            std::fs::read(dir.path().join("municipality.csv")).unwrap(),
            before
        );
    }

    #[tokio::test]
    async fn missing_query_file_is_io_error() {
        let dir = scratch_package();
        let server = mock_endpoints().await;
        let config = config_for(dir.path(), &server);
        std::fs::remove_file(dir.path().join("dbpedia.sparql")).unwrap();

        let err = run_enrichment(&config, &SilentProgress).await.unwrap_err();
        assert!(matches!(err, MuniUriError::Io { .. }));
    }
}
