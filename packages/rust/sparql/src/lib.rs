//! SPARQL-over-HTTP access for the municipality URI enricher.
//!
//! Each configured source is a query file plus an endpoint. The query is sent
//! as a GET parameter with the response format negotiated as CSV, and the body
//! is parsed straight into [`FetchedRow`]s. There is no retry: any network,
//! status, or parse failure is returned to the caller.

mod parser;
pub mod query;

use std::time::Duration;

use muniuri_shared::{FetchedRow, HttpConfig, MuniUriError, Result, SourceConfig};
use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

pub use parser::parse_csv_body;
pub use query::{build_request_url, load_query, source_url};

/// User-Agent string for endpoint requests.
const USER_AGENT: &str = concat!("muniuri/", env!("CARGO_PKG_VERSION"));

/// Accept header sent with every query.
const ACCEPT_CSV: &str = "text/csv";

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for SPARQL endpoints returning CSV.
#[derive(Debug, Clone)]
pub struct SparqlClient {
    client: Client,
}

impl SparqlClient {
    /// Build a client with the configured timeout.
    pub fn new(opts: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| MuniUriError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// GET `url` and parse the CSV body.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch_csv(&self, url: &Url) -> Result<Vec<FetchedRow>> {
        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, ACCEPT_CSV)
            .send()
            .await
            .map_err(|e| MuniUriError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MuniUriError::Network(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| MuniUriError::Network(format!("{url}: failed to read body: {e}")))?;

        debug!(bytes = body.len(), "response received");
        parse_csv_body(&body)
    }

    /// Load a source's query, build its URL, and fetch its rows.
    #[instrument(skip_all, fields(source = %source.name))]
    pub async fn fetch_source(&self, source: &SourceConfig) -> Result<Vec<FetchedRow>> {
        let url = source_url(source)?;
        info!(endpoint = %source.endpoint, "querying endpoint");

        let rows = self.fetch_csv(&url).await?;
        info!(rows = rows.len(), "endpoint returned rows");
        Ok(rows)
    }
}
