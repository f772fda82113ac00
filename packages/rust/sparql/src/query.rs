//! Query loading and request URL construction.

use std::path::Path;

use muniuri_shared::{MuniUriError, Result, SourceConfig};
use url::Url;
use url::form_urlencoded::Serializer;

/// Read a SPARQL query body from disk as raw text.
pub fn load_query(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| MuniUriError::io(path, e))
}

/// Build the GET URL that runs `query` against `endpoint`.
///
/// `params` are form-encoded in order (spaces become `+`). The entry named
/// `query_param` receives the query text; if there is none, the query is
/// appended as the last parameter.
pub fn build_request_url(
    endpoint: &str,
    params: &[(String, String)],
    query_param: &str,
    query: &str,
) -> Result<Url> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| MuniUriError::config(format!("invalid endpoint '{endpoint}': {e}")))?;

    let mut serializer = Serializer::new(String::new());
    let mut placed = false;
    for (key, value) in params {
        if key == query_param && !placed {
            serializer.append_pair(key, query);
            placed = true;
        } else {
            serializer.append_pair(key, value);
        }
    }
    if !placed {
        serializer.append_pair(query_param, query);
    }

    url.set_query(Some(&serializer.finish()));
    Ok(url)
}

/// Load a source's query file and build its request URL.
pub fn source_url(source: &SourceConfig) -> Result<Url> {
    let query = load_query(&source.query_file)?;
    build_request_url(&source.endpoint, &source.params, &source.query_param, &query)
}
