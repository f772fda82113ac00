//! Application configuration for the municipality URI enricher.
//!
//! The job reads `muniuri.toml` from the working directory (or the path given
//! with `--config`). Every field has a default, so a missing file runs the job
//! against the standard DBpedia endpoints and data package layout.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MuniUriError, Result};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "muniuri.toml";

// ---------------------------------------------------------------------------
// Config structs (matching muniuri.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Local data package holding the reference tables.
    #[serde(default)]
    pub package: PackageConfig,

    /// HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// SPARQL endpoints to query, in fetch order.
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            package: PackageConfig::default(),
            http: HttpConfig::default(),
            sources: default_sources(),
        }
    }
}

impl AppConfig {
    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(MuniUriError::config("at least one [[sources]] entry is required"));
        }
        for source in &self.sources {
            if source.query_param.is_empty() {
                return Err(MuniUriError::config(format!(
                    "source '{}' has an empty query_param",
                    source.name
                )));
            }
        }
        Ok(())
    }
}

/// `[package]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Path to the `datapackage.json` descriptor.
    #[serde(default = "default_package_path")]
    pub path: PathBuf,

    /// Resource name of the state lookup table.
    #[serde(default = "default_states_resource")]
    pub states_resource: String,

    /// Resource name of the canonical municipality table.
    #[serde(default = "default_municipalities_resource")]
    pub municipalities_resource: String,

    /// Where to write the merged table. Defaults to the municipality resource itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            path: default_package_path(),
            states_resource: default_states_resource(),
            municipalities_resource: default_municipalities_resource(),
            output: None,
        }
    }
}

fn default_package_path() -> PathBuf {
    PathBuf::from("../../../data/auxiliary/geographic/datapackage.json")
}
fn default_states_resource() -> String {
    "uf".into()
}
fn default_municipalities_resource() -> String {
    "municipality".into()
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds, applied to each endpoint call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    120
}

/// `[[sources]]` entry — one SPARQL endpoint and the query sent to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Label used in logs and progress output.
    pub name: String,
    /// File holding the SPARQL query body.
    pub query_file: PathBuf,
    /// Endpoint URL without a query string.
    pub endpoint: String,
    /// Name of the parameter that carries the query text.
    #[serde(default = "default_query_param")]
    pub query_param: String,
    /// Query-string parameters, serialized in order. An entry named
    /// `query_param` marks where the query text goes.
    #[serde(default)]
    pub params: Vec<(String, String)>,
}

fn default_query_param() -> String {
    "query".into()
}

fn param(key: &str, value: &str) -> (String, String) {
    (key.to_string(), value.to_string())
}

fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig {
            name: "dbpedia-pt".into(),
            query_file: PathBuf::from("dbpedia-pt.sparql"),
            endpoint: "http://pt.dbpedia.org/sparql".into(),
            query_param: default_query_param(),
            params: vec![
                param("default-graph-uri", ""),
                param("query", ""),
                param("should-sponge", ""),
                param("format", "text/csv"),
                param("timeout", "0"),
                param("debug", "on"),
            ],
        },
        SourceConfig {
            name: "dbpedia".into(),
            query_file: PathBuf::from("dbpedia.sparql"),
            endpoint: "http://dbpedia.org/sparql".into(),
            query_param: default_query_param(),
            params: vec![
                param("default-graph-uri", "http://dbpedia.org"),
                param("query", ""),
                param("format", "text/csv"),
                param("CXML_redir_for_subjs", "121"),
                param("CXML_redir_for_hrefs", ""),
                param("timeout", "30000"),
                param("debug", "on"),
                param("run", " Run Query "),
            ],
        },
    ]
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the application config.
///
/// With an explicit path the file must exist. Without one, `muniuri.toml` in
/// the working directory is used when present, defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => {
            let path = Path::new(CONFIG_FILE_NAME);
            if path.exists() {
                load_config_from(path)?
            } else {
                tracing::debug!(?path, "config file not found, using defaults");
                AppConfig::default()
            }
        }
    };

    config.validate()?;
    Ok(config)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| MuniUriError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| MuniUriError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Write the default config to `path`. Refuses to replace an existing file.
pub fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(MuniUriError::config(format!(
            "{} already exists, not overwriting",
            path.display()
        )));
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| MuniUriError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| MuniUriError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("datapackage.json"));
        assert!(toml_str.contains("http://pt.dbpedia.org/sparql"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.http.timeout_secs, 120);
        assert_eq!(parsed.sources.len(), 2);
        assert_eq!(parsed.sources[1].params[7], param("run", " Run Query "));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[package]
path = "/data/geo/datapackage.json"
output = "/tmp/out.csv"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.package.states_resource, "uf");
        assert_eq!(config.package.output, Some(PathBuf::from("/tmp/out.csv")));
        assert_eq!(config.sources.len(), 2);
    }

    #[test]
    fn custom_sources_replace_defaults() {
        let toml_str = r#"
[[sources]]
name = "local"
query_file = "q.sparql"
endpoint = "http://localhost:8890/sparql"
params = [["query", ""], ["format", "text/csv"]]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].query_param, "query");
        assert_eq!(config.sources[0].params[1], param("format", "text/csv"));
    }

    #[test]
    fn empty_sources_rejected() {
        let config = AppConfig {
            sources: Vec::new(),
            ..AppConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("[[sources]]"));
    }

    #[test]
    fn write_default_refuses_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE_NAME);

        write_default_config(&path).expect("first write");
        let loaded = load_config(Some(&path)).expect("load written config");
        assert_eq!(loaded.package.municipalities_resource, "municipality");

        assert!(write_default_config(&path).is_err());
    }
}
