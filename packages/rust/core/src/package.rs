//! Local data package access (frictionless `datapackage.json` layout).
//!
//! The descriptor lists named resources whose `path` is relative to the
//! descriptor's directory. Two are used: the state lookup and the canonical
//! municipality table.

use std::path::{Path, PathBuf};

use muniuri_shared::{MuniUriError, Result, StateLookup};
use serde::Deserialize;
use tracing::debug;

/// Parsed `datapackage.json` descriptor.
#[derive(Debug, Clone)]
pub struct DataPackage {
    /// Directory containing the descriptor; resource paths resolve against it.
    base_dir: PathBuf,
    resources: Vec<ResourceDescriptor>,
}

/// A `resources[]` entry. Fields beyond `name` and `path` are ignored.
#[derive(Debug, Clone, Deserialize)]
struct ResourceDescriptor {
    name: String,
    path: String,
}

#[derive(Debug, Deserialize)]
struct Descriptor {
    #[serde(default)]
    resources: Vec<ResourceDescriptor>,
}

impl DataPackage {
    /// Read and parse a `datapackage.json` file.
    pub fn open(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| MuniUriError::io(path, e))?;
        let descriptor: Descriptor = serde_json::from_str(&content)
            .map_err(|e| MuniUriError::parse(format!("{}: {e}", path.display())))?;

        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        debug!(
            ?path,
            resources = descriptor.resources.len(),
            "data package opened"
        );

        Ok(Self {
            base_dir,
            resources: descriptor.resources,
        })
    }

    /// Resolved filesystem path of the named resource.
    pub fn resource_path(&self, name: &str) -> Result<PathBuf> {
        self.resources
            .iter()
            .find(|r| r.name == name)
            .map(|r| self.base_dir.join(&r.path))
            .ok_or_else(|| {
                MuniUriError::validation(format!("data package has no resource named '{name}'"))
            })
    }
}

#[derive(Debug, Deserialize)]
struct StateRow {
    name: String,
    abbr: String,
}

/// Load the state lookup (`code,name,abbr`). The `code` column is not used.
pub fn load_states(path: &Path) -> Result<Vec<StateLookup>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_open_error(path, e))?;

    let headers = reader
        .headers()
        .map_err(|e| MuniUriError::parse(format!("{}: {e}", path.display())))?;
    for column in ["name", "abbr"] {
        if !headers.iter().any(|h| h == column) {
            return Err(MuniUriError::validation(format!(
                "{}: missing `{column}` column",
                path.display()
            )));
        }
    }

    reader
        .deserialize::<StateRow>()
        .map(|row| {
            row.map(|r| StateLookup {
                state_name: r.name,
                abbr: r.abbr,
            })
            .map_err(|e| MuniUriError::parse(format!("{}: {e}", path.display())))
        })
        .collect()
}

/// Map a CSV open failure to an I/O error when it is one.
pub(crate) fn csv_open_error(path: &Path, err: csv::Error) -> MuniUriError {
    match err.into_kind() {
        csv::ErrorKind::Io(source) => MuniUriError::io(path, source),
        other => MuniUriError::parse(format!("{}: {other:?}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = "../../../fixtures/package/datapackage.json";

    #[test]
    fn open_fixture_package() {
        let package = DataPackage::open(Path::new(FIXTURE)).unwrap();
        assert_eq!(package.resources.len(), 2);

        let uf = package.resource_path("uf").unwrap();
        assert_eq!(uf, Path::new("../../../fixtures/package/uf.csv"));
    }

    #[test]
    fn unknown_resource_is_validation_error() {
        let package = DataPackage::open(Path::new(FIXTURE)).unwrap();
        let err = package.resource_path("region").unwrap_err();
        assert!(matches!(err, MuniUriError::Validation { .. }));
    }

    #[test]
    fn missing_descriptor_is_io_error() {
        let err = DataPackage::open(Path::new("/nonexistent/datapackage.json")).unwrap_err();
        assert!(matches!(err, MuniUriError::Io { .. }));
    }

    #[test]
    fn malformed_descriptor_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("datapackage.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = DataPackage::open(&path).unwrap_err();
        assert!(matches!(err, MuniUriError::Parse { .. }));
    }

    #[test]
    fn load_fixture_states() {
        let package = DataPackage::open(Path::new(FIXTURE)).unwrap();
        let states = load_states(&package.resource_path("uf").unwrap()).unwrap();
        assert_eq!(
            states[0],
            StateLookup {
                state_name: "Example State".into(),
                abbr: "XX".into(),
            }
        );
        assert_eq!(states.len(), 2);
    }

    #[test]
    fn states_without_abbr_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uf.csv");
        std::fs::write(&path, "code,name\n26,Pernambuco\n").unwrap();
        let err = load_states(&path).unwrap_err();
        assert!(err.to_string().contains("`abbr`"));
    }
}
