pub mod distance;
pub mod plan;
pub mod site;

use crate::error::{CliError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::info;

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

pub(crate) fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| CliError::Other(e.into()))
}

/// Writes `value` to `output` when given, otherwise prints it to stdout.
pub(crate) fn emit_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let text = to_pretty_json(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
            info!("Wrote output to {:?}", path);
        }
        None => println!("{}", text),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[test]
    fn emitted_json_reads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.json");
        let value = BTreeMap::from([("rounds".to_string(), 3usize)]);

        emit_json(&value, Some(&path)).unwrap();
        let read: BTreeMap<String, usize> = read_json(&path).unwrap();
        assert_eq!(read, value);
    }

    #[test]
    fn malformed_json_reports_the_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        match read_json::<serde_json::Value>(&path) {
            Err(CliError::FileParsing { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected result {other:?}"),
        }
    }
}
