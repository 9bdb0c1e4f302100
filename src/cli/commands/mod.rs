//! CLI command implementations.

pub mod classify;
pub mod config;
pub mod heuristic;

use anyhow::{Context, Result};
use std::path::Path;

use crate::domain::models::{Phase1Input, TestManifest};

/// Read a JSON test manifest from disk.
pub fn load_manifest(path: &Path) -> Result<TestManifest> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid manifest {}", path.display()))
}

/// Turn a manifest into classifier input. Flags win over manifest fields;
/// the analysis ID falls back to a fresh UUID and the language to `unknown`.
pub fn manifest_input(
    manifest: TestManifest,
    analysis_id: Option<String>,
    language: Option<String>,
) -> Phase1Input {
    let analysis_id = analysis_id
        .or_else(|| manifest.analysis_id.clone())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let language = language
        .or_else(|| manifest.language.clone())
        .unwrap_or_else(|| "unknown".to_string());
    manifest.into_input(analysis_id, language)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_manifest_and_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"analysisID":"run-7","language":"go","files":[{{"path":"a/x_test.go","tests":["TestA","TestB"]}}]}}"#
        )
        .unwrap();

        let manifest = load_manifest(file.path()).unwrap();
        let input = manifest_input(manifest.clone(), None, Some("rust".into()));
        assert_eq!(input.analysis_id, "run-7");
        assert_eq!(input.language, "rust");
        assert_eq!(input.test_count(), 2);

        let generated = manifest_input(
            TestManifest {
                analysis_id: None,
                ..manifest
            },
            None,
            None,
        );
        assert!(uuid::Uuid::parse_str(&generated.analysis_id).is_ok());
    }

    #[test]
    fn test_load_manifest_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(load_manifest(file.path()).is_err());
    }
}
