//! Ruleset document loading from files and strings.

use std::path::Path;

use serde_json::Value;

use crate::error::LoadError;

/// Load a ruleset document from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_document(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(path = %path.display(), bytes = content.len(), "loaded ruleset document");
    load_document_str(&content)
}

/// Load a ruleset document from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON.
pub fn load_document_str(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn load_from_string() {
        let doc = load_document_str(r#"{"fields": {"name": ["required"]}}"#).unwrap();
        assert_eq!(doc, json!({ "fields": { "name": ["required"] } }));
    }

    #[test]
    fn load_invalid_json() {
        assert!(matches!(
            load_document_str("{ not json"),
            Err(LoadError::InvalidJson { .. })
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        fs::write(&path, r#"{"fields": {}}"#).unwrap();

        let doc = load_document(&path).unwrap();
        assert_eq!(doc, json!({ "fields": {} }));
    }

    #[test]
    fn load_missing_file() {
        let err = load_document(Path::new("/nonexistent/rules.json")).unwrap_err();
        assert!(matches!(err, LoadError::FileNotFound { .. }));
        assert_eq!(err.exit_code(), 3);
    }
}
