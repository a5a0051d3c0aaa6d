use crate::model::Catalog;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Load the catalog JSON the site generator publishes next to its pages.
///
/// Single attempt, no retries: a missing or malformed catalog surfaces as an
/// error here and the caller presents the "No files found" state.
pub fn load(path: &Path) -> Result<Catalog> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    let catalog: Catalog = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse catalog {}", path.display()))?;
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"{
        "files": [
            {"song_id": "a", "title": "Alpha", "artist": "Anna",
             "audio_url": "audio/a.mp3", "html_filename": "alpha.html"},
            {"song_id": "b", "title": "Bravo", "artist": "Ben",
             "audio_url": "https://example.com/b", "html_filename": "bravo.html",
             "is_external": true}
        ]
    }"#;

    #[test]
    fn loads_catalog_from_disk() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("catalog.json");
        fs::write(&path, SAMPLE).expect("write");

        let catalog = load(&path).expect("load");
        assert_eq!(catalog.files.len(), 2);
        assert_eq!(catalog.files[0].song_id, "a");
        assert!(catalog.files[1].is_external);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().expect("tempdir");
        assert!(load(&dir.path().join("nope.json")).is_err());
    }

    #[test]
    fn malformed_json_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("catalog.json");
        fs::write(&path, "{ not json").expect("write");
        assert!(load(&path).is_err());
    }

    #[test]
    fn missing_files_field_yields_empty_catalog() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("catalog.json");
        fs::write(&path, "{}").expect("write");
        let catalog = load(&path).expect("load");
        assert!(catalog.is_empty());
    }
}
