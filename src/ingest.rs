//! Unit ingest: the upstream-producer seam.
//!
//! Loads content units from a JSON document into the store, applying the
//! producer-side body cap. Extraction itself (PDF parsing, chapter layout)
//! happens upstream; this module only accepts its output.

use crate::error::PipelineError;
use crate::store::UnitStore;
use crate::types::ContentUnit;
use std::path::Path;
use tracing::info;

/// Default body cap in characters
pub const DEFAULT_BODY_CAP: usize = 5000;

/// Marker appended to truncated bodies
pub const TRUNCATION_MARKER: &str = "...";

/// Result of one ingest run
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// Units written to the store
    pub loaded: usize,
    /// Units removed beforehand (with `replace`)
    pub cleared: usize,
    /// Units whose body hit the cap
    pub truncated: usize,
}

/// Cap `body` at `cap` characters, appending the truncation marker.
///
/// Char-boundary safe; bodies at or under the cap pass through unchanged.
pub fn truncate_body(body: &str, cap: usize) -> String {
    match body.char_indices().nth(cap) {
        Some((idx, _)) => format!("{}{}", &body[..idx], TRUNCATION_MARKER),
        None => body.to_string(),
    }
}

/// Load units from a JSON array of `{unit_id, title, body}` objects.
///
/// With `replace`, existing units are cleared first (the producer's
/// clear-and-reseed behavior). Duplicate ids within the document resolve to
/// the last occurrence via the store's keyed insert.
pub fn ingest_units(
    store: &dyn UnitStore,
    path: &Path,
    body_cap: usize,
    replace: bool,
) -> Result<IngestReport, PipelineError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| PipelineError::Ingest(format!("Failed to read {}: {}", path.display(), e)))?;

    let mut units: Vec<ContentUnit> = serde_json::from_str(&raw)
        .map_err(|e| PipelineError::Ingest(format!("Invalid unit document: {}", e)))?;

    let mut truncated = 0;
    for unit in &mut units {
        if unit.unit_id.is_empty() {
            return Err(PipelineError::Ingest(
                "Unit with empty unit_id".to_string(),
            ));
        }
        let capped = truncate_body(&unit.body, body_cap);
        if capped != unit.body {
            truncated += 1;
            unit.body = capped;
        }
    }

    let cleared = if replace { store.clear_units()? } else { 0 };
    store.put_units(&units)?;

    info!(
        loaded = units.len(),
        cleared,
        truncated,
        file = %path.display(),
        "Ingested content units"
    );

    Ok(IngestReport {
        loaded: units.len(),
        cleared,
        truncated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SledContentStore;
    use tempfile::TempDir;

    fn write_doc(dir: &TempDir, json: &str) -> std::path::PathBuf {
        let path = dir.path().join("units.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_truncate_body_under_cap() {
        assert_eq!(truncate_body("short", 10), "short");
        assert_eq!(truncate_body("exact", 5), "exact");
    }

    #[test]
    fn test_truncate_body_over_cap() {
        assert_eq!(truncate_body("abcdef", 4), "abcd...");
    }

    #[test]
    fn test_truncate_body_multibyte() {
        // 4 chars, all multibyte; cap below length must not split a char
        assert_eq!(truncate_body("éééé", 2), "éé...");
    }

    #[test]
    fn test_ingest_loads_and_caps() {
        let temp_dir = TempDir::new().unwrap();
        let store_dir = TempDir::new().unwrap();
        let store = SledContentStore::new(store_dir.path()).unwrap();

        let long_body = "x".repeat(6000);
        let doc = serde_json::json!([
            { "unit_id": "ch1-1", "title": "Factoring", "body": long_body },
            { "unit_id": "ch1-2", "title": "Square roots", "body": "short" },
        ]);
        let path = write_doc(&temp_dir, &doc.to_string());

        let report = ingest_units(&store, &path, DEFAULT_BODY_CAP, false).unwrap();
        assert_eq!(report.loaded, 2);
        assert_eq!(report.truncated, 1);
        assert_eq!(report.cleared, 0);

        let units = store.list_units().unwrap();
        assert_eq!(units[0].body.chars().count(), 5000 + TRUNCATION_MARKER.len());
        assert!(units[0].body.ends_with(TRUNCATION_MARKER));
        assert_eq!(units[1].body, "short");
    }

    #[test]
    fn test_ingest_replace_clears_existing() {
        let temp_dir = TempDir::new().unwrap();
        let store_dir = TempDir::new().unwrap();
        let store = SledContentStore::new(store_dir.path()).unwrap();

        store
            .put_unit(&ContentUnit {
                unit_id: "old".to_string(),
                title: "Old".to_string(),
                body: "old".to_string(),
            })
            .unwrap();

        let path = write_doc(
            &temp_dir,
            r#"[{ "unit_id": "new", "title": "New", "body": "new" }]"#,
        );

        let report = ingest_units(&store, &path, DEFAULT_BODY_CAP, true).unwrap();
        assert_eq!(report.cleared, 1);
        let ids: Vec<String> = store
            .list_units()
            .unwrap()
            .into_iter()
            .map(|u| u.unit_id)
            .collect();
        assert_eq!(ids, vec!["new"]);
    }

    #[test]
    fn test_ingest_rejects_bad_document() {
        let temp_dir = TempDir::new().unwrap();
        let store_dir = TempDir::new().unwrap();
        let store = SledContentStore::new(store_dir.path()).unwrap();

        let path = write_doc(&temp_dir, "{ not json ");
        assert!(matches!(
            ingest_units(&store, &path, DEFAULT_BODY_CAP, false),
            Err(PipelineError::Ingest(_))
        ));

        let path = write_doc(
            &temp_dir,
            r#"[{ "unit_id": "", "title": "t", "body": "b" }]"#,
        );
        assert!(matches!(
            ingest_units(&store, &path, DEFAULT_BODY_CAP, false),
            Err(PipelineError::Ingest(_))
        ));
    }
}
