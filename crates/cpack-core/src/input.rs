//! Loading rule descriptors produced by the mapping stage.
//!
//! Two shapes are accepted: a flat array of descriptors (JSON or YAML), or a
//! directory of batch-result files written by parallel mapping workers.

use crate::error::{PackError, Result};
use crate::types::RuleDescriptor;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Read a JSON or YAML array of descriptors.
pub fn load_descriptors(path: &Path) -> Result<Vec<RuleDescriptor>> {
    if !path.exists() {
        return Err(PackError::InputNotFound(path.to_path_buf()));
    }
    let data = std::fs::read_to_string(path)?;
    let descriptors: Vec<RuleDescriptor> = match extension(path).as_deref() {
        Some("json") => serde_json::from_str(&data)?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&data)?,
        _ => return Err(PackError::UnsupportedInput(path.to_path_buf())),
    };
    debug!(path = %path.display(), count = descriptors.len(), "loaded descriptors");
    Ok(descriptors)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

// ---------------------------------------------------------------------------
// Batch results
// ---------------------------------------------------------------------------

/// A rule a mapping worker gave up on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BatchError {
    #[serde(default)]
    pub rule_id: Option<String>,
    pub error: String,
}

/// Output of one mapping worker.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchResult {
    pub batch_id: u32,
    #[serde(default)]
    pub processed_rules: Vec<RuleDescriptor>,
    #[serde(default)]
    pub errors: Vec<BatchError>,
}

/// Read every `*.json` batch result in `dir`.
pub fn load_batch_results(dir: &Path) -> Result<Vec<BatchResult>> {
    if !dir.is_dir() {
        return Err(PackError::InputNotFound(dir.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && extension(p).as_deref() == Some("json"))
        .collect();
    files.sort();

    let mut batches = Vec::with_capacity(files.len());
    for file in files {
        let data = std::fs::read_to_string(&file)?;
        let batch: BatchResult = serde_json::from_str(&data)?;
        debug!(
            file = %file.display(),
            batch_id = batch.batch_id,
            rules = batch.processed_rules.len(),
            errors = batch.errors.len(),
            "loaded batch result"
        );
        batches.push(batch);
    }
    Ok(batches)
}

/// Flatten batch results into one ordered descriptor list.
///
/// Batches are ordered by `batch_id`; within a batch, processed rules come
/// first in worker order, then the worker's errors as failed descriptors.
pub fn merge_batches(mut batches: Vec<BatchResult>) -> Vec<RuleDescriptor> {
    batches.sort_by_key(|b| b.batch_id);

    for pair in batches.windows(2) {
        if pair[0].batch_id == pair[1].batch_id {
            warn!(batch_id = pair[0].batch_id, "duplicate batch id");
        }
    }

    let mut merged = Vec::new();
    for batch in batches {
        merged.extend(batch.processed_rules);
        merged.extend(
            batch
                .errors
                .into_iter()
                .map(|e| RuleDescriptor::failed(e.rule_id.as_deref(), e.error)),
        );
    }
    merged
}

/// Load and merge a batch-result directory.
pub fn load_batches(dir: &Path) -> Result<Vec<RuleDescriptor>> {
    Ok(merge_batches(load_batch_results(dir)?))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DESCRIPTORS_JSON: &str = r#"[
        {"ConfigRuleName": "ACCESS_KEYS_ROTATED", "InputParameters": {"maxAccessKeyAge": "90"}},
        {"ConfigRuleName": "BROKEN", "error": "parse failure"},
        {"ConfigRuleName": "CLOUDTRAIL_ENABLED"}
    ]"#;

    #[test]
    fn loads_json_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, DESCRIPTORS_JSON).unwrap();

        let descs = load_descriptors(&path).unwrap();
        assert_eq!(descs.len(), 3);
        assert!(descs[1].is_failed());
        assert_eq!(descs[2].name(), Some("CLOUDTRAIL_ENABLED"));
    }

    #[test]
    fn loads_yaml_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.YML");
        std::fs::write(&path, "- ConfigRuleName: CLOUDTRAIL_ENABLED\n").unwrap();
        assert_eq!(load_descriptors(&path).unwrap().len(), 1);
    }

    #[test]
    fn rejects_unknown_extension_and_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.txt");
        std::fs::write(&path, "[]").unwrap();
        assert!(matches!(
            load_descriptors(&path).unwrap_err(),
            PackError::UnsupportedInput(_)
        ));
        assert!(matches!(
            load_descriptors(&dir.path().join("nope.json")).unwrap_err(),
            PackError::InputNotFound(_)
        ));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_descriptors(&path).unwrap_err(), PackError::Json(_)));
    }

    fn write_batch(dir: &Path, file: &str, id: u32, rules: &[&str], errors: &[&str]) {
        let processed: Vec<_> = rules
            .iter()
            .map(|r| serde_json::json!({"ConfigRuleName": r}))
            .collect();
        let errs: Vec<_> = errors
            .iter()
            .map(|r| serde_json::json!({"rule_id": r, "error": "timeout"}))
            .collect();
        let body = serde_json::json!({
            "batch_id": id,
            "processed_rules": processed,
            "errors": errs,
            "rules_processed": rules.len(),
        });
        std::fs::write(dir.join(file), body.to_string()).unwrap();
    }

    #[test]
    fn batches_merge_in_batch_id_order() {
        let dir = TempDir::new().unwrap();
        // File names sort differently from batch ids on purpose.
        write_batch(dir.path(), "batch-10.json", 10, &["J", "K"], &[]);
        write_batch(dir.path(), "batch-2.json", 2, &["C", "D"], &["E"]);
        write_batch(dir.path(), "batch-1.json", 1, &["A", "B"], &[]);
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let merged = load_batches(dir.path()).unwrap();
        let names: Vec<_> = merged.iter().map(|d| d.name().unwrap()).collect();
        assert_eq!(names, vec!["A", "B", "C", "D", "E", "J", "K"]);
        assert!(merged[4].is_failed());
        assert_eq!(merged.iter().filter(|d| d.is_failed()).count(), 1);
    }

    #[test]
    fn missing_batch_dir() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_batch_results(&dir.path().join("absent")).unwrap_err(),
            PackError::InputNotFound(_)
        ));
    }
}
