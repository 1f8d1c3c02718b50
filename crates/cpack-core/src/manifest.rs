use crate::error::Result;
use crate::packer::PackLimits;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Name reported for a failed record that carried no rule name.
pub const UNKNOWN_RULE: &str = "UNKNOWN";

pub const MANIFEST_FILE: &str = "manifest.json";

/// One generated pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackEntry {
    pub name: String,
    /// Where the template was (or will be) written, relative to the output dir.
    pub file_name: String,
    pub rule_count: usize,
    /// Size of the rendered template, header included.
    pub size_bytes: usize,
    pub estimated_bytes: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overwritten: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureEntry {
    pub name: String,
    pub error: String,
}

/// Summary of one generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub job_id: String,
    pub prefix: String,
    pub generated_at: DateTime<Utc>,
    pub limits: PackLimits,
    pub total_rules: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub packs: Vec<PackEntry>,
    #[serde(default)]
    pub failures: Vec<FailureEntry>,
    /// ISM control id -> rule names mapped to it.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub controls: BTreeMap<String, Vec<String>>,
}

impl Manifest {
    pub fn pack_count(&self) -> usize {
        self.packs.len()
    }

    /// Rendered size as a percentage of the configured byte limit.
    pub fn size_percent(&self, entry: &PackEntry) -> f64 {
        if self.limits.max_pack_bytes == 0 {
            return 0.0;
        }
        entry.size_bytes as f64 * 100.0 / self.limits.max_pack_bytes as f64
    }

    /// Packs whose rendered template exceeds the byte limit. Only possible
    /// for a single rule that is oversized on its own.
    pub fn oversized(&self) -> impl Iterator<Item = &PackEntry> {
        self.packs
            .iter()
            .filter(|p| p.size_bytes > self.limits.max_pack_bytes)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }
}
