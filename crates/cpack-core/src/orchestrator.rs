use crate::error::Result;
use crate::manifest::{FailureEntry, Manifest, PackEntry, UNKNOWN_RULE};
use crate::packer::{self, PackLimits};
use crate::template::{self, CompiledTemplate};
use crate::types::RuleDescriptor;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::info;

/// Caller-supplied settings for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub prefix: String,
    pub limits: PackLimits,
    /// Generated when absent.
    pub job_id: Option<String>,
}

impl RunOptions {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            limits: PackLimits::default(),
            job_id: None,
        }
    }

    pub fn with_limits(mut self, limits: PackLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }
}

/// A compiled template and its rendered YAML.
#[derive(Debug, Clone)]
pub struct PackArtifact {
    pub template: CompiledTemplate,
    pub yaml: String,
}

#[derive(Debug, Clone)]
pub struct PackRun {
    pub manifest: Manifest,
    pub artifacts: Vec<PackArtifact>,
}

pub fn run(descriptors: Vec<RuleDescriptor>, options: &RunOptions) -> Result<PackRun> {
    run_at(descriptors, options, Utc::now())
}

/// Pack, compile and summarize `descriptors` with a fixed generation time.
///
/// Fails only on invalid limits, before anything is packed.
pub fn run_at(
    descriptors: Vec<RuleDescriptor>,
    options: &RunOptions,
    generated_at: DateTime<Utc>,
) -> Result<PackRun> {
    options.limits.validate()?;

    let total_rules = descriptors.len();
    let failures: Vec<FailureEntry> = descriptors
        .iter()
        .filter_map(|d| match d {
            RuleDescriptor::Failed(f) => Some(FailureEntry {
                name: f.name.clone().unwrap_or_else(|| UNKNOWN_RULE.to_string()),
                error: f.error.clone(),
            }),
            RuleDescriptor::Resolved(_) => None,
        })
        .collect();

    let controls = control_mappings(&descriptors);
    let packs = packer::pack(descriptors, &options.limits, &options.prefix)?;

    let mut artifacts = Vec::with_capacity(packs.len());
    let mut entries = Vec::with_capacity(packs.len());
    for pack in &packs {
        let template = template::compile_at(pack, generated_at);
        let yaml = template.to_yaml()?;
        entries.push(PackEntry {
            name: pack.name.clone(),
            file_name: template.file_name(),
            rule_count: template.rule_count(),
            size_bytes: yaml.len(),
            estimated_bytes: pack.estimated_bytes,
            overwritten: template.overwritten.clone(),
        });
        artifacts.push(PackArtifact { template, yaml });
    }

    let manifest = Manifest {
        job_id: options
            .job_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        prefix: options.prefix.clone(),
        generated_at,
        limits: options.limits,
        total_rules,
        succeeded: total_rules - failures.len(),
        failed: failures.len(),
        packs: entries,
        failures,
        controls,
    };

    info!(
        job_id = %manifest.job_id,
        packs = manifest.pack_count(),
        succeeded = manifest.succeeded,
        failed = manifest.failed,
        "generated conformance packs"
    );

    Ok(PackRun {
        manifest,
        artifacts,
    })
}

/// ISM control id -> names of the resolved rules mapped to it, in input order.
fn control_mappings(descriptors: &[RuleDescriptor]) -> BTreeMap<String, Vec<String>> {
    let mut controls: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for rule in descriptors.iter().filter_map(RuleDescriptor::as_resolved) {
        let name = rule.name.as_deref().unwrap_or(UNKNOWN_RULE);
        for control in &rule.controls {
            let rules = controls.entry(control.clone()).or_default();
            if !rules.iter().any(|r| r == name) {
                rules.push(name.to_string());
            }
        }
    }
    controls
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
