pub mod config;
pub mod generate;
pub mod ident;
pub mod plan;

use anyhow::Context;
use clap::Args;
use cpack_core::config::{Config, WarnLevel};
use cpack_core::input;
use cpack_core::types::RuleDescriptor;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Shared arguments
// ---------------------------------------------------------------------------

#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct InputArgs {
    /// JSON or YAML file holding an array of rule descriptors
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Directory of batch-result JSON files
    #[arg(long, value_name = "DIR")]
    pub batches: Option<PathBuf>,
}

#[derive(Args)]
pub struct PackArgs {
    /// Pack name prefix
    #[arg(long, env = "CPACK_PREFIX")]
    pub prefix: Option<String>,

    /// Byte limit per pack
    #[arg(long, value_name = "BYTES")]
    pub max_bytes: Option<usize>,

    /// Rule limit per pack
    #[arg(long, value_name = "N")]
    pub max_rules: Option<usize>,
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Output directory
    #[arg(long, env = "CPACK_OUTPUT_DIR", value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Job id recorded in the manifest (default: random UUID)
    #[arg(long)]
    pub job_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn load_input(args: &InputArgs) -> anyhow::Result<Vec<RuleDescriptor>> {
    match (&args.input, &args.batches) {
        (Some(file), _) => input::load_descriptors(file)
            .with_context(|| format!("failed to load descriptors from {}", file.display())),
        (None, Some(dir)) => input::load_batches(dir)
            .with_context(|| format!("failed to load batch results from {}", dir.display())),
        (None, None) => anyhow::bail!("one of --input or --batches is required"),
    }
}

/// Config file values overridden by flags and environment. Fails on any
/// validation error in the result.
pub fn effective_config(
    config_path: &Path,
    pack: &PackArgs,
    out: Option<&Path>,
) -> anyhow::Result<Config> {
    let mut config = Config::load(config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;

    if let Some(prefix) = &pack.prefix {
        config.prefix = prefix.clone();
    }
    if let Some(bytes) = pack.max_bytes {
        config.limits.max_pack_bytes = bytes;
    }
    if let Some(rules) = pack.max_rules {
        config.limits.max_rules_per_pack = rules;
    }

    if let Some(out) = out {
        config.output_dir = out.to_path_buf();
    }

    let errors: Vec<String> = config
        .validate()
        .into_iter()
        .filter(|w| w.level == WarnLevel::Error)
        .map(|w| w.message)
        .collect();
    if !errors.is_empty() {
        anyhow::bail!("{}", errors.join("; "));
    }
    Ok(config)
}
