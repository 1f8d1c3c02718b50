use super::{effective_config, load_input, GenerateArgs, InputArgs, PackArgs};
use crate::output::{print_json, print_table};
use anyhow::Context;
use cpack_core::artifacts::write_artifacts;
use cpack_core::orchestrator::{self, RunOptions};
use std::path::Path;

pub fn run(
    config_path: &Path,
    input: &InputArgs,
    pack: &PackArgs,
    output: &GenerateArgs,
    json: bool,
) -> anyhow::Result<()> {
    let config = effective_config(config_path, pack, output.out.as_deref())?;

    let descriptors = load_input(input)?;

    let mut options = RunOptions::new(config.prefix.clone()).with_limits(config.limits);
    if let Some(job_id) = &output.job_id {
        options = options.with_job_id(job_id.clone());
    }
    let run = orchestrator::run(descriptors, &options)?;

    write_artifacts(&config.output_dir, &run).with_context(|| {
        format!("failed to write artifacts to {}", config.output_dir.display())
    })?;

    let manifest = &run.manifest;
    if json {
        return print_json(manifest);
    }

    if manifest.packs.is_empty() {
        println!("No conformance packs generated.");
    } else {
        let rows: Vec<Vec<String>> = manifest
            .packs
            .iter()
            .map(|p| {
                vec![
                    p.name.clone(),
                    p.rule_count.to_string(),
                    p.size_bytes.to_string(),
                    format!("{:.1}%", manifest.size_percent(p)),
                    p.file_name.clone(),
                ]
            })
            .collect();
        print_table(&["PACK", "RULES", "BYTES", "LIMIT", "FILE"], &rows);
    }

    println!();
    println!(
        "{} rules: {} packed into {} pack(s), {} failed",
        manifest.total_rules,
        manifest.succeeded,
        manifest.pack_count(),
        manifest.failed
    );
    for entry in manifest.oversized() {
        println!(
            "warning: {} is {} bytes, over the {} byte limit",
            entry.name, entry.size_bytes, manifest.limits.max_pack_bytes
        );
    }
    println!("Wrote {}", config.output_dir.display());
    Ok(())
}
