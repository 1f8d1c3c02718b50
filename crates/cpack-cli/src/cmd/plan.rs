use super::{effective_config, load_input, InputArgs, PackArgs};
use crate::output::{print_json, print_table};
use cpack_core::packer;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct PlannedPack {
    name: String,
    rule_count: usize,
    estimated_bytes: usize,
    /// `None` for unnamed rules.
    rules: Vec<Option<String>>,
}

#[derive(Serialize)]
struct Plan {
    prefix: String,
    failed: usize,
    packs: Vec<PlannedPack>,
}

pub fn run(
    config_path: &Path,
    input: &InputArgs,
    pack: &PackArgs,
    json: bool,
) -> anyhow::Result<()> {
    let config = effective_config(config_path, pack, None)?;
    let descriptors = load_input(input)?;
    let failed = descriptors.iter().filter(|d| d.is_failed()).count();

    let packs = packer::pack(descriptors, &config.limits, &config.prefix)?;
    let plan = Plan {
        prefix: config.prefix,
        failed,
        packs: packs
            .into_iter()
            .map(|p| PlannedPack {
                rule_count: p.len(),
                estimated_bytes: p.estimated_bytes,
                rules: p.rules.into_iter().map(|r| r.name).collect(),
                name: p.name,
            })
            .collect(),
    };

    if json {
        return print_json(&plan);
    }

    let rows: Vec<Vec<String>> = plan
        .packs
        .iter()
        .map(|p| {
            vec![
                p.name.clone(),
                p.rule_count.to_string(),
                p.estimated_bytes.to_string(),
            ]
        })
        .collect();
    print_table(&["PACK", "RULES", "EST. BYTES"], &rows);

    if plan.failed > 0 {
        println!();
        println!("{} failed rule(s) will be skipped", plan.failed);
    }
    Ok(())
}
