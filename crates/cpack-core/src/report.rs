use crate::manifest::Manifest;
use chrono::SecondsFormat;

pub const REPORT_FILE: &str = "GENERATION_REPORT.md";

/// Render the Markdown generation report for a run.
pub fn render_report(manifest: &Manifest) -> String {
    let mut doc = String::new();
    let generated = manifest
        .generated_at
        .to_rfc3339_opts(SecondsFormat::Secs, true);

    doc.push_str("# ISM Controls Conformance Pack Generation Report\n\n");
    doc.push_str(&format!("Generated: {generated}\n"));
    doc.push_str(&format!("Job ID: {}\n\n", manifest.job_id));

    doc.push_str("## Summary\n\n");
    doc.push_str(&format!("- Total unique Config Rules: {}\n", manifest.total_rules));
    doc.push_str(&format!("- Successfully processed: {}\n", manifest.succeeded));
    doc.push_str(&format!("- Failed to process: {}\n", manifest.failed));
    doc.push_str(&format!(
        "- Conformance packs generated: {}\n\n",
        manifest.pack_count()
    ));

    doc.push_str("## Conformance Packs\n\n");
    if manifest.packs.is_empty() {
        doc.push_str("No conformance packs were generated.\n\n");
    }
    for entry in &manifest.packs {
        doc.push_str(&format!("### {}\n", entry.name));
        doc.push_str(&format!("- File: `{}`\n", entry.file_name));
        doc.push_str(&format!("- Rules: {}\n", entry.rule_count));
        doc.push_str(&format!(
            "- Size: {} bytes ({:.1}% of limit)\n",
            group_thousands(entry.size_bytes),
            manifest.size_percent(entry)
        ));
        if entry.size_bytes > manifest.limits.max_pack_bytes {
            doc.push_str(&format!(
                "- **Warning**: exceeds the {} byte limit\n",
                group_thousands(manifest.limits.max_pack_bytes)
            ));
        }
        if !entry.overwritten.is_empty() {
            doc.push_str(&format!(
                "- Overwritten keys: {}\n",
                entry.overwritten.join(", ")
            ));
        }
        doc.push_str("- Deploy command:\n");
        doc.push_str("  ```bash\n");
        doc.push_str("  aws configservice put-conformance-pack \\\n");
        doc.push_str(&format!("    --conformance-pack-name {} \\\n", entry.name));
        doc.push_str(&format!("    --template-body file://{}\n", entry.file_name));
        doc.push_str("  ```\n\n");
    }

    if !manifest.controls.is_empty() {
        doc.push_str("## Control Mappings\n\n");
        for (control, rules) in &manifest.controls {
            doc.push_str(&format!("- **{control}**: {}\n", rules.join(", ")));
        }
        doc.push('\n');
    }

    if !manifest.failures.is_empty() {
        doc.push_str("## Failed Rules\n\n");
        for failure in &manifest.failures {
            doc.push_str(&format!("- **{}**: {}\n", failure.name, failure.error));
        }
    }

    doc
}

/// `51200` → `51,200`
fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{FailureEntry, PackEntry};
    use crate::packer::PackLimits;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn manifest(packs: Vec<PackEntry>, failures: Vec<FailureEntry>) -> Manifest {
        Manifest {
            job_id: "job-7".to_string(),
            prefix: "ism".to_string(),
            generated_at: Utc.with_ymd_and_hms(2026, 2, 2, 9, 0, 0).unwrap(),
            limits: PackLimits::default(),
            total_rules: packs.iter().map(|p| p.rule_count).sum::<usize>() + failures.len(),
            succeeded: packs.iter().map(|p| p.rule_count).sum(),
            failed: failures.len(),
            packs,
            failures,
            controls: BTreeMap::new(),
        }
    }

    fn entry(name: &str, rules: usize, size: usize) -> PackEntry {
        PackEntry {
            name: name.to_string(),
            file_name: format!("conformance-pack-{name}.yaml"),
            rule_count: rules,
            size_bytes: size,
            estimated_bytes: size,
            overwritten: vec![],
        }
    }

    #[test]
    fn summary_and_pack_sections() {
        let m = manifest(
            vec![entry("ism", 130, 40_960), entry("ism-02", 4, 1_024)],
            vec![],
        );
        let report = render_report(&m);
        assert!(report.contains("Generated: 2026-02-02T09:00:00Z"));
        assert!(report.contains("Job ID: job-7"));
        assert!(report.contains("- Total unique Config Rules: 134"));
        assert!(report.contains("- Successfully processed: 134"));
        assert!(report.contains("- Failed to process: 0"));
        assert!(report.contains("- Conformance packs generated: 2"));
        assert!(report.contains("### ism\n"));
        assert!(report.contains("### ism-02\n"));
        assert!(report.contains("- Size: 40,960 bytes (80.0% of limit)"));
        assert!(report.contains("--template-body file://conformance-pack-ism-02.yaml"));
        assert!(!report.contains("## Failed Rules"));
    }

    #[test]
    fn failures_are_listed() {
        let m = manifest(
            vec![],
            vec![FailureEntry {
                name: "MYSTERY_RULE".to_string(),
                error: "Rule not found in documentation".to_string(),
            }],
        );
        let report = render_report(&m);
        assert!(report.contains("No conformance packs were generated."));
        assert!(report.contains("## Failed Rules"));
        assert!(report.contains("- **MYSTERY_RULE**: Rule not found in documentation"));
    }

    #[test]
    fn oversized_pack_is_flagged() {
        let report = render_report(&manifest(vec![entry("ism", 1, 60_000)], vec![]));
        assert!(report.contains("**Warning**: exceeds the 51,200 byte limit"));
    }

    #[test]
    fn control_mappings_are_listed_by_control() {
        let mut m = manifest(vec![entry("ism", 2, 1_000)], vec![]);
        m.controls = BTreeMap::from([
            ("ISM-1590".to_string(), vec!["ACCESS_KEYS_ROTATED".to_string()]),
            (
                "ISM-0421".to_string(),
                vec!["IAM_PASSWORD_POLICY".to_string(), "MFA_ENABLED".to_string()],
            ),
        ]);
        let report = render_report(&m);
        let section = report.split("## Control Mappings\n\n").nth(1).unwrap();
        let lines: Vec<_> = section.lines().take(2).collect();
        assert_eq!(
            lines,
            vec![
                "- **ISM-0421**: IAM_PASSWORD_POLICY, MFA_ENABLED",
                "- **ISM-1590**: ACCESS_KEYS_ROTATED",
            ]
        );
    }

    #[test]
    fn no_control_section_without_controls() {
        let report = render_report(&manifest(vec![entry("ism", 1, 500)], vec![]));
        assert!(!report.contains("## Control Mappings"));
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }
}
