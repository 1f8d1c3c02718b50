use crate::error::Result;
use crate::io::atomic_write;
use crate::manifest::MANIFEST_FILE;
use crate::orchestrator::PackRun;
use crate::report::{render_report, REPORT_FILE};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Write every template of `run`, the generation report and the manifest
/// into `out_dir`. Returns the written paths, templates first.
pub fn write_artifacts(out_dir: &Path, run: &PackRun) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)?;
    let mut written = Vec::with_capacity(run.artifacts.len() + 2);

    for artifact in &run.artifacts {
        let path = out_dir.join(artifact.template.file_name());
        atomic_write(&path, artifact.yaml.as_bytes())?;
        debug!(path = %path.display(), bytes = artifact.yaml.len(), "wrote template");
        written.push(path);
    }

    for entry in run.manifest.oversized() {
        warn!(
            pack = %entry.name,
            size = entry.size_bytes,
            limit = run.manifest.limits.max_pack_bytes,
            "template exceeds the pack size limit"
        );
    }

    let report_path = out_dir.join(REPORT_FILE);
    atomic_write(&report_path, render_report(&run.manifest).as_bytes())?;
    written.push(report_path);

    let manifest_path = out_dir.join(MANIFEST_FILE);
    run.manifest.save(&manifest_path)?;
    written.push(manifest_path);

    Ok(written)
}
