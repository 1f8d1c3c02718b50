use crate::error::Result;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Write `data` to `path` via a tempfile in the same directory, so readers
/// never see a half-written template or report.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conformance-pack-ism.yaml");
        atomic_write(&path, b"Resources: {}\n").unwrap();
        atomic_write(&path, b"Resources: {}\n# again\n").unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Resources: {}\n# again\n"
        );
    }

    #[test]
    fn creates_missing_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/job-1/manifest.json");
        atomic_write(&path, b"{}").unwrap();
        assert!(path.exists());
    }
}
