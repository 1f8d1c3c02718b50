use crate::error::{PackError, Result};
use crate::packer::{PackLimits, MAX_PACK_SIZE_BYTES, MAX_RULES_PER_PACK};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const CONFIG_FILE: &str = "cpack.yaml";
pub const DEFAULT_PREFIX: &str = "ism-controls";
pub const DEFAULT_OUTPUT_DIR: &str = "conformance-packs";

const MAX_PREFIX_LEN: usize = 100;
const MAX_PACK_NAME_LEN: usize = 256;
const MAX_OUTPUT_DIR_LEN: usize = 255;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub limits: PackLimits,
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            output_dir: default_output_dir(),
            limits: PackLimits::default(),
        }
    }
}

impl Config {
    /// Load `path`, or the defaults when it doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if let Err(e) = validate_prefix(&self.prefix) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: e.to_string(),
            });
        }

        if let Err(e) = self.limits.validate() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: e.to_string(),
            });
        }

        if self.limits.max_pack_bytes > MAX_PACK_SIZE_BYTES {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "max_pack_bytes={} exceeds the AWS Config limit of {MAX_PACK_SIZE_BYTES} bytes",
                    self.limits.max_pack_bytes
                ),
            });
        }

        if self.limits.max_rules_per_pack > MAX_RULES_PER_PACK {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "max_rules_per_pack={} exceeds the AWS Config limit of {MAX_RULES_PER_PACK} rules",
                    self.limits.max_rules_per_pack
                ),
            });
        }

        if self.output_dir.as_os_str().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "output_dir cannot be empty".to_string(),
            });
        } else if self.output_dir.as_os_str().len() > MAX_OUTPUT_DIR_LEN {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("output_dir is longer than {MAX_OUTPUT_DIR_LEN} characters"),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Prefix validation
// ---------------------------------------------------------------------------

static PREFIX_RE: OnceLock<Regex> = OnceLock::new();

fn prefix_re() -> &'static Regex {
    PREFIX_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid prefix regex"))
}

/// Check a pack-name prefix against conformance pack naming rules.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    let invalid = |reason: &str| PackError::InvalidPrefix {
        prefix: prefix.to_string(),
        reason: reason.to_string(),
    };

    if prefix.trim().is_empty() {
        return Err(invalid("cannot be empty"));
    }
    if prefix.len() > MAX_PREFIX_LEN {
        return Err(invalid("longer than 100 characters"));
    }
    if !prefix_re().is_match(prefix) {
        return Err(invalid(
            "only alphanumeric characters, hyphens and underscores are allowed",
        ));
    }
    if prefix.len() + "-01".len() > MAX_PACK_NAME_LEN {
        return Err(invalid("pack names would exceed 256 characters"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.limits.max_pack_bytes, 51_200);
        assert_eq!(cfg.limits.max_rules_per_pack, 130);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "prefix: essential-eight\nlimits:\n  max_rules_per_pack: 50\n").unwrap();
        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.prefix, "essential-eight");
        assert_eq!(cfg.limits.max_rules_per_pack, 50);
        assert_eq!(cfg.limits.max_pack_bytes, 51_200);
        assert_eq!(cfg.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let cfg = Config {
            prefix: "ism".to_string(),
            output_dir: PathBuf::from("out"),
            limits: PackLimits::new(40_000, 100),
        };
        cfg.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), cfg);
    }

    #[test]
    fn default_config_is_clean() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn validation_levels() {
        let cfg = Config {
            prefix: "bad prefix!".to_string(),
            output_dir: PathBuf::from("out"),
            limits: PackLimits::new(100_000, 0),
        };
        let warnings = cfg.validate();
        let errors = warnings.iter().filter(|w| w.level == WarnLevel::Error).count();
        let warns = warnings.iter().filter(|w| w.level == WarnLevel::Warning).count();
        assert_eq!(errors, 2);
        assert_eq!(warns, 1);
    }

    #[test]
    fn long_output_dir_is_an_error() {
        let cfg = Config {
            output_dir: PathBuf::from("d".repeat(256)),
            ..Config::default()
        };
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Error);
    }

    #[test]
    fn valid_prefixes() {
        for prefix in ["ism-controls", "ISM_2024", "a", &"x".repeat(100)] {
            validate_prefix(prefix).unwrap_or_else(|_| panic!("expected valid: {prefix}"));
        }
    }

    #[test]
    fn invalid_prefixes() {
        for prefix in ["", "   ", "has space", "dot.ted", "slash/", &"x".repeat(101)] {
            assert!(validate_prefix(prefix).is_err(), "expected invalid: {prefix}");
        }
    }
}
