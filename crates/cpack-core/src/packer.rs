use crate::error::{PackError, Result};
use crate::footprint;
use crate::types::{ConfigRule, RuleDescriptor};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// AWS Config service limit on a conformance pack template body.
pub const MAX_PACK_SIZE_BYTES: usize = 51_200;

/// AWS Config service limit on rules per conformance pack.
pub const MAX_RULES_PER_PACK: usize = 130;

// ---------------------------------------------------------------------------
// PackLimits
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackLimits {
    #[serde(default = "default_max_bytes")]
    pub max_pack_bytes: usize,
    #[serde(default = "default_max_rules")]
    pub max_rules_per_pack: usize,
}

fn default_max_bytes() -> usize {
    MAX_PACK_SIZE_BYTES
}

fn default_max_rules() -> usize {
    MAX_RULES_PER_PACK
}

impl Default for PackLimits {
    fn default() -> Self {
        Self {
            max_pack_bytes: default_max_bytes(),
            max_rules_per_pack: default_max_rules(),
        }
    }
}

impl PackLimits {
    pub fn new(max_pack_bytes: usize, max_rules_per_pack: usize) -> Self {
        Self {
            max_pack_bytes,
            max_rules_per_pack,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_pack_bytes == 0 {
            return Err(PackError::InvalidLimits(
                "max_pack_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_rules_per_pack == 0 {
            return Err(PackError::InvalidLimits(
                "max_rules_per_pack must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// True when `bytes` fits in 90% of the byte limit. The remaining 10% is
    /// headroom for template structure the estimator doesn't model.
    pub fn within_budget(&self, bytes: usize) -> bool {
        bytes.saturating_mul(10) <= self.max_pack_bytes.saturating_mul(9)
    }
}

// ---------------------------------------------------------------------------
// Pack
// ---------------------------------------------------------------------------

/// A named group of rules destined for one template.
#[derive(Debug, Clone, PartialEq)]
pub struct Pack {
    pub name: String,
    pub rules: Vec<ConfigRule>,
    pub estimated_bytes: usize,
}

impl Pack {
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Name of the `ordinal`-th pack (1-based): the bare prefix for the first,
/// `prefix-NN` afterwards.
pub fn pack_name(prefix: &str, ordinal: usize) -> String {
    if ordinal <= 1 {
        prefix.to_string()
    } else {
        format!("{prefix}-{ordinal:02}")
    }
}

// ---------------------------------------------------------------------------
// Packing
// ---------------------------------------------------------------------------

/// Greedily pack resolved rules into groups, preserving input order.
///
/// Failed descriptors are skipped. A pack is closed before a rule would push
/// it past the rule-count limit or past 90% of the byte limit. A rule that is
/// too large on its own still gets a pack to itself.
pub fn pack(
    descriptors: Vec<RuleDescriptor>,
    limits: &PackLimits,
    prefix: &str,
) -> Result<Vec<Pack>> {
    limits.validate()?;

    let mut packs = Vec::new();
    let mut current: Vec<ConfigRule> = Vec::new();
    let mut current_bytes = 0usize;

    for descriptor in descriptors {
        let RuleDescriptor::Resolved(rule) = descriptor else {
            continue;
        };

        let size = footprint::estimate(&rule);
        let full = current.len() >= limits.max_rules_per_pack;
        let over_budget = !limits.within_budget(current_bytes + size);

        if (full || over_budget) && !current.is_empty() {
            close(&mut packs, &mut current, &mut current_bytes, prefix);
        }

        current.push(rule);
        current_bytes += size;
    }

    if !current.is_empty() {
        close(&mut packs, &mut current, &mut current_bytes, prefix);
    }

    Ok(packs)
}

fn close(packs: &mut Vec<Pack>, current: &mut Vec<ConfigRule>, bytes: &mut usize, prefix: &str) {
    let name = pack_name(prefix, packs.len() + 1);
    debug!(pack = %name, rules = current.len(), estimated_bytes = *bytes, "closed pack");
    packs.push(Pack {
        name,
        rules: std::mem::take(current),
        estimated_bytes: std::mem::take(bytes),
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
