use crate::types::ConfigRule;

/// Fixed YAML structure cost of one rule resource.
pub const RULE_OVERHEAD_BYTES: usize = 200;

/// Fixed cost of one defaulted parameter: its Parameters entry, its
/// condition and the `Fn::If` reference in the resource.
pub const PARAMETER_OVERHEAD_BYTES: usize = 150;

/// Name counted for a rule that arrived without one.
const UNNAMED_RULE: &str = "UNKNOWN_RULE";

/// Approximate number of bytes `rule` adds to a compiled template.
///
/// Deliberately rough; only packing decisions depend on it. Required
/// parameters emit nothing and so cost nothing.
pub fn estimate(rule: &ConfigRule) -> usize {
    let name = rule.name.as_deref().unwrap_or(UNNAMED_RULE);
    let description = rule.description.as_deref().unwrap_or("");

    let base = name.len() + description.len() + RULE_OVERHEAD_BYTES;
    let params: usize = rule
        .defaulted_parameters()
        .map(|(name, default)| PARAMETER_OVERHEAD_BYTES + name.len() + default.len())
        .sum();

    base + params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_rule() {
        let rule = ConfigRule::new("ROOT_ACCOUNT_MFA_ENABLED");
        assert_eq!(estimate(&rule), 24 + 200);
    }

    #[test]
    fn description_counts() {
        let rule = ConfigRule::new("ABC").with_description("0123456789");
        assert_eq!(estimate(&rule), 3 + 10 + 200);
    }

    #[test]
    fn defaulted_parameters_add_overhead() {
        let rule = ConfigRule::new("s3-bucket-public-read-prohibited")
            .with_parameter("excludedBuckets", "my-bucket");
        assert_eq!(estimate(&rule), 32 + 200 + 150 + 15 + 9);
    }

    #[test]
    fn required_parameters_are_free() {
        let with_required = ConfigRule::new("RULE").with_required_parameter("tagKey");
        assert_eq!(estimate(&with_required), estimate(&ConfigRule::new("RULE")));
    }

    #[test]
    fn unnamed_rule_uses_placeholder_length() {
        assert_eq!(estimate(&ConfigRule::default()), UNNAMED_RULE.len() + 200);
    }
}
