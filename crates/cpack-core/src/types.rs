use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// RuleSource
// ---------------------------------------------------------------------------

/// Reference to the rule implementation backing a Config rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSource {
    #[serde(rename = "Owner")]
    pub owner: String,
    #[serde(rename = "SourceIdentifier")]
    pub source_identifier: String,
}

impl RuleSource {
    /// An AWS managed rule source.
    pub fn aws(source_identifier: impl Into<String>) -> Self {
        Self {
            owner: "AWS".to_string(),
            source_identifier: source_identifier.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// InputParameter
// ---------------------------------------------------------------------------

/// One rule input parameter. `default == None` marks a required parameter
/// with no default; those never reach the compiled template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputParameter {
    pub name: String,
    pub default: Option<String>,
}

/// String form of a parameter default as it appears in a template.
///
/// `null` means "no default". Strings are used verbatim, scalars in their
/// JSON spelling, and arrays/objects as compact JSON.
pub fn default_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// ConfigRule / FailedRule
// ---------------------------------------------------------------------------

/// A rule the upstream mapping resolved to a concrete configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigRule {
    pub name: Option<String>,
    pub description: Option<String>,
    pub source: Option<RuleSource>,
    /// In the order the upstream record listed them.
    pub parameters: Vec<InputParameter>,
    /// ISM control ids this rule was mapped from. Collected into the
    /// manifest's control mappings.
    pub controls: Vec<String>,
}

impl ConfigRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_source(mut self, source: RuleSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, default: impl Into<String>) -> Self {
        self.parameters.push(InputParameter {
            name: name.into(),
            default: Some(default.into()),
        });
        self
    }

    pub fn with_required_parameter(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(InputParameter {
            name: name.into(),
            default: None,
        });
        self
    }

    /// Parameters that carry a default, with that default.
    pub fn defaulted_parameters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parameters
            .iter()
            .filter_map(|p| p.default.as_deref().map(|d| (p.name.as_str(), d)))
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .filter(|p| p.default.is_none())
            .map(|p| p.name.as_str())
    }
}

/// A rule the upstream mapping could not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedRule {
    pub name: Option<String>,
    pub error: String,
}

// ---------------------------------------------------------------------------
// RuleDescriptor
// ---------------------------------------------------------------------------

/// One record from the mapping stage.
///
/// Deserializes from the upstream JSON shape (`ConfigRuleName`,
/// `Description`, `Source`, `InputParameters`, `ISMControls`); any record
/// carrying an `error` key is a failure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawDescriptor")]
pub enum RuleDescriptor {
    Resolved(ConfigRule),
    Failed(FailedRule),
}

impl RuleDescriptor {
    pub fn failed(name: Option<&str>, error: impl Into<String>) -> Self {
        RuleDescriptor::Failed(FailedRule {
            name: name.map(str::to_string),
            error: error.into(),
        })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RuleDescriptor::Failed(_))
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            RuleDescriptor::Resolved(rule) => rule.name.as_deref(),
            RuleDescriptor::Failed(failed) => failed.name.as_deref(),
        }
    }

    pub fn as_resolved(&self) -> Option<&ConfigRule> {
        match self {
            RuleDescriptor::Resolved(rule) => Some(rule),
            RuleDescriptor::Failed(_) => None,
        }
    }
}

impl From<ConfigRule> for RuleDescriptor {
    fn from(rule: ConfigRule) -> Self {
        RuleDescriptor::Resolved(rule)
    }
}

#[derive(Deserialize)]
struct RawDescriptor {
    #[serde(rename = "ConfigRuleName", default)]
    name: Option<String>,
    #[serde(rename = "Description", default)]
    description: Option<String>,
    #[serde(rename = "Source", default)]
    source: Option<RuleSource>,
    #[serde(rename = "InputParameters", default)]
    input_parameters: Option<Map<String, Value>>,
    #[serde(rename = "ISMControls", default)]
    controls: Option<Vec<String>>,
    #[serde(default)]
    error: Option<String>,
}

impl From<RawDescriptor> for RuleDescriptor {
    fn from(raw: RawDescriptor) -> Self {
        if let Some(error) = raw.error {
            return RuleDescriptor::Failed(FailedRule {
                name: raw.name,
                error,
            });
        }

        let parameters = raw
            .input_parameters
            .unwrap_or_default()
            .iter()
            .map(|(name, value)| InputParameter {
                name: name.clone(),
                default: default_string(value),
            })
            .collect();

        RuleDescriptor::Resolved(ConfigRule {
            name: raw.name,
            description: raw.description,
            source: raw.source,
            parameters,
            controls: raw.controls.unwrap_or_default(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_resolved_record() {
        let json = r#"{
            "ConfigRuleName": "ACCESS_KEYS_ROTATED",
            "Description": "Checks active IAM access keys are rotated",
            "Source": {"Owner": "AWS", "SourceIdentifier": "ACCESS_KEYS_ROTATED"},
            "InputParameters": {"maxAccessKeyAge": 90, "zeta": "z", "alpha": null},
            "ISMControls": ["ISM-1590", "ISM-1591"]
        }"#;
        let desc: RuleDescriptor = serde_json::from_str(json).unwrap();
        let rule = desc.as_resolved().expect("resolved");
        assert_eq!(rule.name.as_deref(), Some("ACCESS_KEYS_ROTATED"));
        assert_eq!(rule.source, Some(RuleSource::aws("ACCESS_KEYS_ROTATED")));
        assert_eq!(rule.controls, vec!["ISM-1590", "ISM-1591"]);

        let names: Vec<_> = rule.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["maxAccessKeyAge", "zeta", "alpha"]);
        let defaults: Vec<_> = rule.defaulted_parameters().collect();
        assert_eq!(defaults, vec![("maxAccessKeyAge", "90"), ("zeta", "z")]);
        assert_eq!(rule.required_parameters().collect::<Vec<_>>(), vec!["alpha"]);
    }

    #[test]
    fn error_key_marks_failure() {
        let json = r#"{"ConfigRuleName": "MYSTERY_RULE", "error": "Rule not found in documentation"}"#;
        let desc: RuleDescriptor = serde_json::from_str(json).unwrap();
        assert!(desc.is_failed());
        assert_eq!(desc.name(), Some("MYSTERY_RULE"));
        match desc {
            RuleDescriptor::Failed(f) => assert_eq!(f.error, "Rule not found in documentation"),
            RuleDescriptor::Resolved(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn missing_fields_stay_absent() {
        let desc: RuleDescriptor = serde_json::from_str(r#"{"InputParameters": null}"#).unwrap();
        let rule = desc.as_resolved().unwrap();
        assert!(rule.name.is_none());
        assert!(rule.description.is_none());
        assert!(rule.source.is_none());
        assert!(rule.parameters.is_empty());
    }

    #[test]
    fn default_string_forms() {
        assert_eq!(default_string(&Value::Null), None);
        assert_eq!(default_string(&serde_json::json!("my-bucket")).unwrap(), "my-bucket");
        assert_eq!(default_string(&serde_json::json!(true)).unwrap(), "true");
        assert_eq!(default_string(&serde_json::json!(90)).unwrap(), "90");
        assert_eq!(default_string(&serde_json::json!(1.5)).unwrap(), "1.5");
        assert_eq!(default_string(&serde_json::json!(["a", "b"])).unwrap(), r#"["a","b"]"#);
    }

    #[test]
    fn parses_yaml_records() {
        let yaml = "- ConfigRuleName: s3-bucket-versioning-enabled\n  InputParameters:\n    isMfaDeleteEnabled: false\n- error: timeout\n";
        let descs: Vec<RuleDescriptor> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(descs.len(), 2);
        let rule = descs[0].as_resolved().unwrap();
        assert_eq!(
            rule.defaulted_parameters().collect::<Vec<_>>(),
            vec![("isMfaDeleteEnabled", "false")]
        );
        assert!(descs[1].is_failed());
    }
}
