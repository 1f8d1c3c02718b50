//! Conformance pack template compilation.
//!
//! A template has three sections. `Parameters` declares one overridable
//! input per defaulted rule parameter. `Conditions` holds one guard per input
//! that is true when the input is non-empty. `Resources` holds the Config
//! rules, whose `InputParameters` pick the input through `Fn::If` so a
//! deployer can blank an override out entirely.

use crate::error::Result;
use crate::ident::{lower_first, normalize};
use crate::packer::Pack;
use crate::types::{ConfigRule, RuleSource};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

pub const CONFIG_RULE_TYPE: &str = "AWS::Config::ConfigRule";
pub const DEFAULT_DESCRIPTION: &str = "AWS Config Rule";
const NO_VALUE: &str = "AWS::NoValue";
const PARAMETER_TYPE: &str = "String";

/// File name a pack's template is written to.
pub fn template_file_name(pack_name: &str) -> String {
    format!("conformance-pack-{pack_name}.yaml")
}

// ---------------------------------------------------------------------------
// Section
// ---------------------------------------------------------------------------

/// Insertion-ordered key → value section. Inserting an existing key replaces
/// the value where it stands.
#[derive(Debug, Clone, PartialEq)]
pub struct Section<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for Section<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> Section<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the replaced value, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Serialize> Serialize for Section<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Intrinsic functions
// ---------------------------------------------------------------------------

/// The CloudFormation intrinsic functions a conformance pack uses.
///
/// Serialized as single-key maps (`{Ref: X}`, `{Fn::If: [...]}`), never as
/// YAML tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intrinsic {
    Ref(String),
    Not(Box<Intrinsic>),
    Equals(String, Box<Intrinsic>),
    If {
        condition: String,
        then: Box<Intrinsic>,
        otherwise: Box<Intrinsic>,
    },
}

impl Intrinsic {
    pub fn reference(name: impl Into<String>) -> Self {
        Intrinsic::Ref(name.into())
    }

    /// `Fn::Not [Fn::Equals ["", Ref parameter]]`
    pub fn not_empty(parameter: &str) -> Self {
        Intrinsic::Not(Box::new(Intrinsic::Equals(
            String::new(),
            Box::new(Intrinsic::reference(parameter)),
        )))
    }

    /// `Fn::If [condition, Ref parameter, Ref AWS::NoValue]`
    pub fn if_set(condition: &str, parameter: &str) -> Self {
        Intrinsic::If {
            condition: condition.to_string(),
            then: Box::new(Intrinsic::reference(parameter)),
            otherwise: Box::new(Intrinsic::reference(NO_VALUE)),
        }
    }
}

impl Serialize for Intrinsic {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Intrinsic::Ref(name) => map.serialize_entry("Ref", name)?,
            Intrinsic::Not(inner) => map.serialize_entry("Fn::Not", &[inner.as_ref()])?,
            Intrinsic::Equals(literal, inner) => {
                map.serialize_entry("Fn::Equals", &(literal, inner.as_ref()))?
            }
            Intrinsic::If {
                condition,
                then,
                otherwise,
            } => map.serialize_entry("Fn::If", &(condition, then.as_ref(), otherwise.as_ref()))?,
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Document types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterDecl {
    #[serde(rename = "Default")]
    pub default: String,
    #[serde(rename = "Type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleProperties {
    #[serde(rename = "ConfigRuleName")]
    pub config_rule_name: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Source")]
    pub source: RuleSource,
    #[serde(rename = "InputParameters", skip_serializing_if = "Section::is_empty")]
    pub input_parameters: Section<Intrinsic>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleResource {
    #[serde(rename = "Properties")]
    pub properties: RuleProperties,
    #[serde(rename = "Type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TemplateDocument {
    #[serde(rename = "Parameters", skip_serializing_if = "Section::is_empty")]
    pub parameters: Section<ParameterDecl>,
    #[serde(rename = "Conditions", skip_serializing_if = "Section::is_empty")]
    pub conditions: Section<Intrinsic>,
    #[serde(rename = "Resources")]
    pub resources: Section<RuleResource>,
}

// ---------------------------------------------------------------------------
// CompiledTemplate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTemplate {
    pub pack_name: String,
    pub generated_at: DateTime<Utc>,
    pub document: TemplateDocument,
    /// Resource and parameter keys a later rule in the pack replaced.
    pub overwritten: Vec<String>,
}

impl CompiledTemplate {
    pub fn rule_count(&self) -> usize {
        self.document.resources.len()
    }

    pub fn file_name(&self) -> String {
        template_file_name(&self.pack_name)
    }

    pub fn header(&self) -> String {
        let name = &self.pack_name;
        format!(
            "# AWS Config Conformance Pack: {name}\n\
             # Generated: {generated}\n\
             # Rules: {rules}\n\
             # Source: ISM Controls Mapping\n\
             #\n\
             # Deploy with:\n\
             #   aws configservice put-conformance-pack --conformance-pack-name {name} --template-body file://{file}\n\
             \n",
            generated = self.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            rules = self.rule_count(),
            file = self.file_name(),
        )
    }

    /// Header comment followed by the YAML document.
    pub fn to_yaml(&self) -> Result<String> {
        let body = serde_yaml::to_string(&self.document)?;
        Ok(self.header() + &body)
    }
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

pub fn compile(pack: &Pack) -> CompiledTemplate {
    compile_at(pack, Utc::now())
}

/// Compile `pack` with a fixed generation time.
///
/// Rules that normalize to the same resource name: the later one wins and
/// takes over the earlier one's position; the earlier one's parameters and
/// conditions are dropped with it. Parameter keys follow the same rule, and
/// the losing `InputParameters` slot is dropped so every input keeps exactly
/// one reference.
pub fn compile_at(pack: &Pack, generated_at: DateTime<Utc>) -> CompiledTemplate {
    let mut document = TemplateDocument::default();
    let mut overwritten = Vec::new();
    // parameter key -> (resource name, rule parameter name)
    let mut slots: HashMap<String, (String, String)> = HashMap::new();

    for (i, rule) in pack.rules.iter().enumerate() {
        // The synthetic name is already a valid key and is used as-is.
        let (rule_name, resource_name) = match &rule.name {
            Some(name) => (name.clone(), normalize(name)),
            None => {
                let synthetic = format!("ISMConfigRule{:03}", i + 1);
                (synthetic.clone(), synthetic)
            }
        };

        if document.resources.contains_key(&resource_name) {
            warn!(
                pack = %pack.name,
                resource = %resource_name,
                rule = %rule_name,
                "resource name collision, later rule replaces earlier one"
            );
            slots.retain(|key, (owner, _)| {
                if *owner != resource_name {
                    return true;
                }
                document.parameters.remove(key);
                document.conditions.remove(&lower_first(key));
                false
            });
            overwritten.push(resource_name.clone());
        }

        let resource = compile_rule(
            rule,
            rule_name,
            &resource_name,
            &mut document,
            &mut slots,
            &mut overwritten,
        );
        document.resources.insert(resource_name, resource);
    }

    CompiledTemplate {
        pack_name: pack.name.clone(),
        generated_at,
        document,
        overwritten,
    }
}

/// Build one rule resource, registering its parameters and conditions in
/// `document` and its parameter keys in `slots`.
fn compile_rule(
    rule: &ConfigRule,
    rule_name: String,
    resource_name: &str,
    document: &mut TemplateDocument,
    slots: &mut HashMap<String, (String, String)>,
    overwritten: &mut Vec<String>,
) -> RuleResource {
    let mut input_parameters = Section::new();

    for (param_name, default) in rule.defaulted_parameters() {
        let param_key = format!("{resource_name}Param{}", normalize(param_name));
        let guard_key = lower_first(&param_key);

        let owner = (resource_name.to_string(), param_name.to_string());
        if let Some((prev_resource, prev_param)) = slots.insert(param_key.clone(), owner) {
            warn!(parameter = %param_key, "parameter key collision, later value wins");
            overwritten.push(param_key.clone());
            if prev_resource == resource_name {
                input_parameters.remove(&prev_param);
            } else if let Some(prev) = document.resources.get_mut(&prev_resource) {
                prev.properties.input_parameters.remove(&prev_param);
            }
        }

        let decl = ParameterDecl {
            default: default.to_string(),
            kind: PARAMETER_TYPE.to_string(),
        };
        document.parameters.insert(param_key.clone(), decl);
        document
            .conditions
            .insert(guard_key.clone(), Intrinsic::not_empty(&param_key));
        input_parameters.insert(param_name, Intrinsic::if_set(&guard_key, &param_key));
    }

    let required: Vec<&str> = rule.required_parameters().collect();
    if !required.is_empty() {
        debug!(
            resource = %resource_name,
            required = ?required,
            "parameters without a default left out of the template"
        );
    }

    let properties = RuleProperties {
        description: rule
            .description
            .clone()
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        source: rule
            .source
            .clone()
            .unwrap_or_else(|| RuleSource::aws(resource_name)),
        config_rule_name: rule_name,
        input_parameters,
    };

    RuleResource {
        properties,
        kind: CONFIG_RULE_TYPE.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
