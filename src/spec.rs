//! Specification registry: which sections exist and which options they allow.
//!
//! [`FileSpec`] is the default registry. Anything implementing
//! [`SectionRegistry`] can stand in for it, e.g. a registry computed from
//! plugin metadata at runtime.
//!
//! Specs can be written by hand with the builder methods, or loaded from TOML
//! or JSON:
//!
//! ```toml
//! [[LogFile]]
//! name = "Path"
//! type = "string"
//! required = true
//!
//! [[LogFile]]
//! name = "MaxAge"
//! type = "duration"
//! default = "24h"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::decode::{UnmarshalSection, decode_section};
use crate::document::{Section, eq_fold};
use crate::error::ConfError;
use crate::types::OptionType;

/// Annotation key marking an option as secret.
pub const SECRET_ANNOTATION: &str = "unitconf/secret";

/// Free-form metadata attached to an option, e.g. for help generators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Annotations(BTreeMap<String, serde_json::Value>);

impl Annotations {
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Annotations marking an option as secret.
    pub fn secret() -> Self {
        Self::default().with(SECRET_ANNOTATION, true)
    }
}

/// Description of a single legal option.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionSpec {
    pub name: String,

    /// Alternative names accepted when decoding into typed records.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(rename = "type", default)]
    pub ty: OptionType,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,

    /// Default value injected for unset options. For required options this is
    /// documentation only and never injected.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default: String,

    /// Hidden from help output.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub internal: bool,

    #[serde(
        rename = "annotation",
        default,
        skip_serializing_if = "Annotations::is_empty"
    )]
    pub annotations: Annotations,
}

impl OptionSpec {
    pub fn new(name: impl Into<String>, ty: OptionType) -> Self {
        Self {
            name: name.into(),
            ty,
            ..Self::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = value.into();
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    pub fn annotate(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.annotations = self.annotations.with(key, value);
        self
    }

    pub fn has_annotation(&self, key: &str) -> bool {
        self.annotations.has(key)
    }

    pub fn is_secret(&self) -> bool {
        self.has_annotation(SECRET_ANNOTATION)
    }
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct OptionSpecFields {
    name: String,
    aliases: Vec<String>,
    description: String,
    required: bool,
    default: String,
    internal: bool,
}

/// Option specs can be declared in unit files themselves, one section per
/// option (see [`SectionSpec::for_option_specs`]). `Type` holds a type name
/// such as `[]int`.
impl UnmarshalSection for OptionSpec {
    fn unmarshal_section(section: &Section, spec: &dyn OptionRegistry) -> Result<Self, ConfError> {
        let fields: OptionSpecFields = decode_section(section, spec)?;
        let mut option = OptionSpec {
            name: fields.name,
            aliases: fields.aliases,
            description: fields.description,
            required: fields.required,
            default: fields.default,
            internal: fields.internal,
            ..OptionSpec::default()
        };

        if spec.has_option("type")
            && let [raw] = section.values("Type").as_slice()
        {
            option.ty = raw.parse().map_err(|e: ConfError| e.context("Type"))?;
        }

        Ok(option)
    }
}

/// Lookup of the options allowed in one section.
pub trait OptionRegistry {
    /// The spec for option `name`, compared case-insensitively.
    fn get_option(&self, name: &str) -> Option<&OptionSpec>;

    /// Every option spec, in declaration order.
    fn all(&self) -> &[OptionSpec];

    fn has_option(&self, name: &str) -> bool {
        self.get_option(name).is_some()
    }

    /// Like [`get_option`](Self::get_option), but also matches aliases.
    fn find_option(&self, name: &str) -> Option<&OptionSpec> {
        self.get_option(name).or_else(|| {
            self.all()
                .iter()
                .find(|spec| spec.aliases.iter().any(|a| eq_fold(a, name)))
        })
    }
}

/// Lookup of the option registry for a section name.
pub trait SectionRegistry {
    /// `None` marks the section as unknown.
    fn options_for_section(&self, name: &str) -> Option<&dyn OptionRegistry>;
}

/// Every option allowed in one section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionSpec(Vec<OptionSpec>);

impl SectionSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, option: OptionSpec) -> Self {
        self.0.push(option);
        self
    }

    pub fn push(&mut self, option: OptionSpec) {
        self.0.push(option);
    }

    pub fn iter(&self) -> impl Iterator<Item = &OptionSpec> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The options of a section that itself declares an option spec.
    pub fn for_option_specs() -> Self {
        Self::new()
            .with(OptionSpec::new("Name", OptionType::String).required())
            .with(OptionSpec::new("Aliases", OptionType::StringList))
            .with(OptionSpec::new("Description", OptionType::String))
            .with(OptionSpec::new("Type", OptionType::String).default_value("string"))
            .with(OptionSpec::new("Required", OptionType::Bool))
            .with(OptionSpec::new("Default", OptionType::String))
            .with(OptionSpec::new("Internal", OptionType::Bool))
    }
}

impl From<Vec<OptionSpec>> for SectionSpec {
    fn from(options: Vec<OptionSpec>) -> Self {
        Self(options)
    }
}

impl FromIterator<OptionSpec> for SectionSpec {
    fn from_iter<I: IntoIterator<Item = OptionSpec>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl OptionRegistry for SectionSpec {
    fn get_option(&self, name: &str) -> Option<&OptionSpec> {
        self.0.iter().find(|spec| eq_fold(&spec.name, name))
    }

    fn all(&self) -> &[OptionSpec] {
        &self.0
    }
}

/// All sections of a file and the options allowed in each. Section names are
/// stored lowercase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileSpec(BTreeMap<String, SectionSpec>);

impl FileSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_section(mut self, name: &str, spec: SectionSpec) -> Self {
        self.insert(name, spec);
        self
    }

    pub fn insert(&mut self, name: &str, spec: SectionSpec) {
        self.0.insert(name.to_lowercase(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&SectionSpec> {
        self.0.get(&name.to_lowercase()).or_else(|| {
            self.0
                .iter()
                .find(|(key, _)| eq_fold(key, name))
                .map(|(_, spec)| spec)
        })
    }

    /// Section names and their specs, sorted by name.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &SectionSpec)> {
        self.0.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    /// Load a spec from TOML, rejecting keys `OptionSpec` does not know.
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfError> {
        let mut unknown_keys: Vec<String> = Vec::new();

        let deserializer = toml::Deserializer::new(content);
        let spec: FileSpec = serde_ignored::deserialize(deserializer, |ignored_path| {
            unknown_keys.push(ignored_path.to_string());
        })
        .map_err(|e| ConfError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        if !unknown_keys.is_empty() {
            let errors = unknown_keys
                .into_iter()
                .map(|key| {
                    let line = find_key_line(content, &key);
                    ConfError::UnknownKey {
                        key,
                        path: path.to_path_buf(),
                        line,
                    }
                })
                .collect();
            return Err(ConfError::UnknownKeys(errors));
        }

        spec.normalized()
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfError> {
        let spec: FileSpec = serde_json::from_str(content)?;
        spec.normalized()
    }

    fn normalized(self) -> Result<Self, ConfError> {
        let mut out = FileSpec::new();
        for (name, section) in self.0 {
            if section.is_empty() {
                return Err(ConfError::NoOptions.context(name));
            }
            out.insert(&name, section);
        }
        Ok(out)
    }
}

impl<S: AsRef<str>> FromIterator<(S, SectionSpec)> for FileSpec {
    fn from_iter<I: IntoIterator<Item = (S, SectionSpec)>>(iter: I) -> Self {
        let mut spec = FileSpec::new();
        for (name, section) in iter {
            spec.insert(name.as_ref(), section);
        }
        spec
    }
}

impl SectionRegistry for FileSpec {
    fn options_for_section(&self, name: &str) -> Option<&dyn OptionRegistry> {
        self.get(name).map(|spec| spec as &dyn OptionRegistry)
    }
}

/// Find the 1-indexed line of an unknown key reported as `Section.<index>.key`.
///
/// Tracks `[[Section]]` headers while scanning and matches the key inside the
/// `index`-th table of that name. Inline tables are not handled. Returns 0 if
/// the key cannot be located.
fn find_key_line(content: &str, dotted_key: &str) -> usize {
    let segments: Vec<&str> = dotted_key.split('.').collect();
    let [table, index, leaf] = segments.as_slice() else {
        return 0;
    };
    let Ok(index) = index.parse::<usize>() else {
        return 0;
    };

    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    let mut current: Option<(String, usize)> = None;

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        if let Some(header) = trimmed
            .strip_prefix("[[")
            .and_then(|rest| rest.strip_suffix("]]"))
        {
            let header = header.trim().trim_matches('"').to_string();
            let count = seen.entry(header.clone()).or_insert(0);
            current = Some((header, *count));
            *count += 1;
            continue;
        }

        let in_right_table = current
            .as_ref()
            .is_some_and(|(name, n)| name == table && *n == index);

        if in_right_table
            && let Some(after_key) = trimmed.strip_prefix(leaf)
            && after_key.trim_start().starts_with('=')
        {
            return i + 1;
        }
    }
    0
}
