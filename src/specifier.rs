//! `%x` specifier substitution in option values.
//!
//! A specifier is a `%` followed by one character. `%%` is a literal percent
//! sign; every other specifier must be known to the [`Specifiers`] table.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::document::File;
use crate::error::ConfError;

static SPECIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)%.").expect("specifier pattern is valid"));

/// Maps specifier characters to their replacement text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Specifiers(BTreeMap<char, String>);

impl Specifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, specifier: char, value: impl Into<String>) -> Self {
        self.insert(specifier, value);
        self
    }

    pub fn insert(&mut self, specifier: char, value: impl Into<String>) {
        self.0.insert(specifier, value.into());
    }

    pub fn get(&self, specifier: char) -> Result<&str, ConfError> {
        self.0
            .get(&specifier)
            .map(String::as_str)
            .ok_or_else(|| ConfError::UnknownSpecifier(format!("%{specifier}")))
    }

    pub fn contains(&self, specifier: char) -> bool {
        self.0.contains_key(&specifier)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Replace every specifier in `text`. The first unknown specifier fails
    /// the whole replacement.
    pub fn replace(&self, text: &str) -> Result<String, ConfError> {
        let mut unknown = None;
        let replaced = SPECIFIER_RE.replace_all(text, |caps: &Captures| {
            let id = &caps[0];
            let Some(c) = id.chars().nth(1) else {
                return id.to_string();
            };
            if c == '%' {
                return "%".to_string();
            }
            match self.0.get(&c) {
                Some(value) => value.clone(),
                None => {
                    unknown.get_or_insert_with(|| id.to_string());
                    id.to_string()
                }
            }
        });

        match unknown {
            Some(id) => Err(ConfError::UnknownSpecifier(id)),
            None => Ok(replaced.into_owned()),
        }
    }
}

impl FromIterator<(char, String)> for Specifiers {
    fn from_iter<I: IntoIterator<Item = (char, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Return a copy of `file` with specifiers replaced in every option value.
pub fn replace_specifiers(file: &File, specifiers: &Specifiers) -> Result<File, ConfError> {
    let mut copy = file.clone();
    for section in &mut copy.sections {
        for opt in &mut section.options {
            opt.value = specifiers
                .replace(&opt.value)
                .map_err(|e| e.context(&opt.name).context(&section.name))?;
        }
    }
    debug!(file = %file.path.display(), "replaced specifiers");
    Ok(copy)
}

/// The instance part of a template unit name: `config-1` for
/// `my-webserver@config-1.service`. `None` when the name has no `@`.
pub fn template_instance_name(path: impl AsRef<Path>) -> Option<String> {
    let stem = path.as_ref().file_stem()?.to_str()?;
    let (_, instance) = stem.split_once('@')?;
    Some(instance.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Section;

    fn specifiers() -> Specifiers {
        Specifiers::new().with('i', "web").with('h', "/home/app")
    }

    #[test]
    fn replaces_known_specifiers() {
        let out = specifiers().replace("%h/logs/%i.log").unwrap();
        assert_eq!(out, "/home/app/logs/web.log");
    }

    #[test]
    fn double_percent_is_literal() {
        assert_eq!(specifiers().replace("100%% of %i").unwrap(), "100% of web");
        assert_eq!(specifiers().replace("%%i").unwrap(), "%i");
    }

    #[test]
    fn unknown_specifier_fails() {
        let err = specifiers().replace("%i-%x").unwrap_err();
        assert!(matches!(err, ConfError::UnknownSpecifier(ref id) if id == "%x"));
        assert_eq!(err.to_string(), "unknown specifier %x");
    }

    #[test]
    fn trailing_percent_is_kept() {
        assert_eq!(specifiers().replace("50%").unwrap(), "50%");
    }

    #[test]
    fn get_reports_unknown() {
        assert_eq!(specifiers().get('i').unwrap(), "web");
        assert!(matches!(specifiers().get('z'), Err(ConfError::UnknownSpecifier(_))));
    }

    #[test]
    fn replace_in_file_leaves_original_untouched() {
        let file = File::new("web@blue.unit").with_section(
            Section::new("LogFile")
                .with("Path", "%h/%i.log")
                .with("Fields", "plain"),
        );
        let out = replace_specifiers(&file, &specifiers()).unwrap();
        assert_eq!(out.sections[0].values("Path"), vec!["/home/app/web.log"]);
        assert_eq!(file.sections[0].values("Path"), vec!["%h/%i.log"]);
    }

    #[test]
    fn replace_in_file_names_the_option() {
        let file = File::new("a.unit").with_section(Section::new("LogFile").with("Path", "%q"));
        let err = replace_specifiers(&file, &specifiers()).unwrap_err();
        assert_eq!(err.to_string(), "LogFile: Path: unknown specifier %q");
    }

    #[test]
    fn template_instance_names() {
        assert_eq!(
            template_instance_name("/etc/units/my-webserver@config-1.service").as_deref(),
            Some("config-1")
        );
        assert_eq!(template_instance_name("a@b@c.unit").as_deref(), Some("b@c"));
        assert_eq!(template_instance_name("a@.unit").as_deref(), Some(""));
        assert_eq!(template_instance_name("plain.unit"), None);
    }
}
