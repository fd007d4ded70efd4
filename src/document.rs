//! In-memory document model: files made of sections made of options.
//!
//! All values are text. Names compare case-insensitively everywhere, and
//! the order of options inside a section is preserved because repeated names
//! encode list values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfError;
use crate::value;

/// A single `Name=Value` pair.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfOption {
    pub name: String,
    pub value: String,
}

impl ConfOption {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A named, ordered group of options.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    #[serde(default)]
    pub options: Vec<ConfOption>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Vec::new(),
        }
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.options.push(ConfOption::new(name, value));
    }

    /// All values of option `name`, in document order.
    pub fn values(&self, name: &str) -> Vec<&str> {
        self.options
            .iter()
            .filter(|opt| eq_fold(&opt.name, name))
            .map(|opt| opt.value.as_str())
            .collect()
    }

    pub fn has(&self, name: &str) -> bool {
        self.options.iter().any(|opt| eq_fold(&opt.name, name))
    }

    /// Remove every value of option `name`.
    pub fn remove(&mut self, name: &str) {
        self.options.retain(|opt| !eq_fold(&opt.name, name));
    }

    /// The single value of option `name`.
    ///
    /// Fails with [`ConfError::OptionNotSet`] when the option is absent and
    /// [`ConfError::OptionAllowedOnce`] when it has several values.
    pub fn get_str(&self, name: &str) -> Result<&str, ConfError> {
        match self.values(name).as_slice() {
            [] => Err(ConfError::OptionNotSet.context(name)),
            [single] => Ok(*single),
            _ => Err(ConfError::OptionAllowedOnce.context(name)),
        }
    }

    pub fn get_bool(&self, name: &str) -> Result<bool, ConfError> {
        value::parse_bool(self.get_str(name)?).map_err(|e| e.context(name))
    }

    pub fn get_int(&self, name: &str) -> Result<i64, ConfError> {
        value::parse_int(self.get_str(name)?).map_err(|e| e.context(name))
    }

    pub fn get_float(&self, name: &str) -> Result<f64, ConfError> {
        value::parse_float(self.get_str(name)?).map_err(|e| e.context(name))
    }

    pub fn get_duration(&self, name: &str) -> Result<Duration, ConfError> {
        value::parse_duration(self.get_str(name)?).map_err(|e| e.context(name))
    }
}

/// A parsed unit file (or drop-in, or any other document).
///
/// Cloning is a deep copy: nothing is shared between a file and its clone.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct File {
    #[serde(default)]
    pub path: PathBuf,
    #[serde(default)]
    pub sections: Vec<Section>,
}

/// Drop-in files share the document model of the file they override.
pub type DropIn = File;

impl File {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            sections: Vec::new(),
        }
    }

    /// Builder-style append of a section.
    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// The first section called `name`.
    pub fn get(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| eq_fold(&s.name, name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| eq_fold(&s.name, name))
    }

    /// Every section called `name`, in document order.
    pub fn get_all(&self, name: &str) -> Vec<&Section> {
        self.sections
            .iter()
            .filter(|s| eq_fold(&s.name, name))
            .collect()
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// Case-insensitive name comparison.
pub(crate) fn eq_fold(a: &str, b: &str) -> bool {
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(b);
    }
    a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_file() -> Section {
        Section::new("LogFile")
            .with("Path", "/var/log/app")
            .with("Fields", "Hostname")
            .with("fields", "Error")
            .with("Rotate", "yes")
            .with("MaxAge", "10h")
    }

    #[test]
    fn values_are_case_insensitive_and_ordered() {
        let sec = log_file();
        assert_eq!(sec.values("FIELDS"), vec!["Hostname", "Error"]);
        assert!(sec.values("missing").is_empty());
    }

    #[test]
    fn get_str_requires_exactly_one_value() {
        let sec = log_file();
        assert_eq!(sec.get_str("path").unwrap(), "/var/log/app");
        assert!(matches!(
            sec.get_str("Missing").unwrap_err().root(),
            ConfError::OptionNotSet
        ));
        assert!(matches!(
            sec.get_str("Fields").unwrap_err().root(),
            ConfError::OptionAllowedOnce
        ));
    }

    #[test]
    fn typed_getters() {
        let sec = log_file().with("Count", "0x10").with("Ratio", "0.25");
        assert!(sec.get_bool("Rotate").unwrap());
        assert_eq!(sec.get_int("count").unwrap(), 16);
        assert_eq!(sec.get_float("Ratio").unwrap(), 0.25);
        assert_eq!(
            sec.get_duration("MaxAge").unwrap(),
            Duration::from_secs(36_000)
        );
        assert!(matches!(
            sec.get_bool("Path").unwrap_err().root(),
            ConfError::InvalidBoolean { .. }
        ));
    }

    #[test]
    fn remove_drops_every_value() {
        let mut sec = log_file();
        sec.remove("FIELDS");
        assert!(!sec.has("Fields"));
        assert_eq!(sec.options.len(), 3);
    }

    #[test]
    fn file_section_lookup() {
        let file = File::new("/etc/app/app.unit")
            .with_section(Section::new("Global"))
            .with_section(log_file())
            .with_section(Section::new("logfile").with("Path", "/tmp/other"));

        assert!(file.has("GLOBAL"));
        assert!(!file.has("Copy"));
        assert_eq!(file.get_all("LOGFILE").len(), 2);
        assert_eq!(
            file.get("logFile").unwrap().get_str("Path").unwrap(),
            "/var/log/app"
        );
    }

    #[test]
    fn clone_is_independent() {
        let original = File::new("a.unit").with_section(log_file());
        let mut copy = original.clone();
        copy.sections[0].options[0].value = "changed".into();
        copy.sections[0].push("Extra", "1");
        copy.sections.push(Section::new("New"));

        assert_eq!(original.sections.len(), 1);
        assert_eq!(original.sections[0].get_str("Path").unwrap(), "/var/log/app");
        assert!(!original.sections[0].has("Extra"));
    }

    #[test]
    fn eq_fold_handles_unicode() {
        assert!(eq_fold("Größe", "GRÖßE"));
        assert!(eq_fold("Path", "pATH"));
        assert!(!eq_fold("Path", "Paths"));
    }
}
