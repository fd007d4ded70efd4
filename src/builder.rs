use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::document::File;
use crate::error::ConfError;
use crate::file::{self, FsDirReader};
use crate::resolve::{self, ResolveInput};
use crate::spec::SectionRegistry;
use crate::specifier::{Specifiers, template_instance_name};
use crate::types::SearchPath;

/// Entry point for loading unit files.
pub struct Unitconf;

impl Unitconf {
    pub fn builder(registry: &dyn SectionRegistry) -> UnitconfBuilder<'_> {
        UnitconfBuilder::new(registry)
    }
}

/// Builder for loading a unit file together with its drop-ins.
///
/// Controls where drop-ins are searched ([`dropin_paths()`](Self::dropin_paths)),
/// which environment variables form the last override layer
/// ([`env_prefix()`](Self::env_prefix)), and how values are post-processed
/// ([`specifiers()`](Self::specifiers), [`strict()`](Self::strict)).
pub struct UnitconfBuilder<'r> {
    registry: &'r dyn SectionRegistry,
    app_name: Option<String>,
    unit_dir: bool,
    dropin_paths: Vec<SearchPath>,
    env_prefix: Option<String>,
    env_enabled: bool,
    specifiers: Option<Specifiers>,
    strict: bool,
}

impl<'r> UnitconfBuilder<'r> {
    fn new(registry: &'r dyn SectionRegistry) -> Self {
        Self {
            registry,
            app_name: None,
            unit_dir: true,
            dropin_paths: Vec::new(),
            env_prefix: None,
            env_enabled: true,
            specifiers: None,
            strict: false,
        }
    }

    /// Set the application name. This derives sensible defaults:
    /// - `SearchPath::Platform` → the platform config directory of `name`
    /// - `env_prefix` → `"{NAME}"` (uppercased)
    pub fn app_name(mut self, name: &str) -> Self {
        self.app_name = Some(name.to_string());
        self
    }

    /// Replace the drop-in roots entirely.
    ///
    /// By default drop-ins are searched next to the unit file only. Roots are
    /// listed in **priority-ascending** order: a drop-in in a later root
    /// replaces a same-named drop-in from an earlier one.
    pub fn dropin_paths(mut self, paths: Vec<SearchPath>) -> Self {
        self.unit_dir = false;
        self.dropin_paths = paths;
        self
    }

    /// Append a drop-in root without replacing the defaults.
    pub fn add_dropin_path(mut self, path: SearchPath) -> Self {
        self.dropin_paths.push(path);
        self
    }

    /// Override the environment variable prefix (default: uppercased `app_name`).
    pub fn env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self
    }

    /// Disable environment variable loading entirely.
    pub fn no_env(mut self) -> Self {
        self.env_enabled = false;
        self
    }

    /// Enable specifier replacement with `specifiers`.
    ///
    /// For template units (`name@instance.unit`) `%i` is filled with the
    /// instance name unless it is given here.
    pub fn specifiers(mut self, specifiers: Specifiers) -> Self {
        self.specifiers = Some(specifiers);
        self
    }

    /// Add one specifier, enabling replacement.
    pub fn specifier(mut self, specifier: char, value: impl Into<String>) -> Self {
        self.specifiers
            .get_or_insert_with(Specifiers::new)
            .insert(specifier, value);
        self
    }

    /// Enable or disable strict mode (default: `false`).
    /// In strict mode, record fields without an option spec produce errors.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Resolve the effective env prefix (None if env disabled).
    fn effective_env_prefix(&self) -> Option<String> {
        if !self.env_enabled {
            return None;
        }
        self.env_prefix
            .clone()
            .or_else(|| self.app_name.as_ref().map(|app| app.to_uppercase()))
    }

    /// Resolve the drop-in roots for a unit at `unit_path`.
    fn effective_dropin_roots(&self, unit_path: &Path) -> Vec<PathBuf> {
        let mut roots = Vec::new();
        if self.unit_dir
            && let Some(dir) = unit_path.parent()
        {
            roots.push(dir.to_path_buf());
        }

        let app_name = self.app_name.as_deref();
        let search_paths: Vec<SearchPath> = self
            .dropin_paths
            .iter()
            .filter(|sp| app_name.is_some() || !matches!(sp, SearchPath::Platform))
            .cloned()
            .collect();
        roots.extend(file::expand_search_paths(&search_paths, app_name.unwrap_or_default()));
        roots
    }

    fn effective_specifiers(&self, unit_path: &Path) -> Option<Specifiers> {
        let mut specifiers = self.specifiers.clone()?;
        if !specifiers.contains('i')
            && let Some(instance) = template_instance_name(unit_path)
        {
            specifiers.insert('i', instance);
        }
        Some(specifiers)
    }

    /// Build the `ResolveInput` for the unit at `path`.
    fn build_input(&self, path: &Path) -> Result<ResolveInput, ConfError> {
        let unit_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| ConfError::Message(format!("{} does not name a file", path.display())))?;

        let roots = self.effective_dropin_roots(path);
        let dropin_paths = file::search_dropin_files(&unit_name, &roots, &FsDirReader)?;

        let mut dropins = Vec::with_capacity(dropin_paths.len());
        for dropin in dropin_paths {
            let content = read(&dropin)?;
            dropins.push((dropin, content));
        }

        let env_prefix = self.effective_env_prefix();
        let env_vars = match env_prefix {
            Some(_) => std::env::vars().collect(),
            None => Vec::new(),
        };

        Ok(ResolveInput {
            unit: (path.to_path_buf(), read(path)?),
            dropins,
            env_vars,
            env_prefix,
            specifiers: self.effective_specifiers(path),
            strict: self.strict,
        })
    }

    /// Load the unit at `path`, merge its drop-ins and return the validated
    /// document.
    pub fn load_document(&self, path: impl AsRef<Path>) -> Result<File, ConfError> {
        let input = self.build_input(path.as_ref())?;
        resolve::resolve_file(&input, self.registry)
    }

    /// Load the unit at `path` through all layers and decode it into `T`.
    pub fn load<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> Result<T, ConfError> {
        let input = self.build_input(path.as_ref())?;
        resolve::resolve(input, self.registry)
    }
}

fn read(path: &Path) -> Result<String, ConfError> {
    std::fs::read_to_string(path).map_err(|e| ConfError::IoError {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{AppConfig, log_spec};
    use crate::spec::FileSpec;
    use serde::Deserialize;
    use std::fs;
    use tempfile::TempDir;

    const UNIT: &str = "\
[Global]
Name= web
Workers= 2

[LogFile]
Path= /var/log/%i.log
Fields= Hostname
";

    fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn setup() -> (TempDir, PathBuf, FileSpec) {
        let dir = TempDir::new().unwrap();
        let unit = write(dir.path(), "web.unit", UNIT);
        (dir, unit, log_spec())
    }

    #[test]
    fn loads_unit_without_dropins() {
        let (_dir, unit, spec) = setup();
        let config: AppConfig = Unitconf::builder(&spec).no_env().load(&unit).unwrap();
        assert_eq!(config.global.name, "web");
        assert_eq!(config.log_files[0].path, "/var/log/%i.log");
    }

    #[test]
    fn dropins_next_to_unit_are_applied_by_name() {
        let (dir, unit, spec) = setup();
        write(dir.path(), "web.unit.d/20-late.conf", "[Global]\nWorkers= 8\n");
        write(dir.path(), "unit.d/10-early.conf", "[Global]\nWorkers= 4\nVerbose= yes\n");
        write(dir.path(), "web.unit.d/notes.txt", "[Global]\nWorkers= 99\n");

        let config: AppConfig = Unitconf::builder(&spec).no_env().load(&unit).unwrap();
        assert_eq!(config.global.workers, Some(8));
        assert!(config.global.verbose);
    }

    #[test]
    fn later_root_replaces_same_named_dropin() {
        let (dir, unit, spec) = setup();
        let admin = TempDir::new().unwrap();
        write(dir.path(), "web.unit.d/10-workers.conf", "[Global]\nWorkers= 4\n");
        write(admin.path(), "web.unit.d/10-workers.conf", "[Global]\nWorkers= 6\n");

        let config: AppConfig = Unitconf::builder(&spec)
            .no_env()
            .add_dropin_path(SearchPath::Path(admin.path().to_path_buf()))
            .load(&unit)
            .unwrap();
        assert_eq!(config.global.workers, Some(6));
    }

    #[test]
    fn explicit_dropin_paths_skip_unit_dir() {
        let (dir, unit, spec) = setup();
        let other = TempDir::new().unwrap();
        write(dir.path(), "web.unit.d/10-workers.conf", "[Global]\nWorkers= 4\n");

        let config: AppConfig = Unitconf::builder(&spec)
            .no_env()
            .dropin_paths(vec![SearchPath::Path(other.path().to_path_buf())])
            .load(&unit)
            .unwrap();
        assert_eq!(config.global.workers, Some(2));
    }

    #[test]
    fn template_instance_fills_percent_i() {
        let dir = TempDir::new().unwrap();
        let unit = write(dir.path(), "web@blue.unit", UNIT);
        let spec = log_spec();

        let config: AppConfig = Unitconf::builder(&spec)
            .no_env()
            .specifiers(Specifiers::new())
            .load(&unit)
            .unwrap();
        assert_eq!(config.log_files[0].path, "/var/log/blue.log");

        let config: AppConfig = Unitconf::builder(&spec)
            .no_env()
            .specifier('i', "green")
            .load(&unit)
            .unwrap();
        assert_eq!(config.log_files[0].path, "/var/log/green.log");
    }

    #[test]
    fn unknown_specifier_fails_load() {
        let dir = TempDir::new().unwrap();
        let unit = write(dir.path(), "plain.unit", UNIT);
        let spec = log_spec();
        let err = Unitconf::builder(&spec)
            .no_env()
            .specifiers(Specifiers::new())
            .load::<AppConfig>(&unit)
            .unwrap_err();
        assert!(matches!(err.root(), ConfError::UnknownSpecifier(_)));
    }

    #[test]
    fn missing_unit_is_io_error() {
        let dir = TempDir::new().unwrap();
        let spec = log_spec();
        let err = Unitconf::builder(&spec)
            .no_env()
            .load::<AppConfig>(dir.path().join("absent.unit"))
            .unwrap_err();
        assert!(matches!(err, ConfError::IoError { .. }));
    }

    #[test]
    fn strict_mode_rejects_unknown_fields() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Unit {
            #[serde(rename = "Global")]
            global: Extra,
        }

        #[derive(Debug, Default, Deserialize)]
        #[serde(default, rename_all = "PascalCase")]
        #[allow(dead_code)]
        struct Extra {
            name: String,
            colour: String,
        }

        let dir = TempDir::new().unwrap();
        let unit = write(dir.path(), "web.unit", "[Global]\nName= web\n");
        let spec = log_spec();

        assert!(Unitconf::builder(&spec).no_env().load::<Unit>(&unit).is_ok());
        let err = Unitconf::builder(&spec)
            .no_env()
            .strict(true)
            .load::<Unit>(&unit)
            .unwrap_err();
        assert!(matches!(err.root(), ConfError::UnknownField(_)));
    }

    #[test]
    fn load_document_returns_defaulted_file() {
        let (_dir, unit, spec) = setup();
        let file = Unitconf::builder(&spec).no_env().load_document(&unit).unwrap();
        assert_eq!(file.get("LogFile").unwrap().values("MaxAge"), vec!["24h"]);
    }

    #[test]
    fn env_prefix_derivation() {
        let spec = log_spec();
        let builder = Unitconf::builder(&spec);
        assert_eq!(builder.effective_env_prefix(), None);

        let builder = Unitconf::builder(&spec).app_name("web");
        assert_eq!(builder.effective_env_prefix().as_deref(), Some("WEB"));

        let builder = Unitconf::builder(&spec).app_name("web").env_prefix("SVC");
        assert_eq!(builder.effective_env_prefix().as_deref(), Some("SVC"));

        let builder = Unitconf::builder(&spec).app_name("web").no_env();
        assert_eq!(builder.effective_env_prefix(), None);
    }

    #[test]
    fn platform_root_needs_app_name() {
        let spec = log_spec();
        let unit = Path::new("/etc/units/web.unit");

        let roots = Unitconf::builder(&spec)
            .add_dropin_path(SearchPath::Platform)
            .effective_dropin_roots(unit);
        assert_eq!(roots, vec![PathBuf::from("/etc/units")]);

        let roots = Unitconf::builder(&spec)
            .dropin_paths(vec![SearchPath::Path("/run/units".into())])
            .effective_dropin_roots(unit);
        assert_eq!(roots, vec![PathBuf::from("/run/units")]);
    }
}
