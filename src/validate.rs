//! Validation and defaulting of documents against a specification registry.
//!
//! Validation never mutates its input on failure: [`validate_file`] works on a
//! copy and only writes the defaulted sections back once every section passed.

use std::collections::BTreeMap;

use tracing::debug;

use crate::document::{ConfOption, File, Section, eq_fold};
use crate::error::ConfError;
use crate::spec::{OptionRegistry, OptionSpec, SectionRegistry};
use crate::types::OptionType;

/// Check that a single raw value is well-formed for `ty`.
pub fn validate_value(value: &str, ty: OptionType) -> Result<(), ConfError> {
    ty.validate(value)
}

/// Check every value of one option against its spec.
pub fn validate_option(values: &[&str], spec: &OptionSpec) -> Result<(), ConfError> {
    if values.len() > 1 && !spec.ty.is_list() {
        return Err(ConfError::OptionAllowedOnce);
    }

    if spec.required && values.is_empty() {
        return Err(ConfError::OptionRequired);
    }

    for value in values {
        // every occurrence of a required option needs a value
        if spec.required && value.is_empty() {
            return Err(ConfError::OptionRequired);
        }
        validate_value(value, spec.ty)?;
    }

    Ok(())
}

/// Check a list of options against the option registry of their section.
///
/// Options are grouped by lowercase name and checked in sorted order, so the
/// first error reported is stable.
pub fn validate_options(options: &[ConfOption], spec: &dyn OptionRegistry) -> Result<(), ConfError> {
    // lowercase name -> (name as first written, values)
    let mut groups: BTreeMap<String, (&str, Vec<&str>)> = BTreeMap::new();
    for opt in options {
        groups
            .entry(opt.name.to_lowercase())
            .or_insert_with(|| (opt.name.as_str(), Vec::new()))
            .1
            .push(opt.value.as_str());
    }

    for (name, values) in groups.values() {
        let option = spec
            .get_option(name)
            .ok_or_else(|| ConfError::OptionNotExists.context(name))?;

        validate_option(values, option).map_err(|e| e.context(&option.name))?;
    }

    if let Some(missing) = spec
        .all()
        .iter()
        .find(|option| option.required && !groups.contains_key(&option.name.to_lowercase()))
    {
        return Err(ConfError::OptionRequired.context(&missing.name));
    }

    Ok(())
}

/// Append the default value of every unset, non-required option.
///
/// Defaults are not type-checked here; validation covers them.
pub fn apply_defaults(options: &[ConfOption], spec: &dyn OptionRegistry) -> Vec<ConfOption> {
    let mut out = options.to_vec();
    for option in spec.all() {
        if option.required || option.default.is_empty() {
            continue;
        }
        if !out.iter().any(|o| eq_fold(&o.name, &option.name)) {
            out.push(ConfOption::new(&option.name, &option.default));
        }
    }
    out
}

/// Validate one section and return a copy with defaults applied.
pub fn prepare(section: &Section, spec: &dyn OptionRegistry) -> Result<Section, ConfError> {
    validate_options(&section.options, spec)?;
    Ok(Section {
        name: section.name.clone(),
        options: apply_defaults(&section.options, spec),
    })
}

/// Validate every section of `file` and apply defaults.
///
/// With `None` as registry this is a no-op. On error `file` is left untouched.
pub fn validate_file(file: &mut File, registry: Option<&dyn SectionRegistry>) -> Result<(), ConfError> {
    let Some(registry) = registry else {
        return Ok(());
    };

    let mut prepared = Vec::with_capacity(file.sections.len());
    for section in &file.sections {
        let spec = registry
            .options_for_section(&section.name)
            .ok_or_else(|| ConfError::UnknownSection.context(&section.name))?;

        prepared.push(prepare(section, spec).map_err(|e| e.context(&section.name))?);
    }

    debug!(
        path = %file.path.display(),
        sections = prepared.len(),
        "validated document"
    );
    file.sections = prepared;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::log_spec;
    use crate::spec::{FileSpec, SectionSpec};

    fn spec() -> SectionSpec {
        SectionSpec::new()
            .with(OptionSpec::new("Name", OptionType::String).required())
            .with(OptionSpec::new("Tags", OptionType::StringList))
            .with(OptionSpec::new("Enabled", OptionType::Bool).default_value("yes"))
            .with(OptionSpec::new("Count", OptionType::Int))
    }

    fn opts(pairs: &[(&str, &str)]) -> Vec<ConfOption> {
        pairs.iter().map(|(n, v)| ConfOption::new(*n, *v)).collect()
    }

    #[test]
    fn validate_option_cases() {
        let required = OptionSpec::new("A", OptionType::String).required();
        let list = OptionSpec::new("B", OptionType::IntList);
        let scalar = OptionSpec::new("C", OptionType::Int);

        assert!(matches!(validate_option(&[], &required), Err(ConfError::OptionRequired)));
        assert!(matches!(validate_option(&[""], &required), Err(ConfError::OptionRequired)));
        assert!(validate_option(&["x"], &required).is_ok());
        assert!(validate_option(&["1", "0x2", "-3"], &list).is_ok());
        assert!(matches!(
            validate_option(&["1", "x"], &list),
            Err(ConfError::InvalidNumber { .. })
        ));
        assert!(matches!(
            validate_option(&["1", "2"], &scalar),
            Err(ConfError::OptionAllowedOnce)
        ));
        assert!(validate_option(&[], &scalar).is_ok());
    }

    #[test]
    fn valid_options_pass() {
        let options = opts(&[("name", "web"), ("Tags", "a"), ("TAGS", "b"), ("Count", "3")]);
        assert!(validate_options(&options, &spec()).is_ok());
    }

    #[test]
    fn unknown_option_fails() {
        let options = opts(&[("Name", "web"), ("Colour", "red")]);
        let err = validate_options(&options, &spec()).unwrap_err();
        assert!(matches!(err.root(), ConfError::OptionNotExists));
        assert_eq!(err.to_string(), "Colour: option does not exist");
    }

    #[test]
    fn missing_required_option_fails() {
        let options = opts(&[("Count", "3")]);
        let err = validate_options(&options, &spec()).unwrap_err();
        assert!(matches!(err.root(), ConfError::OptionRequired));
        assert!(err.to_string().starts_with("Name:"));
    }

    #[test]
    fn scalar_given_twice_fails() {
        let options = opts(&[("Name", "a"), ("name", "b")]);
        let err = validate_options(&options, &spec()).unwrap_err();
        assert!(matches!(err.root(), ConfError::OptionAllowedOnce));
    }

    #[test]
    fn errors_are_reported_in_name_order() {
        let options = opts(&[("Name", "a"), ("Enabled", "maybe"), ("Count", "x")]);
        let err = validate_options(&options, &spec()).unwrap_err();
        assert!(matches!(err.root(), ConfError::InvalidNumber { .. }));
    }

    #[test]
    fn defaults_fill_unset_options_only() {
        let out = apply_defaults(&opts(&[("Name", "a")]), &spec());
        assert_eq!(out, opts(&[("Name", "a"), ("Enabled", "yes")]));

        let out = apply_defaults(&opts(&[("enabled", "no")]), &spec());
        assert_eq!(out, opts(&[("enabled", "no")]));
    }

    #[test]
    fn defaults_skip_required_options() {
        let spec = SectionSpec::new().with(
            OptionSpec::new("Name", OptionType::String)
                .required()
                .default_value("ignored"),
        );
        assert!(apply_defaults(&[], &spec).is_empty());
    }

    #[test]
    fn prepare_returns_defaulted_copy() {
        let section = Section::new("Service").with("Name", "web");
        let prepared = prepare(&section, &spec()).unwrap();
        assert_eq!(prepared.values("Enabled"), vec!["yes"]);
        assert!(!section.has("Enabled"));
    }

    #[test]
    fn validate_file_applies_defaults() {
        let mut file = File::new("app.unit").with_section(Section::new("LogFile").with("Path", "/var/log/app"));
        let spec = log_spec();
        validate_file(&mut file, Some(&spec)).unwrap();
        assert_eq!(file.get("LogFile").unwrap().get_str("MaxAge").unwrap(), "24h");
    }

    #[test]
    fn validate_file_rejects_unknown_section() {
        let mut file = File::new("app.unit").with_section(Section::new("Copy").with("Source", "a"));
        let spec = log_spec();
        let err = validate_file(&mut file, Some(&spec)).unwrap_err();
        assert!(matches!(err.root(), ConfError::UnknownSection));
        assert_eq!(err.to_string(), "Copy: unknown section");
    }

    #[test]
    fn validate_file_leaves_input_untouched_on_error() {
        let mut file = File::new("app.unit")
            .with_section(Section::new("LogFile").with("Path", "/var/log/app"))
            .with_section(Section::new("Global").with("Verbose", "sometimes"));
        let before = file.clone();
        let spec = log_spec();
        let err = validate_file(&mut file, Some(&spec)).unwrap_err();
        assert!(matches!(err.root(), ConfError::InvalidBoolean { .. }));
        assert_eq!(file, before);
    }

    #[test]
    fn validate_file_without_registry_is_noop() {
        let mut file = File::new("app.unit").with_section(Section::new("Anything").with("X", "y"));
        let before = file.clone();
        validate_file(&mut file, None).unwrap();
        assert_eq!(file, before);
    }

    #[test]
    fn validate_file_is_idempotent() {
        let spec = FileSpec::new().with_section("Service", spec());
        let mut file = File::new("a.unit").with_section(Section::new("Service").with("Name", "web"));
        validate_file(&mut file, Some(&spec)).unwrap();
        let once = file.clone();
        validate_file(&mut file, Some(&spec)).unwrap();
        assert_eq!(file, once);
    }
}
