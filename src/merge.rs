use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::document::{ConfOption, DropIn, File, Section, eq_fold};
use crate::error::ConfError;
use crate::spec::{OptionRegistry, SectionRegistry};

/// Merge `dropins` into `file`, in order.
///
/// A drop-in may only target sections that occur exactly once in `file` and
/// that the registry knows. For every option of a drop-in section:
///
/// - non-list options replace all existing values;
/// - list options append, unless the first drop-in value is empty, which
///   clears the existing values first and is itself dropped.
///
/// Later drop-ins see the effect of earlier ones. On error `file` is left
/// untouched.
pub fn apply_dropins(
    file: &mut File,
    dropins: &[DropIn],
    registry: &dyn SectionRegistry,
) -> Result<(), ConfError> {
    let mut merged = file.sections.clone();

    for dropin in dropins {
        debug!(dropin = %dropin.path.display(), "applying drop-in");

        for dropin_section in &dropin.sections {
            let name = dropin_section.name.to_lowercase();

            let mut targets = merged.iter_mut().filter(|s| eq_fold(&s.name, &name));
            let target = match (targets.next(), targets.next()) {
                (Some(target), None) => target,
                (None, _) => return Err(ConfError::DropInSectionNotExists.context(name)),
                (Some(_), Some(_)) => return Err(ConfError::DropInSectionNotAllowed.context(name)),
            };

            let spec = registry
                .options_for_section(&name)
                .ok_or_else(|| ConfError::DropInSectionNotAllowed.context(&name))?;

            merge_section(target, dropin_section, spec).map_err(|e| e.context(&name))?;
        }
    }

    file.sections = merged;
    Ok(())
}

/// Merge the options of one drop-in section into `target`.
///
/// Option names are processed in sorted lowercase order.
pub fn merge_section(
    target: &mut Section,
    dropin: &Section,
    spec: &dyn OptionRegistry,
) -> Result<(), ConfError> {
    let mut groups: BTreeMap<String, Vec<&ConfOption>> = BTreeMap::new();
    for opt in &dropin.options {
        groups.entry(opt.name.to_lowercase()).or_default().push(opt);
    }

    for (name, opts) in groups {
        let option = spec
            .get_option(&name)
            .ok_or_else(|| ConfError::OptionNotExists.context(&name))?;

        let is_list = option.ty.is_list();
        let mut values = opts.as_slice();

        if !is_list || values[0].value.is_empty() {
            trace!(option = %option.name, list = is_list, "replacing existing values");
            target.remove(&name);
            if is_list {
                values = &values[1..];
            }
        }

        trace!(option = %option.name, count = values.len(), "appending drop-in values");
        target.options.extend(values.iter().map(|opt| (*opt).clone()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::dropin_spec;

    fn base() -> File {
        File::new("test.unit").with_section(
            Section::new("Test")
                .with("Single", "TSK")
                .with("Slice1", "TSK"),
        )
    }

    fn values<'a>(file: &'a File, option: &str) -> Vec<&'a str> {
        file.get("Test").unwrap().values(option)
    }

    #[test]
    fn later_dropins_observe_earlier_ones() {
        let mut file = base();
        let d1 = DropIn::new("10-first.conf").with_section(
            Section::new("Test")
                .with("Single", "d1")
                .with("Slice1", "")
                .with("Slice2", "d1")
                .with("Slice2", "d1"),
        );
        let d2 = DropIn::new("20-second.conf").with_section(Section::new("test").with("slice1", "d2"));

        apply_dropins(&mut file, &[d1, d2], &dropin_spec()).unwrap();

        let opts: Vec<(&str, &str)> = file.sections[0]
            .options
            .iter()
            .map(|o| (o.name.as_str(), o.value.as_str()))
            .collect();
        assert_eq!(
            opts,
            vec![
                ("Single", "d1"),
                ("Slice2", "d1"),
                ("Slice2", "d1"),
                ("slice1", "d2"),
            ]
        );
    }

    #[test]
    fn second_dropin_clears_list_extended_by_first() {
        let mut file = base();
        let d1 = DropIn::new("10-first.conf").with_section(
            Section::new("Test")
                .with("Single", "d1")
                .with("Slice2", "d1")
                .with("Slice2", "d1")
                .with("Slice1", "d1"),
        );
        let d2 = DropIn::new("20-second.conf").with_section(
            Section::new("Test")
                .with("Slice1", "")
                .with("Slice1", "d2"),
        );

        apply_dropins(&mut file, &[d1, d2], &dropin_spec()).unwrap();

        let opts: Vec<(&str, &str)> = file.sections[0]
            .options
            .iter()
            .map(|o| (o.name.as_str(), o.value.as_str()))
            .collect();
        assert_eq!(
            opts,
            vec![
                ("Single", "d1"),
                ("Slice2", "d1"),
                ("Slice2", "d1"),
                ("Slice1", "d2"),
            ]
        );
    }

    #[test]
    fn list_values_append_without_sentinel() {
        let mut file = base();
        let d = DropIn::new("a.conf").with_section(Section::new("Test").with("Slice1", "more"));
        apply_dropins(&mut file, &[d], &dropin_spec()).unwrap();
        assert_eq!(values(&file, "Slice1"), vec!["TSK", "more"]);
    }

    #[test]
    fn empty_sentinel_then_values_replaces_list() {
        let mut file = base();
        let d = DropIn::new("a.conf").with_section(
            Section::new("Test")
                .with("Slice1", "")
                .with("Slice1", "x")
                .with("Slice1", "y"),
        );
        apply_dropins(&mut file, &[d], &dropin_spec()).unwrap();
        assert_eq!(values(&file, "Slice1"), vec!["x", "y"]);
    }

    #[test]
    fn scalar_is_replaced() {
        let mut file = base();
        let d = DropIn::new("a.conf").with_section(Section::new("TEST").with("SINGLE", "new"));
        apply_dropins(&mut file, &[d], &dropin_spec()).unwrap();
        assert_eq!(values(&file, "Single"), vec!["new"]);
    }

    #[test]
    fn duplicated_target_section_is_not_allowed() {
        let mut file = base().with_section(Section::new("Test").with("Single", "again"));
        let d = DropIn::new("a.conf").with_section(Section::new("Test").with("Single", "x"));
        let err = apply_dropins(&mut file, &[d], &dropin_spec()).unwrap_err();
        assert!(matches!(err.root(), ConfError::DropInSectionNotAllowed));
    }

    #[test]
    fn absent_target_section_fails() {
        let mut file = base();
        let d = DropIn::new("a.conf").with_section(Section::new("Other").with("Value", "x"));
        let err = apply_dropins(&mut file, &[d], &dropin_spec()).unwrap_err();
        assert!(matches!(err.root(), ConfError::DropInSectionNotExists));
    }

    #[test]
    fn section_without_registry_entry_is_not_allowed() {
        let mut file = base().with_section(Section::new("Unregistered"));
        let d = DropIn::new("a.conf").with_section(Section::new("Unregistered").with("X", "y"));
        let err = apply_dropins(&mut file, &[d], &dropin_spec()).unwrap_err();
        assert!(matches!(err.root(), ConfError::DropInSectionNotAllowed));
    }

    #[test]
    fn unknown_option_fails_and_leaves_file_untouched() {
        let mut file = base();
        let before = file.clone();
        let d = DropIn::new("a.conf").with_section(
            Section::new("Test")
                .with("Single", "changed")
                .with("Unknown", "x"),
        );
        let err = apply_dropins(&mut file, &[d], &dropin_spec()).unwrap_err();
        assert!(matches!(err.root(), ConfError::OptionNotExists));
        assert_eq!(err.to_string(), "test: unknown: option does not exist");
        assert_eq!(file, before);
    }

    #[test]
    fn no_dropins_is_noop() {
        let mut file = base();
        apply_dropins(&mut file, &[], &dropin_spec()).unwrap();
        assert_eq!(file, base());
    }
}
