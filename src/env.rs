use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::document::{File, Section};
use crate::error::ConfError;
use crate::spec::SectionRegistry;

/// Build a document from environment variables of the form
/// `{PREFIX}_{SECTION}[_{INDEX}]_{OPTION}`.
///
/// The prefix is matched case-insensitively. `INDEX` selects one of several
/// same-named sections and defaults to 0; the indexes used for a section must
/// be contiguous from 0. Sections the registry does not know are skipped,
/// unknown options fail. Values of list options are split shell-style, so
/// `"first 'second value'"` yields two values.
///
/// Variables are processed in sorted order, so the result does not depend on
/// the order of `vars`. Takes an iterator so tests can pass synthetic data
/// instead of `std::env::vars()`.
pub fn parse_from_env(
    prefix: &str,
    vars: impl IntoIterator<Item = (String, String)>,
    registry: &dyn SectionRegistry,
) -> Result<File, ConfError> {
    let vars: BTreeMap<String, String> = vars.into_iter().collect();
    let mut sections: BTreeMap<String, BTreeMap<usize, (String, Section)>> = BTreeMap::new();

    for (var, value) in &vars {
        let Some(rest) = strip_prefix(var, prefix) else {
            continue;
        };

        let parts: Vec<&str> = rest.split('_').collect();
        if parts.len() < 2 {
            continue;
        }

        let section_name = parts[0].to_lowercase();
        let (index, option_parts) = match parts[1].parse::<usize>() {
            Ok(index) if parts.len() >= 3 => (index, &parts[2..]),
            _ => (0, &parts[1..]),
        };
        let option_name = option_parts.join("_");

        let Some(options) = registry.options_for_section(&section_name) else {
            trace!(var = %var, section = %section_name, "skipping unknown section");
            continue;
        };

        let spec = options
            .get_option(&option_name)
            .ok_or_else(|| ConfError::OptionNotExists.context(&option_name).context(var))?;

        let values = if spec.ty.is_list() {
            shlex::split(value).ok_or_else(|| ConfError::InvalidEnv {
                var: var.clone(),
                reason: "unbalanced quotes in list value".into(),
            })?
        } else {
            vec![value.clone()]
        };

        let (_, section) = sections
            .entry(section_name.clone())
            .or_default()
            .entry(index)
            .or_insert_with(|| (var.clone(), Section::new(&section_name)));
        for v in values {
            section.push(&spec.name, v);
        }
    }

    let mut file = File::new(format!("<env:{prefix}>"));
    for (name, indexed) in sections {
        for (expected, (index, (var, section))) in indexed.into_iter().enumerate() {
            if index != expected {
                return Err(ConfError::InvalidEnv {
                    var,
                    reason: format!("index {index} for section {name} skips index {expected}"),
                });
            }
            file.sections.push(section);
        }
    }

    debug!(prefix, sections = file.sections.len(), "parsed environment");
    Ok(file)
}

/// `var` without `{prefix}_`, matching the prefix case-insensitively.
fn strip_prefix<'a>(var: &'a str, prefix: &str) -> Option<&'a str> {
    let head = var.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    var[prefix.len()..].strip_prefix('_')
}
