//! Core resolution pipeline: layer drop-ins over a unit file and produce a
//! typed record.
//!
//! Operates on pre-loaded data (`ResolveInput`) with no I/O, making the full
//! pipeline testable with synthetic inputs. Steps:
//!
//! 1. Parse the unit file and every drop-in
//! 2. Parse environment variables into one more drop-in, applied last
//! 3. Replace specifiers (if any are given) in the unit and the drop-ins
//! 4. Validate the unit and apply its defaults
//! 5. Merge the drop-ins into the unit and type-check the result
//! 6. Decode into `T`
//!
//! Defaults are injected before merging, so a drop-in appending to a list
//! option extends its default. Required options must be set by the unit
//! itself.

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::decode::Decoder;
use crate::document::{DropIn, File};
use crate::env;
use crate::error::ConfError;
use crate::format;
use crate::merge::apply_dropins;
use crate::spec::SectionRegistry;
use crate::specifier::{Specifiers, replace_specifiers};
use crate::validate::validate_file;

/// All pre-loaded data needed to resolve a unit. No I/O happens here.
pub struct ResolveInput {
    /// Path and content of the unit file.
    pub unit: (PathBuf, String),
    /// Drop-in contents in application order: first = lowest priority.
    pub dropins: Vec<(PathBuf, String)>,
    /// Raw environment variable pairs (pass `std::env::vars().collect()` or synthetic data).
    pub env_vars: Vec<(String, String)>,
    /// Env var prefix (e.g. `"MYAPP"`). `None` means env disabled.
    pub env_prefix: Option<String>,
    /// `None` leaves `%` in option values alone.
    pub specifiers: Option<Specifiers>,
    /// Whether record fields without an option spec are an error.
    pub strict: bool,
}

/// Produce the merged, validated document.
pub fn resolve_file(input: &ResolveInput, registry: &dyn SectionRegistry) -> Result<File, ConfError> {
    let (path, content) = &input.unit;
    let mut file = format::deserialize(path, content)?;

    let mut dropins = Vec::with_capacity(input.dropins.len() + 1);
    for (path, content) in &input.dropins {
        match format::deserialize(path, content) {
            Ok(dropin) => dropins.push(dropin),
            Err(ConfError::NoSections) => dropins.push(DropIn::new(path)),
            Err(e) => return Err(e.context(path.display())),
        }
    }

    if let Some(prefix) = &input.env_prefix {
        let env_dropin = env::parse_from_env(prefix, input.env_vars.iter().cloned(), registry)?;
        if !env_dropin.sections.is_empty() {
            dropins.push(env_dropin);
        }
    }

    if let Some(specifiers) = &input.specifiers {
        file = replace_specifiers(&file, specifiers)?;
        dropins = dropins
            .iter()
            .map(|dropin| replace_specifiers(dropin, specifiers).map_err(|e| e.context(dropin.path.display())))
            .collect::<Result<_, _>>()?;
    }

    validate_file(&mut file, Some(registry))?;
    apply_dropins(&mut file, &dropins, registry)?;
    validate_file(&mut file, Some(registry))?;
    debug!(unit = %file.path.display(), dropins = dropins.len(), "resolved unit");
    Ok(file)
}

/// Resolve a unit from pre-loaded inputs and decode it into `T`.
pub fn resolve<T: DeserializeOwned>(input: ResolveInput, registry: &dyn SectionRegistry) -> Result<T, ConfError> {
    let file = resolve_file(&input, registry)?;
    Decoder::new(registry).strict(input.strict).decode(&file)
}
