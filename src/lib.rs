//! Typed configuration from systemd-style unit files, with drop-in overrides.
//!
//! Unitconf validates `[Section]` / `Key= Value` documents against a
//! registry of legal options, layers drop-in files on top, and maps the
//! result into your own structs through serde.
//!
//! ```ignore
//! let path = Path::new("/etc/logd/spec.toml");
//! let spec = FileSpec::from_toml_str(&std::fs::read_to_string(path)?, path)?;
//! let config: AppConfig = Unitconf::builder(&spec)
//!     .app_name("logd")
//!     .load("/etc/logd/web.unit")?;
//! ```
//!
//! That single call reads and validates `web.unit`, fills in its defaults,
//! merges every drop-in found in `/etc/logd/web.unit.d/` (and the shared
//! `unit.d/` directories), applies `LOGD_*` environment variables as a last
//! override layer, and hands you a typed struct.
//!
//! # The registry is the source of truth
//!
//! Every section a document may contain has a [`SectionSpec`]: the list of
//! [`OptionSpec`]s with name, [`OptionType`], required flag and default. A
//! [`FileSpec`] maps section names to those specs, and can be written in
//! code, TOML or JSON:
//!
//! ```toml
//! [[LogFile]]
//! name = "Path"
//! type = "string"
//! required = true
//!
//! [[LogFile]]
//! name = "Fields"
//! type = "[]string"
//! ```
//!
//! Anything implementing [`SectionRegistry`] can stand in for a `FileSpec`.
//! Section and option names are compared case-insensitively everywhere.
//!
//! # Option types
//!
//! | Type | Accepts |
//! |------|---------|
//! | `string` | anything, including the empty string |
//! | `bool` | `1 yes y true t on` / `0 no n false f off` |
//! | `int` | decimal, `0x` hex, `0o` or leading-zero octal, `0b` binary |
//! | `float` | decimal and exponential notation |
//! | `duration` | `10h6s`, `1.5m`, `300ms`, bare `0` |
//!
//! Each has a list variant (`[]string`, `[]int`, ...). A list option is
//! written by repeating its name; a scalar option may appear at most once.
//!
//! # Drop-ins
//!
//! A drop-in is a partial document that overrides sections of the unit. It
//! may only target sections that occur exactly once in the unit. For each
//! option it names:
//!
//! - a scalar option replaces the existing value;
//! - a list option appends to the existing values, unless its first value is
//!   empty (`Fields=`), which clears the list first.
//!
//! Drop-ins are discovered in `<unit>.d/` directories and their `-`
//! truncated siblings, see [`dropin_search_paths`]. Several roots can be
//! searched via [`SearchPath`]; a drop-in in a later root replaces a
//! same-named one from an earlier root.
//!
//! # Mapping to structs
//!
//! [`decode`] maps a validated document onto any `Deserialize` type. Each
//! struct field names a section; `Vec<T>` fields collect repeated sections,
//! `Option<T>` fields may be absent. Inside a section, fields name options.
//! [`to_file`] runs the other way.
//!
//! ```ignore
//! #[derive(Serialize, Deserialize)]
//! #[serde(rename_all = "PascalCase")]
//! struct LogFile {
//!     path: String,
//!     #[serde(default)]
//!     fields: Vec<String>,
//!     #[serde(default, with = "unitconf::duration::option")]
//!     max_age: Option<Duration>,
//! }
//! ```
//!
//! Sections that need custom handling implement [`UnmarshalSection`] and
//! route their `Deserialize` impl through [`unmarshal_section`].
//!
//! # Environment variables
//!
//! With env prefix `LOGD`, variables map onto sections:
//!
//! | Env var | Section | Option |
//! |---------|---------|--------|
//! | `LOGD_GLOBAL_WORKERS` | first `[Global]` | `Workers` |
//! | `LOGD_LOGFILE_1_PATH` | second `[LogFile]` | `Path` |
//!
//! List values are split shell-style. Disable env loading with
//! [`.no_env()`](UnitconfBuilder::no_env).
//!
//! # Specifiers
//!
//! With [`.specifiers()`](UnitconfBuilder::specifiers), `%x` placeholders in
//! option values are replaced before validation. For template units like
//! `web@blue.unit`, `%i` expands to `blue`.
//!
//! # Error handling
//!
//! All fallible operations return [`ConfError`]. Errors carry the section and
//! option they concern as context (`LogFile: Path: option is required`);
//! [`ConfError::root`] strips that context for matching on the error kind.

pub mod error;
pub mod format;
pub mod types;

mod builder;
mod decode;
mod document;
mod encode;
mod env;
mod file;
mod merge;
mod resolve;
mod spec;
mod specifier;
mod validate;
mod value;

#[cfg(test)]
mod fixtures;

pub use builder::{Unitconf, UnitconfBuilder};
pub use decode::{
    Decoder, RawSection, SectionDecoder, UnmarshalSection, decode, decode_section, decode_values,
    unmarshal_section, unmarshal_sections,
};
pub use document::{ConfOption, DropIn, File, Section};
pub use encode::{Encoder, to_file};
pub use env::parse_from_env;
pub use error::ConfError;
pub use file::{
    DROPIN_EXT, DirEntry, DirReader, FsDirReader, dropin_search_paths, expand_search_paths,
    load_dropins, load_file, read_dir, resolve_search_path, search_dropin_files,
};
pub use merge::{apply_dropins, merge_section};
pub use resolve::{ResolveInput, resolve, resolve_file};
pub use spec::{
    Annotations, FileSpec, OptionRegistry, OptionSpec, SECRET_ANNOTATION, SectionRegistry,
    SectionSpec,
};
pub use specifier::{Specifiers, replace_specifiers, template_instance_name};
pub use types::{OptionType, SearchPath};
pub use validate::{apply_defaults, prepare, validate_file, validate_option, validate_options, validate_value};
pub use value::{duration, format_duration, parse_bool, parse_duration, parse_float, parse_int};
