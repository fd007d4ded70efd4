//! Decoding documents into typed records.
//!
//! The record layout comes from `serde::Deserialize`, the value types come
//! from the specification registry. A record type describes the whole file:
//! each field names a section (matched case-insensitively), and each field of
//! a section type names an option:
//!
//! ```ignore
//! #[derive(Deserialize)]
//! #[serde(rename_all = "PascalCase")]
//! struct Unit {
//!     global: Global,                 // exactly one [Global]
//!     copy: Option<Copy>,             // zero or one [Copy]
//!     #[serde(rename = "LogFile", default)]
//!     log_files: Vec<LogFile>,        // any number of [LogFile]
//! }
//! ```
//!
//! Fields of a section record are looked up by option name or alias. Scalars
//! need exactly one value, `Vec`s take every value. Each value is converted
//! through the option's registered type, so a `bool` field for an `int`
//! option is a [`ConfError::TypeMismatch`] even if the text would parse.
//!
//! Records that need to look at the raw section implement
//! [`UnmarshalSection`] and route their `Deserialize` impl through
//! [`unmarshal_section`].

use std::cell::RefCell;
use std::vec;

use serde::de::value::{SeqDeserializer, StrDeserializer};
use serde::de::{self, DeserializeOwned, DeserializeSeed, IntoDeserializer, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, forward_to_deserialize_any};
use tracing::trace;

use crate::document::{File, Section, eq_fold};
use crate::error::ConfError;
use crate::spec::{OptionRegistry, SectionRegistry, SectionSpec};
use crate::types::OptionType;
use crate::value;

/// Newtype name answered by section deserializers with a [`RawSection`].
const RAW_SECTION: &str = "$unitconf::RawSection";

const STRING_TYPES: &[OptionType] = &[OptionType::String, OptionType::Duration];

/// Custom decoding of one section.
///
/// ```ignore
/// impl UnmarshalSection for Mount {
///     fn unmarshal_section(section: &Section, spec: &dyn OptionRegistry) -> Result<Self, ConfError> {
///         // a plain derived record; decoding into `Mount` itself would recurse
///         let fields: MountFields = unitconf::decode_section(section, spec)?;
///         Ok(Mount {
///             what: fields.what,
///             options: section.values("Options").join(","),
///         })
///     }
/// }
///
/// impl<'de> Deserialize<'de> for Mount {
///     fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
///         unitconf::unmarshal_section(d)
///     }
/// }
/// ```
pub trait UnmarshalSection: Sized {
    fn unmarshal_section(section: &Section, spec: &dyn OptionRegistry) -> Result<Self, ConfError>;
}

/// A section together with the specs of its options.
///
/// Section deserializers of this crate hand this out for [`UnmarshalSection`]
/// implementations. Other formats can produce it from the structural
/// `{ "section": ..., "spec": ... }` form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawSection {
    pub section: Section,
    pub spec: SectionSpec,
}

#[derive(Deserialize)]
struct RawPayload {
    section: Section,
    spec: SectionSpec,
}

impl From<RawPayload> for RawSection {
    fn from(payload: RawPayload) -> Self {
        RawSection {
            section: payload.section,
            spec: payload.spec,
        }
    }
}

impl<'de> Deserialize<'de> for RawSection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RawVisitor;

        impl<'de> Visitor<'de> for RawVisitor {
            type Value = RawSection;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a unit file section")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<RawSection, E> {
                serde_json::from_str::<RawPayload>(v)
                    .map(Into::into)
                    .map_err(E::custom)
            }

            fn visit_newtype_struct<D: Deserializer<'de>>(self, d: D) -> Result<RawSection, D::Error> {
                RawPayload::deserialize(d).map(Into::into)
            }
        }

        deserializer.deserialize_newtype_struct(RAW_SECTION, RawVisitor)
    }
}

thread_local! {
    /// The typed error of the last failing [`UnmarshalSection`] hook.
    static HOOK_ERROR: RefCell<Option<ConfError>> = const { RefCell::new(None) };
}

/// Hand a hook error to serde as text and keep the typed error aside, so
/// [`Decoder`] can put it back.
fn hook_error<E: de::Error>(err: ConfError) -> E {
    let out = E::custom(&err);
    HOOK_ERROR.with(|slot| *slot.borrow_mut() = Some(err));
    out
}

fn clear_hook_error() {
    HOOK_ERROR.with(|slot| slot.borrow_mut().take());
}

/// Swap the text of a stashed hook error for the error itself, keeping the
/// context collected on the way out.
fn restore_hook_error(err: ConfError) -> ConfError {
    match HOOK_ERROR.with(|slot| slot.borrow_mut().take()) {
        Some(hook) => replace_root(err, hook),
        None => err,
    }
}

fn replace_root(err: ConfError, hook: ConfError) -> ConfError {
    match err {
        ConfError::Context { context, source } => ConfError::Context {
            context,
            source: Box::new(replace_root(*source, hook)),
        },
        ConfError::Message(msg) if msg == hook.to_string() => hook,
        other => other,
    }
}

/// `deserialize_with` helper for fields whose type implements [`UnmarshalSection`].
pub fn unmarshal_section<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: UnmarshalSection,
{
    let raw = RawSection::deserialize(deserializer)?;
    T::unmarshal_section(&raw.section, &raw.spec).map_err(hook_error)
}

/// Like [`unmarshal_section`], for `Vec<T>` fields.
pub fn unmarshal_sections<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: UnmarshalSection,
{
    Vec::<RawSection>::deserialize(deserializer)?
        .iter()
        .map(|raw| T::unmarshal_section(&raw.section, &raw.spec).map_err(hook_error))
        .collect()
}

/// Decodes documents into records.
pub struct Decoder<'r> {
    registry: &'r dyn SectionRegistry,
    strict: bool,
}

impl<'r> Decoder<'r> {
    pub fn new(registry: &'r dyn SectionRegistry) -> Self {
        Self {
            registry,
            strict: false,
        }
    }

    /// Reject record fields without an option spec instead of skipping them.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn decode<T: DeserializeOwned>(&self, file: &File) -> Result<T, ConfError> {
        let deserializer = FileDeserializer {
            file,
            registry: self.registry,
            strict: self.strict,
        };
        clear_hook_error();
        T::deserialize(deserializer).map_err(|e| match restore_hook_error(e) {
            ConfError::MissingField(name) => ConfError::MissingSection(name.to_string()),
            e => e,
        })
    }

    pub fn decode_section<T: DeserializeOwned>(
        &self,
        section: &Section,
        spec: &dyn OptionRegistry,
    ) -> Result<T, ConfError> {
        clear_hook_error();
        T::deserialize(SectionDeserializer {
            section,
            spec,
            strict: self.strict,
        })
        .map_err(restore_hook_error)
    }

    /// Decode `sections` as if they were all the sections matching one field.
    pub fn decode_sections<T: DeserializeOwned>(
        &self,
        sections: &[Section],
        spec: &dyn OptionRegistry,
    ) -> Result<T, ConfError> {
        clear_hook_error();
        T::deserialize(SectionsDeserializer {
            sections: sections.iter().collect(),
            spec,
            strict: self.strict,
        })
        .map_err(restore_hook_error)
    }
}

/// Decode `file` into `T` with a lenient [`Decoder`].
pub fn decode<T: DeserializeOwned>(file: &File, registry: &dyn SectionRegistry) -> Result<T, ConfError> {
    Decoder::new(registry).decode(file)
}

/// Decode one section into `T`, ignoring fields without an option spec.
///
/// This is the field-driven decoder [`UnmarshalSection`] implementations can
/// fall back to.
pub fn decode_section<T: DeserializeOwned>(
    section: &Section,
    spec: &dyn OptionRegistry,
) -> Result<T, ConfError> {
    clear_hook_error();
    T::deserialize(SectionDeserializer {
        section,
        spec,
        strict: false,
    })
    .map_err(restore_hook_error)
}

/// Decode the raw values of a single option.
///
/// ```ignore
/// let ports: Vec<u16> = decode_values(&["80", "0x1bb"], OptionType::IntList)?;
/// let any: serde_json::Value = decode_values(&["yes"], OptionType::Bool)?;
/// ```
pub fn decode_values<T: DeserializeOwned, S: AsRef<str>>(
    values: &[S],
    ty: OptionType,
) -> Result<T, ConfError> {
    T::deserialize(ValuesDeserializer {
        values: values.iter().map(AsRef::as_ref).collect(),
        ty,
    })
}

/// Dynamic, typed access to the options of a section.
#[derive(Debug, Clone, Default)]
pub struct SectionDecoder {
    spec: SectionSpec,
}

impl SectionDecoder {
    pub fn new(spec: impl Into<SectionSpec>) -> Self {
        Self { spec: spec.into() }
    }

    /// The typed value of option `name`, or `None` if it has no spec, is not
    /// set or does not parse.
    pub fn get(&self, section: &Section, name: &str) -> Option<serde_json::Value> {
        let option = self.spec.get_option(name)?;
        typed_value(section, &option.name, option.ty)
    }

    /// Every set option keyed by its spec name.
    pub fn as_map(&self, section: &Section) -> serde_json::Map<String, serde_json::Value> {
        self.spec
            .iter()
            .filter_map(|option| {
                typed_value(section, &option.name, option.ty).map(|v| (option.name.clone(), v))
            })
            .collect()
    }
}

fn typed_value(section: &Section, name: &str, ty: OptionType) -> Option<serde_json::Value> {
    let values = section.values(name);
    if values.is_empty() {
        return None;
    }
    decode_values(&values, ty).ok()
}

fn missing_option(err: ConfError) -> ConfError {
    match err {
        ConfError::MissingField(field) => ConfError::OptionRequired.context(field),
        e => e,
    }
}

/// Key/value pairs handed to a visitor, errors tagged with the key.
struct Entries<'a, D> {
    iter: vec::IntoIter<(&'a str, D)>,
    value: Option<(&'a str, D)>,
}

impl<'a, D> Entries<'a, D> {
    fn new(entries: Vec<(&'a str, D)>) -> Self {
        Self {
            iter: entries.into_iter(),
            value: None,
        }
    }
}

impl<'de, 'a, D> MapAccess<'de> for Entries<'a, D>
where
    D: de::Deserializer<'de, Error = ConfError>,
{
    type Error = ConfError;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>, ConfError> {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some((key, value));
                seed.deserialize(StrDeserializer::<ConfError>::new(key)).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, ConfError> {
        let (key, value) = self
            .value
            .take()
            .ok_or_else(|| ConfError::Message("value requested before key".into()))?;
        seed.deserialize(value).map_err(|e| e.context(key))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct FileDeserializer<'a> {
    file: &'a File,
    registry: &'a dyn SectionRegistry,
    strict: bool,
}

impl<'a> FileDeserializer<'a> {
    fn sections(&self, name: &str, spec: &'a dyn OptionRegistry) -> SectionsDeserializer<'a> {
        SectionsDeserializer {
            sections: self.file.get_all(name),
            spec,
            strict: self.strict,
        }
    }
}

impl<'de, 'a> de::Deserializer<'de> for FileDeserializer<'a> {
    type Error = ConfError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfError> {
        self.deserialize_map(visitor)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ConfError> {
        let mut entries = Vec::with_capacity(fields.len());
        for &field in fields {
            let spec = self
                .registry
                .options_for_section(field)
                .ok_or_else(|| ConfError::UnknownSection.context(field))?;

            if !self.file.has(field) {
                trace!(section = field, "no matching section");
                continue;
            }
            entries.push((field, self.sections(field, spec)));
        }
        visitor.visit_map(Entries::new(entries))
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfError> {
        let mut names: Vec<&str> = Vec::new();
        for section in &self.file.sections {
            if !names.iter().any(|n| eq_fold(n, &section.name)) {
                names.push(&section.name);
            }
        }

        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            let spec = self
                .registry
                .options_for_section(name)
                .ok_or_else(|| ConfError::UnknownSection.context(name))?;
            entries.push((name, self.sections(name, spec)));
        }
        visitor.visit_map(Entries::new(entries))
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfError> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, ConfError> {
        visitor.visit_newtype_struct(self)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct enum identifier
        ignored_any
    }
}

/// All sections matching one record field.
struct SectionsDeserializer<'a> {
    sections: Vec<&'a Section>,
    spec: &'a dyn OptionRegistry,
    strict: bool,
}

impl<'a> SectionsDeserializer<'a> {
    fn single(self) -> Result<SectionDeserializer<'a>, ConfError> {
        match self.sections.as_slice() {
            [section] => Ok(SectionDeserializer {
                section: *section,
                spec: self.spec,
                strict: self.strict,
            }),
            other => Err(ConfError::SectionCount(other.len())),
        }
    }
}

impl<'de, 'a> de::Deserializer<'de> for SectionsDeserializer<'a> {
    type Error = ConfError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfError> {
        if self.sections.len() == 1 {
            self.single()?.deserialize_map(visitor)
        } else {
            self.deserialize_seq(visitor)
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfError> {
        let (spec, strict) = (self.spec, self.strict);
        let mut seq = SeqDeserializer::new(self.sections.into_iter().map(|section| SectionDeserializer {
            section,
            spec,
            strict,
        }));
        let out = visitor.visit_seq(&mut seq)?;
        seq.end()?;
        Ok(out)
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, ConfError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfError> {
        if self.sections.is_empty() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ConfError> {
        self.single()?.deserialize_struct(name, fields, visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfError> {
        self.single()?.deserialize_map(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, ConfError> {
        self.single()?.deserialize_newtype_struct(name, visitor)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct tuple_struct enum identifier ignored_any
    }
}

/// One section decoded into a record.
struct SectionDeserializer<'a> {
    section: &'a Section,
    spec: &'a dyn OptionRegistry,
    strict: bool,
}

impl<'de, 'a> IntoDeserializer<'de, ConfError> for SectionDeserializer<'a> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

impl<'de, 'a> de::Deserializer<'de> for SectionDeserializer<'a> {
    type Error = ConfError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfError> {
        self.deserialize_map(visitor)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ConfError> {
        let mut entries = Vec::with_capacity(fields.len());
        for &field in fields {
            let Some(option) = self.spec.find_option(field) else {
                if self.strict {
                    return Err(ConfError::UnknownField(field.to_string()));
                }
                trace!(field, section = %self.section.name, "no option spec for field");
                continue;
            };

            let values = self.section.values(&option.name);
            if values.is_empty() && !option.required && !option.ty.is_list() {
                continue;
            }
            entries.push((field, ValuesDeserializer { values, ty: option.ty }));
        }
        visitor.visit_map(Entries::new(entries)).map_err(missing_option)
    }

    /// Every set option keyed by its spec name. Used for flattened records
    /// and dynamic targets such as `serde_json::Value`.
    ///
    /// Keys are matched by the target exactly, so aliases and other spellings
    /// do not apply. The target's field names are not known here, which is
    /// why strict mode refuses map-shaped targets.
    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfError> {
        if self.strict {
            return Err(ConfError::UnknownField("*".to_string()).context(&self.section.name));
        }
        let entries = self
            .spec
            .all()
            .iter()
            .filter_map(|option| {
                let values = self.section.values(&option.name);
                (!values.is_empty()).then(|| {
                    (
                        option.name.as_str(),
                        ValuesDeserializer {
                            values,
                            ty: option.ty,
                        },
                    )
                })
            })
            .collect();
        visitor.visit_map(Entries::new(entries)).map_err(missing_option)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfError> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, ConfError> {
        if name == RAW_SECTION {
            let raw = RawSection {
                section: self.section.clone(),
                spec: self.spec.all().iter().cloned().collect(),
            };
            return visitor.visit_string(serde_json::to_string(&raw)?);
        }
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfError> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct enum identifier
    }
}

/// The values of one option, converted through its registered type.
struct ValuesDeserializer<'a> {
    values: Vec<&'a str>,
    ty: OptionType,
}

impl<'a> ValuesDeserializer<'a> {
    fn single(&self) -> Result<&'a str, ConfError> {
        match self.values.as_slice() {
            [] => Err(ConfError::OptionRequired),
            [value] => Ok(*value),
            _ => Err(ConfError::OptionAllowedOnce),
        }
    }

    /// The single value, if the option type decodes into `expected`.
    fn expect(&self, expected: &'static str, accepted: &[OptionType]) -> Result<&'a str, ConfError> {
        if !accepted.contains(&self.ty.element()) {
            return Err(ConfError::TypeMismatch {
                expected,
                found: self.ty,
            });
        }
        self.single()
    }
}

impl<'de, 'a> IntoDeserializer<'de, ConfError> for ValuesDeserializer<'a> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

macro_rules! deserialize_integer {
    ($($method:ident)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfError> {
                let raw = self.expect("integer", &[OptionType::Int])?;
                visitor.visit_i64(value::parse_int(raw)?)
            }
        )*
    };
}

impl<'de, 'a> de::Deserializer<'de> for ValuesDeserializer<'a> {
    type Error = ConfError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfError> {
        if self.ty.is_list() {
            return self.deserialize_seq(visitor);
        }
        match self.ty {
            OptionType::Bool => self.deserialize_bool(visitor),
            OptionType::Int => self.deserialize_i64(visitor),
            OptionType::Float => self.deserialize_f64(visitor),
            _ => self.deserialize_string(visitor),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfError> {
        let raw = self.expect("bool", &[OptionType::Bool])?;
        visitor.visit_bool(value::parse_bool(raw)?)
    }

    deserialize_integer! {
        deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfError> {
        self.deserialize_f64(visitor)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfError> {
        let raw = self.expect("float", &[OptionType::Float])?;
        visitor.visit_f64(value::parse_float(raw)?)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfError> {
        visitor.visit_str(self.expect("string", STRING_TYPES)?)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfError> {
        visitor.visit_bytes(self.expect("bytes", STRING_TYPES)?.as_bytes())
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfError> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfError> {
        if self.values.is_empty() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfError> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, ConfError> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, ConfError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfError> {
        if !self.ty.is_list() {
            return Err(ConfError::TypeMismatch {
                expected: "sequence",
                found: self.ty,
            });
        }
        let ty = self.ty.element();
        let mut seq = SeqDeserializer::new(self.values.into_iter().map(|value| ValuesDeserializer {
            values: vec![value],
            ty,
        }));
        let out = visitor.visit_seq(&mut seq)?;
        seq.end()?;
        Ok(out)
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, ConfError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, ConfError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, ConfError> {
        Err(ConfError::TypeMismatch {
            expected: "map",
            found: self.ty,
        })
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, ConfError> {
        Err(ConfError::TypeMismatch {
            expected: "struct",
            found: self.ty,
        })
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ConfError> {
        let raw = self.expect("enum", STRING_TYPES)?;
        visitor.visit_enum(StrDeserializer::<ConfError>::new(raw))
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfError> {
        visitor.visit_unit()
    }
}
