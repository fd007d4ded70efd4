//! Encoding typed records into documents.
//!
//! A custom serde `Serializer` walks the record the same way decoding does:
//! top-level fields become sections, section fields become options.
//!
//! ```text
//! Unit { global: Global { verbose: true }, log_file: vec![a, b] }
//!   → [Global] Verbose= true
//!     [LogFile] ...a
//!     [LogFile] ...b
//! ```
//!
//! `None` fields produce nothing, sequences produce one section or option per
//! element. Zero values (`false`, `0`, `0.0`, `""`) are skipped unless
//! [`Encoder::include_zero_values`] is set. List elements and values wrapped
//! in `Some` are always written.

use std::path::Path;

use serde::Serialize;
use serde::ser::{self, Impossible};

use crate::document::{ConfOption, File, Section};
use crate::error::ConfError;

/// Encodes records into sections.
#[derive(Debug, Clone, Copy, Default)]
pub struct Encoder {
    include_zero: bool,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write options holding zero values instead of skipping them.
    pub fn include_zero_values(mut self, include: bool) -> Self {
        self.include_zero = include;
        self
    }

    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<Section>, ConfError> {
        let mut sections = Vec::new();
        value.serialize(FileSerializer {
            include_zero: self.include_zero,
            out: &mut sections,
        })?;
        Ok(sections)
    }

    pub fn to_file<T: Serialize + ?Sized>(&self, value: &T, path: impl AsRef<Path>) -> Result<File, ConfError> {
        Ok(File {
            path: path.as_ref().to_path_buf(),
            sections: self.encode(value)?,
        })
    }
}

/// Encode `value` into a document at `path`, skipping zero values.
pub fn to_file<T: Serialize + ?Sized>(value: &T, path: impl AsRef<Path>) -> Result<File, ConfError> {
    Encoder::new().to_file(value, path)
}

fn unsupported(what: &str) -> ConfError {
    ConfError::Message(format!("{what} cannot be encoded here"))
}

/// Generates `Serializer` methods that reject their input.
macro_rules! reject {
    ($what:expr; $($method:ident($($arg:ty),*))*) => {
        $(
            fn $method(self, $(_: $arg),*) -> Result<Self::Ok, ConfError> {
                Err(unsupported($what))
            }
        )*
    };
}

/// Generates the compound-type methods of a `Serializer` that rejects them.
macro_rules! reject_compound {
    ($what:expr) => {
        fn serialize_newtype_variant<T: Serialize + ?Sized>(
            self,
            _name: &'static str,
            _index: u32,
            _variant: &'static str,
            _value: &T,
        ) -> Result<Self::Ok, ConfError> {
            Err(unsupported($what))
        }

        fn serialize_tuple_variant(
            self,
            _name: &'static str,
            _index: u32,
            _variant: &'static str,
            _len: usize,
        ) -> Result<Self::SerializeTupleVariant, ConfError> {
            Err(unsupported($what))
        }

        fn serialize_struct_variant(
            self,
            _name: &'static str,
            _index: u32,
            _variant: &'static str,
            _len: usize,
        ) -> Result<Self::SerializeStructVariant, ConfError> {
            Err(unsupported($what))
        }
    };
}

// --- File level: fields become sections ---

struct FileSerializer<'a> {
    include_zero: bool,
    out: &'a mut Vec<Section>,
}

impl<'a> ser::Serializer for FileSerializer<'a> {
    type Ok = ();
    type Error = ConfError;
    type SerializeSeq = Impossible<(), ConfError>;
    type SerializeTuple = Impossible<(), ConfError>;
    type SerializeTupleStruct = Impossible<(), ConfError>;
    type SerializeTupleVariant = Impossible<(), ConfError>;
    type SerializeMap = FileStructSerializer<'a>;
    type SerializeStruct = FileStructSerializer<'a>;
    type SerializeStructVariant = Impossible<(), ConfError>;

    reject! { "a value outside of a section";
        serialize_bool(bool) serialize_i8(i8) serialize_i16(i16) serialize_i32(i32)
        serialize_i64(i64) serialize_u8(u8) serialize_u16(u16) serialize_u32(u32)
        serialize_u64(u64) serialize_f32(f32) serialize_f64(f64) serialize_char(char)
        serialize_str(&str) serialize_bytes(&[u8]) serialize_none() serialize_unit()
        serialize_unit_struct(&'static str)
        serialize_unit_variant(&'static str, u32, &'static str)
    }
    reject_compound!("a top-level enum");

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<(), ConfError> {
        value.serialize(self)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), ConfError> {
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, ConfError> {
        Err(unsupported("a top-level sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, ConfError> {
        Err(unsupported("a top-level tuple"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, ConfError> {
        Err(unsupported("a top-level tuple"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, ConfError> {
        Ok(FileStructSerializer {
            include_zero: self.include_zero,
            out: self.out,
            current_key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<Self::SerializeStruct, ConfError> {
        self.serialize_map(Some(len))
    }
}

struct FileStructSerializer<'a> {
    include_zero: bool,
    out: &'a mut Vec<Section>,
    current_key: Option<String>,
}

impl<'a> FileStructSerializer<'a> {
    fn section<T: Serialize + ?Sized>(&mut self, name: &str, value: &T) -> Result<(), ConfError> {
        value
            .serialize(SectionsSerializer {
                name,
                include_zero: self.include_zero,
                out: self.out,
            })
            .map_err(|e| e.context(name))
    }
}

impl<'a> ser::SerializeStruct for FileStructSerializer<'a> {
    type Ok = ();
    type Error = ConfError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Result<(), ConfError> {
        self.section(key, value)
    }

    fn end(self) -> Result<(), ConfError> {
        Ok(())
    }
}

impl<'a> ser::SerializeMap for FileStructSerializer<'a> {
    type Ok = ();
    type Error = ConfError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), ConfError> {
        self.current_key = Some(key.serialize(KeySerializer)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ConfError> {
        let key = self
            .current_key
            .take()
            .ok_or_else(|| ConfError::Message("map value without key".into()))?;
        self.section(&key, value)
    }

    fn end(self) -> Result<(), ConfError> {
        Ok(())
    }
}

// --- Field level: one section per value or element ---

struct SectionsSerializer<'a, 'n> {
    name: &'n str,
    include_zero: bool,
    out: &'a mut Vec<Section>,
}

impl<'a, 'n> ser::Serializer for SectionsSerializer<'a, 'n> {
    type Ok = ();
    type Error = ConfError;
    type SerializeSeq = SectionSeqSerializer<'a, 'n>;
    type SerializeTuple = SectionSeqSerializer<'a, 'n>;
    type SerializeTupleStruct = Impossible<(), ConfError>;
    type SerializeTupleVariant = Impossible<(), ConfError>;
    type SerializeMap = SectionBuilder<'a>;
    type SerializeStruct = SectionBuilder<'a>;
    type SerializeStructVariant = Impossible<(), ConfError>;

    reject! { "a section that is not a record";
        serialize_bool(bool) serialize_i8(i8) serialize_i16(i16) serialize_i32(i32)
        serialize_i64(i64) serialize_u8(u8) serialize_u16(u16) serialize_u32(u32)
        serialize_u64(u64) serialize_f32(f32) serialize_f64(f64) serialize_char(char)
        serialize_str(&str) serialize_bytes(&[u8])
        serialize_unit_variant(&'static str, u32, &'static str)
    }
    reject_compound!("an enum section");

    fn serialize_none(self) -> Result<(), ConfError> {
        Ok(())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<(), ConfError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), ConfError> {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), ConfError> {
        Ok(())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), ConfError> {
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, ConfError> {
        Ok(SectionSeqSerializer {
            name: self.name,
            include_zero: self.include_zero,
            out: self.out,
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, ConfError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, ConfError> {
        Err(unsupported("a tuple section"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, ConfError> {
        Ok(SectionBuilder {
            section: Section::new(self.name),
            include_zero: self.include_zero,
            out: self.out,
            current_key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<Self::SerializeStruct, ConfError> {
        self.serialize_map(Some(len))
    }
}

struct SectionSeqSerializer<'a, 'n> {
    name: &'n str,
    include_zero: bool,
    out: &'a mut Vec<Section>,
}

impl<'a, 'n> ser::SerializeSeq for SectionSeqSerializer<'a, 'n> {
    type Ok = ();
    type Error = ConfError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ConfError> {
        value.serialize(SectionsSerializer {
            name: self.name,
            include_zero: self.include_zero,
            out: self.out,
        })
    }

    fn end(self) -> Result<(), ConfError> {
        Ok(())
    }
}

impl<'a, 'n> ser::SerializeTuple for SectionSeqSerializer<'a, 'n> {
    type Ok = ();
    type Error = ConfError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ConfError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<(), ConfError> {
        ser::SerializeSeq::end(self)
    }
}

// --- Section level: fields become options ---

struct SectionBuilder<'a> {
    section: Section,
    include_zero: bool,
    out: &'a mut Vec<Section>,
    current_key: Option<String>,
}

impl<'a> SectionBuilder<'a> {
    fn option<T: Serialize + ?Sized>(&mut self, name: &str, value: &T) -> Result<(), ConfError> {
        value
            .serialize(OptionSerializer {
                name,
                skip_zero: !self.include_zero,
                options: &mut self.section.options,
            })
            .map_err(|e| e.context(name))
    }
}

impl<'a> ser::SerializeStruct for SectionBuilder<'a> {
    type Ok = ();
    type Error = ConfError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Result<(), ConfError> {
        self.option(key, value)
    }

    fn end(self) -> Result<(), ConfError> {
        self.out.push(self.section);
        Ok(())
    }
}

/// Maps are sections too; `#[serde(flatten)]` records arrive this way.
impl<'a> ser::SerializeMap for SectionBuilder<'a> {
    type Ok = ();
    type Error = ConfError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), ConfError> {
        self.current_key = Some(key.serialize(KeySerializer)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ConfError> {
        let key = self
            .current_key
            .take()
            .ok_or_else(|| ConfError::Message("map value without key".into()))?;
        self.option(&key, value)
    }

    fn end(self) -> Result<(), ConfError> {
        self.out.push(self.section);
        Ok(())
    }
}

// --- Option level: scalars become values ---

struct OptionSerializer<'a, 'n> {
    name: &'n str,
    skip_zero: bool,
    options: &'a mut Vec<ConfOption>,
}

impl<'a, 'n> OptionSerializer<'a, 'n> {
    fn push(self, value: String, is_zero: bool) -> Result<(), ConfError> {
        if !(is_zero && self.skip_zero) {
            self.options.push(ConfOption::new(self.name, value));
        }
        Ok(())
    }
}

impl<'a, 'n> ser::Serializer for OptionSerializer<'a, 'n> {
    type Ok = ();
    type Error = ConfError;
    type SerializeSeq = OptionSeqSerializer<'a, 'n>;
    type SerializeTuple = OptionSeqSerializer<'a, 'n>;
    type SerializeTupleStruct = OptionSeqSerializer<'a, 'n>;
    type SerializeTupleVariant = Impossible<(), ConfError>;
    type SerializeMap = Impossible<(), ConfError>;
    type SerializeStruct = Impossible<(), ConfError>;
    type SerializeStructVariant = Impossible<(), ConfError>;

    fn serialize_bool(self, v: bool) -> Result<(), ConfError> {
        self.push(v.to_string(), !v)
    }

    fn serialize_i8(self, v: i8) -> Result<(), ConfError> {
        self.serialize_i64(v.into())
    }

    fn serialize_i16(self, v: i16) -> Result<(), ConfError> {
        self.serialize_i64(v.into())
    }

    fn serialize_i32(self, v: i32) -> Result<(), ConfError> {
        self.serialize_i64(v.into())
    }

    fn serialize_i64(self, v: i64) -> Result<(), ConfError> {
        self.push(v.to_string(), v == 0)
    }

    fn serialize_u8(self, v: u8) -> Result<(), ConfError> {
        self.serialize_i64(v.into())
    }

    fn serialize_u16(self, v: u16) -> Result<(), ConfError> {
        self.serialize_i64(v.into())
    }

    fn serialize_u32(self, v: u32) -> Result<(), ConfError> {
        self.serialize_i64(v.into())
    }

    fn serialize_u64(self, v: u64) -> Result<(), ConfError> {
        let v = i64::try_from(v).map_err(|_| ConfError::InvalidNumber { value: v.to_string() })?;
        self.serialize_i64(v)
    }

    fn serialize_f32(self, v: f32) -> Result<(), ConfError> {
        self.push(v.to_string(), v == 0.0)
    }

    fn serialize_f64(self, v: f64) -> Result<(), ConfError> {
        self.push(v.to_string(), v == 0.0)
    }

    fn serialize_char(self, v: char) -> Result<(), ConfError> {
        self.push(v.to_string(), false)
    }

    fn serialize_str(self, v: &str) -> Result<(), ConfError> {
        self.push(v.to_string(), v.is_empty())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<(), ConfError> {
        Err(unsupported("bytes"))
    }

    fn serialize_none(self) -> Result<(), ConfError> {
        Ok(())
    }

    /// `Some` marks a value as set, so zero values inside it are kept.
    fn serialize_some<T: Serialize + ?Sized>(mut self, value: &T) -> Result<(), ConfError> {
        self.skip_zero = false;
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), ConfError> {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), ConfError> {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<(), ConfError> {
        self.push(variant.to_string(), false)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), ConfError> {
        value.serialize(self)
    }

    reject_compound!("an enum with data");

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, ConfError> {
        Ok(OptionSeqSerializer {
            name: self.name,
            options: self.options,
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, ConfError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct, ConfError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, ConfError> {
        Err(unsupported("a nested record"))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct, ConfError> {
        Err(unsupported("a nested record"))
    }
}

struct OptionSeqSerializer<'a, 'n> {
    name: &'n str,
    options: &'a mut Vec<ConfOption>,
}

impl<'a, 'n> ser::SerializeSeq for OptionSeqSerializer<'a, 'n> {
    type Ok = ();
    type Error = ConfError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ConfError> {
        value.serialize(OptionSerializer {
            name: self.name,
            skip_zero: false,
            options: self.options,
        })
    }

    fn end(self) -> Result<(), ConfError> {
        Ok(())
    }
}

impl<'a, 'n> ser::SerializeTuple for OptionSeqSerializer<'a, 'n> {
    type Ok = ();
    type Error = ConfError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ConfError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<(), ConfError> {
        Ok(())
    }
}

impl<'a, 'n> ser::SerializeTupleStruct for OptionSeqSerializer<'a, 'n> {
    type Ok = ();
    type Error = ConfError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ConfError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<(), ConfError> {
        Ok(())
    }
}

// --- Key serializer (extracts string keys from map keys) ---

struct KeySerializer;

impl ser::Serializer for KeySerializer {
    type Ok = String;
    type Error = ConfError;
    type SerializeSeq = Impossible<String, ConfError>;
    type SerializeTuple = Impossible<String, ConfError>;
    type SerializeTupleStruct = Impossible<String, ConfError>;
    type SerializeTupleVariant = Impossible<String, ConfError>;
    type SerializeMap = Impossible<String, ConfError>;
    type SerializeStruct = Impossible<String, ConfError>;
    type SerializeStructVariant = Impossible<String, ConfError>;

    fn serialize_str(self, v: &str) -> Result<String, ConfError> {
        Ok(v.to_string())
    }

    fn serialize_char(self, v: char) -> Result<String, ConfError> {
        Ok(v.to_string())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<String, ConfError> {
        Ok(variant.to_string())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<String, ConfError> {
        value.serialize(self)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<String, ConfError> {
        value.serialize(self)
    }

    reject! { "a non-string map key";
        serialize_bool(bool) serialize_i8(i8) serialize_i16(i16) serialize_i32(i32)
        serialize_i64(i64) serialize_u8(u8) serialize_u16(u16) serialize_u32(u32)
        serialize_u64(u64) serialize_f32(f32) serialize_f64(f64)
        serialize_bytes(&[u8]) serialize_none() serialize_unit()
        serialize_unit_struct(&'static str)
    }
    reject_compound!("a non-string map key");

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, ConfError> {
        Err(unsupported("a non-string map key"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, ConfError> {
        Err(unsupported("a non-string map key"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, ConfError> {
        Err(unsupported("a non-string map key"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, ConfError> {
        Err(unsupported("a non-string map key"))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct, ConfError> {
        Err(unsupported("a non-string map key"))
    }
}
