use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConfError;
use crate::value;

/// The type of an option. List types accept any number of values under one
/// option name, all other types at most one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OptionType {
    #[default]
    String,
    StringList,
    Bool,
    Int,
    IntList,
    Float,
    FloatList,
    Duration,
    DurationList,
}

impl OptionType {
    pub const ALL: [OptionType; 9] = [
        OptionType::String,
        OptionType::StringList,
        OptionType::Bool,
        OptionType::Int,
        OptionType::IntList,
        OptionType::Float,
        OptionType::FloatList,
        OptionType::Duration,
        OptionType::DurationList,
    ];

    pub fn is_list(self) -> bool {
        matches!(
            self,
            OptionType::StringList
                | OptionType::IntList
                | OptionType::FloatList
                | OptionType::DurationList
        )
    }

    /// The scalar type of a single value. Scalar types map to themselves.
    pub fn element(self) -> OptionType {
        match self {
            OptionType::StringList => OptionType::String,
            OptionType::IntList => OptionType::Int,
            OptionType::FloatList => OptionType::Float,
            OptionType::DurationList => OptionType::Duration,
            scalar => scalar,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OptionType::String => "string",
            OptionType::StringList => "[]string",
            OptionType::Bool => "bool",
            OptionType::Int => "int",
            OptionType::IntList => "[]int",
            OptionType::Float => "float",
            OptionType::FloatList => "[]float",
            OptionType::Duration => "duration",
            OptionType::DurationList => "[]duration",
        }
    }

    /// Check that a single raw value is well-formed for this type.
    pub fn validate(self, raw: &str) -> Result<(), ConfError> {
        match self.element() {
            OptionType::Bool => value::parse_bool(raw).map(drop),
            OptionType::Int => value::parse_int(raw).map(drop),
            OptionType::Float => value::parse_float(raw).map(drop),
            OptionType::Duration => value::parse_duration(raw).map(drop),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionType {
    type Err = ConfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OptionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ConfError::UnknownOptionType(s.to_string()))
    }
}

impl Serialize for OptionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OptionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        if name.is_empty() {
            return Ok(OptionType::default());
        }
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// Where to look for drop-in directories.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPath {
    /// Platform config directory (XDG on Linux, ~/Library/Application Support on macOS).
    Platform,
    /// A subdirectory under the user's home directory, e.g. `Home(".myapp")`.
    Home(&'static str),
    /// Current working directory.
    Cwd,
    /// An explicit absolute path, e.g. `/usr/lib/myapp` or `/etc/myapp`.
    Path(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_flags() {
        let lists: Vec<_> = OptionType::ALL.into_iter().filter(|t| t.is_list()).collect();
        assert_eq!(
            lists,
            vec![
                OptionType::StringList,
                OptionType::IntList,
                OptionType::FloatList,
                OptionType::DurationList
            ]
        );
    }

    #[test]
    fn names_round_trip() {
        for t in OptionType::ALL {
            assert_eq!(t.as_str().parse::<OptionType>().unwrap(), t);
        }
    }

    #[test]
    fn unknown_name_fails() {
        let err = "[]bool".parse::<OptionType>().unwrap_err();
        assert!(matches!(err, ConfError::UnknownOptionType(name) if name == "[]bool"));
    }

    #[test]
    fn element_of_list_is_scalar() {
        assert_eq!(OptionType::IntList.element(), OptionType::Int);
        assert_eq!(OptionType::Bool.element(), OptionType::Bool);
    }

    #[test]
    fn validate_values() {
        let cases = [
            (OptionType::Bool, "yes", true),
            (OptionType::Bool, "false", true),
            (OptionType::Bool, "0", true),
            (OptionType::Bool, "foo", false),
            (OptionType::Int, "0x10", true),
            (OptionType::Int, "0600", true),
            (OptionType::IntList, "0b1100", true),
            (OptionType::Int, "INVALID", false),
            (OptionType::IntList, "INVALID2", false),
            (OptionType::Float, "0.5", true),
            (OptionType::Float, ".5", true),
            (OptionType::FloatList, "0.1e10", true),
            (OptionType::Float, ".INVALID", false),
            (OptionType::FloatList, "0.1eINVALID", false),
            (OptionType::Duration, "5m", true),
            (OptionType::Duration, "10h6s", true),
            (OptionType::Duration, "asdf", false),
            (OptionType::DurationList, "10h6s", true),
            (OptionType::DurationList, "asdf", false),
            (OptionType::String, "", true),
        ];
        for (idx, (t, v, ok)) in cases.into_iter().enumerate() {
            assert_eq!(t.validate(v).is_ok(), ok, "case #{idx}: {t} {v:?}");
        }
    }

    #[test]
    fn validation_error_kinds() {
        assert!(matches!(
            OptionType::Bool.validate("foo"),
            Err(ConfError::InvalidBoolean { .. })
        ));
        assert!(matches!(
            OptionType::IntList.validate("1.5"),
            Err(ConfError::InvalidNumber { .. })
        ));
        assert!(matches!(
            OptionType::Float.validate("x"),
            Err(ConfError::InvalidFloat { .. })
        ));
        assert!(matches!(
            OptionType::DurationList.validate("10"),
            Err(ConfError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn serde_uses_type_names() {
        let json = serde_json::to_string(&OptionType::FloatList).unwrap();
        assert_eq!(json, r#""[]float""#);
        let back: OptionType = serde_json::from_str(r#""duration""#).unwrap();
        assert_eq!(back, OptionType::Duration);
        let empty: OptionType = serde_json::from_str(r#""""#).unwrap();
        assert_eq!(empty, OptionType::String);
        assert!(serde_json::from_str::<OptionType>(r#""unknown""#).is_err());
    }
}
