use std::fmt::Display;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::OptionType;

#[derive(Debug, Error)]
pub enum ConfError {
    #[error("option is required")]
    OptionRequired,

    #[error("option is only allowed once")]
    OptionAllowedOnce,

    #[error("option does not exist")]
    OptionNotExists,

    #[error("option is not set")]
    OptionNotSet,

    #[error("unknown section")]
    UnknownSection,

    #[error("invalid boolean value {value:?}")]
    InvalidBoolean { value: String },

    #[error("invalid number {value:?}")]
    InvalidNumber { value: String },

    #[error("invalid floating point number {value:?}")]
    InvalidFloat { value: String },

    #[error("invalid duration {value:?}")]
    InvalidDuration { value: String },

    #[error("file does not contain any sections")]
    NoSections,

    #[error("section defined in drop-in does not exist")]
    DropInSectionNotExists,

    #[error("drop-ins not allowed for not-unique sections")]
    DropInSectionNotAllowed,

    #[error("no options defined")]
    NoOptions,

    #[error("unknown option type {0:?}")]
    UnknownOptionType(String),

    #[error("required section {0:?} is missing")]
    MissingSection(String),

    #[error("required field `{0}` is missing")]
    MissingField(&'static str),

    #[error("invalid number of sections, expected 1 but got {0}")]
    SectionCount(usize),

    #[error("no option specification for field `{0}`")]
    UnknownField(String),

    #[error("cannot decode option of type {found} into {expected}")]
    TypeMismatch {
        expected: &'static str,
        found: OptionType,
    },

    #[error("unknown specifier {0}")]
    UnknownSpecifier(String),

    #[error("invalid environment variable {var}: {reason}")]
    InvalidEnv { var: String, reason: String },

    #[error("{path}:{line}: {reason}")]
    Syntax {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("unknown key '{key}' in {path} (line {line})")]
    UnknownKey {
        key: String,
        path: PathBuf,
        line: usize,
    },

    #[error("unknown keys in spec file")]
    UnknownKeys(Vec<ConfError>),

    #[error("failed to parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to parse spec: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0}")]
    Message(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<ConfError>,
    },
}

impl ConfError {
    /// Wrap `self` with a section, option or file identifier.
    pub fn context(self, context: impl Display) -> Self {
        ConfError::Context {
            context: context.to_string(),
            source: Box::new(self),
        }
    }

    /// The categorical error beneath any number of [`Context`](Self::Context) layers.
    ///
    /// ```ignore
    /// assert!(matches!(err.root(), ConfError::OptionAllowedOnce));
    /// ```
    pub fn root(&self) -> &ConfError {
        let mut current = self;
        while let ConfError::Context { source, .. } = current {
            current = source;
        }
        current
    }
}

impl serde::de::Error for ConfError {
    fn custom<T: Display>(msg: T) -> Self {
        ConfError::Message(msg.to_string())
    }

    fn missing_field(field: &'static str) -> Self {
        ConfError::MissingField(field)
    }
}

impl serde::ser::Error for ConfError {
    fn custom<T: Display>(msg: T) -> Self {
        ConfError::Message(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_prefixes_message() {
        let err = ConfError::OptionAllowedOnce
            .context("Single")
            .context("Test");
        assert_eq!(err.to_string(), "Test: Single: option is only allowed once");
    }

    #[test]
    fn root_unwraps_context() {
        let err = ConfError::InvalidBoolean {
            value: "maybe".into(),
        }
        .context("Rotate")
        .context("LogFile");
        assert!(matches!(err.root(), ConfError::InvalidBoolean { value } if value == "maybe"));
    }

    #[test]
    fn root_of_plain_error_is_itself() {
        let err = ConfError::NoSections;
        assert!(matches!(err.root(), ConfError::NoSections));
    }

    #[test]
    fn unknown_key_formats_correctly() {
        let err = ConfError::UnknownKey {
            key: "Global.0.requird".into(),
            path: "/etc/app/spec.toml".into(),
            line: 7,
        };
        let msg = err.to_string();
        assert!(msg.contains("requird"));
        assert!(msg.contains("spec.toml"));
        assert!(msg.contains('7'));
    }

    #[test]
    fn messages_start_lowercase() {
        let errors = [
            ConfError::UnknownKey {
                key: "x".into(),
                path: "spec.toml".into(),
                line: 1,
            },
            ConfError::UnknownKeys(vec![]),
            ConfError::IoError {
                path: "web.unit".into(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            },
            ConfError::OptionRequired,
            ConfError::NoSections,
        ];
        for err in errors {
            let msg = err.to_string();
            assert!(msg.starts_with(|c: char| c.is_lowercase()), "{msg}");
        }
    }

    #[test]
    fn type_mismatch_names_both_sides() {
        let err = ConfError::TypeMismatch {
            expected: "bool",
            found: OptionType::IntList,
        };
        assert_eq!(err.to_string(), "cannot decode option of type []int into bool");
    }
}
