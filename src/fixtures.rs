#[cfg(test)]
pub mod test {
    use std::time::Duration;

    use serde::{Deserialize, Serialize};

    use crate::spec::{FileSpec, OptionSpec, SectionSpec};
    use crate::types::OptionType;
    use crate::value::duration;

    /// Registry for a small logging daemon: one `[Global]` section and any
    /// number of `[LogFile]` sections.
    pub fn log_spec() -> FileSpec {
        FileSpec::new()
            .with_section(
                "Global",
                SectionSpec::new()
                    .with(OptionSpec::new("Verbose", OptionType::Bool))
                    .with(OptionSpec::new("Workers", OptionType::Int))
                    .with(OptionSpec::new("Name", OptionType::String).alias("Title"))
                    .with(OptionSpec::new("Mode", OptionType::String)),
            )
            .with_section(
                "LogFile",
                SectionSpec::new()
                    .with(OptionSpec::new("Path", OptionType::String).required())
                    .with(OptionSpec::new("Fields", OptionType::StringList))
                    .with(OptionSpec::new("Rotate", OptionType::Bool))
                    .with(OptionSpec::new("MaxAge", OptionType::Duration).default_value("24h"))
                    .with(OptionSpec::new("MaxSize", OptionType::Int))
                    .with(OptionSpec::new("Level", OptionType::String)),
            )
    }

    // -- Fixture for drop-in merge tests ---------------------------------------

    pub fn dropin_spec() -> FileSpec {
        FileSpec::new().with_section(
            "Test",
            SectionSpec::new()
                .with(OptionSpec::new("Single", OptionType::String))
                .with(OptionSpec::new("Slice1", OptionType::StringList))
                .with(OptionSpec::new("Slice2", OptionType::StringList)),
        )
    }

    // -- Typed records matching log_spec ---------------------------------------

    #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
    #[serde(rename_all = "lowercase")]
    pub enum Mode {
        Fast,
        Slow,
    }

    #[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
    #[serde(default, rename_all = "PascalCase")]
    pub struct Global {
        pub verbose: bool,
        pub workers: Option<i64>,
        pub name: String,
        pub mode: Option<Mode>,
    }

    #[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
    #[serde(rename_all = "PascalCase")]
    pub struct LogFile {
        pub path: String,
        #[serde(default)]
        pub fields: Vec<String>,
        #[serde(default)]
        pub rotate: bool,
        #[serde(default, with = "duration::option")]
        pub max_age: Option<Duration>,
        #[serde(default)]
        pub max_size: u64,
    }

    #[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
    pub struct AppConfig {
        #[serde(rename = "Global")]
        pub global: Global,
        #[serde(rename = "LogFile", default)]
        pub log_files: Vec<LogFile>,
    }

    #[test]
    fn log_spec_has_both_sections() {
        let spec = log_spec();
        assert!(spec.get("global").is_some());
        assert!(spec.get("LOGFILE").is_some());
        assert!(spec.get("Copy").is_none());
    }
}
