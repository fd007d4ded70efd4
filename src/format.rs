//! The unit-file text format.
//!
//! ```text
//! # comment
//! [LogFile]
//! Path= /var/log/app.log
//! Fields= Hostname
//! Fields= Error
//! Description= first line \
//!     second line
//! ```
//!
//! Sections start with a `[Name]` header and hold `Key=Value` lines. Blank
//! lines and lines starting with `#` or `;` are ignored. A value ending in a
//! backslash continues on the next line; the parts are joined with a newline
//! and the indentation of the continuation line is dropped.

use std::io::{self, Write};
use std::path::Path;

use crate::document::{File, Section};
use crate::error::ConfError;

/// Parse the text of a unit file. `path` is recorded in the returned document
/// and used in error messages.
pub fn deserialize(path: impl AsRef<Path>, content: &str) -> Result<File, ConfError> {
    let path = path.as_ref();
    let mut file = File::new(path);

    let syntax = |line: usize, reason: &str| ConfError::Syntax {
        path: path.to_path_buf(),
        line,
        reason: reason.to_string(),
    };

    let mut lines = content.lines().enumerate();
    while let Some((idx, raw)) = lines.next() {
        let line_no = idx + 1;
        let line = raw.trim();

        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[') {
            let Some(name) = header.strip_suffix(']') else {
                return Err(syntax(line_no, "unterminated section header"));
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(syntax(line_no, "empty section name"));
            }
            file.sections.push(Section::new(name));
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(syntax(line_no, "expected Key=Value"));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(syntax(line_no, "missing option name"));
        }

        let mut value = value.trim().to_string();
        while let Some(head) = value.strip_suffix('\\') {
            let head = head.to_string();
            match lines.next() {
                Some((_, next)) => value = format!("{head}\n{}", next.trim()),
                None => {
                    value = head;
                    break;
                }
            }
        }

        let Some(section) = file.sections.last_mut() else {
            return Err(syntax(line_no, "option outside of a section"));
        };
        section.push(key, value);
    }

    if file.sections.is_empty() {
        return Err(ConfError::NoSections);
    }
    Ok(file)
}

/// Write `sections` in unit-file syntax. Embedded newlines become line
/// continuations.
///
/// A value ending in a backslash cannot be written, it would read back as a
/// continuation of the next line. Such values fail with
/// [`io::ErrorKind::InvalidInput`] before anything is written.
pub fn write_sections<W: Write>(sections: &[Section], w: &mut W) -> io::Result<()> {
    for section in sections {
        if let Some(opt) = section.options.iter().find(|o| o.value.ends_with('\\')) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{}: {}: value ends with a backslash", section.name, opt.name),
            ));
        }
    }

    for (idx, section) in sections.iter().enumerate() {
        if idx > 0 {
            writeln!(w)?;
        }
        writeln!(w, "[{}]", section.name)?;
        for opt in &section.options {
            let escaped = opt.value.replace('\n', "\\\n\t");
            writeln!(w, "{}= {}", opt.name, escaped)?;
        }
    }
    Ok(())
}

/// [`write_sections`] into a `String`.
pub fn to_string(sections: &[Section]) -> io::Result<String> {
    let mut buf = Vec::new();
    write_sections(sections, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
