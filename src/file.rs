//! Drop-in discovery and loading of unit files from disk.
//!
//! # Drop-in search paths
//!
//! For a unit called `foo-bar.task` below a root directory the following
//! drop-in directories are checked, lowest priority first:
//!
//! ```text
//! <root>/task.d/
//! <root>/foo-.task.d/
//! <root>/foo-bar.task.d/
//! ```
//!
//! Several roots can be given (see [`SearchPath`]). A drop-in file in a later
//! directory or root replaces a file with the same name found earlier. The
//! surviving files are applied sorted by file name, so `10-base.conf` comes
//! before `20-override.conf` regardless of the directory it lives in.
//!
//! Missing directories are silently skipped. Only actual I/O errors
//! (permissions, etc.) are propagated.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::document::{DropIn, File};
use crate::error::ConfError;
use crate::format;
use crate::spec::SectionRegistry;
use crate::types::SearchPath;
use crate::validate::validate_file;

/// File extension of drop-in files.
pub const DROPIN_EXT: &str = ".conf";

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Directory listing used by [`search_dropin_files`].
pub trait DirReader {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntry>>;
}

/// [`DirReader`] backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDirReader;

impl DirReader for FsDirReader {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: entry.file_type()?.is_dir(),
            });
        }
        Ok(entries)
    }
}

/// Resolve a [`SearchPath`] to a concrete directory.
///
/// `app_name` is used by `SearchPath::Platform` to construct the platform-specific
/// config directory (e.g. `~/.config/{app_name}/` on Linux).
///
/// Returns `None` if the path cannot be resolved (e.g. no home directory found).
pub fn resolve_search_path(sp: &SearchPath, app_name: &str) -> Option<PathBuf> {
    match sp {
        SearchPath::Platform => {
            let proj = directories::ProjectDirs::from("", "", app_name)?;
            Some(proj.config_dir().to_path_buf())
        }
        SearchPath::Home(subdir) => {
            let user = directories::UserDirs::new()?;
            Some(user.home_dir().join(subdir))
        }
        SearchPath::Cwd => std::env::current_dir().ok(),
        SearchPath::Path(p) => Some(p.clone()),
    }
}

/// Resolve all search paths, dropping the ones that cannot be resolved.
pub fn expand_search_paths(search_paths: &[SearchPath], app_name: &str) -> Vec<PathBuf> {
    search_paths
        .iter()
        .filter_map(|sp| resolve_search_path(sp, app_name))
        .collect()
}

/// The drop-in directories for `unit` below `root`, lowest priority first.
pub fn dropin_search_paths(unit: &str, root: &Path) -> Vec<PathBuf> {
    let (name, ext) = match unit.rfind('.') {
        Some(idx) => unit.split_at(idx),
        None => (unit, ""),
    };

    let mut paths = Vec::new();

    // a lone "." is no extension
    if ext.len() > 1 {
        paths.push(root.join(format!("{}.d", &ext[1..])));
    }

    for (idx, _) in name.match_indices('-') {
        paths.push(root.join(format!("{}{ext}.d", &name[..=idx])));
    }

    paths.push(root.join(format!("{unit}.d")));
    paths
}

/// All drop-in files for `unit` across `roots`, sorted by file name.
///
/// `roots` are ordered lowest priority first.
pub fn search_dropin_files(
    unit: &str,
    roots: &[PathBuf],
    reader: &dyn DirReader,
) -> Result<Vec<PathBuf>, ConfError> {
    let mut files: BTreeMap<String, PathBuf> = BTreeMap::new();

    for root in roots {
        for dir in dropin_search_paths(unit, root) {
            let entries = match reader.read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(ConfError::IoError { path: dir, source: e }),
            };

            for entry in entries {
                if !entry.is_dir && entry.name.ends_with(DROPIN_EXT) {
                    let path = dir.join(&entry.name);
                    files.insert(entry.name, path);
                }
            }
        }
    }

    Ok(files.into_values().collect())
}

/// Read and parse one unit file.
pub fn load_file(path: &Path) -> Result<File, ConfError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    format::deserialize(path, &content)
}

/// Load every drop-in for `unit` found below `roots`, in application order.
///
/// A drop-in file without any section is accepted and contributes nothing.
pub fn load_dropins(unit: &str, roots: &[PathBuf]) -> Result<Vec<DropIn>, ConfError> {
    let paths = search_dropin_files(unit, roots, &FsDirReader)?;

    let mut dropins = Vec::with_capacity(paths.len());
    for path in paths {
        match load_file(&path) {
            Ok(dropin) => dropins.push(dropin),
            Err(ConfError::NoSections) => dropins.push(DropIn::new(&path)),
            Err(e) => return Err(e.context(path.display())),
        }
    }

    debug!(unit, count = dropins.len(), "loaded drop-ins");
    Ok(dropins)
}

/// Load all files in `dir` whose name ends in `suffix`, sorted by name, and
/// validate them against `registry`.
pub fn read_dir(
    dir: &Path,
    suffix: &str,
    registry: Option<&dyn SectionRegistry>,
) -> Result<Vec<File>, ConfError> {
    let mut entries = FsDirReader.read_dir(dir).map_err(|e| ConfError::IoError {
        path: dir.to_path_buf(),
        source: e,
    })?;
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    let mut files = Vec::new();
    for entry in entries {
        if entry.is_dir || !entry.name.ends_with(suffix) {
            continue;
        }

        let mut file = load_file(&dir.join(&entry.name)).map_err(|e| e.context(&entry.name))?;
        validate_file(&mut file, registry).map_err(|e| e.context(&entry.name))?;
        files.push(file);
    }

    debug!(dir = %dir.display(), count = files.len(), "read unit directory");
    Ok(files)
}
