//! Root + relative path resolution for file-reference commands.
//!
//! Control files reference other files relative to the directory of the
//! file the command appears in. [`PathInfo`] keeps the root and relative
//! components separate so that a whole model can be relocated by rewriting
//! only the root.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A file reference split into a root directory and a relative remainder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathInfo {
    root: PathBuf,
    relative: PathBuf,
}

impl PathInfo {
    /// Create from an already-split root and relative component.
    pub fn new(root: impl Into<PathBuf>, relative: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            relative: relative.into(),
        }
    }

    /// Split an absolute path into its parent directory and file name.
    pub fn from_absolute(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let root = path.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        let relative = path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| path.to_path_buf());
        Self { root, relative }
    }

    /// The root directory component.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The relative component, as written in the source file.
    pub fn relative(&self) -> &Path {
        &self.relative
    }

    /// Resolved absolute path (`root` joined with `relative`).
    pub fn absolute(&self) -> PathBuf {
        self.root.join(&self.relative)
    }

    /// File name without extension, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.relative.file_stem().and_then(|s| s.to_str())
    }

    /// File name with extension, if any.
    pub fn filename_and_extension(&self) -> Option<&str> {
        self.relative.file_name().and_then(|s| s.to_str())
    }

    /// Extension without the leading dot, lowercased.
    pub fn extension(&self) -> Option<String> {
        self.relative
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase())
    }

    /// Rewrite the root component, leaving the relative part untouched.
    pub fn set_root(&mut self, root: impl Into<PathBuf>) {
        self.root = root.into();
    }

    /// The relative component rendered as written (display form).
    pub fn relative_str(&self) -> String {
        self.relative.to_string_lossy().into_owned()
    }
}

impl std::fmt::Display for PathInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.absolute().display())
    }
}
