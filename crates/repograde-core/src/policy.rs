//! Ignore and file-type policy for corpus construction.
//!
//! A [`SourcePolicy`] is built once at start-up and handed to the corpus
//! builder and to repository discovery. It never changes afterwards.

use std::collections::BTreeSet;
use std::path::Path;

/// Directory names that are never descended into.
pub const DEFAULT_IGNORE_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    "dist",
    "build",
    ".idea",
    ".next",
    "out",
    "target",
    "vendor",
    "venv",
    ".venv",
    ".DS_Store",
];

/// Extensions (lowercase, without the dot) that count as gradeable source.
pub const DEFAULT_SOURCE_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "jsx", "tsx", "java", "cpp", "c", "go", "rs", "html", "css", "json", "php",
    "rb", "kt",
];

/// Root-level README names, in lookup order.
pub const README_CANDIDATES: &[&str] = &[
    "README.md",
    "readme.md",
    "Readme.md",
    "README",
    "README.txt",
    "README.rst",
];

/// Bytes inspected by [`SourcePolicy::looks_binary`].
pub const BINARY_SNIFF_BYTES: usize = 1024;

/// Immutable predicates deciding what the corpus builder may read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePolicy {
    ignore_dirs: BTreeSet<String>,
    extensions: BTreeSet<String>,
}

impl Default for SourcePolicy {
    fn default() -> Self {
        Self::standard()
    }
}

impl SourcePolicy {
    /// The reference ignore set and extension allow-list.
    pub fn standard() -> Self {
        Self {
            ignore_dirs: DEFAULT_IGNORE_DIRS.iter().map(|s| s.to_string()).collect(),
            extensions: DEFAULT_SOURCE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Build a policy from explicit sets. Extensions may be given with or
    /// without a leading dot and in any case.
    pub fn new<D, E>(ignore_dirs: D, extensions: E) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Self {
            ignore_dirs: ignore_dirs.into_iter().map(Into::into).collect(),
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// Whether a directory with this name is pruned during traversal.
    pub fn is_ignored_dir(&self, name: &str) -> bool {
        self.ignore_dirs.contains(name)
    }

    /// Whether the file's extension is on the allow-list.
    pub fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.contains(&ext.to_ascii_lowercase()))
            .unwrap_or(false)
    }

    /// Crude binary sniff: a NUL byte in the leading bytes.
    pub fn looks_binary(&self, bytes: &[u8]) -> bool {
        let head = &bytes[..bytes.len().min(BINARY_SNIFF_BYTES)];
        head.contains(&0)
    }

    /// First README present directly under `root`.
    pub fn find_readme(&self, root: &Path) -> Option<std::path::PathBuf> {
        README_CANDIDATES
            .iter()
            .map(|name| root.join(name))
            .find(|p| p.is_file())
    }

    pub fn ignore_dirs(&self) -> impl Iterator<Item = &str> {
        self.ignore_dirs.iter().map(String::as_str)
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }
}
