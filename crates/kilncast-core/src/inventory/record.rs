//! Inventory record types.
//!
//! Records are rebuilt from the filesystem on every run and never mutated
//! afterwards. A document's target path is a pure function of its category,
//! language, and vault-relative path plus the configured layout rules; it is
//! computed at record creation and never chosen independently.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::config::LANG_SEPARATOR;

/// Top-level vault category a file was found under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    /// The docs content tree.
    Docs,
    /// A blog content tree; `instance` is the suffix-stripped folder name.
    Blog { instance: String },
    /// The attachment tree.
    Assets,
}

impl Category {
    /// True for blog categories.
    pub fn is_blog(&self) -> bool {
        matches!(self, Category::Blog { .. })
    }
}

/// How a document entered the inventory. Decided once at creation, never
/// inferred from the record later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOrigin {
    /// A markdown document subject to the rewrite pipeline.
    Vault,
    /// Any other file in a document category, carried over byte-for-byte.
    Generic,
}

/// One document-like file in a Docs or Blog category.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    /// Absolute path of the source file.
    pub source_abs: PathBuf,
    /// Path relative to the vault root.
    pub source_rel: PathBuf,
    /// File stem with the language suffix stripped. This is what wiki-style
    /// links refer to.
    pub clean_name: String,
    /// Lowercased file extension, empty when absent.
    pub extension: String,
    /// Two-letter language tag; the main language when no suffix is present.
    pub language: String,
    /// Owning top-level category.
    pub category: Category,
    /// Name of the immediate parent folder, empty at category root.
    pub parent_folder: String,
    /// Source modification time.
    pub modified: SystemTime,
    /// Source size in bytes.
    pub size: u64,
    /// Markdown or generic carry-over.
    pub origin: RecordOrigin,
    /// Computed target path relative to the site root.
    pub target_rel: PathBuf,
    /// Computed absolute target path.
    pub target_abs: PathBuf,
    /// Content-root-relative route used when other documents link here.
    /// Docs drop the content-tree prefix (`guides/a`); blog documents keep
    /// their instance root (`posts/2023/01/hello`).
    pub link_path: String,
}

/// One file in an Assets category.
#[derive(Debug, Clone)]
pub struct AttachmentRecord {
    /// Absolute path of the source file.
    pub source_abs: PathBuf,
    /// Path relative to the vault root.
    pub source_rel: PathBuf,
    /// File name as authored, with extension.
    pub file_name: String,
    /// Stem with spaces and encoded spaces normalized to underscores.
    pub canonical_stem: String,
    /// Lowercased file extension, empty when absent.
    pub extension: String,
    /// Source modification time.
    pub modified: SystemTime,
    /// Source size in bytes.
    pub size: u64,
}

/// One existing file under the site trees the engine owns.
#[derive(Debug, Clone)]
pub struct SiteRecord {
    /// Absolute path of the target file.
    pub target_abs: PathBuf,
    /// Path relative to the site root.
    pub target_rel: PathBuf,
    /// Target modification time.
    pub modified: SystemTime,
}

/// Splits a trailing `__xx` language suffix off a file stem.
///
/// The suffix must be exactly two ASCII lowercase letters; anything else is
/// part of the name (`draft__v2` has no language suffix).
pub fn split_language(stem: &str) -> (&str, Option<&str>) {
    if let Some(idx) = stem.rfind(LANG_SEPARATOR) {
        let candidate = &stem[idx + LANG_SEPARATOR.len()..];
        if candidate.len() == 2 && candidate.bytes().all(|b| b.is_ascii_lowercase()) {
            return (&stem[..idx], Some(candidate));
        }
    }
    (stem, None)
}

/// Splits a file name into stem and lowercased extension.
pub fn split_name(file_name: &str) -> (&str, String) {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, ext.to_ascii_lowercase()),
        _ => (file_name, String::new()),
    }
}

/// Normalizes an attachment name: spaces and `%20` become underscores.
pub fn normalize_asset_name(name: &str) -> String {
    name.replace("%20", "_").replace(' ', "_")
}

/// Parent folder name of a relative path, empty at the top level.
pub fn parent_folder_name(relative: &Path) -> String {
    relative
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string()
}
