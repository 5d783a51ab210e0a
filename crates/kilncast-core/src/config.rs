//! Configuration loading and validation.
//!
//! Settings live in a TOML file (`kilncast.toml` by default) with three
//! sections: `[vault]` for the source tree, `[site]` for the target tree,
//! and `[convert]` for run behavior. All fields except
//! `convert.main_language` have defaults; the main language is required
//! because every document without a language suffix is attributed to it.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;

use crate::error::{KilncastError, KilncastResult};

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "kilncast.toml";

/// Folder-name suffix marking a blog-style category (`posts__blog`).
pub const BLOG_SUFFIX: &str = "__blog";

/// Separator introducing a language suffix on file stems (`intro__de`).
pub const LANG_SEPARATOR: &str = "__";

/// Trailing marker on a folder that flattens it into its own name.
pub const FLATTEN_MARKER: char = '+';

/// `[vault]` section as written in the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VaultSection {
    pub root: PathBuf,
    pub docs_dir: String,
    pub blog_dirs: Vec<String>,
    pub assets_dir: String,
    pub unused_dir: String,
    pub ignore: Vec<String>,
}

impl Default for VaultSection {
    fn default() -> Self {
        Self {
            root: PathBuf::from("vault"),
            docs_dir: "docs".to_string(),
            blog_dirs: vec!["blog".to_string()],
            assets_dir: "assets".to_string(),
            unused_dir: "unused_assets".to_string(),
            ignore: Vec::new(),
        }
    }
}

/// `[site]` section as written in the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteSection {
    pub root: PathBuf,
    pub i18n_dir: String,
    pub assets_out: String,
    pub files_out: String,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            root: PathBuf::from("site"),
            i18n_dir: "i18n".to_string(),
            assets_out: "static/assets".to_string(),
            files_out: "static/files".to_string(),
        }
    }
}

/// `[convert]` section as written in the config file.
///
/// `main_language` has no default on purpose. Documents without a language
/// suffix belong to it, so guessing would silently misfile translations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertSection {
    pub main_language: Option<String>,
    pub concurrency: usize,
}

/// Raw config file contents before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub vault: VaultSection,
    pub site: SiteSection,
    pub convert: ConvertSection,
}

impl ConfigFile {
    /// Parses a TOML config file from disk.
    pub fn read(path: &Path) -> KilncastResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| KilncastError::io(path, e))?;
        toml::from_str(&text).map_err(|e| {
            KilncastError::Configuration(format!("invalid config file '{}': {e}", path.display()))
        })
    }
}

/// Command-line overrides applied on top of the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub vault_root: Option<PathBuf>,
    pub site_root: Option<PathBuf>,
    pub concurrency: Option<usize>,
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct KilncastConfig {
    /// Absolute or working-directory-relative root of the vault.
    pub vault_root: PathBuf,
    /// Docs category folder name under the vault root.
    pub docs_dir: String,
    /// Exact-name blog category folders. Folders ending in `__blog` are
    /// recognized as blog categories regardless of this list.
    pub blog_dirs: Vec<String>,
    /// Attachment category folder name under the vault root.
    pub assets_dir: String,
    /// Vault-side holding area for unreferenced attachments.
    pub unused_dir: String,
    /// Raw ignore patterns, kept for diagnostics.
    pub ignore_patterns: Vec<String>,
    /// Root of the generated site tree.
    pub site_root: PathBuf,
    /// Translation tree folder name under the site root.
    pub i18n_dir: String,
    /// Site-relative directory for produced image outputs.
    pub assets_out: String,
    /// Site-relative directory for download-link outputs.
    pub files_out: String,
    /// Language attributed to documents without a suffix.
    pub main_language: String,
    /// Requested worker count; 0 means one per logical CPU.
    pub concurrency: usize,
    ignore: GlobSet,
}

impl KilncastConfig {
    /// Validates a parsed config file and applies CLI overrides.
    pub fn from_file(file: ConfigFile, overrides: ConfigOverrides) -> KilncastResult<Self> {
        let main_language = match file.convert.main_language {
            Some(lang) => lang,
            None => {
                return Err(KilncastError::Configuration(
                    "convert.main_language is not set; translations cannot be attributed"
                        .to_string(),
                ))
            }
        };
        if !is_language_code(&main_language) {
            return Err(KilncastError::Configuration(format!(
                "convert.main_language '{main_language}' is not a two-letter lowercase code"
            )));
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in &file.vault.ignore {
            let glob = Glob::new(pattern).map_err(|e| {
                KilncastError::Configuration(format!("invalid ignore pattern '{pattern}': {e}"))
            })?;
            builder.add(glob);
        }
        let ignore = builder.build().map_err(|e| {
            KilncastError::Configuration(format!("could not compile ignore patterns: {e}"))
        })?;

        Ok(Self {
            vault_root: overrides.vault_root.unwrap_or(file.vault.root),
            docs_dir: file.vault.docs_dir,
            blog_dirs: file.vault.blog_dirs,
            assets_dir: file.vault.assets_dir,
            unused_dir: file.vault.unused_dir,
            ignore_patterns: file.vault.ignore,
            site_root: overrides.site_root.unwrap_or(file.site.root),
            i18n_dir: file.site.i18n_dir,
            assets_out: file.site.assets_out,
            files_out: file.site.files_out,
            main_language,
            concurrency: overrides.concurrency.unwrap_or(file.convert.concurrency),
            ignore,
        })
    }

    /// Loads the config file at `path` (or the default location) and
    /// validates it.
    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> KilncastResult<Self> {
        let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
        let (path, required) = match path {
            Some(explicit) => (explicit, true),
            None => (default_path.as_path(), false),
        };
        let file = if path.exists() {
            ConfigFile::read(path)?
        } else if required {
            return Err(KilncastError::Configuration(format!(
                "config file '{}' does not exist",
                path.display()
            )));
        } else {
            ConfigFile::default()
        };
        Self::from_file(file, overrides)
    }

    /// True when a vault-relative path matches the ignore set.
    pub fn is_ignored(&self, relative: &Path) -> bool {
        self.ignore.is_match(relative)
    }

    /// True when a top-level vault folder is a blog-style category.
    pub fn is_blog_dir(&self, folder: &str) -> bool {
        folder.ends_with(BLOG_SUFFIX) || self.blog_dirs.iter().any(|d| d == folder)
    }

    /// Blog instance name for a blog category folder (`posts__blog` ->
    /// `posts`).
    pub fn blog_instance(&self, folder: &str) -> String {
        folder
            .strip_suffix(BLOG_SUFFIX)
            .unwrap_or(folder)
            .to_string()
    }

    /// Effective worker count for concurrent conversion.
    pub fn worker_count(&self) -> usize {
        if self.concurrency == 0 {
            num_cpus::get()
        } else {
            self.concurrency
        }
    }
}

/// True for exactly two ASCII lowercase letters.
pub fn is_language_code(code: &str) -> bool {
    code.len() == 2 && code.bytes().all(|b| b.is_ascii_lowercase())
}
