//! Filesystem scanners building the vault and site inventories.
//!
//! The vault scan recognizes three kinds of top-level folder: the docs
//! folder, blog folders (exact names from the config plus any folder ending
//! in `__blog`), and the assets folder. Unrecognized top-level folders are
//! skipped entirely; inside a recognized category every subfolder is
//! descended. Hidden entries and ignore-pattern matches are skipped.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::config::KilncastConfig;
use crate::error::{KilncastError, KilncastResult};
use crate::inventory::layout::{target_layout, I18N_DOCS_PLUGIN};
use crate::inventory::record::{
    normalize_asset_name, parent_folder_name, split_language, split_name, AttachmentRecord,
    Category, DocumentRecord, RecordOrigin, SiteRecord,
};
use crate::inventory::{SiteInventory, VaultInventory};
use crate::ledger::ConversionLedger;

/// Builds the vault inventory for the configured root.
pub fn scan_vault(config: &KilncastConfig) -> KilncastResult<VaultInventory> {
    let root = &config.vault_root;
    if !root.is_dir() {
        return Err(KilncastError::Configuration(format!(
            "vault root '{}' is not a directory",
            root.display()
        )));
    }

    let mut inventory = VaultInventory::default();
    let mut top_level: Vec<(String, Category)> = Vec::new();
    let entries = std::fs::read_dir(root).map_err(|e| KilncastError::io(root, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| KilncastError::io(root, e))?;
        let file_type = entry.file_type().map_err(|e| KilncastError::io(entry.path(), e))?;
        if !file_type.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        if let Some(category) = classify_top_level(config, &name) {
            top_level.push((name, category));
        } else {
            debug!(folder = %name, "skipping unrecognized top-level folder");
        }
    }
    top_level.sort_by(|a, b| a.0.cmp(&b.0));

    for (name, category) in top_level {
        scan_category(config, &root.join(&name), &category, &mut inventory)?;
    }
    Ok(inventory)
}

/// Maps a top-level folder name to its category, if recognized.
fn classify_top_level(config: &KilncastConfig, name: &str) -> Option<Category> {
    if name == config.docs_dir {
        Some(Category::Docs)
    } else if name == config.assets_dir {
        Some(Category::Assets)
    } else if config.is_blog_dir(name) {
        Some(Category::Blog {
            instance: config.blog_instance(name),
        })
    } else {
        None
    }
}

fn scan_category(
    config: &KilncastConfig,
    category_root: &Path,
    category: &Category,
    inventory: &mut VaultInventory,
) -> KilncastResult<()> {
    let walker = WalkDir::new(category_root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let source_abs = entry.path().to_path_buf();
        let source_rel = match source_abs.strip_prefix(&config.vault_root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => continue,
        };
        if config.is_ignored(&source_rel) {
            trace!(path = %source_rel.display(), "ignored by pattern");
            continue;
        }
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(path = %source_rel.display(), error = %err, "skipping file without metadata");
                continue;
            }
        };
        let modified = metadata.modified().map_err(|e| KilncastError::io(&source_abs, e))?;
        let size = metadata.len();

        let file_name = source_abs
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (stem, extension) = split_name(&file_name);

        match category {
            Category::Assets => {
                inventory.add_attachment(AttachmentRecord {
                    canonical_stem: normalize_asset_name(stem),
                    source_abs,
                    source_rel,
                    file_name,
                    extension,
                    modified,
                    size,
                });
            }
            _ => {
                let (clean_name, language) = split_language(stem);
                let language = language.unwrap_or(&config.main_language).to_string();
                let rel_in_category: PathBuf = source_rel.components().skip(1).collect();
                let layout = target_layout(config, category, &language, &rel_in_category);
                let origin = if extension == "md" {
                    RecordOrigin::Vault
                } else {
                    RecordOrigin::Generic
                };
                inventory.add_document(DocumentRecord {
                    clean_name: clean_name.to_string(),
                    parent_folder: parent_folder_name(&source_rel),
                    target_abs: config.site_root.join(&layout.target_rel),
                    target_rel: layout.target_rel,
                    link_path: layout.link_path,
                    source_abs,
                    source_rel,
                    extension,
                    language,
                    category: category.clone(),
                    modified,
                    size,
                    origin,
                });
            }
        }
    }
    Ok(())
}

/// Site-relative subtrees the engine owns and may prune.
///
/// Derived from the configuration, the current vault inventory, and the
/// ledger, so targets of deleted blog instances and translations are still
/// reachable by pass A. The `i18n` tree is never owned wholesale; only the
/// content-plugin subtrees inside it are.
pub fn owned_site_roots(
    config: &KilncastConfig,
    vault: &VaultInventory,
    ledger: &ConversionLedger,
) -> BTreeSet<PathBuf> {
    let mut roots = BTreeSet::new();
    roots.insert(PathBuf::from(&config.docs_dir));
    for dir in &config.blog_dirs {
        roots.insert(PathBuf::from(config.blog_instance(dir)));
    }
    for record in vault.documents() {
        roots.insert(owned_root_of(config, &record.target_rel));
    }
    for entry in ledger.entries() {
        roots.insert(owned_root_of(config, &entry.target_path));
    }
    roots
}

/// Owned subtree a target path belongs to.
fn owned_root_of(config: &KilncastConfig, target_rel: &Path) -> PathBuf {
    let segments: Vec<String> = target_rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if segments.first().map(String::as_str) == Some(config.i18n_dir.as_str()) {
        let take = match segments.get(2) {
            Some(plugin) if plugin == I18N_DOCS_PLUGIN => 4,
            _ => 3,
        };
        return segments.iter().take(take).collect();
    }
    segments.iter().take(1).collect()
}

/// Builds the site inventory by walking each owned subtree.
pub fn scan_site(
    config: &KilncastConfig,
    owned_roots: &BTreeSet<PathBuf>,
) -> KilncastResult<SiteInventory> {
    let mut inventory = SiteInventory::default();
    for root in owned_roots {
        let abs_root = config.site_root.join(root);
        if !abs_root.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&abs_root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "skipping unreadable target entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let target_abs = entry.path().to_path_buf();
            let target_rel = match target_abs.strip_prefix(&config.site_root) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => continue,
            };
            let modified = match entry.metadata().map_err(std::io::Error::from).and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(err) => {
                    warn!(path = %target_rel.display(), error = %err, "skipping target without mtime");
                    continue;
                }
            };
            inventory.add(SiteRecord {
                target_abs,
                target_rel,
                modified,
            });
        }
    }
    Ok(inventory)
}

/// A path component starting with a dot.
fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigFile, ConfigOverrides};
    use crate::ledger::LedgerEntry;
    use std::fs;
    use tempfile::TempDir;

    fn config_for(vault: &Path, site: &Path) -> KilncastConfig {
        let file: ConfigFile = toml::from_str(
            r#"
            [vault]
            blog_dirs = ["blog"]
            ignore = ["**/*.tmp"]

            [convert]
            main_language = "en"
            "#,
        )
        .unwrap();
        let overrides = ConfigOverrides {
            vault_root: Some(vault.to_path_buf()),
            site_root: Some(site.to_path_buf()),
            concurrency: None,
        };
        KilncastConfig::from_file(file, overrides).unwrap()
    }

    fn write(root: &Path, rel: &str, text: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn vault_scan_classifies_by_category() {
        let tmp = TempDir::new().unwrap();
        let vault = tmp.path().join("vault");
        write(&vault, "docs/01-intro.md", "# intro");
        write(&vault, "docs/notes.tmp", "scratch");
        write(&vault, "docs/.hidden.md", "secret");
        write(&vault, "posts__blog/2023-hello.md", "hi");
        write(&vault, "assets/My Image.png", "png");
        write(&vault, "templates/skip.md", "never");
        write(&vault, "unused_assets/old.png", "png");

        let config = config_for(&vault, &tmp.path().join("site"));
        let inv = scan_vault(&config).unwrap();

        assert_eq!(inv.documents().len(), 2);
        assert_eq!(inv.attachments().len(), 1);
        let intro = inv.document_by_source(Path::new("docs/01-intro.md")).unwrap();
        assert_eq!(intro.clean_name, "01-intro");
        assert_eq!(intro.target_rel, PathBuf::from("docs/intro.md"));
        assert_eq!(intro.origin, RecordOrigin::Vault);
        assert!(matches!(
            inv.document_by_source(Path::new("posts__blog/2023-hello.md"))
                .unwrap()
                .category,
            Category::Blog { .. }
        ));
    }

    #[test]
    fn vault_scan_rejects_missing_root() {
        let tmp = TempDir::new().unwrap();
        let config = config_for(&tmp.path().join("absent"), &tmp.path().join("site"));
        let err = scan_vault(&config).unwrap_err();
        assert!(matches!(err, KilncastError::Configuration(_)));
    }

    #[test]
    fn generic_files_in_docs_are_documents() {
        let tmp = TempDir::new().unwrap();
        let vault = tmp.path().join("vault");
        write(&vault, "docs/chart.png", "png");
        let config = config_for(&vault, &tmp.path().join("site"));
        let inv = scan_vault(&config).unwrap();
        let rec = inv.document_by_source(Path::new("docs/chart.png")).unwrap();
        assert_eq!(rec.origin, RecordOrigin::Generic);
        assert_eq!(rec.target_rel, PathBuf::from("docs/chart.png"));
    }

    #[test]
    fn owned_roots_cover_ledger_and_translations() {
        let tmp = TempDir::new().unwrap();
        let vault = tmp.path().join("vault");
        write(&vault, "docs/intro__de.md", "# intro");
        let config = config_for(&vault, &tmp.path().join("site"));
        let inv = scan_vault(&config).unwrap();

        let mut ledger = ConversionLedger::default();
        ledger.record(LedgerEntry {
            source_path: PathBuf::from("gone__blog/post.md"),
            target_path: PathBuf::from("gone/post.md"),
        });

        let roots = owned_site_roots(&config, &inv, &ledger);
        assert!(roots.contains(Path::new("docs")));
        assert!(roots.contains(Path::new("blog")));
        assert!(roots.contains(Path::new("gone")));
        assert!(roots.contains(Path::new(
            "i18n/de/docusaurus-plugin-content-docs/current"
        )));
        assert!(!roots.contains(Path::new("i18n")));
    }

    #[test]
    fn site_scan_walks_only_owned_roots() {
        let tmp = TempDir::new().unwrap();
        let site = tmp.path().join("site");
        write(&site, "docs/intro.md", "out");
        write(&site, "static/assets/logo.png", "png");
        write(&site, "i18n/de/code.json", "{}");

        let vault = tmp.path().join("vault");
        fs::create_dir_all(&vault).unwrap();
        let config = config_for(&vault, &site);
        let inv = scan_vault(&config).unwrap();
        let roots = owned_site_roots(&config, &inv, &ConversionLedger::default());
        let site_inv = scan_site(&config, &roots).unwrap();

        assert!(site_inv.contains(Path::new("docs/intro.md")));
        assert!(!site_inv.contains(Path::new("static/assets/logo.png")));
        assert!(!site_inv.contains(Path::new("i18n/de/code.json")));
    }
}
