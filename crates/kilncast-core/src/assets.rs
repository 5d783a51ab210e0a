//! Asset registry: reference-counted attachment usage across runs.
//!
//! Every image embed or download link in a converted document registers a
//! usage here. A logical attachment is identified by its canonical name
//! (spaces and `%20` normalized to underscores); each distinct size
//! annotation becomes a `SizeVariant` holding the referencing documents and
//! the produced output files. Garbage collection never deletes vault
//! content: when an attachment loses its last reference, its produced
//! outputs are deleted but the source file is moved to a holding area.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::KilncastConfig;
use crate::inventory::{normalize_asset_name, AttachmentRecord, VaultInventory};

/// Size tag used when an embed carries no size annotation.
pub const SIZE_TAG_STANDARD: &str = "standard";

/// Raster image extensions embedded directly.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

/// Vector/diagram extensions emitted as a light/dark pair.
pub const DUAL_THEME_EXTENSIONS: &[&str] = &["svg", "excalidraw"];

/// What an attachment extension means for output emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// Single sized output under the assets location.
    Image,
    /// Light and dark outputs under the assets location.
    DualTheme,
    /// Verbatim file under the downloads location, no size variants.
    Download,
}

impl AssetKind {
    /// Classifies a lowercased extension.
    pub fn from_extension(extension: &str) -> Self {
        if DUAL_THEME_EXTENSIONS.contains(&extension) {
            AssetKind::DualTheme
        } else if IMAGE_EXTENSIONS.contains(&extension) {
            AssetKind::Image
        } else {
            AssetKind::Download
        }
    }
}

/// True for an explicit size annotation token: `300` or `300x200`.
pub fn is_size_token(token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    let mut parts = token.split('x');
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    match (parts.next(), parts.next(), parts.next()) {
        (Some(w), None, _) => all_digits(w),
        (Some(w), Some(h), None) => all_digits(w) && all_digits(h),
        _ => false,
    }
}

/// One registered size of one logical attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeVariant {
    /// `standard` or an explicit width/WxH token.
    pub size_tag: String,
    /// Vault-relative source paths of the referencing documents.
    pub referenced_by: BTreeSet<PathBuf>,
    /// Site-relative paths of the produced output files.
    pub output_files: Vec<String>,
}

/// One logical attachment and all of its registered sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    /// Normalized file name, underscores for spaces.
    pub canonical_name: String,
    /// File name as authored in the vault.
    pub original_name: String,
    /// Lowercased extension.
    pub extension: String,
    /// Vault-relative path of the source attachment.
    pub source_path: PathBuf,
    /// Registered sizes.
    pub size_variants: Vec<SizeVariant>,
}

/// A usage discovered while rewriting a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUsage {
    /// Attachment name as written in the document.
    pub original_name: String,
    /// Size annotation, `standard` when absent.
    pub size_tag: String,
}

/// Registration failures. Non-fatal for the referencing document.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The name does not match any attachment in the vault inventory.
    #[error("no known attachment matches '{name}'")]
    MissingSourcePath { name: String },
}

/// Files freed by garbage collection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AssetGarbage {
    /// Produced outputs to delete, site-relative.
    pub output_files: Vec<String>,
    /// Source attachments to move to the holding area, vault-relative.
    pub unused_sources: Vec<PathBuf>,
}

impl AssetGarbage {
    pub fn is_empty(&self) -> bool {
        self.output_files.is_empty() && self.unused_sources.is_empty()
    }
}

/// Persisted registry of all known attachment usages.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetRegistry {
    records: Vec<AssetRecord>,
}

impl AssetRegistry {
    /// All records in registration order.
    pub fn records(&self) -> &[AssetRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record for a canonical name, if registered.
    pub fn find(&self, canonical_name: &str) -> Option<&AssetRecord> {
        self.records
            .iter()
            .find(|r| r.canonical_name == canonical_name)
    }

    /// Registers one usage, finding or creating the record and variant.
    ///
    /// Re-registering the same document and size pair is a no-op. Returns
    /// the produced output files for the variant. Fails when the name does
    /// not resolve in the attachment inventory; the caller should still
    /// emit a best-effort reference, a later run with a corrected vault
    /// will reconcile it.
    pub fn record_usage(
        &mut self,
        config: &KilncastConfig,
        vault: &VaultInventory,
        usage: &AssetUsage,
        document: &Path,
    ) -> Result<Vec<String>, AssetError> {
        let attachment =
            vault
                .resolve_attachment(&usage.original_name)
                .ok_or_else(|| AssetError::MissingSourcePath {
                    name: usage.original_name.clone(),
                })?;
        let canonical_name = normalize_asset_name(&attachment.file_name);
        let outputs = planned_outputs(config, attachment, &usage.size_tag);

        let idx = match self
            .records
            .iter()
            .position(|r| r.canonical_name == canonical_name)
        {
            Some(idx) => idx,
            None => {
                self.records.push(AssetRecord {
                    canonical_name,
                    original_name: attachment.file_name.clone(),
                    extension: attachment.extension.clone(),
                    source_path: attachment.source_rel.clone(),
                    size_variants: Vec::new(),
                });
                self.records.len() - 1
            }
        };
        let record = &mut self.records[idx];
        record.source_path = attachment.source_rel.clone();

        match record
            .size_variants
            .iter_mut()
            .find(|v| v.size_tag == usage.size_tag)
        {
            Some(variant) => {
                variant.referenced_by.insert(document.to_path_buf());
                variant.output_files = outputs.clone();
            }
            None => record.size_variants.push(SizeVariant {
                size_tag: usage.size_tag.clone(),
                referenced_by: BTreeSet::from([document.to_path_buf()]),
                output_files: outputs.clone(),
            }),
        }
        Ok(outputs)
    }

    /// Removes a document from every reference set. Called before the
    /// document's usages are re-registered, or when it is deleted.
    pub fn release_document(&mut self, document: &Path) {
        for record in &mut self.records {
            for variant in &mut record.size_variants {
                variant.referenced_by.remove(document);
            }
        }
    }

    /// Drops unreferenced variants and records, rebuilding survivor lists.
    ///
    /// A variant with no referencing documents frees its produced outputs;
    /// a record with no variants left frees its source attachment for
    /// relocation to the holding area.
    pub fn collect_garbage(&mut self) -> AssetGarbage {
        let mut garbage = AssetGarbage::default();
        let mut survivors = Vec::with_capacity(self.records.len());
        for mut record in self.records.drain(..) {
            let mut kept = Vec::with_capacity(record.size_variants.len());
            for variant in record.size_variants.drain(..) {
                if variant.referenced_by.is_empty() {
                    garbage.output_files.extend(variant.output_files);
                } else {
                    kept.push(variant);
                }
            }
            if kept.is_empty() {
                garbage.unused_sources.push(record.source_path.clone());
            } else {
                record.size_variants = kept;
                survivors.push(record);
            }
        }
        self.records = survivors;
        garbage.output_files.sort();
        garbage.output_files.dedup();
        garbage
    }
}

/// Site-relative output paths one attachment/size pair produces.
pub fn planned_outputs(
    config: &KilncastConfig,
    attachment: &AttachmentRecord,
    size_tag: &str,
) -> Vec<String> {
    planned_outputs_for_name(config, &attachment.file_name, size_tag)
}

/// Output paths computed from a file name alone.
///
/// Images get one sized output, dual-theme formats a light/dark pair, and
/// everything else a single download under the files location. Also used
/// for best-effort references when the name does not resolve in the
/// inventory yet.
pub fn planned_outputs_for_name(
    config: &KilncastConfig,
    file_name: &str,
    size_tag: &str,
) -> Vec<String> {
    let (raw_stem, ext) = crate::inventory::split_name(file_name);
    let stem = normalize_asset_name(raw_stem);
    match AssetKind::from_extension(&ext) {
        AssetKind::Image => {
            vec![format!("{}/{stem}_{size_tag}.{ext}", config.assets_out)]
        }
        AssetKind::DualTheme => vec![
            format!("{}/{stem}_{size_tag}.light.{ext}", config.assets_out),
            format!("{}/{stem}_{size_tag}.dark.{ext}", config.assets_out),
        ],
        AssetKind::Download => {
            let name = normalize_asset_name(file_name);
            vec![format!("{}/{name}", config.files_out)]
        }
    }
}

/// Public URL for a produced output path: the `static/` prefix disappears
/// at serve time.
pub fn public_url(site_rel: &str) -> String {
    let trimmed = site_rel.strip_prefix("static/").unwrap_or(site_rel);
    format!("/{trimmed}")
}
