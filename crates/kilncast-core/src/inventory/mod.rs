//! Vault and site inventories.
//!
//! Both inventories are rebuilt from the filesystem on every run. The vault
//! inventory drives conversion (pass B) and link resolution; the site
//! inventory drives target pruning (pass A).

pub mod layout;
pub mod record;
pub mod scan;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub use layout::{target_layout, TargetLayout};
pub use record::{
    normalize_asset_name, split_language, split_name, AttachmentRecord, Category, DocumentRecord,
    RecordOrigin, SiteRecord,
};
pub use scan::{owned_site_roots, scan_site, scan_vault};

/// Everything found under the recognized vault categories.
#[derive(Debug, Default)]
pub struct VaultInventory {
    documents: Vec<DocumentRecord>,
    attachments: Vec<AttachmentRecord>,
    by_source: HashMap<PathBuf, usize>,
    by_clean_name: HashMap<String, Vec<usize>>,
    attachments_by_name: HashMap<String, usize>,
}

impl VaultInventory {
    /// All document records in scan order.
    pub fn documents(&self) -> &[DocumentRecord] {
        &self.documents
    }

    /// All attachment records in scan order.
    pub fn attachments(&self) -> &[AttachmentRecord] {
        &self.attachments
    }

    /// Looks a document up by vault-relative source path.
    pub fn document_by_source(&self, source_rel: &Path) -> Option<&DocumentRecord> {
        self.by_source.get(source_rel).map(|&i| &self.documents[i])
    }

    /// Resolves a wiki-style reference to a document by clean name.
    ///
    /// Matching is case-insensitive. When several documents share a clean
    /// name, the referencing document's own language wins, then the main
    /// language, then scan order.
    pub fn resolve_document(
        &self,
        clean_name: &str,
        prefer_language: &str,
        main_language: &str,
    ) -> Option<&DocumentRecord> {
        let candidates = self.by_clean_name.get(&clean_name.to_lowercase())?;
        let pick = |lang: &str| {
            candidates
                .iter()
                .find(|&&i| self.documents[i].language == lang)
                .copied()
        };
        let idx = pick(prefer_language)
            .or_else(|| pick(main_language))
            .or_else(|| candidates.first().copied())?;
        Some(&self.documents[idx])
    }

    /// Resolves an attachment by file name, tolerant of spaces and `%20`.
    pub fn resolve_attachment(&self, name: &str) -> Option<&AttachmentRecord> {
        let key = normalize_asset_name(name).to_lowercase();
        self.attachments_by_name
            .get(&key)
            .map(|&i| &self.attachments[i])
    }

    /// Adds a document record and indexes it.
    pub fn add_document(&mut self, record: DocumentRecord) {
        let idx = self.documents.len();
        self.by_source.insert(record.source_rel.clone(), idx);
        self.by_clean_name
            .entry(record.clean_name.to_lowercase())
            .or_default()
            .push(idx);
        self.documents.push(record);
    }

    /// Adds an attachment record and indexes it. The first attachment with
    /// a given normalized name wins.
    pub fn add_attachment(&mut self, record: AttachmentRecord) {
        let idx = self.attachments.len();
        let key = normalize_asset_name(&record.file_name).to_lowercase();
        self.attachments_by_name.entry(key).or_insert(idx);
        self.attachments.push(record);
    }
}

/// Existing files under the site trees the engine owns.
#[derive(Debug, Default)]
pub struct SiteInventory {
    files: Vec<SiteRecord>,
    by_target: HashMap<PathBuf, usize>,
}

impl SiteInventory {
    /// All target records in scan order.
    pub fn files(&self) -> &[SiteRecord] {
        &self.files
    }

    /// True when a site-relative target path exists.
    pub fn contains(&self, target_rel: &Path) -> bool {
        self.by_target.contains_key(target_rel)
    }

    /// Modification time of a target, if present.
    pub fn target_mtime(&self, target_rel: &Path) -> Option<SystemTime> {
        self.by_target
            .get(target_rel)
            .map(|&i| self.files[i].modified)
    }

    /// Adds a target record and indexes it.
    pub fn add(&mut self, record: SiteRecord) {
        let idx = self.files.len();
        self.by_target.insert(record.target_rel.clone(), idx);
        self.files.push(record);
    }
}
