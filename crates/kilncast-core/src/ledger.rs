//! Conversion ledger: the persisted source-to-target mapping.
//!
//! The ledger is the only bridge between a deleted source and the output it
//! must remove. It is persisted as a plain JSON array of
//! `{sourcePath, targetPath}` pairs, written whole after each successful
//! run; partial writes never happen. Loading and saving the file is the
//! pipeline's job, the type itself stays pure.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One produced target and the source it came from. Paths are vault-root
/// and site-root relative respectively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub source_path: PathBuf,
    pub target_path: PathBuf,
}

/// Whole-run snapshot of source-to-target pairs.
///
/// At most one live entry exists per target path, and at most one per
/// source path. Mutations rebuild the survivor list instead of splicing
/// during iteration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversionLedger {
    entries: Vec<LedgerEntry>,
}

impl ConversionLedger {
    /// All entries in record order.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry that produced `target_path`, if any.
    pub fn find_by_target(&self, target_path: &Path) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| e.target_path == target_path)
    }

    /// Entry recorded for `source_path`, if any.
    pub fn find_by_source(&self, source_path: &Path) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| e.source_path == source_path)
    }

    /// Records a conversion, replacing any previous entry for the same
    /// source or the same target.
    pub fn record(&mut self, entry: LedgerEntry) {
        self.entries
            .retain(|e| e.source_path != entry.source_path && e.target_path != entry.target_path);
        self.entries.push(entry);
    }

    /// Drops the entry for a deleted target. Returns whether one existed.
    pub fn remove_by_target(&mut self, target_path: &Path) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.target_path != target_path);
        self.entries.len() != before
    }
}
