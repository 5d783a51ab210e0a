//! Reconciliation planning.
//!
//! Each run makes two passes. Pass A walks the existing targets and decides
//! what to delete; pass B walks the vault documents and decides what to
//! convert. Planning is pure: it reads the inventories and the ledger and
//! produces a plan, while the pipeline owns execution and ledger mutation.
//! Pass B must run against the ledger as updated by pass A, since dropping
//! a superseded target's entry is what turns its source into a `New`
//! conversion.

use std::fmt;
use std::path::PathBuf;

use crate::inventory::{SiteInventory, VaultInventory};
use crate::ledger::ConversionLedger;

/// Why a target is being deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteReason {
    /// No ledger entry claims the target.
    Orphaned,
    /// The entry's source no longer exists in the vault.
    SourceRemoved,
    /// The source is newer than the target, or now maps elsewhere.
    Superseded,
}

impl fmt::Display for DeleteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeleteReason::Orphaned => write!(f, "orphaned"),
            DeleteReason::SourceRemoved => write!(f, "source removed"),
            DeleteReason::Superseded => write!(f, "superseded"),
        }
    }
}

/// Why a source is being converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertReason {
    /// No ledger entry exists for the source.
    New,
    /// An entry exists but its target is gone.
    MissingOutput,
    /// The source is newer than its recorded target.
    Modified,
}

impl fmt::Display for ConvertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertReason::New => write!(f, "new"),
            ConvertReason::MissingOutput => write!(f, "missing output"),
            ConvertReason::Modified => write!(f, "modified"),
        }
    }
}

/// One target to delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedDeletion {
    /// Site-relative path of the target file.
    pub target_rel: PathBuf,
    pub reason: DeleteReason,
    /// Source recorded in the ledger entry, when one exists. Deleting the
    /// target drops that entry and releases the source's asset references.
    pub source_path: Option<PathBuf>,
}

/// One source to convert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedConversion {
    /// Vault-relative path of the source document.
    pub source_rel: PathBuf,
    pub reason: ConvertReason,
}

/// Ordered work for one run. Never persisted, recomputed every run.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationPlan {
    pub deletions: Vec<PlannedDeletion>,
    pub conversions: Vec<PlannedConversion>,
}

impl ReconciliationPlan {
    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty() && self.conversions.is_empty()
    }
}

/// Pass A: decides which existing targets to delete.
pub fn plan_pruning(
    site: &SiteInventory,
    vault: &VaultInventory,
    ledger: &ConversionLedger,
) -> Vec<PlannedDeletion> {
    let mut deletions = Vec::new();
    for target in site.files() {
        let entry = match ledger.find_by_target(&target.target_rel) {
            None => {
                deletions.push(PlannedDeletion {
                    target_rel: target.target_rel.clone(),
                    reason: DeleteReason::Orphaned,
                    source_path: None,
                });
                continue;
            }
            Some(entry) => entry,
        };
        match vault.document_by_source(&entry.source_path) {
            None => deletions.push(PlannedDeletion {
                target_rel: target.target_rel.clone(),
                reason: DeleteReason::SourceRemoved,
                source_path: Some(entry.source_path.clone()),
            }),
            Some(doc) => {
                let moved = doc.target_rel != target.target_rel;
                let newer = doc.modified > target.modified;
                if moved || newer {
                    deletions.push(PlannedDeletion {
                        target_rel: target.target_rel.clone(),
                        reason: DeleteReason::Superseded,
                        source_path: Some(entry.source_path.clone()),
                    });
                }
            }
        }
    }
    deletions
}

/// Pass B: decides which sources to convert.
///
/// `site` is the pre-pruning scan; targets deleted by pass A surface here
/// as `New` because their ledger entries are gone, not because the file
/// set changed.
pub fn plan_conversion(
    vault: &VaultInventory,
    site: &SiteInventory,
    ledger: &ConversionLedger,
    force: bool,
) -> Vec<PlannedConversion> {
    let mut conversions = Vec::new();
    for doc in vault.documents() {
        let entry = match ledger.find_by_source(&doc.source_rel) {
            None => {
                conversions.push(PlannedConversion {
                    source_rel: doc.source_rel.clone(),
                    reason: ConvertReason::New,
                });
                continue;
            }
            Some(entry) => entry,
        };
        let target_mtime = match site.target_mtime(&entry.target_path) {
            None => {
                conversions.push(PlannedConversion {
                    source_rel: doc.source_rel.clone(),
                    reason: ConvertReason::MissingOutput,
                });
                continue;
            }
            Some(mtime) => mtime,
        };
        if force || doc.modified > target_mtime {
            conversions.push(PlannedConversion {
                source_rel: doc.source_rel.clone(),
                reason: ConvertReason::Modified,
            });
        }
    }
    conversions
}

/// Plans a whole run without touching the filesystem.
///
/// Simulates pass A's ledger drops on a copy so pass B sees the
/// post-pruning ledger. Used for dry runs and status reporting; the real
/// run interleaves execution between the passes instead.
pub fn plan_run(
    vault: &VaultInventory,
    site: &SiteInventory,
    ledger: &ConversionLedger,
    force: bool,
) -> ReconciliationPlan {
    let deletions = plan_pruning(site, vault, ledger);
    let mut pruned = ledger.clone();
    for deletion in &deletions {
        if deletion.source_path.is_some() {
            pruned.remove_by_target(&deletion.target_rel);
        }
    }
    let conversions = plan_conversion(vault, site, &pruned, force);
    ReconciliationPlan {
        deletions,
        conversions,
    }
}
