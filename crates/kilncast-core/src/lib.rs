//! Core data model and planning logic for kilncast.
//!
//! This crate owns the pieces that make the conversion incremental: the
//! vault and site inventories, the persisted conversion ledger, the asset
//! registry, and the two-pass reconciliation planner. Everything here is
//! filesystem-read-only or pure; execution and persistence live in
//! `kilncast-pipeline`.

pub mod assets;
pub mod config;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod reconcile;
pub mod sink;

pub use assets::{
    is_size_token, planned_outputs, planned_outputs_for_name, public_url, AssetError,
    AssetGarbage, AssetKind, AssetRecord, AssetRegistry, AssetUsage, SizeVariant,
    SIZE_TAG_STANDARD,
};
pub use config::{
    is_language_code, ConfigFile, ConfigOverrides, KilncastConfig, BLOG_SUFFIX,
    DEFAULT_CONFIG_FILE, FLATTEN_MARKER, LANG_SEPARATOR,
};
pub use error::{KilncastError, KilncastResult};
pub use inventory::{
    normalize_asset_name, owned_site_roots, scan_site, scan_vault, split_language, split_name,
    target_layout, AttachmentRecord, Category, DocumentRecord, RecordOrigin, SiteInventory,
    SiteRecord, TargetLayout, VaultInventory,
};
pub use ledger::{ConversionLedger, LedgerEntry};
pub use reconcile::{
    plan_conversion, plan_pruning, plan_run, ConvertReason, DeleteReason, PlannedConversion,
    PlannedDeletion, ReconciliationPlan,
};
pub use sink::{NotificationSink, NullSink, ProgressEvent, RunSummary};
