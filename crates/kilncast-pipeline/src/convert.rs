//! One conversion run, end to end.
//!
//! Execution order is fixed: load state, scan both trees, execute pass A
//! deletions, plan pass B against the pruned ledger, convert concurrently,
//! fold asset usages on the coordinating task, materialize asset outputs,
//! collect garbage, persist. The ledger and registry reach disk only after
//! every conversion succeeded; an aborted run leaves the previous state
//! files in place and the next run re-derives the remaining work.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use kilncast_core::assets::{AssetRegistry, AssetUsage};
use kilncast_core::config::KilncastConfig;
use kilncast_core::error::{KilncastError, KilncastResult};
use kilncast_core::inventory::{
    owned_site_roots, scan_site, scan_vault, DocumentRecord, RecordOrigin, SiteInventory,
    VaultInventory,
};
use kilncast_core::ledger::{ConversionLedger, LedgerEntry};
use kilncast_core::reconcile::{
    plan_conversion, plan_pruning, plan_run, ConvertReason, PlannedConversion, PlannedDeletion,
};
use kilncast_core::sink::{NotificationSink, ProgressEvent, RunSummary};
use kilncast_rewrite::{rewrite_document, RewriteContext};

use crate::fs_ops;
use crate::state::{self, StatePaths};

/// Knobs for one run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertOptions {
    /// Plan and report without touching the filesystem.
    pub dry_run: bool,
    /// Reconvert documents whose targets are up to date.
    pub force: bool,
}

/// A configured conversion run.
pub struct ConvertRun {
    config: Arc<KilncastConfig>,
    sink: Arc<dyn NotificationSink>,
    options: ConvertOptions,
}

/// What converting one document produced, folded in on the coordinator.
struct ConvertedDocument {
    document: DocumentRecord,
    reason: ConvertReason,
    usages: Vec<AssetUsage>,
    diagnostics: Vec<String>,
}

impl ConvertRun {
    pub fn new(
        config: KilncastConfig,
        sink: Arc<dyn NotificationSink>,
        options: ConvertOptions,
    ) -> Self {
        Self {
            config: Arc::new(config),
            sink,
            options,
        }
    }

    /// Executes the run and returns its summary.
    pub async fn execute(&self) -> KilncastResult<RunSummary> {
        let config = &self.config;
        let paths = StatePaths::under(&config.site_root);
        let (mut ledger, mut registry) = state::load(&paths).await?;

        let vault = scan_vault(config)?;
        let owned = owned_site_roots(config, &vault, &ledger);
        let site = scan_site(config, &owned)?;
        info!(
            documents = vault.documents().len(),
            attachments = vault.attachments().len(),
            targets = site.files().len(),
            "inventories built"
        );

        if self.options.dry_run {
            return self.report_dry_run(&vault, &site, &ledger).await;
        }

        let mut summary = RunSummary::default();

        // Pass A. A successful deletion drops the ledger entry and the
        // source's asset references; a failed one keeps the entry so the
        // next run retries.
        for deletion in plan_pruning(&site, &vault, &ledger) {
            match self.execute_deletion(&deletion, &mut ledger, &mut registry).await {
                Ok(()) => {
                    summary.deleted += 1;
                    self.sink
                        .progress(ProgressEvent::Deleted {
                            target_rel: deletion.target_rel.clone(),
                            reason: deletion.reason,
                        })
                        .await;
                }
                Err(err) => {
                    summary.warnings += 1;
                    warn!(target = %deletion.target_rel.display(), error = %err, "deletion failed, entry retained");
                    self.sink
                        .progress(ProgressEvent::Warning {
                            message: format!(
                                "could not delete {}: {err}",
                                deletion.target_rel.display()
                            ),
                        })
                        .await;
                }
            }
        }

        // Pass B against the post-pruning ledger.
        let conversions = plan_conversion(&vault, &site, &ledger, self.options.force);
        summary.skipped = vault.documents().len() - conversions.len();

        let vault = Arc::new(vault);
        let converted = self.convert_all(&vault, &conversions).await?;

        // The registry mutates only here, on the coordinating task.
        for item in converted {
            ledger.record(LedgerEntry {
                source_path: item.document.source_rel.clone(),
                target_path: item.document.target_rel.clone(),
            });
            registry.release_document(&item.document.source_rel);
            for usage in &item.usages {
                if let Err(err) =
                    registry.record_usage(config, &vault, usage, &item.document.source_rel)
                {
                    summary.warnings += 1;
                    warn!(document = %item.document.source_rel.display(), error = %err, "usage not registered");
                    self.sink
                        .progress(ProgressEvent::Warning {
                            message: err.to_string(),
                        })
                        .await;
                }
            }
            for diagnostic in &item.diagnostics {
                summary.warnings += 1;
                warn!(document = %item.document.source_rel.display(), %diagnostic, "rewrite warning");
                self.sink
                    .progress(ProgressEvent::Warning {
                        message: format!("{}: {diagnostic}", item.document.source_rel.display()),
                    })
                    .await;
            }
            summary.converted += 1;
            self.sink
                .progress(ProgressEvent::Converted {
                    source_rel: item.document.source_rel,
                    target_rel: item.document.target_rel,
                    reason: item.reason,
                })
                .await;
        }

        self.materialize_assets(&vault, &registry).await?;
        self.collect_asset_garbage(&mut registry, &mut summary).await;

        state::persist(&paths, &ledger, &registry).await?;
        self.sink.summary(&summary).await;
        Ok(summary)
    }

    /// Plans the whole run and reports it without touching anything.
    async fn report_dry_run(
        &self,
        vault: &VaultInventory,
        site: &SiteInventory,
        ledger: &ConversionLedger,
    ) -> KilncastResult<RunSummary> {
        let plan = plan_run(vault, site, ledger, self.options.force);
        let mut summary = RunSummary {
            dry_run: true,
            skipped: vault.documents().len() - plan.conversions.len(),
            ..RunSummary::default()
        };
        for deletion in &plan.deletions {
            summary.deleted += 1;
            self.sink
                .progress(ProgressEvent::Deleted {
                    target_rel: deletion.target_rel.clone(),
                    reason: deletion.reason,
                })
                .await;
        }
        for conversion in &plan.conversions {
            summary.converted += 1;
            let target_rel = vault
                .document_by_source(&conversion.source_rel)
                .map(|d| d.target_rel.clone())
                .unwrap_or_default();
            self.sink
                .progress(ProgressEvent::Converted {
                    source_rel: conversion.source_rel.clone(),
                    target_rel,
                    reason: conversion.reason,
                })
                .await;
        }
        self.sink.summary(&summary).await;
        Ok(summary)
    }

    /// Removes one target and the state that claimed it.
    async fn execute_deletion(
        &self,
        deletion: &PlannedDeletion,
        ledger: &mut ConversionLedger,
        registry: &mut AssetRegistry,
    ) -> KilncastResult<()> {
        let target_abs = self.config.site_root.join(&deletion.target_rel);
        fs_ops::remove_file_idempotent(&target_abs).await?;
        if let Some(parent) = target_abs.parent() {
            fs_ops::remove_empty_parents(parent, &self.config.site_root).await;
        }
        ledger.remove_by_target(&deletion.target_rel);
        if let Some(source) = &deletion.source_path {
            registry.release_document(source);
        }
        debug!(target = %deletion.target_rel.display(), reason = %deletion.reason, "target removed");
        Ok(())
    }

    /// Converts every planned document on a bounded worker pool.
    ///
    /// All tasks are awaited even when one fails; the first failure then
    /// aborts the run so nothing is persisted.
    async fn convert_all(
        &self,
        vault: &Arc<VaultInventory>,
        conversions: &[PlannedConversion],
    ) -> KilncastResult<Vec<ConvertedDocument>> {
        let semaphore = Arc::new(Semaphore::new(self.config.worker_count()));
        let mut handles = Vec::with_capacity(conversions.len());
        for planned in conversions {
            let document = match vault.document_by_source(&planned.source_rel) {
                Some(document) => document.clone(),
                None => continue,
            };
            let permit = semaphore.clone().acquire_owned().await.map_err(|e| {
                KilncastError::conversion(&planned.source_rel, format!("worker pool closed: {e}"))
            })?;
            let config = self.config.clone();
            let vault = vault.clone();
            let reason = planned.reason;
            let handle = tokio::spawn(async move {
                let _permit = permit;
                convert_one(&config, &vault, &document)
                    .await
                    .map(|(usages, diagnostics)| ConvertedDocument {
                        document,
                        reason,
                        usages,
                        diagnostics,
                    })
            });
            handles.push((planned.source_rel.clone(), handle));
        }

        let mut converted = Vec::with_capacity(handles.len());
        let mut first_error = None;
        for (source_rel, handle) in handles {
            match handle.await {
                Ok(Ok(item)) => converted.push(item),
                Ok(Err(err)) => {
                    first_error.get_or_insert(err);
                }
                Err(err) => {
                    first_error.get_or_insert_with(|| {
                        KilncastError::conversion(
                            &source_rel,
                            format!("conversion task failed: {err}"),
                        )
                    });
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(converted),
        }
    }

    /// Copies every live asset output that is missing or stale.
    async fn materialize_assets(
        &self,
        vault: &VaultInventory,
        registry: &AssetRegistry,
    ) -> KilncastResult<()> {
        for record in registry.records() {
            let attachment = match vault.resolve_attachment(&record.original_name) {
                Some(attachment) => attachment,
                None => continue,
            };
            let source_abs = self.config.vault_root.join(&record.source_path);
            for variant in &record.size_variants {
                for output in &variant.output_files {
                    let target_abs = self.config.site_root.join(output);
                    if fs_ops::copy_if_stale(&source_abs, &target_abs, attachment.modified).await? {
                        self.sink
                            .progress(ProgressEvent::AssetWritten {
                                output: output.clone(),
                            })
                            .await;
                    }
                }
            }
        }
        Ok(())
    }

    /// Deletes unreferenced outputs and retires unreferenced sources.
    async fn collect_asset_garbage(&self, registry: &mut AssetRegistry, summary: &mut RunSummary) {
        let garbage = registry.collect_garbage();
        for output in &garbage.output_files {
            let target_abs = self.config.site_root.join(output);
            match fs_ops::remove_file_idempotent(&target_abs).await {
                Ok(_) => {
                    summary.assets_released += 1;
                    if let Some(parent) = target_abs.parent() {
                        fs_ops::remove_empty_parents(parent, &self.config.site_root).await;
                    }
                }
                Err(err) => {
                    summary.warnings += 1;
                    warn!(output = %output, error = %err, "asset output not deleted");
                    self.sink
                        .progress(ProgressEvent::Warning {
                            message: format!("could not delete {output}: {err}"),
                        })
                        .await;
                }
            }
        }
        let holding = self.config.vault_root.join(&self.config.unused_dir);
        for source in &garbage.unused_sources {
            let source_abs = self.config.vault_root.join(source);
            match fs_ops::relocate_into(&source_abs, &holding).await {
                Ok(destination) => {
                    summary.assets_retired += 1;
                    debug!(source = %source.display(), to = %destination.display(), "attachment retired");
                    self.sink
                        .progress(ProgressEvent::AssetRetired {
                            source_rel: source.clone(),
                        })
                        .await;
                }
                Err(err) => {
                    summary.warnings += 1;
                    warn!(source = %source.display(), error = %err, "attachment not retired");
                    self.sink
                        .progress(ProgressEvent::Warning {
                            message: format!(
                                "could not retire {}: {err}",
                                source.display()
                            ),
                        })
                        .await;
                }
            }
        }
    }
}

/// Converts one document: markdown is rewritten, everything else copied.
async fn convert_one(
    config: &KilncastConfig,
    vault: &VaultInventory,
    document: &DocumentRecord,
) -> KilncastResult<(Vec<AssetUsage>, Vec<String>)> {
    match document.origin {
        RecordOrigin::Vault => {
            let text = fs_ops::read_to_string(&document.source_abs).await?;
            let ctx = RewriteContext {
                config,
                vault,
                document,
            };
            let outcome = rewrite_document(&ctx, &text)
                .map_err(|e| KilncastError::conversion(&document.source_rel, e.to_string()))?;
            fs_ops::write_text(&document.target_abs, &outcome.text).await?;
            debug!(
                source = %document.source_rel.display(),
                target = %document.target_rel.display(),
                "document rewritten"
            );
            let diagnostics = outcome.diagnostics.iter().map(ToString::to_string).collect();
            Ok((outcome.asset_usages, diagnostics))
        }
        RecordOrigin::Generic => {
            fs_ops::copy_file(&document.source_abs, &document.target_abs).await?;
            debug!(source = %document.source_rel.display(), "file carried over");
            Ok((Vec::new(), Vec::new()))
        }
    }
}
