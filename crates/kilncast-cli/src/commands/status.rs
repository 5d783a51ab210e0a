//! The `status` command: plans the next run and prints it.

use std::path::{Path, PathBuf};

use anyhow::Result;
use colored::Colorize;

use kilncast_core::config::{ConfigOverrides, KilncastConfig};
use kilncast_core::inventory::{owned_site_roots, scan_site, scan_vault};
use kilncast_core::reconcile::plan_run;
use kilncast_pipeline::{state, StatePaths};

pub async fn execute(
    config_path: Option<&Path>,
    vault: Option<PathBuf>,
    site: Option<PathBuf>,
) -> Result<()> {
    let overrides = ConfigOverrides {
        vault_root: vault,
        site_root: site,
        concurrency: None,
    };
    let config = KilncastConfig::load(config_path, overrides)?;

    let paths = StatePaths::under(&config.site_root);
    let (ledger, _registry) = state::load(&paths).await?;
    let vault_inv = scan_vault(&config)?;
    let owned = owned_site_roots(&config, &vault_inv, &ledger);
    let site_inv = scan_site(&config, &owned)?;

    let plan = plan_run(&vault_inv, &site_inv, &ledger, false);
    if plan.is_empty() {
        println!(
            "Site is up to date ({} documents tracked).",
            vault_inv.documents().len()
        );
        return Ok(());
    }
    for deletion in &plan.deletions {
        println!(
            "  {} {} {}",
            "-".red(),
            deletion.target_rel.display(),
            format!("({})", deletion.reason).dimmed()
        );
    }
    for conversion in &plan.conversions {
        println!(
            "  {} {} {}",
            "+".green(),
            conversion.source_rel.display(),
            format!("({})", conversion.reason).dimmed()
        );
    }
    println!(
        "{} to delete, {} to convert.",
        plan.deletions.len(),
        plan.conversions.len()
    );
    Ok(())
}
