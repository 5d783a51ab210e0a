//! The `convert` command: one full reconciliation run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use kilncast_core::config::{ConfigOverrides, KilncastConfig};
use kilncast_pipeline::{ConvertOptions, ConvertRun};

use crate::sink::ConsoleSink;

pub async fn execute(
    config_path: Option<&Path>,
    vault: Option<PathBuf>,
    site: Option<PathBuf>,
    dry_run: bool,
    force: bool,
    concurrency: Option<usize>,
) -> Result<()> {
    let overrides = ConfigOverrides {
        vault_root: vault,
        site_root: site,
        concurrency,
    };
    let config = KilncastConfig::load(config_path, overrides)?;
    debug!(
        vault = %config.vault_root.display(),
        site = %config.site_root.display(),
        workers = config.worker_count(),
        "configuration loaded"
    );

    let options = ConvertOptions { dry_run, force };
    ConvertRun::new(config, Arc::new(ConsoleSink), options)
        .execute()
        .await?;
    Ok(())
}
