//! Persisted cross-run state.
//!
//! Two JSON documents live under `.kilncast/` in the site root: the
//! conversion ledger and the asset registry. A missing file is an empty
//! state, never an error. Both are rewritten atomically at the end of a
//! successful run and left untouched when a run aborts.

use std::path::{Path, PathBuf};

use kilncast_core::assets::AssetRegistry;
use kilncast_core::error::KilncastResult;
use kilncast_core::ledger::ConversionLedger;

use crate::fs_ops;

/// Directory under the site root holding run state.
pub const STATE_DIR: &str = ".kilncast";
/// Conversion ledger file name.
pub const LEDGER_FILE: &str = "ledger.json";
/// Asset registry file name.
pub const ASSETS_FILE: &str = "assets.json";

/// Resolved locations of the two state files.
#[derive(Debug, Clone)]
pub struct StatePaths {
    pub ledger: PathBuf,
    pub assets: PathBuf,
}

impl StatePaths {
    pub fn under(site_root: &Path) -> Self {
        let dir = site_root.join(STATE_DIR);
        Self {
            ledger: dir.join(LEDGER_FILE),
            assets: dir.join(ASSETS_FILE),
        }
    }
}

/// Loads ledger and registry, empty when the files are absent.
pub async fn load(paths: &StatePaths) -> KilncastResult<(ConversionLedger, AssetRegistry)> {
    let ledger = fs_ops::load_json_or_default(&paths.ledger).await?;
    let registry = fs_ops::load_json_or_default(&paths.assets).await?;
    Ok((ledger, registry))
}

/// Persists both state documents.
pub async fn persist(
    paths: &StatePaths,
    ledger: &ConversionLedger,
    registry: &AssetRegistry,
) -> KilncastResult<()> {
    fs_ops::save_json_atomic(&paths.ledger, ledger).await?;
    fs_ops::save_json_atomic(&paths.assets, registry).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use kilncast_core::ledger::LedgerEntry;
    use tempfile::TempDir;

    #[tokio::test]
    async fn absent_state_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let paths = StatePaths::under(tmp.path());
        let (ledger, registry) = load(&paths).await.unwrap();
        assert!(ledger.is_empty());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn state_survives_a_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let paths = StatePaths::under(tmp.path());

        let mut ledger = ConversionLedger::default();
        ledger.record(LedgerEntry {
            source_path: "docs/a.md".into(),
            target_path: "docs/a.md".into(),
        });
        persist(&paths, &ledger, &AssetRegistry::default())
            .await
            .unwrap();

        let (loaded, _) = load(&paths).await.unwrap();
        assert_eq!(loaded.entries().len(), 1);
        assert!(tmp.path().join(STATE_DIR).join(LEDGER_FILE).exists());
    }
}
