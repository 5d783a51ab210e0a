//! Asset registry behavior across runs: reference counting, output
//! materialization, garbage collection, and source retirement.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use filetime::FileTime;
use tempfile::TempDir;

use kilncast_core::config::{ConfigFile, ConfigOverrides, KilncastConfig};
use kilncast_core::sink::{NotificationSink, NullSink, ProgressEvent, RunSummary};
use kilncast_pipeline::{ConvertOptions, ConvertRun};

fn config_for(vault: &Path, site: &Path) -> KilncastConfig {
    let file: ConfigFile = toml::from_str(
        r#"
        [convert]
        main_language = "en"
        concurrency = 2
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

async fn run(config: &KilncastConfig) -> RunSummary {
    ConvertRun::new(config.clone(), Arc::new(NullSink), ConvertOptions::default())
        .execute()
        .await
        .unwrap()
}

fn registry_json(site: &Path) -> serde_json::Value {
    let text = fs::read_to_string(site.join(".kilncast/assets.json")).unwrap();
    serde_json::from_str(&text).unwrap()
}

/// Sink capturing every event for later inspection.
#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    fn warnings(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::Warning { message } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn progress(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }

    async fn summary(&self, _summary: &RunSummary) {}
}

#[tokio::test]
async fn shared_asset_is_released_per_document_and_retired_last() {
    let tmp = TempDir::new().unwrap();
    let vault = tmp.path().join("vault");
    let site = tmp.path().join("site");
    write(&vault, "assets/diagram.png", "png-bytes");
    write(&vault, "docs/a.md", "![[diagram.png]]\n");
    write(&vault, "docs/b.md", "Also ![[diagram.png]]\n");
    let config = config_for(&vault, &site);

    let summary = run(&config).await;
    assert_eq!(summary.converted, 2);
    let output = site.join("static/assets/diagram_standard.png");
    assert_eq!(fs::read_to_string(&output).unwrap(), "png-bytes");
    let registry = registry_json(&site);
    assert_eq!(
        registry[0]["sizeVariants"][0]["referencedBy"]
            .as_array()
            .unwrap()
            .len(),
        2
    );

    // One referencing document goes away; the asset stays.
    fs::remove_file(vault.join("docs/a.md")).unwrap();
    let summary = run(&config).await;
    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.assets_released, 0);
    assert_eq!(summary.assets_retired, 0);
    assert!(output.is_file());
    let registry = registry_json(&site);
    assert_eq!(
        registry[0]["sizeVariants"][0]["referencedBy"]
            .as_array()
            .unwrap()
            .len(),
        1
    );

    // The last reference goes away; output deleted, source retired.
    fs::remove_file(vault.join("docs/b.md")).unwrap();
    let summary = run(&config).await;
    assert_eq!(summary.assets_released, 1);
    assert_eq!(summary.assets_retired, 1);
    assert!(!output.exists());
    assert!(!vault.join("assets/diagram.png").exists());
    assert!(vault.join("unused_assets/diagram.png").is_file());
    assert_eq!(registry_json(&site).as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn size_variants_are_freed_independently() {
    let tmp = TempDir::new().unwrap();
    let vault = tmp.path().join("vault");
    let site = tmp.path().join("site");
    write(&vault, "assets/diagram.png", "png-bytes");
    write(&vault, "docs/a.md", "![[diagram.png]]\n![[diagram.png|300]]\n");
    let config = config_for(&vault, &site);

    run(&config).await;
    let standard = site.join("static/assets/diagram_standard.png");
    let sized = site.join("static/assets/diagram_300.png");
    assert!(standard.is_file());
    assert!(sized.is_file());

    // The document drops its unsized embed.
    write(&vault, "docs/a.md", "![[diagram.png|300]]\n");
    filetime::set_file_mtime(site.join("docs/a.md"), FileTime::from_unix_time(1_000, 0)).unwrap();

    let summary = run(&config).await;
    assert_eq!(summary.converted, 1);
    assert_eq!(summary.assets_released, 1);
    assert_eq!(summary.assets_retired, 0);
    assert!(!standard.exists());
    assert!(sized.is_file());
    assert!(vault.join("assets/diagram.png").is_file());
}

#[tokio::test]
async fn dual_theme_assets_write_light_and_dark_outputs() {
    let tmp = TempDir::new().unwrap();
    let vault = tmp.path().join("vault");
    let site = tmp.path().join("site");
    write(&vault, "assets/sketch.svg", "<svg/>");
    write(&vault, "docs/a.md", "![[sketch.svg]]\n");
    let config = config_for(&vault, &site);

    run(&config).await;
    let out = fs::read_to_string(site.join("docs/a.md")).unwrap();
    assert_eq!(
        out,
        "![](/assets/sketch_standard.light.svg#light)![](/assets/sketch_standard.dark.svg#dark)\n"
    );
    assert_eq!(
        fs::read_to_string(site.join("static/assets/sketch_standard.light.svg")).unwrap(),
        "<svg/>"
    );
    assert_eq!(
        fs::read_to_string(site.join("static/assets/sketch_standard.dark.svg")).unwrap(),
        "<svg/>"
    );
}

#[tokio::test]
async fn download_reference_lands_under_files() {
    let tmp = TempDir::new().unwrap();
    let vault = tmp.path().join("vault");
    let site = tmp.path().join("site");
    write(&vault, "assets/year report.pdf", "pdf");
    write(&vault, "docs/a.md", "Get [[year report.pdf|Annual report]].\n");
    let config = config_for(&vault, &site);

    run(&config).await;
    assert_eq!(
        fs::read_to_string(site.join("docs/a.md")).unwrap(),
        "Get [Annual report](/files/year_report.pdf).\n"
    );
    assert_eq!(
        fs::read_to_string(site.join("static/files/year_report.pdf")).unwrap(),
        "pdf"
    );
}

#[tokio::test]
async fn unresolved_wikilink_warns_and_keeps_the_line() {
    let tmp = TempDir::new().unwrap();
    let vault = tmp.path().join("vault");
    let site = tmp.path().join("site");
    write(&vault, "docs/a.md", "See [[ghost]] here.\n");
    let config = config_for(&vault, &site);

    let sink = Arc::new(RecordingSink::default());
    let summary = ConvertRun::new(config, sink.clone(), ConvertOptions::default())
        .execute()
        .await
        .unwrap();
    assert_eq!(summary.converted, 1);
    assert_eq!(summary.warnings, 1);
    assert_eq!(
        fs::read_to_string(site.join("docs/a.md")).unwrap(),
        "See [[ghost]] here.\n"
    );
    let warnings = sink.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("ghost"), "{}", warnings[0]);
    assert!(warnings[0].contains("a.md"), "{}", warnings[0]);
}

#[tokio::test]
async fn missing_asset_embed_is_best_effort_and_unregistered() {
    let tmp = TempDir::new().unwrap();
    let vault = tmp.path().join("vault");
    let site = tmp.path().join("site");
    write(&vault, "docs/a.md", "![chart](missing.png)\n");
    let config = config_for(&vault, &site);

    let summary = run(&config).await;
    assert_eq!(summary.converted, 1);
    assert_eq!(summary.warnings, 1);
    assert_eq!(
        fs::read_to_string(site.join("docs/a.md")).unwrap(),
        "![chart](/assets/missing_standard.png)\n"
    );
    assert_eq!(registry_json(&site).as_array().unwrap().len(), 0);
    assert!(!site.join("static").exists());
}
