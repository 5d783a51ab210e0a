//! Line-oriented markdown rewriting for kilncast.
//!
//! Four rewrites run in fixed order over every line outside fenced code
//! blocks: wiki-style reference resolution, asset embed rewriting,
//! relative link normalization, and callout/quote block conversion. The
//! rewrite is pure: asset usages and diagnostics are collected into the
//! outcome and the caller decides what to register and report.

use std::fmt;

use thiserror::Error;
use tracing::debug;

use kilncast_core::assets::AssetUsage;
use kilncast_core::config::KilncastConfig;
use kilncast_core::inventory::{DocumentRecord, VaultInventory};

pub mod admonitions;
pub mod asset_refs;
pub mod links;
pub mod wikilinks;

pub use admonitions::{AdmonitionMachine, BlockState};

/// A rewrite failure that aborts the document's conversion.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RewriteError {
    /// A callout or quote start marker while another block is still open.
    #[error("nested callout marker at line {line}")]
    NestedCallout { line: usize },
}

/// A non-fatal finding surfaced to the run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteDiagnostic {
    /// A wiki reference that matched neither a document nor an attachment.
    UnresolvedReference { line: usize, target: String },
    /// An embed naming an attachment the vault does not contain.
    MissingAssetSource { line: usize, name: String },
}

impl fmt::Display for RewriteDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewriteDiagnostic::UnresolvedReference { line, target } => {
                write!(f, "line {line}: unresolved reference [[{target}]]")
            }
            RewriteDiagnostic::MissingAssetSource { line, name } => {
                write!(f, "line {line}: attachment '{name}' not found in vault")
            }
        }
    }
}

/// Read-only surroundings of the document being rewritten.
#[derive(Clone, Copy)]
pub struct RewriteContext<'a> {
    pub config: &'a KilncastConfig,
    pub vault: &'a VaultInventory,
    /// The document whose body is being rewritten; its language steers
    /// reference resolution.
    pub document: &'a DocumentRecord,
}

/// Result of rewriting one document body.
#[derive(Debug)]
pub struct RewriteOutcome {
    pub text: String,
    /// Attachment/size pairs the document references, in discovery order.
    pub asset_usages: Vec<AssetUsage>,
    pub diagnostics: Vec<RewriteDiagnostic>,
}

/// Rewrites a whole document body.
///
/// Fenced code blocks pass through untouched. The input's trailing
/// newline, or its absence, is preserved.
pub fn rewrite_document(
    ctx: &RewriteContext<'_>,
    input: &str,
) -> Result<RewriteOutcome, RewriteError> {
    let mut usages = Vec::new();
    let mut diagnostics = Vec::new();
    let mut machine = AdmonitionMachine::new();
    let mut lines: Vec<String> = Vec::new();
    let mut in_fence = false;

    for (idx, line) in input.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            lines.push(line.to_string());
            continue;
        }
        if in_fence {
            lines.push(line.to_string());
            continue;
        }
        let line = wikilinks::rewrite_line(ctx, line, line_no, &mut usages, &mut diagnostics);
        let line = asset_refs::rewrite_line(ctx, &line, line_no, &mut usages, &mut diagnostics);
        let line = links::rewrite_line(ctx.config, &line);
        lines.extend(machine.feed(&line, line_no)?);
    }
    lines.extend(machine.finish());

    for diagnostic in &diagnostics {
        debug!(document = %ctx.document.source_rel.display(), %diagnostic, "rewrite diagnostic");
    }

    let mut text = lines.join("\n");
    if input.ends_with('\n') {
        text.push('\n');
    }
    Ok(RewriteOutcome {
        text,
        asset_usages: usages,
        diagnostics,
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;
    use std::time::SystemTime;

    use kilncast_core::config::{ConfigFile, ConfigOverrides, KilncastConfig};
    use kilncast_core::inventory::record::parent_folder_name;
    use kilncast_core::inventory::{
        normalize_asset_name, split_language, split_name, target_layout, AttachmentRecord,
        Category, DocumentRecord, RecordOrigin, VaultInventory,
    };

    use crate::RewriteContext;

    /// Vault shape for a rewrite test, expressed as plain path lists.
    #[derive(Clone)]
    pub(crate) struct ContextParts {
        pub config: KilncastConfig,
        pub documents: Vec<String>,
        pub attachments: Vec<String>,
        pub document_language: String,
    }

    impl ContextParts {
        pub fn with_documents(paths: &[&str]) -> Self {
            Self {
                documents: paths.iter().map(|s| s.to_string()).collect(),
                ..Self::empty()
            }
        }

        pub fn with_attachments(names: &[&str]) -> Self {
            Self {
                attachments: names.iter().map(|s| s.to_string()).collect(),
                ..Self::empty()
            }
        }

        fn empty() -> Self {
            let file: ConfigFile = toml::from_str("[convert]\nmain_language = \"en\"\n").unwrap();
            Self {
                config: KilncastConfig::from_file(file, ConfigOverrides::default()).unwrap(),
                documents: Vec::new(),
                attachments: Vec::new(),
                document_language: "en".to_string(),
            }
        }
    }

    /// Owns the inventory and referencing document a test borrows from.
    pub(crate) struct TestContext {
        pub config: KilncastConfig,
        pub vault: VaultInventory,
        pub document: DocumentRecord,
    }

    impl TestContext {
        pub fn ctx(&self) -> RewriteContext<'_> {
            RewriteContext {
                config: &self.config,
                vault: &self.vault,
                document: &self.document,
            }
        }
    }

    pub(crate) fn context(parts: &ContextParts) -> TestContext {
        let config = parts.config.clone();
        let mut vault = VaultInventory::default();
        for path in &parts.documents {
            vault.add_document(document_record(&config, path));
        }
        for name in &parts.attachments {
            let (stem, extension) = split_name(name);
            vault.add_attachment(AttachmentRecord {
                source_abs: config.vault_root.join("assets").join(name),
                source_rel: PathBuf::from("assets").join(name),
                file_name: name.clone(),
                canonical_stem: normalize_asset_name(stem),
                extension,
                modified: SystemTime::UNIX_EPOCH,
                size: 0,
            });
        }
        let mut document = document_record(&config, "docs/index.md");
        document.language = parts.document_language.clone();
        TestContext {
            config,
            vault,
            document,
        }
    }

    fn document_record(config: &KilncastConfig, path: &str) -> DocumentRecord {
        let source_rel = PathBuf::from(path);
        let top = source_rel
            .components()
            .next()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .unwrap_or_default();
        let category = if config.is_blog_dir(&top) {
            Category::Blog {
                instance: config.blog_instance(&top),
            }
        } else {
            Category::Docs
        };
        let file_name = source_rel
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (stem, extension) = split_name(&file_name);
        let (clean_name, language) = split_language(stem);
        let language = language.unwrap_or(&config.main_language).to_string();
        let rel_in_category: PathBuf = source_rel.components().skip(1).collect();
        let layout = target_layout(config, &category, &language, &rel_in_category);
        let origin = if extension == "md" {
            RecordOrigin::Vault
        } else {
            RecordOrigin::Generic
        };
        DocumentRecord {
            source_abs: config.vault_root.join(&source_rel),
            clean_name: clean_name.to_string(),
            parent_folder: parent_folder_name(&source_rel),
            target_abs: config.site_root.join(&layout.target_rel),
            target_rel: layout.target_rel,
            link_path: layout.link_path,
            source_rel,
            extension,
            language,
            category,
            modified: SystemTime::UNIX_EPOCH,
            size: 0,
            origin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{context, ContextParts};

    #[test]
    fn full_document_runs_all_four_stages() {
        let mut parts = ContextParts::with_documents(&["docs/guides/a.md"]);
        parts.attachments.push("diagram.png".to_string());
        let built = context(&parts);

        let input = "\
# Title\n\
\n\
See [[a|See This]] and ![[diagram.png|300x200]].\n\
\n\
> [!warning] Careful\n\
> body text\n\
\n\
[x](02-guide/03-intro.md)\n\
\n\
```text\n\
[[a]] stays\n\
```\n";

        let outcome = rewrite_document(&built.ctx(), input).unwrap();
        let expected = "\
# Title\n\
\n\
See [See This](guides/a) and ![](/assets/diagram_300x200.png).\n\
\n\
:::warning Careful\n\
body text\n\
:::\n\
[x](/guide/intro)\n\
\n\
```text\n\
[[a]] stays\n\
```\n";
        assert_eq!(outcome.text, expected);
        assert_eq!(outcome.asset_usages.len(), 1);
        assert_eq!(outcome.asset_usages[0].size_tag, "300x200");
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn open_block_is_closed_at_end_of_input() {
        let parts = ContextParts::with_documents(&[]);
        let built = context(&parts);
        let outcome = rewrite_document(&built.ctx(), "> [!note] Heads up\n> only line").unwrap();
        assert_eq!(outcome.text, ":::note Heads up\nonly line\n:::");
    }

    #[test]
    fn nested_marker_aborts_the_document() {
        let parts = ContextParts::with_documents(&[]);
        let built = context(&parts);
        let err = rewrite_document(&built.ctx(), "> [!note] A\n> [!tip] B\n").unwrap_err();
        assert_eq!(err, RewriteError::NestedCallout { line: 2 });
    }

    #[test]
    fn missing_trailing_newline_is_preserved() {
        let parts = ContextParts::with_documents(&[]);
        let built = context(&parts);
        let outcome = rewrite_document(&built.ctx(), "plain text").unwrap();
        assert_eq!(outcome.text, "plain text");
    }
}
