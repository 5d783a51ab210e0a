//! Asset discovery and embed rewriting.
//!
//! Scans standard `![alt|size](path)` embeds, registers a usage for the
//! referenced attachment, and rewrites the embed to the produced output
//! location. Image extensions get one sized output, vector/diagram formats
//! a light/dark pair, and every other extension a download link. A name
//! that does not resolve in the attachment inventory is surfaced as a
//! warning but still rewritten best-effort, so a later run with the
//! attachment in place converges without editing the document again.

use std::sync::LazyLock;

use regex::Regex;

use kilncast_core::assets::{
    planned_outputs_for_name, public_url, AssetKind, AssetUsage, SIZE_TAG_STANDARD,
};
use kilncast_core::config::KilncastConfig;
use kilncast_core::inventory::split_name;

use crate::links::is_external;
use crate::{RewriteContext, RewriteDiagnostic};

static IMAGE_EMBED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").expect("image embed regex"));

/// Rewrites every attachment embed on one line.
pub fn rewrite_line(
    ctx: &RewriteContext<'_>,
    line: &str,
    line_no: usize,
    usages: &mut Vec<AssetUsage>,
    diagnostics: &mut Vec<RewriteDiagnostic>,
) -> String {
    if !line.contains("![") {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len());
    let mut cursor = 0;
    for caps in IMAGE_EMBED.captures_iter(line) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };
        let path = caps[2].trim();
        // Produced outputs and external images stay as written.
        if path.starts_with('/') || is_external(path) {
            continue;
        }
        let file_name = match path.rsplit('/').next().filter(|n| !n.is_empty()) {
            Some(name) => name,
            None => continue,
        };
        let (label, size_tag) = split_annotation(&caps[1]);

        // An unresolved name is rewritten best-effort so the document does
        // not need editing once the attachment appears, but no usage is
        // registered for it.
        let rendered_name = match ctx.vault.resolve_attachment(file_name) {
            Some(attachment) => {
                usages.push(AssetUsage {
                    original_name: attachment.file_name.clone(),
                    size_tag: size_tag.clone(),
                });
                attachment.file_name.clone()
            }
            None => {
                diagnostics.push(RewriteDiagnostic::MissingAssetSource {
                    line: line_no,
                    name: file_name.to_string(),
                });
                file_name.to_string()
            }
        };

        out.push_str(&line[cursor..whole.start()]);
        out.push_str(&render_reference(ctx.config, &rendered_name, label, &size_tag));
        cursor = whole.end();
    }
    out.push_str(&line[cursor..]);
    out
}

/// Splits an embed's bracket text into label and size tag.
///
/// The size annotation sits after a pipe (`![caption|300x200]`); a pipe
/// part that is not a size token stays part of the label.
fn split_annotation(bracket: &str) -> (&str, String) {
    if let Some((left, right)) = bracket.rsplit_once('|') {
        let token = right.trim();
        if kilncast_core::assets::is_size_token(token) {
            return (left.trim(), token.to_string());
        }
    }
    (bracket.trim(), SIZE_TAG_STANDARD.to_string())
}

/// Renders the site-facing reference for one attachment and size.
pub(crate) fn render_reference(
    config: &KilncastConfig,
    file_name: &str,
    label: &str,
    size_tag: &str,
) -> String {
    let outputs = planned_outputs_for_name(config, file_name, size_tag);
    let (_, extension) = split_name(file_name);
    match AssetKind::from_extension(&extension) {
        AssetKind::Image => format!("![{label}]({})", public_url(&outputs[0])),
        AssetKind::DualTheme => format!(
            "![{label}]({}#light)![{label}]({}#dark)",
            public_url(&outputs[0]),
            public_url(&outputs[1])
        ),
        AssetKind::Download => {
            let text = if label.is_empty() { file_name } else { label };
            format!("[{text}]({})", public_url(&outputs[0]))
        }
    }
}
