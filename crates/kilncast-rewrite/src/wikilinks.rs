//! Wiki-style reference resolution.
//!
//! `[[Target]]`, `[[Target|Title]]`, and the embed form `![[Target]]` are
//! resolved against the vault inventory. Document references become
//! standard links to the published route (an embed of a document
//! downgrades to a link). Attachment references go through the same
//! rendering as standard embeds, so an image reference becomes a sized
//! embed and any other extension a download link. A reference that
//! resolves to nothing is left as written and reported.

use std::sync::LazyLock;

use regex::Regex;

use kilncast_core::assets::{is_size_token, AssetUsage, SIZE_TAG_STANDARD};
use kilncast_core::inventory::split_language;

use crate::asset_refs::render_reference;
use crate::links::normalize_fragment;
use crate::{RewriteContext, RewriteDiagnostic};

static WIKILINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(!?)\[\[([^\]]+)\]\]").expect("wikilink regex"));

/// Resolves every wiki reference on one line.
pub fn rewrite_line(
    ctx: &RewriteContext<'_>,
    line: &str,
    line_no: usize,
    usages: &mut Vec<AssetUsage>,
    diagnostics: &mut Vec<RewriteDiagnostic>,
) -> String {
    if !line.contains("[[") {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len());
    let mut cursor = 0;
    for caps in WIKILINK.captures_iter(line) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };
        let inner = &caps[2];
        let replacement = match resolve(ctx, inner, usages) {
            Some(text) => text,
            None => {
                diagnostics.push(RewriteDiagnostic::UnresolvedReference {
                    line: line_no,
                    target: inner.to_string(),
                });
                continue;
            }
        };
        out.push_str(&line[cursor..whole.start()]);
        out.push_str(&replacement);
        cursor = whole.end();
    }
    out.push_str(&line[cursor..]);
    out
}

/// Resolves the text between the brackets, or `None` when nothing in the
/// vault matches.
fn resolve(ctx: &RewriteContext<'_>, inner: &str, usages: &mut Vec<AssetUsage>) -> Option<String> {
    let (target, title) = match inner.split_once('|') {
        Some((t, title)) => (t.trim(), Some(title.trim()).filter(|s| !s.is_empty())),
        None => (inner.trim(), None),
    };
    let (ref_path, fragment) = match target.split_once('#') {
        Some((p, f)) => (p, Some(f)),
        None => (target, None),
    };
    let base_name = ref_path.rsplit('/').next()?.trim();
    if base_name.is_empty() {
        return None;
    }

    // A trailing `.md` is optional in references; the language suffix is
    // part of the file name, not the clean name.
    let doc_key = base_name.strip_suffix(".md").unwrap_or(base_name);
    let (lookup, _) = split_language(doc_key);
    if let Some(document) =
        ctx.vault
            .resolve_document(lookup, &ctx.document.language, &ctx.config.main_language)
    {
        let text = title.unwrap_or(doc_key);
        let link = match fragment {
            Some(f) => format!("{}#{}", document.link_path, normalize_fragment(f)),
            None => document.link_path.clone(),
        };
        return Some(format!("[{text}]({link})"));
    }

    if let Some(attachment) = ctx.vault.resolve_attachment(base_name) {
        let (label, size_tag) = match title {
            Some(t) if is_size_token(t) => ("", t.to_string()),
            Some(t) => (t, SIZE_TAG_STANDARD.to_string()),
            None => ("", SIZE_TAG_STANDARD.to_string()),
        };
        usages.push(AssetUsage {
            original_name: attachment.file_name.clone(),
            size_tag: size_tag.clone(),
        });
        return Some(render_reference(
            ctx.config,
            &attachment.file_name,
            label,
            &size_tag,
        ));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{context, ContextParts};

    fn rewrite(parts: &ContextParts, line: &str) -> (String, Vec<AssetUsage>, Vec<String>) {
        let built = context(parts);
        let mut usages = Vec::new();
        let mut diagnostics = Vec::new();
        let out = rewrite_line(&built.ctx(), line, 1, &mut usages, &mut diagnostics);
        let rendered = diagnostics.iter().map(|d| d.to_string()).collect();
        (out, usages, rendered)
    }

    #[test]
    fn titled_reference_links_to_published_route() {
        let parts = ContextParts::with_documents(&["docs/guides/a.md"]);
        let (out, _, diags) = rewrite(&parts, "See [[a|See This]] for more.");
        assert_eq!(out, "See [See This](guides/a) for more.");
        assert!(diags.is_empty());
    }

    #[test]
    fn bare_reference_uses_target_as_title() {
        let parts = ContextParts::with_documents(&["docs/guides/a.md"]);
        let (out, _, _) = rewrite(&parts, "[[a]]");
        assert_eq!(out, "[a](guides/a)");
    }

    #[test]
    fn fragment_is_normalized_on_document_links() {
        let parts = ContextParts::with_documents(&["docs/guides/a.md"]);
        let (out, _, _) = rewrite(&parts, "[[a#Some Heading|here]]");
        assert_eq!(out, "[here](guides/a#some-heading)");
    }

    #[test]
    fn resolution_prefers_referencing_documents_language() {
        let parts = ContextParts::with_documents(&[
            "docs/guides/Note A.md",
            "docs/guides/Note A__de.md",
        ]);
        let mut de = parts.clone();
        de.document_language = "de".to_string();
        let (out, _, _) = rewrite(&de, "[[Note A]]");
        assert_eq!(out, "[Note A](guides/Note A)");
        let built = context(&de);
        let hit = built.vault.resolve_document("note a", "de", "en");
        assert_eq!(hit.map(|d| d.language.as_str()), Some("de"));
    }

    #[test]
    fn embed_of_document_downgrades_to_link() {
        let parts = ContextParts::with_documents(&["docs/guides/a.md"]);
        let (out, _, _) = rewrite(&parts, "![[a]]");
        assert_eq!(out, "[a](guides/a)");
    }

    #[test]
    fn attachment_embed_with_size_annotation() {
        let parts = ContextParts::with_attachments(&["diagram.png"]);
        let (out, usages, _) = rewrite(&parts, "![[diagram.png|300x200]]");
        assert_eq!(out, "![](/assets/diagram_300x200.png)");
        assert_eq!(usages[0].size_tag, "300x200");
    }

    #[test]
    fn attachment_link_form_still_renders_reference() {
        let parts = ContextParts::with_attachments(&["report.pdf"]);
        let (out, usages, _) = rewrite(&parts, "[[report.pdf]]");
        assert_eq!(out, "[report.pdf](/files/report.pdf)");
        assert_eq!(usages[0].original_name, "report.pdf");
    }

    #[test]
    fn unresolved_reference_passes_through_with_diagnostic() {
        let parts = ContextParts::with_documents(&[]);
        let (out, usages, diags) = rewrite(&parts, "[[No Such Note]] stays");
        assert_eq!(out, "[[No Such Note]] stays");
        assert!(usages.is_empty());
        assert_eq!(diags.len(), 1);
        assert!(diags[0].contains("No Such Note"));
    }

    #[test]
    fn document_wins_over_attachment_with_same_stem() {
        let mut parts = ContextParts::with_documents(&["docs/guides/diagram.md"]);
        parts.attachments.push("diagram.png".to_string());
        let (doc_out, _, _) = rewrite(&parts, "[[diagram]]");
        assert_eq!(doc_out, "[diagram](guides/diagram)");
        let (att_out, _, _) = rewrite(&parts, "![[diagram.png]]");
        assert_eq!(att_out, "![](/assets/diagram_standard.png)");
    }
}
