//! Target path layout rules.
//!
//! Maps a document's position in the vault to its position in the site
//! tree. Everything here is pure computation over path strings; the rules
//! are:
//!
//! - language suffixes route documents into the `i18n` tree,
//! - numeric ordering prefixes (`NN-`, `NN_`) are stripped outside blog
//!   categories,
//! - hyphenated segments are split into nested path segments inside blog
//!   categories,
//! - a parent folder with a trailing `+` is flattened into its own name,
//!   replacing the file segment,
//! - a `.yml.md` stem collapses back to plain `.yml`.

use std::path::{Path, PathBuf};

use crate::config::{KilncastConfig, FLATTEN_MARKER};
use crate::inventory::record::{split_language, split_name, Category};

/// Docusaurus plugin folder for translated docs.
pub const I18N_DOCS_PLUGIN: &str = "docusaurus-plugin-content-docs";
/// Docusaurus plugin folder prefix for translated blog instances.
pub const I18N_BLOG_PLUGIN: &str = "docusaurus-plugin-content-blog";
/// Version folder inside the docs plugin tree.
pub const I18N_CURRENT_DIR: &str = "current";

/// Computed placement of one document in the site tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetLayout {
    /// Path relative to the site root.
    pub target_rel: PathBuf,
    /// Route other documents use to link here: content-root relative for
    /// docs, instance-rooted for blog posts, `.md` extension dropped.
    pub link_path: String,
}

/// Computes the target layout for a document.
///
/// `rel_in_category` is the path below the category folder, so
/// `docs/guide/intro.md` arrives as `guide/intro.md`.
pub fn target_layout(
    config: &KilncastConfig,
    category: &Category,
    language: &str,
    rel_in_category: &Path,
) -> TargetLayout {
    let blog = category.is_blog();
    let mut segments: Vec<String> = rel_in_category
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    let file_name = segments.pop().unwrap_or_default();
    let (stem, extension) = split_name(&file_name);
    let (clean_stem, _) = split_language(stem);

    // A folder ending in the flatten marker collapses into its own name,
    // which then stands in for the file segment.
    let flattened = match segments.last() {
        Some(parent) if parent.ends_with(FLATTEN_MARKER) => {
            let folder = parent.trim_end_matches(FLATTEN_MARKER).to_string();
            segments.pop();
            Some(folder)
        }
        None => None,
        Some(_) => None,
    };

    let mut out: Vec<String> = Vec::new();
    for segment in &segments {
        push_transformed(&mut out, segment, blog);
    }
    let final_stem = match &flattened {
        Some(folder) => {
            push_transformed(&mut out, folder, blog);
            out.pop().unwrap_or_else(|| folder.clone())
        }
        None => {
            push_transformed(&mut out, clean_stem, blog);
            out.pop().unwrap_or_else(|| clean_stem.to_string())
        }
    };

    let out_file = output_file_name(&final_stem, &extension);
    let (route_stem, _) = split_name(&out_file);
    let route_name = if out_file.ends_with(".md") {
        route_stem.to_string()
    } else {
        out_file.clone()
    };

    let mut content_rel = out;
    let route = {
        let mut parts = content_rel.clone();
        parts.push(route_name);
        parts.join("/")
    };
    content_rel.push(out_file);

    let content_root = content_root(config, category, language);
    let mut target_rel = content_root;
    for part in &content_rel {
        target_rel.push(part);
    }

    let link_path = match category {
        Category::Blog { instance } => format!("{instance}/{route}"),
        _ => route,
    };

    TargetLayout {
        target_rel,
        link_path,
    }
}

/// Content tree root for a category and language.
fn content_root(config: &KilncastConfig, category: &Category, language: &str) -> PathBuf {
    let translated = language != config.main_language;
    match category {
        Category::Docs | Category::Assets => {
            if translated {
                [
                    config.i18n_dir.as_str(),
                    language,
                    I18N_DOCS_PLUGIN,
                    I18N_CURRENT_DIR,
                ]
                .iter()
                .collect()
            } else {
                PathBuf::from(&config.docs_dir)
            }
        }
        Category::Blog { instance } => {
            if translated {
                let plugin = if instance == "blog" {
                    I18N_BLOG_PLUGIN.to_string()
                } else {
                    format!("{I18N_BLOG_PLUGIN}-{instance}")
                };
                [config.i18n_dir.as_str(), language, plugin.as_str()]
                    .iter()
                    .collect()
            } else {
                PathBuf::from(instance)
            }
        }
    }
}

/// Output file name, collapsing `<name>.yml.md` back to `<name>.yml`.
fn output_file_name(final_stem: &str, extension: &str) -> String {
    if extension == "md" {
        if final_stem.ends_with(".yml") {
            return final_stem.to_string();
        }
        return format!("{final_stem}.md");
    }
    if extension.is_empty() {
        final_stem.to_string()
    } else {
        format!("{final_stem}.{extension}")
    }
}

/// Appends the transformed form of one path segment. Blog segments may
/// expand into several nested segments.
fn push_transformed(out: &mut Vec<String>, segment: &str, blog: bool) {
    if blog {
        out.extend(
            segment
                .split('-')
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        );
        if segment.split('-').all(|p| p.is_empty()) {
            out.push(segment.to_string());
        }
    } else {
        out.push(strip_ordering_prefix(segment).to_string());
    }
}

/// Strips one leading `NN-` or `NN_` ordering prefix.
pub fn strip_ordering_prefix(segment: &str) -> &str {
    let digits = segment.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return segment;
    }
    match segment.as_bytes().get(digits) {
        Some(b'-') | Some(b'_') if digits + 1 < segment.len() => &segment[digits + 1..],
        _ => segment,
    }
}
