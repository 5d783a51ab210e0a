//! Relative link path normalization.
//!
//! Standard `[text](path)` links written against the vault layout are
//! rewritten to the site layout: blog category markers are stripped and
//! blog slugs hyphen-split, flatten markers collapse their folder, numeric
//! ordering prefixes disappear outside blogs, a trailing `.md` is dropped,
//! and fragments are lowercased with encoded spaces turned into hyphens.
//! External links (any scheme) and already-absolute paths pass through
//! untouched, as does any path the rules leave unchanged.

use std::sync::LazyLock;

use regex::Regex;

use kilncast_core::config::{KilncastConfig, FLATTEN_MARKER};
use kilncast_core::inventory::layout::strip_ordering_prefix;

static MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!?\[([^\]]*)\]\(([^)]+)\)").expect("markdown link regex"));

static SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:").expect("scheme regex"));

/// True for references that carry a URI scheme (`https:`, `mailto:`, ...).
pub(crate) fn is_external(path: &str) -> bool {
    SCHEME.is_match(path)
}

/// Rewrites every normalizable link on one line.
pub fn rewrite_line(config: &KilncastConfig, line: &str) -> String {
    if !line.contains("](") {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len());
    let mut cursor = 0;
    for caps in MARKDOWN_LINK.captures_iter(line) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };
        // Embeds were handled by asset discovery.
        if whole.as_str().starts_with('!') {
            continue;
        }
        let text = &caps[1];
        let path = caps[2].trim();
        if let Some(normalized) = normalize_link_path(config, path) {
            out.push_str(&line[cursor..whole.start()]);
            out.push_str(&format!("[{text}]({normalized})"));
            cursor = whole.end();
        }
    }
    out.push_str(&line[cursor..]);
    out
}

/// Normalizes one link path, or `None` when it should stay as written.
///
/// A changed path comes back site-absolute with a leading slash; when only
/// the fragment changed the path part is preserved as written.
pub(crate) fn normalize_link_path(config: &KilncastConfig, raw: &str) -> Option<String> {
    if raw.is_empty() || raw.starts_with('/') || is_external(raw) {
        return None;
    }
    if raw.starts_with("./") || raw.starts_with("../") {
        return None;
    }

    let (path, fragment) = match raw.split_once('#') {
        Some((p, f)) => (p, Some(f)),
        None => (raw, None),
    };
    let normalized_fragment = fragment.map(normalize_fragment);
    let fragment_changed = match (fragment, &normalized_fragment) {
        (Some(f), Some(n)) => f != n,
        _ => false,
    };

    if path.is_empty() {
        return fragment_changed
            .then(|| format!("#{}", normalized_fragment.unwrap_or_default()));
    }

    let mut segments: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if segments.is_empty() {
        return None;
    }

    let blog = config.is_blog_dir(&segments[0]);
    if blog {
        segments[0] = config.blog_instance(&segments[0]);
    }

    let flatten_at = segments
        .len()
        .checked_sub(2)
        .filter(|&i| segments[i].ends_with(FLATTEN_MARKER));
    if let Some(i) = flatten_at {
        let folder = segments[i].trim_end_matches(FLATTEN_MARKER).to_string();
        segments.truncate(i);
        if blog {
            segments.extend(hyphen_split(&folder));
        } else {
            segments.push(folder);
        }
    } else {
        let last = segments.len() - 1;
        if let Some(stripped) = segments[last].strip_suffix(".md") {
            segments[last] = stripped.to_string();
        }
        if blog {
            if let Some(final_seg) = segments.pop() {
                segments.extend(hyphen_split(&final_seg));
            }
        }
    }
    if !blog {
        for segment in &mut segments {
            let stripped = strip_ordering_prefix(segment);
            if stripped.len() != segment.len() {
                *segment = stripped.to_string();
            }
        }
    }

    let joined = segments.join("/");
    let path_changed = joined != path;
    if !path_changed && !fragment_changed {
        return None;
    }
    let base = if path_changed {
        format!("/{joined}")
    } else {
        path.to_string()
    };
    Some(match normalized_fragment {
        Some(f) => format!("{base}#{f}"),
        None => base,
    })
}

/// Fragment normalization: lowercase, encoded or literal spaces to hyphens.
pub(crate) fn normalize_fragment(fragment: &str) -> String {
    fragment.to_lowercase().replace("%20", "-").replace(' ', "-")
}

/// Splits a hyphenated slug into path segments.
fn hyphen_split(segment: &str) -> Vec<String> {
    let pieces: Vec<String> = segment
        .split('-')
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    if pieces.is_empty() {
        vec![segment.to_string()]
    } else {
        pieces
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kilncast_core::config::{ConfigFile, ConfigOverrides};

    fn config() -> KilncastConfig {
        let file: ConfigFile = toml::from_str(
            r#"
            [convert]
            main_language = "en"
            "#,
        )
        .unwrap();
        KilncastConfig::from_file(file, ConfigOverrides::default()).unwrap()
    }

    fn normalize(path: &str) -> Option<String> {
        normalize_link_path(&config(), path)
    }

    #[test]
    fn docs_links_strip_prefixes_and_extension() {
        assert_eq!(normalize("02-guide/03-intro.md").as_deref(), Some("/guide/intro"));
    }

    #[test]
    fn blog_links_split_hyphenated_slugs() {
        assert_eq!(
            normalize("posts__blog/2023-01-05-hello.md").as_deref(),
            Some("/posts/2023/01/05/hello")
        );
    }

    #[test]
    fn blog_flatten_folder_replaces_final_segment() {
        assert_eq!(
            normalize("posts__blog/2023-01-my-post+/01-part-one.md").as_deref(),
            Some("/posts/2023/01/my/post")
        );
    }

    #[test]
    fn docs_flatten_folder_replaces_final_segment() {
        assert_eq!(
            normalize("02-guide/05-advanced+/index.md").as_deref(),
            Some("/guide/advanced")
        );
    }

    #[test]
    fn fragments_are_lowercased_and_dehyphenated() {
        assert_eq!(
            normalize("02-guide/intro.md#My%20Heading").as_deref(),
            Some("/guide/intro#my-heading")
        );
        assert_eq!(normalize("#Top%20Section").as_deref(), Some("#top-section"));
    }

    #[test]
    fn unchanged_paths_stay_as_written() {
        assert_eq!(normalize("guides/a"), None);
        assert_eq!(normalize("guides/a#already-clean"), None);
    }

    #[test]
    fn external_and_absolute_links_pass_through() {
        assert_eq!(normalize("https://example.com/02-x.md"), None);
        assert_eq!(normalize("mailto:a@b.c"), None);
        assert_eq!(normalize("/already/absolute.md"), None);
        assert_eq!(normalize("../sibling.md"), None);
    }

    #[test]
    fn line_rewrite_replaces_only_normalizable_links() {
        let line = "See [x](02-guide/03-intro.md) and [y](https://e.com) here.";
        assert_eq!(
            rewrite_line(&config(), line),
            "See [x](/guide/intro) and [y](https://e.com) here."
        );
    }

    #[test]
    fn image_embeds_are_left_for_asset_discovery() {
        let line = "![alt](02-guide/pic.png)";
        assert_eq!(rewrite_line(&config(), line), line);
    }
}
