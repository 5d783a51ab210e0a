//! Callout and quote block conversion.
//!
//! Obsidian callouts (`> [!warning] title` plus quoted body lines) become
//! Docusaurus admonitions (`:::warning title` fenced blocks). The special
//! type `quote` instead stays a plain blockquote and gains an attribution
//! line built from its title.
//!
//! State is carried across lines by an explicit machine with a pure
//! transition function. Only one block may be open at a time; a second
//! start marker while a block is open is an unsupported-input error rather
//! than a guess at nesting semantics.

use std::sync::LazyLock;

use regex::Regex;

use crate::RewriteError;

static START_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^>(\s*)\[!([A-Za-z0-9_-]+)\]\s*(.*)$").expect("callout regex"));

/// Block the machine is currently inside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockState {
    /// Outside any block.
    Idle,
    /// Inside an admonition; `offset` is the byte distance from line start
    /// to the bracket, stripped off body lines.
    InCallout { offset: usize },
    /// Inside a quote block; `title` becomes the attribution line.
    InQuote { title: Option<String> },
}

/// The callout/quote machine fed one line at a time.
#[derive(Debug)]
pub struct AdmonitionMachine {
    state: BlockState,
}

impl AdmonitionMachine {
    pub fn new() -> Self {
        Self {
            state: BlockState::Idle,
        }
    }

    /// Current state, for tests and diagnostics.
    pub fn state(&self) -> &BlockState {
        &self.state
    }

    /// Feeds one line, returning the lines to emit in its place.
    pub fn feed(&mut self, line: &str, line_no: usize) -> Result<Vec<String>, RewriteError> {
        let (next, emitted) = Self::transition(self.state.clone(), line, line_no)?;
        self.state = next;
        Ok(emitted)
    }

    /// Closes any block left open at end of input.
    pub fn finish(&mut self) -> Vec<String> {
        match std::mem::replace(&mut self.state, BlockState::Idle) {
            BlockState::Idle => Vec::new(),
            BlockState::InCallout { .. } => vec![":::".to_string()],
            BlockState::InQuote { title } => attribution(title.as_deref()),
        }
    }

    /// Pure transition: `(state, line) -> (state, emitted lines)`.
    pub fn transition(
        state: BlockState,
        line: &str,
        line_no: usize,
    ) -> Result<(BlockState, Vec<String>), RewriteError> {
        let marker = START_MARKER.captures(line);
        match state {
            BlockState::Idle => match marker {
                Some(caps) => {
                    let offset = 1 + caps.get(1).map(|m| m.as_str().len()).unwrap_or(0);
                    let kind = caps[2].to_lowercase();
                    let title = caps[3].trim();
                    if kind == "quote" {
                        let title = (!title.is_empty()).then(|| title.to_string());
                        Ok((BlockState::InQuote { title }, Vec::new()))
                    } else {
                        let header = if title.is_empty() {
                            format!(":::{kind}")
                        } else {
                            format!(":::{kind} {title}")
                        };
                        Ok((BlockState::InCallout { offset }, vec![header]))
                    }
                }
                None => Ok((BlockState::Idle, vec![line.to_string()])),
            },
            BlockState::InCallout { offset } => {
                if marker.is_some() {
                    return Err(RewriteError::NestedCallout { line: line_no });
                }
                if line.trim().is_empty() {
                    Ok((BlockState::Idle, vec![":::".to_string()]))
                } else {
                    Ok((
                        BlockState::InCallout { offset },
                        vec![strip_offset(line, offset).to_string()],
                    ))
                }
            }
            BlockState::InQuote { title } => {
                if marker.is_some() {
                    return Err(RewriteError::NestedCallout { line: line_no });
                }
                if line.trim().is_empty() {
                    let mut emitted = attribution(title.as_deref());
                    emitted.push(String::new());
                    Ok((BlockState::Idle, emitted))
                } else {
                    Ok((BlockState::InQuote { title }, vec![line.to_string()]))
                }
            }
        }
    }
}

impl Default for AdmonitionMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Attribution line for a closing quote block.
fn attribution(title: Option<&str>) -> Vec<String> {
    match title {
        Some(title) => vec![format!("> — {title}")],
        None => Vec::new(),
    }
}

/// Removes the quote prefix recorded at block start: the `>` plus up to
/// `offset - 1` following spaces.
fn strip_offset(line: &str, offset: usize) -> &str {
    let Some(mut rest) = line.strip_prefix('>') else {
        return line;
    };
    let mut removed = 1;
    while removed < offset {
        match rest.strip_prefix(' ') {
            Some(r) => {
                rest = r;
                removed += 1;
            }
            None => break,
        }
    }
    rest
}
