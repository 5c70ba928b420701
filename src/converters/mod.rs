//! Element converters
//!
//! One function per HTML tag family. Each reads a node from the arena
//! [`Document`](crate::dom::Document) and emits into a
//! [`MarkdownBuilder`](crate::builder::MarkdownBuilder). Converters hold no
//! state of their own; cross-cutting bookkeeping (link de-duplication, link
//! and image counters) is injected through a [`LinkTracker`].
//!
//! Converters that own their subtree recurse over it, but never deeper than
//! [`MAX_TRAVERSAL_DEPTH`] levels.

pub mod block;
pub mod code;
pub mod inline;
pub mod list;
pub mod table;

/// Depth below which neither the tree walker nor the converters descend
pub const MAX_TRAVERSAL_DEPTH: usize = 80;

/// Tags that flow inside a line of text
pub const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "acronym", "b", "bdi", "bdo", "big", "br", "cite", "code", "data", "del", "dfn",
    "em", "i", "img", "ins", "kbd", "label", "mark", "q", "s", "samp", "small", "span", "strike",
    "strong", "sub", "sup", "time", "tt", "u", "var", "wbr",
];

/// Subtrees that never produce content
pub const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "object", "embed", "applet", "form", "input",
    "button", "select", "textarea", "option", "meta", "link", "base", "head", "title",
];

pub fn is_inline_tag(tag: &str) -> bool {
    INLINE_TAGS.contains(&tag)
}

pub fn is_skipped_tag(tag: &str) -> bool {
    SKIPPED_TAGS.contains(&tag)
}

/// Receives every link and image a converter is about to emit
///
/// The engine's conversion context implements this to de-duplicate links
/// and count what was emitted.
pub trait LinkTracker {
    /// Return `true` to render `url` as a full link, `false` for bare text
    fn track_link(&mut self, url: &str) -> bool;

    /// Called for every image rendered with Markdown image syntax
    fn track_image(&mut self, _src: &str) {}
}

/// Tracker that renders every link and counts nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTracking;

impl LinkTracker for NoTracking {
    fn track_link(&mut self, _url: &str) -> bool {
        true
    }
}

/// Collapse runs of whitespace into single spaces, keeping edge spaces
pub fn collapse_whitespace(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                output.push(' ');
                in_space = true;
            }
        } else {
            output.push(c);
            in_space = false;
        }
    }
    output
}

/// Collapse whitespace within each line and trim the lines
///
/// Line breaks survive; blank lines are dropped.
pub fn tidy_inline(text: &str) -> String {
    text.split('\n')
        .map(|line| collapse_whitespace(line).trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Backslash-escape `[` and `]`; nothing else is escaped
pub fn escape_brackets(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '[' || c == ']' {
            output.push('\\');
        }
        output.push(c);
    }
    output
}
