//! DOM-rewriting pre-pass run before traversal
//!
//! The optimizer fixes structure that would otherwise produce noisy Markdown:
//!
//! 1. **Heading hierarchy**: a heading that jumps more than one level below
//!    its predecessor is demoted (`h1, h3, h5` becomes `h1, h2, h3`)
//! 2. **Redundant formatting**: bold inside headings, a heading's sole
//!    italic child, and directly nested same-kind emphasis are unwrapped
//! 3. **Deep lists**: lists nested beyond the threshold are flattened into
//!    their parent list
//! 4. **Fragmented content**: adjacent text nodes are merged, and a paragraph
//!    continuing the previous one mid-sentence is merged into it
//! 5. **Deep containers**: `div`/`section` wrappers nested beyond the threshold
//!    inside a same-tag parent are unwrapped
//!
//! Passes run in that order and each can be switched off independently.
//!
//! The paragraph merge is a heuristic. A short paragraph without terminal
//! punctuation followed by one that starts lowercase is merged even when the
//! two are unrelated.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dom::{Document, NodeId};

/// Upper bound on unwrap rounds in the container pass
const MAX_CONTAINER_ITERATIONS: usize = 1000;

const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

/// Which passes run, and the nesting threshold they share
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizerConfig {
    pub max_nesting_depth: usize,
    pub normalize_headings: bool,
    pub remove_redundant_formatting: bool,
    pub flatten_deep_nesting: bool,
    pub merge_adjacent_elements: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: 3,
            normalize_headings: true,
            remove_redundant_formatting: true,
            flatten_deep_nesting: true,
            merge_adjacent_elements: true,
        }
    }
}

/// What the optimizer changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationReport {
    pub headings_demoted: usize,
    pub formatting_unwrapped: usize,
    pub lists_flattened: usize,
    pub text_nodes_merged: usize,
    pub paragraphs_merged: usize,
    pub containers_unwrapped: usize,
}

impl OptimizationReport {
    pub fn total(&self) -> usize {
        self.headings_demoted
            + self.formatting_unwrapped
            + self.lists_flattened
            + self.text_nodes_merged
            + self.paragraphs_merged
            + self.containers_unwrapped
    }
}

#[derive(Debug, Clone, Default)]
pub struct StructureOptimizer {
    config: OptimizerConfig,
}

impl StructureOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Run all enabled passes over the subtree rooted at `root`
    pub fn optimize(&self, doc: &mut Document, root: NodeId) -> OptimizationReport {
        let mut report = OptimizationReport::default();

        if self.config.normalize_headings {
            report.headings_demoted = normalize_headings(doc, root);
        }
        if self.config.remove_redundant_formatting {
            report.formatting_unwrapped = remove_redundant_formatting(doc, root);
        }
        if self.config.flatten_deep_nesting {
            report.lists_flattened = flatten_lists(doc, root, self.config.max_nesting_depth);
        }
        if self.config.merge_adjacent_elements {
            report.text_nodes_merged = merge_text_nodes(doc, root);
            report.paragraphs_merged = merge_paragraphs(doc, root);
        }
        if self.config.flatten_deep_nesting {
            report.containers_unwrapped =
                flatten_containers(doc, root, self.config.max_nesting_depth);
        }

        debug!(
            headings_demoted = report.headings_demoted,
            formatting_unwrapped = report.formatting_unwrapped,
            lists_flattened = report.lists_flattened,
            text_nodes_merged = report.text_nodes_merged,
            paragraphs_merged = report.paragraphs_merged,
            containers_unwrapped = report.containers_unwrapped,
            "Structure optimization finished"
        );

        report
    }
}

/// Ancestors of `node` up to and including `root`; empty when `node` is `root`
fn ancestors_within(doc: &Document, node: NodeId, root: NodeId) -> Vec<NodeId> {
    let mut found = Vec::new();
    if node == root {
        return found;
    }
    for ancestor in doc.ancestors(node) {
        found.push(ancestor);
        if ancestor == root {
            break;
        }
    }
    found
}

/// Elements under `root` (inclusive) with one of `tags`, in document order
fn select(doc: &Document, root: NodeId, tags: &[&str]) -> Vec<NodeId> {
    let mut found = Vec::new();
    if doc.has_tag(root, tags) {
        found.push(root);
    }
    found.extend(doc.descendants(root).filter(|node| doc.has_tag(*node, tags)));
    found
}

fn heading_level(doc: &Document, node: NodeId) -> Option<usize> {
    let tag = doc.tag_name(node)?;
    let level = tag.strip_prefix('h')?.parse::<usize>().ok()?;
    (1..=6).contains(&level).then_some(level)
}

/// Demote headings that skip levels; returns the number of rewrites
pub fn normalize_headings(doc: &mut Document, root: NodeId) -> usize {
    let mut last_level = 0;
    let mut demoted = 0;

    for heading in select(doc, root, HEADING_TAGS) {
        let Some(level) = heading_level(doc, heading) else {
            continue;
        };
        if level > last_level + 1 {
            let target = last_level + 1;
            doc.rename_element(heading, &format!("h{target}"));
            last_level = target;
            demoted += 1;
        } else {
            last_level = level;
        }
    }

    demoted
}

fn same_emphasis(a: &str, b: &str) -> bool {
    let bold = |t: &str| t == "strong" || t == "b";
    let italic = |t: &str| t == "em" || t == "i";
    (bold(a) && bold(b)) || (italic(a) && italic(b))
}

/// Unwrap emphasis that adds nothing; returns the number of unwrapped elements
pub fn remove_redundant_formatting(doc: &mut Document, root: NodeId) -> usize {
    let mut unwrapped = 0;

    for heading in select(doc, root, HEADING_TAGS) {
        for bold in select(doc, heading, &["strong", "b"]) {
            if bold != heading {
                doc.unwrap_element(bold);
                unwrapped += 1;
            }
        }

        // Whitespace-only text does not count as a sibling
        let significant: Vec<NodeId> = doc
            .children(heading)
            .into_iter()
            .filter(|child| doc.text(*child).is_none_or(|text| !text.trim().is_empty()))
            .collect();
        if let [only] = significant.as_slice()
            && doc.has_tag(*only, &["em", "i"])
        {
            doc.unwrap_element(*only);
            unwrapped += 1;
        }
    }

    for node in select(doc, root, &["strong", "b", "em", "i"]) {
        if node == root {
            continue;
        }
        let Some(parent) = doc.parent_element(node) else {
            continue;
        };
        let (Some(tag), Some(parent_tag)) = (doc.tag_name(node), doc.tag_name(parent)) else {
            continue;
        };
        if same_emphasis(tag, parent_tag) {
            doc.unwrap_element(node);
            unwrapped += 1;
        }
    }

    unwrapped
}

/// Number of `ul`/`ol` elements from `node` up to `root`, both included
fn list_depth(doc: &Document, node: NodeId, root: NodeId) -> usize {
    let own = usize::from(doc.has_tag(node, &["ul", "ol"]));
    own + ancestors_within(doc, node, root)
        .into_iter()
        .filter(|ancestor| doc.has_tag(*ancestor, &["ul", "ol"]))
        .count()
}

/// Promote items of over-deep lists next to their enclosing `li`
pub fn flatten_lists(doc: &mut Document, root: NodeId, max_depth: usize) -> usize {
    let mut lists: Vec<(usize, NodeId)> = select(doc, root, &["ul", "ol"])
        .into_iter()
        .map(|list| (list_depth(doc, list, root), list))
        .collect();
    // Deepest first; stable so document order breaks ties
    lists.sort_by(|a, b| b.0.cmp(&a.0));

    let mut flattened = 0;
    for (_, list) in lists {
        if list == root || list_depth(doc, list, root) <= max_depth {
            continue;
        }
        // Items move next to the enclosing `li`, which must stay inside the subtree
        let Some(parent_item) = doc
            .parent_element(list)
            .filter(|parent| *parent != root && doc.tag_name(*parent) == Some("li"))
        else {
            continue;
        };

        let items: Vec<NodeId> = doc
            .element_children(list)
            .filter(|child| doc.tag_name(*child) == Some("li"))
            .collect();
        let mut anchor = parent_item;
        for item in items {
            doc.insert_after(anchor, item);
            anchor = item;
        }
        doc.detach(list);
        flattened += 1;
    }

    flattened
}

/// Merge runs of adjacent text nodes, children before parents
pub fn merge_text_nodes(doc: &mut Document, root: NodeId) -> usize {
    // Post-order via reversed pre-order
    let mut order: Vec<NodeId> = vec![root];
    order.extend(doc.descendants(root));
    order.reverse();

    let mut merged = 0;
    for node in order {
        let children = doc.children(node);
        let mut previous_text: Option<NodeId> = None;
        for child in children {
            match (previous_text, doc.text(child).map(str::to_string)) {
                (Some(target), Some(text)) => {
                    let combined = format!("{}{}", doc.text(target).unwrap_or(""), text);
                    doc.set_text(target, combined);
                    doc.detach(child);
                    merged += 1;
                }
                (None, Some(_)) => previous_text = Some(child),
                (_, None) => previous_text = None,
            }
        }
    }

    merged
}

fn ends_with_terminal_punctuation(text: &str) -> bool {
    text.trim_end()
        .ends_with(['.', '!', '?', ':', ';'])
}

fn starts_lowercase(text: &str) -> bool {
    text.trim_start()
        .chars()
        .next()
        .is_some_and(char::is_lowercase)
}

/// Next element sibling of `node` when only whitespace text lies between
fn adjacent_element(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut current = doc.next_sibling(node)?;
    loop {
        if doc.is_element(current) {
            return Some(current);
        }
        match doc.text(current) {
            Some(text) if text.trim().is_empty() => current = doc.next_sibling(current)?,
            _ => return None,
        }
    }
}

/// Merge paragraphs that continue mid-sentence into their predecessor
pub fn merge_paragraphs(doc: &mut Document, root: NodeId) -> usize {
    let mut merged = 0;

    'rescan: loop {
        for first in select(doc, root, &["p"]) {
            // Siblings of the root lie outside the subtree
            if first == root {
                continue;
            }
            let Some(second) = adjacent_element(doc, first) else {
                continue;
            };
            if doc.tag_name(second) != Some("p") {
                continue;
            }

            let first_text = doc.text_content(first);
            if first_text.trim().is_empty()
                || ends_with_terminal_punctuation(&first_text)
                || !starts_lowercase(&doc.text_content(second))
            {
                continue;
            }

            let separator = doc.create_text(" ");
            doc.append_child(first, separator);
            for child in doc.children(second) {
                doc.append_child(first, child);
            }
            doc.detach(second);
            merged += 1;
            continue 'rescan;
        }
        break;
    }

    merged
}

/// Depth of `node` counted in `div`/`section` containers up to `root`, itself included
fn container_depth(doc: &Document, node: NodeId, root: NodeId) -> usize {
    1 + ancestors_within(doc, node, root)
        .into_iter()
        .filter(|ancestor| doc.has_tag(*ancestor, &["div", "section"]))
        .count()
}

/// Unwrap over-deep `div`/`section` nested in a same-tag parent until stable
pub fn flatten_containers(doc: &mut Document, root: NodeId, max_depth: usize) -> usize {
    let mut unwrapped = 0;

    for _ in 0..MAX_CONTAINER_ITERATIONS {
        let candidate = select(doc, root, &["div", "section"])
            .into_iter()
            .filter(|node| *node != root)
            .find(|node| {
                let same_parent = doc
                    .parent_element(*node)
                    .is_some_and(|parent| doc.tag_name(parent) == doc.tag_name(*node));
                same_parent && container_depth(doc, *node, root) > max_depth
            });

        match candidate {
            Some(node) => {
                doc.unwrap_element(node);
                unwrapped += 1;
            }
            None => break,
        }
    }

    unwrapped
}
