//! Inline code spans and fenced code blocks

use once_cell::sync::Lazy;
use regex::Regex;

use crate::builder::{longest_backtick_run, MarkdownBuilder};
use crate::dom::{Document, NodeId};

/// Class patterns that carry a language hint, tried in order
static LANGUAGE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"language-(\w+)",
        r"lang-(\w+)",
        r"highlight-(\w+)",
        r"brush:\s*(\w+)",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Language names recognised as bare class tokens
const KNOWN_LANGUAGES: &[&str] = &[
    "bash", "c", "cpp", "csharp", "css", "dart", "diff", "elixir", "go", "graphql", "haskell",
    "html", "java", "javascript", "json", "kotlin", "lua", "markdown", "perl", "php", "powershell",
    "python", "r", "ruby", "rust", "scala", "scss", "shell", "sql", "swift", "toml", "typescript",
    "xml", "yaml", "js", "ts", "py", "rb", "rs", "cs", "yml", "md", "sh",
];

/// Map a short alias to its canonical language name
pub fn normalize_language(lang: &str) -> String {
    let lower = lang.to_ascii_lowercase();
    let canonical = match lower.as_str() {
        "js" => "javascript",
        "ts" => "typescript",
        "py" => "python",
        "rb" => "ruby",
        "rs" => "rust",
        "cs" => "csharp",
        "yml" => "yaml",
        "md" => "markdown",
        "sh" => "bash",
        other => other,
    };
    canonical.to_string()
}

/// Detect a language hint from a class attribute value
///
/// ```
/// use llm_markdown_converter::converters::code::detect_language;
///
/// assert_eq!(detect_language("language-js").as_deref(), Some("javascript"));
/// assert_eq!(detect_language("brush: py").as_deref(), Some("python"));
/// assert_eq!(detect_language("source rust").as_deref(), Some("rust"));
/// assert_eq!(detect_language("javascripty"), None);
/// ```
pub fn detect_language(class: &str) -> Option<String> {
    for pattern in LANGUAGE_PATTERNS.iter() {
        if let Some(found) = pattern.captures(class).and_then(|caps| caps.get(1)) {
            return Some(normalize_language(found.as_str()));
        }
    }

    // Whole tokens only, so "javascripty" or "scss-module" style substrings
    // never match a shorter name
    class
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .map(str::to_ascii_lowercase)
        .find(|token| KNOWN_LANGUAGES.contains(&token.as_str()))
        .map(|token| normalize_language(&token))
}

/// Wrap `text` in a backtick fence one longer than its longest backtick run
///
/// A side that starts or ends with a backtick gets a padding space.
///
/// ```
/// use llm_markdown_converter::converters::code::inline_code_span;
///
/// assert_eq!(inline_code_span("x = 1"), "`x = 1`");
/// assert_eq!(inline_code_span("a ` b"), "``a ` b``");
/// assert_eq!(inline_code_span("`tick"), "`` `tick``");
/// ```
pub fn inline_code_span(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let fence = "`".repeat(longest_backtick_run(text) + 1);
    let lead = if text.starts_with('`') { " " } else { "" };
    let trail = if text.ends_with('`') { " " } else { "" };
    format!("{fence}{lead}{text}{trail}{fence}")
}

/// Standalone `code` element: emit an inline span of its raw text
pub fn convert_code(doc: &Document, node: NodeId, builder: &mut MarkdownBuilder) {
    builder.add(&inline_code_span(&doc.text_content(node)));
}

/// `pre` element: emit a fenced block
///
/// A nested `code` element's text and class take priority over the `pre`'s
/// own. Blank blocks are dropped.
pub fn convert_pre(doc: &Document, node: NodeId, builder: &mut MarkdownBuilder) {
    let code = doc.query_selector(node, "code");

    let text = match code {
        Some(code) => doc.text_content(code),
        None => doc.text_content(node),
    };
    if text.trim().is_empty() {
        return;
    }

    let class = code
        .and_then(|code| doc.get_attribute(code, "class"))
        .or_else(|| doc.get_attribute(node, "class"))
        .unwrap_or("");
    let language = detect_language(class);

    let body = text.strip_prefix('\n').unwrap_or(&text);
    let body = body.trim_end_matches(['\n', '\r']);
    builder.add_code_block(body, language.as_deref());
}
