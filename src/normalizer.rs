//! Post-pass string normalization of the built Markdown
//!
//! Three independent passes:
//!
//! - [`normalize_whitespace`]: collapse spacing, cap blank lines, tidy
//!   punctuation spacing and trim lines (list lines keep their indent)
//! - [`normalize_unicode`]: drop invisible characters and fold typographic
//!   quotes, dashes, ellipses and spaces to ASCII
//! - [`fix_common_issues`]: sentence spacing, repeated punctuation, spacing
//!   inside quotes and parentheses
//!
//! Markdown whose bytes matter (fenced code blocks, images, links and inline
//! code) is swapped out for placeholder tokens before a pass runs and swapped
//! back afterwards, so none of the rewrites reach into URLs or code.
//!
//! ```rust
//! use llm_markdown_converter::normalizer::normalize_whitespace;
//!
//! let text = "Some   text ,with  [a  link](http://x.com/a,b)";
//! assert_eq!(normalize_whitespace(text), "Some text, with [a  link](http://x.com/a,b)");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

// Placeholder delimiters from the Unicode private use area
const OPEN: char = '\u{E000}';
const CLOSE: char = '\u{E001}';

static IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"!\[(?:\\.|[^\]\\\n])*\]\((?:[^()\s]|\([^()\s]*\))*(?:[ \t]+"(?:\\.|[^"\\\n])*")?\)"#)
        .expect("IMAGE should compile")
});
static LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\[(?:\\.|[^\]\\\n])*\]\((?:[^()\s]|\([^()\s]*\))*(?:[ \t]+"(?:\\.|[^"\\\n])*")?\)"#)
        .expect("LINK should compile")
});
static SPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^ \t\n])[ \t]+").expect("SPACE_RUN should compile"));
static NEWLINE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("NEWLINE_RUN should compile"));
static SPACE_BEFORE_PUNCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+([,.;!?])").expect("SPACE_BEFORE_PUNCT should compile"));
static PUNCT_BEFORE_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([,.;!?])([A-Za-z])").expect("PUNCT_BEFORE_LETTER should compile"));
static LIST_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]*(?:[-*+]|\d+\.)[ \t]").expect("LIST_LINE should compile"));
static SENTENCE_CAPITAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([.!?])([A-Z])").expect("SENTENCE_CAPITAL should compile"));
static LONG_DOTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.{4,}").expect("LONG_DOTS should compile"));
static REPEATED_BANG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!{2,}").expect("REPEATED_BANG should compile"));
static REPEATED_QUESTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\?{2,}").expect("REPEATED_QUESTION should compile"));
static OPEN_PAREN_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([ \t]+").expect("OPEN_PAREN_SPACE should compile"));
static CLOSE_PAREN_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+\)").expect("CLOSE_PAREN_SPACE should compile"));

/// Which spans to take out of the text before a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Protect {
    CodeBlocks,
    All,
}

/// Text with protected spans swapped out for placeholders
struct Protected {
    text: String,
    spans: Vec<String>,
}

impl Protected {
    fn new(input: &str, scope: Protect) -> Self {
        let mut protected = Protected {
            text: String::new(),
            spans: Vec::new(),
        };
        let text = protected.take_delimiters(input);
        let mut text = protected.take_code_blocks(&text);
        if scope == Protect::All {
            text = protected.take_regex(&IMAGE, &text);
            text = protected.take_regex(&LINK, &text);
            text = protected.take_inline_code(&text);
        }
        protected.text = text;
        protected
    }

    fn placeholder(&mut self, span: &str) -> String {
        let token = format!("{OPEN}{}{CLOSE}", self.spans.len());
        self.spans.push(span.to_string());
        token
    }

    /// Placeholder delimiters already present in the input
    ///
    /// Every other `OPEN` left in the text then starts a placeholder.
    fn take_delimiters(&mut self, input: &str) -> String {
        if !input.contains([OPEN, CLOSE]) {
            return input.to_string();
        }
        let mut output = String::with_capacity(input.len());
        for c in input.chars() {
            if c == OPEN || c == CLOSE {
                let token = self.placeholder(c.encode_utf8(&mut [0; 4]));
                output.push_str(&token);
            } else {
                output.push(c);
            }
        }
        output
    }

    /// Fenced blocks, found line by line from an opening fence to a bare
    /// fence at least as long
    fn take_code_blocks(&mut self, input: &str) -> String {
        let mut output = String::with_capacity(input.len());
        let mut block: Option<(String, usize)> = None;

        for line in input.split_inclusive('\n') {
            let fence = fence_width(line.trim_start());
            match block.as_mut() {
                Some((current, opener)) => {
                    current.push_str(line);
                    let bare = line.trim().chars().all(|c| c == '`');
                    if bare && fence >= *opener {
                        let (body, newline) = match current.strip_suffix('\n') {
                            Some(body) => (body.to_string(), "\n"),
                            None => (current.clone(), ""),
                        };
                        let token = self.placeholder(&body);
                        output.push_str(&token);
                        output.push_str(newline);
                        block = None;
                    }
                }
                None if fence >= 3 => block = Some((line.to_string(), fence)),
                None => output.push_str(line),
            }
        }

        // Unclosed fence: leave the text alone
        if let Some((rest, _)) = block {
            output.push_str(&rest);
        }
        output
    }

    fn take_regex(&mut self, pattern: &Regex, input: &str) -> String {
        let mut output = String::with_capacity(input.len());
        let mut last = 0;
        for found in pattern.find_iter(input) {
            output.push_str(&input[last..found.start()]);
            let token = self.placeholder(found.as_str());
            output.push_str(&token);
            last = found.end();
        }
        output.push_str(&input[last..]);
        output
    }

    /// Backtick spans closed by a run of the same length
    fn take_inline_code(&mut self, input: &str) -> String {
        let bytes = input.as_bytes();
        let mut output = String::with_capacity(input.len());
        let mut last = 0;
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] != b'`' {
                i += 1;
                continue;
            }
            let start = i;
            while i < bytes.len() && bytes[i] == b'`' {
                i += 1;
            }
            let run = i - start;

            let mut j = i;
            let mut close = None;
            while j < bytes.len() {
                if bytes[j] == b'`' {
                    let run_start = j;
                    while j < bytes.len() && bytes[j] == b'`' {
                        j += 1;
                    }
                    if j - run_start == run {
                        close = Some(j);
                        break;
                    }
                } else {
                    j += 1;
                }
            }

            if let Some(end) = close {
                output.push_str(&input[last..start]);
                let token = self.placeholder(&input[start..end]);
                output.push_str(&token);
                last = end;
                i = end;
            }
        }

        output.push_str(&input[last..]);
        output
    }

    /// Put the spans back in one scan over the text
    fn restore(&self, text: &str) -> String {
        let mut output = String::with_capacity(text.len());
        self.expand(text, &mut output);
        output
    }

    // A span only holds placeholders created before it, so this terminates
    fn expand(&self, text: &str, output: &mut String) {
        let mut rest = text;
        while let Some(start) = rest.find(OPEN) {
            output.push_str(&rest[..start]);
            let after = &rest[start + OPEN.len_utf8()..];
            let span = after.find(CLOSE).and_then(|end| {
                let index = after[..end].parse::<usize>().ok()?;
                Some((self.spans.get(index)?, end))
            });
            match span {
                Some((span, end)) => {
                    if span.starts_with(OPEN) || span.starts_with(CLOSE) {
                        output.push_str(span);
                    } else {
                        self.expand(span, output);
                    }
                    rest = &after[end + CLOSE.len_utf8()..];
                }
                None => {
                    output.push(OPEN);
                    rest = after;
                }
            }
        }
        output.push_str(rest);
    }
}

/// Length of the backtick run opening `line`
fn fence_width(line: &str) -> usize {
    line.bytes().take_while(|b| *b == b'`').count()
}

fn is_list_line(line: &str) -> bool {
    LIST_LINE.is_match(line)
}

/// Collapse spacing and tidy punctuation outside protected spans
pub fn normalize_whitespace(input: &str) -> String {
    let protected = Protected::new(input, Protect::All);

    let text = SPACE_RUN.replace_all(&protected.text, "$1 ");
    let text = NEWLINE_RUN.replace_all(&text, "\n\n");
    let text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1");
    let text = PUNCT_BEFORE_LETTER.replace_all(&text, "$1 $2");

    let joined = text
        .split('\n')
        .map(|line| {
            if is_list_line(line) {
                line.trim_end()
            } else {
                line.trim()
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    let text = protected.restore(&joined);

    let text = text.trim_end().trim_start_matches(['\n', '\r']);
    let first_line = text.split('\n').next().unwrap_or("");
    if is_list_line(first_line) {
        text.to_string()
    } else {
        text.trim_start().to_string()
    }
}

/// Drop invisible characters and fold typographic punctuation to ASCII
pub fn normalize_unicode(input: &str) -> String {
    let protected = Protected::new(input, Protect::CodeBlocks);
    let mut output = String::with_capacity(protected.text.len());

    for c in protected.text.chars() {
        match c {
            '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}' => {}
            '\n' | '\t' => output.push(c),
            '\u{0000}'..='\u{001F}' | '\u{007F}'..='\u{009F}' => {}
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' => output.push('"'),
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' => output.push('\''),
            '\u{2010}'..='\u{2015}' | '\u{2212}' | '\u{FE58}' | '\u{FE63}' | '\u{FF0D}' => {
                output.push('-')
            }
            '\u{2026}' => output.push_str("..."),
            '\u{00A0}' | '\u{2000}'..='\u{200A}' | '\u{202F}' | '\u{205F}' | '\u{3000}' => {
                output.push(' ')
            }
            _ => output.push(c),
        }
    }

    protected.restore(&output)
}

/// Trim inside each pair of double quotes and space a closing quote from a
/// following word character. An unpaired trailing quote is left alone.
fn fix_quotes(line: &str) -> String {
    let quote_count = line.matches('"').count();
    let paired = quote_count - quote_count % 2;
    if paired == 0 {
        return line.to_string();
    }

    let chars: Vec<char> = line.chars().collect();
    let mut output = String::with_capacity(line.len());
    let mut seen = 0;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c != '"' || seen >= paired {
            output.push(c);
            i += 1;
            continue;
        }

        seen += 1;
        if seen % 2 == 1 {
            output.push('"');
            i += 1;
            while i < chars.len() && (chars[i] == ' ' || chars[i] == '\t') {
                i += 1;
            }
        } else {
            while output.ends_with([' ', '\t']) {
                output.pop();
            }
            output.push('"');
            i += 1;
            if chars
                .get(i)
                .is_some_and(|next| next.is_alphanumeric() || *next == '_')
            {
                output.push(' ');
            }
        }
    }

    output
}

/// Sentence spacing, repeated punctuation, quote and parenthesis spacing
pub fn fix_common_issues(input: &str) -> String {
    let protected = Protected::new(input, Protect::All);

    let text = SENTENCE_CAPITAL.replace_all(&protected.text, "$1 $2");
    let text = LONG_DOTS.replace_all(&text, "...");
    let text = REPEATED_BANG.replace_all(&text, "!");
    let text = REPEATED_QUESTION.replace_all(&text, "?");
    let text = OPEN_PAREN_SPACE.replace_all(&text, "(");
    let text = CLOSE_PAREN_SPACE.replace_all(&text, ")");

    let text = text
        .split('\n')
        .map(|line| fix_quotes(line).trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n");

    protected.restore(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_collapses_spaces_but_keeps_indent() {
        assert_eq!(
            normalize_whitespace("- a\n  - b   c\n    1.  d"),
            "- a\n  - b c\n    1. d"
        );
    }

    #[test]
    fn test_caps_blank_lines() {
        assert_eq!(normalize_whitespace("a\n\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_punctuation_spacing() {
        assert_eq!(
            normalize_whitespace("Hello , world .Next;then"),
            "Hello, world. Next; then"
        );
    }

    #[test]
    fn test_non_list_lines_trimmed() {
        assert_eq!(normalize_whitespace("   text   \n  more"), "text\nmore");
    }

    #[test]
    fn test_protects_links_images_and_code() {
        let input = "see  [a ,b](http://x.com/?a=1,b=2)  and ![i  .](/p.png \"t ,x\") with `a  ,b`";
        assert_eq!(
            normalize_whitespace(input),
            "see [a ,b](http://x.com/?a=1,b=2) and ![i  .](/p.png \"t ,x\") with `a  ,b`"
        );
    }

    #[test]
    fn test_protects_fenced_code() {
        let input = "Intro  text\n\n```rust\nfn  main() {\n\n\n\n    x ,y\n}\n```\n\nAfter";
        assert_eq!(
            normalize_whitespace(input),
            "Intro text\n\n```rust\nfn  main() {\n\n\n\n    x ,y\n}\n```\n\nAfter"
        );
    }

    #[test]
    fn test_private_use_delimiters_in_input_are_kept() {
        let input = "literal \u{E000}0\u{E001} then [a](http://x.com)";
        assert_eq!(normalize_whitespace(input), input);
        assert_eq!(fix_common_issues(input), input);

        let stray = "a \u{E001}\u{E000}7 [b  c](/u) `x  y` \u{E000}";
        assert_eq!(normalize_whitespace(stray), stray);
    }

    #[test]
    fn test_long_fence_is_closed_only_by_a_long_fence() {
        let input = "````\n```\nx  ,y\n```\n````\n\nAfter  text";
        assert_eq!(
            normalize_whitespace(input),
            "````\n```\nx  ,y\n```\n````\n\nAfter text"
        );
    }

    #[test]
    fn test_fence_with_info_string_does_not_close() {
        let input = "```\na  b\n```rust\nc  d\n```";
        assert_eq!(normalize_whitespace(input), input);
    }

    #[test]
    fn test_unicode_cleanup() {
        assert_eq!(
            normalize_unicode("\u{FEFF}a\u{200B}b \u{201C}q\u{201D} \u{2018}s\u{2019} x\u{2014}y\u{2026}\u{00A0}z\u{0007}"),
            "ab \"q\" 's' x-y... z"
        );
    }

    #[test]
    fn test_unicode_keeps_newlines_and_tabs() {
        assert_eq!(normalize_unicode("a\n\tb\r"), "a\n\tb");
    }

    #[test]
    fn test_unicode_leaves_code_blocks() {
        let input = "\u{201C}x\u{201D}\n```\nlet s = \u{201C}x\u{201D};\n```";
        assert_eq!(
            normalize_unicode(input),
            "\"x\"\n```\nlet s = \u{201C}x\u{201D};\n```"
        );
    }

    #[test]
    fn test_common_issues() {
        assert_eq!(fix_common_issues("End.Start"), "End. Start");
        assert_eq!(fix_common_issues("wait....."), "wait...");
        assert_eq!(fix_common_issues("what?!!"), "what?!");
        assert_eq!(fix_common_issues("no!!! why???"), "no! why?");
        assert_eq!(fix_common_issues("( inside )"), "(inside)");
        assert_eq!(fix_common_issues("trailing   \nx"), "trailing\nx");
    }

    #[test]
    fn test_quote_spacing() {
        assert_eq!(
            fix_common_issues("He said \" hello \"and left"),
            "He said \"hello\" and left"
        );
        assert_eq!(fix_common_issues("\"a\" \"b\""), "\"a\" \"b\"");
        assert_eq!(fix_common_issues("a \"b"), "a \"b");
    }

    #[test]
    fn test_common_issues_leave_urls_alone() {
        let input = "[Docs](https://x.com/A.B?q=1!!) and `a.B`";
        assert_eq!(fix_common_issues(input), input);
    }

    proptest! {
        #[test]
        fn prop_protected_spans_survive_whitespace_normalization(
            text in "[a-z]{1,5}( {1,3}[a-z,.]{1,5}){0,3}",
            url in "/[a-z]{1,8}",
            code in "[a-z ,.]{1,12}",
            outside in "[a-z]{1,5}",
        ) {
            let link = format!("[{text}]({url})");
            let span = format!("`{code}`");
            let input = format!("{outside}   {link}   {span}    {outside}");
            let output = normalize_whitespace(&input);

            prop_assert_eq!(output, format!("{outside} {link} {span} {outside}"));
        }
    }
}
