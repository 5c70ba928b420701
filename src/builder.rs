//! Append-only Markdown accumulator
//!
//! [`MarkdownBuilder`] collects emitted chunks, tracks the running list
//! indentation and suppresses runs of blank lines while the tree walker
//! emits blocks. Every `add*` method returns `&mut Self` so calls chain.
//!
//! ```rust
//! use llm_markdown_converter::builder::MarkdownBuilder;
//!
//! let mut builder = MarkdownBuilder::new();
//! builder.add_heading(1, "Title").add_paragraph("Body text.");
//! assert_eq!(builder.build(true), "# Title\n\nBody text.");
//! ```

/// Column at which [`MarkdownBuilder::add_paragraph`] wraps
pub const WRAP_WIDTH: usize = 80;

/// Default step used by [`MarkdownBuilder::indent`] and [`MarkdownBuilder::outdent`]
pub const INDENT_STEP: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct MarkdownBuilder {
    chunks: Vec<String>,
    indent_level: usize,
    last_was_blank: bool,
    // Consecutive '\n' at the end of the emitted text
    trailing_newlines: usize,
    len: usize,
}

impl MarkdownBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, chunk: String) {
        if chunk.is_empty() {
            return;
        }
        let trailing = chunk.bytes().rev().take_while(|b| *b == b'\n').count();
        if trailing == chunk.len() {
            self.trailing_newlines += trailing;
        } else {
            self.trailing_newlines = trailing;
        }
        self.len += chunk.len();
        self.chunks.push(chunk);
    }

    fn indent_str(&self) -> String {
        " ".repeat(self.indent_level)
    }

    /// Append raw text verbatim; the empty string is a no-op
    pub fn add(&mut self, text: &str) -> &mut Self {
        if text.is_empty() {
            return self;
        }
        self.push(text.to_string());
        self.last_was_blank = false;
        self
    }

    /// Append the current indent, `text` and a newline
    pub fn add_line(&mut self, text: &str) -> &mut Self {
        let line = format!("{}{}\n", self.indent_str(), text);
        self.push(line);
        self.last_was_blank = false;
        self
    }

    /// Append a bare newline without indentation
    pub fn new_line(&mut self) -> &mut Self {
        self.push("\n".to_string());
        self.last_was_blank = false;
        self
    }

    /// Make sure the output ends in a blank line
    ///
    /// Idempotent while nothing else is emitted in between.
    pub fn add_blank_line(&mut self) -> &mut Self {
        if self.last_was_blank {
            return self;
        }
        let missing = 2 - self.trailing_newlines.min(2);
        if missing > 0 {
            self.push("\n".repeat(missing));
        }
        self.last_was_blank = true;
        self
    }

    pub fn indent(&mut self) -> &mut Self {
        self.indent_by(INDENT_STEP)
    }

    pub fn indent_by(&mut self, n: usize) -> &mut Self {
        self.indent_level += n;
        self
    }

    pub fn outdent(&mut self) -> &mut Self {
        self.outdent_by(INDENT_STEP)
    }

    /// Decrease the indent, flooring at zero
    pub fn outdent_by(&mut self, n: usize) -> &mut Self {
        self.indent_level = self.indent_level.saturating_sub(n);
        self
    }

    /// ATX heading surrounded by blank lines; `level` is clamped to 1..=6
    pub fn add_heading(&mut self, level: usize, text: &str) -> &mut Self {
        let level = level.clamp(1, 6);
        self.add_blank_line();
        self.add_line(&format!("{} {}", "#".repeat(level), text));
        self.add_blank_line()
    }

    /// Word-wrapped paragraph surrounded by blank lines
    ///
    /// Existing line breaks are kept. Words longer than the wrap width are
    /// never split.
    pub fn add_paragraph(&mut self, text: &str) -> &mut Self {
        if text.trim().is_empty() {
            return self;
        }
        let wrapped = text
            .split('\n')
            .map(wrap_line)
            .collect::<Vec<_>>()
            .join("\n");
        self.add_blank_line();
        self.add_line(&wrapped);
        self.add_blank_line()
    }

    /// Fenced code block; the language suffix is omitted when absent
    ///
    /// The fence is at least three backticks and always longer than any
    /// backtick run inside `code`.
    pub fn add_code_block(&mut self, code: &str, language: Option<&str>) -> &mut Self {
        let fence = "`".repeat((longest_backtick_run(code) + 1).max(3));
        self.add_blank_line();
        self.push(format!("{fence}{}\n", language.unwrap_or("")));
        self.push(code.to_string());
        self.push(format!("\n{fence}\n"));
        self.last_was_blank = false;
        self.add_blank_line()
    }

    /// Prefix every line with `> `; empty lines become a bare `>`
    pub fn add_blockquote(&mut self, text: &str) -> &mut Self {
        if text.is_empty() {
            return self;
        }
        self.add_blank_line();
        for line in text.split('\n') {
            if line.is_empty() {
                self.push(">\n".to_string());
            } else {
                self.push(format!("> {line}\n"));
            }
        }
        self.last_was_blank = false;
        self.add_blank_line()
    }

    /// `{indent}- text` or `{indent}N. text`
    pub fn add_list_item(&mut self, text: &str, ordered: bool, number: usize) -> &mut Self {
        let marker = if ordered {
            format!("{number}.")
        } else {
            "-".to_string()
        };
        let line = format!("{}{} {}\n", self.indent_str(), marker, text);
        self.push(line);
        self.last_was_blank = false;
        self
    }

    /// Join all chunks; with `normalize`, tidy line endings and blank lines
    ///
    /// Does not change the builder, so it can be called repeatedly.
    pub fn build(&self, normalize: bool) -> String {
        let joined = self.chunks.concat();
        if !normalize {
            return joined;
        }

        let unified = joined.replace("\r\n", "\n");
        let mut output = String::with_capacity(unified.len());
        let mut newline_run = 0;
        for (i, line) in unified.split('\n').enumerate() {
            if i > 0 {
                newline_run += 1;
                if newline_run <= 2 {
                    output.push('\n');
                }
            }
            let line = line.trim_end();
            if !line.is_empty() {
                newline_run = 0;
                output.push_str(line);
            }
        }

        output.trim().to_string()
    }

    pub fn indent_level(&self) -> usize {
        self.indent_level
    }

    /// Byte length of everything emitted so far
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn last_was_blank(&self) -> bool {
        self.last_was_blank
    }

    /// True when the output is empty or ends with a newline
    pub fn at_line_start(&self) -> bool {
        self.len == 0 || self.trailing_newlines > 0
    }
}

/// Length of the longest run of consecutive backticks in `text`
pub fn longest_backtick_run(text: &str) -> usize {
    let mut longest = 0;
    let mut run = 0;
    for c in text.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    longest
}

/// Greedy word wrap of a single line at [`WRAP_WIDTH`]
fn wrap_line(line: &str) -> String {
    let mut output = String::with_capacity(line.len());
    let mut width = 0;
    for word in line.split_whitespace() {
        let word_width = word.chars().count();
        if width > 0 && width + 1 + word_width > WRAP_WIDTH {
            output.push('\n');
            width = 0;
        } else if width > 0 {
            output.push(' ');
            width += 1;
        }
        output.push_str(word);
        width += word_width;
    }
    output
}
