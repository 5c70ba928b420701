//! Tables: GFM pipe tables, with a label/value list fallback for wide tables

use crate::builder::MarkdownBuilder;
use crate::converters::inline::render_children;
use crate::converters::{LinkTracker, tidy_inline};
use crate::dom::{Document, NodeId};

/// Widest table still emitted as a pipe table
pub const MAX_PIPE_TABLE_COLUMNS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Inline Markdown on a single line
    pub text: String,
    pub is_header: bool,
}

/// Collect rows: `thead` first, then `tbody`, `tfoot` and direct `tr`
pub fn collect_rows(
    doc: &Document,
    table: NodeId,
    tracker: &mut dyn LinkTracker,
) -> Vec<Vec<Cell>> {
    let mut header_rows = Vec::new();
    let mut body_rows = Vec::new();

    for section in doc.element_children(table) {
        match doc.tag_name(section) {
            Some("thead") => header_rows.extend(row_children(doc, section)),
            Some("tbody" | "tfoot") => body_rows.extend(row_children(doc, section)),
            Some("tr") => body_rows.push(section),
            _ => {}
        }
    }

    let mut rows = Vec::with_capacity(header_rows.len() + body_rows.len());
    for row in header_rows {
        rows.push(collect_cells(doc, row, true, tracker));
    }
    for row in body_rows {
        rows.push(collect_cells(doc, row, false, tracker));
    }
    rows.retain(|row| !row.is_empty());
    rows
}

fn row_children(doc: &Document, section: NodeId) -> Vec<NodeId> {
    doc.element_children(section)
        .filter(|child| doc.tag_name(*child) == Some("tr"))
        .collect()
}

fn collect_cells(
    doc: &Document,
    row: NodeId,
    in_thead: bool,
    tracker: &mut dyn LinkTracker,
) -> Vec<Cell> {
    doc.element_children(row)
        .filter(|cell| doc.has_tag(*cell, &["td", "th"]))
        .map(|cell| {
            let mut raw = String::new();
            render_children(doc, cell, tracker, &mut raw);
            Cell {
                text: tidy_inline(&raw).replace('\n', " "),
                is_header: in_thead || doc.tag_name(cell) == Some("th"),
            }
        })
        .collect()
}

/// `table`: pipe table up to five columns, list fallback beyond
pub fn convert_table(
    doc: &Document,
    node: NodeId,
    builder: &mut MarkdownBuilder,
    tracker: &mut dyn LinkTracker,
) {
    let rows = collect_rows(doc, node, tracker);
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if width == 0 {
        return;
    }
    if width > MAX_PIPE_TABLE_COLUMNS {
        emit_list(&rows, builder);
        return;
    }
    emit_pipe_table(&rows, width, builder);
}

/// `table` forced into the label/value list form
pub fn convert_table_as_list(
    doc: &Document,
    node: NodeId,
    builder: &mut MarkdownBuilder,
    tracker: &mut dyn LinkTracker,
) {
    let rows = collect_rows(doc, node, tracker);
    if rows.is_empty() {
        return;
    }
    emit_list(&rows, builder);
}

fn escape_pipes(text: &str) -> String {
    text.replace('|', "\\|")
}

fn pipe_row(cells: impl Iterator<Item = String>) -> String {
    let mut line = String::from("|");
    for cell in cells {
        line.push(' ');
        line.push_str(&cell);
        line.push_str(" |");
    }
    line
}

/// The first row is the header row, whether or not it was marked up as one
fn emit_pipe_table(rows: &[Vec<Cell>], width: usize, builder: &mut MarkdownBuilder) {
    builder.add_blank_line();
    for (index, row) in rows.iter().enumerate() {
        let cells = (0..width).map(|col| {
            row.get(col)
                .map(|cell| escape_pipes(&cell.text))
                .unwrap_or_default()
        });
        builder.add_line(&pipe_row(cells));
        if index == 0 {
            builder.add_line(&pipe_row((0..width).map(|_| "---".to_string())));
        }
    }
    builder.add_blank_line();
}

fn emit_list(rows: &[Vec<Cell>], builder: &mut MarkdownBuilder) {
    let (headers, data) = match rows.split_first() {
        Some((first, rest)) if first.iter().all(|cell| cell.is_header) => {
            (Some(first.as_slice()), rest)
        }
        _ => (None, rows),
    };

    builder.add_blank_line();
    for (index, row) in data.iter().enumerate() {
        builder.add_list_item(&format!("Row {}:", index + 1), false, 1);
        builder.indent();
        for (col, cell) in row.iter().enumerate() {
            if cell.text.is_empty() {
                continue;
            }
            let label = headers
                .and_then(|headers| headers.get(col))
                .map(|header| header.text.clone())
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| format!("Column {}", col + 1));
            builder.add_list_item(&format!("{}: {}", label, cell.text), false, 1);
        }
        builder.outdent();
    }
    builder.add_blank_line();
}
