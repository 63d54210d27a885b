//! # Result Rendering
//!
//! Turns a [`ResultSet`] into plain aligned text, the way `psql` would
//! print it, so it can be piped into a pager.
//!
//! Every column is padded to its widest cell. `max_width` caps that
//! padding; cells wider than the cap are cut and marked with `~`.

use std::fmt::Write;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::core::source::ResultSet;

/// Column width cap used for the configuration listing.
pub const CONFIG_COLUMN_WIDTH: usize = 512;

const COLUMN_GAP: &str = "  ";

/// Header line written before the configuration listing.
pub const CONFIG_HEADER: &str = "PostgreSQL configuration:";

/// Render `result` as aligned text with a header row and a dash rule.
pub fn render_table(result: &ResultSet, max_width: usize) -> String {
    let max_width = max_width.max(1);
    let widths = column_widths(result, max_width);
    let mut out = String::new();

    push_row(&mut out, &result.columns, &widths, max_width);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut out, &rule, &widths, max_width);
    for row in &result.rows {
        push_row(&mut out, row, &widths, max_width);
    }

    out
}

/// Render the pager content for the configuration listing.
pub fn render_config(result: &ResultSet) -> String {
    let mut buf = String::new();
    // writeln! into a String cannot fail
    let _ = writeln!(buf, "{CONFIG_HEADER}");
    buf.push_str(&render_table(result, CONFIG_COLUMN_WIDTH));
    buf
}

fn column_widths(result: &ResultSet, max_width: usize) -> Vec<usize> {
    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.width()).collect();
    for row in &result.rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.width());
            }
        }
    }
    widths.into_iter().map(|w| w.min(max_width)).collect()
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize], max_width: usize) {
    let mut line = String::new();
    for (i, width) in widths.iter().enumerate() {
        if i > 0 {
            line.push_str(COLUMN_GAP);
        }
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        let cell = fit(cell, max_width);
        let pad = width.saturating_sub(cell.width());
        line.push_str(&cell);
        line.extend(std::iter::repeat_n(' ', pad));
    }
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Cut `cell` to `max_width` display columns, ending in `~` when cut.
fn fit(cell: &str, max_width: usize) -> String {
    // Multi-line values would break the table layout
    let cell = cell.replace('\n', " ");
    if cell.width() <= max_width {
        return cell;
    }

    let mut fitted = String::new();
    let mut used = 0;
    for ch in cell.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > max_width - 1 {
            break;
        }
        fitted.push(ch);
        used += w;
    }
    fitted.push('~');
    fitted
}
