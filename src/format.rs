//! Text rendering for the terminal.
//!
//! Nothing here feeds back into comparison; it only decides how values look.

use crate::table::Table;

/// Format a one-row, one-column result value for display.
///
/// Order totals are shown as grouped integers, sale prices and margins as
/// currency with two decimals. Anything else, or anything that is not numeric,
/// is returned unchanged.
pub fn format_single_value(column: &str, value: &str) -> String {
    let name = column.to_lowercase().replace('_', " ");

    if name.contains("total order") {
        if let Some(n) = coerce_number(value) {
            return group_thousands(&format!("{}", n.trunc() as i64));
        }
    } else if name.contains("sale price") || name.contains("margin") {
        if let Some(n) = coerce_number(value) {
            return format!("${}", group_thousands(&format!("{:.2}", n)));
        }
    }

    value.to_string()
}

fn coerce_number(value: &str) -> Option<f64> {
    let cleaned: String = value.chars().filter(|c| *c != ',' && *c != '$').collect();
    cleaned.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Insert `,` separators into the integer part of a formatted number.
fn group_thousands(number: &str) -> String {
    let (sign, unsigned) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

/// Render a table as aligned plain text with a 1-based row index.
pub fn render_table(table: &Table) -> String {
    let cells: Vec<Vec<String>> = table
        .rows()
        .iter()
        .map(|row| {
            table
                .columns()
                .iter()
                .map(|c| row.get(c).cloned().unwrap_or_default())
                .collect()
        })
        .collect();
    render_grid(table.columns(), &cells)
}

/// Render a result for people: single values get column-aware formatting.
pub fn display_table(table: &Table) -> String {
    match table.single_cell() {
        Some((column, Some(value))) => {
            render_grid(table.columns(), &[vec![format_single_value(column, value)]])
        }
        _ => render_table(table),
    }
}

/// Render a header and rows of cells as aligned plain text.
pub fn render_grid(headers: &[String], rows: &[Vec<String>]) -> String {
    let index_width = rows.len().to_string().len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let mut out = String::new();
    out.push_str(&" ".repeat(index_width));
    for (header, width) in headers.iter().zip(&widths) {
        out.push_str(&format!("  {:<width$}", header, width = *width));
    }
    out.push('\n');

    for (n, row) in rows.iter().enumerate() {
        out.push_str(&format!("{:>width$}", n + 1, width = index_width));
        for (cell, width) in row.iter().zip(&widths) {
            out.push_str(&format!("  {:<width$}", cell, width = *width));
        }
        out.push('\n');
    }

    out.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}
