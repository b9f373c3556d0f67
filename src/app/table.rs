//! ASCII table rendering for roster-style views.

/// Render rows under a header as an ASCII table, capping cell width to keep
/// output readable on the current terminal.
pub fn render_table(columns: &[&str], rows: &[Vec<String>]) -> String {
    let max_col_width = max_cell_width();
    let mut widths: Vec<usize> = columns.iter().map(|s| s.chars().count().min(max_col_width)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(columns.len()) {
            let w = display_len(cell).min(max_col_width);
            if w > widths[i] {
                widths[i] = w;
            }
        }
    }

    let sep = build_separator(&widths);
    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    let header: Vec<String> = columns.iter().map(|s| s.to_string()).collect();
    out.push_str(&build_row(&header, &widths));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in rows {
        out.push_str(&build_row(row, &widths));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&format!("rows: {}\n", rows.len()));
    out
}

fn max_cell_width() -> usize {
    // Leave room for separators on narrow terminals; cap at 80 otherwise
    match terminal_size::terminal_size() {
        Some((terminal_size::Width(w), _)) if (w as usize) > 40 => (w as usize - 20).min(80),
        _ => 80,
    }
}

fn display_len(s: &str) -> usize {
    s.chars().count()
}

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('+');
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('|');
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).cloned().unwrap_or_default();
        let text = truncate(&cell, *w);
        s.push(' ');
        s.push_str(&text);
        let pad = w.saturating_sub(display_len(&text));
        s.push_str(&" ".repeat(pad));
        s.push(' ');
        s.push('|');
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max {
        return s.to_string();
    }
    if max <= 1 {
        return "…".to_string();
    }
    s.chars().take(max - 1).collect::<String>() + "…"
}
