//! Tabular reports and their fixed-width text rendering.
//!
//! Rendering follows a fixed display configuration: at most `max_rows` rows
//! (head and tail kept around an ellipsis row), optionally at most
//! `max_columns` columns, and every line clipped to `width` characters.

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayOptions {
    pub max_rows: Option<usize>,
    pub max_columns: Option<usize>,
    pub width: usize,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        DisplayOptions {
            max_rows: Some(100),
            max_columns: None,
            width: 300,
        }
    }
}

const ELLIPSIS: &str = "...";
const COLUMN_GAP: &str = "  ";

impl Report {
    pub fn new(title: impl Into<String>, columns: &[&str]) -> Self {
        Report {
            title: title.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Short rows are padded with empty cells.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self, options: &DisplayOptions) -> String {
        let mut output = String::new();
        output.push_str(&self.title);
        output.push('\n');

        let column_idx = visible_indices(self.columns.len(), options.max_columns);
        let header = project(&self.columns, &column_idx);

        let row_idx = visible_indices(self.rows.len(), options.max_rows);
        let body: Vec<Vec<String>> = row_idx
            .iter()
            .map(|slot| match slot {
                Some(i) => project(&self.rows[*i], &column_idx),
                None => vec![ELLIPSIS.to_string(); header.len()],
            })
            .collect();

        let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
        for row in &body {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        output.push_str(&format_line(&header, &widths, options.width));
        if body.is_empty() {
            output.push_str("(no rows)\n");
        }
        for row in &body {
            output.push_str(&format_line(row, &widths, options.width));
        }
        if self.rows.len() > body.len() {
            output.push_str(&format!(
                "[{} rows x {} columns]\n",
                self.rows.len(),
                self.columns.len()
            ));
        }
        output
    }
}

/// Indices to show out of `len`; `None` marks the elided middle.
fn visible_indices(len: usize, limit: Option<usize>) -> Vec<Option<usize>> {
    match limit {
        Some(max) if len > max => {
            let head = max.div_ceil(2);
            let tail = max - head;
            (0..head)
                .map(Some)
                .chain(std::iter::once(None))
                .chain((len - tail..len).map(Some))
                .collect()
        }
        _ => (0..len).map(Some).collect(),
    }
}

fn project(cells: &[String], idx: &[Option<usize>]) -> Vec<String> {
    idx.iter()
        .map(|slot| match slot {
            Some(i) => cells.get(*i).cloned().unwrap_or_default(),
            None => ELLIPSIS.to_string(),
        })
        .collect()
}

fn format_line(cells: &[String], widths: &[usize], max_width: usize) -> String {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &w)| format!("{:<w$}", cell, w = w))
        .collect::<Vec<_>>()
        .join(COLUMN_GAP);
    let mut line: String = line.trim_end().chars().take(max_width).collect();
    line.push('\n');
    line
}
