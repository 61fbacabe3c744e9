//! Tabular projection of contribution records.
//!
//! Rows are records, columns are the union of top-level keys in
//! first-appearance order. Missing cells are `Null`.
//!
//! For contribution records the per-record key order is fixed rather than the
//! order the server sent: `id`, `identifier`, `formula`, then any other
//! projected fields sorted by name, then `data`.

use comfy_table::{Cell, Table, presets::ASCII_MARKDOWN};

use crate::contribs::ContributionRecord;
use crate::error::{Error, Result};
use crate::value::{FieldMap, FieldValue};

const MAX_CELL_WIDTH: usize = 50;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularView {
    columns: Vec<String>,
    rows: Vec<Vec<FieldValue>>,
}

impl TabularView {
    /// Build from ordered (key, value) rows.
    pub fn from_rows(rows: Vec<Vec<(String, FieldValue)>>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for (k, _) in row {
                if !columns.contains(k) {
                    columns.push(k.clone());
                }
            }
        }

        let rows = rows
            .into_iter()
            .map(|row| {
                let mut cells = vec![FieldValue::Null; columns.len()];
                for (k, v) in row {
                    if let Some(i) = columns.iter().position(|c| *c == k) {
                        cells[i] = v;
                    }
                }
                cells
            })
            .collect();

        Self { columns, rows }
    }

    pub fn from_records(records: &[ContributionRecord]) -> Self {
        Self::from_rows(records.iter().map(|r| r.top_level_fields()).collect())
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<FieldValue>] {
        &self.rows
    }

    pub fn column(&self, name: &str) -> Option<Vec<&FieldValue>> {
        let i = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| &r[i]).collect())
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> TabularView {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Text table with a leading row-index column.
    pub fn render(&self) -> String {
        let mut table = Table::new();
        table.load_preset(ASCII_MARKDOWN);

        let mut header = vec![Cell::new("")];
        header.extend(self.columns.iter().map(Cell::new));
        table.set_header(header);

        for (i, row) in self.rows.iter().enumerate() {
            let mut cells = vec![Cell::new(i)];
            cells.extend(row.iter().map(|v| Cell::new(truncate(&v.to_string()))));
            table.add_row(cells);
        }
        table.to_string()
    }
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= MAX_CELL_WIDTH {
        return s.to_string();
    }
    let mut out: String = s.chars().take(MAX_CELL_WIDTH - 3).collect();
    out.push_str("...");
    out
}

/// Flatten a column of nested mappings into dotted columns (`a.b.c`).
///
/// Null or empty entries become all-null rows. Lists are kept as leaf values.
/// Fails on non-mapping entries and on keys that flatten to the same column.
pub fn normalize(values: &[&FieldValue]) -> Result<TabularView> {
    let mut rows = Vec::with_capacity(values.len());
    for (i, v) in values.iter().enumerate() {
        let mut row = Vec::new();
        match v {
            FieldValue::Null => {}
            FieldValue::Map(m) => flatten_into(m, "", &mut row)
                .map_err(|key| Error::Normalization(format!("row {i}: duplicate column {key}")))?,
            other => {
                return Err(Error::Normalization(format!(
                    "row {i}: expected a mapping, got {other}"
                )));
            }
        }
        rows.push(row);
    }
    Ok(TabularView::from_rows(rows))
}

fn flatten_into(
    map: &FieldMap,
    prefix: &str,
    out: &mut Vec<(String, FieldValue)>,
) -> std::result::Result<(), String> {
    for (k, v) in map {
        let key = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{prefix}.{k}")
        };
        match v {
            FieldValue::Map(inner) if !inner.is_empty() => flatten_into(inner, &key, out)?,
            _ => {
                if out.iter().any(|(existing, _)| *existing == key) {
                    return Err(key);
                }
                out.push((key, v.clone()));
            }
        }
    }
    Ok(())
}
