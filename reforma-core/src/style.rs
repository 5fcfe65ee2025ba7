//! Backend-agnostic grid transforms applied after an executor returns:
//! caption templating, row-span merging, style application and (optionally)
//! number formatting. Order matters and matches the executor contract: the
//! grid is fully materialized before any pass runs.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

use crate::format;
use crate::grid::{CellType, Grid, StyleMap};
use crate::report::ReportSpec;
use crate::request::ReportQuery;

pub const DEFAULT_COLUMN_WIDTH: i32 = 150;

/// Runs every post-processing pass. `skip_formatting` keeps numeric values
/// raw (export wants real numbers, not display strings).
pub async fn apply(
    query: Option<&ReportQuery>,
    grid: &mut Grid,
    spec: &ReportSpec,
    skip_formatting: bool,
) {
    if let Some(query) = query {
        render_caption(query, grid, spec);
    }
    merge_row_spans(grid, spec).await;
    apply_common_styles(grid, spec);
    apply_column_styles(grid, spec);
    if !skip_formatting {
        format::apply_number_format(grid, spec);
    }
}

/// Renders the definition's caption pattern against the first selected
/// element of each dimension; unresolved placeholders render as empty.
fn render_caption(query: &ReportQuery, grid: &mut Grid, spec: &ReportSpec) {
    grid.base_caption = spec.caption.clone();

    let pattern = match spec.caption_pattern.as_deref() {
        Some(pattern) if !pattern.is_empty() => pattern,
        _ => {
            grid.caption = spec.caption.clone();
            return;
        }
    };

    let captions: HashMap<String, String> = query
        .all_selections()
        .filter(|s| !s.values().is_empty())
        .map(|s| {
            (
                s.dimension
                    .trim_matches(|c| c == '[' || c == ']')
                    .to_owned(),
                s.values()[0].caption.clone().unwrap_or_default(),
            )
        })
        .collect();

    lazy_static! {
        static ref PLACEHOLDER: Regex = Regex::new(r"\{\{\s*([^{}\s]+)\s*\}\}").unwrap();
    }

    let rendered = PLACEHOLDER.replace_all(pattern, |caps: &regex::Captures| {
        captions.get(&caps[1]).cloned().unwrap_or_default()
    });

    grid.caption = Some(rendered.into_owned());
}

/// Collapses vertically repeated equal values of span-enabled columns.
///
/// Arena-style: the grid is already fully materialized, so each eligible
/// column's values are snapshotted and the span computation fans out one
/// task per column; no task touches another column's slice. The computed
/// spans are then applied in one pass.
pub async fn merge_row_spans(grid: &mut Grid, spec: &ReportSpec) {
    let table = match spec.table.as_ref() {
        Some(table) => table,
        None => return,
    };
    if grid.cells.is_empty() {
        return;
    }

    let header_rows = grid.header_row_count();
    if header_rows >= grid.cells.len() {
        return;
    }

    let columns: Vec<usize> = table
        .iter()
        .enumerate()
        .filter(|(_, column)| column.can_row_span == Some(true))
        .map(|(index, _)| index)
        .collect();
    if columns.is_empty() {
        return;
    }

    let mut tasks = Vec::with_capacity(columns.len());
    for col in columns {
        let values: Vec<Option<Value>> = grid.cells[header_rows..]
            .iter()
            .map(|row| row.get(col).and_then(|cell| cell.value.clone()))
            .collect();
        tasks.push(tokio::task::spawn_blocking(move || {
            (col, column_spans(&values))
        }));
    }

    for task in tasks {
        let (col, spans) = match task.await {
            Ok(result) => result,
            Err(_) => continue,
        };
        for (offset, span) in spans.into_iter().enumerate() {
            if span == 0 {
                continue;
            }
            if let Some(cell) = grid.cells[header_rows + offset].get_mut(col) {
                cell.row_span = span;
            }
        }
    }
}

/// Span per data row for one column: the first cell of a run of equal values
/// carries the run length, followers carry -1, lone values stay untouched
/// (returned as 0 = keep the default).
fn column_spans(values: &[Option<Value>]) -> Vec<i32> {
    let mut spans = vec![0i32; values.len()];

    let mut run_start = 0;
    let mut run_len = 1;
    for index in 1..values.len() {
        if values[index] == values[run_start] {
            run_len += 1;
            spans[index] = -1;
        } else {
            if run_len > 1 {
                spans[run_start] = run_len;
            }
            run_start = index;
            run_len = 1;
        }
    }
    if run_len > 1 {
        spans[run_start] = run_len;
    }

    spans
}

fn apply_common_styles(grid: &mut Grid, spec: &ReportSpec) {
    if spec.styles.is_some() {
        grid.styles = spec.styles.clone();
    }
}

/// Applies per-column styles: header cells get the `header` style, data and
/// totals cells the `data`/`total` styles, width defaults to 150. A later
/// style key overwrites an equal earlier key, property by property.
pub fn apply_column_styles(grid: &mut Grid, spec: &ReportSpec) {
    let table = match spec.table.as_ref() {
        Some(table) => table,
        None => return,
    };

    // Header cells drive the column association; collect them first so the
    // grid can be mutated below.
    let headers: Vec<(usize, usize)> = grid
        .cells
        .iter()
        .enumerate()
        .flat_map(|(row_idx, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, cell)| cell.cell_type == CellType::ColumnHeader)
                .map(move |(col_idx, _)| (row_idx, col_idx))
        })
        .collect();

    for (row_idx, col_idx) in headers {
        let name = grid.cells[row_idx][col_idx].name.clone();
        let column = name
            .as_deref()
            .and_then(|name| table.iter().find(|t| t.name == name));

        grid.cells[row_idx][col_idx].width =
            Some(column.and_then(|c| c.width).unwrap_or(DEFAULT_COLUMN_WIDTH));

        let styles = match column.and_then(|c| c.styles.as_ref()) {
            Some(styles) => styles,
            None => continue,
        };

        if let Some(header_style) = styles.get("header") {
            let header = &mut grid.cells[row_idx][col_idx];
            header.style = Some(merge_style(header.style.take(), header_style));
        }

        for row in grid.cells.iter_mut() {
            let cell = match row.get_mut(col_idx) {
                Some(cell) => cell,
                None => continue,
            };
            let overlay = match cell.cell_type {
                CellType::DataCell => styles.get("data"),
                CellType::TotalCell => styles.get("total"),
                _ => None,
            };
            if let Some(overlay) = overlay {
                cell.style = Some(merge_style(cell.style.take(), overlay));
            }
        }
    }
}

fn merge_style(source: Option<StyleMap>, overlay: &StyleMap) -> StyleMap {
    let mut merged = source.unwrap_or_default();
    for (key, value) in overlay {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
