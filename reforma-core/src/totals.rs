//! Totals aggregation over the canonical grid.
//!
//! The computation is pure grid math and lives here so backends share it:
//! the database executor appends the row after a query, while the OLAP
//! executor skips it entirely (the remote service embeds its own subtotals).

use serde_json::Value;

use crate::grid::{value_to_f64, Cell, CellType, Grid};
use crate::report::{AggregateType, ColumnSpec};

/// Appends one TotalCell row aligned by column index. Columns without an
/// aggregate, and columns with no eligible values, stay blank in that row.
pub fn append_totals(grid: &mut Grid, table: &[ColumnSpec]) {
    let aggregates: Vec<(usize, &ColumnSpec)> = table
        .iter()
        .enumerate()
        .filter(|(_, column)| column.aggregate != AggregateType::None)
        .collect();
    if aggregates.is_empty() {
        return;
    }

    let mut row: Vec<Cell> = (0..table.len()).map(|_| Cell::total()).collect();

    for (index, column) in aggregates {
        let mut values: Vec<f64> = grid
            .cells
            .iter()
            .filter_map(|r| r.get(index))
            .filter(|cell| cell.cell_type == CellType::DataCell)
            .map(|cell| value_to_f64(cell.value.as_ref()).unwrap_or(0.0))
            .collect();
        if values.is_empty() {
            continue;
        }

        if column.aggregate_non_zero {
            values.retain(|v| *v > 0.0);
        }
        if values.is_empty() {
            continue;
        }

        let total = match column.aggregate {
            AggregateType::Sum => values.iter().sum(),
            AggregateType::Avg => values.iter().sum::<f64>() / values.len() as f64,
            AggregateType::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            AggregateType::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            AggregateType::None => continue,
        };
        let total = (total * 100.0).round() / 100.0;

        row[index].value = Some(Value::from(total));
    }

    grid.cells.push(row);
}
