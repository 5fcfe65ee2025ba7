//! Mapping of postgres rows into canonical grid cells.
//!
//! Alignment is by backend field name against the declared column specs:
//! unmatched fields are dropped, unmatched columns stay as empty cells.
//! Booleans are localized to Да/Нет captions here — a domain decision, not
//! display formatting, so export paths keep it too.

use log::warn;
use serde_json::Value;
use tokio_postgres::Row;

use reforma_core::{Cell, ColumnSpec, ReportError};

pub const BOOL_TRUE: &str = "Да";
pub const BOOL_FALSE: &str = "Нет";

pub fn row_to_cells(row: &Row, table: &[ColumnSpec]) -> Result<Vec<Cell>, ReportError> {
    let mut cells: Vec<Cell> = (0..table.len()).map(|_| Cell::data(None)).collect();

    for (index, column) in row.columns().iter().enumerate() {
        let position = match table.iter().position(|t| t.name == column.name()) {
            Some(position) => position,
            None => continue,
        };

        cells[position] = Cell::data(read_value(row, index)?);
    }

    Ok(cells)
}

fn read_value(row: &Row, index: usize) -> Result<Option<Value>, ReportError> {
    let ty = row.columns()[index].type_();

    let value = match ty.name() {
        "bool" => row
            .try_get::<_, Option<bool>>(index)
            .map_err(ReportError::upstream)?
            .map(|b| Value::String((if b { BOOL_TRUE } else { BOOL_FALSE }).to_owned())),
        "int2" => row
            .try_get::<_, Option<i16>>(index)
            .map_err(ReportError::upstream)?
            .map(Value::from),
        "int4" => row
            .try_get::<_, Option<i32>>(index)
            .map_err(ReportError::upstream)?
            .map(Value::from),
        "int8" => row
            .try_get::<_, Option<i64>>(index)
            .map_err(ReportError::upstream)?
            .map(Value::from),
        "float4" => row
            .try_get::<_, Option<f32>>(index)
            .map_err(ReportError::upstream)?
            .map(Value::from),
        "float8" => row
            .try_get::<_, Option<f64>>(index)
            .map_err(ReportError::upstream)?
            .map(Value::from),
        "text" | "varchar" | "bpchar" | "name" => row
            .try_get::<_, Option<String>>(index)
            .map_err(ReportError::upstream)?
            .map(Value::String),
        "date" => row
            .try_get::<_, Option<chrono::NaiveDate>>(index)
            .map_err(ReportError::upstream)?
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
        "timestamp" => row
            .try_get::<_, Option<chrono::NaiveDateTime>>(index)
            .map_err(ReportError::upstream)?
            .map(|t| Value::String(t.format("%Y-%m-%dT%H:%M:%S").to_string())),
        other => {
            // numeric and friends: cast to float8/text in the report SQL
            warn!("unsupported column type {}, value dropped", other);
            None
        }
    };

    Ok(value)
}
