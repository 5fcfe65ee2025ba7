use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One style map: css-ish property name -> value.
pub type StyleMap = HashMap<String, String>;

/// Area-keyed style maps (`header`, `data`, `total`, ...).
pub type Styles = HashMap<String, StyleMap>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum CellType {
    #[serde(rename = "dataCell")]
    DataCell,
    #[serde(rename = "columnHeader")]
    ColumnHeader,
    #[serde(rename = "rowHeader")]
    RowHeader,
    #[serde(rename = "rowHeaderHeader")]
    RowHeaderHeader,
    #[serde(rename = "totalCell")]
    TotalCell,
}

impl Default for CellType {
    // Raw data rows are built without an explicit type.
    fn default() -> Self {
        CellType::DataCell
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Cell {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(rename = "type")]
    pub cell_type: CellType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub row_span: i32,
    /// -1 marks a cell merged away by a neighbouring span.
    pub col_span: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i32>,
    #[serde(rename = "isHTML")]
    pub is_html: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            value: None,
            cell_type: CellType::DataCell,
            style: None,
            name: None,
            row_span: 1,
            col_span: 1,
            width: None,
            is_html: false,
        }
    }
}

impl Cell {
    pub fn data(value: Option<Value>) -> Self {
        Cell {
            value,
            ..Cell::default()
        }
    }

    pub fn column_header(caption: Option<String>, name: &str) -> Self {
        Cell {
            value: caption.map(Value::String),
            cell_type: CellType::ColumnHeader,
            name: Some(name.to_owned()),
            ..Cell::default()
        }
    }

    pub fn total() -> Self {
        Cell {
            cell_type: CellType::TotalCell,
            ..Cell::default()
        }
    }
}

/// The canonical report result: ordered cell rows plus the rendered and
/// unrendered captions. Leading rows are ColumnHeader rows; when a totals row
/// exists it is the last row.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Grid {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_caption: Option<String>,
    pub cells: Vec<Vec<Cell>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub styles: Option<Styles>,
}

impl Grid {
    pub fn from_cells(cells: Vec<Vec<Cell>>) -> Self {
        Grid {
            cells,
            ..Grid::default()
        }
    }

    /// Number of leading ColumnHeader rows; the first data row starts here.
    pub fn header_row_count(&self) -> usize {
        self.cells
            .iter()
            .take_while(|row| {
                row.first()
                    .map(|c| c.cell_type == CellType::ColumnHeader)
                    .unwrap_or(false)
            })
            .count()
    }
}

/// Numeric reading of a cell value; an absent value reads as zero so that
/// sparse rows still aggregate (matches the stored reports' expectations).
pub fn value_to_f64(value: Option<&Value>) -> Option<f64> {
    match value {
        None | Some(Value::Null) => Some(0.0),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
