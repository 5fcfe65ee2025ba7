//! Saiku wire models. Payloads are camelCase with nulls omitted; cell types
//! come back as `DATA_CELL`-style constants and are converted to the
//! canonical cell types here.

use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;

use reforma_core::{CellType, CubeRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum SaikuCellType {
    #[serde(rename = "DATA_CELL")]
    DataCell,
    #[serde(rename = "ROW_HEADER")]
    RowHeader,
    #[serde(rename = "COLUMN_HEADER")]
    ColumnHeader,
    #[serde(rename = "ROW_HEADER_HEADER")]
    RowHeaderHeader,
    #[serde(other)]
    Unknown,
}

impl From<SaikuCellType> for CellType {
    fn from(cell_type: SaikuCellType) -> Self {
        match cell_type {
            SaikuCellType::RowHeader => CellType::RowHeader,
            SaikuCellType::ColumnHeader => CellType::ColumnHeader,
            SaikuCellType::RowHeaderHeader => CellType::RowHeaderHeader,
            SaikuCellType::DataCell | SaikuCellType::Unknown => CellType::DataCell,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaikuCellProperties {
    #[serde(default, rename = "uniquename")]
    pub unique_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaikuCell {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(rename = "type")]
    pub cell_type: SaikuCellType,
    #[serde(default)]
    pub properties: Option<SaikuCellProperties>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaikuQueryResult {
    #[serde(rename = "cellset", default)]
    pub cellset: Vec<Vec<SaikuCell>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaikuMember {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaikuSelection {
    pub members: Vec<SaikuMember>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaikuLevel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<SaikuSelection>,
}

/// One hierarchy with exactly one level carrying the member selection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaikuHierarchy {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,
    pub levels: HashMap<String, SaikuLevel>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaikuAxis {
    /// Axis key, upper-cased (ROWS, COLUMNS, FILTER).
    pub location: String,
    pub hierarchies: Vec<SaikuHierarchy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregators: Option<Vec<String>>,
    pub non_empty: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaikuDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measures: Option<Vec<SaikuMember>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaikuQueryModel {
    pub axes: HashMap<String, SaikuAxis>,
    pub details: SaikuDetails,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaikuQuery {
    pub cube: CubeRef,
    pub name: String,
    pub query_model: SaikuQueryModel,
}

/// Session establishment payload; sessions are keyed
/// `{reportName}_{connectionName}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaikuSetSession {
    pub name: String,
    pub cube: CubeRef,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cell_types_convert_from_wire_constants() {
        let raw = r#"[
            {"type": "ROW_HEADER", "value": "Школа №3", "properties": {"uniquename": "[Школа].[3]"}},
            {"type": "DATA_CELL", "value": "42"},
            {"type": "SOMETHING_NEW", "value": ""}
        ]"#;
        let cells: Vec<SaikuCell> = serde_json::from_str(raw).unwrap();

        assert_eq!(CellType::from(cells[0].cell_type), CellType::RowHeader);
        assert_eq!(
            cells[0].properties.as_ref().unwrap().unique_name.as_deref(),
            Some("[Школа].[3]")
        );
        assert_eq!(CellType::from(cells[1].cell_type), CellType::DataCell);
        // unknown constants degrade to data cells
        assert_eq!(CellType::from(cells[2].cell_type), CellType::DataCell);
    }

    #[test]
    fn axis_serializes_camel_case_without_nulls() {
        let axis = SaikuAxis {
            location: "FILTER".into(),
            hierarchies: vec![],
            aggregators: None,
            non_empty: false,
        };
        let json = serde_json::to_string(&axis).unwrap();
        assert!(json.contains(r#""nonEmpty":false"#));
        assert!(!json.contains("aggregators"));
    }
}
