//! The stored report definition model.
//!
//! Definitions live in the metadata store as camelCase JSON documents with
//! null fields omitted; everything here round-trips through that format,
//! Cyrillic captions included.

use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::grid::Styles;
use crate::request::Element;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum SourceType {
    #[serde(rename = "database")]
    Database,
    #[serde(rename = "olap")]
    Olap,
}

impl Default for SourceType {
    fn default() -> Self {
        SourceType::Database
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum AggregateType {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "sum")]
    Sum,
    #[serde(rename = "avg")]
    Avg,
    #[serde(rename = "min")]
    Min,
    #[serde(rename = "max")]
    Max,
}

impl Default for AggregateType {
    fn default() -> Self {
        AggregateType::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ControlType {
    #[serde(rename = "comboBox")]
    ComboBox,
    #[serde(rename = "datePicker")]
    DatePicker,
    #[serde(rename = "textBox")]
    TextBox,
}

impl Default for ControlType {
    fn default() -> Self {
        ControlType::ComboBox
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum SelectionMode {
    #[serde(rename = "single")]
    Single,
    #[serde(rename = "multiple")]
    Multiple,
}

impl Default for SelectionMode {
    fn default() -> Self {
        SelectionMode::Single
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum SearchMode {
    #[serde(rename = "client")]
    Client,
    #[serde(rename = "server")]
    Server,
}

impl Default for SearchMode {
    fn default() -> Self {
        SearchMode::Client
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSpec {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption_pattern: Option<String>,
    #[serde(default)]
    pub source_type: SourceType,
    /// The report query; used when `source_type` is Database.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<QuerySpec>,
    /// Axis key (rows, columns, filter, measure, ...) -> ordered dimensions.
    #[serde(default)]
    pub dimensions: HashMap<String, Vec<DimensionSpec>>,
    /// Column layout for Database sources, in declared order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<Vec<ColumnSpec>>,
    /// Cube coordinates for Olap sources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cube: Option<CubeRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub styles: Option<Styles>,
}

impl ReportSpec {
    /// All dimensions across all axis keys.
    pub fn all_dimensions(&self) -> impl Iterator<Item = &DimensionSpec> {
        self.dimensions.values().flatten()
    }

    pub fn find_dimension(&self, name: &str) -> Option<&DimensionSpec> {
        self.all_dimensions().find(|d| d.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    pub sql: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<ParamSpec>>,
}

/// One declared query parameter, bound from the axis selection named by
/// `source`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamSpec {
    pub name: String,
    #[serde(default)]
    pub is_array: bool,
    /// Declared scalar type, e.g. `Int32` or `DateTime`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// Dimension name whose selection supplies the value.
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionSpec {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// OLAP hierarchy path, e.g. `[Период].[Год]`.
    #[serde(rename = "dimension", skip_serializing_if = "Option::is_none")]
    pub dimension_key: Option<String>,
    #[serde(rename = "type", default)]
    pub control_type: ControlType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub selection_mode: SelectionMode,
    /// Query resolving this dimension's own candidate values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<QuerySpec>,
    #[serde(default)]
    pub is_static: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_values: Option<Vec<Element>>,
    /// Name of a stored dimension object to clone from; cleared once resolved.
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub ref_object: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregators: Option<Vec<AggregateType>>,
    #[serde(default)]
    pub search_mode: SearchMode,
    #[serde(default)]
    pub source_type: SourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restricts: Option<Restrict>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    /// Must match a backend field or alias.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub styles: Option<Styles>,
    #[serde(default)]
    pub aggregate: AggregateType,
    /// Drop values <= 0 before aggregating.
    #[serde(default)]
    pub aggregate_non_zero: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_row_span: Option<bool>,
}

/// Coordinates of a cube on the remote OLAP service.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CubeRef {
    pub name: String,
    pub connection: String,
    pub catalog: String,
    pub schema: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Restrict {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shift: Option<RestrictShift>,
}

/// Date restriction relative to another dimension's selection.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestrictShift {
    pub parent: String,
    pub days: i32,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_minimal_database_spec() {
        let raw = r##"{
            "name": "attendance",
            "caption": "Посещаемость",
            "sourceType": "database",
            "query": {
                "sql": "select * from report.attendance where district = @district",
                "parameters": [
                    {"name": "@district", "dataType": "Int32", "source": "District"}
                ]
            },
            "dimensions": {
                "filter": [
                    {"name": "District", "caption": "Район", "type": "comboBox"}
                ]
            },
            "table": [
                {"name": "school", "caption": "Школа", "aggregate": "none", "canRowSpan": true},
                {"name": "total", "caption": "Итого", "aggregate": "sum", "format": "#,##0.00"}
            ]
        }"##;

        let spec: ReportSpec = serde_json::from_str(raw).unwrap();
        assert_eq!(spec.source_type, SourceType::Database);
        let table = spec.table.as_ref().unwrap();
        assert_eq!(table[1].aggregate, AggregateType::Sum);
        assert_eq!(table[0].can_row_span, Some(true));
        let params = spec.query.as_ref().unwrap().parameters.as_ref().unwrap();
        assert!(!params[0].is_array);
        assert_eq!(spec.find_dimension("District").unwrap().caption.as_deref(), Some("Район"));
    }

    #[test]
    fn null_fields_are_omitted_on_output() {
        let spec = ReportSpec {
            name: "empty".into(),
            caption: None,
            caption_pattern: None,
            source_type: SourceType::Olap,
            query: None,
            dimensions: HashMap::new(),
            table: None,
            cube: None,
            styles: None,
        };
        let json = serde_json::to_string(&spec).unwrap();
        assert!(!json.contains("caption"));
        assert!(!json.contains("table"));
        assert!(json.contains(r#""sourceType":"olap""#));
    }
}
