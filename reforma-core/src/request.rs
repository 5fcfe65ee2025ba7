//! Client-facing request shapes: a report query carries per-axis dimension
//! selections; an element request asks for one dimension's candidate values.

use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;

/// One selectable value of a dimension. `name` is the stable identifier (it
/// may carry a bracketed qualifier prefix, `[42]Школа №3`); `caption` is the
/// display text. `unique_name` only appears on values coming back from the
/// OLAP service.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_name: Option<String>,
}

impl Element {
    pub fn new(name: impl Into<String>, caption: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            caption: Some(caption.into()),
            unique_name: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    #[serde(default)]
    pub values: Vec<Element>,
}

/// The selection made for one dimension of one axis.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisSelection {
    pub dimension: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,
}

impl AxisSelection {
    pub fn values(&self) -> &[Element] {
        self.selection
            .as_ref()
            .map(|s| s.values.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    pub name: String,
    /// Axis key -> selections, mirroring the definition's dimension axes.
    #[serde(default)]
    pub dimensions: HashMap<String, Vec<AxisSelection>>,
}

impl ReportQuery {
    pub fn all_selections(&self) -> impl Iterator<Item = &AxisSelection> {
        self.dimensions.values().flatten()
    }

    /// First selection matching a parameter source, across all axes.
    pub fn find_selection(&self, source: &str) -> Option<&AxisSelection> {
        self.all_selections().find(|s| s.dimension == source)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRequest {
    /// Report name.
    pub name: String,
    /// Dimension being resolved.
    pub dimension: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Selections already made; dimension queries may reference them.
    #[serde(default)]
    pub selections: Vec<AxisSelection>,
}

impl ElementRequest {
    pub fn find_selection(&self, source: &str) -> Option<&AxisSelection> {
        self.selections.iter().find(|s| s.dimension == source)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRequest {
    pub name: String,
}
