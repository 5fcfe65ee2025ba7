//! Loading, reference resolution and client projection of stored report
//! definitions.
//!
//! Definitions are key -> JSON document blobs behind the `MetadataStore`
//! capability. A dimension may point at another stored dimension object via
//! `ref` (prototype inheritance); resolution copies the referenced fields
//! once and clears the reference. Resolution is a single hop: a referenced
//! object's own `ref` is not chased.

use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use serde_derive::Serialize;
use std::collections::HashMap;

use crate::error::ReportError;
use crate::grid::{Cell, CellType, Styles};
use crate::report::{
    ControlType, DimensionSpec, ReportSpec, Restrict, SearchMode, SelectionMode, SourceType,
};
use crate::request::Element;
use crate::style;

/// Placeholder cell text shown before the first query executes.
pub const NO_DATA: &str = "нет данных";

/// Key -> JSON document store for report definitions. `put` is update-only.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get(&self, code: &str) -> Result<Option<String>, ReportError>;
    async fn put(&self, code: &str, document: &str) -> Result<(), ReportError>;
}

async fn load_object<T: DeserializeOwned>(
    store: &dyn MetadataStore,
    code: &str,
) -> Result<Option<T>, ReportError> {
    let document = match store.get(code).await? {
        Some(document) => document,
        None => return Ok(None),
    };

    serde_json::from_str(&document)
        .map(Some)
        .map_err(|err| ReportError::Upstream(format!("метаданные {} повреждены: {}", code, err)))
}

/// Loads a definition and resolves every dimension reference.
pub async fn resolve(store: &dyn MetadataStore, name: &str) -> Result<ReportSpec, ReportError> {
    let mut spec: ReportSpec = load_object(store, name)
        .await?
        .ok_or_else(|| ReportError::NotFound(name.to_owned()))?;

    for dimension in spec.dimensions.values_mut().flatten() {
        let reference = match dimension.ref_object.as_deref() {
            Some(reference) if !reference.is_empty() => reference.to_owned(),
            _ => continue,
        };

        debug!("resolving dimension reference {} for {}", reference, name);
        let source: DimensionSpec = load_object(store, &reference)
            .await?
            .ok_or_else(|| ReportError::NotFound(reference.clone()))?;
        clone_dimension(&source, dimension);
    }

    Ok(spec)
}

/// One-hop prototype copy; overwrites the target's fields and clears `ref`.
fn clone_dimension(source: &DimensionSpec, target: &mut DimensionSpec) {
    target.ref_object = None;
    target.control_type = source.control_type;
    target.caption = source.caption.clone();
    target.query = source.query.clone();
    target.dimension_key = source.dimension_key.clone();
    target.is_static = source.is_static;
    target.static_values = source.static_values.clone();
    target.level = source.level.clone();
    target.name = source.name.clone();
    target.required = source.required;
    target.selection_mode = source.selection_mode;
}

/// Raw load without reference resolution; push followed by pull round-trips.
pub async fn pull(store: &dyn MetadataStore, name: &str) -> Result<ReportSpec, ReportError> {
    load_object(store, name)
        .await?
        .ok_or_else(|| ReportError::NotFound(name.to_owned()))
}

/// Overwrites a stored definition. Update-only: an unknown name is an error,
/// not a create.
pub async fn push(store: &dyn MetadataStore, spec: &ReportSpec) -> Result<(), ReportError> {
    if store.get(&spec.name).await?.is_none() {
        return Err(ReportError::NotFound(spec.name.clone()));
    }

    let document = serde_json::to_string_pretty(spec)
        .map_err(|err| ReportError::Upstream(err.to_string()))?;
    store.put(&spec.name, &document).await
}

/// What a client needs to render the report's parameter form: dimension
/// captions and control hints, but none of the backend details (raw SQL,
/// cube coordinates).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMetadata {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub dimensions: HashMap<String, Vec<ClientDimension>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cells: Option<Vec<Vec<Cell>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub styles: Option<Styles>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDimension {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub selection: SelectionMode,
    #[serde(rename = "type")]
    pub control_type: ControlType,
    pub required: bool,
    /// Axis keys this dimension's own query depends on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depends: Option<Vec<String>>,
    pub is_static: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_values: Option<Vec<Element>>,
    pub search_mode: SearchMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restricts: Option<Restrict>,
}

impl From<&DimensionSpec> for ClientDimension {
    fn from(dimension: &DimensionSpec) -> Self {
        let depends = dimension.query.as_ref().and_then(|q| {
            q.parameters
                .as_ref()
                .map(|ps| ps.iter().map(|p| p.source.clone()).collect())
        });

        ClientDimension {
            name: dimension.name.clone(),
            caption: dimension.caption.clone(),
            selection: dimension.selection_mode,
            control_type: dimension.control_type,
            required: dimension.required,
            depends,
            is_static: dimension.is_static,
            static_values: dimension.static_values.clone(),
            search_mode: dimension.search_mode,
            restricts: dimension.restricts.clone(),
        }
    }
}

/// Builds the client projection, including the placeholder "no data" grid a
/// client renders before the first query.
pub fn project(spec: &ReportSpec) -> ClientMetadata {
    let dimensions = spec
        .dimensions
        .iter()
        .map(|(axis, dims)| (axis.clone(), dims.iter().map(|d| d.into()).collect()))
        .collect();

    let cells = match spec.source_type {
        SourceType::Database => placeholder_table(spec),
        SourceType::Olap => Some(placeholder_olap()),
    };

    ClientMetadata {
        name: spec.name.clone(),
        caption: spec.caption.clone(),
        dimensions,
        cells,
        styles: spec.styles.clone(),
    }
}

fn placeholder_olap() -> Vec<Vec<Cell>> {
    vec![vec![Cell {
        value: Some(NO_DATA.into()),
        cell_type: CellType::DataCell,
        name: Some(format!("[{}]", NO_DATA)),
        ..Cell::default()
    }]]
}

fn placeholder_table(spec: &ReportSpec) -> Option<Vec<Vec<Cell>>> {
    let table = spec.table.as_ref()?;

    let header = table
        .iter()
        .map(|column| Cell::column_header(column.caption.clone(), &column.name))
        .collect::<Vec<_>>();

    let mut data_row: Vec<Cell> = (0..table.len())
        .map(|_| Cell {
            col_span: -1,
            ..Cell::default()
        })
        .collect();
    data_row[0].value = Some(NO_DATA.into());
    data_row[0].col_span = table.len() as i32;

    let mut grid = crate::grid::Grid::from_cells(vec![header, data_row]);
    style::apply_column_styles(&mut grid, spec);

    // The merged column styles must not re-align the placeholder text.
    let first = &mut grid.cells[1][0];
    first
        .style
        .get_or_insert_with(HashMap::new)
        .insert("textAlign".to_owned(), "left".to_owned());

    Some(grid.cells)
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    /// In-memory store mirroring the update-only put contract.
    pub struct MemoryStore {
        objects: RwLock<HashMap<String, String>>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            MemoryStore {
                objects: RwLock::new(HashMap::new()),
            }
        }

        pub async fn seed(&self, code: &str, document: &str) {
            self.objects
                .write()
                .await
                .insert(code.to_owned(), document.to_owned());
        }
    }

    #[async_trait]
    impl MetadataStore for MemoryStore {
        async fn get(&self, code: &str) -> Result<Option<String>, ReportError> {
            Ok(self.objects.read().await.get(code).cloned())
        }

        async fn put(&self, code: &str, document: &str) -> Result<(), ReportError> {
            let mut objects = self.objects.write().await;
            if !objects.contains_key(code) {
                return Err(ReportError::NotFound(code.to_owned()));
            }
            objects.insert(code.to_owned(), document.to_owned());
            Ok(())
        }
    }

    fn spec_with_ref() -> String {
        r#"{
            "name": "marks",
            "caption": "Успеваемость",
            "sourceType": "database",
            "dimensions": {
                "filter": [
                    {"name": "placeholder", "ref": "dim.period"}
                ]
            },
            "table": [
                {"name": "school", "caption": "Школа"},
                {"name": "mark", "caption": "Оценка"}
            ]
        }"#
        .to_owned()
    }

    fn referenced_dimension() -> String {
        r#"{
            "name": "Period",
            "caption": "Период",
            "type": "datePicker",
            "level": "Учебный год",
            "dimension": "[Период]",
            "required": true,
            "selectionMode": "multiple",
            "isStatic": true,
            "staticValues": [{"name": "[2023]", "caption": "2023/2024"}],
            "query": {"sql": "select 1", "parameters": [{"name": "@p", "source": "District"}]}
        }"#
        .to_owned()
    }

    #[tokio::test]
    async fn resolve_clones_referenced_dimension() {
        let store = MemoryStore::new();
        store.seed("marks", &spec_with_ref()).await;
        store.seed("dim.period", &referenced_dimension()).await;

        let spec = resolve(&store, "marks").await.unwrap();
        let dimension = &spec.dimensions["filter"][0];

        assert!(dimension.ref_object.is_none());
        assert_eq!(dimension.name, "Period");
        assert_eq!(dimension.caption.as_deref(), Some("Период"));
        assert_eq!(dimension.control_type, ControlType::DatePicker);
        assert_eq!(dimension.level.as_deref(), Some("Учебный год"));
        assert_eq!(dimension.dimension_key.as_deref(), Some("[Период]"));
        assert!(dimension.required);
        assert_eq!(dimension.selection_mode, SelectionMode::Multiple);
        assert!(dimension.is_static);
        assert_eq!(dimension.static_values.as_ref().unwrap().len(), 1);
        assert!(dimension.query.is_some());
    }

    #[tokio::test]
    async fn missing_reference_is_not_found() {
        let store = MemoryStore::new();
        store.seed("marks", &spec_with_ref()).await;

        match resolve(&store, "marks").await {
            Err(ReportError::NotFound(name)) => assert_eq!(name, "dim.period"),
            other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn missing_report_is_not_found() {
        let store = MemoryStore::new();
        match resolve(&store, "nope").await {
            Err(ReportError::NotFound(name)) => assert_eq!(name, "nope"),
            other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn push_then_pull_round_trips() {
        let store = MemoryStore::new();
        store.seed("marks", &spec_with_ref()).await;

        let mut spec = pull(&store, "marks").await.unwrap();
        spec.caption = Some("Успеваемость школ Перми".to_owned());
        push(&store, &spec).await.unwrap();

        let pulled = pull(&store, "marks").await.unwrap();
        assert_eq!(pulled, spec);
    }

    #[tokio::test]
    async fn push_unknown_name_is_not_found() {
        let store = MemoryStore::new();
        let spec: ReportSpec = serde_json::from_str(&spec_with_ref()).unwrap();
        assert!(matches!(
            push(&store, &spec).await,
            Err(ReportError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn projection_strips_sql_and_derives_depends() {
        let store = MemoryStore::new();
        store.seed("marks", &spec_with_ref()).await;
        store.seed("dim.period", &referenced_dimension()).await;

        let spec = resolve(&store, "marks").await.unwrap();
        let meta = project(&spec);

        let dimension = &meta.dimensions["filter"][0];
        assert_eq!(dimension.depends.as_ref().unwrap(), &vec!["District".to_owned()]);

        let json = serde_json::to_string(&meta).unwrap();
        assert!(!json.contains("select 1"));
        assert!(!json.contains("sql"));

        // Placeholder grid: one header row and one data row shaped to the
        // column count.
        let cells = meta.cells.unwrap();
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].len(), 2);
        assert_eq!(cells[1].len(), 2);
        assert_eq!(cells[1][0].value, Some(NO_DATA.into()));
        assert_eq!(cells[1][0].col_span, 2);
        assert_eq!(cells[1][1].col_span, -1);
        assert_eq!(cells[1][0].style.as_ref().unwrap()["textAlign"], "left");
    }

    #[tokio::test]
    async fn olap_projection_uses_generic_placeholder() {
        let spec = ReportSpec {
            name: "olap".into(),
            caption: None,
            caption_pattern: None,
            source_type: SourceType::Olap,
            query: None,
            dimensions: HashMap::new(),
            table: None,
            cube: None,
            styles: None,
        };
        let meta = project(&spec);
        let cells = meta.cells.unwrap();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0][0].name.as_deref(), Some("[нет данных]"));
    }

    #[tokio::test]
    async fn cyrillic_round_trips_through_push() {
        let store = MemoryStore::new();
        store.seed("marks", &spec_with_ref()).await;

        let spec = pull(&store, "marks").await.unwrap();
        push(&store, &spec).await.unwrap();
        let stored = store.get("marks").await.unwrap().unwrap();
        assert!(stored.contains("Успеваемость"));
    }
}
