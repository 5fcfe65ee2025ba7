//! End-to-end pipeline behaviour over mock backends: metadata resolution,
//! execution, totals, and the post-processing passes in order.

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use reforma_core::access::{AccessLookup, ClaimMap, FilterError};
use reforma_core::metadata::MetadataStore;
use reforma_core::pipeline::ReportService;
use reforma_core::{
    totals, Cell, CellType, DimensionSpec, Element, ElementRequest, Grid, QueryDispatcher,
    QueryExecutor, ReportError, ReportQuery, ReportSpec,
};

struct MemoryStore {
    objects: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    fn with(objects: &[(&str, &str)]) -> Self {
        MemoryStore {
            objects: RwLock::new(
                objects
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
        }
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

/// Database-style executor producing a fixed result set.
struct FakeDatabase {
    rows: Vec<Vec<serde_json::Value>>,
    elements: Vec<Element>,
}

#[async_trait]
impl QueryExecutor for FakeDatabase {
    async fn get_elements(
        &self,
        _request: &ElementRequest,
        _spec: &ReportSpec,
        _dimension: &DimensionSpec,
    ) -> Result<Vec<Element>, ReportError> {
        Ok(self.elements.clone())
    }

    async fn execute_query(
        &self,
        _query: &ReportQuery,
        spec: &ReportSpec,
    ) -> Result<Grid, ReportError> {
        let table = spec.table.as_ref().unwrap();
        let header = table
            .iter()
            .map(|column| Cell::column_header(column.caption.clone(), &column.name))
            .collect();

        let mut cells = vec![header];
        for row in &self.rows {
            cells.push(row.iter().map(|v| Cell::data(Some(v.clone()))).collect());
        }
        Ok(Grid::from_cells(cells))
    }

    async fn calculate_totals(
        &self,
        grid: &mut Grid,
        spec: &ReportSpec,
    ) -> Result<(), ReportError> {
        if let Some(table) = spec.table.as_ref() {
            totals::append_totals(grid, table);
        }
        Ok(())
    }
}

/// Stands in for the OLAP side; the tests here never route to it.
struct Unreachable;

#[async_trait]
impl QueryExecutor for Unreachable {
    async fn get_elements(
        &self,
        _request: &ElementRequest,
        _spec: &ReportSpec,
        _dimension: &DimensionSpec,
    ) -> Result<Vec<Element>, ReportError> {
        Err(ReportError::Upstream("не должен вызываться".into()))
    }

    async fn execute_query(
        &self,
        _query: &ReportQuery,
        _spec: &ReportSpec,
    ) -> Result<Grid, ReportError> {
        Err(ReportError::Upstream("не должен вызываться".into()))
    }

    async fn calculate_totals(
        &self,
        _grid: &mut Grid,
        _spec: &ReportSpec,
    ) -> Result<(), ReportError> {
        Ok(())
    }
}

struct FailingLookup;

#[async_trait]
impl AccessLookup for FailingLookup {
    async fn district_parents(&self, _districts: &[i32]) -> Result<Vec<i64>, FilterError> {
        Err(FilterError::Lookup("нет соединения".into()))
    }

    async fn teacher_classes(&self, _subject: &str) -> Result<Vec<i64>, FilterError> {
        Err(FilterError::Lookup("нет соединения".into()))
    }

    async fn teacher_profiles(&self, _subject: &str) -> Result<Vec<i64>, FilterError> {
        Err(FilterError::Lookup("нет соединения".into()))
    }
}

const ATTENDANCE_SPEC: &str = r##"{
    "name": "attendance",
    "caption": "Посещаемость",
    "captionPattern": "Посещаемость за {{ Период }}",
    "sourceType": "database",
    "query": {"sql": "select district, visits from report.attendance"},
    "dimensions": {
        "filter": [
            {"name": "District", "caption": "Район"},
            {"name": "[Период]", "caption": "Период"}
        ]
    },
    "table": [
        {"name": "district", "caption": "Район", "canRowSpan": true},
        {"name": "visits", "caption": "Посещения", "aggregate": "sum", "format": "#,##0.00"}
    ]
}"##;

fn service(rows: Vec<Vec<serde_json::Value>>, elements: Vec<Element>) -> ReportService {
    ReportService::new(
        Arc::new(MemoryStore::with(&[("attendance", ATTENDANCE_SPEC)])),
        QueryDispatcher::new(
            Box::new(FakeDatabase { rows, elements }),
            Box::new(Unreachable),
        ),
        Arc::new(FailingLookup),
    )
}

fn query() -> ReportQuery {
    serde_json::from_str(
        r#"{
            "name": "attendance",
            "dimensions": {
                "filter": [
                    {"dimension": "[Период]", "selection": {"values": [{"name": "[2023]", "caption": "2023/2024"}]}}
                ]
            }
        }"#,
    )
    .unwrap()
}

#[tokio::test]
async fn query_runs_the_whole_pipeline() {
    let rows = vec![
        vec![json!("Дзержинский"), json!(10.0)],
        vec![json!("Дзержинский"), json!(20.0)],
        vec![json!("Свердловский"), json!(30.5)],
    ];
    let service = service(rows, vec![]);

    let grid = service.query(&query(), false).await.unwrap();

    // caption rendered against the first selected element
    assert_eq!(grid.caption.as_deref(), Some("Посещаемость за 2023/2024"));
    assert_eq!(grid.base_caption.as_deref(), Some("Посещаемость"));

    // header row, three data rows, totals row
    assert_eq!(grid.cells.len(), 5);
    assert_eq!(grid.cells[0][0].cell_type, CellType::ColumnHeader);

    // row-span merge on the first column
    assert_eq!(grid.cells[1][0].row_span, 2);
    assert_eq!(grid.cells[2][0].row_span, -1);
    assert_eq!(grid.cells[3][0].row_span, 1);

    // totals: sum of the visits column, formatted like the data cells
    let total_row = grid.cells.last().unwrap();
    assert_eq!(total_row[0].cell_type, CellType::TotalCell);
    assert_eq!(total_row[1].value, Some(json!("60,50")));

    // data cells of the formatted column render with the Russian locale
    assert_eq!(grid.cells[3][1].value, Some(json!("30,50")));

    // header width defaulted
    assert_eq!(grid.cells[0][0].width, Some(150));
}

#[tokio::test]
async fn export_path_keeps_raw_numbers() {
    let rows = vec![vec![json!("Дзержинский"), json!(10.0)]];
    let service = service(rows, vec![]);

    let grid = service.query(&query(), true).await.unwrap();

    assert_eq!(grid.cells[1][1].value, Some(json!(10.0)));
    assert_eq!(grid.cells.last().unwrap()[1].value, Some(json!(10.0)));
    // styles and spans still applied on the export path
    assert_eq!(grid.cells[0][0].width, Some(150));
}

#[tokio::test]
async fn unknown_report_is_not_found() {
    let service = service(vec![], vec![]);
    let mut unknown = query();
    unknown.name = "missing".into();

    assert!(matches!(
        service.query(&unknown, false).await,
        Err(ReportError::NotFound(name)) if name == "missing"
    ));
}

#[tokio::test]
async fn element_filtering_fails_open_on_lookup_errors() {
    let elements = vec![
        Element::new("7", "Дзержинский"),
        Element::new("12", "Мотовилихинский"),
    ];
    let service = service(vec![], elements.clone());

    let mut claims = ClaimMap::new();
    claims.insert("roles".into(), "user".into());
    claims.insert("ATTR_DISTRICT".into(), "7".into());

    let request = ElementRequest {
        name: "attendance".into(),
        dimension: "District".into(),
        search: None,
        selections: vec![],
    };

    // the district lookup errors out; the unfiltered set must come back
    let narrowed = service.elements(Some(&claims), &request).await.unwrap();
    assert_eq!(narrowed, elements);
}

#[tokio::test]
async fn unknown_dimension_is_a_dimension_error() {
    let service = service(vec![], vec![]);
    let request = ElementRequest {
        name: "attendance".into(),
        dimension: "Nope".into(),
        search: None,
        selections: vec![],
    };

    assert!(matches!(
        service.elements(None, &request).await,
        Err(ReportError::DimensionNotFound { .. })
    ));
}
