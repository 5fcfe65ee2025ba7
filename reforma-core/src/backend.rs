use async_trait::async_trait;

use crate::error::ReportError;
use crate::grid::Grid;
use crate::report::{DimensionSpec, ReportSpec, SourceType};
use crate::request::{Element, ElementRequest, ReportQuery};

/// One backend's view of the pipeline: candidate elements, query execution
/// and totals. Implementations map their raw rows/cells into the canonical
/// grid; everything after that is backend-agnostic.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Candidate values for one dimension of a report.
    async fn get_elements(
        &self,
        request: &ElementRequest,
        spec: &ReportSpec,
        dimension: &DimensionSpec,
    ) -> Result<Vec<Element>, ReportError>;

    /// Executes the report query and returns the raw grid; the first row is
    /// a ColumnHeader row.
    async fn execute_query(
        &self,
        query: &ReportQuery,
        spec: &ReportSpec,
    ) -> Result<Grid, ReportError>;

    /// Appends the totals row. Backends whose results already embed
    /// subtotals implement this as a no-op.
    async fn calculate_totals(
        &self,
        grid: &mut Grid,
        spec: &ReportSpec,
    ) -> Result<(), ReportError>;
}

/// Routes a definition to its executor once, by source type, so source-type
/// switches stay out of the rest of the pipeline.
pub struct QueryDispatcher {
    database: Box<dyn QueryExecutor>,
    olap: Box<dyn QueryExecutor>,
}

impl QueryDispatcher {
    pub fn new(database: Box<dyn QueryExecutor>, olap: Box<dyn QueryExecutor>) -> Self {
        QueryDispatcher { database, olap }
    }

    pub fn executor_for(&self, source: SourceType) -> &dyn QueryExecutor {
        match source {
            SourceType::Database => self.database.as_ref(),
            SourceType::Olap => self.olap.as_ref(),
        }
    }
}
