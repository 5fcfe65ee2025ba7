//! Relational backend for reforma.
//!
//! A connection is scoped to one request: opened for a single command and
//! released on every exit path (dropping the client ends the spawned
//! connection task). Stored SQL uses positional `$n` placeholders; the
//! definition's ordered parameter specs supply the values.

use async_trait::async_trait;
use log::info;
use tokio_postgres::{Client, NoTls};

use reforma_core::{
    totals, Cell, DimensionSpec, Element, ElementRequest, Grid, QueryExecutor, ReportError,
    ReportQuery, ReportSpec,
};

mod access;
mod df;
mod params;
mod store;

pub use self::access::PgAccessLookup;
pub use self::store::PgMetadataStore;

#[derive(Clone)]
pub struct Postgres {
    db_url: String,
}

impl Postgres {
    pub fn new(db_url: impl Into<String>) -> Self {
        Postgres {
            db_url: db_url.into(),
        }
    }

    pub(crate) async fn connect(&self) -> Result<Client, ReportError> {
        let (client, connection) = tokio_postgres::connect(&self.db_url, NoTls)
            .await
            .map_err(ReportError::upstream)?;

        tokio::spawn(async move {
            if let Err(err) = connection.await {
                log::error!("postgres connection error: {}", err);
            }
        });

        Ok(client)
    }
}

#[async_trait]
impl QueryExecutor for Postgres {
    async fn get_elements(
        &self,
        request: &ElementRequest,
        _spec: &ReportSpec,
        dimension: &DimensionSpec,
    ) -> Result<Vec<Element>, ReportError> {
        let query = dimension.query.as_ref().ok_or_else(|| {
            ReportError::Validation(format!(
                "Измерение {} не содержит запроса значений",
                dimension.name
            ))
        })?;

        let bound = params::bind_parameters(query.parameters.as_deref().unwrap_or(&[]), |source| {
            request
                .find_selection(source)
                .map(|s| s.values())
                .unwrap_or(&[])
        })?;

        let client = self.connect().await?;
        let rows = client
            .query(query.sql.as_str(), &params::sql_params(&bound))
            .await
            .map_err(ReportError::upstream)?;

        let mut elements = Vec::with_capacity(rows.len());
        for row in &rows {
            elements.push(Element {
                name: row.try_get(0).map_err(ReportError::upstream)?,
                caption: Some(row.try_get(1).map_err(ReportError::upstream)?),
                unique_name: None,
            });
        }

        info!(
            "dimension {} of {}: {} candidate elements",
            dimension.name,
            request.name,
            elements.len()
        );
        Ok(elements)
    }

    async fn execute_query(
        &self,
        query: &ReportQuery,
        spec: &ReportSpec,
    ) -> Result<Grid, ReportError> {
        let table = spec.table.as_ref().ok_or_else(|| {
            ReportError::Validation(format!(
                "Отчетная форма {} не содержит описания таблицы",
                spec.name
            ))
        })?;
        let query_spec = spec.query.as_ref().ok_or_else(|| {
            ReportError::Validation(format!("Отчетная форма {} не содержит запроса", spec.name))
        })?;

        let bound =
            params::bind_parameters(query_spec.parameters.as_deref().unwrap_or(&[]), |source| {
                query
                    .find_selection(source)
                    .map(|s| s.values())
                    .unwrap_or(&[])
            })?;

        let client = self.connect().await?;
        let rows = client
            .query(query_spec.sql.as_str(), &params::sql_params(&bound))
            .await
            .map_err(ReportError::upstream)?;

        // The first grid row is always the synthesized header, in declared
        // column order.
        let header = table
            .iter()
            .map(|column| Cell::column_header(column.caption.clone(), &column.name))
            .collect();

        let mut cells = vec![header];
        for row in &rows {
            cells.push(df::row_to_cells(row, table)?);
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
