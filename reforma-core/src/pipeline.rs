//! The per-request report pipeline: resolve metadata, execute on the routed
//! backend, aggregate totals, post-process the grid.
//!
//! A `ReportService` is built per request (executors carry the request's
//! connection routing) and owns no cross-request state; dropping it cancels
//! nothing but the request's own in-flight backend calls. Either a complete,
//! fully post-processed grid comes back or an error does.

use std::sync::Arc;

use crate::access::{AccessLookup, ClaimMap};
use crate::backend::QueryDispatcher;
use crate::elements;
use crate::error::ReportError;
use crate::grid::Grid;
use crate::metadata::{self, ClientMetadata, MetadataStore};
use crate::request::{Element, ElementRequest, ReportQuery};
use crate::report::ReportSpec;
use crate::style;

pub struct ReportService {
    store: Arc<dyn MetadataStore>,
    dispatcher: QueryDispatcher,
    lookup: Arc<dyn AccessLookup>,
}

impl ReportService {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        dispatcher: QueryDispatcher,
        lookup: Arc<dyn AccessLookup>,
    ) -> Self {
        ReportService {
            store,
            dispatcher,
            lookup,
        }
    }

    /// Client projection of a resolved definition.
    pub async fn metadata(&self, name: &str) -> Result<ClientMetadata, ReportError> {
        let spec = metadata::resolve(self.store.as_ref(), name).await?;
        Ok(metadata::project(&spec))
    }

    /// Candidate values for one dimension, narrowed by the caller's claims.
    pub async fn elements(
        &self,
        claims: Option<&ClaimMap>,
        request: &ElementRequest,
    ) -> Result<Vec<Element>, ReportError> {
        elements::resolve_elements(
            self.store.as_ref(),
            &self.dispatcher,
            self.lookup.as_ref(),
            claims,
            request,
        )
        .await
    }

    /// Full query pipeline. `skip_formatting` leaves numeric values raw for
    /// export paths.
    pub async fn query(
        &self,
        query: &ReportQuery,
        skip_formatting: bool,
    ) -> Result<Grid, ReportError> {
        let spec = metadata::resolve(self.store.as_ref(), &query.name).await?;

        let executor = self.dispatcher.executor_for(spec.source_type);
        let mut grid = executor.execute_query(query, &spec).await?;
        executor.calculate_totals(&mut grid, &spec).await?;

        style::apply(Some(query), &mut grid, &spec, skip_formatting).await;

        Ok(grid)
    }

    pub async fn pull(&self, name: &str) -> Result<ReportSpec, ReportError> {
        metadata::pull(self.store.as_ref(), name).await
    }

    pub async fn push(&self, spec: &ReportSpec) -> Result<(), ReportError> {
        metadata::push(self.store.as_ref(), spec).await
    }
}
