//! Dimension element resolution: pick the backend by the dimension's source
//! type, fetch candidates, then narrow them by the caller's access policy.

use log::error;

use crate::access::{self, AccessLookup, ClaimMap};
use crate::backend::QueryDispatcher;
use crate::error::ReportError;
use crate::metadata::{self, MetadataStore};
use crate::request::{Element, ElementRequest};

pub async fn resolve_elements(
    store: &dyn MetadataStore,
    dispatcher: &QueryDispatcher,
    lookup: &dyn AccessLookup,
    claims: Option<&ClaimMap>,
    request: &ElementRequest,
) -> Result<Vec<Element>, ReportError> {
    let spec = metadata::resolve(store, &request.name).await?;

    let dimension = spec
        .find_dimension(&request.dimension)
        .ok_or_else(|| ReportError::DimensionNotFound {
            report: request.name.clone(),
            dimension: request.dimension.clone(),
        })?;

    if dimension.is_static {
        return Ok(dimension.static_values.clone().unwrap_or_default());
    }

    let executor = dispatcher.executor_for(dimension.source_type);
    let candidates = executor.get_elements(request, &spec, dimension).await?;

    // Filtering is best-effort: any failure inside the access policy is
    // logged and the unfiltered candidate set is returned. This is the only
    // place FilterError is swallowed (fail-open, preserved as observed).
    match access::narrow_elements(claims, lookup, &request.dimension, &candidates).await {
        Ok(narrowed) => Ok(narrowed),
        Err(err) => {
            error!(
                "access filter failed for {}/{}, returning unfiltered set: {}",
                request.name, request.dimension, err
            );
            Ok(candidates)
        }
    }
}
