//! reforma-core contains the backend-agnostic heart of the report service.
//!
//! A request names a stored report definition (`ReportSpec`); the metadata
//! module loads it and resolves dimension references. The `QueryDispatcher`
//! routes the request to one `QueryExecutor` (relational database or remote
//! OLAP service) which returns the raw cell grid. The style module then
//! applies the backend-agnostic transforms: caption templating, row-span
//! merging, style application and number formatting.
//!
//! Backends live in their own crates (reforma-postgres, reforma-saiku) and
//! plug in through the `QueryExecutor` capability, so the pipeline itself
//! never switches on the source type.

pub mod access;
mod backend;
pub mod elements;
mod error;
pub mod format;
mod grid;
pub mod metadata;
pub mod pipeline;
mod report;
mod request;
pub mod style;
pub mod totals;

pub use self::backend::{QueryDispatcher, QueryExecutor};
pub use self::error::ReportError;
pub use self::grid::{value_to_f64, Cell, CellType, Grid, StyleMap, Styles};
pub use self::report::{
    AggregateType, ColumnSpec, ControlType, CubeRef, DimensionSpec, ParamSpec, QuerySpec,
    ReportSpec, Restrict, RestrictShift, SearchMode, SelectionMode, SourceType,
};
pub use self::request::{
    AxisSelection, Element, ElementRequest, MetadataRequest, ReportQuery, Selection,
};

/// Axis key that carries measures instead of hierarchy selections.
pub const MEASURE_AXIS: &str = "measure";

/// Axis key whose members do not force non-empty evaluation.
pub const FILTER_AXIS: &str = "filter";
