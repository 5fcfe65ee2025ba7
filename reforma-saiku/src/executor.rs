//! The OLAP query executor: converts per-axis dimension selections into the
//! Saiku axis model, remaps the returned cellset into the canonical grid,
//! and leaves totals alone — the service embeds its own subtotal rows.

use async_trait::async_trait;
use log::info;
use serde_json::Value;
use std::collections::HashMap;

use reforma_core::{
    Cell, CellType, CubeRef, DimensionSpec, Element, ElementRequest, Grid, QueryExecutor,
    ReportError, ReportQuery, ReportSpec, FILTER_AXIS, MEASURE_AXIS,
};

use crate::client::SaikuClient;
use crate::model::{
    SaikuAxis, SaikuDetails, SaikuHierarchy, SaikuLevel, SaikuMember, SaikuQuery, SaikuQueryModel,
    SaikuSelection, SaikuSetSession,
};

pub struct SaikuExecutor {
    client: SaikuClient,
    /// Per-request connection switch; suffixed onto the cube coordinates
    /// before every call.
    route_postfix: Option<String>,
}

impl SaikuExecutor {
    pub fn new(client: SaikuClient, route_postfix: Option<String>) -> Self {
        SaikuExecutor {
            client,
            route_postfix,
        }
    }

    fn routed_cube(&self, spec: &ReportSpec) -> Result<CubeRef, ReportError> {
        let mut cube = spec.cube.clone().ok_or_else(|| {
            ReportError::Validation(format!(
                "Отчетная форма {} не содержит описания куба",
                spec.name
            ))
        })?;

        if let Some(postfix) = self.route_postfix.as_deref() {
            cube.connection.push_str(postfix);
            cube.catalog.push_str(postfix);
            cube.schema.push_str(postfix);
        }

        Ok(cube)
    }

    fn session_name(spec: &ReportSpec, cube: &CubeRef) -> String {
        format!("{}_{}", spec.name, cube.connection)
    }
}

#[async_trait]
impl QueryExecutor for SaikuExecutor {
    async fn get_elements(
        &self,
        request: &ElementRequest,
        spec: &ReportSpec,
        dimension: &DimensionSpec,
    ) -> Result<Vec<Element>, ReportError> {
        let cube = self.routed_cube(spec)?;
        let session_name = Self::session_name(spec, &cube);

        self.client
            .set_session(&SaikuSetSession {
                name: session_name.clone(),
                cube: cube.clone(),
            })
            .await?;

        let hierarchy = hierarchy_name(&dimension.name);
        let level = dimension.level.as_deref().ok_or_else(|| {
            ReportError::Validation(format!("Измерение {} не содержит уровня", dimension.name))
        })?;

        let mut members = self
            .client
            .level_members(&session_name, hierarchy, level, request.search.as_deref())
            .await?;

        // The service's unique name becomes the element identifier.
        for member in members.iter_mut() {
            if let Some(unique) = member.unique_name.take() {
                member.name = unique;
            }
        }

        info!(
            "dimension {} of {}: {} OLAP members",
            dimension.name,
            request.name,
            members.len()
        );
        Ok(members)
    }

    async fn execute_query(
        &self,
        query: &ReportQuery,
        spec: &ReportSpec,
    ) -> Result<Grid, ReportError> {
        let cube = self.routed_cube(spec)?;
        let session_name = Self::session_name(spec, &cube);

        self.client
            .set_session(&SaikuSetSession {
                name: session_name,
                cube: cube.clone(),
            })
            .await?;

        let saiku_query = SaikuQuery {
            cube,
            name: spec.name.clone(),
            query_model: convert_model(query, spec)?,
        };

        let result = self.client.execute(&saiku_query).await?;

        let cells = result
            .cellset
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| {
                        let cell_type: CellType = cell.cell_type.into();
                        let name = match cell_type {
                            CellType::ColumnHeader | CellType::RowHeader => cell
                                .properties
                                .and_then(|p| p.unique_name),
                            _ => None,
                        };
                        Cell {
                            value: cell.value.map(Value::String),
                            cell_type,
                            name,
                            ..Cell::default()
                        }
                    })
                    .collect()
            })
            .collect();

        Ok(Grid::from_cells(cells))
    }

    async fn calculate_totals(
        &self,
        _grid: &mut Grid,
        _spec: &ReportSpec,
    ) -> Result<(), ReportError> {
        // The cellset already carries the service's subtotal rows.
        Ok(())
    }
}

/// Compound dimension names (`Хоз:Показатель`) address one hierarchy.
fn hierarchy_name(dimension_name: &str) -> &str {
    dimension_name
        .split(':')
        .next()
        .unwrap_or(dimension_name)
}

/// A compound unique name marks a cross-join of two hierarchy members; only
/// the segment after the last `]:[` marker addresses the member itself.
fn effective_unique_name(value: &str) -> &str {
    match value.rfind("]:[") {
        Some(index) => &value[index + 2..],
        None => value,
    }
}

/// `[Регион].[Север]` -> `Север`.
fn short_name(unique_name: &str) -> String {
    unique_name
        .split('.')
        .last()
        .unwrap_or(unique_name)
        .trim_matches(|c| c == '[' || c == ']')
        .to_owned()
}

fn convert_model(query: &ReportQuery, spec: &ReportSpec) -> Result<SaikuQueryModel, ReportError> {
    let mut axes = HashMap::new();

    for (axis_key, selections) in query
        .dimensions
        .iter()
        .filter(|(k, _)| k.as_str() != MEASURE_AXIS)
    {
        let mut hierarchies = Vec::with_capacity(selections.len());

        for selection in selections {
            let dimension = spec.find_dimension(&selection.dimension).ok_or_else(|| {
                ReportError::DimensionNotFound {
                    report: spec.name.clone(),
                    dimension: selection.dimension.clone(),
                }
            })?;

            let level_name = dimension.level.clone().unwrap_or_default();

            let members = selection
                .values()
                .iter()
                .map(|element| {
                    let unique = effective_unique_name(&element.name);
                    SaikuMember {
                        name: short_name(unique),
                        unique_name: Some(unique.to_owned()),
                        caption: element.caption.clone(),
                    }
                })
                .collect::<Vec<_>>();

            let level = SaikuLevel {
                caption: dimension.caption.clone(),
                name: level_name.clone(),
                selection: if members.is_empty() {
                    None
                } else {
                    Some(SaikuSelection { members })
                },
            };

            let mut levels = HashMap::new();
            levels.insert(level_name, level);

            hierarchies.push(SaikuHierarchy {
                name: hierarchy_name(&dimension.name).to_owned(),
                caption: dimension.caption.clone(),
                dimension: dimension.dimension_key.clone(),
                levels,
            });
        }

        let location = axis_key.to_uppercase();
        axes.insert(
            location.clone(),
            SaikuAxis {
                location,
                hierarchies,
                aggregators: None,
                non_empty: axis_key.as_str() != FILTER_AXIS,
            },
        );
    }

    let mut details = SaikuDetails::default();
    if let Some(first) = query
        .dimensions
        .get(MEASURE_AXIS)
        .and_then(|selections| selections.first())
    {
        let values = first.values();
        if !values.is_empty() {
            details.measures = Some(
                values
                    .iter()
                    .map(|element| SaikuMember {
                        name: element.name.clone(),
                        unique_name: element.unique_name.clone(),
                        caption: element.caption.clone(),
                    })
                    .collect(),
            );
        }
    }

    Ok(SaikuQueryModel { axes, details })
}
