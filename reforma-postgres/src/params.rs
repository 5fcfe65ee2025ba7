//! Query parameter binding.
//!
//! A parameter spec names the dimension supplying its value, a declared
//! scalar type and an array flag. Selected element identifiers may carry a
//! bracketed qualifier prefix (`[42]Школа №3`) whose bracket content is the
//! value used for joins. Absent or empty selections bind a typed NULL so
//! queries can tolerate optional filters.

use chrono::{NaiveDate, NaiveDateTime};
use tokio_postgres::types::{IsNull, ToSql, Type};

use reforma_core::{Element, ParamSpec, ReportError};

#[derive(Debug)]
pub enum BindValue {
    Int(Option<i32>),
    IntArray(Vec<i32>),
    Timestamp(Option<NaiveDateTime>),
    TimestampArray(Vec<NaiveDateTime>),
    /// Untyped NULL for parameters with no recognized declared type.
    Null,
}

/// NULL that satisfies any parameter type the prepared statement expects.
#[derive(Debug)]
struct AnyNull;

impl ToSql for AnyNull {
    fn to_sql(
        &self,
        _ty: &Type,
        _out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        Ok(IsNull::Yes)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    fn to_sql_checked(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        self.to_sql(ty, out)
    }
}

static ANY_NULL: AnyNull = AnyNull;

impl BindValue {
    fn as_sql(&self) -> &(dyn ToSql + Sync) {
        match self {
            BindValue::Int(v) => v,
            BindValue::IntArray(v) => v,
            BindValue::Timestamp(v) => v,
            BindValue::TimestampArray(v) => v,
            BindValue::Null => &ANY_NULL,
        }
    }
}

pub fn sql_params(values: &[BindValue]) -> Vec<&(dyn ToSql + Sync)> {
    values.iter().map(BindValue::as_sql).collect()
}

/// Builds one bind value per declared spec, in declared order. `selection`
/// resolves a parameter source to the matching axis selection's elements.
pub fn bind_parameters<'a>(
    specs: &[ParamSpec],
    selection: impl Fn(&str) -> &'a [Element],
) -> Result<Vec<BindValue>, ReportError> {
    specs
        .iter()
        .map(|spec| build_parameter(spec, selection(&spec.source)))
        .collect()
}

fn build_parameter(spec: &ParamSpec, elements: &[Element]) -> Result<BindValue, ReportError> {
    let data_type = spec.data_type.as_deref().unwrap_or("");

    if elements.is_empty() {
        return Ok(match data_type {
            "Int32" => BindValue::Int(None),
            "DateTime" => BindValue::Timestamp(None),
            _ => BindValue::Null,
        });
    }

    match data_type {
        "Int32" => {
            if spec.is_array {
                let values = elements
                    .iter()
                    .map(|e| parse_int(spec, &e.name))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(BindValue::IntArray(values))
            } else {
                Ok(BindValue::Int(Some(parse_int(spec, &elements[0].name)?)))
            }
        }
        "DateTime" => {
            if spec.is_array {
                let values = elements
                    .iter()
                    .map(|e| parse_timestamp(spec, &e.name))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(BindValue::TimestampArray(values))
            } else {
                Ok(BindValue::Timestamp(Some(parse_timestamp(
                    spec,
                    &elements[0].name,
                )?)))
            }
        }
        _ => Ok(BindValue::Null),
    }
}

/// `[42]Школа №3` -> `42`; without a bracketed prefix the whole identifier
/// is the value.
pub fn extract_id(value: &str) -> &str {
    if value.starts_with('[') {
        if let Some(end) = value.find(']') {
            return &value[1..end];
        }
    }
    value
}

fn parse_int(spec: &ParamSpec, value: &str) -> Result<i32, ReportError> {
    let id = extract_id(value);
    id.parse::<i32>().map_err(|_| {
        ReportError::Validation(format!(
            "значение {} параметра {} не является числом",
            id, spec.name
        ))
    })
}

fn parse_timestamp(spec: &ParamSpec, value: &str) -> Result<NaiveDateTime, ReportError> {
    let id = extract_id(value);

    NaiveDateTime::parse_from_str(id, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(id, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDate::parse_from_str(id, "%Y-%m-%d").map(|d| d.and_hms_opt(0, 0, 0).unwrap()))
        .map_err(|_| {
            ReportError::Validation(format!(
                "значение {} параметра {} не является датой",
                id, spec.name
            ))
        })
}

#[cfg(test)]
mod test {
    use super::*;

    fn spec(name: &str, data_type: &str, is_array: bool) -> ParamSpec {
        ParamSpec {
            name: name.into(),
            is_array,
            data_type: Some(data_type.into()),
            source: "District".into(),
        }
    }

    fn elements(names: &[&str]) -> Vec<Element> {
        names.iter().map(|n| Element::new(*n, *n)).collect()
    }

    #[test]
    fn bracketed_qualifier_is_the_identifier() {
        assert_eq!(extract_id("[42]Some School"), "42");
        assert_eq!(extract_id("[2023-09-01]2023/2024"), "2023-09-01");
        assert_eq!(extract_id("plain"), "plain");
    }

    #[test]
    fn scalar_int_takes_first_element_only() {
        let selected = elements(&["[42]Some School", "[43]Other School"]);
        let bound = build_parameter(&spec("$1", "Int32", false), &selected).unwrap();
        assert!(matches!(bound, BindValue::Int(Some(42))));
    }

    #[test]
    fn array_int_takes_every_element() {
        let selected = elements(&["[42]A", "[43]B"]);
        let bound = build_parameter(&spec("$1", "Int32", true), &selected).unwrap();
        match bound {
            BindValue::IntArray(values) => assert_eq!(values, vec![42, 43]),
            other => panic!("expected an array, got {:?}", other),
        }
    }

    #[test]
    fn empty_selection_binds_typed_null() {
        assert!(matches!(
            build_parameter(&spec("$1", "Int32", false), &[]).unwrap(),
            BindValue::Int(None)
        ));
        assert!(matches!(
            build_parameter(&spec("$1", "DateTime", false), &[]).unwrap(),
            BindValue::Timestamp(None)
        ));
        assert!(matches!(
            build_parameter(&spec("$1", "String", false), &[]).unwrap(),
            BindValue::Null
        ));
    }

    #[test]
    fn dates_parse_in_iso_forms() {
        let selected = elements(&["[2023-09-01]Учебный год"]);
        let bound = build_parameter(&spec("$1", "DateTime", false), &selected).unwrap();
        match bound {
            BindValue::Timestamp(Some(ts)) => {
                assert_eq!(ts.to_string(), "2023-09-01 00:00:00")
            }
            other => panic!("expected a timestamp, got {:?}", other),
        }
    }

    #[test]
    fn unparsable_int_is_a_validation_error() {
        let selected = elements(&["[abc]School"]);
        let result = build_parameter(&spec("$1", "Int32", false), &selected);
        assert!(matches!(result, Err(ReportError::Validation(_))));
    }

    #[test]
    fn binding_follows_declared_order() {
        let specs = vec![spec("$1", "Int32", false), spec("$2", "Int32", true)];
        let selected = elements(&["[7]Район"]);
        let bound = bind_parameters(&specs, |_| &selected).unwrap();
        assert_eq!(bound.len(), 2);
        assert!(matches!(bound[0], BindValue::Int(Some(7))));
        assert!(matches!(&bound[1], BindValue::IntArray(v) if v == &vec![7]));
    }
}
