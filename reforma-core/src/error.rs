use thiserror::Error;

/// Request-level failures. NotFound and Validation are user-facing and map to
/// 4xx at the boundary; Upstream covers failed backend calls and is never
/// retried here. Access-filter failures are a separate type (`FilterError`)
/// because they are recovered, not propagated.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Отчетная форма {0} не найдена")]
    NotFound(String),

    #[error("Измерение {dimension} в отчетной форме {report} не найдено")]
    DimensionNotFound { report: String, dimension: String },

    #[error("{0}")]
    Validation(String),

    #[error("ошибка источника данных: {0}")]
    Upstream(String),
}

impl ReportError {
    pub fn upstream(err: impl std::fmt::Display) -> Self {
        ReportError::Upstream(err.to_string())
    }
}
