use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde_json::json;

use reforma_core::ReportError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("{0}")]
    Report(#[from] ReportError),

    #[error("не удалось сформировать файл отчета: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),
}

impl actix_web::error::ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Report(err) => match err {
                ReportError::NotFound(_) | ReportError::DimensionNotFound { .. } => {
                    StatusCode::NOT_FOUND
                }
                ReportError::Validation(_) => StatusCode::BAD_REQUEST,
                ReportError::Upstream(_) => StatusCode::BAD_GATEWAY,
            },
            ServerError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "message": self.to_string() }))
    }
}
