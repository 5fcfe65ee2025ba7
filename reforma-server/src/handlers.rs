use actix_web::{web, HttpRequest, HttpResponse};
use log::info;

use reforma_core::{ElementRequest, MetadataRequest, ReportQuery, ReportSpec};

use crate::app::AppState;
use crate::auth;
use crate::errors::ServerError;
use crate::export;

/// Client metadata projection for a named report.
pub async fn metadata_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<MetadataRequest>,
) -> Result<HttpResponse, ServerError> {
    info!("metadata for report: {}", body.name);

    let metadata = state.service(&req).metadata(&body.name).await?;
    Ok(HttpResponse::Ok().json(metadata))
}

/// Candidate values for one dimension, narrowed by the caller's claims.
pub async fn dimension_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<ElementRequest>,
) -> Result<HttpResponse, ServerError> {
    info!("elements for {}/{}", body.name, body.dimension);

    let claims = auth::read_claims(&req);
    let elements = state
        .service(&req)
        .elements(claims.as_ref(), &body)
        .await?;
    Ok(HttpResponse::Ok().json(elements))
}

/// The full query pipeline: execute, totals, post-processing.
pub async fn execute_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<ReportQuery>,
) -> Result<HttpResponse, ServerError> {
    info!("query for report: {}", body.name);

    let grid = state.service(&req).query(&body, false).await?;
    Ok(HttpResponse::Ok().json(grid))
}

/// Same pipeline with raw numeric values, rendered into a workbook.
pub async fn export_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<ReportQuery>,
) -> Result<HttpResponse, ServerError> {
    info!("export for report: {}", body.name);

    let grid = state.service(&req).query(&body, true).await?;
    let (buffer, file_name) = export::render_xlsx(&grid)?;

    Ok(HttpResponse::Ok()
        .content_type("application/octet-stream")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename*=UTF-8''{}", urlencode(&file_name)),
        ))
        .body(buffer))
}

/// Administration: overwrite a stored definition (update-only).
pub async fn push_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<ReportSpec>,
) -> Result<HttpResponse, ServerError> {
    info!("push for report: {}", body.name);

    state.service(&req).push(&body).await?;
    Ok(HttpResponse::Ok().finish())
}

/// Administration: raw definition, without reference resolution.
pub async fn pull_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<MetadataRequest>,
) -> Result<HttpResponse, ServerError> {
    info!("pull for report: {}", body.name);

    let spec = state.service(&req).pull(&body.name).await?;
    Ok(HttpResponse::Ok().json(spec))
}

/// Percent-encodes a file name for the Content-Disposition header.
fn urlencode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.as_bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(*byte as char)
            }
            other => encoded.push_str(&format!("%{:02X}", other)),
        }
    }
    encoded
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn file_names_are_percent_encoded() {
        assert_eq!(urlencode("report.xlsx"), "report.xlsx");
        assert_eq!(urlencode("Отчет.xlsx"), "%D0%9E%D1%82%D1%87%D0%B5%D1%82.xlsx");
    }
}
