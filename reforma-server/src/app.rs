use actix_web::{web, HttpRequest};
use std::sync::Arc;

use reforma_core::pipeline::ReportService;
use reforma_core::QueryDispatcher;
use reforma_postgres::{PgAccessLookup, PgMetadataStore, Postgres};
use reforma_saiku::{SaikuClient, SaikuExecutor};

use crate::handlers::{
    dimension_handler, execute_handler, export_handler, metadata_handler, pull_handler,
    push_handler,
};

#[derive(Clone)]
pub struct ServerConfig {
    pub database_url: String,
    /// Request header carrying the connection routing key.
    pub route_header: String,
    /// Base route name stripped from the header value to get the postfix.
    pub route_base: String,
}

#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub saiku_client: SaikuClient,
}

impl AppState {
    /// Routing postfix for this request, from the optional routing header.
    /// `epos_report2023` with base `epos_report` routes to postfix `2023`.
    pub fn route_postfix(&self, req: &HttpRequest) -> Option<String> {
        let value = req
            .headers()
            .get(&self.config.route_header)?
            .to_str()
            .ok()?;
        if value.is_empty() {
            return None;
        }
        Some(
            value
                .strip_prefix(&self.config.route_base)
                .unwrap_or(value)
                .to_owned(),
        )
    }

    /// Builds the request-scoped pipeline. The routing key switches both the
    /// database connection and the OLAP cube coordinates, so one request
    /// sees one consistent backing year.
    pub fn service(&self, req: &HttpRequest) -> ReportService {
        let postfix = self.route_postfix(req);

        let database_url = match postfix.as_deref() {
            Some(postfix) => format!("{}{}", self.config.database_url, postfix),
            None => self.config.database_url.clone(),
        };

        let db = Postgres::new(database_url);
        let dispatcher = QueryDispatcher::new(
            Box::new(db.clone()),
            Box::new(SaikuExecutor::new(self.saiku_client.clone(), postfix)),
        );

        ReportService::new(
            Arc::new(PgMetadataStore::new(db.clone())),
            dispatcher,
            Arc::new(PgAccessLookup::new(db)),
        )
    }
}

pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/olap")
            .route("", web::post().to(metadata_handler))
            .route("/dimension", web::post().to(dimension_handler))
            .route("/execute", web::post().to(execute_handler))
            .route("/export", web::post().to(export_handler))
            .route("/push", web::post().to(push_handler))
            .route("/pull", web::post().to(pull_handler)),
    );
}
