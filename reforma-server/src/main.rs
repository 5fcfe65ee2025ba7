//! reforma server: one process serving the report pipeline over HTTP.
//!
//! State is read-only per request: the configuration and the shared Saiku
//! HTTP client live in `AppState`; everything else (database session, routed
//! executors, the report service itself) is built per request, so requests
//! never contend on shared mutable state.

mod app;
mod auth;
mod errors;
mod export;
mod handlers;

use actix_web::{middleware, web, App, HttpServer};
use anyhow::{format_err, Error};
use dotenv::dotenv;
use log::*;
use std::env;
use structopt::StructOpt;

use reforma_saiku::SaikuClient;

use crate::app::{config_app, AppState, ServerConfig};

#[actix_web::main]
async fn main() -> Result<(), Error> {
    pretty_env_logger::init();
    dotenv().ok();
    let opt = Opt::from_args();

    let server_addr = opt
        .address
        .or_else(|| env::var("REFORMA_ADDR").ok())
        .unwrap_or_else(|| "127.0.0.1:7707".to_owned());

    let database_url = env::var("REFORMA_DATABASE_URL")
        .ok()
        .or(opt.database_url)
        .ok_or_else(|| {
            format_err!("database url not found; either REFORMA_DATABASE_URL or cli option required")
        })?;

    let saiku_url = env::var("REFORMA_SAIKU_URL")
        .ok()
        .or(opt.saiku_url)
        .ok_or_else(|| {
            format_err!("OLAP url not found; either REFORMA_SAIKU_URL or cli option required")
        })?;
    let saiku_login = env::var("REFORMA_SAIKU_LOGIN").unwrap_or_default();
    let saiku_password = env::var("REFORMA_SAIKU_PASSWORD").unwrap_or_default();

    let route_header = env::var("REFORMA_ROUTE_HEADER").unwrap_or_else(|_| "year".to_owned());
    let route_base = env::var("REFORMA_ROUTE_BASE").unwrap_or_default();

    let saiku_client = SaikuClient::new(&saiku_url, &saiku_login, &saiku_password)
        .map_err(|err| format_err!("{}", err))?;

    let state = AppState {
        config: ServerConfig {
            database_url: database_url.clone(),
            route_header: route_header.clone(),
            route_base,
        },
        saiku_client,
    };

    info!("reforma listening on: {}", server_addr);
    info!("reforma database:     {}", mask_password(&database_url));
    info!("reforma OLAP service: {}", saiku_url);
    info!("reforma route header: {}", route_header);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(config_app)
            .wrap(middleware::Logger::default())
    })
    .bind(&server_addr)?
    .run()
    .await?;

    Ok(())
}

/// Hides the password of a `user:password@host` url for display.
fn mask_password(url: &str) -> String {
    match url.rsplit_once('@') {
        Some((user_pass, host)) => match user_pass.rsplit_once(':') {
            Some((user, _pass)) => format!("{}:*@{}", user, host),
            None => url.to_owned(),
        },
        None => url.to_owned(),
    }
}

/// CLI arguments helper.
#[derive(Debug, StructOpt)]
#[structopt(name = "reforma")]
struct Opt {
    #[structopt(short = "a", long = "addr")]
    address: Option<String>,

    #[structopt(long = "db-url")]
    database_url: Option<String>,

    #[structopt(long = "saiku-url")]
    saiku_url: Option<String>,
}
