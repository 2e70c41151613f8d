#[macro_use]
extern crate diesel;

pub mod schema;
pub mod database;
pub mod app;
pub mod serializers;

mod auth;
mod routes;

use std::io;

use actix_web::{middleware::Logger, web::Data, App, HttpServer};
use app::{config::Settings, AppState};

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::from_env().map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    let app_state = AppState::from_settings(&settings)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))?;

    log::info!(
        "Server running on {}:{} ({:?} store)",
        settings.bind_address,
        settings.port,
        settings.backend
    );
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(Data::new(app_state.clone()))
            .configure(routes::configure)
    })
    .bind((settings.bind_address.as_str(), settings.port))?
    .run()
    .await
}
