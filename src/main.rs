mod config;
mod errors;
mod db;
mod models;
mod routes;
mod storage;

use actix_cors::Cors;
use actix_web::{App, HttpServer};
use crate::config::Config;
use crate::db::Db;
use actix_web::middleware::Logger;
use actix_web::web::Data;
use env_logger::Env;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Init logger to show info by default, but can be overridden by RUST_LOG
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cfg = Config::from_args_env()?;

    let db = Db::connect_and_migrate(&cfg.database_path).await?;
    log::info!("database ready at {}", cfg.database_path);
    log::info!("storing uploads in {}", cfg.uploads_dir);
    log::info!("Starting server at http://{}", cfg.listen);

    let listen_addr = cfg.listen.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .app_data(Data::new(cfg.clone()))
            .app_data(Data::new(db.clone()))
            .configure(|c| routes::configure(&cfg, c))
    })
    .bind(listen_addr)?
    .run()
    .await?;
    Ok(())
}
