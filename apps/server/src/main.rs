#![warn(clippy::all, clippy::pedantic)]

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use tracing::info;

mod error;
mod routes;

use error::AppError;
use logger::init_tracing;
use vigil_service::config::Config;
use vigil_service::database::{Database, DatabaseImpl, StoreError, initialize_database};
use vigil_service::pool::open_pool;

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_config(env::var_os("VIGIL_CONFIG"))?;

    let pool = open_pool(&config.database.path, config.database.pool_size).await?;
    {
        let conn = pool.get().await.map_err(StoreError::from)?;
        initialize_database(&conn).await?;
    }
    let database: Arc<dyn Database> = Arc::new(DatabaseImpl::new_from_pool(pool));

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    run_server(addr, database).await
}

async fn run_server(addr: SocketAddr, database: Arc<dyn Database>) -> Result<(), AppError> {
    info!("Listening on {}", addr);

    HttpServer::new(move || {
        App::new().app_data(web::Data::from(Arc::clone(&database))).configure(routes::routes)
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}
