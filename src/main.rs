use std::{fs::File, sync::{Arc, Mutex}};

use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use clients::{CatalogClient, HttpCatalogClient, HttpOrderClient, OrderClient};
use config::AppConfig;
use dotenv::dotenv;
use repositories::{CartRepository, InMemoryCartRepository, MongoDbCartRepository};
use state::AppState;
use tracing::{event, Level};
use tracing_subscriber::EnvFilter;
use uow::CartUnitOfWork;

mod clients;
mod codec;
mod config;
mod cqrs;
mod discovery;
mod domain;
mod dtos;
mod errors;
mod repositories;
mod routes;
mod state;
mod uow;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenv().ok();

    let config = AppConfig::from_env()?;

    init_tracing(&config)?;

    let cart_repository: Arc<dyn CartRepository + Send + Sync> = match &config.mongodb {
        Some(cart_db_info) => Arc::new(MongoDbCartRepository::new(cart_db_info).await?),
        None => {
            event!(Level::WARN, "MONGODB_URI is not set, carts are kept in memory");
            Arc::new(InMemoryCartRepository::new())
        }
    };

    let http_client = reqwest::Client::builder()
        .timeout(config.remote_timeout)
        .build()?;

    let catalog_client = HttpCatalogClient::discover(http_client.clone(), &config.discovery)
        .map(|client| Arc::new(client) as Arc<dyn CatalogClient + Send + Sync>);
    let order_client = HttpOrderClient::discover(http_client, &config.discovery)
        .map(|client| Arc::new(client) as Arc<dyn OrderClient + Send + Sync>);

    if catalog_client.is_none() {
        event!(Level::WARN, "catalog-service not discovered, stock checks are skipped");
    }
    if order_client.is_none() {
        event!(Level::WARN, "order-service not discovered, completed orders are not submitted");
    }

    let uow = Arc::new(CartUnitOfWork::new(cart_repository));
    let state = Arc::new(AppState::new(uow, catalog_client, order_client));

    let (prometheus_layer, metrics_handle) = PrometheusMetricLayer::pair();

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    event!(Level::INFO, "listening on {}", config.bind_address());

    axum::serve(listener, routes::router(state)
        .route("/metrics", get(|| async move {metrics_handle.render()}))
        .layer(prometheus_layer)).await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) -> Result<(), BoxError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::
    fmt()
    .with_env_filter(env_filter)
    .with_target(false)
    .with_ansi(false)
    .json()
    .with_file(true)
    .with_line_number(true)
    .with_current_span(true);

    match &config.log_path {
        Some(log_path) => subscriber.with_writer(Mutex::new(File::create(log_path)?)).try_init()?,
        None => subscriber.try_init()?,
    }

    Ok(())
}
