mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::sync::Arc;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use config::Config;
use dotenv::dotenv;
use routes::create_router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

use crate::db::db::DBClient;
use crate::service::background_jobs::start_webhook_reconciliation_job;
use service::{
    click_service::ClickTracker, conversion_service::ConversionRecorder,
    ingest::PaymentEventIngestor, link_service::LinkRegistry,
};

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    // Services
    pub links: Arc<LinkRegistry<DBClient>>,
    pub clicks: Arc<ClickTracker<DBClient>>,
    pub conversions: Arc<ConversionRecorder<DBClient>>,
    pub ingestor: Arc<PaymentEventIngestor<DBClient>>,
}

impl AppState {
    pub fn new(db_client: DBClient, config: Config) -> Self {
        let db_client_arc = Arc::new(db_client);

        let links = Arc::new(LinkRegistry::new(db_client_arc.clone()));
        let clicks = Arc::new(ClickTracker::new(db_client_arc.clone()));
        let conversions = Arc::new(ConversionRecorder::new(
            db_client_arc.clone(),
            config.attribution_window_days,
        ));
        let ingestor = Arc::new(PaymentEventIngestor::new(
            db_client_arc.clone(),
            config.webhook_secret.clone(),
            config.attribution_window_days,
        ));

        Self {
            env: config,
            db_client: db_client_arc,
            links,
            clicks,
            conversions,
            ingestor,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .init();

    dotenv().ok();

    let config = Config::init();

    // Connect to PostgreSQL
    let pool = match PgPoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            println!("✅ Connection to the database is successful!");
            pool
        }
        Err(err) => {
            println!("🔥 Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    let db_client = DBClient::new(pool);

    let allowed_origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH]);

    let app_state = Arc::new(AppState::new(db_client, config.clone()));

    // Retry webhook events that failed mid-processing
    tokio::spawn(start_webhook_reconciliation_job(app_state.clone()));

    let app = create_router(app_state.clone()).layer(cors);

    println!("🚀 Server is running on http://localhost:{}", config.port);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .unwrap();

    axum::serve(listener, app).await.unwrap();
}
