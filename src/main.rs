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
use service::{
    escrow_service::EscrowService,
    gateway::PaymentGateway,
    notification_service::NotificationService,
    order_service::OrderService,
    payout_service::PayoutService,
    subscription_service::SubscriptionService,
    webhook_service::WebhookService,
};

#[derive(Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    // Services
    pub escrow_service: Arc<EscrowService>,
    pub order_service: Arc<OrderService>,
    pub payout_service: Arc<PayoutService>,
    pub subscription_service: Arc<SubscriptionService>,
    pub webhook_service: Arc<WebhookService>,
    pub notification_service: Arc<NotificationService>,
}

impl AppState {
    pub fn new(db_client: DBClient, config: Config) -> Self {
        let db_client_arc = Arc::new(db_client);
        let gateway = Arc::new(PaymentGateway::new(&config));

        let notification_service = Arc::new(NotificationService::new(db_client_arc.clone()));
        let subscription_service = Arc::new(SubscriptionService::new(db_client_arc.clone()));

        let escrow_service = Arc::new(EscrowService::new(
            db_client_arc.clone(),
            gateway.clone(),
            config.platform_fee_percent,
        ));

        let order_service = Arc::new(OrderService::new(
            db_client_arc.clone(),
            escrow_service.clone(),
            notification_service.clone(),
            config.payout_hold_days,
        ));

        let payout_service = Arc::new(PayoutService::new(
            db_client_arc.clone(),
            gateway.clone(),
            notification_service.clone(),
            config.tip_commission_percent,
            config.payout_hold_days,
        ));

        let webhook_service = Arc::new(WebhookService::new(
            db_client_arc.clone(),
            payout_service.clone(),
            subscription_service.clone(),
            notification_service.clone(),
        ));

        Self {
            env: config,
            db_client: db_client_arc,
            escrow_service,
            order_service,
            payout_service,
            subscription_service,
            webhook_service,
            notification_service,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::INFO)
        .init();

    dotenv().ok();

    let config = Config::init();

    let pool = match PgPoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("Connection to the database is successful");
            pool
        }
        Err(err) => {
            tracing::error!("Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    let db_client = if let Some(ref redis_url) = config.redis_url {
        match DBClient::with_redis(pool.clone(), redis_url).await {
            Ok(client) => {
                if client.is_redis_available() {
                    tracing::info!("Redis notification queue is active");
                } else {
                    tracing::warn!("Redis connection failed, running without queue");
                }
                client
            }
            Err(e) => {
                tracing::warn!("Redis initialization error: {}, running without queue", e);
                DBClient::new(pool)
            }
        }
    } else {
        tracing::info!("Redis not configured, running without queue (set REDIS_URL to enable)");
        DBClient::new(pool)
    };

    let allowed_origins = vec![
        config.app_url.parse::<HeaderValue>().unwrap(),
        "http://localhost:5173".parse::<HeaderValue>().unwrap(),
        "http://localhost:8000".parse::<HeaderValue>().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::PATCH]);

    let app_state = Arc::new(AppState::new(db_client, config.clone()));

    let app = create_router(app_state.clone()).layer(cors);

    tracing::info!("Server is running on http://localhost:{}", config.port);
    tracing::info!("Queue status: {}", app_state.db_client.cache_status());

    // Start the daily payout release job
    let app_state_clone = app_state.clone();
    tokio::spawn(async move {
        service::background_jobs::start_payout_release_job(app_state_clone).await;
    });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", &config.port))
        .await
        .unwrap();

    axum::serve(listener, app).await.unwrap();
}
