//! PickVault Backend Server
//!
//! REST API server for the PickVault picks platform: accounts and
//! subscriptions, tiered pick feeds, payment and withdrawal request
//! queues, referrals, support, and CMS-managed site content.

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use pickvault_server::{app_state::AppState, routes, services::EmailService, sweeper::Sweeper};

const SWEEPER_SUPERVISOR_MAX_BACKOFF_SECONDS: u64 = 30;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pickvault_server=debug,tower_http=info".into()),
        )
        .init();

    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let jwt_secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set");

    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .expect("failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("failed to run database migrations");

    let state = AppState::new(db_pool.clone(), jwt_secret, EmailService::from_env());

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(routes::auth_routes())
        .merge(routes::user_routes())
        .merge(routes::pick_routes())
        .merge(routes::plan_routes())
        .merge(routes::payment_routes())
        .merge(routes::withdrawal_routes())
        .merge(routes::admin_routes())
        .merge(routes::announcement_routes())
        .merge(routes::support_routes())
        .merge(routes::content_routes())
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
        .with_state(state);

    // Start and supervise the background expiry sweeper.
    tokio::spawn(async move {
        let mut restart_count: u32 = 0;
        loop {
            let sweeper = Sweeper::new(db_pool.clone());
            let handle = tokio::spawn(async move { sweeper.run().await });

            match handle.await {
                Ok(Ok(())) => {
                    info!("sweeper exited cleanly; stopping supervisor");
                    break;
                }
                Ok(Err(err)) => {
                    error!(error = %err, "sweeper failed; restarting");
                }
                Err(join_error) => {
                    if join_error.is_panic() {
                        error!("sweeper panicked; restarting");
                    } else {
                        error!(error = %join_error, "sweeper task failed; restarting");
                    }
                }
            }

            restart_count = restart_count.saturating_add(1);
            let backoff_seconds = (2u64.saturating_pow(restart_count.min(5)))
                .min(SWEEPER_SUPERVISOR_MAX_BACKOFF_SECONDS);
            warn!(restart_count, backoff_seconds, "sweeper restart backoff");
            sleep(Duration::from_secs(backoff_seconds)).await;
        }
    });

    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3001".to_string())
        .parse()
        .expect("PORT must be a number");

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind listener");
    axum::serve(listener, app)
        .await
        .expect("server error");
}

async fn root() -> &'static str {
    "PickVault API Server"
}

async fn health_check() -> &'static str {
    "OK"
}

fn build_cors_layer() -> CorsLayer {
    let allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000".to_string())
        .split(',')
        .filter_map(|origin| origin.trim().parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(false)
}
