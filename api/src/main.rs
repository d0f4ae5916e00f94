use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
};
use diesel_async::{
    AsyncPgConnection,
    pooled_connection::{AsyncDieselConnectionManager, deadpool::Pool},
};
use dotenv::dotenv;
use mimalloc::MiMalloc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::{Env, ServerConfig},
    storage::{ImageStorage, LocalStorage},
};

mod admin;
mod blog;
mod config;
mod error;
mod json;
mod schema;
mod storage;
mod utils;


#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Clone)]
pub struct App {
    pub diesel: Pool<AsyncPgConnection>,
    pub storage: Arc<dyn ImageStorage>,
    pub config: Arc<ServerConfig>,
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring malformed CORS origin");
                None
            }
        })
        .collect();

    // Cookie sessions need credentials, which rule out wildcard methods and headers.
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
}

pub fn router(app: App) -> Router {
    let config = app.config.clone();

    Router::new()
        .nest(
            "/api/v1/blogs",
            blog::routes::route().layer(DefaultBodyLimit::max(config.max_upload_bytes)),
        )
        .nest("/api/v1/categories", blog::routes::category_route())
        .nest("/api/v1/admins", admin::routes::route())
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_allowed_origins))
        .with_state(app)
}

fn init_tracing(env: Env) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));

    let registry = tracing_subscriber::registry().with(filter);

    match env {
        Env::Production => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        Env::Dev | Env::Staging => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenv().ok();

    init_tracing(Env::from_env());
    let config = ServerConfig::new_from_env();

    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database_url);
    let diesel = Pool::builder(manager)
        .max_size(config.database_max_connections)
        .build()?;

    tokio::fs::create_dir_all(&config.upload_dir).await?;
    let storage = LocalStorage::new(&config.upload_dir, &config.site_url);

    let port = config.port;
    let app = App {
        diesel,
        storage: Arc::new(storage),
        config: Arc::new(config),
    };

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, router(app)).await?;

    Ok(())
}
