//! Meeting Minutes Backend
//!
//! REST backend for meeting series and their minutes: topics, info and action
//! items, the finalize workflow with its topic ledger, and item search.

mod aggregate;
mod api;
mod auth;
mod color;
mod config;
mod date;
mod db;
mod errors;
mod models;
mod search;
mod services;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Meeting Minutes Backend");
    if let Some(raw) = &config.invalid_bind_addr {
        tracing::warn!("Invalid MINUTES_BIND_ADDR {:?}, using {}", raw, config.bind_addr);
    }
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (MINUTES_API_PSK). Authentication is disabled!");
    }

    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    let state = AppState {
        repo,
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let psk = state.config.api_psk.clone();

    let api_routes = Router::new()
        // Users
        .route("/users", get(api::list_users).post(api::create_user))
        .route("/users/{id}", get(api::get_user))
        .route("/me", get(api::get_me))
        .route("/action-items", get(api::my_action_items))
        // Meeting series
        .route("/series", get(api::list_series).post(api::create_series))
        .route("/series/{id}", get(api::get_series).delete(api::delete_series))
        .route(
            "/series/{id}/minutes",
            get(api::list_series_minutes).post(api::create_minutes),
        )
        .route("/series/{id}/ledger", get(api::list_ledger_topics))
        .route("/series/{id}/visibility", put(api::update_visibility))
        .route("/series/{id}/labels", post(api::upsert_label))
        .route("/series/{id}/labels/{label_id}", delete(api::delete_label))
        .route("/series/{id}/responsibles", post(api::add_additional_responsible))
        .route(
            "/series/{id}/lock",
            put(api::lock_series).delete(api::unlock_series),
        )
        .route("/series/{id}/items", get(api::search_series_items))
        .route("/series/{id}/topics", get(api::search_series_topics))
        // Minutes
        .route(
            "/minutes/{id}",
            get(api::get_minutes).delete(api::delete_minutes),
        )
        .route("/minutes/{id}/date", put(api::update_minutes_date))
        .route(
            "/minutes/{id}/participants/regenerate",
            post(api::regenerate_participants),
        )
        .route(
            "/minutes/{id}/participants/{user_id}",
            put(api::update_participant),
        )
        .route("/minutes/{id}/finalize", post(api::finalize_minutes))
        .route("/minutes/{id}/unfinalize", post(api::unfinalize_minutes))
        .route("/minutes/{id}/finalized-info", get(api::get_finalized_info))
        .route(
            "/minutes/{id}/unfinalize-allowed",
            get(api::get_unfinalize_allowed),
        )
        .route("/minutes/{id}/locks", delete(api::unlock_minutes))
        .route("/minutes/{id}/items", get(api::search_minutes_items))
        .route(
            "/minutes/{id}/topics/{topic_id}/lock",
            put(api::lock_topic).delete(api::unlock_topic),
        )
        .route(
            "/minutes/{id}/topics/{topic_id}/items/{item_id}/lock",
            put(api::lock_item).delete(api::unlock_item),
        )
        .route(
            "/minutes/{id}/topics/{topic_id}/items/{item_id}/details/{index}/lock",
            put(api::lock_detail).delete(api::unlock_detail),
        )
        // Topics of minutes or of a series ledger
        .route("/parents/{parent_id}/topics", post(api::upsert_topic))
        .route(
            "/parents/{parent_id}/topics/{topic_id}",
            delete(api::delete_topic),
        )
        .route(
            "/parents/{parent_id}/topics/{topic_id}/toggle-state",
            post(api::toggle_topic_state),
        )
        .route(
            "/parents/{parent_id}/topics/{topic_id}/toggle-recurring",
            post(api::toggle_topic_recurring),
        )
        .route(
            "/parents/{parent_id}/topics/{topic_id}/toggle-skip",
            post(api::toggle_topic_skip),
        )
        .route(
            "/parents/{parent_id}/topics/{topic_id}/close",
            post(api::close_topic),
        )
        .route(
            "/parents/{parent_id}/topics/{topic_id}/labels",
            post(api::add_topic_labels),
        )
        .route(
            "/parents/{parent_id}/topics/{topic_id}/items",
            post(api::upsert_item),
        )
        .route(
            "/parents/{parent_id}/topics/{topic_id}/items/{item_id}",
            delete(api::delete_item),
        )
        .route(
            "/parents/{parent_id}/topics/{topic_id}/items/{item_id}/toggle-state",
            post(api::toggle_item_state),
        )
        .route(
            "/parents/{parent_id}/topics/{topic_id}/items/{item_id}/details",
            post(api::add_detail),
        )
        .route(
            "/parents/{parent_id}/topics/{topic_id}/items/{item_id}/details/{index}",
            put(api::update_detail).delete(api::delete_detail),
        )
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
