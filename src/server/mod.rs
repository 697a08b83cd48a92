mod handlers;
mod state;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::location::Geocoder;
use crate::parks::builtin_parks;

pub use state::AppState;

pub fn build_router(geocoder: Arc<dyn Geocoder>) -> Router {
    let state = Arc::new(AppState {
        geocoder,
        parks: builtin_parks(),
    });

    Router::new()
        .route("/api/cities", get(handlers::cities))
        .route("/api/parks", get(handlers::parks))
        .route("/api/parks/nearest", get(handlers::nearest_parks))
        .route("/api/geocode/search", get(handlers::geocode_search))
        .route("/api/geocode/reverse", get(handlers::geocode_reverse))
        .route("/api/bookings/validate", post(handlers::validate_booking))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start(host: &str, port: u16, geocoder: Arc<dyn Geocoder>) -> std::io::Result<()> {
    let app = build_router(geocoder);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Movaa booking API listening on http://{}", addr);
    eprintln!("  Movaa booking API listening on http://{}", addr);
    eprintln!("  Press Ctrl+C to stop.");

    axum::serve(listener, app).await
}
