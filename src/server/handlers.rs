use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::booking::{assemble, BookingDraft, FormField, TripForm};
use crate::distance::{rank_by_distance, validate};
use crate::location::{destination_cities, CityInfo, GeoPoint, LocationCandidate};
use crate::parks::{search_parks, Park, RankedPark};
use crate::selection::LocationSelection;

use super::state::AppState;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

pub(super) struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    ApiError(status, msg.into())
}

#[derive(Deserialize)]
pub struct TextQuery {
    pub q: Option<String>,
}

#[derive(Deserialize)]
pub struct CoordQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl CoordQuery {
    fn point(&self) -> Result<GeoPoint, ApiError> {
        let (Some(lat), Some(lon)) = (self.lat, self.lon) else {
            return Err(api_error(StatusCode::BAD_REQUEST, "Provide 'lat' and 'lon' parameters"));
        };
        validate(GeoPoint::new(lat, lon)).map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))
    }
}

// ─── GET /api/cities ─────────────────────────────────────────────

pub async fn cities(Query(params): Query<TextQuery>) -> Json<Vec<CityInfo>> {
    Json(destination_cities(params.q.as_deref().unwrap_or("")))
}

// ─── GET /api/parks ──────────────────────────────────────────────

pub async fn parks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TextQuery>,
) -> Json<Vec<Park>> {
    let found = search_parks(params.q.as_deref().unwrap_or(""), &state.parks);
    Json(found.into_iter().cloned().collect())
}

// ─── GET /api/parks/nearest ──────────────────────────────────────

pub async fn nearest_parks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CoordQuery>,
) -> Result<Json<Vec<RankedPark>>, ApiError> {
    let origin = params.point()?;
    rank_by_distance(origin, &state.parks)
        .map(Json)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))
}

// ─── GET /api/geocode/search ─────────────────────────────────────

pub async fn geocode_search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TextQuery>,
) -> Json<Vec<LocationCandidate>> {
    let start = Instant::now();
    let query = params.q.unwrap_or_default();
    let geocoder = state.geocoder.clone();
    let q = query.clone();

    let found = match tokio::task::spawn_blocking(move || geocoder.search(&q)).await {
        Ok(found) => found,
        Err(e) => {
            warn!(error = %e, "geocode search task failed");
            Vec::new()
        }
    };

    info!(
        query = %query,
        results = found.len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "GET /api/geocode/search"
    );
    Json(found)
}

// ─── GET /api/geocode/reverse ────────────────────────────────────

pub async fn geocode_reverse(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CoordQuery>,
) -> Result<Json<LocationCandidate>, ApiError> {
    let point = params.point()?;
    let geocoder = state.geocoder.clone();

    let found = tokio::task::spawn_blocking(move || geocoder.reverse_geocode(point))
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "reverse geocode task failed");
            None
        });

    found
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("No place found near {}", point)))
}

// ─── POST /api/bookings/validate ─────────────────────────────────

#[derive(Deserialize)]
pub struct BookingRequest {
    #[serde(flatten)]
    pub form: TripForm,
    /// Free text in the "from" field.
    #[serde(default)]
    pub from: Option<String>,
    /// The picked suggestion, when there was one.
    #[serde(default)]
    pub from_details: Option<LocationCandidate>,
    #[serde(default)]
    pub park: Option<String>,
}

#[derive(Serialize)]
struct FieldErrorBody {
    field: FormField,
    error: String,
}

pub async fn validate_booking(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BookingRequest>,
) -> Result<Json<BookingDraft>, Response> {
    let mut selection = LocationSelection::new(state.parks.clone());
    match (request.from_details, request.from.as_deref()) {
        (Some(details), _) => {
            selection.mount(false, Some(details), None);
        }
        (None, Some(text)) => {
            selection.edit_text(text);
        }
        (None, None) => {}
    }
    if let Some(name) = request.park.as_deref() {
        selection.choose_park(name);
    }

    match assemble(&request.form, &selection, Utc::now().date_naive()) {
        Ok(draft) => Ok(Json(draft)),
        Err(e) => {
            info!(field = ?e.field, error = %e, "POST /api/bookings/validate rejected");
            let body = FieldErrorBody { field: e.field, error: e.message };
            Err((StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response())
        }
    }
}
