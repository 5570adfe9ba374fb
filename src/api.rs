//! HTTP API handlers for Dealerdesk.
//!
//! - **POST /track**: records a client-side tracking event
//! - **POST /leads**, **PATCH /leads/:id**: lead capture and status changes
//! - **GET /analytics**: the dashboard report
//! - **POST /photos/validate**, **POST /photos**, **GET /photos**: vehicle
//!   photo intake
//!
//! Failures talking to storage are logged here and turned into a status code.
//! The analytics endpoint is the exception: a failed slice degrades to an
//! empty summary so the dashboard still renders.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

use crate::aggregation::{AnalyticsReport, EventAggregator};
use crate::catalog::ModelCatalog;
use crate::model::{
    AnalyticsQuery, LeadCreated, LeadRequest, LeadStatusUpdate, PhotoQuery, PhotoRequest,
    TrackRequest, TrackingEvent, VehiclePhoto,
};
use crate::photos::{FilenameValidation, order_by_angle, parse_filename, validate_filename};
use crate::storage::Storage;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub catalog: Arc<ModelCatalog>,
    pub dealer_id: Arc<str>,
}

/// Build the router with all routes and the request tracing layer.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/track", post(post_track))
        .route("/leads", post(post_lead))
        .route("/leads/:id", patch(patch_lead))
        .route("/analytics", get(get_analytics))
        .route("/photos/validate", post(post_validate_photo))
        .route("/photos", post(post_photo).get(get_photos))
        .route("/health", get(health_check))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// POST /track - Record a tracking event.
///
/// # Request Body
///
/// ```json
/// {
///     "event_type": "phone_click",
///     "source": "inventory",
///     "vehicle_name": "2021 Chevrolet Trailblazer"
/// }
/// ```
///
/// Returns `202 Accepted` on success. The timestamp is assigned here.
#[instrument(skip(state, request), fields(event_type = %request.event_type, source = %request.source))]
pub async fn post_track(
    State(state): State<AppState>,
    Json(request): Json<TrackRequest>,
) -> StatusCode {
    let event = TrackingEvent {
        event_type: request.event_type,
        source: request.source,
        vehicle_name: request.vehicle_name,
        created_at: Utc::now(),
    };

    match state
        .storage
        .insert_tracking_event(&state.dealer_id, &event)
        .await
    {
        Ok(()) => StatusCode::ACCEPTED,
        Err(e) => {
            warn!(error = %e, "Failed to record tracking event");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// POST /leads - Capture a lead from one of the site's forms.
///
/// Returns `201 Created` with `{"id": ...}`.
#[instrument(skip(state, request), fields(source = %request.source, status = %request.status))]
pub async fn post_lead(
    State(state): State<AppState>,
    Json(request): Json<LeadRequest>,
) -> Result<(StatusCode, Json<LeadCreated>), StatusCode> {
    match state
        .storage
        .insert_lead(&state.dealer_id, &request, Utc::now())
        .await
    {
        Ok(id) => {
            info!(id, "Lead captured");
            Ok((StatusCode::CREATED, Json(LeadCreated { id })))
        }
        Err(e) => {
            warn!(error = %e, "Failed to capture lead");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// PATCH /leads/:id - Move a lead through the funnel.
///
/// Returns `204 No Content`, or `404` if the lead does not exist.
#[instrument(skip(state, update), fields(status = %update.status))]
pub async fn patch_lead(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<LeadStatusUpdate>,
) -> StatusCode {
    match state
        .storage
        .update_lead_status(&state.dealer_id, id, update.status)
        .await
    {
        Ok(true) => {
            info!(id, "Lead status updated");
            StatusCode::NO_CONTENT
        }
        Ok(false) => StatusCode::NOT_FOUND,
        Err(e) => {
            warn!(id, error = %e, "Failed to update lead status");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// A report slice that could not be loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceError {
    /// "events" or "leads".
    pub slice: String,
    pub message: String,
}

/// Response for GET /analytics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsResponse {
    /// When this response was generated.
    pub timestamp: DateTime<Utc>,

    /// Lookback window in days.
    pub days: u32,

    pub report: AnalyticsReport,

    /// Slices that fell back to an empty summary.
    #[serde(default)]
    pub errors: Vec<SliceError>,
}

/// GET /analytics - Dashboard report for the last `days` days (default 30).
///
/// Events and leads are loaded separately. If either query fails that half of
/// the report is all zeros and the failure is listed under `errors`; the
/// response is still `200 OK`.
#[instrument(skip(state))]
pub async fn get_analytics(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Json<AnalyticsResponse> {
    let now = Utc::now();
    // very large windows reach back to the start of time instead of overflowing
    let since = now
        .checked_sub_signed(Duration::days(i64::from(query.days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let aggregator = EventAggregator::local();

    let mut report = AnalyticsReport::default();
    let mut errors = Vec::new();

    match state.storage.fetch_events_since(&state.dealer_id, since).await {
        Ok(events) => report.events = aggregator.summarize_events(&events),
        Err(e) => {
            warn!(error = %e, "Failed to load tracking events");
            errors.push(SliceError {
                slice: "events".to_string(),
                message: e.to_string(),
            });
        }
    }

    match state.storage.fetch_leads_since(&state.dealer_id, since).await {
        Ok(leads) => report.leads = aggregator.summarize_leads(&leads),
        Err(e) => {
            warn!(error = %e, "Failed to load leads");
            errors.push(SliceError {
                slice: "leads".to_string(),
                message: e.to_string(),
            });
        }
    }

    info!(
        days = query.days,
        events = report.events.total,
        leads = report.leads.total,
        error_count = errors.len(),
        "Analytics queried"
    );

    Json(AnalyticsResponse {
        timestamp: now,
        days: query.days,
        report,
        errors,
    })
}

/// POST /photos/validate - Check a filename before uploading.
///
/// Always `200 OK`; the body says whether the name is acceptable.
#[instrument(skip(request), fields(filename = %request.filename))]
pub async fn post_validate_photo(Json(request): Json<PhotoRequest>) -> Json<FilenameValidation> {
    Json(validate_filename(&request.filename))
}

/// POST /photos - Register a vehicle photo.
///
/// # Response
///
/// `201 Created` with the stored photo, make and model filled in when the
/// model code is known:
///
/// ```json
/// {
///     "filename": "2021TB_FDS.jpg",
///     "year": 2021,
///     "model_code": "TB",
///     "angle": "FDS",
///     "make": "Chevrolet",
///     "model": "Trailblazer",
///     "uploaded_at": "2024-05-01T12:00:00Z"
/// }
/// ```
///
/// `422 Unprocessable Entity` with `{"valid": false, "error": "..."}` when
/// the filename does not follow the naming convention.
#[instrument(skip(state, request), fields(filename = %request.filename))]
pub async fn post_photo(
    State(state): State<AppState>,
    Json(request): Json<PhotoRequest>,
) -> Response {
    let parsed = match parse_filename(&request.filename) {
        Ok(parsed) => parsed,
        Err(e) => {
            info!(reason = %e, "Photo filename rejected");
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(FilenameValidation::failed(&e)),
            )
                .into_response();
        }
    };

    let resolved = state.catalog.resolve(&parsed.model_code);
    let photo = VehiclePhoto {
        filename: request.filename,
        year: parsed.year,
        model_code: parsed.model_code,
        angle: parsed.angle,
        make: resolved.make,
        model: resolved.model,
        uploaded_at: Utc::now(),
    };

    match state.storage.insert_photo(&state.dealer_id, &photo).await {
        Ok(()) => {
            info!(
                year = photo.year,
                model_code = %photo.model_code,
                angle = %photo.angle,
                "Photo registered"
            );
            (StatusCode::CREATED, Json(photo)).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Failed to register photo");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /photos?year=2021&model_code=TB - A vehicle's photos in display order.
#[instrument(skip(state))]
pub async fn get_photos(
    State(state): State<AppState>,
    Query(query): Query<PhotoQuery>,
) -> Result<Json<Vec<VehiclePhoto>>, StatusCode> {
    match state
        .storage
        .list_photos(&state.dealer_id, query.year, &query.model_code)
        .await
    {
        Ok(mut photos) => {
            order_by_angle(&mut photos, |p| p.angle.as_str());
            Ok(Json(photos))
        }
        Err(e) => {
            warn!(error = %e, "Failed to list photos");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;
    use serde_json::json;

    async fn setup_test_server() -> (TestServer, Storage) {
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        let state = AppState {
            storage: storage.clone(),
            catalog: Arc::new(ModelCatalog::builtin()),
            dealer_id: Arc::from("test-dealer"),
        };

        (TestServer::new(router(state)).unwrap(), storage)
    }

    #[tokio::test]
    async fn test_analytics_degrades_failed_leads_slice() {
        let (server, storage) = setup_test_server().await;

        server
            .post("/track")
            .json(&json!({ "event_type": "page_view", "source": "home" }))
            .await
            .assert_status(StatusCode::ACCEPTED);
        server
            .post("/leads")
            .json(&json!({ "name": "Riley", "source": "contact", "status": "close" }))
            .await
            .assert_status(StatusCode::CREATED);

        storage.drop_table("leads").await.unwrap();

        let response = server.get("/analytics").await;
        response.assert_status_ok();

        let body: AnalyticsResponse = response.json();
        assert_eq!(body.errors.len(), 1);
        assert_eq!(body.errors[0].slice, "leads");
        assert!(!body.errors[0].message.is_empty());
        assert_eq!(body.report.leads, Default::default());
        assert_eq!(body.report.events.total, 1);
        assert_eq!(body.report.events.by_type.get("page_view"), Some(&1));
    }

    #[tokio::test]
    async fn test_analytics_degrades_failed_events_slice() {
        let (server, storage) = setup_test_server().await;

        server
            .post("/leads")
            .json(&json!({ "name": "Riley", "source": "contact" }))
            .await
            .assert_status(StatusCode::CREATED);

        storage.drop_table("tracking_events").await.unwrap();

        let body: AnalyticsResponse = server.get("/analytics").await.json();
        assert_eq!(body.errors.len(), 1);
        assert_eq!(body.errors[0].slice, "events");
        assert_eq!(body.report.events, Default::default());
        assert_eq!(body.report.leads.total, 1);
    }
}
