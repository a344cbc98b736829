// HTTP API routes (rotation state, reward lookup, metrics).

use axum::{
    extract::{Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, FixedOffset, Offset, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::clock::Clock;
use crate::llms_txt::LLMS_TXT;
use crate::locale::Locale;
use crate::metrics;
use crate::rewards::{constraint, LocalizedCatalogs, RewardEntry, RewardFilter, SortKey};
use crate::rotation::{RemainingTime, RotationSchedule, RotationWindow};

// ── Request types ─────────────────────────────────────────────────────

/// Query string of `/api/rotation`. Names follow the portal's page URLs.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationParams {
    pub offset: Option<String>,
    pub locale: Option<String>,
    pub map: Option<String>,
    pub sort_by: Option<String>,
    pub reward_type: Option<String>,
    pub reactor_element_type: Option<String>,
    pub weapon_rounds_type: Option<String>,
    pub arche_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LocaleParams {
    pub locale: Option<String>,
}

// ── Response types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct WindowBody {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl<Z: TimeZone> From<&RotationWindow<Z>> for WindowBody {
    fn from(w: &RotationWindow<Z>) -> Self {
        let fixed = |dt: &DateTime<Z>| dt.with_timezone(&dt.offset().fix());
        WindowBody {
            start: fixed(&w.start),
            end: fixed(&w.end),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RotationResponse {
    pub rotation: u32,
    pub current_rotation: u32,
    pub offset: i32,
    pub total_rotations: u32,
    pub timezone: &'static str,
    pub window: WindowBody,
    pub time_remaining: RemainingTime,
    pub locale: Locale,
    pub rewards: Vec<RewardEntry>,
}

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub catalogs: Arc<LocalizedCatalogs>,
    pub schedule: RotationSchedule,
    pub timezone: Tz,
    pub clock: Arc<dyn Clock>,
}

// ── Error helper ──────────────────────────────────────────────────────

fn json_error(status: StatusCode, msg: &str) -> impl IntoResponse {
    (status, Json(json!({ "error": msg })))
}

// ── Router ────────────────────────────────────────────────────────────

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/rotation", get(get_rotation))
        .route("/api/rotation/maps", get(list_maps))
        .route("/metrics", get(get_metrics))
        .route("/llms.txt", get(get_llms_txt))
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn(track_metrics))
}

async fn not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// Record request count and latency for every request, unmatched ones included.
async fn track_metrics(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let endpoint = metrics::normalize_path(req.uri().path());
    let started = std::time::Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    metrics::API_REQUEST_DURATION_SECONDS
        .with_label_values(&[endpoint.as_str()])
        .observe(started.elapsed().as_secs_f64());
    metrics::API_REQUESTS_TOTAL
        .with_label_values(&[method.as_str(), endpoint.as_str(), status.as_str()])
        .inc();
    response
}

// ── Helpers ───────────────────────────────────────────────────────────

/// Locale from an explicit parameter, else from `Accept-Language`.
fn resolve_locale(param: Option<&str>, headers: &HeaderMap) -> Result<Locale, String> {
    match param.filter(|p| !p.is_empty()) {
        Some(code) => Locale::from_code(code).ok_or_else(|| format!("unsupported locale: {code}")),
        None => Ok(headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok())
            .map(Locale::from_accept_language)
            .unwrap_or_default()),
    }
}

/// Offsets that don't parse count as zero, like the portal's page did.
fn parse_offset(raw: Option<&str>) -> i32 {
    raw.and_then(|s| s.trim().parse().ok()).unwrap_or(0)
}

// ── Rotation handlers ─────────────────────────────────────────────────

async fn get_rotation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<RotationParams>,
) -> impl IntoResponse {
    let locale = match resolve_locale(params.locale.as_deref(), &headers) {
        Ok(l) => l,
        Err(msg) => return json_error(StatusCode::BAD_REQUEST, &msg).into_response(),
    };

    let sort_by = match params.sort_by.as_deref().filter(|s| !s.is_empty()) {
        None => SortKey::default(),
        Some(s) => match SortKey::from_param(s) {
            Some(key) => key,
            None => {
                return json_error(StatusCode::BAD_REQUEST, &format!("unknown sortBy: {s}"))
                    .into_response()
            }
        },
    };

    let now = state.clock.now().with_timezone(&state.timezone);
    let offset = state.schedule.clamp_offset(parse_offset(params.offset.as_deref()));
    let snapshot = state.schedule.snapshot(&now, offset);
    metrics::CURRENT_ROTATION.set(i64::from(snapshot.current_rotation));

    let filter = RewardFilter {
        map: constraint(params.map),
        reward_type: constraint(params.reward_type),
        reactor_element_type: constraint(params.reactor_element_type),
        weapon_rounds_type: constraint(params.weapon_rounds_type),
        arche_type: constraint(params.arche_type),
        sort_by,
    };

    let rewards = match state.catalogs.get(locale) {
        Some(catalog) => catalog.rewards_for(snapshot.rotation, &filter),
        None => {
            tracing::debug!("No reward dataset loaded for locale {locale}");
            Vec::new()
        }
    };

    let body = RotationResponse {
        rotation: snapshot.rotation,
        current_rotation: snapshot.current_rotation,
        offset: snapshot.offset,
        total_rotations: state.schedule.total_rotations.get(),
        timezone: state.timezone.name(),
        window: WindowBody::from(&snapshot.window),
        time_remaining: snapshot.remaining,
        locale,
        rewards,
    };
    (StatusCode::OK, Json(body)).into_response()
}

async fn list_maps(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<LocaleParams>,
) -> impl IntoResponse {
    let locale = match resolve_locale(params.locale.as_deref(), &headers) {
        Ok(l) => l,
        Err(msg) => return json_error(StatusCode::BAD_REQUEST, &msg).into_response(),
    };
    let maps = state
        .catalogs
        .get(locale)
        .map(|c| c.map_names())
        .unwrap_or_default();
    (StatusCode::OK, Json(json!({ "locale": locale, "maps": maps }))).into_response()
}

// ── Documentation / metrics ───────────────────────────────────────────

async fn get_metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

async fn get_llms_txt() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], LLMS_TXT)
}
