// Integration tests for the rotation HTTP API: a pinned clock, in-memory
// reward catalogs, and requests driven through the router with `oneshot`.

use std::num::NonZeroU32;
use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;

use rotation_backend::api::{self, AppState};
use rotation_backend::clock::FixedClock;
use rotation_backend::locale::Locale;
use rotation_backend::metrics;
use rotation_backend::rewards::{LocalizedCatalogs, RewardCatalog};
use rotation_backend::rotation::RotationSchedule;

const KO_REWARDS: &str = r#"[
  {
    "map_id": "1",
    "map_name": "알비온",
    "battle_zone": [
      {
        "battle_zone_id": "101",
        "battle_zone_name": "결전의 땅",
        "reward": [
          {"rotation": 3, "reward_type": "반응로", "reactor_element_type": "화염", "weapon_rounds_type": "일반탄", "arche_type": "융합"},
          {"rotation": 3, "reward_type": "센서", "reactor_element_type": null, "weapon_rounds_type": null, "arche_type": null},
          {"rotation": 4, "reward_type": "메모리", "reactor_element_type": null, "weapon_rounds_type": null, "arche_type": null}
        ]
      }
    ]
  },
  {
    "map_id": "2",
    "map_name": "킹스턴",
    "battle_zone": [
      {
        "battle_zone_id": "201",
        "battle_zone_name": "강철 골짜기",
        "reward": [
          {"rotation": 3, "reward_type": "보조전원", "reactor_element_type": null, "weapon_rounds_type": null, "arche_type": null},
          {"rotation": 20, "reward_type": "처리장치", "reactor_element_type": null, "weapon_rounds_type": null, "arche_type": null}
        ]
      }
    ]
  }
]"#;

const EN_REWARDS: &str = r#"[
  {
    "map_id": "1",
    "map_name": "Albion",
    "battle_zone": [
      {
        "battle_zone_id": "101",
        "battle_zone_name": "Frontline",
        "reward": [
          {"rotation": 3, "reward_type": "Reactor", "reactor_element_type": "Fire", "weapon_rounds_type": "General Rounds", "arche_type": "Fusion"}
        ]
      }
    ]
  }
]"#;

fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

/// Router pinned to Tuesday 2024-07-02 10:00 UTC, three rotations past an
/// epoch of 2024-06-18 09:00 UTC (so rotation 3 is live).
fn app_with(catalogs: LocalizedCatalogs) -> Router {
    metrics::register_metrics();
    let state = AppState {
        catalogs: Arc::new(catalogs),
        schedule: RotationSchedule::new(utc(2024, 6, 18, 9), NonZeroU32::new(20).unwrap()),
        timezone: chrono_tz::UTC,
        clock: Arc::new(FixedClock(utc(2024, 7, 2, 10))),
    };
    api::router(state)
}

fn app() -> Router {
    let mut catalogs = LocalizedCatalogs::new();
    catalogs.insert(
        Locale::Ko,
        RewardCatalog::from_json(Path::new("ko/reward.json"), KO_REWARDS).unwrap(),
    );
    catalogs.insert(
        Locale::En,
        RewardCatalog::from_json(Path::new("en/reward.json"), EN_REWARDS).unwrap(),
    );
    app_with(catalogs)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    get_with(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn get_with(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn instant(v: &Value) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(v.as_str().unwrap())
        .unwrap()
        .with_timezone(&Utc)
}

// ── /api/rotation ────────────────────────────────────────────────────

#[tokio::test]
async fn test_current_rotation() {
    let (status, body) = get(app(), "/api/rotation?locale=ko").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rotation"], 3);
    assert_eq!(body["current_rotation"], 3);
    assert_eq!(body["offset"], 0);
    assert_eq!(body["total_rotations"], 20);
    assert_eq!(body["timezone"], "UTC");
    assert_eq!(body["locale"], "ko");
    assert_eq!(instant(&body["window"]["start"]), utc(2024, 6, 25, 16));
    assert_eq!(instant(&body["window"]["end"]), utc(2024, 7, 2, 16));
    assert_eq!(body["time_remaining"]["total_seconds"], 6 * 3600);
    assert_eq!(body["time_remaining"]["hours"], 6);

    let rewards = body["rewards"].as_array().unwrap();
    assert_eq!(rewards.len(), 3);
    assert!(rewards.iter().all(|r| r["rotation"] == 3));
}

#[tokio::test]
async fn test_offset_moves_rotation_and_window() {
    let (status, body) = get(app(), "/api/rotation?locale=ko&offset=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rotation"], 4);
    assert_eq!(body["current_rotation"], 3);
    assert_eq!(instant(&body["window"]["start"]), utc(2024, 7, 2, 16));
    assert_eq!(instant(&body["window"]["end"]), utc(2024, 7, 9, 16));
    let rewards = body["rewards"].as_array().unwrap();
    assert_eq!(rewards.len(), 1);
    assert_eq!(rewards[0]["reward_type"], "메모리");
}

#[tokio::test]
async fn test_negative_offset_wraps_to_last_rotation() {
    let (_, body) = get(app(), "/api/rotation?locale=ko&offset=-3").await;
    assert_eq!(body["rotation"], 20);
    assert_eq!(body["offset"], -3);
    let rewards = body["rewards"].as_array().unwrap();
    assert_eq!(rewards.len(), 1);
    assert_eq!(rewards[0]["map_name"], "킹스턴");
}

#[tokio::test]
async fn test_offset_is_clamped() {
    let (_, body) = get(app(), "/api/rotation?offset=99").await;
    assert_eq!(body["offset"], 19);
    assert_eq!(body["rotation"], 2);

    let (_, body) = get(app(), "/api/rotation?offset=-99").await;
    assert_eq!(body["offset"], -19);
    assert_eq!(body["rotation"], 4);
}

#[tokio::test]
async fn test_unparseable_offset_is_zero() {
    let (status, body) = get(app(), "/api/rotation?offset=soon").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["offset"], 0);
    assert_eq!(body["rotation"], 3);
}

#[tokio::test]
async fn test_filters_and_sorting() {
    let (_, body) = get(app(), "/api/rotation?locale=ko&map=%EC%95%8C%EB%B9%84%EC%98%A8").await;
    let rewards = body["rewards"].as_array().unwrap();
    assert_eq!(rewards.len(), 2);
    assert!(rewards.iter().all(|r| r["map_name"] == "알비온"));

    let (_, body) = get(app(), "/api/rotation?locale=ko&rewardType=all&archeType=all").await;
    assert_eq!(body["rewards"].as_array().unwrap().len(), 3);

    let (_, body) = get(app(), "/api/rotation?locale=en&reactorElementType=Fire").await;
    let rewards = body["rewards"].as_array().unwrap();
    assert_eq!(rewards.len(), 1);
    assert_eq!(rewards[0]["battle_zone_name"], "Frontline");

    let (_, body) = get(app(), "/api/rotation?locale=ko&sortBy=battle_zone_name").await;
    let zones: Vec<&str> = body["rewards"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["battle_zone_name"].as_str().unwrap())
        .collect();
    let mut sorted = zones.clone();
    sorted.sort();
    assert_eq!(zones, sorted);
}

#[tokio::test]
async fn test_unknown_sort_key_is_rejected() {
    let (status, body) = get(app(), "/api/rotation?sortBy=rarity").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("rarity"));
}

#[tokio::test]
async fn test_unsupported_locale_is_rejected() {
    let (status, body) = get(app(), "/api/rotation?locale=fr").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_locale_from_accept_language() {
    let req = Request::builder()
        .uri("/api/rotation")
        .header(header::ACCEPT_LANGUAGE, "ko-KR,ko;q=0.9,en;q=0.8")
        .body(Body::empty())
        .unwrap();
    let (_, body) = get_with(app(), req).await;
    assert_eq!(body["locale"], "ko");

    let (_, body) = get(app(), "/api/rotation").await;
    assert_eq!(body["locale"], "en");
}

#[tokio::test]
async fn test_missing_locale_dataset_returns_no_rewards() {
    let (status, body) = get(app_with(LocalizedCatalogs::new()), "/api/rotation?locale=ko").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rotation"], 3);
    assert!(body["rewards"].as_array().unwrap().is_empty());
}

// ── /api/rotation/maps ───────────────────────────────────────────────

#[tokio::test]
async fn test_list_maps() {
    let (status, body) = get(app(), "/api/rotation/maps?locale=ko").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["locale"], "ko");
    assert_eq!(body["maps"], serde_json::json!(["알비온", "킹스턴"]));

    let (_, body) = get(app(), "/api/rotation/maps?locale=en").await;
    assert_eq!(body["maps"], serde_json::json!(["Albion"]));
}

// ── /metrics, /llms.txt ──────────────────────────────────────────────

#[tokio::test]
async fn test_metrics_record_requests() {
    let app = app();
    let _ = get(app.clone(), "/api/rotation").await;

    let resp = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("rotation_api_requests_total"));
    assert!(text.contains("rotation_current_index"));
}

#[tokio::test]
async fn test_unmatched_paths_share_a_metric_label() {
    let app = app();
    let (status, body) = get(app.clone(), "/api/rotation/918273645").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not found");

    let resp = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("/api/rotation/:id"));
    assert!(!text.contains("918273645"));
}

#[tokio::test]
async fn test_llms_txt() {
    let resp = app()
        .oneshot(Request::builder().uri("/llms.txt").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("/api/rotation"));
}
