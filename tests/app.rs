#![cfg(feature = "web")]

mod common;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use std::sync::Arc;
use tower::ServiceExt;
use visa_dashboard::app::{AppState, router};
use visa_dashboard::config::DashboardConfig;

const BOUNDARY: &str = "visa-dashboard-test-boundary";

fn app() -> Router {
    router(Arc::new(AppState::new(DashboardConfig::default()).unwrap()))
}

fn upload_request(file_name: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"workbook\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Uploads the sample workbook and returns the `session=...` cookie pair
async fn upload_sample(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(upload_request("visas.xlsx", &common::sample_workbook()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");

    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn landing_page_asks_for_upload() {
    let response = app().oneshot(get("/", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Please upload an Excel file to see the dashboard."));
}

#[tokio::test]
async fn upload_then_view_dashboard() {
    let app = app();
    let cookie = upload_sample(&app).await;
    assert!(cookie.starts_with("session="));

    let response = app.clone().oneshot(get("/", Some(&cookie))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Preview of 'Study visas'"));
    assert_eq!(html.matches("<svg").count(), 6);

    let response = app
        .clone()
        .oneshot(get("/?sheet=Study%20only%20Nationality", Some(&cookie)))
        .await
        .unwrap();
    let html = body_text(response).await;
    assert_eq!(html.matches("<svg").count(), 4);
}

#[tokio::test]
async fn charts_api_lists_renderable_kinds() {
    let app = app();
    let cookie = upload_sample(&app).await;

    let response = app
        .clone()
        .oneshot(get("/api/charts?sheet=Study%20only%20Nationality", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["selected"], "Study only Nationality");
    assert_eq!(json["sheets"].as_array().unwrap().len(), 4);
    assert_eq!(
        json["charts"],
        serde_json::json!([
            "top_nationalities",
            "geo_spread",
            "study_dependant_gap",
            "dependant_trends"
        ])
    );
}

#[tokio::test]
async fn export_downloads_long_csv() {
    let app = app();
    let cookie = upload_sample(&app).await;

    let response = app
        .clone()
        .oneshot(get("/export?format=csv", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("Study_visas_long.csv"));
    let csv = body_text(response).await;
    assert!(csv.starts_with("Cohort,Status,Visa,Year,Count"));

    let response = app
        .clone()
        .oneshot(get("/export?format=pdf", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bad_requests_are_rejected() {
    let app = app();

    let response = app
        .clone()
        .oneshot(upload_request("notes.txt", b"hello"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("Failed to load notes.txt"));

    let response = app.clone().oneshot(get("/api/charts", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let cookie = upload_sample(&app).await;
    let response = app
        .clone()
        .oneshot(get("/?sheet=Missing", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cookieless_uploads_stay_within_session_limit() {
    let state = Arc::new(
        AppState::new(DashboardConfig {
            max_sessions: 3,
            ..Default::default()
        })
        .unwrap(),
    );
    let app = router(state.clone());

    for _ in 0..10 {
        upload_sample(&app).await;
    }
    assert_eq!(state.session_count(), 3);
}
