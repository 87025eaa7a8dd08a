mod common;

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::*;
use scheduling::api::rest::routes::register_routes;

async fn create_test_router() -> Router {
    let (svc, _db) = create_test_service().await;
    register_routes(Router::new(), svc).expect("Failed to register routes")
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let resp = router
        .clone()
        .oneshot(req.body(body).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create_profile(router: &Router, name: &str, tz: &str) -> String {
    let (status, body) = send(
        router,
        "POST",
        "/profiles",
        Some(json!({ "name": name, "timezone": tz })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

fn event_body(owner: &str, start_in_hours: i64) -> Value {
    let start = hours_from_now(start_in_hours);
    json!({
        "title": "Sync",
        "profiles": [owner],
        "timezone": "America/New_York",
        "startDateTime": start.to_rfc3339(),
        "endDateTime": (start + chrono::Duration::hours(1)).to_rfc3339(),
        "createdBy": owner
    })
}

#[tokio::test]
async fn test_profile_endpoints() -> Result<()> {
    let router = create_test_router().await;
    let ann = create_profile(&router, "Ann", "America/New_York").await;

    let (status, body) = send(&router, "GET", "/profiles", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["name"], "Ann");
    assert_eq!(body["data"][0]["isActive"], true);

    let (status, body) = send(
        &router,
        "PUT",
        &format!("/profiles/{ann}/timezone"),
        Some(json!({ "timezone": "Europe/Paris" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Timezone updated successfully");
    assert_eq!(body["data"]["timezone"], "Europe/Paris");

    let (status, body) = send(&router, "GET", &format!("/profiles/{ann}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["timezone"], "Europe/Paris");

    let (status, body) = send(&router, "GET", "/profiles/utils/timezones", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 12);

    let (status, body) = send(&router, "POST", "/profiles", Some(json!({ "name": "Ann" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Bad Request");

    let (status, body) = send(&router, "POST", "/profiles", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Profile name is required");
    Ok(())
}

#[tokio::test]
async fn test_bad_ids_and_bodies_are_client_errors() -> Result<()> {
    let router = create_test_router().await;

    let (status, body) = send(&router, "GET", "/profiles/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = send(
        &router,
        "GET",
        &format!("/profiles/{}", random_id()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "SCHEDULING_PROFILE_NOT_FOUND");

    let req = Request::builder()
        .method("POST")
        .uri("/events")
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body["success"], false);

    let (status, body) = send(&router, "POST", "/events", Some(json!({ "title": "Sync" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("All fields are required"));

    let (status, _) = send(
        &router,
        "GET",
        &format!("/events/profile/{}", random_id()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_event_update_and_logs() -> Result<()> {
    let router = create_test_router().await;
    let ann = create_profile(&router, "Ann", "America/New_York").await;

    let (status, body) = send(&router, "POST", "/events", Some(event_body(&ann, 24))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["message"], "Event created successfully");
    assert_eq!(body["data"]["profiles"][0]["name"], "Ann");
    assert_eq!(body["data"]["createdBy"]["name"], "Ann");
    assert_eq!(body["data"]["description"], "");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &router,
        "PUT",
        &format!("/events/{id}"),
        Some(json!({ "title": "Sync Call", "updatedBy": ann })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Event updated successfully");
    assert_eq!(body["data"]["title"], "Sync Call");
    assert_eq!(body["data"]["version"], 1);
    assert_eq!(body["data"]["updateLogs"][0]["changes"][0]["field"], "title");

    let (status, body) = send(
        &router,
        "PUT",
        &format!("/events/{id}"),
        Some(json!({ "endDateTime": "2000-01-01T00:00:00Z", "updatedBy": ann })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "End date/time must be after start date/time"
    );

    let (status, body) = send(
        &router,
        "GET",
        &format!("/events/{id}/logs?timezone=Asia/Tokyo"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"]["eventTitle"], "Sync Call");
    let change = &body["data"]["logs"][0]["changes"][0];
    assert_eq!(change["fieldName"], "Event Title");
    assert_eq!(change["previousDisplay"], "Sync");
    assert_eq!(change["updatedDisplay"], "Sync Call");
    assert_eq!(body["data"]["logs"][0]["updatedByProfile"]["name"], "Ann");

    let (status, _) = send(
        &router,
        "GET",
        &format!("/events/{id}/logs?timezone=Mars/Phobos"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&router, "GET", "/events/upcoming/events", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (status, body) = send(&router, "GET", &format!("/profiles/{ann}/agenda"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["events"][0]["title"], "Sync Call");
    assert!(body["data"]["events"][0]["localStart"].is_string());
    Ok(())
}

#[tokio::test]
async fn test_timezone_utilities() -> Result<()> {
    let router = create_test_router().await;

    let (status, body) = send(&router, "GET", "/profiles/utils/timezones", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"][0]["currentTime"].is_string());

    let (status, body) = send(
        &router,
        "GET",
        "/profiles/utils/times?at=2025-01-15T09:00&timezone=America/New_York&zones=UTC,%20Asia/Kolkata",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["count"], 2);
    assert_eq!(body["data"][0], json!({ "timezone": "UTC", "time": "2025-01-15 14:00" }));
    assert_eq!(
        body["data"][1],
        json!({ "timezone": "Asia/Kolkata", "time": "2025-01-15 19:30" })
    );

    let (status, body) = send(&router, "GET", "/profiles/utils/times?at=2025-01-15T14:00:00Z", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 12);

    let (status, body) = send(&router, "GET", "/profiles/utils/times", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "at is required");

    let (status, _) = send(&router, "GET", "/profiles/utils/times?at=2025-01-15T09:00&zones=Mars/Phobos", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_out_of_range_wall_clock_is_rejected() -> Result<()> {
    let router = create_test_router().await;
    let ann = create_profile(&router, "Ann", "Asia/Tokyo").await;

    let mut body = event_body(&ann, 24);
    body["timezone"] = json!("Asia/Tokyo");
    body["startDateTime"] = json!("-262143-01-01T00:00");
    let (status, body) = send(&router, "POST", "/events", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid startDateTime");
    Ok(())
}
