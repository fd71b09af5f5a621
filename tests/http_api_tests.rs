use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use site_drafts::api::{
    ExportFormat, ExportQuery, IntegrationItem, IntegrationKind, WorkItem, WorkStatus,
};
use site_drafts::{ApiError, HttpSiteApi, SiteApi, SiteId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct Recorded {
    bodies: Arc<Mutex<Vec<(String, Value)>>>,
    auth: Arc<Mutex<Vec<String>>>,
}

async fn get_site(Path(id): Path<i64>) -> impl IntoResponse {
    if id == 404 {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "현장을 찾을 수 없습니다."})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({"site": {"id": id, "project_no": "NA/1234", "site_name": "Tower", "address": "Seoul"}})),
    )
}

async fn save_contacts(
    State(rec): State<Recorded>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Json<Value> {
    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        rec.auth.lock().unwrap().push(auth.to_string());
    }
    rec.bodies
        .lock()
        .unwrap()
        .push((format!("contacts/{}", id), body));
    Json(json!({"message": "저장되었습니다."}))
}

async fn save_household(
    State(rec): State<Recorded>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Json<Value> {
    rec.bodies
        .lock()
        .unwrap()
        .push((format!("household/{}", id), body));
    Json(json!({"message": "ok"}))
}

fn query_string(params: &HashMap<String, String>) -> String {
    let mut pairs: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    pairs.sort();
    pairs.join("&")
}

async fn list_work_items(
    State(rec): State<Recorded>,
    Path(id): Path<i64>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let done = params.get("status").map(String::as_str) == Some("done");
    rec.bodies.lock().unwrap().push((
        format!("GET work-items/{}?{}", id, query_string(&params)),
        Value::Null,
    ));
    Json(json!({"items": [{"id": 11, "site_id": id, "content": "Check wiring", "done": done}]}))
}

async fn save_work_items(
    State(rec): State<Recorded>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Json<Value> {
    rec.bodies
        .lock()
        .unwrap()
        .push((format!("POST work-items/{}", id), body));
    Json(json!({"message": "ok"}))
}

async fn list_alarms(
    State(rec): State<Recorded>,
    Path(id): Path<i64>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    rec.bodies.lock().unwrap().push((
        format!("GET alarms/{}?{}", id, query_string(&params)),
        Value::Null,
    ));
    Json(json!({"items": [
        {"id": 1, "content": "Inspection", "alarm_confirmed": false},
        {"id": 2, "content": "Delivery", "alarm_confirmed": true}
    ]}))
}

async fn confirm_alarms(
    State(rec): State<Recorded>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Json<Value> {
    rec.bodies
        .lock()
        .unwrap()
        .push((format!("POST alarms/confirm/{}", id), body));
    Json(json!({"message": "ok"}))
}

async fn delete_photo(
    State(rec): State<Recorded>,
    Path((id, photo)): Path<(i64, i64)>,
) -> StatusCode {
    rec.bodies
        .lock()
        .unwrap()
        .push((format!("DELETE photos/{}/{}", id, photo), Value::Null));
    if photo == 404 {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::NO_CONTENT
    }
}

async fn export(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    let body = format!(
        "PK-fake-archive format={} scope={}",
        params.get("format").cloned().unwrap_or_default(),
        params.get("scope").cloned().unwrap_or_default()
    );
    (
        [("content-type", "application/zip")],
        body.into_bytes(),
    )
}

fn create_app(rec: Recorded) -> Router {
    Router::new()
        .route(
            "/sites",
            get(|| async {
                Json(json!({"sites": [{"id": 1, "project_no": "NA/1234", "site_name": "Tower"}]}))
            }),
        )
        .route("/sites/:id", get(get_site))
        .route("/sites/:id/contacts", post(save_contacts))
        .route(
            "/sites/:id/products",
            get(|| async { Json(json!({"products": [{"wallpad_qty": 3}]})) }),
        )
        .route("/sites/:id/integrations/household", post(save_household))
        .route(
            "/sites/:id/photos",
            get(|| async { Json(json!({"items": [{"id": 9, "filename": "a.jpg"}], "has_more": true})) }),
        )
        .route(
            "/sites/:id/work-items",
            get(list_work_items).post(save_work_items),
        )
        .route("/sites/:id/alarms", get(list_alarms))
        .route("/sites/:id/alarms/confirm", post(confirm_alarms))
        .route("/sites/:id/photos/:photo", delete(delete_photo))
        .route("/export", get(export))
        .with_state(rec)
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/", addr)
}

#[tokio::test]
async fn test_list_and_get_sites() {
    let base = serve(create_app(Recorded::default())).await;
    let api = HttpSiteApi::new(base);

    let sites = api.list_sites().await.unwrap();
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].project_no.as_deref(), Some("NA/1234"));

    let site = api.get_site(SiteId(5)).await.unwrap();
    assert_eq!(site.id, Some(SiteId(5)));
    assert_eq!(site.extra["address"], "Seoul");
}

#[tokio::test]
async fn test_error_body_message_is_surfaced() {
    let base = serve(create_app(Recorded::default())).await;
    let api = HttpSiteApi::new(base);

    let err = api.get_site(SiteId(404)).await.unwrap_err();
    match err {
        ApiError::Status { status, ref message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "현장을 찾을 수 없습니다.");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_bearer_token_and_body_sent() {
    let rec = Recorded::default();
    let base = serve(create_app(rec.clone())).await;
    let api = HttpSiteApi::new(base).with_token("secret");

    let body = json!({"pm_name": "Kim", "project_no": "NA/1234"});
    api.save_contacts(SiteId(7), body.as_object().unwrap())
        .await
        .unwrap();

    assert_eq!(rec.auth.lock().unwrap().clone(), vec!["Bearer secret"]);
    let bodies = rec.bodies.lock().unwrap().clone();
    assert_eq!(bodies, vec![("contacts/7".to_string(), body)]);
}

#[tokio::test]
async fn test_products_list_yields_first_row() {
    let base = serve(create_app(Recorded::default())).await;
    let api = HttpSiteApi::new(base);

    let row = api.get_products(SiteId(1)).await.unwrap().unwrap();
    assert_eq!(row["wallpad_qty"], 3);
}

#[tokio::test]
async fn test_integrations_wrapped_in_items() {
    let rec = Recorded::default();
    let base = serve(create_app(rec.clone())).await;
    let api = HttpSiteApi::new(base);

    let items = vec![IntegrationItem {
        integration_type: "gas_detector".to_string(),
        enabled: "Y".to_string(),
        company_name: Some("Acme".to_string()),
        contact_person: None,
        contact_phone: None,
        notes: None,
        project_no: Some("NA/1234".to_string()),
    }];
    api.save_integrations(SiteId(2), IntegrationKind::Household, &items)
        .await
        .unwrap();

    let bodies = rec.bodies.lock().unwrap().clone();
    assert_eq!(bodies[0].0, "household/2");
    assert_eq!(bodies[0].1["items"][0]["integration_type"], "gas_detector");
    assert!(bodies[0].1["items"][0].get("notes").is_none());
}

#[tokio::test]
async fn test_photo_page_defaults() {
    let base = serve(create_app(Recorded::default())).await;
    let api = HttpSiteApi::new(base);

    let page = api.list_photos(SiteId(1), 1, 20).await.unwrap();
    assert_eq!(page.page, 1);
    assert!(page.has_more);
    assert_eq!(page.items[0].id, 9);
    assert_eq!(page.items[0].extra["filename"], "a.jpg");
}

#[tokio::test]
async fn test_download_export_writes_archive() {
    let base = serve(create_app(Recorded::default())).await;
    let api = HttpSiteApi::new(base);
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("export.zip");

    let query = ExportQuery {
        format: ExportFormat::Csv,
        ..Default::default()
    };
    let written = api.download_export(&query, &dest).await.unwrap();

    let content = std::fs::read_to_string(&dest).unwrap();
    assert_eq!(written as usize, content.len());
    assert_eq!(content, "PK-fake-archive format=csv scope=auto");
}

#[tokio::test]
async fn test_work_items_filtered_by_status() {
    let rec = Recorded::default();
    let base = serve(create_app(rec.clone())).await;
    let api = HttpSiteApi::new(base);

    let todo = api.list_work_items(SiteId(4), WorkStatus::Todo).await.unwrap();
    let done = api.list_work_items(SiteId(4), WorkStatus::Done).await.unwrap();

    assert_eq!(todo[0].content, "Check wiring");
    assert!(!todo[0].done);
    assert!(done[0].done);
    let paths: Vec<String> = rec.bodies.lock().unwrap().iter().map(|(p, _)| p.clone()).collect();
    assert_eq!(
        paths,
        vec!["GET work-items/4?status=todo", "GET work-items/4?status=done"]
    );
}

#[tokio::test]
async fn test_work_items_saved_in_items_envelope() {
    let rec = Recorded::default();
    let base = serve(create_app(rec.clone())).await;
    let api = HttpSiteApi::new(base);

    let items = vec![WorkItem {
        content: "Install wallpads".to_string(),
        alarm_date: Some("2024-08-20".to_string()),
        ..Default::default()
    }];
    api.save_work_items(SiteId(4), &items).await.unwrap();

    let bodies = rec.bodies.lock().unwrap().clone();
    assert_eq!(bodies[0].0, "POST work-items/4");
    assert_eq!(bodies[0].1["items"][0]["content"], "Install wallpads");
    assert_eq!(bodies[0].1["items"][0]["alarm_date"], "2024-08-20");
}

#[tokio::test]
async fn test_alarms_scoped_to_today_and_confirmed_by_id() {
    let rec = Recorded::default();
    let base = serve(create_app(rec.clone())).await;
    let api = HttpSiteApi::new(base);

    let alarms = api.list_alarms(SiteId(6), "2024-08-12").await.unwrap();
    assert_eq!(alarms.items.len(), 2);
    assert_eq!(alarms.unconfirmed(), 1);

    api.confirm_alarms(SiteId(6), &[1, 3]).await.unwrap();

    let bodies = rec.bodies.lock().unwrap().clone();
    assert_eq!(bodies[0].0, "GET alarms/6?scope=mine&today=2024-08-12");
    assert_eq!(
        bodies[1],
        ("POST alarms/confirm/6".to_string(), json!({"ids": [1, 3]}))
    );
}

#[tokio::test]
async fn test_delete_photo_uses_delete_method() {
    let rec = Recorded::default();
    let base = serve(create_app(rec.clone())).await;
    let api = HttpSiteApi::new(base);

    api.delete_photo(SiteId(2), 31).await.unwrap();
    let err = api.delete_photo(SiteId(2), 404).await.unwrap_err();

    assert!(matches!(err, ApiError::Status { status: 404, .. }));
    let paths: Vec<String> = rec.bodies.lock().unwrap().iter().map(|(p, _)| p.clone()).collect();
    assert_eq!(paths, vec!["DELETE photos/2/31", "DELETE photos/2/404"]);
}
