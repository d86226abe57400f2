//! HTTP-level tests driving the router directly.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use taskdeck::db::Database;
use taskdeck::service::{TaskService, UploadStore};
use taskdeck::types::NewTask;
use taskdeck::web::{AppState, build_router, templates::Templates};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "taskdeck-test-boundary";

struct TestApp {
    router: Router,
    service: TaskService,
    _temp: TempDir,
}

fn setup() -> TestApp {
    let temp = TempDir::new().unwrap();
    let db = Database::open_in_memory().unwrap();
    let uploads_root = temp.path().join("uploads");
    let service = TaskService::new(db, UploadStore::new(uploads_root.join("tasks")));
    let state = AppState::new(service.clone(), Templates::embedded(), uploads_root);
    TestApp {
        router: build_router(state),
        service,
        _temp: temp,
    }
}

/// Build a multipart body from text fields and an optional file.
fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"cover\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn png_bytes() -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::new(1024, 512))
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn seed(service: &TaskService, judul: &str) -> i64 {
    service
        .create_task(
            NewTask {
                judul: judul.into(),
                tipe: "project".into(),
                ..Default::default()
            },
            None,
        )
        .unwrap()
        .id
}

#[tokio::test]
async fn index_lists_tasks() {
    let app = setup();
    seed(&app.service, "Write <tests>");

    let response = app
        .router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("Home Task"));
    assert!(html.contains("Write &lt;tests&gt;"));
}

#[tokio::test]
async fn add_task_redirects_and_forces_todo() {
    let app = setup();
    let body = multipart_body(
        &[
            ("judul", "Tugas 2"),
            ("tipe", "belajar"),
            ("tags", "rust"),
            ("catatan", ""),
            ("path_project", ""),
            ("status", "done"),
        ],
        None,
    );

    let response = app
        .router
        .oneshot(multipart_request("/task/add", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");

    let tasks = app.service.get_all_tasks().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].status, "todo");
    assert_eq!(tasks[0].cover, "");
    assert!(tasks[0].path_project.is_none());
}

#[tokio::test]
async fn add_task_with_cover_is_served_back() {
    let app = setup();
    let body = multipart_body(
        &[("judul", "Tugas 1"), ("tipe", "project")],
        Some(("dummy.png", png_bytes().as_slice())),
    );

    let response = app
        .router
        .clone()
        .oneshot(multipart_request("/task/add", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let task = app.service.get_all_tasks().unwrap().remove(0);
    assert!(task.cover.starts_with("/static/uploads/tasks/task_"));

    let response = app
        .router
        .oneshot(Request::get(task.cover.as_str()).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn add_task_without_title_is_bad_request() {
    let app = setup();
    let body = multipart_body(&[("tipe", "project")], None);

    let response = app
        .router
        .oneshot(multipart_request("/task/add", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.service.get_all_tasks().unwrap().is_empty());
}

#[tokio::test]
async fn add_task_with_unsupported_cover_is_rejected() {
    let app = setup();
    let body = multipart_body(
        &[("judul", "gif"), ("tipe", "project")],
        Some(("anim.gif", &b"GIF89a"[..])),
    );

    let response = app
        .router
        .oneshot(multipart_request("/task/add", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.service.get_all_tasks().unwrap().is_empty());
}

#[tokio::test]
async fn update_applies_only_filled_fields() {
    let app = setup();
    let id = seed(&app.service, "Keep title");
    let body = multipart_body(&[("judul", ""), ("status", "done"), ("tipe", "")], None);

    let response = app
        .router
        .oneshot(multipart_request(&format!("/task/update/{id}"), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let task = app.service.get_task_by_id(id).unwrap();
    assert_eq!(task.judul, "Keep title");
    assert_eq!(task.status, "done");
    assert_eq!(task.tipe, "project");
}

#[tokio::test]
async fn update_with_non_numeric_id_is_bad_request() {
    let app = setup();
    let id = seed(&app.service, "untouched");
    let body = multipart_body(&[("status", "done")], None);

    let response = app
        .router
        .oneshot(multipart_request("/task/update/abc", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.service.get_task_by_id(id).unwrap().status, "todo");
}

#[tokio::test]
async fn update_unknown_task_is_not_found() {
    let app = setup();
    let body = multipart_body(&[("status", "done")], None);

    let response = app
        .router
        .oneshot(multipart_request("/task/update/77", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_removes_task() {
    let app = setup();
    let id = seed(&app.service, "remove me");

    let response = app
        .router
        .oneshot(
            Request::post(format!("/task/delete/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(app.service.get_task_by_id(id).unwrap_err().is_not_found());
}

#[tokio::test]
async fn delete_with_non_numeric_id_is_bad_request() {
    let app = setup();
    seed(&app.service, "stays");

    let response = app
        .router
        .oneshot(
            Request::post("/task/delete/1x")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.service.get_all_tasks().unwrap().len(), 1);
}

#[tokio::test]
async fn embedded_assets_and_health_are_served() {
    let app = setup();

    let css = app
        .router
        .clone()
        .oneshot(
            Request::get("/static/assets/style.css")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(css.status(), StatusCode::OK);
    assert!(
        css.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/css")
    );

    let missing = app
        .router
        .clone()
        .oneshot(
            Request::get("/static/assets/nope.js")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let health = app
        .router
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    assert!(body_string(health).await.contains("healthy"));
}
