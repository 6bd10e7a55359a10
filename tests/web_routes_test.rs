//! Integration tests for web routes.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use campus_dialogue_hub::auth::MagicLinkSender;
use campus_dialogue_hub::config::Config;
use campus_dialogue_hub::db::{
    create_profile, create_session, format_timestamp, Database, NewProfile, Role,
};
use campus_dialogue_hub::forum::AlertMonitor;
use campus_dialogue_hub::storage;
use campus_dialogue_hub::web::{create_app, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

/// Keeps every link instead of mailing it.
#[derive(Default)]
struct CapturedLinks(Mutex<Vec<String>>);

#[async_trait]
impl MagicLinkSender for CapturedLinks {
    async fn send(&self, _email: &str, link: &str) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(link.to_string());
        Ok(())
    }
}

struct TestApp {
    app: Router,
    state: AppState,
    links: Arc<CapturedLinks>,
    monitor: Option<AlertMonitor>,
    _temp_dir: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = Config::for_testing(temp_dir.path());
        let db = Database::new(&config.database_path)
            .await
            .expect("Failed to create database");
        let store = storage::from_config(&config)
            .await
            .expect("Failed to create storage");
        let (monitor, alerts) = AlertMonitor::new(
            db.pool().clone(),
            config.alert_poll_interval,
            config.stale_post_after,
        )
        .expect("Failed to create alert monitor");

        let links = Arc::new(CapturedLinks::default());
        let state = AppState {
            db,
            config: Arc::new(config),
            store,
            mailer: links.clone(),
            alerts,
        };

        Self {
            app: create_app(state.clone()),
            state,
            links,
            monitor: Some(monitor),
            _temp_dir: temp_dir,
        }
    }

    /// Run the alert monitor in the background until the token is cancelled.
    fn start_monitor(&mut self) -> CancellationToken {
        let shutdown = CancellationToken::new();
        let monitor = self.monitor.take().expect("monitor already started");
        tokio::spawn(monitor.run(shutdown.clone()));
        shutdown
    }

    /// Poll the published alerts until `done` holds, or give up after two seconds.
    async fn wait_for_alerts(&self, done: impl Fn(&[i64]) -> bool) -> Vec<i64> {
        let mut ids = Vec::new();
        for _ in 0..100 {
            ids = self
                .state
                .alerts
                .current()
                .posts
                .iter()
                .map(|p| p.post_id)
                .collect();
            if done(&ids) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        ids
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Create a profile with an open session and return its bearer token.
    async fn sign_in(&self, username: &str, role: Role) -> (i64, String) {
        let pool = self.state.db.pool();
        let id = create_profile(
            pool,
            &NewProfile {
                email: format!("{username}@college.edu"),
                username: username.to_string(),
                role,
                course: None,
                semester: None,
            },
        )
        .await
        .unwrap();

        let token = format!("test-session-{username}");
        let expires = format_timestamp(chrono::Utc::now() + chrono::Duration::hours(1));
        create_session(pool, id, &token, &expires).await.unwrap();
        (id, token)
    }
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn with_json(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn post_empty(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

async fn create_test_post(app: &TestApp, token: &str, title: &str, tags: &[&str]) -> i64 {
    let response = app
        .send(with_json(
            "POST",
            "/api/posts",
            Some(token),
            &json!({ "title": title, "content": format!("{title} details"), "tags": tags }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;

    let response = app.send(get("/healthz", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
}

#[tokio::test]
async fn test_vote_requires_authentication() {
    let app = TestApp::new().await;

    let response = app.send(post_empty("/api/posts/1/vote", None)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["kind"], "authentication_required");
}

#[tokio::test]
async fn test_protected_pages_redirect() {
    let app = TestApp::new().await;
    let (_, student) = app.sign_in("asha", Role::Student).await;

    let response = app.send(get("/home", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let response = app.send(get("/teacher", Some(&student))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let response = app.send(get("/student", Some(&student))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Nickname"));
}

#[tokio::test]
async fn test_magic_link_sign_in_flow() {
    let app = TestApp::new().await;

    let response = app
        .send(with_json(
            "POST",
            "/api/auth/magic-link",
            None,
            &json!({
                "email": "Asha@College.edu",
                "role": "student",
                "course": "CSE",
                "semester": "Semester 3"
            }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let link = app.links.0.lock().unwrap().pop().expect("link was sent");
    assert!(link.starts_with("http://localhost:8080/auth/callback?token="));
    let (_, token) = link.split_once("token=").unwrap();

    let callback = format!("/auth/callback?token={token}");
    let response = app.send(get(&callback, None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/student");

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(set_cookie.contains("HttpOnly"));
    let cookie = set_cookie.split(';').next().unwrap().to_string();
    assert!(cookie.starts_with("session="));

    let response = app
        .send(
            Request::builder()
                .uri("/api/me")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let me = body_json(response).await;
    assert_eq!(me["username"], "asha");
    assert_eq!(me["role"], "student");
    assert_eq!(me["course"], "CSE");
    assert_eq!(me["semester"], "Semester 3");
    assert_eq!(me["is_moderator"], false);

    // A link works once.
    let response = app.send(get(&callback, None)).await;
    assert_eq!(location(&response), "/login?error=expired");
}

#[tokio::test]
async fn test_admin_email_signs_in_as_admin() {
    let app = TestApp::new().await;

    app.send(with_json(
        "POST",
        "/api/auth/magic-link",
        None,
        &json!({ "email": "dean@college.edu", "role": "teacher" }),
    ))
    .await;
    let link = app.links.0.lock().unwrap().pop().unwrap();
    let (_, token) = link.split_once("token=").unwrap();

    let response = app
        .send(get(&format!("/auth/callback?token={token}"), None))
        .await;
    assert_eq!(location(&response), "/home");
}

#[tokio::test]
async fn test_magic_link_rejects_unknown_role() {
    let app = TestApp::new().await;

    let response = app
        .send(with_json(
            "POST",
            "/api/auth/magic-link",
            None,
            &json!({ "email": "asha@college.edu", "role": "admin" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["kind"], "validation");
    assert!(app.links.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_post_lifecycle() {
    let app = TestApp::new().await;
    let (_, author) = app.sign_in("asha", Role::Student).await;
    let (_, reader) = app.sign_in("ravi", Role::Student).await;

    let post_id =
        create_test_post(&app, &author, "Normalization help", &["CSE", "Semester 3", "DBMS"]).await;

    let response = app
        .send(get("/api/posts?course=CSE&semester=Semester%203", None))
        .await;
    let posts = body_json(response).await;
    assert_eq!(posts.as_array().unwrap().len(), 1);
    assert_eq!(posts[0]["preview"], "Normalization help details");

    let response = app.send(get("/api/posts?course=IT", None)).await;
    assert!(body_json(response).await.as_array().unwrap().is_empty());

    let response = app
        .send(post_empty(&format!("/api/posts/{post_id}/vote"), Some(&reader)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let vote = body_json(response).await;
    assert_eq!(vote["voted"], true);
    assert_eq!(vote["votes"], 1);

    let response = app
        .send(get(&format!("/api/posts/{post_id}"), Some(&reader)))
        .await;
    assert_eq!(body_json(response).await["has_voted"], true);

    let response = app
        .send(with_json(
            "POST",
            &format!("/api/posts/{post_id}/comments"),
            Some(&reader),
            &json!({ "content": "Look at functional dependencies first." }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["username"], "ravi");

    let response = app
        .send(get(&format!("/api/posts/{post_id}/comments"), None))
        .await;
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);

    let response = app
        .send(with_json(
            "PUT",
            &format!("/api/posts/{post_id}"),
            Some(&reader),
            &json!({ "title": "Hijacked", "content": "nope" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/posts/{post_id}"))
                .header(header::AUTHORIZATION, format!("Bearer {author}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["post_id"], post_id);
    assert!(report["failed_attachments"].as_array().unwrap().is_empty());

    let response = app.send(get(&format!("/api/posts/{post_id}"), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_post_requires_title() {
    let app = TestApp::new().await;
    let (_, author) = app.sign_in("asha", Role::Student).await;

    let response = app
        .send(with_json(
            "POST",
            "/api/posts",
            Some(&author),
            &json!({ "title": "   ", "content": "Body" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

fn multipart(token: &str, uri: &str, file_name: &str, data: &[u8]) -> Request<Body> {
    multipart_files(token, uri, &[(file_name, data)])
}

fn multipart_files(token: &str, uri: &str, files: &[(&str, &[u8])]) -> Request<Body> {
    let boundary = "campus-test-boundary";
    let mut body = Vec::new();
    for (file_name, data) in files {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{file_name}\"\r\nContent-Type: text/plain\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_attachment_upload_is_served() {
    let app = TestApp::new().await;
    let (_, author) = app.sign_in("asha", Role::Student).await;
    let post_id = create_test_post(&app, &author, "Lab notes", &["Resources"]).await;

    let uri = format!("/api/posts/{post_id}/attachments");
    let response = app
        .send(multipart(&author, &uri, "notes.txt", b"hello campus"))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let attachments = body_json(response).await;
    let attachment = &attachments[0];
    assert_eq!(attachment["name"], "notes.txt");
    assert_eq!(attachment["size"], 12);
    let url = attachment["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/post-attachments/"));
    assert!(url.ends_with(".txt"));

    let response = app.send(get(&url, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "hello campus");
}

#[tokio::test]
async fn test_attachment_too_large() {
    let app = TestApp::new().await;
    let (_, author) = app.sign_in("asha", Role::Student).await;
    let post_id = create_test_post(&app, &author, "Big file", &[]).await;

    let data = vec![b'a'; app.state.config.max_upload_bytes + 1];
    let uri = format!("/api/posts/{post_id}/attachments");
    let response = app.send(multipart(&author, &uri, "big.txt", &data)).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(response).await["kind"], "storage_too_large");
}

fn stored_files(app: &TestApp) -> usize {
    let dir = app.state.config.upload_dir.join("post-attachments");
    std::fs::read_dir(dir).map_or(0, Iterator::count)
}

#[tokio::test]
async fn test_failed_upload_leaves_no_objects() {
    let app = TestApp::new().await;
    let (_, author) = app.sign_in("asha", Role::Student).await;
    let post_id = create_test_post(&app, &author, "Half upload", &[]).await;

    let uri = format!("/api/posts/{post_id}/attachments");
    let files: [(&str, &[u8]); 2] = [("ok.txt", b"hello"), ("empty.txt", b"")];
    let response = app.send(multipart_files(&author, &uri, &files)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(stored_files(&app), 0);
    let post = body_json(app.send(get(&format!("/api/posts/{post_id}"), None)).await).await;
    assert_eq!(post["attachments"], json!([]));
}

#[tokio::test]
async fn test_only_author_uploads_attachments() {
    let app = TestApp::new().await;
    let (_, author) = app.sign_in("asha", Role::Student).await;
    let (_, other) = app.sign_in("ravi", Role::Student).await;
    let post_id = create_test_post(&app, &author, "Mine", &[]).await;

    let uri = format!("/api/posts/{post_id}/attachments");
    let response = app.send(multipart(&other, &uri, "x.txt", b"x")).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_deleted_post_leaves_alerts_promptly() {
    let mut app = TestApp::new().await;
    let (_, author) = app.sign_in("asha", Role::Student).await;
    let post_id = create_test_post(&app, &author, "Nobody answered", &["CSE"]).await;

    let created_at = format_timestamp(chrono::Utc::now() - chrono::Duration::hours(3));
    sqlx::query("UPDATE posts SET created_at = ? WHERE id = ?")
        .bind(created_at)
        .bind(post_id)
        .execute(app.state.db.pool())
        .await
        .unwrap();

    let shutdown = app.start_monitor();
    app.state.alerts.notify_activity();
    assert_eq!(app.wait_for_alerts(|ids| !ids.is_empty()).await, vec![post_id]);

    let response = app
        .send(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/posts/{post_id}"))
                .header(header::AUTHORIZATION, format!("Bearer {author}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    assert!(app.wait_for_alerts(<[i64]>::is_empty).await.is_empty());
    shutdown.cancel();
}

#[tokio::test]
async fn test_moderator_assignment() {
    let app = TestApp::new().await;
    let (_, teacher) = app.sign_in("prof", Role::Teacher).await;
    let (first_id, first) = app.sign_in("asha", Role::Student).await;
    let (second_id, second) = app.sign_in("ravi", Role::Student).await;

    for student_id in [first_id, second_id] {
        let response = app
            .send(with_json(
                "POST",
                "/api/moderators",
                Some(&teacher),
                &json!({ "student_id": student_id, "time_slot": "2pm-4pm" }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app.send(get("/api/moderators", Some(&first))).await;
    let assignments = body_json(response).await;
    assert_eq!(assignments.as_array().unwrap().len(), 1);
    assert_eq!(assignments[0]["student_id"], second_id);

    let response = app.send(get("/api/me", Some(&second))).await;
    let me = body_json(response).await;
    assert_eq!(me["is_moderator"], true);
    assert_eq!(me["moderator_time_slot"], "2pm-4pm");

    // Moderators see alerts, other students do not.
    let response = app.send(get("/api/alerts/unanswered", Some(&second))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = app.send(get("/api/alerts/unanswered", Some(&first))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(with_json(
            "POST",
            "/api/moderators",
            Some(&first),
            &json!({ "student_id": first_id, "time_slot": "2pm-4pm" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(with_json(
            "POST",
            "/api/moderators",
            Some(&teacher),
            &json!({ "student_id": first_id, "time_slot": "9am-10am" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(
            Request::builder()
                .method("DELETE")
                .uri("/api/moderators/2pm-4pm")
                .header(header::AUTHORIZATION, format!("Bearer {teacher}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_semester_view_groups_and_resets_subject() {
    let app = TestApp::new().await;
    let (_, author) = app.sign_in("asha", Role::Student).await;
    create_test_post(&app, &author, "Pointers", &["CSE", "Semester 1", "C Programming"]).await;
    create_test_post(&app, &author, "Inheritance", &["CSE", "Semester 2", "OOPS"]).await;
    create_test_post(&app, &author, "Fest", &["Events"]).await;

    let response = app
        .send(get("/api/posts/semester-view?course=CSE&subject=Bogus", None))
        .await;
    let view = body_json(response).await;
    assert_eq!(view["grouped"], true);
    assert_eq!(view["selection"]["subject"], "All Subjects");
    let semesters: Vec<&str> = view["buckets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["semester"].as_str().unwrap())
        .collect();
    assert_eq!(semesters, vec!["Semester 1", "Semester 2"]);

    let response = app
        .send(get(
            "/api/posts/semester-view?course=CSE&semester=Semester%202&subject=OOPS",
            None,
        ))
        .await;
    let view = body_json(response).await;
    assert_eq!(view["grouped"], false);
    assert_eq!(view["selection"]["subject"], "OOPS");
    assert_eq!(view["posts"].as_array().unwrap().len(), 1);
    assert_eq!(view["posts"][0]["title"], "Inheritance");
}

#[tokio::test]
async fn test_semester_view_page_renders() {
    let app = TestApp::new().await;
    let (_, author) = app.sign_in("asha", Role::Student).await;
    create_test_post(&app, &author, "Pointers", &["CSE", "Semester 1"]).await;

    let response = app
        .send(get("/semester-view?course=CSE", Some(&author)))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Semester View"));
    assert!(html.contains("Pointers"));
}

#[tokio::test]
async fn test_semester_view_page_keeps_miscellaneous_selected() {
    let app = TestApp::new().await;
    let (_, author) = app.sign_in("asha", Role::Student).await;
    create_test_post(&app, &author, "Hostel wifi", &["Miscellaneous"]).await;
    create_test_post(&app, &author, "Pointers", &["CSE", "Semester 1"]).await;

    let response = app
        .send(get("/semester-view?semester=Miscellaneous", Some(&author)))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains(r#"<option value="Miscellaneous" selected>"#));
    assert!(html.contains("Hostel wifi"));
    assert!(!html.contains("Pointers"));
}

#[tokio::test]
async fn test_nickname_changes_once() {
    let app = TestApp::new().await;
    let (_, student) = app.sign_in("asha", Role::Student).await;

    let response = app
        .send(with_json(
            "PUT",
            "/api/me/nickname",
            Some(&student),
            &json!({ "nickname": "Ash" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["display_name"], "Ash");

    let response = app
        .send(with_json(
            "PUT",
            "/api/me/nickname",
            Some(&student),
            &json!({ "nickname": "Asha" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_admin_manages_courses() {
    let app = TestApp::new().await;
    let (_, admin) = app.sign_in("dean", Role::Admin).await;
    let (_, student) = app.sign_in("asha", Role::Student).await;

    let response = app
        .send(with_json(
            "POST",
            "/api/admin/courses",
            Some(&admin),
            &json!({ "name": "MCA" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let course_id = body_json(response).await["id"].as_i64().unwrap();

    let response = app
        .send(with_json(
            "POST",
            "/api/admin/courses",
            Some(&admin),
            &json!({ "name": "MCA" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .send(with_json(
            "POST",
            "/api/admin/subjects",
            Some(&admin),
            &json!({ "course_id": course_id, "semester": "Semester 1", "name": "Data Structures" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .send(get("/api/subjects?course=MCA&semester=Semester%201", None))
        .await;
    assert_eq!(body_json(response).await, json!(["Data Structures"]));

    let response = app.send(get("/api/admin/courses", Some(&student))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_login_form_sends_link() {
    let app = TestApp::new().await;

    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(
                    "email=ravi%40college.edu&role=teacher&course=&semester=",
                ))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Check your email"));
    assert_eq!(app.links.0.lock().unwrap().len(), 1);
}
