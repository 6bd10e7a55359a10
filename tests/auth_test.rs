//! Integration tests for magic-link sign-in.

use std::sync::Mutex;

use async_trait::async_trait;
use campus_dialogue_hub::auth::{
    generate_unique_username, issue_magic_link, redeem_magic_link, MagicLinkRequest,
    MagicLinkSender, WebhookSender,
};
use campus_dialogue_hub::config::Config;
use campus_dialogue_hub::db::{create_profile, get_session_by_token, Database, NewProfile, Role};
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct CapturedLinks(Mutex<Vec<String>>);

#[async_trait]
impl MagicLinkSender for CapturedLinks {
    async fn send(&self, _email: &str, link: &str) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(link.to_string());
        Ok(())
    }
}

impl CapturedLinks {
    fn last_token(&self) -> String {
        let link = self.0.lock().unwrap().last().cloned().expect("no link sent");
        link.split_once("token=").unwrap().1.to_string()
    }
}

async fn setup() -> (Database, Config, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = Config::for_testing(temp_dir.path());
    let db = Database::new(&config.database_path)
        .await
        .expect("Failed to create database");
    (db, config, temp_dir)
}

fn request(email: &str, role: Role) -> MagicLinkRequest {
    MagicLinkRequest {
        email: email.to_string(),
        role,
        course: Some("CSE".to_string()),
        semester: Some("Semester 3".to_string()),
    }
}

#[tokio::test]
async fn test_webhook_sender_posts_link() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .and(body_partial_json(serde_json::json!({
            "to": "asha@college.edu",
            "link": "http://localhost:8080/auth/callback?token=abc"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let sender = WebhookSender::new(&format!("{}/send", server.uri())).unwrap();
    sender
        .send(
            "asha@college.edu",
            "http://localhost:8080/auth/callback?token=abc",
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_webhook_sender_reports_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let sender = WebhookSender::new(&server.uri()).unwrap();
    let result = sender.send("asha@college.edu", "http://x/auth/callback").await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_sign_in_creates_profile_and_session() {
    let (db, config, _temp_dir) = setup().await;
    let sender = CapturedLinks::default();

    let role = issue_magic_link(
        db.pool(),
        &config,
        &sender,
        &request("asha@college.edu", Role::Student),
    )
    .await
    .unwrap();
    assert_eq!(role, Role::Student);

    let sign_in = redeem_magic_link(db.pool(), &config, &sender.last_token())
        .await
        .unwrap()
        .expect("fresh link redeems");
    assert!(sign_in.created);
    assert_eq!(sign_in.profile.username, "asha");
    assert_eq!(sign_in.profile.course.as_deref(), Some("CSE"));
    assert_eq!(sign_in.profile.semester.as_deref(), Some("Semester 3"));

    let session = get_session_by_token(db.pool(), &sign_in.session_token)
        .await
        .unwrap()
        .expect("session stored");
    assert_eq!(session.user_id, sign_in.profile.id);

    assert!(redeem_magic_link(db.pool(), &config, &sender.last_token())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_existing_profile_keeps_role() {
    let (db, config, _temp_dir) = setup().await;
    let sender = CapturedLinks::default();
    create_profile(
        db.pool(),
        &NewProfile {
            email: "prof@college.edu".to_string(),
            username: "prof".to_string(),
            role: Role::Teacher,
            course: None,
            semester: None,
        },
    )
    .await
    .unwrap();

    let role = issue_magic_link(
        db.pool(),
        &config,
        &sender,
        &request("prof@college.edu", Role::Student),
    )
    .await
    .unwrap();
    assert_eq!(role, Role::Teacher);

    let sign_in = redeem_magic_link(db.pool(), &config, &sender.last_token())
        .await
        .unwrap()
        .unwrap();
    assert!(!sign_in.created);
    assert_eq!(sign_in.profile.role, "teacher");
}

#[tokio::test]
async fn test_admin_email_gets_admin_role() {
    let (db, config, _temp_dir) = setup().await;
    let sender = CapturedLinks::default();

    let role = issue_magic_link(
        db.pool(),
        &config,
        &sender,
        &request("dean@college.edu", Role::Teacher),
    )
    .await
    .unwrap();
    assert_eq!(role, Role::Admin);

    let sign_in = redeem_magic_link(db.pool(), &config, &sender.last_token())
        .await
        .unwrap()
        .unwrap();
    assert!(sign_in.profile.is_admin());
}

#[tokio::test]
async fn test_unknown_token_is_rejected() {
    let (db, config, _temp_dir) = setup().await;

    assert!(redeem_magic_link(db.pool(), &config, "not-a-token")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_usernames_are_deduplicated() {
    let (db, _config, _temp_dir) = setup().await;

    for expected in ["asha", "asha2", "asha3"] {
        let username = generate_unique_username(db.pool(), "Asha@college.edu")
            .await
            .unwrap();
        assert_eq!(username, expected);
        create_profile(
            db.pool(),
            &NewProfile {
                email: format!("{username}@college.edu"),
                username,
                role: Role::Student,
                course: None,
                semester: None,
            },
        )
        .await
        .unwrap();
    }
}
