//! Integration tests for database operations.

use campus_dialogue_hub::auth::cleanup::cleanup_once;
use campus_dialogue_hub::auth::generate_unique_username;
use campus_dialogue_hub::db::{
    add_post_attachments, assign_moderator, consume_magic_link, create_comment, create_course, create_magic_link,
    create_post, create_profile, create_session, create_subject, delete_course, delete_post_rows,
    delete_stale_magic_links, format_timestamp, get_moderator_slot, get_post, get_post_summary,
    get_profile_by_email, get_session_by_token, get_student_stats, get_tag_names_for_post,
    handle_vote, has_user_voted, list_assignments, list_subjects, list_tags,
    list_uncommented_posts, search_tags, set_nickname_once, subject_names_for, unassign_slot, username_exists,
    update_post, Attachment, Database, NewMagicLink, NewPost, NewProfile, PostEdit, Role, TimeSlot,
};
use chrono::{Duration, Utc};
use tempfile::TempDir;

async fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");
    (db, temp_dir)
}

async fn add_profile(db: &Database, username: &str, role: Role) -> i64 {
    create_profile(
        db.pool(),
        &NewProfile {
            email: format!("{username}@college.edu"),
            username: username.to_string(),
            role,
            course: None,
            semester: None,
        },
    )
    .await
    .expect("Failed to create profile")
}

async fn add_post(db: &Database, author_id: i64, title: &str, tags: &[&str]) -> i64 {
    create_post(
        db.pool(),
        &NewPost {
            author_id,
            title: title.to_string(),
            content: format!("{title} body"),
            preview: format!("{title} body"),
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
        },
    )
    .await
    .expect("Failed to create post")
}

#[tokio::test]
async fn test_default_tags_are_seeded() {
    let (db, _temp_dir) = setup_db().await;

    let names: Vec<String> = list_tags(db.pool())
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    for expected in ["Semester 1", "Miscellaneous", "CSE", "Questions", "DBMS"] {
        assert!(names.iter().any(|n| n == expected), "missing {expected}");
    }

    let found = search_tags(db.pool(), "dbm", 20).await.unwrap();
    assert!(found.iter().any(|t| t.name == "DBMS"));
}

#[tokio::test]
async fn test_create_post_creates_unknown_tags() {
    let (db, _temp_dir) = setup_db().await;
    let author = add_profile(&db, "asha", Role::Student).await;

    let post_id = add_post(&db, author, "Normalization", &["DBMS", "Brand New Tag"]).await;

    let tags = get_tag_names_for_post(db.pool(), post_id).await.unwrap();
    assert!(tags.contains(&"DBMS".to_string()));
    assert!(tags.contains(&"Brand New Tag".to_string()));

    let summary = get_post_summary(db.pool(), post_id).await.unwrap().unwrap();
    assert_eq!(summary.author, "asha");
    assert_eq!(summary.votes, 0);
    assert_eq!(summary.comment_count, 0);
}

#[tokio::test]
async fn test_vote_toggle_twice_restores_state() {
    let (db, _temp_dir) = setup_db().await;
    let author = add_profile(&db, "asha", Role::Student).await;
    let voter = add_profile(&db, "ravi", Role::Student).await;
    let post_id = add_post(&db, author, "Exam dates", &["Semester 3"]).await;

    let first = handle_vote(db.pool(), post_id, voter).await.unwrap().unwrap();
    assert!(first.voted);
    assert_eq!(first.votes, 1);
    assert!(has_user_voted(db.pool(), post_id, voter).await.unwrap());

    let second = handle_vote(db.pool(), post_id, voter).await.unwrap().unwrap();
    assert!(!second.voted);
    assert_eq!(second.votes, 0);
    assert!(!has_user_voted(db.pool(), post_id, voter).await.unwrap());

    let post = get_post(db.pool(), post_id).await.unwrap().unwrap();
    assert_eq!(post.votes, 0);
}

#[tokio::test]
async fn test_vote_on_missing_post() {
    let (db, _temp_dir) = setup_db().await;
    let voter = add_profile(&db, "ravi", Role::Student).await;

    assert!(handle_vote(db.pool(), 999, voter).await.unwrap().is_none());
}

#[tokio::test]
async fn test_moderator_slot_has_one_holder() {
    let (db, _temp_dir) = setup_db().await;
    let teacher = add_profile(&db, "prof", Role::Teacher).await;
    let first = add_profile(&db, "asha", Role::Student).await;
    let second = add_profile(&db, "ravi", Role::Student).await;

    assign_moderator(db.pool(), first, TimeSlot::Morning, teacher)
        .await
        .unwrap();
    assign_moderator(db.pool(), second, TimeSlot::Morning, teacher)
        .await
        .unwrap();

    let assignments = list_assignments(db.pool()).await.unwrap();
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].student_id, second);
    assert_eq!(assignments[0].student_username, "ravi");
    assert_eq!(assignments[0].time_slot, "10am-12pm");

    assert_eq!(get_moderator_slot(db.pool(), first).await.unwrap(), None);
    assert_eq!(
        get_moderator_slot(db.pool(), second).await.unwrap().as_deref(),
        Some("10am-12pm")
    );

    assert!(unassign_slot(db.pool(), TimeSlot::Morning).await.unwrap());
    assert!(!unassign_slot(db.pool(), TimeSlot::Morning).await.unwrap());
    assert!(list_assignments(db.pool()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_assignments_follow_slot_order() {
    let (db, _temp_dir) = setup_db().await;
    let teacher = add_profile(&db, "prof", Role::Teacher).await;
    let student = add_profile(&db, "asha", Role::Student).await;

    assign_moderator(db.pool(), student, TimeSlot::LateNight, teacher)
        .await
        .unwrap();
    assign_moderator(db.pool(), student, TimeSlot::Afternoon, teacher)
        .await
        .unwrap();

    let slots: Vec<String> = list_assignments(db.pool())
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.time_slot)
        .collect();
    assert_eq!(slots, vec!["2pm-4pm", "10pm-12am"]);
    assert_eq!(
        get_moderator_slot(db.pool(), student).await.unwrap().as_deref(),
        Some("2pm-4pm")
    );
}

#[tokio::test]
async fn test_delete_post_rows_removes_dependents() {
    let (db, _temp_dir) = setup_db().await;
    let author = add_profile(&db, "asha", Role::Student).await;
    let other = add_profile(&db, "ravi", Role::Student).await;
    let post_id = add_post(&db, author, "Lab manual", &["Resources"]).await;

    create_comment(db.pool(), post_id, other, "Check the library")
        .await
        .unwrap();
    handle_vote(db.pool(), post_id, other).await.unwrap();

    let attachments = delete_post_rows(db.pool(), post_id).await.unwrap();
    assert_eq!(attachments, Some(Vec::new()));
    assert!(get_post(db.pool(), post_id).await.unwrap().is_none());
    assert!(!has_user_voted(db.pool(), post_id, other).await.unwrap());

    let stats = get_student_stats(db.pool(), other).await.unwrap();
    assert_eq!(stats.comment_count, 0);

    assert!(delete_post_rows(db.pool(), post_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_post_replaces_tags() {
    let (db, _temp_dir) = setup_db().await;
    let author = add_profile(&db, "asha", Role::Student).await;
    let post_id = add_post(&db, author, "Old title", &["CSE", "Semester 1"]).await;

    update_post(
        db.pool(),
        post_id,
        &PostEdit {
            title: "New title".to_string(),
            content: "New body".to_string(),
            preview: "New body".to_string(),
            tags: vec!["IT".to_string()],
            remove_attachments: Vec::new(),
        },
    )
    .await
    .unwrap();

    let summary = get_post_summary(db.pool(), post_id).await.unwrap().unwrap();
    assert_eq!(summary.title, "New title");
    assert_eq!(summary.tags, vec!["IT"]);
}

fn attachment(key: &str) -> Attachment {
    Attachment {
        key: key.to_string(),
        name: format!("{key}.pdf"),
        url: format!("/uploads/{key}"),
        size: 10,
    }
}

#[tokio::test]
async fn test_edit_detaches_only_removed_attachments() {
    let (db, _temp_dir) = setup_db().await;
    let author = add_profile(&db, "asha", Role::Student).await;
    let post_id = add_post(&db, author, "Notes", &["CSE"]).await;
    add_post_attachments(db.pool(), post_id, &[attachment("a"), attachment("b")])
        .await
        .unwrap();

    // Lands after the editor loaded the post.
    add_post_attachments(db.pool(), post_id, &[attachment("c")])
        .await
        .unwrap();

    let removed = update_post(
        db.pool(),
        post_id,
        &PostEdit {
            title: "Notes".to_string(),
            content: "Updated".to_string(),
            preview: "Updated".to_string(),
            tags: vec!["CSE".to_string()],
            remove_attachments: vec!["a".to_string()],
        },
    )
    .await
    .unwrap();
    assert_eq!(removed, vec![attachment("a")]);

    let summary = get_post_summary(db.pool(), post_id).await.unwrap().unwrap();
    let keys: Vec<&str> = summary.attachments.iter().map(|a| a.key.as_str()).collect();
    assert_eq!(keys, vec!["b", "c"]);
}

#[tokio::test]
async fn test_update_missing_post_fails() {
    let (db, _temp_dir) = setup_db().await;

    let result = update_post(
        db.pool(),
        999,
        &PostEdit {
            title: "Ghost".to_string(),
            content: "Ghost".to_string(),
            preview: "Ghost".to_string(),
            tags: Vec::new(),
            remove_attachments: Vec::new(),
        },
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_uncommented_posts_exclude_answered() {
    let (db, _temp_dir) = setup_db().await;
    let author = add_profile(&db, "asha", Role::Student).await;
    let answered = add_post(&db, author, "Answered", &[]).await;
    let open = add_post(&db, author, "Open", &[]).await;

    create_comment(db.pool(), answered, author, "Solved it")
        .await
        .unwrap();

    let ids: Vec<i64> = list_uncommented_posts(db.pool())
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(ids, vec![open]);
}

#[tokio::test]
async fn test_username_falls_back_to_random_suffix() {
    let (db, _temp_dir) = setup_db().await;
    add_profile(&db, "ravi", Role::Student).await;
    for n in 2..=100 {
        add_profile(&db, &format!("ravi{n}"), Role::Student).await;
    }

    let username = generate_unique_username(db.pool(), "Ravi@college.edu")
        .await
        .unwrap();

    let suffix: u32 = username
        .strip_prefix("ravi")
        .and_then(|s| s.parse().ok())
        .expect("numeric suffix");
    assert!((1000..100_000).contains(&suffix));
    assert!(!username_exists(db.pool(), &username).await.unwrap());
}

#[tokio::test]
async fn test_nickname_can_be_set_once() {
    let (db, _temp_dir) = setup_db().await;
    add_profile(&db, "asha", Role::Student).await;
    let profile = get_profile_by_email(db.pool(), "ASHA@college.edu")
        .await
        .unwrap()
        .expect("email lookup is case-insensitive");

    assert!(set_nickname_once(db.pool(), profile.id, "Ash").await.unwrap());
    assert!(!set_nickname_once(db.pool(), profile.id, "Asha K").await.unwrap());

    let profile = get_profile_by_email(db.pool(), "asha@college.edu")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(profile.nickname.as_deref(), Some("Ash"));
    assert!(profile.nickname_changed);
}

#[tokio::test]
async fn test_magic_link_is_consumed_once() {
    let (db, _temp_dir) = setup_db().await;

    let link = |hash: &str, expires_in: Duration| NewMagicLink {
        token_hash: hash.to_string(),
        email: "asha@college.edu".to_string(),
        role: Role::Student,
        course: Some("CSE".to_string()),
        semester: None,
        expires_at: format_timestamp(Utc::now() + expires_in),
    };

    create_magic_link(db.pool(), &link("fresh", Duration::minutes(15)))
        .await
        .unwrap();
    create_magic_link(db.pool(), &link("stale", Duration::minutes(-1)))
        .await
        .unwrap();

    let consumed = consume_magic_link(db.pool(), "fresh").await.unwrap().unwrap();
    assert_eq!(consumed.email, "asha@college.edu");
    assert_eq!(consumed.course.as_deref(), Some("CSE"));

    assert!(consume_magic_link(db.pool(), "fresh").await.unwrap().is_none());
    assert!(consume_magic_link(db.pool(), "stale").await.unwrap().is_none());
    assert!(consume_magic_link(db.pool(), "unknown").await.unwrap().is_none());
}

#[tokio::test]
async fn test_course_delete_removes_subjects() {
    let (db, _temp_dir) = setup_db().await;

    let course = create_course(db.pool(), "MCA").await.unwrap();
    create_subject(db.pool(), course.id, "Semester 1", "Data Structures")
        .await
        .unwrap();
    assert!(create_course(db.pool(), "MCA").await.is_err());

    assert_eq!(
        subject_names_for(db.pool(), "MCA", "Semester 1").await.unwrap(),
        vec!["Data Structures"]
    );
    assert!(subject_names_for(db.pool(), "MCA", "Semester 2")
        .await
        .unwrap()
        .is_empty());

    assert!(delete_course(db.pool(), course.id).await.unwrap());
    assert!(list_subjects(db.pool(), None).await.unwrap().is_empty());
    assert!(!delete_course(db.pool(), course.id).await.unwrap());
}

#[tokio::test]
async fn test_cleanup_removes_expired_sessions_and_used_links() {
    let (db, _temp_dir) = setup_db().await;
    let user = add_profile(&db, "asha", Role::Student).await;

    let past = format_timestamp(Utc::now() - Duration::hours(1));
    let future = format_timestamp(Utc::now() + Duration::hours(1));
    create_session(db.pool(), user, "expired-token", &past)
        .await
        .unwrap();
    create_session(db.pool(), user, "live-token", &future)
        .await
        .unwrap();
    create_magic_link(
        db.pool(),
        &NewMagicLink {
            token_hash: "used".to_string(),
            email: "asha@college.edu".to_string(),
            role: Role::Student,
            course: None,
            semester: None,
            expires_at: future.clone(),
        },
    )
    .await
    .unwrap();
    consume_magic_link(db.pool(), "used").await.unwrap();

    cleanup_once(db.pool()).await;

    assert!(get_session_by_token(db.pool(), "expired-token")
        .await
        .unwrap()
        .is_none());
    assert!(get_session_by_token(db.pool(), "live-token")
        .await
        .unwrap()
        .is_some());
    assert_eq!(delete_stale_magic_links(db.pool()).await.unwrap(), 0);
}
