mod common;

use reqwest::StatusCode;
use serde_json::Value;

fn position(body: &str, needle: &str) -> usize {
    body.find(needle)
        .unwrap_or_else(|| panic!("{needle:?} missing from page"))
}

// ── Basics ──────────────────────────────────────────────────────

#[tokio::test]
async fn health_returns_ok() {
    let app = common::spawn_sqlite_app().await;

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn hello_says_hello() {
    let app = common::spawn_sqlite_app().await;

    let (status, body) = app.get("/hello").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<h1>Hello!</h1>");
}

// ── Lists ───────────────────────────────────────────────────────

#[tokio::test]
async fn home_lists_active_projects_by_start_date() {
    let app = common::spawn_sqlite_app().await;

    let (status, body) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<title>The Projects File - Projects: Currently Active"));

    let catalogue = position(&body, "Catalogue the record collection");
    let walk = position(&body, "Daily walk");
    let cello = position(&body, "Learn the cello");
    assert!(catalogue < walk && walk < cello, "wrong order:\n{body}");
    assert!(!body.contains("Build a shed"));
    assert!(!body.contains("Write a novel"));
}

#[tokio::test]
async fn home_order_matches_on_key_value_backend() {
    let app = common::spawn_memory_app().await;

    let (status, body) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
    let catalogue = position(&body, "Catalogue the record collection");
    let walk = position(&body, "Daily walk");
    let cello = position(&body, "Learn the cello");
    assert!(catalogue < walk && walk < cello, "wrong order:\n{body}");
}

#[tokio::test]
async fn list_shows_every_project_with_summary_columns() {
    let app = common::spawn_sqlite_app().await;

    let (status, body) = app.get("/list").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Projects: All"));
    for header in ["number", "idea", "created", "done"] {
        assert!(body.contains(&format!("<th>{header}</th>")), "missing {header}");
    }
    assert!(position(&body, "Catalogue the record") < position(&body, "Paint the fence"));
    assert!(body.contains("Write a novel"));
}

#[tokio::test]
async fn paused_shows_only_stopped_projects() {
    let app = common::spawn_sqlite_app().await;

    let (status, body) = app.get("/paused").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Projects: Paused"));
    assert!(body.contains("Learn the cello"));
    assert!(!body.contains("Daily walk"));
}

#[tokio::test]
async fn done_lists_most_recent_first() {
    let app = common::spawn_sqlite_app().await;

    let (status, body) = app.get("/done").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Projects: Completed"));
    assert!(position(&body, "Paint the fence") < position(&body, "Build a shed"));
    assert!(!body.contains("Learn the cello"));
}

#[tokio::test]
async fn habits_shows_continuous_projects() {
    let app = common::spawn_memory_app().await;

    let (status, body) = app.get("/habits").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Projects: Habits"));
    assert!(body.contains("Daily walk"));
    assert!(!body.contains("Catalogue the record collection"));
}

// ── Single project ──────────────────────────────────────────────

#[tokio::test]
async fn show_project_formats_dates() {
    let app = common::spawn_sqlite_app().await;

    let (status, body) = app.get("/project/1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Project No.1"));
    assert!(body.contains("Created: Fri, 01 Nov, 1996, 12:00 AM"));
    assert!(body.contains("Done: Not set"));
}

#[tokio::test]
async fn show_unknown_project_is_not_found() {
    let app = common::spawn_sqlite_app().await;

    let (status, _) = app.get("/project/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn edit_page_prefills_form_dates() {
    let app = common::spawn_sqlite_app().await;

    let (status, body) = app.get("/project/1/edit").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Projects: Editing"));
    assert!(body.contains(r#"name="created" value="1996-11-01T00:00""#));
    assert!(body.contains(r#"name="done" value="""#));
}

#[tokio::test]
async fn edit_page_stamps_last_modified_with_now() {
    let app = common::spawn_sqlite_app().await;

    let (status, body) = app.get("/project/6/edit").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains(r#"name="last_modified" value="2005-06-01T15:05""#));

    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    assert!(
        body.contains(&format!(r#"name="last_modified" value="{today}T"#)),
        "last_modified not prefilled with today:\n{body}"
    );
}

#[tokio::test]
async fn edit_requires_an_idea() {
    let app = common::spawn_sqlite_app().await;
    let before = app.project(1).await;

    let (status, location, body) = app
        .post_form("/project/1/edit", &[("idea", ""), ("created", "1996-11-01T00:00")])
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(location, None);
    assert!(body.contains("Idea is required."));
    assert_eq!(app.project(1).await, before);
}

#[tokio::test]
async fn edit_rejects_malformed_dates() {
    let app = common::spawn_memory_app().await;
    let before = app.project(2).await;

    let (status, _, body) = app
        .post_form(
            "/project/2/edit",
            &[("idea", "Learn the cello"), ("started_on", "05/01/2000 19:30")],
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body.contains("does not match the expected format"));
    assert_eq!(app.project(2).await, before);
}

#[tokio::test]
async fn edit_replaces_the_record_and_redirects() {
    for app in [
        common::spawn_sqlite_app().await,
        common::spawn_memory_app().await,
    ] {
        let (status, location, _) = app
            .post_form(
                "/project/1/edit",
                &[
                    ("idea", "Catalogue the records and tapes"),
                    ("created", "1996-11-01T00:00"),
                    ("started_on", "1996-11-02T10:00"),
                    ("done", "2024-05-01T18:30"),
                    ("links", ""),
                    ("memoranda", "Finally finished"),
                    ("last_modified", "2024-05-01T18:31"),
                ],
            )
            .await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location.as_deref(), Some("/project/1"));

        let project = app.project(1).await.expect("project 1 should still exist");
        assert_eq!(project.idea, "Catalogue the records and tapes");
        assert_eq!(project.links, None);
        assert_eq!(project.memoranda.as_deref(), Some("Finally finished"));
        assert!(project.done.is_some());
        assert!(!project.continuous);

        let (_, done) = app.get("/done").await;
        assert!(done.contains("Catalogue the records and tapes"));
    }
}

#[tokio::test]
async fn edit_unknown_project_is_not_found() {
    let app = common::spawn_sqlite_app().await;

    let (status, _, _) = app.post_form("/project/999/edit", &[("idea", "Ghost")]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── JSON API ────────────────────────────────────────────────────

#[tokio::test]
async fn api_lists_filtered_projects_in_order() {
    let app = common::spawn_memory_app().await;

    let resp = app
        .client
        .get(app.url("/api/v1/projects?filter=active"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    let numbers: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["number"].as_i64().unwrap())
        .collect();
    assert_eq!(numbers, vec![1, 4, 2]);
}

#[tokio::test]
async fn api_rejects_unknown_filter() {
    let app = common::spawn_sqlite_app().await;

    let resp = app
        .client
        .get(app.url("/api/v1/projects?filter=stalled"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("stalled"));
}

#[tokio::test]
async fn api_gets_one_project() {
    let app = common::spawn_sqlite_app().await;

    let resp = app.client.get(app.url("/api/v1/projects/4")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["idea"], "Daily walk");
    assert_eq!(body["continuous"], true);
    assert!(body["done"].is_null());

    let resp = app.client.get(app.url("/api/v1/projects/404")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
