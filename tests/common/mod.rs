#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use reqwest::{Client, StatusCode};
use tempfile::TempDir;

use projects_file::config::Config;
use projects_file::dates;
use projects_file::models::Project;
use projects_file::storage::kv::memory::MemoryClient;
use projects_file::storage::{BackendKind, Connector, SchemaMode, StoreConfig, WaitPolicy};

/// A running test server backed by its own store.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub connector: Connector,
    _dir: Option<TempDir>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// GET a page, returning status and body text.
    pub async fn get(&self, path: &str) -> (StatusCode, String) {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        (status, resp.text().await.unwrap_or_default())
    }

    /// POST a form, returning status, redirect target and body text.
    pub async fn post_form(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> (StatusCode, Option<String>, String) {
        let resp = self
            .client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let location = resp
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        (status, location, resp.text().await.unwrap_or_default())
    }

    pub async fn project(&self, number: i64) -> Option<Project> {
        let mut store = self.connector.open().await.unwrap();
        let project = store.get(number).await.unwrap();
        store.close().await.unwrap();
        project
    }
}

pub fn fast_wait() -> WaitPolicy {
    WaitPolicy {
        interval: Duration::from_millis(1),
        attempts: 50,
    }
}

/// A SQLite store in a fresh temporary directory.
pub fn sqlite_connector() -> (Connector, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let connector = Connector::relational(dir.path().join("db").join("projects.sdb"));
    (connector, dir)
}

/// A key-value store on an in-process table service.
pub fn memory_connector(transition_polls: u32) -> (Connector, Arc<MemoryClient>) {
    let client = Arc::new(MemoryClient::with_transition_polls(transition_polls));
    let connector = Connector::key_value(client.clone(), "projects", fast_wait())
        .expect("Failed to build key-value connector");
    (connector, client)
}

pub async fn seed(connector: &Connector, projects: &[Project]) {
    let mut store = connector.open().await.expect("Failed to open store");
    store
        .ensure_schema(SchemaMode::Reuse)
        .await
        .expect("Failed to prepare schema");
    for project in projects {
        store.insert(project).await.expect("Failed to insert project");
    }
    store.close().await.expect("Failed to close store");
}

pub fn at(value: &str) -> Option<NaiveDateTime> {
    dates::parse_import(value).expect("bad test date")
}

/// Two active (one of them a habit), one paused, two done, one bare idea.
pub fn sample_projects() -> Vec<Project> {
    let mut catalogue = Project::new(1, "Catalogue the record collection");
    catalogue.created = at("01/11/1996 00:00");
    catalogue.started_on = at("02/11/1996 10:00");
    catalogue.links = Some("https://example.org/discogs".to_string());

    let mut cello = Project::new(2, "Learn the cello");
    cello.created = at("15/03/1999 09:00");
    cello.started_on = at("05/01/2000 19:30");
    cello.stopped_on = at("06/01/2001 20:00");
    cello.memoranda = Some("Scales first, then pieces".to_string());

    let mut shed = Project::new(3, "Build a shed");
    shed.created = at("01/02/1999 12:00");
    shed.started_on = at("03/03/1999 08:00");
    shed.done = at("04/04/1999 17:00");

    let mut walk = Project::new(4, "Daily walk");
    walk.created = at("01/01/1998 07:00");
    walk.started_on = at("01/01/1998 07:00");
    walk.continuous = true;

    let novel = Project::new(5, "Write a novel");

    let mut fence = Project::new(6, "Paint the fence");
    fence.done = at("01/06/2005 15:00");
    fence.last_modified = at("01/06/2005 15:05");

    vec![catalogue, cello, shed, walk, novel, fence]
}

pub fn test_config(kind: BackendKind) -> Config {
    Config {
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        log_level: "warn".to_string(),
        store: StoreConfig {
            kind,
            sqlite_path: PathBuf::from("unused.sdb"),
            table_name: "projects".to_string(),
            region: "eu-west-1".to_string(),
            endpoint_url: None,
            wait: fast_wait(),
        },
    }
}

/// Spawn the app on a random port, seeded with `sample_projects`.
pub async fn spawn_app(connector: Connector, dir: Option<TempDir>) -> TestApp {
    seed(&connector, &sample_projects()).await;

    let app = projects_file::build_app(connector.clone(), test_config(connector.kind()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        client,
        connector,
        _dir: dir,
    }
}

pub async fn spawn_sqlite_app() -> TestApp {
    let (connector, dir) = sqlite_connector();
    spawn_app(connector, Some(dir)).await
}

pub async fn spawn_memory_app() -> TestApp {
    let (connector, _client) = memory_connector(1);
    spawn_app(connector, None).await
}
