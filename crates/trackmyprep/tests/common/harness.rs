//! Test harness for running the HTTP API end to end.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde_json::Value;
use tempfile::TempDir;
use tokio::task::JoinHandle;

use trackmyprep::config::{StaticIdentityConfig, StaticUser};
use trackmyprep::{
    build_router, ApiSettings, AppState, Database, IdentityProvider, ResumeStorage,
    StaticIdentityProvider,
};

pub const ALICE: &str = "user_alice";
pub const ALICE_TOKEN: &str = "tok-alice-5f2d9c7e1b";
pub const BOB: &str = "user_bob";
pub const BOB_TOKEN: &str = "tok-bob-8a41e03c77";

/// Knobs for a harness instance. Defaults match a stock server config.
pub struct HarnessOptions {
    pub allowed_origins: Vec<String>,
    pub allowed_extensions: Vec<String>,
    pub max_upload_bytes: usize,
    pub remove_on_delete: bool,
    /// Replaces the built-in two-user static provider.
    pub identity: Option<Arc<dyn IdentityProvider>>,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_extensions: Vec::new(),
            max_upload_bytes: 10 * 1024 * 1024,
            remove_on_delete: false,
            identity: None,
        }
    }
}

/// A running server plus a client pointed at it.
pub struct TestHarness {
    temp_dir: TempDir,
    pub base_url: String,
    pub client: reqwest::Client,
    pub state: AppState,
    server: JoinHandle<()>,
}

fn static_users() -> Arc<dyn IdentityProvider> {
    let user = |token: &str, id: &str, email: &str, first: &str| StaticUser {
        token: token.to_string(),
        id: id.to_string(),
        email: email.to_string(),
        first_name: Some(first.to_string()),
        last_name: None,
    };
    Arc::new(StaticIdentityProvider::from_config(&StaticIdentityConfig {
        users: vec![
            user(ALICE_TOKEN, ALICE, "alice@example.com", "Alice"),
            user(BOB_TOKEN, BOB, "bob@example.com", "Bob"),
        ],
    }))
}

impl TestHarness {
    pub async fn start() -> Self {
        Self::start_with(HarnessOptions::default()).await
    }

    pub async fn start_with(options: HarnessOptions) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let base_url = format!("http://{}", listener.local_addr().expect("local addr"));

        let storage = ResumeStorage::new(
            temp_dir.path().join("uploads"),
            &format!("{}/uploads", base_url),
            options.allowed_extensions,
        );
        let db = Database::open_in_memory().expect("Failed to open in-memory database");
        let settings = ApiSettings {
            allowed_origins: options.allowed_origins,
            resume_field: "resume".to_string(),
            max_upload_bytes: options.max_upload_bytes,
            remove_resume_on_delete: options.remove_on_delete,
        };
        let identity = options.identity.unwrap_or_else(static_users);
        let state = AppState::new(db, storage, identity, settings);

        let app = build_router(state.clone());
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server failed");
        });

        Self {
            temp_dir,
            base_url,
            client: reqwest::Client::new(),
            state,
            server,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.temp_dir.path().join("uploads")
    }

    /// Files currently in the upload directory, sorted.
    pub fn stored_files(&self) -> Vec<String> {
        let mut names: Vec<String> = match std::fs::read_dir(self.uploads_dir()) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }

    /// Drops the records table so every later store call fails.
    pub fn break_store(&self) {
        self.state
            .db
            .with_conn(|conn| Ok(conn.execute_batch("DROP TABLE applications")?))
            .expect("Failed to drop applications table");
    }

    fn form(fields: &[(&str, &str)]) -> Form {
        fields.iter().fold(Form::new(), |form, (name, value)| {
            form.text(name.to_string(), value.to_string())
        })
    }

    /// `POST /applications` with text fields only.
    pub async fn create(&self, token: &str, fields: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url("/applications"))
            .bearer_auth(token)
            .multipart(Self::form(fields))
            .send()
            .await
            .expect("create request failed")
    }

    /// `POST /applications` with a resume attached.
    pub async fn create_with_file(
        &self,
        token: &str,
        fields: &[(&str, &str)],
        file_name: &str,
        content: &[u8],
    ) -> Response {
        let part = Part::bytes(content.to_vec()).file_name(file_name.to_string());
        self.client
            .post(self.url("/applications"))
            .bearer_auth(token)
            .multipart(Self::form(fields).part("resume", part))
            .send()
            .await
            .expect("create request failed")
    }

    /// Creates a valid record and returns its JSON.
    pub async fn create_ok(&self, token: &str, company: &str) -> Value {
        let response = self
            .create(
                token,
                &[
                    ("company", company),
                    ("role", "SDE Intern"),
                    ("status", "Applied"),
                    ("priority", "High"),
                    ("category", "Internship"),
                ],
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        response.json().await.expect("create response is not JSON")
    }

    /// `GET /applications`, expecting success.
    pub async fn list(&self, token: &str) -> Vec<Value> {
        self.list_query(token, "").await
    }

    pub async fn list_query(&self, token: &str, query: &str) -> Vec<Value> {
        let response = self
            .client
            .get(self.url(&format!("/applications{}", query)))
            .bearer_auth(token)
            .send()
            .await
            .expect("list request failed");
        assert_eq!(response.status(), StatusCode::OK);
        response.json().await.expect("list response is not JSON")
    }

    pub async fn update_json(&self, token: &str, id: &str, body: &Value) -> Response {
        self.client
            .put(self.url(&format!("/applications/{}", id)))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("update request failed")
    }

    pub async fn delete(&self, token: &str, id: &str) -> Response {
        self.client
            .delete(self.url(&format!("/applications/{}", id)))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete request failed")
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.server.abort();
    }
}
