#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode},
};
use serde_json::Value;
use std::path::PathBuf;
use tower::ServiceExt;
use uuid::Uuid;

pub const SERVICE_KEY: &str = "svc-test-key";
pub const WEBHOOK_SECRET: &str = "whsec_test";

pub struct TestApp {
    pub app: Router,
    pub storage: meu_rdo::db::Storage,
    db_path: PathBuf,
    pub storage_root: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_path);
        let _ = std::fs::remove_dir_all(&self.storage_root);
    }
}

pub fn test_config() -> meu_rdo::config::Config {
    let mut cfg = meu_rdo::config::Config::default();
    cfg.basic.service_key = SERVICE_KEY.to_string();
    cfg.billing.webhook_secret = WEBHOOK_SECRET.to_string();
    cfg
}

/// Fresh app over a temporary sqlite file and blob directory.
pub async fn spawn_app(mut cfg: meu_rdo::config::Config) -> TestApp {
    let run = Uuid::new_v4();
    let db_path = std::env::temp_dir().join(format!("meu-rdo-test-{run}.sqlite"));
    let storage_root = std::env::temp_dir().join(format!("meu-rdo-test-blobs-{run}"));
    cfg.storage.root = storage_root.clone();

    let database_url = format!("sqlite:{}", db_path.display());
    let storage = meu_rdo::db::Storage::connect(&database_url)
        .await
        .expect("failed to open test database");
    let state = meu_rdo::router::RdoState::new(storage.clone(), cfg)
        .await
        .expect("failed to build state");

    TestApp {
        app: meu_rdo::router::rdo_router(state),
        storage,
        db_path,
        storage_root,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body was not json")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("response body was not utf-8")
    }
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let resp = self.app.clone().oneshot(req).await.expect("request failed");
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("failed to read response body")
            .to_vec();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let req = match body {
            Some(v) => builder
                .header("content-type", "application/json")
                .body(Body::from(v.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("failed to build request");
        self.send(req).await
    }

    /// Issue a token through the service-key endpoint; returns `(user_id, token)`.
    pub async fn login(&self, email: &str, role: &str) -> (String, String) {
        let req = Request::builder()
            .method("POST")
            .uri("/auth/tokens")
            .header("content-type", "application/json")
            .header("x-service-key", SERVICE_KEY)
            .body(Body::from(
                serde_json::json!({ "email": email, "role": role }).to_string(),
            ))
            .expect("failed to build request");
        let resp = self.send(req).await;
        assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text());
        let v = resp.json();
        (
            v["user_id"].as_str().unwrap().to_string(),
            v["token"].as_str().unwrap().to_string(),
        )
    }

    pub async fn create_obra(&self, token: &str, nome: &str) -> String {
        let resp = self
            .call(
                "POST",
                "/api/obras",
                Some(token),
                Some(serde_json::json!({ "nome": nome, "orcamento": 10000.0 })),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text());
        resp.json()["id"].as_str().unwrap().to_string()
    }
}
