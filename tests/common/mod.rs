#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use restro_api_rust::auth::{generate_jwt, Claims};
use restro_api_rust::config::AppConfig;
use restro_api_rust::database::{MemoryBackend, MemoryDirectory};
use restro_api_rust::{app, AppState};
use serde_json::Value;
use tower::ServiceExt;

pub const SECRET: &str = "integration-secret";

/// Full router over the in-memory backend, driven with `oneshot`
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub backend: MemoryBackend,
}

impl TestApp {
    pub fn new() -> Self {
        let mut config = AppConfig::development();
        config.security.jwt_secret = SECRET.to_string();

        let backend = MemoryBackend::new();
        let state = AppState::new(
            Arc::new(config),
            Arc::new(backend.clone()),
            Arc::new(MemoryDirectory::new()),
        );

        Self {
            router: app(state.clone()),
            state,
            backend,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).with_context(|| {
                format!("non-JSON body: {}", String::from_utf8_lossy(&bytes))
            })?
        };
        Ok((status, json))
    }

    pub async fn get(&self, uri: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, uri, None, &[]).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::POST, uri, Some(body), &[]).await
    }

    pub fn root_token(&self) -> String {
        generate_jwt(&Claims::root("ops", 1), SECRET).expect("root token")
    }

    pub fn staff_token(&self, slug: &str, restaurant_id: i64) -> String {
        generate_jwt(&Claims::staff("captain", slug, restaurant_id, 1), SECRET).expect("staff token")
    }

    /// Register and provision a restaurant through the root API
    pub async fn provision(&self, slug: &str, display_name: &str) -> Result<Value> {
        let token = format!("Bearer {}", self.root_token());
        let (status, body) = self
            .send(
                Method::POST,
                "/api/root/tenant",
                Some(serde_json::json!({ "slug": slug, "display_name": display_name })),
                &[("authorization", token.as_str())],
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "provision failed: {} {}", status, body);
        Ok(body["data"].clone())
    }
}
