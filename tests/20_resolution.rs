mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use restro_api_rust::tenancy::TenantSlug;
use serde_json::json;

#[tokio::test]
async fn unknown_tenant_is_404_and_not_provisioned() -> Result<()> {
    let app = common::TestApp::new();
    let (status, body) = app.get("/api/t/ghost-kitchen/menu").await?;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "TENANT_NOT_FOUND");
    assert_eq!(app.backend.partition_count().await, 0);
    assert_eq!(app.backend.stats().create_partition_calls, 0);
    Ok(())
}

#[tokio::test]
async fn malformed_slug_is_rejected_before_storage() -> Result<()> {
    let app = common::TestApp::new();
    let (status, body) = app.get("/api/t/Bad_Slug/menu").await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_TENANT_IDENTIFIER");
    assert_eq!(app.backend.stats().create_partition_calls, 0);
    Ok(())
}

#[tokio::test]
async fn staff_routes_need_a_tenant_source() -> Result<()> {
    let app = common::TestApp::new();
    let (status, _) = app.get("/api/staff/menu").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn header_resolves_staff_routes() -> Result<()> {
    let app = common::TestApp::new();
    app.provision("spice-garden", "Spice Garden").await?;

    let (status, body) = app
        .send(Method::GET, "/api/staff", None, &[("x-tenant-slug", "spice-garden")])
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["slug"], "spice-garden");
    assert_eq!(body["data"]["display_name"], "Spice Garden");
    Ok(())
}

#[tokio::test]
async fn token_claim_resolves_staff_routes() -> Result<()> {
    let app = common::TestApp::new();
    let tenant = app.provision("spice-garden", "Spice Garden").await?;
    let id = tenant["id"].as_i64().unwrap();
    let auth = format!("Bearer {}", app.staff_token("spice-garden", id));

    let (status, body) = app
        .send(
            Method::POST,
            "/api/staff/menu",
            Some(json!({ "name": "Dosa", "price_paise": 9000 })),
            &[("authorization", auth.as_str())],
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["name"], "Dosa");

    let (status, body) = app.get("/api/t/spice-garden/menu").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn conflicting_sources_are_forbidden() -> Result<()> {
    let app = common::TestApp::new();
    let a = app.provision("spice-garden", "Spice Garden").await?;
    app.provision("dosa-hut", "Dosa Hut").await?;

    let (status, body) = app
        .send(Method::GET, "/api/t/spice-garden/menu", None, &[("x-tenant-slug", "dosa-hut")])
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "CROSS_TENANT_ACCESS");
    assert!(!body.to_string().contains("tenant_dosa_hut"));

    // A spice-garden token cannot be pointed at dosa-hut's path
    let auth = format!("Bearer {}", app.staff_token("spice-garden", a["id"].as_i64().unwrap()));
    let (status, _) = app
        .send(Method::GET, "/api/t/dosa-hut/menu", None, &[("authorization", auth.as_str())])
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn restaurant_id_claim_must_match() -> Result<()> {
    let app = common::TestApp::new();
    let tenant = app.provision("spice-garden", "Spice Garden").await?;
    let wrong = tenant["id"].as_i64().unwrap() + 100;
    let auth = format!("Bearer {}", app.staff_token("spice-garden", wrong));

    let (status, _) = app
        .send(Method::GET, "/api/staff/menu", None, &[("authorization", auth.as_str())])
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn invalid_bearer_token_is_401() -> Result<()> {
    let app = common::TestApp::new();
    app.provision("spice-garden", "Spice Garden").await?;

    let (status, _) = app
        .send(
            Method::GET,
            "/api/t/spice-garden/menu",
            None,
            &[("authorization", "Bearer not-a-token")],
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn concurrent_first_requests_bind_once() -> Result<()> {
    let app = std::sync::Arc::new(common::TestApp::new());
    app.provision("spice-garden", "Spice Garden").await?;
    app.state.registry.evict(&TenantSlug::parse("spice-garden")?).await;
    let opened = app.backend.stats().connections_opened;
    app.backend.set_connect_latency(std::time::Duration::from_millis(50));

    let requests = (0..8).map(|_| {
        let app = app.clone();
        tokio::spawn(async move { app.get("/api/t/spice-garden/menu").await })
    });
    for response in futures::future::join_all(requests).await {
        let (status, _) = response??;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(app.backend.stats().connections_opened, opened + 1);
    Ok(())
}

#[tokio::test]
async fn exhausted_connections_are_503() -> Result<()> {
    let app = common::TestApp::new();
    app.provision("spice-garden", "Spice Garden").await?;
    app.provision("dosa-hut", "Dosa Hut").await?;
    app.state.registry.evict(&TenantSlug::parse("dosa-hut")?).await;
    app.backend.set_connection_limit(1);

    let (status, body) = app.get("/api/t/dosa-hut/menu").await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(!body.to_string().contains("tenant_dosa_hut"));

    // The bound tenant keeps working
    let (status, _) = app.get("/api/t/spice-garden/menu").await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}
