//! Tenant isolation over HTTP.

mod helpers;

use axum::body::Body;
use axum::http::{header, Method, StatusCode};
use flock_server::db;
use flock_server::permissions::Role;
use helpers::{body_to_json, create_event, create_user, seed_local_churches, TestApp};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

fn ids(body: &serde_json::Value, key: &str) -> Vec<String> {
    body.as_array()
        .expect("expected a JSON array")
        .iter()
        .map(|row| row[key].as_str().unwrap().to_string())
        .collect()
}

#[sqlx::test]
async fn test_requests_without_token_are_unauthenticated(pool: PgPool) {
    let app = TestApp::new(pool);

    let request = TestApp::request(Method::GET, "/api/members")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(request).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_to_json(resp).await["error"], "UNAUTHENTICATED");

    let request = TestApp::request(Method::GET, "/api/events")
        .header(header::AUTHORIZATION, "Bearer not-a-token")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(request).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test]
async fn test_health_is_public(pool: PgPool) {
    let app = TestApp::new(pool);
    let request = TestApp::request(Method::GET, "/health")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(request).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_to_json(resp).await["status"], "ok");
}

#[sqlx::test]
async fn test_deactivated_user_token_is_rejected(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let tenant = &seed_local_churches(&pool, &["Manila"]).await[0];
    let member = create_user(&pool, Role::Member, Some(tenant.id)).await;

    db::deactivate_user(&pool, member.id).await.unwrap();

    let resp = app.send(Method::GET, "/api/me", member.id).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test]
async fn test_me_reports_landing_path_and_scope(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let tenants = seed_local_churches(&pool, &["Manila", "Cebu"]).await;
    let vip = create_user(&pool, Role::Vip, Some(tenants[0].id)).await;
    let root = create_user(&pool, Role::SuperAdmin, None).await;

    let body = body_to_json(app.send(Method::GET, "/api/me", vip.id).await).await;
    assert_eq!(body["role"], "VIP");
    assert_eq!(body["landing_path"], "/vip/firsttimers");
    assert_eq!(body["accessible_tenants"], json!([tenants[0].id.to_string()]));
    assert_eq!(body["organization_wide"], false);

    let body = body_to_json(app.send(Method::GET, "/api/me", root.id).await).await;
    assert_eq!(body["landing_path"], "/super");
    assert_eq!(body["accessible_tenants"].as_array().unwrap().len(), 2);
}

#[sqlx::test]
async fn test_admin_override_to_other_tenant_is_tenant_mismatch(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let tenants = seed_local_churches(&pool, &["Manila", "Cebu"]).await;
    let admin = create_user(&pool, Role::Admin, Some(tenants[0].id)).await;

    for path in ["/api/members", "/api/events"] {
        let uri = format!("{path}?local_church_id={}", tenants[1].id);
        let resp = app.send(Method::GET, &uri, admin.id).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{path}");
        assert_eq!(body_to_json(resp).await["error"], "TENANT_MISMATCH");
    }

    // Overriding to the home tenant is allowed
    let uri = format!("/api/members?local_church_id={}", tenants[0].id);
    let resp = app.send(Method::GET, &uri, admin.id).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[sqlx::test]
async fn test_lists_only_contain_home_tenant_rows(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let tenants = seed_local_churches(&pool, &["Manila", "Cebu"]).await;
    let (a, b) = (tenants[0].id, tenants[1].id);

    let leader = create_user(&pool, Role::Leader, Some(a)).await;
    create_user(&pool, Role::Member, Some(a)).await;
    create_user(&pool, Role::Member, Some(b)).await;
    create_user(&pool, Role::Member, Some(b)).await;
    let home_event = create_event(&pool, a, 10).await;
    let away_event = create_event(&pool, b, 10).await;

    let body = body_to_json(app.send(Method::GET, "/api/members", leader.id).await).await;
    let homes = ids(&body, "local_church_id");
    assert_eq!(homes.len(), 2);
    assert!(homes.iter().all(|id| *id == a.to_string()));

    let body = body_to_json(app.send(Method::GET, "/api/events", leader.id).await).await;
    let events = ids(&body, "id");
    assert_eq!(events, vec![home_event.id.to_string()]);
    assert!(!events.contains(&away_event.id.to_string()));

    let body = body_to_json(app.send(Method::GET, "/api/local-churches", leader.id).await).await;
    assert_eq!(ids(&body, "id"), vec![a.to_string()]);
}

#[sqlx::test]
async fn test_principal_without_home_sees_nothing(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let tenants = seed_local_churches(&pool, &["Manila"]).await;
    create_user(&pool, Role::Member, Some(tenants[0].id)).await;
    create_event(&pool, tenants[0].id, 10).await;
    let drifter = create_user(&pool, Role::Admin, None).await;

    for path in ["/api/members", "/api/events", "/api/local-churches"] {
        let resp = app.send(Method::GET, path, drifter.id).await;
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
        assert_eq!(body_to_json(resp).await, json!([]), "{path}");
    }

    // Naming a tenant does not widen an empty scope
    for path in ["/api/members", "/api/events"] {
        let uri = format!("{path}?local_church_id={}", tenants[0].id);
        let resp = app.send(Method::GET, &uri, drifter.id).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{uri}");
        let body = body_to_json(resp).await;
        assert_eq!(body["error"], "TENANT_MISMATCH", "{uri}");
        assert!(body.get("id").is_none() && !body.is_array(), "{uri}");
    }

    let member = create_user(&pool, Role::Member, None).await;
    let uri = format!("/api/events?local_church_id={}", tenants[0].id);
    let resp = app.send(Method::GET, &uri, member.id).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app
        .send_json(
            Method::POST,
            "/api/events",
            drifter.id,
            json!({
                "local_church_id": tenants[0].id,
                "name": "Outreach",
                "starts_at": "2027-01-10T09:00:00Z",
                "capacity": 10
            }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_to_json(resp).await["error"], "TENANT_MISMATCH");
}

#[sqlx::test]
async fn test_super_admin_sees_every_tenant_and_can_narrow(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let tenants = seed_local_churches(&pool, &["Manila", "Cebu"]).await;
    let root = create_user(&pool, Role::SuperAdmin, None).await;
    create_event(&pool, tenants[0].id, 10).await;
    let cebu_event = create_event(&pool, tenants[1].id, 10).await;

    let body = body_to_json(app.send(Method::GET, "/api/events", root.id).await).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let uri = format!("/api/events?local_church_id={}", tenants[1].id);
    let body = body_to_json(app.send(Method::GET, &uri, root.id).await).await;
    assert_eq!(ids(&body, "id"), vec![cebu_event.id.to_string()]);

    let uri = format!("/api/events?local_church_id={}", Uuid::new_v4());
    let resp = app.send(Method::GET, &uri, root.id).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_to_json(resp).await["error"], "TENANT_MISMATCH");
}

#[sqlx::test]
async fn test_member_cannot_create_events(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let tenant = &seed_local_churches(&pool, &["Manila"]).await[0];
    let member = create_user(&pool, Role::Member, Some(tenant.id)).await;

    let resp = app
        .send_json(
            Method::POST,
            "/api/events",
            member.id,
            json!({ "name": "Picnic", "starts_at": "2027-01-10T09:00:00Z", "capacity": 20 }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_to_json(resp).await["error"], "FORBIDDEN");
}

#[sqlx::test]
async fn test_admin_cannot_create_event_in_other_tenant(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let tenants = seed_local_churches(&pool, &["Manila", "Cebu"]).await;
    let admin = create_user(&pool, Role::Admin, Some(tenants[0].id)).await;

    let resp = app
        .send_json(
            Method::POST,
            "/api/events",
            admin.id,
            json!({
                "local_church_id": tenants[1].id,
                "name": "Revival",
                "starts_at": "2027-01-10T09:00:00Z",
                "capacity": 20
            }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_to_json(resp).await["error"], "TENANT_MISMATCH");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}
