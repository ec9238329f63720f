//! Reusable test helpers for integration tests.
//!
//! Provides `TestApp` for sending requests through the full axum router via
//! `tower::ServiceExt::oneshot`, plus seeding and token helpers. Tests run
//! under `#[sqlx::test]`, so every test gets a fresh migrated database.
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{self, header, Method, Request, Response};
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use flock_server::api::{create_router, AppState};
use flock_server::auth::jwt;
use flock_server::config::Config;
use flock_server::db::{self, LocalChurch, NewUser, User};
use flock_server::events::Event;
use flock_server::permissions::Role;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

// ============================================================================
// Test App
// ============================================================================

/// A test application wrapping the full axum router.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub pool: PgPool,
}

impl TestApp {
    /// Build the app on a test pool.
    pub fn new(pool: PgPool) -> Self {
        Self::with_config(pool, Config::default_for_test())
    }

    /// Build the app with a custom config.
    pub fn with_config(pool: PgPool, config: Config) -> Self {
        let state = AppState::new(pool.clone(), config);
        let router = create_router(state.clone());
        Self {
            router,
            state,
            pool,
        }
    }

    /// Build an HTTP request with the given method and URI.
    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Mint a bearer token for `user_id`.
    pub fn token_for(&self, user_id: Uuid) -> String {
        jwt::issue_access_token(
            user_id,
            &self.state.config.jwt_secret,
            self.state.config.jwt_access_expiry,
        )
        .expect("Failed to sign token")
    }

    /// Send a request through the router via `tower::ServiceExt::oneshot`.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }

    /// Authenticated request without a body.
    pub async fn send(&self, method: Method, uri: &str, user_id: Uuid) -> Response<Body> {
        let request = Self::request(method, uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token_for(user_id)))
            .body(Body::empty())
            .expect("Failed to build request");
        self.oneshot(request).await
    }

    /// Authenticated request with a JSON body.
    pub async fn send_json(
        &self,
        method: Method,
        uri: &str,
        user_id: Uuid,
        body: serde_json::Value,
    ) -> Response<Body> {
        let request = Self::request(method, uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token_for(user_id)))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("Failed to build request");
        self.oneshot(request).await
    }
}

/// Read a response body as JSON.
pub async fn body_to_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

// ============================================================================
// Seeding
// ============================================================================

/// Create an organization with one local church per name.
pub async fn seed_local_churches(pool: &PgPool, names: &[&str]) -> Vec<LocalChurch> {
    let church = db::create_church(pool, "Grace Fellowship")
        .await
        .expect("Failed to create church");

    let mut locals = Vec::with_capacity(names.len());
    for name in names {
        locals.push(
            db::create_local_church(pool, church.id, name)
                .await
                .expect("Failed to create local church"),
        );
    }
    locals
}

/// Create an active user with a unique email.
pub async fn create_user(pool: &PgPool, role: Role, home: Option<Uuid>) -> User {
    let tag = Uuid::new_v4().simple().to_string();
    let email = format!("{}_{}@example.com", role.as_str().to_lowercase(), &tag[..10]);
    db::create_user(
        pool,
        &NewUser {
            email: &email,
            name: &format!("{role} {}", &tag[..6]),
            role,
            local_church_id: home,
        },
    )
    .await
    .expect("Failed to create user")
}

/// Create an event directly in storage.
pub async fn create_event(pool: &PgPool, local_church_id: Uuid, capacity: i32) -> Event {
    create_event_at(pool, local_church_id, capacity, Utc::now() + Duration::days(7)).await
}

pub async fn create_event_at(
    pool: &PgPool,
    local_church_id: Uuid,
    capacity: i32,
    starts_at: DateTime<Utc>,
) -> Event {
    sqlx::query_as::<_, Event>(
        r"
        INSERT INTO events (id, local_church_id, name, starts_at, capacity)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        ",
    )
    .bind(Uuid::now_v7())
    .bind(local_church_id)
    .bind("Sunday Service")
    .bind(starts_at)
    .bind(capacity)
    .fetch_one(pool)
    .await
    .expect("Failed to create event")
}
