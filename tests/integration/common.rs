//! Test application wiring and request helpers

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use catalog_server::{
    api,
    clock::FixedClock,
    config::{AppConfig, StoreBackend},
    models::{Permission, UserClaims},
    repository::Repository,
    services::{sessions::MemorySessionStore, Services},
    AppState,
};

const SECRET: &str = "integration-secret";

pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub struct TestApp {
    router: Router,
    pub clock: FixedClock,
}

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

pub fn date_after(days: i64) -> String {
    (start_date() + chrono::Duration::days(days))
        .format("%Y-%m-%d")
        .to_string()
}

impl TestApp {
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.database.backend = StoreBackend::Memory;
        config.auth.jwt_secret = SECRET.to_string();
        config.pagination.page_size = 2;

        let clock = FixedClock::new(start_date());
        let services = Services::new(
            Repository::memory(),
            Arc::new(clock.clone()),
            &config.pagination,
            Arc::new(MemorySessionStore::new(config.sessions.ttl_seconds)),
        );
        let state = AppState {
            config: Arc::new(config),
            services: Arc::new(services),
        };

        Self {
            router: api::router(state),
            clock,
        }
    }

    pub fn token(&self, user_id: i32, permissions: &[Permission]) -> String {
        UserClaims::new(user_id, format!("user{}", user_id), permissions.to_vec(), 1)
            .create_token(SECRET)
            .unwrap()
    }

    /// Catalog editor and librarian in one
    pub fn staff_token(&self) -> String {
        self.token(
            100,
            &[
                Permission::EditCatalog,
                Permission::MarkReturned,
                Permission::ViewAllLoans,
            ],
        )
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        self.send_with_headers(method, uri, token, body, &[]).await
    }

    pub async fn send_with_headers(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
        headers: &[(header::HeaderName, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        for (name, value) in headers {
            builder = builder.header(name, *value);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        Response {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Response {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    /// Create through the API and return the new id
    pub async fn create(&self, uri: &str, body: Value) -> Value {
        let token = self.staff_token();
        let response = self.post(uri, &token, body).await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["id"].clone()
    }

    pub async fn create_book(&self, title: &str, isbn: &str, author_id: Option<i64>) -> i64 {
        self.create(
            "/api/v1/books",
            json!({
                "title": title,
                "author_id": author_id,
                "summary": "A summary",
                "isbn": isbn,
            }),
        )
        .await
        .as_i64()
        .unwrap()
    }

    pub async fn create_instance(&self, book_id: i64) -> String {
        self.create(
            "/api/v1/instances",
            json!({ "book_id": book_id, "imprint": "Ace Books, 1990" }),
        )
        .await
        .as_str()
        .unwrap()
        .to_string()
    }
}
