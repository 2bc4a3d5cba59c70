//! Catalog API tests

use axum::http::{header, Method, StatusCode};
use serde_json::json;

use catalog_server::models::Permission;

use crate::common::{date_after, TestApp};

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();

    let response = app.get("/api/v1/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");

    let response = app.get("/api/v1/ready", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ready");
}

#[tokio::test]
async fn test_writes_require_authentication() {
    let app = TestApp::new();

    let response = app
        .send(
            Method::POST,
            "/api/v1/genres",
            None,
            Some(json!({ "name": "Fantasy" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "NotAuthenticated");

    let response = app
        .send(
            Method::POST,
            "/api/v1/genres",
            Some("not-a-jwt"),
            Some(json!({ "name": "Fantasy" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_writes_require_edit_permission() {
    let app = TestApp::new();
    let patron = app.token(5, &[Permission::MarkReturned]);

    let response = app
        .post("/api/v1/genres", &patron, json!({ "name": "Fantasy" }))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_genre_crud() {
    let app = TestApp::new();
    let staff = app.staff_token();

    let id = app
        .create("/api/v1/genres", json!({ "name": "Science Fiction" }))
        .await;

    let response = app.get(&format!("/api/v1/genres/{}", id), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["name"], "Science Fiction");

    let response = app
        .send(
            Method::PUT,
            &format!("/api/v1/genres/{}", id),
            Some(&staff),
            Some(json!({ "name": "SF" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["name"], "SF");

    let response = app
        .send(Method::DELETE, &format!("/api/v1/genres/{}", id), Some(&staff), None)
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = app.get(&format!("/api/v1/genres/{}", id), None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_blank_name_is_a_field_error() {
    let app = TestApp::new();
    let staff = app.staff_token();

    let response = app
        .post("/api/v1/languages", &staff, json!({ "name": "   " }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["fields"]["name"][0], "This field is required.");
}

#[tokio::test]
async fn test_author_death_before_birth_rejected() {
    let app = TestApp::new();
    let staff = app.staff_token();

    let response = app
        .post(
            "/api/v1/authors",
            &staff,
            json!({
                "first_name": "Frank",
                "last_name": "Herbert",
                "date_of_birth": "1920-10-08",
                "date_of_death": "1910-01-01",
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["fields"]["date_of_death"].is_array());
}

#[tokio::test]
async fn test_deleting_author_keeps_book() {
    let app = TestApp::new();
    let staff = app.staff_token();

    let author_id = app
        .create(
            "/api/v1/authors",
            json!({ "first_name": "Frank", "last_name": "Herbert" }),
        )
        .await;
    let book_id = app
        .create_book("Dune", "9780441013593", author_id.as_i64())
        .await;

    let response = app.get(&format!("/api/v1/books/{}", book_id), None).await;
    assert_eq!(response.body["author"]["label"], "Herbert, Frank");

    let response = app
        .send(
            Method::DELETE,
            &format!("/api/v1/authors/{}", author_id),
            Some(&staff),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = app.get(&format!("/api/v1/books/{}", book_id), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["title"], "Dune");
    assert!(response.body["author"].is_null());
}

#[tokio::test]
async fn test_book_references_and_isbn() {
    let app = TestApp::new();
    let staff = app.staff_token();

    let response = app
        .post(
            "/api/v1/books",
            &staff,
            json!({
                "title": "Dune",
                "summary": "Desert planet",
                "isbn": "9780441013593",
                "language_id": 42,
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["fields"]["language_id"].is_array());

    app.create_book("Dune", "9780441013593", None).await;
    let response = app
        .post(
            "/api/v1/books",
            &staff,
            json!({
                "title": "Dune Messiah",
                "summary": "Sequel",
                "isbn": "9780441013593",
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_book_listing_filters_and_genres() {
    let app = TestApp::new();

    let sf = app.create("/api/v1/genres", json!({ "name": "Science Fiction" })).await;
    let adventure = app.create("/api/v1/genres", json!({ "name": "Adventure" })).await;
    app.create(
        "/api/v1/books",
        json!({
            "title": "Dune",
            "summary": "Desert planet",
            "isbn": "9780441013593",
            "genre_ids": [sf, adventure],
        }),
    )
    .await;
    app.create_book("Emma", "9780141439587", None).await;

    let response = app.get("/api/v1/books?title_contains=DUNE", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total"], 1);
    assert_eq!(
        response.body["items"][0]["display_genre"],
        "Adventure, Science Fiction"
    );

    let response = app
        .get(&format!("/api/v1/books?genre_id={}", sf), None)
        .await;
    assert_eq!(response.body["items"][0]["title"], "Dune");
}

#[tokio::test]
async fn test_pagination_bounds() {
    let app = TestApp::new();
    for name in ["Fantasy", "Horror", "Poetry"] {
        app.create("/api/v1/genres", json!({ "name": name })).await;
    }

    let response = app.get("/api/v1/genres?page=2", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["num_pages"], 2);
    assert_eq!(response.body["items"][0]["name"], "Poetry");

    let response = app.get("/api/v1/genres?page=3", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.get("/api/v1/genres?page=0", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.get("/api/v1/genres?per_page=1000", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.get("/api/v1/authors", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total"], 0);
}

#[tokio::test]
async fn test_malformed_or_huge_page_is_not_found() {
    let app = TestApp::new();
    app.create_book("Dune", "9780441013593", None).await;

    for uri in [
        "/api/v1/books?page=abc",
        "/api/v1/books?page=9223372036854775807",
        "/api/v1/books?page=9223372036854775807&per_page=100",
        "/api/v1/instances?page=99999999999999999999",
    ] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(response.body["error"], "NoSuchEntity", "{}", uri);
    }

    let staff = app.staff_token();
    let response = app
        .get("/api/v1/loans?page=9223372036854775807", Some(&staff))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.get("/api/v1/books?per_page=ten", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["fields"]["per_page"].is_array());

    let response = app.get("/api/v1/books?page=", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["page"], 1);
}

#[tokio::test]
async fn test_instances_filtered_by_due_date() {
    let app = TestApp::new();
    let staff = app.staff_token();
    let book_id = app.create_book("Dune", "9780441013593", None).await;

    let mut copies = Vec::new();
    for days in [3, 10] {
        let copy = app.create_instance(book_id).await;
        app.post(&format!("/api/v1/instances/{}/stock", copy), &staff, json!({}))
            .await;
        app.post(
            &format!("/api/v1/instances/{}/checkout", copy),
            &staff,
            json!({ "borrower_id": 7, "due_back": date_after(days) }),
        )
        .await;
        copies.push(copy);
    }
    app.create_instance(book_id).await;

    let uri = format!(
        "/api/v1/instances?due_from={}&due_until={}",
        date_after(0),
        date_after(5)
    );
    let response = app.get(&uri, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total"], 1);
    assert_eq!(response.body["items"][0]["id"], copies[0].as_str());
}

#[tokio::test]
async fn test_summary_counts_visits_per_session() {
    let app = TestApp::new();
    let book_id = app.create_book("Dune", "9780441013593", None).await;
    app.create_instance(book_id).await;

    let response = app.get("/api/v1/summary?title_contains=dun", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["num_books"], 1);
    assert_eq!(response.body["num_books_matching"], 1);
    assert_eq!(response.body["num_instances"], 1);
    assert_eq!(response.body["num_instances_available"], 0);
    assert_eq!(response.body["num_visits"], 0);

    let set_cookie = response
        .headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    let cookie = set_cookie.split(';').next().unwrap();
    assert!(cookie.starts_with("catalog_session="));

    let response = app
        .send_with_headers(
            Method::GET,
            "/api/v1/summary",
            None,
            None,
            &[(header::COOKIE, cookie)],
        )
        .await;
    assert_eq!(response.body["num_visits"], 1);
    assert!(response.body["num_books_matching"].is_null());
    assert!(response.headers.get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_display_configuration() {
    let app = TestApp::new();

    let response = app.get("/api/v1/display", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["derived_fields"][0]["label"], "Genre");

    let response = app.get("/api/v1/display/book_instance", None).await;
    assert_eq!(response.body["list_filter"], json!(["status", "due_back"]));

    let response = app.get("/api/v1/display/publisher", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
