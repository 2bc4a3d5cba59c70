//! Loan lifecycle, renewal and loan listing tests

use axum::http::{header, Method, StatusCode};
use serde_json::json;

use catalog_server::models::Permission;

use crate::common::{date_after, TestApp};

#[tokio::test]
async fn test_dune_lifecycle_becomes_overdue() {
    let app = TestApp::new();
    let staff = app.staff_token();
    let alice = app.token(7, &[]);

    let book_id = app.create_book("Dune", "9780441013593", None).await;
    let response = app.get(&format!("/api/v1/books/{}", book_id), None).await;
    assert_eq!(response.body["instances"], json!([]));

    let copy = app.create_instance(book_id).await;
    let response = app.get(&format!("/api/v1/instances/{}", copy), None).await;
    assert_eq!(response.body["status"], "maintenance");
    assert!(response.body["due_back"].is_null());
    assert!(response.body["borrower_id"].is_null());
    assert_eq!(response.body["label"], format!("{} (Dune)", copy));

    let response = app
        .post(&format!("/api/v1/instances/{}/stock", copy), &staff, json!({}))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "available");

    let response = app
        .post(
            &format!("/api/v1/instances/{}/checkout", copy),
            &staff,
            json!({ "borrower_id": 7, "due_back": date_after(14) }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["is_on_loan"], true);
    assert_eq!(response.body["is_overdue"], false);

    let response = app.get("/api/v1/loans/mine", Some(&alice)).await;
    assert_eq!(response.body["total"], 1);
    assert_eq!(response.body["items"][0]["id"], copy.as_str());

    app.clock.advance_days(15);

    let response = app.get("/api/v1/loans/mine", Some(&alice)).await;
    assert_eq!(response.body["items"][0]["is_overdue"], true);
    assert_eq!(response.body["items"][0]["status"], "on_loan");

    let response = app
        .post(&format!("/api/v1/instances/{}/return", copy), &staff, json!({}))
        .await;
    assert_eq!(response.body["status"], "available");
    assert_eq!(response.body["is_overdue"], false);

    let response = app.get("/api/v1/loans/mine", Some(&alice)).await;
    assert_eq!(response.body["total"], 0);
}

#[tokio::test]
async fn test_illegal_transition_is_unprocessable() {
    let app = TestApp::new();
    let staff = app.staff_token();
    let book_id = app.create_book("Dune", "9780441013593", None).await;
    let copy = app.create_instance(book_id).await;

    let response = app
        .post(
            &format!("/api/v1/instances/{}/checkout", copy),
            &staff,
            json!({ "borrower_id": 7, "due_back": date_after(14) }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["error"], "InvalidTransition");
}

#[tokio::test]
async fn test_my_loans_requires_authentication() {
    let app = TestApp::new();
    let response = app.get("/api/v1/loans/mine", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_all_loans_permission_and_order() {
    let app = TestApp::new();
    let staff = app.staff_token();
    let book_id = app.create_book("Dune", "9780441013593", None).await;

    let mut copies = Vec::new();
    for (borrower, days) in [(1, 20), (2, 5), (3, 12)] {
        let copy = app.create_instance(book_id).await;
        app.post(&format!("/api/v1/instances/{}/stock", copy), &staff, json!({}))
            .await;
        app.post(
            &format!("/api/v1/instances/{}/checkout", copy),
            &staff,
            json!({ "borrower_id": borrower, "due_back": date_after(days) }),
        )
        .await;
        copies.push(copy);
    }
    // On the shelf, never listed as a loan
    app.create_instance(book_id).await;

    let patron = app.token(1, &[Permission::MarkReturned]);
    let response = app.get("/api/v1/loans", Some(&patron)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app.get("/api/v1/loans?per_page=10", Some(&staff)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total"], 3);
    let ids: Vec<&str> = response.body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![copies[1].as_str(), copies[2].as_str(), copies[0].as_str()]);
}

#[tokio::test]
async fn test_renewal_form_and_submission() {
    let app = TestApp::new();
    let staff = app.staff_token();
    let book_id = app.create_book("Dune", "9780441013593", None).await;
    let copy = app.create_instance(book_id).await;
    app.post(&format!("/api/v1/instances/{}/stock", copy), &staff, json!({}))
        .await;
    app.post(
        &format!("/api/v1/instances/{}/checkout", copy),
        &staff,
        json!({ "borrower_id": 7, "due_back": date_after(3) }),
    )
    .await;
    let renew_uri = format!("/api/v1/instances/{}/renew", copy);

    let response = app.get(&renew_uri, Some(&staff)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["proposed_renewal_date"], date_after(21));

    for days in [-1, 29] {
        let response = app
            .post(&renew_uri, &staff, json!({ "renewal_date": date_after(days) }))
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(response.body["fields"]["renewal_date"].is_array());
    }

    let response = app
        .post(&renew_uri, &staff, json!({ "renewal_date": "next tuesday" }))
        .await;
    assert_eq!(
        response.body["fields"]["renewal_date"][0],
        "Enter a valid date."
    );

    let response = app
        .post(&renew_uri, &staff, json!({ "renewal_date": 5 }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body["fields"]["renewal_date"][0],
        "Enter a valid date."
    );

    let response = app
        .send_with_headers(
            Method::POST,
            &renew_uri,
            Some(&staff),
            None,
            &[(header::CONTENT_TYPE, "application/json")],
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body["fields"]["renewal_date"][0],
        "This field is required."
    );

    let response = app
        .post(&renew_uri, &staff, json!({ "renewal_date": date_after(28) }))
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers.get(header::LOCATION).unwrap(),
        "/api/v1/loans"
    );

    let response = app.get(&format!("/api/v1/instances/{}", copy), None).await;
    assert_eq!(response.body["due_back"], date_after(28));
    assert_eq!(response.body["status"], "on_loan");
    assert_eq!(response.body["borrower_id"], 7);
}

#[tokio::test]
async fn test_renewal_denied_without_permission() {
    let app = TestApp::new();
    let patron = app.token(7, &[Permission::ViewAllLoans]);
    let uri = format!("/api/v1/instances/{}/renew", uuid::Uuid::new_v4());

    let response = app.get(&uri, Some(&patron)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .send(
            Method::POST,
            &uri,
            Some(&patron),
            Some(json!({ "renewal_date": date_after(7) })),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let staff = app.staff_token();
    let response = app.get(&uri, Some(&staff)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
