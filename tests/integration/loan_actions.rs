//! Loan, return, extend and ranking actions through the HTTP router

use axum::http::{Method, StatusCode};
use chrono::Days;
use serde_json::json;

use lectern_server::jobs::Job;

use crate::common::{today, TestApp};

#[tokio::test]
async fn test_loan_book_creates_loan_and_queues_confirmation() {
    let app = TestApp::new();
    let book = app.store.add_book("Dune", 2, 2);
    let member = app.store.add_member("alice", "alice@example.com");

    let (status, body) = app
        .post(&format!("/api/v1/books/{}/loan", book.id), json!({ "member_id": member.id }))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "Book loaned successfully.");
    assert_eq!(body["data"]["book_id"], book.id);
    assert_eq!(body["data"]["member_id"], member.id);
    assert_eq!(body["data"]["is_returned"], false);
    assert_eq!(body["data"]["loan_date"], today().to_string());
    assert_eq!(
        body["data"]["due_date"],
        (today() + Days::new(14)).to_string()
    );
    assert_eq!(app.store.book(book.id).unwrap().available_copies, 1);

    let loan_id = body["data"]["id"].as_i64().unwrap() as i32;
    assert_eq!(app.queue.pending(), vec![Job::NotifyLoanCreated { loan_id }]);
}

#[tokio::test]
async fn test_queued_confirmation_is_mailed_by_worker() {
    let app = TestApp::new();
    let book = app.store.add_book("Dune", 1, 1);
    let member = app.store.add_member("alice", "alice@example.com");

    let (status, _) = app
        .post(&format!("/api/v1/books/{}/loan", book.id), json!({ "member_id": member.id }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    assert!(app.worker().process_next().await.unwrap());

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "alice@example.com");
    assert_eq!(sent[0].subject, "Book Loaned Successfully");
    assert!(sent[0].body.contains("Dune"));
    assert!(app.queue.pending().is_empty());
    assert_eq!(app.queue.in_flight(), 0);
}

#[tokio::test]
async fn test_loan_last_copy_then_no_copies() {
    let app = TestApp::new();
    let book = app.store.add_book("Solaris", 1, 1);
    let first = app.store.add_member("alice", "alice@example.com");
    let second = app.store.add_member("bob", "bob@example.com");
    let uri = format!("/api/v1/books/{}/loan", book.id);

    let (status, _) = app.post(&uri, json!({ "member_id": first.id })).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.post(&uri, json!({ "member_id": second.id })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No available copies.");
    assert_eq!(body["reason"], "NoCopiesAvailable");

    assert_eq!(app.store.book(book.id).unwrap().available_copies, 0);
    assert_eq!(app.store.loans().len(), 1);
    assert_eq!(app.queue.pending().len(), 1);
}

#[tokio::test]
async fn test_loan_unknown_book_or_member() {
    let app = TestApp::new();
    let book = app.store.add_book("Solaris", 1, 1);

    let (status, body) = app
        .post("/api/v1/books/999/loan", json!({ "member_id": 1 }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["reason"], "NoSuchBook");

    let (status, body) = app
        .post(&format!("/api/v1/books/{}/loan", book.id), json!({ "member_id": 999 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Member does not exist.");

    let (status, _) = app
        .post(&format!("/api/v1/books/{}/loan", book.id), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.store.book(book.id).unwrap().available_copies, 1);
    assert!(app.queue.pending().is_empty());
}

#[tokio::test]
async fn test_create_loan_route_queues_confirmation() {
    let app = TestApp::new();
    let book = app.store.add_book("Dune", 1, 1);
    let member = app.store.add_member("alice", "alice@example.com");

    let (status, body) = app
        .post("/api/v1/loans", json!({ "book_id": book.id, "member_id": member.id }))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["book_id"], book.id);
    assert_eq!(app.queue.pending().len(), 1);
}

#[tokio::test]
async fn test_return_book() {
    let app = TestApp::new();
    let book = app.store.add_book("Dune", 1, 1);
    let member = app.store.add_member("alice", "alice@example.com");
    let body = json!({ "member_id": member.id });

    let (status, _) = app.post(&format!("/api/v1/books/{}/loan", book.id), body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/api/v1/books/{}/return_book", book.id);
    let (status, response) = app.post(&uri, body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "Book returned successfully.");
    assert_eq!(response["data"]["is_returned"], true);
    assert_eq!(response["data"]["return_date"], today().to_string());
    assert_eq!(app.store.book(book.id).unwrap().available_copies, 1);

    let (status, response) = app.post(&uri, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "Active loan does not exist.");
    assert_eq!(app.store.book(book.id).unwrap().available_copies, 1);
}

#[tokio::test]
async fn test_extend_due_date() {
    let app = TestApp::new();
    let book = app.store.add_book("Dune", 3, 3);
    let member = app.store.add_member("alice", "alice@example.com");
    let tomorrow = today() + Days::new(1);
    let loan = app
        .store
        .add_loan(book.id, member.id, today() - Days::new(13), tomorrow);
    let uri = format!("/api/v1/loans/{}/extend_due_date", loan.id);

    let (status, body) = app.post(&uri, json!({ "additional_days": 5 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Successfully extended loan by 5 days");
    assert_eq!(body["data"]["due_date"], (tomorrow + Days::new(5)).to_string());

    let (status, body) = app.post(&uri, json!({ "additional_days": "2" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["due_date"], (tomorrow + Days::new(7)).to_string());
}

#[tokio::test]
async fn test_extend_due_date_failures_keep_loan_unchanged() {
    let app = TestApp::new();
    let book = app.store.add_book("Dune", 3, 3);
    let member = app.store.add_member("alice", "alice@example.com");
    let active = app
        .store
        .add_loan(book.id, member.id, today(), today() + Days::new(3));
    let overdue = app
        .store
        .add_loan(book.id, member.id, today() - Days::new(20), today() - Days::new(1));
    let active_uri = format!("/api/v1/loans/{}/extend_due_date", active.id);

    let (status, body) = app.post(&active_uri, json!({ "additional_days": "abc" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid additional_days value.");

    let (status, body) = app.post(&active_uri, json!({ "additional_days": 0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "additional_days should be a positive integer.");

    let (status, _) = app.post(&active_uri, json!({ "additional_days": -3 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            &format!("/api/v1/loans/{}/extend_due_date", overdue.id),
            json!({ "additional_days": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Can not extend an overdue loan.");

    let (status, _) = app
        .post("/api/v1/loans/999/extend_due_date", json!({ "additional_days": 5 }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(app.store.loan(active.id).unwrap(), active);
    assert_eq!(app.store.loan(overdue.id).unwrap(), overdue);
}

#[tokio::test]
async fn test_extend_returned_loan() {
    let app = TestApp::new();
    let book = app.store.add_book("Dune", 1, 1);
    let member = app.store.add_member("alice", "alice@example.com");
    let body = json!({ "member_id": member.id });

    let (_, loaned) = app.post(&format!("/api/v1/books/{}/loan", book.id), body.clone()).await;
    app.post(&format!("/api/v1/books/{}/return_book", book.id), body).await;

    let (status, response) = app
        .post(
            &format!("/api/v1/loans/{}/extend_due_date", loaned["data"]["id"]),
            json!({ "additional_days": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "Can not extend a returned loan.");
}

#[tokio::test]
async fn test_extend_reports_loan_state_before_bad_duration() {
    let app = TestApp::new();
    let book = app.store.add_book("Dune", 2, 2);
    let member = app.store.add_member("alice", "alice@example.com");
    let body = json!({ "member_id": member.id });

    let (_, loaned) = app.post(&format!("/api/v1/books/{}/loan", book.id), body.clone()).await;
    app.post(&format!("/api/v1/books/{}/return_book", book.id), body).await;
    let overdue = app
        .store
        .add_loan(book.id, member.id, today() - Days::new(20), today() - Days::new(1));

    let (status, response) = app
        .post(
            &format!("/api/v1/loans/{}/extend_due_date", loaned["data"]["id"]),
            json!({ "additional_days": "abc" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "Can not extend a returned loan.");

    let (status, response) = app
        .post(
            &format!("/api/v1/loans/{}/extend_due_date", overdue.id),
            json!({ "additional_days": "abc" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "Can not extend an overdue loan.");
    assert_eq!(app.store.loan(overdue.id).unwrap(), overdue);
}

#[tokio::test]
async fn test_loan_accepts_member_id_as_string() {
    let app = TestApp::new();
    let book = app.store.add_book("Dune", 1, 1);
    let member = app.store.add_member("alice", "alice@example.com");

    let (status, body) = app
        .post(
            &format!("/api/v1/books/{}/loan", book.id),
            json!({ "member_id": member.id.to_string() }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["member_id"], member.id);

    let (status, body) = app
        .post(
            &format!("/api/v1/books/{}/return_book", book.id),
            json!({ "member_id": member.id.to_string() }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_returned"], true);
}

#[tokio::test]
async fn test_non_numeric_member_id_is_an_error_envelope() {
    let app = TestApp::new();
    let book = app.store.add_book("Dune", 1, 1);

    let (status, body) = app
        .post(&format!("/api/v1/books/{}/loan", book.id), json!({ "member_id": "abc" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Member does not exist.");

    let (status, body) = app
        .post(&format!("/api/v1/books/{}/return_book", book.id), json!({ "member_id": "abc" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Active loan does not exist.");
    assert_eq!(app.store.book(book.id).unwrap().available_copies, 1);
}

#[tokio::test]
async fn test_missing_or_malformed_body_is_an_error_envelope() {
    let app = TestApp::new();
    let book = app.store.add_book("Dune", 1, 1);
    let member = app.store.add_member("alice", "alice@example.com");
    let loan = app.store.add_loan(book.id, member.id, today(), today() + Days::new(3));

    for uri in [
        format!("/api/v1/books/{}/loan", book.id),
        format!("/api/v1/books/{}/return_book", book.id),
        format!("/api/v1/loans/{}/extend_due_date", loan.id),
    ] {
        let (status, body) = app.request(Method::POST, &uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(body["error"].is_string(), "{}", uri);
        assert_eq!(body["reason"], "BadValue", "{}", uri);
    }

    let (status, body) = app
        .post("/api/v1/loans", json!({ "book_id": "one", "member_id": member.id }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "BadValue");

    assert_eq!(app.store.book(book.id).unwrap().available_copies, 1);
    assert_eq!(app.store.loan(loan.id).unwrap(), loan);
    assert!(app.queue.pending().is_empty());
}

#[tokio::test]
async fn test_top_active_members() {
    let app = TestApp::new();
    let book = app.store.add_book("Dune", 10, 10);
    let alice = app.store.add_member("alice", "alice@example.com");
    let bob = app.store.add_member("bob", "bob@example.com");
    app.store.add_member("carol", "carol@example.com");

    for member_id in [alice.id, bob.id, bob.id] {
        let (status, _) = app
            .post(&format!("/api/v1/books/{}/loan", book.id), json!({ "member_id": member_id }))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app.get("/api/v1/members/top-active").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Success.");
    assert_eq!(
        body["data"],
        json!([
            { "id": bob.id, "username": "bob", "email": "bob@example.com", "active_loans": 2 },
            { "id": alice.id, "username": "alice", "email": "alice@example.com", "active_loans": 1 },
        ])
    );
}

#[tokio::test]
async fn test_top_active_members_empty() {
    let app = TestApp::new();
    app.store.add_member("alice", "alice@example.com");

    let (status, body) = app.get("/api/v1/members/top-active").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}
