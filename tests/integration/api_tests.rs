//! API tests against a running server with its database and Redis

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Suffix keeping usernames and ISBNs unique across runs
fn unique() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

async fn create(client: &Client, path: &str, body: Value) -> Value {
    let response = client
        .post(format!("{}/{}", BASE_URL, path))
        .json(&body)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201, "creating {}", path);
    response.json().await.expect("Failed to parse response")
}

async fn delete(client: &Client, path: &str) -> u16 {
    client
        .delete(format!("{}/{}", BASE_URL, path))
        .send()
        .await
        .expect("Failed to send request")
        .status()
        .as_u16()
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_readiness_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
#[ignore]
async fn test_create_update_and_delete_author() {
    let client = Client::new();

    let author = create(
        &client,
        "authors",
        json!({ "first_name": "Ursula", "last_name": "Le Guin" }),
    )
    .await;
    let author_id = author["id"].as_i64().expect("No author ID");

    let response = client
        .put(format!("{}/authors/{}", BASE_URL, author_id))
        .json(&json!({ "biography": "Earthsea" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["first_name"], "Ursula");
    assert_eq!(body["biography"], "Earthsea");

    assert_eq!(delete(&client, &format!("authors/{}", author_id)).await, 204);
    assert_eq!(delete(&client, &format!("authors/{}", author_id)).await, 404);
}

#[tokio::test]
#[ignore]
async fn test_create_book_rejects_more_available_than_total() {
    let client = Client::new();

    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&json!({
            "title": "Too Many",
            "total_copies": 1,
            "available_copies": 2
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_loan_return_and_cleanup() {
    let client = Client::new();
    let suffix = unique();

    let book = create(
        &client,
        "books",
        json!({
            "title": "The Dispossessed",
            "isbn": format!("978{}", &suffix[..7]),
            "total_copies": 1,
            "available_copies": 1
        }),
    )
    .await;
    let book_id = book["id"].as_i64().expect("No book ID");

    let member = create(
        &client,
        "members",
        json!({ "username": format!("reader-{}", suffix), "email": format!("{}@example.com", suffix) }),
    )
    .await;
    let member_id = member["id"].as_i64().expect("No member ID");

    // Loan the only copy
    let response = client
        .post(format!("{}/books/{}/loan", BASE_URL, book_id))
        .json(&json!({ "member_id": member_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let loan_id = body["data"]["id"].as_i64().expect("No loan ID");

    // No copy left
    let response = client
        .post(format!("{}/books/{}/loan", BASE_URL, book_id))
        .json(&json!({ "member_id": member_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    // Active loans block deletion
    assert_eq!(delete(&client, &format!("loans/{}", loan_id)).await, 409);
    assert_eq!(delete(&client, &format!("books/{}", book_id)).await, 409);
    assert_eq!(delete(&client, &format!("members/{}", member_id)).await, 409);

    let response = client
        .post(format!("{}/loans/{}/extend_due_date", BASE_URL, loan_id))
        .json(&json!({ "additional_days": "3" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .get(format!("{}/members/top-active", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["data"]
        .as_array()
        .expect("No ranking")
        .iter()
        .any(|entry| entry["id"] == member_id));

    let response = client
        .post(format!("{}/books/{}/return_book", BASE_URL, book_id))
        .json(&json!({ "member_id": member_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["available_copies"], 1);

    assert_eq!(delete(&client, &format!("loans/{}", loan_id)).await, 204);
    assert_eq!(delete(&client, &format!("books/{}", book_id)).await, 204);
    assert_eq!(delete(&client, &format!("members/{}", member_id)).await, 204);
}

#[tokio::test]
#[ignore]
async fn test_resizing_book_keeps_loaned_copies() {
    let client = Client::new();
    let suffix = unique();

    let book = create(
        &client,
        "books",
        json!({ "title": "Lathe of Heaven", "total_copies": 3, "available_copies": 3 }),
    )
    .await;
    let book_id = book["id"].as_i64().expect("No book ID");

    let member = create(
        &client,
        "members",
        json!({ "username": format!("resize-{}", suffix), "email": format!("r{}@example.com", suffix) }),
    )
    .await;
    let member_id = member["id"].as_i64().expect("No member ID");

    let response = client
        .post(format!("{}/books/{}/loan", BASE_URL, book_id))
        .json(&json!({ "member_id": member_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let resize = |total: i64| {
        client
            .put(format!("{}/books/{}", BASE_URL, book_id))
            .json(&json!({ "total_copies": total }))
            .send()
    };

    // 1 on loan: raising to 5 leaves 4 available
    let response = resize(5).await.expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["total_copies"], 5);
    assert_eq!(body["available_copies"], 4);

    // Lowering to the loaned copy leaves none available
    let response = resize(1).await.expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["available_copies"], 0);

    // Below the loaned copy is refused and nothing changes
    let response = resize(0).await.expect("Failed to send request");
    assert_eq!(response.status(), 400);
    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["total_copies"], 1);
    assert_eq!(body["available_copies"], 0);

    let response = client
        .post(format!("{}/books/{}/return_book", BASE_URL, book_id))
        .json(&json!({ "member_id": member_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    let loan_id = body["data"]["id"].as_i64().expect("No loan ID");

    assert_eq!(delete(&client, &format!("loans/{}", loan_id)).await, 204);
    assert_eq!(delete(&client, &format!("books/{}", book_id)).await, 204);
    assert_eq!(delete(&client, &format!("members/{}", member_id)).await, 204);
}
