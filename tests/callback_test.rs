mod common;

use axum::{body::Body, http::Request, http::StatusCode};
use common::{BASE_URL, TestApp, location};
use payment_endpoint::{
    models::transaction::TransactionStatus, processor::MockProcessor, services::return_url,
    store::PaymentStore,
};

fn callback(identifier: &str, status: &str, return_to: Option<&str>) -> String {
    match return_to {
        Some(url) => format!(
            "/paymentendpoint/{identifier}/{status}/{}",
            return_url::encode(url)
        ),
        None => format!("/paymentendpoint/{identifier}/{status}"),
    }
}

#[tokio::test]
async fn unknown_identifier_redirects_to_base_without_writes() {
    let app = TestApp::approving().await;
    let before = app.store.write_count().await;

    let response = app
        .get(&callback("ghost", "complete", Some("/orders/1")))
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), BASE_URL);
    assert_eq!(app.store.write_count().await, before);
    assert_eq!(app.processor.calls(), 0);
}

#[tokio::test]
async fn complete_callback_settles_and_redirects_to_return_url() {
    let app = TestApp::approving().await;
    let transaction = app.seed_transaction(TransactionStatus::Pending, None).await;

    let response = app
        .get(&callback(&transaction.identifier, "complete", Some("/orders/1")))
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/orders/1");

    let stored = app.reload(&transaction).await;
    assert_eq!(stored.status, TransactionStatus::Complete);
    assert_eq!(stored.return_url.as_deref(), Some("/orders/1"));
    assert_eq!(app.store.message_count().await, 2);
}

#[tokio::test]
async fn replayed_complete_callback_is_idempotent() {
    let app = TestApp::approving().await;
    let transaction = app.seed_transaction(TransactionStatus::Pending, None).await;
    let uri = callback(
        &transaction.identifier,
        "complete",
        Some("https://shop.example.com/order/42"),
    );

    let first = app.get(&uri).await;
    let messages = app.store.message_count().await;
    let second = app.get(&uri).await;

    assert_eq!(location(&first), "https://shop.example.com/order/42");
    assert_eq!(location(&second), location(&first));
    assert_eq!(app.store.message_count().await, messages);
    assert_eq!(app.processor.calls(), 1);
}

#[tokio::test]
async fn post_callback_is_accepted() {
    let app = TestApp::approving().await;
    let transaction = app.seed_transaction(TransactionStatus::Created, None).await;

    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri(callback(&transaction.identifier, "complete", Some("/paid")))
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/paid");
    assert_eq!(
        app.reload(&transaction).await.status,
        TransactionStatus::Complete
    );
}

#[tokio::test]
async fn complete_without_return_url_uses_stored_one() {
    let app = TestApp::approving().await;
    let transaction = app
        .seed_transaction(TransactionStatus::Pending, Some("/stored"))
        .await;

    let response = app
        .get(&callback(&transaction.identifier, "complete", None))
        .await;

    assert_eq!(location(&response), "/stored");
}

#[tokio::test]
async fn declined_completion_marks_error_and_still_redirects() {
    let app = TestApp::new(MockProcessor::declining("expired", "Session expired")).await;
    let transaction = app.seed_transaction(TransactionStatus::Pending, None).await;

    let response = app
        .get(&callback(&transaction.identifier, "complete", Some("/orders/9")))
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/orders/9");
    assert_eq!(
        app.reload(&transaction).await.status,
        TransactionStatus::Error
    );
}

#[tokio::test]
async fn cancel_redirects_to_checkout_and_leaves_status() {
    let app = TestApp::approving().await;
    let transaction = app.seed_transaction(TransactionStatus::Pending, None).await;

    let response = app
        .get(&callback(&transaction.identifier, "cancel", Some("/orders/3")))
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/checkout");

    let stored = app.reload(&transaction).await;
    assert_eq!(stored.status, TransactionStatus::Pending);
    assert_eq!(stored.return_url.as_deref(), Some("/orders/3"));
    assert_eq!(app.processor.calls(), 0);
}

#[tokio::test]
async fn unknown_status_token_redirects_to_base() {
    let app = TestApp::approving().await;
    let transaction = app.seed_transaction(TransactionStatus::Pending, None).await;
    let before = app.store.write_count().await;

    let response = app
        .get(&callback(&transaction.identifier, "refund", Some("/orders/1")))
        .await;

    assert_eq!(location(&response), BASE_URL);
    assert_eq!(app.store.write_count().await, before);
    assert_eq!(
        app.reload(&transaction).await.status,
        TransactionStatus::Pending
    );
}

#[tokio::test]
async fn unsafe_return_url_is_ignored() {
    let app = TestApp::approving().await;
    let transaction = app.seed_transaction(TransactionStatus::Pending, None).await;

    let response = app
        .get(&callback(
            &transaction.identifier,
            "complete",
            Some("javascript:alert(1)"),
        ))
        .await;

    assert_eq!(location(&response), BASE_URL);
    let stored = app.reload(&transaction).await;
    assert_eq!(stored.return_url, None);
    assert_eq!(stored.status, TransactionStatus::Complete);
}

#[tokio::test]
async fn backslash_host_return_url_is_ignored() {
    let app = TestApp::approving().await;
    let transaction = app.seed_transaction(TransactionStatus::Pending, None).await;

    let response = app
        .get(&callback(
            &transaction.identifier,
            "complete",
            Some("/\\evil.example.com"),
        ))
        .await;

    assert_eq!(location(&response), BASE_URL);
    assert_eq!(app.reload(&transaction).await.return_url, None);
}

#[tokio::test]
async fn undecodable_return_url_is_ignored() {
    let app = TestApp::approving().await;
    let transaction = app
        .seed_transaction(TransactionStatus::Pending, Some("/stored"))
        .await;

    let response = app
        .get(&format!(
            "/paymentendpoint/{}/complete/not*base64",
            transaction.identifier
        ))
        .await;

    assert_eq!(location(&response), "/stored");
    assert_eq!(
        app.reload(&transaction).await.return_url.as_deref(),
        Some("/stored")
    );
}

#[tokio::test]
async fn completed_transaction_without_return_url_goes_to_base() {
    let app = TestApp::approving().await;
    let transaction = app
        .seed_transaction(TransactionStatus::Complete, Some("/stored"))
        .await;

    let response = app
        .get(&callback(&transaction.identifier, "complete", None))
        .await;

    assert_eq!(location(&response), BASE_URL);
    assert_eq!(app.processor.calls(), 0);
    assert!(
        app.store
            .messages_for(transaction.id)
            .await
            .unwrap()
            .is_empty()
    );
}
