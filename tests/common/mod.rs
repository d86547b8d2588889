#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response},
};
use payment_endpoint::{
    AppState, build_router,
    config::Config,
    models::transaction::{Transaction, TransactionStatus},
    processor::MockProcessor,
    store::{InMemoryPaymentStore, PaymentStore},
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const API_KEY: &str = "test-api-key";
pub const BASE_URL: &str = "http://localhost:3000/";

pub struct TestApp {
    pub router: Router,
    pub store: InMemoryPaymentStore,
    pub processor: Arc<MockProcessor>,
    pub owner_id: Uuid,
}

impl TestApp {
    pub async fn new(processor: MockProcessor) -> Self {
        let store = InMemoryPaymentStore::new();
        let key = store.insert_api_key(API_KEY, "Test Shop").await;
        let processor = Arc::new(processor);
        let state = AppState::new(
            Config::for_testing(),
            Arc::new(store.clone()),
            processor.clone(),
        );

        Self {
            router: build_router(state),
            store,
            processor,
            owner_id: key.id,
        }
    }

    pub async fn approving() -> Self {
        Self::new(MockProcessor::approving("tok_123")).await
    }

    /// Store a transaction directly, bypassing the API.
    pub async fn seed_transaction(
        &self,
        status: TransactionStatus,
        return_url: Option<&str>,
    ) -> Transaction {
        let mut transaction = Transaction::new(self.owner_id, return_url.map(str::to_string));
        transaction.status = status;
        self.store.ensure_transaction(&transaction).await.unwrap();
        transaction
    }

    pub async fn reload(&self, transaction: &Transaction) -> Transaction {
        self.store
            .find_transaction(&transaction.identifier)
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn authed(&self, method: &str, uri: &str, body: Option<Value>) -> Response<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", format!("Bearer {API_KEY}"));
        let request = match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get("location")
        .expect("redirect has a location")
        .to_str()
        .unwrap()
        .to_string()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
