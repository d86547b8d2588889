//! JSON-over-HTTP processor client.
//!
//! # Endpoints
//!
//! - `POST   {base}/cards`                       tokenize a card
//! - `POST   {base}/purchases/{identifier}/complete`
//! - `PUT    {base}/cards/{reference}`
//! - `DELETE {base}/cards/{reference}`
//!
//! Every endpoint answers with a `ProcessorReply` document, on 2xx and on
//! 4xx alike. Anything else is an integration fault.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use url::Url;

use crate::error::ProcessorError;
use crate::models::payment_method::{CardData, UpdateCardRequest};
use crate::processor::{PaymentProcessor, ProcessorReply};

/// Longest response body excerpt kept in an `InvalidResponse` error.
const BODY_EXCERPT_CHARS: usize = 200;

pub struct HttpProcessor {
    base_url: Url,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpProcessor {
    /// Build a client for the processor at `base_url`.
    ///
    /// # Timeout
    ///
    /// `timeout` applies to each request. Calls are not retried: a card
    /// tokenization that timed out may still have happened on the processor.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProcessorError> {
        // A trailing slash makes Url::join append instead of replacing the last segment
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| ProcessorError::InvalidConfig(format!("PROCESSOR_URL `{base_url}`: {e}")))?;

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            client,
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ProcessorError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ProcessorError::InvalidResponse(format!("invalid processor path: {e}")))?;

        let mut builder = self.client.request(method, url);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        Ok(builder)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<ProcessorReply, ProcessorError> {
        let mut builder = self.request(method, path)?;
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        // Client errors still carry a reply document describing the decline
        if status.is_success() || status.is_client_error() {
            if let Ok(reply) = serde_json::from_str::<ProcessorReply>(&text) {
                return Ok(reply);
            }
        }

        Err(ProcessorError::InvalidResponse(format!(
            "HTTP {}: {}",
            status.as_u16(),
            text.chars().take(BODY_EXCERPT_CHARS).collect::<String>()
        )))
    }
}

#[async_trait]
impl PaymentProcessor for HttpProcessor {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn create_card(&self, card: &CardData) -> Result<ProcessorReply, ProcessorError> {
        self.send(Method::POST, "cards", Some(card)).await
    }

    async fn complete_purchase(&self, identifier: &str) -> Result<ProcessorReply, ProcessorError> {
        let path = format!("purchases/{}/complete", urlencoding::encode(identifier));
        self.send::<()>(Method::POST, &path, None).await
    }

    async fn update_card(
        &self,
        card_reference: &str,
        data: &UpdateCardRequest,
    ) -> Result<ProcessorReply, ProcessorError> {
        let path = format!("cards/{}", urlencoding::encode(card_reference));
        self.send(Method::PUT, &path, Some(data)).await
    }

    async fn delete_card(&self, card_reference: &str) -> Result<ProcessorReply, ProcessorError> {
        let path = format!("cards/{}", urlencoding::encode(card_reference));
        self.send::<()>(Method::DELETE, &path, None).await
    }
}
