//! Payment processor port.
//!
//! The processor does the actual card work (tokenizing, capturing). This
//! service only needs to know whether it said yes, and the reference it
//! handed back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProcessorError;
use crate::models::payment_method::{CardData, UpdateCardRequest};

pub mod http;
pub mod mock;

pub use http::HttpProcessor;
pub use mock::{MockBehavior, MockProcessor};

/// Reply from the processor for any operation.
///
/// # JSON Example
///
/// ```json
/// {
///   "success": false,
///   "reference": null,
///   "code": "card_declined",
///   "message": "Your card was declined."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorReply {
    pub success: bool,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ProcessorReply {
    pub fn approved(reference: impl Into<String>) -> Self {
        Self {
            success: true,
            reference: Some(reference.into()),
            code: None,
            message: None,
        }
    }

    pub fn declined(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            reference: None,
            code: Some(code.into()),
            message: Some(message.into()),
        }
    }

    /// `Error (<code>): <message>`, shown to users when the processor says no.
    pub fn failure_text(&self) -> String {
        format!(
            "Error ({}): {}",
            self.code.as_deref().unwrap_or("unknown"),
            self.message.as_deref().unwrap_or("no message")
        )
    }
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Tokenize a card. A successful reply carries the card reference.
    async fn create_card(&self, card: &CardData) -> Result<ProcessorReply, ProcessorError>;

    /// Finish the purchase the processor tracks under `identifier`.
    async fn complete_purchase(&self, identifier: &str) -> Result<ProcessorReply, ProcessorError>;

    async fn update_card(
        &self,
        card_reference: &str,
        data: &UpdateCardRequest,
    ) -> Result<ProcessorReply, ProcessorError>;

    async fn delete_card(&self, card_reference: &str) -> Result<ProcessorReply, ProcessorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_text_includes_code_and_message() {
        let reply = ProcessorReply::declined("card_declined", "Your card was declined.");
        assert_eq!(reply.failure_text(), "Error (card_declined): Your card was declined.");
    }

    #[test]
    fn reply_tolerates_missing_optional_fields() {
        let reply: ProcessorReply = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(reply.success);
        assert!(reply.reference.is_none());
    }
}
