//! Gateway message models: the append-only audit trail of a transaction.
//!
//! Every interaction with the processor writes one `*Request` message before
//! the call and exactly one `*Response` or `*Error` message after it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a message records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    CreateCardRequest,
    CreateCardResponse,
    CreateCardError,
    CompletePurchaseRequest,
    CompletePurchaseResponse,
    CompletePurchaseError,
    UpdateCardRequest,
    UpdateCardResponse,
    UpdateCardError,
    DeleteCardRequest,
    DeleteCardResponse,
    DeleteCardError,
}

impl MessageKind {
    pub const ALL: [MessageKind; 12] = [
        MessageKind::CreateCardRequest,
        MessageKind::CreateCardResponse,
        MessageKind::CreateCardError,
        MessageKind::CompletePurchaseRequest,
        MessageKind::CompletePurchaseResponse,
        MessageKind::CompletePurchaseError,
        MessageKind::UpdateCardRequest,
        MessageKind::UpdateCardResponse,
        MessageKind::UpdateCardError,
        MessageKind::DeleteCardRequest,
        MessageKind::DeleteCardResponse,
        MessageKind::DeleteCardError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::CreateCardRequest => "CreateCardRequest",
            MessageKind::CreateCardResponse => "CreateCardResponse",
            MessageKind::CreateCardError => "CreateCardError",
            MessageKind::CompletePurchaseRequest => "CompletePurchaseRequest",
            MessageKind::CompletePurchaseResponse => "CompletePurchaseResponse",
            MessageKind::CompletePurchaseError => "CompletePurchaseError",
            MessageKind::UpdateCardRequest => "UpdateCardRequest",
            MessageKind::UpdateCardResponse => "UpdateCardResponse",
            MessageKind::UpdateCardError => "UpdateCardError",
            MessageKind::DeleteCardRequest => "DeleteCardRequest",
            MessageKind::DeleteCardResponse => "DeleteCardResponse",
            MessageKind::DeleteCardError => "DeleteCardError",
        }
    }

    pub fn is_request(&self) -> bool {
        self.as_str().ends_with("Request")
    }

    pub fn is_error(&self) -> bool {
        self.as_str().ends_with("Error")
    }
}

impl TryFrom<String> for MessageKind {
    type Error = UnknownMessageKind;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        MessageKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or(UnknownMessageKind(value))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown message kind `{0}`")]
pub struct UnknownMessageKind(pub String);

/// A stored audit message.
///
/// # Database Table
///
/// Maps to the `gateway_messages` table. Rows are never updated or deleted.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct Message {
    pub id: Uuid,
    pub transaction_id: Uuid,
    #[sqlx(try_from = "String")]
    pub kind: MessageKind,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A message about to be appended to the log.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub kind: MessageKind,
    pub payload: serde_json::Value,
}

impl NewMessage {
    pub fn new(transaction_id: Uuid, kind: MessageKind, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction_id,
            kind,
            payload,
        }
    }
}

/// Message as returned by `GET /api/v1/transactions/{identifier}/messages`.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub kind: MessageKind,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            kind: message.kind,
            payload: message.payload,
            created_at: message.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_parse_back_from_their_names() {
        for kind in MessageKind::ALL {
            assert_eq!(MessageKind::try_from(kind.as_str().to_string()).unwrap(), kind);
        }
        assert!(MessageKind::try_from("PurchaseRequest".to_string()).is_err());
    }

    #[test]
    fn request_and_error_classification() {
        assert!(MessageKind::CreateCardRequest.is_request());
        assert!(!MessageKind::CreateCardResponse.is_request());
        assert!(MessageKind::DeleteCardError.is_error());
        assert!(!MessageKind::CompletePurchaseResponse.is_error());
    }
}
