//! Processor stand-in with fixed behavior, for tests and local runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProcessorError;
use crate::models::payment_method::{CardData, UpdateCardRequest};
use crate::processor::{PaymentProcessor, ProcessorReply};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBehavior {
    /// Approve everything; cards get the given reference.
    Approve { reference: String },
    /// Reply with `success: false`.
    Decline { code: String, message: String },
    /// Fail as if the processor could not be reached.
    Fault { message: String },
}

impl MockBehavior {
    /// `success`, `decline` or `fault`; anything else approves.
    pub fn from_name(name: &str) -> Self {
        match name {
            "decline" => MockBehavior::Decline {
                code: "MOCK_DECLINED".to_string(),
                message: "mock decline".to_string(),
            },
            "fault" => MockBehavior::Fault {
                message: "mock processor unavailable".to_string(),
            },
            _ => MockBehavior::Approve {
                reference: format!("mock_tok_{}", uuid::Uuid::new_v4().simple()),
            },
        }
    }
}

pub struct MockProcessor {
    behavior: MockBehavior,
    calls: AtomicUsize,
    latency: Option<Duration>,
}

impl MockProcessor {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            latency: None,
        }
    }

    /// Delay every reply, to simulate a slow processor.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn approving(reference: &str) -> Self {
        Self::new(MockBehavior::Approve {
            reference: reference.to_string(),
        })
    }

    pub fn declining(code: &str, message: &str) -> Self {
        Self::new(MockBehavior::Decline {
            code: code.to_string(),
            message: message.to_string(),
        })
    }

    pub fn faulting(message: &str) -> Self {
        Self::new(MockBehavior::Fault {
            message: message.to_string(),
        })
    }

    /// How many operations were sent to this processor.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn reply(&self) -> Result<ProcessorReply, ProcessorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match &self.behavior {
            MockBehavior::Approve { reference } => Ok(ProcessorReply::approved(reference.clone())),
            MockBehavior::Decline { code, message } => {
                Ok(ProcessorReply::declined(code.clone(), message.clone()))
            }
            MockBehavior::Fault { message } => {
                Err(ProcessorError::InvalidResponse(message.clone()))
            }
        }
    }
}

#[async_trait]
impl PaymentProcessor for MockProcessor {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_card(&self, _card: &CardData) -> Result<ProcessorReply, ProcessorError> {
        self.reply().await
    }

    async fn complete_purchase(&self, _identifier: &str) -> Result<ProcessorReply, ProcessorError> {
        self.reply().await
    }

    async fn update_card(
        &self,
        _card_reference: &str,
        _data: &UpdateCardRequest,
    ) -> Result<ProcessorReply, ProcessorError> {
        self.reply().await
    }

    async fn delete_card(&self, _card_reference: &str) -> Result<ProcessorReply, ProcessorError> {
        self.reply().await
    }
}
