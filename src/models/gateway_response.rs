//! Outcome of a processor operation, as handed back to callers.

use serde::{Deserialize, Serialize};

use crate::models::payment_method::{PaymentMethodResponse, SavedPaymentMethod};

/// Result wrapper for a transaction service operation.
///
/// Every processor interaction ends in one of these, whether the processor
/// accepted, rejected, or could not be reached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayResponse {
    pub success: bool,
    pub message: String,
    pub redirect_url: String,
    #[serde(skip)]
    pub saved_method: Option<SavedPaymentMethod>,
}

impl GatewayResponse {
    pub fn success(message: impl Into<String>, redirect_url: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            redirect_url: redirect_url.into(),
            saved_method: None,
        }
    }

    pub fn failure(message: impl Into<String>, redirect_url: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            redirect_url: redirect_url.into(),
            saved_method: None,
        }
    }

    pub fn with_saved_method(mut self, method: SavedPaymentMethod) -> Self {
        self.saved_method = Some(method);
        self
    }
}

/// JSON body for API endpoints that run a processor operation.
#[derive(Debug, Serialize, Deserialize)]
pub struct GatewayResponseBody {
    pub success: bool,
    pub message: String,
    pub redirect_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethodResponse>,
}

impl From<GatewayResponse> for GatewayResponseBody {
    fn from(response: GatewayResponse) -> Self {
        Self {
            success: response.success,
            message: response.message,
            redirect_url: response.redirect_url,
            payment_method: response.saved_method.map(Into::into),
        }
    }
}
