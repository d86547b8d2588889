//! Saved payment method models and card input types.
//!
//! A saved payment method is the processor's token for a card, plus the
//! display details we are allowed to keep (last four digits and a name).
//! Full card numbers only live in `CardData` for the duration of a request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;

/// Represents a saved payment method record.
///
/// # Database Table
///
/// Maps to the `saved_payment_methods` table. Deleting a method sets
/// `is_active = false` so the audit trail keeps its reference.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct SavedPaymentMethod {
    pub id: Uuid,

    /// Opaque token issued by the processor
    pub card_reference: String,

    pub last_four_digits: String,

    /// Display name, defaults to the masked card number
    pub name: String,

    /// Owning user (the API key that tokenized the card)
    pub user_id: Uuid,

    /// Transaction that produced this method
    pub transaction_id: Uuid,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payment method about to be stored after a successful tokenization.
#[derive(Debug, Clone)]
pub struct NewSavedPaymentMethod {
    pub id: Uuid,
    pub card_reference: String,
    pub last_four_digits: String,
    pub name: String,
    pub user_id: Uuid,
    pub transaction_id: Uuid,
}

impl NewSavedPaymentMethod {
    pub fn into_saved(self) -> SavedPaymentMethod {
        let now = Utc::now();
        SavedPaymentMethod {
            id: self.id,
            card_reference: self.card_reference,
            last_four_digits: self.last_four_digits,
            name: self.name,
            user_id: self.user_id,
            transaction_id: self.transaction_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Card details submitted for tokenization.
///
/// # JSON Example
///
/// ```json
/// {
///   "number": "4242 4242 4242 4242",
///   "expiry_month": 12,
///   "expiry_year": 2030,
///   "cvv": "123",
///   "name": "Work card"
/// }
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct CardData {
    pub number: String,
    pub expiry_month: u8,
    pub expiry_year: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cvv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
}

impl std::fmt::Debug for CardData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardData")
            .field("number", &masked_number(&self.number))
            .field("expiry_month", &self.expiry_month)
            .field("expiry_year", &self.expiry_year)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl CardData {
    /// Basic shape checks before anything is sent to the processor.
    pub fn validate(&self) -> Result<(), AppError> {
        let digits = digits_of(&self.number);
        if !(12..=19).contains(&digits.len()) {
            return Err(AppError::InvalidRequest(
                "Card number must contain 12 to 19 digits".to_string(),
            ));
        }
        if self
            .number
            .chars()
            .any(|c| !c.is_ascii_digit() && c != ' ' && c != '-')
        {
            return Err(AppError::InvalidRequest(
                "Card number may only contain digits, spaces and dashes".to_string(),
            ));
        }
        if !(1..=12).contains(&self.expiry_month) {
            return Err(AppError::InvalidRequest(
                "Expiry month must be between 1 and 12".to_string(),
            ));
        }
        Ok(())
    }

    pub fn last_four_digits(&self) -> String {
        let digits = digits_of(&self.number);
        digits[digits.len().saturating_sub(4)..].to_string()
    }

    /// Name supplied by the user, or the masked number when none was given.
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => masked_number(&self.number),
        }
    }

    /// What the audit log keeps of a tokenization request.
    pub fn audit_payload(&self) -> serde_json::Value {
        json!({
            "number": masked_number(&self.number),
            "expiry_month": self.expiry_month,
            "expiry_year": self.expiry_year,
            "name": self.display_name(),
            "client_ip": self.client_ip,
        })
    }
}

fn digits_of(number: &str) -> String {
    number.chars().filter(char::is_ascii_digit).collect()
}

/// `4242-4242-4242-4242` → `************4242`
pub fn masked_number(number: &str) -> String {
    let digits = digits_of(number);
    let keep = digits.len().saturating_sub(4);
    let mut masked = "*".repeat(keep);
    masked.push_str(&digits[keep..]);
    masked
}

/// Request to update a saved payment method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCardRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_month: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_year: Option<u16>,
}

impl UpdateCardRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.expiry_month.is_some_and(|month| !(1..=12).contains(&month)) {
            return Err(AppError::InvalidRequest(
                "Expiry month must be between 1 and 12".to_string(),
            ));
        }
        if self.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(AppError::InvalidRequest("Name cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// Saved payment method as returned to API clients.
///
/// The processor token stays server side.
#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentMethodResponse {
    pub id: Uuid,
    pub last_four_digits: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SavedPaymentMethod> for PaymentMethodResponse {
    fn from(method: SavedPaymentMethod) -> Self {
        Self {
            id: method.id,
            last_four_digits: method.last_four_digits,
            name: method.name,
            created_at: method.created_at,
            updated_at: method.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(number: &str) -> CardData {
        CardData {
            number: number.to_string(),
            expiry_month: 12,
            expiry_year: 2030,
            cvv: Some("123".to_string()),
            name: None,
            client_ip: None,
        }
    }

    #[test]
    fn default_name_masks_all_but_last_four() {
        assert_eq!(card("4242 4242 4242 4242").display_name(), "************4242");
        assert_eq!(card("5555-5555-5555-4444").display_name(), "************4444");
    }

    #[test]
    fn explicit_name_wins() {
        let mut data = card("4242424242424242");
        data.name = Some("Work card".to_string());
        assert_eq!(data.display_name(), "Work card");

        data.name = Some("   ".to_string());
        assert_eq!(data.display_name(), "************4242");
    }

    #[test]
    fn last_four_ignores_separators() {
        assert_eq!(card("4000 0566 5566 5556").last_four_digits(), "5556");
    }

    #[test]
    fn audit_payload_never_contains_the_full_number_or_cvv() {
        let payload = card("4242424242424242").audit_payload().to_string();
        assert!(!payload.contains("4242424242424242"));
        assert!(!payload.contains("123"));
        assert!(payload.contains("************4242"));
    }

    #[test]
    fn debug_output_is_masked() {
        let debug = format!("{:?}", card("4242424242424242"));
        assert!(!debug.contains("4242424242424242"));
    }

    #[test]
    fn validation_rejects_bad_cards() {
        assert!(card("4242424242424242").validate().is_ok());
        assert!(card("4242").validate().is_err());
        assert!(card("4242-abcd-4242-4242").validate().is_err());

        let mut data = card("4242424242424242");
        data.expiry_month = 13;
        assert!(data.validate().is_err());
    }
}
