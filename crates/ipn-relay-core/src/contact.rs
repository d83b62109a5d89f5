//! Buyer contact extraction.

use crate::message::{FieldValue, InboundMessage};
use serde::{Deserialize, Serialize};

/// Preferred source of the buyer's email address.
pub const BUYER_EMAIL_FIELD: &str = "buyer_email";

/// Fallback source of the email address.
pub const ADDRESS_EMAIL_FIELD: &str = "address_email";

pub const FIRST_NAME_FIELD: &str = "address_first_name";
pub const LAST_NAME_FIELD: &str = "address_last_name";
pub const PRODUCT_ID_FIELD: &str = "product_id";
pub const ORDER_ID_FIELD: &str = "order_id";

/// Buyer data taken from one notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    /// Non-empty email address.
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub product_id: Option<String>,
    pub last_order_id: Option<String>,
}

/// Why a contact could not be extracted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("no email address in 'buyer_email' or 'address_email'")]
    MissingEmail,
}

/// Select the email field value.
///
/// `buyer_email` wins whenever it is present and not null, even if it is
/// empty; `address_email` is only consulted otherwise.
pub fn select_email(message: &InboundMessage) -> Option<&FieldValue> {
    match message.get(BUYER_EMAIL_FIELD) {
        Some(FieldValue::Null) | None => message.get(ADDRESS_EMAIL_FIELD),
        buyer => buyer,
    }
}

/// Whether the message yields a usable email address.
pub fn has_valid_email(message: &InboundMessage) -> bool {
    select_email(message)
        .and_then(FieldValue::as_text)
        .is_some_and(|email| !email.is_empty())
}

/// Map the raw fields of `message` to a [`ContactRecord`].
///
/// Only the email is mandatory. Optional fields are `None` when absent,
/// null, or not textual; empty strings are kept as `None` too.
///
/// # Errors
///
/// Returns [`ExtractionError::MissingEmail`] when no non-empty email text
/// can be selected.
pub fn extract(message: &InboundMessage) -> Result<ContactRecord, ExtractionError> {
    let email = select_email(message)
        .and_then(FieldValue::as_text)
        .filter(|email| !email.is_empty())
        .ok_or(ExtractionError::MissingEmail)?;

    let optional = |name: &str| message.non_empty_text(name).map(str::to_string);

    Ok(ContactRecord {
        email: email.to_string(),
        first_name: optional(FIRST_NAME_FIELD),
        last_name: optional(LAST_NAME_FIELD),
        product_id: optional(PRODUCT_ID_FIELD),
        last_order_id: optional(ORDER_ID_FIELD),
    })
}

#[cfg(test)]
#[path = "contact_tests.rs"]
mod tests;
