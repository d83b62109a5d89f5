//! Contact upsert contract for the email-marketing provider.

use crate::contact::ContactRecord;
use crate::lists::ListId;
use crate::settings::{
    AttributeNames, SecretValue, LAST_ORDER_ID_ATTRIBUTE, PRODUCT_ID_ATTRIBUTE,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Body of a create-or-update contact call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertRequest {
    pub email: String,
    pub list_ids: BTreeSet<ListId>,
    /// Missing values are sent as JSON `null`.
    pub attributes: BTreeMap<String, Option<String>>,
    /// Always `true`: an existing contact is updated, not rejected.
    pub update_enabled: bool,
}

impl UpsertRequest {
    /// Build the request for `contact` with its resolved lists.
    pub fn for_contact(
        contact: &ContactRecord,
        list_ids: BTreeSet<ListId>,
        names: &AttributeNames,
    ) -> Self {
        let attributes = BTreeMap::from([
            (names.first_name.clone(), contact.first_name.clone()),
            (names.last_name.clone(), contact.last_name.clone()),
            (PRODUCT_ID_ATTRIBUTE.to_string(), contact.product_id.clone()),
            (
                LAST_ORDER_ID_ATTRIBUTE.to_string(),
                contact.last_order_id.clone(),
            ),
        ]);

        Self {
            email: contact.email.clone(),
            list_ids,
            attributes,
            update_enabled: true,
        }
    }
}

/// Result of one upsert call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub succeeded: bool,
    /// HTTP status, or `0` when no response was received.
    pub http_status: u16,
    pub raw_response_body: String,
}

impl UpsertOutcome {
    /// Outcome for a received response; 2xx counts as success.
    pub fn from_response(http_status: u16, raw_response_body: impl Into<String>) -> Self {
        Self {
            succeeded: (200..300).contains(&http_status),
            http_status,
            raw_response_body: raw_response_body.into(),
        }
    }

    /// Outcome for a call that never produced a response.
    pub fn transport_failure(message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            http_status: 0,
            raw_response_body: message.into(),
        }
    }

    /// Convert to a `Result`, keeping the outcome on success.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Transport`] for status `0` and
    /// [`DispatchError::Http`] for any other failed call.
    pub fn into_result(self) -> Result<Self, DispatchError> {
        match (self.succeeded, self.http_status) {
            (true, _) => Ok(self),
            (false, 0) => Err(DispatchError::Transport {
                message: self.raw_response_body,
            }),
            (false, status) => Err(DispatchError::Http {
                status,
                body: self.raw_response_body,
            }),
        }
    }
}

/// Why a contact upsert failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("provider unreachable: {message}")]
    Transport { message: String },

    #[error("provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
}

/// Creates or updates a contact at the provider.
///
/// Failures are reported in the outcome rather than as errors; the pipeline
/// decides how to surface them.
#[async_trait]
pub trait ContactUpsert: Send + Sync {
    async fn upsert(&self, request: &UpsertRequest, api_key: &SecretValue) -> UpsertOutcome;
}

/// Build the request for `contact` and send it through `client`.
pub async fn dispatch(
    client: &dyn ContactUpsert,
    contact: &ContactRecord,
    list_ids: BTreeSet<ListId>,
    names: &AttributeNames,
    api_key: &SecretValue,
) -> UpsertOutcome {
    let request = UpsertRequest::for_contact(contact, list_ids, names);
    client.upsert(&request, api_key).await
}

#[cfg(test)]
#[path = "upsert_tests.rs"]
mod tests;
