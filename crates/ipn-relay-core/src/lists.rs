//! Mailing-list selection for a purchased product.

use crate::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Provider-side mailing list identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListId(u64);

impl ListId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Product-to-list routing configuration.
///
/// Owned by the settings collaborator; the pipeline only reads a snapshot
/// per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListMapping {
    /// List to add buyers of a given product id to.
    pub product_lists: BTreeMap<String, ListId>,

    /// General newsletter list.
    pub newsletter_list_id: Option<ListId>,

    /// Add every buyer to the newsletter list as well.
    pub add_to_newsletter: bool,
}

impl Default for ListMapping {
    fn default() -> Self {
        Self {
            product_lists: BTreeMap::new(),
            newsletter_list_id: Some(ListId::new(1)),
            add_to_newsletter: false,
        }
    }
}

impl ListMapping {
    /// Map `product_id` to `list_id`, replacing any earlier mapping.
    pub fn with_product(mut self, product_id: impl Into<String>, list_id: u64) -> Self {
        self.product_lists
            .insert(product_id.into(), ListId::new(list_id));
        self
    }

    /// Enable the newsletter list.
    pub fn with_newsletter(mut self, list_id: u64) -> Self {
        self.newsletter_list_id = Some(ListId::new(list_id));
        self.add_to_newsletter = true;
        self
    }

    /// Check that product ids are non-empty and all list ids are positive.
    ///
    /// # Errors
    ///
    /// Returns the first offending entry as a [`ValidationError`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (product_id, list_id) in &self.product_lists {
            if product_id.trim().is_empty() {
                return Err(ValidationError::Required {
                    field: "product_lists.<product_id>".to_string(),
                });
            }
            if list_id.as_u64() == 0 {
                return Err(ValidationError::OutOfRange {
                    field: format!("product_lists.{}", product_id),
                    message: "list id must be positive".to_string(),
                });
            }
        }

        if self.newsletter_list_id.is_some_and(|id| id.as_u64() == 0) {
            return Err(ValidationError::OutOfRange {
                field: "newsletter_list_id".to_string(),
                message: "list id must be positive".to_string(),
            });
        }

        Ok(())
    }
}

/// Lists a buyer of `product_id` is added to.
///
/// The product's own list (if mapped) and the newsletter list (if enabled
/// and configured) are independent; the result holds zero, one or two ids.
pub fn resolve_lists(product_id: Option<&str>, mapping: &ListMapping) -> BTreeSet<ListId> {
    let mut lists = BTreeSet::new();

    if let Some(list_id) = product_id.and_then(|id| mapping.product_lists.get(id)) {
        lists.insert(*list_id);
    }

    if mapping.add_to_newsletter {
        if let Some(newsletter) = mapping.newsletter_list_id {
            lists.insert(newsletter);
        }
    }

    lists
}

#[cfg(test)]
#[path = "lists_tests.rs"]
mod tests;
