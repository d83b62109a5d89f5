//! # Settings
//!
//! Shared secrets, list routing and attribute naming, read by the pipeline
//! through the [`SettingsProvider`] trait so the storage behind them stays
//! swappable.

use crate::lists::ListMapping;
use crate::ValidationError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

// ============================================================================
// Secrets
// ============================================================================

/// Secrets the pipeline needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretName {
    /// Shared passphrase used to sign notifications.
    SigningSecret,

    /// API key for the contact provider.
    ProviderApiKey,
}

impl SecretName {
    /// Configuration key the secret is read from.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SigningSecret => "signing_secret",
            Self::ProviderApiKey => "provider_api_key",
        }
    }
}

impl fmt::Display for SecretName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Secure container for secret values.
///
/// The buffer is zeroed on drop. Debug output and serialization never
/// include the value.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretValue {
    inner: Zeroizing<String>,
}

impl SecretValue {
    /// Placeholder written in place of the value when serializing.
    pub const REDACTED: &'static str = "<REDACTED>";

    pub fn from_string(value: String) -> Self {
        Self {
            inner: Zeroizing::new(value),
        }
    }

    /// Get the secret for immediate use.
    pub fn expose_secret(&self) -> &str {
        self.inner.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl From<&str> for SecretValue {
    fn from(value: &str) -> Self {
        Self::from_string(value.to_string())
    }
}

impl From<String> for SecretValue {
    fn from(value: String) -> Self {
        Self::from_string(value)
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretValue")
            .field("length", &self.len())
            .field("value", &"[REDACTED]")
            .finish()
    }
}

impl Serialize for SecretValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(Self::REDACTED)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from_string)
    }
}

// ============================================================================
// Attribute naming
// ============================================================================

/// Provider attribute receiving the product id.
pub const PRODUCT_ID_ATTRIBUTE: &str = "PRODUCT_ID";

/// Provider attribute receiving the order id.
pub const LAST_ORDER_ID_ATTRIBUTE: &str = "LAST_ORDER_ID";

/// Provider-side names of the buyer's name attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeNames {
    pub first_name: String,
    pub last_name: String,
}

impl Default for AttributeNames {
    fn default() -> Self {
        Self {
            first_name: "VORNAME".to_string(),
            last_name: "NACHNAME".to_string(),
        }
    }
}

impl AttributeNames {
    /// # Errors
    ///
    /// Returns [`ValidationError::Required`] for a blank attribute name.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.first_name.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "attributes.first_name".to_string(),
            });
        }
        if self.last_name.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "attributes.last_name".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Operator-maintained settings as loaded from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpnSettings {
    pub signing_secret: Option<SecretValue>,
    pub provider_api_key: Option<SecretValue>,
    pub lists: ListMapping,
    pub attributes: AttributeNames,
}

impl IpnSettings {
    /// Check list ids and attribute names.
    ///
    /// Missing secrets are not an error here; the pipeline reports them per
    /// request.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.lists.validate()?;
        self.attributes.validate()
    }

    /// Names of secrets that are absent or empty.
    pub fn missing_secrets(&self) -> Vec<SecretName> {
        [SecretName::SigningSecret, SecretName::ProviderApiKey]
            .into_iter()
            .filter(|name| self.lookup(*name).is_none())
            .collect()
    }

    fn lookup(&self, name: SecretName) -> Option<&SecretValue> {
        let value = match name {
            SecretName::SigningSecret => self.signing_secret.as_ref(),
            SecretName::ProviderApiKey => self.provider_api_key.as_ref(),
        };
        value.filter(|secret| !secret.is_empty())
    }
}

/// Read access to operator settings.
pub trait SettingsProvider: Send + Sync {
    /// Look up a secret. Absent and empty secrets both yield `None`.
    fn secret(&self, name: SecretName) -> Option<SecretValue>;

    /// Current product-to-list routing.
    fn list_mapping(&self) -> ListMapping;

    /// Whether every buyer is also added to the newsletter list.
    fn is_newsletter_enabled(&self) -> bool {
        self.list_mapping().add_to_newsletter
    }

    /// Provider attribute names for the buyer's name.
    fn attribute_names(&self) -> AttributeNames;
}

/// Settings fixed at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings {
    settings: IpnSettings,
}

impl StaticSettings {
    pub fn new(settings: IpnSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &IpnSettings {
        &self.settings
    }
}

impl From<IpnSettings> for StaticSettings {
    fn from(settings: IpnSettings) -> Self {
        Self::new(settings)
    }
}

impl SettingsProvider for StaticSettings {
    fn secret(&self, name: SecretName) -> Option<SecretValue> {
        self.settings.lookup(name).cloned()
    }

    fn list_mapping(&self) -> ListMapping {
        self.settings.lists.clone()
    }

    fn attribute_names(&self) -> AttributeNames {
        self.settings.attributes.clone()
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
