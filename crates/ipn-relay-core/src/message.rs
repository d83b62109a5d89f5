//! Inbound IPN message model.
//!
//! An [`InboundMessage`] is the decoded field bag of a single webhook
//! delivery. Field order carries no meaning; the signer imposes its own
//! canonical order. Values are tri-state because the signing algorithm
//! distinguishes "present with text" from the various forms of "no value".

use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;

/// Name of the field carrying the payload signature.
pub const SIGNATURE_FIELD: &str = "sha_sign";

/// Alternate spelling of the signature field used by some senders.
pub const SIGNATURE_FIELD_UPPER: &str = "SHASIGN";

// ============================================================================
// FieldValue
// ============================================================================

/// Value of a single inbound field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Textual value, possibly empty.
    Text(String),

    /// Boolean value, as produced by typed JSON bodies.
    Flag(bool),

    /// Explicit null.
    Null,
}

impl FieldValue {
    /// Convert a JSON value into a field value.
    ///
    /// Integral numbers are rendered without a fractional part so that
    /// `42` and `42.0` sign identically. Arrays and objects are kept as
    /// their compact JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Flag(*b),
            Value::String(s) => Self::Text(s.clone()),
            Value::Number(n) => {
                if n.is_i64() || n.is_u64() {
                    Self::Text(n.to_string())
                } else {
                    match n.as_f64() {
                        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => {
                            Self::Text(format!("{}", f as i64))
                        }
                        _ => Self::Text(n.to_string()),
                    }
                }
            }
            Value::Array(_) | Value::Object(_) => Self::Text(value.to_string()),
        }
    }

    /// Returns `true` for values that count as "no value": null, `false`
    /// and the empty string.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Flag(b) => !b,
            Self::Null => true,
        }
    }

    /// Text content, if this is a textual value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// String form used when the value takes part in a signature.
    ///
    /// `true` renders as `1`; blank values render as `None`.
    pub fn render(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Text(s) if !s.is_empty() => Some(Cow::Borrowed(s)),
            Self::Flag(true) => Some(Cow::Borrowed("1")),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

// ============================================================================
// InboundMessage
// ============================================================================

/// Decoded field set of one IPN delivery.
///
/// Field names are case-sensitive. Inserting an existing name replaces its
/// value, which is how the request decoder implements source precedence.
///
/// # Examples
///
/// ```rust
/// use ipn_relay_core::message::{FieldValue, InboundMessage};
///
/// let message = InboundMessage::from_pairs([("event", "on_payment"), ("product_id", "42")]);
/// assert_eq!(message.text("event"), Some("on_payment"));
/// assert_eq!(message.get("product_id"), Some(&FieldValue::Text("42".to_string())));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundMessage {
    fields: HashMap<String, FieldValue>,
}

impl InboundMessage {
    /// Create an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a message from textual name/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let mut message = Self::new();
        message.extend(pairs);
        message
    }

    /// Build a message from the top-level members of a JSON object.
    pub fn from_json_object(object: &serde_json::Map<String, Value>) -> Self {
        let mut message = Self::new();
        for (name, value) in object {
            message.insert(name.clone(), FieldValue::from_json(value));
        }
        message
    }

    /// Insert or replace a field.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Insert every pair, replacing existing names.
    pub fn extend<I, K, V>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        for (name, value) in pairs {
            self.insert(name, value);
        }
    }

    /// Overlay `other` on top of this message; `other` wins on collisions.
    pub fn merge(&mut self, other: InboundMessage) {
        self.fields.extend(other.fields);
    }

    /// Remove a field, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    /// Look up a field.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Text of a field, if present and textual.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    /// Text of a field, if present, textual and non-empty.
    pub fn non_empty_text(&self, name: &str) -> Option<&str> {
        self.text(name).filter(|s| !s.is_empty())
    }

    /// Whether the message contains `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the message has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over fields in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Field names in ascending byte order, for logging.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<K, V> FromIterator<(K, V)> for InboundMessage
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::from_pairs(iter)
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
