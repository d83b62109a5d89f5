//! Canonical IPN message signing and verification.
//!
//! The payment processor signs each notification by canonicalising the field
//! set and hashing it together with a shared passphrase:
//!
//! 1. Drop `sha_sign` and `SHASIGN`.
//! 2. Sort the remaining names by byte order, optionally on their
//!    upper-cased form.
//! 3. For each field with a non-blank value append `NAME=VALUE<passphrase>`.
//! 4. SHA-512 the concatenation and upper-case the hex digest.
//!
//! The algorithm has to match the sender bit for bit, so every rule here is
//! fixed; only the comparison of the final digest is free to change and is
//! done in constant time.

mod entities;

pub use entities::decode_html_entities;

use crate::message::{InboundMessage, SIGNATURE_FIELD, SIGNATURE_FIELD_UPPER};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::borrow::Cow;
use std::fmt;
use subtle::ConstantTimeEq;

/// Value returned by [`sign`] when no passphrase is configured.
pub const NO_PASSPHRASE_SENTINEL: &str = "no_signature_passphrase_provided";

// ============================================================================
// Options
// ============================================================================

/// Variants of the canonical form.
///
/// Both flags default to `false`, which is the form the processor uses for
/// IPN deliveries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureOptions {
    /// Sort on upper-cased names and emit upper-cased names.
    pub uppercase_keys: bool,

    /// HTML-entity-decode values before signing.
    pub html_decode: bool,
}

// ============================================================================
// Signature
// ============================================================================

/// Result of signing a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signature {
    /// Upper-case hex SHA-512 digest (128 characters).
    Digest(String),

    /// No passphrase was available; never matches anything.
    NoPassphrase,
}

impl Signature {
    /// String form; the sentinel for [`Signature::NoPassphrase`].
    pub fn as_str(&self) -> &str {
        match self {
            Self::Digest(digest) => digest,
            Self::NoPassphrase => NO_PASSPHRASE_SENTINEL,
        }
    }

    /// Compare against a received signature in constant time.
    ///
    /// [`Signature::NoPassphrase`] matches nothing, including the sentinel
    /// string itself.
    pub fn matches(&self, received: &str) -> bool {
        match self {
            Self::NoPassphrase => false,
            Self::Digest(digest) => {
                let expected = digest.as_bytes();
                let received = received.as_bytes();
                if expected.len() != received.len() {
                    return false;
                }
                expected.ct_eq(received).into()
            }
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a message fails verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("message carries no 'sha_sign' field")]
    MissingSignature,

    #[error("no signing passphrase is configured")]
    NoPassphrase,

    #[error("signature does not match the message")]
    Mismatch,
}

// ============================================================================
// Signing
// ============================================================================

fn is_signature_field(name: &str) -> bool {
    name == SIGNATURE_FIELD || name == SIGNATURE_FIELD_UPPER
}

/// Sign `fields` with `secret`.
///
/// Signature fields are ignored, as are fields whose value is null, `false`
/// or empty. An empty `secret` yields [`Signature::NoPassphrase`].
///
/// # Examples
///
/// ```rust
/// use ipn_relay_core::message::InboundMessage;
/// use ipn_relay_core::signing::{sign, SignatureOptions};
///
/// let a = InboundMessage::from_pairs([("b", "2"), ("a", "1")]);
/// let b = InboundMessage::from_pairs([("a", "1"), ("b", "2"), ("c", "")]);
///
/// let options = SignatureOptions::default();
/// assert_eq!(sign(&a, "S", options), sign(&b, "S", options));
/// assert_eq!(sign(&a, "S", options).as_str().len(), 128);
/// ```
pub fn sign(fields: &InboundMessage, secret: &str, options: SignatureOptions) -> Signature {
    if secret.is_empty() {
        return Signature::NoPassphrase;
    }

    let mut names: Vec<(Cow<'_, str>, &str)> = fields
        .iter()
        .map(|(name, _)| name)
        .filter(|name| !is_signature_field(name))
        .map(|name| {
            let sort_key = if options.uppercase_keys {
                Cow::Owned(name.to_ascii_uppercase())
            } else {
                Cow::Borrowed(name)
            };
            (sort_key, name)
        })
        .collect();

    // Distinct names can only share a sort key in upper-case mode; the
    // original name then decides.
    names.sort_by(|(key_a, name_a), (key_b, name_b)| {
        key_a.cmp(key_b).then_with(|| name_a.cmp(name_b))
    });

    let mut canonical = String::new();
    for (sort_key, name) in &names {
        let Some(value) = fields.get(name).and_then(|v| v.render()) else {
            continue;
        };
        let value = if options.html_decode {
            Cow::Owned(decode_html_entities(&value).into_owned())
        } else {
            value
        };
        if value.is_empty() {
            continue;
        }

        let output_name: &str = if options.uppercase_keys {
            sort_key.as_ref()
        } else {
            name
        };
        canonical.push_str(output_name);
        canonical.push('=');
        canonical.push_str(&value);
        canonical.push_str(secret);
    }

    let digest = Sha512::digest(canonical.as_bytes());
    Signature::Digest(hex::encode_upper(digest))
}

// ============================================================================
// Verification
// ============================================================================

/// Verifies inbound messages against their `sha_sign` field.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureVerifier {
    options: SignatureOptions,
}

impl SignatureVerifier {
    /// Create a verifier using the given canonical-form variant.
    pub fn new(options: SignatureOptions) -> Self {
        Self { options }
    }

    /// Canonical-form variant in use.
    pub fn options(&self) -> SignatureOptions {
        self.options
    }

    /// Check `message` against `secret`, reporting why it failed.
    ///
    /// # Errors
    ///
    /// - [`SignatureError::MissingSignature`] when `sha_sign` is absent or
    ///   not textual
    /// - [`SignatureError::NoPassphrase`] when `secret` is empty
    /// - [`SignatureError::Mismatch`] when the digests differ
    pub fn check(&self, message: &InboundMessage, secret: &str) -> Result<(), SignatureError> {
        let received = message
            .text(SIGNATURE_FIELD)
            .ok_or(SignatureError::MissingSignature)?;

        match sign(message, secret, self.options) {
            Signature::NoPassphrase => Err(SignatureError::NoPassphrase),
            expected if expected.matches(received) => Ok(()),
            _ => Err(SignatureError::Mismatch),
        }
    }

    /// Whether `message` carries a valid signature for `secret`.
    pub fn verify(&self, message: &InboundMessage, secret: &str) -> bool {
        self.check(message, secret).is_ok()
    }
}

/// Verify `message` with the default canonical form.
pub fn verify(message: &InboundMessage, secret: &str) -> bool {
    SignatureVerifier::default().verify(message, secret)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
