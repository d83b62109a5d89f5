//! Decoding of inbound IPN requests into an [`InboundMessage`].
//!
//! Fields may arrive in a form body (url-encoded or multipart), a JSON
//! object body and the query string. The three sources are merged in that
//! order; a later source overwrites fields of an earlier one.

use bytes::Bytes;
use ipn_relay_core::InboundMessage;
use serde_json::Value;
use std::convert::Infallible;
use tracing::debug;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Build the message for one request.
///
/// Undecodable sources contribute nothing; the signature check decides
/// whether what remains is acceptable.
pub async fn decode_message(
    content_type: Option<&str>,
    query: Option<&str>,
    body: &[u8],
) -> InboundMessage {
    let mut message = InboundMessage::new();

    if let Some(content_type) = content_type {
        if is_form_content_type(content_type) {
            message.merge(decode_form(body));
        } else if let Ok(boundary) = multer::parse_boundary(content_type) {
            message.merge(decode_multipart(body, boundary).await);
        }
    }

    if let Some(json) = decode_json_object(body) {
        message.merge(json);
    }

    if let Some(query) = query.filter(|q| !q.is_empty()) {
        message.merge(decode_form(query.as_bytes()));
    }

    debug!(field_count = message.len(), "Decoded IPN fields");
    message
}

fn is_form_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}

fn decode_form(input: &[u8]) -> InboundMessage {
    match serde_urlencoded::from_bytes::<Vec<(String, String)>>(input) {
        Ok(pairs) => InboundMessage::from_pairs(pairs),
        Err(e) => {
            debug!(error = %e, "Ignoring undecodable form data");
            InboundMessage::new()
        }
    }
}

/// Text parts of a `multipart/form-data` body. File parts are not fields.
async fn decode_multipart(body: &[u8], boundary: String) -> InboundMessage {
    let chunk = Bytes::copy_from_slice(body);
    let stream = futures::stream::once(async move { Ok::<_, Infallible>(chunk) });
    let mut multipart = multer::Multipart::new(stream, boundary);
    let mut message = InboundMessage::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return message,
            Err(e) => {
                debug!(error = %e, "Ignoring undecodable multipart data");
                return InboundMessage::new();
            }
        };
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match field.text().await {
            Ok(value) => message.insert(name, value),
            Err(e) => {
                debug!(error = %e, "Ignoring undecodable multipart data");
                return InboundMessage::new();
            }
        }
    }
}

fn decode_json_object(body: &[u8]) -> Option<InboundMessage> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(object)) => Some(InboundMessage::from_json_object(&object)),
        _ => None,
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
