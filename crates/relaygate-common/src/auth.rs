//! Authorization Header Parsing
//!
//! Callers pass their secret key through HTTP Basic authentication: the
//! password field of `Authorization: Basic base64(user:secret)` is the
//! secret key. The user field is ignored.
//!
//! # Parsing Rules
//!
//! - Split the header value on a single space and take the second token
//! - Base64-decode it (padding optional)
//! - Split the decoded text on `:` and take the second field
//!
//! Any step that fails yields an empty secret key. Parsing never errors and
//! the key is not validated here.
//!
//! # Example
//!
//! ```
//! use relaygate_common::auth::extract_secret_key;
//!
//! assert_eq!(extract_secret_key(Some("Basic dXNlcjpzZWNyZXQxMjM=")), "secret123");
//! assert_eq!(extract_secret_key(Some("Basic dXNlcg==")), "");
//! assert_eq!(extract_secret_key(None), "");
//! ```

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

/// Standard alphabet, padding optional.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Extracts the secret key from an `Authorization` header value.
///
/// # Arguments
///
/// * `header_value` - The raw header value, `None` if the header is absent
///
/// # Returns
///
/// The password field of the Basic credentials, or an empty string when the
/// header is absent, malformed, or carries no password.
pub fn extract_secret_key(header_value: Option<&str>) -> String {
    header_value
        .and_then(|value| value.split(' ').nth(1))
        .and_then(|encoded| LENIENT_BASE64.decode(encoded.trim()).ok())
        .and_then(|decoded| {
            String::from_utf8_lossy(&decoded)
                .split(':')
                .nth(1)
                .filter(|secret| !secret.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_default()
}
