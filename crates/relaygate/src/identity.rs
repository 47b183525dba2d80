//! Signing identity unlock.
//!
//! Imports the gateway's private key into a session's keybase and unlocks it
//! for the lifetime of the session. Any failure along the way (bad hex, bad
//! key, wrong passphrase) is logged and collapsed into a single internal
//! server error, so callers never see the underlying cause.

use relaygate_common::{GatewayError, Result};
use relaygate_session::{ClientSession, KeybaseError};
use std::time::Duration;
use thiserror::Error;

/// Message of the error returned for any import or unlock failure.
pub const UNLOCK_FAILURE_MESSAGE: &str = "Unable to import or unlock base client account";

/// A private-key-derived address and its unlock status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningIdentity {
    address_hex: String,
    unlocked: bool,
}

impl SigningIdentity {
    pub fn address_hex(&self) -> &str {
        &self.address_hex
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }
}

#[derive(Error, Debug)]
enum UnlockError {
    #[error("private key is not valid hex: {0}")]
    Decode(#[from] hex::FromHexError),

    #[error(transparent)]
    Keybase(#[from] KeybaseError),
}

/// Imports and unlocks the signing identity in `session`.
///
/// The unlock duration is zero: the identity stays unlocked for as long as
/// the session lives.
///
/// # Arguments
/// * `session` - Session whose keybase receives the identity
/// * `private_key_hex` - Hex-encoded 64-byte keypair or 32-byte seed
/// * `passphrase` - Passphrase protecting the imported key
///
/// # Errors
/// `GatewayError::InternalServerError` with [`UNLOCK_FAILURE_MESSAGE`] on any failure.
pub async fn unlock_identity(
    session: &ClientSession,
    private_key_hex: &str,
    passphrase: &str,
) -> Result<SigningIdentity> {
    match import_and_unlock(session, private_key_hex, passphrase).await {
        Ok(identity) => Ok(identity),
        Err(e) => {
            tracing::error!("Identity unlock failed: {}", e);
            Err(GatewayError::InternalServerError(UNLOCK_FAILURE_MESSAGE.to_string()))
        }
    }
}

async fn import_and_unlock(
    session: &ClientSession,
    private_key_hex: &str,
    passphrase: &str,
) -> std::result::Result<SigningIdentity, UnlockError> {
    let key_bytes = hex::decode(private_key_hex.trim())?;
    let keybase = session.keybase();

    let account = keybase.import_account(&key_bytes, passphrase).await?;
    keybase
        .unlock_account(account.address_hex(), passphrase, Duration::ZERO)
        .await?;

    Ok(SigningIdentity {
        address_hex: account.address_hex().to_string(),
        unlocked: true,
    })
}
