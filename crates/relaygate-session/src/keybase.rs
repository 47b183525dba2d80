//! In-memory identity store.
//!
//! The keybase holds ed25519 signing keys encrypted under a passphrase and
//! tracks which of them are currently unlocked for signing.
//!
//! # Key Handling
//!
//! - Imported keys are stored encrypted with AES-256-GCM; the cipher key is
//!   PBKDF2-HMAC-SHA256 of the passphrase over a random 16-byte salt
//! - Unlocking decrypts the key and keeps the signing key in memory
//! - An unlock duration of zero keeps the account unlocked for the lifetime
//!   of the keybase
//!
//! # Addresses
//!
//! An account's address is the first 20 bytes of SHA-256 over its 32-byte
//! public key, hex-encoded (40 lowercase characters).

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use ed25519_dalek::{Signer, SigningKey, SECRET_KEY_LENGTH};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const ADDRESS_LEN: usize = 20;
const KEYPAIR_LENGTH: usize = 64;
/// PBKDF2 iterations for the cipher key.
const KDF_ROUNDS: u32 = 100_000;

#[derive(Error, Debug)]
pub enum KeybaseError {
    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Passphrase must not be empty")]
    EmptyPassphrase,

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Wrong passphrase for account {0}")]
    WrongPassphrase(String),

    #[error("Account is locked: {0}")]
    Locked(String),

    #[error("Crypto error: {0}")]
    Crypto(String),
}

/// Public view of an imported account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    address_hex: String,
    public_key: [u8; 32],
}

impl Account {
    pub fn address_hex(&self) -> &str {
        &self.address_hex
    }

    pub fn public_key(&self) -> &[u8; 32] {
        &self.public_key
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key)
    }
}

struct StoredAccount {
    account: Account,
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

struct UnlockedAccount {
    signing_key: SigningKey,
    expires_at: Option<Instant>,
}

impl UnlockedAccount {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |deadline| now < deadline)
    }
}

#[derive(Default)]
struct KeybaseState {
    accounts: HashMap<String, StoredAccount>,
    unlocked: HashMap<String, UnlockedAccount>,
}

/// Passphrase-protected store of signing accounts.
#[derive(Default)]
pub struct Keybase {
    state: RwLock<KeybaseState>,
}

impl Keybase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Imports a private key and stores it encrypted under `passphrase`.
    ///
    /// # Arguments
    /// * `private_key` - 64-byte keypair (seed followed by public key) or 32-byte seed
    /// * `passphrase` - Non-empty passphrase protecting the stored key
    ///
    /// # Returns
    /// The imported account. Importing the same key again replaces the stored
    /// copy and keeps any existing unlock.
    pub async fn import_account(&self, private_key: &[u8], passphrase: &str) -> Result<Account, KeybaseError> {
        if passphrase.is_empty() {
            return Err(KeybaseError::EmptyPassphrase);
        }

        let signing_key = signing_key_from_bytes(private_key)?;
        let public_key = signing_key.verifying_key().to_bytes();
        let account = Account {
            address_hex: address_from_public_key(&public_key),
            public_key,
        };

        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        {
            // ThreadRng is !Send; keep it out of the await below
            let mut rng = rand::rng();
            rng.fill_bytes(&mut salt);
            rng.fill_bytes(&mut nonce);
        }

        let cipher = derive_cipher(salt, passphrase).await?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), signing_key.to_bytes().as_slice())
            .map_err(|e| KeybaseError::Crypto(format!("AES-256-GCM encryption failed: {}", e)))?;

        let mut state = self.state.write().await;
        state.accounts.insert(
            account.address_hex.clone(),
            StoredAccount {
                account: account.clone(),
                salt,
                nonce,
                ciphertext,
            },
        );

        tracing::debug!("Imported account {}", account.address_hex);
        Ok(account)
    }

    /// Unlocks an imported account for signing.
    ///
    /// # Arguments
    /// * `address_hex` - Address returned by [`import_account`](Self::import_account)
    /// * `passphrase` - Passphrase the key was imported with
    /// * `duration` - How long the unlock lasts; `Duration::ZERO` never expires
    pub async fn unlock_account(
        &self,
        address_hex: &str,
        passphrase: &str,
        duration: Duration,
    ) -> Result<(), KeybaseError> {
        let (salt, nonce, ciphertext, public_key) = {
            let state = self.state.read().await;
            let stored = state
                .accounts
                .get(address_hex)
                .ok_or_else(|| KeybaseError::AccountNotFound(address_hex.to_string()))?;
            (stored.salt, stored.nonce, stored.ciphertext.clone(), stored.account.public_key)
        };

        // Derivation runs without holding the state lock
        let cipher = derive_cipher(salt, passphrase).await?;
        let seed = cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|_| KeybaseError::WrongPassphrase(address_hex.to_string()))?;

        let signing_key = signing_key_from_bytes(&seed)?;
        if signing_key.verifying_key().to_bytes() != public_key {
            return Err(KeybaseError::Crypto(format!(
                "Decrypted key does not match account {}",
                address_hex
            )));
        }

        let expires_at = if duration.is_zero() {
            None
        } else {
            Some(Instant::now() + duration)
        };

        let mut state = self.state.write().await;
        state.unlocked.insert(
            address_hex.to_string(),
            UnlockedAccount {
                signing_key,
                expires_at,
            },
        );

        tracing::debug!("Unlocked account {}", address_hex);
        Ok(())
    }

    /// Whether the account is unlocked right now.
    pub async fn is_unlocked(&self, address_hex: &str) -> bool {
        let state = self.state.read().await;
        state
            .unlocked
            .get(address_hex)
            .is_some_and(|unlocked| unlocked.is_live(Instant::now()))
    }

    /// Drops the in-memory signing key of an account.
    ///
    /// Returns `true` if the account was unlocked.
    pub async fn lock_account(&self, address_hex: &str) -> bool {
        let mut state = self.state.write().await;
        state.unlocked.remove(address_hex).is_some()
    }

    pub async fn list_accounts(&self) -> Vec<Account> {
        let state = self.state.read().await;
        let mut accounts: Vec<Account> = state
            .accounts
            .values()
            .map(|stored| stored.account.clone())
            .collect();
        accounts.sort_by(|a, b| a.address_hex.cmp(&b.address_hex));
        accounts
    }

    /// Signs `payload` with an unlocked account.
    ///
    /// # Returns
    /// - `Ok(signature)` - 64-byte ed25519 signature
    /// - `Err(KeybaseError::Locked)` - The account is not unlocked or the unlock expired
    pub async fn sign(&self, address_hex: &str, payload: &[u8]) -> Result<Vec<u8>, KeybaseError> {
        let state = self.state.read().await;
        match state.unlocked.get(address_hex) {
            Some(unlocked) if unlocked.is_live(Instant::now()) => {
                Ok(unlocked.signing_key.sign(payload).to_bytes().to_vec())
            }
            _ => Err(KeybaseError::Locked(address_hex.to_string())),
        }
    }
}

/// Hex address of a public key: SHA-256(public_key)[..20].
pub fn address_from_public_key(public_key: &[u8; 32]) -> String {
    let digest = Sha256::digest(public_key);
    hex::encode(&digest[..ADDRESS_LEN])
}

fn signing_key_from_bytes(bytes: &[u8]) -> Result<SigningKey, KeybaseError> {
    match bytes.len() {
        SECRET_KEY_LENGTH => {
            let mut seed = [0u8; SECRET_KEY_LENGTH];
            seed.copy_from_slice(bytes);
            Ok(SigningKey::from_bytes(&seed))
        }
        KEYPAIR_LENGTH => {
            let mut keypair = [0u8; KEYPAIR_LENGTH];
            keypair.copy_from_slice(bytes);
            SigningKey::from_keypair_bytes(&keypair)
                .map_err(|e| KeybaseError::InvalidKey(format!("keypair halves do not match: {}", e)))
        }
        other => Err(KeybaseError::InvalidKey(format!(
            "expected {} or {} bytes, got {}",
            SECRET_KEY_LENGTH, KEYPAIR_LENGTH, other
        ))),
    }
}

/// Derives the AES-256-GCM cipher on the blocking pool.
async fn derive_cipher(salt: [u8; SALT_LEN], passphrase: &str) -> Result<Aes256Gcm, KeybaseError> {
    let passphrase = passphrase.to_owned();
    tokio::task::spawn_blocking(move || {
        let key = derive_key(&salt, &passphrase, KDF_ROUNDS);
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key))
    })
    .await
    .map_err(|e| KeybaseError::Crypto(format!("Key derivation task failed: {}", e)))
}

fn derive_key(salt: &[u8], passphrase: &str, rounds: u32) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, rounds, &mut key);
    key
}
