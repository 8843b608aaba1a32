#![forbid(unsafe_code)]

//! Credential checks for the API layer and the process-level root guard.
//! Nothing in here is consulted by the download pipeline itself.

use anyhow::{Result, bail};
use nix::unistd::Uid;

/// Decides whether a username/password pair may use the service.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// A single account whose password is stored only as a BLAKE3 digest.
///
/// The digest is unsalted and BLAKE3 is fast, so a leaked digest of a weak
/// password is cheap to brute-force. This fits a single operator account
/// behind an internal API; anything user-facing needs a salted, slow KDF.
#[derive(Debug, Clone)]
pub struct DigestCredentials {
    username: String,
    digest: blake3::Hash,
}

impl DigestCredentials {
    pub fn new(username: impl Into<String>, password: &str) -> Self {
        Self {
            username: username.into(),
            digest: blake3::hash(password.as_bytes()),
        }
    }

    /// Builds the verifier from configured values; `digest_hex` comes from
    /// [`hash_password`].
    pub fn from_config(username: &str, digest_hex: &str) -> Result<Self> {
        let username = username.trim();
        if username.is_empty() {
            bail!("username must not be empty");
        }
        let Ok(digest) = blake3::Hash::from_hex(digest_hex.trim()) else {
            bail!("password digest must be 64 hex characters");
        };
        Ok(Self {
            username: username.to_string(),
            digest,
        })
    }
}

impl CredentialVerifier for DigestCredentials {
    fn verify(&self, username: &str, password: &str) -> bool {
        // `blake3::Hash` equality is constant time.
        let password_ok = blake3::hash(password.as_bytes()) == self.digest;
        let username_ok = blake3::hash(username.as_bytes()) == blake3::hash(self.username.as_bytes());
        password_ok & username_ok
    }
}

/// Hex digest suitable for `SHORTS_PASSWORD_BLAKE3`.
pub fn hash_password(password: &str) -> String {
    blake3::hash(password.as_bytes()).to_hex().to_string()
}

/// Refuses to continue when started as root; downloads should never be able
/// to write into system directories.
pub fn ensure_not_root(process: &str) -> Result<()> {
    ensure_not_root_for(Uid::current(), process)
}

fn ensure_not_root_for(uid: Uid, process: &str) -> Result<()> {
    if uid.is_root() {
        bail!("{process} refuses to run as root; start it from an unprivileged account");
    }
    Ok(())
}
