//! # Credential Generation
//!
//! Random service passwords and the htpasswd-compatible bcrypt hash the
//! provisioning backend verifies HTTP basic auth against.
//!
//! The hash is produced at cost 5, the `htpasswd -B` default, and then its
//! version marker is rewritten from `$2a$` to `$2y$`. The backend hard-codes
//! `2y` because that is what `htpasswd` emits. The two variants only differ
//! for passwords with high-bit characters, so the rewrite is valid as long
//! as passwords stay ASCII, which [`hash_password`] enforces.

use std::collections::BTreeMap;

use bcrypt::Version;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::constants::{
    AUTH_CONFIG_KEY, HTPASSWD_BCRYPT_COST, HTPASSWD_KEY, PASSWORD_ALPHABET, PASSWORD_KEY,
    PASSWORD_LENGTH, USERNAME_KEY,
};
use crate::secrets::error::{Result, SecretsError};

/// Dialect tag bcrypt hashes are generated with
pub const DEFAULT_DIALECT_TAG: &str = "2a";
/// Dialect tag expected by the provisioning backend
pub const HTPASSWD_DIALECT_TAG: &str = "2y";

/// Generate a random password from the OS entropy source
///
/// Characters are drawn with rejection sampling so every character of
/// [`PASSWORD_ALPHABET`] is equally likely.
pub fn generate_password() -> Result<String> {
    generate_password_from(&mut OsRng)
}

fn generate_password_from(rng: &mut impl RngCore) -> Result<String> {
    let alphabet_len = PASSWORD_ALPHABET.len();
    // Largest multiple of the alphabet size that fits in a byte
    let limit = 256 - (256 % alphabet_len);

    let mut password = String::with_capacity(PASSWORD_LENGTH);
    let mut buf = [0u8; 32];
    while password.len() < PASSWORD_LENGTH {
        rng.try_fill_bytes(&mut buf)
            .map_err(|e| SecretsError::Generation(format!("entropy source failed: {e}")))?;
        for byte in buf {
            if password.len() == PASSWORD_LENGTH {
                break;
            }
            let byte = usize::from(byte);
            if byte < limit {
                password.push(char::from(PASSWORD_ALPHABET[byte % alphabet_len]));
            }
        }
    }
    Ok(password)
}

/// Hash a password for the htpasswd file, tagged with the `2y` dialect
pub fn hash_password(password: &str) -> Result<String> {
    if !password.is_ascii() {
        return Err(SecretsError::NonAsciiPassword);
    }

    let parts = bcrypt::hash_with_result(password, HTPASSWD_BCRYPT_COST)
        .map_err(|e| SecretsError::Generation(format!("bcrypt failed: {e}")))?;
    let hash = parts.format_for_version(Version::TwoA);

    Ok(rewrite_dialect_tag(&hash, HTPASSWD_DIALECT_TAG))
}

/// Replace the version marker of a `$<tag>$<cost>$...` hash
#[must_use]
pub fn rewrite_dialect_tag(hash: &str, tag: &str) -> String {
    match hash.strip_prefix('$').and_then(|rest| rest.split_once('$')) {
        Some((_, rest)) => format!("${tag}${rest}"),
        None => hash.to_string(),
    }
}

/// Version marker of a bcrypt hash, e.g. `2y`
#[must_use]
pub fn dialect_tag(hash: &str) -> Option<&str> {
    hash.strip_prefix('$')
        .and_then(|rest| rest.split_once('$'))
        .map(|(tag, _)| tag)
}

/// A freshly minted service credential
#[derive(Clone)]
pub struct Credential {
    pub username: String,
    pub password: String,
    /// bcrypt hash of `password` in the `2y` dialect
    pub hash_digest: String,
    /// INI fragment the backend reads its basic-auth client settings from
    pub config_snippet: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"***")
            .finish_non_exhaustive()
    }
}

impl Credential {
    /// Generate a password for `username` and derive the hash and config section from it
    pub fn generate(username: &str, config_section: &str) -> Result<Self> {
        let password = generate_password()?;
        Self::from_password(username, password, config_section)
    }

    pub fn from_password(username: &str, password: String, config_section: &str) -> Result<Self> {
        let hash_digest = hash_password(&password)?;
        let config_snippet = auth_config_snippet(config_section, username, &password);
        Ok(Self {
            username: username.to_string(),
            password,
            hash_digest,
            config_snippet,
        })
    }

    /// `username:hash` line as found in an htpasswd file
    #[must_use]
    pub fn htpasswd_line(&self) -> String {
        format!("{}:{}", self.username, self.hash_digest)
    }

    /// The four string fields stored in a service-auth secret
    #[must_use]
    pub fn to_string_data(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (USERNAME_KEY.to_string(), self.username.clone()),
            (PASSWORD_KEY.to_string(), self.password.clone()),
            (HTPASSWD_KEY.to_string(), self.htpasswd_line()),
            (AUTH_CONFIG_KEY.to_string(), self.config_snippet.clone()),
        ])
    }
}

fn auth_config_snippet(section: &str, username: &str, password: &str) -> String {
    format!(
        "[{section}]
auth_type = http_basic
username = {username}
password = {password}
"
    )
}
