//! Secure credential handling using the secrecy crate
//!
//! The database connection string carries a password, so it lives in a
//! [`SecretString`]: zeroed on drop, redacted in `Debug`, and only readable
//! through `expose_secret()`.
//!
//! # Example
//!
//! ```rust
//! use sinan_ingest::config::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let conn = secret_string("postgresql://user:pw@db/sinan".to_string());
//! assert!(conn.expose_secret().starts_with("postgresql://"));
//! assert!(!format!("{conn:?}").contains("pw"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// Newtype wrapper for String that implements the required traits for Secret
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// Secret string: zeroized on drop, redacted in Debug
pub type SecretString = Secret<SecretValue>;

/// Wraps a plain string as a [`SecretString`]
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

/// Connection string with the password replaced, safe for logs
///
/// ```rust
/// use sinan_ingest::config::secret::redact_connection_string;
///
/// assert_eq!(
///     redact_connection_string("postgresql://sinan:pw@db:5432/dengue"),
///     "postgresql://sinan:****@db:5432/dengue"
/// );
/// ```
pub fn redact_connection_string(conn: &str) -> String {
    let Some(scheme_end) = conn.find("://") else {
        return "****".to_string();
    };
    let rest = &conn[scheme_end + 3..];
    let Some(at) = rest.rfind('@') else {
        return conn.to_string();
    };
    let credentials = &rest[..at];
    let user = credentials.split(':').next().unwrap_or_default();
    format!("{}{}:****{}", &conn[..scheme_end + 3], user, &rest[at..])
}
