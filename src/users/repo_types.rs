use std::fmt;

use serde::{Deserialize, Serialize};

/// User record as held in memory and in the data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,       // assigned by the store
    pub email: String, // unique, compared as stored
    #[serde(rename = "password")]
    pub password_hash: String, // base64(salt)$base64(digest)
}

/// Candidate record supplied by a caller. Carries the plaintext password
/// until the store hashes it.
#[derive(Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
}

impl NewUser {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}
