//! Username/password credentials.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A username and password pair for one of the external systems.
///
/// The `Debug` implementation never prints the password, so credentials can
/// sit inside configuration structs that are logged.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// Login name.
    pub user: String,

    /// Login password.
    pub password: String,
}

impl Credentials {
    /// Creates a new credential pair.
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Returns true if no user has been configured.
    pub fn is_empty(&self) -> bool {
        self.user.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}
