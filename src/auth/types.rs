// Authentication types

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::fmt;

use crate::error::ClientError;

/// Safety margin subtracted from a token's expiry so work never starts on a
/// token that will lapse mid-flight
pub const EXPIRY_SKEW_SECS: i64 = 60;

/// Cached bearer token
///
/// Replaced wholesale on every refresh, never mutated in place.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub access_token: String,
    /// Authorization scheme, e.g. "Bearer"
    pub token_type: String,
    pub obtained_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Build a record from a grant response received at `obtained_at`
    ///
    /// An `expires_in` that does not fit a timestamp is a `Decode` error.
    pub fn from_grant(
        response: ClientCredentialsResponse,
        obtained_at: DateTime<Utc>,
    ) -> Result<Self, ClientError> {
        let expires_at = Duration::try_seconds(response.expires_in)
            .and_then(|lifetime| obtained_at.checked_add_signed(lifetime))
            .ok_or_else(|| {
                ClientError::Decode(serde::de::Error::custom(format!(
                    "expires_in out of range: {}",
                    response.expires_in
                )))
            })?;

        Ok(Self {
            access_token: response.access_token,
            token_type: response.token_type,
            obtained_at,
            expires_at,
        })
    }

    /// Usable iff `now <= expires_at - skew`
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .checked_sub_signed(Duration::seconds(EXPIRY_SKEW_SECS))
            .is_some_and(|usable_until| now <= usable_until)
    }

    pub fn is_usable(&self) -> bool {
        self.is_usable_at(Utc::now())
    }

    /// Value for the `Authorization` header
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.access_token.chars().take(6).collect();
        f.debug_struct("TokenRecord")
            .field("access_token", &format_args!("{}...", prefix))
            .field("token_type", &self.token_type)
            .field("obtained_at", &self.obtained_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Client-credentials grant response
#[derive(Debug, Deserialize)]
pub struct ClientCredentialsResponse {
    #[serde(alias = "accessToken")]
    pub access_token: String,

    #[serde(default = "default_token_type", alias = "tokenType")]
    pub token_type: String,

    /// Lifetime in seconds, relative to the refresh time
    #[serde(default = "default_expires_in", alias = "expiresIn")]
    pub expires_in: i64,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

fn default_expires_in() -> i64 {
    3600
}
