//! Operator login against configured credentials.

use crate::auth::token::{Claims, SignedTokenCodec, TokenError};
use crate::clock::Clock;
use crate::config::{OperatorConfig, TokenConfig};
use chrono::{DateTime, TimeDelta, Utc};
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use subtle::ConstantTimeEq;

const OPERATOR_SUBJECT_ID: &str = "1";
const OPERATOR_ROLE: &str = "admin";

/// Public profile of an authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub id: String,
    pub username: String,
    pub name: String,
    pub role: String,
}

impl From<&Claims> for SessionUser {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.subject_id.clone(),
            username: claims.username.clone(),
            name: claims.display_name.clone(),
            role: claims.role.clone(),
        }
    }
}

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user: SessionUser,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub enum LoginError {
    /// Username or password was blank.
    MissingCredentials,
    InvalidCredentials,
    Token(TokenError),
}

impl Display for LoginError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingCredentials => write!(f, "username and password are required"),
            Self::InvalidCredentials => write!(f, "invalid credentials"),
            Self::Token(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LoginError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Token(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TokenError> for LoginError {
    fn from(value: TokenError) -> Self {
        Self::Token(value)
    }
}

/// Opens sessions for the single configured operator.
pub struct Authenticator {
    operator: OperatorConfig,
    codec: Arc<SignedTokenCodec>,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl Authenticator {
    /// Builds an authenticator and its token codec from configuration.
    pub fn new(
        operator: OperatorConfig,
        token: &TokenConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TokenError> {
        let codec = Arc::new(SignedTokenCodec::new(&token.secret)?);
        let ttl = i64::try_from(token.ttl_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .filter(|ttl| *ttl > TimeDelta::zero())
            .ok_or(TokenError::InvalidTtl(token.ttl_secs))?;
        Ok(Self {
            operator,
            codec,
            ttl,
            clock,
        })
    }

    /// Codec that verifies the tokens this authenticator issues.
    pub fn codec(&self) -> Arc<SignedTokenCodec> {
        Arc::clone(&self.codec)
    }

    /// Checks credentials and issues a session token.
    ///
    /// Both fields are compared in constant time and both comparisons always
    /// run.
    pub fn login(&self, username: &str, password: &str) -> Result<Session, LoginError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(LoginError::MissingCredentials);
        }

        let user_ok = username.as_bytes().ct_eq(self.operator.username.as_bytes());
        let password_ok = password.as_bytes().ct_eq(self.operator.password.as_bytes());
        if !bool::from(user_ok & password_ok) {
            warn!("event=login module=auth status=denied");
            return Err(LoginError::InvalidCredentials);
        }

        let expires_at = self
            .clock
            .now()
            .checked_add_signed(self.ttl)
            .ok_or_else(|| {
                TokenError::InvalidTtl(u64::try_from(self.ttl.num_seconds()).unwrap_or(0))
            })?;
        let claims = Claims {
            subject_id: OPERATOR_SUBJECT_ID.to_string(),
            username: self.operator.username.clone(),
            display_name: self.operator.display_name.clone(),
            role: OPERATOR_ROLE.to_string(),
            expires_at_ms: expires_at.timestamp_millis(),
        };
        let token = self.codec.issue(&claims)?;
        info!(
            "event=login module=auth status=ok subject={}",
            claims.subject_id
        );

        Ok(Session {
            token,
            user: SessionUser::from(&claims),
            expires_at,
        })
    }
}
