//! Session tokens and operator login.
//!
//! # Responsibility
//! - Issue and verify signed session tokens.
//! - Check operator credentials and open sessions.
//!
//! # Invariants
//! - Every verification failure (missing, malformed, forged, expired) is
//!   reported to callers as the same `AccessDenied`; the reason is only
//!   logged.
//! - Secrets and raw tokens never reach the log.

pub mod authenticator;
pub mod token;

pub use authenticator::{Authenticator, LoginError, Session, SessionUser};
pub use token::{AccessDenied, Claims, SignedTokenCodec, TokenError, TokenVerifier};
