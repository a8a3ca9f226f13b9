use casework_core::auth::{
    AccessDenied, Authenticator, Claims, LoginError, SignedTokenCodec, TokenError, TokenVerifier,
};
use casework_core::clock::FixedClock;
use casework_core::config::{CoreConfig, TokenConfig};
use chrono::{TimeDelta, TimeZone, Utc};
use std::sync::Arc;

fn claims(expires_at_ms: i64) -> Claims {
    Claims {
        subject_id: "1".to_string(),
        username: "admin".to_string(),
        display_name: "Administrador".to_string(),
        role: "admin".to_string(),
        expires_at_ms,
    }
}

#[test]
fn token_is_denied_once_expired() {
    let codec = SignedTokenCodec::new("secret").unwrap();
    let issued = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
    let expires = issued + TimeDelta::hours(24);
    let token = codec.issue(&claims(expires.timestamp_millis())).unwrap();

    assert_eq!(codec.verify(Some(&token), issued).unwrap(), claims(expires.timestamp_millis()));
    assert_eq!(
        codec.verify(Some(&token), expires - TimeDelta::milliseconds(1)).unwrap().subject_id,
        "1"
    );
    assert_eq!(codec.verify(Some(&token), expires), Err(AccessDenied));
    assert_eq!(
        codec.verify(Some(&token), expires + TimeDelta::hours(1)),
        Err(AccessDenied)
    );
}

#[test]
fn every_failure_is_the_same_denial() {
    let codec = SignedTokenCodec::new("secret").unwrap();
    let other = SignedTokenCodec::new("other-secret").unwrap();
    let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
    let foreign = other.issue(&claims(i64::MAX)).unwrap();

    for token in [None, Some(""), Some("no-dot"), Some("a.b.c"), Some(foreign.as_str())] {
        assert_eq!(codec.verify(token, now), Err(AccessDenied), "token {token:?}");
    }
}

#[test]
fn codec_rejects_an_empty_secret() {
    assert!(matches!(
        SignedTokenCodec::new(""),
        Err(TokenError::EmptySecret)
    ));
}

#[test]
fn authenticator_sessions_follow_the_configured_ttl() {
    let config = CoreConfig::default();
    let token_config = TokenConfig {
        secret: config.token.secret.clone(),
        ttl_secs: 60,
    };
    let clock = Arc::new(FixedClock::on_date(2024, 1, 15).unwrap());
    let auth = Authenticator::new(config.operator.clone(), &token_config, clock).unwrap();

    let session = auth.login("admin", "admin123").unwrap();
    let issued_at = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
    assert_eq!(session.expires_at, issued_at + TimeDelta::seconds(60));

    let verifier: Arc<dyn TokenVerifier> = auth.codec();
    let claims = verifier.verify(Some(&session.token), issued_at).unwrap();
    assert_eq!(claims.display_name, "Administrador");
    assert_eq!(claims.role, "admin");
    assert!(verifier
        .verify(Some(&session.token), session.expires_at)
        .is_err());

    assert!(matches!(
        auth.login("ADMIN", "admin123"),
        Err(LoginError::InvalidCredentials)
    ));
}

#[test]
fn zero_ttl_is_rejected() {
    let config = CoreConfig::default();
    let token_config = TokenConfig {
        secret: "secret".to_string(),
        ttl_secs: 0,
    };
    let clock = Arc::new(FixedClock::on_date(2024, 1, 15).unwrap());
    assert!(matches!(
        Authenticator::new(config.operator, &token_config, clock),
        Err(TokenError::InvalidTtl(0))
    ));
}
