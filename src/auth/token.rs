// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HS256 token codec.
//!
//! ## Expiry
//!
//! `expMs` carries the exact expiry instant in milliseconds; `exp` is its
//! floor in whole seconds for other JWT consumers. A token is expired once
//! `expMs < now_ms`, checked against the codec's [`Clock`] rather than by
//! `jsonwebtoken` so tests can drive time explicitly.

use std::sync::Arc;

use base64ct::{Base64, Encoding};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::claims::{TokenClaims, TokenKind};
use super::clock::Clock;
use super::error::TokenError;
use crate::config::JwtConfig;
use crate::storage::StoredUser;

/// Minimum decoded key length for HS256.
pub const MIN_SECRET_BYTES: usize = 32;

/// Errors raised while building a codec.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("JWT secret is not valid base64")]
    NotBase64,

    #[error("JWT secret must decode to at least {MIN_SECRET_BYTES} bytes, got {0}")]
    TooShort(usize),
}

/// Freshly issued access and refresh tokens for one user.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues and verifies signed identity tokens.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl_ms: i64,
    refresh_ttl_ms: i64,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    /// Build a codec from configuration. The secret is decoded once here.
    pub fn new(config: &JwtConfig, clock: Arc<dyn Clock>) -> Result<Self, KeyError> {
        let secret = Base64::decode_vec(config.secret.trim()).map_err(|_| KeyError::NotBase64)?;
        if secret.len() < MIN_SECRET_BYTES {
            return Err(KeyError::TooShort(secret.len()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(&secret),
            decoding_key: DecodingKey::from_secret(&secret),
            validation,
            access_ttl_ms: config.access_ttl_ms,
            refresh_ttl_ms: config.refresh_ttl_ms,
            clock,
        })
    }

    fn ttl_ms(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_ttl_ms,
            TokenKind::Refresh => self.refresh_ttl_ms,
        }
    }

    /// Access token lifetime in whole seconds.
    pub fn access_expires_in_secs(&self) -> i64 {
        self.access_ttl_ms / 1000
    }

    /// Sign a token of `kind` for `user`, valid from now.
    pub fn issue(&self, user: &StoredUser, kind: TokenKind) -> Result<String, TokenError> {
        let now_ms = self.clock.now_millis();
        let expires_ms = now_ms.saturating_add(self.ttl_ms(kind));
        let claims = TokenClaims {
            sub: user.username.clone(),
            iat: now_ms.div_euclid(1000),
            exp: expires_ms.div_euclid(1000),
            exp_ms: expires_ms,
            authorities: user.role.authorities(),
            user_id: user.id,
            user_role: user.role.as_str().to_string(),
            full_name: user.full_name(),
            enabled: user.enabled,
            token_type: kind,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn issue_pair(&self, user: &StoredUser) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue(user, TokenKind::Access)?,
            refresh_token: self.issue(user, TokenKind::Refresh)?,
        })
    }

    /// Verify signature and structure, then expiry.
    pub fn parse_claims(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let claims = self.decode_verified(token)?;
        if self.has_lapsed(&claims) {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn has_lapsed(&self, claims: &TokenClaims) -> bool {
        claims.exp_ms < self.clock.now_millis()
    }

    pub fn extract_subject(&self, token: &str) -> Result<String, TokenError> {
        self.parse_claims(token).map(|claims| claims.sub)
    }

    /// `true` for expired tokens and for anything that cannot be parsed.
    pub fn is_expired(&self, token: &str) -> bool {
        match self.decode_verified(token) {
            Ok(claims) => self.has_lapsed(&claims),
            Err(_) => true,
        }
    }

    /// `true` only if the token parses, is unexpired, and names `user`.
    pub fn is_valid(&self, token: &str, user: &StoredUser) -> bool {
        match self.parse_claims(token) {
            Ok(claims) => claims.sub == user.username,
            Err(e) => {
                tracing::debug!(error = %e, "token rejected");
                false
            }
        }
    }

    fn decode_verified(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TokenError::Empty);
        }

        decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
                ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName | ErrorKind::MissingAlgorithm => {
                    TokenError::Unsupported
                }
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use crate::auth::Role;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use chrono::Utc;
    use proptest::prelude::*;

    /// Base64 of 32 bytes of `0x2a`.
    pub(crate) const TEST_SECRET: &str = "KioqKioqKioqKioqKioqKioqKioqKioqKioqKioqKio=";

    /// 2026-10-19T00:00:00Z
    pub(crate) const TEST_NOW_MS: i64 = 1_792_368_000_000;

    pub(crate) fn jwt_config(access_ttl_ms: i64, refresh_ttl_ms: i64) -> JwtConfig {
        JwtConfig {
            secret: TEST_SECRET.to_string(),
            access_ttl_ms,
            refresh_ttl_ms,
        }
    }

    fn codec_with(clock: Arc<ManualClock>, access_ttl_ms: i64, refresh_ttl_ms: i64) -> TokenCodec {
        TokenCodec::new(&jwt_config(access_ttl_ms, refresh_ttl_ms), clock).unwrap()
    }

    fn codec() -> (TokenCodec, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(TEST_NOW_MS));
        (codec_with(clock.clone(), 86_400_000, 604_800_000), clock)
    }

    pub(crate) fn user(username: &str) -> StoredUser {
        StoredUser {
            id: 1,
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: String::new(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            role: Role::User,
            enabled: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn rejects_short_or_invalid_secret() {
        let clock = Arc::new(ManualClock::new(0));
        let mut config = jwt_config(1000, 1000);

        config.secret = "c2hvcnQ=".to_string();
        assert!(matches!(TokenCodec::new(&config, clock.clone()), Err(KeyError::TooShort(5))));

        config.secret = "not base64 !!".to_string();
        assert!(matches!(TokenCodec::new(&config, clock), Err(KeyError::NotBase64)));
    }

    #[test]
    fn issued_claims_snapshot_the_user() {
        let (codec, _) = codec();
        let mut admin = user("root");
        admin.role = Role::Admin;
        admin.id = 42;

        let token = codec.issue(&admin, TokenKind::Access).unwrap();
        let claims = codec.parse_claims(&token).unwrap();
        assert_eq!(claims.sub, "root");
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.user_role, "ADMIN");
        assert_eq!(claims.authorities, vec!["ROLE_ADMIN".to_string()]);
        assert_eq!(claims.full_name, "Test User");
        assert!(claims.enabled);
        assert_eq!(claims.token_type, TokenKind::Access);
        assert_eq!(claims.iat, TEST_NOW_MS / 1000);
        assert_eq!(claims.exp, TEST_NOW_MS / 1000 + 86_400);
        assert_eq!(claims.exp_ms, TEST_NOW_MS + 86_400_000);
    }

    #[test]
    fn refresh_tokens_use_the_refresh_window() {
        let (codec, _) = codec();
        let pair = codec.issue_pair(&user("alice")).unwrap();
        let refresh = codec.parse_claims(&pair.refresh_token).unwrap();
        assert_eq!(refresh.token_type, TokenKind::Refresh);
        assert_eq!(refresh.exp - refresh.iat, 604_800);
        let access = codec.parse_claims(&pair.access_token).unwrap();
        assert_eq!(access.token_type, TokenKind::Access);
    }

    #[test]
    fn expires_in_truncates_to_seconds() {
        let clock = Arc::new(ManualClock::new(TEST_NOW_MS));
        assert_eq!(codec_with(clock.clone(), 86_400_000, 1000).access_expires_in_secs(), 86_400);
        assert_eq!(codec_with(clock, 1_999, 1000).access_expires_in_secs(), 1);
    }

    #[test]
    fn subject_mismatch_is_invalid() {
        let (codec, _) = codec();
        let token = codec.issue(&user("alice"), TokenKind::Access).unwrap();
        assert!(codec.is_valid(&token, &user("alice")));
        assert!(!codec.is_valid(&token, &user("bob")));
    }

    #[test]
    fn expired_token_is_distinguishable() {
        let (codec, clock) = codec();
        let token = codec.issue(&user("alice"), TokenKind::Access).unwrap();
        clock.advance(86_400_000 + 1);
        assert_eq!(codec.parse_claims(&token), Err(TokenError::Expired));
        assert_eq!(codec.extract_subject(&token), Err(TokenError::Expired));
        assert!(codec.is_expired(&token));
        assert!(!codec.is_valid(&token, &user("alice")));
    }

    #[test]
    fn sub_second_issue_instant_keeps_full_window() {
        let clock = Arc::new(ManualClock::new(TEST_NOW_MS + 500));
        let codec = codec_with(clock.clone(), 1000, 1000);
        let token = codec.issue(&user("alice"), TokenKind::Access).unwrap();

        let claims = codec.parse_claims(&token).unwrap();
        assert_eq!(claims.exp_ms, TEST_NOW_MS + 1_500);
        assert_eq!(claims.exp, TEST_NOW_MS / 1000 + 1);

        clock.set(TEST_NOW_MS + 500 + 999);
        assert!(codec.parse_claims(&token).is_ok());
        assert!(!codec.is_expired(&token));

        clock.set(TEST_NOW_MS + 500 + 1000);
        assert!(codec.parse_claims(&token).is_ok());

        clock.set(TEST_NOW_MS + 500 + 1001);
        assert_eq!(codec.parse_claims(&token), Err(TokenError::Expired));
        assert!(codec.is_expired(&token));
    }

    #[test]
    fn huge_ttl_saturates_instead_of_overflowing() {
        let clock = Arc::new(ManualClock::new(TEST_NOW_MS));
        let codec = codec_with(clock.clone(), i64::MAX, i64::MAX);
        let pair = codec.issue_pair(&user("alice")).unwrap();

        let claims = codec.parse_claims(&pair.access_token).unwrap();
        assert_eq!(claims.exp_ms, i64::MAX);
        assert_eq!(claims.exp, i64::MAX / 1000);
        clock.advance(10 * 365 * 86_400_000);
        assert!(codec.is_valid(&pair.refresh_token, &user("alice")));
    }

    #[test]
    fn empty_and_garbage_tokens_fail_closed() {
        let (codec, _) = codec();
        assert_eq!(codec.parse_claims(""), Err(TokenError::Empty));
        assert_eq!(codec.parse_claims("   "), Err(TokenError::Empty));
        assert_eq!(codec.parse_claims("abc.def.ghi"), Err(TokenError::Malformed));
        assert!(codec.is_expired("not-a-token"));
        assert!(!codec.is_valid("not-a-token", &user("alice")));
    }

    #[test]
    fn tampered_payload_fails_signature_check() {
        let (codec, _) = codec();
        let token = codec.issue(&user("alice"), TokenKind::Access).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let payload = URL_SAFE_NO_PAD.decode(parts[1]).unwrap();
        let forged = String::from_utf8(payload).unwrap().replace("\"alice\"", "\"mallory\"");
        let forged_token = format!("{}.{}.{}", parts[0], URL_SAFE_NO_PAD.encode(forged), parts[2]);

        assert_eq!(codec.parse_claims(&forged_token), Err(TokenError::SignatureInvalid));
        assert!(codec.is_expired(&forged_token));
        assert!(!codec.is_valid(&forged_token, &user("mallory")));
    }

    #[test]
    fn token_signed_with_another_key_is_rejected() {
        let clock = Arc::new(ManualClock::new(TEST_NOW_MS));
        let mut other_config = jwt_config(86_400_000, 86_400_000);
        other_config.secret = "AQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQE=".to_string();
        let other = TokenCodec::new(&other_config, clock.clone()).unwrap();
        let codec = codec_with(clock, 86_400_000, 86_400_000);

        let token = other.issue(&user("alice"), TokenKind::Access).unwrap();
        assert_eq!(codec.parse_claims(&token), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn non_hs256_header_is_unsupported() {
        let (codec, _) = codec();
        let token = codec.issue(&user("alice"), TokenKind::Access).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS512","typ":"JWT"}"#);
        let swapped = format!("{header}.{}.{}", parts[1], parts[2]);
        assert_eq!(codec.parse_claims(&swapped), Err(TokenError::Unsupported));
    }

    proptest! {
        #[test]
        fn prop_round_trip_preserves_subject(
            username in "[a-z][a-z0-9_]{2,30}",
            refresh in any::<bool>(),
        ) {
            let (codec, _) = codec();
            let kind = if refresh { TokenKind::Refresh } else { TokenKind::Access };
            let token = codec.issue(&user(&username), kind).unwrap();

            prop_assert_eq!(codec.extract_subject(&token).unwrap(), username.clone());
            prop_assert_eq!(codec.parse_claims(&token).unwrap().token_type, kind);
            prop_assert!(!codec.is_expired(&token));
            prop_assert!(codec.is_valid(&token, &user(&username)));
        }

        #[test]
        fn prop_expiry_is_monotonic(
            issue_ms in 1_600_000_000_000i64..1_900_000_000_000,
            window_ms in 1i64..1_000_000_000,
        ) {
            let clock = Arc::new(ManualClock::new(issue_ms));
            let codec = codec_with(clock.clone(), window_ms, window_ms);
            let token = codec.issue(&user("alice"), TokenKind::Access).unwrap();

            clock.set(issue_ms + window_ms - 1);
            prop_assert!(codec.parse_claims(&token).is_ok());
            prop_assert!(!codec.is_expired(&token));

            clock.set(issue_ms + window_ms);
            prop_assert!(codec.parse_claims(&token).is_ok());

            clock.set(issue_ms + window_ms + 1);
            prop_assert_eq!(codec.parse_claims(&token), Err(TokenError::Expired));
            prop_assert!(codec.is_expired(&token));
        }

        #[test]
        fn prop_arbitrary_input_fails_closed(input in ".{0,200}") {
            let (codec, _) = codec();
            prop_assert!(codec.parse_claims(&input).is_err());
            prop_assert!(codec.is_expired(&input));
            prop_assert!(!codec.is_valid(&input, &user("alice")));
        }
    }
}
