use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::Duration;
use tracing::{debug, warn};

use super::{claims::Claims, clock::Clock, error::AuthError};
use crate::config::JwtConfig;

/// Mints and checks bearer tokens signed with the process-wide secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    issuer: String,
    audience: String,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(cfg: &JwtConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            algorithm: cfg.algorithm,
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            default_ttl: Duration::seconds(cfg.ttl_minutes.saturating_mul(60)),
            clock,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Signs a token for `subject` that expires `ttl` from now, or after the
    /// configured default when `ttl` is `None`.
    pub fn issue(&self, subject: &str, ttl: Option<Duration>) -> Result<String, AuthError> {
        let now = self.clock.now();
        let ttl = ttl.unwrap_or(self.default_ttl);
        let exp = now.checked_add(ttl).ok_or_else(|| {
            anyhow::anyhow!("token lifetime {ttl} overflows the expiry timestamp")
        })?;
        let claims = Claims {
            sub: Some(subject.to_owned()),
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .context("sign access token")?;
        debug!(subject = %subject, exp = claims.exp, "jwt signed");
        Ok(token)
    }

    /// Returns the subject email of a valid token.
    ///
    /// The signature is checked first, then expiry against the injected clock,
    /// then presence of the subject.
    pub fn verify(&self, token: &str) -> Result<String, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation()).map_err(|e| {
            warn!(error = %e, "jwt rejected");
            AuthError::Malformed
        })?;
        let claims = data.claims;

        if self.clock.now().unix_timestamp() >= claims.exp {
            debug!(exp = claims.exp, "jwt expired");
            return Err(AuthError::Expired);
        }

        let subject = claims.sub.ok_or(AuthError::MissingSubject)?;
        debug!(subject = %subject, "jwt verified");
        Ok(subject)
    }

    // Expiry is checked by hand against the injected clock, so the library's
    // own wall-clock check is switched off.
    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_string()]);
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use time::macros::datetime;
    use time::OffsetDateTime;

    const SECRET: &str = "test-secret-test-secret-test-secret!";
    const START: OffsetDateTime = datetime!(2024-03-01 09:00 UTC);

    fn jwt_config(secret: &str, issuer: &str, audience: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.into(),
            algorithm: Algorithm::HS256,
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 30,
        }
    }

    fn make_service() -> (TokenService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at(START));
        let svc = TokenService::new(&jwt_config(SECRET, "test-issuer", "test-aud"), clock.clone());
        (svc, clock)
    }

    #[test]
    fn issue_and_verify_returns_subject() {
        let (svc, _) = make_service();
        let token = svc.issue("a@x.com", None).expect("sign");
        assert_eq!(svc.verify(&token).expect("verify"), "a@x.com");
    }

    #[test]
    fn valid_until_just_before_expiry_then_expired() {
        let (svc, clock) = make_service();
        let ttl = Duration::minutes(10);
        let token = svc.issue("a@x.com", Some(ttl)).expect("sign");

        clock.set(START + ttl - Duration::seconds(1));
        assert_eq!(svc.verify(&token).expect("still valid"), "a@x.com");

        clock.set(START + ttl);
        assert!(matches!(svc.verify(&token), Err(AuthError::Expired)));

        clock.advance(Duration::days(1));
        assert!(matches!(svc.verify(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn default_ttl_is_thirty_minutes() {
        let (svc, clock) = make_service();
        assert_eq!(svc.default_ttl(), Duration::minutes(30));
        let token = svc.issue("a@x.com", None).expect("sign");

        clock.set(START + Duration::minutes(29));
        assert!(svc.verify(&token).is_ok());
        clock.set(START + Duration::minutes(30));
        assert!(matches!(svc.verify(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn oversized_ttl_is_an_error_not_a_panic() {
        let (svc, _) = make_service();
        assert!(matches!(
            svc.issue("a@x.com", Some(Duration::MAX)),
            Err(AuthError::Internal(_))
        ));
    }

    #[test]
    fn oversized_configured_ttl_does_not_panic() {
        let clock = Arc::new(ManualClock::at(START));
        let mut cfg = jwt_config(SECRET, "test-issuer", "test-aud");
        cfg.ttl_minutes = i64::MAX;
        let svc = TokenService::new(&cfg, clock);
        assert!(matches!(svc.issue("a@x.com", None), Err(AuthError::Internal(_))));
    }

    #[test]
    fn any_flipped_payload_bit_is_malformed() {
        let (svc, _) = make_service();
        let token = svc.issue("a@x.com", None).expect("sign");
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);
        let payload = parts[1].as_bytes();

        for pos in 0..payload.len() {
            let mut bytes = payload.to_vec();
            bytes[pos] ^= 0x01;
            let tampered_payload = String::from_utf8(bytes).expect("ascii stays ascii");
            let tampered = format!("{}.{}.{}", parts[0], tampered_payload, parts[2]);
            assert!(
                matches!(svc.verify(&tampered), Err(AuthError::Malformed)),
                "tampering at byte {pos} was not rejected"
            );
        }
    }

    #[test]
    fn garbage_and_foreign_secret_are_malformed() {
        let (svc, _) = make_service();
        assert!(matches!(svc.verify("not-a-jwt"), Err(AuthError::Malformed)));
        assert!(matches!(svc.verify(""), Err(AuthError::Malformed)));

        let clock = Arc::new(ManualClock::at(START));
        let other = TokenService::new(
            &jwt_config("another-secret-another-secret-!!", "test-issuer", "test-aud"),
            clock,
        );
        let token = other.issue("a@x.com", None).expect("sign");
        assert!(matches!(svc.verify(&token), Err(AuthError::Malformed)));
    }

    #[test]
    fn wrong_issuer_or_audience_is_malformed() {
        let (svc, _) = make_service();
        let clock = Arc::new(ManualClock::at(START));
        let other = TokenService::new(&jwt_config(SECRET, "bad-iss", "bad-aud"), clock);
        let token = other.issue("a@x.com", None).expect("sign");
        assert!(matches!(svc.verify(&token), Err(AuthError::Malformed)));
    }

    #[test]
    fn token_without_subject_is_missing_subject() {
        let (svc, _) = make_service();
        let claims = Claims {
            sub: None,
            iat: START.unix_timestamp(),
            exp: (START + Duration::minutes(5)).unix_timestamp(),
            iss: "test-issuer".into(),
            aud: "test-aud".into(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .expect("sign");
        assert!(matches!(svc.verify(&token), Err(AuthError::MissingSubject)));
    }

    #[test]
    fn expiry_is_reported_before_missing_subject() {
        let (svc, clock) = make_service();
        let claims = Claims {
            sub: None,
            iat: START.unix_timestamp(),
            exp: (START + Duration::minutes(5)).unix_timestamp(),
            iss: "test-issuer".into(),
            aud: "test-aud".into(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .expect("sign");
        clock.advance(Duration::hours(1));
        assert!(matches!(svc.verify(&token), Err(AuthError::Expired)));
    }
}
