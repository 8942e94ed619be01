//! Short-lived access tokens (JWT, ES256).
//!
//! The only private claim is the exported service the token opens. The key
//! pair lives in memory for the life of the process and is never rotated,
//! so a restart invalidates outstanding tokens.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rcgen::KeyPair;
use serde::{Deserialize, Serialize};

use crossgate_core::error::{CrossgateError, Result};

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    service: String,
    iat: u64,
    exp: u64,
}

pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Fresh P-256 key pair.
    pub fn generate(ttl: Duration) -> Result<Self> {
        let key_pair = KeyPair::generate()
            .map_err(|e| CrossgateError::Internal(format!("failed to generate signing key: {e}")))?;
        Self::from_key_pair(&key_pair, ttl)
    }

    /// Load a PKCS#8 P-256 private key.
    pub fn from_pem(pem: &str, ttl: Duration) -> Result<Self> {
        let key_pair = KeyPair::from_pem(pem)
            .map_err(|e| CrossgateError::BadRequest(format!("failed to parse signing key: {e}")))?;
        if key_pair.algorithm() != &rcgen::PKCS_ECDSA_P256_SHA256 {
            return Err(CrossgateError::BadRequest(
                "signing key must be an ECDSA P-256 key".into(),
            ));
        }
        Self::from_key_pair(&key_pair, ttl)
    }

    fn from_key_pair(key_pair: &KeyPair, ttl: Duration) -> Result<Self> {
        let encoding = EncodingKey::from_ec_pem(key_pair.serialize_pem().as_bytes())
            .map_err(|e| CrossgateError::Internal(format!("invalid signing key: {e}")))?;
        let decoding = DecodingKey::from_ec_pem(key_pair.public_key_pem().as_bytes())
            .map_err(|e| CrossgateError::Internal(format!("invalid verification key: {e}")))?;

        let mut validation = Validation::new(Algorithm::ES256);
        // Tokens only live a few seconds; any leeway would multiply that.
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding,
            decoding,
            validation,
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn mint(&self, service: &str) -> Result<String> {
        self.mint_at(service, unix_now())
    }

    /// Mint as if issued at `issued_at` (seconds since the epoch).
    pub fn mint_at(&self, service: &str, issued_at: u64) -> Result<String> {
        let claims = AccessClaims {
            service: service.to_string(),
            iat: issued_at,
            exp: issued_at + self.ttl.as_secs(),
        };
        encode(&Header::new(Algorithm::ES256), &claims, &self.encoding)
            .map_err(|e| CrossgateError::Internal(format!("failed to sign access token: {e}")))
    }

    /// Check signature and expiry; returns the service the token opens.
    pub fn verify(&self, token: &str) -> Result<String> {
        let data = decode::<AccessClaims>(token, &self.decoding, &self.validation).map_err(|e| {
            tracing::warn!(error = %e, "access token rejected");
            CrossgateError::AuthFailed
        })?;
        Ok(data.claims.service)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
