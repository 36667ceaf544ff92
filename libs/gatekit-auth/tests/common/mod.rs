#![allow(dead_code)]

use std::time::{SystemTime, UNIX_EPOCH};

use gatekit_auth::{AuthConfig, SecretString};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Value, json};

pub const TENANT: &str = "tenant-1";
pub const CLIENT_ID: &str = "api-client";
pub const USER_OID: &str = "6f1c1a52-0d0e-4c61-9c57-2f3b8d1e0a11";

const PEM_A: &str = include_str!("../fixtures/signing_key_a.pem");
const PEM_B: &str = include_str!("../fixtures/signing_key_b.pem");
const MODULUS_A: &str = include_str!("../fixtures/signing_key_a.modulus");
const MODULUS_B: &str = include_str!("../fixtures/signing_key_b.modulus");

#[derive(Clone, Copy)]
pub enum TestKey {
    A,
    B,
}

impl TestKey {
    pub fn kid(self) -> &'static str {
        match self {
            Self::A => "key-a",
            Self::B => "key-b",
        }
    }

    fn pem(self) -> &'static str {
        match self {
            Self::A => PEM_A,
            Self::B => PEM_B,
        }
    }

    pub fn jwk(self) -> Value {
        let modulus = match self {
            Self::A => MODULUS_A,
            Self::B => MODULUS_B,
        };
        json!({
            "kty": "RSA",
            "use": "sig",
            "alg": "RS256",
            "kid": self.kid(),
            "n": modulus.trim(),
            "e": "AQAB",
        })
    }
}

pub fn jwks(keys: &[TestKey]) -> Value {
    json!({ "keys": keys.iter().map(|k| k.jwk()).collect::<Vec<_>>() })
}

pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Config pointing every endpoint at `base_url`.
pub fn config(base_url: &str, fallback_enabled: bool) -> AuthConfig {
    AuthConfig {
        tenant_id: TENANT.to_owned(),
        client_id: CLIENT_ID.to_owned(),
        client_secret: Some(SecretString::from("s3cret".to_owned())),
        fallback_enabled,
        authority_host: base_url.to_owned(),
        graph_base_url: format!("{base_url}/v1.0"),
        http_timeout_seconds: 5,
        ..AuthConfig::default()
    }
}

pub fn claims(issuer: &str) -> Value {
    json!({
        "iss": issuer,
        "aud": CLIENT_ID,
        "exp": now() + 600,
        "nbf": now() - 5,
        "oid": USER_OID,
        "roles": ["reader"],
        "scp": "User.Read",
    })
}

pub fn sign(key: TestKey, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(key.kid().to_owned());
    encode(
        &header,
        claims,
        &EncodingKey::from_rsa_pem(key.pem().as_bytes()).unwrap(),
    )
    .unwrap()
}
