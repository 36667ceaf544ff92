#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{TestKey, claims, config, jwks, sign};
use gatekit_auth::{JwtValidator, TokenValidator, ValidationError};
use httpmock::prelude::*;

const KEYS_PATH: &str = "/tenant-1/discovery/v2.0/keys";

#[tokio::test]
async fn key_set_is_fetched_once_across_validations() {
    let server = MockServer::start_async().await;
    let keys = server
        .mock_async(|when, then| {
            when.method(GET).path(KEYS_PATH);
            then.status(200).json_body(jwks(&[TestKey::A]));
        })
        .await;

    let config = config(&server.base_url(), false);
    let validator = JwtValidator::from_config(&config).unwrap();
    let token = sign(TestKey::A, &claims(&config.issuer()));

    let first = validator.validate(&token).await.unwrap();
    let second = validator.validate(&token).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.user_id(), common::USER_OID);
    keys.assert_calls_async(1).await;
}

#[tokio::test]
async fn rotated_key_triggers_single_refresh() {
    let server = MockServer::start_async().await;
    let mut old_keys = server
        .mock_async(|when, then| {
            when.method(GET).path(KEYS_PATH);
            then.status(200).json_body(jwks(&[TestKey::A]));
        })
        .await;

    let config = config(&server.base_url(), false);
    let validator = JwtValidator::from_config(&config).unwrap();
    validator
        .validate(&sign(TestKey::A, &claims(&config.issuer())))
        .await
        .unwrap();
    old_keys.assert_calls_async(1).await;
    old_keys.delete_async().await;

    let new_keys = server
        .mock_async(|when, then| {
            when.method(GET).path(KEYS_PATH);
            then.status(200).json_body(jwks(&[TestKey::A, TestKey::B]));
        })
        .await;

    let identity = validator
        .validate(&sign(TestKey::B, &claims(&config.issuer())))
        .await
        .unwrap();
    assert_eq!(identity.roles(), ["reader"]);
    new_keys.assert_calls_async(1).await;
}

#[tokio::test]
async fn unknown_kid_is_rejected_after_one_refresh() {
    let server = MockServer::start_async().await;
    let keys = server
        .mock_async(|when, then| {
            when.method(GET).path(KEYS_PATH);
            then.status(200).json_body(jwks(&[TestKey::A]));
        })
        .await;

    let config = config(&server.base_url(), false);
    let validator = JwtValidator::from_config(&config).unwrap();
    validator
        .validate(&sign(TestKey::A, &claims(&config.issuer())))
        .await
        .unwrap();

    let err = validator
        .validate(&sign(TestKey::B, &claims(&config.issuer())))
        .await
        .unwrap_err();
    assert!(matches!(err, ValidationError::UnknownKey), "{err:?}");
    keys.assert_calls_async(2).await;
}

#[tokio::test]
async fn unreachable_key_set_fails_closed() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(KEYS_PATH);
            then.status(503);
        })
        .await;

    let config = config(&server.base_url(), false);
    let validator = JwtValidator::from_config(&config).unwrap();
    let err = validator
        .validate(&sign(TestKey::A, &claims(&config.issuer())))
        .await
        .unwrap_err();
    assert!(matches!(err, ValidationError::KeySetUnavailable(_)), "{err:?}");
    assert_eq!(err.to_string(), "Signing keys unavailable");
}

#[tokio::test]
async fn issuer_is_bound_to_the_tenant() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(KEYS_PATH);
            then.status(200).json_body(jwks(&[TestKey::A]));
        })
        .await;

    let config = config(&server.base_url(), false);
    let validator = JwtValidator::from_config(&config).unwrap();
    let foreign_issuer = format!("{}/other-tenant/v2.0", server.base_url());
    let err = validator
        .validate(&sign(TestKey::A, &claims(&foreign_issuer)))
        .await
        .unwrap_err();
    assert!(matches!(err, ValidationError::InvalidIssuer), "{err:?}");
}

#[tokio::test]
async fn unsupported_entries_in_key_set_are_skipped() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(KEYS_PATH);
            then.status(200).json_body(serde_json::json!({
                "keys": [
                    { "kty": "weird", "kid": "legacy" },
                    TestKey::A.jwk(),
                ]
            }));
        })
        .await;

    let config = config(&server.base_url(), false);
    let validator = JwtValidator::from_config(&config).unwrap();
    assert!(
        validator
            .validate(&sign(TestKey::A, &claims(&config.issuer())))
            .await
            .is_ok()
    );
}
