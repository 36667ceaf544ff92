//! Claim names and extraction of an [`Identity`] from verified claims.

use gatekit_security::Identity;
use serde_json::Value;

use crate::errors::ValidationError;

/// Claim names read from access tokens.
pub struct StandardClaim;

impl StandardClaim {
    /// Stable, tenant-wide object id. Preferred user id.
    pub const OID: &'static str = "oid";
    /// Pairwise subject, unique per user and application.
    pub const SUB: &'static str = "sub";
    pub const ROLES: &'static str = "roles";
    /// Delegated scopes, space separated or a list.
    pub const SCP: &'static str = "scp";
    pub const DEPARTMENT: &'static str = "department";
    pub const PREFERRED_USERNAME: &'static str = "preferred_username";
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    value
        .and_then(scalar_string)
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_string).collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Canonical subject: `oid` when present, otherwise `sub`.
#[must_use]
pub fn subject_id(claims: &Value) -> Option<String> {
    non_empty(claims.get(StandardClaim::OID)).or_else(|| non_empty(claims.get(StandardClaim::SUB)))
}

/// Build an identity from claims whose signature and standard checks passed.
///
/// # Errors
///
/// Returns [`ValidationError::MissingClaim`] when neither `oid` nor `sub`
/// carries a usable value.
pub fn extract_identity(claims: &Value) -> Result<Identity, ValidationError> {
    let user_id =
        subject_id(claims).ok_or_else(|| ValidationError::MissingClaim(StandardClaim::SUB.to_owned()))?;

    let scopes = match claims.get(StandardClaim::SCP) {
        Some(Value::String(s)) => s.split_whitespace().map(str::to_owned).collect(),
        Some(Value::Array(items)) => items.iter().filter_map(scalar_string).collect(),
        _ => Vec::new(),
    };

    Ok(Identity::builder(user_id)
        .roles(string_list(claims.get(StandardClaim::ROLES)))
        .department(non_empty(claims.get(StandardClaim::DEPARTMENT)))
        .scopes(scopes)
        .preferred_username(
            claims
                .get(StandardClaim::PREFERRED_USERNAME)
                .and_then(scalar_string),
        )
        .build())
}
