//! Path-based security policy: which routes need authentication, which
//! roles they require, and which row scopes they ask for.
//!
//! ```yaml
//! security:
//!   auth:
//!     authorization_header: Authorization
//!     bearer_prefix: Bearer
//!   default:
//!     auth_required: true
//!     required_roles: []
//!     filter_by_department: false
//!     require_sensitive_permission: false
//!   routes:
//!     - path: /health
//!       auth_required: false
//!     - path: /employees/{id}
//!       methods: [GET]
//!       filter_by_department: true
//!   permissions:
//!     view_cross_department:
//!       roles: [admin]
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use gatekit_rbac::{MethodSet, PathTemplate};
use gatekit_security::ScopingFlags;
use serde::Deserialize;

use crate::error::RoutePolicyError;

/// Where the bearer credential is read from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BearerSettings {
    pub authorization_header: String,
    pub bearer_prefix: String,
}

impl Default for BearerSettings {
    fn default() -> Self {
        Self {
            authorization_header: "Authorization".to_owned(),
            bearer_prefix: "Bearer".to_owned(),
        }
    }
}

/// Policy applied when no route rule matches. All fields are required when
/// the block is present; when absent, authentication is required.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultPolicy {
    pub auth_required: bool,
    pub required_roles: BTreeSet<String>,
    pub filter_by_department: bool,
    pub require_sensitive_permission: bool,
}

impl Default for DefaultPolicy {
    fn default() -> Self {
        Self {
            auth_required: true,
            required_roles: BTreeSet::new(),
            filter_by_department: false,
            require_sensitive_permission: false,
        }
    }
}

impl DefaultPolicy {
    fn effective(&self) -> EffectiveRoutePolicy {
        EffectiveRoutePolicy {
            auth_required: self.auth_required,
            required_roles: self.required_roles.clone(),
            scoping: ScopingFlags {
                filter_by_department: self.filter_by_department,
                require_sensitive_permission: self.require_sensitive_permission,
            },
        }
    }
}

/// A route rule. Unset fields inherit from [`DefaultPolicy`].
#[derive(Debug)]
pub struct RouteRule {
    template: PathTemplate,
    methods: MethodSet,
    auth_required: Option<bool>,
    required_roles: Option<BTreeSet<String>>,
    filter_by_department: Option<bool>,
    require_sensitive_permission: Option<bool>,
}

impl RouteRule {
    #[must_use]
    pub fn path(&self) -> &str {
        self.template.as_str()
    }

    #[must_use]
    pub fn methods(&self) -> &MethodSet {
        &self.methods
    }

    /// Any explicit requirement makes the route auth-required unless
    /// `auth_required` itself is set.
    fn carries_requirements(&self) -> bool {
        self.required_roles.as_ref().is_some_and(|r| !r.is_empty())
            || self.filter_by_department == Some(true)
            || self.require_sensitive_permission == Some(true)
    }

    fn effective(&self, default: &DefaultPolicy) -> EffectiveRoutePolicy {
        let inferred = default.auth_required || self.carries_requirements();
        EffectiveRoutePolicy {
            auth_required: self.auth_required.unwrap_or(inferred),
            // An empty list inherits the default gate.
            required_roles: self
                .required_roles
                .clone()
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| default.required_roles.clone()),
            scoping: ScopingFlags {
                filter_by_department: self
                    .filter_by_department
                    .unwrap_or(default.filter_by_department),
                require_sensitive_permission: self
                    .require_sensitive_permission
                    .unwrap_or(default.require_sensitive_permission),
            },
        }
    }
}

/// Fully resolved policy for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveRoutePolicy {
    pub auth_required: bool,
    pub required_roles: BTreeSet<String>,
    pub scoping: ScopingFlags,
}

/// Validated route-policy document.
#[derive(Debug, Default)]
pub struct SecurityPolicy {
    auth: BearerSettings,
    default: DefaultPolicy,
    routes: Vec<RouteRule>,
    capabilities: BTreeMap<String, BTreeSet<String>>,
}

impl SecurityPolicy {
    /// Parse and validate a route-policy document.
    ///
    /// # Errors
    ///
    /// Returns [`RoutePolicyError`] if the document is not valid YAML, has
    /// no `security` key, or contains an invalid route.
    pub fn from_yaml_str(text: &str) -> Result<Self, RoutePolicyError> {
        let raw: RawDocument = if text.trim().is_empty() {
            RawDocument::default()
        } else {
            serde_saphyr::from_str(text).map_err(|e| RoutePolicyError::Malformed(e.to_string()))?
        };
        raw.security
            .ok_or(RoutePolicyError::MissingSecurityKey)?
            .validate()
    }

    #[must_use]
    pub fn auth(&self) -> &BearerSettings {
        &self.auth
    }

    #[must_use]
    pub fn default_policy(&self) -> &DefaultPolicy {
        &self.default
    }

    #[must_use]
    pub fn routes(&self) -> &[RouteRule] {
        &self.routes
    }

    /// Capability name to the roles granting it.
    #[must_use]
    pub fn capabilities(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.capabilities
    }

    /// Resolve the policy for `(path, method)`.
    ///
    /// An exact path-string match wins, then the first matching template in
    /// declaration order, then the default.
    #[must_use]
    pub fn match_route(&self, path: &str, method: &str) -> EffectiveRoutePolicy {
        let matched = self
            .rules_for(method)
            .find(|r| r.path() == path)
            .or_else(|| self.rules_for(method).find(|r| r.template.matches(path)));

        matched.map_or_else(
            || self.default.effective(),
            |rule| {
                tracing::trace!(method, path, rule = rule.path(), "route policy matched");
                rule.effective(&self.default)
            },
        )
    }

    fn rules_for<'a>(&'a self, method: &'a str) -> impl Iterator<Item = &'a RouteRule> {
        self.routes.iter().filter(move |r| r.methods.contains(method))
    }

    /// Names of the capabilities granted by any of `roles`.
    #[must_use]
    pub fn capabilities_for(&self, roles: &BTreeSet<String>) -> BTreeSet<String> {
        self.capabilities
            .iter()
            .filter(|(_, granted)| !granted.is_disjoint(roles))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Read and validate a route-policy file.
///
/// # Errors
///
/// Returns [`RoutePolicyError::Io`] if the file cannot be read, otherwise the
/// validation error.
pub fn load_security_policy(path: impl AsRef<Path>) -> Result<SecurityPolicy, RoutePolicyError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| RoutePolicyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let policy = SecurityPolicy::from_yaml_str(&text)?;
    tracing::info!(
        path = %path.display(),
        routes = policy.routes.len(),
        capabilities = policy.capabilities.len(),
        "route policy loaded"
    );
    Ok(policy)
}

// ---- raw document -------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct RawDocument {
    #[serde(default)]
    security: Option<RawSecurity>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSecurity {
    auth: BearerSettings,
    default: Option<DefaultPolicy>,
    routes: Vec<RawRoute>,
    permissions: BTreeMap<String, RawCapability>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRoute {
    path: String,
    methods: Option<Vec<String>>,
    auth_required: Option<bool>,
    required_roles: Option<BTreeSet<String>>,
    filter_by_department: Option<bool>,
    require_sensitive_permission: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawCapability {
    roles: BTreeSet<String>,
}

impl RawSecurity {
    fn validate(self) -> Result<SecurityPolicy, RoutePolicyError> {
        let routes = self
            .routes
            .into_iter()
            .map(RawRoute::compile)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SecurityPolicy {
            auth: self.auth,
            default: self.default.unwrap_or_default(),
            routes,
            capabilities: self
                .permissions
                .into_iter()
                .map(|(name, cap)| (name, cap.roles))
                .collect(),
        })
    }
}

impl RawRoute {
    fn compile(self) -> Result<RouteRule, RoutePolicyError> {
        let template =
            PathTemplate::parse(&self.path).map_err(|e| RoutePolicyError::InvalidPathTemplate {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        let methods: MethodSet = match self.methods {
            Some(methods) => methods.into_iter().collect(),
            None => ["GET"].into_iter().collect(),
        };
        if methods.is_empty() {
            return Err(RoutePolicyError::EmptyMethods { path: self.path });
        }

        Ok(RouteRule {
            template,
            methods,
            auth_required: self.auth_required,
            required_roles: self.required_roles,
            filter_by_department: self.filter_by_department,
            require_sensitive_permission: self.require_sensitive_permission,
        })
    }
}
