//! Policy document model and loader.
//!
//! ```yaml
//! roles:
//!   reader:
//!     extends: null
//!     permissions: [docs.read]
//! permissions:
//!   docs.read:
//!     public: false
//!     rules:
//!       - path: /docs
//!         methods: [GET]
//! public:
//!   - path: /status
//!     methods: [GET]
//! ```
//!
//! Validation stops at the first problem found. The order is fixed:
//! permission rules (by permission name), `extends` targets (by role name),
//! referenced permission names (by role name), top-level public rules (in
//! declaration order), and finally inheritance cycles.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::path::{MethodSet, PathTemplate};
use crate::resolver::compute_effective;

/// A single `(path template, methods)` rule.
#[derive(Debug, PartialEq, Eq)]
pub struct RbacRule {
    template: PathTemplate,
    methods: MethodSet,
}

impl RbacRule {
    #[must_use]
    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    #[must_use]
    pub fn methods(&self) -> &MethodSet {
        &self.methods
    }

    /// Method is in the set and the template matches the path.
    #[must_use]
    pub fn matches(&self, method: &str, path: &str) -> bool {
        self.methods.contains(method) && self.template.matches(path)
    }
}

#[derive(Debug)]
pub struct PermissionDefinition {
    pub name: String,
    pub rules: Vec<RbacRule>,
    /// Every rule of a public permission is also a public rule.
    pub public: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDefinition {
    pub name: String,
    pub permissions: BTreeSet<String>,
    pub extends: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
}

/// Validated, immutable policy snapshot.
#[derive(Debug, Default)]
pub struct RbacConfig {
    roles: BTreeMap<String, RoleDefinition>,
    permissions: BTreeMap<String, PermissionDefinition>,
    public_rules: Vec<RbacRule>,
}

impl RbacConfig {
    /// Parse and validate a YAML policy document.
    ///
    /// An empty document yields an empty policy that denies everything.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] describing the first problem found.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawDocument = if text.trim().is_empty() {
            RawDocument::default()
        } else {
            serde_saphyr::from_str(text).map_err(|e| ConfigError::Malformed(e.to_string()))?
        };
        raw.validate()
    }

    #[must_use]
    pub fn roles(&self) -> &BTreeMap<String, RoleDefinition> {
        &self.roles
    }

    #[must_use]
    pub fn role(&self, name: &str) -> Option<&RoleDefinition> {
        self.roles.get(name)
    }

    #[must_use]
    pub fn permissions(&self) -> &BTreeMap<String, PermissionDefinition> {
        &self.permissions
    }

    /// Top-level `public:` rules only; see [`RbacConfig::all_public_rules`].
    #[must_use]
    pub fn public_rules(&self) -> &[RbacRule] {
        &self.public_rules
    }

    /// Top-level public rules followed by the rules of public permissions.
    pub fn all_public_rules(&self) -> impl Iterator<Item = &RbacRule> {
        self.public_rules.iter().chain(
            self.permissions
                .values()
                .filter(|p| p.public)
                .flat_map(|p| p.rules.iter()),
        )
    }
}

/// Read, parse and validate a policy file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
/// first validation error.
pub fn load_rbac_config(path: impl AsRef<Path>) -> Result<RbacConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = RbacConfig::from_yaml_str(&text)?;
    tracing::info!(
        path = %path.display(),
        roles = config.roles.len(),
        permissions = config.permissions.len(),
        "RBAC policy loaded"
    );
    Ok(config)
}

// ---- raw document -------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct RawDocument {
    #[serde(default)]
    roles: Option<BTreeMap<String, RawRole>>,
    #[serde(default)]
    permissions: Option<BTreeMap<String, RawPermission>>,
    #[serde(default)]
    public: Option<Vec<RawRule>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRole {
    extends: Option<String>,
    permissions: Option<Vec<String>>,
    display_name: Option<String>,
    #[serde(alias = "Description")]
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPermission {
    public: bool,
    rules: Option<Vec<RawRule>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawRule {
    path: Option<String>,
    methods: Option<Vec<String>>,
}

impl RawRule {
    fn compile(self, owner: &str) -> Result<RbacRule, ConfigError> {
        let path = self.path.unwrap_or_default().trim().to_owned();
        if path.is_empty() {
            return Err(ConfigError::MissingPath {
                owner: owner.to_owned(),
            });
        }

        let methods: MethodSet = self.methods.unwrap_or_default().into_iter().collect();
        if methods.is_empty() {
            return Err(ConfigError::EmptyMethods {
                owner: owner.to_owned(),
                path,
            });
        }

        let template =
            PathTemplate::parse(&path).map_err(|e| ConfigError::InvalidPathTemplate {
                owner: owner.to_owned(),
                path: path.clone(),
                reason: e.to_string(),
            })?;

        Ok(RbacRule { template, methods })
    }
}

impl RawDocument {
    fn validate(self) -> Result<RbacConfig, ConfigError> {
        let mut permissions = BTreeMap::new();
        for (name, raw) in self.permissions.unwrap_or_default() {
            let owner = format!("permission '{name}'");
            let rules = raw
                .rules
                .unwrap_or_default()
                .into_iter()
                .map(|rule| rule.compile(&owner))
                .collect::<Result<Vec<_>, _>>()?;
            permissions.insert(
                name.clone(),
                PermissionDefinition {
                    name,
                    rules,
                    public: raw.public,
                },
            );
        }

        let roles: BTreeMap<String, RoleDefinition> = self
            .roles
            .unwrap_or_default()
            .into_iter()
            .map(|(name, raw)| {
                let role = RoleDefinition {
                    name: name.clone(),
                    permissions: raw.permissions.unwrap_or_default().into_iter().collect(),
                    extends: raw
                        .extends
                        .map(|p| p.trim().to_owned())
                        .filter(|p| !p.is_empty()),
                    display_name: raw.display_name,
                    description: raw.description,
                };
                (name, role)
            })
            .collect();

        for role in roles.values() {
            if let Some(parent) = &role.extends {
                if !roles.contains_key(parent) {
                    return Err(ConfigError::UnknownParentRole {
                        role: role.name.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }

        for role in roles.values() {
            let unknown: Vec<String> = role
                .permissions
                .iter()
                .filter(|p| !permissions.contains_key(p.as_str()))
                .cloned()
                .collect();
            if !unknown.is_empty() {
                return Err(ConfigError::UnknownPermission {
                    role: role.name.clone(),
                    permissions: unknown,
                });
            }
        }

        let public_rules = self
            .public
            .unwrap_or_default()
            .into_iter()
            .map(|rule| rule.compile("public"))
            .collect::<Result<Vec<_>, _>>()?;

        let config = RbacConfig {
            roles,
            permissions,
            public_rules,
        };
        compute_effective(&config)?;
        Ok(config)
    }
}
