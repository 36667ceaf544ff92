//! Transitive effective-permission resolution over the `extends` graph.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::config::RbacConfig;
use crate::error::ConfigError;

/// Role name to the full set of permission names it grants.
pub type EffectivePermissions = BTreeMap<String, BTreeSet<String>>;

/// Compute the effective permission set of every role.
///
/// A role's set is its direct permissions unioned with its parent's
/// effective set. Each role is resolved once (memoized); an in-progress
/// marker detects cycles.
///
/// # Errors
///
/// Returns [`ConfigError::InheritanceCycle`] naming the first role seen twice
/// on the current traversal path, or [`ConfigError::UnknownParentRole`] for a
/// dangling `extends`.
pub fn compute_effective(config: &RbacConfig) -> Result<EffectivePermissions, ConfigError> {
    let mut memo = EffectivePermissions::new();
    let mut visiting = HashSet::new();
    for name in config.roles().keys() {
        resolve(config, name, &mut memo, &mut visiting)?;
    }
    Ok(memo)
}

fn resolve(
    config: &RbacConfig,
    name: &str,
    memo: &mut EffectivePermissions,
    visiting: &mut HashSet<String>,
) -> Result<BTreeSet<String>, ConfigError> {
    if let Some(done) = memo.get(name) {
        return Ok(done.clone());
    }
    if !visiting.insert(name.to_owned()) {
        return Err(ConfigError::InheritanceCycle {
            role: name.to_owned(),
        });
    }

    let Some(role) = config.role(name) else {
        visiting.remove(name);
        return Ok(BTreeSet::new());
    };

    let mut effective = role.permissions.clone();
    if let Some(parent) = &role.extends {
        if config.role(parent).is_none() {
            return Err(ConfigError::UnknownParentRole {
                role: name.to_owned(),
                parent: parent.clone(),
            });
        }
        effective.extend(resolve(config, parent, memo, visiting)?);
    }

    visiting.remove(name);
    memo.insert(name.to_owned(), effective.clone());
    Ok(effective)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn cycle_is_reported_with_role_name() {
        let err = RbacConfig::from_yaml_str(
            r"
roles:
  a:
    extends: b
  b:
    extends: a
",
        )
        .unwrap_err();
        assert!(
            matches!(&err, ConfigError::InheritanceCycle { role } if role == "a"),
            "{err:?}"
        );
    }

    #[test]
    fn self_extension_is_a_cycle() {
        let err = RbacConfig::from_yaml_str(
            r"
roles:
  solo:
    extends: solo
",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InheritanceCycle { .. }), "{err:?}");
    }
}
