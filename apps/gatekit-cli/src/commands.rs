use std::io::Write;
use std::path::Path;

use anyhow::Context;
use gatekit_auth::AuthConfig;
use gatekit_authz::load_security_policy;
use gatekit_rbac::RbacEngine;

fn load_engine(path: &Path) -> anyhow::Result<RbacEngine> {
    RbacEngine::from_path(path).with_context(|| format!("invalid policy {}", path.display()))
}

pub fn lint_policy(path: &Path, out: &mut impl Write) -> anyhow::Result<()> {
    let engine = load_engine(path)?;
    let config = engine.config();
    writeln!(
        out,
        "{}: {} roles, {} permissions, {} public rules",
        path.display(),
        config.roles().len(),
        config.permissions().len(),
        config.all_public_rules().count()
    )?;
    for role in config.roles().values() {
        let effective = engine
            .effective_permissions(&role.name)
            .map(|perms| perms.iter().map(String::as_str).collect::<Vec<_>>().join(", "))
            .unwrap_or_default();
        match &role.extends {
            Some(parent) => writeln!(out, "  {} (extends {parent}): [{effective}]", role.name)?,
            None => writeln!(out, "  {}: [{effective}]", role.name)?,
        }
    }
    Ok(())
}

/// Returns whether the request is allowed.
pub fn check(
    policy: &Path,
    roles: &[String],
    method: &str,
    path: &str,
    out: &mut impl Write,
) -> anyhow::Result<bool> {
    let engine = load_engine(policy)?;
    let allowed = engine.is_allowed(roles, method, path);

    let verdict = if allowed { "ALLOW" } else { "DENY" };
    writeln!(out, "{verdict} {} {path}", method.to_ascii_uppercase())?;
    if engine.is_public(method, path) {
        writeln!(out, "  public rule matched")?;
    } else {
        let required = engine.required_permissions(method, path);
        if required.is_empty() {
            writeln!(out, "  no permission rule matches")?;
        } else {
            let required = required.into_iter().collect::<Vec<_>>().join(", ");
            writeln!(out, "  requires any of: [{required}]")?;
        }
    }
    Ok(allowed)
}

pub fn route(routes: &Path, method: &str, path: &str, out: &mut impl Write) -> anyhow::Result<()> {
    let policy = load_security_policy(routes)
        .with_context(|| format!("invalid route policy {}", routes.display()))?;
    let effective = policy.match_route(path, method);

    let roles = effective
        .required_roles
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    writeln!(out, "{} {path}", method.to_ascii_uppercase())?;
    writeln!(out, "  auth_required: {}", effective.auth_required)?;
    writeln!(out, "  required_roles: [{roles}]")?;
    writeln!(
        out,
        "  filter_by_department: {}",
        effective.scoping.filter_by_department
    )?;
    writeln!(
        out,
        "  require_sensitive_permission: {}",
        effective.scoping.require_sensitive_permission
    )?;
    Ok(())
}

pub fn auth_config(path: Option<&Path>, out: &mut impl Write) -> anyhow::Result<()> {
    let config = AuthConfig::load(path).context("invalid auth configuration")?;
    writeln!(out, "issuer: {}", config.issuer())?;
    writeln!(out, "jwks_uri: {}", config.jwks_uri())?;
    writeln!(out, "audience: {}", config.expected_audience())?;
    writeln!(out, "fallback_enabled: {}", config.fallback_enabled)?;
    if config.fallback_enabled {
        writeln!(out, "token_endpoint: {}", config.token_endpoint())?;
        let secret = if config.client_secret.is_some() { "set" } else { "missing" };
        writeln!(out, "client_secret: {secret}")?;
    }
    Ok(())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn output(run: impl FnOnce(&mut Vec<u8>) -> anyhow::Result<()>) -> String {
        let mut buf = Vec::new();
        run(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    const POLICY: &str = r"
roles:
  reader:
    permissions: [docs.read]
  editor:
    extends: reader
    permissions: [docs.write]
permissions:
  docs.read:
    rules:
      - path: /docs
        methods: [GET]
  docs.write:
    rules:
      - path: /docs
        methods: [POST]
public:
  - path: /status
    methods: [GET]
";

    #[test]
    fn lint_prints_effective_permissions() {
        let policy = file(POLICY);
        let text = output(|out| lint_policy(policy.path(), out));
        assert!(text.contains("2 roles, 2 permissions, 1 public rules"), "{text}");
        assert!(text.contains("editor (extends reader): [docs.read, docs.write]"), "{text}");
        assert!(text.contains("reader: [docs.read]"), "{text}");
    }

    #[test]
    fn lint_reports_invalid_policy() {
        let policy = file("roles:\n  a:\n    extends: ghost\n");
        let err = lint_policy(policy.path(), &mut Vec::new()).unwrap_err();
        assert!(format!("{err:#}").contains("unknown role 'ghost'"));
    }

    #[test]
    fn check_reports_verdict() {
        let policy = file(POLICY);
        let roles = vec!["reader".to_owned()];

        let mut out = Vec::new();
        assert!(check(policy.path(), &roles, "get", "/docs", &mut out).unwrap());
        assert!(String::from_utf8(out).unwrap().starts_with("ALLOW GET /docs"));

        let mut out = Vec::new();
        assert!(!check(policy.path(), &roles, "POST", "/docs", &mut out).unwrap());
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("requires any of: [docs.write]"), "{text}");

        let mut out = Vec::new();
        assert!(check(policy.path(), &[], "GET", "/status", &mut out).unwrap());
        assert!(String::from_utf8(out).unwrap().contains("public rule matched"));
    }

    #[test]
    fn route_prints_effective_policy() {
        let routes = file(
            r#"
security:
  routes:
    - path: "/employees/{id}"
      required_roles: [hr_manager]
      filter_by_department: true
"#,
        );
        let text = output(|out| route(routes.path(), "GET", "/employees/9", out));
        assert!(text.contains("auth_required: true"), "{text}");
        assert!(text.contains("required_roles: [hr_manager]"), "{text}");
        assert!(text.contains("filter_by_department: true"), "{text}");
        assert!(text.contains("require_sensitive_permission: false"), "{text}");
    }

    #[test]
    fn auth_config_hides_secret() {
        let config = file(
            "tenant_id: t-1\nclient_id: api\nfallback_enabled: true\nclient_secret: hunter2\n",
        );
        let text = output(|out| auth_config(Some(config.path()), out));
        assert!(
            text.contains("issuer: https://login.microsoftonline.com/t-1/v2.0"),
            "{text}"
        );
        assert!(text.contains("client_secret: set"), "{text}");
        assert!(!text.contains("hunter2"), "{text}");
    }
}
