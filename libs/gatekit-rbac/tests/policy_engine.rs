#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Write;

use gatekit_rbac::{ConfigError, RbacConfig, RbacEngine};

const POLICY: &str = r"
roles:
  reader:
    permissions: [docs.read]
  manager:
    extends: reader
    permissions: [docs.write]
  auditor:
    permissions: [audit.read]
permissions:
  docs.read:
    rules:
      - path: /docs
        methods: [GET]
      - path: /docs/{id}
        methods: [GET]
  docs.write:
    rules:
      - path: /docs
        methods: [POST]
      - path: /docs/{id}
        methods: [PUT, DELETE]
  audit.read:
    rules:
      - path: /audit
        methods: [GET]
  approve:
    rules:
      - path: /docs/{id}/approve
        methods: [POST]
  docs.publish:
    rules:
      - path: /docs/{id}/approve
        methods: [POST]
  health:
    public: true
    rules:
      - path: /health
        methods: [GET]
public:
  - path: /status
    methods: [GET]
";

fn engine() -> RbacEngine {
    RbacEngine::new(RbacConfig::from_yaml_str(POLICY).unwrap()).unwrap()
}

#[test]
fn reader_end_to_end() {
    let engine = engine();
    assert!(engine.is_allowed(["reader"], "GET", "/docs"));
    assert!(!engine.is_allowed(["reader"], "POST", "/docs"));
    assert!(!engine.is_allowed(["unknown"], "GET", "/docs"));
}

#[test]
fn method_comparison_ignores_case() {
    let engine = engine();
    assert!(engine.is_allowed(["reader"], "get", "/docs/42"));
}

#[test]
fn inherited_permissions_apply() {
    let engine = engine();
    assert!(engine.is_allowed(["manager"], "GET", "/docs/1"));
    assert!(engine.is_allowed(["manager"], "DELETE", "/docs/1"));
    assert!(!engine.is_allowed(["reader"], "DELETE", "/docs/1"));
}

#[test]
fn public_rules_allow_any_caller() {
    let engine = engine();
    let none: [&str; 0] = [];
    assert!(engine.is_public("GET", "/status"));
    assert!(engine.is_allowed(none, "GET", "/status"));
    assert!(engine.is_allowed(["unknown"], "GET", "/health"));
    assert!(!engine.is_public("POST", "/status"));
}

#[test]
fn unmatched_request_is_denied_for_broad_roles() {
    let engine = engine();
    assert!(!engine.is_allowed(["manager", "auditor"], "GET", "/admin"));
    assert!(!engine.is_allowed(["manager"], "GET", "/docs/1/history"));
}

#[test]
fn manager_needs_intersection_with_required_set() {
    let engine = engine();
    // manager holds {docs.read, docs.write}
    assert!(!engine.is_allowed(["manager"], "GET", "/audit"));

    // /docs/{id}/approve requires {approve, docs.publish}
    assert!(!engine.is_allowed(["manager"], "POST", "/docs/1/approve"));
}

#[test]
fn shared_permission_grants_access() {
    let policy = r"
roles:
  manager:
    permissions: [a, b]
permissions:
  a: { rules: [{ path: /a, methods: [GET] }] }
  b: { rules: [{ path: /shared, methods: [GET] }] }
  c: { rules: [{ path: /shared, methods: [GET] }, { path: /c, methods: [GET] }] }
";
    let engine = RbacEngine::new(RbacConfig::from_yaml_str(policy).unwrap()).unwrap();

    // /c requires {c}
    assert!(!engine.is_allowed(["manager"], "GET", "/c"));
    // /shared requires {b, c}
    assert!(engine.is_allowed(["manager"], "GET", "/shared"));
}

#[test]
fn unknown_roles_are_ignored_next_to_known_ones() {
    let engine = engine();
    assert!(engine.is_allowed(["ghost", "reader"], "GET", "/docs"));
}

#[test]
fn cycle_fails_loading() {
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
    assert!(matches!(err, ConfigError::InheritanceCycle { .. }));
    assert!(err.to_string().contains("cycle"));
}

#[test]
fn loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(POLICY.as_bytes()).unwrap();

    let engine = RbacEngine::from_path(file.path()).unwrap();
    assert!(engine.is_allowed(["reader"], "GET", "/docs"));
    assert_eq!(engine.config().roles().len(), 3);
}
