//! Secrets never live in YAML and never show up in Debug output.

use msync_config::{load_layered_yaml_from_strings, resolve_secrets, Config};
use std::collections::HashMap;

const YAML_WITH_LITERAL_TOKEN: &str = r#"
secrets_env:
  tmt2_access_token: "sk-live-abc123secretvalue"
"#;

const YAML_WITH_JWT: &str = r#"
templates:
  TMT2_MATCH: "{}"
pulsar:
  token: "eyJhbGciOiJIUzI1NiJ9.e30.signature"
"#;

const YAML_WITH_ENV_NAMES: &str = r#"
secrets_env:
  database_url: "MSYNC_DATABASE_URL"
  tmt2_access_token: "MSYNC_TMT2_TOKEN"
"#;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |k| map.get(k).cloned()
}

#[test]
fn literal_secret_in_yaml_is_rejected() {
    for doc in [YAML_WITH_LITERAL_TOKEN, YAML_WITH_JWT] {
        let err = load_layered_yaml_from_strings(&[doc]).unwrap_err().to_string();
        assert!(err.contains("CONFIG_SECRET_DETECTED"), "{err}");
        assert!(!err.contains("abc123"), "error must not echo the value: {err}");
    }
}

#[test]
fn yaml_may_rename_secret_env_vars() {
    let loaded = load_layered_yaml_from_strings(&[YAML_WITH_ENV_NAMES]).unwrap();
    let env = lookup(&[
        ("MSYNC_DATABASE_URL", "postgres://u:p@db/msync"),
        ("MSYNC_TMT2_TOKEN", "token-123"),
    ]);
    let secrets = resolve_secrets(&loaded.config_json, &env).unwrap();
    assert_eq!(secrets.database_url, "postgres://u:p@db/msync");
    assert_eq!(secrets.tmt2_access_token, "token-123");
    assert!(secrets.pulsar_auth_token.is_none());
}

#[test]
fn missing_required_secret_names_the_variable_only() {
    let env = lookup(&[("DATABASE_URL", "postgres://u:hunter2@db/msync")]);
    let err = resolve_secrets(&serde_json::json!({}), &env)
        .unwrap_err()
        .to_string();
    assert!(err.contains("SECRETS_MISSING"), "{err}");
    assert!(err.contains("TMT2_ACCESS_TOKEN"), "{err}");
    assert!(!err.contains("hunter2"), "{err}");
}

#[test]
fn config_debug_redacts_every_secret() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("TMT2_MATCH.json"), "{}").unwrap();
    let templates_dir = dir.path().to_string_lossy().to_string();

    let env = lookup(&[
        ("DATABASE_URL", "postgres://u:hunter2@db/msync"),
        ("TMT2_URL", "https://tmt2.local"),
        ("TMT2_ACCESS_TOKEN", "super-secret-token"),
        ("PULSAR_AUTH_TOKEN", "pulsar-secret"),
        ("CONFIG_TEMPLATES_DIR", templates_dir.as_str()),
    ]);
    let cfg = Config::from_lookup(env).unwrap();
    let dbg = format!("{cfg:?}");

    for needle in ["hunter2", "super-secret-token", "pulsar-secret"] {
        assert!(!dbg.contains(needle), "Debug leaked {needle}: {dbg}");
    }
    assert!(dbg.contains("<REDACTED>"));
}
