//! `msync config-hash` is deterministic and refuses literal secrets.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;

fn hash_line(out: &[u8]) -> String {
    String::from_utf8_lossy(out)
        .lines()
        .find(|l| l.starts_with("config_hash="))
        .unwrap_or_default()
        .to_string()
}

#[test]
fn same_inputs_same_hash_and_later_layer_wins() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let base = dir.path().join("base.yaml");
    let over = dir.path().join("override.yaml");
    fs::write(&base, "tmt2:\n  template_name: TMT2_MATCH\nworkers: 2\n")?;
    fs::write(&over, "workers: 8\n")?;

    let first = Command::cargo_bin("msync")?
        .arg("config-hash")
        .arg(&base)
        .arg(&over)
        .output()?;
    assert!(first.status.success());
    let second = Command::cargo_bin("msync")?
        .arg("config-hash")
        .arg(&base)
        .arg(&over)
        .output()?;

    let h = hash_line(&first.stdout);
    assert_eq!(h.len(), "config_hash=".len() + 64);
    assert_eq!(h, hash_line(&second.stdout));
    assert!(String::from_utf8_lossy(&first.stdout).contains(r#""workers":8"#));
    Ok(())
}

#[test]
fn literal_secret_is_rejected() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let bad = dir.path().join("bad.yaml");
    fs::write(&bad, "tmt2:\n  token: eyJhbGciOiJIUzI1NiJ9.payload.sig\n")?;

    Command::cargo_bin("msync")?
        .arg("config-hash")
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"));
    Ok(())
}
