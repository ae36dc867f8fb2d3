//! Runtime secret resolution.
//!
//! YAML layers may only name the env vars that hold credentials
//! (`secrets_env.database_url: "DATABASE_URL"`); values come from the
//! environment lookup at startup. Error messages carry the variable NAME,
//! never its value, and `Debug` output redacts every resolved value.

use anyhow::{bail, Result};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// All credentials the service needs, resolved once at startup.
#[derive(Clone)]
pub struct ResolvedSecrets {
    /// Postgres connection URL. Carries the password inline.
    pub database_url: String,
    /// Sent verbatim as the `Authorization` header to the orchestration API.
    pub tmt2_access_token: String,
    /// Broker token; `None` when the broker runs unauthenticated.
    pub pulsar_auth_token: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("database_url", &"<REDACTED>")
            .field("tmt2_access_token", &"<REDACTED>")
            .field(
                "pulsar_auth_token",
                &self.pulsar_auth_token.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

struct SecretEnvNames {
    database_url_var: String,
    tmt2_access_token_var: String,
    pulsar_auth_token_var: String,
}

fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    let s = config.pointer(pointer)?.as_str()?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_env_names(config_json: &Value) -> SecretEnvNames {
    SecretEnvNames {
        database_url_var: read_str_at(config_json, "/secrets_env/database_url")
            .unwrap_or_else(|| "DATABASE_URL".to_string()),
        tmt2_access_token_var: read_str_at(config_json, "/secrets_env/tmt2_access_token")
            .unwrap_or_else(|| "TMT2_ACCESS_TOKEN".to_string()),
        pulsar_auth_token_var: read_str_at(config_json, "/secrets_env/pulsar_auth_token")
            .unwrap_or_else(|| "PULSAR_AUTH_TOKEN".to_string()),
    }
}

fn resolve<F>(lookup: &F, var_name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var_name) {
        Some(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

fn require<F>(lookup: &F, var_name: &str, what: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match resolve(lookup, var_name) {
        Some(v) => Ok(v),
        None => bail!("SECRETS_MISSING: required env var '{var_name}' ({what}) is not set or empty"),
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Resolve every secret through `lookup` (usually `std::env::var`).
///
/// The database URL and the orchestration token are required; the broker
/// token is optional.
pub fn resolve_secrets<F>(config_json: &Value, lookup: &F) -> Result<ResolvedSecrets>
where
    F: Fn(&str) -> Option<String>,
{
    let names = parse_env_names(config_json);

    Ok(ResolvedSecrets {
        database_url: require(lookup, &names.database_url_var, "postgres url")?,
        tmt2_access_token: require(lookup, &names.tmt2_access_token_var, "orchestration api token")?,
        pulsar_auth_token: resolve(lookup, &names.pulsar_auth_token_var),
    })
}
