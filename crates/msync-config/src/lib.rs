//! msync-config
//!
//! One explicit `Config` value, built once at startup and handed to every
//! component constructor. Sources:
//! - environment variables (settings + secrets)
//! - optional layered YAML (`CONFIG_FILE_NAME`, comma-separated), hashed
//! - optional templates directory (`CONFIG_TEMPLATES_DIR`)

mod duration;
mod layered;
mod secrets;
mod templates;

pub use duration::parse_duration;
pub use layered::{load_layered_yaml, load_layered_yaml_from_strings, LoadedConfig};
pub use secrets::{resolve_secrets, ResolvedSecrets};
pub use templates::TemplateSet;

use anyhow::{bail, Context, Result};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_JOBS_PROCESS_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_MATCH_DELETE_WAIT_TIME: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_TEMPLATE_NAME: &str = "TMT2_MATCH";
pub const DEFAULT_PULSAR_BASE_TOPIC: &str = "persistent://public/default/unwindia";

#[derive(Debug, Clone)]
pub struct Tmt2Settings {
    pub url: String,
    pub template_name: String,
    /// Accept self-signed / invalid certificates. Off unless asked for.
    pub insecure_tls: bool,
}

#[derive(Debug, Clone)]
pub struct PulsarSettings {
    pub url: String,
    pub base_topic: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_addr: SocketAddr,
    pub log_level: String,
    /// Resolved pool size, always >= 1.
    pub worker_count: usize,
    pub store_timeout: Duration,
    pub jobs_process_interval: Duration,
    /// Grace period between a match-finished event and the FINISHED state.
    pub match_delete_wait_time: Duration,
    pub use_match_service_id: bool,
    pub tmt2: Tmt2Settings,
    /// `None` when no broker is configured; events then arrive over HTTP only.
    pub pulsar: Option<PulsarSettings>,
    pub secrets: ResolvedSecrets,
    pub templates: TemplateSet,
    /// Present when YAML layers were loaded.
    pub layered: Option<LoadedConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary key lookup. Tests pass a map here instead of
    /// mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| -> Option<String> {
            lookup(k)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        // Layered YAML first: it may rename the secret env vars and carries
        // the templates map.
        let layered = match get("CONFIG_FILE_NAME") {
            Some(list) => {
                let paths: Vec<&str> = list
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .collect();
                Some(load_layered_yaml(&paths).context("CONFIG_FILE_NAME")?)
            }
            None => None,
        };
        let config_json = layered
            .as_ref()
            .map(|l| l.config_json.clone())
            .unwrap_or_else(|| serde_json::json!({}));

        let http_addr = resolve_http_addr(get("HTTP_ADDR"), get("HTTP_PORT"))?;
        let log_level = get("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let worker_raw: i64 = match get("WORKER_COUNT") {
            Some(v) => v
                .parse()
                .with_context(|| format!("WORKER_COUNT must be an integer, got '{v}'"))?,
            None => 0,
        };
        let parallelism = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let worker_count = resolve_worker_count(worker_raw, parallelism);

        let store_timeout = duration_var(&get, "STORE_TIMEOUT", DEFAULT_STORE_TIMEOUT)?;
        let jobs_process_interval =
            duration_var(&get, "JOBS_PROCESS_INTERVAL", DEFAULT_JOBS_PROCESS_INTERVAL)?;
        if jobs_process_interval.is_zero() {
            bail!("JOBS_PROCESS_INTERVAL must be greater than zero");
        }
        let match_delete_wait_time =
            duration_var(&get, "MATCH_DELETE_WAIT_TIME", DEFAULT_MATCH_DELETE_WAIT_TIME)?;

        let use_match_service_id = bool_var(&get, "USE_MATCHSERVICE_ID", false)?;

        let tmt2 = Tmt2Settings {
            url: get("TMT2_URL")
                .context("required env var 'TMT2_URL' is not set or empty")?
                .trim_end_matches('/')
                .to_string(),
            template_name: get("TMT2_MATCH_TEMPLATE_NAME")
                .unwrap_or_else(|| DEFAULT_TEMPLATE_NAME.to_string()),
            insecure_tls: bool_var(&get, "TMT2_INSECURE_TLS", false)?,
        };

        let pulsar = get("PULSAR_URL").map(|url| PulsarSettings {
            url,
            base_topic: get("PULSAR_BASE_TOPIC")
                .unwrap_or_else(|| DEFAULT_PULSAR_BASE_TOPIC.to_string()),
        });

        let secrets = resolve_secrets(&config_json, &get)?;

        let mut templates = TemplateSet::new();
        templates.merge_config_json(&config_json)?;
        if let Some(dir) = get("CONFIG_TEMPLATES_DIR") {
            templates.merge_dir(Path::new(&dir))?;
        }
        templates
            .require(&tmt2.template_name)
            .context("TMT2_MATCH_TEMPLATE_NAME")?;

        Ok(Config {
            http_addr,
            log_level,
            worker_count,
            store_timeout,
            jobs_process_interval,
            match_delete_wait_time,
            use_match_service_id,
            tmt2,
            pulsar,
            secrets,
            templates,
            layered,
        })
    }

    /// The create-match template. Present by construction.
    pub fn match_template(&self) -> &str {
        self.templates.get(&self.tmt2.template_name).unwrap_or_default()
    }

    pub fn config_hash(&self) -> Option<&str> {
        self.layered.as_ref().map(|l| l.config_hash.as_str())
    }
}

/// `raw > 0` is taken as-is; `raw <= 0` is an offset from the available
/// parallelism. Never below one.
pub fn resolve_worker_count(raw: i64, parallelism: usize) -> usize {
    let n = if raw > 0 {
        raw
    } else {
        parallelism as i64 + raw
    };
    n.max(1) as usize
}

fn resolve_http_addr(addr: Option<String>, port: Option<String>) -> Result<SocketAddr> {
    if let Some(addr) = addr {
        return addr
            .parse()
            .with_context(|| format!("HTTP_ADDR is not a socket address: '{addr}'"));
    }
    if let Some(port) = port {
        let port: u16 = port
            .parse()
            .with_context(|| format!("HTTP_PORT is not a port: '{port}'"))?;
        return Ok(SocketAddr::from(([0, 0, 0, 0], port)));
    }
    DEFAULT_HTTP_ADDR
        .parse()
        .context("default http addr")
}

fn duration_var<F>(get: &F, key: &str, default: Duration) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(v) => parse_duration(&v).with_context(|| format!("{key} is not a duration")),
        None => Ok(default),
    }
}

fn bool_var<F>(get: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(v) = get(key) else {
        return Ok(default);
    };
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("{key} must be a boolean, got '{v}'"),
    }
}
