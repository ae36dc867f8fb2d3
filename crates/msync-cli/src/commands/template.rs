//! `msync template render`: render a template offline, the same way the
//! daemon does before a create-match call.

use anyhow::{Context, Result};
use msync_schemas::{sample_match, MatchInfo};
use msync_tmt2::MatchTemplate;
use serde_json::Value;
use std::path::Path;

use super::read_text;

/// Render `template_path` against the match in `match_path`, or the built-in
/// sample match. Returns pretty-printed JSON.
pub fn render_file(template_path: &Path, match_path: Option<&Path>) -> Result<String> {
    let text = read_text(template_path)?;
    let name = template_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("template");
    let template = MatchTemplate::parse(name, &text)
        .with_context(|| format!("parse template {}", template_path.display()))?;

    let info: MatchInfo = match match_path {
        Some(p) => serde_json::from_str(&read_text(p)?)
            .with_context(|| format!("{} is not a match", p.display()))?,
        None => sample_match(),
    };

    let rendered = template.render(&info).context("render template")?;
    let value: Value = serde_json::from_str(&rendered).context("rendered output is not json")?;
    serde_json::to_string_pretty(&value).context("format rendered json")
}
