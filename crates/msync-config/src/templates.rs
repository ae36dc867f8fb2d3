use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Named request-body templates for the orchestration API.
///
/// Sources, later wins: the `templates:` map of the layered YAML, then every
/// file in the templates directory (name = file stem).
#[derive(Clone, Default)]
pub struct TemplateSet {
    templates: BTreeMap<String, String>,
}

impl std::fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.templates.keys()).finish()
    }
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, body: impl Into<String>) {
        self.templates.insert(name.into(), body.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(String::as_str)
    }

    /// Like `get`, but a missing template is an error naming what exists.
    pub fn require(&self, name: &str) -> Result<&str> {
        match self.get(name) {
            Some(body) => Ok(body),
            None => bail!(
                "TEMPLATE_MISSING: template '{}' not found (known: {:?})",
                name,
                self.templates.keys().collect::<Vec<_>>()
            ),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Read the `templates:` map out of a merged config document.
    ///
    /// Values may be strings (used as-is) or structured YAML (serialized to
    /// compact JSON).
    pub fn merge_config_json(&mut self, config_json: &Value) -> Result<()> {
        let Some(section) = config_json.get("templates") else {
            return Ok(());
        };
        let Some(map) = section.as_object() else {
            bail!("CONFIG_INVALID: 'templates' must be a mapping of name -> template");
        };
        for (name, body) in map {
            let text = match body {
                Value::String(s) => s.clone(),
                other => serde_json::to_string(other)
                    .with_context(|| format!("template '{name}' is not serializable"))?,
            };
            self.insert(name.clone(), text);
        }
        Ok(())
    }

    /// Load every regular file in `dir`; the file stem is the template name.
    pub fn merge_dir(&mut self, dir: &Path) -> Result<()> {
        let entries = fs::read_dir(dir)
            .with_context(|| format!("failed to read templates dir: {}", dir.display()))?;
        for entry in entries {
            let entry = entry.with_context(|| format!("failed to list {}", dir.display()))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let body = fs::read_to_string(&path)
                .with_context(|| format!("failed to read template: {}", path.display()))?;
            self.insert(stem.to_string(), body);
        }
        Ok(())
    }
}
