//! Request-body templates.
//!
//! A template is JSON text with `{{ path.to.field }}` placeholders resolved
//! against the camelCase JSON view of a `MatchInfo`, plus the derived
//! `serverHost` / `serverPort`. Placeholder values are spliced as follows:
//! strings JSON-escaped without quotes (so the template supplies them),
//! numbers, bools and null verbatim, objects and arrays as compact JSON.

use msync_schemas::MatchInfo;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("unterminated placeholder at byte {offset}")]
    Unterminated { offset: usize },

    #[error("invalid placeholder: {0}")]
    InvalidPlaceholder(String),

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("match info is not representable as json: {0}")]
    Context(#[source] serde_json::Error),

    #[error("rendered template is not valid json: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("rendered template is not a json object")]
    NotAnObject,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Field(Vec<String>),
}

/// A parsed template, checked for syntax once and rendered many times.
#[derive(Debug, Clone)]
pub struct MatchTemplate {
    name: String,
    segments: Vec<Segment>,
}

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{\{(.*?)\}\}").expect("hardcoded regex pattern is valid")
});

static PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_]+(\.[A-Za-z0-9_]+)*$").expect("hardcoded regex pattern is valid")
});

fn push_literal(segments: &mut Vec<Segment>, text: &str, base: usize) -> Result<(), TemplateError> {
    if let Some(pos) = text.find("{{") {
        return Err(TemplateError::Unterminated { offset: base + pos });
    }
    if !text.is_empty() {
        segments.push(Segment::Literal(text.to_string()));
    }
    Ok(())
}

impl MatchTemplate {
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut cursor = 0;

        for caps in PLACEHOLDER_RE.captures_iter(text) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            push_literal(&mut segments, &text[cursor..whole.start()], cursor)?;

            let path = inner.as_str().trim();
            if !PATH_RE.is_match(path) {
                return Err(TemplateError::InvalidPlaceholder(path.to_string()));
            }
            segments.push(Segment::Field(path.split('.').map(str::to_string).collect()));
            cursor = whole.end();
        }
        push_literal(&mut segments, &text[cursor..], cursor)?;

        Ok(Self {
            name: name.into(),
            segments,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render for one match. The output is guaranteed to be a JSON object.
    pub fn render(&self, info: &MatchInfo) -> Result<String, TemplateError> {
        let context = render_context(info)?;
        let mut out = String::new();

        for seg in &self.segments {
            match seg {
                Segment::Literal(s) => out.push_str(s),
                Segment::Field(path) => {
                    let value = lookup(&context, path)
                        .ok_or_else(|| TemplateError::UnknownField(path.join(".")))?;
                    out.push_str(&splice(value)?);
                }
            }
        }

        let parsed: Value = serde_json::from_str(&out).map_err(TemplateError::InvalidJson)?;
        if !parsed.is_object() {
            return Err(TemplateError::NotAnObject);
        }
        Ok(out)
    }
}

/// One-shot parse + render.
pub fn render(template: &str, info: &MatchInfo) -> Result<String, TemplateError> {
    MatchTemplate::parse("inline", template)?.render(info)
}

fn render_context(info: &MatchInfo) -> Result<Value, TemplateError> {
    let mut ctx = serde_json::to_value(info).map_err(TemplateError::Context)?;
    let (host, port) = info.server_host_port();
    if let Some(map) = ctx.as_object_mut() {
        map.insert("serverHost".to_string(), Value::String(host.to_string()));
        map.insert("serverPort".to_string(), Value::String(port.to_string()));
    }
    Ok(ctx)
}

fn lookup<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(root, |node, key| match node {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn splice(value: &Value) -> Result<String, TemplateError> {
    match value {
        Value::String(s) => {
            let quoted = serde_json::to_string(s).map_err(TemplateError::Context)?;
            Ok(quoted[1..quoted.len() - 1].to_string())
        }
        Value::Null => Ok("null".to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => serde_json::to_string(other).map_err(TemplateError::Context),
    }
}
