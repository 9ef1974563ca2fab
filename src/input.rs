use std::{
    fs,
    io::{self, Read},
    path::Path,
};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde_json::Value;
use tracing::info;

/// A webhook response as it came back: JSON when it parses, raw text
/// otherwise.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ViewKind {
    #[default]
    Auto,
    Cloud,
    Grid,
    Table,
    Text,
}

impl Payload {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Payload::Text(raw.to_string());
        }
        match serde_json::from_str(raw) {
            Ok(value) => Payload::Json(value),
            Err(_) => Payload::Text(raw.to_string()),
        }
    }

    /// Records for the word cloud: the elements of a top-level array.
    /// Anything else has no records.
    pub fn records(&self) -> Vec<Value> {
        match self {
            Payload::Json(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        }
    }

    /// View chosen by `auto`: arrays holding objects become a word cloud,
    /// other JSON a table and unparsed bodies plain text.
    pub fn preferred_view(&self) -> ViewKind {
        match self {
            Payload::Json(Value::Array(items)) if items.iter().any(Value::is_object) => {
                ViewKind::Cloud
            }
            Payload::Json(_) => ViewKind::Table,
            Payload::Text(_) => ViewKind::Text,
        }
    }

    pub fn resolve_view(&self, requested: ViewKind) -> ViewKind {
        match requested {
            ViewKind::Auto => self.preferred_view(),
            other => other,
        }
    }

    /// Text shown by the text view.
    pub fn display_text(&self) -> String {
        match self {
            Payload::Text(text) => text.clone(),
            Payload::Json(Value::String(text)) => text.clone(),
            Payload::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

/// Reads a payload from `path`, or from stdin when the path is `-`.
pub fn load(path: &Path) -> Result<Payload> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read payload from stdin")?;
        buf
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("failed to read payload {}", path.display()))?
    };
    let payload = Payload::parse(&raw);
    info!(
        bytes = raw.len(),
        json = matches!(payload, Payload::Json(_)),
        "payload loaded"
    );
    Ok(payload)
}
