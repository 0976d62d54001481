use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// One step into a JSON value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// A JSONPath expression restricted to member and index access:
/// `$['a']['b']`, `$["a"][0]` or `$.a.b`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    segments: Vec<Segment>,
}

impl JsonPath {
    pub fn parse(expr: &str) -> Result<Self> {
        let Some(mut rest) = expr.trim().strip_prefix('$') else {
            bail!("JSONPath must start with '$': {}", expr);
        };

        let mut segments = Vec::new();
        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('.') {
                let end = after.find(['.', '[']).unwrap_or(after.len());
                if end == 0 {
                    bail!("empty member name in JSONPath: {}", expr);
                }
                segments.push(Segment::Key(after[..end].to_string()));
                rest = &after[end..];
            } else if let Some(after) = rest.strip_prefix('[') {
                let close = after
                    .find(']')
                    .with_context(|| format!("unclosed '[' in JSONPath: {}", expr))?;
                let inner = after[..close].trim();
                let quoted = inner
                    .strip_prefix('\'')
                    .and_then(|s| s.strip_suffix('\''))
                    .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')));
                let segment = match quoted {
                    Some(key) => Segment::Key(key.to_string()),
                    None => Segment::Index(
                        inner
                            .parse()
                            .with_context(|| {
                                format!("bad index '{}' in JSONPath: {}", inner, expr)
                            })?,
                    ),
                };
                segments.push(segment);
                rest = &after[close + 1..];
            } else {
                bail!("unexpected '{}' in JSONPath: {}", rest, expr);
            }
        }

        if segments.is_empty() {
            bail!("JSONPath selects no field: {}", expr);
        }

        Ok(Self { segments })
    }

    /// Value at this path, if every step exists
    pub fn select<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(value, |current, segment| match segment {
                Segment::Key(key) => current.get(key.as_str()),
                Segment::Index(idx) => current.get(*idx),
            })
    }
}

#[derive(Debug, Deserialize)]
struct JsonPathsDocument {
    jsonpaths: Vec<String>,
}

/// Parse a JSONPaths document: `{"jsonpaths": ["$['artist']", ...]}`
pub fn parse_jsonpaths(text: &str) -> Result<Vec<JsonPath>> {
    let doc: JsonPathsDocument =
        serde_json::from_str(text).context("Failed to parse JSONPaths document")?;
    doc.jsonpaths.iter().map(|p| JsonPath::parse(p)).collect()
}

/// Read a JSONPaths document from disk
pub fn load_jsonpaths(path: &Path) -> Result<Vec<JsonPath>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read JSONPaths file: {:?}", path))?;
    parse_jsonpaths(&text).with_context(|| format!("Invalid JSONPaths file: {:?}", path))
}
