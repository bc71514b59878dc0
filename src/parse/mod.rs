//! Document parsing seam.
//!
//! The build pipeline only depends on the [`Parser`] trait; the bundled
//! [`MarkdownParser`] handles YAML frontmatter, wikilink extraction, and tag
//! normalization. It deliberately does not implement a markdown grammar -
//! the body is passed through untouched for downstream renderers.

use std::path::Path;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::error::ParseError;
use crate::graph::{doc_id, Dates, Document};
use crate::Result;

/// Parses one source document into its structured fields.
pub trait Parser: Send + Sync {
    /// Parse the document at `relative_path` under `content_dir`.
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` scoped to this document; sibling documents in
    /// the same batch must not be affected.
    fn parse(&self, content_dir: &Path, relative_path: &str) -> Result<Document>;
}

/// Built-in parser: YAML frontmatter plus `[[wikilink]]` scanning.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownParser;

impl MarkdownParser {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Parser for MarkdownParser {
    fn parse(&self, content_dir: &Path, relative_path: &str) -> Result<Document> {
        let full_path = content_dir.join(relative_path);
        let raw = std::fs::read_to_string(&full_path).map_err(|e| ParseError::Read {
            path: relative_path.to_string(),
            reason: e.to_string(),
        })?;

        let (frontmatter, body) = split_frontmatter(&raw, relative_path)?;
        let dates = dates_from_frontmatter(frontmatter.as_ref());
        let tags = tags_from_frontmatter(frontmatter.as_ref());
        let links = extract_wikilinks(body, &doc_id(relative_path));

        Ok(Document {
            relative_path: relative_path.to_string(),
            frontmatter,
            dates,
            links,
            tags,
            body: body.to_string(),
        })
    }
}

/// Split a leading `---` YAML frontmatter block from the body.
fn split_frontmatter<'a>(
    raw: &'a str,
    relative_path: &str,
) -> Result<(Option<serde_json::Value>, &'a str)> {
    let Some(rest) = raw.strip_prefix("---\n").or_else(|| raw.strip_prefix("---\r\n")) else {
        return Ok((None, raw));
    };

    let Some(end) = rest.find("\n---").map(|i| {
        let after = &rest[i + 4..];
        (i, after.strip_prefix('\n').or_else(|| after.strip_prefix("\r\n")).unwrap_or(after))
    }) else {
        // Unterminated frontmatter fence; treat the whole file as body.
        return Ok((None, raw));
    };

    let (yaml_len, body) = end;
    let yaml = &rest[..yaml_len];

    let value: serde_yaml::Value =
        serde_yaml::from_str(yaml).map_err(|e| ParseError::Frontmatter {
            path: relative_path.to_string(),
            reason: e.to_string(),
        })?;

    let json = serde_json::to_value(value).map_err(|e| ParseError::Frontmatter {
        path: relative_path.to_string(),
        reason: e.to_string(),
    })?;

    if json.is_null() {
        return Ok((None, body));
    }

    Ok((Some(json), body))
}

/// Pull created/modified/published dates out of frontmatter.
///
/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates. `date` is an
/// alias for `created`, `updated` for `modified`.
fn dates_from_frontmatter(frontmatter: Option<&serde_json::Value>) -> Dates {
    let Some(fm) = frontmatter else {
        return Dates::default();
    };

    let field = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| fm.get(*k))
            .and_then(serde_json::Value::as_str)
            .and_then(parse_flexible_date)
    };

    Dates {
        created: field(&["created", "date"]),
        modified: field(&["modified", "updated"]),
        published: field(&["published"]),
    }
}

fn parse_flexible_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
}

/// Pull tags out of frontmatter. Accepts a string or a list of strings.
fn tags_from_frontmatter(frontmatter: Option<&serde_json::Value>) -> Vec<String> {
    let Some(tags) = frontmatter.and_then(|fm| fm.get("tags")) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    match tags {
        serde_json::Value::String(s) => push_tag(&mut out, s),
        serde_json::Value::Array(items) => {
            for item in items {
                if let Some(s) = item.as_str() {
                    push_tag(&mut out, s);
                }
            }
        }
        _ => {}
    }
    out
}

fn push_tag(out: &mut Vec<String>, raw: &str) {
    let tag = raw.trim().trim_start_matches('#').to_string();
    if !tag.is_empty() && !out.contains(&tag) {
        out.push(tag);
    }
}

/// Scan the body for `[[target]]` and `[[target|alias]]` references.
///
/// Targets are resolved relative to nothing (ids are content-root relative),
/// anchors after `#` are stripped, duplicates removed, self-links dropped.
fn extract_wikilinks(body: &str, self_id: &str) -> Vec<String> {
    let mut links = Vec::new();
    let mut rest = body;

    while let Some(start) = rest.find("[[") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("]]") else { break };

        let inner = &after[..end];
        let target = inner
            .split('|')
            .next()
            .unwrap_or(inner)
            .split('#')
            .next()
            .unwrap_or(inner)
            .trim();

        if !target.is_empty() {
            let target = doc_id(target);
            if target != self_id && !links.contains(&target) {
                links.push(target);
            }
        }

        rest = &after[end + 2..];
    }

    links
}
