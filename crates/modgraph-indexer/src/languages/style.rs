//! Stylesheet `@import` extraction
//!
//! A lightweight pattern match rather than a full CSS parse; it also covers
//! the `@import` forms shared by SCSS and Sass, including comma-separated lists.

use crate::extractor::{truncate_statement, Dependency, ExtractionResult, LanguageExtractor};
use anyhow::Result;
use modgraph_core::{EdgeKind, Location};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// One `@import` statement, up to its `;` or the end of the line.
static IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@import\s+[^;\n]*;?").unwrap());

/// One specifier at the start of the remaining statement text.
static SPECIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:url\(\s*)?(?:"([^"]+)"|'([^']+)'|([^"'\s;,)]+))\s*\)?"#).unwrap()
});

pub struct StyleExtractor;

impl LanguageExtractor for StyleExtractor {
    fn extract(&self, path: &Path, content: &str, _with_symbols: bool) -> Result<ExtractionResult> {
        let line_comments = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext, "scss" | "sass"));
        let text = blank_comments(content, line_comments);

        let mut dependencies = Vec::new();
        for statement in IMPORT_RE.find_iter(&text) {
            let location = location_of(&text, statement.start());
            let mut rest = &statement.as_str()["@import".len()..];
            while let Some(caps) = SPECIFIER_RE.captures(rest) {
                let Some(specifier) = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))
                else {
                    break;
                };
                if !specifier.as_str().starts_with("http") {
                    dependencies.push(Dependency {
                        specifier: specifier.as_str().to_string(),
                        kind: EdgeKind::Style,
                        statement: Some(truncate_statement(statement.as_str().trim_end())),
                        location: Some(location),
                        bindings: Vec::new(),
                    });
                }
                // Anything but a comma after the specifier is a media query or the end
                match rest[caps.get(0).map_or(0, |m| m.end())..].trim_start().strip_prefix(',') {
                    Some(next) => rest = next,
                    None => break,
                }
            }
        }

        Ok(ExtractionResult {
            dependencies,
            symbols: Vec::new(),
        })
    }
}

/// Replace comment text with spaces, keeping byte offsets and line breaks so
/// locations still point into the original source.
fn blank_comments(content: &str, line_comments: bool) -> String {
    let bytes = content.as_bytes();
    let mut out = bytes.to_vec();
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q || b == b'\n' {
                quote = None;
            }
            i += 1;
            continue;
        }

        let end = match (b, bytes.get(i + 1)) {
            (b'"' | b'\'', _) => {
                quote = Some(b);
                i += 1;
                continue;
            }
            (b'/', Some(b'*')) => content[i + 2..]
                .find("*/")
                .map_or(bytes.len(), |offset| i + 2 + offset + 2),
            (b'/', Some(b'/')) if line_comments => content[i..]
                .find('\n')
                .map_or(bytes.len(), |offset| i + offset),
            _ => {
                i += 1;
                continue;
            }
        };
        for byte in &mut out[i..end] {
            if *byte != b'\n' {
                *byte = b' ';
            }
        }
        i = end;
    }

    // Only whole comments were replaced, and only with ASCII
    String::from_utf8(out).unwrap_or_else(|_| content.to_string())
}

fn location_of(content: &str, offset: usize) -> Location {
    let before = &content[..offset];
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    Location {
        line: before.matches('\n').count() as u32 + 1,
        column: (offset - line_start) as u32,
    }
}
