//! HTML reference extraction.
//!
//! Scans tags and their attributes. Inline `<script>` and `<style>` bodies
//! become [`ReferenceKind::Inline`] references whose content is carried along
//! so the builder can process them as child nodes.

use std::sync::LazyLock;

use regex::Regex;

use super::{
    ExtractedReference, InlineSource, SourceUnit, Transform, TransformContext, TransformError,
    TransformOutput, is_ignorable_specifier,
};
use crate::content_type::ContentType;
use crate::reference::{ByteSpan, Reference, ReferenceKind};
use crate::resolve::ResolveMode;

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("attribute pattern is valid")
});

/// `<link rel>` values that never name something to build.
const IGNORED_LINK_RELS: &[&str] = &[
    "alternate",
    "canonical",
    "dns-prefetch",
    "next",
    "preconnect",
    "prev",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlTransform;

impl HtmlTransform {
    pub fn new() -> Self {
        Self
    }
}

impl Transform for HtmlTransform {
    fn transform(
        &self,
        unit: &SourceUnit<'_>,
        _ctx: &TransformContext<'_>,
    ) -> Result<TransformOutput, TransformError> {
        let text = unit.text()?;
        let references = Scanner::new(text)
            .run()
            .map_err(|(message, offset)| TransformError::syntax(unit, message, Some(offset)))?;
        Ok(TransformOutput {
            code: unit.content.to_vec(),
            map: None,
            references,
            syntax: None,
        })
    }
}

struct Attribute<'s> {
    name: String,
    value: Option<(&'s str, ByteSpan)>,
}

struct Scanner<'s> {
    text: &'s str,
    references: Vec<ExtractedReference>,
}

type ScanResult<T> = Result<T, (String, usize)>;

impl<'s> Scanner<'s> {
    fn new(text: &'s str) -> Self {
        Self {
            text,
            references: Vec::new(),
        }
    }

    fn run(mut self) -> ScanResult<Vec<ExtractedReference>> {
        let bytes = self.text.as_bytes();
        let mut i = 0;
        while let Some(offset) = self.text[i..].find('<') {
            let start = i + offset;
            let rest = &self.text[start..];
            if rest.starts_with("<!--") {
                i = match rest.find("-->") {
                    Some(end) => start + end + 3,
                    None => return Err(("unterminated comment".to_string(), start)),
                };
                continue;
            }
            let name_start = start + 1;
            if !bytes.get(name_start).is_some_and(u8::is_ascii_alphabetic) {
                // `</tag>`, `<!DOCTYPE>` or a stray `<`
                i = match bytes.get(name_start) {
                    Some(b'/' | b'!' | b'?') => self.tag_end(start)?,
                    _ => name_start,
                };
                continue;
            }
            let name_end = self.text[name_start..]
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
                .map_or(self.text.len(), |len| name_start + len);
            let name = self.text[name_start..name_end].to_ascii_lowercase();
            let end = self.tag_end(start)?;
            let attributes = self.attributes(name_end, end - 1);
            i = self.element(&name, &attributes, start, end)?;
        }
        Ok(self.references)
    }

    /// Offset just past the `>` closing the tag opened at `start`.
    fn tag_end(&self, start: usize) -> ScanResult<usize> {
        let mut quote = None;
        for (offset, c) in self.text[start..].char_indices() {
            match (quote, c) {
                (None, '"' | '\'') => quote = Some(c),
                (Some(q), c) if c == q => quote = None,
                (None, '>') => return Ok(start + offset + 1),
                _ => {}
            }
        }
        Err(("unterminated tag".to_string(), start))
    }

    fn attributes(&self, from: usize, to: usize) -> Vec<Attribute<'s>> {
        let text = self.text;
        ATTRIBUTE
            .captures_iter(&text[from..to])
            .filter_map(|caps| {
                let name = caps.get(1)?.as_str().to_ascii_lowercase();
                let value = caps
                    .get(2)
                    .or_else(|| caps.get(3))
                    .or_else(|| caps.get(4))
                    .map(|m| {
                        let span = ByteSpan::new(from + m.start(), from + m.end());
                        (&text[span.range()], span)
                    });
                Some(Attribute { name, value })
            })
            .collect()
    }

    /// Record references for one element and return where scanning resumes.
    fn element(
        &mut self,
        name: &str,
        attributes: &[Attribute<'s>],
        start: usize,
        end: usize,
    ) -> ScanResult<usize> {
        let attr = |wanted: &str| {
            attributes
                .iter()
                .find(|a| a.name == wanted)
                .and_then(|a| a.value)
        };

        match name {
            "script" => {
                let type_attr = attr("type").map(|(value, _)| value.trim().to_ascii_lowercase());
                let module = type_attr.as_deref() == Some("module");
                let close = self.raw_text_end(name, start, end)?;
                if let Some((src, span)) = attr("src") {
                    let kind = if module {
                        ReferenceKind::StaticImport
                    } else {
                        ReferenceKind::Asset
                    };
                    self.push(kind, src, span);
                } else if is_script_type(type_attr.as_deref()) {
                    self.push_inline(ContentType::JavaScript, ByteSpan::new(end, close.0));
                }
                Ok(close.1)
            }
            "style" => {
                let close = self.raw_text_end(name, start, end)?;
                self.push_inline(ContentType::Css, ByteSpan::new(end, close.0));
                Ok(close.1)
            }
            "link" => {
                let rel = attr("rel").map(|(value, _)| value.to_ascii_lowercase());
                let ignored = rel.as_deref().is_some_and(|rel| {
                    rel.split_ascii_whitespace()
                        .any(|token| IGNORED_LINK_RELS.contains(&token))
                });
                if !ignored {
                    if let Some((href, span)) = attr("href") {
                        self.push(ReferenceKind::Asset, href, span);
                    }
                }
                Ok(end)
            }
            "img" | "source" | "video" | "audio" | "track" | "embed" | "iframe" | "input" => {
                if let Some((src, span)) = attr("src") {
                    self.push(ReferenceKind::Asset, src, span);
                }
                if let Some((srcset, span)) = attr("srcset") {
                    self.push_srcset(srcset, span.start);
                }
                if let Some((poster, span)) = attr("poster") {
                    self.push(ReferenceKind::Asset, poster, span);
                }
                Ok(end)
            }
            _ => Ok(end),
        }
    }

    /// Body end and resume offset for a raw-text element.
    fn raw_text_end(&self, name: &str, start: usize, body_start: usize) -> ScanResult<(usize, usize)> {
        let closing = format!("</{name}");
        let body = &self.text[body_start..];
        let found = body
            .as_bytes()
            .windows(closing.len())
            .position(|window| window.eq_ignore_ascii_case(closing.as_bytes()));
        let Some(offset) = found else {
            return Err((format!("unterminated <{name}>"), start));
        };
        let close_start = body_start + offset;
        let resume = self.tag_end(close_start)?;
        Ok((close_start, resume))
    }

    fn push(&mut self, kind: ReferenceKind, specifier: &str, span: ByteSpan) {
        let trimmed = specifier.trim();
        if is_ignorable_specifier(trimmed) {
            return;
        }
        let leading = specifier.len() - specifier.trim_start().len();
        let span = ByteSpan::new(span.start + leading, span.start + leading + trimmed.len());
        let reference = Reference::new(kind, trimmed, span).with_mode(ResolveMode::Url);
        self.references.push(ExtractedReference::new(reference));
    }

    fn push_srcset(&mut self, srcset: &str, offset: usize) {
        let mut position = 0;
        for candidate in srcset.split(',') {
            let leading = candidate.len() - candidate.trim_start().len();
            let url = candidate.trim_start().split_ascii_whitespace().next().unwrap_or("");
            if !url.is_empty() {
                let start = offset + position + leading;
                self.push(ReferenceKind::Asset, url, ByteSpan::new(start, start + url.len()));
            }
            position += candidate.len() + 1;
        }
    }

    fn push_inline(&mut self, content_type: ContentType, body: ByteSpan) {
        let content = &self.text[body.range()];
        if content.trim().is_empty() {
            return;
        }
        // Child index within this document keeps inline URLs stable
        let specifier = format!("@{}.{}", self.references.len(), content_type.extension());
        let reference = Reference::new(ReferenceKind::Inline, specifier, body);
        let mut extracted = ExtractedReference::new(reference);
        extracted.inline = Some(InlineSource {
            content_type,
            content: content.to_string(),
        });
        self.references.push(extracted);
    }
}

fn is_script_type(type_attr: Option<&str>) -> bool {
    matches!(
        type_attr,
        None | Some("" | "module" | "text/javascript" | "application/javascript")
    )
}
