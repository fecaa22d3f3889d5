//! Stylesheet reference extraction.
//!
//! A byte scanner rather than a full CSS parser: it only has to find
//! `@import` rules and `url()` tokens while skipping comments and strings.

use super::{
    ExtractedReference, SourceUnit, Transform, TransformContext, TransformError, TransformOutput,
    is_ignorable_specifier,
};
use crate::reference::{ByteSpan, Reference, ReferenceKind};
use crate::resolve::ResolveMode;

#[derive(Debug, Clone, Copy, Default)]
pub struct CssTransform;

impl CssTransform {
    pub fn new() -> Self {
        Self
    }
}

impl Transform for CssTransform {
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

struct Scanner<'s> {
    text: &'s str,
    bytes: &'s [u8],
    references: Vec<ExtractedReference>,
}

/// A quoted or unquoted value with the span of its text.
struct Token {
    value: String,
    span: ByteSpan,
    end: usize,
}

impl<'s> Scanner<'s> {
    fn new(text: &'s str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            references: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<ExtractedReference>, (&'static str, usize)> {
        let mut open_braces = Vec::new();
        let mut i = 0;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'/' if self.bytes.get(i + 1) == Some(&b'*') => {
                    match self.text[i + 2..].find("*/") {
                        Some(end) => i += end + 4,
                        None => return Err(("unterminated comment", i)),
                    }
                }
                b'"' | b'\'' => i = self.skip_string(i),
                b'{' => {
                    open_braces.push(i);
                    i += 1;
                }
                b'}' => {
                    if open_braces.pop().is_none() {
                        return Err(("unexpected '}'", i));
                    }
                    i += 1;
                }
                b'@' if open_braces.is_empty() && self.starts_with_ci(i, "@import") => {
                    i = self.import_rule(i);
                }
                b'u' | b'U' if self.starts_with_ci(i, "url(") && !self.follows_ident(i) => {
                    i = match self.url_function(i) {
                        Some(token) => {
                            self.push_asset(&token);
                            token.end
                        }
                        None => i + 4,
                    };
                }
                _ => i += 1,
            }
        }
        match open_braces.last() {
            Some(&at) => Err(("unclosed '{'", at)),
            None => Ok(self.references),
        }
    }

    fn import_rule(&mut self, start: usize) -> usize {
        let after = self.skip_whitespace(start + "@import".len());
        let token = match self.bytes.get(after) {
            Some(b'"' | b'\'') => self.string(after),
            _ if self.starts_with_ci(after, "url(") => self.url_function(after),
            _ => None,
        };
        let Some(token) = token else {
            return start + "@import".len();
        };

        let semicolon = self.text[token.end..]
            .find(';')
            .map(|offset| token.end + offset);
        let conditions_end = semicolon.unwrap_or(self.bytes.len());
        let statement_end = semicolon.map_or(self.bytes.len(), |at| at + 1);
        let conditional = !self.text[token.end..conditions_end].trim().is_empty();

        if !is_ignorable_specifier(&token.value) {
            let mut reference =
                Reference::new(ReferenceKind::StaticImport, token.value.as_str(), token.span)
                    .with_mode(ResolveMode::Url)
                    .with_statement(ByteSpan::new(start, statement_end));
            // Media queries and layers cannot survive concatenation
            if conditional {
                reference = reference.unmergeable();
            }
            self.references.push(ExtractedReference::new(reference));
        }
        statement_end
    }

    fn push_asset(&mut self, token: &Token) {
        if is_ignorable_specifier(&token.value) {
            return;
        }
        let reference = Reference::new(ReferenceKind::Asset, token.value.as_str(), token.span)
            .with_mode(ResolveMode::Url);
        self.references.push(ExtractedReference::new(reference));
    }

    /// `url(...)` starting at `start`, quoted or not.
    fn url_function(&self, start: usize) -> Option<Token> {
        let open = self.skip_whitespace(start + "url(".len());
        match self.bytes.get(open) {
            Some(b'"' | b'\'') => {
                let token = self.string(open)?;
                let close = self.skip_whitespace(token.end);
                (self.bytes.get(close) == Some(&b')')).then(|| Token {
                    end: close + 1,
                    ..token
                })
            }
            _ => {
                let close = open + self.text[open..].find(')')?;
                let raw = &self.text[open..close];
                let value = raw.trim_end();
                Some(Token {
                    value: value.to_string(),
                    span: ByteSpan::new(open, open + value.len()),
                    end: close + 1,
                })
            }
        }
    }

    fn string(&self, start: usize) -> Option<Token> {
        let end = self.skip_string(start);
        let quote = self.bytes[start];
        if end <= start + 1 || self.bytes.get(end - 1) != Some(&quote) {
            return None;
        }
        let span = ByteSpan::new(start + 1, end - 1);
        Some(Token {
            value: self.text[span.range()].to_string(),
            span,
            end,
        })
    }

    fn skip_string(&self, start: usize) -> usize {
        let quote = self.bytes[start];
        let mut i = start + 1;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' => i += 2,
                b'\n' => return i,
                b if b == quote => return i + 1,
                _ => i += 1,
            }
        }
        self.bytes.len()
    }

    fn skip_whitespace(&self, mut i: usize) -> usize {
        while self.bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
            i += 1;
        }
        i
    }

    fn starts_with_ci(&self, at: usize, pattern: &str) -> bool {
        self.text
            .get(at..at + pattern.len())
            .is_some_and(|s| s.eq_ignore_ascii_case(pattern))
    }

    fn follows_ident(&self, at: usize) -> bool {
        at > 0 && {
            let prev = self.bytes[at - 1];
            prev.is_ascii_alphanumeric() || prev == b'-' || prev == b'_'
        }
    }
}
