//! Working buffer for the interpolation passes.
//!
//! A template is held as a list of segments. `Text` segments are template
//! source still open to scanning; `Value` segments are substituted output and
//! are never scanned again, so a value that happens to contain delimiter
//! sequences is not re-expanded by a later pass.

use crate::error::TemplateError;
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment {
    Text(String),
    Value(Vec<u8>),
}

/// What to do with a prefix that has no closing delimiter after it.
#[derive(Debug, Clone, Copy)]
pub(crate) enum OnUnclosed {
    /// Leave the rest of the buffer as it is.
    Keep,
    /// Fail with the error built from the prefix position.
    Fail(fn(usize) -> TemplateError),
}

#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct Segments {
    parts: Vec<Segment>,
    len: usize,
}

impl Segments {
    pub(crate) fn from_template(template: &str) -> Self {
        let mut segments = Self::default();
        segments.push_text(template);
        segments
    }

    /// Length in bytes of the flattened buffer.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        for part in self.parts {
            match part {
                Segment::Text(text) => out.extend_from_slice(text.as_bytes()),
                Segment::Value(value) => out.extend_from_slice(&value),
            }
        }
        out
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.len += text.len();
        if let Some(Segment::Text(last)) = self.parts.last_mut() {
            last.push_str(text);
        } else {
            self.parts.push(Segment::Text(text.to_string()));
        }
    }

    /// Empty values are kept as segments so the text on either side of a
    /// removed placeholder never joins into a new placeholder.
    fn push_value(&mut self, value: Vec<u8>) {
        self.len += value.len();
        self.parts.push(Segment::Value(value));
    }

    fn push_segment(&mut self, segment: Segment) {
        match segment {
            Segment::Text(text) => self.push_text(&text),
            Segment::Value(value) => self.push_value(value),
        }
    }

    /// Replace every `prefix ... close` expression in one left-to-right pass.
    ///
    /// `resolve` receives the bytes between the prefix and the close delimiter
    /// and the byte position of the expression in the buffer. An expression
    /// may span substituted values; their bytes become part of the inner text.
    pub(crate) fn rewrite<F>(
        self,
        prefix: &str,
        close: &str,
        unclosed: OnUnclosed,
        mut resolve: F,
    ) -> Result<Self, TemplateError>
    where
        F: FnMut(Vec<u8>, usize) -> Result<Vec<u8>, TemplateError>,
    {
        let mut out = Segments::default();
        let mut queue: VecDeque<Segment> = self.parts.into();

        while let Some(segment) = queue.pop_front() {
            let mut text = match segment {
                Segment::Text(text) => text,
                Segment::Value(value) => {
                    out.push_value(value);
                    continue;
                }
            };

            // Scan position inside `text`; matches are resolved in place
            let mut cursor = 0;
            while let Some(found) = text[cursor..].find(prefix) {
                let start = cursor + found;
                out.push_text(&text[cursor..start]);
                let position = out.len();
                let inner_start = start + prefix.len();

                match text[inner_start..].find(close) {
                    Some(end) => {
                        let inner = text.as_bytes()[inner_start..inner_start + end].to_vec();
                        out.push_value(resolve(inner, position)?);
                        cursor = inner_start + end + close.len();
                    }
                    None => match take_until_close(&mut queue, close) {
                        Some((spanned, tail)) => {
                            let mut inner = text.as_bytes()[inner_start..].to_vec();
                            inner.extend(spanned);
                            out.push_value(resolve(inner, position)?);
                            text = tail;
                            cursor = 0;
                        }
                        None => {
                            if let OnUnclosed::Fail(error) = unclosed {
                                return Err(error(position));
                            }
                            out.push_text(&text[start..]);
                            for segment in queue {
                                out.push_segment(segment);
                            }
                            return Ok(out);
                        }
                    },
                }
            }
            out.push_text(&text[cursor..]);
        }

        Ok(out)
    }

    /// Replace exact tokens (e.g. `{{json}}`) found in text segments.
    ///
    /// `resolve` is called for every match; callers that want one value per
    /// token memoise inside the closure.
    pub(crate) fn replace_tokens<T, F>(
        self,
        open: &str,
        tokens: &[(String, T)],
        mut resolve: F,
    ) -> Result<Self, TemplateError>
    where
        F: FnMut(&T) -> Result<Vec<u8>, TemplateError>,
    {
        let mut out = Segments::default();

        for segment in self.parts {
            let text = match segment {
                Segment::Text(text) => text,
                Segment::Value(value) => {
                    out.push_value(value);
                    continue;
                }
            };

            let mut copied = 0;
            let mut search = 0;
            while let Some(found) = text[search..].find(open) {
                let at = search + found;
                let matched = tokens
                    .iter()
                    .find(|(token, _)| text[at..].starts_with(token.as_str()));
                match matched {
                    Some((token, key)) => {
                        out.push_text(&text[copied..at]);
                        out.push_value(resolve(key)?);
                        copied = at + token.len();
                        search = copied;
                    }
                    None => {
                        search = at + text[at..].chars().next().map_or(1, char::len_utf8);
                    }
                }
            }
            out.push_text(&text[copied..]);
        }

        Ok(out)
    }
}

/// Pull segments off the queue up to the first text segment holding `close`.
///
/// Returns the bytes consumed before the delimiter and the text after it, or
/// `None` (leaving the queue untouched) when no delimiter follows.
fn take_until_close(queue: &mut VecDeque<Segment>, close: &str) -> Option<(Vec<u8>, String)> {
    let index = queue
        .iter()
        .position(|segment| matches!(segment, Segment::Text(text) if text.contains(close)))?;

    let mut spanned = Vec::new();
    for segment in queue.drain(..index) {
        match segment {
            Segment::Text(text) => spanned.extend_from_slice(text.as_bytes()),
            Segment::Value(value) => spanned.extend(value),
        }
    }

    match queue.pop_front() {
        Some(Segment::Text(text)) => {
            let end = text.find(close)?;
            spanned.extend_from_slice(&text.as_bytes()[..end]);
            Some((spanned, text[end + close.len()..].to_string()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upper(inner: Vec<u8>, _position: usize) -> Result<Vec<u8>, TemplateError> {
        Ok(inner.to_ascii_uppercase())
    }

    fn unclosed(position: usize) -> TemplateError {
        TemplateError::UnclosedPlaceholder { position }
    }

    #[test]
    fn test_rewrite_replaces_in_order() {
        let segments = Segments::from_template("a {{x:one}} b {{x:two}} c");
        let out = segments.rewrite("{{x:", "}}", OnUnclosed::Keep, upper).unwrap();
        assert_eq!(out.into_bytes(), b"a ONE b TWO c");
    }

    #[test]
    fn test_rewrite_does_not_rescan_values() {
        let segments = Segments::from_template("{{x:a}}");
        let out = segments
            .rewrite("{{x:", "}}", OnUnclosed::Keep, |_, _| Ok(b"{{x:b}}".to_vec()))
            .unwrap();
        let out = out.rewrite("{{x:", "}}", OnUnclosed::Keep, upper).unwrap();
        assert_eq!(out.into_bytes(), b"{{x:b}}");
    }

    #[test]
    fn test_rewrite_spans_values() {
        let segments = Segments::from_template("{{w:{{v}}!}}");
        let out = segments
            .replace_tokens("{{", &[("{{v}}".to_string(), ())], |_| Ok(b"mid".to_vec()))
            .unwrap();
        let out = out.rewrite("{{w:", "}}", OnUnclosed::Keep, upper).unwrap();
        assert_eq!(out.into_bytes(), b"MID!");
    }

    #[test]
    fn test_rewrite_unclosed_kept_or_failed() {
        let kept = Segments::from_template("a {{x:open")
            .rewrite("{{x:", "}}", OnUnclosed::Keep, upper)
            .unwrap();
        assert_eq!(kept.into_bytes(), b"a {{x:open");

        let failed = Segments::from_template("a {{x:open").rewrite("{{x:", "}}", OnUnclosed::Fail(unclosed), upper);
        assert!(matches!(
            failed,
            Err(TemplateError::UnclosedPlaceholder { position: 2 })
        ));
    }

    #[test]
    fn test_replace_tokens_skips_unknown() {
        let tokens = vec![("{{a}}".to_string(), 1u8)];
        let out = Segments::from_template("{{b}} {{{a}} {{a}}")
            .replace_tokens("{{", &tokens, |n| Ok(vec![b'0' + n]))
            .unwrap();
        assert_eq!(out.into_bytes(), b"{{b}} {1 1");
    }

    #[test]
    fn test_rewrite_many_placeholders_in_one_segment() {
        let template = "{{x:a}}-".repeat(1000);
        let out = Segments::from_template(&template)
            .rewrite("{{x:", "}}", OnUnclosed::Keep, upper)
            .unwrap();
        assert_eq!(out.into_bytes(), "A-".repeat(1000).into_bytes());
    }

    #[test]
    fn test_rewrite_continues_after_spanned_expression() {
        let segments = Segments::from_template("{{w:{{v}}}} {{w:b}}");
        let out = segments
            .replace_tokens("{{", &[("{{v}}".to_string(), ())], |_| Ok(b"a".to_vec()))
            .unwrap();
        let out = out.rewrite("{{w:", "}}", OnUnclosed::Keep, upper).unwrap();
        assert_eq!(out.into_bytes(), b"A B");
    }

    #[test]
    fn test_empty_value_keeps_boundary() {
        let out = Segments::from_template("{{x:gone}}a}}")
            .rewrite("{{x:", "}}", OnUnclosed::Keep, |_, _| Ok(Vec::new()))
            .unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out.into_bytes(), b"a}}");
    }
}
