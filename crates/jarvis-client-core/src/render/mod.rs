//! Raw message text to display fragments.
//!
//! Rendering is pure: the same text always yields the same fragments. Text runs
//! keep the raw characters; [`markup::to_html`] is the only place markup is
//! produced, and it escapes every run before wrapping it.

pub mod markup;

use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_SCREENSHOTS_PREFIX;
use crate::error::Result;

/// Save-location phrase immediately followed by a `name.png` token.
const PHRASE_PATTERN: &str =
    r"(?i)(?:screenshot salva em |salva em |saved at |saved to )([A-Za-z0-9_\-]+\.png)";

/// Timestamped capture names produced by the screenshot tool.
const BARE_PATTERN: &str = r"(?i)\b(screenshot_\d{8}_\d{6}\.png)\b";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InlineStyle {
    Strong,
    Emphasis,
    Code,
}

impl InlineStyle {
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::Emphasis => "em",
            Self::Code => "code",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub style: Option<InlineStyle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    pub filename: String,
    pub resource_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fragment {
    Text(TextRun),
    LineBreak,
    Image(ImageReference),
}

impl Fragment {
    fn plain(text: impl Into<String>) -> Self {
        Self::Text(TextRun {
            text: text.into(),
            style: None,
        })
    }

    fn styled(text: impl Into<String>, style: InlineStyle) -> Self {
        Self::Text(TextRun {
            text: text.into(),
            style: Some(style),
        })
    }
}

#[derive(Debug, Clone)]
pub struct MessageRenderer {
    phrase_pattern: Regex,
    bare_pattern: Regex,
    resource_prefix: String,
}

impl MessageRenderer {
    pub fn new() -> Result<Self> {
        Self::with_resource_prefix(DEFAULT_SCREENSHOTS_PREFIX)
    }

    pub fn with_resource_prefix(prefix: &str) -> Result<Self> {
        Ok(Self {
            phrase_pattern: Regex::new(PHRASE_PATTERN)?,
            bare_pattern: Regex::new(BARE_PATTERN)?,
            resource_prefix: prefix.to_string(),
        })
    }

    #[must_use]
    pub fn render(&self, text: &str) -> Vec<Fragment> {
        let mut fragments = Vec::new();
        let mut phrase_converted: HashSet<String> = HashSet::new();
        let mut pending = String::new();
        let mut cursor = 0;

        for captures in self.phrase_pattern.captures_iter(text) {
            let (Some(whole), Some(filename)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            self.render_bare_segment(
                &text[cursor..whole.start()],
                &mut pending,
                &phrase_converted,
                &mut fragments,
            );
            flush_text(&mut pending, &mut fragments);
            fragments.push(Fragment::Image(self.image(filename.as_str())));
            phrase_converted.insert(filename.as_str().to_string());
            cursor = whole.end();
        }

        self.render_bare_segment(
            &text[cursor..],
            &mut pending,
            &phrase_converted,
            &mut fragments,
        );
        flush_text(&mut pending, &mut fragments);
        fragments
    }

    /// Bare names already shown through a phrase reference stay literal; every other
    /// mention becomes its own image.
    fn render_bare_segment(
        &self,
        segment: &str,
        pending: &mut String,
        phrase_converted: &HashSet<String>,
        fragments: &mut Vec<Fragment>,
    ) {
        let mut cursor = 0;
        for found in self.bare_pattern.find_iter(segment) {
            let filename = found.as_str();
            if phrase_converted.contains(filename) {
                continue;
            }
            pending.push_str(&segment[cursor..found.start()]);
            flush_text(pending, fragments);
            fragments.push(Fragment::Image(self.image(filename)));
            cursor = found.end();
        }
        pending.push_str(&segment[cursor..]);
    }

    fn image(&self, filename: &str) -> ImageReference {
        ImageReference {
            filename: filename.to_string(),
            resource_path: format!("{}{}", self.resource_prefix, filename),
        }
    }
}

fn flush_text(pending: &mut String, fragments: &mut Vec<Fragment>) {
    if pending.is_empty() {
        return;
    }
    let text = std::mem::take(pending);
    for (index, line) in text.split('\n').enumerate() {
        if index > 0 {
            fragments.push(Fragment::LineBreak);
        }
        style_line(line, fragments);
    }
}

fn style_line(line: &str, fragments: &mut Vec<Fragment>) {
    let mut plain = String::new();
    let mut rest = line;

    while let Some(ch) = rest.chars().next() {
        if let Some((style, inner, consumed)) = match_delimited(rest) {
            if !plain.is_empty() {
                fragments.push(Fragment::plain(std::mem::take(&mut plain)));
            }
            fragments.push(Fragment::styled(inner, style));
            rest = &rest[consumed..];
            continue;
        }
        plain.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    if !plain.is_empty() {
        fragments.push(Fragment::plain(plain));
    }
}

/// Leftmost delimiter wins; the body must be non-empty and is never re-scanned.
/// Asterisk bodies may not start or end with whitespace, so `2 * 3 * 4` stays literal.
fn match_delimited(input: &str) -> Option<(InlineStyle, &str, usize)> {
    const DELIMITERS: [(&str, InlineStyle); 3] = [
        ("**", InlineStyle::Strong),
        ("*", InlineStyle::Emphasis),
        ("`", InlineStyle::Code),
    ];

    DELIMITERS.iter().find_map(|(delimiter, style)| {
        let body = input.strip_prefix(delimiter)?;
        let end = body.find(delimiter)?;
        let inner = &body[..end];
        if inner.is_empty() {
            return None;
        }
        if *style != InlineStyle::Code
            && (inner.starts_with(char::is_whitespace) || inner.ends_with(char::is_whitespace))
        {
            return None;
        }
        Some((*style, inner, end + delimiter.len() * 2))
    })
}
