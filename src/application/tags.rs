//! Hashtag extraction from free text.
//!
//! Multi-codepoint emoji are swapped for private-use placeholders before
//! matching so a keycap `#️⃣` never opens a tag and a ZWJ sequence inside a
//! tag is kept whole.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use unicode_segmentation::UnicodeSegmentation;

const PLACEHOLDER_OPEN: char = '\u{E000}';
const PLACEHOLDER_CLOSE: char = '\u{E001}';

/// A `#` followed by at least one character that is neither `#` nor whitespace.
static TAG_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| compile(r"#[^#\s]+"));

static PLACEHOLDER_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| compile(&format!("{PLACEHOLDER_OPEN}([0-9]+){PLACEHOLDER_CLOSE}")));

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
            tracing::warn!("Tag pattern failed to compile: {}", e);
            None
        }
    }
}

/// Extracts the set of `#tags` in `text`.
///
/// Never fails: if the pattern is unavailable the result is empty, so a
/// save is never blocked by tag extraction.
pub fn extract_tags(text: &str) -> BTreeSet<String> {
    let Some(pattern) = TAG_PATTERN.as_ref() else {
        return BTreeSet::new();
    };

    let (escaped, emoji) = escape_emoji(text);

    pattern
        .find_iter(&escaped)
        .map(|m| unescape_emoji(m.as_str().trim(), &emoji))
        .collect()
}

/// Normalizes a user-supplied tag name to `#name`, or `None` if nothing remains.
pub fn normalize_tag(name: &str) -> Option<String> {
    let body: String = name
        .trim()
        .chars()
        .filter(|c| *c != '#' && !c.is_whitespace())
        .collect();
    (!body.is_empty()).then(|| format!("#{body}"))
}

fn escape_emoji(text: &str) -> (String, Vec<&str>) {
    let mut escaped = String::with_capacity(text.len());
    let mut emoji = Vec::new();

    for grapheme in text.graphemes(true) {
        // Literal placeholder characters are escaped too, so they survive unescaping.
        if is_emoji_sequence(grapheme)
            || grapheme.contains([PLACEHOLDER_OPEN, PLACEHOLDER_CLOSE])
        {
            escaped.push(PLACEHOLDER_OPEN);
            escaped.push_str(&emoji.len().to_string());
            escaped.push(PLACEHOLDER_CLOSE);
            emoji.push(grapheme);
        } else {
            escaped.push_str(grapheme);
        }
    }

    (escaped, emoji)
}

fn unescape_emoji(token: &str, emoji: &[&str]) -> String {
    if emoji.is_empty() {
        return token.to_string();
    }
    let Some(pattern) = PLACEHOLDER_PATTERN.as_ref() else {
        return token.to_string();
    };

    pattern
        .replace_all(token, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| emoji.get(i))
                .map_or_else(|| caps[0].to_string(), |e| (*e).to_string())
        })
        .into_owned()
}

/// A grapheme of several code points that contains an emoji component.
fn is_emoji_sequence(grapheme: &str) -> bool {
    grapheme.chars().nth(1).is_some() && grapheme.chars().any(is_emoji_component)
}

const fn is_emoji_component(c: char) -> bool {
    matches!(
        c as u32,
        0x200D                 // zero width joiner
            | 0x20E3           // combining keycap
            | 0xFE0F           // emoji presentation selector
            | 0x2600..=0x27BF
            | 0x1F000..=0x1FAFF
            | 0xE0020..=0xE007F // tag sequences
    )
}
