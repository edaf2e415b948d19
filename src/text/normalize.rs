//! Markup → speech-safe plain text.
//!
//! Assistant replies arrive as markdown with occasional inline HTML. Before
//! synthesis everything a listener cannot use is removed: links and their
//! targets, images, element references, citation markers and formatting
//! tokens. Readable content is kept.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// A single regex rewrite.
struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

impl Rule {
    fn new(pattern: &str, replacement: &'static str) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("static normalization pattern"),
            replacement,
        }
    }

    fn apply(&self, text: &str) -> String {
        self.pattern.replace_all(text, self.replacement).into_owned()
    }
}

/// Rules applied before element mentions are removed.
static MARKUP_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        // Anchors and buttons go with their content.
        Rule::new(r"(?i)<a\b[^>]*>.*?</a>", ""),
        Rule::new(r"(?i)<button\b[^>]*>.*?</button>", ""),
        // Autolinks before the generic tag rule so they never leave a label.
        Rule::new(r"(?i)<https?://[^>]+>", ""),
        // Any other tag: keep the inner text.
        Rule::new(r"<[^>]+>", ""),
        // Fenced code delimiters (with optional info string).
        Rule::new(r"(?m)^```[\w-]*\s*$", ""),
        Rule::new(r"`([^`]+)`", "$1"),
        // Images, then inline and reference-style links.
        Rule::new(r"!\[([^\]]*)\]\(([^)]+)\)", ""),
        Rule::new(r"\[([^\]]+)\]\(([^)]+)\)", ""),
        Rule::new(r"\[([^\]]+)\]\s*\[[^\]]*\]", ""),
    ]
});

/// Rules applied after element mentions are removed.
static TEXT_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        // Emphasis, strong and strikethrough keep their inner text.
        Rule::new(r"\*\*(.*?)\*\*", "$1"),
        Rule::new(r"__(.*?)__", "$1"),
        Rule::new(r"\*(.*?)\*", "$1"),
        Rule::new(r"_(.*?)_", "$1"),
        Rule::new(r"~~(.*?)~~", "$1"),
        // Block markers.
        Rule::new(r"(?m)^\s{0,3}#{1,6}\s*", ""),
        // Nested markers (`> > x`, `- - x`) go in one match.
        Rule::new(r"(?m)^[ \t]{0,3}(?:>[ \t]?)+", ""),
        Rule::new(r"(?m)^\s*([-*_]\s*){3,}\s*$", ""),
        Rule::new(r"(?m)^[ \t]*(?:[-+*][ \t]+)+", ""),
        Rule::new(r"(?m)^[ \t]*(?:\d+\.[ \t]+)+", ""),
        Rule::new(r"(?m)^\s*\[[^\]]+\]:\s+\S+.*$", ""),
        // Leftover citation markers such as [1] or [CITATION].
        Rule::new(r"\s*\[[^\]]+\]\s*", " "),
        // Whitespace.
        Rule::new(r"[ \t]+", " "),
        Rule::new(r"\n{3,}", "\n\n"),
    ]
});

/// Convert markdown/HTML into text suitable for a speech synthesizer.
///
/// `element_names` lists attachment names rendered next to the message; their
/// bracketed mentions (`[report.pdf]`) are dropped.
///
/// The result is trimmed per line and overall, contains no markup tags, link
/// or image syntax, and is stable under re-normalization. An empty result
/// means there is nothing to speak.
///
/// Passes repeat until the text stops changing. A pass that changes the text
/// either shortens it or turns tabs into spaces, so the loop terminates.
pub fn normalize(raw: &str, element_names: &BTreeSet<String>) -> String {
    let mut current = raw.replace("\r\n", "\n");
    loop {
        let next = normalize_pass(&current, element_names);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_pass(text: &str, element_names: &BTreeSet<String>) -> String {
    let mut text = MARKUP_RULES
        .iter()
        .fold(text.to_owned(), |acc, rule| rule.apply(&acc));

    for name in element_names.iter().filter(|n| !n.is_empty()) {
        text = text.replace(&format!("[{name}]"), "");
    }

    let text = TEXT_RULES.iter().fold(text, |acc, rule| rule.apply(&acc));

    text.split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_owned()
}
