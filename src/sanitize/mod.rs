//! Converts annotated scripts into plain narration text.
//!
//! Generated scripts carry structural markers such as `[HOOK]` or `CTA:` that
//! a text-to-speech voice would read aloud. [`sanitize`] strips them and tidies
//! whitespace and repeated punctuation so only the spoken dialogue remains.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Section labels removed from the start of a line, longest first
const SECTION_LABELS: &[&str] = &[
    "CLOSING STATEMENT",
    "HOOK",
    "BODY",
    "CTA",
    "CLOSING",
    "STATEMENT",
];

static BRACKETED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("valid regex"));

static STRAY_BRACKET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\[\]]").expect("valid regex"));

static SECTION_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(r"(?im)^\s*(?:{})\b:?\s*", SECTION_LABELS.join("|"));
    Regex::new(&pattern).expect("valid regex")
});

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static REPEATED_PUNCTUATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.{2,}|!{2,}|\?{2,}").expect("valid regex"));

/// Strip bracketed markers, section labels and noisy punctuation from a script.
///
/// Never fails. The output contains no `[` or `]` and
/// `sanitize(&sanitize(s)) == sanitize(s)` holds for every input.
pub fn sanitize(raw: &str) -> String {
    let without_markers = BRACKETED_RE.replace_all(raw, "");
    let mut text = STRAY_BRACKET_RE.replace_all(&without_markers, "").into_owned();

    // Removing one label can expose another at the same line start
    loop {
        match SECTION_LABEL_RE.replace_all(&text, "") {
            Cow::Borrowed(_) => break,
            Cow::Owned(stripped) => text = stripped,
        }
    }

    let collapsed = WHITESPACE_RE.replace_all(&text, " ");
    let trimmed = collapsed.trim();

    REPEATED_PUNCTUATION_RE
        .replace_all(trimmed, |caps: &regex::Captures<'_>| {
            let run = &caps[0];
            if run == "..." {
                // ellipsis
                run.to_string()
            } else {
                run[..1].to_string()
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORPUS: &[&str] = &[
        "[HOOK] Did you know...?? [BODY] This is amazing!!! [CTA] Subscribe now.",
        "[HOOK]   [CTA]  ",
        "",
        "   ",
        "HOOK: Start here\nBODY: middle part\nCLOSING STATEMENT: the end",
        "BODY: HOOK: stacked labels",
        "  \n  hook - lowercase label",
        "Nested [outer [inner] tail] done",
        "Unbalanced ] and [ brackets",
        "Wait.... what!!!! really????",
        "Hooked on phonics, BODY text stays mid-line",
        "[x]HOOK: label after a marker",
        "cta:\n\nclosing: statement: all labels",
        "Tabs\tand\r\nwindows\r\nCTA: lines",
    ];

    #[test]
    fn test_reference_example() {
        assert_eq!(
            sanitize("[HOOK] Did you know...?? [BODY] This is amazing!!! [CTA] Subscribe now."),
            "Did you know...? This is amazing! Subscribe now."
        );
    }

    #[test]
    fn test_only_markers_and_whitespace() {
        assert_eq!(sanitize("[HOOK]   [CTA]  "), "");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_line_leading_labels() {
        assert_eq!(
            sanitize("HOOK: Start here\nBODY: middle part\nCLOSING STATEMENT: the end"),
            "Start here middle part the end"
        );
        assert_eq!(sanitize("cta:\n\nclosing: statement: all labels"), "all labels");
        assert_eq!(sanitize("Statement Nothing else"), "Nothing else");
    }

    #[test]
    fn test_labels_only_removed_at_line_start() {
        assert_eq!(
            sanitize("Hooked on phonics, BODY text stays mid-line"),
            "Hooked on phonics, BODY text stays mid-line"
        );
    }

    #[test]
    fn test_brackets_removed() {
        assert_eq!(sanitize("Nested [outer [inner] tail] done"), "Nested tail done");
        assert_eq!(sanitize("Unbalanced ] and [ brackets"), "Unbalanced and brackets");
    }

    #[test]
    fn test_repeated_punctuation() {
        assert_eq!(sanitize("Wait.... what!!!! really????"), "Wait. what! really?");
        assert_eq!(sanitize("Hmm.. ok"), "Hmm. ok");
        assert_eq!(sanitize("So..."), "So...");
    }

    #[test]
    fn test_never_contains_brackets() {
        for input in CORPUS {
            let out = sanitize(input);
            assert!(!out.contains('[') && !out.contains(']'), "{input:?} -> {out:?}");
        }
    }

    #[test]
    fn test_idempotent() {
        for input in CORPUS {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "not idempotent for {input:?}");
        }
    }
}
