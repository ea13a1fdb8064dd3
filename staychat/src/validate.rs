//! Outgoing message validation.
//!
//! The rule set is an ordered table of named checks evaluated in sequence;
//! the first failing rule wins and nothing is corrected or sanitized —
//! content that trips a rule is rejected wholesale before any network
//! traffic happens.

use staychat_api::types::MAX_BODY_CHARS;

/// Why an outgoing message was rejected locally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    /// Nothing left after trimming whitespace.
    #[error("message is empty")]
    Empty,

    /// Body exceeds the character limit.
    #[error("message too long ({len} characters, max {max})")]
    TooLong {
        /// Characters in the trimmed body.
        len: usize,
        /// Maximum allowed characters.
        max: usize,
    },

    /// Body contains executable markup (script tag, `javascript:` URI,
    /// inline event handler, `eval` call).
    #[error("message contains forbidden markup: {0}")]
    ForbiddenMarkup(&'static str),

    /// More than 80% of the alphabetic characters are uppercase.
    #[error("message is mostly uppercase")]
    ExcessiveCaps,

    /// A single character repeated 11+ times in a row.
    #[error("character {0:?} repeated too many times")]
    RepeatedRun(char),
}

/// A single validation rule: a name plus a predicate returning the
/// rejection, if any.
struct Rule {
    name: &'static str,
    check: fn(&str) -> Option<RejectReason>,
}

/// The ordered rule table. Order matters: the first failing rule wins.
const RULES: &[Rule] = &[
    Rule {
        name: "non-empty",
        check: check_non_empty,
    },
    Rule {
        name: "length",
        check: check_length,
    },
    Rule {
        name: "markup",
        check: check_markup,
    },
    Rule {
        name: "caps",
        check: check_caps,
    },
    Rule {
        name: "repetition",
        check: check_repetition,
    },
];

/// Validates raw composer input for sending.
///
/// Returns the trimmed body on success.
///
/// # Errors
///
/// Returns the [`RejectReason`] of the first rule the content fails.
pub fn validate_outgoing(raw: &str) -> Result<String, RejectReason> {
    let trimmed = raw.trim();
    for rule in RULES {
        if let Some(reason) = (rule.check)(trimmed) {
            tracing::debug!(rule = rule.name, %reason, "outgoing message rejected");
            return Err(reason);
        }
    }
    Ok(trimmed.to_string())
}

fn check_non_empty(body: &str) -> Option<RejectReason> {
    body.is_empty().then_some(RejectReason::Empty)
}

fn check_length(body: &str) -> Option<RejectReason> {
    let len = body.chars().count();
    (len > MAX_BODY_CHARS).then_some(RejectReason::TooLong {
        len,
        max: MAX_BODY_CHARS,
    })
}

/// Rejects known executable-markup patterns, case-insensitively.
fn check_markup(body: &str) -> Option<RejectReason> {
    let lowered = body.to_lowercase();
    if lowered.contains("<script") {
        return Some(RejectReason::ForbiddenMarkup("script tag"));
    }
    if lowered.contains("javascript:") {
        return Some(RejectReason::ForbiddenMarkup("javascript: uri"));
    }
    if lowered.contains("eval(") {
        return Some(RejectReason::ForbiddenMarkup("eval call"));
    }
    if has_inline_handler(&lowered) {
        return Some(RejectReason::ForbiddenMarkup("inline event handler"));
    }
    None
}

/// Detects `on<word>=` attribute shapes, e.g. `onerror=` or `onclick =`.
///
/// The token must start at a word boundary so that prose like "carbon="
/// does not trip the rule.
fn has_inline_handler(lowered: &str) -> bool {
    let bytes = lowered.as_bytes();
    for (idx, window) in bytes.windows(2).enumerate() {
        if window != b"on" {
            continue;
        }
        let boundary = idx == 0 || !bytes[idx - 1].is_ascii_alphanumeric();
        if !boundary {
            continue;
        }
        // Require at least one alphabetic char after "on", then optional
        // spaces, then '='.
        let mut cursor = idx + 2;
        let name_start = cursor;
        while cursor < bytes.len() && bytes[cursor].is_ascii_alphabetic() {
            cursor += 1;
        }
        if cursor == name_start {
            continue;
        }
        while cursor < bytes.len() && bytes[cursor] == b' ' {
            cursor += 1;
        }
        if cursor < bytes.len() && bytes[cursor] == b'=' {
            return true;
        }
    }
    false
}

/// Rejects shouting: > 80% uppercase among alphabetic characters, when
/// there are more than 10 alphabetic characters.
fn check_caps(body: &str) -> Option<RejectReason> {
    let mut alpha = 0usize;
    let mut upper = 0usize;
    for ch in body.chars() {
        if ch.is_alphabetic() {
            alpha += 1;
            if ch.is_uppercase() {
                upper += 1;
            }
        }
    }
    (alpha > 10 && upper * 5 > alpha * 4).then_some(RejectReason::ExcessiveCaps)
}

/// Rejects any single character repeated 11+ times consecutively.
fn check_repetition(body: &str) -> Option<RejectReason> {
    let mut run_char = None;
    let mut run_len = 0usize;
    for ch in body.chars() {
        if Some(ch) == run_char {
            run_len += 1;
            if run_len >= 11 {
                return Some(RejectReason::RepeatedRun(ch));
            }
        } else {
            run_char = Some(ch);
            run_len = 1;
        }
    }
    None
}
