//! Failure classification
//!
//! Providers do not share an error taxonomy, so classification is
//! best-effort: HTTP status first, then a prioritized substring matcher
//! table over the provider's error text, with `Unknown` as the final
//! fallback. The table is data-driven so new phrases can be added without
//! touching router logic.

use crate::provider::FailureKind;

/// One prioritized matcher: any needle found in the (lowercased) message
/// maps the failure to `kind`.
pub struct MatcherRule {
    pub kind: FailureKind,
    pub needles: &'static [&'static str],
}

/// Message matchers, evaluated in order. Earlier rules win.
pub const MESSAGE_RULES: &[MatcherRule] = &[
    MatcherRule {
        kind: FailureKind::AuthInvalid,
        needles: &[
            "invalid api key",
            "incorrect api key",
            "api key not valid",
            "invalid authentication",
            "unauthorized",
            "permission denied",
        ],
    },
    MatcherRule {
        kind: FailureKind::QuotaExceeded,
        needles: &[
            "quota",
            "billing",
            "rate limit",
            "insufficient_quota",
            "resource_exhausted",
            "resource has been exhausted",
        ],
    },
    MatcherRule {
        kind: FailureKind::ContentBlocked,
        needles: &[
            "safety",
            "blocked",
            "content policy",
            "content_filter",
            "prohibited",
        ],
    },
    MatcherRule {
        kind: FailureKind::ServiceUnavailable,
        needles: &[
            "overloaded",
            "unavailable",
            "internal error",
            "try again later",
            "bad gateway",
        ],
    },
];

/// Classify a provider failure from HTTP status and error message
///
/// Status codes with an unambiguous meaning (401/403, 429) short-circuit;
/// otherwise the message matcher table decides, and a 5xx status catches
/// anything the table missed.
pub fn classify(status: Option<u16>, message: &str) -> FailureKind {
    if let Some(code) = status {
        match code {
            401 | 403 => return FailureKind::AuthInvalid,
            429 => return FailureKind::QuotaExceeded,
            _ => {}
        }
    }

    let lowered = message.to_lowercase();
    for rule in MESSAGE_RULES {
        if rule.needles.iter().any(|needle| lowered.contains(needle)) {
            return rule.kind;
        }
    }

    if let Some(code) = status {
        if (500..=599).contains(&code) {
            return FailureKind::ServiceUnavailable;
        }
    }

    FailureKind::Unknown
}
