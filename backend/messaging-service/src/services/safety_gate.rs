use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Heuristic scan of outgoing message text for off-platform contact and
/// payment signals. Runs only on appointment conversations: that is where a
/// client and cleaner coordinating a job could take the transaction off the
/// platform.

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\(\d{3}\)\s?|\b\d{3}[-.\s])\d{3}[-.\s]?\d{4}\b")
        .expect("phone regex pattern is valid")
});

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
        .expect("email regex pattern is valid")
});

const PAYMENT_KEYWORDS: &[&str] = &[
    "venmo",
    "cashapp",
    "cash app",
    "zelle",
    "paypal",
    "pay cash",
    "cash payment",
    "pay me directly",
    "pay outside",
];

pub const TYPE_PHONE_NUMBER: &str = "phone_number";
pub const TYPE_EMAIL: &str = "email";
pub const TYPE_OFF_PLATFORM_PAYMENT: &str = "off_platform_payment";

#[derive(Debug, Clone, Serialize)]
pub struct SafetyVerdict {
    pub is_suspicious: bool,
    pub types: Vec<String>,
}

impl SafetyVerdict {
    pub fn clean() -> Self {
        Self {
            is_suspicious: false,
            types: Vec::new(),
        }
    }
}

pub fn analyze(text: &str) -> SafetyVerdict {
    let mut types = Vec::new();

    if PHONE_RE.is_match(text) {
        types.push(TYPE_PHONE_NUMBER.to_string());
    }
    if EMAIL_RE.is_match(text) {
        types.push(TYPE_EMAIL.to_string());
    }

    let lowered = text.to_lowercase();
    if PAYMENT_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        types.push(TYPE_OFF_PLATFORM_PAYMENT.to_string());
    }

    SafetyVerdict {
        is_suspicious: !types.is_empty(),
        types,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_phone_numbers() {
        let verdict = analyze("call me at 555-123-4567");
        assert!(verdict.is_suspicious);
        assert_eq!(verdict.types, vec![TYPE_PHONE_NUMBER]);

        assert!(analyze("my number is (555) 123 4567").is_suspicious);
        assert!(analyze("text 555.123.4567 anytime").is_suspicious);
    }

    #[test]
    fn flags_email_addresses() {
        let verdict = analyze("reach me at sparkle.pro@example.com instead");
        assert!(verdict.is_suspicious);
        assert_eq!(verdict.types, vec![TYPE_EMAIL]);
    }

    #[test]
    fn flags_payment_keywords_case_insensitively() {
        let verdict = analyze("I take Venmo or Zelle if that's easier");
        assert!(verdict.is_suspicious);
        assert_eq!(verdict.types, vec![TYPE_OFF_PLATFORM_PAYMENT]);
    }

    #[test]
    fn reports_multiple_types() {
        let verdict = analyze("venmo me, or call 555-123-4567");
        assert!(verdict.is_suspicious);
        assert!(verdict.types.contains(&TYPE_PHONE_NUMBER.to_string()));
        assert!(verdict.types.contains(&TYPE_OFF_PLATFORM_PAYMENT.to_string()));
    }

    #[test]
    fn clean_text_passes() {
        let verdict = analyze("See you Tuesday at 10, the key is under the mat");
        assert!(!verdict.is_suspicious);
        assert!(verdict.types.is_empty());
    }

    #[test]
    fn short_number_runs_are_not_phones() {
        assert!(!analyze("apartment 4512, floor 3").is_suspicious);
    }
}
