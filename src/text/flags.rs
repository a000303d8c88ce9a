use serde::Serialize;

/// Reviews shorter than this are flagged as likely spam.
const SHORT_SPAM_CHARS: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewFlag {
    ShortSpam,
    AllCaps,
    HasLink,
}

impl ReviewFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewFlag::ShortSpam => "short_spam",
            ReviewFlag::AllCaps => "all_caps",
            ReviewFlag::HasLink => "has_link",
        }
    }
}

/// Moderation heuristics for one review text.
pub fn review_flags(text: &str) -> Vec<ReviewFlag> {
    let len = text.chars().count();
    let mut flags = Vec::new();
    if len < SHORT_SPAM_CHARS {
        flags.push(ReviewFlag::ShortSpam);
    }
    if len > SHORT_SPAM_CHARS && is_all_caps(text) {
        flags.push(ReviewFlag::AllCaps);
    }
    if text.contains("http://") || text.contains("https://") {
        flags.push(ReviewFlag::HasLink);
    }
    flags
}

/// Flags joined with commas, empty when the review is clean.
pub fn flag_string(text: &str) -> String {
    review_flags(text)
        .iter()
        .map(ReviewFlag::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

// At least one cased character and no lowercase ones.
fn is_all_caps(text: &str) -> bool {
    let mut cased = false;
    for c in text.chars() {
        if c.is_lowercase() {
            return false;
        }
        cased |= c.is_uppercase();
    }
    cased
}
