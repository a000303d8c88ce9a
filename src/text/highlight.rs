use regex::{Regex, RegexBuilder};
use serde::Serialize;

/// Sentiment-bearing words marked in review text by default.
pub const DEFAULT_TERMS: &[&str] = &[
    "amazing", "awesome", "love", "great", "excellent", "bug", "boring", "terrible", "bad",
    "crash", "lag",
];

/// A run of text, either plain or matching one of the highlight terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub text: String,
    pub highlighted: bool,
}

/// Case-insensitive matcher over a set of literal terms.
#[derive(Debug, Clone)]
pub struct Highlighter {
    pattern: Option<Regex>,
}

impl Highlighter {
    /// Terms are matched literally; regex metacharacters are escaped.
    /// Blank terms are ignored; with none left nothing is highlighted.
    pub fn new<S: AsRef<str>>(terms: &[S]) -> Self {
        let alternatives: Vec<String> = terms
            .iter()
            .map(|t| t.as_ref().trim())
            .filter(|t| !t.is_empty())
            .map(regex::escape)
            .collect();
        if alternatives.is_empty() {
            return Self { pattern: None };
        }
        let pattern = RegexBuilder::new(&alternatives.join("|"))
            .case_insensitive(true)
            .build()
            .ok();
        Self { pattern }
    }

    /// Highlighter for a single free-text search query.
    pub fn for_query(query: &str) -> Self {
        Self::new(&[query])
    }

    /// Split `text` into alternating plain / highlighted segments. Joining
    /// the segment texts reproduces the input.
    pub fn segments(&self, text: &str) -> Vec<Segment> {
        let Some(pattern) = &self.pattern else {
            return plain(text);
        };
        let mut out = Vec::new();
        let mut last = 0;
        for m in pattern.find_iter(text) {
            if m.start() > last {
                out.push(Segment {
                    text: text[last..m.start()].to_string(),
                    highlighted: false,
                });
            }
            out.push(Segment {
                text: m.as_str().to_string(),
                highlighted: true,
            });
            last = m.end();
        }
        if last < text.len() {
            out.push(Segment {
                text: text[last..].to_string(),
                highlighted: false,
            });
        }
        out
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new(DEFAULT_TERMS)
    }
}

fn plain(text: &str) -> Vec<Segment> {
    if text.is_empty() {
        return Vec::new();
    }
    vec![Segment {
        text: text.to_string(),
        highlighted: false,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marked(segments: &[Segment]) -> Vec<&str> {
        segments
            .iter()
            .filter(|s| s.highlighted)
            .map(|s| s.text.as_str())
            .collect()
    }

    #[test]
    fn default_terms_match_case_insensitively() {
        let text = "Great story, but the LAG and a crash ruin it";
        let segments = Highlighter::default().segments(text);
        assert_eq!(marked(&segments), vec!["Great", "LAG", "crash"]);
        let joined: String = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(joined, text);
    }

    #[test]
    fn query_metacharacters_are_literal() {
        let segments = Highlighter::for_query("c++ (beta)").segments("Needs C++ (BETA) runtime");
        assert_eq!(marked(&segments), vec!["C++ (BETA)"]);
    }

    #[test]
    fn blank_query_highlights_nothing() {
        let segments = Highlighter::for_query("  ").segments("anything");
        assert_eq!(
            segments,
            vec![Segment {
                text: "anything".into(),
                highlighted: false
            }]
        );
        assert!(Highlighter::for_query("").segments("").is_empty());
    }
}
