use anyhow::{Context, Result};
use regex::Regex;

/// How keywords are looked up in the (already lowercased) message text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Unanchored containment, so "scammer" hits "scam"
    #[default]
    Substring,
    /// Keyword must sit between word boundaries
    WholeWord,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::Substring => "substring",
            MatchMode::WholeWord => "whole_word",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "substring" => Some(MatchMode::Substring),
            "whole_word" | "word" => Some(MatchMode::WholeWord),
            _ => None,
        }
    }
}

/// A fixed keyword list compiled for one match mode.
///
/// Matching is case-sensitive; callers lowercase the input first and the
/// keywords are lowercased on construction.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    keywords: Vec<String>,
    word_pattern: Option<Regex>,
}

impl KeywordMatcher {
    pub fn new<S: AsRef<str>>(keywords: &[S], mode: MatchMode) -> Result<Self> {
        let keywords: Vec<String> = keywords
            .iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        let word_pattern = match mode {
            MatchMode::Substring => None,
            MatchMode::WholeWord if keywords.is_empty() => None,
            MatchMode::WholeWord => {
                let alternation = keywords
                    .iter()
                    .map(|k| regex::escape(k))
                    .collect::<Vec<_>>()
                    .join("|");
                let pattern = format!(r"\b(?:{})\b", alternation);
                Some(Regex::new(&pattern).with_context(|| format!("invalid keyword pattern {}", pattern))?)
            }
        };

        Ok(Self { keywords, word_pattern })
    }

    pub fn substring<S: AsRef<str>>(keywords: &[S]) -> Self {
        Self {
            keywords: keywords
                .iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            word_pattern: None,
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        match &self.word_pattern {
            Some(re) => re.is_match(text),
            None => self.keywords.iter().any(|k| text.contains(k.as_str())),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn mode(&self) -> MatchMode {
        if self.word_pattern.is_some() {
            MatchMode::WholeWord
        } else {
            MatchMode::Substring
        }
    }
}
