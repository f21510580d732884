//! Prompt pattern sets and the multi-pattern matcher.

use crate::error::Result;
use regex::Regex;

/// Label of the primary prompt entry in a compiled [`PromptPatterns`] set.
pub const PROMPT_LABEL: &str = "prompt";
/// Label of the continuation entry in a compiled [`PromptPatterns`] set.
pub const CONTINUATION_LABEL: &str = "continuation";

/// Location of a pattern match inside the searched text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternMatch {
    /// Index of the matching pattern in its [`PatternSet`].
    pub index: usize,
    /// Byte offset of the match start.
    pub start: usize,
    /// Byte offset one past the match end.
    pub end: usize,
}

/// Ordered list of labelled regular expressions.
///
/// The order only breaks ties: when several patterns match, the one starting
/// earliest wins, and among matches starting at the same offset the pattern
/// added first wins.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    entries: Vec<(String, Regex)>,
}

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `pattern` and append it under `label`.
    pub fn push(&mut self, label: impl Into<String>, pattern: &str) -> Result<&mut Self> {
        self.entries.push((label.into(), Regex::new(pattern)?));
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|(label, _)| label.as_str())
    }

    /// Human-readable summary such as `prompt "bash> ", continuation "> "`.
    pub fn describe(&self) -> String {
        self.entries
            .iter()
            .map(|(label, re)| format!("{label} {:?}", re.as_str()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Find the earliest match of any pattern in `text`.
    pub fn find(&self, text: &str) -> Option<PatternMatch> {
        let mut best: Option<PatternMatch> = None;
        for (index, (_, re)) in self.entries.iter().enumerate() {
            let Some(m) = re.find(text) else { continue };
            // Strict comparison keeps the lower index on equal starts.
            if best.is_none_or(|b| m.start() < b.start) {
                best = Some(PatternMatch {
                    index,
                    start: m.start(),
                    end: m.end(),
                });
            }
        }
        best
    }
}

/// The two pattern slots a session synchronises on.
///
/// Each slot is replaced independently; setting a new continuation never
/// wraps the previous set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPatterns {
    pub prompt: String,
    pub continuation: Option<String>,
}

impl PromptPatterns {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            continuation: None,
        }
    }

    pub fn with_continuation(mut self, continuation: impl Into<String>) -> Self {
        self.continuation = Some(continuation.into());
        self
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn set_continuation(&mut self, continuation: impl Into<String>) {
        self.continuation = Some(continuation.into());
    }

    /// Compile into a set holding the prompt first, then the continuation.
    pub fn compile(&self) -> Result<PatternSet> {
        let mut set = PatternSet::new();
        set.push(PROMPT_LABEL, &self.prompt)?;
        if let Some(continuation) = &self.continuation {
            set.push(CONTINUATION_LABEL, continuation)?;
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern_set(patterns: &[&str]) -> PatternSet {
        let mut set = PatternSet::new();
        for (i, p) in patterns.iter().enumerate() {
            set.push(format!("p{i}"), p).unwrap();
        }
        set
    }

    #[test]
    fn test_earliest_start_wins_over_order() {
        let set = pattern_set(&["world", "hello"]);
        let m = set.find("hello world").unwrap();
        assert_eq!(m.index, 1);
        assert_eq!((m.start, m.end), (0, 5));
    }

    #[test]
    fn test_equal_start_lowest_index_wins() {
        let set = pattern_set(&[r"\r\n> ", r"\r\n> more"]);
        let m = set.find("out\r\n> more").unwrap();
        assert_eq!(m.index, 0);
        assert_eq!(m.end, 7);

        let set = pattern_set(&[r"\r\n> more", r"\r\n> "]);
        let m = set.find("out\r\n> more").unwrap();
        assert_eq!(m.index, 0);
        assert_eq!(m.end, 11);
    }

    #[test]
    fn test_prompt_prefix_of_continuation() {
        // "\r\n> " is the R prompt, "\r\n[+] " its continuation.
        let set = PromptPatterns::new(r"\r\n> ")
            .with_continuation(r"\r\n[+] ")
            .compile()
            .unwrap();
        let m = set.find("x <- function() {\r\n+ ").unwrap();
        assert_eq!(set.label(m.index), Some(CONTINUATION_LABEL));
        let m = set.find("[1] 2\r\n> ").unwrap();
        assert_eq!(set.label(m.index), Some(PROMPT_LABEL));
    }

    #[test]
    fn test_no_match() {
        assert!(pattern_set(&["bash> "]).find("nothing here").is_none());
        assert!(PatternSet::new().find("anything").is_none());
    }

    #[test]
    fn test_invalid_regex() {
        let mut set = PatternSet::new();
        assert!(set.push("bad", "(unclosed").is_err());
        assert!(set.is_empty());
    }

    #[test]
    fn test_slots_replace_without_nesting() {
        let mut patterns = PromptPatterns::new("a> ");
        patterns.set_continuation("b> ");
        patterns.set_continuation("c> ");
        patterns.set_prompt("d> ");
        assert_eq!(patterns, PromptPatterns::new("d> ").with_continuation("c> "));

        let set = patterns.compile().unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.label(0), Some(PROMPT_LABEL));
        assert_eq!(set.label(1), Some(CONTINUATION_LABEL));
    }

    #[test]
    fn test_describe() {
        let set = PromptPatterns::new(r"bash> ").compile().unwrap();
        assert_eq!(set.describe(), r#"prompt "bash> ""#);
    }
}
