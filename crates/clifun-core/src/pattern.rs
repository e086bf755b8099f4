use regex::{Regex, RegexBuilder};

use crate::error::Result;

/// Matches text either exactly or with an unanchored regex search.
#[derive(Debug, Clone)]
pub enum Matcher {
    Exact { text: String, ignore_case: bool },
    Regex(Regex),
}

impl Matcher {
    pub fn new(pattern: &str, regex: bool, ignore_case: bool) -> Result<Self> {
        if regex {
            let re = RegexBuilder::new(pattern)
                .case_insensitive(ignore_case)
                .build()?;
            Ok(Matcher::Regex(re))
        } else {
            Ok(Matcher::Exact {
                text: pattern.to_string(),
                ignore_case,
            })
        }
    }

    pub fn exact(text: &str) -> Self {
        Matcher::Exact {
            text: text.to_string(),
            ignore_case: false,
        }
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        match self {
            Matcher::Exact { text, ignore_case: false } => text == candidate,
            Matcher::Exact { text, ignore_case: true } => text.to_lowercase() == candidate.to_lowercase(),
            Matcher::Regex(re) => re.is_match(candidate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_regex() {
        let words = ["Is", "that", "your", "own", "brown", "cow"];
        let own = Matcher::new("own", false, false).unwrap();
        assert_eq!(words.iter().filter(|w| own.is_match(w)).count(), 1);
        let own_re = Matcher::new("own", true, false).unwrap();
        assert_eq!(words.iter().filter(|w| own_re.is_match(w)).count(), 2);
        let anchored = Matcher::new("^own$", true, false).unwrap();
        assert_eq!(words.iter().filter(|w| anchored.is_match(w)).count(), 1);
        let ci = Matcher::new("IS", false, true).unwrap();
        assert!(ci.is_match("is"));
        assert!(Matcher::new("(", true, false).is_err());
    }
}
