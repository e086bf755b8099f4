//! Plain-text helpers: word splitting, character/word frequency info and
//! word-distance statistics.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::error::{Error, Result};
use crate::pattern::Matcher;

static LOREM: &str = include_str!("lorem.txt");

static WORD_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w'\-]").expect("word break pattern is valid"));

/// The classic lipsum.com filler text (twelve paragraphs).
pub fn lorem_ipsum() -> &'static str {
    LOREM
}

/// Splits on anything that is not a word character, apostrophe or hyphen,
/// so `Anne-Marie` and `What's` stay whole.
pub fn get_words(text: &str) -> Vec<&str> {
    WORD_BREAK.split(text).filter(|w| !w.is_empty()).collect()
}

pub fn split_whitespace(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

fn tokens_info<I, S>(tokens: I) -> Value
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut total = 0usize;
    let mut each: BTreeMap<String, usize> = BTreeMap::new();
    for t in tokens {
        total += 1;
        *each.entry(t.into()).or_default() += 1;
    }
    json!({"counts": {"total": total, "distinct": each.len(), "each": each}})
}

/// Length plus case-insensitive character and word frequencies.
/// Empty text only reports its length.
pub fn get_info(text: &str) -> Value {
    let mut d = Map::new();
    d.insert("length".into(), json!(text.chars().count()));
    if text.is_empty() {
        return Value::Object(d);
    }
    let chars = text.chars().map(|c| c.to_lowercase().collect::<String>());
    let words = get_words(text).into_iter().map(str::to_lowercase);
    d.insert(
        "metrics".into(),
        json!({"chars": tokens_info(chars), "words": tokens_info(words)}),
    );
    Value::Object(d)
}

/// How items are compared against a pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindMode {
    pub regex: bool,
    pub ignore_case: bool,
}

impl FindMode {
    fn matcher(self, item: &str) -> Result<Matcher> {
        Matcher::new(item, self.regex, self.ignore_case)
    }
}

/// `(index, value)` for every element of `items` matching `item`.
pub fn find_all<'a, S: AsRef<str>>(item: &str, items: &'a [S], mode: FindMode) -> Result<Vec<(usize, &'a str)>> {
    let matcher = mode.matcher(item)?;
    Ok(items
        .iter()
        .map(AsRef::<str>::as_ref)
        .enumerate()
        .filter(|(_, v)| matcher.is_match(v))
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistanceStats {
    pub min: usize,
    pub max: usize,
    pub mean: f64,
}

/// Min, max and mean of `|a - b|` over every pair drawn from the two index sets.
pub fn index_distance_stats(first: &[usize], second: &[usize]) -> Result<DistanceStats> {
    if first.is_empty() {
        return Err(Error::InvalidArgument("first index set is empty".into()));
    }
    if second.is_empty() {
        return Err(Error::InvalidArgument("second index set is empty".into()));
    }
    let mut min = usize::MAX;
    let mut max = 0;
    let mut sum = 0u128;
    for &a in first {
        for &b in second {
            let d = a.abs_diff(b);
            min = min.min(d);
            max = max.max(d);
            sum += d as u128;
        }
    }
    let pairs = (first.len() * second.len()) as f64;
    Ok(DistanceStats {
        min,
        max,
        mean: sum as f64 / pairs,
    })
}

fn distinct_indexes<P: AsRef<str>, W: AsRef<str>>(patterns: &[P], words: &[W], mode: FindMode) -> Result<BTreeSet<usize>> {
    let mut out = BTreeSet::new();
    for p in patterns {
        out.extend(find_all(p.as_ref(), words, mode)?.into_iter().map(|(i, _)| i));
    }
    Ok(out)
}

fn matches_detail<W: AsRef<str>>(indexes: &BTreeSet<usize>, words: &[W]) -> Value {
    let mut detail: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for &i in indexes {
        detail.entry(words[i].as_ref()).or_default().push(i);
    }
    json!(detail)
}

/// Distance statistics between the words matching any of `first` and the
/// words matching any of `second`. With `verbose`, the matched words and their
/// indexes are added as `matches1` / `matches2`.
pub fn find_distances<P: AsRef<str>, W: AsRef<str>>(
    first: &[P],
    second: &[P],
    words: &[W],
    mode: FindMode,
    verbose: bool,
) -> Result<Value> {
    let idx1 = distinct_indexes(first, words, mode)?;
    let idx2 = distinct_indexes(second, words, mode)?;
    tracing::debug!(first = idx1.len(), second = idx2.len(), "matched word indexes");
    let a: Vec<usize> = idx1.iter().copied().collect();
    let b: Vec<usize> = idx2.iter().copied().collect();
    let stats = index_distance_stats(&a, &b)?;
    let mut out = serde_json::to_value(stats)?;
    if verbose && let Value::Object(map) = &mut out {
        map.insert("matches1".into(), matches_detail(&idx1, words));
        map.insert("matches2".into(), matches_detail(&idx2, words));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lorem_is_fixed() {
        let text = lorem_ipsum();
        assert_eq!(text.chars().count(), 6877);
        assert!(text.starts_with("Lorem ipsum dolor sit amet, consectetur "));
        assert!(text.ends_with(", hendrerit nulla."));
        assert_eq!(get_words(text).len(), 1009);
    }

    #[test]
    fn words_keep_hyphens_and_apostrophes() {
        assert_eq!(
            get_words("Hi! My name is Anne Marie. What is yours?"),
            vec!["Hi", "My", "name", "is", "Anne", "Marie", "What", "is", "yours"]
        );
        assert_eq!(
            get_words("Hi! My name is Anne-Marie. What's yours?"),
            vec!["Hi", "My", "name", "is", "Anne-Marie", "What's", "yours"]
        );
        assert!(get_words(" ,.!").is_empty());
    }

    #[test]
    fn info_counts_lowercased_tokens() {
        assert_eq!(get_info(""), json!({"length": 0}));
        let info = get_info("Hi! My name is Anne-Marie. What's yours? Hi again");
        assert_eq!(info["length"], json!(49));
        let words = &info["metrics"]["words"]["counts"];
        assert_eq!(words["total"], json!(9));
        assert_eq!(words["distinct"], json!(8));
        assert_eq!(words["each"]["hi"], json!(2));
        assert_eq!(words["each"]["anne-marie"], json!(1));
        let keys: Vec<&String> = words["each"].as_object().unwrap().keys().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);

        let chars = get_info("Abba");
        assert_eq!(
            chars["metrics"]["chars"],
            json!({"counts": {"total": 4, "distinct": 2, "each": {"a": 2, "b": 2}}})
        );
    }

    #[test]
    fn find_all_modes() {
        let words = ["Is", "that", "your", "own", "brown", "cow"];
        let exact = FindMode::default();
        let re = FindMode {
            regex: true,
            ignore_case: false,
        };
        assert_eq!(find_all("own", &words, exact).unwrap(), vec![(3, "own")]);
        assert_eq!(
            find_all("own", &words, re).unwrap(),
            vec![(3, "own"), (4, "brown")]
        );
        assert_eq!(find_all("^own$", &words, re).unwrap(), vec![(3, "own")]);

        let how = ["How", "now", "brown", "cow"];
        assert!(find_all("ow", &how, exact).unwrap().is_empty());
        assert_eq!(
            find_all("ow$", &how, re).unwrap(),
            vec![(0, "How"), (1, "now"), (3, "cow")]
        );
        let ci = FindMode {
            regex: true,
            ignore_case: true,
        };
        assert_eq!(
            find_all(r"^[a-z]ow", &how, ci).unwrap(),
            vec![(0, "How"), (1, "now"), (3, "cow")]
        );
    }

    #[test]
    fn distance_stats() {
        assert!(index_distance_stats(&[], &[]).is_err());
        assert!(index_distance_stats(&[1, 3, 5, 7, 9], &[]).is_err());
        let s = index_distance_stats(&[1, 3, 5, 7, 9], &[1, 4, 9, 16, 25, 36, 49]).unwrap();
        assert_eq!((s.min, s.max), (0, 48));
        assert_eq!(s.mean, 16.65714285714286);
        let s = index_distance_stats(&[4, 16, 36, 64], &[9, 25, 49, 81]).unwrap();
        assert_eq!(
            s,
            DistanceStats {
                min: 5,
                max: 77,
                mean: 30.25
            }
        );
    }

    #[test]
    fn distances_in_lorem() {
        let words = get_words(lorem_ipsum());
        let d = find_distances(&["lorem"], &["ipsum"], &words, FindMode::default(), false).unwrap();
        assert_eq!(d, json!({"min": 83, "max": 893, "mean": 402.56}));

        let d = find_distances(
            &["lorem", "dolor"],
            &["consectetur", "adipiscing"],
            &words,
            FindMode::default(),
            false,
        )
        .unwrap();
        assert_eq!(d, json!({"min": 3, "max": 889, "mean": 467.0740740740741}));

        let mode = FindMode {
            regex: true,
            ignore_case: true,
        };
        let d = find_distances(&["^Pellentesque$"], &["^Vivamus"], &words, mode, false).unwrap();
        assert_eq!(d, json!({"min": 21, "max": 910, "mean": 287.1212121212121}));
    }

    #[test]
    fn verbose_distances_list_matches() {
        let words = get_words(lorem_ipsum());
        let d = find_distances(&["lorem"], &["ipsum"], &words, FindMode::default(), true).unwrap();
        assert_eq!(d["matches1"]["lorem"], json!([438, 600, 611, 685, 894]));
        assert_eq!(d["matches2"]["ipsum"], json!([1, 114, 336, 806, 977]));
        assert!(find_distances(&["nope"], &["ipsum"], &words, FindMode::default(), false).is_err());
    }
}
