// src/filter/matcher.rs

//! Approximate name matching used by the step/job filters and by the
//! validator's "did you mean" suggestions.

use serde::Deserialize;

/// Thresholds for fuzzy matching.
///
/// `match_threshold` decides whether a filter entry selects a step;
/// `suggestion_threshold` is looser and only used to propose names for
/// entries that matched nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FuzzyMatchConfig {
    pub match_threshold: usize,
    pub suggestion_threshold: usize,
    pub max_suggestions: usize,
}

impl Default for FuzzyMatchConfig {
    fn default() -> Self {
        Self {
            match_threshold: 2,
            suggestion_threshold: 5,
            max_suggestions: 3,
        }
    }
}

/// How a candidate matched a pattern, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
    /// Case-insensitive equality.
    Exact,
    /// The candidate contains the pattern (case-insensitive).
    Substring,
    /// Edit distance within the match threshold.
    Fuzzy(usize),
}

/// Case-insensitive matcher: exact, then substring, then Levenshtein distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringMatcher {
    config: FuzzyMatchConfig,
}

impl StringMatcher {
    pub fn new(config: FuzzyMatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FuzzyMatchConfig {
        &self.config
    }

    /// Classify how `candidate` matches `pattern`, or `None` if it doesn't.
    ///
    /// An empty (or all-whitespace) pattern never matches.
    pub fn match_kind(&self, candidate: &str, pattern: &str) -> Option<MatchKind> {
        let pattern = pattern.trim().to_lowercase();
        if pattern.is_empty() {
            return None;
        }
        let candidate = candidate.trim().to_lowercase();

        if candidate == pattern {
            return Some(MatchKind::Exact);
        }
        if candidate.contains(&pattern) {
            return Some(MatchKind::Substring);
        }

        let distance = levenshtein(&candidate, &pattern);
        (distance <= self.config.match_threshold).then_some(MatchKind::Fuzzy(distance))
    }

    pub fn matches(&self, candidate: &str, pattern: &str) -> bool {
        self.match_kind(candidate, pattern).is_some()
    }

    /// Position of the best candidate for `pattern`.
    ///
    /// Exact beats substring beats fuzzy; among fuzzy matches the smallest
    /// distance wins; ties go to the earliest candidate.
    pub fn best_match<'a, I>(&self, candidates: I, pattern: &str) -> Option<usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        candidates
            .into_iter()
            .enumerate()
            .filter_map(|(i, c)| self.match_kind(c, pattern).map(|kind| (kind, i)))
            .min()
            .map(|(_, i)| i)
    }

    /// Up to `max_suggestions` candidate names closest to `target`, within
    /// `suggestion_threshold`, closest first. Duplicates are collapsed.
    pub fn closest_matches<'a, I>(&self, target: &str, candidates: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let target = target.trim().to_lowercase();
        let mut scored: Vec<(usize, &str)> = candidates
            .into_iter()
            .map(|c| (levenshtein(&c.to_lowercase(), &target), c))
            .filter(|(d, _)| *d <= self.config.suggestion_threshold)
            .collect();

        scored.sort();
        scored.dedup_by(|a, b| a.1 == b.1);

        scored
            .into_iter()
            .take(self.config.max_suggestions)
            .map(|(_, c)| c.to_string())
            .collect()
    }
}

/// Levenshtein edit distance over Unicode scalar values.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
