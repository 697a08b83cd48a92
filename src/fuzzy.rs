//! Approximate string matching over small static lists (cities, parks).
//!
//! Each candidate is scored against the query on every configured key;
//! the best key wins. Scores run from 0.0 (exact) upward, and candidates
//! scoring above the threshold are dropped. Ties keep list order.

/// Field selector: borrows one searchable string out of a candidate.
pub type Key<T> = fn(&T) -> &str;

/// Candidates scoring above this are not considered a match.
pub const DEFAULT_THRESHOLD: f64 = 0.4;

/// How many candidates an empty query returns.
pub const DEFAULT_BROWSE_LIMIT: usize = 10;

const SCORE_PREFIX: f64 = 0.01;
const SCORE_CONTAINS: f64 = 0.05;

/// A matched candidate with its score and position in the input list.
#[derive(Debug, Clone, Copy)]
pub struct Match<'a, T> {
    pub item: &'a T,
    pub score: f64,
    pub index: usize,
}

pub struct FuzzyMatcher<T> {
    keys: Vec<Key<T>>,
    threshold: f64,
    browse_limit: usize,
}

impl<T> FuzzyMatcher<T> {
    pub fn new(keys: Vec<Key<T>>) -> Self {
        Self {
            keys,
            threshold: DEFAULT_THRESHOLD,
            browse_limit: DEFAULT_BROWSE_LIMIT,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_browse_limit(mut self, limit: usize) -> Self {
        self.browse_limit = limit;
        self
    }

    /// Rank `candidates` against `query`, best first.
    ///
    /// A blank query is a browse request: the first `browse_limit`
    /// candidates come back unranked, in list order.
    pub fn ranked<'a>(&self, query: &str, candidates: &'a [T]) -> Vec<Match<'a, T>> {
        let q = normalize(query);
        if q.is_empty() {
            return candidates
                .iter()
                .enumerate()
                .take(self.browse_limit)
                .map(|(index, item)| Match { item, score: 0.0, index })
                .collect();
        }

        let mut matches: Vec<Match<'a, T>> = candidates
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                let score = self
                    .keys
                    .iter()
                    .map(|key| score(&q, &normalize(key(item))))
                    .fold(f64::INFINITY, f64::min);
                (score <= self.threshold).then_some(Match { item, score, index })
            })
            .collect();

        // sort_by is stable, so equal scores keep list order.
        matches.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));
        matches
    }

    /// Same as [`ranked`](Self::ranked) without the scores.
    pub fn matches<'a>(&self, query: &str, candidates: &'a [T]) -> Vec<&'a T> {
        self.ranked(query, candidates).into_iter().map(|m| m.item).collect()
    }
}

fn normalize(s: &str) -> String {
    s.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Score a normalised query against a normalised text.
fn score(query: &str, text: &str) -> f64 {
    if text.is_empty() {
        return f64::INFINITY;
    }
    if text == query {
        return 0.0;
    }
    if text.starts_with(query) {
        return SCORE_PREFIX;
    }
    if text.contains(query) {
        return SCORE_CONTAINS;
    }
    let len = query.chars().count().max(1);
    substring_distance(query, text) as f64 / len as f64
}

/// Smallest edit distance between `pattern` and any substring of `text`.
///
/// Levenshtein recurrence with the pattern on the rows and a free start
/// position in the text (row 0 is all zeros).
fn substring_distance(pattern: &str, text: &str) -> usize {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (m, n) = (p.len(), t.len());

    let mut prev = vec![0; n + 1];
    let mut curr = vec![0; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = if p[i - 1] == t[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev.into_iter().min().unwrap_or(m)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item {
        name: &'static str,
        city: &'static str,
    }

    fn items() -> Vec<Item> {
        vec![
            Item { name: "Ajah Motor Park", city: "Lagos" },
            Item { name: "Ikeja Bus Terminal", city: "Lagos" },
            Item { name: "Kano Central Motor Park", city: "Kano" },
            Item { name: "Abuja Motor Park", city: "Abuja" },
        ]
    }

    fn item_name(i: &Item) -> &str {
        i.name
    }

    fn item_city(i: &Item) -> &str {
        i.city
    }

    fn matcher() -> FuzzyMatcher<Item> {
        FuzzyMatcher::new(vec![item_name as Key<Item>, item_city])
    }

    #[test]
    fn test_substring_distance_whole_text() {
        assert_eq!(substring_distance("kitten", "sitting"), 2);
        assert_eq!(substring_distance("lagso", "lagos"), 1);
        assert_eq!(substring_distance("abc", "abc"), 0);
    }

    #[test]
    fn test_substring_distance() {
        assert_eq!(substring_distance("ikeja", "ikeja bus terminal"), 0);
        assert_eq!(substring_distance("ikja", "ikeja bus terminal"), 1);
        assert_eq!(substring_distance("zzz", "ab"), 3);
    }

    #[test]
    fn test_exact_and_prefix_rank_first() {
        let list = items();
        let found = matcher().matches("kano", &list);
        assert_eq!(found[0].name, "Kano Central Motor Park");
    }

    #[test]
    fn test_typo_tolerated() {
        let list = items();
        let found = matcher().matches("Ikej", &list);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Ikeja Bus Terminal");

        let found = matcher().matches("abuja motr", &list);
        assert_eq!(found[0].name, "Abuja Motor Park");
    }

    #[test]
    fn test_unrelated_query_is_empty() {
        let list = items();
        assert!(matcher().matches("xyzqw", &list).is_empty());
    }

    #[test]
    fn test_ties_keep_list_order() {
        let list = items();
        let found = matcher().ranked("motor park", &list);
        let order: Vec<usize> = found.iter().map(|m| m.index).collect();
        assert_eq!(order, vec![0, 2, 3]);
        assert!(found.iter().all(|m| m.score == SCORE_CONTAINS));
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        let list = items();
        let found = matcher().matches("  AJAH   motor ", &list);
        assert_eq!(found[0].name, "Ajah Motor Park");
    }

    #[test]
    fn test_blank_query_browses() {
        let list = items();
        let found = matcher().with_browse_limit(2).ranked("   ", &list);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].index, 0);
        assert_eq!(found[1].index, 1);
    }

    #[test]
    fn test_threshold_is_configurable() {
        let list = items();
        let strict = matcher().with_threshold(0.0);
        assert!(strict.matches("ikja", &list).is_empty());
        assert_eq!(matcher().matches("ikja", &list).len(), 1);
    }
}
