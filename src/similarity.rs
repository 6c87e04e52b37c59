//! String similarity metrics used to compare a candidate's core domain token
//! against an organization's official name and abbreviation.
//!
//! Every metric is total: any pair of strings, including empty ones, yields a
//! defined value. Callers are expected to lowercase both sides beforehand.
//! All lengths and positions are counted in chars.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

/// Window size for n-gram overlap.
pub const NGRAM_SIZE: usize = 3;

/// Strings shorter than this get a cosine similarity of 0.0.
pub const COSINE_MIN_LEN: usize = 3;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s\s+").expect("Invalid whitespace regex")
});

/// Character-set Jaccard index. Two empty strings score 0.0.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let set_a: HashSet<char> = a.chars().collect();
    let set_b: HashSet<char> = b.chars().collect();

    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();

    intersection as f64 / union as f64
}

/// Whether every char of `a` appears in `b` in the same order.
pub fn is_subsequence(a: &str, b: &str) -> bool {
    let mut haystack = b.chars();
    a.chars().all(|needle| haystack.any(|c| c == needle))
}

/// Ratcliff/Obershelp similarity: twice the number of chars in matching
/// blocks divided by the combined length.
pub fn sequence_match_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a == b {
        return 1.0;
    }

    let matched = matching_block_chars(&a, &b);
    2.0 * matched as f64 / (a.len() + b.len()) as f64
}

/// Total size of the matching blocks, found by taking the longest common block
/// and recursing on both sides of it.
fn matching_block_chars(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        total += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    total
}

/// Longest block `a[i..i+size] == b[j..j+size]` inside the given ranges.
/// Ties resolve to the block ending earliest in `a`, then earliest in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    let width = bhi - blo;

    // run_lengths[j - blo + 1] = length of the common run ending at (i, j)
    let mut previous = vec![0usize; width + 1];
    for i in alo..ahi {
        let mut current = vec![0usize; width + 1];
        for j in blo..bhi {
            if a[i] == b[j] {
                let size = previous[j - blo] + 1;
                current[j - blo + 1] = size;
                if size > best_size {
                    best_i = i + 1 - size;
                    best_j = j + 1 - size;
                    best_size = size;
                }
            }
        }
        previous = current;
    }

    (best_i, best_j, best_size)
}

/// Minimum number of single-char edits turning `a` into `b`.
pub fn levenshtein(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// Levenshtein distance scaled to [0, 1] by the longer length.
/// 0.0 when either side is empty.
pub fn levenshtein_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(a, b)
}

/// Cosine of the char 2-gram and 3-gram frequency vectors.
pub fn cosine_similarity(a: &str, b: &str) -> f64 {
    if a.chars().count() < COSINE_MIN_LEN || b.chars().count() < COSINE_MIN_LEN {
        return 0.0;
    }

    let counts_a = char_ngram_counts(a);
    let counts_b = char_ngram_counts(b);
    if counts_a.is_empty() || counts_b.is_empty() {
        return 0.0;
    }

    // BTreeMap iteration keeps the float summation order stable across runs
    let dot: f64 = counts_a
        .iter()
        .filter_map(|(gram, &ca)| counts_b.get(gram).map(|&cb| (ca * cb) as f64))
        .sum();
    let norm_a = counts_a.values().map(|&c| (c * c) as f64).sum::<f64>().sqrt();
    let norm_b = counts_b.values().map(|&c| (c * c) as f64).sum::<f64>().sqrt();

    // An empty float sum is -0.0, which would print as "-0"
    if dot == 0.0 || norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

fn char_ngram_counts(text: &str) -> BTreeMap<String, usize> {
    let normalized = WHITESPACE_RUN.replace_all(text, " ");
    let chars: Vec<char> = normalized.chars().collect();

    let mut counts = BTreeMap::new();
    for n in 2..=3 {
        for window in chars.windows(n) {
            *counts.entry(window.iter().collect::<String>()).or_insert(0) += 1;
        }
    }
    counts
}

/// Number of differing chars at aligned positions, up to the shorter length.
pub fn hamming(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).filter(|(x, y)| x != y).count()
}

/// Shared 3-grams divided by the size of the smaller 3-gram set.
pub fn ngram_overlap(a: &str, b: &str) -> f64 {
    let grams_a = char_ngrams(a, NGRAM_SIZE);
    let grams_b = char_ngrams(b, NGRAM_SIZE);

    if grams_a.is_empty() || grams_b.is_empty() {
        return 0.0;
    }

    let overlap = grams_a.intersection(&grams_b).count();
    overlap as f64 / grams_a.len().min(grams_b.len()) as f64
}

fn char_ngrams(text: &str, n: usize) -> HashSet<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.windows(n).map(|w| w.iter().collect()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &["", "a", "ab", "abc", "acme", "acmesolutions", "asn", "éa b", "zzzz"];

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_jaccard() {
        assert!(approx(jaccard("acme", "acme"), 1.0));
        assert!(approx(jaccard("", ""), 0.0));
        assert!(approx(jaccard("ab", "bc"), 1.0 / 3.0));
        assert!(approx(jaccard("abc", ""), 0.0));
    }

    #[test]
    fn test_is_subsequence() {
        assert!(is_subsequence("", ""));
        assert!(is_subsequence("", "acme"));
        assert!(is_subsequence("asn", "acmesolutionsnv"));
        assert!(!is_subsequence("nsa", "asn"));
        assert!(!is_subsequence("acme", ""));
        assert!(!is_subsequence("aa", "a"));
    }

    #[test]
    fn test_sequence_match_ratio_known_values() {
        // difflib reference: SequenceMatcher(None, "abcd", "bcde").ratio() == 0.75
        assert!(approx(sequence_match_ratio("abcd", "bcde"), 0.75));
        // "acmesolutions" vs "acme-solutions": 13 matched chars
        assert!(approx(sequence_match_ratio("acmesolutions", "acme-solutions"), 26.0 / 27.0));
        assert!(approx(sequence_match_ratio("acme", "acme"), 1.0));
    }

    #[test]
    fn test_sequence_match_ratio_empty_sides() {
        assert!(approx(sequence_match_ratio("", ""), 0.0));
        assert!(approx(sequence_match_ratio("acme", ""), 0.0));
        assert!(approx(sequence_match_ratio("", "acme"), 0.0));
    }

    #[test]
    fn test_sequence_match_ratio_recurses_on_both_sides() {
        // Three two-char blocks: "ab", then "cd" and "ef" from the right-hand recursion
        assert!(approx(sequence_match_ratio("abxcdyef", "abzcdwef"), 12.0 / 16.0));
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("acme", ""), 4);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert!(approx(levenshtein_similarity("kitten", "sitting"), 1.0 - 3.0 / 7.0));
        assert!(approx(levenshtein_similarity("", ""), 0.0));
        assert!(approx(levenshtein_similarity("acme", "acme"), 1.0));
    }

    #[test]
    fn test_cosine_short_strings_score_zero() {
        assert!(approx(cosine_similarity("ab", "abc"), 0.0));
        assert!(approx(cosine_similarity("abc", "ab"), 0.0));
        assert!(approx(cosine_similarity("", ""), 0.0));
    }

    #[test]
    fn test_cosine_values() {
        assert!(approx(cosine_similarity("acme", "acme"), 1.0));
        assert!(approx(cosine_similarity("abc", "xyz"), 0.0));
        // abc -> {ab, bc, abc}; abd -> {ab, bd, abd}: dot 1, norms sqrt(3)
        assert!(approx(cosine_similarity("abc", "abd"), 1.0 / 3.0));
    }

    #[test]
    fn test_cosine_without_shared_grams_is_positive_zero() {
        let value = cosine_similarity("kbc", "nl.wikipedia");
        assert_eq!(value, 0.0);
        assert!(value.is_sign_positive());
        assert_eq!(value.to_string(), "0");
    }

    #[test]
    fn test_hamming_uses_shorter_length() {
        assert_eq!(hamming("acme", "acne"), 1);
        assert_eq!(hamming("acme", "ac"), 0);
        assert_eq!(hamming("", "acme"), 0);
        assert_eq!(hamming("abc", "xyzabc"), 3);
    }

    #[test]
    fn test_ngram_overlap() {
        assert!(approx(ngram_overlap("acme", "acmesolutions"), 1.0));
        assert!(approx(ngram_overlap("ab", "abc"), 0.0));
        assert!(approx(ngram_overlap("abcd", "bcdx"), 0.5));
        assert!(approx(ngram_overlap("", ""), 0.0));
    }

    #[test]
    fn test_metrics_are_total_and_bounded() {
        for a in SAMPLES {
            for b in SAMPLES {
                for score in [
                    jaccard(a, b),
                    sequence_match_ratio(a, b),
                    levenshtein_similarity(a, b),
                    cosine_similarity(a, b),
                    ngram_overlap(a, b),
                ] {
                    assert!((0.0..=1.0).contains(&score), "{} / {} scored {}", a, b, score);
                    assert!(!score.is_nan());
                }
                let _ = levenshtein(a, b);
                let _ = hamming(a, b);
                let _ = is_subsequence(a, b);
            }
        }
    }

    #[test]
    fn test_jaccard_self_similarity() {
        for a in SAMPLES.iter().filter(|s| !s.is_empty()) {
            assert!(approx(jaccard(a, a), 1.0));
        }
    }
}
