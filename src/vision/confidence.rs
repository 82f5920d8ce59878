//! Turning raw backend output into a success/continue decision.
//!
//! Text similarity is case-insensitive and tolerant of OCR noise: the target
//! is compared against every window of the OCR output with the same length,
//! scoring each window by the better of a Levenshtein ratio and a
//! longest-common-subsequence ratio. Containment of the whole target scores
//! 1.0. All functions here are pure.

use unicode_normalization::UnicodeNormalization;

/// Minimum text similarity counted as a detection.
pub const TEXT_THRESHOLD: f64 = 0.6;

/// Default minimum template-match score for icon waits.
pub const DEFAULT_ICON_THRESHOLD: f64 = 0.8;

/// Similarity in `[0, 1]` between OCR output and the target text.
///
/// Empty or missing observed text scores 0.0.
pub fn text_confidence(observed: Option<&str>, target: &str) -> f64 {
    let Some(observed) = observed else {
        return 0.0;
    };
    let observed = normalize(observed);
    let target = normalize(target);
    if observed.is_empty() || target.is_empty() {
        return 0.0;
    }

    if observed.contains(&target) {
        return 1.0;
    }

    let observed: Vec<char> = observed.chars().collect();
    let target: Vec<char> = target.chars().collect();

    if observed.len() <= target.len() {
        return composite_similarity(&observed, &target);
    }

    observed
        .windows(target.len())
        .map(|window| composite_similarity(window, &target))
        .fold(0.0, f64::max)
}

/// True when a text confidence counts as a detection.
pub fn text_matches(confidence: f64) -> bool {
    confidence >= TEXT_THRESHOLD
}

/// True when a template-match score reaches `threshold`. The backend score
/// is used as is.
pub fn icon_matches(score: f64, threshold: f64) -> bool {
    score >= threshold
}

/// NFKC, lowercase, no whitespace. OCR splits and joins words at random.
fn normalize(s: &str) -> String {
    let mut normalized: String = s.nfkc().collect();
    normalized.retain(|c| !c.is_whitespace());
    normalized.to_lowercase()
}

/// The better of the edit-distance and LCS ratios.
fn composite_similarity(a: &[char], b: &[char]) -> f64 {
    similarity_ratio(a, b).max(lcs_ratio(a, b))
}

fn similarity_ratio(a: &[char], b: &[char]) -> f64 {
    let max_len = a.len().max(b.len()) as f64;
    if max_len == 0.0 {
        return 1.0;
    }

    let dist = levenshtein(a, b) as f64;
    (1.0 - dist / max_len).max(0.0)
}

/// Longest common subsequence length over the longer length.
fn lcs_ratio(a: &[char], b: &[char]) -> f64 {
    let max_len = a.len().max(b.len()) as f64;
    if max_len == 0.0 {
        return 1.0;
    }

    lcs_len(a, b) as f64 / max_len
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr: Vec<usize> = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
