//! Longest-matching-block similarity between two short strings.
//!
//! The ratio is `2·M / T`, where `T` is the total character count of both
//! inputs and `M` the number of characters covered by matching blocks: the
//! longest common contiguous block, then recursively the longest blocks to
//! its left and right. No tokenization, no stemming, no junk heuristic.

/// Similarity at or above which two findings state the same fact.
pub const DEDUP_THRESHOLD: f64 = 0.8;

/// Similarity ratio in `[0, 1]` over the characters of `a` and `b`.
///
/// Symmetric and reflexive; two empty strings score `1.0`.
pub fn similarity(a: &str, b: &str) -> f64 {
    // Equal-length ties pick the earliest block, so fix the argument order.
    let (a, b) = if a <= b { (a, b) } else { (b, a) };

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

/// Total length of all matching blocks between `a` and `b`.
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;

        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }

    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]` as `(i, j, len)`.
///
/// Among equally long blocks the one starting earliest in `a` wins, then
/// the one starting earliest in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_len) = (alo, blo, 0);
    if alo >= ahi || blo >= bhi {
        return (best_i, best_j, best_len);
    }

    // run[c] = length of the common suffix ending at a[i-1] / b[blo + c - 1]
    let width = bhi - blo;
    let mut prev = vec![0usize; width + 1];
    let mut curr = vec![0usize; width + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let col = j - blo + 1;
            if a[i] == b[j] {
                let len = prev[col - 1] + 1;
                curr[col] = len;
                if len > best_len {
                    best_i = i + 1 - len;
                    best_j = j + 1 - len;
                    best_len = len;
                }
            } else {
                curr[col] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (best_i, best_j, best_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(actual: f64, expected: f64) -> bool {
        (actual - expected).abs() < 1e-9
    }

    #[test]
    fn identical_strings_score_one() {
        for s in ["", "a", "rust uses ownership", "ünïcödé ✓"] {
            assert!(close(similarity(s, s), 1.0), "similarity({s:?}, {s:?})");
        }
    }

    #[test]
    fn disjoint_strings_score_zero() {
        assert!(close(similarity("abc", "xyz"), 0.0));
        assert!(close(similarity("", "xyz"), 0.0));
    }

    #[test]
    fn overlapping_block_ratio() {
        // "bcd" matches: 2 * 3 / 8
        assert!(close(similarity("abcd", "bcde"), 0.75));
    }

    #[test]
    fn recurses_into_both_sides() {
        // "ab" + "d" + "f" matched around the longest block
        let score = similarity("abxdyf", "abzdwf");
        assert!(close(score, 2.0 * 4.0 / 12.0), "got {score}");
    }

    #[test]
    fn symmetric() {
        let pairs = [
            ("a uses ml", "a uses machine learning"),
            ("tokio is an async runtime", "tokio is an asynchronous runtime"),
            ("abab", "baba"),
            ("the cat sat", "sat the cat"),
        ];
        for (a, b) in pairs {
            assert!(close(similarity(a, b), similarity(b, a)), "{a:?} / {b:?}");
        }
    }

    #[test]
    fn abbreviation_is_not_a_paraphrase() {
        // Character-level ratio: "a uses m" + "l" match, 2 * 9 / 32
        let score = similarity("a uses ml", "a uses machine learning");
        assert!(close(score, 0.5625), "got {score}");
        assert!(score < DEDUP_THRESHOLD);
    }

    #[test]
    fn light_rewording_crosses_threshold() {
        let score = similarity(
            "rust guarantees memory safety through ownership",
            "rust guarantees memory safety via ownership",
        );
        assert!(score >= DEDUP_THRESHOLD, "got {score}");
    }
}
