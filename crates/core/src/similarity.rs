//! Text similarity for confirmed documents.
//!
//! Uses the Ratcliff/Obershelp ratio `2 * M / T`, where `M` is the number of characters in
//! matching blocks and `T` the combined length of both texts. Matching blocks are found by
//! repeatedly taking the longest common substring and recursing on either side of it.
//!
//! Each longest-match search is `O(n * m)`, so texts longer than
//! [`MAX_SIMILARITY_CHARS`] are not scored.

use crate::constants::MAX_SIMILARITY_CHARS;

/// Similarity of two texts in `[0.0, 1.0]`.
///
/// Returns `None` if either text is empty after trimming, or if either is longer than
/// [`MAX_SIMILARITY_CHARS`] and the two differ.
pub fn similarity(original: &str, edited: &str) -> Option<f64> {
    let (original, edited) = (original.trim(), edited.trim());
    if original.is_empty() || edited.is_empty() {
        return None;
    }
    if original == edited {
        return Some(1.0);
    }

    let a: Vec<char> = original.chars().collect();
    let b: Vec<char> = edited.chars().collect();
    if a.len() > MAX_SIMILARITY_CHARS || b.len() > MAX_SIMILARITY_CHARS {
        tracing::debug!(
            "skipping similarity for texts of {} and {} characters",
            a.len(),
            b.len()
        );
        return None;
    }

    let matches = matching_chars(&a, &b);
    Some(2.0 * matches as f64 / (a.len() + b.len()) as f64)
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((a_lo, a_hi, b_lo, b_hi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, a_lo, a_hi, b_lo, b_hi);
        if size == 0 {
            continue;
        }
        total += size;
        if a_lo < i && b_lo < j {
            pending.push((a_lo, i, b_lo, j));
        }
        if i + size < a_hi && j + size < b_hi {
            pending.push((i + size, a_hi, j + size, b_hi));
        }
    }
    total
}

/// Longest common run of `a[a_lo..a_hi]` and `b[b_lo..b_hi]`, earliest in `a` on ties.
fn longest_match(
    a: &[char],
    b: &[char],
    a_lo: usize,
    a_hi: usize,
    b_lo: usize,
    b_hi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (a_lo, b_lo, 0);
    // prev[j + 1] holds the run length ending at a[i - 1], b[j].
    let width = b_hi - b_lo + 1;
    let mut prev = vec![0usize; width];
    let mut curr = vec![0usize; width];

    for i in a_lo..a_hi {
        for j in b_lo..b_hi {
            let k = j - b_lo + 1;
            curr[k] = if a[i] == b[j] { prev[k - 1] + 1 } else { 0 };
            if curr[k] > best_size {
                best_size = curr[k];
                best_i = i + 1 - best_size;
                best_j = j + 1 - best_size;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    (best_i, best_j, best_size)
}
