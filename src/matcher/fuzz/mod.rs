//! String similarity scoring.
//!
//! Scores are integers in `0..=100`. `ratio` is the normalized indel
//! similarity of two strings, `token_set_ratio` compares the unique
//! whitespace-delimited tokens of two strings so that word order and repeated
//! words do not affect the result.


use std::collections::BTreeSet;

use itertools::Itertools;

const LATIN1_SUPPLEMENT: std::ops::RangeInclusive<char> = '\u{80}'..='\u{ff}';

/// Normalize a string for comparison.
///
/// Characters in `U+0080..=U+00FF` are dropped, so "Ménière" becomes
/// "mnire". Every remaining character that is neither alphanumeric nor `_`
/// is replaced by a space, then the result is lower-cased and trimmed.
#[inline]
pub fn full_process(input: &str) -> String {
    let replaced: String = input
        .chars()
        .filter(|c| !LATIN1_SUPPLEMENT.contains(c))
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
        .collect();

    replaced.to_lowercase().trim().to_string()
}

/// Similarity of two strings as `2 * LCS / (len(a) + len(b))`, scaled to
/// `0..=100`. Either string being empty scores 0.
#[inline]
pub fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let common = longest_common_subsequence(&a, &b);
    scale(2 * common, a.len() + b.len())
}

/// Token-set similarity of two strings, case-insensitive.
///
/// Both strings are normalized with [`full_process`] and split into sorted
/// sets of unique tokens. The score is the best of comparing the shared tokens
/// against each side's full token list, and the two full token lists against
/// each other.
#[inline]
pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    let processed_a = full_process(a);
    let processed_b = full_process(b);

    if processed_a.is_empty() || processed_b.is_empty() {
        return 0;
    }

    let tokens_a: BTreeSet<&str> = processed_a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = processed_b.split_whitespace().collect();

    let intersection = tokens_a.intersection(&tokens_b).join(" ");
    let only_a = tokens_a.difference(&tokens_b).join(" ");
    let only_b = tokens_b.difference(&tokens_a).join(" ");

    let combined_a = format!("{} {}", intersection, only_a).trim().to_string();
    let combined_b = format!("{} {}", intersection, only_b).trim().to_string();

    [
        ratio(&intersection, &combined_a),
        ratio(&intersection, &combined_b),
        ratio(&combined_a, &combined_b),
    ]
    .into_iter()
    .max()
    .unwrap_or(0)
}

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            current[j + 1] = if ca == cb {
                previous[j] + 1
            } else {
                previous[j + 1].max(current[j])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// `100 * numerator / denominator`, rounded half to even.
fn scale(numerator: usize, denominator: usize) -> u8 {
    let scaled = numerator * 100;
    let quotient = scaled / denominator;
    let remainder = scaled % denominator;

    let rounded = match (2 * remainder).cmp(&denominator) {
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal if quotient % 2 == 1 => quotient + 1,
        _ => quotient,
    };

    u8::try_from(rounded.min(100)).unwrap_or(100)
}
