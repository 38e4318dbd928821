use crate::core::models::{Base, Sequence};

pub const DEFAULT_MAX_HOMOPOLYMER_RUN: usize = 3;

/// Number of differing positions. Unequal lengths count the overhang as mismatches.
pub fn hamming_distance(a: &Sequence, b: &Sequence) -> usize {
    let mismatches = a
        .bases()
        .iter()
        .zip(b.bases())
        .filter(|(x, y)| x != y)
        .count();
    mismatches + a.len().abs_diff(b.len())
}

/// Length of the longest contiguous run shared by `a` and `b` (Lmax).
///
/// Classic O(|a|·|b|) dynamic programme, kept to a single rolling row.
pub fn longest_common_substring(a: &Sequence, b: &Sequence) -> usize {
    longest_common_run(a.bases(), b.bases())
}

pub(crate) fn longest_common_run<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut row = vec![0usize; b.len() + 1];
    let mut best = 0;
    for x in a {
        let mut diagonal = 0;
        for (j, y) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if x == y { diagonal + 1 } else { 0 };
            best = best.max(row[j + 1]);
            diagonal = above;
        }
    }
    best
}

/// Percentage (0-100) of G/C bases; 0 for an empty sequence.
pub fn gc_content(seq: &Sequence) -> f64 {
    if seq.is_empty() {
        return 0.0;
    }
    let strong = seq.bases().iter().filter(|b| b.is_strong()).count();
    strong as f64 / seq.len() as f64 * 100.0
}

pub fn longest_homopolymer_run(seq: &Sequence) -> usize {
    seq.bases()
        .chunk_by(|a: &Base, b: &Base| a == b)
        .map(<[Base]>::len)
        .max()
        .unwrap_or(0)
}

/// True iff some run of identical consecutive bases is longer than `max_run`.
pub fn has_homopolymer(seq: &Sequence, max_run: usize) -> bool {
    longest_homopolymer_run(seq) > max_run
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(s: &str) -> Sequence {
        s.parse().unwrap()
    }

    #[test]
    fn hamming_counts_differing_positions() {
        assert_eq!(hamming_distance(&seq("ACGU"), &seq("ACGU")), 0);
        assert_eq!(hamming_distance(&seq("ACGU"), &seq("UCGA")), 2);
    }

    #[test]
    fn hamming_counts_length_difference_as_mismatch() {
        assert_eq!(hamming_distance(&seq("ACG"), &seq("ACGUU")), 2);
    }

    #[test]
    fn lcs_of_sequence_with_itself_is_its_length() {
        let s = seq("GUGAACUGCCGAGUAGGUAGCUGAUAAC");
        assert_eq!(longest_common_substring(&s, &s), s.len());
    }

    #[test]
    fn lcs_is_symmetric_and_position_independent() {
        let a = seq("AAAACGUCGUAAA");
        let b = seq("GGCGUCGUGG");
        assert_eq!(longest_common_substring(&a, &b), 6);
        assert_eq!(longest_common_substring(&b, &a), 6);
    }

    #[test]
    fn lcs_with_empty_is_zero() {
        assert_eq!(longest_common_substring(&seq(""), &seq("ACGU")), 0);
    }

    #[test]
    fn lcs_without_shared_symbols_is_zero() {
        assert_eq!(longest_common_substring(&seq("AAAA"), &seq("CCCC")), 0);
    }

    #[test]
    fn gc_content_is_a_percentage() {
        assert_eq!(gc_content(&seq("GGCC")), 100.0);
        assert_eq!(gc_content(&seq("AUGC")), 50.0);
        assert_eq!(gc_content(&seq("")), 0.0);
    }

    #[test]
    fn homopolymer_detects_runs_longer_than_max() {
        assert!(!has_homopolymer(&seq("AAACCCGGGUUU"), 3));
        assert!(has_homopolymer(&seq("ACGGGGU"), 3));
        assert!(has_homopolymer(&seq("ACGGU"), 1));
        assert!(!has_homopolymer(&seq(""), 3));
    }

    #[test]
    fn longest_run_reports_maximal_stretch() {
        assert_eq!(longest_homopolymer_run(&seq("AUUUUGCC")), 4);
    }
}
