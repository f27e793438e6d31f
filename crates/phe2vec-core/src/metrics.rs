//! Classification and ranking metrics.
//!
//! Binary metrics take parallel truth/prediction slices. Ranking metrics take
//! patients in rank order and the set of truly positive patients. Undefined
//! ratios evaluate to zero.

use std::collections::BTreeSet;

use phe2vec_types::{well_known, PatientId};

/// Rounds to the given number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

struct Confusion {
    tp: usize,
    fp: usize,
    tn: usize,
    fn_: usize,
}

impl Confusion {
    fn of(truth: &[bool], predicted: &[bool]) -> Self {
        let mut c = Confusion {
            tp: 0,
            fp: 0,
            tn: 0,
            fn_: 0,
        };
        for (&t, &p) in truth.iter().zip(predicted) {
            match (t, p) {
                (true, true) => c.tp += 1,
                (false, true) => c.fp += 1,
                (false, false) => c.tn += 1,
                (true, false) => c.fn_ += 1,
            }
        }
        c
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Fraction of predicted positives that are true positives.
pub fn precision(truth: &[bool], predicted: &[bool]) -> f64 {
    let c = Confusion::of(truth, predicted);
    ratio(c.tp, c.tp + c.fp)
}

/// Fraction of true positives that are predicted positive.
pub fn recall(truth: &[bool], predicted: &[bool]) -> f64 {
    let c = Confusion::of(truth, predicted);
    ratio(c.tp, c.tp + c.fn_)
}

/// F-beta score.
pub fn fscore(truth: &[bool], predicted: &[bool], beta: f64) -> f64 {
    let p = precision(truth, predicted);
    let r = recall(truth, predicted);
    let b2 = beta * beta;
    let denominator = b2 * p + r;
    if denominator > 0.0 {
        (1.0 + b2) * p * r / denominator
    } else {
        0.0
    }
}

/// Fraction of correct predictions.
pub fn accuracy(truth: &[bool], predicted: &[bool]) -> f64 {
    let c = Confusion::of(truth, predicted);
    ratio(c.tp + c.tn, c.tp + c.tn + c.fp + c.fn_)
}

fn is_hit<S: AsRef<str>>(truth: &BTreeSet<PatientId>, patient: &S) -> bool {
    truth.contains(patient.as_ref())
}

/// Hits among the first `n` ranked patients, divided by `n`.
///
/// The denominator stays `n` when fewer than `n` patients are ranked.
pub fn precision_at_n<S: AsRef<str>>(ranking: &[S], truth: &BTreeSet<PatientId>, n: usize) -> f64 {
    let hits = ranking
        .iter()
        .take(n)
        .filter(|p| is_hit(truth, *p))
        .count();
    ratio(hits, n)
}

/// Precision at the size of the truth set.
pub fn r_precision<S: AsRef<str>>(ranking: &[S], truth: &BTreeSet<PatientId>) -> f64 {
    precision_at_n(ranking, truth, truth.len())
}

/// Average of the precision at each rank where a positive is found.
///
/// Scanning stops once every positive has been found.
pub fn maprec<S: AsRef<str>>(ranking: &[S], truth: &BTreeSet<PatientId>) -> f64 {
    let mut found = 0usize;
    let mut total = 0.0;
    for (i, patient) in ranking.iter().enumerate() {
        if found == truth.len() {
            break;
        }
        if is_hit(truth, patient) {
            found += 1;
            total += found as f64 / (i + 1) as f64;
        }
    }
    if found == 0 {
        0.0
    } else {
        total / found as f64
    }
}

/// Reciprocal rank of the first positive.
pub fn mrr<S: AsRef<str>>(ranking: &[S], truth: &BTreeSet<PatientId>) -> f64 {
    ranking
        .iter()
        .position(|p| is_hit(truth, p))
        .map_or(0.0, |i| 1.0 / (i + 1) as f64)
}

/// Area under the ROC curve of `scores` against `truth`.
///
/// Computed as the Mann-Whitney statistic with average ranks for ties.
/// Returns `None` when truth contains a single class.
pub fn auc_roc(truth: &[bool], scores: &[f64]) -> Option<f64> {
    let positives = truth.iter().filter(|&&t| t).count();
    let negatives = truth.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // 1-based ranks start+1..=end share their mean
        let average = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = average;
        }
        start = end;
    }

    let positive_rank_sum: f64 = truth
        .iter()
        .zip(&ranks)
        .filter(|(t, _)| **t)
        .map(|(_, r)| r)
        .sum();
    let p = positives as f64;
    let n = negatives as f64;
    Some((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

/// AUC-ROC, or the neutral value for single-class truth.
pub fn auc_roc_or_neutral(truth: &[bool], scores: &[f64]) -> f64 {
    auc_roc(truth, scores).unwrap_or(well_known::NEUTRAL_AUC)
}

/// Average precision of `scores` against `truth`: the sum over distinct
/// score thresholds of precision weighted by the gain in recall.
pub fn average_precision(truth: &[bool], scores: &[f64]) -> f64 {
    let positives = truth.iter().filter(|&&t| t).count();
    if positives == 0 {
        return 0.0;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut tp = 0usize;
    let mut seen = 0usize;
    let mut previous_recall = 0.0;
    let mut total = 0.0;
    let mut k = 0;
    while k < order.len() {
        let threshold = scores[order[k]];
        while k < order.len() && scores[order[k]] == threshold {
            if truth[order[k]] {
                tp += 1;
            }
            seen += 1;
            k += 1;
        }
        let recall = tp as f64 / positives as f64;
        total += (recall - previous_recall) * (tp as f64 / seen as f64);
        previous_recall = recall;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn truth(ids: &[&str]) -> BTreeSet<PatientId> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.12345, 3), 0.123);
        assert_eq!(round_to(0.6667, 3), 0.667);
        assert_eq!(round_to(2.0, 0), 2.0);
    }

    #[test]
    fn test_binary_metrics() {
        let t = [true, true, false, false];
        let p = [true, false, true, false];
        assert_abs_diff_eq!(precision(&t, &p), 0.5);
        assert_abs_diff_eq!(recall(&t, &p), 0.5);
        assert_abs_diff_eq!(fscore(&t, &p, 1.0), 0.5);
        assert_abs_diff_eq!(accuracy(&t, &p), 0.5);
    }

    #[test]
    fn test_undefined_binary_metrics_are_zero() {
        let t = [true, false];
        let none = [false, false];
        assert_eq!(precision(&t, &none), 0.0);
        assert_eq!(fscore(&t, &none, 1.0), 0.0);
        assert_eq!(recall(&[false, false], &none), 0.0);
    }

    #[test]
    fn test_ranking_metrics_fixed_denominator() {
        let ranking = ["P1", "P2", "P3", "P4"];
        let positives = truth(&["P2", "P4"]);

        assert_abs_diff_eq!(r_precision(&ranking, &positives), 0.5);
        assert_abs_diff_eq!(precision_at_n(&ranking, &positives, 10), 0.2);
        // hits at ranks 2 and 4: (1/2 + 2/4) / 2
        assert_abs_diff_eq!(maprec(&ranking, &positives), 0.5);
        assert_abs_diff_eq!(mrr(&ranking, &positives), 0.5);
    }

    #[test]
    fn test_ranking_metrics_empty_truth() {
        let ranking = ["P1", "P2"];
        let empty = BTreeSet::new();
        assert_eq!(r_precision(&ranking, &empty), 0.0);
        assert_eq!(maprec(&ranking, &empty), 0.0);
        assert_eq!(mrr(&ranking, &empty), 0.0);
        assert_eq!(precision_at_n(&ranking, &empty, 0), 0.0);
    }

    #[test]
    fn test_maprec_perfect_ranking() {
        let ranking = ["a", "b", "c", "d"];
        assert_abs_diff_eq!(maprec(&ranking, &truth(&["a", "b"])), 1.0);
    }

    #[test]
    fn test_auc_roc() {
        let t = [true, false, true, false];
        assert_abs_diff_eq!(auc_roc(&t, &[0.9, 0.1, 0.8, 0.2]).unwrap(), 1.0);
        assert_abs_diff_eq!(auc_roc(&t, &[0.1, 0.9, 0.2, 0.8]).unwrap(), 0.0);
        // all tied
        assert_abs_diff_eq!(auc_roc(&t, &[0.5, 0.5, 0.5, 0.5]).unwrap(), 0.5);
        // one positive above one negative, other tied
        assert_abs_diff_eq!(auc_roc(&[true, false, false], &[0.7, 0.7, 0.1]).unwrap(), 0.75);
    }

    #[test]
    fn test_auc_roc_single_class_is_neutral() {
        assert!(auc_roc(&[true, true], &[0.1, 0.2]).is_none());
        assert_eq!(auc_roc_or_neutral(&[false, false], &[0.1, 0.2]), 0.5);
    }

    #[test]
    fn test_average_precision() {
        let t = [true, false, true, false];
        assert_abs_diff_eq!(average_precision(&t, &[0.9, 0.1, 0.8, 0.2]), 1.0);
        // binary scores: one threshold group with 1 tp of 2 predicted, then the rest
        let binary = [1.0, 1.0, 0.0, 0.0];
        assert_abs_diff_eq!(average_precision(&t, &binary), 0.5 * 0.5 + 0.5 * 0.5);
        assert_eq!(average_precision(&[false, false], &binary[..2]), 0.0);
    }
}
