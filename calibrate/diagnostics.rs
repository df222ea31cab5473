//! Classification quality metrics reported by the trainer.

use itertools::Itertools;
use ndarray::ArrayView1;

/// Decision threshold used for accuracy.
pub const CLASSIFICATION_THRESHOLD: f64 = 0.5;

/// Share of rows whose thresholded prediction equals the 0/1 label.
/// Returns 0.0 for empty input or when the lengths differ.
pub fn accuracy(predictions: ArrayView1<f64>, labels: ArrayView1<f64>) -> f64 {
    if predictions.is_empty() || predictions.len() != labels.len() {
        return 0.0;
    }
    let correct = predictions
        .iter()
        .zip(labels.iter())
        .filter(|&(&p, &y)| (p >= CLASSIFICATION_THRESHOLD) == (y >= 0.5))
        .count();
    correct as f64 / predictions.len() as f64
}

/// Area under the ROC curve via the Mann-Whitney rank statistic.
///
/// Tied predictions receive their average rank, so a constant predictor
/// scores exactly 0.5. Returns `None` unless both classes are present and
/// every prediction has a label.
pub fn roc_auc(predictions: ArrayView1<f64>, labels: ArrayView1<f64>) -> Option<f64> {
    if predictions.len() != labels.len() {
        return None;
    }
    let n_positive = labels.iter().filter(|&&y| y >= 0.5).count();
    let n_negative = labels.len() - n_positive;
    if n_positive == 0 || n_negative == 0 {
        return None;
    }

    let order: Vec<usize> = (0..predictions.len())
        .sorted_by(|&a, &b| predictions[a].total_cmp(&predictions[b]))
        .collect();

    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && predictions[order[end]] == predictions[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; ties share the mean of ranks start+1 ..= end.
        let average_rank = (start + 1 + end) as f64 / 2.0;
        let positives_in_tie = order[start..end]
            .iter()
            .filter(|&&i| labels[i] >= 0.5)
            .count();
        positive_rank_sum += average_rank * positives_in_tie as f64;
        start = end;
    }

    let n_pos = n_positive as f64;
    let n_neg = n_negative as f64;
    Some((positive_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}
