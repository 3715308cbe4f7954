use schema::BoundingBox;
use std::cmp::Ordering;

/// Greedy non-maximal suppression.
///
/// Only candidates with `score > score_threshold` take part. They are visited
/// in descending score order (stable, so equal scores keep input order) and a
/// candidate is dropped when its IoU with any already-kept box exceeds
/// `nms_threshold`.
///
/// Returns the indices of the kept boxes in the order they were selected.
/// `boxes` and `scores` must be the same length; extra entries are ignored.
pub fn non_maximal_suppression(
    boxes: &[BoundingBox],
    scores: &[f32],
    score_threshold: f32,
    nms_threshold: f32,
) -> Vec<usize> {
    let mut candidates: Vec<usize> = (0..boxes.len().min(scores.len()))
        .filter(|&i| scores[i] > score_threshold)
        .collect();

    candidates.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
    });

    let mut kept: Vec<usize> = Vec::with_capacity(candidates.len());
    for idx in candidates {
        let suppressed = kept
            .iter()
            .any(|&k| boxes[k].iou(&boxes[idx]) > nms_threshold);
        if !suppressed {
            kept.push(idx);
        }
    }

    kept
}
