//! Conflict Detector

use chrono::{DateTime, Utc};
use crate::keys::cross_check_id;
use civic_types::{CellSummary, Classification, CrossCheckRecord};

/// `(|consensus_a - consensus_b| + |quality_a - quality_b|) / 2`, symmetric.
pub fn conflict_score(a: &CellSummary, b: &CellSummary) -> f64 {
    ((a.avg_consensus - b.avg_consensus).abs() + (a.quality_score - b.quality_score).abs()) / 2.0
}

/// Scores at or above `threshold` conflict; everything below is verified.
pub fn classify(score: f64, threshold: f64) -> Classification {
    if score >= threshold {
        Classification::Conflict
    } else {
        Classification::Verified
    }
}

/// Compare two summaries of the same topic
pub fn cross_check(
    a: &CellSummary,
    b: &CellSummary,
    threshold: f64,
    now: DateTime<Utc>,
) -> CrossCheckRecord {
    let score = conflict_score(a, b);
    CrossCheckRecord {
        id: cross_check_id(&a.id, &b.id),
        topic: a.topic.clone(),
        summary_a_id: a.id.clone(),
        summary_b_id: b.id.clone(),
        conflict_score: score,
        classification: classify(score, threshold),
        checked_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_types::SummaryId;

    fn summary(consensus: f64, quality: f64) -> CellSummary {
        CellSummary {
            id: SummaryId::new(format!("summary-{consensus}-{quality}")),
            cell_name: "tax-cell-1".into(),
            specialization: "tax".into(),
            topic: "skat_dk".into(),
            summary_text: String::new(),
            source_post_ids: Vec::new(),
            avg_consensus: consensus,
            quality_score: quality,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn skat_dk_pair_just_below_threshold_is_verified() {
        let a = summary(0.9, 0.8);
        let b = summary(0.55, 0.5);
        let score = conflict_score(&a, &b);
        assert!((score - 0.325).abs() < 1e-9);
        assert_eq!(classify(score, 0.35), Classification::Verified);

        let record = cross_check(&a, &b, 0.35, Utc::now());
        assert_eq!(record.classification, Classification::Verified);
        assert_eq!(record.summary_a_id, a.id);
        assert_eq!(record.topic, "skat_dk");
        assert_eq!(record.id, cross_check(&a, &b, 0.35, Utc::now()).id);
    }

    #[test]
    fn score_exactly_at_threshold_is_a_conflict() {
        let score = conflict_score(&summary(0.35, 0.35), &summary(0.0, 0.0));
        assert_eq!(score, 0.35);
        assert_eq!(classify(score, 0.35), Classification::Conflict);
    }

    #[test]
    fn score_is_symmetric() {
        let a = summary(0.12, 0.97);
        let b = summary(0.83, 0.4);
        assert_eq!(conflict_score(&a, &b), conflict_score(&b, &a));
    }

    #[test]
    fn identical_summaries_do_not_conflict() {
        let a = summary(0.6, 0.6);
        assert_eq!(conflict_score(&a, &a.clone()), 0.0);
        assert_eq!(classify(0.0, 0.35), Classification::Verified);
    }
}
