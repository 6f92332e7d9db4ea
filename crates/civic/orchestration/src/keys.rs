//! Content-derived record ids
//!
//! A summary is identified by the window it covers, its topic and the cell
//! that wrote it; a cross-check by the pair of summaries it compares. Running
//! the same orchestration pass twice therefore produces the same ids, and the
//! second write is rejected by the store as a duplicate.

use chrono::{DateTime, SecondsFormat, Utc};
use civic_types::{CrossCheckId, SummaryId};

fn digest(parts: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update(&[0x1f]);
        }
        hasher.update(part.as_bytes());
    }
    hasher.finalize().to_hex().as_str()[..32].to_string()
}

pub fn summary_id(window_start: DateTime<Utc>, topic: &str, cell_name: &str) -> SummaryId {
    let window = window_start.to_rfc3339_opts(SecondsFormat::Micros, true);
    SummaryId::new(format!("summary-{}", digest(&[window.as_str(), topic, cell_name])))
}

pub fn cross_check_id(summary_a: &SummaryId, summary_b: &SummaryId) -> CrossCheckId {
    CrossCheckId::new(format!(
        "crosscheck-{}",
        digest(&[summary_a.as_str(), summary_b.as_str()])
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn summary_ids_are_stable_per_window_topic_and_cell() {
        let id = summary_id(start(), "skat_dk", "tax-cell-1");
        assert_eq!(id, summary_id(start(), "skat_dk", "tax-cell-1"));
        assert!(id.as_str().starts_with("summary-"));
        assert_eq!(id.as_str().len(), "summary-".len() + 32);

        assert_ne!(id, summary_id(start(), "skat_dk", "tax-cell-2"));
        assert_ne!(id, summary_id(start(), "vat", "tax-cell-1"));
        assert_ne!(id, summary_id(start() + Duration::hours(1), "skat_dk", "tax-cell-1"));
    }

    #[test]
    fn separator_keeps_fields_apart() {
        assert_ne!(
            summary_id(start(), "ab", "c"),
            summary_id(start(), "a", "bc")
        );
    }

    #[test]
    fn cross_check_ids_follow_the_summary_pair() {
        let a = summary_id(start(), "skat_dk", "tax-cell-1");
        let b = summary_id(start(), "skat_dk", "tax-cell-2");
        assert_eq!(cross_check_id(&a, &b), cross_check_id(&a, &b));
        assert_ne!(cross_check_id(&a, &b), cross_check_id(&b, &a));
        assert!(cross_check_id(&a, &b).as_str().starts_with("crosscheck-"));
    }
}
