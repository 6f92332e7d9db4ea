//! Consensus Aggregator
//!
//! A summary is built from the highest-consensus posts on a topic. Its two
//! numeric proxies are what the conflict detector compares:
//!
//! - `avg_consensus`: mean consensus score of the selected posts
//! - `quality_score`: `0.5 * coverage + 0.5 * mean(min(len, excerpt_chars) / excerpt_chars)`,
//!   where coverage is `selected / posts_per_summary`

use chrono::{DateTime, Utc};
use crate::keys::summary_id;
use civic_types::{Cell, CellSummary, OrchestrationConfig, Post};
use std::cmp::Ordering;

/// Whitespace-normalised text cut to `max_chars` characters, with a trailing
/// ellipsis when shortened.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.chars().count() <= max_chars {
        return normalized;
    }
    let cut: String = normalized.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}

/// Top `limit` posts on `topic` by consensus score, newer first on ties.
///
/// Posts authored by the cell's members are preferred; when the cell authored
/// none on this topic the whole topic pool is used.
pub fn select_posts<'a>(posts: &'a [Post], cell: &Cell, topic: &str, limit: usize) -> Vec<&'a Post> {
    let on_topic: Vec<&Post> = posts.iter().filter(|p| p.topic.trim() == topic).collect();
    let own: Vec<&Post> = on_topic
        .iter()
        .copied()
        .filter(|p| cell.contains(&p.author_id))
        .collect();

    let mut pool = if own.is_empty() { on_topic } else { own };
    pool.sort_by(|a, b| {
        b.consensus_score
            .partial_cmp(&a.consensus_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
    pool.truncate(limit);
    pool
}

/// Quality proxy over the selected posts
pub fn quality_score(selected: &[&Post], config: &OrchestrationConfig) -> f64 {
    if selected.is_empty() || config.posts_per_summary == 0 || config.excerpt_chars == 0 {
        return 0.0;
    }
    let coverage = (selected.len() as f64 / config.posts_per_summary as f64).min(1.0);
    let limit = config.excerpt_chars as f64;
    let depth = selected
        .iter()
        .map(|p| {
            let len = p.content.split_whitespace().collect::<Vec<_>>().join(" ").chars().count();
            (len as f64).min(limit) / limit
        })
        .sum::<f64>()
        / selected.len() as f64;
    (0.5 * coverage + 0.5 * depth).clamp(0.0, 1.0)
}

fn average_consensus(selected: &[&Post]) -> f64 {
    if selected.is_empty() {
        return 0.0;
    }
    let sum: f64 = selected.iter().map(|p| p.consensus_score.clamp(0.0, 1.0)).sum();
    (sum / selected.len() as f64).clamp(0.0, 1.0)
}

/// Summarise `topic` from `cell`'s point of view. The id depends only on the
/// window start, the topic and the cell.
pub fn summarize(
    cell: &Cell,
    topic: &str,
    posts: &[Post],
    config: &OrchestrationConfig,
    now: DateTime<Utc>,
) -> CellSummary {
    let selected = select_posts(posts, cell, topic, config.posts_per_summary);

    let mut summary_text = format!("{} on {}:", cell.cell_name, topic);
    if selected.is_empty() {
        summary_text.push_str(" no posts in window.");
    }
    for post in &selected {
        summary_text.push_str("\n- ");
        summary_text.push_str(&excerpt(&post.content, config.excerpt_chars));
    }

    CellSummary {
        id: summary_id(now - config.window(), topic, &cell.cell_name),
        cell_name: cell.cell_name.clone(),
        specialization: cell.specialization.clone(),
        topic: topic.to_string(),
        summary_text,
        source_post_ids: selected.iter().map(|p| p.id.clone()).collect(),
        avg_consensus: average_consensus(&selected),
        quality_score: quality_score(&selected, config),
        created_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn cell(name: &str, members: &[&str]) -> Cell {
        Cell {
            cell_name: name.to_string(),
            specialization: "tax".into(),
            member_ids: members.iter().map(|m| (*m).into()).collect(),
        }
    }

    fn post(id: &str, author: &str, topic: &str, score: f64, content: &str, age_min: i64) -> Post {
        Post {
            id: id.into(),
            author_id: author.into(),
            topic: topic.to_string(),
            content: content.to_string(),
            consensus_score: score,
            created_at: Utc::now() - Duration::minutes(age_min),
        }
    }

    #[test]
    fn excerpt_normalises_and_truncates_on_char_boundary() {
        assert_eq!(excerpt("  a\n b   c ", 10), "a b c");
        assert_eq!(excerpt("skattefrihed ønskes", 14), "skattefrihed ø…");
        assert_eq!(excerpt("abc def", 4), "abc…");
    }

    #[test]
    fn prefers_cell_members_and_ranks_by_consensus() {
        let posts = vec![
            post("p1", "x", "vat", 0.9, "outsider", 0),
            post("p2", "m1", "vat", 0.4, "low", 0),
            post("p3", "m2", "vat", 0.8, "high", 0),
            post("p4", "m1", "other", 1.0, "off topic", 0),
        ];
        let selected = select_posts(&posts, &cell("tax-cell-1", &["m1", "m2"]), "vat", 3);
        let ids: Vec<&str> = selected.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p3", "p2"]);
    }

    #[test]
    fn falls_back_to_topic_pool_when_cell_is_silent() {
        let posts = vec![
            post("p1", "x", "vat", 0.2, "a", 0),
            post("p2", "y", "vat", 0.7, "b", 10),
            post("p3", "z", "vat", 0.7, "c", 0),
            post("p4", "w", "vat", 0.1, "d", 0),
        ];
        let selected = select_posts(&posts, &cell("tax-cell-1", &["m1"]), "vat", 3);
        let ids: Vec<&str> = selected.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p3", "p2", "p1"]);
    }

    #[test]
    fn quality_rewards_coverage_and_length() {
        let config = OrchestrationConfig {
            excerpt_chars: 10,
            ..OrchestrationConfig::default()
        };
        let long = post("p1", "a", "t", 0.5, "0123456789abc", 0);
        let short = post("p2", "a", "t", 0.5, "01234", 0);

        assert!((quality_score(&[&long, &long, &long], &config) - 1.0).abs() < 1e-12);
        // coverage 1/3, depth 0.5
        let q = quality_score(&[&short], &config);
        assert!((q - (0.5 / 3.0 + 0.25)).abs() < 1e-12);
        assert_eq!(quality_score(&[], &config), 0.0);
    }

    #[test]
    fn summary_carries_sources_and_proxies() {
        let posts = vec![
            post("p1", "m1", "skat_dk", 0.9, "first", 0),
            post("p2", "m1", "skat_dk", 0.6, "second", 0),
        ];
        let summary = summarize(
            &cell("tax-cell-1", &["m1"]),
            "skat_dk",
            &posts,
            &OrchestrationConfig::default(),
            Utc::now(),
        );
        assert_eq!(summary.source_post_ids.len(), 2);
        assert!((summary.avg_consensus - 0.75).abs() < 1e-12);
        assert!(summary.summary_text.contains("- first"));
        assert!(summary.quality_score > 0.0 && summary.quality_score <= 1.0);
        assert_eq!(summary.cell_name, "tax-cell-1");
    }
}
