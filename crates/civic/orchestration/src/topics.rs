//! Trending topic selection

use civic_types::Post;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A topic and its post count in the window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicVolume {
    pub topic: String,
    pub posts: usize,
}

/// Up to `max_topics` topics ranked by post count, then by name.
pub fn trending_topics(posts: &[Post], max_topics: usize) -> Vec<TopicVolume> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for post in posts {
        let topic = post.topic.trim();
        if !topic.is_empty() {
            *counts.entry(topic).or_default() += 1;
        }
    }

    let mut ranked: Vec<TopicVolume> = counts
        .into_iter()
        .map(|(topic, posts)| TopicVolume {
            topic: topic.to_string(),
            posts,
        })
        .collect();
    ranked.sort_by(|a, b| b.posts.cmp(&a.posts).then_with(|| a.topic.cmp(&b.topic)));
    ranked.truncate(max_topics);
    ranked
}
