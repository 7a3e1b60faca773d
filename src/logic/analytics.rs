use anyhow::Result;
use itertools::Itertools;
use std::collections::HashMap;

use crate::model::{GlobalStats, KeywordCount};
use crate::store::traits::Store;

pub const TOP_KEYWORD_LIMIT: usize = 10;
/// Tokens must be longer than this many characters to be counted
pub const MIN_KEYWORD_CHARS: usize = 3;

/// Count lowercase whitespace-separated tokens across `ideas` and return the most frequent.
///
/// Ties keep the order in which each keyword was first seen.
pub fn top_keywords<'a, I>(ideas: I, limit: usize) -> Vec<KeywordCount>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, u64)> = Vec::new();

    for idea in ideas {
        for word in idea.to_lowercase().split_whitespace() {
            if word.chars().count() <= MIN_KEYWORD_CHARS {
                continue;
            }
            match positions.get(word) {
                Some(&position) => counts[position].1 += 1,
                None => {
                    positions.insert(word.to_string(), counts.len());
                    counts.push((word.to_string(), 1));
                }
            }
        }
    }

    counts
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1))
        .take(limit)
        .map(|(word, count)| KeywordCount(word, count))
        .collect()
}

pub struct AnalyticsAggregator;

impl AnalyticsAggregator {
    /// Aggregate counts and idea keywords over everything in the store
    pub async fn global_stats<S: Store + ?Sized>(store: &S) -> Result<GlobalStats> {
        let totals = store.totals().await?;
        let ideas = store.list_ideas().await?;

        let average_nodes_per_mindmap = if totals.total_mindmaps > 0 {
            totals.total_nodes as f64 / totals.total_mindmaps as f64
        } else {
            0.0
        };

        Ok(GlobalStats {
            total_mindmaps: totals.total_mindmaps,
            total_sessions: totals.total_sessions,
            total_nodes: totals.total_nodes,
            average_nodes_per_mindmap,
            top_idea_keywords: top_keywords(ideas.iter().map(String::as_str), TOP_KEYWORD_LIMIT),
        })
    }
}
