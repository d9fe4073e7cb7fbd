// src/aggregate.rs
//! # Prompt aggregation
//! Groups fetched items by topic and packs them into a bounded prompt body.
//!
//! Budget policy (all lengths in `char`s):
//! - every topic gets an equal share of the total budget, capped by `per_topic_chars`;
//! - inside a topic, news items come before social items, each in fetch order;
//! - items are appended whole while they fit; the first one that does not fit is
//!   cut to fill the share and the rest of that topic is dropped;
//! - a final tail truncation keeps the body within the total budget no matter what.

use crate::request::{FetchedItem, Source};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBody {
    pub text: String,
    pub items_used: usize,
    pub items_dropped: usize,
    pub truncated: bool,
}

pub fn build_prompt_body(
    topics: &[String],
    items: &[FetchedItem],
    budget_chars: usize,
    per_topic_chars: usize,
) -> PromptBody {
    let mut text = String::new();
    let mut items_used = 0usize;
    let mut items_dropped = 0usize;
    let mut truncated = false;

    let topic_count = topics.len().max(1);
    let share = (budget_chars / topic_count).min(per_topic_chars);

    for topic in topics {
        let topic_items: Vec<&FetchedItem> = [Source::News, Source::Social]
            .iter()
            .flat_map(|src| {
                items
                    .iter()
                    .filter(move |it| it.source == *src && it.topic == *topic)
            })
            .collect();

        if topic_items.is_empty() {
            continue;
        }

        let mut section = format!("## Topic: {topic}\n");
        let mut left = share.saturating_sub(char_len(&section));

        for (idx, it) in topic_items.iter().enumerate() {
            let line = format!("- [{}] {}\n", it.source, it.text);
            let n = char_len(&line);
            if n <= left {
                section.push_str(&line);
                left -= n;
                items_used += 1;
                continue;
            }

            // partial fit: cut this item, drop the remainder of the topic
            if left > 1 {
                section.push_str(&take_chars(&line, left - 1));
                section.push('\n');
                items_used += 1;
                items_dropped += topic_items.len() - idx - 1;
            } else {
                items_dropped += topic_items.len() - idx;
            }
            truncated = true;
            break;
        }
        section.push('\n');
        text.push_str(&section);
    }

    let body = text.trim_end().to_string();
    let body = if char_len(&body) > budget_chars {
        truncated = true;
        take_chars(&body, budget_chars)
    } else {
        body
    };

    PromptBody {
        text: body,
        items_used,
        items_dropped,
        truncated,
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn take_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}
