//! Segment trie mapping topic filters to subscribers
//!
//! Each node corresponds to one filter prefix. Subscribers with an exact filter
//! sit in `exact` on the node for their last segment; subscribers with a
//! trailing wildcard sit in `wildcard` on the node for the prefix. Matching a
//! topic walks one path down the trie, collecting every `wildcard` set it
//! passes and the `exact` set where it ends.

use std::collections::{BTreeSet, HashMap};

use super::topic::{Topic, TopicFilter};
use crate::registry::SubscriberId;

#[derive(Debug, Default)]
struct Node {
    children: HashMap<String, Node>,
    exact: BTreeSet<SubscriberId>,
    wildcard: BTreeSet<SubscriberId>,
}

impl Node {
    fn is_empty(&self) -> bool {
        self.children.is_empty() && self.exact.is_empty() && self.wildcard.is_empty()
    }

    fn remove(&mut self, path: &[String], wildcard: bool, id: SubscriberId) -> bool {
        match path.split_first() {
            None if wildcard => self.wildcard.remove(&id),
            None => self.exact.remove(&id),
            Some((head, rest)) => {
                let Some(child) = self.children.get_mut(head) else {
                    return false;
                };
                let removed = child.remove(rest, wildcard, id);
                if child.is_empty() {
                    self.children.remove(head);
                }
                removed
            }
        }
    }
}

/// Topic routing table
#[derive(Debug, Default)]
pub struct TopicRouter {
    root: Node,
    filters: usize,
}

impl TopicRouter {
    /// Create an empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` under `filter`
    ///
    /// Idempotent. Returns `true` if the pair was not already present.
    pub fn subscribe(&mut self, filter: &TopicFilter, id: SubscriberId) -> bool {
        let mut node = &mut self.root;
        for segment in filter.prefix() {
            node = node.children.entry(segment.clone()).or_default();
        }

        let inserted = if filter.is_wildcard() {
            node.wildcard.insert(id)
        } else {
            node.exact.insert(id)
        };

        if inserted {
            self.filters += 1;
        }
        inserted
    }

    /// Remove `id` from `filter`
    ///
    /// Returns `true` if the pair was present. Branches left empty are pruned.
    pub fn unsubscribe(&mut self, filter: &TopicFilter, id: SubscriberId) -> bool {
        let removed = self.root.remove(filter.prefix(), filter.is_wildcard(), id);
        if removed {
            self.filters -= 1;
        }
        removed
    }

    /// Remove `id` from every filter in `filters`
    pub fn unsubscribe_all<'a>(
        &mut self,
        filters: impl IntoIterator<Item = &'a TopicFilter>,
        id: SubscriberId,
    ) -> usize {
        filters
            .into_iter()
            .filter(|filter| self.unsubscribe(filter, id))
            .count()
    }

    /// All subscribers whose filter matches `topic`
    ///
    /// Ordered by subscriber id, so the result depends only on router state.
    pub fn match_topic(&self, topic: &Topic) -> BTreeSet<SubscriberId> {
        let mut matched = BTreeSet::new();
        let mut node = &self.root;
        matched.extend(node.wildcard.iter().copied());

        for segment in topic.segments() {
            match node.children.get(segment) {
                Some(child) => {
                    node = child;
                    matched.extend(node.wildcard.iter().copied());
                }
                None => return matched,
            }
        }

        matched.extend(node.exact.iter().copied());
        matched
    }

    /// Number of (filter, subscriber) pairs
    pub fn filter_count(&self) -> usize {
        self.filters
    }

    /// Whether no subscriptions are registered
    pub fn is_empty(&self) -> bool {
        self.filters == 0
    }
}
