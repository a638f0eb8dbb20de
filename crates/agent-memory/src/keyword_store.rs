//! In-memory keyword (BM25-like) memory store, scoped per user.

use agent_types::{AddOptions, MemoryClient, MemoryError, MemoryMessage, MemoryRecord, SearchOptions};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Per-user records plus an inverted index over their text.
#[derive(Default)]
struct UserMemories {
    /// Insertion order.
    records: Vec<MemoryRecord>,
    /// term -> (record id -> count)
    term_doc_tf: HashMap<String, HashMap<String, u32>>,
    /// record id -> number of terms
    doc_length: HashMap<String, u32>,
}

impl UserMemories {
    fn insert(&mut self, record: MemoryRecord) {
        let terms = tokenize(&record.memory);
        self.doc_length
            .insert(record.id.clone(), terms.len() as u32);
        let mut term_counts: HashMap<String, u32> = HashMap::new();
        for t in terms {
            *term_counts.entry(t).or_insert(0) += 1;
        }
        for (term, count) in term_counts {
            self.term_doc_tf
                .entry(term)
                .or_default()
                .insert(record.id.clone(), count);
        }
        self.records.push(record);
    }

    fn search(&self, query: &str, limit: usize) -> Vec<MemoryRecord> {
        let query_terms = tokenize(query);
        let n = self.doc_length.len() as f64;
        if query_terms.is_empty() || n == 0.0 {
            return vec![];
        }
        let avg_len = (self.doc_length.values().sum::<u32>() as f64 / n).max(1.0);

        let k1 = 1.2;
        let b = 0.75;

        let mut doc_scores: HashMap<&str, f64> = HashMap::new();
        for term in &query_terms {
            let Some(postings) = self.term_doc_tf.get(term) else {
                continue;
            };
            let df = postings.len() as f64;
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
            for (doc_id, &tf) in postings {
                let len = self.doc_length.get(doc_id).copied().unwrap_or(0) as f64;
                let norm =
                    (tf as f64 * (k1 + 1.0)) / (tf as f64 + k1 * (1.0 - b + b * len / avg_len));
                *doc_scores.entry(doc_id.as_str()).or_insert(0.0) += idf * norm;
            }
        }

        let mut hits: Vec<MemoryRecord> = self
            .records
            .iter()
            .filter_map(|r| {
                doc_scores
                    .get(r.id.as_str())
                    .filter(|s| **s > 0.0)
                    .map(|s| MemoryRecord {
                        score: Some(*s),
                        ..r.clone()
                    })
            })
            .collect();
        // Stable sort keeps insertion order among equal scores.
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);
        hits
    }
}

/// Local stand-in for the hosted memory service. Each added message becomes one record.
pub struct InMemoryMemoryStore {
    by_user: Arc<RwLock<HashMap<String, UserMemories>>>,
}

impl InMemoryMemoryStore {
    pub fn new() -> Self {
        Self {
            by_user: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MemoryClient for InMemoryMemoryStore {
    async fn search(
        &self,
        query: &str,
        opts: &SearchOptions,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        let guard = self.by_user.read().await;
        Ok(guard
            .get(&opts.user_id)
            .map(|u| u.search(query, opts.limit))
            .unwrap_or_default())
    }

    async fn add(&self, messages: &[MemoryMessage], opts: &AddOptions) -> Result<(), MemoryError> {
        let now = chrono::Utc::now().to_rfc3339();
        let mut guard = self.by_user.write().await;
        let user = guard.entry(opts.user_id.clone()).or_default();
        for m in messages {
            let mut metadata = HashMap::new();
            metadata.insert(
                "created_at".to_string(),
                serde_json::Value::String(now.clone()),
            );
            if let Some(ref agent) = opts.agent_id {
                metadata.insert(
                    "agent_id".to_string(),
                    serde_json::Value::String(agent.clone()),
                );
            }
            user.insert(MemoryRecord {
                id: Uuid::new_v4().to_string(),
                memory: m.content.clone(),
                role: Some(m.role.clone()),
                score: None,
                metadata,
            });
        }
        tracing::debug!(user_id = %opts.user_id, added = messages.len(), "memories stored");
        Ok(())
    }

    async fn get_all(&self, user_id: &str) -> Result<Vec<MemoryRecord>, MemoryError> {
        let guard = self.by_user.read().await;
        Ok(guard
            .get(user_id)
            .map(|u| u.records.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_types::Role;

    fn add_opts(user: &str) -> AddOptions {
        AddOptions {
            user_id: user.to_string(),
            agent_id: Some("react-agent".to_string()),
        }
    }

    fn search_opts(user: &str, limit: usize) -> SearchOptions {
        SearchOptions {
            user_id: user.to_string(),
            limit,
        }
    }

    #[tokio::test]
    async fn search_ranks_matching_memories() {
        let store = InMemoryMemoryStore::new();
        store
            .add(
                &[
                    MemoryMessage::new(Role::User, "I like strawberries and cream"),
                    MemoryMessage::new(Role::Assistant, "Noted, you like strawberries"),
                    MemoryMessage::new(Role::User, "My order number is 4411"),
                ],
                &add_opts("u1"),
            )
            .await
            .unwrap();

        let hits = store
            .search("order number", &search_opts("u1", 5))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].memory, "My order number is 4411");
        assert!(hits[0].score.unwrap() > 0.0);

        let hits = store
            .search("strawberries", &search_opts("u1", 1))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let store = InMemoryMemoryStore::new();
        store
            .add(&[MemoryMessage::new(Role::User, "secret plan")], &add_opts("a"))
            .await
            .unwrap();
        assert!(store
            .search("secret", &search_opts("b", 5))
            .await
            .unwrap()
            .is_empty());
        assert!(store.get_all("b").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_all_keeps_order_and_roles() {
        let store = InMemoryMemoryStore::new();
        store
            .add(
                &[
                    MemoryMessage::new(Role::User, "hello"),
                    MemoryMessage::new(Role::Assistant, "hi there"),
                ],
                &add_opts("u"),
            )
            .await
            .unwrap();
        let all = store.get_all("u").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].role.as_deref(), Some("user"));
        assert_eq!(all[1].memory, "hi there");
        assert_eq!(all[1].metadata["agent_id"], "react-agent");
    }

    #[tokio::test]
    async fn empty_query_returns_nothing() {
        let store = InMemoryMemoryStore::new();
        store
            .add(&[MemoryMessage::new(Role::User, "anything")], &add_opts("u"))
            .await
            .unwrap();
        assert!(store.search("", &search_opts("u", 5)).await.unwrap().is_empty());
    }
}
