//! HTTP client for the hosted Mem0 memory API (v1).

use agent_types::{AddOptions, MemoryClient, MemoryError, MemoryMessage, MemoryRecord, SearchOptions};
use serde::{Deserialize, Serialize};
use std::fmt;

const DEFAULT_MEM0_URL: &str = "https://api.mem0.ai";

#[derive(Debug, Serialize)]
struct AddBody<'a> {
    messages: &'a [MemoryMessage],
    user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    agent_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct SearchBody<'a> {
    query: &'a str,
    user_id: &'a str,
    limit: usize,
}

/// Mem0 answers with either a bare array or `{ "results": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordsResponse {
    List(Vec<MemoryRecord>),
    Wrapped { results: Vec<MemoryRecord> },
}

impl RecordsResponse {
    fn into_records(self) -> Vec<MemoryRecord> {
        match self {
            RecordsResponse::List(v) => v,
            RecordsResponse::Wrapped { results } => results,
        }
    }
}

/// Memory client for `https://api.mem0.ai` (or a self-hosted compatible server).
pub struct Mem0Client {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl Mem0Client {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Create from `MEM0_API_KEY` and optional `MEM0_API_URL`. Returns `None` without a key.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("MEM0_API_KEY").ok()?;
        let base_url =
            std::env::var("MEM0_API_URL").unwrap_or_else(|_| DEFAULT_MEM0_URL.to_string());
        Some(Self::new(base_url, api_key))
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("Authorization", format!("Token {}", self.api_key))
    }

    async fn read_body(res: reqwest::Response) -> Result<String, MemoryError> {
        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| MemoryError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(MemoryError::Api(format!(
                "status: {}, body: {}",
                status, body
            )));
        }
        Ok(body)
    }

    fn parse_records(body: &str) -> Result<Vec<MemoryRecord>, MemoryError> {
        serde_json::from_str::<RecordsResponse>(body)
            .map(RecordsResponse::into_records)
            .map_err(|e| MemoryError::Parse(e.to_string()))
    }
}

impl fmt::Debug for Mem0Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mem0Client")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait::async_trait]
impl MemoryClient for Mem0Client {
    async fn search(
        &self,
        query: &str,
        opts: &SearchOptions,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        let url = format!("{}/v1/memories/search/", self.base_url);
        let body = SearchBody {
            query,
            user_id: &opts.user_id,
            limit: opts.limit,
        };
        let res = self
            .auth(self.client.post(&url).json(&body))
            .send()
            .await
            .map_err(|e| MemoryError::Http(e.to_string()))?;
        let text = Self::read_body(res).await?;
        let mut records = Self::parse_records(&text)?;
        records.truncate(opts.limit);
        Ok(records)
    }

    async fn add(&self, messages: &[MemoryMessage], opts: &AddOptions) -> Result<(), MemoryError> {
        if messages.is_empty() {
            return Ok(());
        }
        let url = format!("{}/v1/memories/", self.base_url);
        let body = AddBody {
            messages,
            user_id: &opts.user_id,
            agent_id: opts.agent_id.as_deref(),
        };
        let res = self
            .auth(self.client.post(&url).json(&body))
            .send()
            .await
            .map_err(|e| MemoryError::Http(e.to_string()))?;
        Self::read_body(res).await?;
        Ok(())
    }

    async fn get_all(&self, user_id: &str) -> Result<Vec<MemoryRecord>, MemoryError> {
        let url = format!("{}/v1/memories/", self.base_url);
        let res = self
            .auth(self.client.get(&url).query(&[("user_id", user_id)]))
            .send()
            .await
            .map_err(|e| MemoryError::Http(e.to_string()))?;
        let text = Self::read_body(res).await?;
        Self::parse_records(&text)
    }
}
