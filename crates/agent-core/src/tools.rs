//! Tools the ReAct agent can call.

use crate::AgentConfiguration;
use agent_types::{Tool, ToolError, ToolSpec};
use serde::Deserialize;
use std::sync::Arc;

/// Ordered set of tools, looked up by name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool; a tool with the same name replaces the earlier one.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.spec().name;
        self.tools.retain(|t| t.spec().name != name);
        self.tools.push(tool);
    }

    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.spec().name == name).cloned()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.spec().name).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

const DEFAULT_SEARCH_URL: &str = "https://api.tavily.com";

#[derive(Debug, Deserialize)]
struct SearchApiResponse {
    #[serde(default)]
    results: Vec<serde_json::Value>,
}

/// General web search through a Tavily-compatible API.
pub struct WebSearchTool {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    max_results: usize,
}

impl WebSearchTool {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, max_results: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            max_results,
        }
    }

    /// Create from `TAVILY_API_KEY` and optional `TAVILY_API_URL`. Returns `None` without a key.
    pub fn from_env(max_results: usize) -> Option<Self> {
        let api_key = std::env::var("TAVILY_API_KEY").ok()?;
        let base_url =
            std::env::var("TAVILY_API_URL").unwrap_or_else(|_| DEFAULT_SEARCH_URL.to_string());
        Some(Self::new(base_url, api_key, max_results))
    }
}

#[async_trait::async_trait]
impl Tool for WebSearchTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "search".to_string(),
            description: "Search for general web results. Useful for answering questions \
                          about current events."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "The search query." }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let query = match &arguments {
            serde_json::Value::String(s) => s.as_str(),
            other => other
                .get("query")
                .and_then(|q| q.as_str())
                .ok_or_else(|| ToolError::InvalidArguments("missing 'query'".to_string()))?,
        };
        let body = serde_json::json!({
            "query": query,
            "max_results": self.max_results,
        });
        let res = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::Other(e.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ToolError::Other(format!(
                "search API error {}: {}",
                status, text
            )));
        }
        let parsed: SearchApiResponse = res
            .json()
            .await
            .map_err(|e| ToolError::Other(e.to_string()))?;
        tracing::debug!(query = %query, results = parsed.results.len(), "web search");
        serde_json::to_string(&parsed.results).map_err(|e| ToolError::Other(e.to_string()))
    }
}

/// Tools available to the ReAct agent under `config`.
pub fn default_tools(config: &AgentConfiguration) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    match WebSearchTool::from_env(config.max_search_results) {
        Some(search) => registry.register(Arc::new(search)),
        None => tracing::warn!("TAVILY_API_KEY not set; web search tool disabled"),
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use std::sync::Mutex;

    struct Echo(&'static str);

    #[async_trait::async_trait]
    impl Tool for Echo {
        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: self.0.to_string(),
                description: "echo".to_string(),
                parameters: serde_json::json!({ "type": "object" }),
            }
        }

        async fn call(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
            Ok(arguments.to_string())
        }
    }

    #[test]
    fn registry_keeps_order_and_replaces_by_name() {
        let registry = ToolRegistry::new()
            .with(Arc::new(Echo("b")))
            .with(Arc::new(Echo("a")))
            .with(Arc::new(Echo("b")));
        assert_eq!(registry.names(), ["a", "b"]);
        assert!(registry.get("a").is_some());
        assert!(registry.get("zzz").is_none());
    }

    #[tokio::test]
    async fn web_search_posts_query_and_returns_results() {
        let seen = Arc::new(Mutex::new(None));
        let seen_in = Arc::clone(&seen);
        let app = Router::new().route(
            "/search",
            post(move |Json(body): Json<serde_json::Value>| {
                let seen = Arc::clone(&seen_in);
                async move {
                    *seen.lock().unwrap() = Some(body);
                    Json(serde_json::json!({
                        "query": "rust",
                        "results": [{ "title": "Rust", "url": "https://rust-lang.org" }]
                    }))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let tool = WebSearchTool::new(format!("http://{}", addr), "tv-key", 3);
        let out = tool
            .call(serde_json::json!({ "query": "rust" }))
            .await
            .unwrap();
        let results: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(results[0]["title"], "Rust");
        let body = seen.lock().unwrap().clone().unwrap();
        assert_eq!(body["max_results"], 3);
        assert_eq!(body["query"], "rust");
    }

    #[tokio::test]
    async fn web_search_requires_query() {
        let tool = WebSearchTool::new("http://127.0.0.1:9", "k", 3);
        let err = tool.call(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
