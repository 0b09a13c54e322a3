// In-crate fakes for the two leaf clients.

use crate::llm::{GenerationConfig, LLMAdapter, LLM};
use crate::search::{SearchError, SearchHit, SearchProvider};
use crate::types::{LLMError, LLMRequest, LLMResponse, TokenUsage};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Replays queued replies in order and records every request.
/// `Err(msg)` replies become transport failures.
#[derive(Default)]
pub struct ScriptedLLM {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<LLMRequest>>,
}

impl ScriptedLLM {
    pub fn new(replies: Vec<Result<&str, &str>>) -> Arc<Self> {
        let replies = replies
            .into_iter()
            .map(|r| r.map(str::to_string).map_err(str::to_string))
            .collect();
        Arc::new(Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn handle(self: &Arc<Self>) -> LLM {
        LLM::new(self.clone(), GenerationConfig::new("gemini-test"))
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<LLMRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_prompt(&self) -> String {
        self.requests
            .lock()
            .unwrap()
            .last()
            .map(LLMRequest::prompt_text)
            .unwrap_or_default()
    }
}

#[async_trait]
impl LLMAdapter for ScriptedLLM {
    async fn create_chat_completion(&self, request: &LLMRequest) -> Result<LLMResponse, LLMError> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err("no scripted reply left".to_string()));

        match reply {
            Ok(content) => Ok(LLMResponse {
                content,
                finish_reason: "STOP".to_string(),
                usage: TokenUsage::default(),
            }),
            Err(message) => Err(LLMError::Request(message)),
        }
    }
}

/// Returns the same hits for every query unless the query is marked failing
/// or slow.
#[derive(Default)]
pub struct FixedSearch {
    hits: Vec<SearchHit>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl FixedSearch {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            ..Self::default()
        }
    }

    pub fn failing_on(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }

    pub fn slow_on(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for FixedSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());
        if let Some(delay) = self.delays.get(query) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(query) {
            return Err(SearchError::RequestFailed("simulated outage".to_string()));
        }
        Ok(self.hits.iter().take(max_results).cloned().collect())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}
