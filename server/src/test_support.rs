//! In-process doubles for the provider seams, shared by the unit tests.

use async_trait::async_trait;
use ddugi_core::{
    ContentBlock, LanguageModel, LlmError, LlmResult, LocalSearchError, LocalSearchResult,
    MessagesRequest, MessagesResponse, VenueLookup, VerifiedVenue,
};
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// Language model that replays a fixed script of responses
#[derive(Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<(Option<Duration>, LlmResult<MessagesResponse>)>>,
    requests: Mutex<Vec<MessagesRequest>>,
    delay: Option<Duration>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_text(self, text: &str) -> Self {
        self.then_blocks(vec![ContentBlock::text(text)])
    }

    /// Queue a text response that arrives only after `delay`
    pub fn then_delayed_text(self, text: &str, delay: Duration) -> Self {
        self.push(Some(delay), Ok(text_response(vec![ContentBlock::text(text)])))
    }

    pub fn then_blocks(self, content: Vec<ContentBlock>) -> Self {
        self.then(Ok(text_response(content)))
    }

    pub fn then_error(self, error: LlmError) -> Self {
        self.then(Err(error))
    }

    pub fn then(self, response: LlmResult<MessagesResponse>) -> Self {
        self.push(None, response)
    }

    fn push(self, delay: Option<Duration>, response: LlmResult<MessagesResponse>) -> Self {
        self.responses.lock().unwrap().push_back((delay, response));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<MessagesRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn text_response(content: Vec<ContentBlock>) -> MessagesResponse {
    MessagesResponse {
        id: None,
        content,
        stop_reason: Some("end_turn".to_string()),
        usage: None,
    }
}

pub fn tool_use(id: &str, name: &str, input: Value) -> ContentBlock {
    ContentBlock::ToolUse {
        id: id.to_string(),
        name: name.to_string(),
        input,
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn create_message(&self, request: MessagesRequest) -> LlmResult<MessagesResponse> {
        self.requests.lock().unwrap().push(request);
        let (step_delay, response) = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                (
                    None,
                    Err(LlmError::ResponseError("script exhausted".to_string())),
                )
            });
        if let Some(delay) = step_delay.or(self.delay) {
            tokio::time::sleep(delay).await;
        }
        response
    }

    fn model_name(&self) -> String {
        "scripted-model".to_string()
    }
}

/// Local-search double producing `"<query> <n>"` venues
pub struct MockLookup {
    configured: bool,
    per_query: usize,
    failing: HashSet<String>,
    slow: HashSet<String>,
    calls: Mutex<Vec<(String, String, u32)>>,
}

impl MockLookup {
    pub fn with_results_per_query(per_query: usize) -> Self {
        Self {
            configured: true,
            per_query,
            failing: HashSet::new(),
            slow: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::with_results_per_query(0)
        }
    }

    pub fn failing_on(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }

    pub fn slow_on(mut self, query: &str) -> Self {
        self.slow.insert(query.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(String, String, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn venue(title: &str) -> VerifiedVenue {
    VerifiedVenue {
        title: title.to_string(),
        category: "음식점>한식".to_string(),
        address: format!("부산광역시 {}", title),
        phone: "051-123-4567".to_string(),
        ..VerifiedVenue::default()
    }
}

#[async_trait]
impl VenueLookup for MockLookup {
    async fn lookup(
        &self,
        query: &str,
        region: &str,
        max_results: u32,
    ) -> LocalSearchResult<Vec<VerifiedVenue>> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), region.to_string(), max_results));

        if !self.configured {
            return Err(LocalSearchError::NotConfigured);
        }
        if self.failing.contains(query) {
            return Err(LocalSearchError::Status {
                status_code: 500,
                message: "upstream failure".to_string(),
            });
        }
        if self.slow.contains(query) {
            tokio::time::sleep(Duration::from_secs(2)).await;
        }

        Ok((1..=self.per_query)
            .map(|n| venue(&format!("{} {}", query, n)))
            .collect())
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    fn default_region(&self) -> &str {
        "부산"
    }
}
